//! Shared CLI helpers: the JSON planner file and snapshot assembly.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use dayflow_core::{
    ActiveWorkSession, Clock, DailyWorkPattern, PlannerInputs, SystemClock, Task, Workflow,
    WorkSettings,
};

/// Default planner file in the current directory.
pub const DEFAULT_FILE: &str = "dayflow.json";

/// On-disk planner data: everything except settings, which live in the
/// TOML config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerFile {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub workflows: Vec<Workflow>,
    #[serde(default)]
    pub patterns: Vec<DailyWorkPattern>,
    #[serde(default)]
    pub active_sessions: Vec<ActiveWorkSession>,
}

impl PlannerFile {
    /// Load a planner file; a missing file is an empty planner.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            return Ok(PlannerFile::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Assemble a compute snapshot using the current wall clock and the
    /// TOML-backed settings.
    pub fn to_inputs(&self, settings: WorkSettings) -> PlannerInputs {
        let clock = SystemClock;
        PlannerInputs {
            tasks: self.tasks.clone(),
            workflows: self.workflows.clone(),
            patterns: self.patterns.clone(),
            settings,
            active_sessions: self.active_sessions.clone(),
            skip_index: 0,
            captured_at: clock.now(),
        }
    }
}

pub fn resolve_path(file: &Option<PathBuf>) -> PathBuf {
    file.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_FILE))
}

/// Render a UTC timestamp compactly for table output.
pub fn fmt_time(ts: chrono::DateTime<Utc>) -> String {
    ts.format("%m-%d %H:%M").to_string()
}
