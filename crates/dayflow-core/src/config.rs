//! TOML-based planner settings.
//!
//! Stores user preferences including:
//! - Task splitting policy (enabled, minimum fragment size)
//! - Break insertion policy (stretch length, break length)
//! - Debounce window for reactive recomputes
//! - Priority weighting for the scheduling order
//! - Work type definitions and colors
//!
//! Settings are stored at `~/.config/dayflow/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::workday::WorkType;

/// Weights for the priority score. Visible only through its ordering
/// effects; treated as a tunable policy behind one scoring function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriorityWeights {
    /// Weight for user urgency (default 0.4)
    #[serde(default = "default_urgency_weight")]
    pub urgency_weight: f64,
    /// Weight for user importance (default 0.3)
    #[serde(default = "default_importance_weight")]
    pub importance_weight: f64,
    /// Weight for deadline pressure / critical-path distance (default 0.3)
    #[serde(default = "default_deadline_weight")]
    pub deadline_weight: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            urgency_weight: default_urgency_weight(),
            importance_weight: default_importance_weight(),
            deadline_weight: default_deadline_weight(),
        }
    }
}

/// Task splitting policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplittingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fragments below this size are never created
    #[serde(default = "default_min_split")]
    pub min_fragment_minutes: u32,
}

impl Default for SplittingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            min_fragment_minutes: default_min_split(),
        }
    }
}

/// Break insertion policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Continuous work minutes before a break is inserted
    #[serde(default = "default_focus_stretch")]
    pub focus_stretch_minutes: u32,
    /// Break length in minutes
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
}

impl Default for BreakConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            focus_stretch_minutes: default_focus_stretch(),
            break_minutes: default_break_minutes(),
        }
    }
}

/// Planner settings.
///
/// Serialized to/from TOML at `~/.config/dayflow/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkSettings {
    /// Debounce window for coalescing input updates (milliseconds)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default)]
    pub splitting: SplittingConfig,
    #[serde(default)]
    pub breaks: BreakConfig,
    #[serde(default)]
    pub priority: PriorityWeights,
    /// Work type definitions
    #[serde(default = "WorkType::defaults")]
    pub work_types: Vec<WorkType>,
}

impl Default for WorkSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            splitting: SplittingConfig::default(),
            breaks: BreakConfig::default(),
            priority: PriorityWeights::default(),
            work_types: WorkType::defaults(),
        }
    }
}

impl WorkSettings {
    /// Path to the settings file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join("dayflow").join("config.toml"))
    }

    /// Load settings from disk, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_or_default() -> Self {
        Self::path()
            .ok()
            .and_then(|p| Self::load_from(&p).ok())
            .unwrap_or_default()
    }

    /// Load settings from a specific path.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Save settings to the default path.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        self.save_to(&path)
    }

    /// Save settings to a specific path, creating parent directories.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// The id of the first flexible work type, if any.
    pub fn flexible_type_id(&self) -> Option<&str> {
        self.work_types.iter().find(|t| t.flexible).map(|t| t.id.as_str())
    }
}

// Default functions
fn default_urgency_weight() -> f64 {
    0.4
}
fn default_importance_weight() -> f64 {
    0.3
}
fn default_deadline_weight() -> f64 {
    0.3
}
fn default_true() -> bool {
    true
}
fn default_min_split() -> u32 {
    15
}
fn default_focus_stretch() -> u32 {
    90
}
fn default_break_minutes() -> u32 {
    10
}
fn default_debounce_ms() -> u64 {
    80
}
