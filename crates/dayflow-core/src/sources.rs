//! Collaborator interfaces.
//!
//! Persistence, transport, and session tracking live outside this crate;
//! the planner consumes them through these traits and assembles an
//! immutable `PlannerInputs` snapshot per compute pass. In-memory
//! implementations are provided for tests and embedding.

use chrono::NaiveDate;

use crate::clock::Clock;
use crate::config::WorkSettings;
use crate::scheduler::PlannerInputs;
use crate::task::{ActiveWorkSession, Task, Workflow};
use crate::workday::DailyWorkPattern;

/// Source of standalone tasks.
pub trait TaskSource {
    fn list(&self) -> Vec<Task>;
}

/// Source of workflows (with their steps).
pub trait WorkflowSource {
    fn list(&self) -> Vec<Workflow>;
}

/// Source of daily work patterns.
pub trait WorkPatternSource {
    /// Patterns on or after `from`, ascending by date.
    fn patterns_from(&self, from: NaiveDate) -> Vec<DailyWorkPattern>;
}

/// Source of planner settings; defaults apply if absent.
pub trait SettingsSource {
    fn current(&self) -> WorkSettings;
}

/// Source of currently-running work sessions.
pub trait ActiveSessionSource {
    fn active_sessions(&self) -> Vec<ActiveWorkSession>;
}

/// Assemble a snapshot from the collaborator traits. The snapshot is a
/// plain value: the compute pass never calls back into the sources.
pub fn gather_snapshot(
    tasks: &dyn TaskSource,
    workflows: &dyn WorkflowSource,
    patterns: &dyn WorkPatternSource,
    settings: &dyn SettingsSource,
    sessions: &dyn ActiveSessionSource,
    clock: &dyn Clock,
) -> PlannerInputs {
    let now = clock.now();
    PlannerInputs {
        tasks: tasks.list(),
        workflows: workflows.list(),
        patterns: patterns.patterns_from(clock.local_date_of(now)),
        settings: settings.current(),
        active_sessions: sessions.active_sessions(),
        skip_index: 0,
        captured_at: now,
    }
}

/// In-memory source backed by plain vectors.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    pub tasks: Vec<Task>,
    pub workflows: Vec<Workflow>,
    pub patterns: Vec<DailyWorkPattern>,
    pub settings: WorkSettings,
    pub sessions: Vec<ActiveWorkSession>,
}

impl TaskSource for InMemorySource {
    fn list(&self) -> Vec<Task> {
        self.tasks.clone()
    }
}

impl WorkflowSource for InMemorySource {
    fn list(&self) -> Vec<Workflow> {
        self.workflows.clone()
    }
}

impl WorkPatternSource for InMemorySource {
    fn patterns_from(&self, from: NaiveDate) -> Vec<DailyWorkPattern> {
        let mut patterns: Vec<DailyWorkPattern> = self
            .patterns
            .iter()
            .filter(|p| p.date >= from)
            .cloned()
            .collect();
        patterns.sort_by_key(|p| p.date);
        patterns
    }
}

impl SettingsSource for InMemorySource {
    fn current(&self) -> WorkSettings {
        self.settings.clone()
    }
}

impl ActiveSessionSource for InMemorySource {
    fn active_sessions(&self) -> Vec<ActiveWorkSession> {
        self.sessions.clone()
    }
}
