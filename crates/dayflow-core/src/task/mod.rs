//! Task and workflow types.
//!
//! Tasks are standalone units of work; workflows are ordered sets of steps
//! sharing a deadline, with dependencies and optional async waits between
//! steps. The engine only reads these entities -- creation and mutation
//! belong to the caller's stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How strictly a deadline binds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeadlineKind {
    /// Missing it is a failure; surfaced as a conflict.
    Hard,
    /// Missing it is undesirable but tolerated.
    Soft,
}

impl Default for DeadlineKind {
    fn default() -> Self {
        DeadlineKind::Soft
    }
}

/// A standalone schedulable task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: String,
    /// Task name
    pub name: String,
    /// Estimated duration in minutes
    pub duration_minutes: u32,
    /// User-assigned importance (0-100)
    pub importance: u32,
    /// User-assigned urgency (0-100)
    pub urgency: u32,
    /// Work type this task consumes capacity from
    pub work_type_id: String,
    /// Whether the task is completed
    pub completed: bool,
    /// Optional deadline
    pub deadline: Option<DateTime<Utc>>,
    /// How strictly the deadline binds
    #[serde(default)]
    pub deadline_kind: DeadlineKind,
    /// Minutes already logged against this task
    #[serde(default)]
    pub logged_minutes: u32,
    /// Creation timestamp (tie-break ordering)
    pub created_at: DateTime<Utc>,
    /// Optional free-form notes
    pub notes: Option<String>,
}

impl Task {
    /// Create a new task with default values.
    pub fn new(name: impl Into<String>, duration_minutes: u32, work_type_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Task {
            id: format!("task-{}-{}", now.timestamp(), uuid::Uuid::new_v4()),
            name: name.into(),
            duration_minutes,
            importance: 50,
            urgency: 50,
            work_type_id: work_type_id.into(),
            completed: false,
            deadline: None,
            deadline_kind: DeadlineKind::Soft,
            logged_minutes: 0,
            created_at: now,
            notes: None,
        }
    }

    /// Set the deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>, kind: DeadlineKind) -> Self {
        self.deadline = Some(deadline);
        self.deadline_kind = kind;
        self
    }

    /// Set importance and urgency.
    pub fn with_priority(mut self, importance: u32, urgency: u32) -> Self {
        self.importance = importance.min(100);
        self.urgency = urgency.min(100);
        self
    }

    /// Minutes still needing to be scheduled.
    pub fn remaining_minutes(&self) -> u32 {
        self.duration_minutes.saturating_sub(self.logged_minutes)
    }
}

/// Workflow step status.
///
/// Valid transitions:
/// - PENDING → IN_PROGRESS (work started)
/// - IN_PROGRESS → WAITING (async wait began)
/// - IN_PROGRESS → COMPLETED
/// - IN_PROGRESS → PENDING (work abandoned / rescheduled)
/// - WAITING → COMPLETED (wait resolved)
/// - WAITING → IN_PROGRESS (wait failed, work resumed)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not yet started (initial state)
    Pending,
    /// Currently being worked
    InProgress,
    /// Async wait running; no capacity consumed
    Waiting,
    /// Finished (terminal state)
    Completed,
}

impl StepStatus {
    /// Check if a transition is valid.
    pub fn can_transition_to(&self, to: &StepStatus) -> bool {
        match self {
            StepStatus::Pending => matches!(to, StepStatus::InProgress),
            StepStatus::InProgress => matches!(
                to,
                StepStatus::Waiting | StepStatus::Completed | StepStatus::Pending
            ),
            StepStatus::Waiting => matches!(to, StepStatus::Completed | StepStatus::InProgress),
            StepStatus::Completed => false, // Terminal state
        }
    }
}

impl Default for StepStatus {
    fn default() -> Self {
        StepStatus::Pending
    }
}

/// Error returned when an invalid status transition is attempted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepTransitionError {
    pub from: StepStatus,
    pub to: StepStatus,
}

impl fmt::Display for StepTransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid status transition: {:?} → {:?}", self.from, self.to)
    }
}

impl std::error::Error for StepTransitionError {}

/// A single step inside a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Unique identifier
    pub id: String,
    /// Owning workflow
    pub workflow_id: String,
    /// Step name
    pub name: String,
    /// Estimated duration in minutes
    pub duration_minutes: u32,
    /// Work type this step consumes capacity from
    pub work_type_id: String,
    /// Step ids that must complete (or finish waiting) before this one starts
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Minutes downstream steps must wait after this step ends.
    /// Consumes no work-type capacity.
    #[serde(default)]
    pub async_wait_minutes: u32,
    /// Whether this step triggers an async external process
    #[serde(default)]
    pub is_async_trigger: bool,
    /// Current status
    #[serde(default)]
    pub status: StepStatus,
    /// Minutes already logged against this step
    #[serde(default)]
    pub logged_minutes: u32,
    /// Position within the workflow (tie-break ordering)
    pub step_index: u32,
}

impl WorkflowStep {
    /// Create a new pending step.
    pub fn new(
        workflow_id: impl Into<String>,
        name: impl Into<String>,
        duration_minutes: u32,
        work_type_id: impl Into<String>,
        step_index: u32,
    ) -> Self {
        let now = Utc::now();
        WorkflowStep {
            id: format!("step-{}-{}", now.timestamp(), uuid::Uuid::new_v4()),
            workflow_id: workflow_id.into(),
            name: name.into(),
            duration_minutes,
            work_type_id: work_type_id.into(),
            depends_on: Vec::new(),
            async_wait_minutes: 0,
            is_async_trigger: false,
            status: StepStatus::Pending,
            logged_minutes: 0,
            step_index,
        }
    }

    /// Add a dependency on another step.
    pub fn with_dependency(mut self, step_id: impl Into<String>) -> Self {
        self.depends_on.push(step_id.into());
        self
    }

    /// Mark this step as an async trigger with the given wait.
    pub fn with_async_wait(mut self, wait_minutes: u32) -> Self {
        self.async_wait_minutes = wait_minutes;
        self.is_async_trigger = true;
        self
    }

    /// Transition to a new status.
    ///
    /// Returns an error if the transition is invalid.
    pub fn transition_to(&mut self, new_status: StepStatus) -> Result<(), StepTransitionError> {
        if !self.status.can_transition_to(&new_status) {
            return Err(StepTransitionError {
                from: self.status,
                to: new_status,
            });
        }
        self.status = new_status;
        Ok(())
    }

    /// Minutes still needing to be scheduled.
    pub fn remaining_minutes(&self) -> u32 {
        self.duration_minutes.saturating_sub(self.logged_minutes)
    }
}

/// An ordered set of steps sharing a deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique identifier
    pub id: String,
    /// Workflow name
    pub name: String,
    /// Ordered steps
    pub steps: Vec<WorkflowStep>,
    /// Shared deadline for the whole workflow
    pub deadline: Option<DateTime<Utc>>,
    /// How strictly the deadline binds
    #[serde(default)]
    pub deadline_kind: DeadlineKind,
    /// User-assigned importance (0-100)
    pub importance: u32,
    /// User-assigned urgency (0-100)
    pub urgency: u32,
    /// Creation timestamp (tie-break ordering)
    pub created_at: DateTime<Utc>,
}

impl Workflow {
    /// Create a new empty workflow.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Workflow {
            id: format!("workflow-{}-{}", now.timestamp(), uuid::Uuid::new_v4()),
            name: name.into(),
            steps: Vec::new(),
            deadline: None,
            deadline_kind: DeadlineKind::Soft,
            importance: 50,
            urgency: 50,
            created_at: now,
        }
    }

    /// Look up a step by id.
    pub fn step(&self, step_id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Whether every step is completed.
    pub fn is_completed(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.status == StepStatus::Completed)
    }
}

/// A currently-running timer bound to a task or workflow step.
///
/// Its existence removes the target from the scheduling pool on the next
/// full recompute, but a session-only change never forces one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveWorkSession {
    /// Session identifier
    pub id: String,
    /// Task or step id being worked
    pub target_id: String,
    /// Planned minutes for this session
    pub planned_minutes: u32,
    /// When the session started
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_serialization_roundtrip() {
        let task = Task::new("Write report", 60, "focus")
            .with_priority(80, 60)
            .with_deadline(Utc::now() + chrono::Duration::days(2), DeadlineKind::Hard);

        let json = serde_json::to_string(&task).unwrap();
        let decoded: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.id, task.id);
        assert_eq!(decoded.deadline_kind, DeadlineKind::Hard);
    }

    #[test]
    fn remaining_minutes_accounts_for_logged_time() {
        let mut task = Task::new("Task", 90, "focus");
        assert_eq!(task.remaining_minutes(), 90);
        task.logged_minutes = 30;
        assert_eq!(task.remaining_minutes(), 60);
        task.logged_minutes = 120;
        assert_eq!(task.remaining_minutes(), 0);
    }

    #[test]
    fn step_status_transitions() {
        let mut step = WorkflowStep::new("wf-1", "Draft", 30, "focus", 0);
        assert_eq!(step.status, StepStatus::Pending);

        assert!(step.transition_to(StepStatus::InProgress).is_ok());
        assert!(step.transition_to(StepStatus::Waiting).is_ok());
        assert!(step.transition_to(StepStatus::Completed).is_ok());

        // Terminal state
        let err = step.transition_to(StepStatus::Pending).unwrap_err();
        assert_eq!(err.from, StepStatus::Completed);
    }

    #[test]
    fn pending_cannot_jump_to_completed() {
        let mut step = WorkflowStep::new("wf-1", "Draft", 30, "focus", 0);
        assert!(step.transition_to(StepStatus::Completed).is_err());
    }

    #[test]
    fn workflow_completion_requires_all_steps() {
        let mut wf = Workflow::new("Release");
        assert!(!wf.is_completed()); // Empty workflow is not "completed"

        let mut s1 = WorkflowStep::new(&wf.id, "Build", 30, "focus", 0);
        s1.status = StepStatus::Completed;
        let s2 = WorkflowStep::new(&wf.id, "Ship", 30, "admin", 1);
        wf.steps = vec![s1, s2];
        assert!(!wf.is_completed());

        wf.steps[1].status = StepStatus::Completed;
        assert!(wf.is_completed());
    }

    #[test]
    fn async_trigger_builder() {
        let step = WorkflowStep::new("wf-1", "Send for review", 15, "admin", 2)
            .with_async_wait(120);
        assert!(step.is_async_trigger);
        assert_eq!(step.async_wait_minutes, 120);
    }
}
