//! Next actionable item selection.
//!
//! Projects a computed schedule down to real, workable items -- no
//! meetings, breaks, blocked time, waits, completed work, or items already
//! covered by a running session -- and exposes the one at a
//! caller-controlled skip cursor. The cursor never wraps: running past the
//! end yields None rather than resurrecting earlier (possibly finished)
//! work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::{PlannerInputs, ScheduleResult, ScheduledItem, ScheduledItemKind};
use crate::task::StepStatus;

/// Kind of the next item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextItemKind {
    Task,
    WorkflowStep,
}

/// The next actionable work item, resolved to full identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextScheduledItem {
    pub kind: NextItemKind,
    /// Task or step id
    pub id: String,
    pub workflow_id: Option<String>,
    pub workflow_name: Option<String>,
    pub title: String,
    pub duration_minutes: u32,
    pub start: DateTime<Utc>,
    pub logged_minutes: u32,
}

/// Select the actionable item at `skip_index`.
///
/// Filtering and ordering are re-derived from the result on every call, so
/// the cheap reactive paths (session or cursor changes) can refresh the
/// projection without touching the schedule itself.
pub fn select_next(
    result: &ScheduleResult,
    skip_index: usize,
    inputs: &PlannerInputs,
) -> Option<NextScheduledItem> {
    let active = inputs.active_target_ids();
    let now = inputs.captured_at;

    let mut filtered: Vec<&ScheduledItem> = result
        .scheduled
        .iter()
        .filter(|item| item.kind.is_work())
        .filter(|item| !active.contains(&item.source_id))
        .filter(|item| !is_completed(item, inputs))
        .filter(|item| !is_async_blocked(item, result, inputs, now))
        .collect();

    // The engine already sorts by start time; re-assert defensively since
    // the projection must hold even for a result built elsewhere.
    filtered.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

    // Never wrap: a cursor past the end means "nothing further".
    let item = *filtered.get(skip_index)?;
    resolve(item, inputs)
}

/// The entity behind an item may have completed since the schedule was
/// computed (cheap paths reuse a cached result).
fn is_completed(item: &ScheduledItem, inputs: &PlannerInputs) -> bool {
    match item.kind {
        ScheduledItemKind::Task => inputs
            .tasks
            .iter()
            .find(|t| t.id == item.source_id)
            .map(|t| t.completed)
            .unwrap_or(false),
        ScheduledItemKind::WorkflowStep => inputs
            .workflows
            .iter()
            .flat_map(|w| &w.steps)
            .find(|s| s.id == item.source_id)
            .map(|s| s.status == StepStatus::Completed)
            .unwrap_or(false),
        _ => false,
    }
}

/// A step is async-blocked while a dependency's wait interval still covers
/// the current instant.
fn is_async_blocked(
    item: &ScheduledItem,
    result: &ScheduleResult,
    inputs: &PlannerInputs,
    now: DateTime<Utc>,
) -> bool {
    if item.kind != ScheduledItemKind::WorkflowStep {
        return false;
    }
    let Some(step) = inputs
        .workflows
        .iter()
        .flat_map(|w| &w.steps)
        .find(|s| s.id == item.source_id)
    else {
        return false;
    };
    step.depends_on.iter().any(|dep| {
        result.scheduled.iter().any(|wait| {
            wait.kind == ScheduledItemKind::AsyncWait
                && wait.source_id == *dep
                && wait.start <= now
                && now < wait.end
        })
    })
}

fn resolve(item: &ScheduledItem, inputs: &PlannerInputs) -> Option<NextScheduledItem> {
    match item.kind {
        ScheduledItemKind::Task => {
            let task = inputs.tasks.iter().find(|t| t.id == item.source_id)?;
            Some(NextScheduledItem {
                kind: NextItemKind::Task,
                id: task.id.clone(),
                workflow_id: None,
                workflow_name: None,
                title: task.name.clone(),
                duration_minutes: item.duration_minutes,
                start: item.start,
                logged_minutes: task.logged_minutes,
            })
        }
        ScheduledItemKind::WorkflowStep => {
            let workflow = inputs
                .workflows
                .iter()
                .find(|w| Some(w.id.as_str()) == item.workflow_id.as_deref())?;
            let step = workflow.steps.iter().find(|s| s.id == item.source_id)?;
            Some(NextScheduledItem {
                kind: NextItemKind::WorkflowStep,
                id: step.id.clone(),
                workflow_id: Some(workflow.id.clone()),
                workflow_name: Some(workflow.name.clone()),
                title: step.name.clone(),
                duration_minutes: item.duration_minutes,
                start: item.start,
                logged_minutes: step.logged_minutes,
            })
        }
        _ => None,
    }
}
