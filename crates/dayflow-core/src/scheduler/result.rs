//! Schedule output types.
//!
//! A compute pass produces a `ScheduleResult`: time-stamped placements,
//! unscheduled entries with reasons, diagnostics, and conflicts. Results
//! are transient values -- replaced wholesale on the next pass, never
//! mutated in place by consumers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::capacity::OverflowRecord;

/// Kind of scheduled item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledItemKind {
    Task,
    WorkflowStep,
    Meeting,
    Break,
    BlockedTime,
    AsyncWait,
}

impl ScheduledItemKind {
    /// Whether this kind is actionable work (vs. occupied/idle time).
    pub fn is_work(&self) -> bool {
        matches!(self, Self::Task | Self::WorkflowStep)
    }
}

/// A single placement on the timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledItem {
    /// Deterministic item id, derived from the source id and fragment index
    pub id: String,
    pub kind: ScheduledItemKind,
    /// Originating entity id (task, step, meeting...)
    pub source_id: String,
    /// Set when this placement is a split fragment of a larger task
    pub original_task_id: Option<String>,
    /// Owning workflow for step items
    pub workflow_id: Option<String>,
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: u32,
    /// Work type consumed (None for meetings/breaks/waits)
    pub work_type_id: Option<String>,
    /// Display color derived from the work type
    pub color: String,
    /// Block the item was placed into (None for synthetic items)
    pub block_id: Option<String>,
}

impl ScheduledItem {
    /// Whether this item is a fragment of a split task.
    pub fn is_fragment(&self) -> bool {
        self.original_task_id.is_some()
    }
}

/// An item that could not be placed, with a human-readable reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnscheduledEntry {
    pub id: String,
    pub name: String,
    pub duration_minutes: u32,
    /// Always non-empty
    pub reason: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Utilization of one work block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockUtilization {
    pub block_id: String,
    pub date: NaiveDate,
    pub capacity_minutes: u32,
    pub used_minutes: u32,
    pub overflow_minutes: u32,
}

/// Diagnostic payload attached to every result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleDebugInfo {
    /// Per-block utilization, in block order
    pub block_utilization: Vec<BlockUtilization>,
    /// Unused capacity by work type across the whole horizon
    pub unused_capacity: BTreeMap<String, u32>,
    /// Flexible-capacity borrows
    pub overflow: Vec<OverflowRecord>,
    /// Non-fatal anomalies observed during the pass
    pub warnings: Vec<String>,
    /// Longest dependency chain by duration (step id sequence)
    pub critical_path: Option<Vec<String>>,
    /// Wait minutes that ran in parallel with other scheduled work
    pub async_savings_minutes: u32,
}

/// Kind of schedule conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    HardDeadlineMiss,
    SoftDeadlineMiss,
}

/// A detected conflict between the computed plan and a constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    /// Entity the conflict concerns (task or workflow id)
    pub entity_id: String,
    pub message: String,
}

/// The complete output of one compute pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// Placements sorted by start time
    pub scheduled: Vec<ScheduledItem>,
    pub unscheduled: Vec<UnscheduledEntry>,
    pub debug_info: ScheduleDebugInfo,
    pub conflicts: Vec<Conflict>,
}

impl ScheduleResult {
    /// Scheduled items that represent actionable work.
    pub fn work_items(&self) -> impl Iterator<Item = &ScheduledItem> {
        self.scheduled.iter().filter(|i| i.kind.is_work())
    }

    /// All fragments belonging to one original task.
    pub fn fragments_of(&self, task_id: &str) -> Vec<&ScheduledItem> {
        self.scheduled
            .iter()
            .filter(|i| i.original_task_id.as_deref() == Some(task_id))
            .collect()
    }
}
