//! Serializable planner diagnostics.
//!
//! A compact summary of the latest compute pass for logging and telemetry
//! consumers. Building and serializing a summary never blocks or fails the
//! recompute path -- it is derived from an already-published result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::scheduler::{BlockUtilization, ScheduleResult, ScheduledItemKind};

/// Summary of one published schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsSummary {
    /// When the summary was built
    pub created_at: DateTime<Utc>,
    pub scheduled_count: usize,
    pub unscheduled_count: usize,
    pub conflict_count: usize,
    /// Item counts by kind
    pub items_by_kind: BTreeMap<String, usize>,
    pub block_utilization: Vec<BlockUtilization>,
    pub unused_capacity: BTreeMap<String, u32>,
    /// Distinct unscheduled reasons with occurrence counts
    pub unscheduled_reasons: BTreeMap<String, usize>,
    pub warnings: Vec<String>,
    pub async_savings_minutes: u32,
    /// Most recent pass failure, if the cached result is stale
    pub last_error: Option<String>,
}

impl DiagnosticsSummary {
    /// Build a summary from a result.
    pub fn from_result(
        result: &ScheduleResult,
        last_error: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut items_by_kind: BTreeMap<String, usize> = BTreeMap::new();
        for item in &result.scheduled {
            *items_by_kind.entry(kind_name(item.kind).to_string()).or_insert(0) += 1;
        }
        let mut unscheduled_reasons: BTreeMap<String, usize> = BTreeMap::new();
        for entry in &result.unscheduled {
            *unscheduled_reasons.entry(entry.reason.clone()).or_insert(0) += 1;
        }

        DiagnosticsSummary {
            created_at,
            scheduled_count: result.scheduled.len(),
            unscheduled_count: result.unscheduled.len(),
            conflict_count: result.conflicts.len(),
            items_by_kind,
            block_utilization: result.debug_info.block_utilization.clone(),
            unused_capacity: result.debug_info.unused_capacity.clone(),
            unscheduled_reasons,
            warnings: result.debug_info.warnings.clone(),
            async_savings_minutes: result.debug_info.async_savings_minutes,
            last_error,
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, crate::error::CoreError> {
        serde_json::to_string_pretty(self).map_err(crate::error::CoreError::from)
    }
}

fn kind_name(kind: ScheduledItemKind) -> &'static str {
    match kind {
        ScheduledItemKind::Task => "task",
        ScheduledItemKind::WorkflowStep => "workflow_step",
        ScheduledItemKind::Meeting => "meeting",
        ScheduledItemKind::Break => "break",
        ScheduledItemKind::BlockedTime => "blocked_time",
        ScheduledItemKind::AsyncWait => "async_wait",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{PlannerInputs, SchedulerEngine};
    use crate::task::Task;
    use crate::workday::{BlockAllocation, DailyWorkPattern, WorkBlock};
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn summary_counts_and_serializes() {
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let mut inputs = PlannerInputs::new(at);
        let mut task = Task::new("Report", 60, "focus");
        task.id = "task-1".to_string();
        inputs.tasks.push(task);
        let mut unplaceable = Task::new("Too big", 600, "focus");
        unplaceable.id = "task-2".to_string();
        inputs.tasks.push(unplaceable);
        inputs.settings.splitting.enabled = false;
        inputs.patterns.push(DailyWorkPattern {
            date,
            blocks: vec![WorkBlock::new(
                "block-1",
                date,
                Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 3, 10, 11, 0, 0).unwrap(),
                BlockAllocation::Single {
                    work_type_id: "focus".to_string(),
                },
            )],
            meetings: Vec::new(),
            blocked_times: Vec::new(),
        });

        let result = SchedulerEngine::new().compute(&inputs).unwrap();
        let summary = DiagnosticsSummary::from_result(&result, None, at);

        assert_eq!(summary.scheduled_count, 1);
        assert_eq!(summary.unscheduled_count, 1);
        assert_eq!(summary.items_by_kind.get("task"), Some(&1));
        assert_eq!(
            summary.unscheduled_reasons.get("no remaining capacity"),
            Some(&1)
        );
        assert_eq!(summary.block_utilization.len(), 1);

        let json = summary.to_json().unwrap();
        assert!(json.contains("no remaining capacity"));
    }
}
