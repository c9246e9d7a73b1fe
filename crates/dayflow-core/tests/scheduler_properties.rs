//! Property tests for the scheduling engine.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use dayflow_core::{
    select_next, BlockAllocation, DailyWorkPattern, PlannerInputs, SchedulerEngine, Task,
    WorkBlock,
};
use proptest::prelude::*;

fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, h, m, 0).unwrap()
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

/// Inputs built from generated task durations/priorities and block lengths.
fn build_inputs(tasks: &[(u32, u32, bool)], block_hours: &[u32]) -> PlannerInputs {
    let mut inputs = PlannerInputs::new(at(10, 8, 0));
    inputs.settings.breaks.enabled = false;
    for (i, (duration, urgency, is_admin)) in tasks.iter().enumerate() {
        let work_type = if *is_admin { "admin" } else { "focus" };
        let mut task = Task::new(format!("Task {i}"), *duration, work_type);
        task.id = format!("t{i}");
        task.urgency = *urgency;
        task.created_at = at(10, 0, 0);
        inputs.tasks.push(task);
    }
    for (i, hours) in block_hours.iter().enumerate() {
        let day = 10 + i as u32;
        inputs.patterns.push(DailyWorkPattern {
            date: date(day),
            blocks: vec![
                WorkBlock::new(
                    format!("focus-{day}"),
                    date(day),
                    at(day, 9, 0),
                    at(day, 9 + hours, 0),
                    BlockAllocation::Single {
                        work_type_id: "focus".to_string(),
                    },
                ),
                WorkBlock::new(
                    format!("mixed-{day}"),
                    date(day),
                    at(day, 14, 0),
                    at(day, 14 + hours, 0),
                    BlockAllocation::Split {
                        ratios: vec![
                            ("admin".to_string(), 0.6),
                            ("flexible".to_string(), 0.4),
                        ],
                    },
                ),
            ],
            meetings: Vec::new(),
            blocked_times: Vec::new(),
        });
    }
    inputs
}

proptest! {
    // For every block, placed work never exceeds its built capacity.
    #[test]
    fn capacity_is_conserved(
        tasks in prop::collection::vec((15u32..240, 0u32..100, any::<bool>()), 1..10),
        block_hours in prop::collection::vec(1u32..5, 1..4),
    ) {
        let inputs = build_inputs(&tasks, &block_hours);
        let result = SchedulerEngine::new().compute(&inputs).unwrap();

        for util in &result.debug_info.block_utilization {
            prop_assert!(
                util.used_minutes <= util.capacity_minutes,
                "block {} used {} of {}",
                util.block_id, util.used_minutes, util.capacity_minutes
            );
        }
        // Every minute of every task is either placed or reported.
        let placed: u32 = result
            .scheduled
            .iter()
            .filter(|i| i.kind.is_work())
            .map(|i| i.duration_minutes)
            .sum();
        let unplaced: u32 = result.unscheduled.iter().map(|u| u.duration_minutes).sum();
        let total: u32 = tasks.iter().map(|(d, _, _)| *d).sum();
        prop_assert_eq!(placed + unplaced, total);
    }

    // Identical inputs always produce byte-identical results.
    #[test]
    fn compute_is_deterministic(
        tasks in prop::collection::vec((15u32..240, 0u32..100, any::<bool>()), 1..10),
        block_hours in prop::collection::vec(1u32..5, 1..3),
    ) {
        let inputs = build_inputs(&tasks, &block_hours);
        let engine = SchedulerEngine::new();
        let a = serde_json::to_vec(&engine.compute(&inputs).unwrap()).unwrap();
        let b = serde_json::to_vec(&engine.compute(&inputs).unwrap()).unwrap();
        prop_assert_eq!(a, b);
    }

    // The skip cursor never wraps, for any cursor past the end.
    #[test]
    fn skip_cursor_never_wraps(
        tasks in prop::collection::vec((15u32..120, 0u32..100, any::<bool>()), 1..6),
        extra in 0usize..10,
    ) {
        let inputs = build_inputs(&tasks, &[8]);
        let result = SchedulerEngine::new().compute(&inputs).unwrap();
        let work_count = result.work_items().count();
        prop_assert!(select_next(&result, work_count + extra, &inputs).is_none());
    }
}
