//! Block placement for one day.
//!
//! Takes a priority-ordered batch of ready candidates and a mutable
//! `DayCapacity`, and assigns each candidate a contiguous span inside a
//! block with matching typed capacity. Exhausted typed capacity spills
//! into the block's flexible pool (recorded as overflow by the capacity
//! model). Candidates that do not fit are carried to the next day.
//! Splitting cuts a candidate into fragments sharing `original_task_id`,
//! preserving relative order across blocks and days.

use chrono::DateTime;
use chrono::Utc;
use std::collections::BTreeMap;

use super::result::{ScheduledItem, ScheduledItemKind};
use super::{Candidate, CandidateKind, BREAK_COLOR};
use crate::capacity::DayCapacity;
use crate::config::WorkSettings;
use crate::workday::WorkTypeRegistry;

/// Result of placing one batch into one day.
#[derive(Debug, Default)]
pub struct PlacementBatch {
    /// Work fragments and inserted breaks, in placement order
    pub placed: Vec<ScheduledItem>,
    /// Candidates (or remainders of split candidates) that did not fit
    pub carried: Vec<Candidate>,
}

/// Place a batch of ready candidates into the day's blocks.
///
/// `earliest` maps candidate ids to their eligibility floor (dependency
/// end times, async-wait ends); absent entries mean "whenever".
pub fn place_batch(
    day: &mut DayCapacity,
    candidates: Vec<Candidate>,
    earliest: &BTreeMap<String, DateTime<Utc>>,
    settings: &WorkSettings,
    registry: &WorkTypeRegistry,
    break_seq: &mut u32,
) -> PlacementBatch {
    let mut batch = PlacementBatch::default();

    for mut candidate in candidates {
        let floor = earliest
            .get(&candidate.id)
            .copied()
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut remaining = candidate.minutes;

        for block in &mut day.blocks {
            if remaining == 0 {
                break;
            }
            if block.available_for(&candidate.work_type_id) == 0 {
                continue;
            }

            maybe_insert_break(block, settings, break_seq, &mut batch.placed);

            let available = block.available_for(&candidate.work_type_id);
            if available == 0 {
                continue;
            }

            // Whole-candidate fit first.
            if available >= remaining {
                if let Some(consumed) = block.consume(&candidate.work_type_id, remaining, floor) {
                    batch.placed.push(make_item(
                        &candidate,
                        remaining,
                        consumed.start,
                        consumed.end,
                        &block.block_id,
                        registry,
                    ));
                    candidate.fragment_index += 1;
                    remaining = 0;
                    break;
                }
            }

            // Otherwise cut a fragment, if the policy allows.
            if !settings.splitting.enabled {
                continue;
            }
            let fragment = remaining
                .min(available)
                .min(block.max_contiguous(floor));
            if fragment == 0 || fragment < settings.splitting.min_fragment_minutes {
                continue;
            }
            if let Some(consumed) = block.consume(&candidate.work_type_id, fragment, floor) {
                // A partial cut makes every piece of this candidate a fragment.
                candidate.split = true;
                batch.placed.push(make_item(
                    &candidate,
                    fragment,
                    consumed.start,
                    consumed.end,
                    &block.block_id,
                    registry,
                ));
                candidate.fragment_index += 1;
                remaining -= fragment;
            }
        }

        if remaining > 0 {
            candidate.minutes = remaining;
            batch.carried.push(candidate);
        }
    }

    batch
}

/// Insert a break when the block has accumulated enough continuous work.
/// Breaks consume block time but no typed capacity.
fn maybe_insert_break(
    block: &mut crate::capacity::BlockCapacity,
    settings: &WorkSettings,
    break_seq: &mut u32,
    placed: &mut Vec<ScheduledItem>,
) {
    if !settings.breaks.enabled
        || block.continuous_minutes < settings.breaks.focus_stretch_minutes
    {
        return;
    }
    let minutes = settings.breaks.break_minutes;
    if let Some(range) = block.consume_time_only(minutes, DateTime::<Utc>::MIN_UTC) {
        let id = format!("break-{}", *break_seq);
        *break_seq += 1;
        placed.push(ScheduledItem {
            id: id.clone(),
            kind: ScheduledItemKind::Break,
            source_id: id,
            original_task_id: None,
            workflow_id: None,
            name: "Break".to_string(),
            start: range.start,
            end: range.end,
            duration_minutes: minutes,
            work_type_id: None,
            color: BREAK_COLOR.to_string(),
            block_id: Some(block.block_id.clone()),
        });
    }
}

fn make_item(
    candidate: &Candidate,
    minutes: u32,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    block_id: &str,
    registry: &WorkTypeRegistry,
) -> ScheduledItem {
    let (kind, workflow_id) = match &candidate.kind {
        CandidateKind::Task => (ScheduledItemKind::Task, None),
        CandidateKind::Step { workflow_id, .. } => {
            (ScheduledItemKind::WorkflowStep, Some(workflow_id.clone()))
        }
    };
    let is_fragment = candidate.split || candidate.fragment_index > 0;
    ScheduledItem {
        id: format!("{}#{}", candidate.id, candidate.fragment_index),
        kind,
        source_id: candidate.id.clone(),
        original_task_id: if is_fragment {
            Some(candidate.id.clone())
        } else {
            None
        },
        workflow_id,
        name: candidate.name.clone(),
        start,
        end,
        duration_minutes: minutes,
        work_type_id: Some(candidate.work_type_id.clone()),
        color: registry.color_of(&candidate.work_type_id),
        block_id: Some(block_id.to_string()),
    }
}
