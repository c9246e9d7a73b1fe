//! Per-day, per-block typed capacity model.
//!
//! Builds the available minutes of a `DailyWorkPattern`: each work block
//! contributes free sub-windows (block range minus meetings and blackouts)
//! and a per-type pool of minutes derived from its allocation. Placement
//! consumes window time and typed minutes together; when a type's pool is
//! exhausted the block's flexible pools may absorb the remainder, recorded
//! as overflow.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::workday::{BlockAllocation, DailyWorkPattern, TimeRange, WorkTypeRegistry};

/// Minutes borrowed from a block's flexible capacity for a non-flexible type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverflowRecord {
    pub block_id: String,
    /// The work type that exhausted its own pool
    pub work_type_id: String,
    pub minutes: u32,
}

/// A free sub-window inside a block, with a placement cursor.
#[derive(Debug, Clone)]
struct FreeWindow {
    end: DateTime<Utc>,
    /// Next unoccupied instant; placements only move it forward
    cursor: DateTime<Utc>,
}

impl FreeWindow {
    fn free_from(&self, earliest: DateTime<Utc>) -> Option<(DateTime<Utc>, i64)> {
        let start = self.cursor.max(earliest);
        let minutes = (self.end - start).num_minutes();
        if minutes <= 0 {
            None
        } else {
            Some((start, minutes))
        }
    }
}

/// Where a placement landed and what it consumed.
#[derive(Debug, Clone)]
pub struct Consumption {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub typed_minutes: u32,
    pub flexible_minutes: u32,
}

/// One block's remaining capacity during placement.
#[derive(Debug, Clone)]
pub struct BlockCapacity {
    pub block_id: String,
    pub date: NaiveDate,
    pub range: TimeRange,
    /// Remaining minutes per work type (flexible types included under
    /// their own ids)
    pools: BTreeMap<String, u32>,
    /// Which pool ids are flexible, in deterministic order
    flexible_ids: Vec<String>,
    /// Consumed minutes per work type
    used: BTreeMap<String, u32>,
    /// Free minutes when the block was built
    pub initial_free_minutes: u32,
    windows: Vec<FreeWindow>,
    /// Continuous placed work since the last break, for break insertion
    pub continuous_minutes: u32,
    /// Flexible minutes lent to other types
    pub overflow: Vec<OverflowRecord>,
}

impl BlockCapacity {
    fn build(
        block: &crate::workday::WorkBlock,
        occupied: &[TimeRange],
        registry: &WorkTypeRegistry,
        not_before: Option<DateTime<Utc>>,
    ) -> Self {
        let floor = not_before.unwrap_or(block.start).max(block.start);
        let windows = free_windows(block.start, block.end, occupied, floor);
        let free_total: i64 = windows.iter().map(|w| (w.end - w.cursor).num_minutes()).sum();
        let free_total = free_total.max(0) as u32;

        let mut pools = BTreeMap::new();
        match &block.allocation {
            BlockAllocation::Single { work_type_id } => {
                pools.insert(work_type_id.clone(), free_total);
            }
            BlockAllocation::Split { ratios } => {
                for (work_type_id, ratio) in ratios {
                    let minutes = (free_total as f64 * ratio).floor() as u32;
                    *pools.entry(work_type_id.clone()).or_insert(0) += minutes;
                }
            }
        }
        let flexible_ids: Vec<String> = pools
            .keys()
            .filter(|id| registry.is_flexible(id))
            .cloned()
            .collect();

        BlockCapacity {
            block_id: block.id.clone(),
            date: block.date,
            range: block.range(),
            pools,
            flexible_ids,
            used: BTreeMap::new(),
            initial_free_minutes: free_total,
            windows,
            continuous_minutes: 0,
            overflow: Vec::new(),
        }
    }

    /// Remaining minutes in a type's own pool.
    pub fn typed_remaining(&self, work_type_id: &str) -> u32 {
        self.pools.get(work_type_id).copied().unwrap_or(0)
    }

    /// Remaining flexible minutes across this block's flexible pools.
    pub fn flexible_remaining(&self) -> u32 {
        self.flexible_ids.iter().map(|id| self.typed_remaining(id)).sum()
    }

    /// Minutes available to a candidate of the given type, counting
    /// flexible spill (a flexible candidate only uses its own pool).
    pub fn available_for(&self, work_type_id: &str) -> u32 {
        if self.flexible_ids.iter().any(|id| id == work_type_id) {
            self.typed_remaining(work_type_id)
        } else {
            self.typed_remaining(work_type_id) + self.flexible_remaining()
        }
    }

    /// Total consumed minutes across all types.
    pub fn used_minutes(&self) -> u32 {
        self.used.values().sum()
    }

    /// Consumed minutes per work type, for utilization reporting.
    pub fn used_by_type(&self) -> &BTreeMap<String, u32> {
        &self.used
    }

    /// Remaining minutes per work type.
    pub fn remaining_by_type(&self) -> &BTreeMap<String, u32> {
        &self.pools
    }

    /// Earliest start for a contiguous placement of `minutes`, no earlier
    /// than `earliest`. Returns None if no window has room.
    pub fn fit_contiguous(&self, minutes: u32, earliest: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.windows
            .iter()
            .find_map(|w| w.free_from(earliest).filter(|(_, free)| *free >= minutes as i64))
            .map(|(start, _)| start)
    }

    /// Largest contiguous span available from `earliest`, across windows.
    pub fn max_contiguous(&self, earliest: DateTime<Utc>) -> u32 {
        self.windows
            .iter()
            .filter_map(|w| w.free_from(earliest).map(|(_, free)| free))
            .max()
            .unwrap_or(0) as u32
    }

    /// Consume `minutes` of window time starting at the earliest fit,
    /// drawing first from the type's own pool and then from flexible.
    ///
    /// Returns None when no window fits or the combined pools are short.
    /// A successful consumption records overflow when flexible minutes
    /// were borrowed.
    pub fn consume(
        &mut self,
        work_type_id: &str,
        minutes: u32,
        earliest: DateTime<Utc>,
    ) -> Option<Consumption> {
        if minutes == 0 || self.available_for(work_type_id) < minutes {
            return None;
        }
        let window_idx = self.windows.iter().position(|w| {
            w.free_from(earliest)
                .map(|(_, free)| free >= minutes as i64)
                .unwrap_or(false)
        })?;
        let (start, _) = self.windows[window_idx].free_from(earliest).unwrap();
        let end = start + Duration::minutes(minutes as i64);
        self.windows[window_idx].cursor = end;

        let own = self.typed_remaining(work_type_id).min(minutes);
        let mut spill = minutes - own;
        if own > 0 {
            *self.pools.get_mut(work_type_id).unwrap() -= own;
        }
        if spill > 0 {
            self.overflow.push(OverflowRecord {
                block_id: self.block_id.clone(),
                work_type_id: work_type_id.to_string(),
                minutes: spill,
            });
            let flexible_ids = self.flexible_ids.clone();
            for id in &flexible_ids {
                if spill == 0 {
                    break;
                }
                let pool = self.pools.get_mut(id).unwrap();
                let taken = (*pool).min(spill);
                *pool -= taken;
                spill -= taken;
            }
        }
        *self.used.entry(work_type_id.to_string()).or_insert(0) += minutes;
        self.continuous_minutes += minutes;

        Some(Consumption {
            start,
            end,
            typed_minutes: own,
            flexible_minutes: minutes - own,
        })
    }

    /// Consume window time only (breaks): no type is charged as used, but
    /// the pools shrink because the minutes are no longer reachable.
    pub fn consume_time_only(
        &mut self,
        minutes: u32,
        earliest: DateTime<Utc>,
    ) -> Option<TimeRange> {
        let window_idx = self.windows.iter().position(|w| {
            w.free_from(earliest)
                .map(|(_, free)| free >= minutes as i64)
                .unwrap_or(false)
        })?;
        let (start, _) = self.windows[window_idx].free_from(earliest).unwrap();
        let end = start + Duration::minutes(minutes as i64);
        self.windows[window_idx].cursor = end;
        self.shrink_pools(minutes);
        self.continuous_minutes = 0;
        Some(TimeRange::new(start, end))
    }

    fn shrink_pools(&mut self, mut minutes: u32) {
        for value in self.pools.values_mut() {
            if minutes == 0 {
                break;
            }
            let cut = (*value).min(minutes);
            *value -= cut;
            minutes -= cut;
        }
    }
}

/// Compute free windows: the block range minus occupied intervals, with
/// every window clamped to start no earlier than `floor`.
fn free_windows(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    occupied: &[TimeRange],
    floor: DateTime<Utc>,
) -> Vec<FreeWindow> {
    let mut sorted: Vec<TimeRange> = occupied
        .iter()
        .filter(|r| r.start < end && r.end > start)
        .copied()
        .collect();
    sorted.sort_by_key(|r| r.start);

    let mut windows = Vec::new();
    let mut last_end = start;
    for range in &sorted {
        if range.end <= last_end {
            continue;
        }
        if range.start > last_end {
            push_window(&mut windows, last_end, range.start.min(end), floor);
        }
        last_end = last_end.max(range.end.min(end));
    }
    if last_end < end {
        push_window(&mut windows, last_end, end, floor);
    }
    windows
}

fn push_window(
    windows: &mut Vec<FreeWindow>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    floor: DateTime<Utc>,
) {
    let clamped = start.max(floor);
    if clamped < end {
        windows.push(FreeWindow {
            end,
            cursor: clamped,
        });
    }
}

/// One day's capacity: the pattern's blocks in chronological order.
#[derive(Debug, Clone)]
pub struct DayCapacity {
    pub date: NaiveDate,
    pub blocks: Vec<BlockCapacity>,
}

impl DayCapacity {
    /// Build from a pattern. Meetings and blackouts are unavailable time.
    /// A pattern with zero blocks yields zero capacity for every type --
    /// that is not an error, just an empty day.
    pub fn from_pattern(
        pattern: &DailyWorkPattern,
        registry: &WorkTypeRegistry,
        not_before: Option<DateTime<Utc>>,
    ) -> Self {
        let occupied = pattern.occupied();
        let mut blocks: Vec<BlockCapacity> = pattern
            .blocks
            .iter()
            .map(|b| BlockCapacity::build(b, &occupied, registry, not_before))
            .collect();
        blocks.sort_by(|a, b| a.range.start.cmp(&b.range.start).then(a.block_id.cmp(&b.block_id)));
        DayCapacity {
            date: pattern.date,
            blocks,
        }
    }

    /// Remaining minutes allocated to a work type across all blocks on
    /// this date (directly or via split ratios).
    pub fn capacity_for(&self, work_type_id: &str) -> u32 {
        self.blocks.iter().map(|b| b.typed_remaining(work_type_id)).sum()
    }

    /// Remaining minutes usable by a candidate of this type, counting
    /// flexible spill.
    pub fn available_for(&self, work_type_id: &str) -> u32 {
        self.blocks.iter().map(|b| b.available_for(work_type_id)).sum()
    }

    /// Unused capacity per work type, for diagnostics.
    pub fn unused_by_type(&self) -> BTreeMap<String, u32> {
        let mut unused = BTreeMap::new();
        for block in &self.blocks {
            for (type_id, minutes) in block.remaining_by_type() {
                if *minutes > 0 {
                    *unused.entry(type_id.clone()).or_insert(0) += *minutes;
                }
            }
        }
        unused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workday::{Meeting, WorkBlock, WorkType};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn registry() -> WorkTypeRegistry {
        WorkTypeRegistry::new(&WorkType::defaults())
    }

    fn focus_block(start: DateTime<Utc>, end: DateTime<Utc>) -> WorkBlock {
        WorkBlock::new(
            "block-1",
            date(),
            start,
            end,
            BlockAllocation::Single {
                work_type_id: "focus".to_string(),
            },
        )
    }

    fn pattern_with(blocks: Vec<WorkBlock>) -> DailyWorkPattern {
        DailyWorkPattern {
            date: date(),
            blocks,
            meetings: Vec::new(),
            blocked_times: Vec::new(),
        }
    }

    #[test]
    fn single_block_full_capacity() {
        let day = DayCapacity::from_pattern(
            &pattern_with(vec![focus_block(at(9, 0), at(11, 0))]),
            &registry(),
            None,
        );
        assert_eq!(day.capacity_for("focus"), 120);
        assert_eq!(day.capacity_for("admin"), 0);
    }

    #[test]
    fn meetings_reduce_capacity_and_split_windows() {
        let mut pattern = pattern_with(vec![focus_block(at(9, 0), at(12, 0))]);
        pattern.meetings.push(Meeting {
            id: "m1".to_string(),
            name: "Standup".to_string(),
            start: at(10, 0),
            end: at(10, 30),
        });
        let mut day = DayCapacity::from_pattern(&pattern, &registry(), None);
        assert_eq!(day.capacity_for("focus"), 150);

        // A 90-minute item cannot fit before the meeting; it lands after.
        let block = &mut day.blocks[0];
        let consumption = block.consume("focus", 90, at(9, 0)).unwrap();
        assert_eq!(consumption.start, at(10, 30));
        assert_eq!(consumption.end, at(12, 0));
    }

    #[test]
    fn split_allocation_floors_per_type() {
        let day = DayCapacity::from_pattern(
            &pattern_with(vec![WorkBlock::new(
                "block-1",
                date(),
                at(9, 0),
                at(10, 40), // 100 minutes
                BlockAllocation::Split {
                    ratios: vec![
                        ("focus".to_string(), 0.65),
                        ("admin".to_string(), 0.35),
                    ],
                },
            )]),
            &registry(),
            None,
        );
        assert_eq!(day.capacity_for("focus"), 65);
        assert_eq!(day.capacity_for("admin"), 35);
    }

    #[test]
    fn flexible_spill_records_overflow() {
        let mut day = DayCapacity::from_pattern(
            &pattern_with(vec![WorkBlock::new(
                "block-1",
                date(),
                at(9, 0),
                at(11, 0),
                BlockAllocation::Split {
                    ratios: vec![
                        ("focus".to_string(), 0.5),
                        ("flexible".to_string(), 0.5),
                    ],
                },
            )]),
            &registry(),
            None,
        );
        let block = &mut day.blocks[0];
        assert_eq!(block.typed_remaining("focus"), 60);
        assert_eq!(block.flexible_remaining(), 60);

        let consumption = block.consume("focus", 90, at(9, 0)).unwrap();
        assert_eq!(consumption.typed_minutes, 60);
        assert_eq!(consumption.flexible_minutes, 30);
        assert_eq!(block.overflow.len(), 1);
        assert_eq!(block.overflow[0].minutes, 30);
        assert_eq!(block.flexible_remaining(), 30);
    }

    #[test]
    fn flexible_candidate_uses_only_its_own_pool() {
        let day = DayCapacity::from_pattern(
            &pattern_with(vec![WorkBlock::new(
                "block-1",
                date(),
                at(9, 0),
                at(11, 0),
                BlockAllocation::Split {
                    ratios: vec![
                        ("focus".to_string(), 0.5),
                        ("flexible".to_string(), 0.5),
                    ],
                },
            )]),
            &registry(),
            None,
        );
        assert_eq!(day.available_for("flexible"), 60);
        assert_eq!(day.available_for("focus"), 120);
    }

    #[test]
    fn consume_rejects_over_capacity() {
        let mut day = DayCapacity::from_pattern(
            &pattern_with(vec![focus_block(at(9, 0), at(10, 0))]),
            &registry(),
            None,
        );
        assert!(day.blocks[0].consume("focus", 61, at(9, 0)).is_none());
        assert!(day.blocks[0].consume("admin", 10, at(9, 0)).is_none());
    }

    #[test]
    fn zero_blocks_zero_capacity() {
        let day = DayCapacity::from_pattern(&DailyWorkPattern::new(date()), &registry(), None);
        assert_eq!(day.capacity_for("focus"), 0);
        assert!(day.blocks.is_empty());
    }

    #[test]
    fn not_before_trims_elapsed_time() {
        let day = DayCapacity::from_pattern(
            &pattern_with(vec![focus_block(at(9, 0), at(11, 0))]),
            &registry(),
            Some(at(10, 0)),
        );
        assert_eq!(day.capacity_for("focus"), 60);
    }

    #[test]
    fn midnight_spanning_block_counts_fully() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 22, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, 11, 1, 0, 0).unwrap();
        let day = DayCapacity::from_pattern(
            &pattern_with(vec![focus_block(start, end)]),
            &registry(),
            None,
        );
        assert_eq!(day.date, date());
        assert_eq!(day.capacity_for("focus"), 180);
    }

    #[test]
    fn break_consumption_charges_no_type() {
        let mut day = DayCapacity::from_pattern(
            &pattern_with(vec![focus_block(at(9, 0), at(11, 0))]),
            &registry(),
            None,
        );
        let block = &mut day.blocks[0];
        block.consume("focus", 30, at(9, 0)).unwrap();
        assert_eq!(block.continuous_minutes, 30);

        let range = block.consume_time_only(10, at(9, 0)).unwrap();
        assert_eq!(range.start, at(9, 30));
        assert_eq!(block.continuous_minutes, 0);
        // Pool shrinks with the lost time: 120 - 30 used - 10 break.
        assert_eq!(block.typed_remaining("focus"), 80);
        assert_eq!(block.used_minutes(), 30);
    }
}
