//! Work-day structure: typed work blocks, meetings, and daily patterns.
//!
//! A `DailyWorkPattern` describes one calendar day: an ordered list of
//! `WorkBlock`s (each allocating its minutes to one or more work types),
//! fixed `Meeting`s, and personal blackout intervals. Patterns are
//! immutable for the duration of a compute pass.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A user-defined category of work time with independent capacity accounting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkType {
    /// Unique identifier (e.g. "focus", "admin")
    pub id: String,
    /// Display name
    pub name: String,
    /// Display color (hex) carried onto scheduled items
    pub color: String,
    /// Flexible types absorb overflow from exhausted typed capacity
    #[serde(default)]
    pub flexible: bool,
}

impl WorkType {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        WorkType {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            flexible: false,
        }
    }

    /// Mark this type as flexible overflow capacity.
    pub fn flexible(mut self) -> Self {
        self.flexible = true;
        self
    }

    /// The built-in default types: focus, admin, personal, flexible.
    pub fn defaults() -> Vec<WorkType> {
        vec![
            WorkType::new("focus", "Focused", "#3b82f6"),
            WorkType::new("admin", "Admin", "#f59e0b"),
            WorkType::new("personal", "Personal", "#10b981"),
            WorkType::new("flexible", "Flexible", "#8b5cf6").flexible(),
        ]
    }
}

/// Lookup table for work types, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct WorkTypeRegistry {
    types: BTreeMap<String, WorkType>,
}

impl WorkTypeRegistry {
    pub fn new(types: &[WorkType]) -> Self {
        WorkTypeRegistry {
            types: types.iter().map(|t| (t.id.clone(), t.clone())).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&WorkType> {
        self.types.get(id)
    }

    pub fn is_flexible(&self, id: &str) -> bool {
        self.types.get(id).map(|t| t.flexible).unwrap_or(false)
    }

    /// Display color for a work type; unknown types get a neutral gray.
    pub fn color_of(&self, id: &str) -> String {
        self.types
            .get(id)
            .map(|t| t.color.clone())
            .unwrap_or_else(|| "#6b7280".to_string())
    }
}

/// A half-open time interval [start, end).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        TimeRange { start, end }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// How a block's minutes are allocated across work types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BlockAllocation {
    /// The whole block belongs to one work type.
    Single { work_type_id: String },
    /// The block is split across several types by ratio.
    /// Ratios should sum to 1.0; per-type minutes are floored and any
    /// remainder stays unallocated.
    Split { ratios: Vec<(String, f64)> },
}

/// A contiguous time range on a given date with a capacity allocation.
///
/// A block spanning midnight contributes its full duration to the date it
/// starts on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkBlock {
    pub id: String,
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub allocation: BlockAllocation,
}

impl WorkBlock {
    pub fn new(
        id: impl Into<String>,
        date: NaiveDate,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        allocation: BlockAllocation,
    ) -> Self {
        WorkBlock {
            id: id.into(),
            date,
            start,
            end,
            allocation,
        }
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// A fixed, non-negotiable occupied interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Meeting {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}

/// One calendar day's work structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyWorkPattern {
    pub date: NaiveDate,
    /// Ordered work blocks
    pub blocks: Vec<WorkBlock>,
    /// Fixed meetings occupying time inside (or outside) blocks
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    /// Personal blackout intervals, surfaced as BlockedTime items
    #[serde(default)]
    pub blocked_times: Vec<TimeRange>,
}

impl DailyWorkPattern {
    pub fn new(date: NaiveDate) -> Self {
        DailyWorkPattern {
            date,
            blocks: Vec::new(),
            meetings: Vec::new(),
            blocked_times: Vec::new(),
        }
    }

    /// All occupied intervals (meetings + blackouts), unsorted.
    pub fn occupied(&self) -> Vec<TimeRange> {
        self.meetings
            .iter()
            .map(|m| m.range())
            .chain(self.blocked_times.iter().copied())
            .collect()
    }
}
