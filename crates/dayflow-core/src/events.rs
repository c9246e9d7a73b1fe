use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::next_item::NextScheduledItem;

/// Every flush of the reactive layer produces events.
/// UI consumers poll or subscribe; the diagnostics export summarizes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlanEvent {
    /// A full compute pass replaced the cached schedule.
    ScheduleRecomputed {
        scheduled_count: usize,
        unscheduled_count: usize,
        conflict_count: usize,
        at: DateTime<Utc>,
    },
    /// Only the next-item projection changed (cheap path).
    NextItemChanged {
        item: Option<NextScheduledItem>,
        at: DateTime<Utc>,
    },
    /// A recompute failed; the previous schedule was retained.
    RecomputeFailed {
        reason: String,
        at: DateTime<Utc>,
    },
    /// The snapshot and cache were cleared for a session switch.
    SnapshotCleared {
        at: DateTime<Utc>,
    },
    /// Flushes are arriving faster than the debounce window.
    /// Operability signal, not a functional error.
    RecomputeStorm {
        flushes_in_window: u32,
        at: DateTime<Utc>,
    },
}
