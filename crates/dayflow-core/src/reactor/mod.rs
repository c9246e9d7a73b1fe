//! Reactive coordination layer.
//!
//! Owns the authoritative input snapshot and the cached `ScheduleResult`.
//! Upstream stores push partial updates; a debounce window coalesces bursts
//! into one flush; the flush classifies the merged window and runs the
//! cheapest sufficient path:
//!
//! - tasks / workflows / patterns / settings changed -> full recompute
//! - only active sessions changed -> next-item refresh against the cached
//!   result (placements untouched, no visual churn)
//! - only the skip cursor changed -> next-item refresh
//!
//! Like the timer engine this layer is a wall-clock-free state machine: it
//! spawns no threads and the caller drives it by invoking `tick()` with the
//! current time. `PlannerService` wraps it in a tokio loop for production
//! use.

mod service;

pub use service::PlannerService;

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::config::WorkSettings;
use crate::events::PlanEvent;
use crate::next_item::{select_next, NextScheduledItem};
use crate::scheduler::{PlannerInputs, ScheduleResult, SchedulerEngine};
use crate::task::{ActiveWorkSession, Task, Workflow};
use crate::workday::DailyWorkPattern;

/// A typed partial update. Which field changed is a pattern match, not an
/// object diff.
#[derive(Debug, Clone)]
pub enum InputsUpdate {
    Tasks(Vec<Task>),
    Workflows(Vec<Workflow>),
    WorkPatterns(Vec<DailyWorkPattern>),
    Settings(WorkSettings),
    ActiveSessions(Vec<ActiveWorkSession>),
    SkipIndex(usize),
}

impl InputsUpdate {
    /// Whether this update can change placements (vs. projections only).
    pub fn affects_schedule(&self) -> bool {
        matches!(
            self,
            InputsUpdate::Tasks(_)
                | InputsUpdate::Workflows(_)
                | InputsUpdate::WorkPatterns(_)
                | InputsUpdate::Settings(_)
        )
    }
}

/// What a flushed window requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushKind {
    Full,
    NextItemOnly,
    Nothing,
}

/// The reactive planner core.
///
/// Single writer: all mutations of the snapshot and the cached result
/// happen through this struct. Consumers receive the result as an `Arc`
/// and must treat each publication as immutable.
pub struct PlanReactor {
    engine: SchedulerEngine,
    snapshot: PlannerInputs,
    result: Option<Arc<ScheduleResult>>,
    next_item: Option<NextScheduledItem>,
    buffer: Vec<InputsUpdate>,
    deadline: Option<DateTime<Utc>>,
    last_flush: Option<DateTime<Utc>>,
    /// Most recent pass failure, surfaced through diagnostics
    last_error: Option<String>,
}

impl PlanReactor {
    pub fn new(now: DateTime<Utc>) -> Self {
        PlanReactor {
            engine: SchedulerEngine::new(),
            snapshot: PlannerInputs::new(now),
            result: None,
            next_item: None,
            buffer: Vec::new(),
            deadline: None,
            last_flush: None,
            last_error: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Latest published schedule, if any pass has succeeded.
    pub fn current_schedule(&self) -> Option<Arc<ScheduleResult>> {
        self.result.clone()
    }

    pub fn current_next_item(&self) -> Option<&NextScheduledItem> {
        self.next_item.as_ref()
    }

    pub fn snapshot(&self) -> &PlannerInputs {
        &self.snapshot
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// When the pending window will flush, if one is armed.
    pub fn pending_deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Enqueue a partial update. Each arrival re-arms the single debounce
    /// deadline, so a burst settles into one flush reflecting the final
    /// merged state.
    pub fn apply(&mut self, update: InputsUpdate, now: DateTime<Utc>) {
        self.buffer.push(update);
        self.deadline = Some(now + Duration::milliseconds(self.snapshot.settings.debounce_ms as i64));
    }

    /// Move the skip cursor and refresh the projection immediately.
    ///
    /// The cursor cannot change placements, so it bypasses the debounce
    /// window; the cached schedule is reused untouched.
    pub fn set_skip_index(&mut self, index: usize, now: DateTime<Utc>) -> Vec<PlanEvent> {
        self.snapshot.skip_index = index;
        self.refresh_next_item(now)
    }

    /// Drive the debounce window. Returns the events of at most one flush;
    /// empty when the deadline has not passed.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<PlanEvent> {
        match self.deadline {
            Some(deadline) if now >= deadline => self.flush(now),
            _ => Vec::new(),
        }
    }

    /// Flush any pending updates and recompute unconditionally.
    pub fn force_recompute(&mut self, now: DateTime<Utc>) -> Vec<PlanEvent> {
        self.merge_buffer(now);
        self.deadline = None;
        let mut events = self.storm_events(now);
        self.last_flush = Some(now);
        events.extend(self.recompute(now));
        events
    }

    /// Session-switch reset: drop the snapshot and cache entirely so the
    /// next update is a clean full recompute, never diffed against stale
    /// data.
    pub fn clear(&mut self, now: DateTime<Utc>) -> Vec<PlanEvent> {
        self.snapshot = PlannerInputs::new(now);
        self.result = None;
        self.next_item = None;
        self.buffer.clear();
        self.deadline = None;
        self.last_flush = None;
        self.last_error = None;
        vec![PlanEvent::SnapshotCleared { at: now }]
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn flush(&mut self, now: DateTime<Utc>) -> Vec<PlanEvent> {
        let kind = self.classify();
        self.merge_buffer(now);
        self.deadline = None;
        let mut events = self.storm_events(now);
        self.last_flush = Some(now);

        match kind {
            FlushKind::Full => events.extend(self.recompute(now)),
            FlushKind::NextItemOnly => events.extend(self.refresh_next_item(now)),
            FlushKind::Nothing => {}
        }
        events
    }

    fn classify(&self) -> FlushKind {
        if self.buffer.is_empty() {
            FlushKind::Nothing
        } else if self.buffer.iter().any(|u| u.affects_schedule()) {
            FlushKind::Full
        } else {
            FlushKind::NextItemOnly
        }
    }

    /// Merge buffered updates in arrival order; later writes win per field.
    fn merge_buffer(&mut self, now: DateTime<Utc>) {
        if self.buffer.is_empty() {
            return;
        }
        for update in self.buffer.drain(..) {
            match update {
                InputsUpdate::Tasks(tasks) => self.snapshot.tasks = tasks,
                InputsUpdate::Workflows(workflows) => self.snapshot.workflows = workflows,
                InputsUpdate::WorkPatterns(patterns) => self.snapshot.patterns = patterns,
                InputsUpdate::Settings(settings) => self.snapshot.settings = settings,
                InputsUpdate::ActiveSessions(sessions) => {
                    self.snapshot.active_sessions = sessions
                }
                InputsUpdate::SkipIndex(index) => self.snapshot.skip_index = index,
            }
        }
        self.snapshot.captured_at = now;
    }

    /// Flushes landing closer together than the debounce window mean some
    /// upstream is outpacing coalescing. Operability warning only.
    fn storm_events(&self, now: DateTime<Utc>) -> Vec<PlanEvent> {
        let Some(last) = self.last_flush else {
            return Vec::new();
        };
        let window = Duration::milliseconds(self.snapshot.settings.debounce_ms as i64);
        if now - last < window {
            vec![PlanEvent::RecomputeStorm {
                flushes_in_window: 2,
                at: now,
            }]
        } else {
            Vec::new()
        }
    }

    /// Full pipeline: compute, publish, re-derive the projection.
    /// On failure the previous result is retained so consumers always
    /// have something valid to show.
    fn recompute(&mut self, now: DateTime<Utc>) -> Vec<PlanEvent> {
        match self.engine.compute(&self.snapshot) {
            Ok(result) => {
                self.last_error = None;
                let mut events = vec![PlanEvent::ScheduleRecomputed {
                    scheduled_count: result.scheduled.len(),
                    unscheduled_count: result.unscheduled.len(),
                    conflict_count: result.conflicts.len(),
                    at: now,
                }];
                self.result = Some(Arc::new(result));
                events.extend(self.refresh_next_item(now));
                events
            }
            Err(err) => {
                self.last_error = Some(err.to_string());
                vec![PlanEvent::RecomputeFailed {
                    reason: err.to_string(),
                    at: now,
                }]
            }
        }
    }

    /// Cheap path: re-derive the next item from the cached result. The
    /// schedule itself is not touched.
    fn refresh_next_item(&mut self, now: DateTime<Utc>) -> Vec<PlanEvent> {
        let next = self
            .result
            .as_ref()
            .and_then(|r| select_next(r, self.snapshot.skip_index, &self.snapshot));
        if next == self.next_item {
            return Vec::new();
        }
        self.next_item = next.clone();
        vec![PlanEvent::NextItemChanged { item: next, at: now }]
    }
}
