//! The scheduling engine.
//!
//! One compute pass is a pure, synchronous function of an input snapshot:
//!
//! ```text
//! CollectCandidates -> ResolveDependencies -> PlaceForDay -> AdvanceDay | Done
//! ```
//!
//! - CollectCandidates excludes completed items, items covered by an active
//!   session, and items with no remaining minutes; workflows expand into
//!   steps.
//! - ResolveDependencies topologically checks each workflow; a cycle aborts
//!   the whole pass.
//! - PlaceForDay runs the placement algorithm against that day's capacity;
//!   leftovers carry forward; steps become eligible as their dependencies
//!   (and async waits) resolve.
//! - When the pattern list is exhausted, remaining candidates are reported
//!   unscheduled, never forced.

mod placement;
mod priority;
mod result;

pub use placement::{place_batch, PlacementBatch};
pub use priority::PriorityCalculator;
pub use result::{
    BlockUtilization, Conflict, ConflictKind, ScheduleDebugInfo, ScheduleResult, ScheduledItem,
    ScheduledItemKind, UnscheduledEntry,
};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet};

use crate::capacity::DayCapacity;
use crate::config::WorkSettings;
use crate::error::ScheduleError;
use crate::task::{ActiveWorkSession, DeadlineKind, StepStatus, Task, Workflow};
use crate::workday::{DailyWorkPattern, Meeting, TimeRange, WorkTypeRegistry};

pub(crate) const BREAK_COLOR: &str = "#9ca3af";
const MEETING_COLOR: &str = "#64748b";
const BLOCKED_COLOR: &str = "#475569";
const WAIT_COLOR: &str = "#cbd5e1";

/// A schedulable unit: a task, or one workflow step.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    /// Minutes still to place (shrinks as fragments are cut)
    pub minutes: u32,
    pub work_type_id: String,
    pub importance: u32,
    pub urgency: u32,
    pub deadline: Option<DateTime<Utc>>,
    pub deadline_kind: DeadlineKind,
    pub created_at: DateTime<Utc>,
    pub kind: CandidateKind,
    /// Next fragment number for deterministic item ids
    pub fragment_index: u32,
    /// Set once the candidate has been cut at least once
    pub split: bool,
}

#[derive(Debug, Clone)]
pub enum CandidateKind {
    Task,
    Step {
        workflow_id: String,
        workflow_name: String,
        step_index: u32,
        depends_on: Vec<String>,
        async_wait_minutes: u32,
        is_async_trigger: bool,
        /// Longest remaining chain below this step, for deadline pressure
        chain_remaining_minutes: u32,
    },
}

impl Candidate {
    fn depends_on(&self) -> &[String] {
        match &self.kind {
            CandidateKind::Task => &[],
            CandidateKind::Step { depends_on, .. } => depends_on,
        }
    }

    fn async_wait_minutes(&self) -> u32 {
        match &self.kind {
            CandidateKind::Task => 0,
            CandidateKind::Step {
                async_wait_minutes, ..
            } => *async_wait_minutes,
        }
    }

    fn workflow(&self) -> Option<(&str, &str)> {
        match &self.kind {
            CandidateKind::Task => None,
            CandidateKind::Step {
                workflow_id,
                workflow_name,
                ..
            } => Some((workflow_id, workflow_name)),
        }
    }
}

/// Immutable snapshot of everything one compute pass reads.
#[derive(Debug, Clone, Default)]
pub struct PlannerInputs {
    pub tasks: Vec<Task>,
    pub workflows: Vec<Workflow>,
    pub patterns: Vec<DailyWorkPattern>,
    pub settings: WorkSettings,
    pub active_sessions: Vec<ActiveWorkSession>,
    pub skip_index: usize,
    /// When the snapshot was taken; the pass never reads the OS clock
    pub captured_at: DateTime<Utc>,
}

impl PlannerInputs {
    pub fn new(captured_at: DateTime<Utc>) -> Self {
        PlannerInputs {
            captured_at,
            ..Default::default()
        }
    }

    /// Ids of tasks/steps currently covered by an active session.
    pub fn active_target_ids(&self) -> BTreeSet<String> {
        self.active_sessions
            .iter()
            .map(|s| s.target_id.clone())
            .collect()
    }
}

/// Per-workflow dependency analysis.
struct WorkflowAnalysis {
    /// Longest remaining chain (work + waits) starting at each step
    chain: BTreeMap<String, u32>,
    /// Step sequence of the longest chain, pending steps only
    critical_path: Vec<String>,
    critical_minutes: u32,
}

/// The scheduling engine. Stateless: all policy comes from the snapshot's
/// settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerEngine;

impl SchedulerEngine {
    pub fn new() -> Self {
        SchedulerEngine
    }

    /// Run one compute pass.
    ///
    /// Capacity exhaustion and input corruption are reported inside the
    /// result; only a dependency cycle fails the pass.
    pub fn compute(&self, inputs: &PlannerInputs) -> Result<ScheduleResult, ScheduleError> {
        let mut warnings: Vec<String> = Vec::new();
        let registry = WorkTypeRegistry::new(&inputs.settings.work_types);
        let calculator =
            PriorityCalculator::new(inputs.settings.priority.clone(), inputs.captured_at);
        let active = inputs.active_target_ids();

        // ── CollectCandidates ────────────────────────────────────────────
        let mut availability: BTreeMap<String, DateTime<Utc>> = BTreeMap::new();
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut critical: Option<(u32, Vec<String>)> = None;

        for task in &inputs.tasks {
            if task.id.is_empty() {
                warnings.push(format!("dropped task without id: '{}'", task.name));
                continue;
            }
            if task.completed || active.contains(&task.id) {
                continue;
            }
            let remaining = task.remaining_minutes();
            if remaining == 0 {
                continue;
            }
            candidates.push(Candidate {
                id: task.id.clone(),
                name: task.name.clone(),
                minutes: remaining,
                work_type_id: task.work_type_id.clone(),
                importance: task.importance,
                urgency: task.urgency,
                deadline: task.deadline,
                deadline_kind: task.deadline_kind,
                created_at: task.created_at,
                kind: CandidateKind::Task,
                fragment_index: 0,
                split: false,
            });
        }

        for workflow in &inputs.workflows {
            if workflow.id.is_empty() {
                warnings.push(format!("dropped workflow without id: '{}'", workflow.name));
                continue;
            }
            if workflow.steps.is_empty() {
                warnings.push(format!("dropped workflow with no steps: '{}'", workflow.id));
                continue;
            }
            // ── ResolveDependencies ──────────────────────────────────────
            let analysis = analyze_workflow(workflow)?;
            if critical
                .as_ref()
                .map(|(best, _)| analysis.critical_minutes > *best)
                .unwrap_or(analysis.critical_minutes > 0)
            {
                critical = Some((analysis.critical_minutes, analysis.critical_path.clone()));
            }

            for step in &workflow.steps {
                let wait = Duration::minutes(step.async_wait_minutes as i64);
                match step.status {
                    StepStatus::Completed => {
                        availability.insert(step.id.clone(), DateTime::<Utc>::MIN_UTC);
                        continue;
                    }
                    StepStatus::Waiting => {
                        // Wait start is unknown here; assume the full wait
                        // remains so dependents are never placed too early.
                        availability.insert(step.id.clone(), inputs.captured_at + wait);
                        continue;
                    }
                    StepStatus::Pending | StepStatus::InProgress => {}
                }
                let remaining = step.remaining_minutes();
                if active.contains(&step.id) {
                    let work = Duration::minutes(remaining as i64);
                    availability.insert(step.id.clone(), inputs.captured_at + work + wait);
                    continue;
                }
                if remaining == 0 {
                    availability.insert(step.id.clone(), inputs.captured_at + wait);
                    continue;
                }
                let known: BTreeSet<&str> =
                    workflow.steps.iter().map(|s| s.id.as_str()).collect();
                let depends_on: Vec<String> = step
                    .depends_on
                    .iter()
                    .filter(|dep| {
                        if known.contains(dep.as_str()) {
                            true
                        } else {
                            warnings.push(format!(
                                "step '{}' depends on unknown step '{}'",
                                step.id, dep
                            ));
                            false
                        }
                    })
                    .cloned()
                    .collect();
                candidates.push(Candidate {
                    id: step.id.clone(),
                    name: step.name.clone(),
                    minutes: remaining,
                    work_type_id: step.work_type_id.clone(),
                    importance: workflow.importance,
                    urgency: workflow.urgency,
                    deadline: workflow.deadline,
                    deadline_kind: workflow.deadline_kind,
                    created_at: workflow.created_at,
                    kind: CandidateKind::Step {
                        workflow_id: workflow.id.clone(),
                        workflow_name: workflow.name.clone(),
                        step_index: step.step_index,
                        depends_on,
                        async_wait_minutes: step.async_wait_minutes,
                        is_async_trigger: step.is_async_trigger,
                        chain_remaining_minutes: analysis
                            .chain
                            .get(&step.id)
                            .copied()
                            .unwrap_or(0),
                    },
                    fragment_index: 0,
                    split: false,
                });
            }
        }

        let candidate_ids: BTreeSet<String> = candidates.iter().map(|c| c.id.clone()).collect();
        let is_ready = |c: &Candidate, availability: &BTreeMap<String, DateTime<Utc>>| {
            c.depends_on()
                .iter()
                .all(|dep| availability.contains_key(dep) || !candidate_ids.contains(dep))
        };
        let mut ready: Vec<Candidate> = Vec::new();
        let mut pending: Vec<Candidate> = Vec::new();
        for candidate in candidates {
            if is_ready(&candidate, &availability) {
                ready.push(candidate);
            } else {
                pending.push(candidate);
            }
        }

        // ── PlaceForDay / AdvanceDay ─────────────────────────────────────
        let mut scheduled: Vec<ScheduledItem> = Vec::new();
        let mut wait_items: Vec<ScheduledItem> = Vec::new();
        let mut days: Vec<DayCapacity> = Vec::new();
        let mut break_seq = 0u32;

        let mut patterns = inputs.patterns.clone();
        patterns.sort_by_key(|p| p.date);

        for pattern in &patterns {
            surface_fixed_items(pattern, &mut scheduled);
            let mut day =
                DayCapacity::from_pattern(pattern, &registry, Some(inputs.captured_at));

            loop {
                let (promoted, still_pending): (Vec<_>, Vec<_>) = pending
                    .into_iter()
                    .partition(|c| is_ready(c, &availability));
                pending = still_pending;
                ready.extend(promoted);
                if ready.is_empty() {
                    break;
                }
                calculator.sort(&mut ready);

                let earliest: BTreeMap<String, DateTime<Utc>> = ready
                    .iter()
                    .map(|c| (c.id.clone(), eligibility_floor(c, &availability)))
                    .collect();
                let meta: BTreeMap<String, Candidate> =
                    ready.iter().map(|c| (c.id.clone(), c.clone())).collect();

                let batch = place_batch(
                    &mut day,
                    std::mem::take(&mut ready),
                    &earliest,
                    &inputs.settings,
                    &registry,
                    &mut break_seq,
                );
                let placed_work = batch.placed.iter().any(|i| i.kind.is_work());
                let carried_ids: BTreeSet<&str> =
                    batch.carried.iter().map(|c| c.id.as_str()).collect();

                // Register fully-placed candidates so dependents unblock,
                // and emit async waits for triggers.
                let mut ends: BTreeMap<&str, DateTime<Utc>> = BTreeMap::new();
                for item in batch.placed.iter().filter(|i| i.kind.is_work()) {
                    let entry = ends.entry(item.source_id.as_str()).or_insert(item.end);
                    *entry = (*entry).max(item.end);
                }
                for (source_id, end) in ends {
                    if carried_ids.contains(source_id) {
                        continue;
                    }
                    let candidate = &meta[source_id];
                    let wait_minutes = candidate.async_wait_minutes();
                    let done_at = end + Duration::minutes(wait_minutes as i64);
                    availability.insert(source_id.to_string(), done_at);
                    if wait_minutes > 0 {
                        wait_items.push(async_wait_item(candidate, end, done_at));
                    }
                }

                scheduled.extend(batch.placed);
                ready = batch.carried;
                if !placed_work {
                    break;
                }
            }

            days.push(day);
        }

        // ── Done: leftovers become unscheduled ───────────────────────────
        let mut unscheduled: Vec<UnscheduledEntry> = Vec::new();
        for candidate in &ready {
            unscheduled.push(UnscheduledEntry {
                id: candidate.id.clone(),
                name: candidate.name.clone(),
                duration_minutes: candidate.minutes,
                reason: "no remaining capacity".to_string(),
                dependencies: candidate.depends_on().to_vec(),
            });
        }
        for candidate in &pending {
            let unmet: Vec<&String> = candidate
                .depends_on()
                .iter()
                .filter(|dep| !availability.contains_key(*dep))
                .collect();
            let unmet_list = unmet
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            warnings.push(format!(
                "step '{}' blocked by unscheduled dependencies: {}",
                candidate.id, unmet_list
            ));
            unscheduled.push(UnscheduledEntry {
                id: candidate.id.clone(),
                name: candidate.name.clone(),
                duration_minutes: candidate.minutes,
                reason: format!("blocked by unscheduled dependency: {unmet_list}"),
                dependencies: candidate.depends_on().to_vec(),
            });
        }

        let async_savings_minutes = async_savings(&wait_items, &scheduled);
        scheduled.extend(wait_items);
        scheduled.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

        let conflicts = detect_conflicts(inputs, &scheduled);
        let debug_info = build_debug_info(
            &days,
            warnings,
            critical.map(|(_, path)| path),
            async_savings_minutes,
        );

        Ok(ScheduleResult {
            scheduled,
            unscheduled,
            debug_info,
            conflicts,
        })
    }
}

/// Latest availability among a candidate's dependencies.
fn eligibility_floor(
    candidate: &Candidate,
    availability: &BTreeMap<String, DateTime<Utc>>,
) -> DateTime<Utc> {
    candidate
        .depends_on()
        .iter()
        .filter_map(|dep| availability.get(dep))
        .copied()
        .max()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Topological check plus longest-chain analysis for one workflow.
///
/// A cycle is fatal for the whole pass: flattening it into an arbitrary
/// order would silently violate the dependency invariant.
fn analyze_workflow(workflow: &Workflow) -> Result<WorkflowAnalysis, ScheduleError> {
    let ids: BTreeSet<&str> = workflow.steps.iter().map(|s| s.id.as_str()).collect();
    let mut indegree: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for step in &workflow.steps {
        indegree.entry(step.id.as_str()).or_insert(0);
        for dep in &step.depends_on {
            if !ids.contains(dep.as_str()) {
                continue; // Reported when candidates are collected.
            }
            if dep == &step.id {
                return Err(ScheduleError::DependencyCycle {
                    workflow_id: workflow.id.clone(),
                    step_id: step.id.clone(),
                });
            }
            *indegree.entry(step.id.as_str()).or_insert(0) += 1;
            dependents.entry(dep.as_str()).or_default().push(step.id.as_str());
        }
    }

    let mut queue: Vec<&str> = indegree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order: Vec<&str> = Vec::new();
    while let Some(id) = queue.pop() {
        order.push(id);
        for dependent in dependents.get(id).cloned().unwrap_or_default() {
            let deg = indegree.get_mut(dependent).unwrap();
            *deg -= 1;
            if *deg == 0 {
                queue.push(dependent);
            }
        }
    }
    if order.len() < workflow.steps.len() {
        let stuck = indegree
            .iter()
            .filter(|(_, deg)| **deg > 0)
            .map(|(id, _)| *id)
            .next()
            .unwrap_or_default();
        return Err(ScheduleError::DependencyCycle {
            workflow_id: workflow.id.clone(),
            step_id: stuck.to_string(),
        });
    }

    // Longest remaining chain from each step, walking reverse topo order.
    let by_id: BTreeMap<&str, &crate::task::WorkflowStep> =
        workflow.steps.iter().map(|s| (s.id.as_str(), s)).collect();
    let mut chain: BTreeMap<String, u32> = BTreeMap::new();
    for id in order.iter().rev() {
        let step = by_id[id];
        let own = if step.status == StepStatus::Completed {
            0
        } else {
            step.remaining_minutes()
        };
        let downstream = dependents
            .get(id)
            .map(|deps| {
                deps.iter()
                    .map(|d| chain.get(*d).copied().unwrap_or(0))
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);
        let wait = if dependents.get(id).map(|d| !d.is_empty()).unwrap_or(false) {
            step.async_wait_minutes
        } else {
            0
        };
        chain.insert((*id).to_string(), own + wait + downstream);
    }

    // Critical path: follow the heaviest chain among pending steps.
    let mut path: Vec<String> = Vec::new();
    let mut cursor = chain
        .iter()
        .filter(|(id, _)| by_id[id.as_str()].status != StepStatus::Completed)
        .max_by(|(a_id, a), (b_id, b)| a.cmp(b).then_with(|| b_id.cmp(a_id)))
        .map(|(id, minutes)| (id.clone(), *minutes));
    let critical_minutes = cursor.as_ref().map(|(_, m)| *m).unwrap_or(0);
    while let Some((id, _)) = cursor {
        path.push(id.clone());
        cursor = dependents
            .get(id.as_str())
            .and_then(|deps| {
                deps.iter()
                    .map(|d| ((*d).to_string(), chain.get(*d).copied().unwrap_or(0)))
                    .max_by(|(a_id, a), (b_id, b)| a.cmp(b).then_with(|| b_id.cmp(a_id)))
            });
    }

    Ok(WorkflowAnalysis {
        chain,
        critical_path: path,
        critical_minutes,
    })
}

/// Emit meetings and blackout intervals so consumers see the full day.
fn surface_fixed_items(pattern: &DailyWorkPattern, scheduled: &mut Vec<ScheduledItem>) {
    for meeting in &pattern.meetings {
        scheduled.push(meeting_item(meeting));
    }
    for (index, range) in pattern.blocked_times.iter().enumerate() {
        scheduled.push(blocked_item(pattern.date, index, range));
    }
}

fn meeting_item(meeting: &Meeting) -> ScheduledItem {
    ScheduledItem {
        id: meeting.id.clone(),
        kind: ScheduledItemKind::Meeting,
        source_id: meeting.id.clone(),
        original_task_id: None,
        workflow_id: None,
        name: meeting.name.clone(),
        start: meeting.start,
        end: meeting.end,
        duration_minutes: (meeting.end - meeting.start).num_minutes().max(0) as u32,
        work_type_id: None,
        color: MEETING_COLOR.to_string(),
        block_id: None,
    }
}

fn blocked_item(date: NaiveDate, index: usize, range: &TimeRange) -> ScheduledItem {
    let id = format!("blocked-{date}-{index}");
    ScheduledItem {
        id: id.clone(),
        kind: ScheduledItemKind::BlockedTime,
        source_id: id,
        original_task_id: None,
        workflow_id: None,
        name: "Blocked".to_string(),
        start: range.start,
        end: range.end,
        duration_minutes: range.duration_minutes().max(0) as u32,
        work_type_id: None,
        color: BLOCKED_COLOR.to_string(),
        block_id: None,
    }
}

fn async_wait_item(
    candidate: &Candidate,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> ScheduledItem {
    let workflow_id = candidate.workflow().map(|(id, _)| id.to_string());
    ScheduledItem {
        id: format!("wait-{}", candidate.id),
        kind: ScheduledItemKind::AsyncWait,
        source_id: candidate.id.clone(),
        original_task_id: None,
        workflow_id,
        name: format!("Waiting: {}", candidate.name),
        start,
        end,
        duration_minutes: (end - start).num_minutes().max(0) as u32,
        work_type_id: None,
        color: WAIT_COLOR.to_string(),
        block_id: None,
    }
}

/// Wait minutes that overlapped other scheduled work instead of running
/// serially.
fn async_savings(waits: &[ScheduledItem], scheduled: &[ScheduledItem]) -> u32 {
    let mut savings = 0u32;
    for wait in waits {
        let overlapped: i64 = scheduled
            .iter()
            .filter(|i| i.kind.is_work() && i.source_id != wait.source_id)
            .map(|i| {
                let start = i.start.max(wait.start);
                let end = i.end.min(wait.end);
                (end - start).num_minutes().max(0)
            })
            .sum();
        savings += (overlapped.min(wait.duration_minutes as i64)).max(0) as u32;
    }
    savings
}

/// Deadline misses, checked against the last placed minute of each entity.
fn detect_conflicts(inputs: &PlannerInputs, scheduled: &[ScheduledItem]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    let mut push = |deadline: Option<DateTime<Utc>>,
                    kind: DeadlineKind,
                    entity_id: &str,
                    name: &str,
                    last_end: Option<DateTime<Utc>>| {
        let (Some(deadline), Some(end)) = (deadline, last_end) else {
            return;
        };
        if end > deadline {
            let overrun = (end - deadline).num_minutes();
            conflicts.push(Conflict {
                kind: match kind {
                    DeadlineKind::Hard => ConflictKind::HardDeadlineMiss,
                    DeadlineKind::Soft => ConflictKind::SoftDeadlineMiss,
                },
                entity_id: entity_id.to_string(),
                message: format!("'{name}' finishes {overrun} minutes past its deadline"),
            });
        }
    };

    for task in &inputs.tasks {
        let last_end = scheduled
            .iter()
            .filter(|i| i.kind == ScheduledItemKind::Task && i.source_id == task.id)
            .map(|i| i.end)
            .max();
        push(task.deadline, task.deadline_kind, &task.id, &task.name, last_end);
    }
    for workflow in &inputs.workflows {
        let last_end = scheduled
            .iter()
            .filter(|i| {
                i.kind == ScheduledItemKind::WorkflowStep
                    && i.workflow_id.as_deref() == Some(workflow.id.as_str())
            })
            .map(|i| i.end)
            .max();
        push(
            workflow.deadline,
            workflow.deadline_kind,
            &workflow.id,
            &workflow.name,
            last_end,
        );
    }
    conflicts
}

fn build_debug_info(
    days: &[DayCapacity],
    warnings: Vec<String>,
    critical_path: Option<Vec<String>>,
    async_savings_minutes: u32,
) -> ScheduleDebugInfo {
    let mut info = ScheduleDebugInfo {
        warnings,
        critical_path: critical_path.filter(|p| !p.is_empty()),
        async_savings_minutes,
        ..Default::default()
    };
    for day in days {
        for block in &day.blocks {
            let overflow_minutes: u32 = block.overflow.iter().map(|o| o.minutes).sum();
            info.block_utilization.push(BlockUtilization {
                block_id: block.block_id.clone(),
                date: block.date,
                capacity_minutes: block.initial_free_minutes,
                used_minutes: block.used_minutes(),
                overflow_minutes,
            });
            info.overflow.extend(block.overflow.iter().cloned());
        }
        for (type_id, minutes) in day.unused_by_type() {
            *info.unused_capacity.entry(type_id).or_insert(0) += minutes;
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::WorkflowStep;
    use crate::workday::{BlockAllocation, WorkBlock};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn task(id: &str, minutes: u32, work_type: &str) -> Task {
        Task {
            id: id.to_string(),
            name: format!("Task {id}"),
            duration_minutes: minutes,
            importance: 50,
            urgency: 50,
            work_type_id: work_type.to_string(),
            completed: false,
            deadline: None,
            deadline_kind: DeadlineKind::Soft,
            logged_minutes: 0,
            created_at: at(0, 0),
            notes: None,
        }
    }

    fn step(id: &str, wf: &str, minutes: u32, index: u32) -> WorkflowStep {
        WorkflowStep {
            id: id.to_string(),
            workflow_id: wf.to_string(),
            name: format!("Step {id}"),
            duration_minutes: minutes,
            work_type_id: "focus".to_string(),
            depends_on: Vec::new(),
            async_wait_minutes: 0,
            is_async_trigger: false,
            status: StepStatus::Pending,
            logged_minutes: 0,
            step_index: index,
        }
    }

    fn workflow(id: &str, steps: Vec<WorkflowStep>) -> Workflow {
        Workflow {
            id: id.to_string(),
            name: format!("Workflow {id}"),
            steps,
            deadline: None,
            deadline_kind: DeadlineKind::Soft,
            importance: 50,
            urgency: 50,
            created_at: at(0, 0),
        }
    }

    fn focus_pattern(start: DateTime<Utc>, end: DateTime<Utc>) -> DailyWorkPattern {
        DailyWorkPattern {
            date: date(),
            blocks: vec![WorkBlock::new(
                "block-1",
                date(),
                start,
                end,
                BlockAllocation::Single {
                    work_type_id: "focus".to_string(),
                },
            )],
            meetings: Vec::new(),
            blocked_times: Vec::new(),
        }
    }

    fn inputs() -> PlannerInputs {
        let mut inputs = PlannerInputs::new(at(8, 0));
        inputs.settings.breaks.enabled = false;
        inputs
    }

    #[test]
    fn single_task_single_block() {
        let mut inputs = inputs();
        inputs.tasks.push(task("task-1", 60, "focus"));
        inputs.patterns.push(focus_pattern(at(9, 0), at(11, 0)));

        let result = SchedulerEngine::new().compute(&inputs).unwrap();
        assert_eq!(result.scheduled.len(), 1);
        assert_eq!(result.scheduled[0].start, at(9, 0));
        assert_eq!(result.scheduled[0].end, at(10, 0));
        assert!(result.unscheduled.is_empty());
    }

    #[test]
    fn oversized_task_splits_across_days() {
        let mut inputs = inputs();
        inputs.tasks.push(task("task-1", 180, "focus"));
        inputs.patterns.push(focus_pattern(at(9, 0), at(11, 0)));
        let mut day2 = focus_pattern(
            Utc.with_ymd_and_hms(2025, 3, 11, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 11, 12, 0, 0).unwrap(),
        );
        day2.date = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        inputs.patterns.push(day2);

        let result = SchedulerEngine::new().compute(&inputs).unwrap();
        let fragments = result.fragments_of("task-1");
        assert_eq!(fragments.len(), 2);
        let total: u32 = fragments.iter().map(|f| f.duration_minutes).sum();
        assert_eq!(total, 180);
        assert!(fragments[1].start > fragments[0].end);
        assert!(result.unscheduled.is_empty());
    }

    #[test]
    fn dependent_step_starts_after_dependency() {
        let mut inputs = inputs();
        let s1 = step("s1", "wf-1", 30, 0);
        let mut s2 = step("s2", "wf-1", 30, 1);
        s2.depends_on.push("s1".to_string());
        inputs.workflows.push(workflow("wf-1", vec![s1, s2]));
        inputs.patterns.push(focus_pattern(at(9, 0), at(10, 0)));

        let result = SchedulerEngine::new().compute(&inputs).unwrap();
        let s1_item = result.scheduled.iter().find(|i| i.source_id == "s1").unwrap();
        let s2_item = result.scheduled.iter().find(|i| i.source_id == "s2").unwrap();
        assert!(s2_item.start >= s1_item.end);
        assert!(result.unscheduled.is_empty());
    }

    #[test]
    fn dependent_step_overflows_small_block() {
        let mut inputs = inputs();
        let s1 = step("s1", "wf-1", 45, 0);
        let mut s2 = step("s2", "wf-1", 30, 1);
        s2.depends_on.push("s1".to_string());
        inputs.workflows.push(workflow("wf-1", vec![s1, s2]));
        inputs.patterns.push(focus_pattern(at(9, 0), at(10, 0)));
        inputs.settings.splitting.enabled = false;

        let result = SchedulerEngine::new().compute(&inputs).unwrap();
        assert!(result.scheduled.iter().any(|i| i.source_id == "s1"));
        assert_eq!(result.unscheduled.len(), 1);
        assert_eq!(result.unscheduled[0].id, "s2");
        assert_eq!(result.unscheduled[0].reason, "no remaining capacity");
    }

    #[test]
    fn zero_patterns_all_unscheduled() {
        let mut inputs = inputs();
        inputs.tasks.push(task("task-1", 60, "focus"));

        let result = SchedulerEngine::new().compute(&inputs).unwrap();
        assert!(result.scheduled.is_empty());
        assert_eq!(result.unscheduled.len(), 1);
        assert_eq!(result.unscheduled[0].reason, "no remaining capacity");
    }

    #[test]
    fn async_wait_delays_dependent() {
        let mut inputs = inputs();
        let mut trigger = step("s1", "wf-1", 30, 0);
        trigger.async_wait_minutes = 120;
        trigger.is_async_trigger = true;
        let mut dependent = step("s2", "wf-1", 30, 1);
        dependent.depends_on.push("s1".to_string());
        inputs.workflows.push(workflow("wf-1", vec![trigger, dependent]));
        inputs.patterns.push(focus_pattern(at(9, 0), at(17, 0)));

        let result = SchedulerEngine::new().compute(&inputs).unwrap();
        let s1_item = result.scheduled.iter().find(|i| i.source_id == "s1" && i.kind.is_work()).unwrap();
        let s2_item = result.scheduled.iter().find(|i| i.source_id == "s2").unwrap();
        assert!(s2_item.start >= s1_item.end + Duration::minutes(120));

        let wait = result
            .scheduled
            .iter()
            .find(|i| i.kind == ScheduledItemKind::AsyncWait)
            .unwrap();
        assert_eq!(wait.start, s1_item.end);
        assert_eq!(wait.duration_minutes, 120);
    }

    #[test]
    fn async_wait_consumes_no_capacity() {
        let mut inputs = inputs();
        let mut trigger = step("s1", "wf-1", 30, 0);
        trigger.async_wait_minutes = 120;
        trigger.is_async_trigger = true;
        inputs.workflows.push(workflow("wf-1", vec![trigger]));
        inputs.tasks.push(task("filler", 60, "focus"));
        inputs.patterns.push(focus_pattern(at(9, 0), at(12, 0)));

        let result = SchedulerEngine::new().compute(&inputs).unwrap();
        // 30 + 60 minutes of work fit fine alongside the 120-minute wait.
        assert!(result.unscheduled.is_empty());
        let used = result.debug_info.block_utilization[0].used_minutes;
        assert_eq!(used, 90);
        // The filler overlaps the wait, so the wait ran in parallel.
        assert!(result.debug_info.async_savings_minutes > 0);
    }

    #[test]
    fn dependency_cycle_fails_pass() {
        let mut inputs = inputs();
        let mut s1 = step("s1", "wf-1", 30, 0);
        s1.depends_on.push("s2".to_string());
        let mut s2 = step("s2", "wf-1", 30, 1);
        s2.depends_on.push("s1".to_string());
        inputs.workflows.push(workflow("wf-1", vec![s1, s2]));
        inputs.patterns.push(focus_pattern(at(9, 0), at(17, 0)));

        let err = SchedulerEngine::new().compute(&inputs).unwrap_err();
        assert!(matches!(err, ScheduleError::DependencyCycle { .. }));
    }

    #[test]
    fn completed_items_never_resurface() {
        let mut inputs = inputs();
        let mut done = task("done", 60, "focus");
        done.completed = true;
        inputs.tasks.push(done);
        let mut finished_step = step("s1", "wf-1", 30, 0);
        finished_step.status = StepStatus::Completed;
        let mut s2 = step("s2", "wf-1", 30, 1);
        s2.depends_on.push("s1".to_string());
        inputs.workflows.push(workflow("wf-1", vec![finished_step, s2]));
        inputs.patterns.push(focus_pattern(at(9, 0), at(17, 0)));

        let result = SchedulerEngine::new().compute(&inputs).unwrap();
        assert!(!result.scheduled.iter().any(|i| i.source_id == "done" || i.source_id == "s1"));
        assert!(!result.unscheduled.iter().any(|u| u.id == "done" || u.id == "s1"));
        // The dependent of a completed step schedules immediately.
        assert!(result.scheduled.iter().any(|i| i.source_id == "s2"));
    }

    #[test]
    fn active_session_removes_task_from_pool() {
        let mut inputs = inputs();
        inputs.tasks.push(task("task-1", 60, "focus"));
        inputs.active_sessions.push(ActiveWorkSession {
            id: "session-1".to_string(),
            target_id: "task-1".to_string(),
            planned_minutes: 60,
            started_at: at(8, 30),
        });
        inputs.patterns.push(focus_pattern(at(9, 0), at(11, 0)));

        let result = SchedulerEngine::new().compute(&inputs).unwrap();
        assert!(result.scheduled.is_empty());
        assert!(result.unscheduled.is_empty());
    }

    #[test]
    fn logged_minutes_shrink_the_placement() {
        let mut inputs = inputs();
        let mut partial = task("task-1", 90, "focus");
        partial.logged_minutes = 30;
        inputs.tasks.push(partial);
        inputs.patterns.push(focus_pattern(at(9, 0), at(11, 0)));

        let result = SchedulerEngine::new().compute(&inputs).unwrap();
        assert_eq!(result.scheduled[0].duration_minutes, 60);
    }

    #[test]
    fn corrupt_entities_drop_with_warnings() {
        let mut inputs = inputs();
        let mut nameless = task("", 30, "focus");
        nameless.name = "ghost".to_string();
        inputs.tasks.push(nameless);
        inputs.workflows.push(workflow("wf-empty", Vec::new()));
        inputs.tasks.push(task("task-1", 30, "focus"));
        inputs.patterns.push(focus_pattern(at(9, 0), at(11, 0)));

        let result = SchedulerEngine::new().compute(&inputs).unwrap();
        assert_eq!(result.scheduled.len(), 1);
        assert_eq!(result.debug_info.warnings.len(), 2);
    }

    #[test]
    fn hard_deadline_miss_reported_as_conflict() {
        let mut inputs = inputs();
        let mut urgent = task("task-1", 120, "focus");
        urgent.deadline = Some(at(10, 0));
        urgent.deadline_kind = DeadlineKind::Hard;
        inputs.tasks.push(urgent);
        inputs.patterns.push(focus_pattern(at(9, 0), at(12, 0)));

        let result = SchedulerEngine::new().compute(&inputs).unwrap();
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].kind, ConflictKind::HardDeadlineMiss);
        assert_eq!(result.conflicts[0].entity_id, "task-1");
    }

    #[test]
    fn meetings_surface_and_shift_work() {
        let mut inputs = inputs();
        inputs.tasks.push(task("task-1", 90, "focus"));
        let mut pattern = focus_pattern(at(9, 0), at(12, 0));
        pattern.meetings.push(Meeting {
            id: "m1".to_string(),
            name: "Standup".to_string(),
            start: at(9, 0),
            end: at(9, 30),
        });
        inputs.patterns.push(pattern);

        let result = SchedulerEngine::new().compute(&inputs).unwrap();
        let meeting = result
            .scheduled
            .iter()
            .find(|i| i.kind == ScheduledItemKind::Meeting)
            .unwrap();
        assert_eq!(meeting.name, "Standup");
        let work = result.scheduled.iter().find(|i| i.kind.is_work()).unwrap();
        assert_eq!(work.start, at(9, 30));
    }

    #[test]
    fn critical_path_reports_longest_chain() {
        let mut inputs = inputs();
        let s1 = step("s1", "wf-1", 60, 0);
        let mut s2 = step("s2", "wf-1", 90, 1);
        s2.depends_on.push("s1".to_string());
        let s3 = step("s3", "wf-1", 20, 2);
        inputs.workflows.push(workflow("wf-1", vec![s1, s2, s3]));
        inputs.patterns.push(focus_pattern(at(9, 0), at(17, 0)));

        let result = SchedulerEngine::new().compute(&inputs).unwrap();
        assert_eq!(
            result.debug_info.critical_path,
            Some(vec!["s1".to_string(), "s2".to_string()])
        );
    }

    #[test]
    fn identical_inputs_identical_results() {
        let mut inputs = inputs();
        for i in 0..5 {
            let mut t = task(&format!("task-{i}"), 45, "focus");
            t.urgency = 50; // Deliberate tie: ordering must still be stable.
            inputs.tasks.push(t);
        }
        let s1 = step("s1", "wf-1", 30, 0);
        let mut s2 = step("s2", "wf-1", 30, 1);
        s2.depends_on.push("s1".to_string());
        inputs.workflows.push(workflow("wf-1", vec![s1, s2]));
        inputs.patterns.push(focus_pattern(at(9, 0), at(13, 0)));

        let engine = SchedulerEngine::new();
        let a = serde_json::to_string(&engine.compute(&inputs).unwrap()).unwrap();
        let b = serde_json::to_string(&engine.compute(&inputs).unwrap()).unwrap();
        assert_eq!(a, b);
    }
}
