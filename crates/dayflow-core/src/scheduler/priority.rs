//! Candidate priority scoring.
//!
//! Orders schedulable candidates by a weighted blend of urgency,
//! importance, and deadline pressure. For workflow steps the pressure is
//! measured against the latest viable start: the workflow deadline minus
//! the remaining critical-path distance below the step. The exact weights
//! are a tunable policy (`PriorityWeights` in settings); correctness is
//! asserted through ordering effects, not constants.

use chrono::{DateTime, Utc};

use super::{Candidate, CandidateKind};
use crate::config::PriorityWeights;
use crate::task::DeadlineKind;

/// Integer scale applied to the weighted score so ordering is total and
/// reproducible (no float comparisons in the sort).
const SCORE_SCALE: f64 = 1000.0;

/// Priority calculator for one compute pass.
pub struct PriorityCalculator {
    weights: PriorityWeights,
    now: DateTime<Utc>,
}

impl PriorityCalculator {
    pub fn new(weights: PriorityWeights, now: DateTime<Utc>) -> Self {
        Self { weights, now }
    }

    /// Scaled priority score; higher schedules earlier.
    pub fn score(&self, candidate: &Candidate) -> i64 {
        let urgency = candidate.urgency.min(100) as f64;
        let importance = candidate.importance.min(100) as f64;
        let deadline = self.deadline_pressure(candidate);

        let blended = urgency * self.weights.urgency_weight
            + importance * self.weights.importance_weight
            + deadline * self.weights.deadline_weight;

        (blended * SCORE_SCALE).round() as i64
    }

    /// Deadline proximity score (0-100).
    ///
    /// - Overdue (or past the latest viable start): 100
    /// - Within 24h: 90-99
    /// - Within 3 days: 60-89
    /// - Within 7 days: 30-59
    /// - Within 30 days: 10-29
    /// - Further out or no deadline: 5
    ///
    /// Hard deadlines get a +10 bump, clamped to 100.
    fn deadline_pressure(&self, candidate: &Candidate) -> f64 {
        let Some(deadline) = candidate.deadline else {
            return 5.0;
        };
        // Steps must start early enough for the rest of their chain.
        let chain = match &candidate.kind {
            CandidateKind::Step {
                chain_remaining_minutes,
                ..
            } => *chain_remaining_minutes,
            CandidateKind::Task => 0,
        };
        let latest_start = deadline - chrono::Duration::minutes(chain as i64);
        let hours = (latest_start - self.now).num_hours();

        let base = if hours < 0 {
            100.0
        } else if hours < 24 {
            90.0 + 9.0 * (1.0 - hours as f64 / 24.0)
        } else if hours < 72 {
            89.0 - 29.0 * ((hours - 24) as f64 / 48.0)
        } else if hours < 168 {
            59.0 - 29.0 * ((hours - 72) as f64 / 96.0)
        } else if hours < 720 {
            29.0 - 19.0 * ((hours - 168) as f64 / 552.0)
        } else {
            5.0
        };

        match candidate.deadline_kind {
            DeadlineKind::Hard => (base + 10.0).min(100.0),
            DeadlineKind::Soft => base,
        }
    }

    /// Sort candidates into scheduling order: score descending, then step
    /// index, then creation order, then id. Deterministic for identical
    /// inputs.
    pub fn sort(&self, candidates: &mut [Candidate]) {
        candidates.sort_by(|a, b| {
            self.score(b)
                .cmp(&self.score(a))
                .then_with(|| step_index_of(a).cmp(&step_index_of(b)))
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
    }
}

fn step_index_of(candidate: &Candidate) -> u32 {
    match &candidate.kind {
        CandidateKind::Step { step_index, .. } => *step_index,
        CandidateKind::Task => u32::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    fn task(id: &str, urgency: u32, importance: u32) -> Candidate {
        Candidate {
            id: id.to_string(),
            name: id.to_string(),
            minutes: 60,
            work_type_id: "focus".to_string(),
            importance,
            urgency,
            deadline: None,
            deadline_kind: DeadlineKind::Soft,
            created_at: now(),
            kind: CandidateKind::Task,
            fragment_index: 0,
            split: false,
        }
    }

    fn calculator() -> PriorityCalculator {
        PriorityCalculator::new(PriorityWeights::default(), now())
    }

    #[test]
    fn urgency_dominates_ordering() {
        let calc = calculator();
        let mut candidates = vec![task("low", 10, 50), task("high", 90, 50)];
        calc.sort(&mut candidates);
        assert_eq!(candidates[0].id, "high");
    }

    #[test]
    fn overdue_deadline_outranks_no_deadline() {
        let calc = calculator();
        let mut overdue = task("overdue", 50, 50);
        overdue.deadline = Some(now() - chrono::Duration::hours(1));
        let mut candidates = vec![task("plain", 50, 50), overdue];
        calc.sort(&mut candidates);
        assert_eq!(candidates[0].id, "overdue");
    }

    #[test]
    fn hard_deadline_outranks_soft_at_same_distance() {
        let calc = calculator();
        let deadline = now() + chrono::Duration::hours(48);
        let mut hard = task("hard", 50, 50);
        hard.deadline = Some(deadline);
        hard.deadline_kind = DeadlineKind::Hard;
        let mut soft = task("soft", 50, 50);
        soft.deadline = Some(deadline);
        let mut candidates = vec![soft, hard];
        calc.sort(&mut candidates);
        assert_eq!(candidates[0].id, "hard");
    }

    #[test]
    fn chain_distance_raises_step_pressure() {
        let calc = calculator();
        let deadline = now() + chrono::Duration::hours(24);
        let step = |id: &str, chain: u32| Candidate {
            deadline: Some(deadline),
            kind: CandidateKind::Step {
                workflow_id: "wf".to_string(),
                workflow_name: "wf".to_string(),
                step_index: 0,
                depends_on: Vec::new(),
                async_wait_minutes: 0,
                is_async_trigger: false,
                chain_remaining_minutes: chain,
            },
            ..task(id, 50, 50)
        };
        // 20 hours of remaining chain leaves only 4 viable hours.
        let tight = step("tight", 20 * 60);
        let loose = step("loose", 60);
        assert!(calc.score(&tight) > calc.score(&loose));
    }

    #[test]
    fn ties_break_by_step_index_then_creation() {
        let calc = calculator();
        let step = |id: &str, index: u32| Candidate {
            kind: CandidateKind::Step {
                workflow_id: "wf".to_string(),
                workflow_name: "wf".to_string(),
                step_index: index,
                depends_on: Vec::new(),
                async_wait_minutes: 0,
                is_async_trigger: false,
                chain_remaining_minutes: 0,
            },
            ..task(id, 50, 50)
        };
        let mut candidates = vec![step("second", 1), step("first", 0)];
        calc.sort(&mut candidates);
        assert_eq!(candidates[0].id, "first");

        let mut earlier = task("b-created-earlier", 50, 50);
        earlier.created_at = now() - chrono::Duration::hours(1);
        let mut candidates = vec![task("a-later", 50, 50), earlier];
        calc.sort(&mut candidates);
        assert_eq!(candidates[0].id, "b-created-earlier");
    }

    #[test]
    fn identical_candidates_order_by_id() {
        let calc = calculator();
        let mut candidates = vec![task("b", 50, 50), task("a", 50, 50)];
        calc.sort(&mut candidates);
        assert_eq!(candidates[0].id, "a");
    }
}
