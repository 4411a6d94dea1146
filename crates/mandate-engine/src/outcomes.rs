use std::collections::BTreeMap;

use mandate_core::decision::{BusinessOutcome, Decision};
use mandate_core::route::{LevelPerformance, PerformanceAnalytics};
use mandate_core::types::AuthorityLevel;

/// Aggregate realized outcomes into per-level success rates.
///
/// Decisions and outcomes are joined on decision id. Decisions without an
/// outcome count toward `decisions` but not toward any rate. The result does
/// not depend on input order:
/// - a decision id listed twice counts once, at the stricter level
/// - several outcomes for one decision resolve to the latest `recorded_at`;
///   on a tie the negative outcome wins
pub fn track_outcomes<F>(
    decisions: &[Decision],
    outcomes: &[BusinessOutcome],
    level_of: F,
) -> PerformanceAnalytics
where
    F: Fn(&Decision) -> AuthorityLevel,
{
    let mut levels_by_id: BTreeMap<&str, AuthorityLevel> = BTreeMap::new();
    for d in decisions {
        let level = level_of(d);
        levels_by_id
            .entry(d.id.as_str())
            .and_modify(|l| *l = l.stricter(level))
            .or_insert(level);
    }

    let mut latest: BTreeMap<&str, &BusinessOutcome> = BTreeMap::new();
    for o in outcomes {
        latest
            .entry(o.decision_id.as_str())
            .and_modify(|cur| {
                if supersedes(o, *cur) {
                    *cur = o;
                }
            })
            .or_insert(o);
    }

    let mut analytics = PerformanceAnalytics::default();
    for level in AuthorityLevel::ALL {
        analytics.levels.insert(level, LevelPerformance::default());
    }

    for (id, level) in &levels_by_id {
        let perf = analytics.levels.entry(*level).or_default();
        perf.decisions += 1;
        if let Some(o) = latest.get(id) {
            perf.with_outcome += 1;
            if o.positive {
                perf.positive += 1;
            }
        }
    }

    let mut positive = 0;
    for perf in analytics.levels.values_mut() {
        perf.success_rate = rate(perf.positive, perf.with_outcome);
        analytics.total_decisions += perf.decisions;
        analytics.total_with_outcome += perf.with_outcome;
        positive += perf.positive;
    }
    analytics.overall_success_rate = rate(positive, analytics.total_with_outcome);
    analytics.orphan_outcomes = latest
        .keys()
        .filter(|id| !levels_by_id.contains_key(*id))
        .count();

    analytics
}

fn supersedes(candidate: &BusinessOutcome, current: &BusinessOutcome) -> bool {
    match candidate.recorded_at.cmp(&current.recorded_at) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => !candidate.positive && current.positive,
    }
}

fn rate(positive: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| positive as f64 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use mandate_core::types::DecisionType;

    fn decision(id: &str) -> Decision {
        Decision::new(id, DecisionType::TechnologyImplementation, "r")
    }

    fn outcome(id: &str, positive: bool, offset_h: i64) -> BusinessOutcome {
        BusinessOutcome {
            decision_id: id.into(),
            positive,
            realized_impact: None,
            recorded_at: Utc::now() - Duration::days(1) + Duration::hours(offset_h),
            notes: None,
        }
    }

    fn level_by_id(d: &Decision) -> AuthorityLevel {
        if d.id.starts_with("board") {
            AuthorityLevel::BoardEscalation
        } else {
            AuthorityLevel::FullAutonomy
        }
    }

    #[test]
    fn success_rate_per_level() {
        let decisions = vec![decision("a"), decision("b"), decision("c"), decision("board-1")];
        let outcomes = vec![
            outcome("a", true, 0),
            outcome("b", false, 0),
            outcome("board-1", true, 0),
        ];
        let a = track_outcomes(&decisions, &outcomes, level_by_id);

        let full = a.level(AuthorityLevel::FullAutonomy).unwrap();
        assert_eq!(full.decisions, 3);
        assert_eq!(full.with_outcome, 2);
        assert_eq!(full.positive, 1);
        assert_eq!(full.success_rate, Some(0.5));

        let board = a.level(AuthorityLevel::BoardEscalation).unwrap();
        assert_eq!(board.success_rate, Some(1.0));

        let cross = a.level(AuthorityLevel::CrossFunctional).unwrap();
        assert_eq!(cross.decisions, 0);
        assert_eq!(cross.success_rate, None);

        assert_eq!(a.total_decisions, 4);
        assert_eq!(a.total_with_outcome, 3);
        assert_eq!(a.overall_success_rate, Some(2.0 / 3.0));
    }

    #[test]
    fn unmatched_outcomes_are_orphans() {
        let decisions = vec![decision("a")];
        let outcomes = vec![outcome("a", true, 0), outcome("ghost", true, 0)];
        let a = track_outcomes(&decisions, &outcomes, level_by_id);
        assert_eq!(a.orphan_outcomes, 1);
        assert_eq!(a.total_with_outcome, 1);
    }

    #[test]
    fn latest_outcome_wins_and_ties_go_negative() {
        let decisions = vec![decision("a"), decision("b")];
        let tie = Utc::now();
        let mut b_pos = outcome("b", true, 0);
        b_pos.recorded_at = tie;
        let mut b_neg = outcome("b", false, 0);
        b_neg.recorded_at = tie;
        let outcomes = vec![
            outcome("a", false, 0),
            outcome("a", true, 5),
            b_pos,
            b_neg,
        ];
        let a = track_outcomes(&decisions, &outcomes, level_by_id);
        let full = a.level(AuthorityLevel::FullAutonomy).unwrap();
        assert_eq!(full.with_outcome, 2);
        assert_eq!(full.positive, 1);
    }

    #[test]
    fn order_and_duplicates_do_not_matter() {
        let mut decisions = vec![decision("a"), decision("board-1"), decision("a")];
        let mut outcomes = vec![
            outcome("a", true, 1),
            outcome("board-1", false, 2),
            outcome("a", false, 1),
        ];
        let first = track_outcomes(&decisions, &outcomes, level_by_id);
        decisions.reverse();
        outcomes.reverse();
        let second = track_outcomes(&decisions, &outcomes, level_by_id);
        assert_eq!(first, second);
        assert_eq!(first.total_decisions, 2);

        // aggregating twice is idempotent
        let again = track_outcomes(&decisions, &outcomes, level_by_id);
        assert_eq!(second, again);
    }

    #[test]
    fn empty_inputs() {
        let a = track_outcomes(&[], &[], level_by_id);
        assert_eq!(a.total_decisions, 0);
        assert_eq!(a.overall_success_rate, None);
        assert_eq!(a.levels.len(), 5);
    }
}
