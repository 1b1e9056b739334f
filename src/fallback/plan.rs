//! Attempt planning
//!
//! The full fallback sequence is a pure function of the tier map, the
//! requested tier, the strategy count and the degrade flag. Computing it up
//! front makes the ordering testable without any network.

use crate::types::{ImagePageInfo, SizeTier};
use std::collections::HashSet;

/// One (tier, strategy) combination to try
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlannedAttempt {
    /// Tier to fetch
    pub tier: SizeTier,
    /// Index into the strategy list; 0 is the primary strategy
    pub strategy: usize,
}

/// Build the ordered, duplicate-free attempt sequence
///
/// 1. If `requested` has a URL, `(requested, primary)` comes first.
/// 2. Then each tier with a URL, cheapest first, with every strategy in list
///    order before the next tier. Pairs already planned are skipped.
///
/// When `degrade_to_any_tier` is false and a tier was requested, step 2 only
/// covers the requested tier.
pub fn plan_attempts(
    info: &ImagePageInfo,
    requested: Option<SizeTier>,
    strategy_count: usize,
    degrade_to_any_tier: bool,
) -> Vec<PlannedAttempt> {
    let mut plan = Vec::new();
    if strategy_count == 0 {
        return plan;
    }

    let mut seen = HashSet::new();
    let mut push = |attempt: PlannedAttempt, plan: &mut Vec<PlannedAttempt>| {
        if seen.insert(attempt) {
            plan.push(attempt);
        }
    };

    if let Some(tier) = requested
        && info.url(tier).is_some()
    {
        push(PlannedAttempt { tier, strategy: 0 }, &mut plan);
    }

    let sweep: Vec<SizeTier> = match requested {
        Some(tier) if !degrade_to_any_tier => vec![tier],
        _ => SizeTier::ALL.to_vec(),
    };

    for tier in sweep {
        if info.url(tier).is_none() {
            continue;
        }
        for strategy in 0..strategy_count {
            push(PlannedAttempt { tier, strategy }, &mut plan);
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(tiers: &[SizeTier]) -> ImagePageInfo {
        ImagePageInfo::new(
            tiers
                .iter()
                .map(|tier| (*tier, format!("https://i.example/{}.jpg", tier))),
            1,
        )
    }

    fn pairs(plan: &[PlannedAttempt]) -> Vec<(SizeTier, usize)> {
        plan.iter().map(|a| (a.tier, a.strategy)).collect()
    }

    #[test]
    fn unconstrained_plan_is_tier_major_cheapest_first() {
        let plan = plan_attempts(&info(&SizeTier::ALL), None, 2, true);
        assert_eq!(
            pairs(&plan),
            vec![
                (SizeTier::ThumbMini, 0),
                (SizeTier::ThumbMini, 1),
                (SizeTier::Small, 0),
                (SizeTier::Small, 1),
                (SizeTier::Regular, 0),
                (SizeTier::Regular, 1),
                (SizeTier::Original, 0),
                (SizeTier::Original, 1),
            ]
        );
    }

    #[test]
    fn missing_tiers_are_skipped() {
        let plan = plan_attempts(&info(&[SizeTier::Small, SizeTier::Original]), None, 4, true);
        assert_eq!(plan.len(), 8);
        assert!(plan.iter().all(|a| a.tier != SizeTier::ThumbMini));
        assert_eq!(plan[4], PlannedAttempt { tier: SizeTier::Original, strategy: 0 });
    }

    #[test]
    fn requested_tier_goes_first_and_is_not_repeated() {
        let plan = plan_attempts(&info(&SizeTier::ALL), Some(SizeTier::Regular), 3, true);
        assert_eq!(plan[0], PlannedAttempt { tier: SizeTier::Regular, strategy: 0 });
        assert_eq!(plan.len(), 12);

        let regular: Vec<_> = plan
            .iter()
            .filter(|a| a.tier == SizeTier::Regular)
            .map(|a| a.strategy)
            .collect();
        assert_eq!(regular, vec![0, 1, 2]);
        // the sweep resumes from the cheapest tier
        assert_eq!(plan[1], PlannedAttempt { tier: SizeTier::ThumbMini, strategy: 0 });
    }

    #[test]
    fn absent_requested_tier_still_sweeps() {
        let plan = plan_attempts(&info(&[SizeTier::Small]), Some(SizeTier::Original), 2, true);
        assert_eq!(pairs(&plan), vec![(SizeTier::Small, 0), (SizeTier::Small, 1)]);
    }

    #[test]
    fn no_degrade_restricts_to_requested_tier() {
        let plan = plan_attempts(&info(&SizeTier::ALL), Some(SizeTier::Small), 3, false);
        assert_eq!(
            pairs(&plan),
            vec![(SizeTier::Small, 0), (SizeTier::Small, 1), (SizeTier::Small, 2)]
        );

        let plan = plan_attempts(&info(&[SizeTier::Small]), Some(SizeTier::Original), 3, false);
        assert!(plan.is_empty());
    }

    #[test]
    fn no_degrade_without_request_sweeps_everything() {
        let plan = plan_attempts(&info(&SizeTier::ALL), None, 1, false);
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn empty_inputs_give_empty_plan() {
        assert!(plan_attempts(&ImagePageInfo::default(), None, 4, true).is_empty());
        assert!(plan_attempts(&info(&SizeTier::ALL), None, 0, true).is_empty());
    }
}
