//! Custom assertions over recorded attempt sequences

use illust_proxy::{AttemptOutcome, SizeTier};

/// (tier, strategy) pairs of an attempt sequence, in execution order
pub fn attempt_pairs(attempts: &[AttemptOutcome]) -> Vec<(SizeTier, String)> {
    attempts
        .iter()
        .map(|a| (a.tier, a.strategy.clone()))
        .collect()
}

/// Assert that tiers are visited cheapest first and, within one tier, in
/// strategy list order
pub fn assert_priority_order(attempts: &[AttemptOutcome], strategies: &[&str]) {
    let position = |name: &str| {
        strategies
            .iter()
            .position(|s| *s == name)
            .unwrap_or_else(|| panic!("unknown strategy {}", name))
    };

    for pair in attempts.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            a.tier < b.tier || (a.tier == b.tier && position(&a.strategy) < position(&b.strategy)),
            "attempt ({}, {}) ran before ({}, {})",
            a.tier,
            a.strategy,
            b.tier,
            b.strategy
        );
    }
}

/// Assert that no (tier, strategy) pair was attempted twice
pub fn assert_no_repeats(attempts: &[AttemptOutcome]) {
    let pairs = attempt_pairs(attempts);
    for (i, pair) in pairs.iter().enumerate() {
        assert!(
            !pairs[i + 1..].contains(pair),
            "({}, {}) was attempted twice",
            pair.0,
            pair.1
        );
    }
}
