//! The pure reward function.

use crate::metric::WeightedMetricSet;

/// Basis points in 100%.
pub const BPS_DENOMINATOR: f64 = 10_000.0;

/// Weighted mean of the set, `None` when it cannot be computed safely.
pub fn weighted_score(metrics: &WeightedMetricSet) -> Option<f64> {
    if metrics.iter().any(|(_, m)| !m.is_well_formed()) {
        return None;
    }
    let weight_sum = metrics.weight_sum();
    if weight_sum <= 0.0 {
        return None;
    }
    let weighted: f64 = metrics.iter().map(|(_, m)| m.value * m.weight).sum();
    let score = weighted / weight_sum;
    score.is_finite().then_some(score)
}

/// Reward amount for `metrics`, never more than `total_supply`.
///
/// `allocation_bps` is in hundredths of a percent (`10_000` = 100%).
pub fn calculate_reward(
    metrics: &WeightedMetricSet,
    total_supply: u128,
    allocation_bps: f64,
) -> u128 {
    if total_supply == 0 || !allocation_bps.is_finite() || allocation_bps < 0.0 {
        return 0;
    }
    let Some(score) = weighted_score(metrics) else {
        return 0;
    };

    let supply = total_supply as f64;
    let raw = (supply * score * allocation_bps / BPS_DENOMINATOR).floor();
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    if raw >= supply {
        return total_supply;
    }
    // raw < supply <= u128::MAX, so the cast cannot saturate.
    (raw as u128).min(total_supply)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> WeightedMetricSet {
        WeightedMetricSet::new()
            .with("uptime", 100.0, 0.6)
            .with("users", 1_000_000.0, 0.4)
            .with("governance", 100.0, 1.0)
    }

    #[test]
    fn test_simple_proportion() {
        // score 0.5, 50% allocation of 1000
        let set = WeightedMetricSet::new().with("a", 0.5, 1.0);
        assert_eq!(calculate_reward(&set, 1000, 5_000.0), 250);
    }

    #[test]
    fn test_weighted_score() {
        let set = WeightedMetricSet::new()
            .with("a", 1.0, 3.0)
            .with("b", 0.0, 1.0);
        assert_eq!(weighted_score(&set), Some(0.75));
    }

    #[test]
    fn test_floor_applied() {
        let set = WeightedMetricSet::new().with("a", 0.333, 1.0);
        assert_eq!(calculate_reward(&set, 100, 10_000.0), 33);
    }

    #[test]
    fn test_concrete_scenario_clamped_to_supply() {
        let reward = calculate_reward(&scenario(), 1_000_000, 7.407407407);
        assert!(reward <= 1_000_000);
        assert_eq!(reward, 1_000_000);
    }

    #[test]
    fn test_zero_cases() {
        let set = scenario();
        assert_eq!(calculate_reward(&set, 0, 100.0), 0);
        assert_eq!(calculate_reward(&WeightedMetricSet::new(), 1000, 100.0), 0);
        assert_eq!(
            calculate_reward(&WeightedMetricSet::new().with("a", 5.0, 0.0), 1000, 100.0),
            0
        );
        assert_eq!(
            calculate_reward(&set.clone().with("penalty", -1.0, 0.1), 1000, 100.0),
            0
        );
        assert_eq!(
            calculate_reward(&WeightedMetricSet::new().with("a", 1.0, -1.0), 1000, 100.0),
            0
        );
        assert_eq!(
            calculate_reward(&WeightedMetricSet::new().with("a", f64::NAN, 1.0), 1000, 100.0),
            0
        );
        assert_eq!(calculate_reward(&set, 1000, f64::NAN), 0);
        assert_eq!(calculate_reward(&set, 1000, -5.0), 0);
    }

    #[test]
    fn test_monotonic_in_value() {
        let mut last = 0;
        for value in [0.0, 0.1, 0.2, 0.4, 0.8, 1.0] {
            let set = WeightedMetricSet::new()
                .with("uptime", value, 0.6)
                .with("users", 0.5, 0.4);
            let reward = calculate_reward(&set, 1_000_000, 2_500.0);
            assert!(reward >= last, "{reward} < {last} at value {value}");
            last = reward;
        }
    }

    #[test]
    fn test_monotonic_in_allocation() {
        let set = WeightedMetricSet::new().with("a", 0.9, 1.0);
        let mut last = 0;
        for bps in [0.0, 1.0, 100.0, 2_500.0, 10_000.0, 50_000.0] {
            let reward = calculate_reward(&set, 1_000_000, bps);
            assert!(reward >= last);
            assert!(reward <= 1_000_000);
            last = reward;
        }
    }

    #[test]
    fn test_huge_supply_does_not_overflow() {
        let set = WeightedMetricSet::new().with("a", 1.0, 1.0);
        assert_eq!(calculate_reward(&set, u128::MAX, 10_000.0), u128::MAX);
    }
}
