//! Tier resolution. An explicit tier name from the payload is authoritative; when it is
//! missing the tier is *estimated* from the shape of the limits. The estimate is a guess,
//! not an entitlement lookup.

use super::duration::DurationLimit;
use crate::models::{ParsedLimits, PermissionTable, Tier};
use serde::Serialize;

const ONE_DAY_THRESHOLD: f64 = 0.5;
const UNLIMITED_THRESHOLD: f64 = 0.5;
const THREE_YEAR_THRESHOLD: f64 = 0.3;

/// Best-effort tier guess derived from limit distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierEstimate {
    pub tier: Tier,
    pub windows: usize,
    pub one_day_share: f64,
    pub unlimited_share: f64,
    pub three_year_share: f64,
}

pub fn detect_tier_from_limits(table: Option<&PermissionTable>) -> TierEstimate {
    let mut estimate = TierEstimate {
        tier: Tier::Basic,
        windows: 0,
        one_day_share: 0.0,
        unlimited_share: 0.0,
        three_year_share: 0.0,
    };
    let Some(table) = table else {
        return estimate;
    };

    let (mut one_day, mut unlimited, mut three_year) = (0usize, 0usize, 0usize);
    for (_, _, _, windows) in table.leaves() {
        for limit in windows.values() {
            estimate.windows += 1;
            match *limit {
                DurationLimit::Unlimited => unlimited += 1,
                l if l == DurationLimit::days(1) => one_day += 1,
                l if l == DurationLimit::years(3) => three_year += 1,
                _ => {}
            }
        }
    }
    if estimate.windows == 0 {
        return estimate;
    }

    let total = estimate.windows as f64;
    estimate.one_day_share = one_day as f64 / total;
    estimate.unlimited_share = unlimited as f64 / total;
    estimate.three_year_share = three_year as f64 / total;

    estimate.tier = if estimate.one_day_share > ONE_DAY_THRESHOLD {
        Tier::Basic
    } else if estimate.unlimited_share > UNLIMITED_THRESHOLD {
        Tier::Premium
    } else if estimate.three_year_share > THREE_YEAR_THRESHOLD {
        Tier::Professional
    } else {
        Tier::Advanced
    };
    estimate
}

/// Explicit name first (unrecognized names map to `Unknown`), heuristic otherwise.
pub fn resolve_tier(parsed: &ParsedLimits) -> Tier {
    if let Some(name) = parsed.tier_name.as_deref() {
        let tier = Tier::from_name(name);
        if tier == Tier::Unknown {
            tracing::warn!(tier_name = %name, "Unrecognized tier name in plan limits");
        }
        return tier;
    }
    let estimate = detect_tier_from_limits(parsed.table.as_ref());
    tracing::info!(
        tier = %estimate.tier,
        windows = estimate.windows,
        "No tier in plan limits, using estimated tier"
    );
    estimate.tier
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WindowLimits;
    use crate::modules::limits::duration::DurationUnit;

    fn table_with(limits: &[DurationLimit]) -> PermissionTable {
        let mut table = PermissionTable::new();
        for (i, limit) in limits.iter().enumerate() {
            let mut windows = WindowLimits::new();
            windows.insert("24h".to_string(), *limit);
            table.insert("btc", "market", &format!("metric_{}", i), windows);
        }
        table
    }

    fn mix(primary: DurationLimit, primary_count: usize, total: usize) -> Vec<DurationLimit> {
        let filler = DurationLimit::Offset {
            quantity: 2,
            unit: DurationUnit::Month,
        };
        (0..total)
            .map(|i| if i < primary_count { primary } else { filler })
            .collect()
    }

    #[test]
    fn mostly_one_day_estimates_basic() {
        let table = table_with(&mix(DurationLimit::days(1), 6, 10));
        let estimate = detect_tier_from_limits(Some(&table));
        assert_eq!(estimate.tier, Tier::Basic);
        assert!((estimate.one_day_share - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn mostly_unlimited_estimates_premium() {
        let table = table_with(&mix(DurationLimit::Unlimited, 6, 10));
        assert_eq!(detect_tier_from_limits(Some(&table)).tier, Tier::Premium);
    }

    #[test]
    fn three_year_share_above_thirty_percent_estimates_professional() {
        let table = table_with(&mix(DurationLimit::years(3), 4, 10));
        assert_eq!(detect_tier_from_limits(Some(&table)).tier, Tier::Professional);
    }

    #[test]
    fn mixed_limits_estimate_advanced() {
        let table = table_with(&mix(DurationLimit::years(3), 3, 10));
        assert_eq!(detect_tier_from_limits(Some(&table)).tier, Tier::Advanced);
    }

    #[test]
    fn empty_or_missing_table_estimates_basic() {
        assert_eq!(detect_tier_from_limits(None).tier, Tier::Basic);
        assert_eq!(
            detect_tier_from_limits(Some(&PermissionTable::new())).tier,
            Tier::Basic
        );
    }

    #[test]
    fn explicit_tier_name_wins_over_estimate() {
        let parsed = ParsedLimits {
            table: Some(table_with(&mix(DurationLimit::days(1), 10, 10))),
            tier_name: Some("Premium".to_string()),
            ..ParsedLimits::default()
        };
        assert_eq!(resolve_tier(&parsed), Tier::Premium);

        let unknown = ParsedLimits {
            tier_name: Some("gold".to_string()),
            ..ParsedLimits::default()
        };
        assert_eq!(resolve_tier(&unknown), Tier::Unknown);
    }
}
