//! Tier-aware access and historical-depth checks over a session's permission state.
//!
//! Restricted tiers (basic, advanced) are allow-listed by the permission table; the
//! higher tiers may reach anything the table omits. With no permission data loaded,
//! or an unknown tier, every check passes.

use super::duration::{self, DurationLimit};
use crate::models::{PermissionState, SessionState, Tier};
use crate::modules::catalog::split_endpoint_path;
use chrono::NaiveDate;
use serde::Serialize;

/// Window and limit that apply to one endpoint lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLimit {
    pub window: String,
    pub limit: DurationLimit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DateRangeCheck {
    Valid,
    AccessDenied {
        tier: Tier,
        required_plan: Tier,
    },
    NoLimit {
        window: Option<String>,
    },
    TooEarly {
        requested: NaiveDate,
        earliest_allowed: NaiveDate,
        limit: String,
        window: String,
    },
}

impl DateRangeCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn message(&self) -> Option<String> {
        match self {
            Self::Valid => None,
            Self::AccessDenied {
                tier,
                required_plan,
            } => Some(format!(
                "Endpoint not available on the {} tier; requires {} or higher",
                tier, required_plan
            )),
            Self::NoLimit { window: Some(w) } => {
                Some(format!("No plan limit found for window '{}'", w))
            }
            Self::NoLimit { window: None } => {
                Some("No plan limit found for this endpoint".to_string())
            }
            Self::TooEarly {
                requested,
                earliest_allowed,
                limit,
                window,
            } => Some(format!(
                "Requested start {} is earlier than {} allowed by the '{}' limit for window '{}'",
                requested, earliest_allowed, limit, window
            )),
        }
    }
}

fn active_permissions(state: &SessionState) -> Option<&PermissionState> {
    state
        .permissions
        .as_ref()
        .filter(|p| p.tier != Tier::Unknown)
}

pub fn has_endpoint_access(state: &SessionState, path: &str) -> bool {
    let Some(permissions) = active_permissions(state) else {
        return true;
    };
    if permissions.is_static(path) {
        return true;
    }
    if permissions.tier == Tier::Basic && permissions.table.is_none() {
        return false;
    }
    let listed = match (permissions.table.as_ref(), split_endpoint_path(path)) {
        (Some(table), Some(parts)) => table.contains(parts.asset, parts.category, parts.metric),
        _ => false,
    };
    listed || permissions.tier.has_implicit_access()
}

/// Looks up the limit for `path`, preferring `window` and falling back to the first
/// window the entry declares.
pub fn limit_for(state: &SessionState, path: &str, window: Option<&str>) -> Option<ResolvedLimit> {
    let parts = split_endpoint_path(path)?;
    let windows = state.table()?.get(parts.asset, parts.category, parts.metric)?;
    let preferred = window.and_then(|w| windows.get_key_value(w));
    let (window, limit) = preferred.or_else(|| windows.iter().next())?;
    Some(ResolvedLimit {
        window: window.clone(),
        limit: *limit,
    })
}

pub fn validate_date_range_from(
    state: &SessionState,
    path: &str,
    from: Option<NaiveDate>,
    window: Option<&str>,
    today: NaiveDate,
) -> DateRangeCheck {
    let Some(permissions) = active_permissions(state) else {
        return DateRangeCheck::Valid;
    };
    if !has_endpoint_access(state, path) {
        return DateRangeCheck::AccessDenied {
            tier: permissions.tier,
            required_plan: required_plan(state, path),
        };
    }
    let Some(requested) = from else {
        return DateRangeCheck::Valid;
    };
    let Some(resolved) = limit_for(state, path, window) else {
        return DateRangeCheck::NoLimit {
            window: window.map(str::to_string),
        };
    };
    let Some(earliest_allowed) = resolved.limit.earliest_date_from(today) else {
        return DateRangeCheck::Valid;
    };
    if requested < earliest_allowed {
        return DateRangeCheck::TooEarly {
            requested,
            earliest_allowed,
            limit: resolved.limit.token(),
            window: resolved.window,
        };
    }
    DateRangeCheck::Valid
}

pub fn validate_date_range(
    state: &SessionState,
    path: &str,
    from: Option<NaiveDate>,
    window: Option<&str>,
) -> DateRangeCheck {
    validate_date_range_from(state, path, from, window, duration::today())
}

/// Coarse minimum-plan guess from the stored limit. Not an entitlement lookup.
pub fn required_plan(state: &SessionState, path: &str) -> Tier {
    match limit_for(state, path, None) {
        None => Tier::Professional,
        Some(resolved) if resolved.limit.is_unlimited() => Tier::Basic,
        Some(resolved) if resolved.limit == DurationLimit::days(1) => Tier::Basic,
        Some(_) => Tier::Professional,
    }
}
