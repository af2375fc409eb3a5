use super::duration::DurationLimit;
use crate::models::{ParsedLimits, PermissionTable, RateLimit, WindowLimits};
use serde_json::{Map, Value};

const STATICS_KEY: &str = "statics";
const TIER_KEYS: [&str; 2] = ["tier", "plan"];
const RATE_LIMIT_KEY: &str = "rate_limit";

fn is_reserved_key(key: &str) -> bool {
    key == STATICS_KEY || key == RATE_LIMIT_KEY || TIER_KEYS.contains(&key)
}

/// Returns the object carrying the limits, unwrapping a `{"data": {...}}` envelope.
pub fn extract_limits_object(raw: &Value) -> Option<&Map<String, Value>> {
    let root = raw.as_object()?;
    match root.get("data") {
        Some(Value::Object(inner)) => Some(inner),
        _ => Some(root),
    }
}

fn parse_statics(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_rate_limit(value: Option<&Value>) -> Option<RateLimit> {
    let object = value?.as_object()?;
    let tokens = object.get("tokens").and_then(Value::as_u64)?;
    let reset_window = object
        .get("reset_window")
        .or_else(|| object.get("reset"))
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default();
    Some(RateLimit {
        tokens,
        reset_window,
    })
}

fn parse_windows(fields: &Map<String, Value>) -> WindowLimits {
    fields
        .iter()
        .filter_map(|(window, value)| {
            let limit = DurationLimit::parse(value.as_str()?)?;
            Some((window.clone(), limit))
        })
        .collect()
}

/// Normalizes the plan-limits payload. Leaves with no valid duration windows are
/// dropped; a payload with no surviving leaves yields `table: None`.
pub fn parse(raw: &Value) -> ParsedLimits {
    let Some(root) = extract_limits_object(raw) else {
        tracing::warn!("Plan limits payload is not a JSON object");
        return ParsedLimits::default();
    };

    let mut table = PermissionTable::new();
    let mut skipped_leaves = 0usize;

    for (asset, categories) in root.iter().filter(|(key, _)| !is_reserved_key(key)) {
        let Some(categories) = categories.as_object() else {
            continue;
        };
        for (category, metrics) in categories {
            let Some(metrics) = metrics.as_object() else {
                continue;
            };
            for (metric, fields) in metrics {
                let Some(fields) = fields.as_object() else {
                    skipped_leaves += 1;
                    continue;
                };
                let windows = parse_windows(fields);
                if windows.is_empty() {
                    skipped_leaves += 1;
                    continue;
                }
                table.insert(asset, category, metric, windows);
            }
        }
    }

    if skipped_leaves > 0 {
        tracing::debug!(skipped_leaves, "Dropped plan-limit entries without valid windows");
    }

    let tier_name = TIER_KEYS
        .iter()
        .find_map(|key| root.get(*key).and_then(Value::as_str))
        .map(str::to_string);

    ParsedLimits {
        table: (!table.is_empty()).then_some(table),
        statics: parse_statics(root.get(STATICS_KEY)),
        rate_limit: parse_rate_limit(root.get(RATE_LIMIT_KEY)),
        tier_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "statics": ["/v1/metadata/assets", "/v1/metadata/metrics", 42],
            "rate_limit": {"tokens": 600, "reset_window": "1m"},
            "btc": {
                "market": {
                    "price_usd_close": {"10m": "1d", "24h": "unlimited", "label": "Price"},
                    "marketcap_usd": {"note": "n/a"}
                },
                "addresses": {
                    "active_count": {"1h": "3y", "24h": "unlimited"}
                }
            },
            "eth": {
                "derivatives": {
                    "futures/open_interest/sum": {"24h": "2w"}
                },
                "empty": {}
            },
            "broken": "not-an-object"
        })
    }

    #[test]
    fn statics_and_reserved_keys_are_not_assets() {
        let parsed = parse(&payload());
        let table = parsed.table.expect("table parsed");
        assert!(table.assets().all(|a| a != "statics" && a != "rate_limit"));
        assert_eq!(
            parsed.statics,
            vec!["/v1/metadata/assets", "/v1/metadata/metrics"]
        );
        assert_eq!(
            parsed.rate_limit,
            Some(RateLimit {
                tokens: 600,
                reset_window: "1m".to_string()
            })
        );
        assert_eq!(parsed.tier_name, None);
    }

    #[test]
    fn only_duration_shaped_fields_become_windows() {
        let table = parse(&payload()).table.expect("table parsed");
        let windows = table
            .get("btc", "market", "price_usd_close")
            .expect("leaf kept");
        assert_eq!(windows.len(), 2);
        assert_eq!(windows["10m"], DurationLimit::days(1));
        assert!(windows["24h"].is_unlimited());
        assert!(!windows.contains_key("label"));
    }

    #[test]
    fn leaves_without_valid_windows_are_dropped() {
        let table = parse(&payload()).table.expect("table parsed");
        assert!(table.get("btc", "market", "marketcap_usd").is_none());
        assert_eq!(table.categories("eth").collect::<Vec<_>>(), vec!["derivatives"]);
        assert!(table
            .leaves()
            .all(|(_, _, _, windows)| !windows.is_empty()));
        assert_eq!(table.leaf_count(), 3);
    }

    #[test]
    fn tier_name_is_read_from_envelope() {
        let parsed = parse(&json!({
            "data": {
                "tier": "Professional",
                "btc": {"market": {"price": {"24h": "3y"}}}
            }
        }));
        assert_eq!(parsed.tier_name.as_deref(), Some("Professional"));
        assert!(parsed.table.is_some());
    }

    #[test]
    fn payload_without_leaves_has_no_table() {
        let parsed = parse(&json!({"statics": ["/v1/status/health"]}));
        assert!(parsed.table.is_none());
        assert_eq!(parsed.statics.len(), 1);

        let not_object = parse(&json!(["btc"]));
        assert_eq!(not_object, ParsedLimits::default());
    }

    #[test]
    fn zero_day_window_keeps_its_leaf() {
        let parsed = parse(&json!({"btc": {"market": {"price": {"24h": "0d"}}}}));
        let table = parsed.table.expect("table parsed");
        let windows = table.get("btc", "market", "price").expect("leaf kept");
        assert_eq!(windows.get("24h"), Some(&DurationLimit::days(0)));
    }
}
