pub mod access;
pub mod duration;
pub mod resolver;
pub mod tier;

pub use access::{
    has_endpoint_access, limit_for, required_plan, validate_date_range, DateRangeCheck,
    ResolvedLimit,
};
pub use duration::{decode, decode_date, Decoded, DurationLimit, DurationUnit};
pub use resolver::parse as parse_plan_limits;
pub use tier::{detect_tier_from_limits, resolve_tier, TierEstimate};
