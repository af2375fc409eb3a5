pub mod client;

pub use client::{parse_endpoint_envelope, MetricsApiClient, PlanLimitsFetch};
