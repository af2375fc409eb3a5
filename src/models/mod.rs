pub mod cache;
pub mod config;
pub mod credential;
pub mod endpoint;
pub mod limits;
pub mod session;
pub mod summary;

pub use cache::{CacheMetadata, CacheRecord};
pub use config::{AppConfig, UpstreamProxyConfig};
pub use credential::StoredCredential;
pub use endpoint::{
    EndpointDescriptor, EndpointQuery, IndexedEndpoint, InvalidParameter, ParameterValidation,
};
pub use limits::{ParsedLimits, PermissionState, PermissionTable, RateLimit, Tier, WindowLimits};
pub use session::{SessionPhase, SessionState};
pub use summary::{AssetSummary, PermissionSummary};
