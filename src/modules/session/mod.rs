pub mod coordinator;

pub use coordinator::{
    InitOutcome, QueryAuthorization, QueryOutcome, ResetOptions, SessionCoordinator,
    SessionStatus,
};
