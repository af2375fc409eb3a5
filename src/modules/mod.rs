pub mod auth;
pub mod catalog;
pub mod limits;
pub mod persistence;
pub mod session;
pub mod summary;
pub mod system;

pub use catalog::EndpointCatalog;
pub use session::SessionCoordinator;
