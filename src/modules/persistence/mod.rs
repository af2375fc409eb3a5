pub mod cache_store;

pub use cache_store::{credential_prefix, CacheRejection, CacheStore};
