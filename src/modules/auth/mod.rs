pub mod credential;

pub use credential::{get_data_dir, CredentialStore};
