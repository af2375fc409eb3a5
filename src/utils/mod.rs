pub mod fs;
pub mod http;
