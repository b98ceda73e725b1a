// Watchman Library
// Settings resolution plus the HTTP, cookie, mail and static-asset consumers

pub mod auth_cookie;
pub mod config;
pub mod errors;
pub mod mail;
pub mod security;
pub mod server;
pub mod static_files;

pub use config::{resolve, ConfigError, ConfigErrors, EnvMap, Settings};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
