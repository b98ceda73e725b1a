// BSD 3-Clause License
// Copyright (c) 2025, Watchman
//
//! Watchman Configuration Module
//! Settings are resolved once at startup from `.env.local`, the process
//! environment and defaults, then shared read-only as `Arc<Settings>`.

mod database;
mod env;
mod error;
mod loader;
mod secret;
mod types;
mod validation;

pub use database::{DatabaseConnection, DatabaseEngine, RemoteDatabase, SQLITE_FILE_NAME};
pub use env::{split_list, EnvMap};
pub use error::{ConfigError, ConfigErrors};
pub use loader::{enabled_providers, project_root, resolve};
pub use secret::{generate_secret_key, Secret, SecretKey, SecretSource, REDACTED};
pub use types::{
    command_args, mount_path, AccountFlowConfig, AuthCookiePolicy, Command, CorsConfig,
    EmailConfig, ProviderName, SameSitePolicy, ServerConfig, Settings, SiteConfig,
    SocialProvider, StaticAssetStrategy, BASE_DIR_VAR, ENV_FILE_NAME, SITE_NAME,
};
