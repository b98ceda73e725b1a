// BSD 3-Clause License
// Copyright (c) 2025, Watchman
//
//! Configuration type definitions
//! All configuration structs and enums used throughout the application.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use super::database::DatabaseConnection;
use super::secret::{Secret, SecretKey};

pub const SITE_NAME: &str = "WatchMan";
pub const ENV_FILE_NAME: &str = ".env.local";
/// Overrides the project root, which otherwise is the working directory.
pub const BASE_DIR_VAR: &str = "WATCHMAN_BASE_DIR";

/// Main application configuration
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub base_dir: PathBuf,
    pub development_mode: bool,
    pub debug: bool,
    pub secret_key: SecretKey,
    pub allowed_hosts: BTreeSet<String>,
    /// `None` only while collecting static files in production
    pub database: Option<DatabaseConnection>,
    pub email: EmailConfig,
    pub site: SiteConfig,
    pub auth_cookie: AuthCookiePolicy,
    pub account_flows: AccountFlowConfig,
    pub social: BTreeMap<ProviderName, SocialProvider>,
    pub cors: CorsConfig,
    pub static_assets: StaticAssetStrategy,
    pub server: ServerConfig,
    pub command: Command,
    /// Arguments after the command name
    pub command_args: Vec<String>,
}

/// Administrative command selected by the first CLI argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    RunServer,
    CollectStatic,
    Check,
    Other(String),
}

impl Command {
    /// Reads `argv[1]`; no argument means `runserver`.
    pub fn from_args(argv: &[String]) -> Self {
        match argv.get(1).map(String::as_str) {
            None | Some("runserver") => Command::RunServer,
            Some("collectstatic") => Command::CollectStatic,
            Some("check") => Command::Check,
            Some(other) => Command::Other(other.to_string()),
        }
    }

    pub fn is_static_collection(&self) -> bool {
        *self == Command::CollectStatic
    }
}

/// `argv[2..]`, the arguments handed to the selected command.
pub fn command_args(argv: &[String]) -> Vec<String> {
    argv.iter().skip(2).cloned().collect()
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::RunServer => write!(f, "runserver"),
            Command::CollectStatic => write!(f, "collectstatic"),
            Command::Check => write!(f, "check"),
            Command::Other(name) => write!(f, "{}", name),
        }
    }
}

/// SMTP delivery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret,
    pub use_tls: bool,
    pub use_ssl: bool,
    pub default_from_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteConfig {
    pub domain: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SameSitePolicy {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSitePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSitePolicy::Strict => write!(f, "Strict"),
            SameSitePolicy::Lax => write!(f, "Lax"),
            SameSitePolicy::None => write!(f, "None"),
        }
    }
}

/// JWT cookie policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthCookiePolicy {
    pub access_name: String,
    pub refresh_name: String,
    pub access_max_age_secs: i64,
    pub refresh_max_age_secs: i64,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSitePolicy,
    pub path: String,
}

impl AuthCookiePolicy {
    pub const ACCESS_MAX_AGE_SECS: i64 = 60 * 5;
    pub const REFRESH_MAX_AGE_SECS: i64 = 60 * 60 * 24;

    pub fn new(secure: bool) -> Self {
        Self {
            access_name: "access".to_string(),
            refresh_name: "refresh".to_string(),
            access_max_age_secs: Self::ACCESS_MAX_AGE_SECS,
            refresh_max_age_secs: Self::REFRESH_MAX_AGE_SECS,
            secure,
            http_only: true,
            same_site: SameSitePolicy::None,
            path: "/".to_string(),
        }
    }

    /// Browsers drop `SameSite=None` cookies that are not also `Secure`.
    pub fn is_deliverable_cross_site(&self) -> bool {
        self.same_site != SameSitePolicy::None || self.secure
    }
}

/// Account activation and password-reset flow settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountFlowConfig {
    pub password_reset_confirm_url: String,
    pub activation_url: String,
    pub send_activation_email: bool,
    pub user_create_password_retype: bool,
    pub password_reset_confirm_retype: bool,
    pub social_redirect_uris: Vec<String>,
}

impl AccountFlowConfig {
    pub fn new(social_redirect_uris: Vec<String>) -> Self {
        Self {
            password_reset_confirm_url: "#/password-reset/{uid}/{token}".to_string(),
            activation_url: "#/activation/{uid}/{token}".to_string(),
            send_activation_email: true,
            user_create_password_retype: true,
            password_reset_confirm_retype: true,
            social_redirect_uris,
        }
    }

    pub fn is_allowed_redirect(&self, uri: &str) -> bool {
        self.social_redirect_uris.iter().any(|allowed| allowed == uri)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    Google,
    Facebook,
}

impl ProviderName {
    pub const ALL: [ProviderName; 2] = [ProviderName::Google, ProviderName::Facebook];

    pub fn key_var(&self) -> &'static str {
        match self {
            ProviderName::Google => "GOOGLE_AUTH_KEY",
            ProviderName::Facebook => "FACEBOOK_AUTH_KEY",
        }
    }

    pub fn secret_var(&self) -> &'static str {
        match self {
            ProviderName::Google => "GOOGLE_AUTH_SECRET_KEY",
            ProviderName::Facebook => "FACEBOOK_AUTH_SECRET_KEY",
        }
    }

    pub fn scopes(&self) -> Vec<String> {
        let scopes: &[&str] = match self {
            ProviderName::Google => &[
                "https://www.googleapis.com/auth/userinfo.email",
                "https://www.googleapis.com/auth/userinfo.profile",
                "openid",
            ],
            ProviderName::Facebook => &["email"],
        };
        scopes.iter().map(|s| s.to_string()).collect()
    }

    /// Extra profile data requested from the provider
    pub fn extra(&self) -> BTreeMap<String, String> {
        let (key, value) = match self {
            ProviderName::Google => ("extra_data", "first_name,last_name"),
            ProviderName::Facebook => ("fields", "email, first_name, last_name"),
        };
        BTreeMap::from([(key.to_string(), value.to_string())])
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderName::Google => write!(f, "google-oauth2"),
            ProviderName::Facebook => write!(f, "facebook"),
        }
    }
}

/// OAuth2 login provider. Unconfigured providers are `Disabled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SocialProvider {
    Enabled {
        client_id: String,
        client_secret: Secret,
        scopes: Vec<String>,
        extra: BTreeMap<String, String>,
    },
    Disabled,
}

impl SocialProvider {
    pub fn is_enabled(&self) -> bool {
        matches!(self, SocialProvider::Enabled { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorsConfig {
    pub allowed_origins: BTreeSet<String>,
    pub allow_credentials: bool,
}

/// How static assets are laid out and served
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StaticAssetStrategy {
    /// Plain files served from disk, with user uploads under `media_root`
    LocalFilesystem {
        static_root: PathBuf,
        static_url: String,
        media_root: PathBuf,
        media_url: String,
    },
    /// Content-hashed file names plus a manifest, served compressed
    CompressedManifest {
        static_root: PathBuf,
        static_url: String,
    },
}

impl StaticAssetStrategy {
    pub fn for_mode(base_dir: &Path, development_mode: bool) -> Self {
        if development_mode {
            StaticAssetStrategy::LocalFilesystem {
                static_root: base_dir.join("static"),
                static_url: "static/".to_string(),
                media_root: base_dir.join("media"),
                media_url: "media/".to_string(),
            }
        } else {
            StaticAssetStrategy::CompressedManifest {
                static_root: base_dir.join("staticfiles"),
                static_url: "/static/".to_string(),
            }
        }
    }

    pub fn static_root(&self) -> &Path {
        match self {
            StaticAssetStrategy::LocalFilesystem { static_root, .. }
            | StaticAssetStrategy::CompressedManifest { static_root, .. } => static_root,
        }
    }

    pub fn static_url(&self) -> &str {
        match self {
            StaticAssetStrategy::LocalFilesystem { static_url, .. }
            | StaticAssetStrategy::CompressedManifest { static_url, .. } => static_url,
        }
    }

    pub fn is_manifest(&self) -> bool {
        matches!(self, StaticAssetStrategy::CompressedManifest { .. })
    }
}

/// Router mount point for a relative or absolute URL prefix: `static/` -> `/static`.
pub fn mount_path(url: &str) -> String {
    format!("/{}", url.trim_matches('/'))
}

/// Server binding configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}
