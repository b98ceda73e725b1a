// BSD 3-Clause License
// Copyright (c) 2025, Watchman
//! Configuration loading from environment variables

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use url::Url;

use super::database::{DatabaseConnection, RemoteDatabase};
use super::env::{EnvMap, EnvReader};
use super::error::{ConfigError, ConfigErrors};
use super::secret::{Secret, SecretKey};
use super::types::*;

const DEFAULT_ALLOWED_HOSTS: &str = "127.0.0.1,localhost";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

impl Settings {
    /// Resolves settings from the process environment and command line.
    /// The project root comes from `WATCHMAN_BASE_DIR` or the working directory.
    pub fn from_env() -> Result<Self, ConfigErrors> {
        let argv: Vec<String> = env::args().collect();
        let env = EnvMap::from_process();
        let base_dir = project_root(&env).map_err(|e| ConfigErrors::new(vec![e]))?;
        resolve(env, &argv, &base_dir)
    }

    pub fn is_production(&self) -> bool {
        !self.development_mode
    }
}

/// Directory holding `.env.local`, `db.sqlite3`, `assets/` and `staticfiles/`.
pub fn project_root(env: &EnvMap) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = env.get(BASE_DIR_VAR).filter(|v| !v.trim().is_empty()) {
        let dir = PathBuf::from(dir);
        if !dir.is_absolute() {
            return Err(ConfigError::invalid(
                BASE_DIR_VAR,
                &dir.display().to_string(),
                "must be an absolute path",
            ));
        }
        return Ok(dir);
    }

    env::current_dir().map_err(|e| ConfigError::ParseError {
        key: BASE_DIR_VAR.to_string(),
        message: format!("cannot determine working directory: {}", e),
    })
}

/// Builds the full settings record in one pass. Every missing or malformed
/// variable is reported together.
pub fn resolve(mut env: EnvMap, argv: &[String], base_dir: &Path) -> Result<Settings, ConfigErrors> {
    env.merge_env_file(&base_dir.join(ENV_FILE_NAME))
        .map_err(|e| ConfigErrors::new(vec![e]))?;

    let command = Command::from_args(argv);
    let mut reader = EnvReader::new(&env);

    let development_mode = reader.flag("DEVELOPMENT_MODE", false);

    let secret_key = match reader.optional("DJANGO_SECRET_KEY") {
        Some(key) => SecretKey::from_env(key),
        None => SecretKey::generate(),
    };

    let debug = reader.flag("DEBUG", false);
    let allowed_hosts: BTreeSet<String> = reader
        .list("DJANGO_ALLOWED_HOSTS", DEFAULT_ALLOWED_HOSTS)
        .into_iter()
        .collect();

    let database = resolve_database(&mut reader, &command, base_dir, development_mode);
    let email = resolve_email(&mut reader);

    let site = SiteConfig {
        domain: reader.optional("DOMAIN"),
        name: SITE_NAME.to_string(),
    };

    let auth_cookie = resolve_cookie_policy(&reader, development_mode);

    let account_flows = reader
        .required_list("REDIRECT_URIS")
        .map(|uris| AccountFlowConfig::new(absolute_urls(&mut reader, "REDIRECT_URIS", uris)));

    let social = ProviderName::ALL
        .iter()
        .map(|name| (*name, resolve_provider(&mut reader, *name)))
        .collect();

    let cors = CorsConfig {
        allowed_origins: reader
            .list("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ORIGINS)
            .into_iter()
            .filter(|origin| check_origin(&mut reader, "CORS_ALLOWED_ORIGINS", origin))
            .collect(),
        allow_credentials: true,
    };

    let static_assets = StaticAssetStrategy::for_mode(base_dir, development_mode);

    let server = ServerConfig {
        host: reader.or("SERVER_HOST", "127.0.0.1"),
        port: reader.parse("SERVER_PORT", 8000u16),
    };

    let mut errors = reader.finish();

    let (Some(email), Some(account_flows)) = (email, account_flows) else {
        return Err(ConfigErrors::new(errors));
    };

    let settings = Settings {
        base_dir: base_dir.to_path_buf(),
        development_mode,
        debug,
        secret_key,
        allowed_hosts,
        database,
        email,
        site,
        auth_cookie,
        account_flows,
        social,
        cors,
        static_assets,
        server,
        command,
        command_args: command_args(argv),
    };

    errors.extend(settings.validate());
    if !errors.is_empty() {
        return Err(ConfigErrors::new(errors));
    }

    let mode = if settings.development_mode {
        "development"
    } else {
        "production"
    };
    info!(
        mode,
        command = %settings.command,
        debug = settings.debug,
        "Settings resolved"
    );
    Ok(settings)
}

fn resolve_database(
    reader: &mut EnvReader<'_>,
    command: &Command,
    base_dir: &Path,
    development_mode: bool,
) -> Option<DatabaseConnection> {
    if development_mode {
        return Some(DatabaseConnection::local(base_dir));
    }
    if command.is_static_collection() {
        info!("Static collection does not need a database, skipping DATABASE_URL");
        return None;
    }

    let url = reader.required("DATABASE_URL")?;
    match RemoteDatabase::parse("DATABASE_URL", &url) {
        Ok(remote) => Some(DatabaseConnection::Remote(remote)),
        Err(e) => {
            reader.push(e);
            None
        }
    }
}

fn resolve_email(reader: &mut EnvReader<'_>) -> Option<EmailConfig> {
    let host = reader.required("EMAIL_HOST");
    let port = reader.required_parse::<u16>("EMAIL_PORT");
    let user = reader.required("EMAIL_HOST_USER");
    let password = reader.required("EMAIL_HOST_PASSWORD");
    let use_tls = reader.switch("EMAIL_USE_TLS", true);
    let use_ssl = reader.switch("EMAIL_USE_SSL", false);

    Some(EmailConfig {
        host: host?,
        port: port?,
        default_from_email: user.clone()?,
        user: user?,
        password: Secret::new(password?),
        use_tls,
        use_ssl,
    })
}

fn resolve_cookie_policy(reader: &EnvReader<'_>, development_mode: bool) -> AuthCookiePolicy {
    let mut policy = AuthCookiePolicy::new(reader.flag("AUTH_COOKIE_SECURE", true));
    if development_mode && !policy.is_deliverable_cross_site() {
        warn!("AUTH_COOKIE_SECURE is off; using SameSite=Lax for auth cookies in development");
        policy.same_site = SameSitePolicy::Lax;
    }
    policy
}

fn resolve_provider(reader: &mut EnvReader<'_>, name: ProviderName) -> SocialProvider {
    let Some(client_id) = reader.optional(name.key_var()) else {
        info!(provider = %name, "Social login provider disabled (no {} set)", name.key_var());
        return SocialProvider::Disabled;
    };
    match reader.required(name.secret_var()) {
        Some(secret) => SocialProvider::Enabled {
            client_id,
            client_secret: Secret::new(secret),
            scopes: name.scopes(),
            extra: name.extra(),
        },
        None => SocialProvider::Disabled,
    }
}

/// Keeps only absolute http(s) URLs, recording the rest as invalid.
fn absolute_urls(reader: &mut EnvReader<'_>, key: &str, values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .filter(|value| match Url::parse(value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => true,
            _ => {
                reader.push(ConfigError::invalid(key, value, "expected an absolute http(s) URL"));
                false
            }
        })
        .collect()
}

/// A CORS origin is `scheme://host[:port]` with nothing after the authority.
fn check_origin(reader: &mut EnvReader<'_>, key: &str, origin: &str) -> bool {
    let reason = match Url::parse(origin) {
        Err(e) => Some(e.to_string()),
        Ok(url) if !matches!(url.scheme(), "http" | "https") => {
            Some("origin scheme must be http or https".to_string())
        }
        Ok(url) if !url.has_host() => Some("origin must include a host".to_string()),
        Ok(url) if url.path() != "/" || origin.ends_with('/') => {
            Some("origin must not include a path".to_string())
        }
        Ok(url) if url.query().is_some() || url.fragment().is_some() => {
            Some("origin must not include a query or fragment".to_string())
        }
        Ok(_) => None,
    };
    match reason {
        Some(reason) => {
            reader.push(ConfigError::invalid(key, origin, reason));
            false
        }
        None => true,
    }
}

/// Providers that are configured, in name order.
pub fn enabled_providers(social: &BTreeMap<ProviderName, SocialProvider>) -> Vec<ProviderName> {
    social
        .iter()
        .filter(|(_, provider)| provider.is_enabled())
        .map(|(name, _)| *name)
        .collect()
}
