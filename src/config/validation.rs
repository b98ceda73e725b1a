// BSD 3-Clause License
// Copyright (c) 2025, Watchman
//
//! Configuration validation

use lettre::message::Mailbox;
use tracing::warn;

use super::error::ConfigError;
use super::types::{SameSitePolicy, Settings};

impl Settings {
    /// Cross-field checks run once the record is assembled. Returns every
    /// fatal problem; non-fatal ones are logged.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.email.use_tls && self.email.use_ssl {
            errors.push(ConfigError::invalid(
                "EMAIL_USE_SSL",
                "true",
                "EMAIL_USE_TLS and EMAIL_USE_SSL are mutually exclusive",
            ));
        }

        if self.allowed_hosts.is_empty() && !self.debug {
            errors.push(ConfigError::invalid(
                "DJANGO_ALLOWED_HOSTS",
                "",
                "At least one allowed host is required when DEBUG is off",
            ));
        }

        if !self.auth_cookie.is_deliverable_cross_site() {
            errors.push(ConfigError::invalid(
                "AUTH_COOKIE_SECURE",
                "False",
                format!(
                    "SameSite={} auth cookies must be Secure outside development",
                    SameSitePolicy::None
                ),
            ));
        }

        if self.email.default_from_email.parse::<Mailbox>().is_err() {
            warn!(
                "EMAIL_HOST_USER '{}' is not a valid sender address; outgoing mail may be rejected",
                self.email.default_from_email
            );
        }

        if self.is_production() {
            if self.debug {
                warn!("DEBUG is enabled in production!");
            }
            if self.secret_key.is_generated() {
                warn!("DJANGO_SECRET_KEY is not set; a random key was generated and sessions will not survive a restart");
            }
            for weakness in self.secret_key.weaknesses() {
                warn!("DJANGO_SECRET_KEY {}", weakness);
            }
        }

        errors
    }
}
