// BSD 3-Clause License
// Copyright (c) 2025, Watchman
//! Configuration error types

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {key}")]
    MissingRequired { key: String },

    #[error("Invalid value for {key}: '{value}' - {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Parse error for {key}: {message}")]
    ParseError { key: String, message: String },

    #[error("Could not load environment file {path}: {message}")]
    EnvFile { path: String, message: String },
}

impl ConfigError {
    pub fn missing(key: &str) -> Self {
        ConfigError::MissingRequired {
            key: key.to_string(),
        }
    }

    pub fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Variable the error is about, or the file path for `EnvFile`.
    pub fn key(&self) -> &str {
        match self {
            ConfigError::MissingRequired { key }
            | ConfigError::InvalidValue { key, .. }
            | ConfigError::ParseError { key, .. } => key,
            ConfigError::EnvFile { path, .. } => path,
        }
    }

    /// True for errors caused by a value that is present but unusable.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            ConfigError::InvalidValue { .. } | ConfigError::ParseError { .. }
        )
    }
}

/// Every failure found while resolving settings. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigErrors(Vec<ConfigError>);

impl ConfigErrors {
    pub(crate) fn new(errors: Vec<ConfigError>) -> Self {
        debug_assert!(!errors.is_empty());
        ConfigErrors(errors)
    }

    pub fn errors(&self) -> &[ConfigError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_missing(&self, key: &str) -> bool {
        self.0
            .iter()
            .any(|e| matches!(e, ConfigError::MissingRequired { key: k } if k == key))
    }

    pub fn is_malformed(&self, key: &str) -> bool {
        self.0.iter().any(|e| e.is_malformed() && e.key() == key)
    }
}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} configuration error(s):", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigErrors {}
