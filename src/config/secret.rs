// BSD 3-Clause License
// Copyright (c) 2025, Watchman
//! Secret values that must never be printed or serialized

use rand::Rng;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

pub const REDACTED: &str = "[REDACTED]";

const SECRET_KEY_LENGTH: usize = 50;
const SECRET_KEY_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*(-_=+)";
const MIN_UNIQUE_CHARS: usize = 5;
const INSECURE_PREFIX: &str = "django-insecure-";

/// A string whose `Debug`, `Display` and `Serialize` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", REDACTED)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

/// Where the signing key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretSource {
    Environment,
    Generated,
}

/// Key used to sign sessions and tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretKey {
    pub value: Secret,
    pub source: SecretSource,
}

impl SecretKey {
    pub fn from_env(value: String) -> Self {
        Self {
            value: Secret::new(value),
            source: SecretSource::Environment,
        }
    }

    pub fn generate() -> Self {
        Self {
            value: Secret::new(generate_secret_key()),
            source: SecretSource::Generated,
        }
    }

    pub fn is_generated(&self) -> bool {
        self.source == SecretSource::Generated
    }

    /// Reasons the key is unsuitable for signing in production, if any.
    pub fn weaknesses(&self) -> Vec<&'static str> {
        let key = self.value.expose();
        let mut reasons = Vec::new();
        if key.starts_with(INSECURE_PREFIX) {
            reasons.push("uses the insecure placeholder prefix");
        }
        if self.value.len() < SECRET_KEY_LENGTH {
            reasons.push("is shorter than 50 characters");
        }
        if key.chars().collect::<HashSet<_>>().len() < MIN_UNIQUE_CHARS {
            reasons.push("has fewer than 5 unique characters");
        }
        reasons
    }
}

pub fn generate_secret_key() -> String {
    let mut rng = rand::thread_rng();
    (0..SECRET_KEY_LENGTH)
        .map(|_| SECRET_KEY_CHARSET[rng.gen_range(0..SECRET_KEY_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_shape() {
        let key = generate_secret_key();
        assert_eq!(key.len(), 50);
        assert!(key.bytes().all(|b| SECRET_KEY_CHARSET.contains(&b)));
        assert_ne!(key, generate_secret_key());
    }

    #[test]
    fn test_secret_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{}", secret), REDACTED);
        assert!(!format!("{:?}", secret).contains("hunter2"));
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"[REDACTED]\"");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_weak_key_detection() {
        assert!(SecretKey::generate().weaknesses().is_empty());
        let short = SecretKey::from_env("aaaa".to_string());
        assert_eq!(
            short.weaknesses(),
            vec![
                "is shorter than 50 characters",
                "has fewer than 5 unique characters"
            ]
        );
        let placeholder = SecretKey::from_env(format!("django-insecure-{}", generate_secret_key()));
        assert_eq!(
            placeholder.weaknesses(),
            vec!["uses the insecure placeholder prefix"]
        );
    }
}
