// BSD 3-Clause License
// Copyright (c) 2025, Watchman
//! Environment snapshot and typed readers
//!
//! Settings are resolved from an owned snapshot rather than the live process
//! environment, so resolution never mutates global state and tests can pass
//! their own variables.

use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use super::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvMap {
    vars: BTreeMap<String, String>,
}

impl EnvMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment. Non-UTF-8 entries are skipped.
    pub fn from_process() -> Self {
        let vars = env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn without(mut self, key: &str) -> Self {
        self.vars.remove(key);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Merges `KEY=value` lines from `path`. Keys already present are kept.
    /// Returns the number of keys added; a missing file adds none.
    pub fn merge_env_file(&mut self, path: &Path) -> Result<usize, ConfigError> {
        let env_file_error = |message: String| ConfigError::EnvFile {
            path: path.display().to_string(),
            message,
        };

        let iter = match dotenvy::from_path_iter(path) {
            Ok(iter) => iter,
            Err(e) if e.not_found() => {
                debug!("No environment file at {}, using process environment only", path.display());
                return Ok(0);
            }
            Err(e) => return Err(env_file_error(env_file_message(&e, 0))),
        };

        let mut added = 0;
        for (entry, item) in iter.enumerate() {
            let (key, value) = item.map_err(|e| env_file_error(env_file_message(&e, entry + 1)))?;
            if !self.vars.contains_key(&key) {
                self.vars.insert(key, value);
                added += 1;
            }
        }

        info!("Loaded {} variable(s) from {}", added, path.display());
        Ok(added)
    }
}

/// Describes a dotenv failure without the offending line, which may hold a secret.
fn env_file_message(error: &dotenvy::Error, entry: usize) -> String {
    match error {
        dotenvy::Error::LineParse(_, index) => {
            format!("malformed entry {} (error at character {})", entry, index)
        }
        other => other.to_string(),
    }
}

impl<K, V> FromIterator<(K, V)> for EnvMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Reads typed values from an `EnvMap`, collecting every failure instead of
/// stopping at the first one.
pub(crate) struct EnvReader<'a> {
    env: &'a EnvMap,
    errors: Vec<ConfigError>,
}

impl<'a> EnvReader<'a> {
    pub fn new(env: &'a EnvMap) -> Self {
        Self {
            env,
            errors: Vec::new(),
        }
    }

    pub fn push(&mut self, error: ConfigError) {
        self.errors.push(error);
    }

    pub fn finish(self) -> Vec<ConfigError> {
        self.errors
    }

    pub fn raw(&self, key: &str) -> Option<&'a str> {
        self.env.get(key)
    }

    pub fn or(&self, key: &str, default: &str) -> String {
        self.raw(key).unwrap_or(default).to_string()
    }

    /// Value if set and non-empty.
    pub fn optional(&self, key: &str) -> Option<String> {
        self.raw(key)
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
    }

    pub fn required(&mut self, key: &str) -> Option<String> {
        let value = self.optional(key);
        if value.is_none() {
            self.errors.push(ConfigError::missing(key));
        }
        value
    }

    /// Exact-case `True`/`False`; anything else falls back to `default`.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.raw(key) {
            Some("True") => true,
            Some("False") => false,
            _ => default,
        }
    }

    /// Lenient boolean (`yes`, `on`, `1`, ...). Unrecognised values are errors.
    pub fn switch(&mut self, key: &str, default: bool) -> bool {
        let Some(value) = self.raw(key) else {
            return default;
        };
        match value.trim().to_lowercase().as_str() {
            "y" | "yes" | "t" | "true" | "on" | "1" => true,
            "n" | "no" | "f" | "false" | "off" | "0" => false,
            _ => {
                self.errors.push(ConfigError::invalid(
                    key,
                    value,
                    "expected a boolean such as true/false, yes/no, on/off or 1/0",
                ));
                default
            }
        }
    }

    pub fn parse<T>(&mut self, key: &str, default: T) -> T
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.raw(key) {
            Some(value) => self.parse_value(key, value).unwrap_or(default),
            None => default,
        }
    }

    pub fn required_parse<T>(&mut self, key: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self.required(key)?;
        self.parse_value(key, &value)
    }

    fn parse_value<T>(&mut self, key: &str, value: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match value.trim().parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                self.errors
                    .push(ConfigError::invalid(key, value, format!("{}", e)));
                None
            }
        }
    }

    pub fn list(&self, key: &str, default: &str) -> Vec<String> {
        split_list(self.raw(key).unwrap_or(default))
    }

    pub fn required_list(&mut self, key: &str) -> Option<Vec<String>> {
        let items = split_list(&self.required(key)?);
        if items.is_empty() {
            self.errors.push(ConfigError::missing(key));
            return None;
        }
        Some(items)
    }
}

pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn env(pairs: &[(&str, &str)]) -> EnvMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_flag_is_exact_case() {
        let map = env(&[("A", "True"), ("B", "true"), ("C", ""), ("D", "False")]);
        let reader = EnvReader::new(&map);
        assert!(reader.flag("A", false));
        assert!(!reader.flag("B", false));
        assert!(reader.flag("B", true));
        assert!(!reader.flag("C", false));
        assert!(reader.flag("C", true));
        assert!(!reader.flag("D", true));
        assert!(reader.flag("UNSET", true));
        assert!(!reader.flag("UNSET", false));
    }

    #[test]
    fn test_switch_accepts_common_spellings() {
        let map = env(&[("ON", "yes"), ("OFF", "0"), ("BAD", "maybe")]);
        let mut reader = EnvReader::new(&map);
        assert!(reader.switch("ON", false));
        assert!(!reader.switch("OFF", true));
        assert!(reader.switch("UNSET", true));
        assert!(!reader.switch("BAD", false));
        let errors = reader.finish();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].key(), "BAD");
    }

    #[test]
    fn test_required_treats_empty_as_missing() {
        let map = env(&[("EMPTY", "  ")]);
        let mut reader = EnvReader::new(&map);
        assert_eq!(reader.required("EMPTY"), None);
        assert_eq!(reader.required("UNSET"), None);
        assert_eq!(
            reader.finish(),
            vec![ConfigError::missing("EMPTY"), ConfigError::missing("UNSET")]
        );
    }

    #[test]
    fn test_parse_records_invalid_values() {
        let map = env(&[("PORT", "not-a-port"), ("OK", "25")]);
        let mut reader = EnvReader::new(&map);
        assert_eq!(reader.parse("PORT", 8000u16), 8000);
        assert_eq!(reader.required_parse::<u16>("OK"), Some(25));
        let errors = reader.finish();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_malformed());
    }

    #[test]
    fn test_list_trims_and_drops_empty() {
        assert_eq!(split_list(" a.com , ,b.com,"), vec!["a.com", "b.com"]);
        let map = EnvMap::new();
        let reader = EnvReader::new(&map);
        assert_eq!(reader.list("HOSTS", "127.0.0.1,localhost"), vec!["127.0.0.1", "localhost"]);
    }

    #[test]
    fn test_env_file_does_not_override() {
        let dir = std::env::temp_dir().join(format!("watchman-envfile-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(".env.local");
        fs::write(&path, "DEBUG=True\nDOMAIN=file.example\n# comment\nQUOTED=\"a b\"\n").unwrap();

        let mut map = env(&[("DOMAIN", "process.example")]);
        let added = map.merge_env_file(&path).unwrap();

        assert_eq!(added, 2);
        assert_eq!(map.get("DEBUG"), Some("True"));
        assert_eq!(map.get("DOMAIN"), Some("process.example"));
        assert_eq!(map.get("QUOTED"), Some("a b"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_env_file_is_not_an_error() {
        let mut map = EnvMap::new();
        let added = map
            .merge_env_file(Path::new("/nonexistent/watchman/.env.local"))
            .unwrap();
        assert_eq!(added, 0);
        assert!(map.is_empty());
    }

    #[test]
    fn test_malformed_env_file_hides_line() {
        let dir = std::env::temp_dir().join(format!("watchman-envfile-bad-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(".env.local");
        fs::write(&path, "DEBUG=True\nEMAIL_HOST_PASSWORD='hunter2-top-secret\n").unwrap();

        let err = EnvMap::new().merge_env_file(&path).unwrap_err();
        let message = err.to_string();

        assert!(matches!(err, ConfigError::EnvFile { .. }));
        assert!(message.contains("malformed entry 2"));
        assert!(!message.contains("hunter2"));
        assert!(!message.contains("EMAIL_HOST_PASSWORD"));
        fs::remove_dir_all(&dir).ok();
    }
}
