//! Watchman Security Module
//!
//! Host header validation against the allowed-hosts setting.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

use crate::config::Settings;

/// Hosts accepted when running with DEBUG and no explicit allowed hosts
const DEBUG_HOSTS: [&str; 3] = [".localhost", "127.0.0.1", "[::1]"];

/// Allowed-host patterns in effect for these settings.
pub fn effective_allowed_hosts(settings: &Settings) -> BTreeSet<String> {
    if settings.debug && settings.allowed_hosts.is_empty() {
        DEBUG_HOSTS.iter().map(|h| h.to_string()).collect()
    } else {
        settings.allowed_hosts.clone()
    }
}

/// Splits a `Host` header into the domain, dropping any port. Returns `None`
/// for malformed values.
pub fn split_domain_port(host: &str) -> Option<String> {
    let host = host.trim().to_lowercase();
    if host.is_empty() {
        return None;
    }

    let domain = if host.starts_with('[') {
        // IPv6 literal: keep the brackets, drop an optional :port
        let end = host.find(']')?;
        let (domain, rest) = host.split_at(end + 1);
        if !(rest.is_empty() || valid_port(rest.strip_prefix(':')?)) {
            return None;
        }
        domain.to_string()
    } else {
        match host.rsplit_once(':') {
            Some((domain, port)) if valid_port(port) => domain.to_string(),
            Some(_) => return None,
            None => host,
        }
    };

    let domain = domain.trim_end_matches('.').to_string();
    let valid = domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '[' | ']' | ':'));
    (valid && !domain.is_empty()).then_some(domain)
}

fn valid_port(port: &str) -> bool {
    !port.is_empty() && port.len() <= 5 && port.chars().all(|c| c.is_ascii_digit())
}

/// `*` matches everything, `.example.com` matches the domain and its
/// subdomains, anything else must match exactly.
pub fn is_same_domain(host: &str, pattern: &str) -> bool {
    let pattern = pattern.to_lowercase();
    if pattern == "*" {
        return true;
    }
    match pattern.strip_prefix('.') {
        Some(base) => host == base || host.ends_with(&pattern),
        None => host == pattern,
    }
}

pub fn validate_host<'a, I>(host: &str, allowed: I) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    match split_domain_port(host) {
        Some(domain) => allowed.into_iter().any(|pattern| is_same_domain(&domain, pattern)),
        None => false,
    }
}

/// Rejects requests whose `Host` header is not an allowed host.
pub async fn allowed_hosts_middleware(
    State(allowed): State<Arc<BTreeSet<String>>>,
    request: Request,
    next: Next,
) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.to_string()));

    match host {
        Some(host) if validate_host(&host, allowed.iter()) => next.run(request).await,
        Some(host) => {
            warn!("Rejected request with disallowed Host header: {}", host);
            (StatusCode::BAD_REQUEST, "Invalid Host header").into_response()
        }
        None => {
            warn!("Rejected request without Host header");
            (StatusCode::BAD_REQUEST, "Missing Host header").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_domain_port() {
        assert_eq!(split_domain_port("Example.COM:8000").as_deref(), Some("example.com"));
        assert_eq!(split_domain_port("example.com.").as_deref(), Some("example.com"));
        assert_eq!(split_domain_port("[::1]:8000").as_deref(), Some("[::1]"));
        assert_eq!(split_domain_port("[::1]").as_deref(), Some("[::1]"));
        assert_eq!(split_domain_port("example.com:http"), None);
        assert_eq!(split_domain_port("exa mple.com"), None);
        assert_eq!(split_domain_port(""), None);
    }

    #[test]
    fn test_exact_host() {
        let allowed = hosts(&["127.0.0.1", "localhost"]);
        assert!(validate_host("localhost:8000", &allowed));
        assert!(validate_host("127.0.0.1", &allowed));
        assert!(!validate_host("evil.com", &allowed));
        assert!(!validate_host("sub.localhost", &allowed));
    }

    #[test]
    fn test_subdomain_wildcard() {
        let allowed = hosts(&[".example.com"]);
        assert!(validate_host("example.com", &allowed));
        assert!(validate_host("api.example.com", &allowed));
        assert!(!validate_host("badexample.com", &allowed));
    }

    #[test]
    fn test_star_matches_everything() {
        let allowed = hosts(&["*"]);
        assert!(validate_host("anything.test", &allowed));
        assert!(!validate_host("bad host", &allowed));
    }
}
