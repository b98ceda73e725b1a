//! JWT cookie construction from the auth cookie policy

use cookie::time::Duration;
use cookie::{Cookie, SameSite};

use crate::config::{AuthCookiePolicy, SameSitePolicy};

impl From<SameSitePolicy> for SameSite {
    fn from(policy: SameSitePolicy) -> Self {
        match policy {
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::Lax => SameSite::Lax,
            SameSitePolicy::None => SameSite::None,
        }
    }
}

impl AuthCookiePolicy {
    pub fn access_cookie(&self, token: &str) -> Cookie<'static> {
        self.build(&self.access_name, token, self.access_max_age_secs)
    }

    pub fn refresh_cookie(&self, token: &str) -> Cookie<'static> {
        self.build(&self.refresh_name, token, self.refresh_max_age_secs)
    }

    /// Expired cookies that clear both tokens on logout.
    pub fn removal_cookies(&self) -> [Cookie<'static>; 2] {
        [
            self.build(&self.access_name, "", 0),
            self.build(&self.refresh_name, "", 0),
        ]
    }

    fn build(&self, name: &str, value: &str, max_age_secs: i64) -> Cookie<'static> {
        Cookie::build((name.to_string(), value.to_string()))
            .path(self.path.clone())
            .secure(self.secure)
            .http_only(self.http_only)
            .same_site(self.same_site.into())
            .max_age(Duration::seconds(max_age_secs))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_cookie_attributes() {
        let policy = AuthCookiePolicy::new(true);
        let cookie = policy.access_cookie("jwt-token");

        assert_eq!(cookie.name(), "access");
        assert_eq!(cookie.value(), "jwt-token");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::None));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(300)));
    }

    #[test]
    fn test_refresh_cookie_lifetime() {
        let policy = AuthCookiePolicy::new(true);
        let cookie = policy.refresh_cookie("refresh-token");
        assert_eq!(cookie.name(), "refresh");
        assert_eq!(cookie.max_age(), Some(Duration::seconds(86400)));
    }

    #[test]
    fn test_removal_cookies_expire_immediately() {
        let policy = AuthCookiePolicy::new(false);
        for cookie in policy.removal_cookies() {
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        }
    }

    #[test]
    fn test_set_cookie_header() {
        let mut policy = AuthCookiePolicy::new(false);
        policy.same_site = SameSitePolicy::Lax;
        let header = policy.access_cookie("t").to_string();
        assert!(header.starts_with("access=t"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("SameSite=Lax"));
        assert!(!header.contains("Secure"));
    }
}
