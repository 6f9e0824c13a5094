//! Business-rule URL patterns.
//!
//! Two families of hard-coded third-party domain rules steer the chain
//! follower:
//!
//! - **terminal patterns**: destinations known to be final landing pages;
//!   fetching them wastes a request, so resolution stops before the first hop,
//! - **login-redirect patterns**: identity-provider bounces that look like a
//!   redirect but are not a real content redirect, so they are ignored.
//!
//! Both live in a [`PatternRegistry`] so deployments can swap the sets without
//! touching the matching semantics.

use regex::Regex;

/// Scheme prefix of Google Play deep links, as signaled in Location headers.
pub const GOOGLE_MARKET_PREFIX: &str = "market://";

/// Web equivalent of the `market://` scheme.
pub const GOOGLE_PLAY_PREFIX: &str = "http://play.google.com/store/apps/";

const TERMINAL_PATTERNS: [&str; 2] = [
    r"(?i)^https?://(www\.)?odnoklassniki\.ru/?(\?.*)?$",
    r"(?i)^https?://my\.mail\.ru/apps/",
];

const LOGIN_REDIRECT_PATTERNS: [&str; 1] =
    [r"(?i)^https?://(www\.)?odnoklassniki\.ru/.*st\.redirect"];

/// Registry of the terminal-domain and login-redirect rules.
#[derive(Debug)]
pub struct PatternRegistry {
    terminal: Vec<Regex>,
    login_redirect: Vec<Regex>,
}

impl PatternRegistry {
    /// Builds a registry from caller-supplied pattern sets.
    pub fn new(terminal: Vec<Regex>, login_redirect: Vec<Regex>) -> Self {
        PatternRegistry {
            terminal,
            login_redirect,
        }
    }

    /// Whether `url` is a known final landing page that must not be fetched.
    pub fn is_terminal(&self, url: &str) -> bool {
        self.terminal.iter().any(|p| p.is_match(url))
    }

    /// Whether `url` is a login bounce whose redirect must be ignored.
    pub fn is_login_redirect(&self, url: &str) -> bool {
        self.login_redirect.iter().any(|p| p.is_match(url))
    }
}

impl Default for PatternRegistry {
    fn default() -> Self {
        let compile = |pattern: &&str| {
            Regex::new(pattern).unwrap_or_else(|e| {
                panic!("failed to compile built-in pattern {pattern:?}: {e} - this is a bug")
            })
        };
        PatternRegistry {
            terminal: TERMINAL_PATTERNS.iter().map(compile).collect(),
            login_redirect: LOGIN_REDIRECT_PATTERNS.iter().map(compile).collect(),
        }
    }
}

/// Rewrites a `market://` deep link to the equivalent web store URL.
///
/// Everything after the scheme, including the query string, is preserved.
/// Non-market URLs are returned unchanged.
pub fn fix_market_url(url: &str) -> String {
    match url.strip_prefix(GOOGLE_MARKET_PREFIX) {
        Some(rest) => format!("{GOOGLE_PLAY_PREFIX}{rest}"),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_matches_social_root() {
        let registry = PatternRegistry::default();
        assert!(registry.is_terminal("https://odnoklassniki.ru/"));
        assert!(registry.is_terminal("http://www.odnoklassniki.ru"));
        assert!(registry.is_terminal("https://odnoklassniki.ru/?from=mail"));
    }

    #[test]
    fn test_terminal_matches_app_gateway() {
        let registry = PatternRegistry::default();
        assert!(registry.is_terminal("https://my.mail.ru/apps/"));
        assert!(registry.is_terminal("https://my.mail.ru/apps/12345"));
    }

    #[test]
    fn test_terminal_rejects_deep_paths() {
        let registry = PatternRegistry::default();
        assert!(!registry.is_terminal("https://odnoklassniki.ru/game/12"));
        assert!(!registry.is_terminal("https://my.mail.ru/music/"));
        assert!(!registry.is_terminal("http://example.com/"));
    }

    #[test]
    fn test_login_redirect_match() {
        let registry = PatternRegistry::default();
        assert!(registry.is_login_redirect("http://odnoklassniki.ru/123.123st.redirect"));
        assert!(registry.is_login_redirect("https://www.odnoklassniki.ru/profile/st.redirect?x=1"));
        assert!(!registry.is_login_redirect("http://odnoklassniki.ru/profile"));
    }

    #[test]
    fn test_fix_market_url() {
        assert_eq!(
            fix_market_url("market://details?id=air.com.terrypaton.tc2"),
            "http://play.google.com/store/apps/details?id=air.com.terrypaton.tc2"
        );
    }

    #[test]
    fn test_fix_market_url_leaves_web_urls_alone() {
        assert_eq!(
            fix_market_url("http://example.com/market://nope"),
            "http://example.com/market://nope"
        );
    }
}
