//! Single-hop fetch and redirect classification.

use log::debug;
use reqwest::header::{LOCATION, USER_AGENT};
use url::Url;

use crate::models::RedirectKind;
use crate::resolve::content::find_meta_refresh;
use crate::resolve::patterns::{fix_market_url, PatternRegistry, GOOGLE_MARKET_PREFIX};
use crate::resolve::url::prepare_url;

/// Outcome of fetching one URL in a redirect chain.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedHop {
    /// Body of the response, when one was received.
    pub content: Option<String>,
    /// Normalized next URL, when the hop signaled a redirect.
    pub redirect_url: Option<String>,
    /// Classification of the redirect, when one was signaled.
    pub kind: Option<RedirectKind>,
}

impl FetchedHop {
    fn terminal(content: Option<String>) -> Self {
        FetchedHop {
            content,
            redirect_url: None,
            kind: None,
        }
    }

    fn error(url: &str) -> Self {
        FetchedHop {
            content: None,
            // The URL that failed is recorded as the hop, not a target.
            redirect_url: Some(url.to_string()),
            kind: Some(RedirectKind::Error),
        }
    }
}

/// Fetches `url` once and classifies any redirect it signals.
///
/// Transport and request-construction failures never propagate: they come
/// back as an `Error` hop pointing at the URL that failed. A transport
/// redirect wins over a meta refresh; a redirect matching the login-bounce
/// registry is treated as no redirect at all; `market://` targets are
/// rewritten to their web equivalent before normalization.
pub async fn fetch_one_hop(
    client: &reqwest::Client,
    url: &str,
    user_agent: Option<&str>,
    registry: &PatternRegistry,
) -> FetchedHop {
    let mut request = client.get(url);
    if let Some(ua) = user_agent {
        request = request.header(USER_AGENT, ua);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            debug!("fetch failed for {url}: {e}");
            return FetchedHop::error(url);
        }
    };

    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    // A body read failure after a successful exchange is not an ERROR hop;
    // the redirect signal, if any, is still usable.
    let content = match response.text().await {
        Ok(body) => Some(body),
        Err(e) => {
            debug!("failed to read body of {url}: {e}");
            None
        }
    };

    if let Some(raw) = location {
        if registry.is_login_redirect(&raw) {
            debug!("ignoring login redirect {raw} from {url}");
            return FetchedHop::terminal(content);
        }
        let target = if raw.starts_with(GOOGLE_MARKET_PREFIX) {
            fix_market_url(&raw)
        } else {
            resolve_location(url, &raw)
        };
        return FetchedHop {
            content,
            redirect_url: prepare_url(Some(&target)),
            kind: Some(RedirectKind::Http),
        };
    }

    if let Some(body) = content.as_deref() {
        if let Some(target) = find_meta_refresh(body, url) {
            return FetchedHop {
                content,
                redirect_url: prepare_url(Some(&target)),
                kind: Some(RedirectKind::Meta),
            };
        }
    }

    FetchedHop::terminal(content)
}

/// Resolves a possibly relative Location value against the requested URL.
fn resolve_location(current: &str, location: &str) -> String {
    match Url::parse(current).and_then(|base| base.join(location)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => location.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_location_absolute() {
        assert_eq!(
            resolve_location("http://example.com/a", "https://other.com/b"),
            "https://other.com/b"
        );
    }

    #[test]
    fn test_resolve_location_relative() {
        assert_eq!(
            resolve_location("http://example.com/old/page", "/new"),
            "http://example.com/new"
        );
    }

    #[test]
    fn test_fetched_hop_error_records_failed_url() {
        let hop = FetchedHop::error("http://bad.example/");
        assert_eq!(hop.redirect_url.as_deref(), Some("http://bad.example/"));
        assert_eq!(hop.kind, Some(RedirectKind::Error));
        assert!(hop.content.is_none());
    }
}
