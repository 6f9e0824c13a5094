//! Redirect-chain resolution.
//!
//! Follows a URL through transport (`Location` header) and HTML meta-refresh
//! redirects without ever letting the HTTP client redirect on its own, so
//! every intermediate hop is observed and classified. Produces a
//! [`RedirectChain`] trace of the visited URLs, the kind of each hop, and
//! the tracking counters seen along the way.

mod content;
mod fetch;
mod patterns;
mod url;

pub use content::{find_counters, find_meta_refresh, COUNTER_SIGNATURES};
pub use fetch::{fetch_one_hop, FetchedHop};
pub use patterns::{fix_market_url, PatternRegistry, GOOGLE_MARKET_PREFIX, GOOGLE_PLAY_PREFIX};
pub use url::prepare_url;

use log::debug;

use crate::models::{RedirectChain, RedirectKind};

/// Resolves the full redirect chain starting at `url`.
///
/// The start URL is normalized first; a URL that does not normalize yields a
/// degenerate single-entry trace with a `None` URL and no hops. A start URL
/// matching the terminal registry stops resolution before the first fetch;
/// the terminal rules apply only to the start URL, so a chain that lands on a
/// terminal page still fetches it and collects its counters. Counters found
/// in fetched content accumulate across all hops.
///
/// Resolution stops when a hop signals no redirect, when a hop fails (the
/// `Error` hop records the URL that failed), when a redirect target does not
/// normalize, or after `max_redirects` hops.
///
/// # Arguments
///
/// * `client` - Redirect-disabled HTTP client
/// * `url` - The URL to resolve
/// * `max_redirects` - Upper bound on followed hops
/// * `user_agent` - Optional User-Agent header for every request
/// * `registry` - Terminal and login-redirect pattern sets
pub async fn resolve_redirect_chain(
    client: &reqwest::Client,
    url: &str,
    max_redirects: usize,
    user_agent: Option<&str>,
    registry: &PatternRegistry,
) -> RedirectChain {
    let start = match prepare_url(Some(url)) {
        Some(start) => start,
        None => return RedirectChain::single(None),
    };

    let mut chain = RedirectChain::single(Some(start.clone()));
    if registry.is_terminal(&start) {
        debug!("{start} is a known final landing page, not fetching");
        return chain;
    }

    let mut next = Some(start);

    while chain.hop_types.len() < max_redirects {
        let current = match next.take() {
            Some(current) => current,
            None => break,
        };

        let hop = fetch_one_hop(client, &current, user_agent, registry).await;
        if let Some(body) = hop.content.as_deref() {
            chain.counters.extend(find_counters(body));
        }

        let kind = match hop.kind {
            Some(kind) => kind,
            None => break,
        };
        chain.hop_types.push(kind);
        chain.hop_urls.push(hop.redirect_url.clone());
        if kind == RedirectKind::Error {
            break;
        }
        next = hop.redirect_url;
    }

    chain
}
