//! Fetched-content inspection: tracking pixels and meta-refresh redirects.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Static registry of known tracking-pixel URL signatures.
///
/// Order matters: counters are reported in registry order.
pub const COUNTER_SIGNATURES: [(&str, &str); 7] = [
    ("GOOGLE_ANALYTICS", "google-analytics.com/ga.js"),
    ("YA_METRICA", "mc.yandex.ru/metrika/watch.js"),
    ("TOP_MAIL_RU", "top-fwz1.mail.ru/counter"),
    ("DOUBLECLICK", "ad.doubleclick.net"),
    ("VISUALDNA", "a1.vdna-assets.com"),
    ("LI_RU", "counter.yadro.ru/hit"),
    ("RAMBLER_TOP100", "counter.rambler.ru/top100"),
];

static META_REFRESH_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[http-equiv="refresh" i]"#)
        .expect("failed to parse meta-refresh selector - this is a bug")
});

static META_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url=['"]?([^'"]*)"#)
        .expect("failed to compile meta url pattern - this is a bug")
});

/// Scans content for known tracking-pixel signatures.
///
/// # Arguments
///
/// * `content` - Raw fetched body
///
/// # Returns
///
/// The ordered list of matched counter names; empty for unrelated content.
pub fn find_counters(content: &str) -> Vec<String> {
    COUNTER_SIGNATURES
        .iter()
        .filter(|(_, signature)| content.contains(signature))
        .map(|(name, _)| (*name).to_string())
        .collect()
}

/// Locates a meta-refresh directive and extracts its target URL.
///
/// The first `<meta http-equiv="refresh">` tag (case-insensitive) is
/// considered. Its `content` attribute must split on `;` into exactly two
/// parts, and the second part must match `url=<value>` (case-insensitive).
/// The extracted value is resolved against `base_url`; when the base itself
/// does not parse the raw value is returned unresolved.
///
/// # Returns
///
/// The absolute target URL, or `None` when the tag, the attribute, or the
/// `url=` pattern is missing.
pub fn find_meta_refresh(content: &str, base_url: &str) -> Option<String> {
    let document = Html::parse_document(content);
    let tag = document.select(&META_REFRESH_SELECTOR).next()?;
    let value = tag.value().attr("content")?;

    let parts: Vec<&str> = value.split(';').collect();
    if parts.len() != 2 {
        return None;
    }

    let target = META_URL_PATTERN.captures(parts[1])?.get(1)?.as_str().trim();
    match Url::parse(base_url).and_then(|base| base.join(target)) {
        Ok(resolved) => Some(resolved.to_string()),
        Err(_) => Some(target.to_string()),
    }
}
