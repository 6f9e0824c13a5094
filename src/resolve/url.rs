//! URL normalization.

use log::warn;
use url::Url;

/// Normalizes a URL into its canonical absolute form.
///
/// Parsing performs IDNA/punycode encoding of the host and percent-encoding
/// cleanup of the remaining components. `None` in, `None` out. Any parse or
/// encoding failure is logged and collapses to `None`: callers treat that as
/// "no usable URL" and never see an error.
///
/// # Arguments
///
/// * `url` - The URL string to normalize, if any
///
/// # Returns
///
/// `Some(normalized_url)` when the URL parses, `None` otherwise.
pub fn prepare_url(url: Option<&str>) -> Option<String> {
    let raw = url?;
    match Url::parse(raw.trim()) {
        Ok(parsed) => Some(parsed.to_string()),
        Err(e) => {
            warn!("failed to normalize url {raw:?}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::prepare_url;

    #[test]
    fn test_prepare_url_none_in_none_out() {
        assert_eq!(prepare_url(None), None);
    }

    #[test]
    fn test_prepare_url_normalizes_root() {
        assert_eq!(
            prepare_url(Some("http://example.com")),
            Some("http://example.com/".to_string())
        );
    }

    #[test]
    fn test_prepare_url_keeps_query() {
        assert_eq!(
            prepare_url(Some("https://example.com/a?b=1&c=2")),
            Some("https://example.com/a?b=1&c=2".to_string())
        );
    }

    #[test]
    fn test_prepare_url_punycodes_host() {
        let prepared = prepare_url(Some("http://пример.рф/путь")).expect("idn should parse");
        assert!(prepared.starts_with("http://xn--"));
    }

    #[test]
    fn test_prepare_url_rejects_relative() {
        assert_eq!(prepare_url(Some("wrong url")), None);
    }

    #[test]
    fn test_prepare_url_rejects_unencodable_host() {
        // A host that fails IDNA processing must degrade to None, not panic.
        assert_eq!(prepare_url(Some("http://exa mple.com/")), None);
    }

    // Property-based tests using proptest
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_prepare_url_idempotent(domain in "[a-z]{3,20}\\.[a-z]{2,5}") {
            let url = format!("http://{domain}/path");
            let once = prepare_url(Some(&url));
            if let Some(normalized) = once {
                let twice = prepare_url(Some(&normalized));
                prop_assert_eq!(Some(normalized), twice,
                    "normalizing twice should produce the same result");
            }
        }

        #[test]
        fn test_prepare_url_never_panics(raw in "[ -~]{0,80}") {
            let _ = prepare_url(Some(&raw));
        }
    }
}
