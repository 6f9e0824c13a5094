//! Queue payload and redirect-trace data models.
//!
//! Payloads are tagged structs validated at the queue boundary; a task whose
//! body does not decode into the expected payload is left untouched for the
//! queue's redelivery timeout.

use serde::{Deserialize, Serialize};
use strum_macros::EnumIter as EnumIterMacro;

/// Classification of a single hop in a redirect chain.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIterMacro,
)]
pub enum RedirectKind {
    /// Transport-signaled redirect (Location header).
    #[serde(rename = "http_status")]
    Http,
    /// HTML meta-refresh redirect.
    #[serde(rename = "meta_tag")]
    Meta,
    /// The fetch failed: malformed URL or transport error.
    #[serde(rename = "ERROR")]
    Error,
}

impl RedirectKind {
    /// Returns the wire string for this hop kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectKind::Http => "http_status",
            RedirectKind::Meta => "meta_tag",
            RedirectKind::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for RedirectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full trace of one redirect resolution.
///
/// Invariant: `hop_urls.len() == hop_types.len() + 1`; the first URL has no
/// incoming redirect kind. A `None` URL appears only when normalization
/// failed: as the sole entry when the start URL was unusable, or as the last
/// entry when a redirect target was.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedirectChain {
    /// Kind of each followed hop, in order.
    pub hop_types: Vec<RedirectKind>,
    /// Visited URLs, starting with the (normalized) start URL.
    pub hop_urls: Vec<Option<String>>,
    /// Names of tracking-pixel counters seen in fetched content, across all hops.
    pub counters: Vec<String>,
}

impl RedirectChain {
    /// A trace that starts (and ends) at `url` with no hops followed.
    pub fn single(url: Option<String>) -> Self {
        RedirectChain {
            hop_types: Vec::new(),
            hop_urls: vec![url],
            counters: Vec::new(),
        }
    }

    /// Whether any hop in the chain failed.
    pub fn has_error(&self) -> bool {
        self.hop_types.contains(&RedirectKind::Error)
    }
}

/// A URL-check task, as produced by the upstream producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectTaskPayload {
    /// URL whose redirect chain should be resolved.
    pub url: String,
    /// Opaque identifier carried through to the result.
    pub url_id: serde_json::Value,
    /// Whether this task is already the one-time retry of a failed check.
    #[serde(default)]
    pub recheck: bool,
    /// Opaque flag copied through to the result when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspicious: Option<serde_json::Value>,
}

/// A finished check, published to the output tube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    /// Identifier copied from the task.
    pub url_id: serde_json::Value,
    /// The resolved redirect chain.
    pub result: RedirectChain,
    /// Kind of check performed; always `"normal"`.
    pub check_type: String,
    /// Copied from the task when present, omitted otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspicious: Option<serde_json::Value>,
}

/// Wire value of [`ResultPayload::check_type`].
pub const CHECK_TYPE_NORMAL: &str = "normal";

/// A callback-delivery task for the notification pusher.
///
/// Everything except `callback_url` is forwarded verbatim as the POST body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Endpoint the notification is POSTed to.
    pub callback_url: String,
    /// Remaining fields, forwarded to the callback unchanged.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}
