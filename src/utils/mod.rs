//! Utility functions and helpers.

use sha2::{Digest, Sha256};
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve an href against the origin of the base URL.
///
/// A leading `/` is resolved against `scheme://host[:port]` rather than
/// the full base path.
pub fn resolve_against_origin(base: &Url, href: &str) -> String {
    if href.starts_with('/') {
        let mut origin = base.origin().ascii_serialization();
        origin.push_str(href);
        return origin;
    }
    resolve_url(base, href)
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// SHA-256 of the input, hex-encoded.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
