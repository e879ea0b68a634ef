//! Source URL validation.
//!
//! Only `http`/`https` URLs pointing at a fixed set of hosts are accepted.
//! Everything else is rejected before a job is created or a process spawned.

use url::Url;

use crate::error::CoreError;

/// Hosts a conversion may be requested for.
pub const ALLOWED_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
    "www.youtu.be",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];

/// Accepted URL schemes.
pub const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// User-facing message for any rejected source URL.
pub const INVALID_SOURCE_MESSAGE: &str = "Please provide a valid YouTube link.";

/// Whether `input` parses as an allowed source URL.
pub fn is_allowed(input: &str) -> bool {
    let Ok(url) = Url::parse(input.trim()) else {
        return false;
    };
    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return false;
    }
    url.host_str()
        .map(|host| ALLOWED_HOSTS.contains(&host.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Validate an optional source URL, returning the trimmed URL on success.
pub fn validate(input: Option<&str>) -> Result<String, CoreError> {
    match input.map(str::trim) {
        Some(url) if !url.is_empty() && is_allowed(url) => Ok(url.to_string()),
        _ => Err(CoreError::Validation(INVALID_SOURCE_MESSAGE.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
