//! Target URL validation
//!
//! Gates both request construction and history entries.

use crate::error::{Error, Result};
use url::Url;

/// Schemes a target URL may use.
pub const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Return true when `candidate` is a well-formed absolute http(s) URL with a host.
///
/// Malformed input yields `false`; nothing is propagated.
pub fn is_acceptable(candidate: &str) -> bool {
    parse_target(candidate).is_ok()
}

/// Parse a target URL, reporting why it was rejected.
pub fn parse_target(candidate: &str) -> Result<Url> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("target URL is empty".to_string()));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| Error::Validation(format!("'{trimmed}' is not a valid URL: {e}")))?;

    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(Error::Validation(format!(
            "scheme '{}' is not allowed, expected http or https",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(Error::Validation(format!("'{trimmed}' has no host"))),
    }
}
