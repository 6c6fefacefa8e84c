//! Parsing of user-supplied playlist / track identifiers.
//!
//! Accepted shapes:
//!   - URI:  `spotify:playlist:37i9dQZF1DX0XUsuxWHRQd`
//!   - URL:  `https://open.spotify.com/playlist/37i9dQZF1DX0XUsuxWHRQd?si=...`
//!   - bare alphanumeric ID of at least 16 characters

use regex::Regex;

use crate::error::IdentifierError;

const URI_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9]*:(\w+):([A-Za-z0-9]+)$";
const URL_PATTERN: &str = r"^https?://[^/\s]+/(\w+)/([A-Za-z0-9]+)";
const BARE_ID_PATTERN: &str = r"^[A-Za-z0-9]{16,}$";

/// Extract the resource ID from `input`.
///
/// When `expected_type` is given, URI and URL forms must name that resource
/// type (compared case-insensitively). Bare IDs carry no type and are accepted
/// as-is.
pub fn parse_identifier(input: &str, expected_type: Option<&str>) -> Result<String, IdentifierError> {
    let s = input.trim();

    let typed = captures(URI_PATTERN, s).or_else(|| captures(URL_PATTERN, s));
    if let Some((kind, id)) = typed {
        let kind = kind.to_lowercase();
        if let Some(expected) = expected_type {
            if kind != expected.to_lowercase() {
                return Err(IdentifierError::TypeMismatch {
                    expected: expected.to_string(),
                    found: kind,
                });
            }
        }
        return Ok(id);
    }

    if is_match(BARE_ID_PATTERN, s) {
        return Ok(s.to_string());
    }

    Err(IdentifierError::UnrecognizedFormat)
}

/// Shorthand for `parse_identifier(input, Some("playlist"))`.
pub fn parse_playlist_id(input: &str) -> Result<String, IdentifierError> {
    parse_identifier(input, Some("playlist"))
}

fn captures(pattern: &str, s: &str) -> Option<(String, String)> {
    let re = Regex::new(pattern).ok()?;
    let caps = re.captures(s)?;
    Some((caps.get(1)?.as_str().to_string(), caps.get(2)?.as_str().to_string()))
}

fn is_match(pattern: &str, s: &str) -> bool {
    Regex::new(pattern)
        .map(|re| re.is_match(s))
        .unwrap_or(false)
}
