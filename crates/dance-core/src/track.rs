//! Track identity.
//!
//! A track is identified by its (title, primary artist) pair. Equality is
//! decided on the normalized form: surrounding whitespace trimmed, case folded.

use serde::{Deserialize, Serialize};

/// Trim and case-fold a title or artist for comparison.
pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// A track as reported by the playback service. Both fields are non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRef {
    pub title: String,
    pub artist: String,
}

impl TrackRef {
    /// Build a track from raw service fields. Returns `None` when either the
    /// title or the artist is blank, which is how unusable items are skipped.
    pub fn new(title: impl AsRef<str>, artist: impl AsRef<str>) -> Option<Self> {
        let title = title.as_ref().trim();
        let artist = artist.as_ref().trim();
        if title.is_empty() || artist.is_empty() {
            return None;
        }
        Some(Self {
            title: title.to_string(),
            artist: artist.to_string(),
        })
    }

    pub fn key(&self) -> TrackKey {
        TrackKey::new(&self.title, &self.artist)
    }

    /// Same track, ignoring case and surrounding whitespace.
    pub fn same_as(&self, other: &TrackRef) -> bool {
        self.key() == other.key()
    }
}

impl std::fmt::Display for TrackRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} \u{2014} {}", self.title, self.artist)
    }
}

/// Normalized (title, artist) tuple used to detect track changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackKey {
    title: String,
    artist: String,
}

impl TrackKey {
    pub fn new(title: &str, artist: &str) -> Self {
        Self {
            title: normalize(title),
            artist: normalize(artist),
        }
    }
}
