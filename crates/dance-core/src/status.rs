//! Operator-facing status line.
//!
//! This is the only place failure detail is shown; the main display never
//! carries error text.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ready,
    LiveOk,
    /// Nothing playing, or the current item has no usable title/artist.
    NoData,
    /// The playback service call failed.
    ServiceError(String),
    Unmapped,
    LookupReloaded(usize),
    LookupFailed(String),
    NextSource(String),
    PlaylistSet(String),
    PlaylistCleared,
    PlaylistInvalid(String),
    OverwriteOff,
    NoSelection,
    EmptyText,
}

impl Status {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Status::ServiceError(_) | Status::LookupFailed(_) | Status::PlaylistInvalid(_)
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ready => write!(f, "ready"),
            Status::LiveOk => write!(f, "OK (service connected)"),
            Status::NoData => write!(f, "no music / no data from service (display unchanged)"),
            Status::ServiceError(reason) => {
                write!(f, "service error: {} (display unchanged)", reason)
            }
            Status::Unmapped => write!(f, "track not in lookup table (display unchanged)"),
            Status::LookupReloaded(rows) => write!(f, "lookup reloaded ({} rows)", rows),
            Status::LookupFailed(reason) => write!(f, "lookup reload failed: {}", reason),
            Status::NextSource(source) => write!(f, "next dance from {}", source),
            Status::PlaylistSet(id) => write!(f, "fallback playlist set: {}", id),
            Status::PlaylistCleared => write!(f, "fallback playlist cleared"),
            Status::PlaylistInvalid(reason) => write!(f, "invalid playlist: {}", reason),
            Status::OverwriteOff => write!(f, "overwrite is off"),
            Status::NoSelection => write!(f, "no selection"),
            Status::EmptyText => write!(f, "empty text"),
        }
    }
}
