//! Capability interface for the remote playback service.
//!
//! The engine only needs three read operations. One adapter per service
//! implements this trait; tests use an in-memory fake.

use crate::error::ServiceError;

/// Page size used when walking playlists.
pub const PLAYLIST_PAGE_SIZE: u32 = 100;

/// A track entry exactly as the service reported it. Either field may be
/// blank (local files, podcast episodes, removed tracks).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceTrack {
    pub title: String,
    /// Primary (first listed) artist.
    pub artist: String,
}

impl ServiceTrack {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }
}

/// One page of playlist items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistPage {
    pub items: Vec<ServiceTrack>,
    /// The service reports further pages after this one.
    pub has_more: bool,
}

#[allow(async_fn_in_trait)]
pub trait PlaybackService {
    /// Currently playing item, `Ok(None)` when nothing is playing.
    async fn currently_playing(&self) -> Result<Option<ServiceTrack>, ServiceError>;

    /// The live playback queue, next item first.
    async fn queue(&self) -> Result<Vec<ServiceTrack>, ServiceError>;

    /// `limit` playlist items starting at `offset`.
    async fn playlist_page(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<PlaylistPage, ServiceError>;
}
