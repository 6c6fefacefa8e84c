//! "What plays next", composed from the live queue and a fallback playlist.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scanner::PlaylistScanner;
use crate::service::PlaybackService;
use crate::sources::QueueSource;
use crate::track::TrackRef;

/// Priority order for the single next-track prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextSource {
    /// Live queue first, fallback playlist second.
    #[default]
    Queue,
    /// Fallback playlist first, live queue second.
    Playlist,
}

impl NextSource {
    pub fn label(&self) -> &'static str {
        match self {
            NextSource::Queue => "queue",
            NextSource::Playlist => "playlist",
        }
    }
}

impl std::fmt::Display for NextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for NextSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(NextSource::Queue),
            "playlist" => Ok(NextSource::Playlist),
            other => Err(format!("unknown next source '{}'", other)),
        }
    }
}

pub struct NextTrackResolver<'a, S> {
    queue: QueueSource<'a, S>,
    scanner: PlaylistScanner<'a, S>,
    fallback_playlist: Option<String>,
}

impl<'a, S: PlaybackService> NextTrackResolver<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self {
            queue: QueueSource::new(service),
            scanner: PlaylistScanner::new(service),
            fallback_playlist: None,
        }
    }

    pub fn with_fallback_playlist(mut self, playlist_id: Option<String>) -> Self {
        self.set_fallback_playlist(playlist_id);
        self
    }

    pub fn fallback_playlist(&self) -> Option<&str> {
        self.fallback_playlist.as_deref()
    }

    /// Blank ids count as "not configured".
    pub fn set_fallback_playlist(&mut self, playlist_id: Option<String>) {
        self.fallback_playlist = playlist_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
    }

    /// First non-empty prediction in `mode`'s priority order.
    pub async fn resolve_next(&self, current: &TrackRef, mode: NextSource) -> Option<TrackRef> {
        let next = match mode {
            NextSource::Queue => match self.queue.peek_next().await {
                Some(track) => Some(track),
                None => self.from_playlist(current).await,
            },
            NextSource::Playlist => match self.from_playlist(current).await {
                Some(track) => Some(track),
                None => self.queue.peek_next().await,
            },
        };
        debug!(
            "[next] {} via {}: {}",
            current,
            mode,
            next.as_ref().map(|t| t.to_string()).unwrap_or_else(|| "none".into())
        );
        next
    }

    /// Up to `n` upcoming tracks: the live queue first regardless of the
    /// next-source setting, topped up from the fallback playlist when the
    /// current track is known.
    pub async fn resolve_upcoming(&self, current: Option<&TrackRef>, n: usize) -> Vec<TrackRef> {
        let mut upcoming = self.queue.peek_upcoming(n).await;
        if upcoming.len() >= n {
            return upcoming;
        }
        if let (Some(playlist_id), Some(current)) = (self.fallback_playlist(), current) {
            let rest = self
                .scanner
                .collect_after(playlist_id, current, n - upcoming.len())
                .await;
            upcoming.extend(rest);
        }
        upcoming
    }

    async fn from_playlist(&self, current: &TrackRef) -> Option<TrackRef> {
        let playlist_id = self.fallback_playlist()?;
        self.scanner.find_next_after(playlist_id, current).await
    }
}
