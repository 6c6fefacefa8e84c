//! Current-track and live-queue sources.
//!
//! Both are thin views over a [`PlaybackService`]. They make exactly one
//! service call per operation and never retry; the next poll tick is the retry.

use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::service::{PlaybackService, ServiceTrack};
use crate::track::TrackRef;

pub struct TrackSource<'a, S> {
    service: &'a S,
}

impl<'a, S: PlaybackService> TrackSource<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    /// Current track with the failure reason kept. `Ok(None)` covers both
    /// "nothing playing" and a playing item without a usable title/artist.
    pub async fn fetch(&self) -> Result<Option<TrackRef>, ServiceError> {
        let item = self.service.currently_playing().await?;
        Ok(item.and_then(|t| TrackRef::new(&t.title, &t.artist)))
    }

    /// Current track, any failure collapsed to `None`.
    pub async fn get_current_track(&self) -> Option<TrackRef> {
        match self.fetch().await {
            Ok(track) => track,
            Err(e) => {
                warn!("[current] {}", e);
                None
            }
        }
    }
}

pub struct QueueSource<'a, S> {
    service: &'a S,
}

impl<'a, S: PlaybackService> QueueSource<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    /// The head of the queue. `None` when the head has no usable
    /// title/artist, even if later entries do.
    pub async fn peek_next(&self) -> Option<TrackRef> {
        self.load().await.into_iter().next().and_then(usable)
    }

    /// Up to `n` usable queue entries in queue order. Unusable entries are
    /// skipped and do not count toward `n`.
    pub async fn peek_upcoming(&self, n: usize) -> Vec<TrackRef> {
        if n == 0 {
            return Vec::new();
        }
        self.load()
            .await
            .into_iter()
            .filter_map(usable)
            .take(n)
            .collect()
    }

    async fn load(&self) -> Vec<ServiceTrack> {
        match self.service.queue().await {
            Ok(items) => {
                debug!("[queue] {} entries", items.len());
                items
            }
            Err(e) => {
                warn!("[queue] {}", e);
                Vec::new()
            }
        }
    }
}

fn usable(item: ServiceTrack) -> Option<TrackRef> {
    TrackRef::new(&item.title, &item.artist)
}
