//! Positional lookup of "what follows the current track" in a playlist.
//!
//! The playlist is walked page by page from offset 0. The first usable item
//! whose identity equals the current track is the anchor; results are the
//! usable items after it. Only the first occurrence anchors: a track listed
//! twice always resolves to what follows its first listing.

use tracing::{debug, warn};

use crate::service::{PlaybackService, PLAYLIST_PAGE_SIZE};
use crate::track::{TrackKey, TrackRef};

pub struct PlaylistScanner<'a, S> {
    service: &'a S,
    page_size: u32,
}

impl<'a, S: PlaybackService> PlaylistScanner<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self {
            service,
            page_size: PLAYLIST_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The first usable item after the anchor.
    pub async fn find_next_after(&self, playlist_id: &str, current: &TrackRef) -> Option<TrackRef> {
        self.collect_after(playlist_id, current, 1).await.into_iter().next()
    }

    /// Up to `n` usable items after the anchor, in playlist order.
    ///
    /// Empty when the anchor is never found, when nothing usable follows it,
    /// or when any page request fails.
    pub async fn collect_after(
        &self,
        playlist_id: &str,
        current: &TrackRef,
        n: usize,
    ) -> Vec<TrackRef> {
        let mut results = Vec::new();
        if n == 0 || playlist_id.trim().is_empty() {
            return results;
        }

        let anchor = current.key();
        let mut found = false;
        let mut offset = 0u32;

        loop {
            let page = match self
                .service
                .playlist_page(playlist_id, offset, self.page_size)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!("[playlist] {} at offset {}: {}", playlist_id, offset, e);
                    return Vec::new();
                }
            };

            for item in page.items {
                let Some(track) = TrackRef::new(&item.title, &item.artist) else {
                    continue;
                };
                if found {
                    results.push(track);
                    if results.len() >= n {
                        return results;
                    }
                } else if is_anchor(&track, &anchor) {
                    found = true;
                }
            }

            if !page.has_more {
                break;
            }
            offset += self.page_size;
        }

        if !found {
            debug!("[playlist] current track not in {}", playlist_id);
        }
        results
    }
}

fn is_anchor(track: &TrackRef, anchor: &TrackKey) -> bool {
    &track.key() == anchor
}
