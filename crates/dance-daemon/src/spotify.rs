//! Spotify Web API adapter
//!
//! The single [`PlaybackService`] implementation. Each call is one HTTP
//! request with no retry; the poller's next tick is the retry.

use std::time::Duration;

use anyhow::Context;
use dance_core::config::Config;
use dance_core::{PlaybackService, PlaylistPage, ServiceError, ServiceTrack};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

/// `/me/player/currently-playing` response
#[derive(Debug, Deserialize)]
struct CurrentlyPlaying {
    item: Option<ApiItem>,
}

/// `/me/player/queue` response
#[derive(Debug, Deserialize)]
struct QueueResponse {
    #[serde(default)]
    queue: Vec<ApiItem>,
}

/// `/playlists/{id}/tracks` response page
#[derive(Debug, Deserialize)]
struct PlaylistTracks {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    /// Null for removed or unavailable tracks
    track: Option<ApiItem>,
}

/// A track or episode. Episodes carry no artists.
#[derive(Debug, Deserialize)]
struct ApiItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    #[serde(default)]
    name: String,
}

impl From<ApiItem> for ServiceTrack {
    fn from(item: ApiItem) -> Self {
        let artist = item
            .artists
            .into_iter()
            .next()
            .map(|a| a.name)
            .unwrap_or_default();
        ServiceTrack::new(item.name, artist)
    }
}

pub struct SpotifyClient {
    client: Client,
    api_base: String,
    token: Option<String>,
}

impl SpotifyClient {
    pub fn new(api_base: &str, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            &config.spotify.api_base,
            config.access_token(),
            Duration::from_millis(config.spotify.request_timeout_ms),
        )
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// GET `{api_base}{path}`. `Ok(None)` for 204 No Content.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, ServiceError> {
        let token = self.token.as_deref().ok_or(ServiceError::MissingToken)?;
        let url = format!("{}{}", self.api_base, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(classify_status(status.as_u16(), retry_after));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        decode(&body).map(Some)
    }
}

impl PlaybackService for SpotifyClient {
    async fn currently_playing(&self) -> Result<Option<ServiceTrack>, ServiceError> {
        let current: Option<CurrentlyPlaying> =
            self.get_json("/me/player/currently-playing", &[]).await?;
        Ok(current.and_then(|c| c.item).map(ServiceTrack::from))
    }

    async fn queue(&self) -> Result<Vec<ServiceTrack>, ServiceError> {
        let queue: Option<QueueResponse> = self.get_json("/me/player/queue", &[]).await?;
        let items: Vec<ServiceTrack> = queue
            .map(|q| q.queue.into_iter().map(ServiceTrack::from).collect())
            .unwrap_or_default();
        debug!("[spotify] queue: {} items", items.len());
        Ok(items)
    }

    async fn playlist_page(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<PlaylistPage, ServiceError> {
        let path = format!("/playlists/{}/tracks", playlist_id);
        let query = [("limit", limit.to_string()), ("offset", offset.to_string())];
        let page: Option<PlaylistTracks> = self.get_json(&path, &query).await?;
        Ok(page.map(into_page).unwrap_or_default())
    }
}

fn into_page(page: PlaylistTracks) -> PlaylistPage {
    PlaylistPage {
        items: page
            .items
            .into_iter()
            .map(|i| i.track.map(ServiceTrack::from).unwrap_or_default())
            .collect(),
        has_more: page.next.is_some(),
    }
}

fn classify_status(status: u16, retry_after_secs: Option<u64>) -> ServiceError {
    match status {
        401 => ServiceError::Unauthorized,
        429 => ServiceError::RateLimited { retry_after_secs },
        other => ServiceError::Status(other),
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ServiceError> {
    serde_json::from_str(body).map_err(|e| ServiceError::Decode(e.to_string()))
}
