use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use super::platform;
use crate::display::{TextFormat, DEFAULT_NEXT_PREFIX, DEFAULT_WAITING_TEXT};
use crate::identifier::parse_playlist_id;
use crate::poller::{PollIntervals, PollerOptions};
use crate::resolver::NextSource;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub next: NextConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Bearer token. The environment variable named by `token_env` wins
    /// when set.
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// CSV with `song_title`, `artist` and `dance_style` columns.
    #[serde(default = "default_csv_file")]
    pub csv_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub show_title_artist: bool,
    #[serde(default = "default_upcoming_count")]
    pub upcoming_count: usize,
    #[serde(default = "default_next_prefix")]
    pub next_prefix: String,
    #[serde(default = "default_waiting_text")]
    pub waiting_text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NextConfig {
    #[serde(default)]
    pub source: NextSource,
    /// Playlist ID, URL or URI.
    #[serde(default)]
    pub fallback_playlist: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_live_ms")]
    pub live_ms: u64,
    #[serde(default = "default_overwrite_ms")]
    pub overwrite_ms: u64,
    #[serde(default = "default_blackout_ms")]
    pub blackout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            access_token: String::new(),
            token_env: default_token_env(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            csv_file: default_csv_file(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_title_artist: true,
            upcoming_count: default_upcoming_count(),
            next_prefix: default_next_prefix(),
            waiting_text: default_waiting_text(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            live_ms: default_live_ms(),
            overwrite_ms: default_overwrite_ms(),
            blackout_ms: default_blackout_ms(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            tcp_port: default_tcp_port(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_token_env() -> String {
    "SPOTIFY_ACCESS_TOKEN".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_csv_file() -> PathBuf {
    platform::config_dir().join("tanz-mapping.csv")
}

fn default_true() -> bool {
    true
}

fn default_upcoming_count() -> usize {
    30
}

fn default_next_prefix() -> String {
    DEFAULT_NEXT_PREFIX.to_string()
}

fn default_waiting_text() -> String {
    DEFAULT_WAITING_TEXT.to_string()
}

fn default_live_ms() -> u64 {
    1500
}

/// Floor for every poll interval.
pub const MIN_POLL_MS: u64 = 100;

fn default_overwrite_ms() -> u64 {
    500
}

fn default_blackout_ms() -> u64 {
    800
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8990
}

fn default_tcp_port() -> u16 {
    platform::DAEMON_TCP_PORT
}

impl Config {
    /// Read `path`, writing a default config there first if it is missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }
        Self::read_from(path)
    }

    /// Read `path` without touching the filesystem; a missing file gives defaults.
    pub fn read_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// Token from the configured environment variable, else from the file.
    pub fn access_token(&self) -> Option<String> {
        let from_env = std::env::var(&self.spotify.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty());
        from_env
            .or_else(|| Some(self.spotify.access_token.clone()))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Validated fallback playlist ID. Invalid input is logged and ignored.
    pub fn fallback_playlist_id(&self) -> Option<String> {
        let input = self.next.fallback_playlist.trim();
        if input.is_empty() {
            return None;
        }
        match parse_playlist_id(input) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("[config] ignoring fallback_playlist '{}': {}", input, e);
                None
            }
        }
    }

    pub fn poller_options(&self) -> PollerOptions {
        PollerOptions {
            next_source: self.next.source,
            fallback_playlist: self.fallback_playlist_id(),
            upcoming_count: self.display.upcoming_count,
            format: TextFormat {
                show_info: self.display.show_title_artist,
                next_prefix: self.display.next_prefix.clone(),
            },
            waiting_text: self.display.waiting_text.clone(),
            intervals: PollIntervals {
                live: poll_interval("live_ms", self.poll.live_ms),
                overwrite: poll_interval("overwrite_ms", self.poll.overwrite_ms),
                blackout: poll_interval("blackout_ms", self.poll.blackout_ms),
            },
        }
    }
}

fn poll_interval(key: &str, ms: u64) -> Duration {
    if ms < MIN_POLL_MS {
        warn!("[config] poll.{} = {} is below {} ms, clamping", key, ms, MIN_POLL_MS);
    }
    Duration::from_millis(ms.max(MIN_POLL_MS))
}
