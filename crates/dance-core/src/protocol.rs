use serde::{Deserialize, Serialize};

use crate::display::{DisplayMode, DisplayState};
use crate::resolver::NextSource;

/// Current protocol version.  Bump this when the wire format changes in a
/// breaking way.  Display clients check this on connect and can refuse to
/// talk to an incompatible daemon.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest frame body accepted from a peer.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Messages sent from display/control clients to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    SetBlackout {
        on: bool,
    },
    /// Disabling also clears the overwrite text.
    SetOverwrite {
        enabled: bool,
        #[serde(default)]
        text: Option<String>,
    },
    /// Overwrite with an entry of the style catalogue.
    SelectOverwriteStyle {
        index: usize,
    },
    SetOverwriteText {
        text: String,
    },
    SetShowTitleArtist {
        on: bool,
    },
    SetNextSource {
        source: NextSource,
    },
    /// Playlist ID, URL or URI. Blank clears the fallback.
    SetFallbackPlaylist {
        input: String,
    },
    ReloadLookup,
    /// Re-present the current frame (layout change on the client side).
    Redraw,
    GetState,
}

/// Messages sent from the daemon to clients (broadcasts)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "broadcast")]
pub enum Broadcast {
    /// Sent immediately on connect: protocol version + full snapshot.
    Hello {
        protocol_version: u32,
        snapshot: DisplaySnapshot,
    },
    State {
        data: DisplaySnapshot,
    },
    Log {
        message: String,
    },
    Error {
        message: String,
    },
}

/// Everything a display client needs.  `rev` is a monotonically increasing
/// counter incremented every time the snapshot changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DisplaySnapshot {
    #[serde(default)]
    pub rev: u64,
    pub mode: DisplayMode,
    pub frame: DisplayState,
    #[serde(default)]
    pub status: String,
    /// Numbered "next dances" lines.
    #[serde(default)]
    pub upcoming: Vec<String>,
    #[serde(default)]
    pub next_source: NextSource,
    #[serde(default)]
    pub fallback_playlist: Option<String>,
    #[serde(default)]
    pub show_title_artist: bool,
    #[serde(default)]
    pub blackout: bool,
    #[serde(default)]
    pub overwrite_enabled: bool,
    #[serde(default)]
    pub overwrite_text: Option<String>,
    /// Style catalogue for the overwrite picker.
    #[serde(default)]
    pub styles: Vec<String>,
}

/// Wrapper for socket communication
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Command(Command),
    Broadcast(Broadcast),
}

impl Message {
    pub fn encode(&self) -> anyhow::Result<Vec<u8>> {
        let json = serde_json::to_vec(self)?;
        let len = json.len() as u32;
        let mut result = Vec::with_capacity(4 + json.len());
        result.extend_from_slice(&len.to_be_bytes());
        result.extend_from_slice(&json);
        Ok(result)
    }

    /// Body length announced by the frame header, if the header is complete.
    pub fn frame_len(data: &[u8]) -> Option<usize> {
        let header: [u8; 4] = data.get(..4)?.try_into().ok()?;
        Some(u32::from_be_bytes(header) as usize)
    }

    pub fn decode(data: &[u8]) -> anyhow::Result<(Self, usize)> {
        let Some(len) = Self::frame_len(data) else {
            anyhow::bail!("Insufficient data for length header");
        };
        if len > MAX_FRAME_LEN {
            anyhow::bail!("Frame of {} bytes exceeds limit", len);
        }
        if data.len() < 4 + len {
            anyhow::bail!("Insufficient data for message");
        }
        let msg: Self = serde_json::from_slice(&data[4..4 + len])?;
        Ok((msg, 4 + len))
    }
}
