use dance_core::poller::{DisplaySink, EngineSettings};
use dance_core::{DisplayMode, DisplaySnapshot, DisplayState, Status};
use tokio::sync::{broadcast, watch};

use crate::BroadcastMessage;

/// Folds engine output into the shared snapshot that the socket and HTTP
/// servers read. Every change bumps `rev`.
pub struct SnapshotPublisher {
    state_tx: watch::Sender<DisplaySnapshot>,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
}

impl SnapshotPublisher {
    pub fn new(
        state_tx: watch::Sender<DisplaySnapshot>,
        broadcast_tx: broadcast::Sender<BroadcastMessage>,
    ) -> Self {
        Self {
            state_tx,
            broadcast_tx,
        }
    }

    fn update(&self, f: impl FnOnce(&mut DisplaySnapshot) -> bool) {
        self.state_tx.send_if_modified(|snapshot| {
            let changed = f(snapshot);
            if changed {
                snapshot.rev += 1;
            }
            changed
        });
    }
}

impl DisplaySink for SnapshotPublisher {
    fn render(&mut self, frame: &DisplayState, mode: DisplayMode) {
        // Always published: a forced re-presentation must reach clients too
        self.update(|s| {
            s.frame = frame.clone();
            s.mode = mode;
            true
        });
    }

    fn status(&mut self, status: &Status) {
        let text = status.to_string();
        let mut is_new = false;
        self.update(|s| {
            if s.status == text {
                return false;
            }
            s.status = text.clone();
            is_new = true;
            true
        });
        if is_new && status.is_error() {
            // No receivers is fine
            let _ = self.broadcast_tx.send(BroadcastMessage::Error(text));
        }
    }

    fn upcoming(&mut self, lines: &[String]) {
        self.update(|s| {
            if s.upcoming == lines {
                return false;
            }
            s.upcoming = lines.to_vec();
            true
        });
    }

    fn settings(&mut self, settings: &EngineSettings) {
        self.update(|s| {
            let before = s.clone();
            s.next_source = settings.next_source;
            s.fallback_playlist = settings.fallback_playlist.clone();
            s.show_title_artist = settings.show_title_artist;
            s.blackout = settings.blackout;
            s.overwrite_enabled = settings.overwrite_enabled;
            s.overwrite_text = settings.overwrite_text.clone();
            s.styles = settings.styles.clone();
            *s != before
        });
    }
}
