//! The tick driver.
//!
//! One [`Poller`] owns the display state machine, the lookup and the
//! mutable engine settings. It alone decides when the next tick runs.
//! Commands arriving while it sleeps are applied between ticks, so display
//! state changes stay strictly tick-sequential.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::display::{
    upcoming_lines, DisplayMode, DisplayState, DisplayStateMachine, Observation, TextFormat,
    DEFAULT_WAITING_TEXT,
};
use crate::identifier::parse_playlist_id;
use crate::lookup::StyleLookup;
use crate::protocol::Command;
use crate::resolver::{NextSource, NextTrackResolver};
use crate::service::PlaybackService;
use crate::sources::TrackSource;
use crate::status::Status;

/// Receives everything the engine wants shown.
pub trait DisplaySink {
    /// A frame that differs from the last one rendered, or a forced
    /// re-presentation.
    fn render(&mut self, frame: &DisplayState, mode: DisplayMode);

    fn status(&mut self, status: &Status);

    /// Upcoming-dances lines, only when they changed.
    fn upcoming(&mut self, _lines: &[String]) {}

    /// Settings after startup and after every command.
    fn settings(&mut self, _settings: &EngineSettings) {}
}

/// Delay before the next tick, by the mode active during the last one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollIntervals {
    pub live: Duration,
    pub overwrite: Duration,
    pub blackout: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            live: Duration::from_millis(1500),
            overwrite: Duration::from_millis(500),
            blackout: Duration::from_millis(800),
        }
    }
}

impl PollIntervals {
    pub fn for_mode(&self, mode: DisplayMode) -> Duration {
        match mode {
            DisplayMode::Blackout => self.blackout,
            DisplayMode::Overwrite => self.overwrite,
            DisplayMode::Live => self.live,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PollerOptions {
    pub next_source: NextSource,
    pub fallback_playlist: Option<String>,
    pub upcoming_count: usize,
    pub format: TextFormat,
    pub waiting_text: String,
    pub intervals: PollIntervals,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            next_source: NextSource::Queue,
            fallback_playlist: None,
            upcoming_count: 30,
            format: TextFormat::default(),
            waiting_text: DEFAULT_WAITING_TEXT.to_string(),
            intervals: PollIntervals::default(),
        }
    }
}

/// Operator-adjustable settings as published to clients.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineSettings {
    pub next_source: NextSource,
    pub fallback_playlist: Option<String>,
    pub show_title_artist: bool,
    pub blackout: bool,
    pub overwrite_enabled: bool,
    pub overwrite_text: Option<String>,
    pub styles: Vec<String>,
}

pub struct Poller<'a, S> {
    track_source: TrackSource<'a, S>,
    resolver: NextTrackResolver<'a, S>,
    lookup: StyleLookup,
    display: DisplayStateMachine,
    next_source: NextSource,
    upcoming_count: usize,
    intervals: PollIntervals,
    last_frame: Option<(DisplayState, DisplayMode)>,
    last_upcoming: Option<Vec<String>>,
}

impl<'a, S: PlaybackService> Poller<'a, S> {
    pub fn new(service: &'a S, lookup: StyleLookup, options: PollerOptions) -> Self {
        Self {
            track_source: TrackSource::new(service),
            resolver: NextTrackResolver::new(service)
                .with_fallback_playlist(options.fallback_playlist),
            lookup,
            display: DisplayStateMachine::new(options.format, &options.waiting_text),
            next_source: options.next_source,
            upcoming_count: options.upcoming_count,
            intervals: options.intervals,
            last_frame: None,
            last_upcoming: None,
        }
    }

    pub fn display(&self) -> &DisplayStateMachine {
        &self.display
    }

    pub fn lookup(&self) -> &StyleLookup {
        &self.lookup
    }

    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            next_source: self.next_source,
            fallback_playlist: self.resolver.fallback_playlist().map(str::to_string),
            show_title_artist: self.display.show_info(),
            blackout: self.display.is_blackout(),
            overwrite_enabled: self.display.overwrite_enabled(),
            overwrite_text: self.display.overwrite_text().map(str::to_string),
            styles: self.lookup.styles(),
        }
    }

    /// Tick until the command channel closes.
    pub async fn run<K: DisplaySink>(mut self, sink: &mut K, mut commands: mpsc::Receiver<Command>) {
        info!("[poller] starting ({} upcoming, next from {})", self.upcoming_count, self.next_source);
        sink.status(&Status::Ready);
        sink.settings(&self.settings());
        self.present(sink, true);

        loop {
            let delay = self.tick(sink).await;
            let deadline = Instant::now() + delay;

            loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => break,
                    cmd = commands.recv() => match cmd {
                        Some(cmd) => self.handle_command(cmd, sink),
                        None => {
                            info!("[poller] command channel closed, stopping");
                            return;
                        }
                    },
                }
            }
        }
    }

    /// Run one tick and return the delay before the next one.
    pub async fn tick<K: DisplaySink>(&mut self, sink: &mut K) -> Duration {
        let mode = self.display.mode();
        if mode == DisplayMode::Live {
            self.tick_live(sink).await;
        }
        self.present(sink, false);
        self.intervals.for_mode(mode)
    }

    async fn tick_live<K: DisplaySink>(&mut self, sink: &mut K) {
        // One table for the whole tick, even if a reload lands meanwhile.
        let table = self.lookup.table();

        let (current, error) = match self.track_source.fetch().await {
            Ok(track) => (track, None),
            Err(e) => {
                warn!("[current] {}", e);
                (None, Some(e))
            }
        };

        let upcoming = self
            .resolver
            .resolve_upcoming(current.as_ref(), self.upcoming_count)
            .await;
        let lines = upcoming_lines(&upcoming, &table);
        if self.last_upcoming.as_ref() != Some(&lines) {
            debug!("[poller] upcoming list now {} entries", lines.len());
            sink.upcoming(&lines);
            self.last_upcoming = Some(lines);
        }

        let observation = match current {
            None => Observation::NoTrack { error },
            Some(track) => {
                let next = self.resolver.resolve_next(&track, self.next_source).await;
                let next_style = next
                    .as_ref()
                    .and_then(|t| table.find_style(&t.title, &t.artist));
                let style = table.find_style(&track.title, &track.artist);
                Observation::Playing {
                    track,
                    style,
                    next_style,
                }
            }
        };

        if let Some(status) = self.display.apply(observation) {
            sink.status(&status);
        }
    }

    /// Apply one command. Takes effect on screen at once; the next tick is
    /// not brought forward.
    pub fn handle_command<K: DisplaySink>(&mut self, cmd: Command, sink: &mut K) {
        info!("[poller] command {:?}", cmd);
        let mut force = false;
        let status = match cmd {
            Command::SetBlackout { on } => {
                self.display.set_blackout(on);
                None
            }
            Command::SetOverwrite { enabled, text } => {
                self.display.set_overwrite(enabled, text.as_deref());
                None
            }
            Command::SelectOverwriteStyle { index } => {
                let styles = self.lookup.styles();
                self.display.select_overwrite_style(index, &styles)
            }
            Command::SetOverwriteText { text } => self.display.set_overwrite_text(&text),
            Command::SetShowTitleArtist { on } => {
                self.display.set_show_info(on);
                None
            }
            Command::SetNextSource { source } => {
                self.next_source = source;
                Some(Status::NextSource(source.to_string()))
            }
            Command::SetFallbackPlaylist { input } => Some(self.set_fallback_playlist(&input)),
            Command::ReloadLookup => Some(match self.lookup.reload() {
                Ok(rows) => Status::LookupReloaded(rows),
                Err(e) => Status::LookupFailed(e.to_string()),
            }),
            Command::Redraw => {
                force = true;
                None
            }
            Command::GetState => None,
        };

        if let Some(status) = status {
            sink.status(&status);
        }
        sink.settings(&self.settings());
        self.present(sink, force);
    }

    fn set_fallback_playlist(&mut self, input: &str) -> Status {
        if input.trim().is_empty() {
            self.resolver.set_fallback_playlist(None);
            return Status::PlaylistCleared;
        }
        match parse_playlist_id(input) {
            Ok(id) => {
                self.resolver.set_fallback_playlist(Some(id.clone()));
                Status::PlaylistSet(id)
            }
            Err(e) => {
                warn!("[poller] rejected playlist '{}': {}", input.trim(), e);
                Status::PlaylistInvalid(e.to_string())
            }
        }
    }

    fn present<K: DisplaySink>(&mut self, sink: &mut K, force: bool) {
        let current = (self.display.frame(), self.display.mode());
        if !force && self.last_frame.as_ref() == Some(&current) {
            return;
        }
        sink.render(&current.0, current.1);
        self.last_frame = Some(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::lookup::StyleTable;
    use crate::testing::{st, FakeService};

    #[derive(Default)]
    struct RecordingSink {
        frames: Vec<(DisplayState, DisplayMode)>,
        statuses: Vec<Status>,
        upcoming: Vec<Vec<String>>,
        settings: Vec<EngineSettings>,
    }

    impl DisplaySink for RecordingSink {
        fn render(&mut self, frame: &DisplayState, mode: DisplayMode) {
            self.frames.push((frame.clone(), mode));
        }

        fn status(&mut self, status: &Status) {
            self.statuses.push(status.clone());
        }

        fn upcoming(&mut self, lines: &[String]) {
            self.upcoming.push(lines.to_vec());
        }

        fn settings(&mut self, settings: &EngineSettings) {
            self.settings.push(settings.clone());
        }
    }

    const CSV: &str = "song_title,artist,dance_style\n\
        A,Artist1,Waltz\n\
        B,Artist2,Tango\n\
        C,Artist3,Salsa\n";

    fn lookup() -> StyleLookup {
        StyleLookup::new(StyleTable::from_csv_str(CSV).unwrap())
    }

    fn poller(svc: &FakeService) -> Poller<'_, FakeService> {
        Poller::new(svc, lookup(), PollerOptions::default())
    }

    #[tokio::test]
    async fn test_live_tick_renders_once() {
        let svc = FakeService::new();
        svc.playing("A", "Artist1");
        svc.set_queue(vec![st("B", "Artist2")]);
        let mut p = poller(&svc);
        let mut sink = RecordingSink::default();

        assert_eq!(p.tick(&mut sink).await, Duration::from_millis(1500));
        assert_eq!(sink.frames.len(), 1);
        assert_eq!(sink.frames[0].0.dance, "WALTZ");
        assert_eq!(sink.frames[0].0.next, "Nächster Tanz: TANGO");
        assert_eq!(sink.statuses, vec![Status::LiveOk]);
        assert_eq!(sink.upcoming, vec![vec!["1) TANGO  |  B".to_string()]]);

        // Nothing changed: no render, no upcoming publish, no status
        p.tick(&mut sink).await;
        assert_eq!(sink.frames.len(), 1);
        assert_eq!(sink.upcoming.len(), 1);
        assert_eq!(sink.statuses.len(), 1);
    }

    #[tokio::test]
    async fn test_blackout_skips_service() {
        let svc = FakeService::new();
        svc.playing("A", "Artist1");
        let mut p = poller(&svc);
        let mut sink = RecordingSink::default();

        p.handle_command(Command::SetBlackout { on: true }, &mut sink);
        assert_eq!(sink.frames.last().unwrap().1, DisplayMode::Blackout);
        assert_eq!(p.tick(&mut sink).await, Duration::from_millis(800));
        assert_eq!(svc.current_calls.get(), 0);
        assert_eq!(svc.queue_calls.get(), 0);
    }

    #[tokio::test]
    async fn test_overwrite_interval_and_frame() {
        let svc = FakeService::new();
        let mut p = poller(&svc);
        let mut sink = RecordingSink::default();

        p.handle_command(
            Command::SetOverwrite {
                enabled: true,
                text: None,
            },
            &mut sink,
        );
        // Enabled without text: still LIVE
        assert_eq!(p.tick(&mut sink).await, Duration::from_millis(1500));

        p.handle_command(Command::SelectOverwriteStyle { index: 1 }, &mut sink);
        let (frame, mode) = sink.frames.last().unwrap();
        assert_eq!(*mode, DisplayMode::Overwrite);
        assert_eq!(frame.dance, "TANGO");

        let calls = svc.current_calls.get();
        assert_eq!(p.tick(&mut sink).await, Duration::from_millis(500));
        assert_eq!(svc.current_calls.get(), calls);
    }

    #[tokio::test]
    async fn test_no_data_status_every_tick() {
        let svc = FakeService::new();
        svc.fail_current(ServiceError::Unauthorized);
        let mut p = poller(&svc);
        let mut sink = RecordingSink::default();

        p.tick(&mut sink).await;
        svc.stopped();
        p.tick(&mut sink).await;
        assert!(matches!(sink.statuses[0], Status::ServiceError(_)));
        assert_eq!(sink.statuses[1], Status::NoData);
        // The waiting frame is the only render
        assert_eq!(sink.frames.len(), 1);
        assert_eq!(sink.frames[0].0, DisplayState::waiting(DEFAULT_WAITING_TEXT));
    }

    #[tokio::test]
    async fn test_upcoming_refreshed_without_current() {
        let svc = FakeService::new();
        svc.set_queue(vec![st("C", "Artist3"), st("Z", "Unknown")]);
        let mut p = poller(&svc);
        let mut sink = RecordingSink::default();

        p.tick(&mut sink).await;
        assert_eq!(
            sink.upcoming,
            vec![vec!["1) SALSA  |  C".to_string(), "2) \u{2014}  |  Z".to_string()]]
        );
    }

    #[tokio::test]
    async fn test_redraw_forces_render() {
        let svc = FakeService::new();
        let mut p = poller(&svc);
        let mut sink = RecordingSink::default();

        p.tick(&mut sink).await;
        let rendered = sink.frames.len();
        p.handle_command(Command::GetState, &mut sink);
        assert_eq!(sink.frames.len(), rendered);
        p.handle_command(Command::Redraw, &mut sink);
        assert_eq!(sink.frames.len(), rendered + 1);
    }

    #[tokio::test]
    async fn test_fallback_playlist_command() {
        let svc = FakeService::new();
        let mut p = poller(&svc);
        let mut sink = RecordingSink::default();

        p.handle_command(
            Command::SetFallbackPlaylist {
                input: "spotify:playlist:37i9dQZF1DX0XUsuxWHRQd".into(),
            },
            &mut sink,
        );
        assert_eq!(
            sink.statuses.last(),
            Some(&Status::PlaylistSet("37i9dQZF1DX0XUsuxWHRQd".into()))
        );

        p.handle_command(
            Command::SetFallbackPlaylist {
                input: "https://open.spotify.com/album/37i9dQZF1DX0XUsuxWHRQd".into(),
            },
            &mut sink,
        );
        assert!(matches!(sink.statuses.last(), Some(Status::PlaylistInvalid(_))));
        assert_eq!(
            p.settings().fallback_playlist.as_deref(),
            Some("37i9dQZF1DX0XUsuxWHRQd")
        );

        p.handle_command(Command::SetFallbackPlaylist { input: " ".into() }, &mut sink);
        assert_eq!(sink.statuses.last(), Some(&Status::PlaylistCleared));
        assert!(p.settings().fallback_playlist.is_none());
    }

    #[tokio::test]
    async fn test_next_source_and_reload_commands() {
        let svc = FakeService::new();
        let mut p = poller(&svc);
        let mut sink = RecordingSink::default();

        p.handle_command(
            Command::SetNextSource {
                source: NextSource::Playlist,
            },
            &mut sink,
        );
        assert_eq!(sink.statuses.last(), Some(&Status::NextSource("playlist".into())));
        assert_eq!(sink.settings.last().unwrap().next_source, NextSource::Playlist);

        // In-memory lookup has no source file: reload keeps the table
        p.handle_command(Command::ReloadLookup, &mut sink);
        assert_eq!(sink.statuses.last(), Some(&Status::LookupReloaded(3)));
        assert_eq!(sink.settings.last().unwrap().styles, vec!["Salsa", "Tango", "Waltz"]);
    }

    #[tokio::test]
    async fn test_run_stops_when_commands_close() {
        let svc = FakeService::new();
        svc.playing("A", "Artist1");
        let p = poller(&svc);
        let mut sink = RecordingSink::default();
        let (tx, rx) = mpsc::channel(4);

        tx.send(Command::SetBlackout { on: true }).await.unwrap();
        drop(tx);
        p.run(&mut sink, rx).await;

        assert_eq!(sink.statuses.first(), Some(&Status::Ready));
        assert_eq!(sink.frames.last().unwrap().1, DisplayMode::Blackout);
    }
}
