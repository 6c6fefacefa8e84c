//! Display state: the sticky live snapshot, override modes and the per-tick
//! reducer.
//!
//! The live snapshot only changes through [`reduce`], a pure function of the
//! previous cache and one tick's observation. Override modes (blackout,
//! overwrite) are toggled by commands and never touch the live snapshot, so
//! leaving an override shows the last good live content again.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ServiceError;
use crate::lookup::StyleTable;
use crate::status::Status;
use crate::track::{TrackKey, TrackRef};

pub const DEFAULT_NEXT_PREFIX: &str = "Nächster Tanz: ";
pub const DEFAULT_WAITING_TEXT: &str = "\u{23f3}";

/// Effective display mode, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DisplayMode {
    Blackout,
    Overwrite,
    #[default]
    Live,
}

/// The three text fields handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayState {
    pub info: String,
    pub dance: String,
    pub next: String,
}

impl DisplayState {
    pub fn blank() -> Self {
        Self::default()
    }

    /// Placeholder shown until the first mapped track arrives.
    pub fn waiting(text: &str) -> Self {
        Self {
            info: String::new(),
            dance: text.to_string(),
            next: String::new(),
        }
    }
}

/// Text formatting knobs the reducer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFormat {
    pub show_info: bool,
    pub next_prefix: String,
}

impl Default for TextFormat {
    fn default() -> Self {
        Self {
            show_info: true,
            next_prefix: DEFAULT_NEXT_PREFIX.to_string(),
        }
    }
}

impl TextFormat {
    pub fn info_text(&self, track: &TrackRef) -> String {
        if !self.show_info {
            return String::new();
        }
        format!("{} \u{2014} {}", track.title, track.artist)
            .trim_matches(|c| c == ' ' || c == '\u{2014}')
            .to_string()
    }

    /// Empty when there is no predicted style.
    pub fn next_text(&self, next_style: Option<&str>) -> String {
        match next_style {
            Some(style) if !style.trim().is_empty() => format!("{}{}", self.next_prefix, style),
            _ => String::new(),
        }
    }
}

/// Last good live content plus the identities it was computed from.
///
/// `next_key` is the predicted next style, the only part of the prediction
/// that reaches the display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LiveCache {
    pub state: DisplayState,
    pub track_key: Option<TrackKey>,
    pub next_key: Option<String>,
}

impl LiveCache {
    pub fn new(state: DisplayState) -> Self {
        Self {
            state,
            track_key: None,
            next_key: None,
        }
    }
}

/// What one LIVE tick learned from the service.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Nothing usable is playing. `error` is set when the service call failed.
    NoTrack { error: Option<ServiceError> },
    Playing {
        track: TrackRef,
        /// Upper-cased style of `track`, `None` when unmapped.
        style: Option<String>,
        /// Upper-cased style of the predicted next track.
        next_style: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub cache: LiveCache,
    pub status: Option<Status>,
    pub changed: bool,
}

/// `(old cache, observation) -> new cache`.
pub fn reduce(cache: &LiveCache, observation: Observation, format: &TextFormat) -> Transition {
    let unchanged = |status: Option<Status>| Transition {
        cache: cache.clone(),
        status,
        changed: false,
    };

    match observation {
        Observation::NoTrack { error } => {
            let status = match error {
                Some(e) => Status::ServiceError(e.to_string()),
                None => Status::NoData,
            };
            unchanged(Some(status))
        }
        Observation::Playing {
            track,
            style,
            next_style,
        } => {
            let key = track.key();

            if cache.track_key.as_ref() == Some(&key) {
                if cache.next_key == next_style {
                    return unchanged(None);
                }
                let mut next = cache.clone();
                next.state.next = format.next_text(next_style.as_deref());
                next.next_key = next_style;
                let changed = next.state != cache.state;
                return Transition {
                    cache: next,
                    status: None,
                    changed,
                };
            }

            let Some(style) = style else {
                let mut next = cache.clone();
                next.track_key = Some(key);
                next.next_key = next_style;
                return Transition {
                    cache: next,
                    status: Some(Status::Unmapped),
                    changed: false,
                };
            };

            let state = DisplayState {
                info: format.info_text(&track),
                dance: style,
                next: format.next_text(next_style.as_deref()),
            };
            let changed = state != cache.state;
            Transition {
                cache: LiveCache {
                    state,
                    track_key: Some(key),
                    next_key: next_style,
                },
                status: Some(Status::LiveOk),
                changed,
            }
        }
    }
}

/// Authoritative display state: live cache plus override modes.
#[derive(Debug, Clone)]
pub struct DisplayStateMachine {
    live: LiveCache,
    format: TextFormat,
    blackout: bool,
    overwrite_enabled: bool,
    overwrite_text: Option<String>,
}

impl Default for DisplayStateMachine {
    fn default() -> Self {
        Self::new(TextFormat::default(), DEFAULT_WAITING_TEXT)
    }
}

impl DisplayStateMachine {
    pub fn new(format: TextFormat, waiting_text: &str) -> Self {
        Self {
            live: LiveCache::new(DisplayState::waiting(waiting_text)),
            format,
            blackout: false,
            overwrite_enabled: false,
            overwrite_text: None,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        if self.blackout {
            DisplayMode::Blackout
        } else if self.overwrite_active() {
            DisplayMode::Overwrite
        } else {
            DisplayMode::Live
        }
    }

    /// What the renderer should show right now.
    pub fn frame(&self) -> DisplayState {
        match self.mode() {
            DisplayMode::Blackout => DisplayState::blank(),
            DisplayMode::Overwrite => DisplayState {
                info: String::new(),
                dance: self
                    .overwrite_text
                    .as_deref()
                    .unwrap_or_default()
                    .to_uppercase(),
                next: String::new(),
            },
            DisplayMode::Live => self.live.state.clone(),
        }
    }

    pub fn live(&self) -> &LiveCache {
        &self.live
    }

    pub fn format(&self) -> &TextFormat {
        &self.format
    }

    pub fn is_blackout(&self) -> bool {
        self.blackout
    }

    pub fn overwrite_enabled(&self) -> bool {
        self.overwrite_enabled
    }

    pub fn overwrite_text(&self) -> Option<&str> {
        self.overwrite_text.as_deref()
    }

    pub fn show_info(&self) -> bool {
        self.format.show_info
    }

    /// Fold one LIVE tick into the cache. Returns the status to report.
    pub fn apply(&mut self, observation: Observation) -> Option<Status> {
        let transition = reduce(&self.live, observation, &self.format);
        if transition.changed {
            debug!(
                "[display] {:?} / {:?} / {:?}",
                transition.cache.state.info, transition.cache.state.dance, transition.cache.state.next
            );
        }
        self.live = transition.cache;
        transition.status
    }

    pub fn set_blackout(&mut self, on: bool) {
        if self.blackout != on {
            info!("[display] blackout {}", if on { "on" } else { "off" });
        }
        self.blackout = on;
    }

    /// Disabling clears the text. Enabling without text keeps any text
    /// already set; LIVE stays effective until there is one.
    pub fn set_overwrite(&mut self, enabled: bool, text: Option<&str>) {
        self.overwrite_enabled = enabled;
        if !enabled {
            self.overwrite_text = None;
        } else if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
            self.overwrite_text = Some(text.to_string());
        }
        info!(
            "[display] overwrite {} ({:?})",
            if enabled { "on" } else { "off" },
            self.overwrite_text
        );
    }

    pub fn set_overwrite_text(&mut self, text: &str) -> Option<Status> {
        if !self.overwrite_enabled {
            return Some(Status::OverwriteOff);
        }
        let text = text.trim();
        if text.is_empty() {
            return Some(Status::EmptyText);
        }
        self.overwrite_text = Some(text.to_string());
        None
    }

    /// Overwrite with `styles[index]` from the style catalogue.
    pub fn select_overwrite_style(&mut self, index: usize, styles: &[String]) -> Option<Status> {
        if !self.overwrite_enabled {
            return Some(Status::OverwriteOff);
        }
        match styles.get(index) {
            Some(style) => self.set_overwrite_text(style),
            None => Some(Status::NoSelection),
        }
    }

    /// Turning info off blanks the cached info text at once; turning it back
    /// on shows info from the next track change.
    pub fn set_show_info(&mut self, show: bool) {
        self.format.show_info = show;
        if !show {
            self.live.state.info.clear();
        }
    }

    fn overwrite_active(&self) -> bool {
        self.overwrite_enabled && self.overwrite_text.is_some()
    }
}

/// One line of the upcoming-dances panel, numbered from 1.
pub fn upcoming_line(position: usize, style: Option<&str>, title: &str) -> String {
    let style = style.filter(|s| !s.trim().is_empty()).unwrap_or("\u{2014}");
    let title = title.trim();
    if title.is_empty() {
        format!("{}) {}", position, style)
    } else {
        format!("{}) {}  |  {}", position, style, title)
    }
}

pub fn upcoming_lines(tracks: &[TrackRef], table: &StyleTable) -> Vec<String> {
    tracks
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let style = table.find_style(&track.title, &track.artist);
            upcoming_line(i + 1, style.as_deref(), &track.title)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::StyleEntry;

    fn tr(title: &str, artist: &str) -> TrackRef {
        TrackRef::new(title, artist).unwrap()
    }

    fn playing(title: &str, artist: &str, style: Option<&str>, next: Option<&str>) -> Observation {
        Observation::Playing {
            track: tr(title, artist),
            style: style.map(str::to_string),
            next_style: next.map(str::to_string),
        }
    }

    fn machine() -> DisplayStateMachine {
        DisplayStateMachine::default()
    }

    #[test]
    fn test_initial_frame_is_waiting() {
        let m = machine();
        assert_eq!(m.mode(), DisplayMode::Live);
        assert_eq!(m.frame(), DisplayState::waiting(DEFAULT_WAITING_TEXT));
    }

    #[test]
    fn test_new_mapped_track_replaces_state() {
        let mut m = machine();
        let status = m.apply(playing("A", "Artist1", Some("WALTZ"), Some("TANGO")));
        assert_eq!(status, Some(Status::LiveOk));
        assert_eq!(
            m.frame(),
            DisplayState {
                info: "A \u{2014} Artist1".into(),
                dance: "WALTZ".into(),
                next: "Nächster Tanz: TANGO".into(),
            }
        );
        assert_eq!(m.live().next_key.as_deref(), Some("TANGO"));
    }

    #[test]
    fn test_no_track_is_sticky() {
        let mut m = machine();
        m.apply(playing("A", "Artist1", Some("WALTZ"), None));
        let before = m.frame();

        let status = m.apply(Observation::NoTrack { error: None });
        assert_eq!(status, Some(Status::NoData));
        assert_eq!(m.frame(), before);

        let status = m.apply(Observation::NoTrack {
            error: Some(ServiceError::Status(502)),
        });
        assert!(matches!(status, Some(Status::ServiceError(_))));
        assert_eq!(m.frame(), before);
    }

    #[test]
    fn test_same_track_only_updates_next() {
        let mut m = machine();
        m.apply(playing("A", "Artist1", Some("WALTZ"), Some("TANGO")));

        // Same prediction: nothing to do, no status
        let t = reduce(m.live(), playing("a", " ARTIST1", Some("WALTZ"), Some("TANGO")), m.format());
        assert!(!t.changed);
        assert_eq!(t.status, None);

        let status = m.apply(playing("A", "Artist1", Some("WALTZ"), Some("SALSA")));
        assert_eq!(status, None);
        assert_eq!(m.frame().dance, "WALTZ");
        assert_eq!(m.frame().next, "Nächster Tanz: SALSA");

        m.apply(playing("A", "Artist1", Some("WALTZ"), None));
        assert_eq!(m.frame().next, "");
        assert_eq!(m.frame().info, "A \u{2014} Artist1");
    }

    #[test]
    fn test_unmapped_tracks_keep_content() {
        let mut m = machine();
        m.apply(playing("A", "Artist1", Some("WALTZ"), Some("TANGO")));
        let before = m.frame();

        let mut statuses = Vec::new();
        statuses.push(m.apply(playing("X", "Unknown", None, Some("RUMBA"))));
        assert_eq!(m.live().track_key, Some(tr("X", "Unknown").key()));
        statuses.push(m.apply(playing("X", "Unknown", None, Some("RUMBA"))));
        statuses.push(m.apply(playing("Y", "Unknown", None, Some("RUMBA"))));

        assert_eq!(
            statuses,
            vec![Some(Status::Unmapped), None, Some(Status::Unmapped)]
        );
        assert_eq!(m.frame(), before);
        assert_eq!(m.live().track_key, Some(tr("Y", "Unknown").key()));
    }

    #[test]
    fn test_unmapped_transition_reports_no_change() {
        let cache = LiveCache::new(DisplayState::waiting("..."));
        let t = reduce(&cache, playing("X", "Unknown", None, None), &TextFormat::default());
        assert!(!t.changed);
        assert_eq!(t.cache.state, cache.state);
        assert_eq!(t.status, Some(Status::Unmapped));
    }

    #[test]
    fn test_blackout_beats_overwrite() {
        let mut m = machine();
        m.apply(playing("A", "Artist1", Some("WALTZ"), None));
        m.set_overwrite(true, Some("cha cha"));
        assert_eq!(m.mode(), DisplayMode::Overwrite);
        assert_eq!(
            m.frame(),
            DisplayState {
                info: String::new(),
                dance: "CHA CHA".into(),
                next: String::new()
            }
        );

        m.set_blackout(true);
        assert_eq!(m.mode(), DisplayMode::Blackout);
        assert_eq!(m.frame(), DisplayState::blank());

        m.set_blackout(false);
        m.set_overwrite(false, None);
        assert_eq!(m.mode(), DisplayMode::Live);
        assert_eq!(m.frame().dance, "WALTZ");
        assert_eq!(m.overwrite_text(), None);
    }

    #[test]
    fn test_overwrite_needs_text() {
        let mut m = machine();
        m.set_overwrite(true, None);
        assert_eq!(m.mode(), DisplayMode::Live);
        assert_eq!(m.set_overwrite_text("   "), Some(Status::EmptyText));
        assert_eq!(m.set_overwrite_text("Jive"), None);
        assert_eq!(m.mode(), DisplayMode::Overwrite);
        assert_eq!(m.frame().dance, "JIVE");
    }

    #[test]
    fn test_overwrite_commands_require_enabled() {
        let mut m = machine();
        let styles = vec!["Rumba".to_string(), "Tango".to_string()];
        assert_eq!(m.set_overwrite_text("Jive"), Some(Status::OverwriteOff));
        assert_eq!(m.select_overwrite_style(0, &styles), Some(Status::OverwriteOff));

        m.set_overwrite(true, None);
        assert_eq!(m.select_overwrite_style(5, &styles), Some(Status::NoSelection));
        assert_eq!(m.select_overwrite_style(1, &styles), None);
        assert_eq!(m.frame().dance, "TANGO");
    }

    #[test]
    fn test_show_info_toggle() {
        let mut m = machine();
        m.apply(playing("A", "Artist1", Some("WALTZ"), None));
        m.set_show_info(false);
        assert_eq!(m.frame().info, "");

        // Same track: stays blank after re-enabling
        m.set_show_info(true);
        m.apply(playing("A", "Artist1", Some("WALTZ"), None));
        assert_eq!(m.frame().info, "");

        m.apply(playing("B", "Artist2", Some("TANGO"), None));
        assert_eq!(m.frame().info, "B \u{2014} Artist2");
    }

    #[test]
    fn test_info_text_hidden() {
        let format = TextFormat {
            show_info: false,
            ..TextFormat::default()
        };
        let cache = LiveCache::default();
        let t = reduce(&cache, playing("A", "Artist1", Some("WALTZ"), None), &format);
        assert_eq!(t.cache.state.info, "");
        assert_eq!(t.cache.state.dance, "WALTZ");
    }

    #[test]
    fn test_upcoming_lines() {
        let table = StyleTable::new(vec![StyleEntry::new("A", "Artist1", "Waltz")]);
        let lines = upcoming_lines(&[tr("A", "Artist1"), tr("B", "Artist2")], &table);
        assert_eq!(lines, vec!["1) WALTZ  |  A", "2) \u{2014}  |  B"]);
        assert_eq!(upcoming_line(3, Some("SALSA"), ""), "3) SALSA");
        assert_eq!(upcoming_line(4, None, " "), "4) \u{2014}");
    }
}
