#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use dance_core::lookup::{StyleLookup, StyleTable};
use dance_core::{
    DisplayMode, DisplaySink, DisplayState, EngineSettings, PlaybackService, PlaylistPage,
    ServiceError, ServiceTrack, Status,
};

pub fn st(title: &str, artist: &str) -> ServiceTrack {
    ServiceTrack::new(title, artist)
}

pub fn lookup_from(csv: &str) -> StyleLookup {
    StyleLookup::new(StyleTable::from_csv_str(csv).expect("test CSV should parse"))
}

/// Scriptable playback service. Everything answers from memory. Method names
/// follow the unit-test fake in `src/testing.rs`.
#[derive(Default)]
pub struct ScriptedService {
    current: RefCell<Option<ServiceTrack>>,
    current_error: RefCell<Option<ServiceError>>,
    queue: RefCell<Vec<ServiceTrack>>,
    playlists: RefCell<HashMap<String, Vec<ServiceTrack>>>,
    pub calls: Cell<usize>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn playing(&self, title: &str, artist: &str) {
        *self.current_error.borrow_mut() = None;
        *self.current.borrow_mut() = Some(st(title, artist));
    }

    pub fn stopped(&self) {
        *self.current_error.borrow_mut() = None;
        *self.current.borrow_mut() = None;
    }

    pub fn fail_current(&self, err: ServiceError) {
        *self.current_error.borrow_mut() = Some(err);
    }

    pub fn set_queue(&self, items: Vec<ServiceTrack>) {
        *self.queue.borrow_mut() = items;
    }

    pub fn set_playlist(&self, id: &str, items: Vec<ServiceTrack>) {
        self.playlists.borrow_mut().insert(id.to_string(), items);
    }

    fn bump(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl PlaybackService for ScriptedService {
    async fn currently_playing(&self) -> Result<Option<ServiceTrack>, ServiceError> {
        self.bump();
        if let Some(err) = self.current_error.borrow().clone() {
            return Err(err);
        }
        Ok(self.current.borrow().clone())
    }

    async fn queue(&self) -> Result<Vec<ServiceTrack>, ServiceError> {
        self.bump();
        Ok(self.queue.borrow().clone())
    }

    async fn playlist_page(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<PlaylistPage, ServiceError> {
        self.bump();
        let playlists = self.playlists.borrow();
        let items = playlists
            .get(playlist_id)
            .ok_or(ServiceError::Status(404))?;
        let start = (offset as usize).min(items.len());
        let end = (start + limit as usize).min(items.len());
        Ok(PlaylistPage {
            items: items[start..end].to_vec(),
            has_more: end < items.len(),
        })
    }
}

/// Records everything the engine shows.
#[derive(Default)]
pub struct Screen {
    pub frames: Vec<(DisplayState, DisplayMode)>,
    pub statuses: Vec<Status>,
    pub upcoming: Vec<Vec<String>>,
    pub settings: Option<EngineSettings>,
}

impl Screen {
    pub fn showing(&self) -> &DisplayState {
        &self.frames.last().expect("nothing rendered yet").0
    }
}

impl DisplaySink for Screen {
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
        self.settings = Some(settings.clone());
    }
}
