//! In-memory playback service for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::error::ServiceError;
use crate::service::{PlaybackService, PlaylistPage, ServiceTrack};

pub(crate) fn st(title: &str, artist: &str) -> ServiceTrack {
    ServiceTrack::new(title, artist)
}

pub(crate) struct FakeService {
    pub current: RefCell<Result<Option<ServiceTrack>, ServiceError>>,
    pub queue: RefCell<Result<Vec<ServiceTrack>, ServiceError>>,
    pub playlists: RefCell<HashMap<String, Vec<ServiceTrack>>>,
    pub playlist_error: RefCell<Option<ServiceError>>,
    pub current_calls: Cell<usize>,
    pub queue_calls: Cell<usize>,
    pub page_calls: Cell<usize>,
}

impl FakeService {
    pub fn new() -> Self {
        Self {
            current: RefCell::new(Ok(None)),
            queue: RefCell::new(Ok(Vec::new())),
            playlists: RefCell::new(HashMap::new()),
            playlist_error: RefCell::new(None),
            current_calls: Cell::new(0),
            queue_calls: Cell::new(0),
            page_calls: Cell::new(0),
        }
    }

    pub fn playing(&self, title: &str, artist: &str) {
        *self.current.borrow_mut() = Ok(Some(st(title, artist)));
    }

    pub fn stopped(&self) {
        *self.current.borrow_mut() = Ok(None);
    }

    pub fn fail_current(&self, err: ServiceError) {
        *self.current.borrow_mut() = Err(err);
    }

    pub fn set_queue(&self, items: Vec<ServiceTrack>) {
        *self.queue.borrow_mut() = Ok(items);
    }

    pub fn fail_queue(&self, err: ServiceError) {
        *self.queue.borrow_mut() = Err(err);
    }

    pub fn set_playlist(&self, id: &str, items: Vec<ServiceTrack>) {
        self.playlists.borrow_mut().insert(id.to_string(), items);
    }
}

impl PlaybackService for FakeService {
    async fn currently_playing(&self) -> Result<Option<ServiceTrack>, ServiceError> {
        self.current_calls.set(self.current_calls.get() + 1);
        self.current.borrow().clone()
    }

    async fn queue(&self) -> Result<Vec<ServiceTrack>, ServiceError> {
        self.queue_calls.set(self.queue_calls.get() + 1);
        self.queue.borrow().clone()
    }

    async fn playlist_page(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<PlaylistPage, ServiceError> {
        self.page_calls.set(self.page_calls.get() + 1);
        if let Some(err) = self.playlist_error.borrow().clone() {
            return Err(err);
        }
        let playlists = self.playlists.borrow();
        let items = playlists.get(playlist_id).ok_or(ServiceError::Status(404))?;
        let start = (offset as usize).min(items.len());
        let end = (start + limit as usize).min(items.len());
        Ok(PlaylistPage {
            items: items[start..end].to_vec(),
            has_more: end < items.len(),
        })
    }
}
