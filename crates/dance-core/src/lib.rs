//! Track-resolution and display-state engine for a live dance-style display.

pub mod config;
pub mod display;
pub mod error;
pub mod identifier;
pub mod lookup;
pub mod platform;
pub mod poller;
pub mod protocol;
pub mod resolver;
pub mod scanner;
pub mod service;
pub mod sources;
pub mod status;
pub mod track;

#[cfg(test)]
mod testing;

pub use display::{DisplayMode, DisplayState, DisplayStateMachine};
pub use error::{IdentifierError, LookupError, ServiceError};
pub use lookup::{StyleLookup, StyleTable};
pub use poller::{DisplaySink, EngineSettings, Poller, PollerOptions};
pub use protocol::{Broadcast, Command, DisplaySnapshot, Message, PROTOCOL_VERSION};
pub use resolver::{NextSource, NextTrackResolver};
pub use service::{PlaybackService, PlaylistPage, ServiceTrack};
pub use status::Status;
pub use track::TrackRef;
