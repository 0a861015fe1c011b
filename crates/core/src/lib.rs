//! Lingualoop Core Library
//!
//! Subtitle timeline matching and playback synchronization for language
//! learners, with sentence looping, translation and vocabulary lookup
//! backed by a hosted language model.

pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod messages;
pub mod persistence;
pub mod player;
pub mod provider;
pub mod sentence_loop;
pub mod service;
pub mod session;
pub mod settings;
pub mod store;
pub mod sync;
pub mod ticker;
pub mod timeline;
pub mod types;
pub mod video_url;
pub mod vocabulary;

#[cfg(test)]
mod testing;

// Re-export commonly used items at crate root
pub use controller::PageController;
pub use error::LinguaError;
pub use format::{format_cue, format_cue_list, format_timestamp};
pub use messages::{Command, CommandResponse, PageEvent, PlayerEvent};
pub use persistence::Persistence;
pub use player::{Attachment, PageHost, PopupContent, PopupId, SubtitleDisplay, VideoPlayer};
pub use provider::{Provider, ProviderConfig};
pub use service::{LlmService, ServiceError, TextService};
pub use settings::{Level, PauseAction, Settings};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use timeline::{find_active_cue, find_previous_cue};
pub use types::{ActiveCue, Cue, CueList, PlaybackState, SavedWords};
pub use video_url::normalize_video_url;
