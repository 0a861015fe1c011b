//! Seams to the host page: the video element, the subtitle overlay and
//! the discovery of both.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use uuid::Uuid;

use crate::vocabulary::{HighlightSpan, VocabularyEntry};

/// The page's `<video>` element.
pub trait VideoPlayer: Send + Sync {
    fn current_time_ms(&self) -> u64;
    fn set_current_time_ms(&self, time_ms: u64);
    fn paused(&self) -> bool;
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&self, rate: f64);
    /// False once the element has been removed from the page.
    fn is_connected(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PopupId(Uuid);

impl PopupId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PopupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PopupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupContent {
    Loading {
        sentence: String,
    },
    Vocabulary {
        sentence: String,
        highlights: Vec<HighlightSpan>,
        entries: Vec<VocabularyEntry>,
    },
    Failed {
        message: String,
    },
}

/// The overlay: an original-language layer, a translation layer, one popup
/// and an inline message line.
pub trait SubtitleDisplay: Send + Sync {
    fn show_original(&self, text: &str);
    fn show_translation(&self, text: &str);
    fn clear_translation(&self);
    /// Hides the overlay and clears both text layers.
    fn hide(&self);
    fn show_message(&self, text: &str);

    /// Replaces any popup already open.
    fn open_popup(&self, content: PopupContent) -> PopupId;
    /// Returns false when `id` is no longer the open popup.
    fn update_popup(&self, id: PopupId, content: PopupContent) -> bool;
    fn close_popup(&self, id: PopupId);
    fn open_popup_id(&self) -> Option<PopupId>;

    fn popup_exists(&self, id: PopupId) -> bool {
        self.open_popup_id() == Some(id)
    }
}

#[derive(Clone)]
pub struct Attachment {
    pub player: Arc<dyn VideoPlayer>,
    pub display: Arc<dyn SubtitleDisplay>,
    pub page_url: String,
}

#[async_trait]
pub trait PageHost: Send + Sync {
    /// One discovery pass. `None` when the video or its container is missing.
    async fn discover(&self) -> Option<Attachment>;
}
