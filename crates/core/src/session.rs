use std::sync::Arc;

use crate::{
    player::{Attachment, SubtitleDisplay, VideoPlayer},
    timeline::find_active_cue,
    types::{ActiveCue, CueList, PlaybackState},
    video_url::normalize_video_url,
};

/// Everything the components need to know about the attached video.
///
/// Owned by the page controller and lent to each component per call.
pub struct Session {
    pub player: Arc<dyn VideoPlayer>,
    pub display: Arc<dyn SubtitleDisplay>,
    pub page_url: String,
    pub cues: CueList,
}

impl Session {
    pub fn new(attachment: Attachment) -> Self {
        Self {
            player: attachment.player,
            display: attachment.display,
            page_url: attachment.page_url,
            cues: CueList::default(),
        }
    }

    pub fn cache_key(&self) -> String {
        normalize_video_url(&self.page_url)
    }

    pub fn active_cue(&self) -> Option<ActiveCue> {
        find_active_cue(self.cues.as_slice(), self.player.current_time_ms())
    }

    pub fn playback_state(&self) -> PlaybackState {
        let time_ms = self.player.current_time_ms();
        PlaybackState {
            time_ms,
            paused: self.player.paused(),
            active: find_active_cue(self.cues.as_slice(), time_ms),
        }
    }
}
