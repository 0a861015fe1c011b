use std::time::Duration;

use crate::{session::Session, ticker::Ticker, types::ActiveCue};

pub const SYNC_PERIOD: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Rendered {
    Nothing,
    Hidden,
    Cue { index: usize, text: String },
}

/// Keeps the overlay in step with the player clock.
///
/// The display is only touched when the active cue (or its text) changes.
#[derive(Debug)]
pub struct SyncDriver {
    ticker: Ticker,
    rendered: Rendered,
}

impl Default for SyncDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncDriver {
    pub fn new() -> Self {
        Self {
            ticker: Ticker::new(),
            rendered: Rendered::Nothing,
        }
    }

    pub fn start(&mut self, session: &Session) {
        self.ticker.start(SYNC_PERIOD);
        self.rendered = Rendered::Nothing;
        self.refresh(session);
        tracing::debug!(cues = session.cues.len(), "subtitle sync started");
    }

    pub fn stop(&mut self) {
        if self.ticker.is_running() {
            tracing::debug!("subtitle sync stopped");
        }
        self.ticker.stop();
        self.rendered = Rendered::Nothing;
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    pub async fn tick(&mut self) {
        self.ticker.tick().await
    }

    /// Returns true when the display was mutated.
    pub fn refresh(&mut self, session: &Session) -> bool {
        if !self.ticker.is_running() {
            return false;
        }

        match session.active_cue() {
            Some(ActiveCue { index, cue }) => {
                if let Rendered::Cue {
                    index: shown,
                    text,
                } = &self.rendered
                {
                    if *shown == index && *text == cue.text {
                        return false;
                    }
                    if *shown != index {
                        session.display.clear_translation();
                    }
                }
                session.display.show_original(&cue.text);
                self.rendered = Rendered::Cue {
                    index,
                    text: cue.text,
                };
                true
            }
            None => {
                if self.rendered == Rendered::Hidden {
                    return false;
                }
                session.display.hide();
                self.rendered = Rendered::Hidden;
                true
            }
        }
    }

    /// The cue the player paused on, if any.
    pub fn on_pause(&mut self, session: &Session) -> Option<ActiveCue> {
        self.refresh(session);
        let state = session.playback_state();
        if state.active.is_none() {
            tracing::debug!(
                time_ms = state.time_ms,
                paused = state.paused,
                "paused with no subtitle at this timestamp"
            );
        }
        state.active
    }

    /// Drops transient overlays and goes back to the original-language cue.
    pub fn on_play(&mut self, session: &Session) {
        if let Some(id) = session.display.open_popup_id() {
            session.display.close_popup(id);
        }
        session.display.clear_translation();
        self.refresh(session);
    }

    pub fn on_seeked(&mut self, session: &Session) {
        self.refresh(session);
    }

    /// Hides the overlay and forgets what was shown.
    pub fn clear(&mut self, session: &Session) {
        session.display.hide();
        self.rendered = Rendered::Hidden;
    }
}
