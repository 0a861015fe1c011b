use std::time::Duration;

use crate::{session::Session, ticker::Ticker, types::Cue};

pub const LOOP_PERIOD: Duration = Duration::from_millis(50);
pub const NORMAL_RATE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LoopRejected {
    #[error("Pause the video on a sentence before starting the loop")]
    NotPaused,

    #[error("There is no sentence at the current position to loop")]
    NoActiveCue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopToggle {
    Engaged { cue: Cue, rate: f64 },
    Released,
}

/// Single-sentence loop: clamps playback to one cue's range.
#[derive(Debug, Default)]
pub struct SentenceLoop {
    ticker: Ticker,
    cue: Option<Cue>,
}

impl SentenceLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_engaged(&self) -> bool {
        self.cue.is_some()
    }

    pub fn cue(&self) -> Option<&Cue> {
        self.cue.as_ref()
    }

    pub async fn tick(&mut self) {
        self.ticker.tick().await
    }

    pub fn toggle(&mut self, session: &Session, rate: f64) -> Result<LoopToggle, LoopRejected> {
        if self.is_engaged() {
            self.release(session);
            return Ok(LoopToggle::Released);
        }
        let cue = self.engage(session, rate)?;
        Ok(LoopToggle::Engaged { cue, rate })
    }

    /// Requires the player to be paused on a cue.
    pub fn engage(&mut self, session: &Session, rate: f64) -> Result<Cue, LoopRejected> {
        if !session.player.paused() {
            return Err(LoopRejected::NotPaused);
        }
        let active = session.active_cue().ok_or(LoopRejected::NoActiveCue)?;

        session.player.set_current_time_ms(active.cue.start_time);
        session.player.set_playback_rate(rate);
        self.ticker.start(LOOP_PERIOD);
        tracing::info!(
            start_ms = active.cue.start_time,
            end_ms = active.cue.end_time,
            rate,
            "sentence loop engaged"
        );
        self.cue = Some(active.cue.clone());
        Ok(active.cue)
    }

    /// Restores normal rate and stops clamping.
    pub fn release(&mut self, session: &Session) {
        session.player.set_playback_rate(NORMAL_RATE);
        self.stop();
        tracing::info!("sentence loop released");
    }

    /// Stops clamping without touching the player, for teardown.
    pub fn stop(&mut self) {
        self.ticker.stop();
        self.cue = None;
    }

    /// Returns true when playback was sent back to the cue start.
    pub fn clamp(&self, session: &Session) -> bool {
        let Some(cue) = &self.cue else {
            return false;
        };
        if session.player.current_time_ms() >= cue.end_time {
            session.player.set_current_time_ms(cue.start_time);
            return true;
        }
        false
    }
}
