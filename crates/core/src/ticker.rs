use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior, interval_at};

/// A restartable periodic timer.
///
/// Holds at most one pending interval. [`Ticker::tick`] never completes while
/// the ticker is stopped, so it can sit in a `select!` arm unconditionally.
#[derive(Debug, Default)]
pub struct Ticker {
    interval: Option<Interval>,
}

impl Ticker {
    pub fn new() -> Self {
        Self { interval: None }
    }

    /// First tick fires one `period` from now. Replaces a running interval.
    pub fn start(&mut self, period: Duration) {
        let mut interval = interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(interval);
    }

    pub fn stop(&mut self) {
        self.interval = None;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::{Instant, timeout};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_every_period_after_start() {
        let mut ticker = Ticker::new();
        ticker.start(Duration::from_millis(100));
        let began = Instant::now();
        ticker.tick().await;
        ticker.tick().await;
        assert_eq!(began.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_ticker_never_fires() {
        let mut ticker = Ticker::new();
        ticker.start(Duration::from_millis(10));
        ticker.stop();
        assert!(!ticker.is_running());
        assert!(timeout(Duration::from_secs(5), ticker.tick()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_pending_interval() {
        let mut ticker = Ticker::new();
        ticker.start(Duration::from_millis(50));
        ticker.start(Duration::from_millis(300));
        let began = Instant::now();
        ticker.tick().await;
        assert_eq!(began.elapsed(), Duration::from_millis(300));
    }
}
