use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

pub const TICK_RATE: Duration = Duration::from_secs(1);

/// The 1 Hz countdown tick. Armed only while the session is running; a
/// disarmed ticker never fires.
#[derive(Debug, Default)]
pub struct Ticker {
    interval: Option<Interval>,
}

impl Ticker {
    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Replaces any previous interval with a fresh one whose first tick lands
    /// one period from now.
    pub fn arm(&mut self) {
        let mut interval = interval_at(Instant::now() + TICK_RATE, TICK_RATE);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    pub fn disarm(&mut self) {
        self.interval = None;
    }

    /// Arms or disarms to follow the running flag. Returns true when the
    /// state changed.
    pub fn follow(&mut self, running: bool) -> bool {
        match (running, self.is_armed()) {
            (true, false) => {
                self.arm();
                true
            }
            (false, true) => {
                self.disarm();
                true
            }
            _ => false,
        }
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
