use tracing::{debug, warn};

/// What the coordinator must do after a focus interval completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreakAction {
    /// Demo mode: already counted locally, nothing to write.
    CountedLocally,
    /// Live mode: record the session, then re-read the authoritative streak.
    RecordAndRefresh,
}

/// Completed-session and streak counters.
///
/// In demo mode there is no authority to contradict, so completions are
/// counted optimistically. In live mode the displayed streak only ever comes
/// from the gateway: it is replaced after a successful write and left as-is
/// after a failed one.
#[derive(Debug, Default)]
pub struct StreakTracker {
    current_streak: u32,
    completed_this_run: u32,
}

impl StreakTracker {
    pub fn new(current_streak: u32) -> Self {
        Self {
            current_streak,
            completed_this_run: 0,
        }
    }

    pub fn current_streak(&self) -> u32 {
        self.current_streak
    }

    /// Focus intervals completed since the coordinator started.
    pub fn completed_this_run(&self) -> u32 {
        self.completed_this_run
    }

    pub fn on_focus_complete(&mut self, demo_mode: bool) -> StreakAction {
        self.completed_this_run += 1;
        if demo_mode {
            self.current_streak += 1;
            debug!(event = "streak_local_increment", streak = self.current_streak);
            StreakAction::CountedLocally
        } else {
            StreakAction::RecordAndRefresh
        }
    }

    /// Adopts the value read back from the gateway after a successful write.
    pub fn apply_authoritative(&mut self, streak: u32) {
        if streak < self.current_streak {
            warn!(
                event = "streak_lowered_by_remote",
                previous = self.current_streak,
                remote = streak
            );
        }
        self.current_streak = streak;
    }
}
