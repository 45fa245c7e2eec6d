//! The countdown engine: mode, time remaining, running flag and the
//! focus/break transition rules.
//!
//! The machine has no I/O and cannot fail. Everything that can go wrong
//! (persistence, playback) is handled by the coordinator around it.

use crate::settings::SessionSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Focus,
    ShortBreak,
    LongBreak,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Focus, Mode::ShortBreak, Mode::LongBreak];

    pub fn name(&self) -> &str {
        match self {
            Self::Focus => "🎯 FOCUS TIME",
            Self::ShortBreak => "☕ SHORT BREAK",
            Self::LongBreak => "🌴 LONG BREAK",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::ShortBreak => "short_break",
            Self::LongBreak => "long_break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, Self::Focus)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient runtime state. Never persisted; recomputed from
/// [`SessionSettings`] whenever the mode changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionRuntimeState {
    pub mode: Mode,
    pub seconds_remaining: u32,
    pub is_running: bool,
    pub sessions_completed_in_cycle: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Ignored because the machine is paused.
    Idle,
    Counting { seconds_remaining: u32 },
    Completed { finished: Mode, next: Mode },
}

pub struct SessionMachine {
    state: SessionRuntimeState,
}

impl SessionMachine {
    pub fn new(settings: &SessionSettings) -> Self {
        Self {
            state: SessionRuntimeState {
                mode: Mode::Focus,
                seconds_remaining: settings.duration_secs(Mode::Focus),
                is_running: false,
                sessions_completed_in_cycle: 0,
            },
        }
    }

    pub fn state(&self) -> SessionRuntimeState {
        self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.state.seconds_remaining
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn sessions_completed_in_cycle(&self) -> u32 {
        self.state.sessions_completed_in_cycle
    }

    pub fn start(&mut self) {
        if self.state.is_running {
            return;
        }
        self.state.is_running = true;
    }

    pub fn pause(&mut self) {
        if !self.state.is_running {
            return;
        }
        self.state.is_running = false;
    }

    pub fn reset(&mut self, settings: &SessionSettings) {
        self.state.seconds_remaining = settings.duration_secs(self.state.mode);
        self.state.is_running = false;
    }

    /// User-driven mode switch. Leaves the cycle counter alone.
    pub fn set_mode(&mut self, mode: Mode, settings: &SessionSettings) {
        self.state.mode = mode;
        self.state.seconds_remaining = settings.duration_secs(mode);
        self.state.is_running = false;
    }

    /// Live re-sync after a duration edit: if the edited duration belongs to
    /// the current mode the countdown jumps to it, even mid-session.
    pub fn resync(&mut self, changed: Mode, settings: &SessionSettings) {
        if changed == self.state.mode {
            self.state.seconds_remaining = settings.duration_secs(changed);
        }
    }

    pub fn tick(&mut self, settings: &SessionSettings) -> TickOutcome {
        if !self.state.is_running {
            return TickOutcome::Idle;
        }

        if let Some(left) = self.state.seconds_remaining.checked_sub(1) {
            self.state.seconds_remaining = left;
            return TickOutcome::Counting { seconds_remaining: left };
        }

        let finished = self.state.mode;
        self.state.is_running = false;
        let next = match finished {
            Mode::Focus => {
                self.state.sessions_completed_in_cycle += 1;
                let every = settings.sessions_until_long_break.max(1);
                if self.state.sessions_completed_in_cycle % every == 0 {
                    Mode::LongBreak
                } else {
                    Mode::ShortBreak
                }
            }
            Mode::ShortBreak | Mode::LongBreak => Mode::Focus,
        };
        self.state.mode = next;
        self.state.seconds_remaining = settings.duration_secs(next);

        debug!(
            event = "interval_complete",
            finished = %finished,
            next = %next,
            completed_in_cycle = self.state.sessions_completed_in_cycle
        );
        TickOutcome::Completed { finished, next }
    }

    pub fn progress_ratio(&self, settings: &SessionSettings) -> f64 {
        let total = settings.duration_secs(self.state.mode) as f64;
        if total == 0.0 {
            return 1.0;
        }
        (1.0 - (self.state.seconds_remaining as f64 / total)).clamp(0.0, 1.0)
    }
}

/// Formats seconds as `MM:SS`.
pub fn format_mmss(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_settings(sessions: u32) -> SessionSettings {
        SessionSettings {
            focus_minutes: 1,
            short_break_minutes: 1,
            long_break_minutes: 2,
            sessions_until_long_break: sessions,
            ..SessionSettings::default()
        }
    }

    /// Ticks until the current interval completes.
    fn run_out(machine: &mut SessionMachine, settings: &SessionSettings) -> (Mode, Mode) {
        machine.start();
        loop {
            if let TickOutcome::Completed { finished, next } = machine.tick(settings) {
                return (finished, next);
            }
        }
    }

    #[test]
    fn starts_paused_in_focus_with_full_duration() {
        let settings = SessionSettings::default();
        let m = SessionMachine::new(&settings);
        assert_eq!(m.mode(), Mode::Focus);
        assert_eq!(m.seconds_remaining(), 1500);
        assert!(!m.is_running());
        assert_eq!(m.sessions_completed_in_cycle(), 0);
    }

    #[test]
    fn tick_is_ignored_while_paused() {
        let settings = SessionSettings::default();
        let mut m = SessionMachine::new(&settings);
        assert_eq!(m.tick(&settings), TickOutcome::Idle);
        assert_eq!(m.seconds_remaining(), 1500);
    }

    #[test]
    fn pause_then_start_resumes_exactly() {
        let settings = SessionSettings::default();
        let mut m = SessionMachine::new(&settings);
        m.start();
        for _ in 0..7 {
            m.tick(&settings);
        }
        m.pause();
        let at_pause = m.seconds_remaining();
        assert_eq!(m.tick(&settings), TickOutcome::Idle);
        m.start();
        assert_eq!(m.seconds_remaining(), at_pause);
        m.tick(&settings);
        assert_eq!(m.seconds_remaining(), at_pause - 1);
    }

    #[test]
    fn start_and_pause_are_noops_when_repeated() {
        let settings = SessionSettings::default();
        let mut m = SessionMachine::new(&settings);
        m.start();
        m.tick(&settings);
        m.start();
        assert!(m.is_running());
        assert_eq!(m.seconds_remaining(), 1499);
        m.pause();
        m.pause();
        assert!(!m.is_running());
    }

    #[test]
    fn reset_is_idempotent() {
        let settings = SessionSettings::default();
        let mut m = SessionMachine::new(&settings);
        m.start();
        for _ in 0..30 {
            m.tick(&settings);
        }
        m.reset(&settings);
        let first = m.state();
        m.reset(&settings);
        assert_eq!(m.state(), first);
        assert_eq!(first.seconds_remaining, 1500);
        assert!(!first.is_running);
    }

    #[test]
    fn set_mode_keeps_cycle_counter() {
        let settings = short_settings(4);
        let mut m = SessionMachine::new(&settings);
        run_out(&mut m, &settings);
        assert_eq!(m.sessions_completed_in_cycle(), 1);
        m.set_mode(Mode::LongBreak, &settings);
        assert_eq!(m.mode(), Mode::LongBreak);
        assert_eq!(m.seconds_remaining(), 120);
        assert!(!m.is_running());
        assert_eq!(m.sessions_completed_in_cycle(), 1);
    }

    #[test]
    fn completion_happens_on_tick_after_zero() {
        let settings = short_settings(4);
        let mut m = SessionMachine::new(&settings);
        m.start();
        for _ in 0..60 {
            assert!(matches!(m.tick(&settings), TickOutcome::Counting { .. }));
        }
        assert_eq!(m.seconds_remaining(), 0);
        assert_eq!(
            m.tick(&settings),
            TickOutcome::Completed { finished: Mode::Focus, next: Mode::ShortBreak }
        );
        assert!(!m.is_running());
        assert_eq!(m.seconds_remaining(), 60);
    }

    #[test]
    fn long_break_on_every_nth_focus() {
        for sessions in 1..=5 {
            let settings = short_settings(sessions);
            let mut m = SessionMachine::new(&settings);
            for n in 1..=(sessions * 2) {
                let (finished, next) = run_out(&mut m, &settings);
                assert_eq!(finished, Mode::Focus);
                let expected = if n % sessions == 0 { Mode::LongBreak } else { Mode::ShortBreak };
                assert_eq!(next, expected, "sessions={sessions} n={n}");
                let (finished, next) = run_out(&mut m, &settings);
                assert!(finished.is_break());
                assert_eq!(next, Mode::Focus);
            }
        }
    }

    #[test]
    fn resync_only_touches_current_mode() {
        let mut settings = SessionSettings::default();
        let mut m = SessionMachine::new(&settings);
        m.start();
        m.tick(&settings);

        settings.short_break_minutes = 10;
        m.resync(Mode::ShortBreak, &settings);
        assert_eq!(m.seconds_remaining(), 1499);

        settings.focus_minutes = 30;
        m.resync(Mode::Focus, &settings);
        assert_eq!(m.seconds_remaining(), 1800);
        assert!(m.is_running());
    }

    #[test]
    fn progress_and_format() {
        let settings = short_settings(4);
        let mut m = SessionMachine::new(&settings);
        assert_eq!(m.progress_ratio(&settings), 0.0);
        m.start();
        for _ in 0..30 {
            m.tick(&settings);
        }
        assert!((m.progress_ratio(&settings) - 0.5).abs() < f64::EPSILON);
        assert_eq!(format_mmss(1500), "25:00");
        assert_eq!(format_mmss(61), "01:01");
    }
}
