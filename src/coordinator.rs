//! Composition root for a focus session: owns the state machine, streak
//! tracker, ambient audio and completion signal, and talks to the gateway.
//!
//! Everything runs on one task. Gateway calls are spawned and report back
//! through a channel as [`GatewayEvent`]s, so a slow or failing write never
//! delays a tick.

use crate::audio::{AmbientAudio, AudioChannel, AudioState, AudioTransition};
use crate::debounce::{AUDIO_PREFERENCE_QUIET_PERIOD, Debouncer};
use crate::error::{FocusError, Result};
use crate::gateway::{AudioPreference, PersistenceGateway, SessionRecord};
use crate::session::{Mode, SessionMachine, TickOutcome};
use crate::settings::{SessionSettings, SettingUpdate, SettingsOverrides, Theme};
use crate::signal::{Chime, CompletionSignal, Notifier, Toast, ToastLevel};
use crate::streak::{StreakAction, StreakTracker};
use crate::ticker::Ticker;
use std::fmt;
use std::future::Future;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const ENERGY_RANGE: RangeInclusive<u8> = 1..=5;

/// How long teardown waits for outstanding gateway writes.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayOp {
    Settings,
    Session,
    Streak,
    AudioPreference,
}

impl fmt::Display for GatewayOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Settings => "settings",
            Self::Session => "session",
            Self::Streak => "streak",
            Self::AudioPreference => "audio preference",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayEvent {
    Saved(GatewayOp),
    StreakRefreshed(u32),
    Failed { op: GatewayOp, error: FocusError },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Wakeup {
    Tick,
    FlushAudio,
    Gateway(GatewayEvent),
}

/// Read-only view handed to the UI.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub mode: Mode,
    pub seconds_remaining: u32,
    pub is_running: bool,
    pub sessions_completed_in_cycle: u32,
    pub sessions_until_long_break: u32,
    pub streak: u32,
    pub is_demo_mode: bool,
    pub progress: f64,
    pub audio: AudioState,
    pub audio_track_name: Option<String>,
    pub volume: f32,
    pub looping: bool,
    pub sound_enabled: bool,
    pub theme: Theme,
    pub energy_level: Option<u8>,
}

/// Collaborators injected at startup.
pub struct CoordinatorParts {
    pub gateway: PersistenceGateway,
    pub channel: Box<dyn AudioChannel>,
    pub chime: Box<dyn Chime>,
    pub notifier: Arc<dyn Notifier>,
    pub sounds_dir: PathBuf,
    pub overrides: SettingsOverrides,
}

pub struct FocusCoordinator {
    gateway: Arc<PersistenceGateway>,
    settings: SessionSettings,
    machine: SessionMachine,
    streak: StreakTracker,
    audio: AmbientAudio,
    signal: CompletionSignal,
    notifier: Arc<dyn Notifier>,
    ticker: Ticker,
    audio_writes: Debouncer<AudioPreference>,
    settings_in_flight: bool,
    settings_pending: Option<SessionSettings>,
    tasks: JoinSet<()>,
    events_tx: UnboundedSender<GatewayEvent>,
    events_rx: UnboundedReceiver<GatewayEvent>,
    energy_level: Option<u8>,
    last_toast: Option<Toast>,
}

impl FocusCoordinator {
    /// Loads settings, streak and audio preference, then resumes the
    /// persisted ambient track. Load failures fall back to defaults.
    pub async fn bootstrap(parts: CoordinatorParts) -> Self {
        let CoordinatorParts {
            gateway,
            channel,
            chime,
            notifier,
            sounds_dir,
            overrides,
        } = parts;

        let mut startup_problems = Vec::new();

        let mut settings = gateway.get_settings().await.unwrap_or_else(|err| {
            warn!(event = "settings_load_failed", error = %err);
            startup_problems.push(format!("settings: {err}"));
            SessionSettings::default()
        });
        if let Err(err) = overrides.apply(&mut settings) {
            warn!(event = "override_rejected", error = %err);
            startup_problems.push(format!("override: {err}"));
        }
        let streak = gateway.get_streak().await.unwrap_or_else(|err| {
            warn!(event = "streak_load_failed", error = %err);
            startup_problems.push(format!("streak: {err}"));
            0
        });
        let preference = gateway.get_audio_preference().await.unwrap_or_else(|err| {
            warn!(event = "audio_preference_load_failed", error = %err);
            startup_problems.push(format!("audio preference: {err}"));
            AudioPreference::default()
        });

        let (events_tx, events_rx) = unbounded_channel();
        let mut coordinator = Self {
            machine: SessionMachine::new(&settings),
            streak: StreakTracker::new(streak),
            audio: AmbientAudio::new(channel, sounds_dir, preference),
            signal: CompletionSignal::new(chime),
            gateway: Arc::new(gateway),
            settings,
            notifier,
            ticker: Ticker::default(),
            audio_writes: Debouncer::new(AUDIO_PREFERENCE_QUIET_PERIOD),
            settings_in_flight: false,
            settings_pending: None,
            tasks: JoinSet::new(),
            events_tx,
            events_rx,
            energy_level: None,
            last_toast: None,
        };

        if let Some(err) = coordinator.audio.restore(coordinator.settings.sound_enabled) {
            startup_problems.push(format!("ambient sound: {err}"));
        }
        if !startup_problems.is_empty() {
            coordinator.toast(Toast::new(
                ToastLevel::Warning,
                "Started with defaults",
                startup_problems.join("; "),
            ));
        }

        info!(
            event = "coordinator_ready",
            demo = coordinator.gateway.is_demo(),
            focus_minutes = coordinator.settings.focus_minutes,
            streak = coordinator.streak.current_streak()
        );
        coordinator
    }

    // ------------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------------

    pub fn snapshot(&self) -> Snapshot {
        let state = self.machine.state();
        let preference = self.audio.preference();
        Snapshot {
            mode: state.mode,
            seconds_remaining: state.seconds_remaining,
            is_running: state.is_running,
            sessions_completed_in_cycle: state.sessions_completed_in_cycle,
            sessions_until_long_break: self.settings.sessions_until_long_break,
            streak: self.streak.current_streak(),
            is_demo_mode: self.gateway.is_demo(),
            progress: self.machine.progress_ratio(&self.settings),
            audio: self.audio.state().clone(),
            audio_track_name: self
                .audio
                .playing_track()
                .and_then(|id| self.audio.track_name(id)),
            volume: preference.volume,
            looping: preference.looping,
            sound_enabled: self.settings.sound_enabled,
            theme: self.settings.preferred_theme,
            energy_level: self.energy_level,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn last_toast(&self) -> Option<&Toast> {
        self.last_toast.as_ref()
    }

    pub fn completions_signalled(&self) -> u64 {
        self.signal.fired()
    }

    pub fn is_tick_armed(&self) -> bool {
        self.ticker.is_armed()
    }

    // ------------------------------------------------------------------------
    // Countdown controls
    // ------------------------------------------------------------------------

    pub fn start(&mut self) {
        self.machine.start();
        self.sync_ticker();
    }

    pub fn pause(&mut self) {
        self.machine.pause();
        self.sync_ticker();
    }

    pub fn toggle(&mut self) {
        if self.machine.is_running() {
            self.pause();
        } else {
            self.start();
        }
    }

    pub fn reset(&mut self) {
        self.machine.reset(&self.settings);
        self.sync_ticker();
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.machine.set_mode(mode, &self.settings);
        self.sync_ticker();
        debug!(event = "mode_selected", mode = %mode);
    }

    /// One countdown step. Driven by the 1 Hz ticker, or directly by tests.
    pub fn tick(&mut self) {
        if let TickOutcome::Completed { finished, next } = self.machine.tick(&self.settings) {
            self.on_complete(finished, next);
        }
    }

    fn on_complete(&mut self, finished: Mode, next: Mode) {
        let completion = self.signal.fire(finished, next, self.settings.sound_enabled);
        info!(event = "interval_complete", finished = %finished, next = %next);

        if finished == Mode::Focus {
            match self.streak.on_focus_complete(self.gateway.is_demo()) {
                StreakAction::CountedLocally => {}
                StreakAction::RecordAndRefresh => self.record_completed_focus(),
            }
        }

        self.toast(completion.toast);

        // The tick is recreated whenever the running flag flips, including
        // the stop/start pair of an auto-started interval.
        self.ticker.disarm();
        if self.settings.auto_start_next {
            self.machine.start();
        }
        self.sync_ticker();
    }

    fn record_completed_focus(&mut self) {
        let record = SessionRecord {
            duration_minutes: self.settings.focus_minutes,
            mode: Mode::Focus,
            energy_level: self.energy_level,
            completed_at: chrono::Utc::now(),
        };
        let gateway = self.gateway.clone();
        self.dispatch(GatewayOp::Session, async move {
            gateway.record_session(&record).await?;
            // The session is saved by now; only the re-read can still fail.
            Ok(match gateway.get_streak().await {
                Ok(streak) => GatewayEvent::StreakRefreshed(streak),
                Err(error) => GatewayEvent::Failed {
                    op: GatewayOp::Streak,
                    error,
                },
            })
        });
    }

    fn sync_ticker(&mut self) {
        if self.ticker.follow(self.machine.is_running()) {
            debug!(event = "ticker", armed = self.ticker.is_armed());
        }
    }

    // ------------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------------

    pub fn update_setting(&mut self, update: SettingUpdate) -> Result<()> {
        let changed = match self.settings.apply(update) {
            Ok(changed) => changed,
            Err(err) => {
                self.toast(Toast::new(ToastLevel::Warning, "Setting rejected", err.to_string()));
                return Err(err);
            }
        };
        if let Some(mode) = changed {
            self.machine.resync(mode, &self.settings);
        }
        debug!(event = "setting_updated", update = ?update);

        self.settings_pending = Some(self.settings.clone());
        self.write_pending_settings();
        Ok(())
    }

    /// Settings writes are full snapshots and go out one at a time, so the
    /// remote always ends on the latest edit. Edits made while a write is in
    /// flight collapse into the next one.
    fn write_pending_settings(&mut self) {
        if self.settings_in_flight {
            return;
        }
        let Some(settings) = self.settings_pending.take() else {
            return;
        };
        self.settings_in_flight = true;
        let gateway = self.gateway.clone();
        self.dispatch(GatewayOp::Settings, async move {
            gateway.update_settings(&settings).await?;
            Ok(GatewayEvent::Saved(GatewayOp::Settings))
        });
    }

    /// `update_setting` for a raw `key`/`value` pair from the UI.
    pub fn update_setting_str(&mut self, key: &str, value: &str) -> Result<()> {
        match SettingUpdate::parse(key, value) {
            Ok(update) => self.update_setting(update),
            Err(err) => {
                self.toast(Toast::new(ToastLevel::Warning, "Setting rejected", err.to_string()));
                Err(err)
            }
        }
    }

    pub fn set_energy_level(&mut self, level: Option<u8>) -> Result<()> {
        if let Some(l) = level {
            if !ENERGY_RANGE.contains(&l) {
                return Err(FocusError::Validation(format!(
                    "energy level must be between {} and {}",
                    ENERGY_RANGE.start(),
                    ENERGY_RANGE.end()
                )));
            }
        }
        self.energy_level = level;
        Ok(())
    }

    pub fn cycle_energy_level(&mut self) {
        self.energy_level = match self.energy_level {
            None => Some(*ENERGY_RANGE.start()),
            Some(l) if l >= *ENERGY_RANGE.end() => None,
            Some(l) => Some(l + 1),
        };
    }

    // ------------------------------------------------------------------------
    // Ambient audio
    // ------------------------------------------------------------------------

    pub fn select_ambient_track(&mut self, id: &str) -> Result<AudioTransition> {
        let result = self.audio.select_track(id);
        if let Err(err) = &result {
            self.toast(Toast::new(ToastLevel::Warning, "Couldn't play sound", err.to_string()));
        }
        self.queue_audio_write();
        result
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.audio.set_volume(volume);
        self.queue_audio_write();
    }

    pub fn adjust_volume(&mut self, delta: f32) {
        let volume = self.audio.preference().volume + delta;
        self.set_volume(volume);
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.audio.set_looping(looping);
        self.queue_audio_write();
    }

    pub fn toggle_looping(&mut self) {
        let looping = !self.audio.preference().looping;
        self.set_looping(looping);
    }

    pub fn register_upload(&mut self, path: &Path) -> Result<AudioTransition> {
        let result = self.audio.register_upload(path);
        match &result {
            Err(err @ FocusError::Validation(_)) => {
                self.toast(Toast::new(ToastLevel::Warning, "Upload rejected", err.to_string()));
            }
            Err(err) => {
                self.toast(Toast::new(ToastLevel::Warning, "Couldn't play sound", err.to_string()));
                self.queue_audio_write();
            }
            Ok(_) => self.queue_audio_write(),
        }
        result
    }

    /// Picks up a track that stopped on its own.
    pub fn poll_audio(&mut self) {
        if self.audio.poll() {
            self.queue_audio_write();
        }
    }

    fn queue_audio_write(&mut self) {
        self.audio_writes
            .push(self.audio.preference().clone(), Instant::now());
    }

    fn flush_audio_preference(&mut self) {
        if let Some(pref) = self.audio_writes.take_due(Instant::now()) {
            debug!(event = "audio_preference_flush", volume = pref.volume);
            let gateway = self.gateway.clone();
            self.dispatch(GatewayOp::AudioPreference, async move {
                gateway.update_audio_preference(&pref).await?;
                Ok(GatewayEvent::Saved(GatewayOp::AudioPreference))
            });
        }
    }

    // ------------------------------------------------------------------------
    // Event loop plumbing
    // ------------------------------------------------------------------------

    /// Waits for the next thing the coordinator must react to.
    pub async fn next_wakeup(&mut self) -> Wakeup {
        let flush_at = self.audio_writes.deadline();
        loop {
            tokio::select! {
                _ = self.ticker.tick() => return Wakeup::Tick,
                Some(event) = self.events_rx.recv() => return Wakeup::Gateway(event),
                _ = sleep_until(flush_at) => return Wakeup::FlushAudio,
                // reap finished writes; their outcome arrives as an event
                Some(_) = self.tasks.join_next(), if !self.tasks.is_empty() => {}
            }
        }
    }

    pub fn handle(&mut self, wakeup: Wakeup) {
        match wakeup {
            Wakeup::Tick => self.tick(),
            Wakeup::FlushAudio => self.flush_audio_preference(),
            Wakeup::Gateway(event) => self.apply_gateway_event(event),
        }
    }

    fn apply_gateway_event(&mut self, event: GatewayEvent) {
        if let GatewayEvent::Saved(GatewayOp::Settings)
        | GatewayEvent::Failed {
            op: GatewayOp::Settings,
            ..
        } = &event
        {
            self.settings_in_flight = false;
            self.write_pending_settings();
        }
        match event {
            GatewayEvent::Saved(op) => {
                debug!(event = "gateway_saved", op = %op);
                if op == GatewayOp::Settings && !self.gateway.is_demo() {
                    self.toast(Toast::new(ToastLevel::Info, "Settings saved", ""));
                }
            }
            GatewayEvent::StreakRefreshed(streak) => {
                self.streak.apply_authoritative(streak);
                info!(event = "streak_refreshed", streak);
            }
            GatewayEvent::Failed { op, error } => {
                warn!(event = "gateway_write_failed", op = %op, kind = error.kind(), error = %error);
                let title = match op {
                    GatewayOp::Streak => "Couldn't refresh streak".to_string(),
                    _ => format!("Couldn't save {op}"),
                };
                self.toast(Toast::new(ToastLevel::Error, title, error.to_string()));
            }
        }
    }

    fn dispatch<F>(&mut self, op: GatewayOp, work: F)
    where
        F: Future<Output = Result<GatewayEvent>> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        self.tasks.spawn(async move {
            let event = work
                .await
                .unwrap_or_else(|error| GatewayEvent::Failed { op, error });
            let _ = tx.send(event);
        });
    }

    fn toast(&mut self, toast: Toast) {
        self.notifier.notify(&toast);
        self.last_toast = Some(toast);
    }

    /// Teardown: cancels the tick, waits (up to [`SHUTDOWN_GRACE`]) for
    /// outstanding writes, writes anything still queued and releases the
    /// audio channel.
    pub async fn shutdown(mut self) {
        self.ticker.disarm();

        let gateway = self.gateway.clone();
        let settings = self.settings_pending.take();
        let pref = self.audio_writes.flush();
        let tasks = &mut self.tasks;
        let drain = async move {
            while tasks.join_next().await.is_some() {}
            if let Some(settings) = settings {
                if let Err(err) = gateway.update_settings(&settings).await {
                    warn!(event = "settings_flush_failed", error = %err);
                }
            }
            if let Some(pref) = pref {
                if let Err(err) = gateway.update_audio_preference(&pref).await {
                    warn!(event = "audio_preference_flush_failed", error = %err);
                }
            }
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
            warn!(event = "shutdown_writes_abandoned", pending = self.tasks.len());
        }

        self.audio.shutdown();
        info!(event = "coordinator_shutdown", streak = self.streak.current_streak());
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
