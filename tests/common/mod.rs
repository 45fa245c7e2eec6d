#![allow(dead_code)]

use async_trait::async_trait;
use rfocus::audio::AudioChannel;
use rfocus::gateway::{
    AudioPreference, Capabilities, PersistenceGateway, REQUIRED_COLLECTIONS, RemoteStore,
    SessionRecord, StreakRecord,
};
use rfocus::settings::{SessionSettings, SettingsOverrides};
use rfocus::signal::{Chime, Notifier, Toast};
use rfocus::{CoordinatorParts, FocusCoordinator, FocusError, Result};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Remote store fake
// ============================================================================

#[derive(Default)]
pub struct RemoteLog {
    pub settings: Option<SessionSettings>,
    pub settings_writes: Vec<SessionSettings>,
    /// Per-call latency of `store_settings`, consumed front to back.
    pub settings_delays: Vec<Duration>,
    pub streak: u32,
    pub sessions: Vec<SessionRecord>,
    pub audio: Option<AudioPreference>,
    pub audio_writes: Vec<AudioPreference>,
    pub fail_probe: bool,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

pub struct FakeRemote(pub Arc<Mutex<RemoteLog>>);

impl FakeRemote {
    fn read_guard(&self) -> Result<std::sync::MutexGuard<'_, RemoteLog>> {
        let log = self.0.lock().unwrap();
        if log.fail_reads {
            return Err(FocusError::Connection("read timed out".into()));
        }
        Ok(log)
    }

    fn write_guard(&self) -> Result<std::sync::MutexGuard<'_, RemoteLog>> {
        let log = self.0.lock().unwrap();
        if log.fail_writes {
            return Err(FocusError::Connection("write refused".into()));
        }
        Ok(log)
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn capabilities(&self) -> Result<Capabilities> {
        if self.0.lock().unwrap().fail_probe {
            return Err(FocusError::Connection("unreachable".into()));
        }
        Ok(Capabilities {
            authenticated: true,
            collections: REQUIRED_COLLECTIONS.iter().map(|c| c.to_string()).collect(),
        })
    }

    async fn fetch_settings(&self) -> Result<Option<SessionSettings>> {
        Ok(self.read_guard()?.settings.clone())
    }

    async fn store_settings(&self, settings: &SessionSettings) -> Result<()> {
        let delay = {
            let mut log = self.0.lock().unwrap();
            if log.settings_delays.is_empty() {
                Duration::ZERO
            } else {
                log.settings_delays.remove(0)
            }
        };
        tokio::time::sleep(delay).await;
        let mut log = self.write_guard()?;
        log.settings = Some(settings.clone());
        log.settings_writes.push(settings.clone());
        Ok(())
    }

    async fn fetch_streak(&self) -> Result<StreakRecord> {
        Ok(StreakRecord {
            current_streak: self.read_guard()?.streak,
        })
    }

    async fn insert_session(&self, record: &SessionRecord) -> Result<()> {
        let mut log = self.write_guard()?;
        log.sessions.push(record.clone());
        log.streak += 1;
        Ok(())
    }

    async fn fetch_audio_preference(&self) -> Result<Option<AudioPreference>> {
        Ok(self.read_guard()?.audio.clone())
    }

    async fn store_audio_preference(&self, pref: &AudioPreference) -> Result<()> {
        let mut log = self.write_guard()?;
        log.audio = Some(pref.clone());
        log.audio_writes.push(pref.clone());
        Ok(())
    }
}

// ============================================================================
// Audio, chime and toast fakes
// ============================================================================

#[derive(Default)]
pub struct ChannelLog {
    pub active: u32,
    pub max_active: u32,
    pub plays: Vec<String>,
    pub stops: u32,
}

pub struct RecordingChannel(pub Arc<Mutex<ChannelLog>>);

impl AudioChannel for RecordingChannel {
    fn play(&mut self, source: &Path, _volume: f32, _looping: bool) -> Result<()> {
        let mut log = self.0.lock().unwrap();
        log.active += 1;
        log.max_active = log.max_active.max(log.active);
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        log.plays.push(stem);
        Ok(())
    }

    fn stop(&mut self) {
        let mut log = self.0.lock().unwrap();
        log.active = 0;
        log.stops += 1;
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn set_looping(&mut self, _looping: bool) {}

    fn poll(&mut self) -> bool {
        self.0.lock().unwrap().active > 0
    }
}

pub struct CountingChime(pub Arc<AtomicU32>);

impl Chime for CountingChime {
    fn ring(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct RecordingNotifier(pub Arc<Mutex<Vec<Toast>>>);

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: &Toast) {
        self.0.lock().unwrap().push(toast.clone());
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub coordinator: FocusCoordinator,
    pub remote: Arc<Mutex<RemoteLog>>,
    pub channel: Arc<Mutex<ChannelLog>>,
    pub toasts: Arc<Mutex<Vec<Toast>>>,
    pub chimes: Arc<AtomicU32>,
    pub sounds: TempDir,
}

impl Harness {
    pub fn chimes(&self) -> u32 {
        self.chimes.load(Ordering::SeqCst)
    }

    pub fn toast_titles(&self) -> Vec<String> {
        self.toasts.lock().unwrap().iter().map(|t| t.title.clone()).collect()
    }
}

pub async fn live(log: RemoteLog) -> Harness {
    build(log, false, SettingsOverrides::default()).await
}

pub async fn demo() -> Harness {
    build(RemoteLog::default(), true, SettingsOverrides::default()).await
}

pub async fn demo_with(overrides: SettingsOverrides) -> Harness {
    build(RemoteLog::default(), true, overrides).await
}

async fn build(log: RemoteLog, demo: bool, overrides: SettingsOverrides) -> Harness {
    let remote = Arc::new(Mutex::new(log));
    let store: Option<Arc<dyn RemoteStore>> = if demo {
        None
    } else {
        Some(Arc::new(FakeRemote(remote.clone())))
    };
    let gateway = PersistenceGateway::probe(store).await;

    let sounds = tempfile::tempdir().unwrap();
    for id in ["rain", "forest"] {
        std::fs::write(sounds.path().join(format!("{id}.wav")), b"RIFF").unwrap();
    }

    let channel = Arc::new(Mutex::new(ChannelLog::default()));
    let toasts = Arc::new(Mutex::new(Vec::new()));
    let chimes = Arc::new(AtomicU32::new(0));
    let coordinator = FocusCoordinator::bootstrap(CoordinatorParts {
        gateway,
        channel: Box::new(RecordingChannel(channel.clone())),
        chime: Box::new(CountingChime(chimes.clone())),
        notifier: Arc::new(RecordingNotifier(toasts.clone())),
        sounds_dir: sounds.path().to_path_buf(),
        overrides,
    })
    .await;

    Harness {
        coordinator,
        remote,
        channel,
        toasts,
        chimes,
        sounds,
    }
}

/// Starts the current interval and ticks it through completion.
pub fn run_out(coordinator: &mut FocusCoordinator) {
    coordinator.start();
    let remaining = coordinator.snapshot().seconds_remaining;
    for _ in 0..=remaining {
        coordinator.tick();
    }
}
