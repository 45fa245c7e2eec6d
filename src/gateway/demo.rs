use super::{AudioPreference, SessionRecord};
use crate::settings::SessionSettings;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Default)]
struct DemoState {
    settings: SessionSettings,
    streak: u32,
    audio: AudioPreference,
}

/// In-memory gateway used when the remote store is unavailable.
///
/// Edits are kept for the lifetime of this instance only; a fresh instance
/// (a reload) starts from the built-in defaults again.
#[derive(Default)]
pub struct DemoGateway {
    state: Mutex<DemoState>,
}

impl DemoGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DemoState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(super) fn settings(&self) -> SessionSettings {
        self.lock().settings.clone()
    }

    pub(super) fn set_settings(&self, settings: SessionSettings) {
        self.lock().settings = settings;
    }

    pub(super) fn streak(&self) -> u32 {
        self.lock().streak
    }

    pub(super) fn skip_session(&self, record: &SessionRecord) {
        debug!(
            event = "session_record_skipped",
            mode = %record.mode,
            duration_minutes = record.duration_minutes
        );
    }

    pub(super) fn audio_preference(&self) -> AudioPreference {
        self.lock().audio.clone()
    }

    pub(super) fn set_audio_preference(&self, pref: AudioPreference) {
        self.lock().audio = pref;
    }
}
