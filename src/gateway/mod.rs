//! Persistence for settings, streak, completed sessions and audio
//! preferences.
//!
//! The backend is chosen exactly once at startup by [`PersistenceGateway::probe`]:
//! either the remote store ([`PersistenceGateway::Live`]) or an in-memory
//! stand-in ([`PersistenceGateway::Demo`]). The choice is sticky for the
//! lifetime of the process; a failing remote after startup is reported to the
//! user but never triggers a switch.

mod demo;
mod remote;

pub use demo::DemoGateway;
pub use remote::{HttpRemoteStore, RemoteStore};

use crate::error::{FocusError, Result};
use crate::session::Mode;
use crate::settings::SessionSettings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub const REQUIRED_COLLECTIONS: [&str; 4] = [
    "focus_settings",
    "focus_streaks",
    "focus_sessions",
    "audio_preferences",
];

// ============================================================================
// Records
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreakRecord {
    pub current_streak: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub duration_minutes: u32,
    pub mode: Mode,
    pub energy_level: Option<u8>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AudioPreference {
    pub selected_track_id: Option<String>,
    pub volume: f32,
    pub looping: bool,
}

impl Default for AudioPreference {
    fn default() -> Self {
        Self {
            selected_track_id: None,
            volume: 0.5,
            looping: true,
        }
    }
}

impl AudioPreference {
    pub fn sanitized(mut self) -> Self {
        self.volume = if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            Self::default().volume
        };
        self
    }
}

/// Answer of the remote capability endpoint.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Capabilities {
    pub authenticated: bool,
    pub collections: Vec<String>,
}

impl Capabilities {
    /// Fails unless the session is authenticated and every required
    /// collection exists.
    pub fn check(&self) -> Result<()> {
        if !self.authenticated {
            return Err(FocusError::Auth("no valid session".into()));
        }
        let missing: Vec<String> = REQUIRED_COLLECTIONS
            .iter()
            .filter(|c| !self.collections.iter().any(|have| have == *c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(FocusError::MissingSchema(missing));
        }
        Ok(())
    }
}

// ============================================================================
// Gateway
// ============================================================================

pub enum PersistenceGateway {
    Live(Arc<dyn RemoteStore>),
    Demo(DemoGateway),
}

impl PersistenceGateway {
    pub fn demo() -> Self {
        Self::Demo(DemoGateway::new())
    }

    /// Runs the one-time capability probe. Any failure lands in demo mode.
    pub async fn probe(store: Option<Arc<dyn RemoteStore>>) -> Self {
        let Some(store) = store else {
            info!(event = "gateway_selected", mode = "demo", reason = "no_remote_configured");
            return Self::demo();
        };

        match store.capabilities().await.and_then(|caps| caps.check()) {
            Ok(()) => {
                info!(event = "gateway_selected", mode = "live");
                Self::Live(store)
            }
            Err(err) => {
                warn!(
                    event = "gateway_selected",
                    mode = "demo",
                    reason = err.kind(),
                    error = %err
                );
                Self::demo()
            }
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, Self::Demo(_))
    }

    pub async fn get_settings(&self) -> Result<SessionSettings> {
        match self {
            Self::Live(store) => Ok(store
                .fetch_settings()
                .await?
                .map(SessionSettings::sanitized)
                .unwrap_or_default()),
            Self::Demo(demo) => Ok(demo.settings()),
        }
    }

    pub async fn update_settings(&self, settings: &SessionSettings) -> Result<()> {
        match self {
            Self::Live(store) => store.store_settings(settings).await,
            Self::Demo(demo) => {
                demo.set_settings(settings.clone());
                Ok(())
            }
        }
    }

    pub async fn get_streak(&self) -> Result<u32> {
        match self {
            Self::Live(store) => Ok(store.fetch_streak().await?.current_streak),
            Self::Demo(demo) => Ok(demo.streak()),
        }
    }

    pub async fn record_session(&self, record: &SessionRecord) -> Result<()> {
        match self {
            Self::Live(store) => store.insert_session(record).await,
            Self::Demo(demo) => {
                demo.skip_session(record);
                Ok(())
            }
        }
    }

    pub async fn get_audio_preference(&self) -> Result<AudioPreference> {
        match self {
            Self::Live(store) => Ok(store
                .fetch_audio_preference()
                .await?
                .map(AudioPreference::sanitized)
                .unwrap_or_default()),
            Self::Demo(demo) => Ok(demo.audio_preference()),
        }
    }

    pub async fn update_audio_preference(&self, pref: &AudioPreference) -> Result<()> {
        match self {
            Self::Live(store) => store.store_audio_preference(pref).await,
            Self::Demo(demo) => {
                demo.set_audio_preference(pref.clone());
                Ok(())
            }
        }
    }
}
