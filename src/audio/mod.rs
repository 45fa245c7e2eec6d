//! Ambient sound: one looping channel playing a built-in or uploaded track,
//! independent of the countdown.

mod channel;

pub use channel::{AudioChannel, NullChannel, SinkChannel, decode};

use crate::error::{FocusError, Result};
use crate::gateway::AudioPreference;
use mime_guess::mime;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct BuiltinTrack {
    pub id: &'static str,
    pub name: &'static str,
}

pub const BUILTIN_TRACKS: [BuiltinTrack; 5] = [
    BuiltinTrack { id: "rain", name: "🌧 Rain" },
    BuiltinTrack { id: "forest", name: "🌲 Forest" },
    BuiltinTrack { id: "cafe", name: "☕ Café" },
    BuiltinTrack { id: "ocean", name: "🌊 Ocean" },
    BuiltinTrack { id: "white-noise", name: "📻 White Noise" },
];

const BUILTIN_EXTENSIONS: [&str; 3] = ["wav", "ogg", "oga"];

/// Something the channel can be pointed at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayableHandle {
    File(PathBuf),
}

/// A user-uploaded track. Lives only as long as the process; never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomAudioAsset {
    pub id: String,
    pub display_name: String,
    pub handle: PlayableHandle,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioState {
    Idle,
    Playing(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioTransition {
    Stopped,
    Playing(String),
}

pub struct AmbientAudio {
    channel: Box<dyn AudioChannel>,
    sounds_dir: PathBuf,
    uploads: Vec<CustomAudioAsset>,
    state: AudioState,
    preference: AudioPreference,
}

impl AmbientAudio {
    pub fn new(
        channel: Box<dyn AudioChannel>,
        sounds_dir: impl Into<PathBuf>,
        preference: AudioPreference,
    ) -> Self {
        Self {
            channel,
            sounds_dir: sounds_dir.into(),
            uploads: Vec::new(),
            state: AudioState::Idle,
            preference: preference.sanitized(),
        }
    }

    pub fn state(&self) -> &AudioState {
        &self.state
    }

    pub fn preference(&self) -> &AudioPreference {
        &self.preference
    }

    pub fn uploads(&self) -> &[CustomAudioAsset] {
        &self.uploads
    }

    pub fn playing_track(&self) -> Option<&str> {
        match &self.state {
            AudioState::Playing(id) => Some(id),
            AudioState::Idle => None,
        }
    }

    pub fn track_name(&self, id: &str) -> Option<String> {
        if let Some(track) = BUILTIN_TRACKS.iter().find(|t| t.id == id) {
            return Some(track.name.to_string());
        }
        self.uploads
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.display_name.clone())
    }

    fn resolve(&self, id: &str) -> Result<PlayableHandle> {
        if let Some(asset) = self.uploads.iter().find(|a| a.id == id) {
            return Ok(asset.handle.clone());
        }
        if BUILTIN_TRACKS.iter().any(|t| t.id == id) {
            return BUILTIN_EXTENSIONS
                .iter()
                .map(|ext| self.sounds_dir.join(format!("{id}.{ext}")))
                .find(|path| path.is_file())
                .map(PlayableHandle::File)
                .ok_or_else(|| {
                    FocusError::Playback(format!(
                        "no audio file for `{id}` in {}",
                        self.sounds_dir.display()
                    ))
                });
        }
        Err(FocusError::Playback(format!("unknown track `{id}`")))
    }

    /// Plays `id`, or stops if `id` is what is already playing. On failure
    /// the channel is left idle.
    pub fn select_track(&mut self, id: &str) -> Result<AudioTransition> {
        if self.playing_track() == Some(id) {
            self.channel.stop();
            self.state = AudioState::Idle;
            self.preference.selected_track_id = None;
            info!(event = "ambient_stopped", track = id);
            return Ok(AudioTransition::Stopped);
        }

        self.channel.stop();
        self.state = AudioState::Idle;

        let played = self.resolve(id).and_then(|handle| match handle {
            PlayableHandle::File(path) => {
                self.channel
                    .play(&path, self.preference.volume, self.preference.looping)
            }
        });
        match played {
            Ok(()) => {
                self.state = AudioState::Playing(id.to_string());
                self.preference.selected_track_id = Some(id.to_string());
                info!(event = "ambient_playing", track = id);
                Ok(AudioTransition::Playing(id.to_string()))
            }
            Err(err) => {
                self.preference.selected_track_id = None;
                warn!(event = "ambient_playback_failed", track = id, error = %err);
                Err(err)
            }
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        let volume = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 0.0 };
        self.preference.volume = volume;
        if matches!(self.state, AudioState::Playing(_)) {
            self.channel.set_volume(volume);
        }
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.preference.looping = looping;
        if matches!(self.state, AudioState::Playing(_)) {
            self.channel.set_looping(looping);
        }
    }

    /// Registers a user file as a session-local track and starts playing it.
    pub fn register_upload(&mut self, path: &Path) -> Result<AudioTransition> {
        let guessed = mime_guess::from_path(path).first();
        match &guessed {
            Some(m) if m.type_() == mime::AUDIO => {}
            _ => {
                let found = guessed
                    .map(|m| m.essence_str().to_string())
                    .unwrap_or_else(|| "unknown".into());
                return Err(FocusError::Validation(format!(
                    "{} is not an audio file ({found})",
                    path.display()
                )));
            }
        }

        if !path.is_file() {
            return Err(FocusError::Playback(format!("missing audio file {}", path.display())));
        }

        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".into());
        let asset = CustomAudioAsset {
            id: format!("upload-{}", uuid::Uuid::new_v4().simple()),
            display_name,
            handle: PlayableHandle::File(path.to_path_buf()),
        };
        let id = asset.id.clone();
        info!(event = "upload_registered", id = %id, name = %asset.display_name);
        self.uploads.push(asset);
        let result = self.select_track(&id);
        if result.is_err() {
            self.uploads.retain(|a| a.id != id);
        }
        result
    }

    /// Resumes the persisted track on startup. Failures (including an id left
    /// over from an upload of a previous run) leave the channel idle.
    pub fn restore(&mut self, sound_enabled: bool) -> Option<FocusError> {
        let id = self.preference.selected_track_id.clone()?;
        if !sound_enabled {
            return None;
        }
        self.select_track(&id).err()
    }

    /// Notices a non-looping track that finished by itself.
    pub fn poll(&mut self) -> bool {
        if matches!(self.state, AudioState::Playing(_)) && !self.channel.poll() {
            self.state = AudioState::Idle;
            self.preference.selected_track_id = None;
            return true;
        }
        false
    }

    /// Releases the channel on teardown; the preference is kept for the next
    /// start.
    pub fn shutdown(&mut self) {
        self.channel.stop();
        self.state = AudioState::Idle;
    }
}
