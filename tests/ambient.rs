mod common;

use common::{RemoteLog, demo, live};
use rfocus::audio::{AudioState, AudioTransition};
use rfocus::gateway::AudioPreference;
use rfocus::settings::SessionSettings;
use rfocus::{FocusError, GatewayEvent, GatewayOp, Wakeup};
use std::path::Path;

#[tokio::test]
async fn selecting_playing_track_again_turns_it_off() {
    let mut h = demo().await;
    let c = &mut h.coordinator;
    assert_eq!(
        c.select_ambient_track("rain").unwrap(),
        AudioTransition::Playing("rain".into())
    );
    assert_eq!(c.select_ambient_track("rain").unwrap(), AudioTransition::Stopped);
    assert_eq!(c.snapshot().audio, AudioState::Idle);
    assert_eq!(h.channel.lock().unwrap().active, 0);
}

#[tokio::test]
async fn switching_tracks_replaces_without_overlap() {
    let mut h = demo().await;
    let c = &mut h.coordinator;
    c.select_ambient_track("rain").unwrap();
    c.select_ambient_track("forest").unwrap();

    let snap = c.snapshot();
    assert_eq!(snap.audio, AudioState::Playing("forest".into()));
    assert_eq!(snap.audio_track_name.as_deref(), Some("🌲 Forest"));

    let channel = h.channel.lock().unwrap();
    assert_eq!(channel.plays, vec!["rain", "forest"]);
    assert_eq!(channel.max_active, 1);
    assert_eq!(channel.active, 1);
}

#[tokio::test]
async fn missing_asset_is_a_recoverable_warning() {
    let mut h = demo().await;
    let c = &mut h.coordinator;
    c.select_ambient_track("rain").unwrap();
    let err = c.select_ambient_track("ocean").unwrap_err();
    assert!(matches!(err, FocusError::Playback(_)));
    assert_eq!(c.snapshot().audio, AudioState::Idle);

    // the coordinator keeps working
    c.start();
    c.tick();
    assert_eq!(c.snapshot().seconds_remaining, 25 * 60 - 1);
    assert_eq!(h.toast_titles(), vec!["Couldn't play sound"]);
}

#[tokio::test]
async fn non_audio_upload_is_rejected_without_state_change() {
    let mut h = demo().await;
    let c = &mut h.coordinator;
    c.select_ambient_track("rain").unwrap();

    let err = c.register_upload(Path::new("/tmp/slides.pdf")).unwrap_err();
    assert!(matches!(err, FocusError::Validation(_)));
    assert_eq!(c.snapshot().audio, AudioState::Playing("rain".into()));
    assert_eq!(h.toast_titles(), vec!["Upload rejected"]);
}

#[tokio::test]
async fn audio_upload_plays_immediately() {
    let mut h = demo().await;
    let path = h.sounds.path().join("brown-noise.ogg");
    std::fs::write(&path, b"OggS").unwrap();

    let c = &mut h.coordinator;
    let transition = c.register_upload(&path).unwrap();
    let AudioTransition::Playing(id) = transition else {
        panic!("upload did not start playback");
    };
    assert!(id.starts_with("upload-"));
    assert_eq!(c.snapshot().audio_track_name.as_deref(), Some("brown-noise.ogg"));
}

#[tokio::test]
async fn persisted_track_resumes_on_startup() {
    let h = live(RemoteLog {
        audio: Some(AudioPreference {
            selected_track_id: Some("forest".into()),
            volume: 0.8,
            looping: true,
        }),
        ..RemoteLog::default()
    })
    .await;
    let snap = h.coordinator.snapshot();
    assert_eq!(snap.audio, AudioState::Playing("forest".into()));
    assert_eq!(snap.volume, 0.8);
}

#[tokio::test]
async fn muted_user_gets_no_autoplay() {
    let h = live(RemoteLog {
        settings: Some(SessionSettings {
            sound_enabled: false,
            ..SessionSettings::default()
        }),
        audio: Some(AudioPreference {
            selected_track_id: Some("rain".into()),
            ..AudioPreference::default()
        }),
        ..RemoteLog::default()
    })
    .await;
    assert_eq!(h.coordinator.snapshot().audio, AudioState::Idle);
    assert!(h.channel.lock().unwrap().plays.is_empty());
}

#[tokio::test]
async fn stale_upload_id_fails_soft_on_startup() {
    let h = live(RemoteLog {
        audio: Some(AudioPreference {
            selected_track_id: Some("upload-6f1c".into()),
            ..AudioPreference::default()
        }),
        ..RemoteLog::default()
    })
    .await;
    let snap = h.coordinator.snapshot();
    assert_eq!(snap.audio, AudioState::Idle);
    assert_eq!(snap.seconds_remaining, 25 * 60);
    assert_eq!(h.toast_titles(), vec!["Started with defaults"]);
}

#[tokio::test]
async fn selection_is_persisted_after_quiet_period() {
    let mut h = live(RemoteLog::default()).await;
    let c = &mut h.coordinator;
    c.select_ambient_track("rain").unwrap();
    c.set_volume(0.25);

    let wakeup = c.next_wakeup().await;
    assert_eq!(wakeup, Wakeup::FlushAudio);
    c.handle(wakeup);
    assert_eq!(
        c.next_wakeup().await,
        Wakeup::Gateway(GatewayEvent::Saved(GatewayOp::AudioPreference))
    );

    let remote = h.remote.lock().unwrap();
    assert_eq!(remote.audio_writes.len(), 1);
    assert_eq!(remote.audio_writes[0].selected_track_id.as_deref(), Some("rain"));
    assert_eq!(remote.audio_writes[0].volume, 0.25);
}
