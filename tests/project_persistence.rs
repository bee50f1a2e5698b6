//! Song settings persistence
//!
//! Saves transport settings to disk in both formats and restores them into a
//! fresh transport.

use song_transport::project::{load_settings, save_settings};
use song_transport::sync::HostSync;
use song_transport::{
    LoopController, LoopSettings, PlayMode, ProjectError, SongSettings, SongTransport,
    StopBehavior, TimeSignature,
};

fn transport() -> SongTransport {
    let mut transport = SongTransport::new(48000, 512, HostSync::private(48000, 512));
    transport.attach_timeline(PlayMode::PlaySong, LoopController::new(192));
    transport
}

fn customised() -> SongTransport {
    let mut transport = transport();
    transport.set_tempo(96);
    transport.set_time_signature(3, 4);
    transport.set_master_volume(150);
    transport.set_master_pitch(-5);
    if let Some(timeline) = transport.timeline_mut(PlayMode::PlaySong) {
        timeline.set_loop_points(144, 576);
        timeline.set_loop_points_enabled(true);
        timeline.set_stop_behavior(StopBehavior::KeepPosition);
    }
    transport
}

#[test]
fn test_settings_survive_ron_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song.ron");

    let original = customised();
    save_settings(&path, &original.settings()).unwrap();

    let mut restored = transport();
    restored.apply_settings(&load_settings(&path).unwrap());

    assert_eq!(restored.tempo().bpm(), 96);
    assert_eq!(restored.time_signature(), TimeSignature::three_four());
    assert_eq!(restored.ticks_per_tact(), 144);
    assert_eq!(restored.master_volume(), 150);
    assert_eq!(restored.master_pitch(), -5);

    let timeline = restored.timeline(PlayMode::PlaySong).unwrap();
    assert_eq!(timeline.loop_begin(), 144);
    assert_eq!(timeline.loop_end(), 576);
    assert!(timeline.loop_points_enabled());
    assert_eq!(timeline.stop_behavior(), StopBehavior::KeepPosition);
}

#[test]
fn test_settings_survive_json_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song.json");

    let settings = customised().settings();
    save_settings(&path, &settings).unwrap();
    assert_eq!(load_settings(&path).unwrap(), settings);
}

#[test]
fn test_loading_without_loop_disables_loop_points() {
    let mut transport = customised();
    transport.apply_settings(&SongSettings::default());

    assert_eq!(transport.tempo().bpm(), 140);
    assert!(
        !transport
            .timeline(PlayMode::PlaySong)
            .unwrap()
            .loop_points_enabled()
    );
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ron");
    std::fs::write(&path, "(bpm: 2000)").unwrap();
    assert!(matches!(
        load_settings(&path),
        Err(ProjectError::InvalidStructure(_))
    ));

    std::fs::write(&path, "(bpm: ").unwrap();
    assert!(matches!(load_settings(&path), Err(ProjectError::Ron(_))));

    assert!(matches!(
        load_settings(&dir.path().join("missing.ron")),
        Err(ProjectError::Io(_))
    ));
}

#[test]
fn test_invalid_settings_are_not_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("song.ron");
    let settings = SongSettings {
        loop_points: Some(LoopSettings {
            begin: -10,
            end: 20,
            enabled: true,
            stop_behavior: StopBehavior::ReturnToZero,
        }),
        ..SongSettings::default()
    };
    assert!(save_settings(&path, &settings).is_err());
    assert!(!path.exists());
}
