//! Native audio host: decoding, resampling and the headless output
//!
//! Fixtures are generated WAV files in a temp directory. The headless tests
//! run on paused tokio time so the render task advances deterministically.

mod helpers;

use std::time::Duration;

use helpers::{generate_sine_wav, settings_with_tracks};
use lofi_ap::audio::clip_cache::ClipCache;
use lofi_ap::audio::decode::decode_file;
use lofi_ap::audio::AudioSubsystem;
use lofi_ap::control::Command;
use lofi_ap::playback::{MediaRef, PlaybackEngine};
use lofi_common::Settings;
use tempfile::TempDir;

fn headless_settings(dir: &TempDir) -> Settings {
    let mut settings = settings_with_tracks(&["tone"]);
    settings.media_root = dir.path().to_path_buf();
    settings.output.headless = true;
    settings.output.headless_sample_rate = 8000;
    settings
}

#[test]
fn test_mono_wav_decodes_to_stereo() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mono.wav");
    generate_sine_wav(&path, 22050, 1, 1000, 440.0, 0.5).unwrap();

    let decoded = decode_file(&path).unwrap();
    assert_eq!(decoded.sample_rate, 22050);
    assert_eq!(decoded.samples.len(), 22050 * 2);
    for frame in decoded.samples.chunks(2).take(500) {
        assert_eq!(frame[0], frame[1]);
    }
    let peak = decoded.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert!((peak - 0.5).abs() < 0.01, "peak {}", peak);
}

#[test]
fn test_clip_cache_resamples_and_shares_clips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tone.wav");
    generate_sine_wav(&path, 48000, 2, 1000, 440.0, 0.5).unwrap();
    let media = MediaRef::new(path.to_string_lossy().into_owned());

    let mut cache = ClipCache::new(44100);
    let clip = cache.load(&media).unwrap();
    assert_eq!(clip.sample_rate, 44100);
    assert!((clip.duration_secs() - 1.0).abs() < 0.1, "duration {}", clip.duration_secs());

    let again = cache.load(&media).unwrap();
    assert!(std::sync::Arc::ptr_eq(&clip, &again));
    assert_eq!(cache.len(), 1);

    // Nothing holds the clip any more, so the next load evicts it
    drop(clip);
    drop(again);
    let missing = MediaRef::new(dir.path().join("missing.wav").to_string_lossy().into_owned());
    assert!(cache.load(&missing).is_err());
    assert!(cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_headless_engine_plays_in_real_time() {
    let dir = TempDir::new().unwrap();
    generate_sine_wav(dir.path().join("tone.wav"), 8000, 2, 3000, 440.0, 0.5).unwrap();
    let settings = {
        let mut s = headless_settings(&dir);
        s.tracks[0].url = "tone.wav".to_string();
        s
    };

    let host = AudioSubsystem::new(settings.output.clone(), &settings.analysis);
    let mut engine = PlaybackEngine::new(&settings, host);
    assert!(engine.host().is_headless());
    assert!(!engine.host().is_running());
    assert_eq!(engine.music().position().duration.map(|d| d.round()), Some(3.0));

    engine.handle(Command::Play);
    assert!(engine.host().is_running());
    tokio::time::sleep(Duration::from_millis(500)).await;

    let position = engine.music().position().current_time;
    assert!((0.3..=0.7).contains(&position), "position {}", position);

    let frame = engine.render_frame(1000.0).unwrap();
    assert!(!frame.silent);
}

#[tokio::test(start_paused = true)]
async fn test_headless_pause_freezes_position() {
    let dir = TempDir::new().unwrap();
    generate_sine_wav(dir.path().join("tone.wav"), 8000, 2, 3000, 440.0, 0.5).unwrap();
    let mut settings = headless_settings(&dir);
    settings.tracks[0].url = "tone.wav".to_string();

    let host = AudioSubsystem::new(settings.output.clone(), &settings.analysis);
    let mut engine = PlaybackEngine::new(&settings, host);

    engine.handle(Command::Play);
    tokio::time::sleep(Duration::from_millis(300)).await;
    engine.handle(Command::Pause);
    let paused_at = engine.music().position().current_time;
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(paused_at > 0.1);
    assert_eq!(engine.music().position().current_time, paused_at);
}

#[tokio::test(start_paused = true)]
async fn test_headless_alarm_works_without_media() {
    let dir = TempDir::new().unwrap();
    let settings = headless_settings(&dir);

    let host = AudioSubsystem::new(settings.output.clone(), &settings.analysis);
    // tone.mp3 does not exist; the engine still comes up
    let mut engine = PlaybackEngine::new(&settings, host);
    assert!(engine.music().engine().media().is_none());

    engine.handle(Command::Alarm);
    assert!(engine.host().is_running());
}
