//! Shared fixtures for lofi-ap integration tests
//!
//! - `audio_generator`: WAV files for the native host
//! - engine builders and a fixed-step clock for the simulated host

#![allow(dead_code)]

pub mod audio_generator;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use lofi_ap::playback::{PlaybackEngine, Sequencer, SimulatedHost};
use lofi_common::events::EngineEvent;
use lofi_common::{Settings, Track, TrackId};
use tokio::sync::broadcast;

pub use audio_generator::generate_sine_wav;

/// Simulation step
pub const STEP: Duration = Duration::from_millis(20);

/// Settings with `ids` as the whole library (`<id>.mp3`, relative paths)
pub fn settings_with_tracks(ids: &[&str]) -> Settings {
    Settings {
        media_root: PathBuf::new(),
        tracks: ids
            .iter()
            .map(|id| Track {
                id: TrackId::new(*id),
                title: format!("Track {}", id),
                artist: "Test".to_string(),
                url: format!("{}.mp3", id),
                category: Some(if id.ends_with('1') { "lofi" } else { "chill" }.to_string()),
            })
            .collect(),
        ..Settings::default()
    }
}

/// Engine over a simulated host where every track lasts `duration` seconds
pub fn engine_with_tracks(ids: &[&str], duration: f64) -> PlaybackEngine<SimulatedHost> {
    let settings = settings_with_tracks(ids);
    let mut host = SimulatedHost::new();
    for id in ids {
        host.set_duration(&format!("{}.mp3", id), duration);
    }
    PlaybackEngine::with_sequencer(&settings, host, Sequencer::with_seed(7))
}

/// Drives host time and engine polls in lockstep
pub struct Clock {
    now: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self { now: Instant::now() }
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    /// Advance by `seconds` in fixed steps, polling after each one
    pub fn run(&mut self, engine: &mut PlaybackEngine<SimulatedHost>, seconds: f64) {
        let steps = (seconds / STEP.as_secs_f64()).round() as usize;
        for _ in 0..steps {
            engine.host_mut().advance(STEP.as_secs_f64());
            self.now += STEP;
            engine.poll(self.now);
        }
    }
}

pub fn drain(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Track ids of `TrackChanged` events, in order
pub fn track_changes(events: &[EngineEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::TrackChanged { track_id, .. } => Some(track_id.to_string()),
            _ => None,
        })
        .collect()
}
