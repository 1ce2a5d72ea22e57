//! Playback: media abstraction, crossfade players, queue and engine facade

pub mod ambient;
pub mod crossfade;
pub mod engine;
pub mod library;
pub mod media;
pub mod monitor;
pub mod music;
pub mod sequencer;
pub mod simulated;
pub mod slot;

pub use crossfade::{CrossfadeConfig, CrossfadeEngine};
pub use engine::PlaybackEngine;
pub use media::{AudioHost, MediaElement, MediaError, MediaRef};
pub use monitor::{run, DriverConfig, StopReason};
pub use sequencer::Sequencer;
pub use simulated::{SimulatedHost, SimulatedMedia};
