//! Native audio host
//!
//! Decoding, resampling, mixing and device output for the playback engine,
//! plus the frequency analysis bus and the alarm synthesizer.

pub mod alarm;
pub mod analysis;
pub mod clip_cache;
pub mod decode;
pub mod mixer;
pub mod output;
pub mod resampler;
pub mod subsystem;
pub mod types;
pub mod voice;

pub use subsystem::AudioSubsystem;
pub use types::{AudioFrame, DecodedClip};
pub use voice::MixerVoice;
