//! # Lofi Common Library
//!
//! Shared code for the lofi audio engine crates:
//! - Error type
//! - Configuration loading
//! - Media catalog and mode types
//! - Engine events and EventBus
//! - Time formatting helpers

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod shared_types;

pub use catalog::{AmbientSound, Track, TrackId};
pub use config::Settings;
pub use error::{Error, Result};
pub use shared_types::{LoopMode, PlaylistFilter, TimerMode, VisualizerStyle};
