//! # Lofi Audio Engine Library (lofi-ap)
//!
//! Playback core of the lofi focus companion.
//!
//! **Purpose:** Play a music queue and any number of ambient loops, each
//! through a pair of host media elements that crossfade into one another;
//! expose a shared frequency analysis bus for the visualizer; synthesize the
//! timer's completion chime.
//!
//! **Architecture:** A single-threaded, poll-driven engine over the
//! [`playback::AudioHost`] abstraction. The native host in [`audio`] decodes
//! with symphonia, resamples with rubato and plays through cpal; the
//! simulated host in [`playback::simulated`] makes every timing path
//! deterministic.

pub mod audio;
pub mod config;
pub mod control;
pub mod error;
pub mod playback;
pub mod timer;
pub mod visualizer;

pub use error::{Error, Result};
pub use playback::PlaybackEngine;
