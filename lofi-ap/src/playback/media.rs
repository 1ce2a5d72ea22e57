//! Host media abstraction
//!
//! The crossfade engine never touches samples. It drives two host-provided
//! playback units through [`MediaElement`], the same way a page script drives
//! two `<audio>` tags: set a source, play, pause, move the playhead, set the
//! gain. [`AudioHost`] creates those units and owns the process-wide audio
//! resources (analysis bus, alarm synthesis).
//!
//! The native host lives in [`crate::audio`]; a deterministic host for tests
//! and dry runs lives in [`crate::playback::simulated`].

use std::fmt;
use thiserror::Error;

/// Opaque media reference (local path or `file://` URL)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaRef(String);

impl MediaRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors reported by a media element
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediaError {
    /// Source could not be fetched or decoded
    #[error("failed to load {media}: {reason}")]
    LoadFailed { media: String, reason: String },

    /// Host refused to start playback (output suspended, autoplay policy)
    #[error("playback rejected by host: {0}")]
    PlaybackRejected(String),

    /// Reference names something this host cannot fetch
    #[error("unsupported media reference: {0}")]
    Unsupported(String),
}

/// One host playback unit
///
/// Times are in seconds. Gains are linear in `0.0..=1.0`.
pub trait MediaElement {
    /// Currently assigned media, if any
    fn media(&self) -> Option<MediaRef>;

    /// Replace the media. On success the element is paused at position 0;
    /// on failure the previous media stays assigned.
    fn set_source(&mut self, media: &MediaRef) -> Result<(), MediaError>;

    /// Start or continue playback. May be rejected by the host.
    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// Playhead reached the end of the media
    fn ended(&self) -> bool;

    fn current_time(&self) -> f64;

    /// Move the playhead; clamped to the media duration
    fn set_current_time(&mut self, seconds: f64);

    /// Media duration, `None` while nothing is loaded
    fn duration(&self) -> Option<f64>;

    fn volume(&self) -> f32;

    fn set_volume(&mut self, volume: f32);
}

/// State of the shared frequency analysis bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusState {
    /// No source has ever been connected; the caller should substitute zeros
    Uninitialized,
    /// Context suspended by the host; the snapshot holds the last values
    Suspended,
    Running,
}

/// Process-wide audio resources shared by every player
pub trait AudioHost {
    type Element: MediaElement;

    /// Allocate a playback unit
    fn create_element(&mut self) -> Self::Element;

    /// Route an element into the analysis bus. Connecting the same element
    /// twice is a no-op.
    fn connect_analysis(&mut self, element: &Self::Element);

    /// Unblock a suspended audio context. Safe to call redundantly.
    fn resume(&mut self);

    /// Fill `buffer` with the latest frequency magnitudes
    fn fill_snapshot(&mut self, buffer: &mut [u8]) -> BusState;

    /// Fire-and-forget timer completion chime
    fn play_alarm(&mut self);
}
