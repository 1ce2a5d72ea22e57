//! Event types and EventBus for the lofi engine
//!
//! Events are broadcast via [`EventBus`] and serialized for the host's event
//! stream. Timestamps are attached by [`EventEnvelope`] at the edge, so the
//! engine itself stays clock-free.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::catalog::TrackId;
use crate::shared_types::{LoopMode, PlaylistFilter, TimerMode, VisualizerStyle};

/// Playback state of one player instance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Why the current track changed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackChangeReason {
    Selected,
    Next,
    Previous,
    Ended,
    FilterChanged,
}

/// Engine event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// Player started or stopped producing sound
    PlaybackStateChanged {
        /// `"music"` or `"ambient:<key>"`
        source: String,
        old_state: PlaybackState,
        new_state: PlaybackState,
    },

    /// A different track became current
    TrackChanged {
        track_id: TrackId,
        title: String,
        reason: TrackChangeReason,
    },

    /// `prev` rewound the current track instead of skipping
    TrackRestarted { track_id: TrackId },

    /// Current track reached its end with looping off
    TrackEnded { track_id: TrackId },

    CrossfadeStarted { source: String },

    CrossfadeCompleted { source: String },

    /// Queue was replaced wholesale
    QueueReplaced {
        filter: Option<PlaylistFilter>,
        length: usize,
    },

    LoopModeChanged { mode: LoopMode },

    ShuffleChanged { enabled: bool },

    FavoriteToggled { track_id: TrackId, favorite: bool },

    AmbientToggled { key: String, enabled: bool },

    VolumeChanged { source: String, volume: f32 },

    VisualizerConfigured { style: VisualizerStyle, sensitivity: f32 },

    /// Media could not be loaded; the slot kept its previous content
    MediaLoadFailed {
        source: String,
        media: String,
        reason: String,
    },

    /// Watchdog restarted a paused or stalled player
    WatchdogNudge { source: String },

    AlarmTriggered,

    TimerTick { mode: TimerMode, remaining_secs: u32 },

    TimerCompleted { mode: TimerMode },

    TimerCooldown { remaining_secs: u32 },

    TimerModeStarted { mode: TimerMode, duration_secs: u32 },

    /// Reply to a status request
    Status(StatusReport),

    /// A command could not be applied
    CommandRejected { reason: String },
}

/// Point-in-time view of the engine for UI collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub music_state: PlaybackState,
    pub track_id: Option<TrackId>,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
    pub volume: f32,
    pub loop_mode: LoopMode,
    pub shuffle: bool,
    pub queue_length: usize,
    pub ambient_enabled: Vec<String>,
    pub ambient_volume: f32,
    pub timer_mode: TimerMode,
    pub timer_remaining_secs: u32,
    pub timer_running: bool,
}

/// Event with the wall-clock time it left the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    pub event: EngineEvent,
}

impl EventEnvelope {
    pub fn now(event: EngineEvent) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            event,
        }
    }
}

/// Broadcast channel for engine events
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use lofi_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: EngineEvent,
    ) -> Result<usize, broadcast::error::SendError<EngineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
