//! Playback sequencer
//!
//! Owns the queue of track ids, the loop mode and the shuffle flag, and
//! decides what the music player loads next. The current track is tracked by
//! id rather than position, because a freshly filtered queue may not contain
//! it.

use lofi_common::{LoopMode, TrackId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Navigation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Outcome of a `prev` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviousAction {
    /// Rewind the current track to 0
    Restart,
    /// Switch to another track
    Switch(TrackId),
}

/// What to do when the current track ends on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndAction {
    /// Load and play this track
    Continue(TrackId),
    /// Stop without advancing
    Pause,
    /// Loop-one is handled by the crossfade player itself
    Repeat,
}

/// Queue, loop mode and shuffle state
#[derive(Debug)]
pub struct Sequencer {
    queue: Vec<TrackId>,
    current: Option<TrackId>,
    loop_mode: LoopMode,
    shuffle: bool,
    rng: StdRng,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Sequencer whose shuffle draws are reproducible
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            queue: Vec::new(),
            current: None,
            loop_mode: LoopMode::default(),
            shuffle: false,
            rng,
        }
    }

    pub fn queue(&self) -> &[TrackId] {
        &self.queue
    }

    pub fn current(&self) -> Option<&TrackId> {
        self.current.as_ref()
    }

    pub fn set_current(&mut self, id: TrackId) {
        self.current = Some(id);
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Flip shuffle and return the new state
    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        self.shuffle
    }

    /// Replace the queue wholesale
    ///
    /// Returns the track that must become current when the current id is
    /// missing from the new queue. An empty queue changes nothing.
    pub fn set_queue(&mut self, ids: Vec<TrackId>) -> Option<TrackId> {
        self.queue = ids;
        let first = self.queue.first()?;
        let present = self
            .current
            .as_ref()
            .is_some_and(|current| self.queue.contains(current));
        if present {
            return None;
        }
        let first = first.clone();
        debug!(track = %first, "Current track not in new queue, switching to first");
        self.current = Some(first.clone());
        Some(first)
    }

    /// Pick the neighbor of the current track without moving to it
    ///
    /// Shuffle draws uniformly from the queue, repeats allowed. An empty
    /// queue yields `None`.
    pub fn resolve(&mut self, direction: Direction) -> Option<TrackId> {
        let len = self.queue.len();
        if len == 0 {
            return None;
        }
        let index = if self.shuffle {
            self.rng.gen_range(0..len)
        } else {
            let i = self
                .current
                .as_ref()
                .and_then(|current| self.queue.iter().position(|id| id == current))
                .unwrap_or(0);
            match direction {
                Direction::Next => (i + 1) % len,
                Direction::Previous => (i + len - 1) % len,
            }
        };
        Some(self.queue[index].clone())
    }

    /// Move to the neighbor in `direction` and return it
    pub fn step(&mut self, direction: Direction) -> Option<TrackId> {
        let id = self.resolve(direction)?;
        self.current = Some(id.clone());
        Some(id)
    }

    /// `prev` semantics: restart when more than `threshold` seconds have
    /// elapsed, otherwise step back
    pub fn previous(&mut self, elapsed: f64, threshold: f64) -> Option<PreviousAction> {
        if elapsed > threshold && self.current.is_some() {
            return Some(PreviousAction::Restart);
        }
        self.step(Direction::Previous).map(PreviousAction::Switch)
    }

    /// Reaction to the current track ending naturally
    pub fn on_track_end(&mut self) -> EndAction {
        match self.loop_mode {
            LoopMode::One => EndAction::Repeat,
            LoopMode::None => EndAction::Pause,
            LoopMode::All => match self.step(Direction::Next) {
                Some(id) => EndAction::Continue(id),
                None => EndAction::Pause,
            },
        }
    }
}
