//! The two interchangeable playback slots of a crossfade player

use super::media::MediaElement;

/// Which slot of the pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotId {
    A,
    B,
}

impl SlotId {
    /// Get the other slot
    pub fn other(&self) -> Self {
        match self {
            SlotId::A => SlotId::B,
            SlotId::B => SlotId::A,
        }
    }
}

/// Slots are allocated once per player and reused for every media change
pub struct SlotPair<M> {
    a: M,
    b: M,
}

impl<M: MediaElement> SlotPair<M> {
    pub fn new(a: M, b: M) -> Self {
        Self { a, b }
    }

    pub fn get(&self, id: SlotId) -> &M {
        match id {
            SlotId::A => &self.a,
            SlotId::B => &self.b,
        }
    }

    pub fn get_mut(&mut self, id: SlotId) -> &mut M {
        match id {
            SlotId::A => &mut self.a,
            SlotId::B => &mut self.b,
        }
    }

    /// Borrow both slots, `first` first
    pub fn split_mut(&mut self, first: SlotId) -> (&mut M, &mut M) {
        match first {
            SlotId::A => (&mut self.a, &mut self.b),
            SlotId::B => (&mut self.b, &mut self.a),
        }
    }
}
