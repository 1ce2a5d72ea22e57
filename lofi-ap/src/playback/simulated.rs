//! Deterministic in-memory audio host
//!
//! Elements advance only when [`SimulatedHost::advance`] is called, so tests
//! control time exactly. Host policy such as blocked autoplay, failing media
//! and stalled playback can be toggled.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::media::{AudioHost, BusState, MediaElement, MediaError, MediaRef};

#[derive(Debug)]
struct ElementState {
    id: usize,
    media: Option<MediaRef>,
    duration: Option<f64>,
    time: f64,
    volume: f32,
    paused: bool,
    play_calls: usize,
}

#[derive(Debug, Default)]
struct HostPolicy {
    durations: HashMap<String, f64>,
    default_duration: f64,
    failing: HashSet<String>,
    autoplay_blocked: bool,
    stalled: bool,
}

/// Handle to one simulated playback unit
///
/// Clones share state, so a test can keep a handle to an element the engine
/// owns and inspect its gain and playhead.
#[derive(Debug, Clone)]
pub struct SimulatedMedia {
    state: Rc<RefCell<ElementState>>,
    policy: Rc<RefCell<HostPolicy>>,
}

impl SimulatedMedia {
    pub fn id(&self) -> usize {
        self.state.borrow().id
    }

    /// Number of successful `play()` calls
    pub fn play_calls(&self) -> usize {
        self.state.borrow().play_calls
    }
}

impl MediaElement for SimulatedMedia {
    fn media(&self) -> Option<MediaRef> {
        self.state.borrow().media.clone()
    }

    fn set_source(&mut self, media: &MediaRef) -> Result<(), MediaError> {
        let policy = self.policy.borrow();
        if policy.failing.contains(media.as_str()) {
            return Err(MediaError::LoadFailed {
                media: media.to_string(),
                reason: "simulated decode error".to_string(),
            });
        }
        let duration = policy
            .durations
            .get(media.as_str())
            .copied()
            .unwrap_or(policy.default_duration);

        let mut state = self.state.borrow_mut();
        state.media = Some(media.clone());
        state.duration = Some(duration);
        state.time = 0.0;
        state.paused = true;
        Ok(())
    }

    fn play(&mut self) -> Result<(), MediaError> {
        if self.policy.borrow().autoplay_blocked {
            return Err(MediaError::PlaybackRejected("autoplay blocked".to_string()));
        }
        let mut state = self.state.borrow_mut();
        if state.media.is_none() {
            return Err(MediaError::PlaybackRejected("no source".to_string()));
        }
        if let Some(duration) = state.duration {
            if state.time >= duration {
                state.time = 0.0;
            }
        }
        state.paused = false;
        state.play_calls += 1;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.borrow_mut().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    fn ended(&self) -> bool {
        let state = self.state.borrow();
        matches!(state.duration, Some(d) if state.time >= d)
    }

    fn current_time(&self) -> f64 {
        self.state.borrow().time
    }

    fn set_current_time(&mut self, seconds: f64) {
        let mut state = self.state.borrow_mut();
        let max = state.duration.unwrap_or(0.0);
        state.time = seconds.clamp(0.0, max);
    }

    fn duration(&self) -> Option<f64> {
        self.state.borrow().duration
    }

    fn volume(&self) -> f32 {
        self.state.borrow().volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.borrow_mut().volume = volume.clamp(0.0, 1.0);
    }
}

/// In-memory [`AudioHost`]
#[derive(Debug)]
pub struct SimulatedHost {
    elements: Vec<SimulatedMedia>,
    policy: Rc<RefCell<HostPolicy>>,
    connected: HashSet<usize>,
    snapshot: Vec<u8>,
    suspended: bool,
    resumes: usize,
    alarms: usize,
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedHost {
    /// Host where every media lasts 180 seconds unless overridden
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            policy: Rc::new(RefCell::new(HostPolicy {
                default_duration: 180.0,
                ..HostPolicy::default()
            })),
            connected: HashSet::new(),
            snapshot: Vec::new(),
            suspended: false,
            resumes: 0,
            alarms: 0,
        }
    }

    pub fn set_duration(&mut self, media: &str, seconds: f64) {
        self.policy.borrow_mut().durations.insert(media.to_string(), seconds);
    }

    pub fn fail_media(&mut self, media: &str) {
        self.policy.borrow_mut().failing.insert(media.to_string());
    }

    pub fn block_autoplay(&mut self, blocked: bool) {
        self.policy.borrow_mut().autoplay_blocked = blocked;
    }

    /// While stalled, playing elements do not advance
    pub fn stall(&mut self, stalled: bool) {
        self.policy.borrow_mut().stalled = stalled;
    }

    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    /// Frequency data returned by the next snapshots
    pub fn set_snapshot(&mut self, data: Vec<u8>) {
        self.snapshot = data;
    }

    /// Advance every playing element by `seconds`
    pub fn advance(&mut self, seconds: f64) {
        if self.policy.borrow().stalled {
            return;
        }
        for element in &self.elements {
            let mut state = element.state.borrow_mut();
            if state.paused {
                continue;
            }
            let duration = state.duration.unwrap_or(0.0);
            state.time = (state.time + seconds).min(duration);
            if state.time >= duration {
                state.paused = true;
            }
        }
    }

    pub fn elements(&self) -> &[SimulatedMedia] {
        &self.elements
    }

    pub fn connected_count(&self) -> usize {
        self.connected.len()
    }

    pub fn resume_count(&self) -> usize {
        self.resumes
    }

    pub fn alarms_played(&self) -> usize {
        self.alarms
    }
}

impl AudioHost for SimulatedHost {
    type Element = SimulatedMedia;

    fn create_element(&mut self) -> SimulatedMedia {
        let element = SimulatedMedia {
            state: Rc::new(RefCell::new(ElementState {
                id: self.elements.len(),
                media: None,
                duration: None,
                time: 0.0,
                volume: 0.0,
                paused: true,
                play_calls: 0,
            })),
            policy: Rc::clone(&self.policy),
        };
        self.elements.push(element.clone());
        element
    }

    fn connect_analysis(&mut self, element: &SimulatedMedia) {
        self.connected.insert(element.id());
    }

    fn resume(&mut self) {
        self.suspended = false;
        self.resumes += 1;
    }

    fn fill_snapshot(&mut self, buffer: &mut [u8]) -> BusState {
        if self.connected.is_empty() {
            return BusState::Uninitialized;
        }
        buffer.fill(0);
        let n = buffer.len().min(self.snapshot.len());
        buffer[..n].copy_from_slice(&self.snapshot[..n]);
        if self.suspended {
            BusState::Suspended
        } else {
            BusState::Running
        }
    }

    fn play_alarm(&mut self) {
        self.resume();
        self.alarms += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_advances_and_ends() {
        let mut host = SimulatedHost::new();
        host.set_duration("a.mp3", 2.0);
        let mut el = host.create_element();

        el.set_source(&MediaRef::new("a.mp3")).unwrap();
        el.play().unwrap();
        host.advance(1.5);
        assert!((el.current_time() - 1.5).abs() < 1e-9);
        assert!(!el.ended());

        host.advance(1.0);
        assert!(el.ended());
        assert!(el.is_paused());
    }

    #[test]
    fn test_failed_load_keeps_previous_source() {
        let mut host = SimulatedHost::new();
        host.fail_media("bad.mp3");
        let mut el = host.create_element();

        el.set_source(&MediaRef::new("good.mp3")).unwrap();
        assert!(el.set_source(&MediaRef::new("bad.mp3")).is_err());
        assert_eq!(el.media(), Some(MediaRef::new("good.mp3")));
    }

    #[test]
    fn test_blocked_autoplay_rejects_play() {
        let mut host = SimulatedHost::new();
        let mut el = host.create_element();
        el.set_source(&MediaRef::new("a.mp3")).unwrap();

        host.block_autoplay(true);
        assert!(matches!(el.play(), Err(MediaError::PlaybackRejected(_))));
        assert!(el.is_paused());
    }

    #[test]
    fn test_snapshot_uninitialized_until_connected() {
        let mut host = SimulatedHost::new();
        let el = host.create_element();
        let mut buf = [7u8; 4];
        assert_eq!(host.fill_snapshot(&mut buf), BusState::Uninitialized);

        host.connect_analysis(&el);
        host.connect_analysis(&el);
        assert_eq!(host.connected_count(), 1);
        assert_eq!(host.fill_snapshot(&mut buf), BusState::Running);
        assert_eq!(buf, [0, 0, 0, 0]);
    }
}
