//! Dual-slot crossfade engine
//!
//! One parameterized engine drives two [`MediaElement`]s: one active
//! (audible, advancing) and one standby. It is instantiated once for the
//! music player and once per enabled ambient loop.
//!
//! # Transitions
//!
//! - **Hard switch** ([`CrossfadeEngine::load`]): cancels any session, loads
//!   the new media into standby, swaps roles and cuts over immediately. The
//!   old slot is preloaded with the same media so a later crossfade never
//!   starts cold.
//! - **Timed crossfade** ([`Continuation::Loop`]): when the active slot has
//!   `0 < remaining <= window`, standby is rewound to 0, started at zero gain
//!   and a [`CrossfadeSession`] ramps the two gains linearly.
//! - **Natural end** ([`Continuation::Advance`]): once the active slot has
//!   ended or has at most `end_threshold` seconds left, [`PlayerEvent::Ended`]
//!   is reported once and the owner decides what to load next.
//!
//! # Timing
//!
//! The engine never spawns timers. The owner calls [`CrossfadeEngine::poll`]
//! with the current instant; due crossfade steps, cool-down expiry, the
//! end-of-media check and the keep-alive watchdog all run from there.

use std::time::{Duration, Instant};

use lofi_common::config::{AmbientSettings, MusicSettings};
use tracing::{debug, error, warn};

use super::media::{MediaElement, MediaError, MediaRef};
use super::slot::{SlotId, SlotPair};

/// Tuning for one engine instance
#[derive(Debug, Clone, PartialEq)]
pub struct CrossfadeConfig {
    /// Length of a timed crossfade
    pub window: Duration,

    /// Number of gain steps in one crossfade
    pub steps: u32,

    /// Fade-out gain at or below which the outgoing slot counts as silent
    pub settle_floor: f32,

    /// Fraction of the target the incoming gain must reach
    pub settle_ratio: f32,

    /// Lock held after a completed crossfade
    pub cooldown: Duration,

    /// Keep-alive check period
    pub watchdog_interval: Duration,

    /// Remaining seconds at which an advancing player reports the end
    pub end_threshold: f64,
}

impl CrossfadeConfig {
    /// Music defaults: 30 steps over 3 s, settle at 99 %
    pub fn music(settings: &MusicSettings, watchdog_interval: Duration) -> Self {
        Self {
            window: Duration::from_secs_f64(settings.crossfade_secs),
            steps: settings.steps.max(1),
            settle_floor: settings.settle_floor,
            settle_ratio: settings.settle_ratio,
            cooldown: Duration::from_millis(settings.cooldown_ms),
            watchdog_interval,
            end_threshold: settings.end_threshold_secs,
        }
    }

    /// Ambient defaults: 20 steps over 2 s, settle at 90 %
    pub fn ambient(settings: &AmbientSettings, watchdog_interval: Duration) -> Self {
        Self {
            window: Duration::from_secs_f64(settings.crossfade_secs),
            steps: settings.steps.max(1),
            settle_floor: settings.settle_floor,
            settle_ratio: settings.settle_ratio,
            cooldown: Duration::from_millis(settings.cooldown_ms),
            watchdog_interval,
            end_threshold: 0.0,
        }
    }

    /// Time between two gain steps
    pub fn step_interval(&self) -> Duration {
        self.window / self.steps.max(1)
    }
}

impl Default for CrossfadeConfig {
    fn default() -> Self {
        Self::music(&MusicSettings::default(), Duration::from_secs(3))
    }
}

/// What happens when the active media approaches its end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Crossfade back to position 0 of the same media
    Loop,
    /// Report the end to the owner
    Advance,
}

/// Notifications returned from [`CrossfadeEngine::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    CrossfadeStarted,
    CrossfadeCompleted,
    /// Active media ended while advancing; reported once per media
    Ended,
    /// Watchdog restarted a paused or stalled active slot
    WatchdogNudge,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TransitionLock {
    Idle,
    Fading,
    CoolingDown { until: Instant },
}

/// In-flight transition between the two slots
#[derive(Debug, Clone, PartialEq)]
pub struct CrossfadeSession {
    pub from: SlotId,
    pub to: SlotId,
    pub start_gain: f32,
    pub target: f32,
    pub step_gain: f32,
    pub steps_taken: u32,
    pub total_steps: u32,
    next_step_at: Instant,
}

impl CrossfadeSession {
    fn retarget(&mut self, target: f32) {
        self.target = target;
        self.step_gain = self.start_gain.max(target) / self.total_steps.max(1) as f32;
    }
}

/// Playhead of the active slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub current_time: f64,
    pub duration: Option<f64>,
}

/// Two-slot player with timed linear crossfades
pub struct CrossfadeEngine<M: MediaElement> {
    label: String,
    config: CrossfadeConfig,
    slots: SlotPair<M>,
    active: SlotId,
    target: f32,
    want_playing: bool,
    continuation: Continuation,
    session: Option<CrossfadeSession>,
    lock: TransitionLock,
    ended_reported: bool,
    next_watchdog_at: Option<Instant>,
    watchdog_position: Option<f64>,
}

impl<M: MediaElement> CrossfadeEngine<M> {
    /// Create an engine over two freshly allocated elements
    ///
    /// `label` names the engine in logs (`"music"`, `"ambient:rain"`).
    pub fn new(label: impl Into<String>, config: CrossfadeConfig, mut a: M, mut b: M, volume: f32) -> Self {
        a.set_volume(0.0);
        b.set_volume(0.0);
        Self {
            label: label.into(),
            config,
            slots: SlotPair::new(a, b),
            active: SlotId::A,
            target: volume.clamp(0.0, 1.0),
            want_playing: false,
            continuation: Continuation::Advance,
            session: None,
            lock: TransitionLock::Idle,
            ended_reported: false,
            next_watchdog_at: None,
            watchdog_position: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn config(&self) -> &CrossfadeConfig {
        &self.config
    }

    pub fn active_id(&self) -> SlotId {
        self.active
    }

    pub fn slot(&self, id: SlotId) -> &M {
        self.slots.get(id)
    }

    pub fn active_slot(&self) -> &M {
        self.slots.get(self.active)
    }

    pub fn standby_slot(&self) -> &M {
        self.slots.get(self.active.other())
    }

    pub fn session(&self) -> Option<&CrossfadeSession> {
        self.session.as_ref()
    }

    pub fn is_fading(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the owner wants this engine to be producing sound
    pub fn is_playing(&self) -> bool {
        self.want_playing
    }

    pub fn volume(&self) -> f32 {
        self.target
    }

    pub fn continuation(&self) -> Continuation {
        self.continuation
    }

    pub fn set_continuation(&mut self, continuation: Continuation) {
        if self.continuation != continuation {
            debug!(player = %self.label, ?continuation, "Continuation changed");
            self.continuation = continuation;
            self.ended_reported = false;
        }
    }

    /// Media of the active slot
    pub fn media(&self) -> Option<MediaRef> {
        self.active_slot().media()
    }

    /// Hard switch to `media`
    ///
    /// On failure the engine keeps its previous content and the error is
    /// returned for the owner to report.
    pub fn load(&mut self, media: &MediaRef) -> Result<(), MediaError> {
        if self.session.is_some() {
            debug!(player = %self.label, "Hard switch cancels in-flight crossfade");
        }
        self.cancel_session();

        let incoming = self.active.other();
        if let Err(e) = self.slots.get_mut(incoming).set_source(media) {
            error!(player = %self.label, media = %media, error = %e, "Failed to load media");
            return Err(e);
        }

        let target = self.target;
        let (new_slot, old_slot) = self.slots.split_mut(incoming);
        old_slot.pause();
        old_slot.set_volume(0.0);
        new_slot.set_volume(target);
        if self.want_playing {
            if let Err(e) = new_slot.play() {
                debug!(player = %self.label, error = %e, "Play rejected after load");
            }
        }

        // Preload the same media into the new standby slot
        if let Err(e) = old_slot.set_source(media) {
            debug!(player = %self.label, error = %e, "Standby preload failed");
        }

        self.active = incoming;
        self.ended_reported = false;
        self.watchdog_position = None;
        debug!(player = %self.label, media = %media, slot = ?incoming, "Loaded media");
        Ok(())
    }

    /// Start or continue playback of the active slot
    ///
    /// Returns `false` when the host rejected playback; the engine then
    /// stays paused until a later play succeeds.
    pub fn play(&mut self) -> bool {
        let resuming = !self.want_playing;
        self.want_playing = true;
        self.watchdog_position = None;
        if self.session.is_some() {
            return true;
        }
        let target = self.target;
        let slot = self.slots.get_mut(self.active);
        // A slot stopped at its reported end rewinds, so the end is reported again
        if resuming && (self.ended_reported || slot.ended()) {
            slot.set_current_time(0.0);
            self.ended_reported = false;
        }
        let slot = self.slots.get_mut(self.active);
        slot.set_volume(target);
        match slot.play() {
            Ok(()) => true,
            Err(e) => {
                debug!(player = %self.label, error = %e, "Play rejected");
                false
            }
        }
    }

    /// Pause both slots, settling any running crossfade first
    pub fn pause(&mut self) {
        self.settle();
        self.want_playing = false;
        self.slots.get_mut(SlotId::A).pause();
        self.slots.get_mut(SlotId::B).pause();
    }

    /// Move the active playhead, settling any running crossfade first
    pub fn seek(&mut self, seconds: f64) {
        self.settle();
        self.slots.get_mut(self.active).set_current_time(seconds.max(0.0));
        self.ended_reported = false;
        self.watchdog_position = None;
    }

    /// Set the target gain; a running crossfade is retargeted
    pub fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.target = volume;
        match self.session.as_mut() {
            Some(session) => {
                session.retarget(volume);
                let incoming = self.slots.get_mut(session.to);
                if incoming.volume() > volume {
                    incoming.set_volume(volume);
                }
            }
            None => self.slots.get_mut(self.active).set_volume(volume),
        }
    }

    pub fn position(&self) -> Position {
        let slot = self.active_slot();
        Position {
            current_time: slot.current_time(),
            duration: slot.duration(),
        }
    }

    /// Advance time-driven behavior up to `now`
    pub fn poll(&mut self, now: Instant) -> Vec<PlayerEvent> {
        let mut events = Vec::new();

        self.run_due_steps(now, &mut events);

        if let TransitionLock::CoolingDown { until } = self.lock {
            if now >= until {
                self.lock = TransitionLock::Idle;
            }
        }

        if self.want_playing && self.session.is_none() {
            self.check_end(now, &mut events);
        }

        self.run_watchdog(now, &mut events);
        events
    }

    fn check_end(&mut self, now: Instant, events: &mut Vec<PlayerEvent>) {
        let slot = self.active_slot();
        let Some(duration) = slot.duration() else {
            return;
        };
        let remaining = duration - slot.current_time();
        let ended = slot.ended();

        match self.continuation {
            Continuation::Loop => {
                let window = self.config.window.as_secs_f64();
                if remaining > 0.0 && remaining <= window {
                    if self.start_crossfade(now) {
                        events.push(PlayerEvent::CrossfadeStarted);
                    }
                } else if ended && self.lock == TransitionLock::Idle {
                    // Missed the window entirely; wrap around with a cut
                    debug!(player = %self.label, "Loop wraparound without crossfade");
                    let slot = self.slots.get_mut(self.active);
                    slot.set_current_time(0.0);
                    if let Err(e) = slot.play() {
                        debug!(player = %self.label, error = %e, "Play rejected on wraparound");
                    }
                }
            }
            Continuation::Advance => {
                if !self.ended_reported && (ended || remaining <= self.config.end_threshold) {
                    self.ended_reported = true;
                    debug!(player = %self.label, remaining, "Media ended");
                    events.push(PlayerEvent::Ended);
                }
            }
        }
    }

    /// Begin a timed crossfade from the active slot to position 0 of standby
    ///
    /// Requests made while a session is running or the lock is cooling down
    /// are dropped.
    fn start_crossfade(&mut self, now: Instant) -> bool {
        if self.lock != TransitionLock::Idle || self.session.is_some() {
            debug!(player = %self.label, "Crossfade request dropped, transition in progress");
            return false;
        }

        let from = self.active;
        let to = from.other();
        let (outgoing, incoming) = self.slots.split_mut(from);
        let start_gain = outgoing.volume();

        incoming.set_current_time(0.0);
        incoming.set_volume(0.0);
        if let Err(e) = incoming.play() {
            debug!(player = %self.label, error = %e, "Crossfade start rejected");
            return false;
        }

        let total_steps = self.config.steps.max(1);
        let mut session = CrossfadeSession {
            from,
            to,
            start_gain,
            target: self.target,
            step_gain: 0.0,
            steps_taken: 0,
            total_steps,
            next_step_at: now + self.config.step_interval(),
        };
        session.retarget(self.target);
        debug!(
            player = %self.label,
            ?from,
            ?to,
            start_gain,
            target = self.target,
            "Crossfade started"
        );
        self.session = Some(session);
        self.lock = TransitionLock::Fading;
        true
    }

    fn run_due_steps(&mut self, now: Instant, events: &mut Vec<PlayerEvent>) {
        let interval = self.config.step_interval();
        loop {
            let Some(session) = self.session.as_mut() else {
                return;
            };
            if session.next_step_at > now {
                return;
            }

            let (outgoing, incoming) = self.slots.split_mut(session.from);
            let target = session.target;
            let out_gain = (outgoing.volume() - session.step_gain).clamp(0.0, target.max(0.0));
            let in_gain = (incoming.volume() + session.step_gain).clamp(0.0, target.max(0.0));
            outgoing.set_volume(out_gain);
            incoming.set_volume(in_gain);
            session.steps_taken += 1;
            session.next_step_at += interval;

            if out_gain <= self.config.settle_floor && in_gain >= self.config.settle_ratio * target {
                let until = session.next_step_at - interval + self.config.cooldown;
                self.finish_session();
                self.lock = TransitionLock::CoolingDown { until };
                events.push(PlayerEvent::CrossfadeCompleted);
                return;
            }
        }
    }

    /// Complete the running session: silence and rewind the outgoing slot,
    /// pin the incoming slot at target and swap roles
    fn finish_session(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let target = self.target;
        let (outgoing, incoming) = self.slots.split_mut(session.from);
        outgoing.pause();
        outgoing.set_current_time(0.0);
        outgoing.set_volume(0.0);
        incoming.set_volume(target);

        self.active = session.to;
        self.ended_reported = false;
        self.watchdog_position = None;
        debug!(player = %self.label, steps = session.steps_taken, active = ?self.active, "Crossfade completed");
    }

    /// Jump a running session straight to its completed state
    fn settle(&mut self) {
        if self.session.is_some() {
            debug!(player = %self.label, "Settling crossfade");
            self.finish_session();
        }
        self.lock = TransitionLock::Idle;
    }

    /// Drop a running session and restore the active slot
    fn cancel_session(&mut self) {
        if let Some(session) = self.session.take() {
            let target = self.target;
            let (outgoing, incoming) = self.slots.split_mut(session.from);
            outgoing.set_volume(target);
            incoming.pause();
            incoming.set_volume(0.0);
        }
        self.lock = TransitionLock::Idle;
    }

    fn run_watchdog(&mut self, now: Instant, events: &mut Vec<PlayerEvent>) {
        let due = match self.next_watchdog_at {
            Some(at) => now >= at,
            None => {
                self.next_watchdog_at = Some(now + self.config.watchdog_interval);
                false
            }
        };
        if !due {
            return;
        }
        self.next_watchdog_at = Some(now + self.config.watchdog_interval);

        if !self.want_playing || self.session.is_some() {
            self.watchdog_position = None;
            return;
        }

        let label = &self.label;
        let slot = self.slots.get_mut(self.active);
        if slot.media().is_none() {
            return;
        }
        if slot.ended() && self.continuation == Continuation::Advance {
            // Owner decides what follows a finished track
            return;
        }

        let position = slot.current_time();
        if slot.is_paused() {
            warn!(player = %label, position, "Watchdog: active slot paused while playing, restarting");
            if let Err(e) = slot.play() {
                debug!(player = %label, error = %e, "Watchdog play rejected");
            }
            events.push(PlayerEvent::WatchdogNudge);
        } else if self.watchdog_position == Some(position) {
            warn!(player = %label, position, "Watchdog: playback stalled, nudging");
            slot.pause();
            if let Err(e) = slot.play() {
                debug!(player = %label, error = %e, "Watchdog play rejected");
            }
            events.push(PlayerEvent::WatchdogNudge);
        }
        self.watchdog_position = Some(slot.current_time());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::media::AudioHost;
    use crate::playback::simulated::{SimulatedHost, SimulatedMedia};

    fn engine(host: &mut SimulatedHost) -> CrossfadeEngine<SimulatedMedia> {
        let a = host.create_element();
        let b = host.create_element();
        CrossfadeEngine::new("test", CrossfadeConfig::default(), a, b, 0.5)
    }

    /// Advance host and engine together in 20 ms ticks
    fn run(
        host: &mut SimulatedHost,
        engine: &mut CrossfadeEngine<SimulatedMedia>,
        now: &mut Instant,
        seconds: f64,
    ) -> Vec<PlayerEvent> {
        let tick = Duration::from_millis(20);
        let mut events = Vec::new();
        let ticks = (seconds / tick.as_secs_f64()).round() as usize;
        for _ in 0..ticks {
            host.advance(tick.as_secs_f64());
            *now += tick;
            events.extend(engine.poll(*now));
        }
        events
    }

    #[test]
    fn test_load_preloads_standby_and_resets_position() {
        let mut host = SimulatedHost::new();
        let mut e = engine(&mut host);

        e.load(&MediaRef::new("a.mp3")).unwrap();
        assert_eq!(e.media(), Some(MediaRef::new("a.mp3")));
        assert_eq!(e.standby_slot().media(), Some(MediaRef::new("a.mp3")));
        assert_eq!(e.position().current_time, 0.0);
        assert_eq!(e.active_slot().volume(), 0.5);
        assert_eq!(e.standby_slot().volume(), 0.0);
    }

    #[test]
    fn test_failed_load_keeps_previous_media() {
        let mut host = SimulatedHost::new();
        host.fail_media("broken.mp3");
        let mut e = engine(&mut host);
        e.load(&MediaRef::new("a.mp3")).unwrap();

        assert!(e.load(&MediaRef::new("broken.mp3")).is_err());
        assert_eq!(e.media(), Some(MediaRef::new("a.mp3")));
    }

    #[test]
    fn test_rejected_play_is_swallowed() {
        let mut host = SimulatedHost::new();
        let mut e = engine(&mut host);
        e.load(&MediaRef::new("a.mp3")).unwrap();

        host.block_autoplay(true);
        assert!(!e.play());
        assert!(e.active_slot().is_paused());

        host.block_autoplay(false);
        assert!(e.play());
        assert!(!e.active_slot().is_paused());
    }

    #[test]
    fn test_loop_crossfade_runs_to_completion() {
        let mut host = SimulatedHost::new();
        host.set_duration("loop.mp3", 10.0);
        let mut e = engine(&mut host);
        e.set_continuation(Continuation::Loop);
        e.load(&MediaRef::new("loop.mp3")).unwrap();
        e.play();
        let first = e.active_id();

        let mut now = Instant::now();
        e.poll(now);
        let events = run(&mut host, &mut e, &mut now, 7.1);
        assert!(events.contains(&PlayerEvent::CrossfadeStarted));
        assert!(e.is_fading());

        let events = run(&mut host, &mut e, &mut now, 3.5);
        assert!(events.contains(&PlayerEvent::CrossfadeCompleted));
        assert!(!e.is_fading());
        assert_eq!(e.active_id(), first.other());
        assert_eq!(e.active_slot().volume(), 0.5);
        assert_eq!(e.standby_slot().volume(), 0.0);
        assert!(e.standby_slot().is_paused());
        assert_eq!(e.standby_slot().current_time(), 0.0);
        assert!(e.position().current_time < 4.0);
    }

    #[test]
    fn test_crossfade_gains_are_monotonic() {
        let mut host = SimulatedHost::new();
        host.set_duration("loop.mp3", 10.0);
        let mut e = engine(&mut host);
        e.set_continuation(Continuation::Loop);
        e.load(&MediaRef::new("loop.mp3")).unwrap();
        e.play();

        let mut now = Instant::now();
        e.poll(now);
        run(&mut host, &mut e, &mut now, 7.02);
        let session = e.session().cloned().unwrap();
        let mut last_out = e.slot(session.from).volume();
        let mut last_in = e.slot(session.to).volume();

        while e.is_fading() {
            run(&mut host, &mut e, &mut now, 0.02);
            if !e.is_fading() {
                break;
            }
            let out = e.slot(session.from).volume();
            let inc = e.slot(session.to).volume();
            assert!(out <= last_out);
            assert!(inc >= last_in);
            assert!((0.0..=0.5).contains(&out));
            assert!((0.0..=0.5).contains(&inc));
            last_out = out;
            last_in = inc;
        }
    }

    #[test]
    fn test_second_crossfade_request_dropped_during_cooldown() {
        let mut host = SimulatedHost::new();
        host.set_duration("short.mp3", 4.0);
        let mut e = engine(&mut host);
        e.set_continuation(Continuation::Loop);
        e.load(&MediaRef::new("short.mp3")).unwrap();
        e.play();

        let mut now = Instant::now();
        e.poll(now);
        let events = run(&mut host, &mut e, &mut now, 1.5);
        let started = events
            .iter()
            .filter(|e| **e == PlayerEvent::CrossfadeStarted)
            .count();
        assert_eq!(started, 1);
    }

    #[test]
    fn test_advance_reports_end_once() {
        let mut host = SimulatedHost::new();
        host.set_duration("a.mp3", 5.0);
        let mut e = engine(&mut host);
        e.load(&MediaRef::new("a.mp3")).unwrap();
        e.play();

        let mut now = Instant::now();
        e.poll(now);
        let events = run(&mut host, &mut e, &mut now, 7.0);
        let ended = events.iter().filter(|e| **e == PlayerEvent::Ended).count();
        assert_eq!(ended, 1);
    }

    #[test]
    fn test_play_after_reported_end_rewinds() {
        let mut host = SimulatedHost::new();
        host.set_duration("a.mp3", 5.0);
        let mut e = engine(&mut host);
        e.load(&MediaRef::new("a.mp3")).unwrap();
        e.play();

        let mut now = Instant::now();
        e.poll(now);
        let events = run(&mut host, &mut e, &mut now, 5.0);
        assert!(events.contains(&PlayerEvent::Ended));
        e.pause();

        assert!(e.play());
        assert_eq!(e.position().current_time, 0.0);
        let events = run(&mut host, &mut e, &mut now, 6.0);
        let ended = events.iter().filter(|e| **e == PlayerEvent::Ended).count();
        assert_eq!(ended, 1);
    }

    #[test]
    fn test_resume_mid_track_keeps_position() {
        let mut host = SimulatedHost::new();
        host.set_duration("a.mp3", 5.0);
        let mut e = engine(&mut host);
        e.load(&MediaRef::new("a.mp3")).unwrap();
        e.play();

        let mut now = Instant::now();
        e.poll(now);
        run(&mut host, &mut e, &mut now, 2.0);
        e.pause();
        let paused_at = e.position().current_time;

        e.play();
        assert!(paused_at > 1.5);
        assert_eq!(e.position().current_time, paused_at);
    }

    #[test]
    fn test_hard_switch_cancels_session() {
        let mut host = SimulatedHost::new();
        host.set_duration("loop.mp3", 10.0);
        let mut e = engine(&mut host);
        e.set_continuation(Continuation::Loop);
        e.load(&MediaRef::new("loop.mp3")).unwrap();
        e.play();

        let mut now = Instant::now();
        e.poll(now);
        run(&mut host, &mut e, &mut now, 7.5);
        assert!(e.is_fading());

        e.load(&MediaRef::new("other.mp3")).unwrap();
        assert!(!e.is_fading());
        assert_eq!(e.media(), Some(MediaRef::new("other.mp3")));
        assert_eq!(e.active_slot().volume(), 0.5);
        assert_eq!(e.standby_slot().volume(), 0.0);
        assert!(e.standby_slot().is_paused());
        assert!(!e.active_slot().is_paused());
    }

    #[test]
    fn test_pause_settles_session() {
        let mut host = SimulatedHost::new();
        host.set_duration("loop.mp3", 10.0);
        let mut e = engine(&mut host);
        e.set_continuation(Continuation::Loop);
        e.load(&MediaRef::new("loop.mp3")).unwrap();
        e.play();

        let mut now = Instant::now();
        e.poll(now);
        run(&mut host, &mut e, &mut now, 7.5);
        let incoming = e.session().map(|s| s.to).unwrap();

        e.pause();
        assert!(!e.is_fading());
        assert_eq!(e.active_id(), incoming);
        assert_eq!(e.active_slot().volume(), 0.5);
        assert!(e.active_slot().is_paused());
        assert!(e.standby_slot().is_paused());
    }

    #[test]
    fn test_volume_change_retargets_session() {
        let mut host = SimulatedHost::new();
        host.set_duration("loop.mp3", 10.0);
        let mut e = engine(&mut host);
        e.set_continuation(Continuation::Loop);
        e.load(&MediaRef::new("loop.mp3")).unwrap();
        e.play();

        let mut now = Instant::now();
        e.poll(now);
        run(&mut host, &mut e, &mut now, 7.5);
        e.set_volume(0.2);
        assert_eq!(e.session().map(|s| s.target), Some(0.2));

        run(&mut host, &mut e, &mut now, 3.5);
        assert!(!e.is_fading());
        assert!((e.active_slot().volume() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_watchdog_restarts_paused_slot() {
        let mut host = SimulatedHost::new();
        let mut e = engine(&mut host);
        e.load(&MediaRef::new("a.mp3")).unwrap();

        host.block_autoplay(true);
        e.play();
        host.block_autoplay(false);

        let mut now = Instant::now();
        e.poll(now);
        let events = run(&mut host, &mut e, &mut now, 3.1);
        assert!(events.contains(&PlayerEvent::WatchdogNudge));
        assert!(!e.active_slot().is_paused());
    }

    #[test]
    fn test_watchdog_nudges_stalled_slot() {
        let mut host = SimulatedHost::new();
        let mut e = engine(&mut host);
        e.load(&MediaRef::new("a.mp3")).unwrap();
        e.play();

        let mut now = Instant::now();
        e.poll(now);
        run(&mut host, &mut e, &mut now, 1.0);
        host.stall(true);
        let calls = e.active_slot().play_calls();
        let events = run(&mut host, &mut e, &mut now, 5.5);
        assert!(events.contains(&PlayerEvent::WatchdogNudge));
        assert!(e.active_slot().play_calls() > calls);
    }

    #[test]
    fn test_watchdog_idle_while_paused() {
        let mut host = SimulatedHost::new();
        let mut e = engine(&mut host);
        e.load(&MediaRef::new("a.mp3")).unwrap();

        let mut now = Instant::now();
        e.poll(now);
        let events = run(&mut host, &mut e, &mut now, 7.0);
        assert!(events.is_empty());
        assert!(e.active_slot().is_paused());
    }

    #[test]
    fn test_step_interval() {
        let config = CrossfadeConfig::default();
        assert_eq!(config.step_interval(), Duration::from_millis(100));
        let ambient = CrossfadeConfig::ambient(&AmbientSettings::default(), Duration::from_secs(3));
        assert_eq!(ambient.step_interval(), Duration::from_millis(100));
        assert_eq!(ambient.settle_ratio, 0.9);
    }
}
