//! Focus/break countdown
//!
//! [`Countdown`] is a plain state machine advanced once per second by
//! [`Countdown::tick`]. [`TickSource`] is the background task that produces
//! those ticks; it runs on the multi-threaded runtime and hands ticks to the
//! foreground loop over an `mpsc` channel.
//!
//! On completion the countdown stops, asks for the alarm once and enters a
//! cooldown. When the cooldown runs out the mode flips, the duration resets
//! and the countdown continues on its own.

use std::time::Duration;

use lofi_common::config::TimerSettings;
use lofi_common::TimerMode;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info};

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    /// Countdown advanced
    Tick { mode: TimerMode, remaining_secs: u32 },
    /// Countdown reached zero; the alarm should sound
    Completed { mode: TimerMode },
    /// Cooldown advanced
    Cooldown { remaining_secs: u32 },
    /// Cooldown ended and the next mode started running
    ModeStarted { mode: TimerMode, duration_secs: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    mode: TimerMode,
    focus_secs: u32,
    break_secs: u32,
    remaining: u32,
    running: bool,
    cooldown_secs: u32,
    cooldown: Option<u32>,
}

impl Countdown {
    pub fn new(settings: &TimerSettings) -> Self {
        let focus_secs = settings.focus_minutes.max(1) * 60;
        Self {
            mode: TimerMode::Focus,
            focus_secs,
            break_secs: settings.break_minutes.max(1) * 60,
            remaining: focus_secs,
            running: false,
            cooldown_secs: settings.cooldown_secs,
            cooldown: None,
        }
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Remaining cooldown ticks, if cooling down
    pub fn cooldown(&self) -> Option<u32> {
        self.cooldown
    }

    pub fn duration_of(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Focus => self.focus_secs,
            TimerMode::Break => self.break_secs,
        }
    }

    /// Start or resume. A finished countdown restarts from its full duration.
    /// Ignored during the cooldown, which continues on its own.
    pub fn start(&mut self) {
        if self.cooldown.is_some() {
            debug!("Countdown start ignored during cooldown");
            return;
        }
        if self.remaining == 0 {
            self.remaining = self.duration_of(self.mode);
        }
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Stop and rewind the current mode
    pub fn reset(&mut self) {
        self.running = false;
        self.cooldown = None;
        self.remaining = self.duration_of(self.mode);
    }

    /// Switch mode, stopped at the full duration
    pub fn set_mode(&mut self, mode: TimerMode) {
        self.mode = mode;
        self.reset();
    }

    pub fn tick(&mut self) -> Option<TimerSignal> {
        if let Some(left) = self.cooldown {
            let left = left.saturating_sub(1);
            if left > 0 {
                self.cooldown = Some(left);
                return Some(TimerSignal::Cooldown { remaining_secs: left });
            }
            self.cooldown = None;
            self.mode = self.mode.other();
            self.remaining = self.duration_of(self.mode);
            self.running = true;
            info!(mode = %self.mode, duration_secs = self.remaining, "Countdown continues");
            return Some(TimerSignal::ModeStarted {
                mode: self.mode,
                duration_secs: self.remaining,
            });
        }

        if !self.running {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return Some(TimerSignal::Tick {
                mode: self.mode,
                remaining_secs: self.remaining,
            });
        }

        let finished = self.mode;
        self.running = false;
        info!(mode = %finished, "Countdown completed");
        if self.cooldown_secs > 0 {
            self.cooldown = Some(self.cooldown_secs);
        } else {
            self.mode = self.mode.other();
            self.remaining = self.duration_of(self.mode);
            self.running = true;
        }
        Some(TimerSignal::Completed { mode: finished })
    }
}

/// Fixed-cadence tick producer
pub struct TickSource {
    handle: JoinHandle<()>,
}

impl TickSource {
    /// Spawn the tick task; it ends when the receiver is dropped
    pub fn spawn(period: Duration) -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            // First tick completes immediately
            interval.tick().await;

            info!("Countdown tick source started ({}ms interval)", period.as_millis());
            loop {
                interval.tick().await;
                if tx.send(()).await.is_err() {
                    debug!("Tick receiver dropped, stopping tick source");
                    break;
                }
            }
        });
        (Self { handle }, rx)
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for TickSource {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
