//! Foreground driver loop
//!
//! Runs the engine on the current task: polls crossfades and watchdogs every
//! 20 ms, forwards countdown ticks from the [`TickSource`], applies incoming
//! commands and renders visualizer frames when a frame sink is attached.
//! Returns when the command channel closes or the shutdown future resolves.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::engine::PlaybackEngine;
use super::media::AudioHost;
use crate::control::Command;
use crate::timer::TickSource;
use crate::visualizer::Frame;

/// Loop cadences
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub poll_interval: Duration,
    pub tick_period: Duration,
    /// Visualizer polling cadence; the visualizer's own limiter sets the
    /// actual frame rate
    pub frame_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(20),
            tick_period: Duration::from_secs(1),
            frame_interval: Duration::from_millis(16),
        }
    }
}

/// Why the driver stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    CommandsClosed,
    Shutdown,
}

pub async fn run<H, S>(
    engine: &mut PlaybackEngine<H>,
    config: DriverConfig,
    mut commands: mpsc::Receiver<Command>,
    frames: Option<mpsc::Sender<Frame>>,
    shutdown: S,
) -> StopReason
where
    H: AudioHost,
    S: Future<Output = ()>,
{
    let (_ticks, mut tick_rx) = TickSource::spawn(config.tick_period);

    let mut poll = time::interval(config.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut frame_clock = time::interval(config.frame_interval);
    frame_clock.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let started = Instant::now();

    tokio::pin!(shutdown);
    info!("Playback driver started");

    let reason = loop {
        tokio::select! {
            _ = &mut shutdown => break StopReason::Shutdown,
            command = commands.recv() => match command {
                Some(command) => engine.handle(command),
                None => break StopReason::CommandsClosed,
            },
            _ = poll.tick() => engine.poll(Instant::now().into_std()),
            Some(()) = tick_rx.recv() => engine.on_tick(),
            _ = frame_clock.tick(), if frames.is_some() => {
                let time_ms = started.elapsed().as_secs_f64() * 1000.0;
                if let (Some(frame), Some(sink)) = (engine.render_frame(time_ms), frames.as_ref()) {
                    // A slow consumer just misses frames
                    if sink.try_send(frame).is_err() {
                        debug!("Frame dropped");
                    }
                }
            }
        }
    };

    info!(?reason, "Playback driver stopped");
    reason
}
