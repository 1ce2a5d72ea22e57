//! Frequency-reactive visualizer
//!
//! Polled once per animation frame. A [`FrameLimiter`] caps the frame rate,
//! the latest snapshot is pulled from the analysis bus (zero-filled while the
//! bus is uninitialized) and rendered in the configured style.

pub mod shapes;

use lofi_common::config::VisualizerSettings;
use lofi_common::VisualizerStyle;
use serde::Serialize;
use tracing::debug;

use crate::playback::media::{AudioHost, BusState};
pub use shapes::{Shape, Viewport};

/// Frame-rate cap driven by caller timestamps in milliseconds
#[derive(Debug, Clone)]
pub struct FrameLimiter {
    interval_ms: f64,
    last_ms: f64,
}

impl FrameLimiter {
    pub fn new(fps: u32) -> Self {
        Self {
            interval_ms: 1000.0 / fps.max(1) as f64,
            last_ms: 0.0,
        }
    }

    /// Whether a frame is due at `time_ms`
    ///
    /// The remainder of the elapsed time is carried over so the average rate
    /// stays at the target even when callbacks arrive late.
    pub fn ready(&mut self, time_ms: f64) -> bool {
        let delta = time_ms - self.last_ms;
        if delta < self.interval_ms {
            return false;
        }
        self.last_ms = time_ms - (delta % self.interval_ms);
        true
    }
}

/// One rendered frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub time_ms: f64,
    pub style: VisualizerStyle,
    pub viewport: Viewport,
    pub silent: bool,
    pub shapes: Vec<Shape>,
}

pub struct Visualizer {
    style: VisualizerStyle,
    sensitivity: f32,
    opacity: f32,
    viewport: Viewport,
    limiter: FrameLimiter,
    snapshot: Vec<u8>,
    idle_bins: usize,
}

impl Visualizer {
    /// `bins` is the analysis bus snapshot length
    pub fn new(settings: &VisualizerSettings, bins: usize) -> Self {
        Self {
            style: settings.style,
            sensitivity: settings.sensitivity,
            opacity: settings.opacity,
            viewport: Viewport::default(),
            limiter: FrameLimiter::new(settings.fps),
            snapshot: vec![0; bins],
            idle_bins: settings.idle_bins.max(1),
        }
    }

    pub fn style(&self) -> VisualizerStyle {
        self.style
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    pub fn configure(&mut self, style: VisualizerStyle, sensitivity: f32) {
        debug!(?style, sensitivity, "Visualizer configured");
        self.style = style;
        self.sensitivity = sensitivity.max(0.0);
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Render a frame if the limiter allows one
    pub fn tick<H: AudioHost>(&mut self, host: &mut H, time_ms: f64) -> Option<Frame> {
        if !self.limiter.ready(time_ms) {
            return None;
        }
        let data = match host.fill_snapshot(&mut self.snapshot) {
            BusState::Uninitialized => vec![0; self.idle_bins],
            BusState::Suspended | BusState::Running => self.snapshot.clone(),
        };
        Some(self.render(&data, time_ms))
    }

    /// Render `data` in the configured style
    pub fn render(&self, data: &[u8], time_ms: f64) -> Frame {
        let opacity = self.opacity.max(0.2);
        let shapes = match self.style {
            VisualizerStyle::Bars => shapes::bars(data, self.viewport, self.sensitivity, opacity),
            VisualizerStyle::Wave => {
                shapes::wave(data, self.viewport, self.sensitivity, opacity, time_ms)
            }
            VisualizerStyle::Circle => {
                shapes::circle(data, self.viewport, self.sensitivity, opacity, 1.0)
            }
        };
        Frame {
            time_ms,
            style: self.style,
            viewport: self.viewport,
            silent: shapes::is_silence(data),
            shapes,
        }
    }
}
