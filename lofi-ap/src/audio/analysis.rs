//! Shared frequency analysis bus
//!
//! The mixer pushes the mono mix of every connected voice into an
//! [`AnalysisTap`]; the foreground [`Analyser`] drains it into a rolling
//! window of the last `fft_size` samples and produces byte magnitudes on
//! demand.
//!
//! Magnitudes follow the usual analyser-node recipe:
//! - Blackman window over the last `fft_size` samples
//! - |X[k]| / N, smoothed over time with `s = τ·s_prev + (1 − τ)·|X[k]|`
//! - converted to dB and mapped linearly from `min_db..max_db` onto `0..=255`

use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::Arc;

use lofi_common::config::AnalysisSettings;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Producer half of the analysis bus, owned by the mixer
///
/// Samples that do not fit are dropped; the analyser only ever needs the
/// most recent window.
pub struct AnalysisTap {
    producer: HeapProd<f32>,
}

impl AnalysisTap {
    pub fn push(&mut self, sample: f32) {
        let _ = self.producer.try_push(sample);
    }
}

/// Create a connected tap/analyser pair
pub fn analysis_bus(settings: &AnalysisSettings) -> (AnalysisTap, Analyser) {
    // A few windows of slack between foreground drains
    let rb = HeapRb::<f32>::new(settings.fft_size.max(2) * 16);
    let (producer, consumer) = rb.split();
    (AnalysisTap { producer }, Analyser::new(settings, consumer))
}

pub struct Analyser {
    fft_size: usize,
    smoothing: f32,
    min_db: f32,
    max_db: f32,

    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,

    consumer: HeapCons<f32>,
    history: VecDeque<f32>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
}

impl Analyser {
    fn new(settings: &AnalysisSettings, consumer: HeapCons<f32>) -> Self {
        let fft_size = settings.fft_size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let bins = fft_size / 2;

        Self {
            fft_size,
            smoothing: settings.smoothing.clamp(0.0, 1.0),
            min_db: settings.min_db,
            max_db: settings.max_db,
            fft,
            window: blackman_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            consumer,
            history: VecDeque::from(vec![0.0; fft_size]),
            smoothed: vec![0.0; bins],
            bytes: vec![0; bins],
        }
    }

    /// Number of frequency bins (half the FFT size)
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Latest byte magnitudes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Pull pending samples from the tap and recompute the magnitudes
    pub fn update(&mut self) {
        while let Some(sample) = self.consumer.try_pop() {
            self.history.push_back(sample);
        }
        while self.history.len() > self.fft_size {
            self.history.pop_front();
        }

        for (i, (slot, &sample)) in self.buffer.iter_mut().zip(self.history.iter()).enumerate() {
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        let scale = 1.0 / self.fft_size as f32;
        let range = self.max_db - self.min_db;
        for k in 0..self.bin_count() {
            let magnitude = self.buffer[k].norm() * scale;
            let s = self.smoothing * self.smoothed[k] + (1.0 - self.smoothing) * magnitude;
            // Keep denormals out of the smoothing state
            self.smoothed[k] = if s.is_finite() && s > f32::MIN_POSITIVE { s } else { 0.0 };
            self.bytes[k] = to_byte(self.smoothed[k], self.min_db, range);
        }
    }

    /// Copy the latest magnitudes into `out`, zero-padding any excess
    pub fn copy_into(&self, out: &mut [u8]) {
        let n = out.len().min(self.bytes.len());
        out[..n].copy_from_slice(&self.bytes[..n]);
        out[n..].fill(0);
    }
}

fn blackman_window(n: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            A0 - A1 * (2.0 * PI * x).cos() + A2 * (4.0 * PI * x).cos()
        })
        .collect()
}

fn to_byte(magnitude: f32, min_db: f32, range: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = (255.0 / range) * (db - min_db);
    scaled.floor().clamp(0.0, 255.0) as u8
}
