//! Procedural alarm chime
//!
//! A short C-major-seventh cluster of sine partials, synthesized on the fly.
//! Each partial has a 50 ms linear attack to its peak, then decays
//! exponentially to 0.001 at its duration and retires.

use std::f64::consts::TAU;

/// One sine partial of the chime
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Partial {
    pub frequency: f64,
    pub peak_gain: f32,
    pub duration: f64,
}

/// C5, G5, B5, C6
pub const ALARM_PARTIALS: [Partial; 4] = [
    Partial {
        frequency: 523.25,
        peak_gain: 0.2,
        duration: 2.5,
    },
    Partial {
        frequency: 783.99,
        peak_gain: 0.15,
        duration: 2.0,
    },
    Partial {
        frequency: 987.77,
        peak_gain: 0.05,
        duration: 1.8,
    },
    Partial {
        frequency: 1046.50,
        peak_gain: 0.05,
        duration: 1.5,
    },
];

pub const ATTACK_SECS: f64 = 0.05;
pub const DECAY_FLOOR: f32 = 0.001;

/// Oscillator plus envelope for one partial
#[derive(Debug, Clone)]
pub struct AlarmVoice {
    partial: Partial,
    /// Seconds to wait before the attack starts
    start_offset: f64,
    sample_rate: u32,
    elapsed_frames: u64,
}

impl AlarmVoice {
    pub fn new(partial: Partial, start_offset: f64, sample_rate: u32) -> Self {
        Self {
            partial,
            start_offset: start_offset.max(0.0),
            sample_rate: sample_rate.max(1),
            elapsed_frames: 0,
        }
    }

    pub fn partial(&self) -> &Partial {
        &self.partial
    }

    /// Envelope gain `t` seconds after the voice started
    pub fn gain_at(&self, t: f64) -> f32 {
        let p = &self.partial;
        if t < 0.0 || t >= p.duration {
            return 0.0;
        }
        if t < ATTACK_SECS {
            return p.peak_gain * (t / ATTACK_SECS) as f32;
        }
        let span = (p.duration - ATTACK_SECS).max(f64::EPSILON);
        let progress = (t - ATTACK_SECS) / span;
        let ratio = (DECAY_FLOOR / p.peak_gain) as f64;
        (p.peak_gain as f64 * ratio.powf(progress)) as f32
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed_secs() >= self.start_offset + self.partial.duration
    }

    fn elapsed_secs(&self) -> f64 {
        self.elapsed_frames as f64 / self.sample_rate as f64
    }

    /// Next mono sample, `None` once the envelope has finished
    pub fn next_sample(&mut self) -> Option<f32> {
        if self.is_finished() {
            return None;
        }
        let t = self.elapsed_secs() - self.start_offset;
        self.elapsed_frames += 1;
        if t < 0.0 {
            return Some(0.0);
        }
        let phase = TAU * self.partial.frequency * t;
        Some(phase.sin() as f32 * self.gain_at(t))
    }
}

/// All partials of one alarm, starting together
pub fn alarm_voices(sample_rate: u32) -> Vec<AlarmVoice> {
    ALARM_PARTIALS
        .iter()
        .map(|&partial| AlarmVoice::new(partial, 0.0, sample_rate))
        .collect()
}
