//! Real-time mixer
//!
//! Shared between the foreground (voices change transport state) and the
//! output thread (renders frames). Every voice is a fully decoded clip plus a
//! frame cursor; alarm partials are summed on top. While the output is
//! suspended nothing advances, matching a suspended audio context.

use std::sync::Arc;

use tracing::trace;

use crate::audio::alarm::{alarm_voices, AlarmVoice};
use crate::audio::analysis::AnalysisTap;
use crate::audio::types::{AudioFrame, DecodedClip};

/// Index of a voice inside the mixer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(usize);

/// Transport state of one voice
#[derive(Debug, Default)]
pub struct VoiceState {
    pub clip: Option<Arc<DecodedClip>>,
    /// Next frame to render
    pub cursor: usize,
    pub playing: bool,
    /// Cursor ran off the end of the clip
    pub ended: bool,
    pub volume: f32,
    /// Feeds the analysis tap
    pub connected: bool,
}

impl VoiceState {
    fn new() -> Self {
        Self {
            volume: 1.0,
            ..Self::default()
        }
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.clip.as_ref().map(|c| c.duration_secs())
    }

    pub fn position_secs(&self) -> f64 {
        match &self.clip {
            Some(clip) if clip.sample_rate > 0 => self.cursor as f64 / clip.sample_rate as f64,
            _ => 0.0,
        }
    }

    /// Move the cursor, clamped to the clip
    pub fn seek_secs(&mut self, seconds: f64) {
        if let Some(clip) = &self.clip {
            let frame = (seconds.max(0.0) * clip.sample_rate as f64).round() as usize;
            self.cursor = frame.min(clip.frames());
            self.ended = false;
        }
    }

    fn next_frame(&mut self) -> Option<AudioFrame> {
        if !self.playing {
            return None;
        }
        let clip = self.clip.as_ref()?;
        match clip.frame(self.cursor) {
            Some(mut frame) => {
                self.cursor += 1;
                frame.apply_volume(self.volume);
                Some(frame)
            }
            None => {
                self.playing = false;
                self.ended = true;
                None
            }
        }
    }
}

pub struct Mixer {
    sample_rate: u32,
    voices: Vec<VoiceState>,
    alarms: Vec<AlarmVoice>,
    tap: Option<AnalysisTap>,
    running: bool,
}

impl Mixer {
    pub fn new(sample_rate: u32, tap: Option<AnalysisTap>) -> Self {
        Self {
            sample_rate,
            voices: Vec::new(),
            alarms: Vec::new(),
            tap,
            running: false,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Output rate, fixed once the device is open and before any clip loads
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn add_voice(&mut self) -> VoiceId {
        self.voices.push(VoiceState::new());
        VoiceId(self.voices.len() - 1)
    }

    pub fn voice(&self, id: VoiceId) -> Option<&VoiceState> {
        self.voices.get(id.0)
    }

    pub fn voice_mut(&mut self, id: VoiceId) -> Option<&mut VoiceState> {
        self.voices.get_mut(id.0)
    }

    pub fn active_alarms(&self) -> usize {
        self.alarms.len()
    }

    /// Layer a fresh set of alarm partials on top of whatever is playing
    pub fn start_alarm(&mut self) {
        self.alarms.extend(alarm_voices(self.sample_rate));
        trace!("Alarm started, {} partials active", self.alarms.len());
    }

    /// Fill `out` with the next frames of the mix
    pub fn render(&mut self, out: &mut [AudioFrame]) {
        if !self.running {
            out.fill(AudioFrame::zero());
            return;
        }

        for slot in out.iter_mut() {
            let mut mix = AudioFrame::zero();
            let mut analysed = 0.0f32;

            for voice in self.voices.iter_mut() {
                if let Some(frame) = voice.next_frame() {
                    if voice.connected {
                        analysed += frame.mono();
                    }
                    mix.add(&frame);
                }
            }

            for alarm in self.alarms.iter_mut() {
                if let Some(sample) = alarm.next_sample() {
                    mix.add(&AudioFrame::from_stereo(sample, sample));
                }
            }

            if let Some(tap) = self.tap.as_mut() {
                tap.push(analysed);
            }

            mix.clamp();
            *slot = mix;
        }

        self.alarms.retain(|a| !a.is_finished());
    }
}
