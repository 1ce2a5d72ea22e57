//! Core audio data types
//!
//! Decoded media is held fully in RAM as interleaved stereo f32 at the
//! output sample rate, so seeking and looping are plain index arithmetic.

use crate::playback::media::MediaRef;

/// Fully decoded media, shared between the voices that play it
///
/// **Format:**
/// - Samples are f32 (floating point -1.0 to 1.0)
/// - Stereo interleaved: [L, R, L, R, ...]
/// - Sample rate equals the mixer rate after resampling
#[derive(Debug, Clone)]
pub struct DecodedClip {
    pub media: MediaRef,

    /// PCM samples (interleaved stereo)
    pub samples: Vec<f32>,

    pub sample_rate: u32,
}

impl DecodedClip {
    pub fn new(media: MediaRef, samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            media,
            samples,
            sample_rate,
        }
    }

    /// Number of stereo frames
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Get audio frame at specific frame index
    pub fn frame(&self, index: usize) -> Option<AudioFrame> {
        let i = index * 2;
        if i + 1 < self.samples.len() {
            Some(AudioFrame {
                left: self.samples[i],
                right: self.samples[i + 1],
            })
        } else {
            None
        }
    }
}

/// AudioFrame represents a single stereo sample (one frame of audio).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioFrame {
    pub left: f32,
    pub right: f32,
}

impl AudioFrame {
    /// Create a silent frame (0.0, 0.0)
    pub fn zero() -> Self {
        AudioFrame {
            left: 0.0,
            right: 0.0,
        }
    }

    pub fn from_stereo(left: f32, right: f32) -> Self {
        AudioFrame { left, right }
    }

    /// Apply volume scaling to both channels
    pub fn apply_volume(&mut self, volume: f32) {
        self.left *= volume;
        self.right *= volume;
    }

    /// Add another frame to this frame (for mixing)
    pub fn add(&mut self, other: &AudioFrame) {
        self.left += other.left;
        self.right += other.right;
    }

    /// Clamp samples to valid range [-1.0, 1.0] to prevent clipping
    pub fn clamp(&mut self) {
        self.left = self.left.clamp(-1.0, 1.0);
        self.right = self.right.clamp(-1.0, 1.0);
    }

    /// Average of both channels
    pub fn mono(&self) -> f32 {
        (self.left + self.right) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_duration_and_frames() {
        let clip = DecodedClip::new(MediaRef::new("a.wav"), vec![0.0; 44100 * 2], 44100);
        assert_eq!(clip.frames(), 44100);
        assert_eq!(clip.duration_secs(), 1.0);
    }

    #[test]
    fn test_clip_frame_lookup() {
        let clip = DecodedClip::new(
            MediaRef::new("a.wav"),
            vec![0.1, 0.2, 0.3, 0.4],
            44100,
        );
        assert_eq!(clip.frame(1), Some(AudioFrame::from_stereo(0.3, 0.4)));
        assert!(clip.frame(2).is_none());
    }

    #[test]
    fn test_audio_frame_mixing() {
        let mut frame = AudioFrame::from_stereo(0.5, -0.5);
        frame.apply_volume(0.5);
        frame.add(&AudioFrame::from_stereo(1.0, -1.0));
        frame.clamp();
        assert_eq!(frame, AudioFrame::from_stereo(1.0, -1.0));
        assert!((AudioFrame::from_stereo(0.2, 0.4).mono() - 0.3).abs() < 1e-6);
    }
}
