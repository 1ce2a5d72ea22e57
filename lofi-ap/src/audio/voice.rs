//! Mixer-backed media element
//!
//! The foreground half of a mixer voice. Transport calls lock the mixer just
//! long enough to update the voice; sources are decoded synchronously through
//! the shared clip cache.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::audio::clip_cache::ClipCache;
use crate::audio::mixer::{Mixer, VoiceId, VoiceState};
use crate::playback::media::{MediaElement, MediaError, MediaRef};

#[derive(Clone)]
pub struct MixerVoice {
    id: VoiceId,
    mixer: Arc<Mutex<Mixer>>,
    cache: Rc<RefCell<ClipCache>>,
}

impl MixerVoice {
    pub(crate) fn new(id: VoiceId, mixer: Arc<Mutex<Mixer>>, cache: Rc<RefCell<ClipCache>>) -> Self {
        Self { id, mixer, cache }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, Mixer> {
        self.mixer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read<T>(&self, default: T, f: impl FnOnce(&VoiceState) -> T) -> T {
        self.lock().voice(self.id).map_or(default, f)
    }

    fn write(&self, f: impl FnOnce(&mut VoiceState)) {
        if let Some(voice) = self.lock().voice_mut(self.id) {
            f(voice);
        }
    }
}

impl MediaElement for MixerVoice {
    fn media(&self) -> Option<MediaRef> {
        self.read(None, |v| v.clip.as_ref().map(|c| c.media.clone()))
    }

    fn set_source(&mut self, media: &MediaRef) -> Result<(), MediaError> {
        let clip = self.cache.borrow_mut().load(media)?;
        self.write(|v| {
            v.clip = Some(clip);
            v.cursor = 0;
            v.playing = false;
            v.ended = false;
        });
        debug!("Voice {:?} loaded {}", self.id, media);
        Ok(())
    }

    fn play(&mut self) -> Result<(), MediaError> {
        let mut mixer = self.lock();
        if !mixer.is_running() {
            return Err(MediaError::PlaybackRejected("audio output suspended".to_string()));
        }
        let voice = mixer
            .voice_mut(self.id)
            .ok_or_else(|| MediaError::PlaybackRejected("voice released".to_string()))?;
        let clip = voice
            .clip
            .as_ref()
            .ok_or_else(|| MediaError::PlaybackRejected("no source loaded".to_string()))?;
        if voice.ended || voice.cursor >= clip.frames() {
            voice.cursor = 0;
            voice.ended = false;
        }
        voice.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.write(|v| v.playing = false);
    }

    fn is_paused(&self) -> bool {
        self.read(true, |v| !v.playing)
    }

    fn ended(&self) -> bool {
        self.read(false, |v| v.ended)
    }

    fn current_time(&self) -> f64 {
        self.read(0.0, |v| v.position_secs())
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.write(|v| v.seek_secs(seconds));
    }

    fn duration(&self) -> Option<f64> {
        self.read(None, |v| v.duration_secs())
    }

    fn volume(&self) -> f32 {
        self.read(0.0, |v| v.volume)
    }

    fn set_volume(&mut self, volume: f32) {
        self.write(|v| v.volume = volume.clamp(0.0, 1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::{AudioFrame, DecodedClip};

    fn voice_with_clip(frames: usize) -> (MixerVoice, Arc<Mutex<Mixer>>) {
        let mixer = Arc::new(Mutex::new(Mixer::new(100, None)));
        let id = mixer.lock().unwrap().add_voice();
        let voice = MixerVoice::new(id, Arc::clone(&mixer), Rc::new(RefCell::new(ClipCache::new(100))));
        mixer.lock().unwrap().voice_mut(id).unwrap().clip = Some(Arc::new(DecodedClip::new(
            MediaRef::new("clip.wav"),
            vec![0.1; frames * 2],
            100,
        )));
        (voice, mixer)
    }

    #[test]
    fn test_play_rejected_while_suspended() {
        let (mut voice, mixer) = voice_with_clip(10);
        assert!(matches!(voice.play(), Err(MediaError::PlaybackRejected(_))));
        assert!(voice.is_paused());

        mixer.lock().unwrap().set_running(true);
        voice.play().unwrap();
        assert!(!voice.is_paused());
    }

    #[test]
    fn test_play_after_end_restarts() {
        let (mut voice, mixer) = voice_with_clip(10);
        mixer.lock().unwrap().set_running(true);
        voice.play().unwrap();

        let mut out = vec![AudioFrame::zero(); 20];
        mixer.lock().unwrap().render(&mut out);
        assert!(voice.ended());
        assert!(voice.is_paused());
        assert!((voice.current_time() - 0.1).abs() < 1e-9);

        voice.play().unwrap();
        assert!(!voice.ended());
        assert_eq!(voice.current_time(), 0.0);
    }

    #[test]
    fn test_transport_reflects_mixer_state() {
        let (mut voice, _mixer) = voice_with_clip(200);
        assert_eq!(voice.media(), Some(MediaRef::new("clip.wav")));
        assert_eq!(voice.duration(), Some(2.0));

        voice.set_current_time(1.5);
        assert!((voice.current_time() - 1.5).abs() < 1e-9);
        voice.set_current_time(10.0);
        assert_eq!(voice.current_time(), 2.0);

        voice.set_volume(1.5);
        assert_eq!(voice.volume(), 1.0);
    }

    #[test]
    fn test_failed_source_keeps_previous_clip() {
        let (mut voice, _mixer) = voice_with_clip(10);
        let result = voice.set_source(&MediaRef::new("/nonexistent/track.mp3"));
        assert!(result.is_err());
        assert_eq!(voice.media(), Some(MediaRef::new("clip.wav")));
    }
}
