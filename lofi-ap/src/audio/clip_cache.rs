//! Decoded clip cache
//!
//! Both slots of a crossfade player usually hold the same track, so clips are
//! decoded once and shared. Entries nobody references any more are dropped on
//! the next load.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::audio::decode::decode_file;
use crate::audio::resampler::resample_stereo;
use crate::audio::types::DecodedClip;
use crate::playback::media::{MediaError, MediaRef};

pub struct ClipCache {
    sample_rate: u32,
    clips: HashMap<MediaRef, Arc<DecodedClip>>,
}

impl ClipCache {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            clips: HashMap::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Clips decoded at the old rate are discarded
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        if sample_rate != self.sample_rate {
            self.clips.clear();
            self.sample_rate = sample_rate;
        }
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Fetch a clip, decoding and resampling it on a miss
    pub fn load(&mut self, media: &MediaRef) -> Result<Arc<DecodedClip>, MediaError> {
        self.clips.retain(|_, clip| Arc::strong_count(clip) > 1);

        if let Some(clip) = self.clips.get(media) {
            return Ok(Arc::clone(clip));
        }

        let path = local_path(media)?;
        let failed = |reason: String| MediaError::LoadFailed {
            media: media.to_string(),
            reason,
        };

        let decoded = decode_file(&path).map_err(|e| failed(e.to_string()))?;
        let samples = resample_stereo(decoded.samples, decoded.sample_rate, self.sample_rate)
            .map_err(|e| failed(e.to_string()))?;

        let clip = Arc::new(DecodedClip::new(media.clone(), samples, self.sample_rate));
        info!(
            "Loaded {} ({:.1}s at {}Hz)",
            media,
            clip.duration_secs(),
            self.sample_rate
        );
        self.clips.insert(media.clone(), Arc::clone(&clip));
        debug!("Clip cache holds {} entries", self.clips.len());
        Ok(clip)
    }
}

/// Map a media reference to a filesystem path
///
/// Plain paths and `file://` URLs are accepted; any other scheme is not.
fn local_path(media: &MediaRef) -> Result<PathBuf, MediaError> {
    let reference = media.as_str();
    if let Some(path) = reference.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if reference.contains("://") {
        return Err(MediaError::Unsupported(reference.to_string()));
    }
    Ok(PathBuf::from(reference))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path_forms() {
        assert_eq!(
            local_path(&MediaRef::new("file:///music/a.mp3")).unwrap(),
            PathBuf::from("/music/a.mp3")
        );
        assert_eq!(
            local_path(&MediaRef::new("music/a.mp3")).unwrap(),
            PathBuf::from("music/a.mp3")
        );
        assert!(matches!(
            local_path(&MediaRef::new("https://cdn.example.com/a.mp3")),
            Err(MediaError::Unsupported(_))
        ));
    }

    #[test]
    fn test_missing_file_fails_to_load() {
        let mut cache = ClipCache::new(44100);
        let result = cache.load(&MediaRef::new("/nonexistent/rain.mp3"));
        assert!(matches!(result, Err(MediaError::LoadFailed { .. })));
        assert!(cache.is_empty());
    }
}
