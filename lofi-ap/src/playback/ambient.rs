//! Ambient sound loops
//!
//! Each ambient sound gets its own [`CrossfadeEngine`] in loop mode, created
//! the first time the sound is enabled and kept (paused) when disabled.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use lofi_common::events::EngineEvent;
use lofi_common::AmbientSound;
use tracing::{debug, info};

use super::crossfade::{Continuation, CrossfadeConfig, CrossfadeEngine, PlayerEvent};
use super::media::{AudioHost, MediaElement, MediaRef};
use crate::error::{Error, Result};

/// All ambient loops sharing one volume
pub struct AmbientLoops<M: MediaElement> {
    sounds: Vec<AmbientSound>,
    players: BTreeMap<String, CrossfadeEngine<M>>,
    enabled: BTreeSet<String>,
    volume: f32,
    config: CrossfadeConfig,
    outbox: Vec<EngineEvent>,
}

impl<M: MediaElement> AmbientLoops<M> {
    pub fn new(sounds: Vec<AmbientSound>, config: CrossfadeConfig, volume: f32) -> Self {
        Self {
            sounds,
            players: BTreeMap::new(),
            enabled: BTreeSet::new(),
            volume: volume.clamp(0.0, 1.0),
            config,
            outbox: Vec::new(),
        }
    }

    pub fn sounds(&self) -> &[AmbientSound] {
        &self.sounds
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Keys of the enabled loops, sorted
    pub fn enabled_keys(&self) -> Vec<String> {
        self.enabled.iter().cloned().collect()
    }

    pub fn is_enabled(&self, key: &str) -> bool {
        self.resolve(key)
            .is_some_and(|sound| self.enabled.contains(&sound_key(sound)))
    }

    pub fn player(&self, key: &str) -> Option<&CrossfadeEngine<M>> {
        let sound = self.resolve(key)?;
        self.players.get(&sound_key(sound))
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Find a sound by exact name (case-insensitive), then by substring
    pub fn resolve(&self, key: &str) -> Option<&AmbientSound> {
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        self.sounds
            .iter()
            .find(|s| s.name.to_lowercase() == key)
            .or_else(|| self.sounds.iter().find(|s| s.name.to_lowercase().contains(&key)))
    }

    /// Enable or disable a loop and return its new state
    pub fn toggle<H>(&mut self, host: &mut H, key: &str) -> Result<bool>
    where
        H: AudioHost<Element = M>,
    {
        let sound = self
            .resolve(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("ambient sound '{}'", key)))?;
        let key = sound_key(&sound);

        if self.enabled.remove(&key) {
            if let Some(player) = self.players.get_mut(&key) {
                player.pause();
            }
            info!(ambient = %key, "Ambient loop disabled");
            self.outbox.push(EngineEvent::AmbientToggled { key, enabled: false });
            return Ok(false);
        }

        if !self.players.contains_key(&key) {
            let media = MediaRef::new(sound.url.clone());
            let mut player = CrossfadeEngine::new(
                format!("ambient:{}", key),
                self.config.clone(),
                host.create_element(),
                host.create_element(),
                self.volume,
            );
            player.set_continuation(Continuation::Loop);
            if let Err(e) = player.load(&media) {
                self.outbox.push(EngineEvent::MediaLoadFailed {
                    source: format!("ambient:{}", key),
                    media: media.to_string(),
                    reason: e.to_string(),
                });
                return Ok(false);
            }
            debug!(ambient = %key, media = %media, "Created ambient player");
            self.players.insert(key.clone(), player);
        }

        if let Some(player) = self.players.get_mut(&key) {
            player.play();
        }
        self.enabled.insert(key.clone());
        info!(ambient = %key, "Ambient loop enabled");
        self.outbox.push(EngineEvent::AmbientToggled { key, enabled: true });
        Ok(true)
    }

    /// Shared gain for every loop; running crossfades are retargeted
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        for player in self.players.values_mut() {
            player.set_volume(self.volume);
        }
        self.outbox.push(EngineEvent::VolumeChanged {
            source: "ambient".to_string(),
            volume: self.volume,
        });
    }

    pub fn poll(&mut self, now: Instant) {
        for (key, player) in self.players.iter_mut() {
            for event in player.poll(now) {
                let source = format!("ambient:{}", key);
                let event = match event {
                    PlayerEvent::CrossfadeStarted => EngineEvent::CrossfadeStarted { source },
                    PlayerEvent::CrossfadeCompleted => EngineEvent::CrossfadeCompleted { source },
                    PlayerEvent::WatchdogNudge => EngineEvent::WatchdogNudge { source },
                    // Loops never advance
                    PlayerEvent::Ended => continue,
                };
                self.outbox.push(event);
            }
        }
    }
}

fn sound_key(sound: &AmbientSound) -> String {
    sound.name.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::simulated::{SimulatedHost, SimulatedMedia};
    use lofi_common::catalog::default_ambient_sounds;
    use lofi_common::config::AmbientSettings;
    use std::time::Duration;

    fn loops() -> AmbientLoops<SimulatedMedia> {
        let config = CrossfadeConfig::ambient(&AmbientSettings::default(), Duration::from_secs(3));
        AmbientLoops::new(default_ambient_sounds(), config, 0.3)
    }

    #[test]
    fn test_resolve_exact_then_substring() {
        let loops = loops();
        assert_eq!(loops.resolve("RAIN").map(|s| s.name.as_str()), Some("Rain"));
        assert_eq!(loops.resolve("key").map(|s| s.name.as_str()), Some("Keyboard"));
        assert!(loops.resolve("thunder").is_none());
        assert!(loops.resolve("").is_none());
    }

    #[test]
    fn test_toggle_twice_restores_state() {
        let mut host = SimulatedHost::new();
        let mut loops = loops();

        assert!(loops.toggle(&mut host, "rain").unwrap());
        assert!(loops.is_enabled("rain"));
        assert_eq!(loops.enabled_keys(), vec!["rain".to_string()]);
        let player = loops.player("rain").unwrap();
        assert!(!player.active_slot().is_paused());
        assert_eq!(player.continuation(), Continuation::Loop);

        assert!(!loops.toggle(&mut host, "rain").unwrap());
        assert!(!loops.is_enabled("rain"));
        assert!(loops.player("rain").unwrap().active_slot().is_paused());
        assert!(loops.enabled_keys().is_empty());
    }

    #[test]
    fn test_player_created_once() {
        let mut host = SimulatedHost::new();
        let mut loops = loops();
        loops.toggle(&mut host, "cafe").unwrap();
        loops.toggle(&mut host, "cafe").unwrap();
        loops.toggle(&mut host, "cafe").unwrap();
        assert_eq!(host.elements().len(), 2);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut host = SimulatedHost::new();
        let mut loops = loops();
        assert!(matches!(
            loops.toggle(&mut host, "thunder"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_load_failure_leaves_loop_disabled() {
        let mut host = SimulatedHost::new();
        host.fail_media("sounds/rain.mp3");
        let mut loops = loops();
        assert!(!loops.toggle(&mut host, "rain").unwrap());
        assert!(!loops.is_enabled("rain"));
        assert!(matches!(
            loops.drain_events().as_slice(),
            [EngineEvent::MediaLoadFailed { .. }]
        ));
    }

    #[test]
    fn test_volume_applies_to_every_loop() {
        let mut host = SimulatedHost::new();
        let mut loops = loops();
        loops.toggle(&mut host, "rain").unwrap();
        loops.toggle(&mut host, "cafe").unwrap();

        loops.set_volume(0.6);
        assert_eq!(loops.player("rain").unwrap().active_slot().volume(), 0.6);
        assert_eq!(loops.player("cafe").unwrap().active_slot().volume(), 0.6);
    }
}
