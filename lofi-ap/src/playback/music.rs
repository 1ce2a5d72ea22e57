//! Music player
//!
//! Couples a [`CrossfadeEngine`] with the [`Sequencer`] and [`Library`]:
//! transport commands resolve a track id, the track's media is hard-switched
//! into the engine, and natural ends are routed back through the sequencer.
//!
//! Loop mode `one` never reaches the sequencer; it maps to
//! [`Continuation::Loop`] so the engine wraps around with a timed crossfade.

use std::time::Instant;

use lofi_common::events::{EngineEvent, PlaybackState, TrackChangeReason};
use lofi_common::{LoopMode, PlaylistFilter, TrackId};
use tracing::{debug, info, warn};

use super::crossfade::{Continuation, CrossfadeEngine, PlayerEvent, Position};
use super::library::Library;
use super::media::{MediaElement, MediaRef};
use super::sequencer::{Direction, EndAction, PreviousAction, Sequencer};
use crate::error::{Error, Result};

const SOURCE: &str = "music";

pub struct MusicPlayer<M: MediaElement> {
    player: CrossfadeEngine<M>,
    sequencer: Sequencer,
    library: Library,
    filter: Option<PlaylistFilter>,
    restart_threshold: f64,
    outbox: Vec<EngineEvent>,
}

impl<M: MediaElement> MusicPlayer<M> {
    /// Build the player with the whole library queued and the first track
    /// loaded but paused
    pub fn new(
        player: CrossfadeEngine<M>,
        sequencer: Sequencer,
        library: Library,
        restart_threshold: f64,
    ) -> Self {
        let mut music = Self {
            player,
            sequencer,
            library,
            filter: Some(PlaylistFilter::All),
            restart_threshold,
            outbox: Vec::new(),
        };
        let ids = music.library.filter(&PlaylistFilter::All);
        if let Some(first) = music.sequencer.set_queue(ids) {
            music.load_track(&first, TrackChangeReason::Selected);
        }
        music
    }

    pub fn engine(&self) -> &CrossfadeEngine<M> {
        &self.player
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn filter(&self) -> Option<&PlaylistFilter> {
        self.filter.as_ref()
    }

    pub fn current(&self) -> Option<&TrackId> {
        self.sequencer.current()
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    pub fn position(&self) -> Position {
        self.player.position()
    }

    pub fn volume(&self) -> f32 {
        self.player.volume()
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn play(&mut self) {
        let was_playing = self.player.is_playing();
        self.player.play();
        if !was_playing {
            self.state_changed(PlaybackState::Paused, PlaybackState::Playing);
        }
    }

    pub fn pause(&mut self) {
        let was_playing = self.player.is_playing();
        self.player.pause();
        if was_playing {
            self.state_changed(PlaybackState::Playing, PlaybackState::Paused);
        }
    }

    pub fn seek(&mut self, seconds: f64) {
        self.player.seek(seconds);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.player.set_volume(volume);
        self.outbox.push(EngineEvent::VolumeChanged {
            source: SOURCE.to_string(),
            volume: self.player.volume(),
        });
    }

    pub fn next(&mut self) {
        match self.sequencer.step(Direction::Next) {
            Some(id) => self.load_track(&id, TrackChangeReason::Next),
            None => debug!("next ignored, queue is empty"),
        }
    }

    /// Restart the current track when more than the threshold has elapsed,
    /// otherwise step back
    pub fn prev(&mut self) {
        let elapsed = self.player.position().current_time;
        match self.sequencer.previous(elapsed, self.restart_threshold) {
            Some(PreviousAction::Restart) => {
                self.player.seek(0.0);
                if let Some(id) = self.sequencer.current().cloned() {
                    debug!(track = %id, elapsed, "prev restarts current track");
                    self.outbox.push(EngineEvent::TrackRestarted { track_id: id });
                }
            }
            Some(PreviousAction::Switch(id)) => self.load_track(&id, TrackChangeReason::Previous),
            None => debug!("prev ignored, queue is empty"),
        }
    }

    /// Hard-switch to `id` and start playing it
    pub fn select_track(&mut self, id: &TrackId) -> Result<()> {
        if self.library.get(id).is_none() {
            return Err(Error::NotFound(format!("track '{}'", id)));
        }
        self.sequencer.set_current(id.clone());
        self.load_track(id, TrackChangeReason::Selected);
        self.play();
        Ok(())
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.sequencer.set_loop_mode(mode);
        let continuation = match mode {
            LoopMode::One => Continuation::Loop,
            LoopMode::None | LoopMode::All => Continuation::Advance,
        };
        self.player.set_continuation(continuation);
        self.outbox.push(EngineEvent::LoopModeChanged { mode });
    }

    pub fn toggle_shuffle(&mut self) {
        let enabled = self.sequencer.toggle_shuffle();
        self.outbox.push(EngineEvent::ShuffleChanged { enabled });
    }

    /// Replace the queue with explicit ids; unknown ids are dropped
    pub fn set_queue(&mut self, ids: Vec<TrackId>) {
        let (known, unknown): (Vec<_>, Vec<_>) =
            ids.into_iter().partition(|id| self.library.get(id).is_some());
        if !unknown.is_empty() {
            warn!(?unknown, "Ignoring unknown track ids in queue");
        }
        self.filter = None;
        self.replace_queue(known);
    }

    /// Rebuild the queue from a library filter
    pub fn apply_filter(&mut self, filter: PlaylistFilter) {
        let ids = self.library.filter(&filter);
        info!(%filter, tracks = ids.len(), "Applying playlist filter");
        self.filter = Some(filter);
        self.replace_queue(ids);
    }

    pub fn toggle_favorite(&mut self, id: &TrackId) -> Result<()> {
        let favorite = self
            .library
            .toggle_favorite(id)
            .ok_or_else(|| Error::NotFound(format!("track '{}'", id)))?;
        self.outbox.push(EngineEvent::FavoriteToggled {
            track_id: id.clone(),
            favorite,
        });
        Ok(())
    }

    pub fn poll(&mut self, now: Instant) {
        for event in self.player.poll(now) {
            match event {
                PlayerEvent::CrossfadeStarted => self.outbox.push(EngineEvent::CrossfadeStarted {
                    source: SOURCE.to_string(),
                }),
                PlayerEvent::CrossfadeCompleted => {
                    self.outbox.push(EngineEvent::CrossfadeCompleted {
                        source: SOURCE.to_string(),
                    })
                }
                PlayerEvent::WatchdogNudge => self.outbox.push(EngineEvent::WatchdogNudge {
                    source: SOURCE.to_string(),
                }),
                PlayerEvent::Ended => self.on_track_end(),
            }
        }
    }

    fn on_track_end(&mut self) {
        if let Some(id) = self.sequencer.current().cloned() {
            self.outbox.push(EngineEvent::TrackEnded { track_id: id });
        }
        match self.sequencer.on_track_end() {
            EndAction::Continue(id) => self.load_track(&id, TrackChangeReason::Ended),
            EndAction::Pause => self.pause(),
            EndAction::Repeat => {}
        }
    }

    fn replace_queue(&mut self, ids: Vec<TrackId>) {
        let length = ids.len();
        let forced = self.sequencer.set_queue(ids);
        self.outbox.push(EngineEvent::QueueReplaced {
            filter: self.filter.clone(),
            length,
        });
        if let Some(id) = forced {
            self.load_track(&id, TrackChangeReason::FilterChanged);
        }
    }

    /// Hard-switch the engine to `id`; playback state is kept
    fn load_track(&mut self, id: &TrackId, reason: TrackChangeReason) {
        let Some(track) = self.library.get(id).cloned() else {
            warn!(track = %id, "Track missing from library");
            return;
        };
        let media = MediaRef::new(track.url.clone());
        match self.player.load(&media) {
            Ok(()) => {
                info!(track = %id, title = %track.title, ?reason, "Track changed");
                self.outbox.push(EngineEvent::TrackChanged {
                    track_id: id.clone(),
                    title: track.title,
                    reason,
                });
            }
            Err(e) => self.outbox.push(EngineEvent::MediaLoadFailed {
                source: SOURCE.to_string(),
                media: media.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn state_changed(&mut self, old_state: PlaybackState, new_state: PlaybackState) {
        self.outbox.push(EngineEvent::PlaybackStateChanged {
            source: SOURCE.to_string(),
            old_state,
            new_state,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::crossfade::CrossfadeConfig;
    use crate::playback::media::AudioHost;
    use crate::playback::simulated::{SimulatedHost, SimulatedMedia};
    use lofi_common::catalog::default_tracks;

    fn music(host: &mut SimulatedHost) -> MusicPlayer<SimulatedMedia> {
        let a = host.create_element();
        let b = host.create_element();
        let engine = CrossfadeEngine::new(SOURCE, CrossfadeConfig::default(), a, b, 0.5);
        MusicPlayer::new(engine, Sequencer::with_seed(3), Library::new(default_tracks()), 3.0)
    }

    #[test]
    fn test_first_track_loaded_paused() {
        let mut host = SimulatedHost::new();
        let mut m = music(&mut host);
        assert_eq!(m.current(), Some(&TrackId::new("1")));
        assert!(!m.is_playing());
        assert_eq!(
            m.engine().media(),
            Some(MediaRef::new("music/midnight-study.mp3"))
        );
        assert!(matches!(
            m.drain_events().as_slice(),
            [EngineEvent::TrackChanged { .. }]
        ));
    }

    #[test]
    fn test_select_track_auto_plays() {
        let mut host = SimulatedHost::new();
        let mut m = music(&mut host);
        m.select_track(&TrackId::new("3")).unwrap();
        assert!(m.is_playing());
        assert!(!m.engine().active_slot().is_paused());
        assert_eq!(m.current(), Some(&TrackId::new("3")));
    }

    #[test]
    fn test_select_unknown_track_is_rejected() {
        let mut host = SimulatedHost::new();
        let mut m = music(&mut host);
        assert!(matches!(
            m.select_track(&TrackId::new("99")),
            Err(Error::NotFound(_))
        ));
        assert_eq!(m.current(), Some(&TrackId::new("1")));
    }

    #[test]
    fn test_prev_restart_keeps_identity() {
        let mut host = SimulatedHost::new();
        let mut m = music(&mut host);
        m.select_track(&TrackId::new("2")).unwrap();
        host.advance(10.0);

        m.prev();
        assert_eq!(m.current(), Some(&TrackId::new("2")));
        assert_eq!(m.position().current_time, 0.0);

        m.prev();
        assert_eq!(m.current(), Some(&TrackId::new("1")));
    }

    #[test]
    fn test_category_filter_switches_when_current_missing() {
        let mut host = SimulatedHost::new();
        let mut m = music(&mut host);
        m.select_track(&TrackId::new("2")).unwrap();
        m.drain_events();

        m.apply_filter(PlaylistFilter::Category("lofi".to_string()));
        assert_eq!(m.current(), Some(&TrackId::new("1")));
        assert!(m.is_playing());
        let events = m.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::TrackChanged {
                reason: TrackChangeReason::FilterChanged,
                ..
            }
        )));
    }

    #[test]
    fn test_empty_favorites_filter_keeps_current() {
        let mut host = SimulatedHost::new();
        let mut m = music(&mut host);
        m.select_track(&TrackId::new("2")).unwrap();

        m.apply_filter(PlaylistFilter::Favorites);
        assert_eq!(m.current(), Some(&TrackId::new("2")));
        assert!(m.sequencer().queue().is_empty());
        assert!(m.is_playing());
    }

    #[test]
    fn test_loop_none_pauses_at_end() {
        let mut host = SimulatedHost::new();
        host.set_duration("music/midnight-study.mp3", 4.0);
        let mut m = music(&mut host);
        m.play();

        let start = Instant::now();
        m.poll(start);
        host.advance(3.9);
        m.poll(start + std::time::Duration::from_millis(3900));

        assert!(!m.is_playing());
        assert_eq!(m.current(), Some(&TrackId::new("1")));
    }

    #[test]
    fn test_loop_one_maps_to_engine_loop() {
        let mut host = SimulatedHost::new();
        let mut m = music(&mut host);
        m.set_loop_mode(LoopMode::One);
        assert_eq!(m.engine().continuation(), Continuation::Loop);
        m.set_loop_mode(LoopMode::All);
        assert_eq!(m.engine().continuation(), Continuation::Advance);
    }
}
