//! Playback engine facade
//!
//! Owns the audio host and everything that plays through it: the music
//! player, the ambient loops, the visualizer and the countdown timer.
//! Commands come in through [`PlaybackEngine::apply`]; everything the engine
//! has to say goes out through its [`EventBus`].
//!
//! The engine never spawns timers. The driver loop calls
//! [`PlaybackEngine::poll`] for crossfade steps and the watchdog,
//! [`PlaybackEngine::on_tick`] once per second for the countdown and
//! [`PlaybackEngine::render_frame`] per animation frame.

use std::time::{Duration, Instant};

use lofi_common::events::{EngineEvent, EventBus, PlaybackState, StatusReport};
use lofi_common::{AmbientSound, Settings, Track};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::ambient::AmbientLoops;
use super::crossfade::{CrossfadeConfig, CrossfadeEngine};
use super::library::Library;
use super::media::AudioHost;
use super::music::MusicPlayer;
use super::sequencer::Sequencer;
use super::slot::SlotId;
use crate::control::Command;
use crate::error::Result;
use crate::timer::{Countdown, TimerSignal};
use crate::visualizer::{Frame, Visualizer};

/// Event channel capacity
const EVENT_CAPACITY: usize = 256;

pub struct PlaybackEngine<H: AudioHost> {
    host: H,
    music: MusicPlayer<H::Element>,
    ambient: AmbientLoops<H::Element>,
    visualizer: Visualizer,
    countdown: Countdown,
    events: EventBus,
    analysis_connected: bool,
}

impl<H: AudioHost> PlaybackEngine<H> {
    /// Build the engine with the whole library queued and nothing playing
    pub fn new(settings: &Settings, host: H) -> Self {
        Self::with_sequencer(settings, host, Sequencer::new())
    }

    /// Build with a caller-provided sequencer (seeded shuffle in tests)
    pub fn with_sequencer(settings: &Settings, mut host: H, sequencer: Sequencer) -> Self {
        let watchdog = Duration::from_millis(settings.watchdog_interval_ms);

        let tracks: Vec<Track> = settings
            .tracks
            .iter()
            .map(|t| Track {
                url: settings.resolve_media(&t.url),
                ..t.clone()
            })
            .collect();
        let sounds: Vec<AmbientSound> = settings
            .ambient_sounds
            .iter()
            .map(|s| AmbientSound {
                name: s.name.clone(),
                url: settings.resolve_media(&s.url),
            })
            .collect();

        let player = CrossfadeEngine::new(
            "music",
            CrossfadeConfig::music(&settings.music, watchdog),
            host.create_element(),
            host.create_element(),
            settings.music.volume,
        );
        let music = MusicPlayer::new(
            player,
            sequencer,
            Library::new(tracks),
            settings.music.restart_threshold_secs,
        );
        let ambient = AmbientLoops::new(
            sounds,
            CrossfadeConfig::ambient(&settings.ambient, watchdog),
            settings.ambient.volume,
        );

        let mut engine = Self {
            host,
            music,
            ambient,
            visualizer: Visualizer::new(&settings.visualizer, settings.analysis.fft_size / 2),
            countdown: Countdown::new(&settings.timer),
            events: EventBus::new(EVENT_CAPACITY),
            analysis_connected: false,
        };
        info!(
            tracks = engine.music.library().tracks().len(),
            ambient_sounds = engine.ambient.sounds().len(),
            "Playback engine ready"
        );
        engine.flush();
        engine
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn music(&self) -> &MusicPlayer<H::Element> {
        &self.music
    }

    pub fn ambient(&self) -> &AmbientLoops<H::Element> {
        &self.ambient
    }

    pub fn visualizer(&self) -> &Visualizer {
        &self.visualizer
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    /// Apply a command, reporting failures as `CommandRejected`
    pub fn handle(&mut self, command: Command) {
        debug!(?command, "Command received");
        if let Err(e) = self.apply(command) {
            warn!("Command rejected: {}", e);
            self.events.emit_lossy(EngineEvent::CommandRejected {
                reason: e.to_string(),
            });
        }
        self.flush();
    }

    pub fn apply(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Play => self.play(),
            Command::Pause => self.music.pause(),
            Command::Toggle => {
                if self.music.is_playing() {
                    self.music.pause();
                } else {
                    self.play();
                }
            }
            Command::Next => self.music.next(),
            Command::Prev => self.music.prev(),
            Command::Seek { seconds } => self.music.seek(seconds),
            Command::Volume { value } => self.music.set_volume(value),
            Command::LoopMode { mode } => self.music.set_loop_mode(mode),
            Command::ToggleShuffle => self.music.toggle_shuffle(),
            Command::SetQueue { ids } => self.music.set_queue(ids),
            Command::SelectTrack { id } => {
                self.wake_audio();
                self.music.select_track(&id)?;
            }
            Command::Filter { filter } => self.music.apply_filter(filter),
            Command::ToggleFavorite { id } => self.music.toggle_favorite(&id)?,
            Command::AmbientToggle { key } => {
                self.wake_audio();
                self.ambient.toggle(&mut self.host, &key)?;
            }
            Command::AmbientVolume { value } => self.ambient.set_volume(value),
            Command::Alarm => self.trigger_alarm(),
            Command::Visualizer { style, sensitivity } => {
                let style = style.unwrap_or(self.visualizer.style());
                let sensitivity = sensitivity.unwrap_or(self.visualizer.sensitivity());
                self.visualizer.configure(style, sensitivity);
                self.events.emit_lossy(EngineEvent::VisualizerConfigured {
                    style: self.visualizer.style(),
                    sensitivity: self.visualizer.sensitivity(),
                });
            }
            Command::TimerStart => self.countdown.start(),
            Command::TimerPause => self.countdown.pause(),
            Command::TimerReset => {
                self.countdown.reset();
                self.emit_timer_state();
            }
            Command::TimerMode { mode } => {
                self.countdown.set_mode(mode);
                self.emit_timer_state();
            }
            Command::Status => {
                let report = self.status();
                self.events.emit_lossy(EngineEvent::Status(report));
            }
        }
        Ok(())
    }

    /// User-initiated play: wake the audio context first
    pub fn play(&mut self) {
        self.wake_audio();
        self.music.play();
    }

    fn wake_audio(&mut self) {
        self.host.resume();
        if !self.analysis_connected {
            self.host.connect_analysis(self.music.engine().slot(SlotId::A));
            self.host.connect_analysis(self.music.engine().slot(SlotId::B));
            self.analysis_connected = true;
            debug!("Music connected to analysis bus");
        }
    }

    pub fn trigger_alarm(&mut self) {
        self.host.play_alarm();
        info!("Alarm triggered");
        self.events.emit_lossy(EngineEvent::AlarmTriggered);
    }

    /// Advance crossfades, cooldowns and watchdogs
    pub fn poll(&mut self, now: Instant) {
        self.music.poll(now);
        self.ambient.poll(now);
        self.flush();
    }

    /// One countdown tick
    pub fn on_tick(&mut self) {
        let Some(signal) = self.countdown.tick() else {
            return;
        };
        let event = match signal {
            TimerSignal::Tick { mode, remaining_secs } => EngineEvent::TimerTick { mode, remaining_secs },
            TimerSignal::Completed { mode } => {
                self.events.emit_lossy(EngineEvent::TimerCompleted { mode });
                self.trigger_alarm();
                return;
            }
            TimerSignal::Cooldown { remaining_secs } => EngineEvent::TimerCooldown { remaining_secs },
            TimerSignal::ModeStarted { mode, duration_secs } => {
                EngineEvent::TimerModeStarted { mode, duration_secs }
            }
        };
        self.events.emit_lossy(event);
    }

    /// Render a visualizer frame if one is due
    pub fn render_frame(&mut self, time_ms: f64) -> Option<Frame> {
        self.visualizer.tick(&mut self.host, time_ms)
    }

    pub fn status(&self) -> StatusReport {
        let position = self.music.position();
        StatusReport {
            music_state: if self.music.is_playing() {
                PlaybackState::Playing
            } else {
                PlaybackState::Paused
            },
            track_id: self.music.current().cloned(),
            position_secs: position.current_time,
            duration_secs: position.duration,
            volume: self.music.volume(),
            loop_mode: self.music.sequencer().loop_mode(),
            shuffle: self.music.sequencer().shuffle(),
            queue_length: self.music.sequencer().queue().len(),
            ambient_enabled: self.ambient.enabled_keys(),
            ambient_volume: self.ambient.volume(),
            timer_mode: self.countdown.mode(),
            timer_remaining_secs: self.countdown.remaining_secs(),
            timer_running: self.countdown.is_running(),
        }
    }

    fn emit_timer_state(&self) {
        self.events.emit_lossy(EngineEvent::TimerTick {
            mode: self.countdown.mode(),
            remaining_secs: self.countdown.remaining_secs(),
        });
    }

    /// Publish everything the players produced since the last flush
    fn flush(&mut self) {
        for event in self.music.drain_events().into_iter().chain(self.ambient.drain_events()) {
            self.events.emit_lossy(event);
        }
    }
}
