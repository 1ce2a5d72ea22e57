//! Native audio host
//!
//! Owns the mixer, the output stream, the clip cache and the analysis bus.
//! The output is opened lazily on first use and starts suspended; a device
//! that cannot be opened degrades to the headless output instead of failing
//! the caller.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lofi_common::config::{AnalysisSettings, OutputSettings};
use tracing::{debug, info, warn};

use crate::audio::analysis::{analysis_bus, Analyser};
use crate::audio::clip_cache::ClipCache;
use crate::audio::mixer::Mixer;
use crate::audio::output::{AudioOutput, NullOutput, RenderCallback, PREFERRED_SAMPLE_RATE};
use crate::audio::voice::MixerVoice;
use crate::error::Result;
use crate::playback::media::{AudioHost, BusState};

/// Render period of the headless output
const HEADLESS_PERIOD: Duration = Duration::from_millis(20);

enum Backend {
    /// Nothing opened yet
    Unopened,
    Device(AudioOutput),
    Headless(NullOutput),
}

pub struct AudioSubsystem {
    settings: OutputSettings,
    mixer: Arc<Mutex<Mixer>>,
    cache: Rc<RefCell<ClipCache>>,
    analyser: Analyser,
    backend: Backend,
    analysis_connected: bool,
}

impl AudioSubsystem {
    pub fn new(output: OutputSettings, analysis: &AnalysisSettings) -> Self {
        let (tap, analyser) = analysis_bus(analysis);
        Self {
            settings: output,
            mixer: Arc::new(Mutex::new(Mixer::new(PREFERRED_SAMPLE_RATE, Some(tap)))),
            cache: Rc::new(RefCell::new(ClipCache::new(PREFERRED_SAMPLE_RATE))),
            analyser,
            backend: Backend::Unopened,
            analysis_connected: false,
        }
    }

    /// Number of frequency bins in a snapshot
    pub fn bin_count(&self) -> usize {
        self.analyser.bin_count()
    }

    pub fn sample_rate(&self) -> u32 {
        self.lock_mixer().sample_rate()
    }

    pub fn is_running(&self) -> bool {
        self.lock_mixer().is_running()
    }

    pub fn is_headless(&self) -> bool {
        matches!(self.backend, Backend::Headless(_))
    }

    fn lock_mixer(&self) -> std::sync::MutexGuard<'_, Mixer> {
        self.mixer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn render_callback(&self) -> RenderCallback {
        let mixer = Arc::clone(&self.mixer);
        Box::new(move |out| {
            mixer.lock().unwrap_or_else(|e| e.into_inner()).render(out);
        })
    }

    /// Open the output if it is not open yet
    fn ensure_output(&mut self) {
        if !matches!(self.backend, Backend::Unopened) {
            return;
        }

        if !self.settings.headless {
            match self.open_device() {
                Ok(output) => {
                    self.set_sample_rate(output.sample_rate());
                    info!("Audio output ready on {}", output.device_name());
                    self.backend = Backend::Device(output);
                    return;
                }
                Err(e) => warn!("Audio device unavailable, continuing headless: {}", e),
            }
        }

        let rate = self.settings.headless_sample_rate.max(1);
        self.set_sample_rate(rate);
        self.backend = Backend::Headless(self.start_headless(rate));
    }

    fn start_headless(&self, rate: u32) -> NullOutput {
        let mut output = NullOutput::new(rate, HEADLESS_PERIOD);
        if let Err(e) = output.start(self.render_callback()) {
            warn!("Headless output not driven: {}", e);
        }
        output
    }

    /// Swap a failed device stream for the headless output
    ///
    /// The mixer rate is kept so loaded clips stay valid; a running context
    /// keeps running.
    fn check_device(&mut self) {
        let Backend::Device(output) = &self.backend else {
            return;
        };
        if !output.has_error() {
            return;
        }
        warn!(
            "Audio device {} reported {} stream errors, continuing headless",
            output.device_name(),
            output.error_count()
        );
        let rate = self.sample_rate();
        let headless = self.start_headless(rate);
        if self.is_running() {
            headless.resume();
        }
        self.backend = Backend::Headless(headless);
    }

    fn open_device(&self) -> Result<AudioOutput> {
        let mut output = AudioOutput::open(self.settings.device.as_deref(), self.settings.buffer_size)?;
        output.start(self.render_callback())?;
        Ok(output)
    }

    fn set_sample_rate(&mut self, rate: u32) {
        self.lock_mixer().set_sample_rate(rate);
        self.cache.borrow_mut().set_sample_rate(rate);
    }

    /// Suspend the output; voices keep their positions
    pub fn suspend(&mut self) {
        match &self.backend {
            Backend::Device(output) => {
                if let Err(e) = output.pause() {
                    warn!("Failed to suspend output: {}", e);
                }
            }
            Backend::Headless(output) => output.pause(),
            Backend::Unopened => return,
        }
        self.lock_mixer().set_running(false);
        debug!("Audio output suspended");
    }
}

impl AudioHost for AudioSubsystem {
    type Element = MixerVoice;

    fn create_element(&mut self) -> MixerVoice {
        self.ensure_output();
        let id = self.lock_mixer().add_voice();
        MixerVoice::new(id, Arc::clone(&self.mixer), Rc::clone(&self.cache))
    }

    fn connect_analysis(&mut self, element: &MixerVoice) {
        let mut mixer = self.lock_mixer();
        if let Some(voice) = mixer.voice_mut(element.id()) {
            if !voice.connected {
                voice.connected = true;
                debug!("Voice {:?} connected to analysis", element.id());
            }
        }
        drop(mixer);
        self.analysis_connected = true;
    }

    fn resume(&mut self) {
        self.ensure_output();
        self.check_device();
        if self.is_running() {
            return;
        }
        match &self.backend {
            Backend::Device(output) => {
                if let Err(e) = output.resume() {
                    warn!("Failed to resume output: {}", e);
                    return;
                }
            }
            Backend::Headless(output) => output.resume(),
            Backend::Unopened => return,
        }
        self.lock_mixer().set_running(true);
        info!("Audio output resumed");
    }

    fn fill_snapshot(&mut self, buffer: &mut [u8]) -> BusState {
        if !self.analysis_connected {
            return BusState::Uninitialized;
        }
        self.check_device();
        let running = self.is_running();
        if running {
            self.analyser.update();
        }
        self.analyser.copy_into(buffer);
        if running {
            BusState::Running
        } else {
            BusState::Suspended
        }
    }

    fn play_alarm(&mut self) {
        self.resume();
        self.lock_mixer().start_alarm();
        debug!("Alarm chime started");
    }
}
