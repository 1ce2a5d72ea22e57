//! Audio output using cpal
//!
//! Opens the output device and drives a render callback that fills whole
//! buffers of [`AudioFrame`]s. The stream is built paused; the audio context
//! starts suspended until [`AudioOutput::resume`] is called.
//!
//! [`NullOutput`] drives the same callback from a timer when no device is
//! available or headless operation was requested.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::audio::types::AudioFrame;
use crate::error::{Error, Result};

/// Render callback invoked on the audio thread
pub type RenderCallback = Box<dyn FnMut(&mut [AudioFrame]) + Send + 'static>;

/// Preferred mixer rate
pub const PREFERRED_SAMPLE_RATE: u32 = 44100;

/// Audio output manager using cpal.
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    /// Stream error flag - set by audio callback on error
    error_flag: Arc<AtomicBool>,
    error_count: Arc<AtomicU32>,
}

impl AudioOutput {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open an output device.
    ///
    /// A named device that cannot be found falls back to the default device.
    pub fn open(device_name: Option<&str>, buffer_size: Option<u32>) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => {
                let mut devices = host
                    .output_devices()
                    .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;
                match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                    Some(dev) => {
                        info!("Found requested audio device: {}", name);
                        dev
                    }
                    None => {
                        warn!("Requested device '{}' not found, falling back to default device", name);
                        host.default_output_device().ok_or_else(|| {
                            Error::AudioOutput(format!(
                                "Device '{}' not found and no default device available",
                                name
                            ))
                        })?
                    }
                }
            }
            None => host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?,
        };

        let (mut config, sample_format) = Self::get_best_config(&device)?;
        if let Some(size) = buffer_size {
            config.buffer_size = cpal::BufferSize::Fixed(size);
        }

        info!(
            "Audio device {}: sample_rate={}, channels={}, format={:?}, buffer_size={:?}",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            config.sample_rate.0,
            config.channels,
            sample_format,
            config.buffer_size
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
            error_flag: Arc::new(AtomicBool::new(false)),
            error_count: Arc::new(AtomicU32::new(0)),
        })
    }

    /// Get the best supported configuration for playback.
    ///
    /// Prefers 44.1kHz, stereo, f32 samples (matching our internal format).
    fn get_best_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
        let mut supported_configs = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;

        let preferred = supported_configs.find(|config| {
            config.channels() == 2
                && config.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
                && config.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE
                && config.sample_format() == SampleFormat::F32
        });

        if let Some(supported_config) = preferred {
            let sample_format = supported_config.sample_format();
            let config = supported_config
                .with_sample_rate(cpal::SampleRate(PREFERRED_SAMPLE_RATE))
                .config();
            return Ok((config, sample_format));
        }

        // Fallback: use default config
        let supported_config = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

        let sample_format = supported_config.sample_format();
        let config = supported_config.config();
        Ok((config, sample_format))
    }

    /// Build the stream around `callback`, leaving it paused.
    pub fn start(&mut self, callback: RenderCallback) -> Result<()> {
        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(callback)?,
            SampleFormat::I16 => self.build_stream::<i16>(callback)?,
            SampleFormat::U16 => self.build_stream::<u16>(callback)?,
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        // Some backends start streams on creation
        stream
            .pause()
            .map_err(|e| Error::AudioOutput(format!("Failed to pause new stream: {}", e)))?;
        self.stream = Some(stream);
        debug!("Audio stream built (suspended)");
        Ok(())
    }

    fn build_stream<T>(&self, mut callback: RenderCallback) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = self.config.channels as usize;
        let error_flag = Arc::clone(&self.error_flag);
        let error_count = Arc::clone(&self.error_count);
        let mut scratch: Vec<AudioFrame> = Vec::new();

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels.max(1);
                    scratch.resize(frames, AudioFrame::zero());
                    callback(&mut scratch);

                    for (out, frame) in data.chunks_mut(channels.max(1)).zip(scratch.iter()) {
                        for (ch, sample) in out.iter_mut().enumerate() {
                            let value = match (ch, channels) {
                                (0, 1) => frame.mono(),
                                (0, _) => frame.left,
                                (1, _) => frame.right,
                                _ => 0.0,
                            };
                            *sample = T::from_sample(value.clamp(-1.0, 1.0));
                        }
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_flag.store(true, Ordering::SeqCst);
                    error_count.fetch_add(1, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    /// Start pulling frames from the callback
    pub fn resume(&self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream
                .play()
                .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;
        }
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
        }
        Ok(())
    }

    /// Pause the stream and drop it.
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                warn!("Failed to pause stream on stop: {}", e);
            }
            info!("Audio stream stopped");
        }
    }

    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown".to_string())
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Check if an audio stream error has occurred.
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::SeqCst)
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Device-free output that renders on a fixed period and discards the audio
pub struct NullOutput {
    sample_rate: u32,
    period: Duration,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl NullOutput {
    pub fn new(sample_rate: u32, period: Duration) -> Self {
        Self {
            sample_rate,
            period,
            running: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Spawn the render task on the current tokio runtime
    pub fn start(&mut self, mut callback: RenderCallback) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::AudioOutput(format!("Headless output needs a runtime: {}", e)))?;
        let running = Arc::clone(&self.running);
        let period = self.period;
        let frames_per_tick = ((self.sample_rate as f64 * period.as_secs_f64()).round() as usize).max(1);

        self.task = Some(handle.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Burst);
            let mut scratch = vec![AudioFrame::zero(); frames_per_tick];
            loop {
                interval.tick().await;
                if running.load(Ordering::Relaxed) {
                    callback(&mut scratch);
                }
            }
        }));
        info!("Headless output started at {}Hz", self.sample_rate);
        Ok(())
    }

    pub fn resume(&self) {
        self.running.store(true, Ordering::Relaxed);
    }

    pub fn pause(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Drop for NullOutput {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
