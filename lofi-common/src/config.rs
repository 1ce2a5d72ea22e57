//! Configuration loading and config file resolution
//!
//! Every field has a compiled default, so a missing file or a partial file
//! degrades to defaults instead of failing startup. A file that exists but
//! does not parse or validate is an error.

use crate::catalog::{default_ambient_sounds, default_tracks, AmbientSound, Track};
use crate::shared_types::VisualizerStyle;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable consulted when no `--config` argument is given
pub const CONFIG_ENV_VAR: &str = "LOFI_CONFIG";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory that relative media references are resolved against
    pub media_root: PathBuf,
    /// Tracing filter directive (overrides the built-in default)
    pub log_level: Option<String>,
    /// Keep-alive watchdog period for every crossfade player
    pub watchdog_interval_ms: u64,
    pub music: MusicSettings,
    pub ambient: AmbientSettings,
    pub analysis: AnalysisSettings,
    pub visualizer: VisualizerSettings,
    pub timer: TimerSettings,
    pub output: OutputSettings,
    pub tracks: Vec<Track>,
    pub ambient_sounds: Vec<AmbientSound>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            media_root: default_media_root(),
            log_level: None,
            watchdog_interval_ms: 3000,
            music: MusicSettings::default(),
            ambient: AmbientSettings::default(),
            analysis: AnalysisSettings::default(),
            visualizer: VisualizerSettings::default(),
            timer: TimerSettings::default(),
            output: OutputSettings::default(),
            tracks: default_tracks(),
            ambient_sounds: default_ambient_sounds(),
        }
    }
}

/// Music player crossfade and transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicSettings {
    pub crossfade_secs: f64,
    pub steps: u32,
    pub settle_floor: f32,
    pub settle_ratio: f32,
    pub cooldown_ms: u64,
    /// `prev` restarts the current track when elapsed time exceeds this
    pub restart_threshold_secs: f64,
    /// Remaining time at which a non-looping track counts as ended
    pub end_threshold_secs: f64,
    pub volume: f32,
}

impl Default for MusicSettings {
    fn default() -> Self {
        Self {
            crossfade_secs: 3.0,
            steps: 30,
            settle_floor: 0.01,
            settle_ratio: 0.99,
            cooldown_ms: 500,
            restart_threshold_secs: 3.0,
            end_threshold_secs: 0.2,
            volume: 0.5,
        }
    }
}

/// Ambient loop crossfade settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientSettings {
    pub crossfade_secs: f64,
    pub steps: u32,
    pub settle_floor: f32,
    pub settle_ratio: f32,
    pub cooldown_ms: u64,
    pub volume: f32,
}

impl Default for AmbientSettings {
    fn default() -> Self {
        Self {
            crossfade_secs: 2.0,
            steps: 20,
            settle_floor: 0.01,
            settle_ratio: 0.9,
            cooldown_ms: 500,
            volume: 0.3,
        }
    }
}

/// Frequency analyser settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub fft_size: usize,
    pub smoothing: f32,
    pub min_db: f32,
    pub max_db: f32,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            fft_size: 256,
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

/// Visualizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerSettings {
    pub fps: u32,
    pub style: VisualizerStyle,
    pub sensitivity: f32,
    pub opacity: f32,
    /// Buffer length used while the analysis bus is still uninitialized
    pub idle_bins: usize,
}

impl Default for VisualizerSettings {
    fn default() -> Self {
        Self {
            fps: 45,
            style: VisualizerStyle::Bars,
            sensitivity: 1.0,
            opacity: 0.9,
            idle_bins: 128,
        }
    }
}

/// Focus/break countdown settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerSettings {
    pub focus_minutes: u32,
    pub break_minutes: u32,
    pub cooldown_secs: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            break_minutes: 5,
            cooldown_secs: 5,
        }
    }
}

/// Audio output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Output device name (None = default device)
    pub device: Option<String>,
    /// Output buffer size in frames (None = device default)
    pub buffer_size: Option<u32>,
    /// Drive the mixer without an audio device
    pub headless: bool,
    /// Sample rate used by the headless output
    pub headless_sample_rate: u32,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            device: None,
            buffer_size: None,
            headless: false,
            headless_sample_rate: 44100,
        }
    }
}

impl Settings {
    /// Load and validate settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.music.steps == 0 || self.ambient.steps == 0 {
            return Err(Error::Config("crossfade steps must be at least 1".to_string()));
        }
        if self.music.crossfade_secs <= 0.0 || self.ambient.crossfade_secs <= 0.0 {
            return Err(Error::Config("crossfade window must be positive".to_string()));
        }
        for (name, volume) in [("music", self.music.volume), ("ambient", self.ambient.volume)] {
            if !(0.0..=1.0).contains(&volume) {
                return Err(Error::Config(format!("{} volume {} outside 0.0..=1.0", name, volume)));
            }
        }
        let fft = self.analysis.fft_size;
        if !fft.is_power_of_two() || !(32..=32768).contains(&fft) {
            return Err(Error::Config(format!(
                "fft_size {} must be a power of two between 32 and 32768",
                fft
            )));
        }
        if self.analysis.min_db >= self.analysis.max_db {
            return Err(Error::Config("analysis min_db must be below max_db".to_string()));
        }
        if !(0.0..1.0).contains(&self.analysis.smoothing) {
            return Err(Error::Config("analysis smoothing must be in 0.0..1.0".to_string()));
        }
        if self.visualizer.fps == 0 {
            return Err(Error::Config("visualizer fps must be positive".to_string()));
        }
        if self.timer.focus_minutes == 0 || self.timer.break_minutes == 0 {
            return Err(Error::Config("timer durations must be positive".to_string()));
        }

        let mut seen = HashSet::new();
        for track in &self.tracks {
            if !seen.insert(&track.id) {
                return Err(Error::Config(format!("duplicate track id '{}'", track.id)));
            }
        }
        Ok(())
    }

    /// Resolve a media reference against `media_root`
    ///
    /// Absolute paths and URLs with a scheme are returned unchanged.
    pub fn resolve_media(&self, reference: &str) -> String {
        if reference.contains("://") || Path::new(reference).is_absolute() {
            reference.to_string()
        } else {
            self.media_root.join(reference).to_string_lossy().into_owned()
        }
    }
}

/// Config file resolution following the priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Per-user config directory
pub struct ConfigResolver {
    cli_arg: Option<PathBuf>,
    env_var_name: String,
}

impl ConfigResolver {
    pub fn new(cli_arg: Option<PathBuf>, env_var_name: &str) -> Self {
        Self {
            cli_arg,
            env_var_name: env_var_name.to_string(),
        }
    }

    /// Candidate config path, if any source names one
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_arg {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        default_config_path().filter(|p| p.exists())
    }

    /// Load settings from the resolved path
    ///
    /// A path that does not exist logs a warning and yields defaults.
    pub fn load(&self) -> Result<(Settings, Option<PathBuf>)> {
        match self.resolve() {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                let settings = Settings::load(&path)?;
                Ok((settings, Some(path)))
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Ok((Settings::default(), None))
            }
            None => {
                info!("No config file found, using compiled defaults");
                Ok((Settings::default(), None))
            }
        }
    }
}

/// Per-user config file location (`<config dir>/lofi/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lofi").join("config.toml"))
}

/// OS-dependent default media folder
fn default_media_root() -> PathBuf {
    dirs::audio_dir()
        .or_else(dirs::data_local_dir)
        .map(|d| d.join("lofi"))
        .unwrap_or_else(|| PathBuf::from("./lofi_media"))
}
