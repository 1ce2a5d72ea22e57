//! lofi-ap runtime configuration
//!
//! Settings come from the TOML file found by [`ConfigResolver`] (CLI path,
//! then `LOFI_CONFIG`, then the per-user config directory), falling back to
//! compiled defaults. Command-line flags override the file.

use std::path::PathBuf;

use lofi_common::config::{ConfigResolver, CONFIG_ENV_VAR};
use lofi_common::Settings;

use crate::error::{Error, Result};

/// Filter used when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "lofi_ap=info,lofi_common=info";

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub device: Option<String>,
    pub headless: bool,
    pub media_root: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    /// File the settings were read from, `None` for compiled defaults
    pub source: Option<PathBuf>,
}

impl Config {
    pub fn load(config_path: Option<PathBuf>, overrides: Overrides) -> Result<Self> {
        let (settings, source) = ConfigResolver::new(config_path, CONFIG_ENV_VAR).load()?;
        Self::from_settings(settings, source, overrides)
    }

    pub fn from_settings(mut settings: Settings, source: Option<PathBuf>, overrides: Overrides) -> Result<Self> {
        if let Some(device) = overrides.device {
            settings.output.device = Some(device);
        }
        if overrides.headless {
            settings.output.headless = true;
        }
        if let Some(root) = overrides.media_root {
            settings.media_root = root;
        }
        settings
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self { settings, source })
    }

    /// Tracing filter directive from the config, or the default
    pub fn log_filter(&self) -> String {
        self.settings
            .log_level
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win_over_file_values() {
        let mut settings = Settings::default();
        settings.output.device = Some("Speakers".to_string());

        let config = Config::from_settings(
            settings,
            None,
            Overrides {
                device: Some("Headphones".to_string()),
                headless: true,
                media_root: Some(PathBuf::from("/srv/lofi")),
            },
        )
        .unwrap();
        assert_eq!(config.settings.output.device.as_deref(), Some("Headphones"));
        assert!(config.settings.output.headless);
        assert_eq!(config.settings.media_root, PathBuf::from("/srv/lofi"));
    }

    #[test]
    fn test_log_filter_defaults() {
        let config = Config::from_settings(Settings::default(), None, Overrides::default()).unwrap();
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);

        let mut settings = Settings::default();
        settings.log_level = Some("debug".to_string());
        let config = Config::from_settings(settings, None, Overrides::default()).unwrap();
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = Settings::default();
        settings.music.steps = 0;
        let result = Config::from_settings(settings, None, Overrides::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
