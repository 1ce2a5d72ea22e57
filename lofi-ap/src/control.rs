//! Command surface
//!
//! One JSON object per line on stdin, tagged by `cmd`:
//!
//! ```json
//! {"cmd":"next"}
//! {"cmd":"volume","value":0.4}
//! {"cmd":"ambient_toggle","key":"rain"}
//! {"cmd":"filter","filter":"category:lofi"}
//! ```

use lofi_common::{LoopMode, PlaylistFilter, TimerMode, TrackId, VisualizerStyle};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Play,
    Pause,
    /// Play when paused, pause when playing
    Toggle,
    Next,
    Prev,
    Seek { seconds: f64 },
    Volume { value: f32 },
    LoopMode { mode: LoopMode },
    ToggleShuffle,
    SetQueue { ids: Vec<TrackId> },
    SelectTrack { id: TrackId },
    Filter { filter: PlaylistFilter },
    ToggleFavorite { id: TrackId },
    AmbientToggle { key: String },
    AmbientVolume { value: f32 },
    Alarm,
    Visualizer {
        #[serde(default)]
        style: Option<VisualizerStyle>,
        #[serde(default)]
        sensitivity: Option<f32>,
    },
    TimerStart,
    TimerPause,
    TimerReset,
    TimerMode { mode: TimerMode },
    Status,
}

impl Command {
    /// Parse one input line; blank lines yield `None`
    pub fn parse_line(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(line).map(Some).map_err(Error::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unit_and_struct_commands() {
        assert_eq!(Command::parse_line(r#"{"cmd":"next"}"#).unwrap(), Some(Command::Next));
        assert_eq!(
            Command::parse_line(r#"{"cmd":"volume","value":0.4}"#).unwrap(),
            Some(Command::Volume { value: 0.4 })
        );
        assert_eq!(
            Command::parse_line(r#"{"cmd":"loop_mode","mode":"all"}"#).unwrap(),
            Some(Command::LoopMode { mode: LoopMode::All })
        );
        assert_eq!(
            Command::parse_line(r#"{"cmd":"filter","filter":"category:lofi"}"#).unwrap(),
            Some(Command::Filter {
                filter: PlaylistFilter::Category("lofi".to_string())
            })
        );
    }

    #[test]
    fn test_visualizer_fields_are_optional() {
        assert_eq!(
            Command::parse_line(r#"{"cmd":"visualizer","style":"circle"}"#).unwrap(),
            Some(Command::Visualizer {
                style: Some(VisualizerStyle::Circle),
                sensitivity: None
            })
        );
    }

    #[test]
    fn test_blank_and_malformed_lines() {
        assert_eq!(Command::parse_line("   ").unwrap(), None);
        assert!(matches!(Command::parse_line("{\"cmd\":\"launch\"}"), Err(Error::Json(_))));
        assert!(matches!(Command::parse_line("not json"), Err(Error::Json(_))));
    }
}
