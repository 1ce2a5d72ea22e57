//! Mode enumerations shared between the engine, its configuration and the
//! command surface

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Queue loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Stop at the end of the current track
    #[default]
    None,
    /// Advance through the queue, wrapping at the end
    All,
    /// Repeat the current track
    One,
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopMode::None => write!(f, "none"),
            LoopMode::All => write!(f, "all"),
            LoopMode::One => write!(f, "one"),
        }
    }
}

impl FromStr for LoopMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(LoopMode::None),
            "all" => Ok(LoopMode::All),
            "one" => Ok(LoopMode::One),
            other => Err(Error::InvalidInput(format!("unknown loop mode '{}'", other))),
        }
    }
}

/// Which subset of the library forms the queue
///
/// Serialized as `"all"`, `"favorites"` or `"category:<name>"`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PlaylistFilter {
    #[default]
    All,
    Favorites,
    Category(String),
}

impl fmt::Display for PlaylistFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaylistFilter::All => write!(f, "all"),
            PlaylistFilter::Favorites => write!(f, "favorites"),
            PlaylistFilter::Category(name) => write!(f, "category:{}", name),
        }
    }
}

impl FromStr for PlaylistFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(PlaylistFilter::All),
            "favorites" => Ok(PlaylistFilter::Favorites),
            other => match other.strip_prefix("category:") {
                Some(name) if !name.is_empty() => Ok(PlaylistFilter::Category(name.to_string())),
                _ => Err(Error::InvalidInput(format!("unknown playlist filter '{}'", other))),
            },
        }
    }
}

impl TryFrom<String> for PlaylistFilter {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PlaylistFilter> for String {
    fn from(value: PlaylistFilter) -> Self {
        value.to_string()
    }
}

/// Visualizer drawing style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizerStyle {
    #[default]
    Bars,
    Wave,
    Circle,
}

/// Countdown timer mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    #[default]
    Focus,
    Break,
}

impl TimerMode {
    /// The mode that follows this one once a session completes
    pub fn other(&self) -> Self {
        match self {
            TimerMode::Focus => TimerMode::Break,
            TimerMode::Break => TimerMode::Focus,
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerMode::Focus => write!(f, "focus"),
            TimerMode::Break => write!(f, "break"),
        }
    }
}
