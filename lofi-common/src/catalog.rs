//! Media catalog entries
//!
//! Tracks and ambient sounds are referenced by opaque URL; the catalog only
//! knows identities, display metadata and where the media lives.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Track identifier
///
/// Identifiers are compared by value; queue order is tracked separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TrackId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Music track in the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    #[serde(default)]
    pub artist: String,
    pub url: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Ambient loop (rain, cafe chatter, keyboard clicks)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbientSound {
    pub name: String,
    pub url: String,
}

/// Built-in track list used when the configuration does not provide one
pub fn default_tracks() -> Vec<Track> {
    let track = |id: &str, title: &str, artist: &str, file: &str, category: &str| Track {
        id: TrackId::new(id),
        title: title.to_string(),
        artist: artist.to_string(),
        url: format!("music/{}", file),
        category: Some(category.to_string()),
    };

    vec![
        track("1", "Midnight Study", "Lofi Beats", "midnight-study.mp3", "lofi"),
        track("2", "Coffee Shop Vibes", "Chill Hop", "coffee-shop.mp3", "chill"),
        track("3", "Rainy Day Focus", "Study Sounds", "rainy-day.mp3", "lofi"),
        track("4", "Sunset Dreams", "Ambient Waves", "sunset-dreams.mp3", "ambient"),
    ]
}

/// Built-in ambient sounds used when the configuration does not provide any
pub fn default_ambient_sounds() -> Vec<AmbientSound> {
    ["Rain", "Keyboard", "Cafe"]
        .iter()
        .map(|name| AmbientSound {
            name: name.to_string(),
            url: format!("sounds/{}.mp3", name.to_lowercase()),
        })
        .collect()
}
