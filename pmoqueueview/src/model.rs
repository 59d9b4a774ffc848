use serde::{Deserialize, Serialize};

use crate::capabilities::PlaybackSnapshot;
use crate::time_utils::format_duration_ms;

/// One child of a queue, as delivered by the media session browser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub album_art_uri: Option<String>,
    /// Track length in milliseconds, 0 when unknown.
    #[serde(default)]
    pub duration_ms: i64,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subtitle: None,
            album_art_uri: None,
            duration_ms: 0,
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Parses a JSON array of entries, as exported by a browse endpoint.
    pub fn list_from_json(json: &str) -> Result<Vec<CatalogEntry>, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Metadata of the item the session currently considers active.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NowPlaying {
    /// `None` means nothing is playing.
    pub id: Option<String>,
    pub title: Option<String>,
    pub duration_ms: i64,
}

impl NowPlaying {
    pub fn nothing() -> Self {
        Self::default()
    }

    pub fn new(id: impl Into<String>, duration_ms: i64) -> Self {
        Self {
            id: Some(id.into()),
            title: None,
            duration_ms,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }

    /// The session only knows the duration once the item is loaded.
    pub fn has_duration(&self) -> bool {
        self.duration_ms != 0
    }
}

/// A queue entry ready for display.
///
/// Items are values: state changes produce a new item through the `with_*`
/// methods, the id never changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DisplayItem {
    id: String,
    title: String,
    subtitle: Option<String>,
    album_art_uri: Option<String>,
    duration_ms: i64,
    is_playing: bool,
    is_buffering: bool,
}

impl DisplayItem {
    /// Builds the display item for `entry`, flagged against the session's
    /// now-playing item and state.
    pub fn from_entry(entry: CatalogEntry, now_playing: &NowPlaying, state: &PlaybackSnapshot) -> Self {
        let active = now_playing.is(&entry.id);
        Self {
            id: entry.id,
            title: entry.title,
            subtitle: entry.subtitle,
            album_art_uri: entry.album_art_uri,
            duration_ms: entry.duration_ms,
            is_playing: active && state.is_playing_or_buffering(),
            is_buffering: active && state.is_buffering(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subtitle(&self) -> Option<&str> {
        self.subtitle.as_deref()
    }

    pub fn album_art_uri(&self) -> Option<&str> {
        self.album_art_uri.as_deref()
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    pub fn duration_label(&self) -> Option<String> {
        format_duration_ms(self.duration_ms)
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_buffering(&self) -> bool {
        self.is_buffering
    }

    pub fn with_playback(&self, is_playing: bool, is_buffering: bool) -> Self {
        Self {
            is_playing,
            is_buffering,
            ..self.clone()
        }
    }

    pub fn with_duration_ms(&self, duration_ms: i64) -> Self {
        Self {
            duration_ms,
            ..self.clone()
        }
    }
}
