// pmoqueueview/src/capabilities.rs
use std::time::{Duration, Instant};

use serde::Serialize;

/// Logical transport state reported by the media session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    /// No session state received yet.
    None,
    Stopped,
    Paused,
    Playing,
    Buffering,
    /// Session-side failure, carrying the backend message.
    Error(String),
}

impl PlaybackState {
    /// Returns a human-readable label for the playback state.
    pub fn as_str(&self) -> &str {
        match self {
            PlaybackState::None => "NONE",
            PlaybackState::Stopped => "STOPPED",
            PlaybackState::Paused => "PAUSED",
            PlaybackState::Playing => "PLAYING",
            PlaybackState::Buffering => "BUFFERING",
            PlaybackState::Error(s) => s.as_str(),
        }
    }
}

/// Last playback state received from the session, kept verbatim.
///
/// The position is the one reported at `updated_at`; use
/// [`PlaybackSnapshot::current_position_at`] to get the position at a later
/// instant while playback is running.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub position_ms: i64,
    pub speed: f32,
    pub updated_at: Instant,
    pub prepared: bool,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            state: PlaybackState::None,
            position_ms: 0,
            speed: 0.0,
            updated_at: Instant::now(),
            prepared: false,
        }
    }
}

impl PlaybackSnapshot {
    /// Builds a snapshot sampled now. Playing snapshots run at normal speed
    /// and a session that is playing, buffering or paused counts as prepared.
    pub fn new(state: PlaybackState, position_ms: i64) -> Self {
        let speed = if state == PlaybackState::Playing {
            1.0
        } else {
            0.0
        };
        let prepared = matches!(
            state,
            PlaybackState::Playing | PlaybackState::Buffering | PlaybackState::Paused
        );
        Self {
            state,
            position_ms,
            speed,
            updated_at: Instant::now(),
            prepared,
        }
    }

    pub fn with_prepared(mut self, prepared: bool) -> Self {
        self.prepared = prepared;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_updated_at(mut self, updated_at: Instant) -> Self {
        self.updated_at = updated_at;
        self
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_buffering(&self) -> bool {
        self.state == PlaybackState::Buffering
    }

    pub fn is_playing_or_buffering(&self) -> bool {
        self.is_playing() || self.is_buffering()
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// True when a `play` command would resume playback.
    pub fn is_play_enabled(&self) -> bool {
        self.is_paused() || (self.prepared && self.state == PlaybackState::Stopped)
    }

    /// Position at `now`, extrapolated from the last report while playing.
    pub fn current_position_at(&self, now: Instant) -> i64 {
        if !self.is_playing() {
            return self.position_ms;
        }
        let elapsed = now
            .checked_duration_since(self.updated_at)
            .unwrap_or(Duration::ZERO);
        let advance = (elapsed.as_millis() as f64 * self.speed as f64) as i64;
        self.position_ms.saturating_add(advance)
    }

    pub fn current_position(&self) -> i64 {
        self.current_position_at(Instant::now())
    }
}
