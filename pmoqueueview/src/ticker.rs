//! Position polling support.
//!
//! The view model worker owns a `crossbeam_channel::tick` timer; on every
//! tick it samples the cached playback snapshot and hands the value to a
//! [`PositionSampler`], which only lets changes through.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, never, tick};

use crate::capabilities::PlaybackSnapshot;

pub const DEFAULT_POSITION_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Change detection for the published position.
#[derive(Clone, Debug, Default)]
pub struct PositionSampler {
    last_published: Option<i64>,
}

impl PositionSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value to publish, or `None` when it did not change.
    pub fn sample(&mut self, position_ms: i64) -> Option<i64> {
        if self.last_published == Some(position_ms) {
            return None;
        }
        self.last_published = Some(position_ms);
        Some(position_ms)
    }

    pub fn sample_snapshot(&mut self, snapshot: &PlaybackSnapshot, now: Instant) -> Option<i64> {
        self.sample(snapshot.current_position_at(now))
    }

    pub fn last_published(&self) -> Option<i64> {
        self.last_published
    }
}

/// Periodic timer channel; a zero interval disables polling.
pub fn position_timer(interval: Duration) -> Receiver<Instant> {
    if interval.is_zero() {
        never()
    } else {
        tick(interval)
    }
}
