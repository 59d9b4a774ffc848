use std::time::Duration;

use pmoconfig::Config;
use tracing::warn;

use crate::catalog::PreviousBoundary;
use crate::errors::QueueViewError;
use crate::ticker::DEFAULT_POSITION_POLL_INTERVAL;

pub const DEFAULT_LAST_PLAYED_KEY: &str = "last_played_id";

/// Tunables of a queue view model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueViewSettings {
    /// Period of the position poller. Zero disables it.
    pub position_poll_interval: Duration,
    pub previous_boundary: PreviousBoundary,
    /// Preference key holding the id of the last played item.
    pub last_played_key: String,
}

impl Default for QueueViewSettings {
    fn default() -> Self {
        Self {
            position_poll_interval: DEFAULT_POSITION_POLL_INTERVAL,
            previous_boundary: PreviousBoundary::default(),
            last_played_key: DEFAULT_LAST_PLAYED_KEY.to_string(),
        }
    }
}

impl QueueViewSettings {
    /// Reads the `queue_view` section, falling back to defaults for missing
    /// or malformed values.
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();

        let position_poll_interval = config
            .get_position_poll_interval_ms()
            .map(|ms| Duration::from_millis(ms as u64))
            .unwrap_or(defaults.position_poll_interval);

        let previous_boundary = match config.get_previous_boundary() {
            Ok(raw) => PreviousBoundary::parse(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "Unknown queue_view.previous_boundary, using default");
                defaults.previous_boundary
            }),
            Err(_) => defaults.previous_boundary,
        };

        let last_played_key = config
            .get_last_played_key()
            .unwrap_or(defaults.last_played_key);

        Self {
            position_poll_interval,
            previous_boundary,
            last_played_key,
        }
    }

    pub fn with_position_poll_interval(mut self, interval: Duration) -> Self {
        self.position_poll_interval = interval;
        self
    }

    pub fn with_previous_boundary(mut self, boundary: PreviousBoundary) -> Self {
        self.previous_boundary = boundary;
        self
    }

    pub fn validate(&self) -> Result<(), QueueViewError> {
        if self.last_played_key.trim().is_empty() {
            return Err(QueueViewError::Config(
                "last_played_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
