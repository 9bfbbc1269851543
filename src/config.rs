//! Configuration for the commit pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpillwayError};

/// Configuration for [`CommitPipeline`](crate::pipeline::CommitPipeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of entries that closes a window.
    pub window_size: usize,

    /// Maximum age of an open window before it is closed.
    #[serde(with = "duration_ms")]
    pub window_timeout: Duration,

    /// Maximum number of closed windows awaiting dispatch.
    pub pending_capacity: usize,

    /// Maximum number of window dispatches in flight at once.
    pub max_in_flight: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: 1000,
            window_timeout: Duration::from_secs(3),
            pending_capacity: 512,
            max_in_flight: 256,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON document.
    ///
    /// Missing fields take their default values, durations are milliseconds.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the window size threshold.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Set the window time threshold.
    pub fn with_window_timeout(mut self, timeout: Duration) -> Self {
        self.window_timeout = timeout;
        self
    }

    /// Set the pending queue capacity.
    pub fn with_pending_capacity(mut self, capacity: usize) -> Self {
        self.pending_capacity = capacity;
        self
    }

    /// Set the dispatch concurrency limit.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Check that every threshold is usable.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(SpillwayError::invalid_config("window_size must be > 0"));
        }
        if self.window_timeout.is_zero() {
            return Err(SpillwayError::invalid_config("window_timeout must be > 0"));
        }
        if self.pending_capacity == 0 {
            return Err(SpillwayError::invalid_config(
                "pending_capacity must be > 0",
            ));
        }
        if self.max_in_flight == 0 {
            return Err(SpillwayError::invalid_config("max_in_flight must be > 0"));
        }
        Ok(())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
