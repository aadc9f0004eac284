//! Runtime configuration: the timing knobs with their defaults, optionally
//! loaded from a JSON file.

use std::path::Path;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read settings file `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Timing configuration for supervisors and the fleet.
///
/// All durations are milliseconds. Unknown keys are rejected so a typo
/// never silently falls back to a default.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Initial delay between restarts; also the value restored to after a
    /// failure-free restore window.
    #[serde(rename = "baseRetryDelay")]
    pub base_retry_delay_ms: u64,
    /// Upper bound the retry delay grows toward.
    #[serde(rename = "maxRetryDelay")]
    pub max_retry_delay_ms: u64,
    /// Restarts tolerated at the capped delay before giving up on a target.
    #[serde(rename = "maxRetriesAtCap")]
    pub max_retries_at_cap: u32,
    /// Failure-free window after which backoff returns to defaults.
    #[serde(rename = "restoreDelay")]
    pub restore_delay_ms: u64,
    /// Base heartbeat period, scaled per target by a factor in [1.0, 2.0).
    #[serde(rename = "heartbeatBaseInterval")]
    pub heartbeat_base_interval_ms: u64,
    /// How often fleet mode re-polls for newly started containers.
    #[serde(rename = "discoveryPollInterval")]
    pub discovery_poll_interval_ms: u64,
    /// How often the currently watched set is logged.
    #[serde(rename = "printStatusInterval")]
    pub print_status_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_retry_delay_ms: 1_000,
            max_retry_delay_ms: 60_000,
            max_retries_at_cap: 5,
            restore_delay_ms: 600_000,
            heartbeat_base_interval_ms: 15_000,
            discovery_poll_interval_ms: 15_000,
            print_status_interval_ms: 30_000,
        }
    }
}

impl Settings {
    /// Loads settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] if the file cannot be read and
    /// [`Error::Parse`] if it is not valid JSON or carries unrecognized
    /// keys.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| Error::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn base_retry_delay(&self) -> Duration {
        Duration::from_millis(self.base_retry_delay_ms)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms)
    }

    pub fn restore_delay(&self) -> Duration {
        Duration::from_millis(self.restore_delay_ms)
    }

    pub fn heartbeat_base_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_base_interval_ms)
    }

    pub fn discovery_poll_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_poll_interval_ms)
    }

    pub fn print_status_interval(&self) -> Duration {
        Duration::from_millis(self.print_status_interval_ms)
    }
}
