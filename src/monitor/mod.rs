//! Metrics sink interface and its backends.
//!
//! The sink is selected once at startup via explicit configuration and used
//! behind a small polymorphic interface; supervisors never know which
//! backend they report to.

mod datadog;

pub use datadog::DogStatsD;

use crate::status::StatusCounts;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to set up metrics socket: {0}")]
    Socket(#[source] std::io::Error),
    #[error("failed to send datagram: {0}")]
    Send(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A statsd-compatible counter/timing sink.
///
/// Both operations are fire-and-forget: callers log failures via
/// [`ResultOkLogExt::ok_log`](crate::error::ResultOkLogExt::ok_log) and move
/// on, and neither may block a supervisor's event loop beyond a socket
/// write.
pub trait Monitor: Send + Sync {
    /// Emits one discrete increment per unit of count for every non-zero
    /// label in `statuses`, tagged with the target.
    fn inc_statuses(&self, container: &str, statuses: &StatusCounts) -> Result<()>;

    /// Emits one timing sample named after `timing`, tagged with the target.
    fn send_timing(&self, container: &str, timing: &str, value: f64) -> Result<()>;
}
