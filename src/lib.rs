//! Docker log monitor: tails the log output of containers, classifies each
//! line by severity, and reports aggregate counts plus timing measurements
//! to a statsd-compatible collector.
//!
//! The crate is split along the runtime's seams: pure classification
//! ([`classify`], [`status`]), the metrics sink ([`monitor`]), the
//! per-target supervision engine ([`supervisor`]), and the fleet
//! orchestrator that converges the watched set with the discovered one
//! ([`fleet`]).

use std::sync::Arc;

pub mod classify;
pub mod cli;
pub mod error;
pub mod fleet;
pub mod monitor;
pub mod settings;
pub mod status;
pub mod supervisor;

use cli::{Backend, Cli};
use fleet::{DockerPs, Fleet, WatchMode};
use monitor::{DogStatsD, Monitor};
use settings::Settings;
use supervisor::DockerLogs;

/// Runs the monitor with the given arguments until the process is killed.
///
/// # Errors
///
/// Fails on an unreadable or invalid settings file, on failure to set up
/// the metrics socket, or when the initial container discovery in `--all`
/// mode fails. A log source terminating is never a process-level error; it
/// is handled by the per-target restart state machine.
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let monitor: Arc<dyn Monitor> = match cli.monitor {
        Backend::DataDog => Arc::new(DogStatsD::new(&cli.dd_host, cli.dd_port)?),
    };

    let mode = if cli.all {
        WatchMode::All
    } else {
        WatchMode::Names(cli.container_names.clone())
    };

    let (fleet, stopped_rx) = Fleet::new(monitor, settings, cli.pass_pseudo, DockerPs, DockerLogs);
    fleet.run(mode, stopped_rx).await?;

    Ok(())
}
