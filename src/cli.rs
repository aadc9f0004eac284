//! Command-line argument surface.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Metrics backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// DogStatsD agent over UDP.
    #[value(name = "data-dog")]
    DataDog,
}

/// Watches container log streams and reports severity counts to a metrics
/// collector.
#[derive(Debug, Parser)]
#[command(name = "docker-log-monitor", version, about)]
pub struct Cli {
    /// Metrics backend to report to.
    #[arg(long, value_enum, default_value = "data-dog")]
    pub monitor: Backend,

    /// Emit a pseudo increment of every signal name at startup so the
    /// collector registers them before real data arrives.
    #[arg(long)]
    pub pass_pseudo: bool,

    /// Watch all running containers and keep tracking newly started ones.
    #[arg(long)]
    pub all: bool,

    /// Path to a JSON settings file overriding the default timings.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// DogStatsD agent host.
    #[arg(long, env = "DD_HOST", default_value = "127.0.0.1")]
    pub dd_host: String,

    /// DogStatsD agent port.
    #[arg(long, env = "DD_PORT", default_value_t = 8125)]
    pub dd_port: u16,

    /// Container names to watch.
    #[arg(required_unless_present = "all")]
    pub container_names: Vec<String>,
}
