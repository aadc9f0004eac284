use clap::Parser;

use docker_log_monitor::cli::Cli;

/// Entry point for the docker log monitor.
///
/// Watches the log streams of the selected containers, classifies their
/// output by severity, and reports counts and timing measurements to the
/// configured metrics backend.
///
/// # Examples
///
/// ```bash
/// DD_HOST=127.0.0.1 docker-log-monitor --all --pass-pseudo
/// docker-log-monitor web-frontend cache
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    docker_log_monitor::run(Cli::parse()).await
}
