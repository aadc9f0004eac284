use tokio::process::Command;

/// Produces the long-lived process whose output is tailed for one target.
///
/// The supervisor owns the spawned handle exclusively and replaces it
/// wholesale on every restart.
pub trait LogSource: Clone + Send + Sync + 'static {
    /// The command to spawn for the given target name.
    fn command(&self, name: &str) -> Command;
}

/// Tails a container's log stream via `docker logs -f`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DockerLogs;

impl LogSource for DockerLogs {
    fn command(&self, name: &str) -> Command {
        let mut command = Command::new("docker");
        command.args(["logs", "-f", name]);
        command
    }
}
