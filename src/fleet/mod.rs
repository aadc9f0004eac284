//! Fleet orchestration: converge the set of supervised targets with the
//! set of discovered containers.

pub mod discovery;

pub use discovery::{ContainerLister, DockerPs};

use std::sync::Arc;

use dashmap::DashSet;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::monitor::Monitor;
use crate::settings::Settings;
use crate::supervisor::{LogSource, Supervisor};

/// Buffer for stop notifications from supervisors.
const STOP_CHANNEL_CAPACITY: usize = 16;

/// How targets are selected.
#[derive(Debug, Clone)]
pub enum WatchMode {
    /// Watch every running container and keep polling for new ones.
    All,
    /// Watch exactly the given names.
    Names(Vec<String>),
}

/// Manages a dynamic set of target supervisors.
///
/// The watched set is the only state shared across supervisors, and every
/// mutation of it happens in fleet methods: a name is added when its
/// supervisor is created and removed when the supervisor's stop
/// notification arrives.
pub struct Fleet<L, S> {
    watched: DashSet<String>,
    monitor: Arc<dyn Monitor>,
    settings: Settings,
    pass_pseudo: bool,
    lister: L,
    source: S,
    stopped_tx: mpsc::Sender<String>,
}

impl<L: ContainerLister, S: LogSource> Fleet<L, S> {
    /// Creates the fleet and the receiving end of its stop notifications,
    /// which must be handed back to [`Fleet::run`].
    pub fn new(
        monitor: Arc<dyn Monitor>,
        settings: Settings,
        pass_pseudo: bool,
        lister: L,
        source: S,
    ) -> (Self, mpsc::Receiver<String>) {
        let (stopped_tx, stopped_rx) = mpsc::channel(STOP_CHANNEL_CAPACITY);
        let fleet = Self {
            watched: DashSet::new(),
            monitor,
            settings,
            pass_pseudo,
            lister,
            source,
            stopped_tx,
        };
        (fleet, stopped_rx)
    }

    /// Starts a supervisor for every name not already watched.
    ///
    /// Idempotent per name; a watched name is never double-supervised.
    pub fn watch(&self, names: impl IntoIterator<Item = String>) {
        for name in names {
            if !self.watched.insert(name.clone()) {
                continue;
            }
            let supervisor = Supervisor::new(
                name,
                Arc::clone(&self.monitor),
                self.settings.clone(),
                self.pass_pseudo,
                self.stopped_tx.clone(),
            );
            tokio::spawn(supervisor.run(self.source.clone()));
        }
    }

    /// Lists currently running containers via the discovery collaborator.
    pub async fn discover(&self) -> discovery::Result<Vec<String>> {
        let raw = self.lister.list().await?;
        Ok(discovery::parse_container_names(&raw))
    }

    /// Discovers the current containers and watches the ones not yet
    /// supervised; already-watched targets are untouched.
    pub async fn reconcile_new(&self) -> discovery::Result<()> {
        let names = self.discover().await?;
        let new: Vec<String> = names
            .into_iter()
            .filter(|name| !self.watched.contains(name))
            .collect();
        self.watch(new);
        Ok(())
    }

    /// Removes a permanently stopped target from the watched set.
    /// Idempotent if the name is already absent.
    fn on_target_stopped(&self, name: &str) {
        self.watched.remove(name);
    }

    /// The names currently supervised, in no particular order.
    pub fn watched_names(&self) -> Vec<String> {
        self.watched.iter().map(|name| name.key().clone()).collect()
    }

    fn report_status(&self) {
        log::info!(
            "Currently listening to containers: {}",
            self.watched_names().join(", ")
        );
    }

    /// Runs the orchestrator: the initial watch per `mode`, then the status
    /// printer, the discovery poll (fleet mode only), and stop
    /// notifications, for the lifetime of the process.
    ///
    /// # Errors
    ///
    /// Fails only when the initial discovery in [`WatchMode::All`] fails,
    /// before any supervisor is running. Later poll failures are logged and
    /// that cycle is skipped; running supervisors are never affected.
    pub async fn run(
        &self,
        mode: WatchMode,
        mut stopped_rx: mpsc::Receiver<String>,
    ) -> discovery::Result<()> {
        let track_new = matches!(mode, WatchMode::All);
        match mode {
            WatchMode::All => self.reconcile_new().await?,
            WatchMode::Names(names) => self.watch(names),
        }

        let poll_period = self.settings.discovery_poll_interval();
        let mut poll = time::interval_at(Instant::now() + poll_period, poll_period);
        let status_period = self.settings.print_status_interval();
        let mut status = time::interval_at(Instant::now() + status_period, status_period);

        loop {
            tokio::select! {
                _ = poll.tick(), if track_new => {
                    if let Err(err) = self.reconcile_new().await {
                        log::error!("container discovery failed, skipping this cycle: {err}");
                    }
                }
                _ = status.tick() => self.report_status(),
                notice = stopped_rx.recv() => {
                    if let Some(name) = notice {
                        self.on_target_stopped(&name);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::monitor;
    use crate::status::StatusCounts;
    use crate::supervisor::LogSource;

    use super::*;

    const FIRST_LISTING: &str = "\
CONTAINER ID   IMAGE       NAMES
111111111111   app:latest  alpha
222222222222   app:latest  beta
";

    const SECOND_LISTING: &str = "\
CONTAINER ID   IMAGE       NAMES
111111111111   app:latest  alpha
222222222222   app:latest  beta
333333333333   app:latest  gamma
";

    /// Serves each scripted response once; the last response repeats.
    struct ScriptedLister {
        responses: Mutex<Vec<&'static str>>,
    }

    impl ScriptedLister {
        fn new(responses: &[&'static str]) -> Self {
            Self {
                responses: Mutex::new(responses.to_vec()),
            }
        }
    }

    impl ContainerLister for ScriptedLister {
        fn list(&self) -> impl std::future::Future<Output = discovery::Result<String>> + Send {
            let raw = {
                let mut responses = self.responses.lock().unwrap();
                if responses.len() > 1 {
                    responses.remove(0)
                } else {
                    responses[0]
                }
            };
            async move { Ok(raw.to_owned()) }
        }
    }

    #[derive(Clone)]
    struct SleepSource;

    impl LogSource for SleepSource {
        fn command(&self, _name: &str) -> tokio::process::Command {
            let mut command = tokio::process::Command::new("sh");
            command.args(["-c", "sleep 5"]);
            command
        }
    }

    #[derive(Clone)]
    struct ExitingSource;

    impl LogSource for ExitingSource {
        fn command(&self, _name: &str) -> tokio::process::Command {
            let mut command = tokio::process::Command::new("sh");
            command.args(["-c", "exit 0"]);
            command
        }
    }

    /// Counts presence signals so the tests can tell how many supervisors
    /// were ever created.
    #[derive(Default)]
    struct CountingMonitor {
        pseudo_targets: Mutex<Vec<String>>,
    }

    impl Monitor for CountingMonitor {
        fn inc_statuses(&self, container: &str, statuses: &StatusCounts) -> monitor::Result<()> {
            if *statuses == StatusCounts::filled(1) {
                self.pseudo_targets.lock().unwrap().push(container.to_owned());
            }
            Ok(())
        }

        fn send_timing(&self, _container: &str, _timing: &str, _value: f64) -> monitor::Result<()> {
            Ok(())
        }
    }

    fn fast_settings() -> Settings {
        Settings {
            base_retry_delay_ms: 5,
            max_retry_delay_ms: 5,
            max_retries_at_cap: 1,
            restore_delay_ms: 60_000,
            heartbeat_base_interval_ms: 60_000,
            discovery_poll_interval_ms: 60_000,
            print_status_interval_ms: 60_000,
        }
    }

    #[tokio::test]
    async fn reconcile_watches_only_new_names() {
        let monitor = Arc::new(CountingMonitor::default());
        let (fleet, _stopped_rx) = Fleet::new(
            Arc::clone(&monitor) as Arc<dyn Monitor>,
            fast_settings(),
            true,
            ScriptedLister::new(&[FIRST_LISTING, SECOND_LISTING]),
            SleepSource,
        );

        fleet.reconcile_new().await.unwrap();
        let mut watched = fleet.watched_names();
        watched.sort();
        assert_eq!(watched, ["alpha", "beta"]);

        fleet.reconcile_new().await.unwrap();
        let mut watched = fleet.watched_names();
        watched.sort();
        assert_eq!(watched, ["alpha", "beta", "gamma"]);

        // Existing targets were untouched: exactly one supervisor (and so
        // one presence signal) per name across both cycles.
        tokio::time::sleep(Duration::from_millis(200)).await;
        let mut pseudo = monitor.pseudo_targets.lock().unwrap().clone();
        pseudo.sort();
        assert_eq!(pseudo, ["alpha", "beta", "gamma"]);
    }

    #[tokio::test]
    async fn stopped_targets_leave_the_watched_set() {
        let monitor = Arc::new(CountingMonitor::default());
        let (fleet, stopped_rx) = Fleet::new(
            monitor as Arc<dyn Monitor>,
            fast_settings(),
            false,
            ScriptedLister::new(&[FIRST_LISTING]),
            ExitingSource,
        );
        let fleet = Arc::new(fleet);

        let runner = tokio::spawn({
            let fleet = Arc::clone(&fleet);
            async move {
                let _ = fleet
                    .run(WatchMode::Names(vec!["flappy".to_owned()]), stopped_rx)
                    .await;
            }
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        while !fleet.watched_names().is_empty() {
            assert!(
                Instant::now() < deadline,
                "target should exhaust its retry budget and be removed"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        runner.abort();
    }

    #[tokio::test]
    async fn watch_is_idempotent_per_name() {
        let monitor = Arc::new(CountingMonitor::default());
        let (fleet, _stopped_rx) = Fleet::new(
            Arc::clone(&monitor) as Arc<dyn Monitor>,
            fast_settings(),
            true,
            ScriptedLister::new(&[FIRST_LISTING]),
            SleepSource,
        );

        fleet.watch(vec!["alpha".to_owned()]);
        fleet.watch(vec!["alpha".to_owned(), "alpha".to_owned()]);
        assert_eq!(fleet.watched_names(), ["alpha"]);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*monitor.pseudo_targets.lock().unwrap(), ["alpha"]);
    }
}
