//! Per-target supervision: spawn the log source, classify its output,
//! detect failure, restart with bounded backoff, eventually give up.

mod backoff;
mod source;

pub use backoff::Backoff;
pub use source::{DockerLogs, LogSource};

use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, Sleep};

use crate::classify;
use crate::error::ResultOkLogExt;
use crate::monitor::Monitor;
use crate::settings::Settings;
use crate::status::{Status, StatusCounts};

/// Upper bound on one read from the log source. One chunk becomes one
/// emission batch, so this also bounds the batch size.
const CHUNK_SIZE: usize = 8192;

/// Supervises the log stream of exactly one target.
///
/// All state is mutated from the supervisor's own event loop: stream data,
/// stream close, and timer expiry are serviced one at a time, so no two
/// callbacks of the same target ever overlap. The watched set is not
/// touched from here; the fleet learns about a permanent stop through the
/// notification channel.
pub struct Supervisor {
    name: String,
    monitor: Arc<dyn Monitor>,
    settings: Settings,
    pass_pseudo: bool,
    backoff: Backoff,
    stopped_tx: mpsc::Sender<String>,
}

/// What woke the event loop while the log source is alive.
enum ReadEvent {
    Stdout(usize),
    StdoutClosed,
    Stderr(usize),
    StderrClosed,
    Heartbeat,
    Restore,
    Exited(Option<i32>),
}

/// What woke the event loop while waiting out the retry delay.
enum WaitEvent {
    Elapsed,
    Heartbeat,
    Restore,
}

impl Supervisor {
    pub fn new(
        name: String,
        monitor: Arc<dyn Monitor>,
        settings: Settings,
        pass_pseudo: bool,
        stopped_tx: mpsc::Sender<String>,
    ) -> Self {
        let backoff = Backoff::new(settings.base_retry_delay(), settings.max_retry_delay());
        Self {
            name,
            monitor,
            settings,
            pass_pseudo,
            backoff,
            stopped_tx,
        }
    }

    /// Runs the target from first spawn until the retry budget is spent.
    ///
    /// Consumes the supervisor; the stop notification is sent exactly once,
    /// after both the heartbeat and any pending restore timer are gone.
    pub async fn run(mut self, source: impl LogSource) {
        let period = jittered(self.settings.heartbeat_base_interval());
        let mut heartbeat = time::interval_at(Instant::now() + period, period);
        let mut restore: Option<Pin<Box<Sleep>>> = None;

        if self.pass_pseudo {
            // Pseudo increment so the collector learns every signal name
            // before real data arrives.
            self.monitor
                .inc_statuses(&self.name, &StatusCounts::filled(1))
                .ok_log("failed to emit pseudo statuses");
        }
        log::info!("Start listening to `{}`", self.name);

        loop {
            let code = self
                .read_to_close(&source, &mut heartbeat, &mut restore)
                .await;
            match code {
                Some(code) => log::info!("Listener for `{}` exited with code {code}", self.name),
                None => log::info!("Listener for `{}` exited without a code", self.name),
            }

            self.monitor
                .inc_statuses(&self.name, &StatusCounts::single(Status::Reconnect))
                .ok_log("failed to emit reconnect status");

            if self.backoff.exhausted(self.settings.max_retries_at_cap) {
                break;
            }

            self.wait_retry(&mut heartbeat, &mut restore).await;
            self.backoff.record_restart();
            // Only one restore window is ever outstanding; arming a new one
            // drops the previous.
            restore = Some(Box::pin(time::sleep(self.settings.restore_delay())));
            log::info!("Restart listening to `{}`", self.name);
        }

        // Both timers must be gone before the stop notification; nothing may
        // fire against a discarded target.
        drop(restore);
        drop(heartbeat);
        log::warn!("Stop listening to `{}`", self.name);
        self.stopped_tx
            .send(self.name)
            .await
            .ok_log("failed to deliver stop notification");
    }

    /// Spawns the log source and services its streams until it terminates.
    ///
    /// Heartbeat ticks and a pending restore window keep firing while the
    /// source is alive. Returns the exit code, or `None` when the process
    /// was killed by a signal or never spawned; both are handled like any
    /// other close.
    async fn read_to_close(
        &mut self,
        source: &impl LogSource,
        heartbeat: &mut Interval,
        restore: &mut Option<Pin<Box<Sleep>>>,
    ) -> Option<i32> {
        let mut child = match spawn_tail(source, &self.name) {
            Ok(child) => child,
            Err(err) => {
                log::error!("failed to spawn log source for `{}`: {err}", self.name);
                return None;
            }
        };
        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let mut stdout_buf = [0u8; CHUNK_SIZE];
        let mut stderr_buf = [0u8; CHUNK_SIZE];

        loop {
            let event = tokio::select! {
                read = read_chunk(stdout.as_mut(), &mut stdout_buf) => match read {
                    Ok(n) if n > 0 => ReadEvent::Stdout(n),
                    _ => ReadEvent::StdoutClosed,
                },
                read = read_chunk(stderr.as_mut(), &mut stderr_buf) => match read {
                    Ok(n) if n > 0 => ReadEvent::Stderr(n),
                    _ => ReadEvent::StderrClosed,
                },
                _ = heartbeat.tick() => ReadEvent::Heartbeat,
                _ = armed(restore.as_mut()) => ReadEvent::Restore,
                status = child.wait(), if stdout.is_none() && stderr.is_none() => {
                    let code = status
                        .ok_log("failed to reap log source")
                        .and_then(|status| status.code());
                    ReadEvent::Exited(code)
                }
            };

            match event {
                ReadEvent::Stdout(n) => self.handle_chunk(&stdout_buf[..n]),
                ReadEvent::Stderr(n) => self.handle_chunk(&stderr_buf[..n]),
                ReadEvent::StdoutClosed => stdout = None,
                ReadEvent::StderrClosed => stderr = None,
                ReadEvent::Heartbeat => self.emit_heartbeat(),
                ReadEvent::Restore => self.restore_defaults(restore),
                ReadEvent::Exited(code) => return code,
            }
        }
    }

    /// Waits out the current retry delay while keeping the heartbeat and a
    /// pending restore window serviced.
    async fn wait_retry(
        &mut self,
        heartbeat: &mut Interval,
        restore: &mut Option<Pin<Box<Sleep>>>,
    ) {
        let delay = time::sleep(self.backoff.delay());
        tokio::pin!(delay);
        loop {
            let event = tokio::select! {
                _ = &mut delay => WaitEvent::Elapsed,
                _ = heartbeat.tick() => WaitEvent::Heartbeat,
                _ = armed(restore.as_mut()) => WaitEvent::Restore,
            };
            match event {
                WaitEvent::Elapsed => return,
                WaitEvent::Heartbeat => self.emit_heartbeat(),
                WaitEvent::Restore => self.restore_defaults(restore),
            }
        }
    }

    /// Classifies one chunk of output and hands the batch to the sink.
    ///
    /// Both streams of the log source arrive here; they are treated
    /// identically.
    fn handle_chunk(&self, chunk: &[u8]) {
        let text = String::from_utf8_lossy(chunk);
        let summary = classify::summarize_chunk(&text);
        for measure in &summary.measures {
            self.monitor
                .send_timing(&self.name, &measure.name, measure.value)
                .ok_log("failed to send timing");
        }
        self.monitor
            .inc_statuses(&self.name, &summary.statuses)
            .ok_log("failed to increment statuses");
    }

    fn emit_heartbeat(&self) {
        self.monitor
            .inc_statuses(&self.name, &StatusCounts::single(Status::HeartBeat))
            .ok_log("failed to emit heartbeat");
    }

    fn restore_defaults(&mut self, restore: &mut Option<Pin<Box<Sleep>>>) {
        *restore = None;
        self.backoff.restore();
        log::info!("Restore default timeouts for `{}`", self.name);
    }
}

fn spawn_tail(source: &impl LogSource, name: &str) -> std::io::Result<Child> {
    let mut command = source.command(name);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // A replaced or abandoned source must not outlive its supervisor.
        .kill_on_drop(true);
    command.spawn()
}

/// Scales the base heartbeat interval by a random factor in `[1.0, 2.0)` so
/// a fleet of targets never beats in lockstep.
fn jittered(base: Duration) -> Duration {
    base.mul_f64(1.0 + rand::random::<f64>())
}

/// Reads the next chunk from a stream; pends forever once the stream is
/// gone so the surrounding select treats it as silent.
async fn read_chunk(
    stream: Option<&mut (impl AsyncRead + Unpin)>,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    match stream {
        Some(stream) => stream.read(buf).await,
        None => std::future::pending().await,
    }
}

/// Resolves when the pending restore window elapses; pends forever while no
/// window is armed.
async fn armed(restore: Option<&mut Pin<Box<Sleep>>>) {
    match restore {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
