//! Canonical severity labels and the per-batch counter set handed to the
//! metrics sink.

use std::fmt;

/// Classification bucket for a log line, plus the two synthetic labels used
/// only for operational signaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
    Fatal,
    /// Synthetic: liveness signal emitted on a timer, never parsed from logs.
    HeartBeat,
    /// Synthetic: emitted once whenever a log source terminates.
    Reconnect,
}

impl Status {
    /// Number of labels in the fixed vocabulary.
    pub const COUNT: usize = 9;

    /// All labels, in emission order.
    pub const ALL: [Status; Status::COUNT] = [
        Status::Trace,
        Status::Debug,
        Status::Info,
        Status::Warning,
        Status::Error,
        Status::Critical,
        Status::Fatal,
        Status::HeartBeat,
        Status::Reconnect,
    ];

    /// The label name as it appears in metric names.
    ///
    /// `heartBeat` keeps its historical camel-cased spelling on the wire;
    /// every other label is lowercase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Trace => "trace",
            Status::Debug => "debug",
            Status::Info => "info",
            Status::Warning => "warning",
            Status::Error => "error",
            Status::Critical => "critical",
            Status::Fatal => "fatal",
            Status::HeartBeat => "heartBeat",
            Status::Reconnect => "reconnect",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A counter set over the fixed label vocabulary, all labels starting at
/// zero.
///
/// Created fresh per classified chunk or per synthetic event, handed to the
/// sink once, and never reused across emissions.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StatusCounts([u64; Status::COUNT]);

impl StatusCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every label set to `value`. Used for the startup presence signal that
    /// registers all metric names with the collector.
    pub fn filled(value: u64) -> Self {
        Self([value; Status::COUNT])
    }

    /// A single label at one, all others zero.
    pub fn single(status: Status) -> Self {
        let mut counts = Self::default();
        counts.increment(status);
        counts
    }

    pub fn increment(&mut self, status: Status) {
        self.0[status as usize] += 1;
    }

    pub fn get(&self, status: Status) -> u64 {
        self.0[status as usize]
    }

    /// All labels with their counts, in emission order.
    pub fn iter(&self) -> impl Iterator<Item = (Status, u64)> + '_ {
        Status::ALL
            .iter()
            .map(|status| (*status, self.0[*status as usize]))
    }
}
