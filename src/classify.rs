//! Pure line classification: severity keywords and duration measurements.

use std::sync::LazyLock;

use regex::Regex;

use crate::status::{Status, StatusCounts};

static KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(trace|debug|dbg|info|warn|warning|error|err|crit|critical|fatal)\b")
        .expect("severity keyword pattern compiles")
});

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Measure::duration::([A-Za-z0-9_.-]+):\s*([0-9]+(?:\.[0-9]+)?)")
        .expect("duration measure pattern compiles")
});

/// Scans a line for the first recognized severity keyword.
///
/// Matching is case-insensitive and whole-word; only the first keyword in
/// the line counts, even if it contains several. Synonyms normalize to one
/// canonical label (`warn` → `warning`, `crit` → `critical`, `err` →
/// `error`, `dbg` → `debug`).
pub fn classify(line: &str) -> Option<Status> {
    let captures = KEYWORD.captures(line)?;
    let status = match captures[1].to_ascii_lowercase().as_str() {
        "trace" => Status::Trace,
        "debug" | "dbg" => Status::Debug,
        "info" => Status::Info,
        "warn" | "warning" => Status::Warning,
        "error" | "err" => Status::Error,
        "crit" | "critical" => Status::Critical,
        "fatal" => Status::Fatal,
        keyword => unreachable!("keyword `{keyword}` is not in the pattern"),
    };
    Some(status)
}

/// A duration measurement reported by the monitored process.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationMeasure {
    pub name: String,
    pub value: f64,
}

/// Parses a `Measure::duration::<name>: <number>` line.
pub fn parse_duration_measure(line: &str) -> Option<DurationMeasure> {
    let captures = DURATION.captures(line)?;
    let value = captures[2].parse().ok()?;
    Some(DurationMeasure {
        name: captures[1].to_owned(),
        value,
    })
}

/// Everything extracted from one raw chunk of log output.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChunkSummary {
    pub statuses: StatusCounts,
    pub measures: Vec<DurationMeasure>,
}

/// Splits a raw chunk into lines and classifies each independently.
///
/// Counts accumulate into one batch per chunk so the emission rate stays
/// bounded under noisy processes. Duration measures are collected alongside,
/// independent of the severity scan; lines with neither contribute nothing.
pub fn summarize_chunk(chunk: &str) -> ChunkSummary {
    let mut summary = ChunkSummary::default();
    for line in chunk.trim().split('\n') {
        if let Some(status) = classify(line) {
            summary.statuses.increment(status);
        }
        if let Some(measure) = parse_duration_measure(line) {
            summary.measures.push(measure);
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_each_keyword_to_its_canonical_label() {
        let cases = [
            ("2024-01-01 trace entering loop", Status::Trace),
            ("debug: cache warm", Status::Debug),
            ("info started", Status::Info),
            ("warning: disk low", Status::Warning),
            ("error: connection refused", Status::Error),
            ("critical failure in shard 3", Status::Critical),
            ("fatal: cannot bind port", Status::Fatal),
        ];
        for (line, expected) in cases {
            assert_eq!(classify(line), Some(expected), "line: {line}");
        }
    }

    #[test]
    fn synonyms_normalize_to_the_same_label() {
        assert_eq!(classify("warn: low memory"), classify("warning: low memory"));
        assert_eq!(classify("crit: down"), classify("critical: down"));
        assert_eq!(classify("err: refused"), classify("error: refused"));
        assert_eq!(classify("dbg: poke"), classify("debug: poke"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(classify("ERROR: boom"), Some(Status::Error));
        assert_eq!(classify("WaRnInG odd casing"), Some(Status::Warning));
    }

    #[test]
    fn only_the_first_keyword_counts() {
        assert_eq!(classify("info before error"), Some(Status::Info));
        assert_eq!(classify("error before info"), Some(Status::Error));
    }

    #[test]
    fn keywords_match_whole_words_only() {
        assert_eq!(classify("terror in the logs"), None);
        assert_eq!(classify("5 errors occurred"), None);
        assert_eq!(classify("debugging session"), None);
    }

    #[test]
    fn unrecognized_lines_classify_to_none() {
        assert_eq!(classify("plain shipping notice"), None);
        assert_eq!(classify(""), None);
    }

    #[test]
    fn parses_duration_measure_lines() {
        assert_eq!(
            parse_duration_measure("Measure::duration::flush: 12.5"),
            Some(DurationMeasure {
                name: "flush".to_owned(),
                value: 12.5,
            })
        );
        assert_eq!(
            parse_duration_measure("prefix Measure::duration::db.query: 300"),
            Some(DurationMeasure {
                name: "db.query".to_owned(),
                value: 300.0,
            })
        );
        assert_eq!(parse_duration_measure("Measure::duration::flush"), None);
        assert_eq!(parse_duration_measure("no measure here"), None);
    }

    #[test]
    fn chunk_counts_accumulate_per_label() {
        let chunk = "error: one\nwarn: two\nerror: three\nnothing to see\n";
        let summary = summarize_chunk(chunk);
        assert_eq!(summary.statuses.get(Status::Error), 2);
        assert_eq!(summary.statuses.get(Status::Warning), 1);
        assert_eq!(summary.statuses.get(Status::Info), 0);
        assert!(summary.measures.is_empty());
    }

    #[test]
    fn measures_are_independent_of_severity_counts() {
        let chunk = "Measure::duration::flush: 12.5\nerror: flush failed";
        let summary = summarize_chunk(chunk);
        assert_eq!(
            summary.measures,
            vec![DurationMeasure {
                name: "flush".to_owned(),
                value: 12.5,
            }]
        );
        assert_eq!(summary.statuses.get(Status::Error), 1);
    }

    #[test]
    fn unmatched_chunk_yields_all_zero_counts() {
        let summary = summarize_chunk("one\ntwo\nthree");
        assert_eq!(summary.statuses, StatusCounts::new());
    }
}
