//! `craftbots analyze-logs`: a summary of a JSON log written with
//! `--log-file`.
//!
//! The file is read line by line and folded into counts by level and by
//! source. The source is the `agent` field when an event carries one and the
//! tracing target otherwise. A line that does not parse as JSON counts as an
//! ERROR from `unknown`, so a damaged log still shows up in the report.

use std::cmp::Reverse;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::Value;

use crate::error::EngineError;

/// Errors listed when `--errors` is not given.
pub const DEFAULT_RECENT_ERRORS: usize = 5;

const ERROR_LEVEL: &str = "ERROR";
const UNKNOWN: &str = "unknown";

/// One ERROR entry as listed in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    /// When it was logged, as written.
    pub timestamp: String,
    /// Agent or target that logged it.
    pub source: String,
    /// Event message.
    pub message: String,
}

/// Counts folded over a log file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSummary {
    /// Non-blank lines seen.
    pub total: usize,
    /// Entries per level.
    pub by_level: BTreeMap<String, usize>,
    /// Entries per agent or target.
    pub by_source: BTreeMap<String, usize>,
    /// The most recent ERROR entries, oldest first.
    pub recent_errors: VecDeque<ErrorEntry>,
}

impl LogSummary {
    /// Fold one raw log line in, keeping at most `keep` recent errors.
    pub fn observe(&mut self, line: &str, keep: usize) {
        if line.trim().is_empty() {
            return;
        }
        let (level, entry) = parse_line(line);
        self.total = self.total.saturating_add(1);
        bump(&mut self.by_level, &level);
        bump(&mut self.by_source, &entry.source);
        if level != ERROR_LEVEL || keep == 0 {
            return;
        }
        if self.recent_errors.len() >= keep {
            self.recent_errors.pop_front();
        }
        self.recent_errors.push_back(entry);
    }
}

impl fmt::Display for LogSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "log entries: {}", self.total)?;

        writeln!(f, "\nby level:")?;
        for (level, count) in &self.by_level {
            writeln!(f, "  {level}: {count}")?;
        }

        writeln!(f, "\nby source:")?;
        let mut sources: Vec<(&String, &usize)> = self.by_source.iter().collect();
        sources.sort_by_key(|(name, count)| (Reverse(**count), *name));
        for (source, count) in sources {
            writeln!(f, "  {source}: {count}")?;
        }

        writeln!(f, "\nlast {} errors:", self.recent_errors.len())?;
        if self.recent_errors.is_empty() {
            writeln!(f, "  none")?;
        }
        for (n, error) in (1_usize..).zip(&self.recent_errors) {
            writeln!(f, "  {n}. [{}] {}: {}", error.timestamp, error.source, error.message)?;
        }
        Ok(())
    }
}

/// Summarize the log at `path`, listing up to `keep` recent errors.
pub fn analyze_file(path: &Path, keep: usize) -> Result<LogSummary, EngineError> {
    let log_error = |source| EngineError::LogFile {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(log_error)?;
    BufReader::new(file)
        .lines()
        .try_fold(LogSummary::default(), |mut summary, line| {
            summary.observe(&line.map_err(log_error)?, keep);
            Ok(summary)
        })
}

/// The upper-cased level of a line and its entry.
fn parse_line(line: &str) -> (String, ErrorEntry) {
    let Ok(value) = serde_json::from_str::<Value>(line) else {
        let entry = ErrorEntry {
            timestamp: String::new(),
            source: UNKNOWN.to_owned(),
            message: format!("malformed log line: {}", line.trim()),
        };
        return (ERROR_LEVEL.to_owned(), entry);
    };
    let level = first_text(&value, &["/level"]).unwrap_or(UNKNOWN).to_uppercase();
    let entry = ErrorEntry {
        timestamp: first_text(&value, &["/timestamp"]).unwrap_or_default().to_owned(),
        source: first_text(&value, &["/fields/agent", "/agent", "/logger", "/target"])
            .unwrap_or(UNKNOWN)
            .to_owned(),
        message: first_text(&value, &["/fields/message", "/message"])
            .unwrap_or_default()
            .to_owned(),
    };
    (level, entry)
}

/// The first of `pointers` that resolves to a string.
fn first_text<'v>(value: &'v Value, pointers: &[&str]) -> Option<&'v str> {
    pointers
        .iter()
        .find_map(|pointer| value.pointer(pointer).and_then(Value::as_str))
}

fn bump(counts: &mut BTreeMap<String, usize>, key: &str) {
    let count = counts.entry(key.to_owned()).or_insert(0);
    *count = count.saturating_add(1);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const LOG: &str = r#"{"timestamp":"2026-01-01T00:00:00.000001Z","level":"INFO","fields":{"message":"state transition","agent":"MinerBot"},"target":"craftbots_agents::fsm","threadName":"MinerBot"}
{"timestamp":"2026-01-01T00:00:00.000002Z","level":"DEBUG","fields":{"message":"anchor claimed","agent":"MinerBot"},"target":"craftbots_world::claims"}
{"timestamp":"2026-01-01T00:00:00.000003Z","level":"ERROR","fields":{"message":"agent fault","agent":"BuilderBot","reason":"boom"},"target":"craftbots_agents::runtime"}

{"timestamp":"2026-01-01T00:00:00.000004Z","level":"INFO","fields":{"message":"craftbots starting"},"target":"craftbots"}
{"timestamp":"2026-01-01T00:00:00.000005Z","level":"ERROR","fields":{"message":"chat poll failed"},"target":"craftbots"}
"#;

    fn summarize(text: &str, keep: usize) -> LogSummary {
        text.lines().fold(LogSummary::default(), |mut summary, line| {
            summary.observe(line, keep);
            summary
        })
    }

    #[test]
    fn counts_by_level_and_source() {
        let summary = summarize(LOG, DEFAULT_RECENT_ERRORS);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.by_level.get("INFO"), Some(&2));
        assert_eq!(summary.by_level.get("ERROR"), Some(&2));
        assert_eq!(summary.by_level.get("DEBUG"), Some(&1));
        assert_eq!(summary.by_source.get("MinerBot"), Some(&2));
        assert_eq!(summary.by_source.get("BuilderBot"), Some(&1));
        assert_eq!(summary.by_source.get("craftbots"), Some(&2));
    }

    #[test]
    fn keeps_only_the_most_recent_errors() {
        let summary = summarize(LOG, 1);
        assert_eq!(summary.recent_errors.len(), 1);
        let last = summary.recent_errors.back().unwrap();
        assert_eq!(last.message, "chat poll failed");
        assert_eq!(last.source, "craftbots");
        assert_eq!(last.timestamp, "2026-01-01T00:00:00.000005Z");

        assert!(summarize(LOG, 0).recent_errors.is_empty());
    }

    #[test]
    fn malformed_lines_count_as_errors() {
        let summary = summarize("not json\n{\"level\":\"warn\",\"logger\":\"MinerBot\"}\n", 5);
        assert_eq!(summary.by_level.get("ERROR"), Some(&1));
        assert_eq!(summary.by_level.get("WARN"), Some(&1));
        assert_eq!(summary.by_source.get("unknown"), Some(&1));
        assert_eq!(summary.by_source.get("MinerBot"), Some(&1));
        assert_eq!(
            summary.recent_errors.front().unwrap().message,
            "malformed log line: not json"
        );
    }

    #[test]
    fn report_lists_busiest_sources_first() {
        let report = summarize(LOG, DEFAULT_RECENT_ERRORS).to_string();
        assert!(report.starts_with("log entries: 5\n"));
        let craftbots = report.find("  craftbots: 2").unwrap();
        let builder = report.find("  BuilderBot: 1").unwrap();
        assert!(craftbots < builder);
        assert!(report.contains("last 2 errors:"));
        assert!(report.contains("  2. [2026-01-01T00:00:00.000005Z] craftbots: chat poll failed"));
        assert!(summarize("", 5).to_string().contains("  none"));
    }

    #[test]
    fn reads_a_log_file_lazily() {
        let path = std::env::temp_dir().join(format!("craftbots-analyze-{}.log", std::process::id()));
        std::fs::write(&path, LOG).unwrap();
        let summary = analyze_file(&path, DEFAULT_RECENT_ERRORS).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(summary, summarize(LOG, DEFAULT_RECENT_ERRORS));

        let missing = analyze_file(&path, DEFAULT_RECENT_ERRORS);
        assert!(matches!(missing, Err(EngineError::LogFile { .. })));
    }
}
