//! Offline analysis of a captured query log.
//!
//! The log is JSON Lines, one executed statement per line:
//!
//! ```text
//! {"request_id": "req-1", "sql": "SELECT * FROM posts WHERE user_id = $1", "duration_ms": 4}
//! ```
//!
//! Entries are fed through a [`QueryTracker`] exactly as a live
//! middleware would, then each request is reported and cleared.

use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analyzer::{QueryAnalysisReport, QueryTracker};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub request_id: String,
    pub sql: String,
    pub duration_ms: u64,
}

/// Parse every non-blank line; the first malformed line aborts with its
/// line number.
pub fn read_log<R: BufRead>(reader: R) -> Result<Vec<LogEntry>> {
    let mut entries = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("failed to read line {}", line_no))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: LogEntry = serde_json::from_str(&line)
            .with_context(|| format!("invalid log entry on line {}", line_no))?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Track every entry, then report and clear each request in order of
/// first appearance. A disabled tracker yields no reports.
pub fn replay<R: BufRead>(reader: R, tracker: &QueryTracker) -> Result<Vec<QueryAnalysisReport>> {
    let entries = read_log(reader)?;

    let mut seen = HashSet::new();
    let mut request_ids = Vec::new();
    for entry in &entries {
        tracker.track(&entry.sql, entry.duration_ms, &entry.request_id);
        if seen.insert(entry.request_id.as_str()) {
            request_ids.push(entry.request_id.as_str());
        }
    }

    tracing::debug!(
        entries = entries.len(),
        requests = request_ids.len(),
        "replayed query log"
    );

    Ok(request_ids
        .into_iter()
        .filter_map(|id| tracker.finish(id))
        .collect())
}

pub fn replay_file(path: &Path, tracker: &QueryTracker) -> Result<Vec<QueryAnalysisReport>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open query log {}", path.display()))?;
    replay(std::io::BufReader::new(file), tracker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::MemorySink;
    use crate::config::AnalyzerConfig;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::sync::Arc;

    const LOG: &str = r#"{"request_id": "req-1", "sql": "SELECT * FROM users WHERE id = $1", "duration_ms": 3}
{"request_id": "req-2", "sql": "SELECT * FROM orders WHERE status = 'open'", "duration_ms": 180}

{"request_id": "req-1", "sql": "SELECT * FROM posts WHERE user_id = $1", "duration_ms": 2}
{"request_id": "req-1", "sql": "SELECT * FROM posts WHERE user_id = $2", "duration_ms": 2}
{"request_id": "req-1", "sql": "SELECT * FROM posts WHERE user_id = $3", "duration_ms": 2}
"#;

    fn enabled_tracker() -> (QueryTracker, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let config = AnalyzerConfig::new().with_enabled(true);
        (QueryTracker::with_sink(&config, sink.clone()), sink)
    }

    #[test]
    fn test_read_log_skips_blank_lines() {
        let entries = read_log(LOG.as_bytes()).unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(
            entries[1],
            LogEntry {
                request_id: "req-2".to_string(),
                sql: "SELECT * FROM orders WHERE status = 'open'".to_string(),
                duration_ms: 180,
            }
        );
    }

    #[test]
    fn test_read_log_reports_bad_line() {
        let input = "{\"request_id\": \"a\", \"sql\": \"SELECT 1\", \"duration_ms\": 1}\nnot json\n";
        let err = read_log(input.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_replay_reports_in_first_seen_order() {
        let (tracker, sink) = enabled_tracker();
        let reports = replay(LOG.as_bytes(), &tracker).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].request_id, "req-1");
        assert_eq!(reports[0].total_queries, 4);
        assert_eq!(reports[0].n_plus_one_detections.len(), 1);
        assert_eq!(reports[0].n_plus_one_detections[0].count, 3);

        assert_eq!(reports[1].request_id, "req-2");
        assert_eq!(reports[1].slow_queries.len(), 1);
        assert_eq!(
            reports[1].slow_queries[0].suggested_index.as_deref(),
            Some("CREATE INDEX idx_orders_status ON orders (status);")
        );

        // one slow warning at track time, one N+1 warning at report time
        assert_eq!(sink.len(), 2);
        assert_eq!(tracker.active_requests(), 0);
    }

    #[test]
    fn test_replay_disabled_tracker() {
        let tracker = QueryTracker::disabled();
        let reports = replay(LOG.as_bytes(), &tracker).unwrap();
        assert!(reports.is_empty());
    }

    #[test]
    fn test_replay_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LOG.as_bytes()).unwrap();
        let (tracker, _) = enabled_tracker();
        let reports = replay_file(file.path(), &tracker).unwrap();
        assert_eq!(reports.len(), 2);
    }

    #[test]
    fn test_replay_missing_file() {
        let (tracker, _) = enabled_tracker();
        let err = replay_file(Path::new("/nonexistent/queries.jsonl"), &tracker).unwrap_err();
        assert!(err.to_string().contains("failed to open query log"));
    }
}
