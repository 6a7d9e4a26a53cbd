//! Value types produced by the query tracker.
//!
//! Everything here is derived data: a [`TrackedQuery`] is the only record
//! that is stored, the rest is recomputed whenever a report is requested.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single executed statement as observed by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedQuery {
    pub sql: String,
    pub duration_ms: u64,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

/// A query that ran longer than the slow-query threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlowQueryWarning {
    pub sql: String,
    pub duration_ms: u64,
    pub request_id: String,
    pub suggested_index: Option<String>,
}

impl SlowQueryWarning {
    /// Diagnostic line written to the sink when the query is tracked.
    pub fn message(&self, threshold_ms: u64) -> String {
        let mut msg = format!(
            "Slow query detected: {}ms (threshold {}ms) in request {}: {}",
            self.duration_ms, threshold_ms, self.request_id, self.sql
        );
        if let Some(ref index) = self.suggested_index {
            msg.push_str("\n  Suggested index: ");
            msg.push_str(index);
        }
        msg
    }
}

/// A structural pattern repeated often enough within one request to look
/// like row-by-row fetching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NPlusOneDetection {
    pub pattern: String,
    pub count: usize,
    pub request_id: String,
    pub suggestion: String,
}

impl NPlusOneDetection {
    pub fn message(&self) -> String {
        format!(
            "N+1 query detected: pattern executed {} times in request {}: {}\n  {}",
            self.count, self.request_id, self.pattern, self.suggestion
        )
    }
}

/// Aggregate analysis of everything tracked for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnalysisReport {
    pub request_id: String,
    pub total_queries: usize,
    pub total_duration_ms: u64,
    pub slow_queries: Vec<SlowQueryWarning>,
    pub n_plus_one_detections: Vec<NPlusOneDetection>,
}

impl QueryAnalysisReport {
    /// True when neither slow queries nor N+1 patterns were found.
    pub fn is_clean(&self) -> bool {
        self.slow_queries.is_empty() && self.n_plus_one_detections.is_empty()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl fmt::Display for QueryAnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Request {}: {} queries, {}ms total",
            self.request_id, self.total_queries, self.total_duration_ms
        )?;

        if self.is_clean() {
            return writeln!(f, "  no issues found");
        }

        if !self.slow_queries.is_empty() {
            writeln!(f, "  Slow queries ({}):", self.slow_queries.len())?;
            for slow in &self.slow_queries {
                writeln!(f, "    [{}ms] {}", slow.duration_ms, slow.sql)?;
                if let Some(ref index) = slow.suggested_index {
                    writeln!(f, "      suggested: {}", index)?;
                }
            }
        }

        if !self.n_plus_one_detections.is_empty() {
            writeln!(
                f,
                "  N+1 patterns ({}):",
                self.n_plus_one_detections.len()
            )?;
            for detection in &self.n_plus_one_detections {
                writeln!(f, "    [x{}] {}", detection.count, detection.pattern)?;
                writeln!(f, "      {}", detection.suggestion)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_report() -> QueryAnalysisReport {
        QueryAnalysisReport {
            request_id: "req-1".to_string(),
            total_queries: 4,
            total_duration_ms: 260,
            slow_queries: vec![SlowQueryWarning {
                sql: "SELECT * FROM users WHERE email = $1".to_string(),
                duration_ms: 250,
                request_id: "req-1".to_string(),
                suggested_index: Some("CREATE INDEX idx_users_email ON users (email);".into()),
            }],
            n_plus_one_detections: vec![NPlusOneDetection {
                pattern: "SELECT * FROM posts WHERE user_id = $?".to_string(),
                count: 3,
                request_id: "req-1".to_string(),
                suggestion: "Batch it".to_string(),
            }],
        }
    }

    #[test]
    fn test_slow_message_with_index() {
        let warning = sample_report().slow_queries.remove(0);
        let msg = warning.message(100);
        assert!(msg.starts_with("Slow query detected: 250ms (threshold 100ms) in request req-1"));
        assert!(msg.contains("SELECT * FROM users WHERE email = $1"));
        assert!(msg.contains("Suggested index: CREATE INDEX idx_users_email"));
    }

    #[test]
    fn test_slow_message_without_index() {
        let warning = SlowQueryWarning {
            sql: "SELECT pg_sleep(1)".to_string(),
            duration_ms: 1000,
            request_id: "r".to_string(),
            suggested_index: None,
        };
        assert!(!warning.message(100).contains("Suggested index"));
    }

    #[test]
    fn test_display() {
        let text = sample_report().to_string();
        assert!(text.starts_with("Request req-1: 4 queries, 260ms total\n"));
        assert!(text.contains("Slow queries (1):"));
        assert!(text.contains("[250ms] SELECT * FROM users WHERE email = $1"));
        assert!(text.contains("N+1 patterns (1):"));
        assert!(text.contains("[x3] SELECT * FROM posts WHERE user_id = $?"));
    }

    #[test]
    fn test_display_clean() {
        let report = QueryAnalysisReport {
            request_id: "ok".to_string(),
            total_queries: 1,
            total_duration_ms: 2,
            slow_queries: vec![],
            n_plus_one_detections: vec![],
        };
        assert!(report.is_clean());
        assert_eq!(
            report.to_string(),
            "Request ok: 1 queries, 2ms total\n  no issues found\n"
        );
    }

    #[test]
    fn test_to_json_fields() {
        let json: serde_json::Value = serde_json::from_str(&sample_report().to_json()).unwrap();
        assert_eq!(json["request_id"], "req-1");
        assert_eq!(json["total_queries"], 4);
        assert_eq!(json["slow_queries"][0]["duration_ms"], 250);
        assert_eq!(json["n_plus_one_detections"][0]["count"], 3);
    }
}
