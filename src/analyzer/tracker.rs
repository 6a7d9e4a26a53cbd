/// Per-request query tracking.
///
/// One [`QueryTracker`] is built at startup and shared by reference across
/// every in-flight request. Each request appends to its own log keyed by
/// request id; the log map is sharded so concurrent requests on different
/// threads do not contend on a single lock.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, trace};

use super::index_advisor::suggest_index;
use super::normalize::normalize;
use super::report::{NPlusOneDetection, QueryAnalysisReport, SlowQueryWarning, TrackedQuery};
use super::sink::{DiagnosticSink, TracingSink};
use crate::config::{AnalyzerConfig, MIN_N_PLUS_ONE_THRESHOLD};

/// Advice attached to every N+1 detection.
pub const N_PLUS_ONE_SUGGESTION: &str = "Consider batching these into a single query \
    (WHERE ... IN (...)) or loading the related rows with a JOIN.";

pub struct QueryTracker {
    enabled: bool,
    slow_query_threshold_ms: u64,
    n_plus_one_threshold: usize,
    sink: Arc<dyn DiagnosticSink>,
    queries: DashMap<String, Vec<TrackedQuery>>,
}

impl QueryTracker {
    /// Build a tracker that reports through [`TracingSink`].
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    /// Build a tracker with an explicit sink.
    ///
    /// Enablement is resolved here, once. An N+1 threshold below 2 is
    /// raised to 2.
    pub fn with_sink(config: &AnalyzerConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        let enabled = config.resolve_enabled();
        let n_plus_one_threshold = config.n_plus_one_threshold.max(MIN_N_PLUS_ONE_THRESHOLD);
        debug!(
            enabled,
            slow_query_threshold_ms = config.slow_query_threshold_ms,
            n_plus_one_threshold,
            "query tracker created"
        );
        Self {
            enabled,
            slow_query_threshold_ms: config.slow_query_threshold_ms,
            n_plus_one_threshold,
            sink,
            queries: DashMap::new(),
        }
    }

    /// A tracker that ignores everything.
    pub fn disabled() -> Self {
        Self::new(&AnalyzerConfig::default().with_enabled(false))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn slow_query_threshold_ms(&self) -> u64 {
        self.slow_query_threshold_ms
    }

    pub fn n_plus_one_threshold(&self) -> usize {
        self.n_plus_one_threshold
    }

    /// Record one executed statement.
    ///
    /// Slow statements are reported to the sink right away, one message
    /// per call. Disabled trackers return before allocating anything.
    pub fn track(&self, sql: &str, duration_ms: u64, request_id: &str) {
        if !self.enabled {
            return;
        }

        trace!(request_id, duration_ms, "tracking query");
        let query = TrackedQuery {
            sql: sql.to_string(),
            duration_ms,
            request_id: request_id.to_string(),
            timestamp: Utc::now(),
        };
        self.queries
            .entry(request_id.to_string())
            .or_default()
            .push(query);

        // Sink runs outside the map lock.
        if duration_ms > self.slow_query_threshold_ms {
            let warning = self.slow_warning(sql, duration_ms, request_id);
            self.sink.write(&warning.message(self.slow_query_threshold_ms));
        }
    }

    /// Analyze everything tracked for `request_id` so far.
    ///
    /// Returns `None` when disabled or when nothing was tracked for the id.
    /// Each qualifying N+1 group is also written to the sink, so calling
    /// this twice writes those warnings twice.
    pub fn report(&self, request_id: &str) -> Option<QueryAnalysisReport> {
        if !self.enabled {
            return None;
        }

        let queries = self.queries.get(request_id)?.value().clone();

        let slow_queries: Vec<SlowQueryWarning> = queries
            .iter()
            .filter(|q| q.duration_ms > self.slow_query_threshold_ms)
            .map(|q| self.slow_warning(&q.sql, q.duration_ms, &q.request_id))
            .collect();

        let n_plus_one_detections = self.detect_n_plus_one(&queries, request_id);
        for detection in &n_plus_one_detections {
            self.sink.write(&detection.message());
        }

        let report = QueryAnalysisReport {
            request_id: request_id.to_string(),
            total_queries: queries.len(),
            total_duration_ms: queries
                .iter()
                .fold(0u64, |acc, q| acc.saturating_add(q.duration_ms)),
            slow_queries,
            n_plus_one_detections,
        };
        debug!(
            request_id,
            total_queries = report.total_queries,
            slow = report.slow_queries.len(),
            n_plus_one = report.n_plus_one_detections.len(),
            "query report computed"
        );
        Some(report)
    }

    /// Report on a request and drop its log.
    pub fn finish(&self, request_id: &str) -> Option<QueryAnalysisReport> {
        let report = self.report(request_id);
        self.clear(request_id);
        report
    }

    pub fn clear(&self, request_id: &str) {
        self.queries.remove(request_id);
    }

    pub fn clear_all(&self) {
        self.queries.clear();
    }

    /// Number of request ids with at least one tracked query.
    pub fn active_requests(&self) -> usize {
        self.queries.len()
    }

    pub fn query_count(&self, request_id: &str) -> usize {
        self.queries.get(request_id).map_or(0, |q| q.len())
    }

    fn slow_warning(&self, sql: &str, duration_ms: u64, request_id: &str) -> SlowQueryWarning {
        SlowQueryWarning {
            sql: sql.to_string(),
            duration_ms,
            request_id: request_id.to_string(),
            suggested_index: suggest_index(sql),
        }
    }

    /// Group by normalized pattern, keeping first-seen order.
    fn detect_n_plus_one(
        &self,
        queries: &[TrackedQuery],
        request_id: &str,
    ) -> Vec<NPlusOneDetection> {
        let mut groups: Vec<(String, usize)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for query in queries {
            let pattern = normalize(&query.sql);
            match positions.get(&pattern) {
                Some(&idx) => groups[idx].1 += 1,
                None => {
                    positions.insert(pattern.clone(), groups.len());
                    groups.push((pattern, 1));
                }
            }
        }

        groups
            .into_iter()
            .filter(|(_, count)| *count >= self.n_plus_one_threshold)
            .map(|(pattern, count)| NPlusOneDetection {
                pattern,
                count,
                request_id: request_id.to_string(),
                suggestion: N_PLUS_ONE_SUGGESTION.to_string(),
            })
            .collect()
    }
}

impl Default for QueryTracker {
    fn default() -> Self {
        Self::new(&AnalyzerConfig::default())
    }
}

impl fmt::Debug for QueryTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryTracker")
            .field("enabled", &self.enabled)
            .field("slow_query_threshold_ms", &self.slow_query_threshold_ms)
            .field("n_plus_one_threshold", &self.n_plus_one_threshold)
            .field("active_requests", &self.queries.len())
            .finish_non_exhaustive()
    }
}
