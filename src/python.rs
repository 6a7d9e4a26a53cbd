//! Optional Python bindings for querywatch via PyO3.
//!
//! Enabled with the `python` feature flag.
//!
//! ## Usage from Python
//!
//! ```python
//! import querywatch
//!
//! querywatch.normalize_sql("SELECT * FROM users WHERE id = $7")
//! # 'SELECT * FROM users WHERE id = $?'
//!
//! querywatch.suggest_index("SELECT * FROM users WHERE email = $1")
//! # 'CREATE INDEX idx_users_email ON users (email);'
//!
//! tracker = querywatch.QueryTracker(slow_query_threshold_ms=50, enabled=True)
//! tracker.track("SELECT * FROM posts WHERE user_id = $1", 5, "req-1")
//! report = tracker.report("req-1")   # dict, or None
//! tracker.clear("req-1")
//! ```

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::analyzer::{self, QueryAnalysisReport};
use crate::config::{AnalyzerConfig, DEFAULT_N_PLUS_ONE_THRESHOLD, DEFAULT_SLOW_QUERY_THRESHOLD_MS};

/// Normalize a SQL statement into its structural pattern key.
#[pyfunction]
fn normalize_sql(sql: &str) -> String {
    analyzer::normalize(sql)
}

/// Suggest a CREATE INDEX statement from the query's WHERE clause.
///
/// Returns:
///     The statement, or None when no table or column could be found.
#[pyfunction]
fn suggest_index(sql: &str) -> Option<String> {
    analyzer::suggest_index(sql)
}

/// Per-request query tracker. Warnings go to the `tracing` log.
#[pyclass(name = "QueryTracker")]
struct PyQueryTracker {
    inner: analyzer::QueryTracker,
}

#[pymethods]
impl PyQueryTracker {
    #[new]
    #[pyo3(signature = (slow_query_threshold_ms=DEFAULT_SLOW_QUERY_THRESHOLD_MS, n_plus_one_threshold=DEFAULT_N_PLUS_ONE_THRESHOLD, enabled=None))]
    fn new(slow_query_threshold_ms: u64, n_plus_one_threshold: usize, enabled: Option<bool>) -> Self {
        let config = AnalyzerConfig {
            slow_query_threshold_ms,
            n_plus_one_threshold,
            enabled,
        };
        Self {
            inner: analyzer::QueryTracker::new(&config),
        }
    }

    fn is_enabled(&self) -> bool {
        self.inner.is_enabled()
    }

    fn track(&self, sql: &str, duration_ms: u64, request_id: &str) {
        self.inner.track(sql, duration_ms, request_id);
    }

    /// Analyze a request. Returns a dict, or None if nothing was tracked.
    fn report(&self, py: Python<'_>, request_id: &str) -> PyResult<Option<Py<PyDict>>> {
        match self.inner.report(request_id) {
            Some(report) => Ok(Some(report_to_dict(py, &report)?)),
            None => Ok(None),
        }
    }

    fn clear(&self, request_id: &str) {
        self.inner.clear(request_id);
    }

    fn clear_all(&self) {
        self.inner.clear_all();
    }
}

fn report_to_dict(py: Python<'_>, report: &QueryAnalysisReport) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("request_id", &report.request_id)?;
    dict.set_item("total_queries", report.total_queries)?;
    dict.set_item("total_duration_ms", report.total_duration_ms)?;

    let slow = PyList::empty_bound(py);
    for warning in &report.slow_queries {
        let item = PyDict::new_bound(py);
        item.set_item("sql", &warning.sql)?;
        item.set_item("duration_ms", warning.duration_ms)?;
        item.set_item("request_id", &warning.request_id)?;
        item.set_item("suggested_index", warning.suggested_index.as_deref())?;
        slow.append(item)?;
    }
    dict.set_item("slow_queries", slow)?;

    let n_plus_one = PyList::empty_bound(py);
    for detection in &report.n_plus_one_detections {
        let item = PyDict::new_bound(py);
        item.set_item("pattern", &detection.pattern)?;
        item.set_item("count", detection.count)?;
        item.set_item("request_id", &detection.request_id)?;
        item.set_item("suggestion", &detection.suggestion)?;
        n_plus_one.append(item)?;
    }
    dict.set_item("n_plus_one_detections", n_plus_one)?;

    Ok(dict.unbind())
}

/// querywatch Python module.
#[pymodule]
fn _querywatch(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(normalize_sql, m)?)?;
    m.add_function(wrap_pyfunction!(suggest_index, m)?)?;
    m.add_class::<PyQueryTracker>()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
