/// Development-time SQL query analysis.
///
/// ```text
/// DB collaborator ── track(sql, ms, request_id) ──▶ QueryTracker   (tracker.rs)
///                                                     │
///                           slow? ──▶ Index Advisor ──┤ (index_advisor.rs)
///                                                     ▼
///                                                DiagnosticSink    (sink.rs)
///
/// Request end ── report(request_id) ──▶ normalize + group ──▶ QueryAnalysisReport
///                                       (normalize.rs)        (report.rs)
/// ```
///
/// Nothing here touches the database. When the tracker is disabled every
/// operation is a no-op and no query is ever stored.
pub mod index_advisor;
pub mod normalize;
pub mod report;
pub mod sink;
pub mod tracker;

pub use index_advisor::{
    advise, extract_table, extract_where_columns, suggest_index, IndexSuggestion,
};
pub use normalize::normalize;
pub use report::{NPlusOneDetection, QueryAnalysisReport, SlowQueryWarning, TrackedQuery};
pub use sink::{DiagnosticSink, MemorySink, TracingSink};
pub use tracker::{QueryTracker, N_PLUS_ONE_SUGGESTION};
