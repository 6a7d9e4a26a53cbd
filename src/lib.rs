pub mod analyzer;
pub mod config;
pub mod replay;

#[cfg(feature = "python")]
pub mod python;

pub use analyzer::{normalize, suggest_index, DiagnosticSink, QueryAnalysisReport, QueryTracker};
pub use config::{AnalyzerConfig, Environment};
