//! `mktkpi`: store-visit × advertising reconciliation with KPI commentary.
//!
//! Pure engine crate: receives pre-parsed tables, returns the merged KPI
//! table and remark list. Spreadsheet reading/writing and any UI live with
//! the caller; progress is reported through a [`DiagnosticSink`].

pub mod coerce;
pub mod commentary;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod report;

pub use config::{Benchmarks, DateColumnMatchPolicy, PipelineConfig};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, LogSink, NullSink};
pub use engine::run;
pub use error::PipelineError;
pub use metrics::{Metric, MetricValues};
pub use model::{Cell, Column, Comment, CommentScope, PipelineInput, PipelineOutput, SecondarySheet, Table};
pub use report::ReportLayout;
