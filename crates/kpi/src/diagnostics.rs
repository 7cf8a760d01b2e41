//! Progress and decision events emitted while a run executes.
//!
//! Events are notifications only: whether a run succeeded is decided by the
//! `Result` returned from [`crate::run`], never by what was emitted here.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Trimmed column labels of the primary table or of one sheet.
    ColumnsDiscovered { source: String, columns: Vec<String> },
    DateColumnSelected { sheet: String, column: String },
    SheetSkipped { sheet: String },
    SheetsMerged { sheets: usize, rows: usize },
    /// A metric input field is missing from the merged table.
    FieldMissing { field: String },
    SegmentColumnMissing { column: String },
    MetricsComputed { rows: usize },
    Fatal { message: String },
}

impl Diagnostic {
    pub fn level(&self) -> Level {
        match self {
            Self::ColumnsDiscovered { .. } | Self::SheetsMerged { .. } => Level::Info,
            Self::DateColumnSelected { .. } | Self::MetricsComputed { .. } => Level::Success,
            Self::SheetSkipped { .. } | Self::FieldMissing { .. } | Self::SegmentColumnMissing { .. } => {
                Level::Warning
            }
            Self::Fatal { .. } => Level::Error,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ColumnsDiscovered { source, columns } => {
                write!(f, "{source}: columns [{}]", columns.join(", "))
            }
            Self::DateColumnSelected { sheet, column } => {
                write!(f, "{sheet}: using '{column}' as the date column")
            }
            Self::SheetSkipped { sheet } => {
                write!(f, "{sheet}: no date column found, sheet skipped")
            }
            Self::SheetsMerged { sheets, rows } => {
                write!(f, "merged {sheets} sheet(s) into {rows} row(s)")
            }
            Self::FieldMissing { field } => {
                write!(f, "column '{field}' not found; dependent metrics are undefined")
            }
            Self::SegmentColumnMissing { column } => {
                write!(f, "segment column '{column}' not found; segment skipped")
            }
            Self::MetricsComputed { rows } => write!(f, "computed KPIs for {rows} row(s)"),
            Self::Fatal { message } => f.write_str(message),
        }
    }
}

/// Receiver for [`Diagnostic`] events.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn emit(&mut self, diagnostic: Diagnostic) {
        (**self).emit(diagnostic);
    }
}

/// Forwards events to the `log` facade under the `mktkpi` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.level() {
            Level::Info => log::info!(target: "mktkpi", "{diagnostic}"),
            Level::Success => log::info!(target: "mktkpi", "ok: {diagnostic}"),
            Level::Warning => log::warn!(target: "mktkpi", "{diagnostic}"),
            Level::Error => log::error!(target: "mktkpi", "{diagnostic}"),
        }
    }
}

/// Keeps every event in order.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub events: Vec<Diagnostic>,
}

impl CollectingSink {
    pub fn at_level(&self, level: Level) -> impl Iterator<Item = &Diagnostic> {
        self.events.iter().filter(move |d| d.level() == level)
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.events.push(diagnostic);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&mut self, _diagnostic: Diagnostic) {}
}
