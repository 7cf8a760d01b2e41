use chrono::NaiveDate;
use serde::Serialize;

use crate::config::DateColumnMatchPolicy;
use crate::error::PipelineError;
use crate::metrics::{Metric, MetricValues};

// ---------------------------------------------------------------------------
// Cells + tables
// ---------------------------------------------------------------------------

/// One spreadsheet cell as handed over by the reader.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Stable text form used as a grouping key. `None` for empty cells.
    pub fn display_key(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        match self {
            Self::Empty => None,
            Self::Text(s) => Some(s.trim().to_string()),
            Self::Number(n) => Some(format_number(*n)),
            Self::Date(d) => Some(d.to_string()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<Option<f64>> for Cell {
    fn from(n: Option<f64>) -> Self {
        n.map_or(Self::Empty, Self::Number)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<NaiveDate> for Cell {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<Option<NaiveDate>> for Cell {
    fn from(d: Option<NaiveDate>) -> Self {
        d.map_or(Self::Empty, Self::Date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self { name: name.into(), cells }
    }

    pub fn empty(name: impl Into<String>, rows: usize) -> Self {
        Self::new(name, vec![Cell::Empty; rows])
    }
}

/// Column-major table. Every column holds exactly `row_count` cells; labels
/// may repeat.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<Column>) -> Result<Self, PipelineError> {
        let mut table = Self::new();
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Build from a header and row-major cells. Rows must match the header width.
    pub fn from_rows<S: AsRef<str>>(labels: &[S], rows: Vec<Vec<Cell>>) -> Result<Self, PipelineError> {
        let mut columns: Vec<Column> = labels
            .iter()
            .map(|l| Column::new(l.as_ref(), Vec::with_capacity(rows.len())))
            .collect();

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(PipelineError::RaggedTable {
                    column: format!("row {i}"),
                    expected: columns.len(),
                    found: row.len(),
                });
            }
            for (column, cell) in columns.iter_mut().zip(row) {
                column.cells.push(cell);
            }
        }

        Self::from_columns(columns)
    }

    pub fn push_column(&mut self, column: Column) -> Result<(), PipelineError> {
        if self.columns.is_empty() {
            self.row_count = column.cells.len();
        } else if column.cells.len() != self.row_count {
            return Err(PipelineError::RaggedTable {
                column: column.name,
                expected: self.row_count,
                found: column.cells.len(),
            });
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn labels(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Index of the first column with exactly this label.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == label)
    }

    /// First column with exactly this label.
    pub fn column(&self, label: &str) -> Option<&Column> {
        self.position(label).map(|i| &self.columns[i])
    }

    /// Rewrite every label in place. Cells are untouched.
    pub fn relabel(&mut self, mut f: impl FnMut(&str) -> String) {
        for column in &mut self.columns {
            column.name = f(&column.name);
        }
    }

    /// Row-major copy of one row.
    pub fn row(&self, index: usize) -> Vec<Cell> {
        self.columns.iter().map(|c| c.cells[index].clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One sheet of the advertising workbook.
#[derive(Debug, Clone)]
pub struct SecondarySheet {
    pub name: String,
    pub table: Table,
}

impl SecondarySheet {
    pub fn new(name: impl Into<String>, table: Table) -> Self {
        Self { name: name.into(), table }
    }
}

/// Pre-loaded tables for one run: the store-visit table plus the
/// advertising sheets in workbook order.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    pub primary: Table,
    pub secondary: Vec<SecondarySheet>,
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommentScope {
    Overall { metric: Metric },
    Segment { column: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub scope: CommentScope,
    pub text: String,
}

impl std::fmt::Display for Comment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Row accounting for the outer join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    pub rows: usize,
    pub matched: usize,
    pub secondary_only: usize,
    pub primary_only: usize,
    /// Rows whose date cell was empty or unparseable (counted in the `*_only` totals too).
    pub undated: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub join: JoinStats,
    pub means: MetricValues,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsedSheet {
    pub name: String,
    pub date_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMeta {
    pub engine_version: String,
    pub date_policy: DateColumnMatchPolicy,
    pub sheets_used: Vec<UsedSheet>,
    pub sheets_skipped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub meta: RunMeta,
    pub summary: KpiSummary,
    pub table: Table,
    pub comments: Vec<Comment>,
}

impl PipelineOutput {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn from_rows_builds_columns() {
        let t = Table::from_rows(
            &["日付", "Cost"],
            vec![
                vec![Cell::from(d("2024-01-01")), Cell::from(100.0)],
                vec![Cell::Empty, Cell::from("200")],
            ],
        )
        .unwrap();
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.column_count(), 2);
        assert_eq!(t.column("Cost").unwrap().cells[1], Cell::Text("200".into()));
        assert_eq!(t.row(0), vec![Cell::Date(d("2024-01-01")), Cell::Number(100.0)]);
    }

    #[test]
    fn from_rows_rejects_short_row() {
        let err = Table::from_rows(&["a", "b"], vec![vec![Cell::Empty]]).unwrap_err();
        assert!(matches!(err, PipelineError::RaggedTable { expected: 2, found: 1, .. }));
    }

    #[test]
    fn push_column_rejects_length_mismatch() {
        let mut t = Table::new();
        t.push_column(Column::empty("a", 2)).unwrap();
        let err = t.push_column(Column::empty("b", 3)).unwrap_err();
        assert_eq!(
            err,
            PipelineError::RaggedTable { column: "b".into(), expected: 2, found: 3 }
        );
    }

    #[test]
    fn duplicate_labels_resolve_to_first() {
        let t = Table::from_columns(vec![
            Column::new("x", vec![Cell::from(1.0)]),
            Column::new("x", vec![Cell::from(2.0)]),
        ])
        .unwrap();
        assert_eq!(t.position("x"), Some(0));
        assert_eq!(t.column("x").unwrap().cells[0], Cell::Number(1.0));
    }

    #[test]
    fn display_key_formats() {
        assert_eq!(Cell::from(3.0).display_key().as_deref(), Some("3"));
        assert_eq!(Cell::from(2.5).display_key().as_deref(), Some("2.5"));
        assert_eq!(Cell::from("  google ").display_key().as_deref(), Some("google"));
        assert_eq!(Cell::from("   ").display_key(), None);
        assert_eq!(Cell::Empty.display_key(), None);
        assert!(Cell::from(" \u{3000}").is_empty());
        assert!(!Cell::from(0.0).is_empty());
        assert_eq!(Cell::from(d("2024-03-01")).display_key().as_deref(), Some("2024-03-01"));
    }

    #[test]
    fn cells_serialize_untagged() {
        let cells = vec![
            Cell::Empty,
            Cell::from(1.5),
            Cell::from("a"),
            Cell::from(d("2024-01-02")),
        ];
        let json = serde_json::to_string(&cells).unwrap();
        assert_eq!(json, r#"[null,1.5,"a","2024-01-02"]"#);
    }
}
