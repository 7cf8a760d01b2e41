//! Date-column detection on the advertising sheets and the date-keyed full
//! outer join against the store table.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::coerce::parse_date;
use crate::config::{DateDetection, PipelineConfig};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::PipelineError;
use crate::model::{Cell, Column, JoinStats, SecondarySheet, Table, UsedSheet};
use crate::normalize::trim_labels;

// ---------------------------------------------------------------------------
// Keyed tables
// ---------------------------------------------------------------------------

/// A table with its join key parsed into dates. `keys.len()` is the row
/// count; every payload column has that many cells.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedTable {
    pub keys: Vec<Option<NaiveDate>>,
    pub columns: Vec<Column>,
}

impl KeyedTable {
    /// Parse column `key_index` into dates. Columns labeled `key_label` leave
    /// the payload; any other detected column stays as raw data.
    pub fn from_table(table: Table, key_index: usize, key_label: &str) -> Self {
        let rows = table.row_count();
        let columns = table.into_columns();
        let keys = match columns.get(key_index) {
            Some(column) => column.cells.iter().map(parse_date).collect(),
            None => vec![None; rows],
        };
        let columns = columns.into_iter().filter(|c| c.name != key_label).collect();
        Self { keys, columns }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Index of the first label, in column order, accepted by the active policy.
pub fn detect_date_column(labels: &[String], detection: &DateDetection) -> Option<usize> {
    labels.iter().position(|l| detection.matches(l))
}

/// Trim one sheet's labels and key it by its detected date column.
/// `None` means the sheet has no date column and is left out of the merge.
pub fn prepare_secondary(
    sheet: SecondarySheet,
    config: &PipelineConfig,
    sink: &mut dyn DiagnosticSink,
) -> Option<(UsedSheet, KeyedTable)> {
    let SecondarySheet { name, mut table } = sheet;
    trim_labels(&mut table);
    let labels = table.labels();
    sink.emit(Diagnostic::ColumnsDiscovered {
        source: name.clone(),
        columns: labels.clone(),
    });

    let Some(index) = detect_date_column(&labels, &config.date_detection) else {
        sink.emit(Diagnostic::SheetSkipped { sheet: name });
        return None;
    };

    let column = labels[index].clone();
    sink.emit(Diagnostic::DateColumnSelected {
        sheet: name.clone(),
        column: column.clone(),
    });

    let keyed = KeyedTable::from_table(table, index, &config.required_date_column);
    Some((UsedSheet { name, date_column: column }, keyed))
}

// ---------------------------------------------------------------------------
// Concatenation
// ---------------------------------------------------------------------------

/// Stack keyed tables row-wise. Columns are unioned by (label, occurrence)
/// in first-seen order; rows from a table lacking a column get empty cells.
pub fn concat(parts: Vec<KeyedTable>) -> KeyedTable {
    let mut slots: Vec<(String, usize)> = Vec::new();
    let mut slot_index: HashMap<(String, usize), usize> = HashMap::new();
    let mut mappings: Vec<Vec<usize>> = Vec::with_capacity(parts.len());

    for part in &parts {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut mapping = Vec::with_capacity(part.columns.len());
        for column in &part.columns {
            let occurrence = seen.entry(column.name.as_str()).or_insert(0);
            let key = (column.name.clone(), *occurrence);
            *occurrence += 1;
            let slot = *slot_index.entry(key.clone()).or_insert_with(|| {
                slots.push(key);
                slots.len() - 1
            });
            mapping.push(slot);
        }
        mappings.push(mapping);
    }

    let total: usize = parts.iter().map(KeyedTable::len).sum();
    let mut columns: Vec<Column> = slots
        .into_iter()
        .map(|(name, _)| Column::new(name, Vec::with_capacity(total)))
        .collect();
    let mut keys = Vec::with_capacity(total);

    for (part, mapping) in parts.into_iter().zip(mappings) {
        let rows = part.len();
        keys.extend(part.keys);
        let mut filled = vec![false; columns.len()];
        for (column, slot) in part.columns.into_iter().zip(mapping) {
            columns[slot].cells.extend(column.cells);
            filled[slot] = true;
        }
        for (slot, done) in filled.into_iter().enumerate() {
            if !done {
                columns[slot].cells.extend(std::iter::repeat(Cell::Empty).take(rows));
            }
        }
    }

    KeyedTable { keys, columns }
}

// ---------------------------------------------------------------------------
// Outer join
// ---------------------------------------------------------------------------

type DateIndex = BTreeMap<NaiveDate, Vec<usize>>;

fn index_by_date(keys: &[Option<NaiveDate>]) -> (DateIndex, Vec<usize>) {
    let mut dated: DateIndex = BTreeMap::new();
    let mut undated = Vec::new();
    for (row, key) in keys.iter().enumerate() {
        match key {
            Some(date) => dated.entry(*date).or_default().push(row),
            None => undated.push(row),
        }
    }
    (dated, undated)
}

/// One output row: the key plus the source row on each side, if any.
type Pick = (Option<NaiveDate>, Option<usize>, Option<usize>);

fn project(column: &Column, picks: impl Iterator<Item = Option<usize>>) -> Column {
    let cells = picks
        .map(|row| row.map_or(Cell::Empty, |i| column.cells[i].clone()))
        .collect();
    Column::new(column.name.clone(), cells)
}

/// Full outer join of the advertising rows (left) with the store rows (right)
/// on date.
///
/// Output columns are the key (labeled `key_label`), the left payload, then
/// the right payload, with clashing labels kept side by side. Rows come in
/// ascending date order; a date present on both sides yields every
/// left × right pairing, left-major. Rows with no date never match and are
/// appended last, left side first.
pub fn outer_join(
    left: KeyedTable,
    right: KeyedTable,
    key_label: &str,
) -> Result<(Table, JoinStats), PipelineError> {
    let (left_dated, left_undated) = index_by_date(&left.keys);
    let (right_dated, right_undated) = index_by_date(&right.keys);
    let dates: BTreeSet<NaiveDate> = left_dated.keys().chain(right_dated.keys()).copied().collect();

    let mut stats = JoinStats::default();
    let mut plan: Vec<Pick> = Vec::with_capacity(left.len().max(right.len()));

    for date in dates {
        match (left_dated.get(&date), right_dated.get(&date)) {
            (Some(ls), Some(rs)) => {
                for &l in ls {
                    for &r in rs {
                        plan.push((Some(date), Some(l), Some(r)));
                    }
                }
                stats.matched += ls.len() * rs.len();
            }
            (Some(ls), None) => {
                plan.extend(ls.iter().map(|&l| (Some(date), Some(l), None)));
                stats.secondary_only += ls.len();
            }
            (None, Some(rs)) => {
                plan.extend(rs.iter().map(|&r| (Some(date), None, Some(r))));
                stats.primary_only += rs.len();
            }
            (None, None) => {}
        }
    }

    plan.extend(left_undated.iter().map(|&l| (None, Some(l), None)));
    plan.extend(right_undated.iter().map(|&r| (None, None, Some(r))));
    stats.secondary_only += left_undated.len();
    stats.primary_only += right_undated.len();
    stats.undated = left_undated.len() + right_undated.len();
    stats.rows = plan.len();

    let mut columns = Vec::with_capacity(1 + left.columns.len() + right.columns.len());
    columns.push(Column::new(
        key_label,
        plan.iter().map(|(date, _, _)| Cell::from(*date)).collect(),
    ));
    for column in &left.columns {
        columns.push(project(column, plan.iter().map(|p| p.1)));
    }
    for column in &right.columns {
        columns.push(project(column, plan.iter().map(|p| p.2)));
    }

    Ok((Table::from_columns(columns)?, stats))
}

// ---------------------------------------------------------------------------
// Stage entry point
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub table: Table,
    pub stats: JoinStats,
    pub used: Vec<UsedSheet>,
    pub skipped: Vec<String>,
}

/// Key every usable sheet by date, stack them, and outer-join the result
/// with the (already normalized) primary table.
///
/// Sheets without a date column are skipped with a warning; if none remain
/// the run fails with `NoUsableSecondaryData`.
pub fn reconcile(
    primary: Table,
    sheets: Vec<SecondarySheet>,
    config: &PipelineConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<Reconciled, PipelineError> {
    let key_label = config.required_date_column.as_str();
    let key_index = primary
        .position(key_label)
        .ok_or_else(|| PipelineError::MissingRequiredColumn {
            column: key_label.to_string(),
            available: primary.labels(),
        })?;
    let primary = KeyedTable::from_table(primary, key_index, key_label);

    let mut used = Vec::new();
    let mut skipped = Vec::new();
    let mut parts = Vec::new();
    for sheet in sheets {
        let name = sheet.name.clone();
        match prepare_secondary(sheet, config, sink) {
            Some((sheet_info, keyed)) => {
                used.push(sheet_info);
                parts.push(keyed);
            }
            None => skipped.push(name),
        }
    }

    if parts.is_empty() {
        let err = PipelineError::NoUsableSecondaryData { skipped };
        sink.emit(Diagnostic::Fatal { message: err.to_string() });
        return Err(err);
    }

    let (table, stats) = outer_join(concat(parts), primary, key_label)?;
    sink.emit(Diagnostic::SheetsMerged {
        sheets: used.len(),
        rows: stats.rows,
    });

    Ok(Reconciled {
        table,
        stats,
        used,
        skipped,
    })
}
