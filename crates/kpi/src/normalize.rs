use crate::config::PipelineConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::PipelineError;
use crate::model::Table;

/// Source name used in diagnostics for the store-visit table.
pub const PRIMARY_SOURCE: &str = "primary";

/// Strip surrounding whitespace (including full-width spaces) from a label.
pub fn trim_label(label: &str) -> String {
    label.trim().to_string()
}

/// Trim every column label in place. Idempotent.
pub fn trim_labels(table: &mut Table) {
    table.relabel(trim_label);
}

/// Trim the primary table's labels and require the configured date column.
///
/// Emits the cleaned label list. Fails with `MissingRequiredColumn` when no
/// label equals `required_date_column` exactly after trimming.
pub fn normalize_primary(
    mut table: Table,
    config: &PipelineConfig,
    sink: &mut dyn DiagnosticSink,
) -> Result<Table, PipelineError> {
    trim_labels(&mut table);
    let labels = table.labels();
    sink.emit(Diagnostic::ColumnsDiscovered {
        source: PRIMARY_SOURCE.into(),
        columns: labels.clone(),
    });

    if table.position(&config.required_date_column).is_none() {
        let err = PipelineError::MissingRequiredColumn {
            column: config.required_date_column.clone(),
            available: labels,
        };
        sink.emit(Diagnostic::Fatal { message: err.to_string() });
        return Err(err);
    }

    Ok(table)
}
