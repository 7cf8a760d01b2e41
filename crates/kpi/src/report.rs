//! Sheet layout for the downloadable report. Writing the workbook is left to
//! the caller's spreadsheet writer.

use serde::Serialize;

use crate::model::{Cell, PipelineOutput};

pub const REPORT_FILE_NAME: &str = "マーケ分析レポート.xlsx";
pub const KPI_SHEET_NAME: &str = "KPIレポート";
pub const COMMENT_SHEET_NAME: &str = "改善コメント";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetLayout {
    pub name: String,
    /// Row-major cells, header row first where the sheet has one.
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportLayout {
    pub file_name: String,
    pub sheets: Vec<SheetLayout>,
}

impl ReportLayout {
    /// KPI sheet: header row of labels, then every joined row. Comment
    /// sheet: one comment per row, no header.
    pub fn from_output(output: &PipelineOutput) -> Self {
        let table = &output.table;
        let mut kpi_rows: Vec<Vec<Cell>> = Vec::with_capacity(table.row_count() + 1);
        kpi_rows.push(table.labels().into_iter().map(Cell::Text).collect());
        kpi_rows.extend((0..table.row_count()).map(|i| table.row(i)));

        let comment_rows = output
            .comments
            .iter()
            .map(|c| vec![Cell::Text(c.text.clone())])
            .collect();

        Self {
            file_name: REPORT_FILE_NAME.into(),
            sheets: vec![
                SheetLayout { name: KPI_SHEET_NAME.into(), rows: kpi_rows },
                SheetLayout { name: COMMENT_SHEET_NAME.into(), rows: comment_rows },
            ],
        }
    }
}
