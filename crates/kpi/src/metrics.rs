//! Per-row KPI derivation and null-aware averaging.

use serde::{Deserialize, Serialize};

use crate::coerce::parse_number;
use crate::config::FieldNames;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::PipelineError;
use crate::model::{Cell, Column, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Metric {
    #[serde(rename = "ROAS")]
    Roas,
    #[serde(rename = "CPA")]
    Cpa,
    #[serde(rename = "LTV")]
    Ltv,
    #[serde(rename = "ROI")]
    Roi,
}

impl Metric {
    /// Output order for columns and remarks.
    pub const ALL: [Metric; 4] = [Metric::Roas, Metric::Cpa, Metric::Ltv, Metric::Roi];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Roas => "ROAS",
            Self::Cpa => "CPA",
            Self::Ltv => "LTV",
            Self::Roi => "ROI",
        }
    }

    /// CPA is a cost, so lower is better; the others are returns.
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, Self::Cpa)
    }

    pub fn compute(&self, raw: RawInputs) -> Option<f64> {
        match self {
            Self::Roas => safe_div(raw.sales, raw.cost),
            Self::Cpa => safe_div(raw.cost, raw.conversions),
            Self::Ltv => safe_div(raw.sales, raw.conversions),
            Self::Roi => {
                let (sales, cost) = (raw.sales?, raw.cost?);
                safe_div(Some(sales - cost), Some(cost))
            }
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Division that is `None` for an absent operand or a zero denominator, and
/// never yields NaN or infinity.
pub fn safe_div(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 {
        return None;
    }
    let value = n / d;
    value.is_finite().then_some(value)
}

/// The raw fields of one joined row, already coerced.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawInputs {
    pub sales: Option<f64>,
    pub cost: Option<f64>,
    pub conversions: Option<f64>,
}

/// One value per metric; `None` means undefined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricValues {
    #[serde(rename = "ROAS")]
    pub roas: Option<f64>,
    #[serde(rename = "CPA")]
    pub cpa: Option<f64>,
    #[serde(rename = "LTV")]
    pub ltv: Option<f64>,
    #[serde(rename = "ROI")]
    pub roi: Option<f64>,
}

impl MetricValues {
    pub fn compute(raw: RawInputs) -> Self {
        Self {
            roas: Metric::Roas.compute(raw),
            cpa: Metric::Cpa.compute(raw),
            ltv: Metric::Ltv.compute(raw),
            roi: Metric::Roi.compute(raw),
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Roas => self.roas,
            Metric::Cpa => self.cpa,
            Metric::Ltv => self.ltv,
            Metric::Roi => self.roi,
        }
    }

    /// Per-metric mean over the rows where that metric is defined.
    pub fn mean_of<'a>(rows: impl IntoIterator<Item = &'a MetricValues>) -> Self {
        let rows: Vec<&MetricValues> = rows.into_iter().collect();
        let mean = |metric: Metric| mean_defined(rows.iter().map(|r| r.get(metric)));
        Self {
            roas: mean(Metric::Roas),
            cpa: mean(Metric::Cpa),
            ltv: mean(Metric::Ltv),
            roi: mean(Metric::Roi),
        }
    }
}

/// Arithmetic mean of the defined values; absent values count in neither the
/// sum nor the divisor. `None` when nothing is defined.
pub fn mean_defined(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0_f64, 0_usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        return None;
    }
    let mean = sum / count as f64;
    mean.is_finite().then_some(mean)
}

/// Compute the four metrics for every row and append them as columns, in
/// `Metric::ALL` order. Returns the per-row values for aggregation.
pub fn attach_metrics(
    table: &mut Table,
    fields: &FieldNames,
    sink: &mut dyn DiagnosticSink,
) -> Result<Vec<MetricValues>, PipelineError> {
    let mut lookup = |label: &str| -> Option<usize> {
        let position = table.position(label);
        if position.is_none() {
            sink.emit(Diagnostic::FieldMissing { field: label.to_string() });
        }
        position
    };
    let sales = lookup(&fields.sales);
    let cost = lookup(&fields.cost);
    let conversions = lookup(&fields.conversions);

    let columns = table.columns();
    let read = |position: Option<usize>, row: usize| {
        position.and_then(|i| parse_number(&columns[i].cells[row]))
    };

    let values: Vec<MetricValues> = (0..table.row_count())
        .map(|row| {
            MetricValues::compute(RawInputs {
                sales: read(sales, row),
                cost: read(cost, row),
                conversions: read(conversions, row),
            })
        })
        .collect();

    for metric in Metric::ALL {
        let cells = values.iter().map(|v| Cell::from(v.get(metric))).collect();
        table.push_column(Column::new(metric.label(), cells))?;
    }

    Ok(values)
}
