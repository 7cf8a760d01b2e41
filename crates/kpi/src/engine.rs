use crate::commentary::{overall_comments, segment_comments};
use crate::config::PipelineConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::PipelineError;
use crate::metrics::{attach_metrics, MetricValues};
use crate::model::{KpiSummary, PipelineInput, PipelineOutput, RunMeta};
use crate::normalize::normalize_primary;
use crate::reconcile::reconcile;

/// Run the whole pipeline: normalize, reconcile, derive KPIs, comment.
///
/// Fatal conditions return `Err` after a `Fatal` diagnostic; nothing partial
/// is produced.
pub fn run(
    config: &PipelineConfig,
    input: PipelineInput,
    sink: &mut dyn DiagnosticSink,
) -> Result<PipelineOutput, PipelineError> {
    if let Err(err) = config.validate() {
        sink.emit(Diagnostic::Fatal { message: err.to_string() });
        return Err(err);
    }

    let primary = normalize_primary(input.primary, config, sink)?;
    let reconciled = reconcile(primary, input.secondary, config, sink)?;

    let mut table = reconciled.table;
    let values = attach_metrics(&mut table, &config.fields, sink)?;
    sink.emit(Diagnostic::MetricsComputed { rows: values.len() });

    let means = MetricValues::mean_of(&values);
    let mut comments = overall_comments(&means, config);
    comments.extend(segment_comments(&table, &values, config, sink));

    Ok(PipelineOutput {
        meta: RunMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            date_policy: config.date_detection.policy,
            sheets_used: reconciled.used,
            sheets_skipped: reconciled.skipped,
        },
        summary: KpiSummary {
            join: reconciled.stats,
            means,
        },
        table,
        comments,
    })
}
