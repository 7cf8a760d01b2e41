//! Benchmark comparison and remark generation, overall and per segment.

use std::collections::BTreeMap;

use crate::config::{Benchmarks, PipelineConfig, RemarkTemplates};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::metrics::{Metric, MetricValues};
use crate::model::{Comment, CommentScope, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Mean is on the wrong side of the benchmark.
    Cautionary,
    /// Mean meets the benchmark (ties count as meeting it) or is undefined.
    Affirmative,
}

/// Compare a metric mean against its benchmark. Only a defined mean on the
/// wrong side of the benchmark is cautionary; an undefined mean falls through
/// to the affirmative remark.
pub fn assess(metric: Metric, mean: Option<f64>, benchmarks: &Benchmarks) -> Verdict {
    let Some(mean) = mean else {
        return Verdict::Affirmative;
    };
    let benchmark = benchmarks.get(metric);
    let falls_short = if metric.higher_is_better() {
        mean < benchmark
    } else {
        mean > benchmark
    };
    if falls_short {
        Verdict::Cautionary
    } else {
        Verdict::Affirmative
    }
}

fn remark<'a>(metric: Metric, means: &MetricValues, config: &'a PipelineConfig) -> &'a str {
    let verdict = assess(metric, means.get(metric), &config.benchmarks);
    remark_text(&config.remarks, metric, verdict)
}

fn remark_text(remarks: &RemarkTemplates, metric: Metric, verdict: Verdict) -> &str {
    remarks.get(metric).text(verdict)
}

/// One remark per metric, ROAS → CPA → LTV → ROI.
pub fn overall_comments(means: &MetricValues, config: &PipelineConfig) -> Vec<Comment> {
    Metric::ALL
        .iter()
        .map(|&metric| Comment {
            scope: CommentScope::Overall { metric },
            text: remark(metric, means, config).to_string(),
        })
        .collect()
}

/// Row indices grouped by the display value of `column`, ascending by value.
/// Rows with an empty segment value belong to no group.
fn group_rows(table: &Table, column: &str) -> Option<BTreeMap<String, Vec<usize>>> {
    let cells = &table.column(column)?.cells;
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (row, cell) in cells.iter().enumerate() {
        if let Some(key) = cell.display_key() {
            groups.entry(key).or_default().push(row);
        }
    }
    Some(groups)
}

/// One multi-line block per (segment column, value), columns in configured
/// order and values ascending. Segment columns absent from `table` are
/// reported and skipped.
pub fn segment_comments(
    table: &Table,
    values: &[MetricValues],
    config: &PipelineConfig,
    sink: &mut dyn DiagnosticSink,
) -> Vec<Comment> {
    let mut comments = Vec::new();

    for column in &config.segments.columns {
        let Some(groups) = group_rows(table, column) else {
            sink.emit(Diagnostic::SegmentColumnMissing { column: column.clone() });
            continue;
        };

        for (value, rows) in groups {
            let means = MetricValues::mean_of(rows.iter().map(|&r| &values[r]));
            let mut text = format!("【{column}: {value}】");
            for metric in Metric::ALL {
                text.push('\n');
                text.push_str(remark(metric, &means, config));
            }
            comments.push(Comment {
                scope: CommentScope::Segment {
                    column: column.clone(),
                    value,
                },
                text,
            });
        }
    }

    comments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::model::{Cell, Column};

    fn means(roas: f64, cpa: f64, ltv: f64, roi: f64) -> MetricValues {
        MetricValues {
            roas: Some(roas),
            cpa: Some(cpa),
            ltv: Some(ltv),
            roi: Some(roi),
        }
    }

    #[test]
    fn thresholds_and_ties() {
        let b = Benchmarks::default();
        assert_eq!(assess(Metric::Roas, Some(0.9), &b), Verdict::Cautionary);
        assert_eq!(assess(Metric::Roas, Some(1.2), &b), Verdict::Affirmative);
        assert_eq!(assess(Metric::Cpa, Some(3000.01), &b), Verdict::Cautionary);
        assert_eq!(assess(Metric::Cpa, Some(3000.0), &b), Verdict::Affirmative);
        assert_eq!(assess(Metric::Ltv, Some(5999.0), &b), Verdict::Cautionary);
        assert_eq!(assess(Metric::Ltv, Some(6000.0), &b), Verdict::Affirmative);
        assert_eq!(assess(Metric::Roi, Some(0.05), &b), Verdict::Cautionary);
        assert_eq!(assess(Metric::Roi, Some(0.1), &b), Verdict::Affirmative);
        assert_eq!(assess(Metric::Roi, None, &b), Verdict::Affirmative);
        assert_eq!(assess(Metric::Cpa, None, &b), Verdict::Affirmative);
    }

    #[test]
    fn overall_order_and_wording() {
        let config = PipelineConfig::default();
        let comments = overall_comments(&means(0.9, 2500.0, 7000.0, -0.2), &config);
        let texts: Vec<&str> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "ROASが業界平均を下回っています。ターゲティングや訴求強化を推奨します。",
                "CPAは業界平均以下で良好です。現状維持で効率化を。",
                "LTVは良好です。維持施策を継続しましょう。",
                "ROIが低く、投資回収が不十分です。抜本的な施策見直しを推奨します。",
            ]
        );
        assert_eq!(comments[0].scope, CommentScope::Overall { metric: Metric::Roas });
        assert_eq!(comments[3].scope, CommentScope::Overall { metric: Metric::Roi });
    }

    #[test]
    fn injected_benchmarks_flip_the_branch() {
        let mut config = PipelineConfig::default();
        config.benchmarks.roas = 0.5;
        let comments = overall_comments(&means(0.9, 0.0, 0.0, 0.0), &config);
        assert_eq!(comments[0].text, config.remarks.roas.affirmative);
    }

    #[test]
    fn segments_grouped_ascending() {
        let table = Table::from_columns(vec![Column::new(
            "媒体",
            vec![Cell::from("meta"), Cell::from("google"), Cell::Empty, Cell::from("meta")],
        )])
        .unwrap();
        let values = vec![
            means(2.0, 1000.0, 8000.0, 1.0),
            means(0.5, 5000.0, 1000.0, -0.5),
            means(9.0, 9.0, 9.0, 9.0),
            MetricValues::default(),
        ];
        let mut config = PipelineConfig::default();
        config.segments.columns = vec!["媒体".into()];
        let mut sink = CollectingSink::default();

        let comments = segment_comments(&table, &values, &config, &mut sink);
        assert_eq!(comments.len(), 2);
        assert_eq!(
            comments[0].scope,
            CommentScope::Segment { column: "媒体".into(), value: "google".into() }
        );
        let lines: Vec<&str> = comments[0].text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "【媒体: google】");
        assert_eq!(lines[1], config.remarks.roas.cautionary);
        assert_eq!(lines[2], config.remarks.cpa.cautionary);

        // meta: second row has nothing defined, so means come from the first row only
        let lines: Vec<&str> = comments[1].text.lines().collect();
        assert_eq!(lines[0], "【媒体: meta】");
        assert_eq!(lines[1], config.remarks.roas.affirmative);
        assert_eq!(lines[3], config.remarks.ltv.affirmative);
        assert!(sink.events.is_empty());
    }

    #[test]
    fn blocks_follow_configured_column_order() {
        let table = Table::from_columns(vec![
            Column::new("媒体", vec![Cell::from("meta"), Cell::from("google")]),
            Column::new("キャンペーン", vec![Cell::from("spring"), Cell::from("autumn")]),
        ])
        .unwrap();
        let values = vec![means(2.0, 1000.0, 8000.0, 1.0), means(0.5, 5000.0, 1000.0, -0.5)];
        let mut config = PipelineConfig::default();
        config.segments.columns = vec!["キャンペーン".into(), "媒体".into()];

        let comments = segment_comments(&table, &values, &config, &mut CollectingSink::default());
        let scopes: Vec<(String, String)> = comments
            .iter()
            .map(|c| match &c.scope {
                CommentScope::Segment { column, value } => (column.clone(), value.clone()),
                other => panic!("unexpected scope {other:?}"),
            })
            .collect();
        assert_eq!(
            scopes,
            vec![
                ("キャンペーン".to_string(), "autumn".to_string()),
                ("キャンペーン".to_string(), "spring".to_string()),
                ("媒体".to_string(), "google".to_string()),
                ("媒体".to_string(), "meta".to_string()),
            ]
        );
        assert!(comments[0].text.starts_with("【キャンペーン: autumn】\n"));
        assert!(comments[3].text.starts_with("【媒体: meta】\n"));
    }

    #[test]
    fn missing_segment_column_is_reported() {
        let table = Table::from_columns(vec![Column::empty("a", 1)]).unwrap();
        let mut config = PipelineConfig::default();
        config.segments.columns = vec!["キャンペーン名".into()];
        let mut sink = CollectingSink::default();
        let comments = segment_comments(&table, &[MetricValues::default()], &config, &mut sink);
        assert!(comments.is_empty());
        assert_eq!(
            sink.events,
            vec![Diagnostic::SegmentColumnMissing { column: "キャンペーン名".into() }]
        );
    }
}
