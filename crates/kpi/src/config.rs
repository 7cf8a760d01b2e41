use serde::{Deserialize, Serialize};

use crate::commentary::Verdict;
use crate::error::PipelineError;
use crate::metrics::Metric;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration. Every section falls back to the built-in domain
/// constants, so an empty TOML document yields `PipelineConfig::default()`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Label the store table's date column must carry after trimming. Also the
    /// label of the join key in the merged table.
    pub required_date_column: String,
    pub date_detection: DateDetection,
    pub fields: FieldNames,
    pub benchmarks: Benchmarks,
    pub segments: SegmentConfig,
    pub remarks: RemarkTemplates,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            required_date_column: "日付".into(),
            date_detection: DateDetection::default(),
            fields: FieldNames::default(),
            benchmarks: Benchmarks::default(),
            segments: SegmentConfig::default(),
            remarks: RemarkTemplates::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Date detection
// ---------------------------------------------------------------------------

/// How an advertising sheet's date column is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateColumnMatchPolicy {
    /// Label contains any keyword as a substring.
    Keyword,
    /// Label equals one of the accepted labels.
    ExactLabel,
}

impl Default for DateColumnMatchPolicy {
    fn default() -> Self {
        Self::Keyword
    }
}

impl std::fmt::Display for DateColumnMatchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keyword => write!(f, "keyword"),
            Self::ExactLabel => write!(f, "exact_label"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DateDetection {
    pub policy: DateColumnMatchPolicy,
    pub keywords: Vec<String>,
    pub labels: Vec<String>,
}

impl Default for DateDetection {
    fn default() -> Self {
        Self {
            policy: DateColumnMatchPolicy::Keyword,
            keywords: ["日", "日付", "年月", "週次"].map(String::from).to_vec(),
            labels: [
                "日付",
                "日",
                "年月",
                "週次",
                "レポート開始日",
                "Date",
                "Day",
                "Reporting starts",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl DateDetection {
    /// Whether an already-trimmed label qualifies under the active policy.
    pub fn matches(&self, label: &str) -> bool {
        match self.policy {
            DateColumnMatchPolicy::Keyword => self.keywords.iter().any(|k| label.contains(k.as_str())),
            DateColumnMatchPolicy::ExactLabel => self.labels.iter().any(|l| l == label),
        }
    }
}

// ---------------------------------------------------------------------------
// Field mapping
// ---------------------------------------------------------------------------

/// Labels of the raw fields the metrics are computed from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub sales: String,
    pub cost: String,
    pub conversions: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            sales: "売上（円）".into(),
            cost: "Cost".into(),
            conversions: "CV".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Benchmarks {
    pub roas: f64,
    pub cpa: f64,
    pub ltv: f64,
    pub roi: f64,
}

impl Default for Benchmarks {
    fn default() -> Self {
        Self {
            roas: 1.2,
            cpa: 3000.0,
            ltv: 6000.0,
            roi: 0.1,
        }
    }
}

impl Benchmarks {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Roas => self.roas,
            Metric::Cpa => self.cpa,
            Metric::Ltv => self.ltv,
            Metric::Roi => self.roi,
        }
    }
}

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Categorical columns to break commentary down by, in output order.
    pub columns: Vec<String>,
}

// ---------------------------------------------------------------------------
// Remarks
// ---------------------------------------------------------------------------

/// Remark text for one metric. A `[remarks.<metric>]` table must supply both.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricRemarks {
    pub cautionary: String,
    pub affirmative: String,
}

impl MetricRemarks {
    fn new(cautionary: &str, affirmative: &str) -> Self {
        Self {
            cautionary: cautionary.into(),
            affirmative: affirmative.into(),
        }
    }

    pub fn text(&self, verdict: Verdict) -> &str {
        match verdict {
            Verdict::Cautionary => &self.cautionary,
            Verdict::Affirmative => &self.affirmative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RemarkTemplates {
    pub roas: MetricRemarks,
    pub cpa: MetricRemarks,
    pub ltv: MetricRemarks,
    pub roi: MetricRemarks,
}

impl Default for RemarkTemplates {
    fn default() -> Self {
        Self {
            roas: MetricRemarks::new(
                "ROASが業界平均を下回っています。ターゲティングや訴求強化を推奨します。",
                "ROASは業界平均以上です。現状の施策を維持・拡大を検討ください。",
            ),
            cpa: MetricRemarks::new(
                "CPAが高めです。クリエイティブやLP改善を推奨します。",
                "CPAは業界平均以下で良好です。現状維持で効率化を。",
            ),
            ltv: MetricRemarks::new(
                "LTVが低めです。リピート促進やクロスセルを強化しましょう。",
                "LTVは良好です。維持施策を継続しましょう。",
            ),
            roi: MetricRemarks::new(
                "ROIが低く、投資回収が不十分です。抜本的な施策見直しを推奨します。",
                "ROIは業界平均以上です。現状施策を拡大可能です。",
            ),
        }
    }
}

impl RemarkTemplates {
    pub fn get(&self, metric: Metric) -> &MetricRemarks {
        match metric {
            Metric::Roas => &self.roas,
            Metric::Cpa => &self.cpa,
            Metric::Ltv => &self.ltv,
            Metric::Roi => &self.roi,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, PipelineError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| PipelineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.required_date_column.trim().is_empty() {
            return Err(PipelineError::ConfigValidation(
                "required_date_column must not be empty".into(),
            ));
        }
        if self.required_date_column.trim() != self.required_date_column {
            return Err(PipelineError::ConfigValidation(format!(
                "required_date_column '{}' has surrounding whitespace",
                self.required_date_column
            )));
        }

        // An empty keyword would match every label
        let detection = &self.date_detection;
        match detection.policy {
            DateColumnMatchPolicy::Keyword => {
                if detection.keywords.is_empty() {
                    return Err(PipelineError::ConfigValidation(
                        "keyword policy requires at least one keyword".into(),
                    ));
                }
                if detection.keywords.iter().any(|k| k.is_empty()) {
                    return Err(PipelineError::ConfigValidation(
                        "date keywords must not be empty strings".into(),
                    ));
                }
            }
            DateColumnMatchPolicy::ExactLabel => {
                if detection.labels.is_empty() {
                    return Err(PipelineError::ConfigValidation(
                        "exact_label policy requires at least one label".into(),
                    ));
                }
            }
        }

        for (name, value) in [
            ("sales", &self.fields.sales),
            ("cost", &self.fields.cost),
            ("conversions", &self.fields.conversions),
        ] {
            if value.trim().is_empty() {
                return Err(PipelineError::ConfigValidation(format!(
                    "fields.{name} must not be empty"
                )));
            }
        }

        for metric in Metric::ALL {
            let value = self.benchmarks.get(metric);
            if !value.is_finite() {
                return Err(PipelineError::ConfigValidation(format!(
                    "benchmark for {metric} must be finite, got {value}"
                )));
            }
        }

        if let Some(col) = self.segments.columns.iter().find(|c| c.trim().is_empty()) {
            return Err(PipelineError::ConfigValidation(format!(
                "segment column label '{col}' is empty"
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
