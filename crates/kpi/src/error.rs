use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Primary table has no column exactly named the required date label.
    MissingRequiredColumn { column: String, available: Vec<String> },
    /// Every secondary sheet was skipped for lack of a date-like column.
    NoUsableSecondaryData { skipped: Vec<String> },
    /// A column's length disagrees with the rest of its table.
    RaggedTable { column: String, expected: usize, found: usize },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty label, non-finite benchmark, etc.).
    ConfigValidation(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequiredColumn { column, available } => {
                write!(
                    f,
                    "primary table has no '{column}' column (found: {})",
                    available.join(", ")
                )
            }
            Self::NoUsableSecondaryData { skipped } => {
                if skipped.is_empty() {
                    write!(f, "no advertising sheets were provided")
                } else {
                    write!(
                        f,
                        "no advertising sheet has a date column (skipped: {})",
                        skipped.join(", ")
                    )
                }
            }
            Self::RaggedTable { column, expected, found } => {
                write!(f, "column '{column}' has {found} cells, expected {expected}")
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_lists_available_labels() {
        let err = PipelineError::MissingRequiredColumn {
            column: "日付".into(),
            available: vec!["date".into(), "売上（円）".into()],
        };
        assert_eq!(
            err.to_string(),
            "primary table has no '日付' column (found: date, 売上（円）)"
        );
    }

    #[test]
    fn no_usable_data_without_sheets() {
        let err = PipelineError::NoUsableSecondaryData { skipped: vec![] };
        assert_eq!(err.to_string(), "no advertising sheets were provided");
    }
}
