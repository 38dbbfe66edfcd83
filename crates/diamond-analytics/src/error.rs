//! Error types for the diamond analytics pipeline.
//!
//! Errors are split in two families:
//!
//! - **Hard failures** ([`PipelineError`]): the input cannot be decoded,
//!   cannot be parsed as a table, or lacks required columns. Processing halts and no partial result exists.
//! - **Empty results** ([`EmptyResultWarning`]): the input was fine but
//!   nothing survived cleaning or grouping. These travel inside the
//!   [`PipelineReport`](crate::types::PipelineReport) so a caller can tell
//!   "no qualifying data" apart from "bad file".
//!
//! Row-level implausibility is never an error; such rows are removed silently.
//!
//! Errors serialize as `{ "code", "message" }` for UI consumers.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input bytes are not decodable text.
    #[error("Could not read the file: {0}")]
    Encoding(String),

    /// The text decoded but is not a readable table.
    #[error("Could not parse the file: {0}")]
    Parse(String),

    /// One or more required columns are absent.
    #[error("The file is missing the following columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    /// An attribute name that is not one of cut, color, clarity.
    #[error("Unknown categorical attribute '{0}' (expected cut, color or clarity)")]
    UnknownAttribute(String),

    /// A grade label that is not part of its enumeration.
    #[error("Unknown {attribute} grade '{value}'")]
    UnknownGrade { attribute: String, value: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Build a schema error from the list of missing column names.
    pub fn missing_columns<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PipelineError::Schema {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    ///
    /// A dashboard shows a "bad file" message for `ENCODING_ERROR`,
    /// `PARSE_ERROR` and `SCHEMA_ERROR`; everything else is an internal
    /// failure.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Encoding(_) => "ENCODING_ERROR",
            Self::Parse(_) => "PARSE_ERROR",
            Self::Schema { .. } => "SCHEMA_ERROR",
            Self::UnknownAttribute(_) => "UNKNOWN_ATTRIBUTE",
            Self::UnknownGrade { .. } => "UNKNOWN_GRADE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// True when the failure is caused by the uploaded file itself.
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::Encoding(_) | Self::Parse(_) | Self::Schema { .. } => true,
            Self::WithContext { source, .. } => source.is_input_error(),
            _ => false,
        }
    }

    /// Names of the missing columns, if this is a schema error.
    pub fn missing(&self) -> Option<&[String]> {
        match self {
            Self::Schema { missing } => Some(missing),
            Self::WithContext { source, .. } => source.missing(),
            _ => None,
        }
    }
}

impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipelineError::Polars(e).with_context(context))
    }
}

/// A stage finished without error but produced nothing to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmptyResultWarning {
    /// Validation and cleaning removed every row.
    NoRowsAfterCleaning,
    /// The attribute selection excluded every clean row.
    NoRowsSelected,
    /// No peer group reached the minimum population.
    NoQualifyingPeerGroups { min_group_size: usize },
    /// Peer groups qualified but no stone was priced below its group median.
    NoStonesBelowMedian { qualifying_groups: usize },
    /// No (bin, value) pair produced a usable dispersion for this attribute.
    NoVolatilityRanking { attribute: String },
}

impl EmptyResultWarning {
    /// Human-readable message for display.
    pub fn message(&self) -> String {
        match self {
            Self::NoRowsAfterCleaning => "No rows remained after cleaning".to_string(),
            Self::NoRowsSelected => "The attribute selection matched no clean rows".to_string(),
            Self::NoStonesBelowMedian { qualifying_groups } => format!(
                "{} peer groups qualified but no stone is priced below its group median",
                qualifying_groups
            ),
            Self::NoQualifyingPeerGroups { min_group_size } => format!(
                "No peer group reached {} members; no underpriced stones identified",
                min_group_size
            ),
            Self::NoVolatilityRanking { attribute } => {
                format!("Not enough data to rank {} by volatility", attribute)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            PipelineError::Encoding("nul byte".to_string()).error_code(),
            "ENCODING_ERROR"
        );
        assert_eq!(
            PipelineError::missing_columns(["cut"]).error_code(),
            "SCHEMA_ERROR"
        );
    }

    #[test]
    fn test_schema_message_lists_every_column() {
        let error = PipelineError::missing_columns(["cut", "color", "depth"]);
        let message = error.to_string();
        assert!(message.contains("cut, color, depth"));
        assert_eq!(
            error.missing().unwrap(),
            &["cut".to_string(), "color".to_string(), "depth".to_string()]
        );
    }

    #[test]
    fn test_is_input_error() {
        assert!(PipelineError::Encoding("x".to_string()).is_input_error());
        assert!(PipelineError::missing_columns(["x"]).is_input_error());
        assert!(PipelineError::Parse("x".to_string()).is_input_error());
        assert!(
            PipelineError::Parse("x".to_string())
                .with_context("Reading upload")
                .is_input_error()
        );
        assert!(!PipelineError::InvalidConfig("x".to_string()).is_input_error());
    }

    #[test]
    fn test_error_serialization() {
        let error = PipelineError::missing_columns(["price"]);
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("SCHEMA_ERROR"));
        assert!(json.contains("price"));
    }

    #[test]
    fn test_with_context() {
        let error = PipelineError::Encoding("binary".to_string()).with_context("Loading upload");
        assert!(error.to_string().contains("Loading upload"));
        assert_eq!(error.error_code(), "ENCODING_ERROR");
        assert!(error.is_input_error());
    }

    #[test]
    fn test_warning_serialization() {
        let warning = EmptyResultWarning::NoVolatilityRanking {
            attribute: "color".to_string(),
        };
        let json = serde_json::to_string(&warning).unwrap();
        assert!(json.contains("no_volatility_ranking"));
        assert!(warning.message().contains("color"));
    }
}
