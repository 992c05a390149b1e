//! Error types for CAPM estimation.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for CAPM operations.
pub type Result<T> = std::result::Result<T, CapmError>;

/// Errors that can occur while building returns or estimating CAPM parameters.
///
/// Every variant is terminal for the current invocation: the input data or
/// the configured date range has to change before a rerun can succeed.
#[derive(Debug, Error)]
pub enum CapmError {
    /// Input series lacks a required field
    #[error("Missing required column '{column}' for {ticker}")]
    MissingColumn {
        /// Ticker of the offending series
        ticker: String,
        /// Name of the missing column
        column: String,
    },

    /// Too few aligned return rows to estimate anything
    #[error(
        "Insufficient data for {asset} vs {market} ({start} to {end}): need {required} return rows, got {available}"
    )]
    InsufficientData {
        /// Asset ticker
        asset: String,
        /// Market ticker
        market: String,
        /// First date covered by the inputs
        start: DateBound,
        /// Last date covered by the inputs
        end: DateBound,
        /// Required number of return rows
        required: usize,
        /// Available number of return rows
        available: usize,
    },

    /// Market returns have zero variance
    #[error("Degenerate market variance over {rows} return rows")]
    DegenerateVariance {
        /// Number of rows in the table
        rows: usize,
    },

    /// Dates are not strictly increasing
    #[error("Invalid price series for {ticker}: {reason}")]
    InvalidSeries {
        /// Ticker of the offending series
        ticker: String,
        /// What is wrong with it
        reason: String,
    },

    /// Invalid date range
    #[error("Invalid date range: start {start} is not before end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: NaiveDate,
        /// End date of the range
        end: NaiveDate,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Polars DataFrame error
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// I/O error reading configuration or writing exports
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Optional date used in error context, rendered as `?` when unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBound(pub Option<NaiveDate>);

impl std::fmt::Display for DateBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(date) => write!(f, "{date}"),
            None => f.write_str("?"),
        }
    }
}

impl From<Option<NaiveDate>> for DateBound {
    fn from(date: Option<NaiveDate>) -> Self {
        Self(date)
    }
}
