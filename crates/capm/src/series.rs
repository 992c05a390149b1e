//! Daily price series as delivered by a data source.
//!
//! A [`PriceSeries`] is the input boundary of the pipeline: one ticker, one
//! observation per trading day, dates strictly increasing.

use crate::{CapmError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Accepted spellings of the date column.
pub const DATE_COLUMNS: &[&str] = &["date", "Date"];
/// Accepted spellings of the close column.
pub const CLOSE_COLUMNS: &[&str] = &["close", "Close"];
/// Accepted spellings of the adjusted close column.
pub const ADJ_CLOSE_COLUMNS: &[&str] = &["adj_close", "Adj Close", "adjclose", "adjusted_close"];

/// A single daily observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Trading date
    pub date: NaiveDate,
    /// Raw closing price
    pub close: Option<f64>,
    /// Closing price adjusted for dividends and splits
    pub adj_close: Option<f64>,
}

impl PricePoint {
    /// Create an observation with both prices present.
    pub const fn new(date: NaiveDate, close: f64, adj_close: f64) -> Self {
        Self {
            date,
            close: Some(close),
            adj_close: Some(adj_close),
        }
    }
}

/// Ordered daily prices for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    ticker: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Create a series, rejecting unordered or duplicated dates.
    ///
    /// Non-finite prices are stored as missing.
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Result<Self> {
        let ticker = ticker.into();

        if let Some(pair) = points.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(CapmError::InvalidSeries {
                ticker,
                reason: format!(
                    "dates must be strictly increasing, found {} followed by {}",
                    pair[0].date, pair[1].date
                ),
            });
        }

        let points = points
            .into_iter()
            .map(|p| PricePoint {
                date: p.date,
                close: p.close.filter(|v| v.is_finite()),
                adj_close: p.adj_close.filter(|v| v.is_finite()),
            })
            .collect();

        Ok(Self { ticker, points })
    }

    /// Build a series from a DataFrame.
    ///
    /// # Required Columns
    /// - `date`: ISO dates, as strings or a temporal dtype
    /// - `adj_close`: Adjusted closing price
    ///
    /// `close` is optional. The spellings in [`DATE_COLUMNS`], [`CLOSE_COLUMNS`]
    /// and [`ADJ_CLOSE_COLUMNS`] are recognised. Rows are sorted by date.
    pub fn from_frame(ticker: impl Into<String>, df: &DataFrame) -> Result<Self> {
        let ticker = ticker.into();

        let date_col = find_column(df, DATE_COLUMNS).ok_or_else(|| CapmError::MissingColumn {
            ticker: ticker.clone(),
            column: "date".into(),
        })?;
        let adj_col =
            find_column(df, ADJ_CLOSE_COLUMNS).ok_or_else(|| CapmError::MissingColumn {
                ticker: ticker.clone(),
                column: "adj_close".into(),
            })?;

        let dates = date_col.cast(&DataType::String)?;
        let adj = adj_col.cast(&DataType::Float64)?;
        let close = find_column(df, CLOSE_COLUMNS)
            .map(|c| c.cast(&DataType::Float64))
            .transpose()?;

        let dates = dates.str()?;
        let adj = adj.f64()?;
        let close = close.as_ref().map(|c| c.f64()).transpose()?;

        let mut points = Vec::with_capacity(df.height());
        for (idx, date) in dates.into_iter().enumerate() {
            let raw = date.ok_or_else(|| CapmError::InvalidSeries {
                ticker: ticker.clone(),
                reason: format!("missing date at row {idx}"),
            })?;
            points.push(PricePoint {
                date: parse_date(&ticker, raw)?,
                close: close.and_then(|c| c.get(idx)),
                adj_close: adj.get(idx),
            });
        }
        points.sort_by_key(|p| p.date);

        Self::new(ticker, points)
    }

    /// Ticker identifier.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Observations in date order.
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Number of observations.
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no observations.
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First observed date.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    /// Last observed date.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Whether any observation carries an adjusted close.
    pub fn has_adj_close(&self) -> bool {
        self.points.iter().any(|p| p.adj_close.is_some())
    }

    /// Restrict to observations in `[start, end)`.
    pub fn within(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            ticker: self.ticker.clone(),
            points: self
                .points
                .iter()
                .filter(|p| p.date >= start && p.date < end)
                .copied()
                .collect(),
        }
    }
}

fn find_column<'a>(df: &'a DataFrame, names: &[&str]) -> Option<&'a Column> {
    names.iter().find_map(|name| df.column(name).ok())
}

fn parse_date(ticker: &str, raw: &str) -> Result<NaiveDate> {
    // Datetime columns render as "YYYY-MM-DD hh:mm:ss"; only the date part matters.
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| CapmError::InvalidSeries {
        ticker: ticker.to_string(),
        reason: format!("unparseable date '{raw}': {e}"),
    })
}
