//! Price data sources.
//!
//! The estimation core never talks to a market-data provider directly. It
//! asks a [`PriceSource`] for a complete [`PriceSeries`] and works from
//! there.

use crate::{CapmError, PriceSeries, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Blocking provider of daily price series.
pub trait PriceSource: std::fmt::Debug {
    /// Fetch daily prices for `ticker` over `[start, end)`.
    fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries>;
}

/// Reads `<TICKER>.csv` files from a directory.
///
/// Files need a `date` column and an adjusted close column; see
/// [`PriceSeries::from_frame`] for the accepted headers. Files exported from
/// Yahoo Finance (`Date,Open,High,Low,Close,Adj Close,Volume`) work as-is.
#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    dir: PathBuf,
}

impl CsvPriceSource {
    /// Create a source rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the CSV files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file for `ticker`.
    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }
}

impl PriceSource for CsvPriceSource {
    fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries> {
        let path = self.path_for(ticker);
        if !path.exists() {
            return Err(CapmError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no price file for {ticker} at {}", path.display()),
            )));
        }

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.clone()))?
            .finish()?;

        let series = PriceSeries::from_frame(ticker, &df)?.within(start, end);
        tracing::debug!(
            ticker,
            path = %path.display(),
            rows = df.height(),
            kept = series.len(),
            "loaded price file"
        );

        Ok(series)
    }
}

/// In-memory source keyed by ticker.
#[derive(Debug, Clone, Default)]
pub struct MemoryPriceSource {
    series: HashMap<String, PriceSeries>,
}

impl MemoryPriceSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a series, replacing any previous one for the same ticker.
    pub fn insert(&mut self, series: PriceSeries) {
        self.series.insert(series.ticker().to_string(), series);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.insert(series);
        self
    }
}

impl PriceSource for MemoryPriceSource {
    fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<PriceSeries> {
        self.series
            .get(ticker)
            .map(|s| s.within(start, end))
            .ok_or_else(|| {
                CapmError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no prices for {ticker}"),
                ))
            })
    }
}
