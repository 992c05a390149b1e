//! Run configuration.

use crate::{CapmError, ResamplePeriod, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default annualized risk-free rate.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.05;

/// Configuration for one CAPM estimation.
///
/// Missing fields in a JSON file fall back to [`CapmConfig::default`]:
/// `AAPL` against `^GSPC` from 2010-01-01 to 2025-01-01, monthly returns and
/// a 5% risk-free rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapmConfig {
    /// Asset ticker.
    pub asset: String,
    /// Market benchmark ticker.
    pub market: String,
    /// First date of the price window (inclusive).
    pub start: NaiveDate,
    /// End of the price window (exclusive).
    pub end: NaiveDate,
    /// Annualized risk-free rate.
    pub risk_free_rate: f64,
    /// Resampling period for returns.
    pub period: ResamplePeriod,
    /// Override for the annualization factor. Defaults to the period's own.
    pub periods_per_year: Option<u32>,
}

impl Default for CapmConfig {
    fn default() -> Self {
        Self {
            asset: "AAPL".into(),
            market: "^GSPC".into(),
            start: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            period: ResamplePeriod::default(),
            periods_per_year: None,
        }
    }
}

impl CapmConfig {
    /// Load from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Annualization factor in effect.
    pub fn periods_per_year(&self) -> u32 {
        self.periods_per_year
            .unwrap_or_else(|| self.period.periods_per_year())
    }

    /// Check the configuration for values that cannot produce an estimate.
    pub fn validate(&self) -> Result<()> {
        if self.asset.trim().is_empty() || self.market.trim().is_empty() {
            return Err(CapmError::InvalidConfig(
                "asset and market tickers must be non-empty".into(),
            ));
        }
        if self.start >= self.end {
            return Err(CapmError::InvalidDateRange {
                start: self.start,
                end: self.end,
            });
        }
        if !self.risk_free_rate.is_finite() {
            return Err(CapmError::InvalidConfig(format!(
                "risk-free rate must be finite, got {}",
                self.risk_free_rate
            )));
        }
        if self.periods_per_year() == 0 {
            return Err(CapmError::InvalidConfig(
                "periods per year must be positive".into(),
            ));
        }
        Ok(())
    }
}
