//! Estimation output for presentation.
//!
//! [`CapmReport`] is what the pipeline hands to the outside world: a text
//! rendering, a serializable summary, and the scatter points with the fitted
//! line for an external plotting tool.

use crate::{RegressionResult, ResamplePeriod, Result, ReturnTable};
use chrono::NaiveDate;
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::Path;

/// Complete result of one estimation.
#[derive(Debug, Clone)]
pub struct CapmReport {
    /// Start of the requested price window
    pub start: NaiveDate,
    /// End of the requested price window (exclusive)
    pub end: NaiveDate,
    /// Resampling period of the returns
    pub period: ResamplePeriod,
    /// Annualized risk-free rate used for the forecast
    pub risk_free_rate: f64,
    /// 2×2 covariance matrix over (asset, market) returns
    pub covariance: Array2<f64>,
    /// Beta from the covariance ratio
    pub covariance_beta: f64,
    /// Beta and alpha from the least-squares fit
    pub regression: RegressionResult,
    /// CAPM expected annual return
    pub expected_return: f64,
    /// Aligned returns the estimates were computed from
    pub table: ReturnTable,
}

/// Serializable summary of a [`CapmReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapmSummary {
    /// Asset ticker
    pub asset: String,
    /// Market ticker
    pub market: String,
    /// Start of the price window
    pub start: NaiveDate,
    /// End of the price window (exclusive)
    pub end: NaiveDate,
    /// Resampling period
    pub period: ResamplePeriod,
    /// Number of return rows used
    pub observations: usize,
    /// Covariance matrix, row-major
    pub covariance: [[f64; 2]; 2],
    /// Beta from the covariance ratio
    pub covariance_beta: f64,
    /// Beta from the regression
    pub beta: f64,
    /// Alpha from the regression
    pub alpha: f64,
    /// Annualized risk-free rate
    pub risk_free_rate: f64,
    /// CAPM expected annual return
    pub expected_return: f64,
}

impl CapmReport {
    /// Summary without the return table.
    pub fn summary(&self) -> CapmSummary {
        let c = &self.covariance;
        CapmSummary {
            asset: self.table.asset().to_string(),
            market: self.table.market().to_string(),
            start: self.start,
            end: self.end,
            period: self.period,
            observations: self.table.len(),
            covariance: [[c[[0, 0]], c[[0, 1]]], [c[[1, 0]], c[[1, 1]]]],
            covariance_beta: self.covariance_beta,
            beta: self.regression.slope,
            alpha: self.regression.intercept,
            risk_free_rate: self.risk_free_rate,
            expected_return: self.expected_return,
        }
    }

    /// Scatter points and fitted line.
    ///
    /// # Returns
    /// DataFrame with columns: `date`, `market_return`, `asset_return`,
    /// `fitted_return`
    pub fn scatter_frame(&self) -> Result<DataFrame> {
        let rows = self.table.rows();
        let dates: Vec<String> = rows.iter().map(|r| r.period.to_string()).collect();
        let fitted: Vec<f64> = rows
            .iter()
            .map(|r| self.regression.predict(r.market_return))
            .collect();

        let df = df![
            "date" => dates,
            "market_return" => self.table.market_returns(),
            "asset_return" => self.table.asset_returns(),
            "fitted_return" => fitted,
        ]?;

        Ok(df)
    }

    /// Write [`scatter_frame`](Self::scatter_frame) as CSV.
    pub fn write_scatter_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut df = self.scatter_frame()?;
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)?;
        Ok(())
    }
}

impl fmt::Display for CapmReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.covariance;
        writeln!(
            f,
            "CAPM: {} vs {} ({} to {}, {} {} returns)",
            self.table.asset(),
            self.table.market(),
            self.start,
            self.end,
            self.table.len(),
            self.period
        )?;
        writeln!(f, "Covariance matrix:")?;
        writeln!(f, "  [[{:>12.8} {:>12.8}]", c[[0, 0]], c[[0, 1]])?;
        writeln!(f, "   [{:>12.8} {:>12.8}]]", c[[1, 0]], c[[1, 1]])?;
        writeln!(f, "Beta from formula: {:.6}", self.covariance_beta)?;
        writeln!(f, "Beta from linear regression: {:.6}", self.regression.slope)?;
        writeln!(f, "Alpha: {:.6}", self.regression.intercept)?;
        write!(
            f,
            "Expected return according to CAPM: {:.6}",
            self.expected_return
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BetaEstimator, ReturnRow};
    use approx::assert_relative_eq;

    fn report() -> CapmReport {
        let market = [0.01, -0.02, 0.03];
        let rows = market
            .iter()
            .enumerate()
            .map(|(i, &m)| ReturnRow {
                period: NaiveDate::from_ymd_opt(2024, i as u32 + 1, 28).unwrap(),
                asset_adj_close: 1.0,
                market_adj_close: 1.0,
                asset_return: 2.0 * m,
                market_return: m,
            })
            .collect();
        let table = ReturnTable::from_rows("AAPL", "^GSPC", rows).unwrap();
        let estimator = BetaEstimator::new();

        CapmReport {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            period: ResamplePeriod::Monthly,
            risk_free_rate: 0.05,
            covariance: estimator.covariance_matrix(&table).unwrap(),
            covariance_beta: estimator.covariance_beta(&table).unwrap(),
            regression: estimator.estimate(&table).unwrap(),
            expected_return: 0.1,
            table,
        }
    }

    #[test]
    fn test_display_lists_both_betas() {
        let text = report().to_string();

        assert!(text.contains("AAPL vs ^GSPC"));
        assert!(text.contains("Covariance matrix:"));
        assert!(text.contains("Beta from formula: 2.000000"));
        assert!(text.contains("Beta from linear regression: 2.000000"));
        assert!(text.contains("Expected return according to CAPM: 0.100000"));
    }

    #[test]
    fn test_summary_serializes() {
        let summary = report().summary();
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["asset"], "AAPL");
        assert_eq!(json["period"], "monthly");
        assert_eq!(json["observations"], 3);
        assert_relative_eq!(summary.covariance[0][1], summary.covariance[1][0]);
    }

    #[test]
    fn test_scatter_frame_has_fitted_line() {
        let df = report().scatter_frame().unwrap();

        assert_eq!(df.height(), 3);
        let fitted = df
            .column("fitted_return")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect::<Vec<_>>();
        assert_relative_eq!(fitted[1], -0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_write_scatter_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scatter.csv");

        report().write_scatter_csv(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("date,market_return,asset_return,fitted_return")
        );
        assert_eq!(lines.count(), 3);
    }
}
