//! Periodic log-return construction.
//!
//! [`ReturnSeriesBuilder`] turns two daily [`PriceSeries`] into a
//! [`ReturnTable`]:
//!
//! 1. Each series is resampled to the configured period, keeping the last
//!    adjusted close observed in each period. Periods are labelled by their
//!    last calendar day. Periods between the first and last observation that
//!    have no adjusted close are kept as gaps.
//! 2. The two resampled series are inner-joined on the period label.
//! 3. `ln(p_t / p_{t-1})` is computed over consecutive aligned periods for
//!    the asset and the market independently.
//! 4. Rows where either return is undefined are dropped: the first row, gaps,
//!    the row right after a gap, and non-positive or non-finite ratios.

use crate::{CapmError, PriceSeries, Result};
use chrono::{Datelike, Months, NaiveDate};
use derive_more::Display;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Minimum number of return rows needed downstream.
pub const MIN_RETURN_ROWS: usize = 2;

/// Resampling period for return construction.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplePeriod {
    /// Calendar month, labelled by month end
    #[default]
    #[display("monthly")]
    Monthly,
}

impl ResamplePeriod {
    /// Number of periods in one year.
    pub const fn periods_per_year(self) -> u32 {
        match self {
            Self::Monthly => 12,
        }
    }

    /// Label of the period containing `date`: its last calendar day.
    pub fn period_end(self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Monthly => date
                .with_day(1)
                .and_then(|first| first.checked_add_months(Months::new(1)))
                .and_then(|next| next.pred_opt())
                .unwrap_or(date),
        }
    }

    /// Label of the period following the one labelled `period_end`.
    pub fn next(self, period_end: NaiveDate) -> Option<NaiveDate> {
        period_end.succ_opt().map(|d| self.period_end(d))
    }
}

impl FromStr for ResamplePeriod {
    type Err = CapmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "monthly" | "month" | "m" => Ok(Self::Monthly),
            other => Err(CapmError::InvalidConfig(format!(
                "unsupported resample period '{other}'"
            ))),
        }
    }
}

/// One aligned period with both returns defined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnRow {
    /// Period label (last calendar day of the period)
    pub period: NaiveDate,
    /// Asset adjusted close at period end
    pub asset_adj_close: f64,
    /// Market adjusted close at period end
    pub market_adj_close: f64,
    /// Asset log-return over the period
    pub asset_return: f64,
    /// Market log-return over the period
    pub market_return: f64,
}

/// Time-aligned asset and market log-returns.
///
/// Every row has finite asset and market returns, and periods are strictly
/// increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnTable {
    asset: String,
    market: String,
    rows: Vec<ReturnRow>,
}

impl ReturnTable {
    /// Create a table from precomputed rows.
    ///
    /// Fails with [`CapmError::InvalidSeries`] if a return is not finite or
    /// periods are not strictly increasing.
    pub fn from_rows(
        asset: impl Into<String>,
        market: impl Into<String>,
        rows: Vec<ReturnRow>,
    ) -> Result<Self> {
        let asset = asset.into();
        let market = market.into();

        if let Some(row) = rows
            .iter()
            .find(|r| !r.asset_return.is_finite() || !r.market_return.is_finite())
        {
            return Err(CapmError::InvalidSeries {
                ticker: format!("{asset}/{market}"),
                reason: format!("undefined return in period {}", row.period),
            });
        }
        if let Some(pair) = rows.windows(2).find(|w| w[0].period >= w[1].period) {
            return Err(CapmError::InvalidSeries {
                ticker: format!("{asset}/{market}"),
                reason: format!(
                    "periods must be strictly increasing, found {} followed by {}",
                    pair[0].period, pair[1].period
                ),
            });
        }

        Ok(Self {
            asset,
            market,
            rows,
        })
    }

    /// Asset ticker.
    pub fn asset(&self) -> &str {
        &self.asset
    }

    /// Market ticker.
    pub fn market(&self) -> &str {
        &self.market
    }

    /// Rows in period order.
    pub fn rows(&self) -> &[ReturnRow] {
        &self.rows
    }

    /// Number of rows.
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Period labels.
    pub fn periods(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.period).collect()
    }

    /// Asset log-returns.
    pub fn asset_returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.asset_return).collect()
    }

    /// Market log-returns.
    pub fn market_returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.market_return).collect()
    }

    /// Mean market log-return per period. NaN for an empty table.
    pub fn mean_market_return(&self) -> f64 {
        self.rows.iter().map(|r| r.market_return).sum::<f64>() / self.rows.len() as f64
    }

    /// Convert to a DataFrame.
    ///
    /// # Returns
    /// DataFrame with columns: `date`, `asset_adj_close`, `market_adj_close`,
    /// `asset_return`, `market_return`
    pub fn to_frame(&self) -> Result<DataFrame> {
        let dates: Vec<String> = self.rows.iter().map(|r| r.period.to_string()).collect();
        let asset_px: Vec<f64> = self.rows.iter().map(|r| r.asset_adj_close).collect();
        let market_px: Vec<f64> = self.rows.iter().map(|r| r.market_adj_close).collect();

        let df = df![
            "date" => dates,
            "asset_adj_close" => asset_px,
            "market_adj_close" => market_px,
            "asset_return" => self.asset_returns(),
            "market_return" => self.market_returns(),
        ]?;

        Ok(df)
    }
}

/// Builds aligned log-return tables from daily prices.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnSeriesBuilder {
    period: ResamplePeriod,
}

impl ReturnSeriesBuilder {
    /// Create a builder for the given period.
    pub const fn new(period: ResamplePeriod) -> Self {
        Self { period }
    }

    /// Resampling period.
    pub const fn period(&self) -> ResamplePeriod {
        self.period
    }

    /// Build the aligned return table.
    ///
    /// # Errors
    /// - [`CapmError::MissingColumn`] if a non-empty series carries no
    ///   adjusted close at all
    /// - [`CapmError::InsufficientData`] if fewer than [`MIN_RETURN_ROWS`]
    ///   rows survive
    pub fn build(&self, asset: &PriceSeries, market: &PriceSeries) -> Result<ReturnTable> {
        for series in [asset, market] {
            if !series.is_empty() && !series.has_adj_close() {
                return Err(CapmError::MissingColumn {
                    ticker: series.ticker().to_string(),
                    column: "adj_close".into(),
                });
            }
        }

        let asset_periods = self.resample(asset);
        let market_periods = self.resample(market);

        let aligned: Vec<(NaiveDate, Option<f64>, Option<f64>)> = asset_periods
            .iter()
            .filter_map(|(period, a)| market_periods.get(period).map(|m| (*period, *a, *m)))
            .collect();

        let rows: Vec<ReturnRow> = aligned
            .windows(2)
            .filter_map(|w| {
                let (_, prev_a, prev_m) = w[0];
                let (period, cur_a, cur_m) = w[1];
                Some(ReturnRow {
                    period,
                    asset_adj_close: cur_a?,
                    market_adj_close: cur_m?,
                    asset_return: log_return(prev_a?, cur_a?)?,
                    market_return: log_return(prev_m?, cur_m?)?,
                })
            })
            .collect();

        tracing::debug!(
            asset = asset.ticker(),
            market = market.ticker(),
            period = %self.period,
            asset_periods = asset_periods.len(),
            market_periods = market_periods.len(),
            aligned = aligned.len(),
            rows = rows.len(),
            "built return table"
        );

        if rows.len() < MIN_RETURN_ROWS {
            return Err(CapmError::InsufficientData {
                asset: asset.ticker().to_string(),
                market: market.ticker().to_string(),
                start: asset.first_date().max(market.first_date()).into(),
                end: min_date(asset.last_date(), market.last_date()).into(),
                required: MIN_RETURN_ROWS,
                available: rows.len(),
            });
        }

        ReturnTable::from_rows(asset.ticker(), market.ticker(), rows)
    }

    /// Last adjusted close per period, with gaps filled as `None` between the
    /// first and last observed period.
    fn resample(&self, series: &PriceSeries) -> BTreeMap<NaiveDate, Option<f64>> {
        let mut observed: BTreeMap<NaiveDate, Option<f64>> = BTreeMap::new();
        for point in series.points() {
            let slot = observed.entry(self.period.period_end(point.date)).or_default();
            if point.adj_close.is_some() {
                *slot = point.adj_close;
            }
        }

        let first = observed.keys().next().copied();
        let last = observed.keys().next_back().copied();
        if let (Some(mut period), Some(last)) = (first, last) {
            while period < last {
                let Some(next) = self.period.next(period) else {
                    break;
                };
                observed.entry(next).or_default();
                period = next;
            }
        }

        observed
    }
}

fn log_return(prev: f64, cur: f64) -> Option<f64> {
    let r = (cur / prev).ln();
    r.is_finite().then_some(r)
}

fn min_date(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Option<NaiveDate> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PricePoint;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series(ticker: &str, points: &[(NaiveDate, f64)]) -> PriceSeries {
        PriceSeries::new(
            ticker,
            points
                .iter()
                .map(|&(d, px)| PricePoint::new(d, px, px))
                .collect(),
        )
        .unwrap()
    }

    #[rstest]
    #[case(date(2024, 1, 15), date(2024, 1, 31))]
    #[case(date(2024, 2, 1), date(2024, 2, 29))]
    #[case(date(2023, 2, 28), date(2023, 2, 28))]
    #[case(date(2024, 12, 3), date(2024, 12, 31))]
    fn test_monthly_period_end(#[case] input: NaiveDate, #[case] expected: NaiveDate) {
        assert_eq!(ResamplePeriod::Monthly.period_end(input), expected);
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("Monthly".parse::<ResamplePeriod>().unwrap(), ResamplePeriod::Monthly);
        assert!("weekly".parse::<ResamplePeriod>().is_err());
        assert_eq!(ResamplePeriod::Monthly.to_string(), "monthly");
        assert_eq!(ResamplePeriod::Monthly.periods_per_year(), 12);
    }

    #[test]
    fn test_build_uses_last_observation_per_month() {
        let asset = series(
            "A",
            &[
                (date(2024, 1, 2), 100.0),
                (date(2024, 1, 31), 110.0),
                (date(2024, 2, 5), 90.0),
                (date(2024, 2, 29), 121.0),
                (date(2024, 3, 28), 133.1),
            ],
        );
        let market = series(
            "M",
            &[
                (date(2024, 1, 31), 50.0),
                (date(2024, 2, 29), 55.0),
                (date(2024, 3, 29), 60.5),
            ],
        );

        let table = ReturnSeriesBuilder::default().build(&asset, &market).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.periods(), vec![date(2024, 2, 29), date(2024, 3, 31)]);
        assert_relative_eq!(table.rows()[0].asset_adj_close, 121.0);
        assert_relative_eq!(table.rows()[0].asset_return, (1.1_f64).ln(), epsilon = 1e-12);
        assert_relative_eq!(table.rows()[1].market_return, (1.1_f64).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_build_inner_joins_periods() {
        let asset = series(
            "A",
            &[
                (date(2023, 12, 29), 1.0),
                (date(2024, 1, 31), 1.0),
                (date(2024, 2, 29), 2.0),
                (date(2024, 3, 28), 4.0),
            ],
        );
        let market = series(
            "M",
            &[
                (date(2024, 1, 31), 10.0),
                (date(2024, 2, 29), 20.0),
                (date(2024, 3, 29), 40.0),
                (date(2024, 4, 30), 80.0),
            ],
        );

        let table = ReturnSeriesBuilder::default().build(&asset, &market).unwrap();

        // Only Jan..Mar are shared; Jan has no prior aligned row.
        assert_eq!(table.periods(), vec![date(2024, 2, 29), date(2024, 3, 31)]);
    }

    #[test]
    fn test_build_drops_gap_and_following_row() {
        let asset = series(
            "A",
            &[
                (date(2024, 1, 31), 1.0),
                (date(2024, 2, 29), 1.1),
                // no March observation
                (date(2024, 4, 30), 1.2),
                (date(2024, 5, 31), 1.3),
                (date(2024, 6, 28), 1.4),
            ],
        );
        let market = series(
            "M",
            &[
                (date(2024, 1, 31), 1.0),
                (date(2024, 2, 29), 1.0),
                (date(2024, 3, 29), 1.1),
                (date(2024, 4, 30), 1.0),
                (date(2024, 5, 31), 1.2),
                (date(2024, 6, 28), 1.1),
            ],
        );

        let table = ReturnSeriesBuilder::default().build(&asset, &market).unwrap();

        assert_eq!(
            table.periods(),
            vec![date(2024, 2, 29), date(2024, 5, 31), date(2024, 6, 30)]
        );
    }

    #[test]
    fn test_build_skips_missing_adj_close_within_month() {
        let mut points: Vec<PricePoint> = [
            (date(2024, 1, 31), 1.0),
            (date(2024, 2, 28), 2.0),
            (date(2024, 3, 28), 4.0),
        ]
        .iter()
        .map(|&(d, px)| PricePoint::new(d, px, px))
        .collect();
        points.insert(
            2,
            PricePoint {
                date: date(2024, 2, 29),
                close: Some(9.0),
                adj_close: None,
            },
        );
        let asset = PriceSeries::new("A", points).unwrap();
        let market = series(
            "M",
            &[
                (date(2024, 1, 31), 1.0),
                (date(2024, 2, 29), 3.0),
                (date(2024, 3, 29), 6.0),
            ],
        );

        let table = ReturnSeriesBuilder::default().build(&asset, &market).unwrap();

        assert_relative_eq!(table.rows()[0].asset_adj_close, 2.0);
        assert_relative_eq!(table.rows()[0].asset_return, (2.0_f64).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_build_never_emits_undefined_returns() {
        let asset = series(
            "A",
            &[
                (date(2024, 1, 31), 1.0),
                (date(2024, 2, 29), 0.0),
                (date(2024, 3, 28), 1.0),
                (date(2024, 4, 30), 1.5),
                (date(2024, 5, 31), 1.2),
            ],
        );
        let market = series(
            "M",
            &[
                (date(2024, 1, 31), 1.0),
                (date(2024, 2, 29), 1.1),
                (date(2024, 3, 29), 1.2),
                (date(2024, 4, 30), 1.3),
                (date(2024, 5, 31), 1.4),
            ],
        );

        let table = ReturnSeriesBuilder::default().build(&asset, &market).unwrap();

        assert_eq!(table.periods(), vec![date(2024, 4, 30), date(2024, 5, 31)]);
        for row in table.rows() {
            assert!(row.asset_return.is_finite());
            assert!(row.market_return.is_finite());
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let asset = series(
            "A",
            &[
                (date(2024, 1, 31), 10.0),
                (date(2024, 2, 29), 10.7),
                (date(2024, 3, 28), 9.9),
                (date(2024, 4, 30), 11.3),
            ],
        );
        let market = series(
            "M",
            &[
                (date(2024, 1, 31), 100.0),
                (date(2024, 2, 29), 103.0),
                (date(2024, 3, 29), 98.0),
                (date(2024, 4, 30), 104.0),
            ],
        );

        let builder = ReturnSeriesBuilder::default();
        let first = builder.build(&asset, &market).unwrap();
        let second = builder.build(&asset, &market).unwrap();

        assert_eq!(first, second);
        for (a, b) in first.rows().iter().zip(second.rows()) {
            assert_eq!(a.asset_return.to_bits(), b.asset_return.to_bits());
            assert_eq!(a.market_return.to_bits(), b.market_return.to_bits());
        }
    }

    #[test]
    fn test_single_period_is_insufficient() {
        let asset = series("A", &[(date(2024, 1, 2), 10.0), (date(2024, 1, 31), 11.0)]);
        let market = series("M", &[(date(2024, 1, 2), 5.0), (date(2024, 1, 31), 6.0)]);

        let err = ReturnSeriesBuilder::default()
            .build(&asset, &market)
            .unwrap_err();

        assert!(matches!(
            err,
            CapmError::InsufficientData {
                required: 2,
                available: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_two_periods_is_insufficient() {
        let asset = series("A", &[(date(2024, 1, 31), 10.0), (date(2024, 2, 29), 11.0)]);
        let market = series("M", &[(date(2024, 1, 31), 5.0), (date(2024, 2, 29), 6.0)]);

        let err = ReturnSeriesBuilder::default()
            .build(&asset, &market)
            .unwrap_err();

        assert!(matches!(err, CapmError::InsufficientData { available: 1, .. }));
    }

    #[test]
    fn test_series_without_adj_close_is_missing_column() {
        let points = vec![PricePoint {
            date: date(2024, 1, 31),
            close: Some(10.0),
            adj_close: None,
        }];
        let asset = PriceSeries::new("A", points).unwrap();
        let market = series("M", &[(date(2024, 1, 31), 5.0)]);

        let err = ReturnSeriesBuilder::default()
            .build(&asset, &market)
            .unwrap_err();

        assert!(matches!(err, CapmError::MissingColumn { ref ticker, .. } if ticker == "A"));
    }

    #[test]
    fn test_from_rows_rejects_nan() {
        let rows = vec![ReturnRow {
            period: date(2024, 1, 31),
            asset_adj_close: 1.0,
            market_adj_close: 1.0,
            asset_return: f64::NAN,
            market_return: 0.01,
        }];

        assert!(ReturnTable::from_rows("A", "M", rows).is_err());
    }

    #[test]
    fn test_to_frame_columns() {
        let asset = series(
            "A",
            &[
                (date(2024, 1, 31), 1.0),
                (date(2024, 2, 29), 2.0),
                (date(2024, 3, 28), 4.0),
            ],
        );
        let market = series(
            "M",
            &[
                (date(2024, 1, 31), 1.0),
                (date(2024, 2, 29), 3.0),
                (date(2024, 3, 29), 6.0),
            ],
        );
        let table = ReturnSeriesBuilder::default().build(&asset, &market).unwrap();

        let df = table.to_frame().unwrap();

        assert_eq!(df.height(), 2);
        let dates = df
            .column("date")
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect::<Vec<_>>();
        assert_eq!(dates, vec!["2024-02-29", "2024-03-31"]);
        let returns = df
            .column("market_return")
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect::<Vec<_>>();
        assert_relative_eq!(returns[0], (3.0_f64).ln(), epsilon = 1e-12);
    }
}
