//! Beta and alpha estimation.
//!
//! Beta measures the sensitivity of an asset's returns to market returns.
//! It is computed two independent ways:
//!
//! - Covariance ratio: `β = Cov(R_a, R_m) / Var(R_m)` from the unbiased 2×2
//!   sample covariance matrix.
//! - Ordinary least squares: fit `R_a = β · R_m + α` by solving the normal
//!   equations of the design matrix `[R_m - mean(R_m), 1]` against the
//!   centred asset returns. Centring keeps the system well conditioned when
//!   market returns sit far from zero relative to their spread.
//!
//! Both are algebraically the same slope. Keeping them separate gives a
//! cross-check: they must agree within [`BETA_TOLERANCE`].

use crate::{CapmError, Result, ReturnTable, returns::MIN_RETURN_ROWS};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Relative tolerance within which the two beta estimates must agree.
pub const BETA_TOLERANCE: f64 = 1e-9;

/// Relative standard deviation below which market returns count as constant.
pub const DEGENERATE_SPREAD: f64 = 1e-12;

/// Fitted line `asset_return = slope · market_return + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    /// Slope of the fit (beta)
    pub slope: f64,
    /// Intercept of the fit (alpha)
    pub intercept: f64,
}

impl RegressionResult {
    /// Beta.
    pub const fn beta(&self) -> f64 {
        self.slope
    }

    /// Alpha.
    pub const fn alpha(&self) -> f64 {
        self.intercept
    }

    /// Evaluate the fitted line at a market return.
    pub fn predict(&self, market_return: f64) -> f64 {
        self.intercept + self.slope * market_return
    }
}

/// Estimates beta and alpha from an aligned [`ReturnTable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BetaEstimator;

impl BetaEstimator {
    /// Create a new estimator.
    pub const fn new() -> Self {
        Self
    }

    /// Unbiased sample covariance matrix over (asset return, market return).
    ///
    /// Entry `[0, 0]` is the asset variance, `[1, 1]` the market variance and
    /// the off-diagonal entries the covariance.
    pub fn covariance_matrix(&self, table: &ReturnTable) -> Result<Array2<f64>> {
        let n = table.len();
        ensure_rows(table)?;

        let rows = table.rows();
        let data = Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 {
                rows[i].asset_return
            } else {
                rows[i].market_return
            }
        });
        let means = data
            .mean_axis(Axis(0))
            .ok_or_else(|| insufficient(table))?;
        let centered = &data - &means;

        Ok(centered.t().dot(&centered) / (n - 1) as f64)
    }

    /// Beta as `Cov(asset, market) / Var(market)`.
    ///
    /// # Errors
    /// [`CapmError::DegenerateVariance`] if market returns are constant, up
    /// to rounding noise.
    pub fn covariance_beta(&self, table: &ReturnTable) -> Result<f64> {
        let cov = self.covariance_matrix(table)?;
        let market_var = cov[[1, 1]];

        if is_constant(&table.market_returns()) || !market_var.is_finite() || market_var <= 0.0 {
            return Err(CapmError::DegenerateVariance { rows: table.len() });
        }

        Ok(cov[[0, 1]] / market_var)
    }

    /// Least-squares fit of asset return on market return.
    ///
    /// # Errors
    /// [`CapmError::DegenerateVariance`] if the normal matrix is singular,
    /// which happens when market returns are constant.
    pub fn estimate(&self, table: &ReturnTable) -> Result<RegressionResult> {
        let n = table.len();
        ensure_rows(table)?;

        let x = table.market_returns();
        if is_constant(&x) {
            return Err(CapmError::DegenerateVariance { rows: n });
        }

        let x = Array1::from(x);
        let y = Array1::from(table.asset_returns());
        let x_mean = x.mean().ok_or_else(|| insufficient(table))?;
        let y_mean = y.mean().ok_or_else(|| insufficient(table))?;

        let design = Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 { x[i] - x_mean } else { 1.0 }
        });
        let yc = &y - y_mean;

        let gram = design.t().dot(&design);
        let rhs = design.t().dot(&yc);

        let det = gram[[0, 0]] * gram[[1, 1]] - gram[[0, 1]] * gram[[1, 0]];
        if det == 0.0 || !det.is_finite() {
            return Err(CapmError::DegenerateVariance { rows: n });
        }

        let slope = (rhs[0] * gram[[1, 1]] - gram[[0, 1]] * rhs[1]) / det;
        // Intercept of the centred fit, zero up to rounding.
        let offset = (gram[[0, 0]] * rhs[1] - gram[[1, 0]] * rhs[0]) / det;
        let intercept = y_mean + offset - slope * x_mean;

        Ok(RegressionResult { slope, intercept })
    }
}

/// Relative difference `|a - b| / max(|a|, |b|)`, zero when both are zero.
pub fn relative_difference(a: f64, b: f64) -> f64 {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        0.0
    } else {
        (a - b).abs() / scale
    }
}

fn ensure_rows(table: &ReturnTable) -> Result<()> {
    if table.len() < MIN_RETURN_ROWS {
        return Err(insufficient(table));
    }
    Ok(())
}

fn insufficient(table: &ReturnTable) -> CapmError {
    let periods = table.periods();
    CapmError::InsufficientData {
        asset: table.asset().to_string(),
        market: table.market().to_string(),
        start: periods.first().copied().into(),
        end: periods.last().copied().into(),
        required: MIN_RETURN_ROWS,
        available: table.len(),
    }
}

/// Constant up to rounding: spread below [`DEGENERATE_SPREAD`] relative to
/// the root mean square.
fn is_constant(values: &[f64]) -> bool {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let spread = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let scale = values.iter().map(|v| v * v).sum::<f64>() / n;
    spread <= DEGENERATE_SPREAD * DEGENERATE_SPREAD * scale
}
