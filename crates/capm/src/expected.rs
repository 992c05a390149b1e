//! CAPM expected return.
//!
//! `E[R] = R_f + β · (E[R_m] - R_f)`, where `E[R_m]` is the mean periodic
//! market log-return scaled to a year.

use crate::ReturnTable;

/// Applies the CAPM formula with a constant risk-free rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpectedReturnCalculator {
    risk_free_rate: f64,
    periods_per_year: u32,
}

impl ExpectedReturnCalculator {
    /// Create a calculator for an annualized risk-free rate.
    pub const fn new(risk_free_rate: f64, periods_per_year: u32) -> Self {
        Self {
            risk_free_rate,
            periods_per_year,
        }
    }

    /// Annualized risk-free rate.
    pub const fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    /// Periods per year used to annualize the mean market return.
    pub const fn periods_per_year(&self) -> u32 {
        self.periods_per_year
    }

    /// Expected annual return for an asset with the given beta.
    ///
    /// NaN if the table is empty.
    pub fn expected_return(&self, beta: f64, table: &ReturnTable) -> f64 {
        expected_return(beta, table, self.risk_free_rate, self.periods_per_year)
    }
}

impl Default for ExpectedReturnCalculator {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_RISK_FREE_RATE, 12)
    }
}

/// Expected annual return `rf + beta * (mean(market) * periods_per_year - rf)`.
pub fn expected_return(
    beta: f64,
    table: &ReturnTable,
    risk_free_rate: f64,
    periods_per_year: u32,
) -> f64 {
    let market = table.mean_market_return() * f64::from(periods_per_year);
    capm_return(beta, market, risk_free_rate)
}

/// CAPM formula for an already annualized market return.
pub fn capm_return(beta: f64, market_return: f64, risk_free_rate: f64) -> f64 {
    risk_free_rate + beta * (market_return - risk_free_rate)
}
