//! End-to-end CAPM estimation.

use crate::{
    BetaEstimator, CapmConfig, CapmReport, ExpectedReturnCalculator, PriceSeries, PriceSource,
    Result, ReturnSeriesBuilder,
    estimate::{BETA_TOLERANCE, relative_difference},
};

/// Runs the full pipeline: prices → returns → beta/alpha → expected return.
#[derive(Debug, Clone)]
pub struct CapmModel {
    config: CapmConfig,
    builder: ReturnSeriesBuilder,
    estimator: BetaEstimator,
    calculator: ExpectedReturnCalculator,
}

impl CapmModel {
    /// Create a model from a validated configuration.
    pub fn new(config: CapmConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            builder: ReturnSeriesBuilder::new(config.period),
            estimator: BetaEstimator::new(),
            calculator: ExpectedReturnCalculator::new(
                config.risk_free_rate,
                config.periods_per_year(),
            ),
            config,
        })
    }

    /// Configuration in use.
    pub const fn config(&self) -> &CapmConfig {
        &self.config
    }

    /// Fetch both series from `source` and estimate.
    pub fn run<S: PriceSource + ?Sized>(&self, source: &S) -> Result<CapmReport> {
        let (start, end) = (self.config.start, self.config.end);
        let asset = source.fetch(&self.config.asset, start, end)?;
        let market = source.fetch(&self.config.market, start, end)?;
        self.analyze(&asset, &market)
    }

    /// Estimate from series already in memory.
    pub fn analyze(&self, asset: &PriceSeries, market: &PriceSeries) -> Result<CapmReport> {
        let table = self.builder.build(asset, market)?;

        let covariance = self.estimator.covariance_matrix(&table)?;
        let covariance_beta = self.estimator.covariance_beta(&table)?;
        let regression = self.estimator.estimate(&table)?;

        let divergence = relative_difference(covariance_beta, regression.slope);
        if divergence > BETA_TOLERANCE {
            tracing::warn!(
                covariance_beta,
                regression_beta = regression.slope,
                divergence,
                "beta estimators disagree"
            );
        }

        let expected_return = self.calculator.expected_return(regression.slope, &table);

        tracing::info!(
            asset = table.asset(),
            market = table.market(),
            rows = table.len(),
            beta = regression.slope,
            alpha = regression.intercept,
            expected_return,
            "estimated CAPM parameters"
        );

        Ok(CapmReport {
            start: self.config.start,
            end: self.config.end,
            period: self.builder.period(),
            risk_free_rate: self.calculator.risk_free_rate(),
            covariance,
            covariance_beta,
            regression,
            expected_return,
            table,
        })
    }
}
