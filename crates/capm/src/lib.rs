#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/capm/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod estimate;
pub mod expected;
pub mod model;
pub mod report;
pub mod returns;
pub mod series;
pub mod source;

// Re-export core types
pub use config::CapmConfig;
pub use error::{CapmError, DateBound, Result};
pub use estimate::{BetaEstimator, RegressionResult};
pub use expected::{ExpectedReturnCalculator, expected_return};
pub use model::CapmModel;
pub use report::{CapmReport, CapmSummary};
pub use returns::{ResamplePeriod, ReturnRow, ReturnSeriesBuilder, ReturnTable};
pub use series::{PricePoint, PriceSeries};
pub use source::{CsvPriceSource, MemoryPriceSource, PriceSource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
