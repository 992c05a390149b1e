//! CLI for CAPM estimation.
//!
//! Reads daily prices for an asset and a market benchmark from CSV files and
//! reports the covariance matrix, both beta estimates, alpha and the CAPM
//! expected return.

use capm::{
    CapmConfig, CapmError, CapmModel, CsvPriceSource, PriceSource, ResamplePeriod,
    ReturnSeriesBuilder,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "capm")]
#[command(about = "CAPM beta, alpha and expected return from price histories", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate beta, alpha and the expected return
    Estimate {
        #[command(flatten)]
        run: RunArgs,
        /// Print a JSON summary instead of text
        #[arg(long)]
        json: bool,
        /// Write scatter points and the fitted line to this CSV file
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Print the aligned return table
    Returns {
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Directory holding <TICKER>.csv price files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Asset ticker
    #[arg(long)]
    asset: Option<String>,
    /// Market benchmark ticker
    #[arg(long)]
    market: Option<String>,
    /// First date (inclusive, YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// End date (exclusive, YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Annualized risk-free rate
    #[arg(long)]
    risk_free_rate: Option<f64>,
    /// Resample period
    #[arg(long)]
    period: Option<ResamplePeriod>,
    /// Periods per year used to annualize the mean market return
    #[arg(long)]
    periods_per_year: Option<u32>,
}

impl RunArgs {
    /// Configuration file (or defaults) with command-line overrides applied.
    fn config(&self) -> Result<CapmConfig, CapmError> {
        let mut config = match &self.config {
            Some(path) => CapmConfig::from_json_file(path)?,
            None => CapmConfig::default(),
        };

        if let Some(asset) = &self.asset {
            config.asset.clone_from(asset);
        }
        if let Some(market) = &self.market {
            config.market.clone_from(market);
        }
        if let Some(start) = self.start {
            config.start = start;
        }
        if let Some(end) = self.end {
            config.end = end;
        }
        if let Some(rate) = self.risk_free_rate {
            config.risk_free_rate = rate;
        }
        if let Some(period) = self.period {
            config.period = period;
        }
        if self.periods_per_year.is_some() {
            config.periods_per_year = self.periods_per_year;
        }

        config.validate()?;
        Ok(config)
    }
}

/// CLI-level errors mapped to exit codes.
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Capm(#[from] CapmError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    const fn exit_code(&self) -> u8 {
        match self {
            Self::Capm(CapmError::InvalidConfig(_) | CapmError::InvalidDateRange { .. }) => 2,
            Self::Capm(
                CapmError::InsufficientData { .. }
                | CapmError::DegenerateVariance { .. }
                | CapmError::MissingColumn { .. }
                | CapmError::InvalidSeries { .. },
            ) => 3,
            Self::Serialization(_) => 4,
            Self::Capm(CapmError::Io(_) | CapmError::Json(_) | CapmError::Polars(_)) => 10,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::debug!(%error, "command failed");
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Estimate { run, json, export } => estimate(&run, json, export),
        Commands::Returns { run } => show_returns(&run),
    }
}

/// Run the full pipeline and print the report.
fn estimate(args: &RunArgs, json: bool, export: Option<PathBuf>) -> Result<(), CliError> {
    let config = args.config()?;
    let source = CsvPriceSource::new(&args.data_dir);
    let report = CapmModel::new(config)?.run(&source)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.summary())?);
    } else {
        println!("{report}");
    }

    if let Some(path) = export {
        report.write_scatter_csv(&path)?;
        tracing::info!(path = %path.display(), rows = report.table.len(), "wrote scatter data");
    }

    Ok(())
}

/// Print the aligned return table.
fn show_returns(args: &RunArgs) -> Result<(), CliError> {
    let config = args.config()?;
    let source = CsvPriceSource::new(&args.data_dir);
    let asset = source.fetch(&config.asset, config.start, config.end)?;
    let market = source.fetch(&config.market, config.start, config.end)?;
    let table = ReturnSeriesBuilder::new(config.period).build(&asset, &market)?;

    println!(
        "{:<12} {:>14} {:>14} {:>12} {:>12}",
        "date",
        format!("{}_adj", table.asset()),
        format!("{}_adj", table.market()),
        "asset_ret",
        "market_ret"
    );
    for row in table.rows() {
        println!(
            "{:<12} {:>14.4} {:>14.4} {:>12.6} {:>12.6}",
            row.period.to_string(),
            row.asset_adj_close,
            row.market_adj_close,
            row.asset_return,
            row.market_return
        );
    }
    println!("\n{} rows", table.len());

    Ok(())
}
