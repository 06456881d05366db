//! Wave forecast extraction job.
//!
//! Runs one extraction pass and writes the forecast document:
//! - picks the latest GFS-Wave cycle past its publication lag
//! - fetches every forecast hour through the NOMADS GRIB filter
//! - exits non-zero when no cycle or no data is available

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use wave_forecast::{ForecastConfig, NomadsFetcher, Pipeline};

#[derive(Parser, Debug)]
#[command(name = "wave-forecast")]
#[command(about = "Extract a point wave forecast from GFS-Wave model output")]
struct Args {
    /// Configuration file (YAML); built-in defaults when omitted
    #[arg(short, long, env = "WAVE_FORECAST_CONFIG")]
    config: Option<PathBuf>,

    /// Output document path
    #[arg(short, long, env = "WAVE_FORECAST_OUTPUT")]
    output: Option<PathBuf>,

    /// Maximum concurrent downloads
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// HTTP request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Reference time for cycle selection (RFC 3339); defaults to now
    #[arg(long)]
    now: Option<DateTime<Utc>>,

    /// Check the selected cycle is published before the run
    #[arg(long)]
    probe: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn load_config(&self) -> Result<ForecastConfig> {
        let mut config = match &self.config {
            Some(path) => ForecastConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => ForecastConfig::default(),
        };

        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        if let Some(max_concurrent) = self.max_concurrent {
            config.fetch.max_concurrent = max_concurrent;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.fetch.timeout_secs = timeout_secs;
        }
        if self.probe {
            config.schedule.probe = true;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json)?;

    let config = args.load_config()?;
    let target = config.target();
    info!(
        lat = target.lat(),
        lon = target.signed_lon(),
        output = %config.output.path.display(),
        "Starting wave forecast extraction"
    );

    let fetcher = NomadsFetcher::new(&config).context("Failed to create NOMADS client")?;
    let pipeline = Pipeline::new(Arc::new(fetcher), &config);

    let now = args.now.unwrap_or_else(Utc::now);
    match pipeline.run_to_file(now, &config.output.path).await {
        Ok(document) => {
            info!(
                path = %config.output.path.display(),
                records = document.forecasts.len(),
                cycle = %document.model_cycle,
                "Forecast complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Forecast run failed");
            Err(e.into())
        }
    }
}
