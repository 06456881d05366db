//! Error types for the wave forecast pipeline.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failure to retrieve one grid file.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("HTTP error: {status}")]
    Status { status: u16 },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Status {
                status: status.as_u16(),
            },
            None => FetchError::Transport(err.to_string()),
        }
    }
}

/// Failure to decode one grid file.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to stage grid file: {0}")]
    Scratch(#[from] std::io::Error),

    #[error("Failed to decode grid file: {0}")]
    Decode(#[from] grib2_parser::Grib2Error),

    #[error("Decoder task failed: {0}")]
    Join(String),
}

/// Why a single forecast offset produced no record.
#[derive(Error, Debug)]
pub enum OffsetFailure {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("extract failed: {0}")]
    Extract(#[from] ExtractError),
}

/// Run-aborting conditions.
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("No model cycle available at {now}")]
    NoCycle { now: DateTime<Utc> },

    #[error("No forecast data extracted from {attempted} offsets")]
    NoData { attempted: usize },

    #[error("Failed to write forecast to {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize forecast: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Invalid or unreadable configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
