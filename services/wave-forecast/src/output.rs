//! Forecast document and its JSON persistence.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use tempfile::NamedTempFile;
use tracing::info;

use crate::cycle::ModelCycle;
use crate::error::ForecastError;
use crate::point::TargetPoint;

/// Conditions at one forecast hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    #[serde(serialize_with = "iso8601")]
    pub valid_time: DateTime<Utc>,
    pub forecast_hour: u32,
    pub height_ft: Option<f64>,
    pub height_m: Option<f64>,
    pub period_s: Option<f64>,
    pub direction_deg: Option<f64>,
}

/// Forecast location with signed longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub lat: f64,
    pub lon: f64,
}

impl From<&TargetPoint> for GridPoint {
    fn from(point: &TargetPoint) -> Self {
        Self {
            lat: point.lat(),
            lon: point.signed_lon(),
        }
    }
}

/// Output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDocument {
    #[serde(serialize_with = "iso8601_micros")]
    pub generated_at: DateTime<Utc>,
    #[serde(serialize_with = "iso8601")]
    pub model_cycle: DateTime<Utc>,
    pub grid_point: GridPoint,
    pub forecasts: Vec<ForecastRecord>,
}

impl ForecastDocument {
    pub fn new(
        generated_at: DateTime<Utc>,
        cycle: &ModelCycle,
        target: &TargetPoint,
        forecasts: Vec<ForecastRecord>,
    ) -> Self {
        Self {
            generated_at,
            model_cycle: cycle.start(),
            grid_point: GridPoint::from(target),
            forecasts,
        }
    }

    /// Pretty-printed JSON with two-space indentation.
    pub fn to_json(&self) -> Result<String, ForecastError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the document to `path`, replacing any previous version.
    ///
    /// The JSON goes to a temporary file next to `path` which is then
    /// renamed over it, so readers never see a partial document.
    pub fn write(&self, path: &Path) -> Result<(), ForecastError> {
        let json = self.to_json()?;
        let output_err = |source: std::io::Error| ForecastError::Output {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(output_err)?;

        let mut file = NamedTempFile::new_in(dir).map_err(output_err)?;
        file.write_all(json.as_bytes()).map_err(output_err)?;
        file.flush().map_err(output_err)?;
        file.persist(path).map_err(|e| output_err(e.error))?;

        info!(
            path = %path.display(),
            records = self.forecasts.len(),
            "Wrote forecast document"
        );
        Ok(())
    }
}

/// RFC 3339 with a `+00:00` offset, whole seconds.
fn iso8601<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Secs, false))
}

/// RFC 3339 with a `+00:00` offset and microseconds.
fn iso8601_micros<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Micros, false))
}
