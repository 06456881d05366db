//! Point extraction from a downloaded grid file.
//!
//! The payload is staged in a temporary file, decoded on the blocking pool
//! and sampled at the grid point nearest the forecast location.

use std::io::Write;
use std::path::PathBuf;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use grib2_parser::GribDataset;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::ExtractError;
use crate::output::ForecastRecord;
use crate::point::TargetPoint;

/// NOMADS short names of the sampled fields.
pub const HEIGHT_VARIABLE: &str = "HTSGW";
pub const PERIOD_VARIABLE: &str = "PERPW";
pub const DIRECTION_VARIABLE: &str = "DIRPW";

const METERS_TO_FEET: f64 = 3.28084;

/// Raw values at the nearest grid point. A field is `None` when the
/// variable is absent from the file or the point is masked.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GridSample {
    /// Significant height of combined wind waves and swell (m)
    pub height_m: Option<f64>,
    /// Primary wave mean period (s)
    pub period_s: Option<f64>,
    /// Primary wave direction (degrees true, coming from)
    pub direction_deg: Option<f64>,
}

impl GridSample {
    /// Convert to an output record, applying unit conversion and rounding.
    pub fn into_record(self, valid_time: DateTime<Utc>, forecast_hour: u32) -> ForecastRecord {
        ForecastRecord {
            valid_time,
            forecast_hour,
            height_ft: self.height_m.map(|m| round_to(m * METERS_TO_FEET, 1)),
            height_m: self.height_m.map(|m| round_to(m, 2)),
            period_s: self.period_s.map(|s| round_to(s, 1)),
            direction_deg: self.direction_deg.map(|d| round_to(d, 0)),
        }
    }
}

/// Round to `places` decimals, ties to even.
///
/// Simple-packed values are `R + X * 2^E`, so exact ties such as 8.25 are
/// common. They round to the even neighbour: 8.25 becomes 8.2.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}

/// Samples grid files at a fixed location.
#[derive(Debug, Clone)]
pub struct PointExtractor {
    target: TargetPoint,
    scratch_dir: Option<PathBuf>,
}

impl PointExtractor {
    pub fn new(target: TargetPoint, scratch_dir: Option<PathBuf>) -> Self {
        Self {
            target,
            scratch_dir,
        }
    }

    pub fn target(&self) -> &TargetPoint {
        &self.target
    }

    /// Decode `data` and sample it at the target point.
    pub async fn extract(&self, data: Bytes, forecast_hour: u32) -> Result<GridSample, ExtractError> {
        let extractor = self.clone();
        let result = tokio::task::spawn_blocking(move || extractor.extract_blocking(&data))
            .await
            .map_err(|e| ExtractError::Join(e.to_string()))
            .and_then(|r| r);

        if let Err(e) = &result {
            warn!(forecast_hour, error = %e, "Failed to extract point");
        }
        result
    }

    /// Synchronous extraction; the staged file is removed on every path.
    pub fn extract_blocking(&self, data: &[u8]) -> Result<GridSample, ExtractError> {
        let staged = self.stage(data)?;
        let dataset = GribDataset::open(staged.path())?;
        Ok(self.sample(&dataset))
    }

    fn stage(&self, data: &[u8]) -> Result<NamedTempFile, ExtractError> {
        let mut file = match &self.scratch_dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };
        file.write_all(data)?;
        file.flush()?;
        Ok(file)
    }

    fn sample(&self, dataset: &GribDataset) -> GridSample {
        let point = dataset.select_nearest(self.target.lat(), self.target.lon());
        debug!(
            lat = point.latitude(),
            lon = point.longitude(),
            variables = ?dataset.variable_names().collect::<Vec<_>>(),
            "Selected grid point"
        );

        GridSample {
            height_m: point.value(HEIGHT_VARIABLE),
            period_s: point.value(PERIOD_VARIABLE),
            direction_deg: point.value(DIRECTION_VARIABLE),
        }
    }
}
