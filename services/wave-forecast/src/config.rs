//! Configuration for the forecast pipeline.
//!
//! Every field has a default matching the production deployment, so the
//! YAML file only needs to list what differs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::cycle::DEFAULT_AVAILABILITY_LAG_MINUTES;
use crate::error::ConfigError;
use crate::point::{BoundingBox, TargetPoint};

/// Root configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub point: PointConfig,
    pub source: SourceConfig,
    /// Explicit request box; derived from `point` when absent.
    pub bbox: Option<BoundingBox>,
    pub bbox_half_width: f64,
    pub schedule: ScheduleConfig,
    pub fetch: FetchConfig,
    pub output: OutputConfig,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            point: PointConfig::default(),
            source: SourceConfig::default(),
            bbox: None,
            bbox_half_width: 0.2,
            schedule: ScheduleConfig::default(),
            fetch: FetchConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Location of interest. Longitude may be signed or 0-360.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PointConfig {
    pub lat: f64,
    pub lon: f64,
}

impl Default for PointConfig {
    fn default() -> Self {
        // Fishers Island, NY
        Self {
            lat: 41.002677,
            lon: 360.0 - 71.599534,
        }
    }
}

/// NOMADS filter endpoint and file naming.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub endpoint: String,
    /// Directory template with `{date}` and `{cycle:02}` placeholders
    pub dir_template: String,
    /// File template with `{cycle:02}` and `{forecast:03}` placeholders
    pub file_pattern: String,
    /// NOMADS variable names requested with `var_<NAME>=on`
    pub variables: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://nomads.ncep.noaa.gov/cgi-bin/filter_gfswave.pl".to_string(),
            dir_template: "/gfs.{date}/{cycle:02}/wave/gridded".to_string(),
            file_pattern: "gfswave.t{cycle:02}z.atlocn.0p16.f{forecast:03}.grib2".to_string(),
            variables: vec!["DIRPW".to_string(), "HTSGW".to_string(), "PERPW".to_string()],
        }
    }
}

/// Cycle selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Minutes after a cycle's start before its files are assumed published
    pub availability_lag_minutes: i64,
    /// Check that forecast hour 0 exists before the main run, stepping
    /// back one cycle if it does not
    pub probe: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            availability_lag_minutes: DEFAULT_AVAILABILITY_LAG_MINUTES,
            probe: false,
        }
    }
}

/// HTTP and worker settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_concurrent: usize,
    /// Directory for transient grid files; system temp dir when unset
    pub scratch_dir: Option<PathBuf>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_concurrent: 4,
            scratch_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/forecast.json"),
        }
    }
}

impl ForecastConfig {
    /// Load and validate a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_yaml(&content)?;
        debug!(path = %path.display(), "Loaded forecast config");
        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: ForecastConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-90.0..=90.0).contains(&self.point.lat) {
            return Err(ConfigError::Invalid(format!(
                "point.lat {} is outside [-90, 90]",
                self.point.lat
            )));
        }
        if !(-180.0..360.0).contains(&self.point.lon) {
            return Err(ConfigError::Invalid(format!(
                "point.lon {} is outside [-180, 360)",
                self.point.lon
            )));
        }
        if self.bbox.is_none() && (self.bbox_half_width <= 0.0 || self.bbox_half_width.is_nan()) {
            return Err(ConfigError::Invalid(
                "bbox_half_width must be positive".to_string(),
            ));
        }

        let bbox = self.bounding_box();
        if bbox.is_degenerate() {
            return Err(ConfigError::Invalid(format!(
                "bbox {:?} has no extent",
                bbox
            )));
        }
        if !bbox.contains(&self.target()) {
            return Err(ConfigError::Invalid(format!(
                "bbox {:?} does not contain the forecast point",
                bbox
            )));
        }

        if self.source.variables.is_empty() {
            return Err(ConfigError::Invalid(
                "source.variables must not be empty".to_string(),
            ));
        }
        if self.schedule.availability_lag_minutes < 0 {
            return Err(ConfigError::Invalid(
                "schedule.availability_lag_minutes must not be negative".to_string(),
            ));
        }
        if self.fetch.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "fetch.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "fetch.timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn target(&self) -> TargetPoint {
        TargetPoint::new(self.point.lat, self.point.lon)
    }

    /// Configured box, or one derived from the target point.
    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
            .unwrap_or_else(|| BoundingBox::around(&self.target(), self.bbox_half_width))
    }

    pub fn availability_lag(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.schedule.availability_lag_minutes)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ForecastConfig::default();
        config.validate().unwrap();

        assert_eq!(config.fetch.max_concurrent, 4);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.availability_lag(), chrono::Duration::minutes(210));
        assert_eq!(config.output.path, PathBuf::from("data/forecast.json"));
        assert_eq!(
            config.bounding_box(),
            BoundingBox {
                toplat: 41.2,
                bottomlat: 40.8,
                leftlon: 288.2,
                rightlon: 288.6,
            }
        );
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ForecastConfig::from_yaml("{}").unwrap();
        assert_eq!(config.source.variables, vec!["DIRPW", "HTSGW", "PERPW"]);
        assert!(!config.schedule.probe);
    }

    #[test]
    fn test_parse_partial_config() {
        let yaml = r#"
point:
  lat: 40.5
  lon: -73.7

schedule:
  probe: true

fetch:
  max_concurrent: 1
  scratch_dir: /var/tmp/wave

output:
  path: /srv/www/forecast.json
"#;

        let config = ForecastConfig::from_yaml(yaml).unwrap();
        assert!((config.target().lon() - 286.3).abs() < 1e-9);
        assert!(config.schedule.probe);
        assert_eq!(config.schedule.availability_lag_minutes, 210);
        assert_eq!(config.fetch.max_concurrent, 1);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.fetch.scratch_dir, Some(PathBuf::from("/var/tmp/wave")));
        assert_eq!(config.bounding_box().toplat, 40.7);
        assert_eq!(config.bounding_box().leftlon, 286.1);
    }

    #[test]
    fn test_explicit_bbox() {
        let yaml = r#"
bbox:
  toplat: 42.0
  bottomlat: 40.0
  leftlon: 287.0
  rightlon: 289.0
"#;
        let config = ForecastConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.bounding_box().toplat, 42.0);
        assert_eq!(config.bounding_box().rightlon, 289.0);
    }

    #[test]
    fn test_bbox_must_contain_point() {
        let yaml = r#"
bbox:
  toplat: 45.0
  bottomlat: 44.0
  leftlon: 287.0
  rightlon: 289.0
"#;
        assert!(matches!(
            ForecastConfig::from_yaml(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for yaml in [
            "point: {lat: 91.0}",
            "point: {lon: 400.0}",
            "fetch: {max_concurrent: 0}",
            "fetch: {timeout_secs: 0}",
            "bbox_half_width: 0.0",
            "source: {variables: []}",
            "schedule: {availability_lag_minutes: -5}",
        ] {
            assert!(
                matches!(ForecastConfig::from_yaml(yaml), Err(ConfigError::Invalid(_))),
                "expected {} to be rejected",
                yaml
            );
        }
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(matches!(
            ForecastConfig::from_yaml("fetch: [1, 2"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = ForecastConfig::load(Path::new("/nonexistent/forecast.yaml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
