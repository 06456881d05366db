//! Point wave forecast extraction from NOAA GFS-Wave model output.
//!
//! For a fixed location, the pipeline:
//! - selects the latest published model cycle
//! - downloads one subsetted GRIB2 file per forecast hour from NOMADS
//! - samples significant height, period and direction at the nearest grid point
//! - writes the ordered series as a JSON document
//!
//! Individual forecast hours that fail to download or decode are skipped.

pub mod config;
pub mod cycle;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod horizon;
pub mod output;
pub mod pipeline;
pub mod point;

pub use config::ForecastConfig;
pub use cycle::{select_cycle, ModelCycle};
pub use error::{ConfigError, ExtractError, FetchError, ForecastError, OffsetFailure};
pub use extract::{GridSample, PointExtractor};
pub use fetch::{GridFetcher, NomadsFetcher};
pub use horizon::forecast_offsets;
pub use output::{ForecastDocument, ForecastRecord, GridPoint};
pub use pipeline::Pipeline;
pub use point::{BoundingBox, TargetPoint};
