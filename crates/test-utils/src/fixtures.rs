//! Common test fixtures for wave forecast tests.
//!
//! The forecast point is the Fishers Island buoy location used by the
//! production configuration; the grid matches the 0.4 degree box NOMADS
//! returns around it.

use std::io::Write;

use tempfile::NamedTempFile;

use crate::generators::create_field_with_center;
use crate::grib2::{concat_messages, Grib2Builder};

/// Forecast point and the subset grid around it.
pub mod point {
    /// Target latitude (degrees north)
    pub const TARGET_LAT: f64 = 41.002677;

    /// Target longitude in the 0-360 convention
    pub const TARGET_LON: f64 = 288.400466;

    /// Target longitude in the signed convention
    pub const TARGET_LON_SIGNED: f64 = -71.599534;

    /// Subset grid: 5x5 points at 0.1 degree spacing
    pub const GRID_NI: usize = 5;
    pub const GRID_NJ: usize = 5;

    /// Row-major index of the grid point nearest the target (41.0N, 288.4E)
    pub const TARGET_INDEX: usize = 12;

    /// Coordinates of that grid point
    pub const NEAREST_LAT: f64 = 41.0;
    pub const NEAREST_LON: f64 = 288.4;
}

/// Parameter numbers in GRIB2 code table 4.2-10-0 (waves).
pub mod wave_params {
    pub const HTSGW: u8 = 3;
    pub const DIRPW: u8 = 10;
    pub const PERPW: u8 = 11;
}

/// Values placed at the target grid point by [`wave_file`]. All of them are
/// exactly representable after 16-bit packing.
pub mod sample {
    pub const HEIGHT_M: f32 = 1.25;
    pub const PERIOD_S: f32 = 8.125;
    pub const DIRECTION_DEG: f32 = 145.25;
}

/// One wave field on the 5x5 subset grid with `center` at the target point
/// and `center - 1.0` elsewhere.
pub fn wave_field(param_number: u8, center: f32, forecast_hour: u32) -> Vec<u8> {
    Grib2Builder::new_gfs_wave()
        .with_parameter(0, param_number)
        .with_forecast_hour(forecast_hour)
        .with_data(create_field_with_center(
            point::GRID_NI,
            point::GRID_NJ,
            center - 1.0,
            center,
        ))
        .build()
}

/// A file with HTSGW, PERPW and DIRPW for one forecast hour, as the NOMADS
/// filter returns it.
pub fn wave_file(forecast_hour: u32) -> Vec<u8> {
    concat_messages(&[
        wave_field(wave_params::HTSGW, sample::HEIGHT_M, forecast_hour),
        wave_field(wave_params::PERPW, sample::PERIOD_S, forecast_hour),
        wave_field(wave_params::DIRPW, sample::DIRECTION_DEG, forecast_hour),
    ])
}

/// Write bytes to a temporary file that is removed when dropped.
pub fn write_temp_file(data: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(data).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}
