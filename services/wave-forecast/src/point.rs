//! Forecast location and the request bounding box around it.

use grib2_parser::normalize_longitude;
use serde::{Deserialize, Serialize};

/// Location of interest.
///
/// Stored with longitude in [0, 360), the convention of the GFS-Wave grids.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPoint {
    lat: f64,
    lon: f64,
}

impl TargetPoint {
    /// Longitude may be given signed or in 0-360.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon: normalize_longitude(lon),
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in [0, 360).
    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Longitude in [-180, 180).
    pub fn signed_lon(&self) -> f64 {
        if self.lon >= 180.0 {
            self.lon - 360.0
        } else {
            self.lon
        }
    }
}

/// Request subregion in the provider's 0-360 longitude convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub toplat: f64,
    pub bottomlat: f64,
    pub leftlon: f64,
    pub rightlon: f64,
}

impl BoundingBox {
    /// Box of `half_width` degrees around `point`, edges rounded to 0.1.
    pub fn around(point: &TargetPoint, half_width: f64) -> Self {
        Self {
            toplat: round_tenth(point.lat() + half_width),
            bottomlat: round_tenth(point.lat() - half_width),
            leftlon: round_tenth(point.lon() - half_width),
            rightlon: round_tenth(point.lon() + half_width),
        }
    }

    pub fn contains(&self, point: &TargetPoint) -> bool {
        (self.bottomlat..=self.toplat).contains(&point.lat())
            && (self.leftlon..=self.rightlon).contains(&point.lon())
    }

    pub fn is_degenerate(&self) -> bool {
        self.toplat <= self.bottomlat || self.rightlon <= self.leftlon
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
