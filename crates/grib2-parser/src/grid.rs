//! Regular latitude/longitude grid geometry and nearest-point lookup.

use crate::sections::GridDefinition;
use crate::Grib2Error;

/// Scanning mode flag: points scan in the -i (westward) direction.
const SCAN_NEGATIVE_I: u8 = 0x80;
/// Scanning mode flag: adjacent points in j are consecutive.
const SCAN_J_CONSECUTIVE: u8 = 0x20;
/// Scanning mode flag: rows alternate direction.
const SCAN_BOUSTROPHEDON: u8 = 0x10;

/// Normalize a longitude into [0, 360).
pub fn normalize_longitude(lon: f64) -> f64 {
    let lon = lon.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if lon >= 360.0 {
        0.0
    } else {
        lon
    }
}

/// Geometry of a regular lat/lon grid decoded from template 3.0.
///
/// Longitudes are kept in the 0-360 convention. Steps are signed and follow
/// the scan order, so `latitude(j)` and `longitude(i)` walk the grid in the
/// order the values are stored.
#[derive(Debug, Clone, PartialEq)]
pub struct LatLonGrid {
    ni: usize,
    nj: usize,
    first_lat: f64,
    first_lon: f64,
    lat_step: f64,
    lon_step: f64,
    j_consecutive: bool,
}

impl LatLonGrid {
    pub fn from_definition(def: &GridDefinition) -> Result<Self, Grib2Error> {
        if def.scanning_mode & SCAN_BOUSTROPHEDON != 0 {
            return Err(Grib2Error::InvalidSection {
                section: 3,
                reason: format!("Unsupported scanning mode {:#010b}", def.scanning_mode),
            });
        }

        let ni = def.num_points_longitude as usize;
        let nj = def.num_points_latitude as usize;
        if ni == 0 || nj == 0 {
            return Err(Grib2Error::InvalidSection {
                section: 3,
                reason: format!("Empty grid {}x{}", ni, nj),
            });
        }

        let la1 = def.first_latitude_microdegrees as f64 * 1e-6;
        let la2 = def.last_latitude_microdegrees as f64 * 1e-6;
        let lo1 = normalize_longitude(def.first_longitude_microdegrees as f64 * 1e-6);
        let lo2 = normalize_longitude(def.last_longitude_microdegrees as f64 * 1e-6);

        // Derive steps from the corner points; the encoded increments are
        // rounded to microdegrees, which drifts on 1/6 degree grids.
        let lat_step = if nj > 1 {
            (la2 - la1) / (nj - 1) as f64
        } else {
            def.latitude_increment_microdegrees.unwrap_or(0) as f64 * 1e-6
        };

        let negative_i = def.scanning_mode & SCAN_NEGATIVE_I != 0;
        let lon_span = if negative_i {
            (lo1 - lo2).rem_euclid(360.0)
        } else {
            (lo2 - lo1).rem_euclid(360.0)
        };
        let lon_magnitude = if ni > 1 {
            lon_span / (ni - 1) as f64
        } else {
            def.longitude_increment_microdegrees.unwrap_or(0) as f64 * 1e-6
        };
        let lon_step = if negative_i { -lon_magnitude } else { lon_magnitude };

        Ok(Self {
            ni,
            nj,
            first_lat: la1,
            first_lon: lo1,
            lat_step,
            lon_step,
            j_consecutive: def.scanning_mode & SCAN_J_CONSECUTIVE != 0,
        })
    }

    /// Number of points along a parallel.
    pub fn ni(&self) -> usize {
        self.ni
    }

    /// Number of points along a meridian.
    pub fn nj(&self) -> usize {
        self.nj
    }

    pub fn len(&self) -> usize {
        self.ni * self.nj
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn latitude(&self, j: usize) -> f64 {
        self.first_lat + j as f64 * self.lat_step
    }

    pub fn longitude(&self, i: usize) -> f64 {
        normalize_longitude(self.first_lon + i as f64 * self.lon_step)
    }

    /// Row/column of the grid point closest to (lat, lon).
    ///
    /// Targets outside the grid snap to the nearest edge point.
    pub fn nearest(&self, lat: f64, lon: f64) -> (usize, usize) {
        let j = if self.nj == 1 || self.lat_step == 0.0 {
            0
        } else {
            nearest_index((lat - self.first_lat) / self.lat_step, self.nj)
        };

        let i = if self.ni == 1 || self.lon_step == 0.0 {
            0
        } else {
            let magnitude = self.lon_step.abs();
            let mut delta = if self.lon_step > 0.0 {
                (normalize_longitude(lon) - self.first_lon).rem_euclid(360.0)
            } else {
                (self.first_lon - normalize_longitude(lon)).rem_euclid(360.0)
            };
            // Points just before the first column wrap around to ~360;
            // measure them as negative distances instead.
            let span = magnitude * (self.ni - 1) as f64;
            if delta > span + (360.0 - span) / 2.0 {
                delta -= 360.0;
            }
            nearest_index(delta / magnitude, self.ni)
        };

        (j, i)
    }

    /// Index into the value array for row `j`, column `i`.
    pub fn flat_index(&self, j: usize, i: usize) -> usize {
        if self.j_consecutive {
            j + i * self.nj
        } else {
            i + j * self.ni
        }
    }
}

fn nearest_index(position: f64, count: usize) -> usize {
    position.round().clamp(0.0, (count - 1) as f64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(ni: u32, nj: u32, la1: f64, lo1: f64, la2: f64, lo2: f64, scan: u8) -> GridDefinition {
        GridDefinition {
            template_number: 0,
            num_data_points: ni * nj,
            num_points_longitude: ni,
            num_points_latitude: nj,
            first_latitude_microdegrees: (la1 * 1e6).round() as i32,
            first_longitude_microdegrees: (lo1 * 1e6).round() as i32,
            last_latitude_microdegrees: (la2 * 1e6).round() as i32,
            last_longitude_microdegrees: (lo2 * 1e6).round() as i32,
            longitude_increment_microdegrees: None,
            latitude_increment_microdegrees: None,
            scanning_mode: scan,
        }
    }

    #[test]
    fn test_normalize_longitude() {
        assert_eq!(normalize_longitude(-71.5), 288.5);
        assert_eq!(normalize_longitude(360.0), 0.0);
        assert_eq!(normalize_longitude(288.5), 288.5);
    }

    #[test]
    fn test_north_to_south_grid() {
        // NOMADS subset around Fishers Island: 41.2N..40.8N, 288.2E..288.6E
        let grid = LatLonGrid::from_definition(&definition(5, 5, 41.2, 288.2, 40.8, 288.6, 0)).unwrap();

        assert!((grid.latitude(0) - 41.2).abs() < 1e-9);
        assert!((grid.latitude(4) - 40.8).abs() < 1e-9);
        assert!((grid.longitude(4) - 288.6).abs() < 1e-9);

        assert_eq!(grid.nearest(41.002677, 288.400466), (2, 2));
        assert_eq!(grid.nearest(41.19, 288.21), (0, 0));
    }

    #[test]
    fn test_south_to_north_grid() {
        let grid = LatLonGrid::from_definition(&definition(5, 5, 40.8, 288.2, 41.2, 288.6, 0x40)).unwrap();

        assert_eq!(grid.nearest(41.2, 288.6), (4, 4));
        assert_eq!(grid.nearest(40.84, 288.2), (0, 0));
    }

    #[test]
    fn test_signed_target_longitude_matches_0_360() {
        let grid = LatLonGrid::from_definition(&definition(5, 5, 41.2, 288.2, 40.8, 288.6, 0)).unwrap();

        assert_eq!(grid.nearest(41.0, -71.6), grid.nearest(41.0, 288.4));
    }

    #[test]
    fn test_targets_outside_grid_snap_to_edges() {
        let grid = LatLonGrid::from_definition(&definition(5, 5, 41.2, 288.2, 40.8, 288.6, 0)).unwrap();

        // West of the first column
        assert_eq!(grid.nearest(41.0, 287.0).1, 0);
        // East of the last column
        assert_eq!(grid.nearest(41.0, 290.0).1, 4);
        // North and south of the grid
        assert_eq!(grid.nearest(45.0, 288.4).0, 0);
        assert_eq!(grid.nearest(30.0, 288.4).0, 4);
    }

    #[test]
    fn test_grid_crossing_prime_meridian() {
        let grid = LatLonGrid::from_definition(&definition(5, 1, 0.0, 359.0, 0.0, 1.0, 0)).unwrap();

        assert!((grid.longitude(1) - 359.5).abs() < 1e-9);
        assert!((grid.longitude(3) - 0.5).abs() < 1e-9);
        assert_eq!(grid.nearest(0.0, 0.4).1, 3);
        assert_eq!(grid.nearest(0.0, -0.9).1, 0);
    }

    #[test]
    fn test_flat_index_orders() {
        let grid = LatLonGrid::from_definition(&definition(4, 3, 3.0, 0.0, 1.0, 3.0, 0)).unwrap();
        assert_eq!(grid.flat_index(1, 2), 6);

        let grid = LatLonGrid::from_definition(&definition(4, 3, 3.0, 0.0, 1.0, 3.0, 0x20)).unwrap();
        assert_eq!(grid.flat_index(1, 2), 7);
    }

    #[test]
    fn test_boustrophedon_is_rejected() {
        let result = LatLonGrid::from_definition(&definition(4, 3, 3.0, 0.0, 1.0, 3.0, 0x10));
        assert!(result.is_err());
    }
}
