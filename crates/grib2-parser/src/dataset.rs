//! Queryable view over the fields of a GRIB2 file.
//!
//! All fields of a dataset share one regular lat/lon grid, which is what a
//! NOMADS filter request over a bounding box returns.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::grid::{normalize_longitude, LatLonGrid};
use crate::tables::Grib2Tables;
use crate::{Grib2Error, Grib2Reader};

/// One decoded field.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub level: String,
    pub values: Vec<f32>,
}

/// Decoded GRIB2 fields on a common grid.
#[derive(Debug, Clone)]
pub struct GribDataset {
    grid: LatLonGrid,
    variables: Vec<Variable>,
}

impl GribDataset {
    /// Read and decode a GRIB2 file using the wave parameter tables.
    pub fn open(path: &Path) -> Result<Self, Grib2Error> {
        let data = std::fs::read(path)?;
        Self::from_bytes(Bytes::from(data), Arc::new(Grib2Tables::wave()))
    }

    /// Decode every message in `data`.
    ///
    /// When a parameter appears more than once, the first message wins.
    pub fn from_bytes(data: Bytes, tables: Arc<Grib2Tables>) -> Result<Self, Grib2Error> {
        let mut reader = Grib2Reader::new(data, tables);
        let mut grid: Option<LatLonGrid> = None;
        let mut variables: Vec<Variable> = Vec::new();

        while let Some(message) = reader.next_message()? {
            let message_grid = LatLonGrid::from_definition(&message.grid_definition)?;
            match &grid {
                Some(existing) if *existing != message_grid => {
                    return Err(Grib2Error::InvalidFormat(format!(
                        "Field {} is on a different grid than the preceding fields",
                        message.parameter()
                    )));
                }
                Some(_) => {}
                None => grid = Some(message_grid),
            }

            if variables.iter().any(|v| v.name == message.parameter()) {
                debug!(parameter = %message.parameter(), "Skipping repeated field");
                continue;
            }

            variables.push(Variable {
                name: message.parameter().to_string(),
                level: message.product_definition.level_description.clone(),
                values: message.unpack_data()?,
            });
        }

        let grid = grid.ok_or_else(|| Grib2Error::InvalidFormat("No fields in data".to_string()))?;

        Ok(Self { grid, variables })
    }

    pub fn grid(&self) -> &LatLonGrid {
        &self.grid
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Select the grid point nearest to (lat, lon). Longitude may be given
    /// in either the signed or the 0-360 convention.
    pub fn select_nearest(&self, lat: f64, lon: f64) -> PointSelection<'_> {
        let (j, i) = self.grid.nearest(lat, normalize_longitude(lon));
        PointSelection {
            dataset: self,
            index: self.grid.flat_index(j, i),
            latitude: self.grid.latitude(j),
            longitude: self.grid.longitude(i),
        }
    }
}

/// Values of a dataset at a single grid point.
#[derive(Debug, Clone, Copy)]
pub struct PointSelection<'a> {
    dataset: &'a GribDataset,
    index: usize,
    latitude: f64,
    longitude: f64,
}

impl PointSelection<'_> {
    /// Latitude of the selected grid point.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude of the selected grid point (0-360).
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Scalar value of `name` at this point; `None` when the field is not in
    /// the dataset or the point is masked.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.dataset
            .variable(name)
            .and_then(|v| v.values.get(self.index))
            .filter(|v| !v.is_nan())
            .map(|v| *v as f64)
    }
}
