//! GRIB2 parser (WMO FM 92 GRIB Edition 2) for regular lat/lon model output.
//!
//! The reader walks the messages of a GRIB2 file, parses their sections and
//! unpacks the field values. [`GribDataset`] builds on top of it to offer
//! nearest-grid-point selection and lookup of fields by their short name.

pub mod dataset;
pub mod grid;
pub mod sections;
pub mod tables;
pub mod unpacking;

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

pub use dataset::{GribDataset, PointSelection};
pub use grid::{normalize_longitude, LatLonGrid};
pub use tables::{Grib2Tables, LevelDescription};
pub use unpacking::unpack_simple;

use sections::{
    Bitmap, DataRepresentation, DataSection, GridDefinition, Identification, Indicator,
    ProductDefinition,
};

/// Largest grid accepted for unpacking. A global 0.05 degree grid has about
/// 26 million points.
pub const MAX_GRID_POINTS: usize = 50_000_000;

/// Errors raised while reading GRIB2 data.
#[derive(Debug, Error)]
pub enum Grib2Error {
    #[error("Invalid GRIB2 format: {0}")]
    InvalidFormat(String),

    #[error("Invalid section {section}: {reason}")]
    InvalidSection { section: u8, reason: String },

    #[error("Unsupported template {template} in section {section}")]
    UnsupportedTemplate { section: u8, template: u16 },

    #[error("Failed to unpack data: {0}")]
    UnpackingError(String),

    #[error("Failed to read GRIB2 file: {0}")]
    Io(#[from] std::io::Error),
}

/// A single parsed GRIB2 message.
#[derive(Debug, Clone)]
pub struct Grib2Message {
    pub indicator: Indicator,
    pub identification: Identification,
    pub grid_definition: GridDefinition,
    pub product_definition: ProductDefinition,
    pub data_representation: DataRepresentation,
    pub bitmap: Option<Bitmap>,
    pub data_section: DataSection,
    raw: Bytes,
}

impl Grib2Message {
    /// Parse the sections of one complete message (from "GRIB" to "7777").
    pub fn parse(raw: Bytes, tables: &Grib2Tables) -> Result<Self, Grib2Error> {
        let indicator = sections::parse_indicator(&raw)?;
        let identification = sections::parse_identification(&raw)?;
        let grid_definition = sections::parse_grid_definition(&raw)?;
        let product_definition =
            sections::parse_product_definition(&raw, indicator.discipline, tables)?;
        let data_representation = sections::parse_data_representation(&raw)?;
        let bitmap = sections::parse_bitmap(&raw)?;
        let data_section = sections::parse_data_section(&raw)?;

        Ok(Self {
            indicator,
            identification,
            grid_definition,
            product_definition,
            data_representation,
            bitmap,
            data_section,
            raw,
        })
    }

    /// Parameter short name, e.g. "HTSGW".
    pub fn parameter(&self) -> &str {
        &self.product_definition.parameter_short_name
    }

    /// Grid dimensions as (rows, columns).
    pub fn grid_dims(&self) -> (usize, usize) {
        (
            self.grid_definition.num_points_latitude as usize,
            self.grid_definition.num_points_longitude as usize,
        )
    }

    /// Unpack the field onto the full grid. Masked points are NaN.
    ///
    /// The grid size from Ni and Nj must agree with the declared number of
    /// data points and stay under [`MAX_GRID_POINTS`] before anything is
    /// allocated.
    pub fn unpack_data(&self) -> Result<Vec<f32>, Grib2Error> {
        let (nj, ni) = self.grid_dims();
        let num_grid_points = ni
            .checked_mul(nj)
            .filter(|n| *n == self.grid_definition.num_data_points as usize)
            .ok_or_else(|| Grib2Error::InvalidSection {
                section: 3,
                reason: format!(
                    "Grid of {}x{} points does not match {} declared data points",
                    ni, nj, self.grid_definition.num_data_points
                ),
            })?;
        if num_grid_points > MAX_GRID_POINTS {
            return Err(Grib2Error::InvalidSection {
                section: 3,
                reason: format!(
                    "Grid of {} points exceeds the limit of {}",
                    num_grid_points, MAX_GRID_POINTS
                ),
            });
        }
        let drs = &self.data_representation;

        let values = match drs.template_number {
            0 => unpack_simple(
                &self.data_section.data,
                num_grid_points,
                drs.bits_per_value,
                drs.reference_value,
                drs.binary_scale_factor,
                drs.decimal_scale_factor,
                self.bitmap.as_ref().map(|b| b.data.as_ref()),
            )?
            .into_iter()
            .map(|v| v.unwrap_or(f32::NAN))
            .collect::<Vec<_>>(),
            template => {
                debug!(template, parameter = %self.parameter(), "Delegating unpacking to grib crate");
                unpacking::unpack_with_grib(&self.raw)?
            }
        };

        if values.len() != num_grid_points {
            return Err(Grib2Error::UnpackingError(format!(
                "Expected {} values, got {}",
                num_grid_points,
                values.len()
            )));
        }

        Ok(values)
    }
}

/// Sequential reader over the messages in a GRIB2 buffer.
pub struct Grib2Reader {
    data: Bytes,
    offset: usize,
    tables: Arc<Grib2Tables>,
    messages_read: usize,
}

impl Grib2Reader {
    pub fn new(data: Bytes, tables: Arc<Grib2Tables>) -> Self {
        Self {
            data,
            offset: 0,
            tables,
            messages_read: 0,
        }
    }

    /// Read the next message, or `None` at the end of the buffer.
    ///
    /// A buffer without any GRIB message is an error; trailing bytes after
    /// the last message are ignored.
    pub fn next_message(&mut self) -> Result<Option<Grib2Message>, Grib2Error> {
        let start = match find_magic(&self.data[self.offset..]) {
            Some(pos) => self.offset + pos,
            None if self.messages_read == 0 => {
                return Err(Grib2Error::InvalidFormat(
                    "No GRIB message found in data".to_string(),
                ));
            }
            None => {
                self.offset = self.data.len();
                return Ok(None);
            }
        };

        let indicator = sections::parse_indicator(&self.data[start..])?;
        let length = usize::try_from(indicator.message_length)
            .map_err(|_| Grib2Error::InvalidFormat("Message length overflows".to_string()))?;

        if length < 20 || start + length > self.data.len() {
            return Err(Grib2Error::InvalidFormat(format!(
                "Truncated message at offset {}: declared {} bytes, {} available",
                start,
                length,
                self.data.len() - start
            )));
        }

        let end = start + length;
        if &self.data[end - 4..end] != b"7777" {
            return Err(Grib2Error::InvalidFormat(format!(
                "Message at offset {} is missing its end marker",
                start
            )));
        }

        let message = Grib2Message::parse(self.data.slice(start..end), &self.tables)?;
        self.offset = end;
        self.messages_read += 1;

        Ok(Some(message))
    }
}

fn find_magic(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"GRIB")
}
