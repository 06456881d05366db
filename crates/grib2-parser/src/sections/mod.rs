//! GRIB2 section parsing.
//!
//! Each GRIB2 message consists of an indicator, an identification section,
//! a grid definition, a product definition, a data representation, an
//! optional bitmap and the packed data. Parsers here take the byte slice of
//! a single message.

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};

use crate::tables::Grib2Tables;
use crate::Grib2Error;

/// Value GRIB2 uses for "not set" in 32-bit unsigned fields.
const MISSING_U32: u32 = 0xFFFF_FFFF;

/// Section 0: Indicator Section (16 bytes)
#[derive(Debug, Clone)]
pub struct Indicator {
    pub discipline: u8,
    pub edition: u8,
    pub message_length: u64,
}

/// Section 1: Identification Section
#[derive(Debug, Clone)]
pub struct Identification {
    pub center: u16,
    pub sub_center: u16,
    pub significance_of_reference_time: u8,
    pub reference_time: DateTime<Utc>,
    pub production_status: u8,
    pub data_type: u8,
}

/// Section 3: Grid Definition Section (template 3.0, regular lat/lon).
///
/// Coordinates are kept in microdegrees as encoded; increments are `None`
/// when the message marks them as missing.
#[derive(Debug, Clone)]
pub struct GridDefinition {
    pub template_number: u16,
    pub num_data_points: u32,
    pub num_points_longitude: u32,
    pub num_points_latitude: u32,
    pub first_latitude_microdegrees: i32,
    pub first_longitude_microdegrees: i32,
    pub last_latitude_microdegrees: i32,
    pub last_longitude_microdegrees: i32,
    pub longitude_increment_microdegrees: Option<u32>,
    pub latitude_increment_microdegrees: Option<u32>,
    pub scanning_mode: u8,
}

/// Section 4: Product Definition Section
#[derive(Debug, Clone)]
pub struct ProductDefinition {
    pub template_number: u16,
    pub parameter_category: u8,
    pub parameter_number: u8,
    pub parameter_short_name: String,
    pub level_type: u8,
    pub level_value: u32,
    pub level_description: String,
    pub forecast_hour: u32,
}

/// Section 5: Data Representation Section
#[derive(Debug, Clone)]
pub struct DataRepresentation {
    pub template_number: u16,
    /// Number of packed values (excludes points masked by the bitmap).
    pub num_data_points: u32,
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub bits_per_value: u8,
    pub original_data_type: u8,
}

/// Section 6: Bitmap Section
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub indicator: u8,
    pub data: Bytes,
}

/// Section 7: Data Section
#[derive(Debug, Clone)]
pub struct DataSection {
    pub data: Bytes,
}

// ===== Parsing Functions =====

/// Parse Section 0 (Indicator) from the start of a message.
pub fn parse_indicator(data: &[u8]) -> Result<Indicator, Grib2Error> {
    if data.len() < 16 {
        return Err(Grib2Error::InvalidFormat(
            "Not enough data for indicator section".to_string(),
        ));
    }

    if &data[0..4] != b"GRIB" {
        return Err(Grib2Error::InvalidFormat(
            "Invalid GRIB magic bytes".to_string(),
        ));
    }

    // Octets 1-4: "GRIB"
    // Octets 5-6: Reserved
    // Octet 7: Discipline
    // Octet 8: Edition number
    // Octets 9-16: Total length of message (8-byte big-endian)
    let discipline = data[6];
    let edition = data[7];

    if edition != 2 {
        return Err(Grib2Error::InvalidFormat(format!(
            "Expected GRIB edition 2, got {}",
            edition
        )));
    }

    let message_length = u64::from_be_bytes([
        data[8], data[9], data[10], data[11], data[12], data[13], data[14], data[15],
    ]);

    Ok(Indicator {
        discipline,
        edition,
        message_length,
    })
}

/// Parse Section 1 (Identification), located right after the indicator.
pub fn parse_identification(data: &[u8]) -> Result<Identification, Grib2Error> {
    let section = section_slice(data, 1)?;

    if section.len() < 21 {
        return Err(Grib2Error::InvalidSection {
            section: 1,
            reason: format!("Expected at least 21 bytes, got {}", section.len()),
        });
    }

    let center = u16::from_be_bytes([section[5], section[6]]);
    let sub_center = u16::from_be_bytes([section[7], section[8]]);
    let significance_of_reference_time = section[11];

    let year = u16::from_be_bytes([section[12], section[13]]);
    let month = section[14];
    let day = section[15];
    let hour = section[16];
    let minute = section[17];
    let second = section[18];

    let reference_time = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| Grib2Error::InvalidSection {
            section: 1,
            reason: format!(
                "Invalid date: {}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            ),
        })?;

    Ok(Identification {
        center,
        sub_center,
        significance_of_reference_time,
        reference_time: DateTime::<Utc>::from_naive_utc_and_offset(reference_time, Utc),
        production_status: section[19],
        data_type: section[20],
    })
}

/// Parse Section 3 (Grid Definition).
///
/// Only template 3.0 (regular latitude/longitude) is supported; wave model
/// output on NOMADS uses nothing else.
pub fn parse_grid_definition(data: &[u8]) -> Result<GridDefinition, Grib2Error> {
    let section = section_slice(data, 3)?;

    if section.len() < 14 {
        return Err(Grib2Error::InvalidSection {
            section: 3,
            reason: "Not enough data".to_string(),
        });
    }

    // Bytes 0-3: Section length
    // Byte 4: Section number (3)
    // Byte 5: Source of grid definition
    // Bytes 6-9: Number of data points
    // Byte 10: Octets for optional list
    // Byte 11: Interpretation of optional list
    // Bytes 12-13: Grid definition template number
    let num_data_points = u32::from_be_bytes([section[6], section[7], section[8], section[9]]);
    let template_number = u16::from_be_bytes([section[12], section[13]]);

    if template_number != 0 {
        return Err(Grib2Error::UnsupportedTemplate {
            section: 3,
            template: template_number,
        });
    }

    // Template 3.0, relative to byte 14:
    // 16-19 Ni, 20-23 Nj, 32-35 La1, 36-39 Lo1, 40 flags,
    // 41-44 La2, 45-48 Lo2, 49-52 Di, 53-56 Dj, 57 scanning mode
    let gd = &section[14..];
    if gd.len() < 58 {
        return Err(Grib2Error::InvalidSection {
            section: 3,
            reason: format!("Template 0 needs at least 58 bytes, got {}", gd.len()),
        });
    }

    let ni = u32::from_be_bytes([gd[16], gd[17], gd[18], gd[19]]);
    let nj = u32::from_be_bytes([gd[20], gd[21], gd[22], gd[23]]);
    let la1 = decode_grib2_signed(&gd[32..36]);
    let lo1 = decode_grib2_signed(&gd[36..40]);
    let la2 = decode_grib2_signed(&gd[41..45]);
    let lo2 = decode_grib2_signed(&gd[45..49]);
    let di = u32::from_be_bytes([gd[49], gd[50], gd[51], gd[52]]);
    let dj = u32::from_be_bytes([gd[53], gd[54], gd[55], gd[56]]);

    Ok(GridDefinition {
        template_number,
        num_data_points,
        num_points_longitude: ni,
        num_points_latitude: nj,
        first_latitude_microdegrees: la1,
        first_longitude_microdegrees: lo1,
        last_latitude_microdegrees: la2,
        last_longitude_microdegrees: lo2,
        longitude_increment_microdegrees: (di != MISSING_U32).then_some(di),
        latitude_increment_microdegrees: (dj != MISSING_U32).then_some(dj),
        scanning_mode: gd[57],
    })
}

/// Parse Section 4 (Product Definition).
pub fn parse_product_definition(
    data: &[u8],
    discipline: u8,
    tables: &Grib2Tables,
) -> Result<ProductDefinition, Grib2Error> {
    let section = section_slice(data, 4)?;

    if section.len() < 28 {
        return Err(Grib2Error::InvalidSection {
            section: 4,
            reason: "Not enough data".to_string(),
        });
    }

    // Bytes 5-6: Number of coordinate values
    // Bytes 7-8: Product definition template number
    // Byte 9: Parameter category
    // Byte 10: Parameter number
    // Template 4.0 (and the 4.x variants NCEP uses for waves):
    // Byte 17: Unit of time range
    // Bytes 18-21: Forecast time
    // Byte 22: Type of first fixed surface
    // Byte 23: Scale factor of first fixed surface
    // Bytes 24-27: Scaled value of first fixed surface
    let template_number = u16::from_be_bytes([section[7], section[8]]);
    let parameter_category = section[9];
    let parameter_number = section[10];
    let forecast_hour = u32::from_be_bytes([section[18], section[19], section[20], section[21]]);
    let level_type = section[22];
    let level_value = u32::from_be_bytes([section[24], section[25], section[26], section[27]]);

    Ok(ProductDefinition {
        template_number,
        parameter_category,
        parameter_number,
        parameter_short_name: tables.parameter_name(discipline, parameter_category, parameter_number),
        level_type,
        level_value,
        level_description: tables.level_description(level_type, level_value),
        forecast_hour,
    })
}

/// Parse Section 5 (Data Representation).
pub fn parse_data_representation(data: &[u8]) -> Result<DataRepresentation, Grib2Error> {
    let section = section_slice(data, 5)?;

    if section.len() < 21 {
        return Err(Grib2Error::InvalidSection {
            section: 5,
            reason: "Not enough data".to_string(),
        });
    }

    // Octets 6-9 [5-8]: Number of packed values
    // Octets 10-11 [9-10]: Template number
    // Templates 5.0, 5.2, 5.3, 5.40 and 5.41 share the leading layout:
    // [11-14] reference value (IEEE f32), [15-16] binary scale (sign-magnitude),
    // [17-18] decimal scale (sign-magnitude), [19] bits per value, [20] type
    let num_data_points = u32::from_be_bytes([section[5], section[6], section[7], section[8]]);
    let template_number = u16::from_be_bytes([section[9], section[10]]);
    let reference_value =
        f32::from_be_bytes([section[11], section[12], section[13], section[14]]);

    Ok(DataRepresentation {
        template_number,
        num_data_points,
        reference_value,
        binary_scale_factor: decode_grib2_signed_i16([section[15], section[16]]),
        decimal_scale_factor: decode_grib2_signed_i16([section[17], section[18]]),
        bits_per_value: section[19],
        original_data_type: section[20],
    })
}

/// Parse Section 6 (Bitmap).
///
/// Returns `None` when the message carries no bitmap (indicator 255).
pub fn parse_bitmap(data: &[u8]) -> Result<Option<Bitmap>, Grib2Error> {
    let section = match section_slice(data, 6) {
        Ok(section) => section,
        // Section 6 is mandatory, but some encoders drop it when unused
        Err(Grib2Error::InvalidSection { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };

    if section.len() < 6 {
        return Err(Grib2Error::InvalidSection {
            section: 6,
            reason: "Not enough data".to_string(),
        });
    }

    match section[5] {
        255 => Ok(None),
        0 => Ok(Some(Bitmap {
            indicator: 0,
            data: Bytes::copy_from_slice(&section[6..]),
        })),
        indicator => Err(Grib2Error::InvalidSection {
            section: 6,
            reason: format!("Unsupported bitmap indicator {}", indicator),
        }),
    }
}

/// Parse Section 7 (Data).
pub fn parse_data_section(data: &[u8]) -> Result<DataSection, Grib2Error> {
    let section = section_slice(data, 7)?;

    Ok(DataSection {
        data: Bytes::copy_from_slice(&section[5..]),
    })
}

/// Decode a 4-byte GRIB2 sign-magnitude integer (MSB is the sign bit).
///
/// Returns 0 for slices that are not exactly 4 bytes long.
pub fn decode_grib2_signed(bytes: &[u8]) -> i32 {
    if bytes.len() != 4 {
        return 0;
    }
    let raw = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let magnitude = (raw & 0x7FFF_FFFF) as i32;
    if raw & 0x8000_0000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Decode a 2-byte GRIB2 sign-magnitude integer.
pub fn decode_grib2_signed_i16(bytes: [u8; 2]) -> i16 {
    let raw = u16::from_be_bytes(bytes);
    let magnitude = (raw & 0x7FFF) as i16;
    if raw & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

// ===== Helper Functions =====

/// Locate a section by number and return its bytes (header included).
fn section_slice(data: &[u8], section_num: u8) -> Result<&[u8], Grib2Error> {
    let offset = find_section(data, section_num)?;
    let length = u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]) as usize;
    Ok(&data[offset..offset + length])
}

/// Find a section by number within a message.
fn find_section(data: &[u8], section_num: u8) -> Result<usize, Grib2Error> {
    let mut offset = 16; // After Section 0

    loop {
        // Section 8 is the bare "7777" marker
        if offset + 4 <= data.len() && &data[offset..offset + 4] == b"7777" {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "Reached end of message without finding section".to_string(),
            });
        }

        if offset + 5 > data.len() {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "Section not found".to_string(),
            });
        }

        let section_length = u32::from_be_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]) as usize;

        if section_length < 5 || offset + section_length > data.len() {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "Invalid section length".to_string(),
            });
        }

        if data[offset + 4] == section_num {
            return Ok(offset);
        }

        offset += section_length;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_with_sections(sections: &[Vec<u8>]) -> Vec<u8> {
        let mut message = Vec::new();
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0, 10, 2]);
        let body_len: usize = sections.iter().map(Vec::len).sum();
        message.extend_from_slice(&((16 + body_len + 4) as u64).to_be_bytes());
        for section in sections {
            message.extend_from_slice(section);
        }
        message.extend_from_slice(b"7777");
        message
    }

    fn section(number: u8, body: &[u8]) -> Vec<u8> {
        let mut section = Vec::new();
        section.extend_from_slice(&((5 + body.len()) as u32).to_be_bytes());
        section.push(number);
        section.extend_from_slice(body);
        section
    }

    #[test]
    fn test_indicator_rejects_bad_magic() {
        let data = b"HTTP/1.1 404 Not Found\r\n\r\n";
        assert!(matches!(
            parse_indicator(data),
            Err(Grib2Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_indicator_rejects_edition_1() {
        let mut data = message_with_sections(&[]);
        data[7] = 1;
        assert!(parse_indicator(&data).is_err());
    }

    #[test]
    fn test_indicator_reads_length_and_discipline() {
        let data = message_with_sections(&[section(1, &[0; 16])]);
        let indicator = parse_indicator(&data).unwrap();
        assert_eq!(indicator.discipline, 10);
        assert_eq!(indicator.edition, 2);
        assert_eq!(indicator.message_length as usize, data.len());
    }

    #[test]
    fn test_find_section_stops_at_end_marker() {
        let data = message_with_sections(&[section(1, &[0; 16])]);
        assert!(matches!(
            find_section(&data, 3),
            Err(Grib2Error::InvalidSection { section: 3, .. })
        ));
    }

    #[test]
    fn test_missing_bitmap_section_is_none() {
        let data = message_with_sections(&[section(1, &[0; 16]), section(6, &[255])]);
        assert!(parse_bitmap(&data).unwrap().is_none());
    }

    #[test]
    fn test_grid_template_other_than_latlon_is_rejected() {
        let mut body = vec![0u8; 9 + 58];
        body[7] = 0;
        body[8] = 30; // Lambert conformal
        let data = message_with_sections(&[section(3, &body)]);
        assert!(matches!(
            parse_grid_definition(&data),
            Err(Grib2Error::UnsupportedTemplate {
                section: 3,
                template: 30
            })
        ));
    }

    #[test]
    fn test_decode_signed_i16() {
        assert_eq!(decode_grib2_signed_i16([0x00, 0x05]), 5);
        assert_eq!(decode_grib2_signed_i16([0x80, 0x05]), -5);
        assert_eq!(decode_grib2_signed_i16([0x80, 0x00]), 0);
    }
}
