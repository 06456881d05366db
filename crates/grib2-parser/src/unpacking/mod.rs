//! GRIB2 data unpacking.
//!
//! Simple packing (template 5.0) is decoded here. Complex packing, spatial
//! differencing and PNG packing are delegated to the `grib` crate.

use std::io::Cursor;

use crate::Grib2Error;

/// Unpack simple packed GRIB2 data onto the full grid.
///
/// value = (R + X * 2^E) * 10^(-D)
///
/// `num_grid_points` is the size of the grid. With a bitmap, only points
/// whose bit is set consume a packed value; masked points come back as `None`.
pub fn unpack_simple(
    packed_data: &[u8],
    num_grid_points: usize,
    bits_per_value: u8,
    reference_value: f32,
    binary_scale_factor: i16,
    decimal_scale_factor: i16,
    bitmap: Option<&[u8]>,
) -> Result<Vec<Option<f32>>, Grib2Error> {
    let binary_scale = 2.0_f64.powi(binary_scale_factor as i32);
    let decimal_scale = 10.0_f64.powi(-(decimal_scale_factor as i32));
    let reference_value = reference_value as f64;
    let bits_per_value = bits_per_value as usize;

    let num_packed = match bitmap {
        Some(bm) => {
            let needed = num_grid_points.div_ceil(8);
            if bm.len() < needed {
                return Err(Grib2Error::UnpackingError(format!(
                    "Bitmap covers {} points, grid has {}",
                    bm.len() * 8,
                    num_grid_points
                )));
            }
            count_set_bits(bm, num_grid_points)
        }
        None => num_grid_points,
    };

    let available_bits = (packed_data.len() as u64).saturating_mul(8);
    let needed_bits = (num_packed as u64).saturating_mul(bits_per_value as u64);
    if needed_bits > available_bits {
        return Err(Grib2Error::UnpackingError(format!(
            "{} values at {} bits need {} bits, data section holds {}",
            num_packed, bits_per_value, needed_bits, available_bits
        )));
    }

    let mut values: Vec<Option<f32>> = Vec::new();
    values.try_reserve_exact(num_grid_points).map_err(|e| {
        Grib2Error::UnpackingError(format!("Cannot allocate {} values: {}", num_grid_points, e))
    })?;
    let mut bit_position = 0;

    for i in 0..num_grid_points {
        let present = match bitmap {
            Some(bm) => (bm[i / 8] >> (7 - i % 8)) & 1 == 1,
            None => true,
        };

        if !present {
            values.push(None);
            continue;
        }

        let packed_value = if bits_per_value == 0 {
            // All values are the reference value
            0
        } else {
            let packed = extract_bits(packed_data, bit_position, bits_per_value)
                .map_err(|e| Grib2Error::UnpackingError(format!("Failed to extract bits: {}", e)))?;
            bit_position += bits_per_value;
            packed
        };

        let value = (reference_value + packed_value as f64 * binary_scale) * decimal_scale;
        values.push(Some(value as f32));
    }

    Ok(values)
}

/// Number of set bits among the first `count` bits of `bitmap`.
fn count_set_bits(bitmap: &[u8], count: usize) -> usize {
    let full = count / 8;
    let mut set: usize = bitmap[..full].iter().map(|b| b.count_ones() as usize).sum();
    let rest = count % 8;
    if rest > 0 {
        set += (bitmap[full] >> (8 - rest)).count_ones() as usize;
    }
    set
}

/// Decode the first field of a complete GRIB2 message with the `grib` crate.
///
/// Used for packing templates other than 5.0. Masked points come back as NaN.
pub fn unpack_with_grib(message: &[u8]) -> Result<Vec<f32>, Grib2Error> {
    let grib2 = grib::from_reader(Cursor::new(message))
        .map_err(|e| Grib2Error::UnpackingError(format!("grib crate could not read message: {}", e)))?;

    let (_, submessage) = grib2
        .iter()
        .next()
        .ok_or_else(|| Grib2Error::UnpackingError("Message contains no fields".to_string()))?;

    let decoder = grib::Grib2SubmessageDecoder::from(submessage)
        .map_err(|e| Grib2Error::UnpackingError(format!("Unsupported packing: {}", e)))?;

    let values = decoder
        .dispatch()
        .map_err(|e| Grib2Error::UnpackingError(format!("Failed to decode values: {}", e)))?;

    Ok(values.collect())
}

/// Extract bits from a byte array, MSB first.
fn extract_bits(data: &[u8], start_bit: usize, num_bits: usize) -> Result<u32, String> {
    if num_bits > 32 || num_bits == 0 {
        return Err(format!("Invalid number of bits: {}", num_bits));
    }

    let mut result = 0u32;

    for i in 0..num_bits {
        let absolute_bit = start_bit + i;
        let byte_idx = absolute_bit / 8;
        let bit_idx = 7 - (absolute_bit % 8);

        if byte_idx >= data.len() {
            return Err("Not enough data to extract bits".to_string());
        }

        let bit = (data[byte_idx] >> bit_idx) & 1;
        result = (result << 1) | (bit as u32);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bits() {
        let data = vec![0b10110101];

        assert_eq!(extract_bits(&data, 0, 2).unwrap(), 0b10);
        assert_eq!(extract_bits(&data, 2, 2).unwrap(), 0b11);
        assert_eq!(extract_bits(&data, 0, 8).unwrap(), 0b10110101);
    }

    #[test]
    fn test_extract_bits_past_end() {
        let data = vec![0xFF];
        assert!(extract_bits(&data, 4, 8).is_err());
    }

    #[test]
    fn test_simple_unpacking() {
        let packed = vec![100, 200];
        let values = unpack_simple(&packed, 2, 8, 0.0, 0, 0, None).unwrap();

        assert_eq!(values, vec![Some(100.0), Some(200.0)]);
    }

    #[test]
    fn test_simple_unpacking_with_scales() {
        // R = 10, E = -1, D = 1: (10 + 4 * 0.5) / 10 = 1.2
        let packed = vec![4];
        let values = unpack_simple(&packed, 1, 8, 10.0, -1, 1, None).unwrap();

        assert!((values[0].unwrap() - 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_constant_field() {
        let values = unpack_simple(&[], 4, 0, 1.5, 0, 0, None).unwrap();
        assert_eq!(values, vec![Some(1.5); 4]);
    }

    #[test]
    fn test_bitmap_masks_points_without_consuming_values() {
        // Points 0 and 2 present, 1 and 3 masked
        let bitmap = [0b1010_0000];
        let packed = vec![7, 9];
        let values = unpack_simple(&packed, 4, 8, 0.0, 0, 0, Some(&bitmap)).unwrap();

        assert_eq!(values, vec![Some(7.0), None, Some(9.0), None]);
    }

    #[test]
    fn test_count_set_bits() {
        assert_eq!(count_set_bits(&[0b1111_1111, 0b1010_0000], 10), 9);
        assert_eq!(count_set_bits(&[0b1010_0000], 3), 2);
        assert_eq!(count_set_bits(&[0b1111_1111], 8), 8);
    }

    #[test]
    fn test_short_bitmap_is_an_error() {
        let bitmap = [0xFF];
        let result = unpack_simple(&[0; 16], 16, 8, 0.0, 0, 0, Some(&bitmap));

        assert!(matches!(result, Err(Grib2Error::UnpackingError(_))));
    }

    #[test]
    fn test_oversized_grid_is_rejected_before_allocating() {
        let result = unpack_simple(&[0; 4], 3_600_000_000, 16, 0.0, 0, 0, None);

        assert!(matches!(result, Err(Grib2Error::UnpackingError(_))));
    }

    #[test]
    fn test_truncated_data_is_an_error() {
        let packed = vec![1];
        let result = unpack_simple(&packed, 3, 8, 0.0, 0, 0, None);

        assert!(matches!(result, Err(Grib2Error::UnpackingError(_))));
    }
}
