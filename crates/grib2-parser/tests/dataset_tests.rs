//! End-to-end decoding tests over synthetic GRIB2 files.

use std::sync::Arc;

use bytes::Bytes;
use grib2_parser::{Grib2Error, Grib2Reader, Grib2Tables, GribDataset};
use test_utils::fixtures::{point, sample, wave_params};
use test_utils::{
    assert_approx_eq, concat_messages, create_grid_with_nans, create_test_grid, wave_field,
    wave_file, write_temp_file, Grib2Builder,
};

fn wave_tables() -> Arc<Grib2Tables> {
    Arc::new(Grib2Tables::wave())
}

/// Byte offset of section 3 in a single message.
fn grid_section_offset(message: &[u8]) -> usize {
    let mut offset = 16;
    loop {
        let length = u32::from_be_bytes(message[offset..offset + 4].try_into().unwrap()) as usize;
        if message[offset + 4] == 3 {
            return offset;
        }
        offset += length;
    }
}

/// Overwrite Ni, Nj and, when given, the declared number of data points.
fn patch_grid_size(message: &mut [u8], ni: u32, nj: u32, num_data_points: Option<u32>) {
    let s3 = grid_section_offset(message);
    message[s3 + 30..s3 + 34].copy_from_slice(&ni.to_be_bytes());
    message[s3 + 34..s3 + 38].copy_from_slice(&nj.to_be_bytes());
    if let Some(n) = num_data_points {
        message[s3 + 6..s3 + 10].copy_from_slice(&n.to_be_bytes());
    }
}

#[test]
fn test_reader_walks_all_messages() {
    let data = Bytes::from(wave_file(6));
    let mut reader = Grib2Reader::new(data, wave_tables());

    let mut names = Vec::new();
    while let Some(message) = reader.next_message().unwrap() {
        assert_eq!(message.identification.center, 7);
        assert_eq!(message.product_definition.forecast_hour, 6);
        assert_eq!(message.product_definition.level_description, "surface");
        assert_eq!(message.grid_dims(), (5, 5));
        names.push(message.parameter().to_string());
    }

    assert_eq!(names, vec!["HTSGW", "PERPW", "DIRPW"]);
}

#[test]
fn test_reference_time_is_decoded() {
    let data = Grib2Builder::new_gfs_wave()
        .with_reference_time(2025, 1, 15, 18)
        .build();
    let mut reader = Grib2Reader::new(Bytes::from(data), wave_tables());
    let message = reader.next_message().unwrap().unwrap();

    assert_eq!(
        message.identification.reference_time.to_rfc3339(),
        "2025-01-15T18:00:00+00:00"
    );
}

#[test]
fn test_nearest_point_values() {
    let dataset = GribDataset::from_bytes(Bytes::from(wave_file(0)), wave_tables()).unwrap();
    let selection = dataset.select_nearest(point::TARGET_LAT, point::TARGET_LON);

    assert_approx_eq!(selection.latitude(), point::NEAREST_LAT, 1e-6);
    assert_approx_eq!(selection.longitude(), point::NEAREST_LON, 1e-6);
    assert_eq!(selection.value("HTSGW"), Some(sample::HEIGHT_M as f64));
    assert_eq!(selection.value("PERPW"), Some(sample::PERIOD_S as f64));
    assert_eq!(selection.value("DIRPW"), Some(sample::DIRECTION_DEG as f64));
}

#[test]
fn test_signed_longitude_selects_same_point() {
    let dataset = GribDataset::from_bytes(Bytes::from(wave_file(0)), wave_tables()).unwrap();

    let a = dataset.select_nearest(point::TARGET_LAT, point::TARGET_LON);
    let b = dataset.select_nearest(point::TARGET_LAT, point::TARGET_LON_SIGNED);

    assert_eq!(a.value("HTSGW"), b.value("HTSGW"));
    assert_approx_eq!(a.longitude(), b.longitude(), 1e-9);
}

#[test]
fn test_missing_variable_is_none() {
    let data = concat_messages(&[
        wave_field(wave_params::HTSGW, sample::HEIGHT_M, 0),
        wave_field(wave_params::PERPW, sample::PERIOD_S, 0),
    ]);
    let dataset = GribDataset::from_bytes(Bytes::from(data), wave_tables()).unwrap();

    assert!(dataset.contains("HTSGW"));
    assert!(!dataset.contains("DIRPW"));
    let selection = dataset.select_nearest(point::TARGET_LAT, point::TARGET_LON);
    assert_eq!(selection.value("DIRPW"), None);
}

#[test]
fn test_masked_point_is_none() {
    let mut values = create_grid_with_nans(point::GRID_NI, point::GRID_NJ, &[(2, 2)]);
    values[0] = 3.5;
    let data = Grib2Builder::new_gfs_wave().with_data(values).build();

    let dataset = GribDataset::from_bytes(Bytes::from(data), wave_tables()).unwrap();
    let variable = dataset.variable("HTSGW").unwrap();
    assert_eq!(variable.values[0], 3.5);
    assert_eq!(variable.values[1], 0.0);
    assert!(variable.values[point::TARGET_INDEX].is_nan());

    let selection = dataset.select_nearest(point::TARGET_LAT, point::TARGET_LON);
    assert_eq!(selection.value("HTSGW"), None);
}

#[test]
fn test_repeated_field_keeps_first() {
    let data = concat_messages(&[
        wave_field(wave_params::HTSGW, 2.5, 0),
        wave_field(wave_params::HTSGW, 4.5, 0),
    ]);
    let dataset = GribDataset::from_bytes(Bytes::from(data), wave_tables()).unwrap();

    assert_eq!(dataset.variable_names().count(), 1);
    let selection = dataset.select_nearest(point::TARGET_LAT, point::TARGET_LON);
    assert_eq!(selection.value("HTSGW"), Some(2.5));
}

#[test]
fn test_fields_on_different_grids_are_rejected() {
    let data = concat_messages(&[
        wave_field(wave_params::HTSGW, 1.25, 0),
        Grib2Builder::new_gfs_wave()
            .with_parameter(0, wave_params::PERPW)
            .with_grid(3, 3)
            .build(),
    ]);
    let result = GribDataset::from_bytes(Bytes::from(data), wave_tables());

    assert!(matches!(result, Err(Grib2Error::InvalidFormat(_))));
}

#[test]
fn test_error_page_is_not_grib() {
    let body = b"<html><body>data file is not present</body></html>".to_vec();
    let result = GribDataset::from_bytes(Bytes::from(body), wave_tables());

    assert!(matches!(result, Err(Grib2Error::InvalidFormat(_))));
}

#[test]
fn test_truncated_file_is_an_error() {
    let mut data = wave_file(0);
    data.truncate(data.len() - 10);
    let result = GribDataset::from_bytes(Bytes::from(data), wave_tables());

    assert!(result.is_err());
}

#[test]
fn test_trailing_bytes_are_ignored() {
    let mut data = wave_file(0);
    data.extend_from_slice(b"\n\n");
    let dataset = GribDataset::from_bytes(Bytes::from(data), wave_tables()).unwrap();

    assert_eq!(dataset.variable_names().count(), 3);
}

#[test]
fn test_open_reads_file_from_disk() {
    let file = write_temp_file(&wave_file(12));
    let dataset = GribDataset::open(file.path()).unwrap();

    assert_eq!(dataset.grid().len(), point::GRID_NI * point::GRID_NJ);
    let selection = dataset.select_nearest(point::TARGET_LAT, point::TARGET_LON);
    assert_eq!(selection.value("HTSGW"), Some(sample::HEIGHT_M as f64));
}

#[test]
fn test_open_missing_file_is_io_error() {
    let result = GribDataset::open(std::path::Path::new("/nonexistent/gfswave.grib2"));
    assert!(matches!(result, Err(Grib2Error::Io(_))));
}

#[test]
fn test_unknown_parameter_gets_generic_name() {
    let data = Grib2Builder::new_gfs_wave().with_parameter(0, 99).build();
    let dataset = GribDataset::from_bytes(Bytes::from(data), wave_tables()).unwrap();

    assert!(dataset.contains("P10_0_99"));
}

#[test]
fn test_south_to_north_grid() {
    let data = Grib2Builder::new_gfs_wave()
        .with_extent(40.8, 288.2, 41.2, 288.6)
        .with_scanning_mode(0x40)
        .with_data(create_test_grid(point::GRID_NI, point::GRID_NJ))
        .build();
    let dataset = GribDataset::from_bytes(Bytes::from(data), wave_tables()).unwrap();

    // Row 2 from the south, column 2 from the west: col * 1000 + row
    let selection = dataset.select_nearest(point::TARGET_LAT, point::TARGET_LON);
    assert_eq!(selection.value("HTSGW"), Some(2002.0));

    let selection = dataset.select_nearest(40.8, 288.6);
    assert_eq!(selection.value("HTSGW"), Some(4000.0));
}

#[test]
fn test_grid_encoded_with_signed_longitudes() {
    let data = Grib2Builder::new_gfs_wave()
        .with_extent(41.2, -71.8, 40.8, -71.4)
        .with_data(create_test_grid(point::GRID_NI, point::GRID_NJ))
        .build();
    let dataset = GribDataset::from_bytes(Bytes::from(data), wave_tables()).unwrap();

    let selection = dataset.select_nearest(point::TARGET_LAT, point::TARGET_LON);
    assert_approx_eq!(selection.longitude(), point::NEAREST_LON, 1e-6);
    assert_eq!(selection.value("HTSGW"), Some(2002.0));
}

#[test]
fn test_wind_field_level_description() {
    let data = Grib2Builder::new_gfs_wave()
        .with_discipline(0)
        .with_parameter(2, 1)
        .with_level(103, 10)
        .with_constant_value(6.5)
        .build();
    let mut reader = Grib2Reader::new(Bytes::from(data), wave_tables());
    let message = reader.next_message().unwrap().unwrap();

    assert_eq!(message.parameter(), "WIND");
    assert_eq!(message.product_definition.level_description, "10 m above ground");
    assert_eq!(message.data_representation.bits_per_value, 0);
    assert!(message.unpack_data().unwrap().iter().all(|&v| v == 6.5));
    assert!(reader.next_message().unwrap().is_none());
}

#[test]
fn test_grid_size_disagreeing_with_point_count_is_rejected() {
    let mut data = wave_field(wave_params::HTSGW, sample::HEIGHT_M, 0);
    patch_grid_size(&mut data, 200_000, 200_000, None);
    let result = GribDataset::from_bytes(Bytes::from(data), wave_tables());

    assert!(matches!(result, Err(Grib2Error::InvalidSection { section: 3, .. })));
}

#[test]
fn test_grid_larger_than_packed_data_is_rejected() {
    let mut data = wave_field(wave_params::HTSGW, sample::HEIGHT_M, 0);
    patch_grid_size(&mut data, 1_000, 1_000, Some(1_000_000));
    let result = GribDataset::from_bytes(Bytes::from(data), wave_tables());

    assert!(matches!(result, Err(Grib2Error::UnpackingError(_))));
}

#[test]
fn test_oversized_constant_field_is_rejected() {
    let mut data = Grib2Builder::new_gfs_wave().with_constant_value(0.5).build();
    patch_grid_size(&mut data, 60_000, 60_000, Some(3_600_000_000));
    let result = GribDataset::from_bytes(Bytes::from(data), wave_tables());

    assert!(matches!(result, Err(Grib2Error::InvalidSection { section: 3, .. })));
}
