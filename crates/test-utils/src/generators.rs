//! Value layouts for synthetic wave fields.

/// Row-major grid where every cell encodes its position as
/// `col * 1000 + row`, so a decoded value tells which cell it came from.
///
/// ```
/// let grid = test_utils::create_test_grid(5, 5);
/// assert_eq!(grid[12], 2002.0); // row 2, col 2
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates a grid filled with `background` except for the middle cell
/// (row `height / 2`, column `width / 2`), which holds `center`.
pub fn create_field_with_center(width: usize, height: usize, background: f32, center: f32) -> Vec<f32> {
    let mut data = vec![background; width * height];
    if width > 0 && height > 0 {
        data[(height / 2) * width + width / 2] = center;
    }
    data
}

/// Creates a grid with NaN values at specified positions.
///
/// Useful for testing missing data handling. NaN cells are written as
/// masked points by the GRIB2 builder.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
/// * `nan_positions` - List of (col, row) positions that should be NaN
pub fn create_grid_with_nans(
    width: usize,
    height: usize,
    nan_positions: &[(usize, usize)],
) -> Vec<f32> {
    let mut data = vec![0.0f32; width * height];
    for &(col, row) in nan_positions {
        if col < width && row < height {
            data[row * width + col] = f32::NAN;
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(10, 5);
        assert_eq!(grid.len(), 50);
        assert_eq!(grid[0], 0.0); // col=0, row=0
        assert_eq!(grid[1], 1000.0); // col=1, row=0
        assert_eq!(grid[10], 1.0); // col=0, row=1
        assert_eq!(grid[11], 1001.0); // col=1, row=1
    }

    #[test]
    fn test_create_field_with_center() {
        let grid = create_field_with_center(5, 5, 0.25, 1.25);
        assert_eq!(grid[12], 1.25);
        assert_eq!(grid.iter().filter(|&&v| v == 0.25).count(), 24);
    }

    #[test]
    fn test_create_grid_with_nans() {
        let grid = create_grid_with_nans(10, 10, &[(5, 5), (0, 0)]);
        assert!(grid[0].is_nan()); // (0, 0)
        assert!(grid[55].is_nan()); // (5, 5) = row 5 * 10 + col 5
        assert!(!grid[1].is_nan()); // (1, 0) should be 0.0
    }
}
