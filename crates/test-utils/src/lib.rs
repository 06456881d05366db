//! Test support shared by the workspace crates.
//!
//! [`Grib2Builder`] writes small, valid GRIB2 messages so decoder and
//! pipeline tests never depend on downloaded model files. [`fixtures`]
//! pins the forecast point, the 5x5 subset grid around it and the wave
//! values placed at that point.

pub mod fixtures;
pub mod generators;
pub mod grib2;

pub use fixtures::*;
pub use generators::*;
pub use grib2::{concat_messages, Grib2Builder};

/// Assert that two numbers differ by at most `tolerance`.
///
/// Operands are widened to `f64`, so `f32` grid values can be compared
/// against `f64` coordinates directly.
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let actual = $actual as f64;
        let expected = $expected as f64;
        let tolerance = $tolerance as f64;
        assert!(
            (actual - expected).abs() <= tolerance,
            "assertion failed: {} is not within {} of {}",
            actual,
            tolerance,
            expected
        );
    }};
}
