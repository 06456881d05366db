//! Forecast horizon: which forecast hours to extract for a cycle.
//!
//! GFS-Wave publishes hourly output for the first five days and 3-hourly
//! output out to ten days.

/// Last forecast hour of the hourly segment.
pub const HOURLY_UNTIL: u32 = 120;

/// Last forecast hour published.
pub const MAX_FORECAST_HOUR: u32 = 240;

/// Step of the extended segment.
pub const EXTENDED_STEP: usize = 3;

/// Number of offsets in the horizon.
pub const FORECAST_OFFSET_COUNT: usize = 161;

/// Forecast hours in ascending order: 0..=120 hourly, then 123..=240 every
/// three hours.
pub fn forecast_offsets() -> impl Iterator<Item = u32> {
    (0..=HOURLY_UNTIL).chain(
        (HOURLY_UNTIL + EXTENDED_STEP as u32..=MAX_FORECAST_HOUR).step_by(EXTENDED_STEP),
    )
}
