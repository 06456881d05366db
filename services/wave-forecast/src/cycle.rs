//! Model cycle selection.
//!
//! GFS-Wave runs four times a day. A run only becomes downloadable some time
//! after its nominal start, so the selector walks back from "now" until it
//! finds a cycle old enough to have been published.

use std::fmt;

use chrono::{DateTime, Duration, DurationRound, SecondsFormat, Timelike, Utc};

/// Hours between consecutive model runs.
pub const CYCLE_INTERVAL_HOURS: i64 = 6;

/// Default publication lag: 3.5 hours.
pub const DEFAULT_AVAILABILITY_LAG_MINUTES: i64 = 210;

/// Number of cycles tried by [`select_cycle`], one per run of a day.
const CANDIDATES: i64 = 4;

/// A model run, identified by its UTC start time.
///
/// The hour is always one of 00, 06, 12 or 18 and every smaller unit is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelCycle(DateTime<Utc>);

impl ModelCycle {
    /// The cycle that contains `time`, i.e. `time` truncated down to the
    /// nearest 6-hour boundary.
    pub fn containing(time: DateTime<Utc>) -> Self {
        let hour = time.hour() - time.hour() % CYCLE_INTERVAL_HOURS as u32;
        let start = time
            .duration_trunc(Duration::hours(1))
            .ok()
            .and_then(|t| t.with_hour(hour))
            .unwrap_or(time);
        Self(start)
    }

    /// Accept `time` only if it already sits on a cycle boundary.
    pub fn from_start(time: DateTime<Utc>) -> Option<Self> {
        let cycle = Self::containing(time);
        (cycle.0 == time).then_some(cycle)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.0
    }

    /// Cycle hour (0, 6, 12 or 18).
    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    /// Run date as `YYYYMMDD`, the form used in NOMADS directory names.
    pub fn date_string(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// Time at which a forecast `offset` hours into this run is valid.
    pub fn valid_time(&self, offset: u32) -> DateTime<Utc> {
        self.0 + Duration::hours(offset as i64)
    }

    /// The run before this one.
    pub fn previous(&self) -> Self {
        Self(self.0 - Duration::hours(CYCLE_INTERVAL_HOURS))
    }

    /// Age of the run at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.0
    }
}

impl fmt::Display for ModelCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Secs, false))
    }
}

/// Most recent cycle that is at least `lag` old at `now`.
///
/// Candidates are taken at `now`, `now - 6h`, `now - 12h` and `now - 18h`,
/// each truncated to its cycle. Returns `None` when none of them qualifies,
/// which only happens for lags longer than a day.
pub fn select_cycle(now: DateTime<Utc>, lag: Duration) -> Option<ModelCycle> {
    (0..CANDIDATES)
        .map(|step| ModelCycle::containing(now - Duration::hours(step * CYCLE_INTERVAL_HOURS)))
        .find(|cycle| cycle.age(now) >= lag)
}
