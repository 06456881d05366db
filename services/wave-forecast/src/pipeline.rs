//! Pipeline driver: one full extraction pass for the latest cycle.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::config::ForecastConfig;
use crate::cycle::{select_cycle, ModelCycle};
use crate::error::{ForecastError, OffsetFailure};
use crate::extract::PointExtractor;
use crate::fetch::GridFetcher;
use crate::horizon::forecast_offsets;
use crate::output::{ForecastDocument, ForecastRecord};

/// Fetches and samples every forecast hour of a cycle.
pub struct Pipeline {
    fetcher: Arc<dyn GridFetcher>,
    extractor: PointExtractor,
    availability_lag: Duration,
    max_concurrent: usize,
    probe: bool,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn GridFetcher>, config: &ForecastConfig) -> Self {
        Self {
            fetcher,
            extractor: PointExtractor::new(config.target(), config.fetch.scratch_dir.clone()),
            availability_lag: config.availability_lag(),
            max_concurrent: config.fetch.max_concurrent.max(1),
            probe: config.schedule.probe,
        }
    }

    /// Build the forecast document for the cycle available at `now`.
    ///
    /// Offsets that fail to download or decode are skipped. The run fails
    /// only when no cycle qualifies or no offset produced a record.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<ForecastDocument, ForecastError> {
        let started = Instant::now();

        let cycle = select_cycle(now, self.availability_lag)
            .ok_or(ForecastError::NoCycle { now })?;
        let cycle = if self.probe {
            self.probe_cycle(cycle).await
        } else {
            cycle
        };

        info!(
            cycle = %cycle,
            max_concurrent = self.max_concurrent,
            "Using cycle {}",
            cycle.start().format("%Y-%m-%d %H:%M UTC")
        );

        let offsets: Vec<u32> = forecast_offsets().collect();
        let attempted = offsets.len();

        // buffered() yields in input order, so records come out ascending
        let outcomes: Vec<Result<ForecastRecord, OffsetFailure>> = stream::iter(offsets)
            .map(|forecast_hour| self.process_offset(cycle, forecast_hour))
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut records: Vec<ForecastRecord> = outcomes.into_iter().filter_map(Result::ok).collect();
        records.sort_by_key(|record| record.forecast_hour);

        info!(
            succeeded = records.len(),
            attempted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Extracted {}/{} forecast hours",
            records.len(),
            attempted
        );

        if records.is_empty() {
            return Err(ForecastError::NoData { attempted });
        }

        Ok(ForecastDocument::new(
            Utc::now(),
            &cycle,
            self.extractor.target(),
            records,
        ))
    }

    /// Fetch then extract one forecast hour.
    async fn process_offset(
        &self,
        cycle: ModelCycle,
        forecast_hour: u32,
    ) -> Result<ForecastRecord, OffsetFailure> {
        let valid_time = cycle.valid_time(forecast_hour);

        let outcome = async {
            let data = self.fetcher.fetch(&cycle, forecast_hour).await?;
            let sample = self.extractor.extract(data, forecast_hour).await?;
            Ok::<_, OffsetFailure>(sample.into_record(valid_time, forecast_hour))
        }
        .await;

        let label = valid_time.format("%a %m/%d %H:%M UTC");
        match &outcome {
            Ok(record) => info!(
                forecast_hour,
                height_ft = ?record.height_ft,
                "f{:03} ({}) OK ({}ft)",
                forecast_hour,
                label,
                display_height(record.height_ft)
            ),
            Err(e) => info!(
                forecast_hour,
                reason = %e,
                "f{:03} ({}) SKIP",
                forecast_hour,
                label
            ),
        }

        outcome
    }

    /// Check that forecast hour 0 of `cycle` is published, falling back to
    /// the previous cycle when it is not.
    async fn probe_cycle(&self, cycle: ModelCycle) -> ModelCycle {
        match self.fetcher.fetch(&cycle, 0).await {
            Ok(_) => cycle,
            Err(e) => {
                let previous = cycle.previous();
                warn!(
                    cycle = %cycle,
                    fallback = %previous,
                    error = %e,
                    "Cycle not published yet, using previous cycle"
                );
                previous
            }
        }
    }

    /// Run and write the document to `path`. Nothing is written when the
    /// run fails.
    pub async fn run_to_file(
        &self,
        now: DateTime<Utc>,
        path: &std::path::Path,
    ) -> Result<ForecastDocument, ForecastError> {
        let document = self.run(now).await?;
        document.write(path)?;
        Ok(document)
    }
}

fn display_height(height_ft: Option<f64>) -> String {
    match height_ft {
        Some(ft) => ft.to_string(),
        None => "null".to_string(),
    }
}
