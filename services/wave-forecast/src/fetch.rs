//! Grid file retrieval from the NOMADS GRIB filter.
//!
//! One request per forecast hour. The filter cuts the requested variables
//! and subregion out of the full grid file server-side, so responses are a
//! few kilobytes. Failures are reported, never retried.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::config::{ForecastConfig, SourceConfig};
use crate::cycle::ModelCycle;
use crate::error::FetchError;
use crate::point::BoundingBox;

/// Source of grid files, one per (cycle, forecast hour).
#[async_trait]
pub trait GridFetcher: Send + Sync {
    /// Retrieve the grid file for `forecast_hour` of `cycle`.
    async fn fetch(&self, cycle: &ModelCycle, forecast_hour: u32) -> Result<Bytes, FetchError>;
}

/// Fetches subsetted GFS-Wave files from the NOMADS filter CGI.
pub struct NomadsFetcher {
    client: Client,
    source: SourceConfig,
    bbox: BoundingBox,
    timeout_secs: u64,
}

impl NomadsFetcher {
    pub fn new(config: &ForecastConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(config.fetch.max_concurrent)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            source: config.source.clone(),
            bbox: config.bounding_box(),
            timeout_secs: config.fetch.timeout_secs,
        })
    }

    /// Query parameters for one filter request.
    pub fn query(&self, cycle: &ModelCycle, forecast_hour: u32) -> Vec<(String, String)> {
        let mut params = vec![
            ("dir".to_string(), expand_template(&self.source.dir_template, cycle, forecast_hour)),
            ("file".to_string(), expand_template(&self.source.file_pattern, cycle, forecast_hour)),
        ];

        for variable in &self.source.variables {
            params.push((format!("var_{}", variable), "on".to_string()));
        }

        params.push(("subregion".to_string(), String::new()));
        params.push(("toplat".to_string(), self.bbox.toplat.to_string()));
        params.push(("bottomlat".to_string(), self.bbox.bottomlat.to_string()));
        params.push(("leftlon".to_string(), self.bbox.leftlon.to_string()));
        params.push(("rightlon".to_string(), self.bbox.rightlon.to_string()));

        params
    }

    async fn request(&self, cycle: &ModelCycle, forecast_hour: u32) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(&self.source.endpoint)
            .query(&self.query(cycle, forecast_hour))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout_secs)
        } else {
            FetchError::from(err)
        }
    }
}

#[async_trait]
impl GridFetcher for NomadsFetcher {
    #[instrument(skip(self, cycle), fields(cycle = %cycle))]
    async fn fetch(&self, cycle: &ModelCycle, forecast_hour: u32) -> Result<Bytes, FetchError> {
        match self.request(cycle, forecast_hour).await {
            Ok(body) => {
                debug!(bytes = body.len(), "Fetched grid file");
                Ok(body)
            }
            Err(e) => {
                warn!(forecast_hour, error = %e, "Failed to download f{:03}", forecast_hour);
                Err(e)
            }
        }
    }
}

/// Expand `{date}`, `{cycle:02}` and `{forecast:03}` placeholders.
pub fn expand_template(template: &str, cycle: &ModelCycle, forecast_hour: u32) -> String {
    template
        .replace("{date}", &cycle.date_string())
        .replace("{cycle:02}", &format!("{:02}", cycle.hour()))
        .replace("{forecast:03}", &format!("{:03}", forecast_hour))
}
