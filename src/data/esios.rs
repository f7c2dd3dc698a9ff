//! ESIOS (Red Eléctrica) indicator API integration.

use chrono::{DateTime, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::domain::{DateRange, Indicator, IndicatorSample};
use crate::error::{PipelineError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.esios.ree.es/indicators";
const ACCEPT: &str = "application/json; application/vnd.esios-api-v1+json";

/// Anything that can hand the pipeline a short-horizon indicator series.
///
/// The pipeline only depends on this trait, so tests and offline runs can
/// plug in fixtures instead of the HTTP client.
pub trait IndicatorSource {
    /// Samples of `indicator` between the first and last day of `range`.
    ///
    /// `geo_name`, when given, keeps only values published for that
    /// geographic scope.
    fn fetch(&self, indicator: Indicator, range: &DateRange, geo_name: Option<&str>) -> Result<Vec<IndicatorSample>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EsiosConfig {
    pub base_url: String,
    pub api_token: String,
    /// Zone used for the request window and for the returned timestamps.
    pub zone: Tz,
}

impl EsiosConfig {
    /// Read `ESIOS_API_TOKEN` (and optionally `ESIOS_BASE_URL`) from the
    /// environment, after loading a `.env` file if present.
    pub fn from_env(zone: Tz) -> Result<Self> {
        dotenvy::dotenv().ok();
        let api_token = std::env::var("ESIOS_API_TOKEN")
            .map_err(|_| PipelineError::config("missing ESIOS_API_TOKEN in environment (.env)"))?;
        let base_url = std::env::var("ESIOS_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            base_url,
            api_token,
            zone,
        })
    }
}

pub struct EsiosClient {
    client: Client,
    config: EsiosConfig,
}

impl EsiosClient {
    pub fn new(config: EsiosConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn window(&self, range: &DateRange) -> Result<(String, String)> {
        let start = local_instant(self.config.zone, range.start, NaiveTime::MIN)?;
        let end_time = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        let end = local_instant(self.config.zone, range.end, end_time)?;
        Ok((start.to_rfc3339(), end.to_rfc3339()))
    }
}

impl IndicatorSource for EsiosClient {
    fn fetch(&self, indicator: Indicator, range: &DateRange, geo_name: Option<&str>) -> Result<Vec<IndicatorSample>> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), indicator.esios_id());
        let (start, end) = self.window(range)?;
        let fail = |message: String| PipelineError::UpstreamFetch {
            indicator: indicator.to_string(),
            message,
        };

        tracing::info!(%indicator, %start, %end, "fetching ESIOS indicator");

        let resp = self
            .client
            .get(&url)
            .header("x-api-key", &self.config.api_token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .query(&[("start_date", start.as_str()), ("end_date", end.as_str())])
            .send()
            .map_err(|e| fail(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(fail(format!("request failed with status {}", resp.status())));
        }

        let body: IndicatorResponse = resp
            .json()
            .map_err(|e| fail(format!("failed to parse response: {e}")))?;

        let samples = parse_values(indicator, body, geo_name, self.config.zone)?;
        tracing::debug!(%indicator, samples = samples.len(), "ESIOS indicator received");
        Ok(samples)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct IndicatorResponse {
    indicator: IndicatorBody,
}

#[derive(Debug, Deserialize)]
struct IndicatorBody {
    #[serde(default)]
    short_name: Option<String>,
    values: Vec<IndicatorValue>,
}

#[derive(Debug, Deserialize)]
struct IndicatorValue {
    value: Option<f64>,
    datetime: String,
    #[serde(default)]
    geo_name: Option<String>,
}

/// Turn an API body into samples, applying the geo filter.
///
/// Values without a number are dropped (the API publishes `null` for
/// not-yet-available hours); an unparsable timestamp is a hard error.
pub(crate) fn parse_values(
    indicator: Indicator,
    body: IndicatorResponse,
    geo_name: Option<&str>,
    zone: Tz,
) -> Result<Vec<IndicatorSample>> {
    let source_name = body
        .indicator
        .short_name
        .unwrap_or_else(|| indicator.column_name().to_string());

    let mut out = Vec::with_capacity(body.indicator.values.len());
    for (idx, v) in body.indicator.values.into_iter().enumerate() {
        if let Some(wanted) = geo_name {
            if v.geo_name.as_deref() != Some(wanted) {
                continue;
            }
        }
        let Some(value) = v.value else { continue };

        let timestamp = DateTime::parse_from_rfc3339(&v.datetime)
            .map_err(|e| PipelineError::MalformedRecord {
                source_name: source_name.clone(),
                line: idx + 1,
                message: format!("invalid datetime '{}': {e}", v.datetime),
            })?
            .with_timezone(&zone);

        out.push(IndicatorSample {
            timestamp,
            value,
            indicator,
        });
    }
    Ok(out)
}

fn local_instant(zone: Tz, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Tz>> {
    use chrono::TimeZone;
    zone.from_local_datetime(&date.and_time(time))
        .earliest()
        .ok_or_else(|| PipelineError::config(format!("{date} {time} does not exist in {zone}")))
}
