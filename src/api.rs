//! Forecast client for the Open-Meteo forecast and marine APIs
//!
//! Each report kind maps to one or two HTTP GET requests. Responses carry a
//! `time` array plus one array per requested variable; they are normalised
//! into a [`ForecastSeries`] or rejected as a whole.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveDateTime};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ForecastConfig;
use crate::error::FetchError;
use crate::models::{Forecast, ForecastSeries, Granularity, Location, ReportKind, Sample, Variable};

const HOURLY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";
const DAILY_TIME_FORMAT: &str = "%Y-%m-%d";

/// Anything that can produce the forecast for a report
pub trait ForecastSource {
    fn fetch(&self, location: &Location, kind: ReportKind) -> Result<Forecast, FetchError>;
}

/// Which Open-Meteo service a request goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Forecast,
    Marine,
}

impl Endpoint {
    fn path(&self) -> &'static str {
        match self {
            Endpoint::Forecast => "forecast",
            Endpoint::Marine => "marine",
        }
    }
}

/// One request: endpoint, block and the variables it asks for
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRequest {
    pub endpoint: Endpoint,
    pub granularity: Granularity,
    pub variables: Vec<Variable>,
    pub days: u32,
}

/// Open-Meteo column name of a variable in an hourly or daily block
#[must_use]
pub fn column_name(variable: Variable, granularity: Granularity) -> Option<&'static str> {
    match granularity {
        Granularity::Hourly => Some(match variable {
            Variable::WaveHeight => "wave_height",
            Variable::WavePeriod => "wave_period",
            Variable::SwellHeight => "swell_wave_height",
            Variable::SwellDirection => "swell_wave_direction",
            Variable::TideHeight => "sea_level_height_msl",
            Variable::WindSpeed => "wind_speed_10m",
            Variable::WindDirection => "wind_direction_10m",
            Variable::WindGusts => "wind_gusts_10m",
            Variable::CloudCover => "cloud_cover",
            Variable::Temperature => "temperature_2m",
            Variable::Precipitation => "precipitation",
            Variable::WeatherCode => "weather_code",
        }),
        Granularity::Daily => match variable {
            Variable::Temperature => Some("temperature_2m_max"),
            Variable::WindSpeed => Some("wind_speed_10m_max"),
            Variable::WindGusts => Some("wind_gusts_10m_max"),
            Variable::WindDirection => Some("wind_direction_10m_dominant"),
            Variable::Precipitation => Some("precipitation_sum"),
            Variable::WeatherCode => Some("weather_code"),
            _ => None,
        },
    }
}

/// The requests needed for a report kind.
///
/// The first request yields the primary series; for surf the second is
/// merged into it, for weather it is the daily series.
#[must_use]
pub fn plan_requests(kind: ReportKind, config: &ForecastConfig) -> Vec<SeriesRequest> {
    let days = config.forecast_days;
    match kind {
        ReportKind::Surf => vec![
            SeriesRequest {
                endpoint: Endpoint::Marine,
                granularity: Granularity::Hourly,
                variables: vec![
                    Variable::WaveHeight,
                    Variable::WavePeriod,
                    Variable::SwellHeight,
                    Variable::SwellDirection,
                    Variable::TideHeight,
                ],
                days,
            },
            SeriesRequest {
                endpoint: Endpoint::Forecast,
                granularity: Granularity::Hourly,
                variables: vec![Variable::WindSpeed, Variable::WindDirection],
                days,
            },
        ],
        ReportKind::Sky => vec![SeriesRequest {
            endpoint: Endpoint::Forecast,
            granularity: Granularity::Hourly,
            variables: vec![Variable::CloudCover],
            days,
        }],
        ReportKind::Weather => vec![
            SeriesRequest {
                endpoint: Endpoint::Forecast,
                granularity: Granularity::Hourly,
                variables: vec![
                    Variable::Temperature,
                    Variable::Precipitation,
                    Variable::WindSpeed,
                    Variable::WindDirection,
                    Variable::WindGusts,
                    Variable::WeatherCode,
                ],
                days: config.weather_hourly_days,
            },
            SeriesRequest {
                endpoint: Endpoint::Forecast,
                granularity: Granularity::Daily,
                variables: vec![
                    Variable::Temperature,
                    Variable::WindSpeed,
                    Variable::WindGusts,
                    Variable::WindDirection,
                    Variable::Precipitation,
                    Variable::WeatherCode,
                ],
                days,
            },
        ],
    }
}

/// Build the request URL for one series
pub fn build_url(
    base_url: &str,
    location: &Location,
    request: &SeriesRequest,
) -> Result<String, FetchError> {
    let columns = request
        .variables
        .iter()
        .map(|v| {
            column_name(*v, request.granularity).ok_or_else(|| {
                FetchError::malformed(format!("{v:?} has no {:?} column", request.granularity))
            })
        })
        .collect::<Result<Vec<_>, _>>()?
        .join(",");
    let block = match request.granularity {
        Granularity::Hourly => "hourly",
        Granularity::Daily => "daily",
    };

    Ok(format!(
        "{}/{}?latitude={}&longitude={}&{block}={columns}&forecast_days={}&timezone=auto",
        base_url.trim_end_matches('/'),
        request.endpoint.path(),
        location.latitude,
        location.longitude,
        request.days
    ))
}

/// Raw Open-Meteo response body
#[derive(Debug, Deserialize)]
pub struct OpenMeteoResponse {
    #[serde(default)]
    pub utc_offset_seconds: i32,
    pub hourly: Option<RawBlock>,
    pub daily: Option<RawBlock>,
}

/// One `hourly` or `daily` block: parallel arrays keyed by column name
#[derive(Debug, Deserialize)]
pub struct RawBlock {
    pub time: Vec<String>,
    #[serde(flatten)]
    pub columns: HashMap<String, Vec<Option<f64>>>,
}

/// Parse a response body into a series holding `variables`.
///
/// A missing block or column, a column whose length differs from `time`,
/// an unparseable timestamp or out-of-order timestamps reject the whole
/// response.
pub fn parse_series(
    body: &str,
    granularity: Granularity,
    variables: &[Variable],
) -> Result<ForecastSeries, FetchError> {
    let response: OpenMeteoResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::malformed(format!("invalid JSON body: {e}")))?;

    let (block, block_name) = match granularity {
        Granularity::Hourly => (response.hourly, "hourly"),
        Granularity::Daily => (response.daily, "daily"),
    };
    let block = block.ok_or_else(|| FetchError::malformed(format!("missing '{block_name}' block")))?;

    let times = block
        .time
        .iter()
        .map(|raw| parse_time(raw, granularity))
        .collect::<Result<Vec<_>, _>>()?;

    let mut samples: Vec<Sample> = times.iter().map(|t| Sample::new(*t)).collect();

    for variable in variables {
        let name = column_name(*variable, granularity).ok_or_else(|| {
            FetchError::malformed(format!("{variable:?} has no {block_name} column"))
        })?;
        let column = block
            .columns
            .get(name)
            .ok_or_else(|| FetchError::malformed(format!("missing column '{name}'")))?;
        if column.len() != samples.len() {
            return Err(FetchError::malformed(format!(
                "column '{name}' has {} values for {} timestamps",
                column.len(),
                samples.len()
            )));
        }
        for (sample, value) in samples.iter_mut().zip(column) {
            sample.set(*variable, *value);
        }
    }

    ForecastSeries::new(granularity, response.utc_offset_seconds, samples)
}

fn parse_time(raw: &str, granularity: Granularity) -> Result<NaiveDateTime, FetchError> {
    let parsed = match granularity {
        Granularity::Hourly => NaiveDateTime::parse_from_str(raw, HOURLY_TIME_FORMAT),
        Granularity::Daily => {
            NaiveDate::parse_from_str(raw, DAILY_TIME_FORMAT).map(|d| d.and_time(chrono::NaiveTime::MIN))
        }
    };
    parsed.map_err(|e| FetchError::malformed(format!("bad timestamp '{raw}': {e}")))
}

/// Left join of two series on identical timestamps.
///
/// Every primary sample is kept and gains `variables` from the `secondary`
/// sample at the same time. Hours the secondary does not cover keep those
/// variables absent. Two non-empty series that share no timestamp at all are
/// rejected as malformed.
pub fn merge_on_time(
    primary: ForecastSeries,
    secondary: &ForecastSeries,
    variables: &[Variable],
) -> Result<ForecastSeries, FetchError> {
    let granularity = primary.granularity();
    let offset = primary.utc_offset_seconds();
    let others = secondary.samples();
    let mut cursor = 0;
    let mut matched = 0;
    let mut merged = Vec::with_capacity(primary.len());

    for sample in primary.samples() {
        while cursor < others.len() && others[cursor].time < sample.time {
            cursor += 1;
        }
        let mut joined = sample.clone();
        let other = others.get(cursor).filter(|o| o.time == sample.time);
        if other.is_some() {
            matched += 1;
        }
        for variable in variables {
            joined.set(*variable, other.and_then(|o| o.get(*variable)));
        }
        merged.push(joined);
    }

    if matched == 0 && !merged.is_empty() && !others.is_empty() {
        return Err(FetchError::malformed(format!(
            "secondary series shares no timestamp with the {} primary samples",
            merged.len()
        )));
    }
    if matched < merged.len() {
        warn!(
            "{} of {} samples have no matching secondary values",
            merged.len() - matched,
            merged.len()
        );
    }

    ForecastSeries::new(granularity, offset, merged)
}

/// Blocking HTTP client for Open-Meteo
pub struct OpenMeteoClient {
    client: Client,
    config: ForecastConfig,
}

impl OpenMeteoClient {
    /// Create a new client with the configured timeout
    pub fn new(config: ForecastConfig) -> Result<Self, FetchError> {
        let timeout = Duration::from_secs(config.timeout_seconds.into());

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sentinel-report/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn base_url(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Forecast => &self.config.base_url,
            Endpoint::Marine => &self.config.marine_base_url,
        }
    }

    fn fetch_series(
        &self,
        location: &Location,
        request: &SeriesRequest,
    ) -> Result<ForecastSeries, FetchError> {
        let url = build_url(self.base_url(request.endpoint), location, request)?;
        let body = self.get_text(&url, request.endpoint)?;
        let series = parse_series(&body, request.granularity, &request.variables)?;
        debug!(
            "Parsed {} {:?} samples from {} endpoint",
            series.len(),
            request.granularity,
            request.endpoint.path()
        );
        Ok(series)
    }

    /// Make a single GET request; no retries at this layer
    #[instrument(skip_all, fields(endpoint = endpoint.path()))]
    fn get_text(&self, url: &str, endpoint: Endpoint) -> Result<String, FetchError> {
        debug!("Open-Meteo request URL: {}", url);
        let start_time = Instant::now();

        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                warn!("Request to {} timed out", endpoint.path());
                FetchError::Timeout {
                    endpoint: endpoint.path().to_string(),
                    seconds: self.config.timeout_seconds.into(),
                }
            } else {
                warn!("Network error: {}", e);
                FetchError::network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("Open-Meteo returned HTTP {}", status);
            return Err(FetchError::Status {
                status: status.as_u16(),
                endpoint: endpoint.path().to_string(),
            });
        }

        let body = response.text().map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    endpoint: endpoint.path().to_string(),
                    seconds: self.config.timeout_seconds.into(),
                }
            } else {
                FetchError::network(e.to_string())
            }
        })?;

        let duration = start_time.elapsed();
        debug!("HTTP response received in {:.3}s", duration.as_secs_f64());
        if duration.as_secs() > 5 {
            warn!("Slow API response detected: {:.3}s", duration.as_secs_f64());
        }

        Ok(body)
    }
}

impl ForecastSource for OpenMeteoClient {
    #[instrument(skip_all, fields(location = %location.name, kind = %kind))]
    fn fetch(&self, location: &Location, kind: ReportKind) -> Result<Forecast, FetchError> {
        location.validate()?;
        info!(
            "Fetching {} forecast for {} ({})",
            kind,
            location.name,
            location.format_coordinates()
        );

        let requests = plan_requests(kind, &self.config);
        let mut requests = requests.iter();
        let Some(primary_request) = requests.next() else {
            return Err(FetchError::malformed("no series requested"));
        };
        let primary = self.fetch_series(location, primary_request)?;

        let forecast = match (kind, requests.next()) {
            (ReportKind::Surf, Some(wind_request)) => {
                let wind = self.fetch_series(location, wind_request)?;
                let merged = merge_on_time(primary, &wind, &wind_request.variables)?;
                Forecast::new(location.clone(), kind, merged)
            }
            (ReportKind::Weather, Some(daily_request)) => {
                let daily = self.fetch_series(location, daily_request)?;
                Forecast::new(location.clone(), kind, primary).with_daily(daily)
            }
            _ => Forecast::new(location.clone(), kind, primary),
        };

        info!(
            "Retrieved {} hourly samples for {}",
            forecast.hourly.len(),
            location.name
        );
        Ok(forecast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARINE_BODY: &str = r#"{
        "latitude": -38.375,
        "longitude": 144.25,
        "utc_offset_seconds": 39600,
        "timezone": "Australia/Melbourne",
        "hourly_units": {"time": "iso8601", "wave_height": "m"},
        "hourly": {
            "time": ["2025-01-07T00:00", "2025-01-07T01:00", "2025-01-07T02:00"],
            "wave_height": [1.2, null, 1.6],
            "wave_period": [9.5, 9.7, 10.1],
            "swell_wave_height": [1.0, 1.1, 1.3],
            "swell_wave_direction": [225, 230, 228],
            "sea_level_height_msl": [0.4, 0.6, 0.9]
        }
    }"#;

    fn marine_variables() -> Vec<Variable> {
        plan_requests(ReportKind::Surf, &ForecastConfig::default())[0]
            .variables
            .clone()
    }

    #[test]
    fn test_build_url() {
        let location = Location::new(-38.371, 144.282, "Bells Beach");
        let requests = plan_requests(ReportKind::Sky, &ForecastConfig::default());
        let url = build_url("https://api.open-meteo.com/v1/", &location, &requests[0]).unwrap();
        assert_eq!(
            url,
            "https://api.open-meteo.com/v1/forecast?latitude=-38.371&longitude=144.282&hourly=cloud_cover&forecast_days=7&timezone=auto"
        );
    }

    #[test]
    fn test_build_daily_url() {
        let location = Location::new(-37.81, 144.96, "Melbourne");
        let requests = plan_requests(ReportKind::Weather, &ForecastConfig::default());
        let hourly = build_url("https://api.open-meteo.com/v1", &location, &requests[0]).unwrap();
        assert!(hourly.contains("forecast_days=3"));
        assert!(hourly.contains("hourly=temperature_2m,precipitation,"));
        let daily = build_url("https://api.open-meteo.com/v1", &location, &requests[1]).unwrap();
        assert!(daily.contains("daily=temperature_2m_max,wind_speed_10m_max,wind_gusts_10m_max,wind_direction_10m_dominant,precipitation_sum,weather_code"));
        assert!(daily.contains("forecast_days=7"));
    }

    #[test]
    fn test_parse_hourly_series() {
        let series = parse_series(MARINE_BODY, Granularity::Hourly, &marine_variables()).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.utc_offset_seconds(), 39600);
        let samples = series.samples();
        assert_eq!(samples[0].get(Variable::WaveHeight), Some(1.2));
        assert_eq!(samples[1].get(Variable::WaveHeight), None);
        assert_eq!(samples[2].get(Variable::TideHeight), Some(0.9));
        assert_eq!(samples[2].get(Variable::SwellDirection), Some(228.0));
    }

    #[test]
    fn test_parse_daily_series() {
        let body = r#"{
            "utc_offset_seconds": 0,
            "daily": {
                "time": ["2025-01-07", "2025-01-08"],
                "temperature_2m_max": [31.2, 24.0],
                "weather_code": [95, 3]
            }
        }"#;
        let series = parse_series(
            body,
            Granularity::Daily,
            &[Variable::Temperature, Variable::WeatherCode],
        )
        .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.samples()[0].get(Variable::WeatherCode), Some(95.0));
        assert_eq!(
            series.samples()[1].time.date(),
            NaiveDate::from_ymd_opt(2025, 1, 8).unwrap()
        );
    }

    #[test]
    fn test_missing_column_is_malformed() {
        let result = parse_series(MARINE_BODY, Granularity::Hourly, &[Variable::CloudCover]);
        assert!(matches!(result, Err(FetchError::Malformed { .. })));
    }

    #[test]
    fn test_missing_block_is_malformed() {
        let result = parse_series(MARINE_BODY, Granularity::Daily, &[Variable::Temperature]);
        assert!(matches!(result, Err(FetchError::Malformed { .. })));
    }

    #[test]
    fn test_length_mismatch_is_malformed() {
        let body = r#"{"hourly": {"time": ["2025-01-07T00:00", "2025-01-07T01:00"], "cloud_cover": [10]}}"#;
        let result = parse_series(body, Granularity::Hourly, &[Variable::CloudCover]);
        assert!(matches!(result, Err(FetchError::Malformed { .. })));
    }

    #[test]
    fn test_bad_json_is_malformed() {
        let result = parse_series("<html>502</html>", Granularity::Hourly, &[]);
        assert!(matches!(result, Err(FetchError::Malformed { .. })));
    }

    fn wind_series(times: &[&str]) -> ForecastSeries {
        let speeds: Vec<String> = (0..times.len()).map(|i| format!("{}", 12 + i)).collect();
        let body = format!(
            r#"{{"utc_offset_seconds": 39600, "hourly": {{"time": [{}], "wind_speed_10m": [{}]}}}}"#,
            times
                .iter()
                .map(|t| format!("\"{t}\""))
                .collect::<Vec<_>>()
                .join(","),
            speeds.join(",")
        );
        parse_series(&body, Granularity::Hourly, &[Variable::WindSpeed]).unwrap()
    }

    #[test]
    fn test_merge_keeps_every_primary_hour() {
        let marine = parse_series(MARINE_BODY, Granularity::Hourly, &marine_variables()).unwrap();
        let wind_body = r#"{"utc_offset_seconds": 39600, "hourly": {
            "time": ["2025-01-07T01:00", "2025-01-07T02:00", "2025-01-07T03:00"],
            "wind_speed_10m": [12.0, 15.5, 18.0],
            "wind_direction_10m": [300, 310, 320]
        }}"#;
        let wind = parse_series(
            wind_body,
            Granularity::Hourly,
            &[Variable::WindSpeed, Variable::WindDirection],
        )
        .unwrap();

        let merged =
            merge_on_time(marine, &wind, &[Variable::WindSpeed, Variable::WindDirection]).unwrap();
        assert_eq!(merged.len(), 3);
        let samples = merged.samples();
        assert_eq!(samples[0].get(Variable::WaveHeight), Some(1.2));
        assert_eq!(samples[0].get(Variable::WindSpeed), None);
        assert_eq!(samples[0].get(Variable::WindDirection), None);
        assert_eq!(samples[1].get(Variable::WindDirection), Some(300.0));
        assert_eq!(samples[2].get(Variable::SwellHeight), Some(1.3));
        assert_eq!(samples[2].get(Variable::WindSpeed), Some(15.5));
    }

    #[test]
    fn test_merge_with_disjoint_times_is_malformed() {
        let marine = parse_series(MARINE_BODY, Granularity::Hourly, &marine_variables()).unwrap();
        let wind = wind_series(&["2025-01-07T00:30", "2025-01-07T01:30", "2025-01-07T02:30"]);

        let result = merge_on_time(marine, &wind, &[Variable::WindSpeed]);
        assert!(matches!(result, Err(FetchError::Malformed { .. })));
    }

    #[test]
    fn test_merge_with_empty_secondary_keeps_primary() {
        let marine = parse_series(MARINE_BODY, Granularity::Hourly, &marine_variables()).unwrap();
        let wind = wind_series(&[]);

        let merged = merge_on_time(marine, &wind, &[Variable::WindSpeed]).unwrap();
        assert_eq!(merged.len(), 3);
        assert!(merged.samples().iter().all(|s| s.get(Variable::WindSpeed).is_none()));
    }

    #[test]
    fn test_invalid_coordinates_rejected_before_request() {
        let config = ForecastConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..ForecastConfig::default()
        };
        let client = OpenMeteoClient::new(config).unwrap();
        let result = client.fetch(&Location::new(95.0, 0.0, "Nowhere"), ReportKind::Sky);
        assert!(matches!(result, Err(FetchError::InvalidCoordinates { .. })));
    }
}
