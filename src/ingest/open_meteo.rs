/// Open-Meteo forecast API client
///
/// Retrieves hourly temperature, cloud cover, sea-level pressure,
/// precipitation and wind for the seven-day scoring horizon at a site.
///
/// API Documentation: https://open-meteo.com/en/docs

use std::time::Duration;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::model::{HourlyObservation, ProviderError, Site};

const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";

const HOURLY_FIELDS: &str = "temperature_2m,cloudcover,pressure_msl,precipitation,windspeed_10m";

/// Timestamp layout of the `hourly.time` array (local time, no offset).
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

// ============================================================================
// Provider contract
// ============================================================================

/// Hourly weather for one site, in the site's local time.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySeries {
    pub observations: Vec<HourlyObservation>,
    /// Offset of the local time the series is expressed in.
    pub utc_offset: FixedOffset,
}

/// Source of hourly weather for a date range (both ends inclusive).
pub trait WeatherProvider: Sync {
    fn fetch_hourly(
        &self,
        site: &Site,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HourlySeries, ProviderError>;
}

// ============================================================================
// Open-Meteo API Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    utc_offset_seconds: i32,
    hourly: Option<HourlyBlock>,
    daily: Option<serde_json::Value>,
    /// Present instead of data when the API rejects the request.
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    cloudcover: Vec<Option<f64>>,
    pressure_msl: Vec<Option<f64>>,
    precipitation: Vec<Option<f64>>,
    windspeed_10m: Vec<Option<f64>>,
}

// ============================================================================
// API Client
// ============================================================================

/// Blocking Open-Meteo client.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: reqwest::blocking::Client,
}

impl OpenMeteoClient {
    pub fn new(timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    /// Query parameters for one request.
    pub fn query(site: &Site, start: NaiveDate, end: NaiveDate) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", site.coordinate.latitude.to_string()),
            ("longitude", site.coordinate.longitude.to_string()),
            ("hourly", HOURLY_FIELDS.to_string()),
            ("daily", "sunrise,sunset".to_string()),
            ("timezone", site.timezone.clone()),
            ("elevation", site.elevation.to_string()),
            ("start_date", start.to_string()),
            ("end_date", end.to_string()),
        ]
    }
}

impl WeatherProvider for OpenMeteoClient {
    fn fetch_hourly(
        &self,
        site: &Site,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HourlySeries, ProviderError> {
        let response = self
            .client
            .get(OPEN_METEO_URL)
            .query(&Self::query(site, start, end))
            .header("Accept", "application/json")
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(http_failure(status.as_u16(), &body));
        }

        parse_forecast_response(&body)
    }
}

// ============================================================================
// Response Parsing
// ============================================================================

/// Error for a non-2xx response. Open-Meteo explains 400s in the body;
/// the reason is kept when there is one.
pub fn http_failure(status: u16, body: &str) -> ProviderError {
    let reason = serde_json::from_str::<ForecastResponse>(body)
        .ok()
        .and_then(|parsed| parsed.reason);
    ProviderError::Http { status, reason }
}

/// Parses an Open-Meteo forecast body into an hourly series.
///
/// Missing `hourly` or `daily` blocks are a provider failure. Hours where any
/// variable is null are dropped. Arrays of different lengths are rejected.
pub fn parse_forecast_response(body: &str) -> Result<HourlySeries, ProviderError> {
    let response: ForecastResponse = serde_json::from_str(body)?;

    let hourly = response.hourly.ok_or(ProviderError::MissingField("hourly"))?;
    if response.daily.is_none() {
        return Err(ProviderError::MissingField("daily"));
    }

    let len = hourly.time.len();
    let lengths = [
        hourly.temperature_2m.len(),
        hourly.cloudcover.len(),
        hourly.pressure_msl.len(),
        hourly.precipitation.len(),
        hourly.windspeed_10m.len(),
    ];
    if lengths.iter().any(|&l| l != len) {
        return Err(ProviderError::Parse(format!(
            "hourly arrays are misaligned: time has {} entries, variables have {:?}",
            len, lengths
        )));
    }

    let utc_offset = FixedOffset::east_opt(response.utc_offset_seconds).ok_or_else(|| {
        ProviderError::Parse(format!("invalid utc_offset_seconds {}", response.utc_offset_seconds))
    })?;

    let mut observations = Vec::with_capacity(len);
    for i in 0..len {
        let timestamp = NaiveDateTime::parse_from_str(&hourly.time[i], TIME_FORMAT)
            .map_err(|e| ProviderError::Parse(format!("bad hourly time '{}': {}", hourly.time[i], e)))?;

        let (Some(temp), Some(cloud), Some(pressure), Some(precip), Some(wind)) = (
            hourly.temperature_2m[i],
            hourly.cloudcover[i],
            hourly.pressure_msl[i],
            hourly.precipitation[i],
            hourly.windspeed_10m[i],
        ) else {
            continue;
        };

        observations.push(HourlyObservation {
            timestamp,
            temp,
            cloud,
            pressure,
            precip,
            wind,
            pressure_trend: None,
        });
    }

    Ok(HourlySeries {
        observations,
        utc_offset,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coordinate;

    const SAMPLE: &str = r#"{
        "latitude": 40.56, "longitude": -89.99,
        "utc_offset_seconds": -18000, "timezone": "America/Chicago",
        "hourly": {
            "time": ["2024-05-01T00:00", "2024-05-01T01:00", "2024-05-01T02:00"],
            "temperature_2m": [14.2, 13.8, null],
            "cloudcover": [80, 75, 70],
            "pressure_msl": [1011.4, 1010.9, 1010.1],
            "precipitation": [0.0, 0.3, 0.0],
            "windspeed_10m": [7.9, 6.1, 5.4]
        },
        "daily": {"time": ["2024-05-01"], "sunrise": ["2024-05-01T05:58"], "sunset": ["2024-05-01T19:51"]}
    }"#;

    fn site() -> Site {
        Site {
            name: "Peoria Lake".to_string(),
            coordinate: Coordinate::new(40.56, -89.99),
            timezone: "America/Chicago".to_string(),
            elevation: 137.0,
            body_type: "lake".to_string(),
        }
    }

    #[test]
    fn test_parse_sample_response() {
        let series = parse_forecast_response(SAMPLE).expect("sample should parse");
        assert_eq!(series.utc_offset.local_minus_utc(), -18000);
        assert_eq!(series.observations.len(), 2, "hour with null temperature is dropped");

        let second = &series.observations[1];
        assert_eq!(second.timestamp.format(TIME_FORMAT).to_string(), "2024-05-01T01:00");
        assert_eq!(second.temp, 13.8);
        assert_eq!(second.cloud, 75.0);
        assert_eq!(second.pressure, 1010.9);
        assert_eq!(second.precip, 0.3);
        assert_eq!(second.wind, 6.1);
        assert!(second.pressure_trend.is_none(), "trends are derived by the engine");
    }

    #[test]
    fn test_missing_hourly_block_is_provider_failure() {
        let body = r#"{"utc_offset_seconds": 0, "daily": {}}"#;
        assert_eq!(
            parse_forecast_response(body),
            Err(ProviderError::MissingField("hourly"))
        );
    }

    #[test]
    fn test_missing_daily_block_is_provider_failure() {
        let body = r#"{"utc_offset_seconds": 0, "hourly": {"time": [], "temperature_2m": [],
            "cloudcover": [], "pressure_msl": [], "precipitation": [], "windspeed_10m": []}}"#;
        assert_eq!(
            parse_forecast_response(body),
            Err(ProviderError::MissingField("daily"))
        );
    }

    #[test]
    fn test_api_error_payload_is_missing_hourly() {
        let body = r#"{"error": true, "reason": "Latitude must be in range of -90 to 90°."}"#;
        assert_eq!(
            parse_forecast_response(body),
            Err(ProviderError::MissingField("hourly"))
        );
    }

    #[test]
    fn test_rejected_request_keeps_status_and_reason() {
        let body = r#"{"error": true, "reason": "Latitude must be in range of -90 to 90°."}"#;
        assert_eq!(
            http_failure(400, body),
            ProviderError::Http {
                status: 400,
                reason: Some("Latitude must be in range of -90 to 90°.".to_string()),
            }
        );
    }

    #[test]
    fn test_server_error_without_json_body_has_no_reason() {
        assert_eq!(
            http_failure(502, "<html>502 Bad Gateway</html>"),
            ProviderError::Http { status: 502, reason: None }
        );
    }

    #[test]
    fn test_misaligned_arrays_are_rejected() {
        let body = r#"{"hourly": {"time": ["2024-05-01T00:00"], "temperature_2m": [],
            "cloudcover": [1], "pressure_msl": [1], "precipitation": [1], "windspeed_10m": [1]},
            "daily": {}}"#;
        assert!(matches!(parse_forecast_response(body), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn test_non_json_body_is_parse_error() {
        assert!(matches!(
            parse_forecast_response("<html>502 Bad Gateway</html>"),
            Err(ProviderError::Parse(_))
        ));
    }

    #[test]
    fn test_query_covers_the_requested_range() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();
        let query = OpenMeteoClient::query(&site(), start, end);
        let get = |k: &str| query.iter().find(|(key, _)| *key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("start_date"), Some("2024-05-01"));
        assert_eq!(get("end_date"), Some("2024-05-07"));
        assert_eq!(get("timezone"), Some("America/Chicago"));
        assert_eq!(get("hourly"), Some(HOURLY_FIELDS));
    }

    #[test]
    #[ignore] // Don't run in CI - depends on external API
    fn open_meteo_live_returns_seven_days() {
        let client = OpenMeteoClient::new(DEFAULT_TIMEOUT_SECS).unwrap();
        let start = chrono::Local::now().date_naive();
        let end = start + chrono::Duration::days(6);
        let series = client
            .fetch_hourly(&site(), start, end)
            .expect("live Open-Meteo request should succeed");
        assert!(series.observations.len() >= 24 * 7 - 2);
    }
}
