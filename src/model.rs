/// Core data types for the fishing forecast service.
///
/// This module defines the shared domain model imported by all other modules:
/// the hourly weather rows and daily astronomical events the scorer consumes,
/// the per-day scores it produces, and the error types of the providers and
/// the configuration loader. It contains no scoring logic and no I/O.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Horizon
// ---------------------------------------------------------------------------

/// Number of calendar days covered by one forecast, today included.
pub const HORIZON_DAYS: u32 = 7;

/// Minimum hourly observations a date needs before it can be scored.
/// The best window spans three consecutive hours.
pub const WINDOW_HOURS: usize = 3;

// ---------------------------------------------------------------------------
// Location types
// ---------------------------------------------------------------------------

/// WGS84 position of a body of water.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// True when both components are finite and inside their WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Everything the providers and the engine need to know about one
/// configured body of water.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub name: String,
    pub coordinate: Coordinate,
    /// IANA zone name forwarded to the weather API, or `"auto"`.
    pub timezone: String,
    /// Metres above sea level.
    pub elevation: f64,
    /// Raw body type from configuration; resolved to weights at scoring time.
    pub body_type: String,
}

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// One hour of forecast weather at a site, in local time.
///
/// Units: temperature °C, cloud cover %, mean-sea-level pressure hPa,
/// precipitation mm, wind speed km/h.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyObservation {
    pub timestamp: NaiveDateTime,
    pub temp: f64,
    pub cloud: f64,
    pub pressure: f64,
    pub precip: f64,
    pub wind: f64,
    /// Change from the preceding hour's pressure. `None` for the first hour
    /// of a series or after a gap. Filled in by
    /// `analysis::groupings::derive_pressure_trends`.
    pub pressure_trend: Option<f64>,
}

/// Sun and moon events for one local calendar date.
///
/// Any event may be absent on a given date (the moon does not rise every
/// day, the sun never sets in polar summer); absence is not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyAstroEvents {
    pub date: NaiveDate,
    /// Fraction of the synodic cycle: 0.0 new, 0.5 full, approaching 1.0 new.
    #[serde(default)]
    pub moon_phase: Option<f64>,
    #[serde(default, with = "hh_mm")]
    pub sunrise: Option<NaiveTime>,
    #[serde(default, with = "hh_mm")]
    pub sunset: Option<NaiveTime>,
    #[serde(default, with = "hh_mm")]
    pub moonrise: Option<NaiveTime>,
    #[serde(default, with = "hh_mm")]
    pub moonset: Option<NaiveTime>,
    #[serde(default, with = "hh_mm")]
    pub moon_transit: Option<NaiveTime>,
    #[serde(default, with = "hh_mm")]
    pub moon_underfoot: Option<NaiveTime>,
}

impl DailyAstroEvents {
    /// A date with no known events. Every astronomical factor scores neutral.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }
}

/// Serde adapter for optional local times written as `"HH:MM"`.
pub mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => serializer.serialize_str(&t.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse))
    }

    /// Parses `"HH:MM"`; anything else is treated as a missing event.
    pub fn parse(raw: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(raw.trim(), FORMAT).ok()
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// The best three-hour span of a day, as hours of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl fmt::Display for BestWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00 – {:02}:00", self.start_hour, self.end_hour)
    }
}

impl Serialize for BestWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Fishing quality for one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayScore {
    #[serde(skip)]
    pub date: NaiveDate,
    /// Display score, 0 (poor) to 10 (excellent).
    pub score: u8,
    pub best_window: BestWindow,
}

/// Day scores ordered by date. Dates without enough data are absent.
pub type ForecastResult = BTreeMap<NaiveDate, DayScore>;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by the weather and astronomy providers.
///
/// None of these reach the engine: the pipeline turns any of them into an
/// empty forecast for the cycle and logs it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// Non-2xx HTTP response from the weather API, with the API's stated
    /// reason when the body carried one.
    #[error("HTTP error: {status}{}", with_reason(.reason))]
    Http { status: u16, reason: Option<String> },
    /// The request never produced a response (DNS, TLS, timeout).
    #[error("Request failed: {0}")]
    Request(String),
    /// The response body could not be deserialized or was inconsistent.
    #[error("Parse error: {0}")]
    Parse(String),
    /// A required top-level field was absent from the response.
    #[error("Missing field in response: {0}")]
    MissingField(&'static str),
    /// A fixture or cached file could not be read.
    #[error("I/O error: {0}")]
    Io(String),
    /// The almanac could not compute events for the requested input.
    #[error("Ephemeris error: {0}")]
    Ephemeris(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ProviderError::Http {
                status: status.as_u16(),
                reason: None,
            },
            None if err.is_decode() => ProviderError::Parse(err.to_string()),
            None => ProviderError::Request(err.to_string()),
        }
    }
}

fn with_reason(reason: &Option<String>) -> String {
    reason.as_deref().map(|r| format!(" ({})", r)).unwrap_or_default()
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(err.to_string())
    }
}

/// Errors raised while loading or validating the service configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no [[location]] entries configured")]
    NoLocations,
    #[error("location '{0}' is configured more than once")]
    DuplicateLocation(String),
    #[error("location '{location}' has an invalid coordinate")]
    InvalidCoordinate { location: String },
    #[error("location '{location}' lists no fish species")]
    EmptySpecies { location: String },
    #[error("location '{location}' lists unknown species '{species}'")]
    UnknownSpecies { location: String, species: String },
    #[error("poll hour {0} is outside 0-23")]
    InvalidPollHour(u32),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_window_label_is_zero_padded_with_en_dash() {
        let window = BestWindow { start_hour: 2, end_hour: 4 };
        assert_eq!(window.to_string(), "02:00 – 04:00");
    }

    #[test]
    fn test_day_score_serializes_window_as_label() {
        let day = DayScore {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            score: 7,
            best_window: BestWindow { start_hour: 18, end_hour: 20 },
        };
        let json = serde_json::to_value(&day).unwrap();
        assert_eq!(json["score"], 7);
        assert_eq!(json["best_window"], "18:00 – 20:00");
        assert!(json.get("date").is_none(), "date is the map key, not a field");
    }

    #[test]
    fn test_astro_events_read_hh_mm_and_tolerate_missing_events() {
        let json = r#"{"date":"2024-05-01","sunrise":"05:48","sunset":"20:01","moonrise":null}"#;
        let events: DailyAstroEvents = serde_json::from_str(json).unwrap();
        assert_eq!(events.sunrise, NaiveTime::from_hms_opt(5, 48, 0));
        assert_eq!(events.sunset, NaiveTime::from_hms_opt(20, 1, 0));
        assert!(events.moonrise.is_none());
        assert!(events.moon_phase.is_none());
        assert!(events.moon_underfoot.is_none());
    }

    #[test]
    fn test_malformed_event_time_is_missing_not_an_error() {
        assert!(hh_mm::parse("25:99").is_none());
        assert!(hh_mm::parse("").is_none());
        assert_eq!(hh_mm::parse(" 06:30 "), NaiveTime::from_hms_opt(6, 30, 0));
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(40.56, -89.99).is_valid());
        assert!(Coordinate::new(-90.0, 180.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.5).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_http_error_message_includes_reason_when_known() {
        let bare = ProviderError::Http { status: 503, reason: None };
        assert_eq!(bare.to_string(), "HTTP error: 503");

        let explained = ProviderError::Http {
            status: 400,
            reason: Some("Latitude must be in range of -90 to 90°.".into()),
        };
        assert_eq!(
            explained.to_string(),
            "HTTP error: 400 (Latitude must be in range of -90 to 90°.)"
        );
    }
}
