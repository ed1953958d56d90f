/// Development mode: replay a saved forecast instead of calling the API
///
/// When the network is unavailable, or to get repeatable scores while
/// working on the engine, point the service at a saved Open-Meteo response.
/// The capture is shifted in time so its first day lands on the requested
/// start date, so an old capture still reads as "today".

use std::fs;
use std::path::Path;

use chrono::{Duration, NaiveDate};

use crate::ingest::open_meteo::{HourlySeries, WeatherProvider, parse_forecast_response};
use crate::model::{ProviderError, Site};

/// Weather provider backed by a saved Open-Meteo response.
#[derive(Debug, Clone)]
pub struct FixtureWeather {
    series: HourlySeries,
}

impl FixtureWeather {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let body = fs::read_to_string(path)
            .map_err(|e| ProviderError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&body)
    }

    pub fn from_json(body: &str) -> Result<Self, ProviderError> {
        Ok(Self {
            series: parse_forecast_response(body)?,
        })
    }

    /// First calendar date in the capture.
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.series.observations.first().map(|obs| obs.timestamp.date())
    }
}

impl WeatherProvider for FixtureWeather {
    /// Returns the capture shifted to `start`, trimmed to `start..=end`.
    /// The site is ignored: every location sees the same weather.
    fn fetch_hourly(
        &self,
        _site: &Site,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HourlySeries, ProviderError> {
        let Some(first) = self.first_date() else {
            return Err(ProviderError::Io("No data in fixture".to_string()));
        };
        let shift = Duration::days((start - first).num_days());

        let observations = self
            .series
            .observations
            .iter()
            .cloned()
            .map(|mut obs| {
                obs.timestamp += shift;
                obs
            })
            .filter(|obs| (start..=end).contains(&obs.timestamp.date()))
            .collect();

        Ok(HourlySeries {
            observations,
            utc_offset: self.series.utc_offset,
        })
    }
}
