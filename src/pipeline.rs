//! Input assembly for one scoring cycle.
//!
//! Fetches weather and computes astronomy concurrently, joins them, and
//! hands both to the engine. Both inputs are required: if either provider
//! fails the cycle yields empty results, the failure is logged, and the
//! sensors keep what they last showed.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::analysis::forecast::compute_forecast;
use crate::config::{LocationConfig, ServiceConfig};
use crate::ingest::{AstroProvider, WeatherProvider};
use crate::logging::{self, DataSource};
use crate::model::{DailyAstroEvents, ForecastResult, HORIZON_DAYS, HourlyObservation, ProviderError, Site};
use crate::sensor::{FishScoreSensor, write_state_file};

/// Everything the engine needs for one site.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastInputs {
    pub hourly: Vec<HourlyObservation>,
    pub astro: Vec<DailyAstroEvents>,
}

/// A provider failure tagged with the provider that raised it.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleFailure {
    pub source: DataSource,
    pub error: ProviderError,
}

/// Runs both providers for `today .. today + 6` and joins the results.
///
/// The weather fetch blocks on the network while the almanac runs on the
/// CPU, so the two proceed in parallel. Astronomy is localised with the
/// UTC offset the weather response reports.
pub fn fetch_inputs(
    weather: &dyn WeatherProvider,
    astro: &dyn AstroProvider,
    site: &Site,
    today: NaiveDate,
) -> Result<ForecastInputs, CycleFailure> {
    let end = today + Duration::days(i64::from(HORIZON_DAYS) - 1);

    let (series, timeline) = rayon::join(
        || weather.fetch_hourly(site, today, end),
        || astro.timeline(site.coordinate, today, HORIZON_DAYS),
    );

    let series = series.map_err(|error| CycleFailure {
        source: DataSource::OpenMeteo,
        error,
    })?;
    let timeline = timeline.map_err(|error| CycleFailure {
        source: DataSource::Almanac,
        error,
    })?;

    Ok(ForecastInputs {
        astro: timeline.daily(today, HORIZON_DAYS, series.utc_offset),
        hourly: series.observations,
    })
}

/// Scores one species at one site. Provider failures yield an empty result.
pub fn run_cycle(
    weather: &dyn WeatherProvider,
    astro: &dyn AstroProvider,
    site: &Site,
    species: &str,
    today: NaiveDate,
) -> ForecastResult {
    match fetch_inputs(weather, astro, site, today) {
        Ok(inputs) => compute_forecast(species, site, &inputs.hourly, &inputs.astro),
        Err(failure) => {
            log_failure(site, &failure);
            ForecastResult::new()
        }
    }
}

/// Scores every species configured at a location from a single fetch.
///
/// On provider failure every species maps to an empty result and the
/// failure is returned alongside for the caller's cycle summary.
pub fn run_location(
    weather: &dyn WeatherProvider,
    astro: &dyn AstroProvider,
    location: &LocationConfig,
    today: NaiveDate,
) -> (BTreeMap<String, ForecastResult>, Option<CycleFailure>) {
    let site = location.site();

    match fetch_inputs(weather, astro, &site, today) {
        Ok(inputs) => {
            let results = location
                .fish
                .iter()
                .map(|species| {
                    let forecast = compute_forecast(species, &site, &inputs.hourly, &inputs.astro);
                    logging::debug(
                        DataSource::Engine,
                        Some(&site.name),
                        &format!("{}: {} days scored", species, forecast.len()),
                    );
                    (species.clone(), forecast)
                })
                .collect();
            (results, None)
        }
        Err(failure) => {
            log_failure(&site, &failure);
            let empty = location
                .fish
                .iter()
                .map(|species| (species.clone(), ForecastResult::new()))
                .collect();
            (empty, Some(failure))
        }
    }
}

/// Outcome of one pass over every configured location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub total: usize,
    pub scored: usize,
    pub failed: usize,
    pub state_written: bool,
}

/// Runs one scoring cycle: every location, every sensor, then the state
/// file. Nothing here returns an error; failures are logged and the
/// affected sensors keep their previous values.
pub fn run_scoring_cycle(
    config: &ServiceConfig,
    weather: &dyn WeatherProvider,
    astro: &dyn AstroProvider,
    sensors: &mut [FishScoreSensor],
    now: NaiveDateTime,
) -> CycleSummary {
    let today = now.date();
    let mut failed = 0;

    for location in &config.locations {
        let (results, failure) = run_location(weather, astro, location, today);
        if failure.is_some() {
            failed += 1;
        }

        for (species, forecast) in results {
            if let Some(sensor) = sensors
                .iter_mut()
                .find(|s| s.location == location.name && s.species == species)
            {
                sensor.apply(forecast, today);
                logging::debug(
                    DataSource::Engine,
                    Some(&sensor.unique_id()),
                    &format!("state {:?}", sensor.state),
                );
            }
        }
    }

    let total = config.locations.len();
    logging::log_cycle_summary(total, total - failed, failed);

    let state_written = match &config.service.state_file {
        Some(path) => {
            let stamp = now.format("%Y-%m-%dT%H:%M:%S").to_string();
            match write_state_file(path, sensors, Some(&stamp)) {
                Ok(()) => true,
                Err(e) => {
                    logging::error(
                        DataSource::System,
                        None,
                        &format!("Could not write state file {}: {}", path, e),
                    );
                    false
                }
            }
        }
        None => false,
    };

    CycleSummary {
        total,
        scored: total - failed,
        failed,
        state_written,
    }
}

fn log_failure(site: &Site, failure: &CycleFailure) {
    let operation = match failure.source {
        DataSource::Almanac => "astronomy computation",
        _ => "weather fetch",
    };
    logging::log_provider_failure(failure.source, &site.name, operation, &failure.error);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
