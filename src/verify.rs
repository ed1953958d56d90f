//! Data Source Verification Module
//!
//! Checks every configured location against the live providers: is the
//! weather API reachable for it, how much of the seven-day horizon comes
//! back, and does the almanac produce events there. Run it after editing
//! the configuration, before leaving the daemon to poll.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{LocationConfig, ServiceConfig};
use crate::ingest::{AstroProvider, WeatherProvider};
use crate::model::HORIZON_DAYS;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub results: Vec<LocationVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationVerification {
    pub name: String,
    pub status: VerificationStatus,
    pub weather_reachable: bool,
    pub hours_returned: usize,
    pub days_covered: usize,
    pub astro_days: usize,
    /// Days on which the almanac found both sunrise and sunset.
    pub twilight_days: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

// ============================================================================
// Location Verification
// ============================================================================

/// Exercises both providers for one location.
///
/// Success needs every horizon day covered by weather and astronomy. Some
/// data short of that is a partial success; no weather or no astronomy is
/// a failure, since the scorer would produce nothing.
pub fn verify_location(
    weather: &dyn WeatherProvider,
    astro: &dyn AstroProvider,
    location: &LocationConfig,
    today: NaiveDate,
) -> LocationVerification {
    let site = location.site();
    let end = today + Duration::days(i64::from(HORIZON_DAYS) - 1);

    let mut result = LocationVerification {
        name: location.name.clone(),
        status: VerificationStatus::Failed,
        weather_reachable: false,
        hours_returned: 0,
        days_covered: 0,
        astro_days: 0,
        twilight_days: 0,
        error_message: None,
    };

    let series = match weather.fetch_hourly(&site, today, end) {
        Ok(series) => series,
        Err(e) => {
            result.error_message = Some(format!("weather: {}", e));
            return result;
        }
    };
    result.weather_reachable = true;
    result.hours_returned = series.observations.len();
    result.days_covered = series
        .observations
        .iter()
        .map(|obs| obs.timestamp.date())
        .collect::<BTreeSet<_>>()
        .len();

    match astro.timeline(site.coordinate, today, HORIZON_DAYS) {
        Ok(timeline) => {
            let days = timeline.daily(today, HORIZON_DAYS, series.utc_offset);
            result.astro_days = days.len();
            result.twilight_days = days
                .iter()
                .filter(|d| d.sunrise.is_some() && d.sunset.is_some())
                .count();
        }
        Err(e) => {
            result.error_message = Some(format!("astronomy: {}", e));
            return result;
        }
    }

    let horizon = HORIZON_DAYS as usize;
    result.status = if result.hours_returned == 0 {
        result.error_message = Some("weather returned no hours".to_string());
        VerificationStatus::Failed
    } else if result.days_covered >= horizon && result.astro_days >= horizon {
        VerificationStatus::Success
    } else {
        VerificationStatus::PartialSuccess
    };

    result
}

// ============================================================================
// Full Verification
// ============================================================================

pub fn run_verification(
    config: &ServiceConfig,
    weather: &dyn WeatherProvider,
    astro: &dyn AstroProvider,
    today: NaiveDate,
) -> VerificationReport {
    let mut report = VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        results: Vec::with_capacity(config.locations.len()),
        summary: VerificationSummary {
            total: config.locations.len(),
            ..VerificationSummary::default()
        },
    };

    for location in &config.locations {
        let result = verify_location(weather, astro, location, today);
        match result.status {
            VerificationStatus::Success | VerificationStatus::PartialSuccess => {
                report.summary.working += 1
            }
            VerificationStatus::Failed => report.summary.failed += 1,
        }
        report.results.push(result);
    }

    report
}

pub fn print_summary(report: &VerificationReport) {
    println!("Verification at {}", report.timestamp);
    for result in &report.results {
        match result.status {
            VerificationStatus::Success => println!(
                "  {:<24} OK ({} hours over {} days, {} astro days)",
                result.name, result.hours_returned, result.days_covered, result.astro_days
            ),
            VerificationStatus::PartialSuccess => println!(
                "  {:<24} PARTIAL ({} of {} days with weather, {} astro days)",
                result.name, result.days_covered, HORIZON_DAYS, result.astro_days
            ),
            VerificationStatus::Failed => println!(
                "  {:<24} FAILED: {}",
                result.name,
                result.error_message.as_deref().unwrap_or("Unknown")
            ),
        }
    }

    let success_rate = if report.summary.total > 0 {
        (report.summary.working as f64 / report.summary.total as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Overall: {}/{} locations working ({:.1}%), {} failed",
        report.summary.working, report.summary.total, success_rate, report.summary.failed
    );
}
