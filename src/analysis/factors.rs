//! Per-hour factor sub-scores.
//!
//! Each function takes plain values and returns a score in [0, 1], so the
//! thresholds of every factor can be tested on their own. Missing inputs map
//! to the factor's neutral value rather than an error.

use chrono::{NaiveTime, Timelike};

/// Score returned by the astronomical factors when their input is unknown,
/// and by the pressure factor when there is no trend.
pub const NEUTRAL: f64 = 0.7;

/// Width of the linear ramp outside a species' temperature band, in °C.
const TEMP_MARGIN: f64 = 10.0;

/// Pressure change per hour that counts as a front, in hPa.
const PRESSURE_FRONT_HPA: f64 = 2.0;

/// Distance in hours from an event that still counts as "around" it.
const EVENT_REACH_HOURS: u32 = 1;

/// 1.0 inside `[low, high]`, ramping linearly to 0.0 over ten degrees on
/// either side.
pub fn temp_score(temp: f64, (low, high): (f64, f64)) -> f64 {
    if temp < low {
        ((temp - (low - TEMP_MARGIN)) / TEMP_MARGIN).max(0.0)
    } else if temp > high {
        ((high + TEMP_MARGIN - temp) / TEMP_MARGIN).max(0.0)
    } else {
        1.0
    }
}

/// Closeness of the observed cloud cover to the species' ideal.
pub fn cloud_score(cloud: f64, ideal_cloud: f64) -> f64 {
    (1.0 - (cloud - ideal_cloud).abs() / 100.0).clamp(0.0, 1.0)
}

/// Falling pressure ahead of a front triggers feeding; a sharp rise after
/// one shuts it down.
pub fn pressure_score(trend: Option<f64>) -> f64 {
    match trend {
        Some(t) if t < -PRESSURE_FRONT_HPA => 1.0,
        Some(t) if t > PRESSURE_FRONT_HPA => 0.4,
        _ => NEUTRAL,
    }
}

/// Wind speed in km/h. A light breeze is ideal; flat calm is slightly worse.
pub fn wind_score(speed: f64) -> f64 {
    if speed < 2.0 {
        0.8
    } else if speed < 6.0 {
        1.0
    } else if speed < 10.0 {
        0.6
    } else {
        0.2
    }
}

/// Hourly precipitation in mm. Light rain helps, heavy rain does not.
pub fn precip_score(amount: f64) -> f64 {
    if amount == 0.0 {
        NEUTRAL
    } else if amount < 1.0 {
        1.0
    } else if amount < 5.0 {
        0.5
    } else {
        0.2
    }
}

/// 1.0 within an hour of sunrise or sunset. Both must be known.
pub fn twilight_score(hour: u32, sunrise: Option<NaiveTime>, sunset: Option<NaiveTime>) -> f64 {
    match (sunrise, sunset) {
        (Some(rise), Some(set)) if near(hour, rise) || near(hour, set) => 1.0,
        _ => NEUTRAL,
    }
}

/// 1.0 when the phase sits within a tenth of a cycle of new moon, on
/// either side of the wrap at 1.0.
pub fn moon_score(phase: Option<f64>) -> f64 {
    match phase {
        Some(p) if p < 0.1 || p > 0.9 => 1.0,
        _ => NEUTRAL,
    }
}

/// Solunar periods: major around transit and underfoot, minor around
/// moonrise and moonset. Each event adds independently; capped at 1.0.
pub fn solunar_score(
    hour: u32,
    transit: Option<NaiveTime>,
    underfoot: Option<NaiveTime>,
    moonrise: Option<NaiveTime>,
    moonset: Option<NaiveTime>,
) -> f64 {
    let hits = |events: [Option<NaiveTime>; 2]| {
        events
            .into_iter()
            .flatten()
            .filter(|&event| near(hour, event))
            .count() as f64
    };

    let boost = 0.5 * hits([transit, underfoot]) + 0.25 * hits([moonrise, moonset]);
    (0.6 + boost).min(1.0)
}

/// Hour-of-day proximity; minutes of the event are ignored.
fn near(hour: u32, event: NaiveTime) -> bool {
    hour.abs_diff(event.hour()) <= EVENT_REACH_HOURS
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
