/// Local almanac for sun and moon events
///
/// Computes sunrise/sunset, moonrise/moonset, lunar transit and underfoot,
/// and moon phase from low-precision ephemerides (sun to ~0.01°, moon to
/// ~0.3°). That puts event times within a few minutes, well inside the
/// one-hour reach the scoring factors work at, and needs no network.
///
/// Events are found by sampling altitude and hour angle at a fixed step and
/// interpolating the crossing linearly. The timeline is computed in UTC and
/// only bucketed into local dates once the site's UTC offset is known, so it
/// can be built while the weather request is still in flight.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

use crate::model::{Coordinate, DailyAstroEvents, ProviderError};

// ============================================================================
// Constants
// ============================================================================

/// Julian date of the J2000.0 epoch.
const J2000: f64 = 2_451_545.0;

/// Julian date of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Sun's upper limb on the horizon, with standard refraction.
const SUN_HORIZON_DEG: f64 = -0.833;

/// Moon's upper limb on the horizon: mean parallax less refraction and
/// semi-diameter, for geocentric altitudes.
const MOON_HORIZON_DEG: f64 = 0.125;

/// Sampling step. Divides 60 so every whole hour gets a phase sample.
const STEP_MINUTES: i64 = 10;

// ============================================================================
// Provider contract
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AstroEventKind {
    Sunrise,
    Sunset,
    Moonrise,
    Moonset,
    MoonTransit,
    MoonUnderfoot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AstroEvent {
    pub kind: AstroEventKind,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseSample {
    pub at: DateTime<Utc>,
    /// 0.0 new, 0.5 full.
    pub phase: f64,
}

/// Sun and moon events over a UTC window, in time order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AstroTimeline {
    pub events: Vec<AstroEvent>,
    pub phases: Vec<PhaseSample>,
}

/// Source of astronomical events for a coordinate and range of days.
pub trait AstroProvider: Sync {
    /// Events covering local dates `start .. start + days` in any time zone.
    fn timeline(
        &self,
        coordinate: Coordinate,
        start: NaiveDate,
        days: u32,
    ) -> Result<AstroTimeline, ProviderError>;
}

impl AstroTimeline {
    /// Buckets the timeline into local calendar dates.
    ///
    /// Returns one entry per date in `start .. start + days`. When an event
    /// kind occurs twice on a date the first is kept. The moon phase is the
    /// sample closest to local noon.
    pub fn daily(&self, start: NaiveDate, days: u32, offset: FixedOffset) -> Vec<DailyAstroEvents> {
        let mut by_date: BTreeMap<NaiveDate, DailyAstroEvents> = (0..days)
            .map(|i| start + Duration::days(i64::from(i)))
            .map(|date| (date, DailyAstroEvents::empty(date)))
            .collect();

        for event in &self.events {
            let local = event.at.with_timezone(&offset).naive_local();
            let Some(day) = by_date.get_mut(&local.date()) else {
                continue;
            };
            let slot = match event.kind {
                AstroEventKind::Sunrise => &mut day.sunrise,
                AstroEventKind::Sunset => &mut day.sunset,
                AstroEventKind::Moonrise => &mut day.moonrise,
                AstroEventKind::Moonset => &mut day.moonset,
                AstroEventKind::MoonTransit => &mut day.moon_transit,
                AstroEventKind::MoonUnderfoot => &mut day.moon_underfoot,
            };
            if slot.is_none() {
                *slot = NaiveTime::from_hms_opt(local.hour(), local.minute(), 0);
            }
        }

        for day in by_date.values_mut() {
            let noon = day
                .date
                .and_hms_opt(12, 0, 0)
                .and_then(|n| offset.from_local_datetime(&n).single())
                .map(|n| n.with_timezone(&Utc));
            day.moon_phase = noon.and_then(|n| self.phase_near(n));
        }

        by_date.into_values().collect()
    }

    /// Phase of the sample nearest `at`, if one lies within an hour.
    fn phase_near(&self, at: DateTime<Utc>) -> Option<f64> {
        self.phases
            .iter()
            .min_by_key(|s| (s.at - at).num_seconds().abs())
            .filter(|s| (s.at - at).num_seconds().abs() <= 3600)
            .map(|s| (s.phase * 1000.0).round() / 1000.0)
    }
}

// ============================================================================
// Almanac
// ============================================================================

/// Computes timelines locally from ephemerides.
#[derive(Debug, Clone, Copy, Default)]
pub struct Almanac;

impl AstroProvider for Almanac {
    fn timeline(
        &self,
        coordinate: Coordinate,
        start: NaiveDate,
        days: u32,
    ) -> Result<AstroTimeline, ProviderError> {
        if !coordinate.is_valid() {
            return Err(ProviderError::Ephemeris(format!(
                "coordinate ({}, {}) is out of range",
                coordinate.latitude, coordinate.longitude
            )));
        }

        // A day of margin on each side covers every UTC offset.
        let begin = Utc.from_utc_datetime(&start.and_time(NaiveTime::MIN)) - Duration::days(1);
        let total_minutes = (i64::from(days) + 2) * 24 * 60;
        let steps = total_minutes / STEP_MINUTES;

        let samples: Vec<Sample> = (0..=steps)
            .map(|i| Sample::at(begin + Duration::minutes(i * STEP_MINUTES), coordinate))
            .collect();

        let mut timeline = AstroTimeline::default();
        let step_ms = (STEP_MINUTES * 60_000) as f64;
        let between = |a: &Sample, frac: f64| a.at + Duration::milliseconds((frac * step_ms) as i64);

        for (i, pair) in samples.windows(2).enumerate() {
            let (a, b) = (&pair[0], &pair[1]);

            if (i as i64 * STEP_MINUTES) % 60 == 0 {
                timeline.phases.push(PhaseSample { at: a.at, phase: a.moon_phase });
            }

            let mut found = Vec::with_capacity(2);
            if let Some((frac, rising)) = crossing(a.sun_alt, b.sun_alt, SUN_HORIZON_DEG) {
                let kind = if rising { AstroEventKind::Sunrise } else { AstroEventKind::Sunset };
                found.push((frac, kind));
            }
            if let Some((frac, rising)) = crossing(a.moon_alt, b.moon_alt, MOON_HORIZON_DEG) {
                let kind = if rising { AstroEventKind::Moonrise } else { AstroEventKind::Moonset };
                found.push((frac, kind));
            }
            // Hour angle increases through 360 → 0 at upper transit.
            if a.moon_hour_angle > b.moon_hour_angle {
                let frac = (360.0 - a.moon_hour_angle) / (b.moon_hour_angle + 360.0 - a.moon_hour_angle);
                found.push((frac, AstroEventKind::MoonTransit));
            }
            if a.moon_hour_angle < 180.0 && b.moon_hour_angle >= 180.0 {
                let frac = (180.0 - a.moon_hour_angle) / (b.moon_hour_angle - a.moon_hour_angle);
                found.push((frac, AstroEventKind::MoonUnderfoot));
            }

            found.sort_by(|x, y| x.0.total_cmp(&y.0));
            for (frac, kind) in found {
                timeline.events.push(AstroEvent { kind, at: between(a, frac) });
            }
        }

        Ok(timeline)
    }
}

/// Linear crossing of `threshold` between two samples: `(fraction, rising)`.
fn crossing(a: f64, b: f64, threshold: f64) -> Option<(f64, bool)> {
    if a < threshold && b >= threshold {
        Some(((threshold - a) / (b - a), true))
    } else if a >= threshold && b < threshold {
        Some(((a - threshold) / (a - b), false))
    } else {
        None
    }
}

// ============================================================================
// Ephemerides
// ============================================================================

struct Sample {
    at: DateTime<Utc>,
    sun_alt: f64,
    moon_alt: f64,
    moon_hour_angle: f64,
    moon_phase: f64,
}

impl Sample {
    fn at(at: DateTime<Utc>, coordinate: Coordinate) -> Self {
        let d = days_since_j2000(at);
        let sun = sun_position(d);
        let moon = moon_position(d);
        let lst = norm360(gmst_deg(d) + coordinate.longitude);

        let sun_ha = norm360(lst - sun.ra);
        let moon_ha = norm360(lst - moon.ra);

        Sample {
            at,
            sun_alt: altitude(coordinate.latitude, sun.dec, sun_ha),
            moon_alt: altitude(coordinate.latitude, moon.dec, moon_ha),
            moon_hour_angle: moon_ha,
            moon_phase: norm360(moon.ecliptic_lon - sun.ecliptic_lon) / 360.0,
        }
    }
}

/// Apparent position, all angles in degrees.
struct Position {
    ecliptic_lon: f64,
    ra: f64,
    dec: f64,
}

fn days_since_j2000(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 86_400_000.0 + UNIX_EPOCH_JD - J2000
}

fn obliquity(d: f64) -> f64 {
    23.439 - 0.000_000_4 * d
}

fn sun_position(d: f64) -> Position {
    let mean_lon = 280.460 + 0.985_647_4 * d;
    let g = 357.528 + 0.985_600_3 * d;
    let lon = norm360(mean_lon + 1.915 * sin_d(g) + 0.020 * sin_d(2.0 * g));
    let (ra, dec) = to_equatorial(lon, 0.0, obliquity(d));
    Position { ecliptic_lon: lon, ra, dec }
}

fn moon_position(d: f64) -> Position {
    let mean_lon = 218.316 + 13.176_396 * d;
    let anomaly = 134.963 + 13.064_993 * d;
    let elongation = 297.850 + 12.190_749 * d;
    let sun_anomaly = 357.529 + 0.985_600_28 * d;
    let node_arg = 93.272 + 13.229_350 * d;

    let lon = norm360(
        mean_lon + 6.289 * sin_d(anomaly) + 1.274 * sin_d(2.0 * elongation - anomaly)
            + 0.658 * sin_d(2.0 * elongation)
            + 0.214 * sin_d(2.0 * anomaly)
            - 0.186 * sin_d(sun_anomaly)
            - 0.114 * sin_d(2.0 * node_arg),
    );
    let lat = 5.128 * sin_d(node_arg);
    let (ra, dec) = to_equatorial(lon, lat, obliquity(d));
    Position { ecliptic_lon: lon, ra, dec }
}

fn to_equatorial(lon: f64, lat: f64, eps: f64) -> (f64, f64) {
    let ra = (sin_d(lon) * cos_d(eps) - tan_d(lat) * sin_d(eps)).atan2(cos_d(lon)).to_degrees();
    let dec = (sin_d(lat) * cos_d(eps) + cos_d(lat) * sin_d(eps) * sin_d(lon)).asin().to_degrees();
    (norm360(ra), dec)
}

/// Greenwich mean sidereal time in degrees.
fn gmst_deg(d: f64) -> f64 {
    norm360(280.460_618_37 + 360.985_647_366_29 * d)
}

fn altitude(lat: f64, dec: f64, hour_angle: f64) -> f64 {
    (sin_d(lat) * sin_d(dec) + cos_d(lat) * cos_d(dec) * cos_d(hour_angle))
        .clamp(-1.0, 1.0)
        .asin()
        .to_degrees()
}

fn norm360(deg: f64) -> f64 {
    deg.rem_euclid(360.0)
}

fn sin_d(deg: f64) -> f64 {
    deg.to_radians().sin()
}

fn cos_d(deg: f64) -> f64 {
    deg.to_radians().cos()
}

fn tan_d(deg: f64) -> f64 {
    deg.to_radians().tan()
}

// ============================================================================
// Tests
// ============================================================================
