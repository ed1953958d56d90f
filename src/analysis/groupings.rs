/// Data organization helpers for the scoring engine.
///
/// Turns a flat hourly series into per-date groups, and derives the
/// hour-over-hour pressure trend each row is scored on.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::model::HourlyObservation;

/// Sorts `series` by timestamp and fills in `pressure_trend` as the change
/// from the row one hour earlier.
///
/// The first row, and any row that follows a gap in the series, has no
/// trend. Trends run across midnight: the first hour of a day is compared
/// with the last hour of the previous one.
pub fn derive_pressure_trends(series: &mut [HourlyObservation]) {
    series.sort_by_key(|obs| obs.timestamp);

    let mut previous: Option<(chrono::NaiveDateTime, f64)> = None;
    for obs in series.iter_mut() {
        obs.pressure_trend = match previous {
            Some((at, pressure)) if obs.timestamp - at == Duration::hours(1) => {
                Some(obs.pressure - pressure)
            }
            _ => None,
        };
        previous = Some((obs.timestamp, obs.pressure));
    }
}

/// Groups rows by calendar date, keeping each day's rows in time order.
pub fn group_by_date(series: &[HourlyObservation]) -> BTreeMap<NaiveDate, Vec<&HourlyObservation>> {
    let mut days: BTreeMap<NaiveDate, Vec<&HourlyObservation>> = BTreeMap::new();
    for obs in series {
        days.entry(obs.timestamp.date()).or_default().push(obs);
    }
    for rows in days.values_mut() {
        rows.sort_by_key(|obs| obs.timestamp);
    }
    days
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
