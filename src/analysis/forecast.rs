//! Forecast scoring engine.
//!
//! Combines a species profile, body-type weights, hourly weather and daily
//! astronomical events into one 0-10 score and a best three-hour window per
//! date. The engine never fails: an unknown species yields an empty result,
//! missing astronomy scores neutral, and thin days are left out.

use std::collections::HashMap;

use chrono::{NaiveDate, Timelike};

use crate::analysis::factors;
use crate::analysis::groupings::{derive_pressure_trends, group_by_date};
use crate::analysis::weights::{WeightProfile, resolve_weights};
use crate::logging::{self, DataSource};
use crate::model::{
    BestWindow, DailyAstroEvents, DayScore, ForecastResult, HourlyObservation, Site, WINDOW_HOURS,
};
use crate::species::{SpeciesProfile, find_profile};

/// Raw averages at or below this map to a display score of 0.
const RAW_FLOOR: f64 = 0.5;
/// Raw averages at or above this map to a display score of 10.
const RAW_CEILING: f64 = 0.9;

/// The eight sub-scores of one hour, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorScores {
    pub temp: f64,
    pub cloud: f64,
    pub pressure: f64,
    pub wind: f64,
    pub precip: f64,
    pub twilight: f64,
    pub solunar: f64,
    pub moon: f64,
}

impl FactorScores {
    pub fn for_hour(
        obs: &HourlyObservation,
        profile: &SpeciesProfile,
        astro: &DailyAstroEvents,
    ) -> Self {
        let hour = obs.timestamp.hour();
        FactorScores {
            temp: factors::temp_score(obs.temp, profile.temp_range),
            cloud: factors::cloud_score(obs.cloud, profile.ideal_cloud),
            pressure: factors::pressure_score(obs.pressure_trend),
            wind: factors::wind_score(obs.wind),
            precip: factors::precip_score(obs.precip),
            twilight: factors::twilight_score(hour, astro.sunrise, astro.sunset),
            solunar: factors::solunar_score(
                hour,
                astro.moon_transit,
                astro.moon_underfoot,
                astro.moonrise,
                astro.moonset,
            ),
            moon: factors::moon_score(astro.moon_phase),
        }
    }

    /// Weighted sum, rounded to two decimals.
    pub fn composite(&self, weights: &WeightProfile) -> f64 {
        let sum = self.temp * weights.temp
            + self.cloud * weights.cloud
            + self.pressure * weights.pressure
            + self.wind * weights.wind
            + self.precip * weights.precip
            + self.twilight * weights.twilight
            + self.solunar * weights.solunar
            + self.moon * weights.moon;
        round2(sum)
    }
}

/// Composite score of a single hour.
pub fn score_hour(
    obs: &HourlyObservation,
    profile: &SpeciesProfile,
    astro: &DailyAstroEvents,
    weights: &WeightProfile,
) -> f64 {
    FactorScores::for_hour(obs, profile, astro).composite(weights)
}

/// Scores every date in `hourly` that has at least three observations.
///
/// `astro` is matched to the weather by calendar date; a date without an
/// entry is scored with neutral astronomical factors. `site.body_type`
/// selects the weights (unknown values use lake weights).
pub fn compute_forecast(
    species: &str,
    site: &Site,
    hourly: &[HourlyObservation],
    astro: &[DailyAstroEvents],
) -> ForecastResult {
    let mut forecast = ForecastResult::new();

    let Some(profile) = find_profile(species) else {
        logging::debug(
            DataSource::Engine,
            Some(&site.name),
            &format!("No profile for species '{}', skipping", species),
        );
        return forecast;
    };

    let weights = resolve_weights(&site.body_type, Some(&site.name));

    let mut series = hourly.to_vec();
    derive_pressure_trends(&mut series);

    let astro_by_date: HashMap<NaiveDate, &DailyAstroEvents> =
        astro.iter().map(|day| (day.date, day)).collect();

    for (date, rows) in group_by_date(&series) {
        if rows.len() < WINDOW_HOURS {
            continue;
        }

        let no_events = DailyAstroEvents::empty(date);
        let events = astro_by_date.get(&date).copied().unwrap_or(&no_events);

        let hourly_scores: Vec<(u32, f64)> = rows
            .iter()
            .map(|obs| (obs.timestamp.hour(), score_hour(obs, profile, events, &weights)))
            .collect();

        if let Some((best_window, raw)) = best_window(&hourly_scores) {
            forecast.insert(
                date,
                DayScore {
                    date,
                    score: scale_score(raw),
                    best_window,
                },
            );
        }
    }

    forecast
}

/// Finds the three consecutive entries with the highest average.
///
/// Input is `(hour_of_day, composite)` in time order. The window is labelled
/// with the hours of its first and last entry. Ties go to the earliest
/// window. Returns `None` for fewer than three entries.
pub fn best_window(hourly_scores: &[(u32, f64)]) -> Option<(BestWindow, f64)> {
    let mut best: Option<(BestWindow, f64)> = None;

    for window in hourly_scores.windows(WINDOW_HOURS) {
        let avg = window.iter().map(|&(_, score)| score).sum::<f64>() / WINDOW_HOURS as f64;
        let improves = match best {
            Some((_, best_avg)) => avg > best_avg,
            None => true,
        };
        if improves {
            let span = BestWindow {
                start_hour: window[0].0,
                end_hour: window[WINDOW_HOURS - 1].0,
            };
            best = Some((span, avg));
        }
    }

    best
}

/// Stretches a raw average onto the 0-10 display scale.
///
/// Composites rarely leave [0.5, 0.9], so that band is mapped linearly onto
/// 0..=10 and everything outside it is clamped. Halves round to even.
pub fn scale_score(raw: f64) -> u8 {
    let stretched = (raw - RAW_FLOOR) / (RAW_CEILING - RAW_FLOOR) * 10.0;
    let rounded = stretched.round_ties_even();
    if rounded.is_nan() {
        return 0;
    }
    rounded.clamp(0.0, 10.0) as u8
}

/// Rounds to two decimals from the exact binary value, ties to even.
///
/// `{:.2}` formats the exact expansion, so 0.845 (stored just below) gives
/// 0.84 and the exact tie 0.625 gives 0.62. Scaling by 100 first would
/// round the already-inexact product instead.
fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::weights::{BodyType, weights_for};
    use crate::model::Coordinate;
    use approx::assert_abs_diff_eq;
    use chrono::{NaiveDateTime, NaiveTime};

    fn site(body_type: &str) -> Site {
        Site {
            name: "Test Lake".to_string(),
            coordinate: Coordinate::new(52.0, 5.0),
            timezone: "auto".to_string(),
            elevation: 10.0,
            body_type: body_type.to_string(),
        }
    }

    fn hour(date: &str, h: u32, temp: f64) -> HourlyObservation {
        HourlyObservation {
            timestamp: NaiveDateTime::parse_from_str(
                &format!("{}T{:02}:00", date, h),
                "%Y-%m-%dT%H:%M",
            )
            .unwrap(),
            temp,
            cloud: 40.0,
            pressure: 1015.0,
            precip: 0.0,
            wind: 4.0,
            pressure_trend: None,
        }
    }

    fn full_day(date: &str) -> Vec<HourlyObservation> {
        (0..24).map(|h| hour(date, h, 23.0)).collect()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    // --- scale_score --------------------------------------------------------

    #[test]
    fn test_scale_score_clamps_at_both_ends() {
        assert_eq!(scale_score(0.5), 0);
        assert_eq!(scale_score(0.3), 0);
        assert_eq!(scale_score(0.0), 0);
        assert_eq!(scale_score(0.9), 10);
        assert_eq!(scale_score(1.0), 10);
    }

    #[test]
    fn test_scale_score_is_monotonic() {
        let mut last = 0;
        for i in 0..=1000 {
            let raw = i as f64 / 1000.0;
            let scaled = scale_score(raw);
            assert!(scaled >= last, "scale_score decreased at raw {}", raw);
            assert!(scaled <= 10);
            last = scaled;
        }
    }

    #[test]
    fn test_scale_score_midpoint() {
        assert_eq!(scale_score(0.7), 5);
        assert_eq!(scale_score(0.825), 8);
    }

    #[test]
    fn test_scale_score_nan_is_zero() {
        assert_eq!(scale_score(f64::NAN), 0);
    }

    // --- round2 -------------------------------------------------------------

    #[test]
    fn test_round2_uses_the_stored_value() {
        // 0.845 is stored as 0.84499999..., so it rounds down.
        assert_eq!(round2(0.845), 0.84);
        assert_eq!(round2(0.8249999999999998), 0.82);
    }

    #[test]
    fn test_round2_exact_ties_go_to_even() {
        assert_eq!(round2(0.625), 0.62);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(0.87), 0.87);
    }

    #[test]
    fn test_falling_pressure_day_rounds_composites_down() {
        // Every hour after the first composes to 0.845 before rounding.
        // Rounded to 0.84 the best window averages 0.84, which stretches
        // to 8.4999... and publishes as 8.
        let mut hourly = full_day("2024-05-01");
        for (i, obs) in hourly.iter_mut().enumerate() {
            obs.pressure = 1020.0 - 3.0 * i as f64;
            obs.wind = 7.0;
        }
        let events = DailyAstroEvents {
            moon_phase: Some(0.0),
            ..DailyAstroEvents::empty(date("2024-05-01"))
        };

        let forecast = compute_forecast("carp", &site("lake"), &hourly, &[events]);
        let day = &forecast[&date("2024-05-01")];
        assert_eq!(day.score, 8);
        assert_eq!(day.best_window.to_string(), "01:00 – 03:00");
    }

    // --- best_window --------------------------------------------------------

    #[test]
    fn test_best_window_uses_highest_rolling_average() {
        let scores: Vec<(u32, f64)> = [0.5, 0.6, 0.9, 0.9, 0.9, 0.4, 0.5, 0.5]
            .iter()
            .enumerate()
            .map(|(h, &s)| (h as u32, s))
            .collect();
        let (window, avg) = best_window(&scores).unwrap();
        assert_eq!(window.to_string(), "02:00 – 04:00");
        assert_abs_diff_eq!(avg, 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_best_window_labels_actual_hours_not_indices() {
        let scores = vec![(14, 0.6), (15, 0.8), (16, 0.8), (17, 0.8)];
        let (window, _) = best_window(&scores).unwrap();
        assert_eq!(window, BestWindow { start_hour: 15, end_hour: 17 });
    }

    #[test]
    fn test_best_window_ties_go_to_earliest() {
        let scores = vec![(5, 0.8), (6, 0.8), (7, 0.8), (8, 0.8), (9, 0.8)];
        let (window, _) = best_window(&scores).unwrap();
        assert_eq!(window.start_hour, 5);
    }

    #[test]
    fn test_best_window_needs_three_hours() {
        assert!(best_window(&[(1, 0.9), (2, 0.9)]).is_none());
        assert!(best_window(&[]).is_none());
    }

    // --- compute_forecast ---------------------------------------------------

    #[test]
    fn test_unknown_species_yields_empty_forecast() {
        let forecast = compute_forecast("goldfish", &site("lake"), &full_day("2024-05-01"), &[]);
        assert!(forecast.is_empty());
    }

    #[test]
    fn test_day_with_fewer_than_three_hours_is_omitted() {
        let mut hourly = full_day("2024-05-01");
        hourly.push(hour("2024-05-02", 0, 23.0));
        hourly.push(hour("2024-05-02", 1, 23.0));

        let forecast = compute_forecast("carp", &site("lake"), &hourly, &[]);
        assert!(forecast.contains_key(&date("2024-05-01")));
        assert!(!forecast.contains_key(&date("2024-05-02")));
    }

    #[test]
    fn test_missing_moon_phase_scores_neutral_every_hour() {
        let carp = find_profile("carp").unwrap();
        let events = DailyAstroEvents {
            date: date("2024-05-01"),
            sunrise: NaiveTime::from_hms_opt(6, 0, 0),
            sunset: NaiveTime::from_hms_opt(20, 0, 0),
            ..DailyAstroEvents::default()
        };
        for obs in full_day("2024-05-01") {
            let scores = FactorScores::for_hour(&obs, carp, &events);
            assert_eq!(scores.moon, 0.7);
        }
    }

    #[test]
    fn test_unknown_body_type_scores_like_lake() {
        let hourly = full_day("2024-05-01");
        let lake = compute_forecast("pike", &site("lake"), &hourly, &[]);
        let canal = compute_forecast("pike", &site("canal"), &hourly, &[]);
        assert_eq!(lake, canal);
    }

    #[test]
    fn test_astro_matched_by_date_moves_the_window() {
        let hourly = full_day("2024-05-01");
        let events = DailyAstroEvents {
            date: date("2024-05-01"),
            sunrise: NaiveTime::from_hms_opt(6, 10, 0),
            sunset: NaiveTime::from_hms_opt(20, 50, 0),
            moon_transit: NaiveTime::from_hms_opt(20, 30, 0),
            ..DailyAstroEvents::default()
        };
        let forecast = compute_forecast("carp", &site("lake"), &hourly, &[events]);
        let day = &forecast[&date("2024-05-01")];
        // Twilight and a major solunar period overlap at 19-21.
        assert_eq!(day.best_window, BestWindow { start_hour: 19, end_hour: 21 });
    }

    #[test]
    fn test_astro_for_other_dates_is_ignored() {
        let hourly = full_day("2024-05-01");
        let other_day = DailyAstroEvents {
            date: date("2024-05-02"),
            moon_phase: Some(0.0),
            sunrise: NaiveTime::from_hms_opt(6, 0, 0),
            sunset: NaiveTime::from_hms_opt(20, 0, 0),
            ..DailyAstroEvents::default()
        };
        assert_eq!(
            compute_forecast("carp", &site("lake"), &hourly, &[other_day]),
            compute_forecast("carp", &site("lake"), &hourly, &[])
        );
    }

    #[test]
    fn test_sharp_pressure_fall_raises_the_score() {
        let calm = full_day("2024-05-01");
        let mut falling = full_day("2024-05-01");
        for (i, obs) in falling.iter_mut().enumerate() {
            obs.pressure = 1020.0 - 3.0 * i as f64;
        }
        let calm_score = compute_forecast("carp", &site("pond"), &calm, &[])[&date("2024-05-01")].score;
        let falling_score =
            compute_forecast("carp", &site("pond"), &falling, &[])[&date("2024-05-01")].score;
        assert!(falling_score > calm_score, "{} should beat {}", falling_score, calm_score);
    }

    #[test]
    fn test_composite_is_rounded_to_two_decimals() {
        let carp = find_profile("carp").unwrap();
        let mut obs = hour("2024-05-01", 12, 15.3);
        obs.cloud = 37.0;
        let composite = score_hour(
            &obs,
            carp,
            &DailyAstroEvents::empty(date("2024-05-01")),
            &weights_for(BodyType::River),
        );
        assert_abs_diff_eq!(composite * 100.0, (composite * 100.0).round(), epsilon = 1e-9);
    }

    #[test]
    fn test_every_score_is_within_display_range() {
        let mut hourly = Vec::new();
        for (d, temp) in [("2024-05-01", -20.0), ("2024-05-02", 23.0), ("2024-05-03", 45.0)] {
            for h in 0..24 {
                let mut obs = hour(d, h, temp);
                obs.wind = h as f64;
                obs.precip = (h % 7) as f64;
                obs.cloud = (h * 4) as f64;
                hourly.push(obs);
            }
        }
        for body in ["lake", "river", "pond", "reservoir"] {
            for day in compute_forecast("trout", &site(body), &hourly, &[]).values() {
                assert!(day.score <= 10);
            }
        }
    }
}
