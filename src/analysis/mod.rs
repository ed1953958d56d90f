/// Forecast scoring for the fishing forecast service.
///
/// Everything in here is pure: no I/O, no clocks, no shared state. The
/// pipeline hands in already-fetched weather and astronomy and gets a
/// `ForecastResult` back.
///
/// Submodules:
/// - `factors`  : the eight per-hour sub-scores, each in [0, 1].
/// - `weights`  : body types and the factor weights each one selects.
/// - `groupings`: pressure trends and per-date grouping of hourly rows.
/// - `forecast` : the engine: hourly composites, best window, day scores.

pub mod factors;
pub mod forecast;
pub mod groupings;
pub mod weights;
