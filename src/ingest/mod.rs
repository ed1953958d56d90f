/// Data providers for the fishing forecast service.
///
/// - `open_meteo`: hourly weather over HTTP (the only network I/O).
/// - `almanac`   : sun and moon events computed locally.
///
/// Both sit behind traits (`WeatherProvider`, `AstroProvider`) so the
/// pipeline, dev mode and tests can substitute their own sources.

pub mod almanac;
pub mod open_meteo;

pub use almanac::{Almanac, AstroProvider, AstroTimeline};
pub use open_meteo::{HourlySeries, OpenMeteoClient, WeatherProvider};
