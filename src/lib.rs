//! Fishing forecast service.
//!
//! Scores the next seven days of fishing at configured bodies of water for
//! configured fish species, from hourly weather (Open-Meteo) and locally
//! computed sun and moon events. Each (location, species) pair becomes a
//! sensor whose state is today's 0-10 score and whose attributes carry the
//! daily scores and best three-hour window for the week.

pub mod analysis;
pub mod config;
pub mod dev_mode;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod poll;
pub mod sensor;
pub mod species;
pub mod verify;
