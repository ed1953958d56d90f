//! Service configuration.
//!
//! Loaded from a TOML file (`fishcast.toml` by default). A `.env` file is
//! read first so `FISHCAST_CONFIG`, `FISHCAST_LOG_LEVEL` and
//! `FISHCAST_LOG_FILE` can be set there.
//!
//! ```toml
//! [service]
//! poll_hours = [0, 6, 12, 18]
//!
//! [[location]]
//! name = "Peoria Lake"
//! latitude = 40.71
//! longitude = -89.55
//! fish = ["carp", "pike"]
//! body_type = "lake"
//! ```

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::ingest::open_meteo::DEFAULT_TIMEOUT_SECS;
use crate::logging::LogLevel;
use crate::model::{ConfigError, Coordinate, Site};
use crate::species::find_profile;

pub const DEFAULT_CONFIG_PATH: &str = "fishcast.toml";

/// Elevation assumed when a location does not give one, in metres.
pub const DEFAULT_ELEVATION_M: f64 = 500.0;

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default, rename = "location")]
    pub locations: Vec<LocationConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    /// Hours of day at which a scoring cycle may run.
    pub poll_hours: Vec<u32>,
    /// Sleep between checks of the poll gate.
    pub tick_seconds: u64,
    pub http_timeout_seconds: u64,
    pub log_level: String,
    pub log_file: Option<String>,
    /// Where sensor states are written after each cycle, if anywhere.
    pub state_file: Option<String>,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            poll_hours: vec![0, 6, 12, 18],
            tick_seconds: 60,
            http_timeout_seconds: DEFAULT_TIMEOUT_SECS,
            log_level: "info".to_string(),
            log_file: None,
            state_file: None,
        }
    }
}

impl ServiceSection {
    /// Parsed log level; unrecognised values fall back to info.
    pub fn level(&self) -> LogLevel {
        self.log_level.parse().unwrap_or(LogLevel::Info)
    }
}

/// One body of water and the species fished there.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LocationConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub fish: Vec<String>,
    #[serde(default = "default_body_type")]
    pub body_type: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_elevation")]
    pub elevation: f64,
}

fn default_body_type() -> String {
    "lake".to_string()
}

fn default_timezone() -> String {
    "auto".to_string()
}

fn default_elevation() -> f64 {
    DEFAULT_ELEVATION_M
}

impl LocationConfig {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn site(&self) -> Site {
        Site {
            name: self.name.clone(),
            coordinate: self.coordinate(),
            timezone: self.timezone.clone(),
            elevation: self.elevation,
            body_type: self.body_type.clone(),
        }
    }
}

impl ServiceConfig {
    /// Reads `.env`, resolves the config path and loads it.
    ///
    /// `explicit` wins over `FISHCAST_CONFIG`, which wins over the default.
    pub fn load_from_env(explicit: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let path = explicit
            .map(str::to_string)
            .or_else(|| env::var("FISHCAST_CONFIG").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let mut config = Self::load(&path)?;
        if let Ok(level) = env::var("FISHCAST_LOG_LEVEL") {
            config.service.log_level = level;
        }
        if let Ok(file) = env::var("FISHCAST_LOG_FILE") {
            config.service.log_file = Some(file);
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything the scorer cannot recover from.
    ///
    /// Body types are not checked here: an unrecognised one scores with
    /// lake weights and a warning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(&hour) = self.service.poll_hours.iter().find(|&&h| h > 23) {
            return Err(ConfigError::InvalidPollHour(hour));
        }
        if self.locations.is_empty() {
            return Err(ConfigError::NoLocations);
        }

        let mut names = HashSet::new();
        for location in &self.locations {
            if !names.insert(location.name.as_str()) {
                return Err(ConfigError::DuplicateLocation(location.name.clone()));
            }
            if !location.coordinate().is_valid() {
                return Err(ConfigError::InvalidCoordinate {
                    location: location.name.clone(),
                });
            }
            if location.fish.is_empty() {
                return Err(ConfigError::EmptySpecies {
                    location: location.name.clone(),
                });
            }
            if let Some(unknown) = location.fish.iter().find(|f| find_profile(f).is_none()) {
                return Err(ConfigError::UnknownSpecies {
                    location: location.name.clone(),
                    species: unknown.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [[location]]
        name = "Peoria Lake"
        latitude = 40.71
        longitude = -89.55
        fish = ["carp", "pike"]
    "#;

    #[test]
    fn test_minimal_config_takes_defaults() {
        let config = ServiceConfig::from_toml(MINIMAL).expect("minimal config is valid");
        assert_eq!(config.service.poll_hours, vec![0, 6, 12, 18]);
        assert_eq!(config.service.http_timeout_seconds, 15);
        assert_eq!(config.service.level(), LogLevel::Info);

        let lake = &config.locations[0];
        assert_eq!(lake.body_type, "lake");
        assert_eq!(lake.timezone, "auto");
        assert_eq!(lake.elevation, 500.0);
        assert_eq!(lake.site().coordinate, Coordinate::new(40.71, -89.55));
    }

    #[test]
    fn test_full_config() {
        let raw = r#"
            [service]
            poll_hours = [5, 17]
            tick_seconds = 30
            log_level = "debug"
            state_file = "state.json"

            [[location]]
            name = "Illinois River"
            latitude = 40.56
            longitude = -89.99
            fish = ["pike"]
            body_type = "river"
            timezone = "America/Chicago"
            elevation = 137.0

            [[location]]
            name = "Farm Pond"
            latitude = 40.1
            longitude = -89.2
            fish = ["carp"]
            body_type = "pond"
        "#;
        let config = ServiceConfig::from_toml(raw).unwrap();
        assert_eq!(config.service.poll_hours, vec![5, 17]);
        assert_eq!(config.service.level(), LogLevel::Debug);
        assert_eq!(config.locations.len(), 2);
        assert_eq!(config.locations[0].site().timezone, "America/Chicago");
        assert_eq!(config.locations[1].body_type, "pond");
    }

    #[test]
    fn test_unknown_species_is_rejected() {
        let raw = MINIMAL.replace("\"pike\"", "\"goldfish\"");
        match ServiceConfig::from_toml(&raw) {
            Err(ConfigError::UnknownSpecies { species, .. }) => assert_eq!(species, "goldfish"),
            other => panic!("expected UnknownSpecies, got {:?}", other),
        }
    }

    #[test]
    fn test_unrecognised_body_type_is_accepted() {
        let raw = format!("{}\nbody_type = \"canal\"\n", MINIMAL);
        let config = ServiceConfig::from_toml(&raw).expect("body type falls back at scoring time");
        assert_eq!(config.locations[0].body_type, "canal");
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(
            ServiceConfig::from_toml("[service]\n"),
            Err(ConfigError::NoLocations)
        ));
        assert!(matches!(
            ServiceConfig::from_toml(&MINIMAL.replace("40.71", "140.71")),
            Err(ConfigError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            ServiceConfig::from_toml(&MINIMAL.replace("[\"carp\", \"pike\"]", "[]")),
            Err(ConfigError::EmptySpecies { .. })
        ));
        assert!(matches!(
            ServiceConfig::from_toml(&format!("{}{}", MINIMAL, MINIMAL)),
            Err(ConfigError::DuplicateLocation(_))
        ));
        assert!(matches!(
            ServiceConfig::from_toml(&format!("[service]\npoll_hours = [24]\n{}", MINIMAL)),
            Err(ConfigError::InvalidPollHour(24))
        ));
        assert!(matches!(
            ServiceConfig::from_toml("not = [valid"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fishcast.toml");
        fs::write(&path, MINIMAL).unwrap();
        let config = ServiceConfig::load(&path).unwrap();
        assert_eq!(config.locations[0].fish, vec!["carp", "pike"]);

        let missing = ServiceConfig::load(dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
