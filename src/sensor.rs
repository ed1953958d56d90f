/// Fishing score sensors
///
/// One sensor per (location, species) pair. The sensor's state is today's
/// 0-10 score; its attributes carry the full seven-day forecast. A cycle
/// that produced nothing (provider failure) leaves the sensor as it was.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Value, json};

use crate::config::{LocationConfig, ServiceConfig};
use crate::model::{DayScore, ForecastResult};
use crate::species::display_name;

#[derive(Debug, Clone, PartialEq)]
pub struct FishScoreSensor {
    pub location: String,
    pub species: String,
    pub body_type: String,
    pub state: Option<u8>,
    pub forecast: ForecastResult,
}

/// Serialised form of one sensor in the state file.
#[derive(Debug, Serialize)]
struct SensorRecord<'a> {
    unique_id: String,
    name: String,
    state: Option<u8>,
    attributes: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated: Option<&'a str>,
}

impl FishScoreSensor {
    pub fn new(location: &str, species: &str, body_type: &str) -> Self {
        Self {
            location: location.to_string(),
            species: species.to_string(),
            body_type: body_type.to_string(),
            state: None,
            forecast: ForecastResult::new(),
        }
    }

    /// One sensor per configured species at a location.
    pub fn for_location(location: &LocationConfig) -> Vec<Self> {
        location
            .fish
            .iter()
            .map(|species| Self::new(&location.name, species, &location.body_type))
            .collect()
    }

    /// Every sensor in the configuration, in file order.
    pub fn from_config(config: &ServiceConfig) -> Vec<Self> {
        config.locations.iter().flat_map(Self::for_location).collect()
    }

    /// `"{location}_{species}"`, lower-case, spaces replaced with underscores.
    pub fn unique_id(&self) -> String {
        format!("{}_{}", self.location, self.species)
            .to_lowercase()
            .replace(' ', "_")
    }

    pub fn name(&self) -> String {
        format!("{} {} Fishing Score", self.location, display_name(&self.species))
    }

    /// Takes a cycle's result. An empty result changes nothing.
    pub fn apply(&mut self, result: ForecastResult, today: NaiveDate) {
        if result.is_empty() {
            return;
        }
        self.state = result.get(&today).map(|day| day.score);
        self.forecast = result;
    }

    pub fn attributes(&self) -> Value {
        let forecast: BTreeMap<String, &DayScore> = self
            .forecast
            .iter()
            .map(|(date, day)| (date.to_string(), day))
            .collect();

        json!({
            "forecast": forecast,
            "body_type": self.body_type,
            "species": self.species,
            "location": self.location,
        })
    }
}

/// Writes every sensor to `path` as a JSON array.
pub fn write_state_file(
    path: impl AsRef<Path>,
    sensors: &[FishScoreSensor],
    updated: Option<&str>,
) -> std::io::Result<()> {
    let records: Vec<SensorRecord> = sensors
        .iter()
        .map(|sensor| SensorRecord {
            unique_id: sensor.unique_id(),
            name: sensor.name(),
            state: sensor.state,
            attributes: sensor.attributes(),
            updated,
        })
        .collect();

    let body = serde_json::to_string_pretty(&records)?;
    fs::write(path, body)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
