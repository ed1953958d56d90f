//! Body types and the factor weights they select.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::logging::{self, DataSource};

/// Kind of water being fished. Each selects a `WeightProfile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    Lake,
    River,
    Pond,
    Reservoir,
}

impl BodyType {
    pub const ALL: [BodyType; 4] = [
        BodyType::Lake,
        BodyType::River,
        BodyType::Pond,
        BodyType::Reservoir,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BodyType::Lake => "lake",
            BodyType::River => "river",
            BodyType::Pond => "pond",
            BodyType::Reservoir => "reservoir",
        }
    }
}

impl fmt::Display for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BodyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BodyType::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| format!("unknown body type '{}'", s))
    }
}

/// The eight factors combined into an hour's composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Factor {
    Temp,
    Cloud,
    Pressure,
    Wind,
    Precip,
    Twilight,
    Solunar,
    Moon,
}

impl Factor {
    pub const ALL: [Factor; 8] = [
        Factor::Temp,
        Factor::Cloud,
        Factor::Pressure,
        Factor::Wind,
        Factor::Precip,
        Factor::Twilight,
        Factor::Solunar,
        Factor::Moon,
    ];
}

/// Weight of each factor in the composite. Always sums to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightProfile {
    pub temp: f64,
    pub cloud: f64,
    pub pressure: f64,
    pub wind: f64,
    pub precip: f64,
    pub twilight: f64,
    pub solunar: f64,
    pub moon: f64,
}

/// Still water with no particular bias.
const LAKE: WeightProfile = WeightProfile {
    temp: 0.25,
    cloud: 0.1,
    pressure: 0.15,
    wind: 0.1,
    precip: 0.1,
    twilight: 0.15,
    solunar: 0.1,
    moon: 0.05,
};

impl WeightProfile {
    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Temp => self.temp,
            Factor::Cloud => self.cloud,
            Factor::Pressure => self.pressure,
            Factor::Wind => self.wind,
            Factor::Precip => self.precip,
            Factor::Twilight => self.twilight,
            Factor::Solunar => self.solunar,
            Factor::Moon => self.moon,
        }
    }

    fn get_mut(&mut self, factor: Factor) -> &mut f64 {
        match factor {
            Factor::Temp => &mut self.temp,
            Factor::Cloud => &mut self.cloud,
            Factor::Pressure => &mut self.pressure,
            Factor::Wind => &mut self.wind,
            Factor::Precip => &mut self.precip,
            Factor::Twilight => &mut self.twilight,
            Factor::Solunar => &mut self.solunar,
            Factor::Moon => &mut self.moon,
        }
    }

    pub fn total(&self) -> f64 {
        Factor::ALL.iter().map(|&f| self.get(f)).sum()
    }

    /// Returns a copy with `overrides` applied and every weight rescaled so
    /// the profile sums to 1.0 again.
    pub fn with_overrides(&self, overrides: &[(Factor, f64)]) -> WeightProfile {
        let mut adjusted = *self;
        for &(factor, weight) in overrides {
            *adjusted.get_mut(factor) = weight.max(0.0);
        }
        adjusted.normalized()
    }

    /// Rescales the weights to sum to 1.0. A zero profile falls back to lake.
    pub fn normalized(&self) -> WeightProfile {
        let total = self.total();
        if total <= 0.0 || !total.is_finite() {
            return LAKE;
        }
        let mut scaled = *self;
        for factor in Factor::ALL {
            *scaled.get_mut(factor) /= total;
        }
        scaled
    }
}

/// Weights for a known body type.
///
/// Rivers lean on rainfall and less on pressure and the moon; ponds warm
/// and cool quickly so temperature, rain and pressure count more; deep
/// reservoirs damp pressure and solunar effects.
pub fn weights_for(body_type: BodyType) -> WeightProfile {
    match body_type {
        BodyType::Lake => LAKE,
        BodyType::River => LAKE.with_overrides(&[
            (Factor::Pressure, 0.05),
            (Factor::Solunar, 0.05),
            (Factor::Precip, 0.2),
        ]),
        BodyType::Pond => LAKE.with_overrides(&[
            (Factor::Temp, 0.3),
            (Factor::Precip, 0.2),
            (Factor::Pressure, 0.2),
        ]),
        BodyType::Reservoir => LAKE.with_overrides(&[
            (Factor::Pressure, 0.1),
            (Factor::Solunar, 0.08),
            (Factor::Moon, 0.07),
        ]),
    }
}

/// Resolves a configured body type string to weights. Unrecognised values
/// (including `"canal"`) use lake weights and log a warning.
pub fn resolve_weights(body_type: &str, location: Option<&str>) -> WeightProfile {
    match body_type.trim().to_ascii_lowercase().parse::<BodyType>() {
        Ok(known) => weights_for(known),
        Err(_) => {
            logging::warn(
                DataSource::Engine,
                location,
                &format!("Unknown body_type '{}', defaulting to 'lake'", body_type),
            );
            LAKE
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
