/// Species profile registry for the fishing forecast service.
///
/// Defines the canonical list of target species and the conditions each one
/// prefers. This is the single source of truth for species identifiers; the
/// configuration loader validates against it and the scoring engine reads
/// preferences from it.

// ---------------------------------------------------------------------------
// Profile metadata
// ---------------------------------------------------------------------------

/// Preferred conditions for a single species.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesProfile {
    /// Lower-case identifier used in configuration, e.g. `"carp"`.
    pub key: &'static str,
    /// Comfortable temperature band `(low, high)` in °C. Air temperature is
    /// used as a proxy for water temperature.
    pub temp_range: (f64, f64),
    /// Cloud cover the species feeds best under, in percent.
    pub ideal_cloud: f64,
    /// Whether the species is known to feed more readily ahead of falling
    /// pressure. Carried for display; the pressure factor does not read it.
    pub prefers_low_pressure: bool,
}

/// All supported species, in alphabetical order of key.
pub static SPECIES_REGISTRY: &[SpeciesProfile] = &[
    SpeciesProfile {
        key: "carp",
        temp_range: (18.0, 28.0),
        ideal_cloud: 40.0,
        prefers_low_pressure: true,
    },
    SpeciesProfile {
        key: "pike",
        temp_range: (10.0, 20.0),
        ideal_cloud: 50.0,
        prefers_low_pressure: true,
    },
    SpeciesProfile {
        key: "trout",
        temp_range: (10.0, 18.0),
        ideal_cloud: 60.0,
        prefers_low_pressure: false,
    },
];

/// Looks up a species by key. Returns `None` if not found.
pub fn find_profile(species: &str) -> Option<&'static SpeciesProfile> {
    SPECIES_REGISTRY.iter().find(|p| p.key == species)
}

/// Returns every species key, suitable for validating configuration.
pub fn species_keys() -> Vec<&'static str> {
    SPECIES_REGISTRY.iter().map(|p| p.key).collect()
}

/// Human-readable label for a species key: `"rainbow_trout"` → `"Rainbow Trout"`.
pub fn display_name(species: &str) -> String {
    species
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
