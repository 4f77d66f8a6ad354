//! Construction template catalog
//!
//! Static, immutable registry of the built-in station templates. Each
//! template lists the same twelve commodities; quantities scale down from the
//! Coriolis baseline by a fixed ratio per template. Initialized once at
//! startup, pure lookup afterwards.

use std::collections::BTreeMap;

/// Baseline commodity requirements (Coriolis Starport)
///
/// Every other template is an exact integer fraction of these figures.
const BASE_REQUIREMENTS: [(&str, u64); 12] = [
    ("Aluminium", 2_500_000),
    ("Beryllium", 350_000),
    ("Copper", 750_000),
    ("Gold", 25_000),
    ("Indium", 125_000),
    ("Lithium", 125_000),
    ("Nickel", 750_000),
    ("Palladium", 25_000),
    ("Platinum", 5_000),
    ("Silver", 25_000),
    ("Titanium", 250_000),
    ("Uranium", 125_000),
];

/// Template ladder: key, display name, scale numerator/denominator
const TEMPLATE_LADDER: [(&str, &str, u64, u64); 6] = [
    ("coriolis_starport", "Coriolis Starport", 1, 1),
    ("orbis_starport", "Orbis Starport", 1, 2),
    ("ocellus_starport", "Ocellus Starport", 3, 10),
    ("asteroid_base", "Asteroid Base", 1, 10),
    ("planetary_outpost", "Planetary Outpost", 1, 20),
    ("ground_settlement", "Ground Settlement", 3, 100),
];

/// A construction template: display name plus required commodity quantities
#[derive(Debug, Clone)]
pub struct Template {
    pub key: &'static str,
    pub display_name: &'static str,
    pub required: BTreeMap<String, u64>,
}

impl Template {
    /// Build a template with explicit requirements (fixtures and tests)
    pub fn fixed(key: &'static str, display_name: &'static str, required: &[(&str, u64)]) -> Self {
        Self {
            key,
            display_name,
            required: required
                .iter()
                .map(|(name, qty)| (name.to_string(), *qty))
                .collect(),
        }
    }

    fn scaled(key: &'static str, display_name: &'static str, num: u64, den: u64) -> Self {
        Self {
            key,
            display_name,
            required: BASE_REQUIREMENTS
                .iter()
                .map(|(name, qty)| (name.to_string(), qty * num / den))
                .collect(),
        }
    }
}

/// Read-only registry of the built-in templates, in ladder order
pub struct CatalogRegistry {
    templates: Vec<Template>,
}

impl CatalogRegistry {
    /// Build the registry from the built-in table
    pub fn builtin() -> Self {
        Self {
            templates: TEMPLATE_LADDER
                .iter()
                .map(|&(key, name, num, den)| Template::scaled(key, name, num, den))
                .collect(),
        }
    }

    /// All templates, largest first
    pub fn list(&self) -> &[Template] {
        &self.templates
    }

    /// Look up a template by key
    pub fn get(&self, key: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.key == key)
    }
}

impl Default for CatalogRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
