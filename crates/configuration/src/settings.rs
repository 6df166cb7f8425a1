use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeSet;

/// The root configuration structure for an analysis run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)] // Use empty lists if the [exclusions] section is missing
    pub exclusions: ExclusionsConfig,
}

/// The raw exclusion lists as written in `lotcost.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExclusionsConfig {
    /// Charge types kept out of operational cost totals (e.g. "COMMISSION").
    #[serde(default)]
    pub charge_types: Vec<String>,
    /// Exporters kept out of population and between-exporter statistics
    /// (e.g. distributor designations). Their lots still appear in per-lot output.
    #[serde(default)]
    pub exporters: Vec<String>,
}

impl EngineConfig {
    /// Validates the raw lists and returns the normalised exclusion sets.
    pub fn exclusions(&self) -> Result<Exclusions, ConfigError> {
        Exclusions::new(&self.exclusions.charge_types, &self.exclusions.exporters)
    }
}

/// Validated exclusion sets. Names are trimmed and upper-cased so that every
/// lookup is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusions {
    charge_types: BTreeSet<String>,
    exporters: BTreeSet<String>,
}

impl Exclusions {
    pub fn new<S: AsRef<str>>(charge_types: &[S], exporters: &[S]) -> Result<Self, ConfigError> {
        Ok(Self {
            charge_types: normalize_set("exclusions.charge_types", charge_types)?,
            exporters: normalize_set("exclusions.exporters", exporters)?,
        })
    }

    /// An empty configuration: nothing is excluded.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_charge_type_excluded(&self, charge_type: &str) -> bool {
        self.charge_types.contains(&normalize(charge_type))
    }

    pub fn is_exporter_excluded(&self, exporter: &str) -> bool {
        self.exporters.contains(&normalize(exporter))
    }

    pub fn charge_types(&self) -> &BTreeSet<String> {
        &self.charge_types
    }

    pub fn exporters(&self) -> &BTreeSet<String> {
        &self.exporters
    }
}

/// Canonical form used for every exclusion comparison.
pub fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}

fn normalize_set<S: AsRef<str>>(key: &str, names: &[S]) -> Result<BTreeSet<String>, ConfigError> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let normalized = normalize(name.as_ref());
            if normalized.is_empty() {
                Err(ConfigError::ValidationError(format!(
                    "{key}[{i}] is blank; exclusion entries must name something"
                )))
            } else {
                Ok(normalized)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_case_and_padding() {
        let exclusions = Exclusions::new(&["Commission", " grower advance "], &["Distributor A"])
            .expect("valid exclusions");

        assert!(exclusions.is_charge_type_excluded("COMMISSION"));
        assert!(exclusions.is_charge_type_excluded("Grower Advance"));
        assert!(!exclusions.is_charge_type_excluded("OCEAN FREIGHT"));
        assert!(exclusions.is_exporter_excluded("distributor a"));
    }

    #[test]
    fn case_variants_collapse_into_one_entry() {
        let exclusions =
            Exclusions::new(&["commission", "COMMISSION"], &[]).expect("valid exclusions");
        assert_eq!(exclusions.charge_types().len(), 1);
    }

    #[test]
    fn blank_entries_are_rejected() {
        let err = Exclusions::new(&["PACKING", "   "], &[]).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(msg) if msg.contains("charge_types[1]")));
    }

    #[test]
    fn default_config_excludes_nothing() {
        let exclusions = EngineConfig::default().exclusions().expect("valid defaults");
        assert_eq!(exclusions, Exclusions::none());
    }
}
