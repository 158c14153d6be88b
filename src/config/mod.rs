//! Table configuration — per-role, per-metre rhythm tables loaded from
//! ~/.rhythmspace/tables.yaml, with built-in fallbacks.

pub mod builtin;
pub mod tables;

pub use tables::{AdditionalMaterial, FeatureImpact, RhythmTables, ScoreWeights};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::generator::Role;
use crate::metre::Metre;

/// Rhythm tables for each role, keyed by time signature (`"4/4"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TablesConfig {
    #[serde(default)]
    pub melody: BTreeMap<String, RhythmTables>,
    #[serde(default)]
    pub harmony: BTreeMap<String, RhythmTables>,
}

impl TablesConfig {
    /// Default path for the tables file.
    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".rhythmspace");
        path.push("tables.yaml");
        path
    }

    /// Load from the default path. Returns None if the file doesn't exist or
    /// can't be parsed.
    pub fn load() -> Option<Self> {
        let path = Self::default_path();
        if !path.exists() {
            return None;
        }
        match Self::load_from(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("ignoring {}: {e}", path.display());
                None
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Write as YAML, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Every built-in table set, as a starting point for a custom file.
    pub fn builtin() -> Self {
        let mut config = Self::default();
        for ts in ["4/4", "3/4"] {
            for role in [Role::Melody, Role::Harmony] {
                if let Some(tables) = builtin::tables(role, ts) {
                    config.role_mut(role).insert(ts.to_string(), tables);
                }
            }
        }
        config
    }

    pub fn role(&self, role: Role) -> &BTreeMap<String, RhythmTables> {
        match role {
            Role::Melody => &self.melody,
            Role::Harmony => &self.harmony,
        }
    }

    pub fn role_mut(&mut self, role: Role) -> &mut BTreeMap<String, RhythmTables> {
        match role {
            Role::Melody => &mut self.melody,
            Role::Harmony => &mut self.harmony,
        }
    }

    /// Tables for `role` in `metre`: configured, then built-in, then derived.
    pub fn tables_for(&self, role: Role, metre: &Metre) -> RhythmTables {
        let ts = metre.time_signature().to_string();
        if let Some(tables) = self.role(role).get(&ts) {
            debug!("using configured {role} tables for {ts}");
            return tables.clone();
        }
        if let Some(tables) = builtin::tables(role, &ts) {
            debug!("using built-in {role} tables for {ts}");
            return tables;
        }
        warn!("no tuned {role} tables for {ts}; deriving them from the metre");
        builtin::derived(role, metre)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tables.yaml");

        let config = TablesConfig::builtin();
        config.save_to(&path).unwrap();
        let loaded = TablesConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn builtin_covers_both_roles() {
        let config = TablesConfig::builtin();
        assert!(config.melody.contains_key("4/4"));
        assert!(config.melody.contains_key("3/4"));
        assert!(config.harmony.contains_key("4/4"));
        assert!(config.harmony.contains_key("3/4"));
    }

    #[test]
    fn configured_tables_take_precedence() {
        let metre = Metre::with_default_tactus("4/4").unwrap();
        let mut custom = builtin::melody_four_four();
        custom.probability_tie = vec![0.0; 5];
        let mut config = TablesConfig::default();
        config.melody.insert("4/4".into(), custom.clone());

        assert_eq!(config.tables_for(Role::Melody, &metre), custom);
        assert_eq!(
            config.tables_for(Role::Harmony, &metre),
            builtin::harmony_four_four()
        );
    }

    #[test]
    fn unknown_metre_falls_back_to_derived() {
        let metre = Metre::with_default_tactus("6/8").unwrap();
        let tables = TablesConfig::default().tables_for(Role::Melody, &metre);
        tables.validate(&metre).unwrap();
        assert_eq!(tables, builtin::derived(Role::Melody, &metre));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let err = TablesConfig::load_from(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, crate::error::ConfigError::Io(_)));
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tables.yaml");
        std::fs::write(&path, "melody: [not, a, map]").unwrap();
        assert!(matches!(
            TablesConfig::load_from(&path),
            Err(crate::error::ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn default_path_is_under_rhythmspace() {
        let path = TablesConfig::default_path();
        assert!(path.ends_with(".rhythmspace/tables.yaml"));
    }
}
