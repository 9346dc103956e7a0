//! Tree settings with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Optional TOML file supplied by the caller
//! 3. Environment variables: `BINTREE_*` prefix

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::error::{TreeError, TreeResult};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "BINTREE";

/// Where node storage comes from. One tree never mixes the two.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// Nodes are obtained from and released to an allocator
    #[default]
    Allocated,
    /// Nodes live in a caller-sized pool and are only reset, never freed
    CallerManaged,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::Allocated => write!(f, "allocated"),
            StorageMode::CallerManaged => write!(f, "caller_managed"),
        }
    }
}

impl FromStr for StorageMode {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "allocated" => Ok(StorageMode::Allocated),
            "caller_managed" => Ok(StorageMode::CallerManaged),
            other => Err(TreeError::Config {
                message: format!("unknown storage mode: {other}"),
            }),
        }
    }
}

/// Effective tree configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct TreeSettings {
    /// Storage strategy
    pub storage: StorageMode,
    /// Node limit (allocated) or pool size (caller-managed)
    pub capacity: Option<usize>,
}

/// Raw settings for intermediate parsing; `None` means "not specified".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub storage: Option<StorageMode>,
    pub capacity: Option<usize>,
}

impl TreeSettings {
    /// Pool size used in caller-managed mode when no capacity is configured.
    pub const DEFAULT_POOL_SLOTS: usize = 64;

    pub fn pool_slots(&self) -> usize {
        self.capacity.unwrap_or(Self::DEFAULT_POOL_SLOTS)
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            storage: overlay.storage.unwrap_or(self.storage),
            capacity: overlay.capacity.or(self.capacity),
        }
    }

    /// Load settings: defaults, then `file` if given, then `BINTREE_*` variables.
    pub fn load(file: Option<&Path>) -> TreeResult<Self> {
        Self::load_with_prefix(file, ENV_PREFIX)
    }

    #[instrument(level = "debug")]
    pub(crate) fn load_with_prefix(file: Option<&Path>, prefix: &str) -> TreeResult<Self> {
        let mut current = Self::default();

        if let Some(path) = file {
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
        }

        current = Self::apply_env_overrides(current, prefix)?;
        debug!(storage = %current.storage, capacity = ?current.capacity, "settings loaded");
        Ok(current)
    }

    /// Env vars replace values; they are explicit overrides.
    fn apply_env_overrides(mut settings: Self, prefix: &str) -> TreeResult<Self> {
        let config = Config::builder()
            .add_source(Environment::with_prefix(prefix))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("storage") {
            settings.storage = val.parse()?;
        }
        if let Ok(val) = config.get_string("capacity") {
            let capacity = val.trim().parse::<usize>().map_err(|e| TreeError::Config {
                message: format!("{prefix}_CAPACITY: {e}"),
            })?;
            settings.capacity = Some(capacity);
        }
        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> TreeResult<String> {
        toml::to_string_pretty(self).map_err(|e| TreeError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# bintree configuration
#
# Precedence (lowest to highest):
#   compiled defaults
#   this file
#   BINTREE_* environment variables (BINTREE_STORAGE, BINTREE_CAPACITY)

# Node storage: "allocated" (nodes freed on delete) or
# "caller_managed" (fixed pool, nodes only reset on delete)
# storage = "allocated"

# Allocated: maximum number of live nodes (unbounded when unset)
# Caller-managed: pool size (64 when unset)
# capacity = 1024
"#
        .to_string()
    }
}

/// Load a TOML file into RawSettings for merging.
fn load_raw_settings(path: &Path) -> TreeResult<RawSettings> {
    let content = std::fs::read_to_string(path).map_err(|e| TreeError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| TreeError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn config_err(e: ConfigError) -> TreeError {
    TreeError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn given_no_sources_when_loading_then_uses_defaults() {
        let settings = TreeSettings::load_with_prefix(None, "BINTREE_UNIT_UNSET").unwrap();
        assert_eq!(settings, TreeSettings::default());
        assert_eq!(settings.storage, StorageMode::Allocated);
        assert_eq!(settings.pool_slots(), TreeSettings::DEFAULT_POOL_SLOTS);
    }

    #[rstest]
    #[case("allocated", StorageMode::Allocated)]
    #[case("caller_managed", StorageMode::CallerManaged)]
    #[case("Caller-Managed", StorageMode::CallerManaged)]
    fn test_storage_mode_parses(#[case] input: &str, #[case] expected: StorageMode) {
        assert_eq!(input.parse::<StorageMode>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_storage_mode_is_config_error() {
        let err = "heap".parse::<StorageMode>().unwrap_err();
        assert!(matches!(err, TreeError::Config { .. }));
    }

    #[test]
    fn test_merge_keeps_base_when_not_specified() {
        let base = TreeSettings {
            storage: StorageMode::CallerManaged,
            capacity: Some(8),
        };
        let merged = base.merge_with(&RawSettings::default());
        assert_eq!(merged, base);

        let merged = base.merge_with(&RawSettings {
            storage: None,
            capacity: Some(16),
        });
        assert_eq!(merged.storage, StorageMode::CallerManaged);
        assert_eq!(merged.capacity, Some(16));
    }

    #[test]
    fn given_toml_file_when_loading_then_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "storage = \"caller_managed\"\ncapacity = 12").unwrap();

        let settings =
            TreeSettings::load_with_prefix(Some(file.path()), "BINTREE_UNIT_UNSET").unwrap();
        assert_eq!(settings.storage, StorageMode::CallerManaged);
        assert_eq!(settings.capacity, Some(12));
    }

    #[test]
    fn given_malformed_file_when_loading_then_reports_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "storage = \"nowhere\"").unwrap();

        let err = TreeSettings::load_with_prefix(Some(file.path()), "BINTREE_UNIT_UNSET")
            .unwrap_err();
        assert!(matches!(err, TreeError::Config { .. }));
    }

    #[test]
    fn given_env_vars_when_loading_then_env_wins_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "storage = \"allocated\"\ncapacity = 3").unwrap();
        std::env::set_var("BINTREE_UNIT_ENV_STORAGE", "caller_managed");
        std::env::set_var("BINTREE_UNIT_ENV_CAPACITY", "5");

        let settings =
            TreeSettings::load_with_prefix(Some(file.path()), "BINTREE_UNIT_ENV").unwrap();

        std::env::remove_var("BINTREE_UNIT_ENV_STORAGE");
        std::env::remove_var("BINTREE_UNIT_ENV_CAPACITY");
        assert_eq!(settings.storage, StorageMode::CallerManaged);
        assert_eq!(settings.capacity, Some(5));
    }

    #[test]
    fn test_to_toml_renders_effective_values() {
        let settings = TreeSettings {
            storage: StorageMode::CallerManaged,
            capacity: Some(4),
        };
        let rendered = settings.to_toml().unwrap();
        assert!(rendered.contains("storage = \"caller_managed\""));
        assert!(rendered.contains("capacity = 4"));
    }

    #[test]
    fn test_template_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&TreeSettings::template()).unwrap();
        assert!(raw.storage.is_none());
        assert!(raw.capacity.is_none());
    }
}
