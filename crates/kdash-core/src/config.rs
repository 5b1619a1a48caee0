//! Configuration types.
//!
//! Table behavior can be tuned through `~/.config/kdash/table.toml`. Every
//! field is optional; missing fields fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Column id of the "age" column.
pub const DEFAULT_AGE_COLUMN: &str = "age";

/// Backend field the age column sorts on.
pub const DEFAULT_AGE_FIELD: &str = "creationTimestamp";

/// Runtime configuration for resource tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Milliseconds a fetch may take before the loading indicator shows.
    pub loading_delay_ms: u64,

    /// Column id of the age column (the default sort).
    pub age_column: String,

    /// Backend field the age column maps to.
    pub age_field: String,

    /// Items per page used when no settings collaborator overrides it.
    pub items_per_page: usize,

    /// Extra column id -> backend field mappings.
    pub field_mappings: BTreeMap<String, String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            loading_delay_ms: 100,
            age_column: DEFAULT_AGE_COLUMN.to_string(),
            age_field: DEFAULT_AGE_FIELD.to_string(),
            items_per_page: 10,
            field_mappings: BTreeMap::new(),
        }
    }
}

impl TableConfig {
    /// Flicker-avoidance delay as a `Duration`.
    pub fn loading_delay(&self) -> Duration {
        Duration::from_millis(self.loading_delay_ms)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&text)
    }

    /// Load from the default location, falling back to defaults.
    ///
    /// A missing file is not an error. An unreadable or invalid file is
    /// logged and ignored.
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            tracing::debug!("No config directory, using default table config");
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => {
                tracing::info!("Loaded table config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Get the path to table.toml.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("kdash/table.toml"))
}
