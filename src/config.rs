use std::path::Path;

use macroquad::prelude::warn;

use crate::error::ConfigError;
use crate::model::FLUID_COLORS;

pub const DEFAULT_CONFIG_PATH: &str = "water_sort.toml";

/// Puzzle shape and search bound, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Filled containers in a generated puzzle, one color each.
    pub full_containers: usize,
    pub empty_containers: usize,
    /// Depth bound for the search tree.
    pub max_depth: usize,
    /// Fixed RNG seed, for reproducible puzzles.
    pub seed: Option<u64>,
    pub build_on_start: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            full_containers: 3,
            empty_containers: 2,
            max_depth: 6,
            seed: None,
            build_on_start: false,
        }
    }
}

impl SessionConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!("config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.full_containers == 0 || self.full_containers > FLUID_COLORS.len() {
            return Err(ConfigError::Validation(format!(
                "full_containers must be between 1 and {}",
                FLUID_COLORS.len()
            )));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Validation("max_depth must be > 0".into()));
        }
        Ok(())
    }
}
