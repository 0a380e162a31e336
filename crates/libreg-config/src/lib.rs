//! # libreg-config
//!
//! Layered configuration loading for libreg using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`LIBREG_*` prefix, `__` as separator)
//! 2. Project-level `libreg.toml`, or the file passed with `--config`
//! 3. User-level `~/.config/libreg/config.toml`
//! 4. Built-in defaults
//!
//! Figment maps `LIBREG_SCAN__MACRO_PREFIX` -> `scan.macro_prefix`,
//! `LIBREG_OUTPUT__ENTRY_POINT` -> `output.entry_point`, etc.
//!
//! ```no_run
//! use libreg_config::LibregConfig;
//!
//! let config = LibregConfig::load(None).expect("config");
//! println!("scanning for {}*", config.scan.macro_prefix);
//! ```

mod error;
mod output;
mod scan;

pub use error::ConfigError;
pub use output::OutputConfig;
pub use scan::ScanConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project-local config file looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "libreg.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LibregConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl LibregConfig {
    /// Load configuration from all sources.
    ///
    /// `project` replaces the default `libreg.toml` lookup and must exist.
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] for a missing explicit file,
    /// [`ConfigError::Figment`] when a source fails to parse, and
    /// [`ConfigError::InvalidValue`] when the merged values are unusable.
    pub fn load(project: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = project
            && !path.exists()
        {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        let config: Self = Self::figment(project).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the figment provider chain.
    #[must_use]
    pub fn figment(project: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        // Layer 2: Project-local config
        let local_path =
            project.map_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE), Path::to_path_buf);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("LIBREG_").split("__"))
    }

    /// Reject values the scanner or the generator cannot work with.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.macro_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "scan.macro_prefix".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.output.entry_point.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "output.entry_point".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("libreg").join("config.toml"))
    }
}
