//! Generated file settings.

use serde::{Deserialize, Serialize};

fn default_entry_point() -> String {
    "Register_Lib".to_string()
}

fn default_register_prefix() -> String {
    "Register_".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Extra headers appended to the preamble.
    #[serde(default)]
    pub includes: Vec<String>,

    #[serde(default = "default_entry_point")]
    pub entry_point: String,

    #[serde(default = "default_register_prefix")]
    pub register_prefix: String,

    /// Leave `cdata` types out of the entry point.
    #[serde(default)]
    pub skip_foreign_registration: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            includes: Vec::new(),
            entry_point: default_entry_point(),
            register_prefix: default_register_prefix(),
            skip_foreign_registration: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = OutputConfig::default();
        assert!(config.includes.is_empty());
        assert_eq!(config.entry_point, "Register_Lib");
        assert_eq!(config.register_prefix, "Register_");
        assert!(!config.skip_foreign_registration);
    }
}
