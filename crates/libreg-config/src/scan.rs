//! Annotation scanning settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_macro_prefix() -> String {
    "LJLIB_".to_string()
}

fn default_state_type() -> String {
    "lua_State".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Prefix shared by every annotation macro name.
    #[serde(default = "default_macro_prefix")]
    pub macro_prefix: String,

    /// Only functions taking a single pointer to this type are reported.
    /// Empty reports every top-level function definition.
    #[serde(default = "default_state_type")]
    pub state_type: String,

    /// Headers parsed only to answer field lookups.
    #[serde(default)]
    pub type_headers: Vec<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            macro_prefix: default_macro_prefix(),
            state_type: default_state_type(),
            type_headers: Vec::new(),
        }
    }
}

impl ScanConfig {
    /// The signature filter, `None` when every function is reported.
    #[must_use]
    pub fn state_type_filter(&self) -> Option<&str> {
        (!self.state_type.is_empty()).then_some(self.state_type.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = ScanConfig::default();
        assert_eq!(config.macro_prefix, "LJLIB_");
        assert_eq!(config.state_type_filter(), Some("lua_State"));
        assert!(config.type_headers.is_empty());
    }

    #[test]
    fn empty_state_type_disables_filter() {
        let config = ScanConfig {
            state_type: String::new(),
            ..ScanConfig::default()
        };
        assert_eq!(config.state_type_filter(), None);
    }
}
