//! Generator settings.

use crate::error::CodegenError;

/// Headers every generated file includes, in order.
pub const RUNTIME_HEADERS: [&str; 6] = [
    "lj_obj.h",
    "lj_str.h",
    "lj_tab.h",
    "lj_func.h",
    "lj_jit.h",
    "lj_ir.h",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Extra headers included after the runtime headers.
    pub includes: Vec<String>,
    /// Name of the top-level registration function.
    pub entry_point: String,
    /// Prefix of the per-type registration functions.
    pub register_prefix: String,
    /// Leave foreign-data (`cdata`) types out of the entry point; they are
    /// expected to register themselves.
    pub skip_foreign_registration: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            includes: Vec::new(),
            entry_point: "Register_Lib".to_string(),
            register_prefix: "Register_".to_string(),
            skip_foreign_registration: false,
        }
    }
}

impl GeneratorOptions {
    /// Check that the configured names produce valid C identifiers.
    ///
    /// # Errors
    /// Returns [`CodegenError::InvalidIdentifier`] for the first bad name.
    pub fn validate(&self) -> Result<(), CodegenError> {
        if !is_c_identifier(&self.entry_point) {
            return Err(CodegenError::InvalidIdentifier {
                what: "entry point",
                value: self.entry_point.clone(),
            });
        }
        // The prefix is completed by a type name, so it only has to start one.
        if !self.register_prefix.is_empty() && !is_c_identifier(&self.register_prefix) {
            return Err(CodegenError::InvalidIdentifier {
                what: "register prefix",
                value: self.register_prefix.clone(),
            });
        }
        Ok(())
    }
}

fn is_c_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
