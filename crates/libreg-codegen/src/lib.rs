//! # libreg-codegen
//!
//! Renders the symbol registry collected by `libreg-parser` into C source
//! that creates every annotated function as a fast function and installs it
//! into its library, member or meta table.

pub mod error;
pub mod options;
pub mod push;
pub mod writer;

pub use error::CodegenError;
pub use options::GeneratorOptions;
pub use push::{TableScope, push_statement};
pub use writer::generate;
