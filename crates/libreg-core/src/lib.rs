//! # libreg-core
//!
//! Core types, the symbol registry, and declaration correlation for libreg.
//!
//! This crate provides the foundational types shared across all libreg crates:
//! - Push entries and record entries collected from annotations
//! - Per-type function groups (`ObjectRecorderData`)
//! - The session-wide symbol registry (`RecorderCollection`)
//! - Binding of a pending annotation to the function declared after it
//! - Diagnostics and the cross-cutting error taxonomy

pub mod correlator;
pub mod diagnostics;
pub mod entry;
pub mod errors;
pub mod object;
pub mod registry;

pub use correlator::{FieldInfo, FieldLookup, NoFieldLookup};
pub use diagnostics::{Diagnostic, DiagnosticSink, Diagnostics, Severity, SourceLocation};
pub use entry::{EntryId, PushEntry, RecordEntry, RecorderKind};
pub use errors::RecordError;
pub use object::{ObjectRecorderData, ObjectType};
pub use registry::RecorderCollection;
