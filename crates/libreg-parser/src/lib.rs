//! # libreg-parser
//!
//! Annotation scanning for libreg.
//!
//! - [`lexer`]: raw C tokens for annotation arguments and invocation discovery
//! - [`annotation`]: keyword dispatch and the per-keyword argument grammars
//! - [`builder`]: the pending entry between finalizing annotations
//! - [`session`]: the explicit scan context events are applied to
//! - [`frontend`]: ast-grep based C front end producing the event stream

pub mod annotation;
pub mod builder;
pub mod error;
pub mod frontend;
pub mod lexer;
pub mod session;
pub mod source;

pub use annotation::{AliasTable, Command, FieldTarget, Keyword, RecordForm, parse_annotation};
pub use builder::{EntryBuilder, NoExternSet};
pub use error::{AnnotationError, ParserError};
pub use frontend::{CFieldIndex, FrontEnd, ScanOptions, ScannedFile, SourceEvent};
pub use session::ScanSession;
pub use source::{MacroInvocation, SourceFile};
