//! C front end: turns one source file into the ordered event stream a
//! [`ScanSession`] consumes.
//!
//! Annotation invocations are found with the raw lexer and blanked out, as a
//! macro expanding to nothing would be. The blanked text is parsed with
//! ast-grep (tree-sitter C) for function definitions and struct layouts.
//! Both event kinds are then replayed in source order.

mod declarations;
mod fields;
mod invocations;

use std::path::Path;

use ast_grep_language::{LanguageExt, SupportLang};

pub use declarations::FunctionDecl;
pub use fields::{CField, CFieldIndex};

use crate::annotation::Keyword;
use crate::error::{AnnotationError, ParserError};
use crate::session::ScanSession;
use crate::source::{MacroInvocation, SourceFile};

/// Front-end settings.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Only `int f(<state_type> *)` definitions are reported; `None` reports all.
    pub state_type: Option<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            state_type: Some("lua_State".to_string()),
        }
    }
}

/// One event in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    Annotation(MacroInvocation),
    Malformed(AnnotationError),
    Function(FunctionDecl),
}

impl SourceEvent {
    const fn offset(&self) -> usize {
        match self {
            Self::Annotation(invocation) => invocation.offset,
            Self::Malformed(err) => err.offset(),
            Self::Function(decl) => decl.offset,
        }
    }
}

/// Everything extracted from one file.
#[derive(Debug, Default)]
pub struct ScannedFile {
    pub events: Vec<SourceEvent>,
    /// Structs defined in the file itself.
    pub types: CFieldIndex,
}

pub struct FrontEnd {
    options: ScanOptions,
    shared_types: CFieldIndex,
}

impl FrontEnd {
    #[must_use]
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            shared_types: CFieldIndex::new(),
        }
    }

    /// Make the structs of a header available to every file's field lookups.
    pub fn add_type_header(&mut self, source: &str) {
        self.shared_types.add_source(source);
    }

    /// Read and index a header from disk.
    ///
    /// # Errors
    /// Returns [`ParserError::Read`] if the header cannot be read.
    pub fn add_type_header_file(&mut self, path: &Path) -> Result<(), ParserError> {
        let source = std::fs::read_to_string(path).map_err(|source| ParserError::Read {
            path: path.display().to_string(),
            source,
        })?;
        self.add_type_header(&source);
        Ok(())
    }

    #[must_use]
    pub const fn shared_types(&self) -> &CFieldIndex {
        &self.shared_types
    }

    /// Extract the event stream of one file without applying it.
    #[must_use]
    pub fn extract(&self, text: &str, macro_prefix: &str) -> ScannedFile {
        let discovered = invocations::find_invocations(text, macro_prefix);
        let masked = invocations::mask_invocations(text, &discovered.invocations);
        let tree = SupportLang::C.ast_grep(&masked);
        let root = tree.root();

        let functions = declarations::collect_functions(&root, self.options.state_type.as_deref());
        let header_macro = format!("{macro_prefix}{}", Keyword::CFunction.as_str());
        let headers =
            declarations::collect_cfunction_headers(text, &discovered.invocations, &header_macro);
        let mut types = CFieldIndex::new();
        types.add_tree(&root);

        let mut events: Vec<SourceEvent> = discovered
            .invocations
            .into_iter()
            .map(SourceEvent::Annotation)
            .chain(discovered.malformed.into_iter().map(SourceEvent::Malformed))
            .chain(functions.into_iter().map(SourceEvent::Function))
            .chain(headers.into_iter().map(SourceEvent::Function))
            .collect();
        events.sort_by_key(SourceEvent::offset);

        ScannedFile { events, types }
    }

    /// Scan `file` into `session`: begin the file, replay its events, end it.
    pub fn scan(&self, session: &mut ScanSession, file: SourceFile) {
        let scanned = self.extract(file.text(), session.macro_prefix());
        let mut lookup = self.shared_types.clone();
        lookup.merge(&scanned.types);

        tracing::debug!(
            file = file.path(),
            events = scanned.events.len(),
            types = lookup.len(),
            "file extracted"
        );

        session.begin_file(file);
        for event in &scanned.events {
            match event {
                SourceEvent::Annotation(invocation) => session.on_annotation(invocation),
                SourceEvent::Malformed(err) => session.on_malformed_annotation(err),
                SourceEvent::Function(decl) => {
                    session.on_function_declared(&decl.name, decl.line, &lookup);
                }
            }
        }
        session.end_file();
    }

    /// Read `path` from disk and scan it.
    ///
    /// # Errors
    /// Returns [`ParserError::Read`] if the file cannot be read.
    pub fn scan_path(&self, session: &mut ScanSession, path: &Path) -> Result<(), ParserError> {
        let text = std::fs::read_to_string(path).map_err(|source| ParserError::Read {
            path: path.display().to_string(),
            source,
        })?;
        self.scan(session, SourceFile::new(path.display().to_string(), text));
        Ok(())
    }
}

impl Default for FrontEnd {
    fn default() -> Self {
        Self::new(ScanOptions::default())
    }
}
