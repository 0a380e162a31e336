//! Scan session: the explicit context every annotation and declaration
//! event is applied to.
//!
//! One session covers one run. Per-file state (aliases, module flag, pending
//! builder) is reset by [`ScanSession::begin_file`]; the registry and the
//! diagnostics accumulate across files.

use libreg_core::{
    Diagnostic, DiagnosticSink, Diagnostics, FieldLookup, RecordError, RecorderCollection,
    SourceLocation,
};

use crate::annotation::{AliasTable, Command, Keyword, parse_annotation};
use crate::builder::{EntryBuilder, NoExternSet};
use crate::error::AnnotationError;
use crate::source::{MacroInvocation, SourceFile};

pub struct ScanSession {
    macro_prefix: String,
    collection: RecorderCollection,
    builder: EntryBuilder,
    aliases: AliasTable,
    no_extern: NoExternSet,
    diagnostics: Diagnostics,
    file: Option<SourceFile>,
}

impl ScanSession {
    #[must_use]
    pub fn new(macro_prefix: impl Into<String>) -> Self {
        Self {
            macro_prefix: macro_prefix.into(),
            collection: RecorderCollection::new(),
            builder: EntryBuilder::new(),
            aliases: AliasTable::new(),
            no_extern: NoExternSet::default(),
            diagnostics: Diagnostics::new(),
            file: None,
        }
    }

    #[must_use]
    pub fn macro_prefix(&self) -> &str {
        &self.macro_prefix
    }

    #[must_use]
    pub const fn collection(&self) -> &RecorderCollection {
        &self.collection
    }

    #[must_use]
    pub const fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    #[must_use]
    pub const fn current_file(&self) -> Option<&SourceFile> {
        self.file.as_ref()
    }

    #[must_use]
    pub const fn builder(&self) -> &EntryBuilder {
        &self.builder
    }

    /// True while no entry is invalid and no error has been reported.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.collection.recorders_valid() && !self.diagnostics.has_errors()
    }

    pub fn into_parts(self) -> (RecorderCollection, Diagnostics) {
        (self.collection, self.diagnostics)
    }

    /// Start scanning `file`, closing the previous one if still open.
    pub fn begin_file(&mut self, file: SourceFile) {
        if self.file.is_some() {
            self.end_file();
        }
        tracing::debug!(file = file.path(), "scanning");
        self.aliases.clear();
        self.builder.reset();
        self.collection.new_source_file();
        self.file = Some(file);
    }

    /// Close the current file. An annotation still waiting for its function
    /// is reported and dropped.
    pub fn end_file(&mut self) {
        if let Some(id) = self.collection.discard_unbound() {
            let line = self.collection.entry(id).line;
            let err = RecordError::UnboundAnnotation { line };
            self.report_record_error(&err, line);
        }
    }

    /// Apply one annotation invocation.
    pub fn on_annotation(&mut self, invocation: &MacroInvocation) {
        let Some(keyword) = Keyword::from_macro_name(&invocation.name, &self.macro_prefix) else {
            tracing::debug!(name = %invocation.name, "ignoring unknown annotation");
            return;
        };
        let line = self.line_of(invocation.offset);

        match parse_annotation(
            keyword,
            &invocation.args,
            invocation.args_offset,
            &self.aliases,
        ) {
            Ok(command) => {
                tracing::debug!(keyword = keyword.as_str(), line, "annotation parsed");
                self.apply(command, invocation.offset, line);
            }
            Err(err) => {
                self.report_annotation_error(&err);
                self.builder.invalidate();
                if keyword.finalizes() {
                    self.builder.set_line(line);
                    self.finalize(line);
                }
            }
        }
    }

    /// Report a grammar problem found before the arguments could be parsed.
    pub fn on_malformed_annotation(&mut self, err: &AnnotationError) {
        self.report_annotation_error(err);
        self.builder.invalidate();
    }

    /// Handle a completed top-level function definition.
    ///
    /// A `CF` name never outlives the header it was given on.
    pub fn on_function_declared(&mut self, name: &str, line: u32, lookup: &dyn FieldLookup) {
        self.builder.clear_function_name();
        match self.collection.function_defined(name, line, lookup) {
            Ok(Some(id)) => {
                let entry = self.collection.entry_mut(id);
                if self.no_extern.contains(&entry.trace_recorder) {
                    entry.no_recorder_extern = true;
                }
            }
            Ok(None) => {}
            Err(err) => self.report_record_error(&err, line),
        }
    }

    fn apply(&mut self, command: Command, offset: usize, line: u32) {
        match command {
            Command::Module { name, kind } => {
                if let Err(err) = self.collection.module_defined(&name, &kind) {
                    let location = self.location(offset);
                    self.report(location, &err.to_string(), err.argument());
                }
            }
            Command::CFunction(name) => self.builder.set_function_name(name),
            Command::Alias { name, value } => {
                self.aliases.insert(name, value);
            }
            Command::Push(value) => self.builder.push(value),
            Command::NeedsFlag(flag) => self.builder.set_required_flag(flag),
            Command::NoExtern(name) => self.no_extern.insert(&name),
            Command::Record(form) => {
                self.builder.set_record(&form, line, &self.no_extern);
                self.finalize(line);
            }
            Command::FieldAccessor { kind, target } => {
                self.builder.set_field_accessor(kind, &target, line);
                self.finalize(line);
            }
        }
    }

    fn finalize(&mut self, line: u32) {
        let entry = self.builder.take();
        if let Err(err) = self.collection.finalize(entry) {
            self.report_record_error(&err, line);
        }
    }

    fn line_of(&self, offset: usize) -> u32 {
        self.file.as_ref().map_or(0, |file| file.line_of(offset))
    }

    fn location(&self, offset: usize) -> SourceLocation {
        self.file.as_ref().map_or_else(
            || SourceLocation::new("<input>", 0, 0),
            |file| file.location(offset),
        )
    }

    fn line_location(&self, line: u32) -> SourceLocation {
        let path = self.file.as_ref().map_or("<input>", SourceFile::path);
        SourceLocation::new(path, line, 1)
    }

    fn report_annotation_error(&mut self, err: &AnnotationError) {
        let location = self.location(err.offset());
        self.report(location, &err.to_string(), err.argument());
    }

    fn report_record_error(&mut self, err: &RecordError, line: u32) {
        let location = self.line_location(line);
        self.report(location, &err.to_string(), err.argument());
    }

    fn report(&mut self, location: SourceLocation, message: &str, argument: Option<&str>) {
        let mut diagnostic = Diagnostic::error(location, message);
        if let Some(argument) = argument {
            diagnostic = diagnostic.with_argument(argument);
        }
        self.diagnostics.report(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libreg_core::{EntryId, NoFieldLookup, ObjectType, PushEntry};
    use pretty_assertions::assert_eq;

    /// Feed `LJLIB_*` invocations by hand, mimicking the front end.
    struct Driver {
        session: ScanSession,
        text: String,
    }

    impl Driver {
        fn new(text: &str) -> Self {
            let mut session = ScanSession::new("LJLIB_");
            session.begin_file(SourceFile::new("test.c", text));
            Self {
                session,
                text: text.to_string(),
            }
        }

        /// Apply the `n`th (0-based) invocation of `name` in the text.
        fn annotate(&mut self, name: &str, n: usize) {
            let needle = format!("{name}(");
            let offset = self
                .text
                .match_indices(&needle)
                .nth(n)
                .map(|(idx, _)| idx)
                .expect("invocation present");
            let args_offset = offset + needle.len();
            let close = args_offset + self.text[args_offset..].find(')').expect("closing paren");
            let invocation = MacroInvocation {
                name: name.to_string(),
                args: self.text[args_offset..close].to_string(),
                offset,
                args_offset,
                end: close + 1,
            };
            self.session.on_annotation(&invocation);
        }

        fn declare(&mut self, name: &str, line: u32) {
            self.session.on_function_declared(name, line, &NoFieldLookup);
        }
    }

    #[test]
    fn push_then_rec_binds_with_pushes() {
        let mut d = Driver::new("LJLIB_PUSH(\"tag\") LJLIB_REC(.) int print_banner(lua_State *L)");
        d.annotate("LJLIB_PUSH", 0);
        d.annotate("LJLIB_REC", 0);
        d.declare("print_banner", 1);

        let reg = d.session.collection();
        let entry = reg.entry(EntryId(0));
        assert_eq!(entry.name, "print_banner");
        assert_eq!(entry.push_stack, vec![PushEntry::Str("tag".into())]);
        assert_eq!(reg.global_functions(), &[EntryId(0)]);
        assert!(d.session.is_clean());
    }

    #[test]
    fn alias_is_resolved_in_later_push() {
        let mut d = Driver::new("LJLIB_ALIAS(self, base+0)\nLJLIB_PUSH(self) LJLIB_REC(.)");
        d.annotate("LJLIB_ALIAS", 0);
        d.annotate("LJLIB_PUSH", 0);
        assert_eq!(d.session.builder().entry().push_stack, vec![PushEntry::StackBase(0)]);
    }

    #[test]
    fn aliases_do_not_survive_a_new_file() {
        let mut d = Driver::new("LJLIB_ALIAS(self, base+0)");
        d.annotate("LJLIB_ALIAS", 0);

        let text = "LJLIB_PUSH(self)";
        d.session.begin_file(SourceFile::new("next.c", text));
        d.text = text.to_string();
        d.annotate("LJLIB_PUSH", 0);

        let diag = d.session.diagnostics().iter().next().expect("diagnostic");
        assert_eq!(diag.argument.as_deref(), Some("self"));
        assert_eq!(diag.location.file, "next.c");
        assert!(!d.session.builder().entry().valid);
    }

    #[test]
    fn grammar_error_in_rec_finalizes_invalid_entry() {
        let mut d = Driver::new("LJLIB_REC(42) int f(lua_State *L)");
        d.annotate("LJLIB_REC", 0);

        let reg = d.session.collection();
        assert_eq!(reg.entries().len(), 1);
        assert!(!reg.entries()[0].valid);
        assert!(reg.unbound().is_none());
        assert!(d.session.builder().entry().valid);
        assert!(!d.session.is_clean());
    }

    #[test]
    fn grammar_error_location_points_into_arguments() {
        let mut d = Driver::new("\n  LJLIB_PUSH(top-x)");
        d.annotate("LJLIB_PUSH", 0);
        let diag = d.session.diagnostics().iter().next().expect("diagnostic");
        assert_eq!((diag.location.line, diag.location.column), (2, 18));
    }

    #[test]
    fn invalid_module_kind_is_reported() {
        let mut d = Driver::new("LJLIB_MODULE(Vec3, table)");
        d.annotate("LJLIB_MODULE", 0);
        assert_eq!(d.session.diagnostics().error_count(), 1);
        let group = d.session.collection().object("Vec3").expect("group");
        assert_eq!(group.object_type, ObjectType::Unknown);
    }

    #[test]
    fn second_rec_without_function_keeps_first() {
        let mut d = Driver::new("LJLIB_PUSH(\"a\") LJLIB_REC(.)\nLJLIB_REC(.) int Vec3_add(lua_State *L)");
        d.annotate("LJLIB_PUSH", 0);
        d.annotate("LJLIB_REC", 0);
        assert!(d.session.diagnostics().is_empty());

        d.annotate("LJLIB_REC", 1);
        assert_eq!(d.session.diagnostics().error_count(), 1);

        let reg = d.session.collection();
        let kept = reg.unbound().expect("first entry keeps the slot");
        assert_eq!(kept.line, 1);
        assert_eq!(kept.push_stack, vec![PushEntry::Str("a".into())]);
        assert_eq!(reg.entries().len(), 2);
        let diag = d.session.diagnostics().iter().next().expect("diagnostic");
        assert_eq!(diag.location.line, 2);
    }

    #[test]
    fn end_file_reports_dangling_annotation() {
        let mut d = Driver::new("int a;\nLJLIB_REC(.)");
        d.annotate("LJLIB_REC", 0);
        d.session.end_file();

        assert!(d.session.collection().unbound().is_none());
        let diag = d.session.diagnostics().iter().next().expect("diagnostic");
        assert_eq!(diag.location.line, 2);
    }

    #[test]
    fn noextern_after_rec_dot_applies_on_bind() {
        let mut d = Driver::new("LJLIB_NOEXTERN(Vec3_len) LJLIB_REC(.) int Vec3_len(lua_State *L)");
        d.annotate("LJLIB_NOEXTERN", 0);
        d.annotate("LJLIB_REC", 0);
        d.declare("Vec3_len", 1);
        assert!(d.session.collection().entry(EntryId(0)).no_recorder_extern);
    }

    #[test]
    fn cfunction_header_names_the_entry() {
        let mut d = Driver::new("LJLIB_CF(rawequal)\t\tLJLIB_REC(.)\n{ return 1; }");
        d.annotate("LJLIB_CF", 0);
        d.annotate("LJLIB_REC", 0);
        assert_eq!(
            d.session.collection().unbound().map(|e| e.trace_recorder.as_str()),
            Some("recff_rawequal")
        );
        d.declare("rawequal", 1);

        let reg = d.session.collection();
        let entry = reg.entry(EntryId(0));
        assert_eq!(entry.name, "rawequal");
        assert_eq!(entry.function_id, Some(0));
        assert_eq!(reg.global_functions(), &[EntryId(0)]);
        assert!(d.session.is_clean());
    }

    #[test]
    fn cfunction_name_without_rec_is_dropped_at_declaration() {
        let mut d = Driver::new("LJLIB_CF(plain)\n{ return 0; }\nLJLIB_REC(.) int other(lua_State *L)");
        d.annotate("LJLIB_CF", 0);
        d.declare("plain", 1);
        assert!(d.session.builder().entry().name.is_empty());

        d.annotate("LJLIB_REC", 0);
        d.declare("other", 3);
        assert_eq!(d.session.collection().entry(EntryId(0)).name, "other");
        assert!(d.session.is_clean());
    }

    #[test]
    fn unknown_prefixed_macros_are_ignored() {
        let mut d = Driver::new("LJLIB_ASM(Vec3_len)");
        d.annotate("LJLIB_ASM", 0);
        assert!(d.session.diagnostics().is_empty());
        assert!(d.session.collection().entries().is_empty());
    }
}
