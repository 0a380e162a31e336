//! The pending entry accumulated between two finalizing annotations.

use std::collections::HashSet;

use libreg_core::entry::{AUTO_RECORDER, RECORDER_PREFIX, recorder_name};
use libreg_core::{PushEntry, RecordEntry, RecorderKind};

use crate::annotation::{FieldTarget, RecordForm, pack_record_options};

/// Recorder names exempted from extern declarations by `NOEXTERN`.
#[derive(Debug, Clone, Default)]
pub struct NoExternSet {
    names: HashSet<String>,
}

impl NoExternSet {
    /// Register `name`, accepting both `foo` and `recff_foo`.
    pub fn insert(&mut self, name: &str) {
        let recorder = if name.starts_with(RECORDER_PREFIX) {
            name.to_string()
        } else {
            recorder_name(name)
        };
        self.names.insert(recorder);
    }

    #[must_use]
    pub fn contains(&self, recorder: &str) -> bool {
        self.names.contains(recorder)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct EntryBuilder {
    entry: RecordEntry,
}

impl EntryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn entry(&self) -> &RecordEntry {
        &self.entry
    }

    pub fn push(&mut self, value: PushEntry) {
        self.entry.push(value);
    }

    /// Name given by a `CF` header ahead of the declaration.
    pub fn set_function_name(&mut self, name: impl Into<String>) {
        self.entry.name = name.into();
    }

    pub fn clear_function_name(&mut self) {
        self.entry.name.clear();
    }

    pub fn set_required_flag(&mut self, flag: impl Into<String>) {
        self.entry.required_flag = Some(flag.into());
    }

    pub fn invalidate(&mut self) {
        self.entry.valid = false;
    }

    /// Record the line of the finalizing annotation.
    pub const fn set_line(&mut self, line: u32) {
        self.entry.line = line;
    }

    pub fn set_record(&mut self, form: &RecordForm, line: u32, no_extern: &NoExternSet) {
        let entry = &mut self.entry;
        entry.line = line;
        entry.kind = RecorderKind::Default;

        match form {
            RecordForm::Auto => {
                entry.trace_recorder = if entry.name.is_empty() {
                    AUTO_RECORDER.to_string()
                } else {
                    recorder_name(&entry.name)
                };
                entry.record_options = "0".to_string();
            }
            RecordForm::Named { recorder, options } => {
                entry.trace_recorder = recorder_name(recorder);
                entry.record_options = pack_record_options(options);
            }
            RecordForm::Templated { recorder } => {
                entry.trace_recorder.clone_from(recorder);
                entry.record_options = "0".to_string();
                entry.no_recorder_extern = true;
            }
        }

        if no_extern.contains(&entry.trace_recorder) {
            entry.no_recorder_extern = true;
        }
    }

    pub fn set_field_accessor(&mut self, kind: RecorderKind, target: &FieldTarget, line: u32) {
        self.entry.line = line;
        self.entry.kind = kind;

        match target {
            FieldTarget::Implicit { field } => {
                self.entry.trace_recorder.clear();
                self.entry.record_options.clone_from(field);
            }
            FieldTarget::Explicit {
                object_type,
                field_type,
                field_offset,
            } => self
                .entry
                .build_field_accessor(object_type, field_type, field_offset),
        }
    }

    /// Hand over the finished entry and start a fresh one.
    pub fn take(&mut self) -> RecordEntry {
        std::mem::take(&mut self.entry)
    }

    pub fn reset(&mut self) {
        self.entry = RecordEntry::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn no_extern_normalizes_prefix() {
        let mut set = NoExternSet::default();
        set.insert("vec_math");
        set.insert("recff_raw");
        assert!(set.contains("recff_vec_math"));
        assert!(set.contains("recff_raw"));
        assert!(!set.contains("recff_recff_raw"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn named_record_packs_options() {
        let mut builder = EntryBuilder::new();
        builder.set_record(
            &RecordForm::Named {
                recorder: "vec_math".into(),
                options: vec!["A".into(), "B".into()],
            },
            12,
            &NoExternSet::default(),
        );
        let entry = builder.take();
        assert_eq!(entry.trace_recorder, "recff_vec_math");
        assert_eq!(entry.record_options, "((B) << 16)|(A)");
        assert_eq!(entry.line, 12);
        assert!(!entry.no_recorder_extern);
    }

    #[test]
    fn auto_record_uses_placeholder() {
        let mut builder = EntryBuilder::new();
        builder.set_record(&RecordForm::Auto, 3, &NoExternSet::default());
        assert_eq!(builder.entry().trace_recorder, AUTO_RECORDER);
        assert_eq!(builder.entry().record_options, "0");
    }

    #[test]
    fn auto_record_with_known_name_derives_recorder() {
        let mut builder = EntryBuilder::new();
        builder.set_function_name("rawequal");
        builder.set_record(&RecordForm::Auto, 3, &NoExternSet::default());
        assert_eq!(builder.entry().trace_recorder, "recff_rawequal");
        assert_eq!(builder.entry().name, "rawequal");
    }

    #[test]
    fn no_extern_exempts_named_recorder() {
        let mut exempt = NoExternSet::default();
        exempt.insert("vec_math");
        let mut builder = EntryBuilder::new();
        builder.set_record(
            &RecordForm::Named {
                recorder: "vec_math".into(),
                options: Vec::new(),
            },
            1,
            &exempt,
        );
        assert!(builder.entry().no_recorder_extern);
    }

    #[test]
    fn templated_record_never_needs_extern() {
        let mut builder = EntryBuilder::new();
        builder.set_record(
            &RecordForm::Templated {
                recorder: "recff_generic<Vec3>".into(),
            },
            1,
            &NoExternSet::default(),
        );
        assert_eq!(builder.entry().trace_recorder, "recff_generic<Vec3>");
        assert!(!builder.entry().recorder_extern_needed());
    }

    #[test]
    fn implicit_field_accessor_waits_for_lookup() {
        let mut builder = EntryBuilder::new();
        builder.set_field_accessor(
            RecorderKind::GetField,
            &FieldTarget::Implicit { field: "x".into() },
            7,
        );
        let entry = builder.take();
        assert_eq!(entry.record_options, "x");
        assert!(entry.trace_recorder.is_empty());
        assert_eq!(entry.kind, RecorderKind::GetField);
    }

    #[test]
    fn take_resets_builder() {
        let mut builder = EntryBuilder::new();
        builder.push(PushEntry::MemberTable);
        builder.invalidate();
        let entry = builder.take();
        assert!(!entry.valid);
        assert!(builder.entry().valid);
        assert!(builder.entry().push_stack.is_empty());
    }
}
