//! Push entries and record entries collected from annotations.
//!
//! A `RecordEntry` accumulates everything the annotations in front of one
//! function say about it. It starts empty, is mutated by annotation handlers,
//! finalized into the registry as the single unbound entry, and finally bound
//! to the name of the function declared on the same line.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix shared by all generated trace recorder names.
pub const RECORDER_PREFIX: &str = "recff_";

/// Recorder placeholder for `REC(.)` before the function name is known.
pub const AUTO_RECORDER: &str = ".";

/// Generic recorders used by field accessor entries.
pub const GET_FIELD_RECORDER: &str = "recff_GetObjectField";
pub const SET_FIELD_RECORDER: &str = "recff_SetObjectField";

/// Marker separating the owning type from a meta-function name (`Vec3___index`).
pub const META_MARKER: &str = "___";

/// Index of an entry inside [`crate::RecorderCollection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub usize);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One value supplied to a registered function as an upvalue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PushEntry {
    /// A string literal (stored without its quotes, escapes untouched).
    Str(String),
    /// `top-N`: the stack slot N below the top at registration time.
    StackTop(i32),
    /// `base+N`: the stack slot N above the frame base.
    StackBase(i32),
    /// The member table of the owning type.
    MemberTable,
    /// The shared table holding every type's member table.
    StaticMemberTable,
    /// A metatable looked up by name.
    Metatable(String),
    /// A global looked up by name.
    Global(String),
}

impl PushEntry {
    /// Whether pushing this value requires the member table to exist.
    #[must_use]
    pub const fn needs_member_table(&self) -> bool {
        matches!(self, Self::MemberTable | Self::StaticMemberTable)
    }
}

/// Which recorder family an entry belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderKind {
    #[default]
    Default,
    GetField,
    SetField,
}

impl RecorderKind {
    #[must_use]
    pub const fn is_field_accessor(self) -> bool {
        matches!(self, Self::GetField | Self::SetField)
    }

    /// The generic recorder used once a field accessor is resolved.
    #[must_use]
    pub const fn field_recorder(self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::GetField => Some(GET_FIELD_RECORDER),
            Self::SetField => Some(SET_FIELD_RECORDER),
        }
    }
}

/// One pending or finalized function annotation.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    /// Assigned only once the entry is bound to a declaration.
    pub function_id: Option<u32>,
    /// Empty until bound.
    pub name: String,
    pub push_stack: Vec<PushEntry>,
    pub trace_recorder: String,
    pub record_options: String,
    pub required_flag: Option<String>,
    pub kind: RecorderKind,
    pub valid: bool,
    pub needs_members_table: bool,
    pub no_recorder_extern: bool,
    /// Source line of the finalizing annotation, 0 until finalized.
    pub line: u32,
}

impl Default for RecordEntry {
    fn default() -> Self {
        Self {
            function_id: None,
            name: String::new(),
            push_stack: Vec::new(),
            trace_recorder: String::new(),
            record_options: String::new(),
            required_flag: None,
            kind: RecorderKind::Default,
            valid: true,
            needs_members_table: false,
            no_recorder_extern: false,
            line: 0,
        }
    }
}

impl RecordEntry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a push value, tracking whether it needs the member table.
    pub fn push(&mut self, value: PushEntry) {
        if value.needs_member_table() {
            self.needs_members_table = true;
        }
        self.push_stack.push(value);
    }

    /// Bind the entry to its function name, completing a `REC(.)` recorder.
    pub fn set_function_name(&mut self, name: &str) {
        debug_assert!(
            self.name.is_empty() || self.name == name,
            "entry is already bound"
        );
        self.name = name.to_string();

        if !self.is_field_accessor() && self.trace_recorder == AUTO_RECORDER {
            self.trace_recorder = recorder_name(name);
        }
    }

    #[must_use]
    pub const fn is_field_accessor(&self) -> bool {
        self.kind.is_field_accessor()
    }

    /// A field accessor given only a field name, still waiting for the
    /// semantic lookup at bind time.
    #[must_use]
    pub fn needs_field_lookup(&self) -> bool {
        self.is_field_accessor() && self.trace_recorder.is_empty() && !self.record_options.is_empty()
    }

    /// Whether the recorder needs a forward declaration in the generated file.
    ///
    /// Field accessors share recorders declared by the runtime headers.
    #[must_use]
    pub const fn recorder_extern_needed(&self) -> bool {
        !(self.no_recorder_extern || self.is_field_accessor())
    }

    /// Prefix of the bound name before the first underscore.
    #[must_use]
    pub fn owning_type(&self) -> Option<&str> {
        owning_type_of(&self.name)
    }

    /// Name the function is installed under inside its owning type's tables.
    #[must_use]
    pub fn member_name(&self) -> &str {
        self.owning_type()
            .map_or(self.name.as_str(), |owner| &self.name[owner.len() + 1..])
    }

    /// Meta-functions carry the triple-underscore marker after the owning type.
    #[must_use]
    pub fn is_meta_function(&self) -> bool {
        self.owning_type()
            .is_some_and(|owner| self.name[owner.len()..].contains(META_MARKER))
    }

    /// Build the composite options of a field accessor entry.
    pub fn build_field_accessor(&mut self, object_type: &str, field_type: &str, field_offset: &str) {
        debug_assert!(self.is_field_accessor());

        self.record_options = format!(
            "{object_type}| (FieldTypeLookup<{field_type}>::fieldtype << 8)|({field_offset} << 16)"
        );
        if let Some(recorder) = self.kind.field_recorder() {
            self.trace_recorder = recorder.to_string();
        }
    }
}

/// `recff_<name>`.
#[must_use]
pub fn recorder_name(name: &str) -> String {
    format!("{RECORDER_PREFIX}{name}")
}

/// Prefix of `name` before the first underscore, if it has one.
#[must_use]
pub fn owning_type_of(name: &str) -> Option<&str> {
    name.split_once('_')
        .map(|(owner, _)| owner)
        .filter(|owner| !owner.is_empty())
}
