//! Functions grouped by owning type.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entry::{EntryId, RecordEntry};

/// Classification of an owning type, set by a `MODULE` annotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    #[default]
    Unknown,
    Userdata,
    /// Foreign-data (`cdata`) objects.
    ForeignData,
}

impl ObjectType {
    /// Parse the kind argument of a module declaration.
    #[must_use]
    pub fn from_module_kind(kind: &str) -> Option<Self> {
        match kind {
            "userdata" => Some(Self::Userdata),
            "cdata" => Some(Self::ForeignData),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Userdata => "userdata",
            Self::ForeignData => "cdata",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The functions registered for one owning type.
///
/// `needs_flag_arg` and `needs_member_table` only ever go from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecorderData {
    pub name: String,
    pub object_type: ObjectType,
    pub member_functions: Vec<EntryId>,
    pub meta_functions: Vec<EntryId>,
    pub needs_flag_arg: bool,
    pub needs_member_table: bool,
}

impl ObjectRecorderData {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            object_type: ObjectType::Unknown,
            member_functions: Vec::new(),
            meta_functions: Vec::new(),
            needs_flag_arg: false,
            needs_member_table: false,
        }
    }

    pub fn add_member_function(&mut self, id: EntryId, entry: &RecordEntry) {
        self.member_functions.push(id);
        self.needs_member_table = true;
        self.function_added(entry);
    }

    pub fn add_meta_function(&mut self, id: EntryId, entry: &RecordEntry) {
        self.meta_functions.push(id);
        self.function_added(entry);
    }

    fn function_added(&mut self, entry: &RecordEntry) {
        if entry.required_flag.is_some() {
            self.needs_flag_arg = true;
        }
        if entry.needs_members_table {
            self.needs_member_table = true;
        }
    }

    #[must_use]
    pub const fn is_foreign_data(&self) -> bool {
        matches!(self.object_type, ObjectType::ForeignData)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.member_functions.is_empty() && self.meta_functions.is_empty()
    }

    /// Members first, then meta-functions.
    pub fn functions(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.member_functions
            .iter()
            .chain(self.meta_functions.iter())
            .copied()
    }
}
