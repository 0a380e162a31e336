//! The symbol registry shared by every file scanned in one run.
//!
//! Owns every finalized entry (valid or not, for diagnostics), the global
//! function list, and the per-type groups in first-encounter order. Holds the
//! single unbound-entry slot the correlator drains.

use indexmap::IndexMap;
use serde::Serialize;

use crate::entry::{EntryId, RecordEntry};
use crate::errors::RecordError;
use crate::object::{ObjectRecorderData, ObjectType};

#[derive(Debug, Default, Serialize)]
pub struct RecorderCollection {
    pub(crate) entries: Vec<RecordEntry>,
    pub(crate) global_functions: Vec<EntryId>,
    pub(crate) objects: IndexMap<String, ObjectRecorderData>,
    #[serde(skip)]
    pub(crate) unbound: Option<EntryId>,
    pub(crate) next_function_id: u32,
    #[serde(skip)]
    pub(crate) in_module: bool,
}

impl RecorderCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget per-file state. Entries and groups accumulate across files.
    pub fn new_source_file(&mut self) {
        self.in_module = false;
    }

    #[must_use]
    pub const fn in_module(&self) -> bool {
        self.in_module
    }

    /// Every finalized entry, in finalization order.
    #[must_use]
    pub fn entries(&self) -> &[RecordEntry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, id: EntryId) -> &RecordEntry {
        &self.entries[id.0]
    }

    pub fn entry_mut(&mut self, id: EntryId) -> &mut RecordEntry {
        &mut self.entries[id.0]
    }

    /// Entries bound to a declaration, in function-id order.
    pub fn bound_entries(&self) -> impl Iterator<Item = (EntryId, &RecordEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.function_id.is_some())
            .map(|(idx, entry)| (EntryId(idx), entry))
    }

    #[must_use]
    pub fn global_functions(&self) -> &[EntryId] {
        &self.global_functions
    }

    /// Groups in the order their owning type was first seen.
    pub fn objects(&self) -> impl Iterator<Item = &ObjectRecorderData> {
        self.objects.values()
    }

    #[must_use]
    pub fn object(&self, name: &str) -> Option<&ObjectRecorderData> {
        self.objects.get(name)
    }

    pub fn get_or_create_group(&mut self, name: &str) -> &mut ObjectRecorderData {
        self.objects
            .entry(name.to_string())
            .or_insert_with(|| ObjectRecorderData::new(name))
    }

    /// The entry finalized but not yet bound, if any.
    #[must_use]
    pub fn unbound(&self) -> Option<&RecordEntry> {
        self.unbound.map(|id| self.entry(id))
    }

    /// Number of entries bound so far; also the next function id.
    #[must_use]
    pub const fn function_count(&self) -> u32 {
        self.next_function_id
    }

    /// Handle a module declaration.
    ///
    /// The group is created even when `kind` is unknown; it then keeps its
    /// `Unknown` classification.
    ///
    /// # Errors
    /// Returns [`RecordError::InvalidModuleKind`] for kinds other than
    /// `userdata` and `cdata`.
    pub fn module_defined(&mut self, name: &str, kind: &str) -> Result<(), RecordError> {
        self.in_module = true;
        let group = self.get_or_create_group(name);

        let Some(object_type) = ObjectType::from_module_kind(kind) else {
            return Err(RecordError::InvalidModuleKind {
                name: name.to_string(),
                kind: kind.to_string(),
            });
        };
        group.object_type = object_type;
        tracing::debug!(module = name, kind, "module declared");
        Ok(())
    }

    /// Record a finished annotation and make it the unbound entry.
    ///
    /// Invalid entries are recorded and nothing more. Returns the id of the
    /// newly unbound entry.
    ///
    /// # Errors
    /// Returns [`RecordError::UnboundAnnotation`] when an earlier entry is
    /// still waiting for its function; that earlier entry keeps the slot.
    pub fn finalize(&mut self, entry: RecordEntry) -> Result<Option<EntryId>, RecordError> {
        let id = EntryId(self.entries.len());
        let valid = entry.valid;
        self.entries.push(entry);

        if !valid {
            tracing::debug!(entry = %id, "invalid annotation recorded");
            return Ok(None);
        }

        if let Some(existing) = self.unbound {
            return Err(RecordError::UnboundAnnotation {
                line: self.entry(existing).line,
            });
        }

        self.unbound = Some(id);
        Ok(Some(id))
    }

    /// Drop the unbound entry without binding it.
    pub fn discard_unbound(&mut self) -> Option<EntryId> {
        self.unbound.take()
    }

    /// False once any recorded entry has been invalidated.
    #[must_use]
    pub fn recorders_valid(&self) -> bool {
        self.entries.iter().all(|entry| entry.valid)
    }

    /// Place a bound entry in the global list or its owning type's group.
    ///
    /// Inside a module, a prefix that names no declared module makes the
    /// function global, so `print_banner` after `MODULE(Vec3, ...)` does not
    /// invent a `print` type.
    pub(crate) fn register_entry(&mut self, id: EntryId) -> Result<(), RecordError> {
        if !self.in_module {
            self.global_functions.push(id);
            return Ok(());
        }

        let entry = &self.entries[id.0];
        let Some(owner) = entry.owning_type() else {
            return Err(RecordError::MissingOwningType {
                name: entry.name.clone(),
            });
        };

        let Some(group) = self.objects.get_mut(owner) else {
            tracing::debug!(function = %entry.name, "prefix names no module, installed globally");
            self.global_functions.push(id);
            return Ok(());
        };

        if entry.is_meta_function() {
            group.add_meta_function(id, entry);
        } else {
            group.add_member_function(id, entry);
        }
        Ok(())
    }
}
