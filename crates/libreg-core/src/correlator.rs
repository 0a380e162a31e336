//! Binding of the unbound entry to the function declared after it.
//!
//! An annotation and the function it describes must start on the same line.
//! Field accessors given only a field name are completed here through a
//! [`FieldLookup`] supplied by the front end.

use serde::{Deserialize, Serialize};

use crate::entry::{EntryId, RecordEntry};
use crate::errors::RecordError;
use crate::registry::RecorderCollection;

/// Resolved facts about a struct field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Field type as spelled in source (`float`, `GCstr *`).
    pub type_name: String,
    /// Byte offset inside the struct, when it can be determined.
    pub offset: Option<usize>,
}

/// Semantic query answered by the front end.
pub trait FieldLookup {
    fn lookup_field(&self, owning_type: &str, field: &str) -> Option<FieldInfo>;
}

impl<F> FieldLookup for F
where
    F: Fn(&str, &str) -> Option<FieldInfo>,
{
    fn lookup_field(&self, owning_type: &str, field: &str) -> Option<FieldInfo> {
        self(owning_type, field)
    }
}

/// Lookup that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFieldLookup;

impl FieldLookup for NoFieldLookup {
    fn lookup_field(&self, _owning_type: &str, _field: &str) -> Option<FieldInfo> {
        None
    }
}

impl RecorderCollection {
    /// Handle a completed top-level function declaration.
    ///
    /// Returns the bound entry, or `None` when no annotation was pending.
    /// The function id counter only advances on success.
    ///
    /// # Errors
    /// - [`RecordError::LineMismatch`]: the pending entry is discarded.
    /// - [`RecordError::FieldNotFound`] / [`RecordError::MissingOwningType`]:
    ///   the entry is bound but invalidated and left out of every group.
    pub fn function_defined(
        &mut self,
        name: &str,
        line: u32,
        lookup: &dyn FieldLookup,
    ) -> Result<Option<EntryId>, RecordError> {
        let Some(id) = self.unbound.take() else {
            return Ok(None);
        };

        let annotation_line = self.entry(id).line;
        if annotation_line != line {
            return Err(RecordError::LineMismatch {
                function: name.to_string(),
                function_line: line,
                annotation_line,
            });
        }

        let entry = self.entry_mut(id);
        entry.set_function_name(name);

        if entry.needs_field_lookup()
            && let Err(err) = resolve_field_accessor(entry, lookup)
        {
            entry.valid = false;
            return Err(err);
        }

        if let Err(err) = self.register_entry(id) {
            self.entry_mut(id).valid = false;
            return Err(err);
        }

        let function_id = self.next_function_id;
        self.next_function_id += 1;
        self.entry_mut(id).function_id = Some(function_id);

        tracing::debug!(function = name, function_id, line, "annotation bound");
        Ok(Some(id))
    }
}

fn resolve_field_accessor(
    entry: &mut RecordEntry,
    lookup: &dyn FieldLookup,
) -> Result<(), RecordError> {
    let Some(owner) = entry.owning_type().map(str::to_string) else {
        return Err(RecordError::MissingOwningType {
            name: entry.name.clone(),
        });
    };
    let field = entry.record_options.clone();

    let Some(info) = lookup.lookup_field(&owner, &field) else {
        return Err(RecordError::FieldNotFound {
            function: entry.name.clone(),
            object_type: owner,
            field,
        });
    };

    tracing::debug!(
        object_type = %owner,
        %field,
        field_type = %info.type_name,
        offset = ?info.offset,
        "field accessor resolved"
    );
    entry.build_field_accessor(&owner, &info.type_name, &format!("offsetof({owner}, {field})"));
    Ok(())
}
