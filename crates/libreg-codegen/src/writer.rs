//! Serializer from the symbol registry to registration source text.
//!
//! Output order: preamble, extern declarations, the `RecorderInfo` table,
//! one registration function per non-empty type group (first-encounter
//! order), and the entry point. Nothing is reordered, so identical registries
//! produce identical text.

use std::collections::HashSet;
use std::fmt::Write as _;

use libreg_core::{ObjectRecorderData, RecordEntry, RecorderCollection};

use crate::error::CodegenError;
use crate::options::{GeneratorOptions, RUNTIME_HEADERS};
use crate::push::{TableScope, push_statement};

const FOREIGN_MEMBER_SUFFIX: &str = "_cdata";

/// Render the registration source for `collection`.
///
/// # Errors
/// Returns [`CodegenError::InvalidIdentifier`] when `options` names are not
/// valid C identifiers.
pub fn generate(
    collection: &RecorderCollection,
    options: &GeneratorOptions,
) -> Result<String, CodegenError> {
    options.validate()?;
    let mut writer = LibRegWriter {
        collection,
        options,
        out: String::new(),
    };
    writer.write_all()?;
    Ok(writer.out)
}

struct LibRegWriter<'a> {
    collection: &'a RecorderCollection,
    options: &'a GeneratorOptions,
    out: String,
}

impl<'a> LibRegWriter<'a> {
    fn write_all(&mut self) -> Result<(), CodegenError> {
        let collection = self.collection;
        self.write_preamble()?;
        self.write_externs()?;
        self.write_recorder_info()?;

        for group in collection.objects() {
            if group.is_empty() {
                tracing::debug!(object = %group.name, "no functions, registration skipped");
                continue;
            }
            self.write_object_registration(group)?;
        }

        self.write_entry_point()
    }

    fn write_preamble(&mut self) -> Result<(), CodegenError> {
        writeln!(self.out, "// Generated by libreg. Do not edit.")?;
        writeln!(self.out, "extern \"C\"{{")?;
        for header in RUNTIME_HEADERS
            .iter()
            .copied()
            .chain(self.options.includes.iter().map(String::as_str))
        {
            writeln!(self.out, "#include \"{header}\"")?;
        }
        writeln!(self.out, "}}\n")?;
        Ok(())
    }

    /// Bound entries in function-id order.
    fn bound_entries(&self) -> Vec<&'a RecordEntry> {
        let collection: &'a RecorderCollection = self.collection;
        let mut entries: Vec<_> = collection
            .bound_entries()
            .map(|(_, entry)| entry)
            .collect();
        entries.sort_by_key(|entry| entry.function_id);
        entries
    }

    fn write_externs(&mut self) -> Result<(), CodegenError> {
        writeln!(self.out, "struct RecordFFData;")?;

        let mut declared: HashSet<&str> = HashSet::new();
        for entry in self.bound_entries() {
            writeln!(self.out, "extern int lj_cf_{}(lua_State* L);", entry.name)?;
            if entry.recorder_extern_needed() && declared.insert(entry.trace_recorder.as_str()) {
                writeln!(
                    self.out,
                    "extern void LJ_FASTCALL {}(jit_State *J, struct RecordFFData *rd);",
                    entry.trace_recorder
                )?;
            }
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn write_recorder_info(&mut self) -> Result<(), CodegenError> {
        let entries = self.bound_entries();
        if entries.is_empty() {
            return Ok(());
        }

        writeln!(self.out, "FunctionInfo RecorderInfo[] = {{")?;
        for entry in entries {
            writeln!(
                self.out,
                "  {{&{}, {}, \"{}\", &lj_cf_{}}},",
                entry.trace_recorder, entry.record_options, entry.name, entry.name
            )?;
        }
        writeln!(self.out, "}};\n")?;
        Ok(())
    }

    fn write_object_registration(
        &mut self,
        group: &ObjectRecorderData,
    ) -> Result<(), CodegenError> {
        let collection = self.collection;
        let flags_param = if group.needs_flag_arg {
            ", uint32_t flags"
        } else {
            ""
        };
        writeln!(
            self.out,
            "void {}{}(lua_State* L, GCtab* mtList, GCtab* membersList{flags_param}){{\n",
            self.options.register_prefix, group.name
        )?;
        writeln!(self.out, "  GCfunc* func;")?;
        writeln!(self.out, "  TValue* slot;")?;

        let has_meta = !group.meta_functions.is_empty();
        if group.needs_member_table {
            writeln!(self.out, "  GCtab* memberTable;")?;
        }
        if has_meta {
            writeln!(self.out, "  GCtab* metaTable;")?;
        }

        let mut pushed_tables = 0;
        if group.needs_member_table {
            let key = if group.is_foreign_data() {
                format!("{}{FOREIGN_MEMBER_SUFFIX}", group.name)
            } else {
                group.name.clone()
            };
            self.write_fetch_or_create(
                "memberTable",
                "membersList",
                &key,
                group.member_functions.len(),
            )?;
            pushed_tables += 1;
        }
        if has_meta {
            let owner = if group.is_foreign_data() {
                "tabV(registry(L))"
            } else {
                "mtList"
            };
            self.write_fetch_or_create(
                "metaTable",
                owner,
                &group.name,
                group.meta_functions.len(),
            )?;
            pushed_tables += 1;
        }

        for id in &group.member_functions {
            let entry = collection.entry(*id);
            let Some(function_id) = bound_function_id(entry) else {
                continue;
            };
            let name = entry.member_name();
            self.write_function_install(
                entry,
                function_id,
                "memberTable",
                name,
                TableScope::Object,
            )?;
        }
        for id in &group.meta_functions {
            let entry = collection.entry(*id);
            let Some(function_id) = bound_function_id(entry) else {
                continue;
            };
            let name = entry.member_name();
            self.write_function_install(
                entry,
                function_id,
                "metaTable",
                name,
                TableScope::Object,
            )?;
        }

        if pushed_tables > 0 {
            writeln!(self.out, "\n  L->top -= {pushed_tables};")?;
        }
        writeln!(self.out, "}}\n")?;

        tracing::debug!(
            object = %group.name,
            members = group.member_functions.len(),
            meta = group.meta_functions.len(),
            "registration function emitted"
        );
        Ok(())
    }

    /// Reuse the table stored under `key` in `owner`, or create and store
    /// it, then anchor it on the stack.
    fn write_fetch_or_create(
        &mut self,
        table: &str,
        owner: &str,
        key: &str,
        size: usize,
    ) -> Result<(), CodegenError> {
        writeln!(self.out)?;
        writeln!(self.out, "  slot = lj_tab_setstr(L, {owner}, lj_str_newz(L, \"{key}\"));")?;
        writeln!(self.out, "  if (tvistab(slot)) {{")?;
        writeln!(self.out, "    {table} = tabV(slot);")?;
        writeln!(self.out, "  }} else {{")?;
        writeln!(self.out, "    {table} = lj_tab_new(L, 0, hsize2hbits({size}));")?;
        writeln!(self.out, "    settabV(L, slot, {table});")?;
        writeln!(self.out, "  }}")?;
        writeln!(self.out, "  settabV(L, L->top++, {table});")?;
        Ok(())
    }

    fn write_function_install(
        &mut self,
        entry: &RecordEntry,
        function_id: u32,
        table: &str,
        install_name: &str,
        scope: TableScope,
    ) -> Result<(), CodegenError> {
        writeln!(self.out)?;
        let indent = if let Some(flag) = &entry.required_flag {
            writeln!(self.out, "  if (flags & ({flag})) {{")?;
            "    "
        } else {
            "  "
        };

        writeln!(
            self.out,
            "{indent}func = lj_func_newfastC(L, &RecorderInfo[{function_id}], {});",
            entry.push_stack.len()
        )?;
        for (slot, value) in entry.push_stack.iter().enumerate() {
            writeln!(self.out, "{indent}{}", push_statement(value, slot, scope))?;
        }
        writeln!(
            self.out,
            "{indent}slot = lj_tab_setstr(L, {table}, lj_str_newz(L, \"{install_name}\"));"
        )?;
        writeln!(self.out, "{indent}setfuncV(L, slot, func);")?;

        if entry.required_flag.is_some() {
            writeln!(self.out, "  }}")?;
        }
        Ok(())
    }

    fn write_entry_point(&mut self) -> Result<(), CodegenError> {
        let collection = self.collection;
        writeln!(
            self.out,
            "void {}(lua_State* L, GCtab* libTable, GCtab* mtList, GCtab* membersList, uint32_t flags){{\n",
            self.options.entry_point
        )?;

        let globals = collection.global_functions();
        if !globals.is_empty() {
            writeln!(self.out, "  GCfunc* func;")?;
            writeln!(self.out, "  TValue* slot;")?;
            for id in globals {
                let entry = collection.entry(*id);
                let Some(function_id) = bound_function_id(entry) else {
                    continue;
                };
                self.write_function_install(
                    entry,
                    function_id,
                    "libTable",
                    &entry.name,
                    TableScope::Library,
                )?;
            }
            writeln!(self.out)?;
        }

        for group in collection.objects() {
            if group.is_empty() {
                continue;
            }
            if group.is_foreign_data() && self.options.skip_foreign_registration {
                tracing::debug!(object = %group.name, "foreign-data type left to self-register");
                continue;
            }
            let flags_arg = if group.needs_flag_arg { ", flags" } else { "" };
            writeln!(
                self.out,
                "  {}{}(L, mtList, membersList{flags_arg});",
                self.options.register_prefix, group.name
            )?;
        }
        writeln!(self.out, "}}")?;
        Ok(())
    }
}

/// Groups and the global list only ever hold bound entries.
fn bound_function_id(entry: &RecordEntry) -> Option<u32> {
    debug_assert!(
        entry.function_id.is_some(),
        "unbound entry '{}' registered for installation",
        entry.name
    );
    if entry.function_id.is_none() {
        tracing::warn!(function = %entry.name, "skipping unbound entry");
    }
    entry.function_id
}
