//! Upvalue initialisation statements, one per push entry.

use libreg_core::PushEntry;

/// Where the function being installed lives, which decides what a
/// member-table reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableScope {
    /// Installed into the library table by the entry point.
    Library,
    /// Installed into an owning type's member or meta table.
    Object,
}

impl TableScope {
    const fn member_table(self) -> &'static str {
        match self {
            Self::Library => "libTable",
            Self::Object => "memberTable",
        }
    }
}

/// Statement storing `value` into upvalue `slot` of the `func` being built.
#[must_use]
pub fn push_statement(value: &PushEntry, slot: usize, scope: TableScope) -> String {
    let upvalue = format!("&func->c.upvalue[{slot}]");
    match value {
        PushEntry::Str(text) => format!("setstrV(L, {upvalue}, lj_str_newz(L, \"{text}\"));"),
        PushEntry::StackTop(n) => format!("copyTV(L, {upvalue}, L->top-{n});"),
        PushEntry::StackBase(n) => format!("copyTV(L, {upvalue}, L->base+{n});"),
        PushEntry::MemberTable => format!("settabV(L, {upvalue}, {});", scope.member_table()),
        PushEntry::StaticMemberTable => format!("settabV(L, {upvalue}, membersList);"),
        PushEntry::Metatable(name) => format!(
            "copyTV(L, {upvalue}, lj_tab_getstr(mtList, lj_str_newz(L, \"{name}\")));"
        ),
        PushEntry::Global(name) => format!(
            "copyTV(L, {upvalue}, lj_tab_getstr(tabref(L->env), lj_str_newz(L, \"{name}\")));"
        ),
    }
}
