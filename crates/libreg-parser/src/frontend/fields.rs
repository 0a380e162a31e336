//! Struct field index answering `REC_GETFIELD` / `REC_SETFIELD` lookups.
//!
//! Built from `struct` and `typedef struct` definitions. Offsets follow a
//! natural-alignment LP64 model and are only reported while every preceding
//! field has a known size; otherwise the field is still found but its offset
//! is `None`.

use std::collections::HashMap;

use ast_grep_core::Node;
use ast_grep_language::{LanguageExt, SupportLang};
use libreg_core::{FieldInfo, FieldLookup};

const POINTER_LAYOUT: Layout = Layout { size: 8, align: 8 };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    size: usize,
    align: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CField {
    pub name: String,
    pub type_name: String,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct CFieldIndex {
    structs: HashMap<String, Vec<CField>>,
}

impl CFieldIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the struct definitions of one C source or header.
    #[must_use]
    pub fn from_source(source: &str) -> Self {
        let mut index = Self::new();
        index.add_source(source);
        index
    }

    pub fn add_source(&mut self, source: &str) {
        let tree = SupportLang::C.ast_grep(source);
        self.add_tree(&tree.root());
    }

    /// Index every struct reachable from `root`. Later definitions of the
    /// same name replace earlier ones.
    pub fn add_tree<D: ast_grep_core::Doc>(&mut self, root: &Node<D>) {
        for child in root.children() {
            match child.kind().as_ref() {
                "struct_specifier" => {
                    if let Some((tag, fields)) = struct_definition(&child) {
                        self.insert_named(tag, fields);
                    }
                }
                "type_definition" => self.add_typedef(&child),
                _ => {}
            }
            self.add_tree(&child);
        }
    }

    pub fn merge(&mut self, other: &Self) {
        for (name, fields) in &other.structs {
            self.structs.insert(name.clone(), fields.clone());
        }
    }

    #[must_use]
    pub fn fields(&self, type_name: &str) -> Option<&[CField]> {
        self.structs.get(type_name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.structs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }

    fn add_typedef<D: ast_grep_core::Doc>(&mut self, node: &Node<D>) {
        let Some(fields) = node
            .children()
            .filter(|c| c.kind().as_ref() == "struct_specifier")
            .find_map(|s| struct_definition(&s).map(|(_, fields)| fields))
        else {
            return;
        };
        for alias in node
            .children()
            .filter(|c| c.kind().as_ref() == "type_identifier")
        {
            self.structs.insert(alias.text().to_string(), fields.clone());
        }
    }

    fn insert_named(&mut self, tag: Option<String>, fields: Vec<CField>) {
        if let Some(tag) = tag {
            self.structs.insert(tag, fields);
        }
    }
}

impl FieldLookup for CFieldIndex {
    fn lookup_field(&self, owning_type: &str, field: &str) -> Option<FieldInfo> {
        let found = self
            .fields(owning_type)?
            .iter()
            .find(|f| f.name == field)?;
        Some(FieldInfo {
            type_name: found.type_name.clone(),
            offset: found.offset,
        })
    }
}

// ── Struct layout ──────────────────────────────────────────────────

/// Tag and fields of a `struct` with a body.
fn struct_definition<D: ast_grep_core::Doc>(
    node: &Node<D>,
) -> Option<(Option<String>, Vec<CField>)> {
    let body = node
        .children()
        .find(|c| c.kind().as_ref() == "field_declaration_list")?;
    let tag = node
        .children()
        .find(|c| c.kind().as_ref() == "type_identifier")
        .map(|n| n.text().to_string());

    let mut fields = Vec::new();
    let mut cursor = Some(0usize);
    for decl in body
        .children()
        .filter(|c| c.kind().as_ref() == "field_declaration")
    {
        let base_type = field_base_type(&decl);
        let is_bitfield = decl
            .children()
            .any(|c| c.kind().as_ref() == "bitfield_clause");

        for declarator in decl.children().filter(|c| {
            matches!(
                c.kind().as_ref(),
                "field_identifier" | "pointer_declarator" | "array_declarator"
            )
        }) {
            let Some(name) = find_field_identifier(&declarator) else {
                continue;
            };
            let shape = DeclaratorShape::of(&declarator);
            let type_name = base_type
                .as_deref()
                .map_or_else(String::new, |base| shape.spell(base));

            let layout = if is_bitfield {
                None
            } else {
                base_type.as_deref().and_then(|base| shape.layout(base))
            };
            let offset = match (cursor, layout) {
                (Some(at), Some(layout)) => {
                    let aligned = at.next_multiple_of(layout.align);
                    cursor = Some(aligned + layout.size);
                    Some(aligned)
                }
                _ => {
                    cursor = None;
                    None
                }
            };

            fields.push(CField {
                name,
                type_name,
                offset,
            });
        }
    }
    Some((tag, fields))
}

/// Type specifier of a field declaration, qualifiers included.
fn field_base_type<D: ast_grep_core::Doc>(decl: &Node<D>) -> Option<String> {
    let mut parts = Vec::new();
    for child in decl.children() {
        match child.kind().as_ref() {
            "type_qualifier" => parts.push(child.text().to_string()),
            "primitive_type" | "type_identifier" | "sized_type_specifier" => {
                parts.push(normalize_spaces(&child.text()));
            }
            "struct_specifier" | "union_specifier" | "enum_specifier" => {
                let has_body = child.children().any(|c| {
                    matches!(
                        c.kind().as_ref(),
                        "field_declaration_list" | "enumerator_list"
                    )
                });
                if has_body {
                    return None;
                }
                parts.push(normalize_spaces(&child.text()));
            }
            _ => {}
        }
    }
    (!parts.is_empty()).then(|| parts.join(" "))
}

fn find_field_identifier<D: ast_grep_core::Doc>(node: &Node<D>) -> Option<String> {
    if node.kind().as_ref() == "field_identifier" {
        return Some(node.text().to_string());
    }
    node.children().find_map(|child| find_field_identifier(&child))
}

/// Pointer depth and array extents wrapped around a field name.
#[derive(Debug, Default)]
struct DeclaratorShape {
    pointers: usize,
    extents: Vec<String>,
}

impl DeclaratorShape {
    fn of<D: ast_grep_core::Doc>(node: &Node<D>) -> Self {
        let mut shape = Self::default();
        let mut current = Some(node.clone());
        while let Some(node) = current.take() {
            match node.kind().as_ref() {
                "pointer_declarator" => shape.pointers += 1,
                "array_declarator" => {
                    let extent = node
                        .children()
                        .find(|c| {
                            !matches!(
                                c.kind().as_ref(),
                                "field_identifier"
                                    | "pointer_declarator"
                                    | "array_declarator"
                                    | "["
                                    | "]"
                            )
                        })
                        .map(|c| c.text().to_string())
                        .unwrap_or_default();
                    shape.extents.push(extent);
                }
                _ => break,
            }
            current = node.children().find(|c| {
                matches!(
                    c.kind().as_ref(),
                    "field_identifier" | "pointer_declarator" | "array_declarator"
                )
            });
        }
        shape
    }

    /// Source spelling of the field's type: `float`, `GCstr *`, `float[3]`.
    fn spell(&self, base: &str) -> String {
        let mut spelled = base.to_string();
        if self.pointers > 0 {
            spelled.push(' ');
            spelled.push_str(&"*".repeat(self.pointers));
        }
        for extent in &self.extents {
            spelled.push('[');
            spelled.push_str(extent);
            spelled.push(']');
        }
        spelled
    }

    fn layout(&self, base: &str) -> Option<Layout> {
        let element = if self.pointers > 0 {
            POINTER_LAYOUT
        } else {
            scalar_layout(base)?
        };
        let mut count = 1usize;
        for extent in &self.extents {
            count = count.checked_mul(parse_extent(extent)?)?;
        }
        Some(Layout {
            size: element.size.checked_mul(count)?,
            align: element.align,
        })
    }
}

fn parse_extent(text: &str) -> Option<usize> {
    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
    digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .map_or_else(|| digits.parse().ok(), |hex| usize::from_str_radix(hex, 16).ok())
}

fn scalar_layout(base: &str) -> Option<Layout> {
    let unqualified: Vec<&str> = base
        .split_whitespace()
        .filter(|word| !matches!(*word, "const" | "volatile" | "signed"))
        .collect();
    let (size, align) = match unqualified.join(" ").as_str() {
        "char" | "unsigned char" | "bool" | "_Bool" | "int8_t" | "uint8_t" => (1, 1),
        "short" | "short int" | "unsigned short" | "unsigned short int" | "int16_t"
        | "uint16_t" => (2, 2),
        "" | "int" | "unsigned" | "unsigned int" | "float" | "int32_t" | "uint32_t"
        | "BCLine" | "MSize" | "GCSize" => (4, 4),
        "long" | "long int" | "unsigned long" | "unsigned long int" | "long long"
        | "long long int" | "unsigned long long" | "unsigned long long int" | "double"
        | "int64_t" | "uint64_t" | "size_t" | "ssize_t" | "intptr_t" | "uintptr_t"
        | "ptrdiff_t" | "lua_Number" => (8, 8),
        _ => return None,
    };
    Some(Layout { size, align })
}

fn normalize_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
