//! Top-level function definitions reported to the session.
//!
//! Walks the `translation_unit` and every conditional-compilation block in
//! it, keeping definitions whose signature is `int name(<state_type> *)`.
//! Definitions opened by a `CF(name)` header macro are found from the
//! invocations instead, since the header is blanked before parsing.

use ast_grep_core::Node;

use crate::source::MacroInvocation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    /// 1-based line the definition starts on.
    pub line: u32,
    /// Byte offset the declaration is ordered by: the definition's start, or
    /// the end of the annotations on a `CF` header.
    pub offset: usize,
}

/// Collect function definitions in source order.
///
/// With `state_type == None` every definition is reported.
pub fn collect_functions<D: ast_grep_core::Doc>(
    root: &Node<D>,
    state_type: Option<&str>,
) -> Vec<FunctionDecl> {
    let mut functions = Vec::new();
    collect_into(root, state_type, &mut functions);
    functions
}

/// Definitions written as `CF(name)` followed by a body.
///
/// Each is reported on the header's line, after every annotation chained
/// onto the same header with only whitespace in between.
pub fn collect_cfunction_headers(
    text: &str,
    invocations: &[MacroInvocation],
    header_macro: &str,
) -> Vec<FunctionDecl> {
    let mut headers = Vec::new();
    for (idx, header) in invocations.iter().enumerate() {
        if header.name != header_macro {
            continue;
        }
        let name = header.args.trim();
        if !is_identifier(name) {
            continue;
        }

        let mut end = header.end;
        for next in &invocations[idx + 1..] {
            if !text[end..next.offset].trim().is_empty() {
                break;
            }
            end = next.end;
        }

        let line = text[..header.offset].matches('\n').count() + 1;
        headers.push(FunctionDecl {
            name: name.to_string(),
            line: u32::try_from(line).unwrap_or(u32::MAX),
            offset: end,
        });
    }
    headers
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn collect_into<D: ast_grep_core::Doc>(
    node: &Node<D>,
    state_type: Option<&str>,
    functions: &mut Vec<FunctionDecl>,
) {
    for child in node.children() {
        match child.kind().as_ref() {
            "function_definition" => {
                if let Some(decl) = function_decl(&child, state_type) {
                    functions.push(decl);
                }
            }
            "preproc_if" | "preproc_ifdef" | "preproc_else" | "preproc_elif"
            | "preproc_elifdef" | "linkage_specification" | "declaration_list" => {
                collect_into(&child, state_type, functions);
            }
            _ => {}
        }
    }
}

fn function_decl<D: ast_grep_core::Doc>(
    node: &Node<D>,
    state_type: Option<&str>,
) -> Option<FunctionDecl> {
    let declarator = find_function_declarator(node)?;
    let name = declarator
        .children()
        .find(|c| c.kind().as_ref() == "identifier")?
        .text()
        .to_string();

    if let Some(state_type) = state_type
        && !is_library_signature(node, &declarator, state_type)
    {
        tracing::trace!(function = %name, "signature filtered out");
        return None;
    }

    Some(FunctionDecl {
        name,
        line: u32::try_from(node.start_pos().line() + 1).unwrap_or(u32::MAX),
        offset: node.range().start,
    })
}

fn find_function_declarator<'r, D: ast_grep_core::Doc>(node: &Node<'r, D>) -> Option<Node<'r, D>> {
    for child in node.children() {
        match child.kind().as_ref() {
            "function_declarator" => return Some(child),
            "pointer_declarator" => {
                if let Some(found) = find_function_declarator(&child) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    None
}

/// `int name(<state_type> *)`.
fn is_library_signature<D: ast_grep_core::Doc>(
    definition: &Node<D>,
    declarator: &Node<D>,
    state_type: &str,
) -> bool {
    let returns_int = definition
        .children()
        .any(|c| c.kind().as_ref() == "primitive_type" && c.text().as_ref() == "int");
    let returns_pointer = definition
        .children()
        .any(|c| c.kind().as_ref() == "pointer_declarator");
    if !returns_int || returns_pointer {
        return false;
    }

    let Some(params) = declarator
        .children()
        .find(|c| c.kind().as_ref() == "parameter_list")
    else {
        return false;
    };
    let params: Vec<_> = params
        .children()
        .filter(|c| c.kind().as_ref() == "parameter_declaration")
        .collect();
    let [param] = params.as_slice() else {
        return false;
    };

    let type_matches = param.children().any(|c| match c.kind().as_ref() {
        "type_identifier" => c.text().as_ref() == state_type,
        "struct_specifier" => {
            c.text().as_ref().split_whitespace().collect::<Vec<_>>() == ["struct", state_type]
        }
        _ => false,
    });
    let single_pointer = param.children().any(|c| {
        matches!(
            c.kind().as_ref(),
            "pointer_declarator" | "abstract_pointer_declarator"
        ) && !c.children().any(|inner| {
            matches!(
                inner.kind().as_ref(),
                "pointer_declarator" | "abstract_pointer_declarator"
            )
        })
    });
    type_matches && single_pointer
}
