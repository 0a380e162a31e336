//! Discovery of `<prefix>NAME(...)` invocations in raw C text.
//!
//! Comments and string literals are skipped by the lexer; preprocessor
//! directives (including continued lines) are skipped here so the macros'
//! own `#define`s are never mistaken for uses.

use crate::error::AnnotationError;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::source::MacroInvocation;

#[derive(Debug, Default)]
pub struct Discovered {
    pub invocations: Vec<MacroInvocation>,
    pub malformed: Vec<AnnotationError>,
}

pub fn find_invocations(text: &str, prefix: &str) -> Discovered {
    let tokens: Vec<Token<'_>> = Lexer::new(text).collect();
    let mut found = Discovered::default();
    let mut directive_end = None;
    let mut idx = 0;

    while idx < tokens.len() {
        let token = tokens[idx];

        if let Some(end) = directive_end {
            if token.offset < end {
                idx += 1;
                continue;
            }
            directive_end = None;
        }

        if token.is_punct('#') && starts_line(text, token.offset) {
            directive_end = Some(logical_line_end(text, token.offset));
            idx += 1;
            continue;
        }

        let is_candidate = token.kind == TokenKind::Identifier
            && token.text.starts_with(prefix)
            && tokens.get(idx + 1).is_some_and(|next| next.is_punct('('));
        if !is_candidate {
            idx += 1;
            continue;
        }

        let open = tokens[idx + 1];
        if let Some(close) = matching_paren(&tokens, idx + 1) {
            let close_token = tokens[close];
            found.invocations.push(MacroInvocation {
                name: token.text.to_string(),
                args: text[open.end()..close_token.offset].to_string(),
                offset: token.offset,
                args_offset: open.end(),
                end: close_token.end(),
            });
            idx = close + 1;
        } else {
            found.malformed.push(AnnotationError::UnterminatedInvocation {
                name: token.text.to_string(),
                offset: token.offset,
            });
            idx += 2;
        }
    }

    found
}

/// Replace every invocation with spaces, keeping line breaks so line
/// numbers in the masked text match the original.
pub fn mask_invocations(text: &str, invocations: &[MacroInvocation]) -> String {
    let mut bytes = text.as_bytes().to_vec();
    for invocation in invocations {
        for byte in &mut bytes[invocation.offset..invocation.end] {
            if *byte != b'\n' {
                *byte = b' ';
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn matching_paren(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate().skip(open) {
        if token.is_punct('(') {
            depth += 1;
        } else if token.is_punct(')') {
            depth -= 1;
            if depth == 0 {
                return Some(idx);
            }
        }
    }
    None
}

fn starts_line(text: &str, offset: usize) -> bool {
    let line_start = text[..offset].rfind('\n').map_or(0, |idx| idx + 1);
    text[line_start..offset].trim().is_empty()
}

/// End of a directive line, following backslash continuations.
fn logical_line_end(text: &str, offset: usize) -> usize {
    let bytes = text.as_bytes();
    let mut idx = offset;
    while idx < bytes.len() {
        if bytes[idx] == b'\n' {
            let continued = text[..idx].trim_end_matches('\r').ends_with('\\');
            if !continued {
                return idx;
            }
        }
        idx += 1;
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(text: &str) -> Vec<String> {
        find_invocations(text, "LJLIB_")
            .invocations
            .into_iter()
            .map(|inv| format!("{}({})", inv.name, inv.args))
            .collect()
    }

    #[test]
    fn finds_invocations_with_nested_parens() {
        assert_eq!(
            names("LJLIB_REC(math, f(a, b)) int Vec3_len(lua_State *L)"),
            vec!["LJLIB_REC(math, f(a, b))"]
        );
    }

    #[test]
    fn skips_comments_strings_and_directives() {
        let text = "\
#define LJLIB_REC(x)
#define LJLIB_PUSH(x) \\
    LJLIB_NOEXTERN(x)
/* LJLIB_REC(.) */
// LJLIB_REC(.)
const char *s = \"LJLIB_REC(.)\";
LJLIB_PUSH(top-1)
";
        assert_eq!(names(text), vec!["LJLIB_PUSH(top-1)"]);
    }

    #[test]
    fn records_offsets() {
        let text = "  LJLIB_PUSH(top-1)";
        let found = find_invocations(text, "LJLIB_");
        let inv = &found.invocations[0];
        assert_eq!(inv.offset, 2);
        assert_eq!(inv.args_offset, 13);
        assert_eq!(inv.end, text.len());
    }

    #[test]
    fn unterminated_invocation_is_malformed() {
        let found = find_invocations("LJLIB_REC(math, (a)", "LJLIB_");
        assert!(found.invocations.is_empty());
        assert_eq!(
            found.malformed,
            vec![AnnotationError::UnterminatedInvocation {
                name: "LJLIB_REC".into(),
                offset: 0
            }]
        );
    }

    #[test]
    fn identifiers_without_call_are_not_invocations() {
        assert!(names("int LJLIB_REC = 1;").is_empty());
    }

    #[test]
    fn masking_preserves_lines() {
        let text = "LJLIB_PUSH(\"a\"\n) int f(void)";
        let found = find_invocations(text, "LJLIB_");
        let masked = mask_invocations(text, &found.invocations);
        assert_eq!(masked, "              \n  int f(void)");
        assert_eq!(masked.len(), text.len());
    }
}
