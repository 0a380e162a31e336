//! Annotation keywords and their argument grammars.
//!
//! Each `<prefix>KEYWORD(...)` invocation is parsed into a [`Command`]. The
//! parser is purely syntactic apart from alias resolution; applying a command
//! to the pending entry and the registry is the session's job.

use std::collections::HashMap;

use libreg_core::{PushEntry, RecorderKind};

use crate::error::AnnotationError;
use crate::lexer::{Lexer, Token, TokenKind};

/// Named push values defined by `ALIAS`, scoped to one source file.
pub type AliasTable = HashMap<String, PushEntry>;

/// Maximum number of `REC` option expressions.
pub const MAX_RECORD_OPTIONS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Module,
    /// `CF(name)`: the macro that expands to a library function's header.
    CFunction,
    Alias,
    Push,
    NeedsFlag,
    NoExtern,
    Rec,
    RecGetField,
    RecSetField,
}

impl Keyword {
    const ALL: [Self; 9] = [
        Self::Module,
        Self::CFunction,
        Self::Alias,
        Self::Push,
        Self::NeedsFlag,
        Self::NoExtern,
        Self::Rec,
        Self::RecGetField,
        Self::RecSetField,
    ];

    /// Resolve a full macro name such as `LJLIB_REC` against `prefix`.
    #[must_use]
    pub fn from_macro_name(name: &str, prefix: &str) -> Option<Self> {
        let suffix = name.strip_prefix(prefix)?;
        Self::ALL.into_iter().find(|kw| kw.as_str() == suffix)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Module => "MODULE",
            Self::CFunction => "CF",
            Self::Alias => "ALIAS",
            Self::Push => "PUSH",
            Self::NeedsFlag => "NEEDSFLAG",
            Self::NoExtern => "NOEXTERN",
            Self::Rec => "REC",
            Self::RecGetField => "REC_GETFIELD",
            Self::RecSetField => "REC_SETFIELD",
        }
    }

    /// Keywords that complete the pending entry.
    #[must_use]
    pub const fn finalizes(self) -> bool {
        matches!(self, Self::Rec | Self::RecGetField | Self::RecSetField)
    }
}

/// How a `REC` annotation names its trace recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordForm {
    /// `REC(.)`: derived from the function name.
    Auto,
    /// `REC(name[, opt...])`.
    Named {
        recorder: String,
        options: Vec<String>,
    },
    /// `REC(&name<args>)`: taken verbatim.
    Templated { recorder: String },
}

/// Target of a `REC_GETFIELD` / `REC_SETFIELD` annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTarget {
    /// Only the field is named; type and offset are looked up at bind time.
    Implicit { field: String },
    Explicit {
        object_type: String,
        field_type: String,
        field_offset: String,
    },
}

/// A parsed annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Module { name: String, kind: String },
    CFunction(String),
    Alias { name: String, value: PushEntry },
    Push(PushEntry),
    NeedsFlag(String),
    NoExtern(String),
    Record(RecordForm),
    FieldAccessor {
        kind: RecorderKind,
        target: FieldTarget,
    },
}

/// Parse the argument text of one annotation.
///
/// `base_offset` is the absolute offset of `args` in its file; every error
/// carries an offset in that coordinate space.
///
/// # Errors
/// Returns the first grammar violation found.
pub fn parse_annotation(
    keyword: Keyword,
    args: &str,
    base_offset: usize,
    aliases: &AliasTable,
) -> Result<Command, AnnotationError> {
    let mut parser = AnnotationParser::new(args, base_offset, aliases);
    let command = match keyword {
        Keyword::Module => {
            let name = parser.expect_identifier("module name")?;
            parser.expect_punct(',', "',' after module name")?;
            let kind = parser.expect_identifier("module kind")?;
            Command::Module {
                name: name.text.to_string(),
                kind: kind.text.to_string(),
            }
        }
        Keyword::CFunction => {
            Command::CFunction(parser.expect_identifier("function name")?.text.to_string())
        }
        Keyword::Alias => {
            let name = parser.expect_identifier("alias name")?;
            parser.expect_punct(',', "',' after alias name")?;
            let value = parser.parse_push_value()?;
            Command::Alias {
                name: name.text.to_string(),
                value,
            }
        }
        Keyword::Push => Command::Push(parser.parse_push_value()?),
        Keyword::NeedsFlag => {
            Command::NeedsFlag(parser.expect_identifier("flag name")?.text.to_string())
        }
        Keyword::NoExtern => {
            Command::NoExtern(parser.expect_identifier("recorder name")?.text.to_string())
        }
        Keyword::Rec => Command::Record(parser.parse_record()?),
        Keyword::RecGetField => Command::FieldAccessor {
            kind: RecorderKind::GetField,
            target: parser.parse_field_target()?,
        },
        Keyword::RecSetField => Command::FieldAccessor {
            kind: RecorderKind::SetField,
            target: parser.parse_field_target()?,
        },
    };
    parser.expect_end()?;
    Ok(command)
}

/// Pack `REC` option expressions into one options expression.
///
/// One option is used verbatim, two are packed as `(b << 16) | a`, three or
/// four occupy 4-bit slots. No options packs to `"0"`.
#[must_use]
pub fn pack_record_options(options: &[String]) -> String {
    match options {
        [] => "0".to_string(),
        [only] => only.clone(),
        [first, second] => format!("(({second}) << 16)|({first})"),
        _ => options
            .iter()
            .enumerate()
            .map(|(idx, opt)| {
                if idx == 0 {
                    format!("({opt})")
                } else {
                    format!("(({opt}) << {})", idx * 4)
                }
            })
            .collect::<Vec<_>>()
            .join("|"),
    }
}

struct AnnotationParser<'a> {
    source: &'a str,
    base: usize,
    tokens: Vec<Token<'a>>,
    pos: usize,
    aliases: &'a AliasTable,
}

impl<'a> AnnotationParser<'a> {
    fn new(source: &'a str, base: usize, aliases: &'a AliasTable) -> Self {
        Self {
            source,
            base,
            tokens: Lexer::with_base_offset(source, base).collect(),
            pos: 0,
            aliases,
        }
    }

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).copied()?;
        self.pos += 1;
        Some(token)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    const fn end_offset(&self) -> usize {
        self.base + self.source.len()
    }

    fn expected(&self, expected: &'static str, found: Option<&Token<'a>>) -> AnnotationError {
        match found {
            Some(token) => AnnotationError::Expected {
                expected,
                found: format!("'{}'", token.text),
                offset: token.offset,
            },
            None => AnnotationError::Expected {
                expected,
                found: "end of annotation".to_string(),
                offset: self.end_offset(),
            },
        }
    }

    fn expect_identifier(&mut self, what: &'static str) -> Result<Token<'a>, AnnotationError> {
        match self.bump() {
            Some(token) if token.is_identifier() => Ok(token),
            other => Err(self.expected(what, other.as_ref())),
        }
    }

    fn expect_punct(&mut self, ch: char, what: &'static str) -> Result<Token<'a>, AnnotationError> {
        match self.bump() {
            Some(token) if token.is_punct(ch) => Ok(token),
            other => Err(self.expected(what, other.as_ref())),
        }
    }

    fn expect_end(&self) -> Result<(), AnnotationError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(self.expected("end of annotation", Some(token))),
        }
    }

    // ── Push values ────────────────────────────────────────────────

    fn parse_push_value(&mut self) -> Result<PushEntry, AnnotationError> {
        let Some(token) = self.bump() else {
            return Err(self.expected("push value", None));
        };

        match token.kind {
            TokenKind::StringLiteral => Ok(PushEntry::Str(token.string_value().to_string())),
            TokenKind::Identifier => match token.text {
                "top" => {
                    self.expect_punct('-', "'-' after 'top'")?;
                    Ok(PushEntry::StackTop(self.expect_stack_offset()?))
                }
                "base" => {
                    self.expect_punct('+', "'+' after 'base'")?;
                    Ok(PushEntry::StackBase(self.expect_stack_offset()?))
                }
                "MemberList" => Ok(PushEntry::MemberTable),
                "StaticMemberList" => Ok(PushEntry::StaticMemberTable),
                "MT" => {
                    self.expect_punct(',', "',' after 'MT'")?;
                    let target = self.expect_identifier("metatable name")?;
                    Ok(PushEntry::Metatable(target.text.to_string()))
                }
                "Global" => {
                    self.expect_punct(',', "',' after 'Global'")?;
                    let target = self.expect_identifier("global name")?;
                    Ok(PushEntry::Global(target.text.to_string()))
                }
                alias => self.aliases.get(alias).cloned().ok_or_else(|| {
                    AnnotationError::UnknownAlias {
                        name: alias.to_string(),
                        offset: token.offset,
                    }
                }),
            },
            _ => Err(self.expected("push value", Some(&token))),
        }
    }

    fn expect_stack_offset(&mut self) -> Result<i32, AnnotationError> {
        match self.bump() {
            Some(token) if token.kind == TokenKind::Number => {
                token
                    .text
                    .parse()
                    .map_err(|_| AnnotationError::InvalidOffset {
                        text: token.text.to_string(),
                        offset: token.offset,
                    })
            }
            other => Err(self.expected("integer stack offset", other.as_ref())),
        }
    }

    // ── REC ────────────────────────────────────────────────────────

    fn parse_record(&mut self) -> Result<RecordForm, AnnotationError> {
        let Some(token) = self.bump() else {
            return Err(self.expected("'.', '&' or a recorder name", None));
        };

        match token.kind {
            TokenKind::Punct('.') => Ok(RecordForm::Auto),
            TokenKind::Punct('&') => {
                let name = self.expect_identifier("recorder name after '&'")?;
                let mut recorder = name.text.to_string();
                if self.peek().is_some_and(|t| t.is_punct('<')) {
                    recorder.push_str(self.take_template_arguments()?);
                }
                Ok(RecordForm::Templated { recorder })
            }
            TokenKind::Identifier => {
                let recorder = token.text.to_string();
                if self.at_end() {
                    return Ok(RecordForm::Named {
                        recorder,
                        options: Vec::new(),
                    });
                }
                self.expect_punct(',', "',' after recorder name")?;
                let options = self.parse_record_options()?;
                Ok(RecordForm::Named { recorder, options })
            }
            _ => Err(self.expected("'.', '&' or a recorder name", Some(&token))),
        }
    }

    /// `<...>` following a templated recorder, returned as source text.
    fn take_template_arguments(&mut self) -> Result<&'a str, AnnotationError> {
        let Some(open) = self.bump() else {
            return Err(self.expected("'<'", None));
        };
        let mut depth = 1usize;
        while let Some(token) = self.bump() {
            if token.is_punct('<') {
                depth += 1;
            } else if token.is_punct('>') {
                depth -= 1;
                if depth == 0 {
                    return Ok(self.slice(open.offset, token.end()));
                }
            }
        }
        Err(AnnotationError::Unbalanced {
            offset: open.offset,
        })
    }

    /// Comma-separated option expressions; commas nested in brackets do not split.
    fn parse_record_options(&mut self) -> Result<Vec<String>, AnnotationError> {
        let mut options = Vec::new();
        let mut open_brackets: Vec<Token<'a>> = Vec::new();
        let mut current: Option<(usize, usize)> = None;
        let mut separator_offset = self
            .tokens
            .get(self.pos.saturating_sub(1))
            .map_or(self.base, |t| t.offset);

        while let Some(token) = self.bump() {
            if open_brackets.is_empty() && token.is_punct(',') {
                options.push(self.finish_option(current.take(), separator_offset)?);
                separator_offset = token.offset;
                continue;
            }

            match token.kind {
                TokenKind::Punct('(' | '[' | '{') => open_brackets.push(token),
                TokenKind::Punct(close @ (')' | ']' | '}')) => {
                    let opener = open_brackets.pop();
                    if opener.is_none_or(|open| closing_bracket(&open) != Some(close)) {
                        return Err(AnnotationError::Unbalanced {
                            offset: token.offset,
                        });
                    }
                }
                _ => {}
            }

            current = Some(match current {
                Some((start, _)) => (start, token.end()),
                None => (token.offset, token.end()),
            });
        }

        if let Some(open) = open_brackets.first() {
            return Err(AnnotationError::Unbalanced {
                offset: open.offset,
            });
        }
        options.push(self.finish_option(current, separator_offset)?);

        if options.len() > MAX_RECORD_OPTIONS {
            return Err(AnnotationError::TooManyOptions {
                count: options.len(),
                offset: self.base,
            });
        }
        Ok(options)
    }

    fn finish_option(
        &self,
        span: Option<(usize, usize)>,
        separator_offset: usize,
    ) -> Result<String, AnnotationError> {
        span.map(|(start, end)| self.slice(start, end).to_string())
            .ok_or(AnnotationError::EmptyOption {
                offset: separator_offset,
            })
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.source[start - self.base..end - self.base]
    }

    // ── REC_GETFIELD / REC_SETFIELD ───────────────────────────────

    fn parse_field_target(&mut self) -> Result<FieldTarget, AnnotationError> {
        let first = self.expect_identifier("field or type name")?;
        if self.at_end() {
            return Ok(FieldTarget::Implicit {
                field: first.text.to_string(),
            });
        }

        self.expect_punct(',', "',' after type name")?;
        let field_type = self.expect_identifier("field type")?;
        self.expect_punct(',', "',' after field type")?;
        let field_offset = match self.bump() {
            Some(token) if matches!(token.kind, TokenKind::Identifier | TokenKind::Number) => token,
            other => return Err(self.expected("field offset", other.as_ref())),
        };

        Ok(FieldTarget::Explicit {
            object_type: first.text.to_string(),
            field_type: field_type.text.to_string(),
            field_offset: field_offset.text.to_string(),
        })
    }
}

const fn closing_bracket(open: &Token<'_>) -> Option<char> {
    match open.kind {
        TokenKind::Punct('(') => Some(')'),
        TokenKind::Punct('[') => Some(']'),
        TokenKind::Punct('{') => Some('}'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(keyword: Keyword, args: &str) -> Result<Command, AnnotationError> {
        parse_annotation(keyword, args, 0, &AliasTable::new())
    }

    fn options(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[rstest]
    #[case("LJLIB_MODULE", Some(Keyword::Module))]
    #[case("LJLIB_REC", Some(Keyword::Rec))]
    #[case("LJLIB_REC_GETFIELD", Some(Keyword::RecGetField))]
    #[case("LJLIB_NOEXTERN", Some(Keyword::NoExtern))]
    #[case("LJLIB_CF", Some(Keyword::CFunction))]
    #[case("LJLIB_ASM", None)]
    #[case("MODULE", None)]
    fn keyword_lookup(#[case] name: &str, #[case] expected: Option<Keyword>) {
        assert_eq!(Keyword::from_macro_name(name, "LJLIB_"), expected);
    }

    #[rstest]
    #[case(r#""hello""#, PushEntry::Str("hello".into()))]
    #[case("top-1", PushEntry::StackTop(1))]
    #[case("base+2", PushEntry::StackBase(2))]
    #[case("MemberList", PushEntry::MemberTable)]
    #[case("StaticMemberList", PushEntry::StaticMemberTable)]
    #[case("MT, Vec3", PushEntry::Metatable("Vec3".into()))]
    #[case("Global, print", PushEntry::Global("print".into()))]
    fn push_values(#[case] args: &str, #[case] expected: PushEntry) {
        assert_eq!(parse(Keyword::Push, args), Ok(Command::Push(expected)));
    }

    #[test]
    fn cfunction_names_the_function() {
        assert_eq!(
            parse(Keyword::CFunction, " rawequal "),
            Ok(Command::CFunction("rawequal".into()))
        );
        assert!(parse(Keyword::CFunction, "").is_err());
        assert!(parse(Keyword::CFunction, "a, b").is_err());
    }

    #[test]
    fn push_resolves_alias() {
        let mut aliases = AliasTable::new();
        aliases.insert("self".into(), PushEntry::StackBase(0));
        let cmd = parse_annotation(Keyword::Push, "self", 0, &aliases);
        assert_eq!(cmd, Ok(Command::Push(PushEntry::StackBase(0))));
    }

    #[test]
    fn unknown_alias_points_at_identifier() {
        let err = parse_annotation(Keyword::Push, "  nope", 40, &AliasTable::new());
        assert_eq!(
            err,
            Err(AnnotationError::UnknownAlias {
                name: "nope".into(),
                offset: 42
            })
        );
    }

    #[test]
    fn push_rejects_trailing_tokens() {
        let err = parse(Keyword::Push, "top-1 extra").expect_err("trailing");
        assert!(matches!(err, AnnotationError::Expected { offset: 6, .. }));
    }

    #[test]
    fn stack_offset_must_be_integer() {
        let err = parse(Keyword::Push, "top-x").expect_err("not a number");
        assert!(matches!(err, AnnotationError::Expected { .. }));
        let err = parse(Keyword::Push, "top-1.5").expect_err("not an integer");
        assert!(matches!(err, AnnotationError::InvalidOffset { .. }));
    }

    #[test]
    fn alias_binds_push_value() {
        assert_eq!(
            parse(Keyword::Alias, "upv, top-2"),
            Ok(Command::Alias {
                name: "upv".into(),
                value: PushEntry::StackTop(2)
            })
        );
    }

    #[test]
    fn module_takes_two_identifiers() {
        assert_eq!(
            parse(Keyword::Module, "Vec3, userdata"),
            Ok(Command::Module {
                name: "Vec3".into(),
                kind: "userdata".into()
            })
        );
        assert!(parse(Keyword::Module, "Vec3").is_err());
    }

    #[test]
    fn needsflag_accepts_exactly_one_identifier() {
        assert_eq!(
            parse(Keyword::NeedsFlag, "JIT_F_SSE4"),
            Ok(Command::NeedsFlag("JIT_F_SSE4".into()))
        );
        assert!(parse(Keyword::NeedsFlag, "A B").is_err());
        assert!(parse(Keyword::NeedsFlag, "").is_err());
    }

    #[test]
    fn rec_forms() {
        assert_eq!(parse(Keyword::Rec, "."), Ok(Command::Record(RecordForm::Auto)));
        assert_eq!(
            parse(Keyword::Rec, "vec_math"),
            Ok(Command::Record(RecordForm::Named {
                recorder: "vec_math".into(),
                options: Vec::new()
            }))
        );
        assert_eq!(
            parse(Keyword::Rec, "&recff_generic<Vec3, 2>"),
            Ok(Command::Record(RecordForm::Templated {
                recorder: "recff_generic<Vec3, 2>".into()
            }))
        );
    }

    #[test]
    fn rec_options_split_on_top_level_commas_only() {
        assert_eq!(
            parse(Keyword::Rec, "vec_math, IRFPM_SQRT, f(a, b), x[1, 2]"),
            Ok(Command::Record(RecordForm::Named {
                recorder: "vec_math".into(),
                options: options(&["IRFPM_SQRT", "f(a, b)", "x[1, 2]"])
            }))
        );
    }

    #[test]
    fn rec_option_text_is_kept_verbatim() {
        let Ok(Command::Record(RecordForm::Named { options, .. })) =
            parse(Keyword::Rec, "math, 1 <<  2 | FLAG")
        else {
            panic!("expected named record");
        };
        assert_eq!(options, vec!["1 <<  2 | FLAG".to_string()]);
    }

    #[test]
    fn rec_rejects_more_than_four_options() {
        let err = parse(Keyword::Rec, "math, a, b, c, d, e").expect_err("five options");
        assert!(matches!(err, AnnotationError::TooManyOptions { count: 5, .. }));
    }

    #[rstest]
    #[case("math, f(a, b")]
    #[case("math, a)")]
    #[case("math, (a]")]
    fn rec_rejects_unbalanced_brackets(#[case] args: &str) {
        let err = parse(Keyword::Rec, args).expect_err("unbalanced");
        assert!(matches!(err, AnnotationError::Unbalanced { .. }));
    }

    #[test]
    fn rec_rejects_empty_option() {
        let err = parse(Keyword::Rec, "math, a,, b").expect_err("empty");
        assert!(matches!(err, AnnotationError::EmptyOption { .. }));
    }

    #[test]
    fn rec_rejects_other_leading_tokens() {
        let err = parse(Keyword::Rec, "42").expect_err("number");
        assert!(matches!(err, AnnotationError::Expected { .. }));
        assert!(parse(Keyword::Rec, "").is_err());
    }

    #[test]
    fn field_accessor_targets() {
        assert_eq!(
            parse(Keyword::RecGetField, "x"),
            Ok(Command::FieldAccessor {
                kind: RecorderKind::GetField,
                target: FieldTarget::Implicit { field: "x".into() }
            })
        );
        assert_eq!(
            parse(Keyword::RecSetField, "Vec3, float, 4"),
            Ok(Command::FieldAccessor {
                kind: RecorderKind::SetField,
                target: FieldTarget::Explicit {
                    object_type: "Vec3".into(),
                    field_type: "float".into(),
                    field_offset: "4".into()
                }
            })
        );
        assert!(parse(Keyword::RecGetField, "Vec3, float").is_err());
    }

    #[rstest]
    #[case(&[], "0")]
    #[case(&["IRFPM_SQRT"], "IRFPM_SQRT")]
    #[case(&["A", "B"], "((B) << 16)|(A)")]
    #[case(&["A", "B", "C"], "(A)|((B) << 4)|((C) << 8)")]
    #[case(&["A", "B", "C", "D"], "(A)|((B) << 4)|((C) << 8)|((D) << 12)")]
    fn option_packing(#[case] list: &[&str], #[case] expected: &str) {
        assert_eq!(pack_record_options(&options(list)), expected);
    }
}
