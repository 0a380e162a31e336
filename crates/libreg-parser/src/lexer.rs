//! Raw C lexer.
//!
//! Splits text into identifiers, numbers, string/char literals and single
//! punctuation characters, skipping whitespace and comments. There is no
//! keyword table and no preprocessing: annotation arguments are interpreted
//! by `annotation`, and whole files are only scanned for macro invocations.
//! The lexer never fails; unterminated literals and comments run to the end
//! of the input.

/// Kind of a raw token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    StringLiteral,
    CharLiteral,
    Punct(char),
}

/// A token borrowing its text from the lexed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Absolute byte offset of the first character.
    pub offset: usize,
}

impl<'a> Token<'a> {
    /// Absolute byte offset one past the last character.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.text.len()
    }

    #[must_use]
    pub fn is_punct(&self, ch: char) -> bool {
        self.kind == TokenKind::Punct(ch)
    }

    #[must_use]
    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    /// Contents of a string literal without the prefix and quotes.
    #[must_use]
    pub fn string_value(&self) -> &'a str {
        let text = self.text;
        let Some(open) = text.find('"') else {
            return text;
        };
        let inner = &text[open + 1..];
        inner.strip_suffix('"').unwrap_or(inner)
    }
}

/// Pull-based lexer over one span of text.
pub struct Lexer<'a> {
    source: &'a str,
    cursor: usize,
    base: usize,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub const fn new(source: &'a str) -> Self {
        Self::with_base_offset(source, 0)
    }

    /// Lex `source` as if it started at byte `base` of a larger file.
    #[must_use]
    pub const fn with_base_offset(source: &'a str, base: usize) -> Self {
        Self {
            source,
            cursor: 0,
            base,
        }
    }

    /// Pull the next token, or `None` at the end of input.
    pub fn next_token(&mut self) -> Option<Token<'a>> {
        self.skip_trivia();

        let start = self.cursor;
        let ch = self.peek_char()?;

        let kind = if is_ident_start(ch) {
            self.lex_identifier()
        } else if ch.is_ascii_digit()
            || (ch == '.' && self.peek_next_char().is_some_and(|c| c.is_ascii_digit()))
        {
            self.lex_number();
            TokenKind::Number
        } else if ch == '"' {
            self.lex_quoted('"');
            TokenKind::StringLiteral
        } else if ch == '\'' {
            self.lex_quoted('\'');
            TokenKind::CharLiteral
        } else {
            self.bump_char();
            TokenKind::Punct(ch)
        };

        Some(Token {
            kind,
            text: &self.source[start..self.cursor],
            offset: self.base + start,
        })
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(ch) if ch.is_whitespace() => {
                    self.bump_char();
                }
                Some('\\') if matches!(self.peek_next_char(), Some('\n' | '\r')) => {
                    self.bump_char();
                }
                Some('/') if self.peek_next_char() == Some('/') => {
                    while let Some(ch) = self.peek_char() {
                        if ch == '\n' {
                            break;
                        }
                        self.bump_char();
                    }
                }
                Some('/') if self.peek_next_char() == Some('*') => {
                    self.bump_char();
                    self.bump_char();
                    self.skip_block_comment();
                }
                _ => break,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        while let Some(ch) = self.bump_char() {
            if ch == '*' && self.peek_char() == Some('/') {
                self.bump_char();
                return;
            }
        }
    }

    fn lex_identifier(&mut self) -> TokenKind {
        let start = self.cursor;
        while self.peek_char().is_some_and(is_ident_continue) {
            self.bump_char();
        }

        // Encoding prefixes: L"..", u8"..", u'..'
        let ident = &self.source[start..self.cursor];
        if matches!(ident, "L" | "u" | "U" | "u8") {
            match self.peek_char() {
                Some('"') => {
                    self.lex_quoted('"');
                    return TokenKind::StringLiteral;
                }
                Some('\'') => {
                    self.lex_quoted('\'');
                    return TokenKind::CharLiteral;
                }
                _ => {}
            }
        }
        TokenKind::Identifier
    }

    fn lex_number(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                let exponent = matches!(ch, 'e' | 'E' | 'p' | 'P');
                self.bump_char();
                if exponent && matches!(self.peek_char(), Some('+' | '-')) {
                    self.bump_char();
                }
            } else {
                break;
            }
        }
    }

    fn lex_quoted(&mut self, quote: char) {
        self.bump_char();
        while let Some(ch) = self.bump_char() {
            match ch {
                '\\' => {
                    self.bump_char();
                }
                '\n' => return,
                c if c == quote => return,
                _ => {}
            }
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.cursor..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut chars = self.source[self.cursor..].chars();
        chars.next();
        chars.next()
    }

    fn bump_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.cursor += ch.len_utf8();
        Some(ch)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

const fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

const fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<(TokenKind, &str)> {
        Lexer::new(source).map(|t| (t.kind, t.text)).collect()
    }

    #[test]
    fn lexes_push_value_tokens() {
        assert_eq!(
            kinds("top-1"),
            vec![
                (TokenKind::Identifier, "top"),
                (TokenKind::Punct('-'), "-"),
                (TokenKind::Number, "1"),
            ]
        );
    }

    #[test]
    fn string_literal_keeps_escapes() {
        let tokens: Vec<_> = Lexer::new(r#""a\"b", x"#).collect();
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].string_value(), r#"a\"b"#);
        assert!(tokens[1].is_punct(','));
        assert!(tokens[2].is_identifier());
    }

    #[test]
    fn prefixed_string_literal() {
        let tokens: Vec<_> = Lexer::new(r#"L"wide""#).collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].string_value(), "wide");
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            kinds("a /* b, c */ d // e\nf"),
            vec![
                (TokenKind::Identifier, "a"),
                (TokenKind::Identifier, "d"),
                (TokenKind::Identifier, "f"),
            ]
        );
    }

    #[test]
    fn numbers_with_suffixes_and_exponents() {
        assert_eq!(
            kinds("0x1Fu 1.5e-3f .5"),
            vec![
                (TokenKind::Number, "0x1Fu"),
                (TokenKind::Number, "1.5e-3f"),
                (TokenKind::Number, ".5"),
            ]
        );
    }

    #[test]
    fn offsets_include_base() {
        let tokens: Vec<_> = Lexer::with_base_offset("  x, y", 100).collect();
        assert_eq!(tokens[0].offset, 102);
        assert_eq!(tokens[2].offset, 105);
        assert_eq!(tokens[2].end(), 106);
    }

    #[test]
    fn unterminated_comment_runs_to_end() {
        assert_eq!(kinds("a /* never closed"), vec![(TokenKind::Identifier, "a")]);
    }
}
