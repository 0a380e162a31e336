//! Scanned files and the raw events found in them.

use libreg_core::SourceLocation;

/// One source file with a line index for offset → line/column mapping.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: String,
    text: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    #[must_use]
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self {
            path: path.into(),
            text,
            line_starts,
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 1-based line containing byte `offset`.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> u32 {
        let idx = self.line_index(offset);
        u32::try_from(idx + 1).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn location(&self, offset: usize) -> SourceLocation {
        let idx = self.line_index(offset);
        let column = offset.saturating_sub(self.line_starts[idx]) + 1;
        SourceLocation::new(
            self.path.clone(),
            u32::try_from(idx + 1).unwrap_or(u32::MAX),
            u32::try_from(column).unwrap_or(u32::MAX),
        )
    }

    fn line_index(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        }
    }
}

/// One `<prefix>NAME( ... )` invocation found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroInvocation {
    pub name: String,
    /// Raw text between the parentheses.
    pub args: String,
    /// Offset of the macro name.
    pub offset: usize,
    /// Offset of the first byte of `args`.
    pub args_offset: usize,
    /// Offset one past the closing parenthesis.
    pub end: usize,
}
