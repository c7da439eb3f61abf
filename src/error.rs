//! Error types with source location tracking.
//!
//! Every failure in the pipeline carries a [`Span`] pinpointing the
//! offending token, plus a [`CompileErrorKind`] identifying which category
//! of the error taxonomy it belongs to. Formatting file/line/column and an
//! underlined excerpt is a caller concern; this crate only carries the raw
//! location.

use crate::span::Span;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// Unclosed block comment, unexpected byte.
    Lexical,
    /// Unexpected token kind, missing semicolon/bracket, not-a-number, not-an-identifier.
    Syntactic,
    /// Duplicate type keyword, multiple storage classes, redefinition of a tag, etc.
    Declaration,
    /// Undefined variable, case/default outside switch, non-member access.
    NameResolution,
    /// Assignment to const, void operand, pointer+pointer, invalid cast, non-constant expr.
    Type,
    /// Broken built-in prelude (missing `gp_offset` etc).
    Internal,
}

#[derive(Debug, Clone)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub message: String,
    pub span: Span,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }

    pub fn lexical(message: impl Into<String>, span: Span) -> Self {
        Self::new(CompileErrorKind::Lexical, message, span)
    }

    pub fn syntactic(message: impl Into<String>, span: Span) -> Self {
        Self::new(CompileErrorKind::Syntactic, message, span)
    }

    pub fn declaration(message: impl Into<String>, span: Span) -> Self {
        Self::new(CompileErrorKind::Declaration, message, span)
    }

    pub fn name_resolution(message: impl Into<String>, span: Span) -> Self {
        Self::new(CompileErrorKind::NameResolution, message, span)
    }

    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        Self::new(CompileErrorKind::Type, message, span)
    }

    pub fn internal(message: impl Into<String>, span: Span) -> Self {
        Self::new(CompileErrorKind::Internal, message, span)
    }

    /// Renders `source` with the offending span underlined on its own line.
    pub fn display_with_source(&self, source: &str) -> String {
        let line_start = source[..self.span.start.min(source.len())]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let line_end = source[self.span.start.min(source.len())..]
            .find('\n')
            .map(|i| i + self.span.start)
            .unwrap_or(source.len());
        let line = &source[line_start..line_end];
        let col = self.span.start - line_start;
        let underline_len = self.span.len().max(1);
        format!(
            "{self}\n{line}\n{caret:>width$}",
            caret = "^".repeat(underline_len),
            width = col + underline_len,
        )
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} error: {} at {}..{}",
            self.kind, self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for CompileError {}

pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_message_and_span() {
        let err = CompileError::syntactic("expected ';'", Span::new(5, 6));
        let s = err.to_string();
        assert!(s.contains("expected ';'"));
        assert!(s.contains("5..6"));
    }

    #[test]
    fn display_with_source_underlines_span() {
        let source = "int main(){\n  return x\n}\n";
        let err = CompileError::name_resolution("undefined variable 'x'", Span::new(21, 22));
        let rendered = err.display_with_source(source);
        assert!(rendered.contains("return x"));
        assert!(rendered.contains('^'));
    }
}
