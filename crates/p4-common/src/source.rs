//! A source file with its line index, and located-diagnostic
//! construction.

use crate::diag::{DiagKind, Diagnostic};
use crate::span::{LineIndex, Span};

/// UTF-8-clean source text; a trailing newline is not required.
pub struct SourceText<'a> {
    pub name: &'a str,
    pub text: &'a str,
    lines: LineIndex,
}

impl<'a> SourceText<'a> {
    pub fn new(name: &'a str, text: &'a str) -> SourceText<'a> {
        SourceText { name, text, lines: LineIndex::new(text) }
    }

    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        self.lines.line_col(offset)
    }

    pub fn slice(&self, span: Span) -> &'a str {
        span.text(self.text)
    }

    /// A diagnostic located at the start of `span`.
    pub fn error(&self, kind: DiagKind, span: Span, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(kind, self.name, self.line_col(span.start), span, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_located() {
        let src = SourceText::new("x.p4", "a\nbcd");
        let d = src.error(DiagKind::Lexical, Span::new(3, 4), "unknown token.");
        assert_eq!(d.to_string(), "x.p4:2:2: error: unknown token.");
    }
}
