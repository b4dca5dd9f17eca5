//! Located, fatal-at-first-occurrence diagnostics.
//!
//! Every front-end error renders as one line,
//! `<file>:<line>:<col>: error: <message>`, and terminates the
//! compilation. Internal invariant violations are panics, not
//! diagnostics.

use std::fmt;

use serde::Serialize;

use crate::span::Span;

/// The four-kind error taxonomy of the front end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DiagKind {
    Lexical,
    Syntax,
    Scope,
    Type,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagKind,
    pub file: String,
    pub line: u32,
    pub col: u32,
    pub message: String,
    /// Byte span of the offending token or node, for pretty rendering.
    pub span: Span,
}

impl Diagnostic {
    pub fn new(
        kind: DiagKind,
        file: &str,
        (line, col): (u32, u32),
        span: Span,
        message: impl Into<std::string::String>,
    ) -> Diagnostic {
        Diagnostic { kind, file: file.to_string(), line, col, message: message.into(), span }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}: error: {}", self.file, self.line, self.col, self.message)
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_renders_one_line() {
        let d = Diagnostic::new(
            DiagKind::Syntax,
            "test.p4",
            (3, 14),
            Span::new(20, 21),
            "`;` was expected, got `}`.",
        );
        assert_eq!(d.to_string(), "test.p4:3:14: error: `;` was expected, got `}`.");
    }
}
