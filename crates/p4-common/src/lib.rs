//! Shared front-end types: source spans and line lookup, the token
//! model, diagnostics, and the identifier interner.

pub mod diag;
pub mod intern;
pub mod source;
pub mod span;
pub mod token;

pub use diag::{DiagKind, Diagnostic};
pub use intern::{Interner, Symbol};
pub use source::SourceText;
pub use span::{LineIndex, Span};
pub use token::{keyword_from_str, keywords, IntValue, Token, TokenKind};
