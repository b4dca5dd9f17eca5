//! Token model for the P4-16 lexer and parser.
//!
//! The lexer only ever emits `Ident` for words; keyword and
//! type-identifier kinds are applied later by the parser's token
//! cursor, which consults the scope it is parsing under. The keyword
//! kinds therefore exist here so the root scope can carry a token
//! class per keyword binding.

use serde::Serialize;

use crate::span::Span;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    // Framing
    StartOfInput,
    EndOfInput,
    // Punctuation
    Semicolon,
    Colon,
    Comma,
    Dot,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Dontcare,
    // Operators
    Lt,
    LtEq,
    Shl,
    Gt,
    GtEq,
    Shr,
    Eq,
    EqEq,
    Bang,
    NotEq,
    Amp,
    AmpAmp,
    Mask,
    Bar,
    BarBar,
    Caret,
    Tilde,
    Plus,
    Minus,
    UnaryMinus,
    Star,
    Slash,
    // Words
    Ident,
    TypeIdent,
    // Keywords (applied by scope retagging, never by the lexer)
    Action,
    Actions,
    Apply,
    Bit,
    Bool,
    Const,
    Control,
    Default,
    Else,
    Entries,
    Enum,
    Error,
    Exit,
    Extern,
    False,
    Header,
    HeaderUnion,
    If,
    In,
    Inout,
    Int,
    Key,
    MatchKind,
    Out,
    Package,
    Parser,
    Return,
    Select,
    State,
    String,
    Struct,
    Switch,
    Table,
    Transition,
    True,
    Tuple,
    Typedef,
    Varbit,
    Void,
    // Literals
    IntLiteral,
    StringLiteral,
    // Trivia and errors
    Comment,
    LexError,
    Unknown,
}

/// Parsed payload of an integer literal: `8w0xFF` gives
/// `{signed: false, width: Some(8), value: 255}`; a bare literal is
/// signed with no width (arbitrary-precision integer).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IntValue {
    pub signed: bool,
    pub width: Option<u32>,
    pub value: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Present exactly when `kind` is `IntLiteral`.
    pub int: Option<IntValue>,
}

impl Token {
    pub fn new(kind: TokenKind, start: u32, end: u32) -> Token {
        Token { kind, span: Span::new(start, end), int: None }
    }

    pub fn with_int(kind: TokenKind, start: u32, end: u32, int: IntValue) -> Token {
        Token { kind, span: Span::new(start, end), int: Some(int) }
    }
}

/// The P4-16 keyword set with the token class each keyword retags to.
pub fn keywords() -> &'static [(&'static str, TokenKind)] {
    &[
        ("action", TokenKind::Action),
        ("actions", TokenKind::Actions),
        ("apply", TokenKind::Apply),
        ("bit", TokenKind::Bit),
        ("bool", TokenKind::Bool),
        ("const", TokenKind::Const),
        ("control", TokenKind::Control),
        ("default", TokenKind::Default),
        ("else", TokenKind::Else),
        ("entries", TokenKind::Entries),
        ("enum", TokenKind::Enum),
        ("error", TokenKind::Error),
        ("exit", TokenKind::Exit),
        ("extern", TokenKind::Extern),
        ("false", TokenKind::False),
        ("header", TokenKind::Header),
        ("header_union", TokenKind::HeaderUnion),
        ("if", TokenKind::If),
        ("in", TokenKind::In),
        ("inout", TokenKind::Inout),
        ("int", TokenKind::Int),
        ("key", TokenKind::Key),
        ("match_kind", TokenKind::MatchKind),
        ("out", TokenKind::Out),
        ("package", TokenKind::Package),
        ("parser", TokenKind::Parser),
        ("return", TokenKind::Return),
        ("select", TokenKind::Select),
        ("state", TokenKind::State),
        ("string", TokenKind::String),
        ("struct", TokenKind::Struct),
        ("switch", TokenKind::Switch),
        ("table", TokenKind::Table),
        ("transition", TokenKind::Transition),
        ("true", TokenKind::True),
        ("tuple", TokenKind::Tuple),
        ("typedef", TokenKind::Typedef),
        ("varbit", TokenKind::Varbit),
        ("void", TokenKind::Void),
    ]
}

/// Token class for a keyword lexeme, if it is one.
pub fn keyword_from_str(text: &str) -> Option<TokenKind> {
    keywords().iter().find(|(kw, _)| *kw == text).map(|&(_, kind)| kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup() {
        assert_eq!(keyword_from_str("header"), Some(TokenKind::Header));
        assert_eq!(keyword_from_str("header_union"), Some(TokenKind::HeaderUnion));
        assert_eq!(keyword_from_str("headers"), None);
    }

    #[test]
    fn int_token_carries_payload() {
        let t = Token::with_int(
            TokenKind::IntLiteral,
            0,
            6,
            IntValue { signed: false, width: Some(8), value: 255 },
        );
        assert_eq!(t.int.unwrap().value, 255);
        assert_eq!(t.int.unwrap().width, Some(8));
    }
}
