//! Recursive-descent parser for the P4-16 grammar.
//!
//! The parser walks the token stream with a `(token, prev)` cursor and
//! one token of lookahead, skipping comment tokens transparently.
//!
//! Identifier tokens are retagged on read by consulting the scope the
//! parser is currently under: a Keyword-namespace binding turns the
//! token into that keyword's class, a Type-namespace binding turns it
//! into a type identifier. Type-introducing declarations bind their
//! name as soon as they are parsed, which is what lets `parse_type_ref`
//! tell a type name from a value name for the rest of the file. The
//! scope tree the parser builds exists only for this feedback; the
//! semantic passes construct the definitive one.
//!
//! Any unexpected token aborts with a located diagnostic; no recovery
//! is attempted and partial trees are never produced.

pub mod ast;
pub mod scope;

use p4_common::{DiagKind, Diagnostic, Interner, SourceText, Span, Symbol, TokenKind};
use p4_lexer::TokenStream;

use ast::{Ast, BinOp, Direction, NodeId, NodeKind, NodeList, UnOp};
use scope::{Namespace, ScopeId, ScopeTree};

/// A fully parsed program: the node store and the program root.
#[derive(Debug)]
pub struct Parse {
    pub ast: Ast,
    pub root: NodeId,
}

/// Parse a token stream into an AST.
pub fn parse(
    src: &SourceText<'_>,
    tokens: &TokenStream,
    interner: &mut Interner,
) -> Result<Parse, Diagnostic> {
    let mut parser = Parser::new(src, tokens, interner);
    let root = parser.parse_p4program()?;
    Ok(Parse { ast: parser.ast, root })
}

type PResult<T> = Result<T, Diagnostic>;

// ── Token predicates ───────────────────────────────────────────────────

fn is_non_type_name(k: TokenKind) -> bool {
    use TokenKind::*;
    matches!(k, Ident | Apply | Key | Actions | State | Entries)
}

fn is_name(k: TokenKind) -> bool {
    is_non_type_name(k) || k == TokenKind::TypeIdent
}

fn is_non_table_kw_name(k: TokenKind) -> bool {
    use TokenKind::*;
    matches!(k, Ident | TypeIdent | Apply | State)
}

fn is_base_type(k: TokenKind) -> bool {
    use TokenKind::*;
    matches!(k, Bool | Error | Int | Bit | Varbit | String | Void)
}

fn is_type_ref(k: TokenKind) -> bool {
    is_base_type(k) || k == TokenKind::TypeIdent || k == TokenKind::Tuple
}

fn is_direction(k: TokenKind) -> bool {
    use TokenKind::*;
    matches!(k, In | Out | Inout)
}

fn is_parameter(k: TokenKind) -> bool {
    is_direction(k) || is_type_ref(k)
}

fn is_derived_type_declaration(k: TokenKind) -> bool {
    use TokenKind::*;
    matches!(k, Header | HeaderUnion | Struct | Enum)
}

fn is_type_declaration(k: TokenKind) -> bool {
    use TokenKind::*;
    is_derived_type_declaration(k) || matches!(k, Typedef | Parser | Control | Package)
}

fn is_type_arg(k: TokenKind) -> bool {
    k == TokenKind::Dontcare || is_type_ref(k) || is_non_type_name(k)
}

fn is_type_or_void(k: TokenKind) -> bool {
    is_type_ref(k) || k == TokenKind::Void || k == TokenKind::Ident
}

fn is_action_ref(k: TokenKind) -> bool {
    is_non_type_name(k) || k == TokenKind::LParen
}

fn is_table_property(k: TokenKind) -> bool {
    use TokenKind::*;
    matches!(k, Key | Actions | Const | Entries) || is_non_table_kw_name(k)
}

fn is_switch_label(k: TokenKind) -> bool {
    is_name(k) || k == TokenKind::Default
}

fn is_expression_primary(k: TokenKind) -> bool {
    use TokenKind::*;
    matches!(k, IntLiteral | True | False | StringLiteral | LBrace | LParen | Bang | Tilde
        | UnaryMinus | Error | Dot)
        || is_non_type_name(k)
        || k == TypeIdent
}

fn is_expression(k: TokenKind) -> bool {
    is_expression_primary(k)
}

fn is_method_prototype(k: TokenKind) -> bool {
    is_type_or_void(k) || k == TokenKind::TypeIdent
}

fn is_struct_field(k: TokenKind) -> bool {
    is_type_ref(k)
}

fn is_declaration(k: TokenKind) -> bool {
    use TokenKind::*;
    matches!(k, Const | Extern | Action | Parser | Control | Error | MatchKind)
        || is_type_declaration(k)
        || is_type_ref(k)
        || is_type_or_void(k)
}

fn is_lvalue(k: TokenKind) -> bool {
    is_non_type_name(k) || k == TokenKind::Dot
}

fn is_assignment_or_method_call(k: TokenKind) -> bool {
    use TokenKind::*;
    is_lvalue(k) || matches!(k, LParen | Lt | Eq)
}

fn is_statement(k: TokenKind) -> bool {
    use TokenKind::*;
    is_assignment_or_method_call(k)
        || k == TypeIdent
        || matches!(k, If | Semicolon | LBrace | Exit | Return | Switch)
}

fn is_statement_or_declaration(k: TokenKind) -> bool {
    is_type_ref(k) || k == TokenKind::Const || is_statement(k)
}

fn is_argument(k: TokenKind) -> bool {
    is_expression(k) || is_name(k) || k == TokenKind::Dontcare
}

fn is_parser_local_element(k: TokenKind) -> bool {
    k == TokenKind::Const || is_type_ref(k)
}

fn is_parser_statement(k: TokenKind) -> bool {
    use TokenKind::*;
    is_assignment_or_method_call(k)
        || k == TypeIdent
        || matches!(k, LBrace | Const | Semicolon)
        || is_type_ref(k)
}

fn is_simple_keyset_expression(k: TokenKind) -> bool {
    is_expression(k) || k == TokenKind::Default || k == TokenKind::Dontcare
}

fn is_keyset_expression(k: TokenKind) -> bool {
    k == TokenKind::LParen || is_simple_keyset_expression(k)
}

fn is_control_local_declaration(k: TokenKind) -> bool {
    use TokenKind::*;
    matches!(k, Const | Action | Table) || is_type_ref(k)
}

fn is_binary_operator(k: TokenKind) -> bool {
    use TokenKind::*;
    matches!(k, Star | Slash | Plus | Minus | LtEq | GtEq | Lt | Gt | NotEq | EqEq | BarBar
        | AmpAmp | Bar | Amp | Caret | Shl | Shr | Mask | Eq)
}

fn is_expr_operator(k: TokenKind) -> bool {
    use TokenKind::*;
    is_binary_operator(k) || matches!(k, Dot | LBracket | LParen | Lt)
}

/// Binary operator priorities: 1 logical, 2 relational, 3 additive and
/// bitwise, 4 multiplicative, 5 mask.
fn operator_priority(k: TokenKind) -> u32 {
    use TokenKind::*;
    match k {
        AmpAmp | BarBar => 1,
        EqEq | NotEq | Lt | Gt | LtEq | GtEq => 2,
        Plus | Minus | Amp | Bar | Caret | Shl | Shr => 3,
        Star | Slash => 4,
        Mask => 5,
        _ => unreachable!("not a binary operator: {k:?}"),
    }
}

fn binop_of(k: TokenKind) -> BinOp {
    use TokenKind::*;
    match k {
        AmpAmp => BinOp::And,
        BarBar => BinOp::Or,
        EqEq => BinOp::Eq,
        NotEq => BinOp::NotEq,
        Lt => BinOp::Less,
        Gt => BinOp::Great,
        LtEq => BinOp::LessEq,
        GtEq => BinOp::GreatEq,
        Plus => BinOp::Add,
        Minus => BinOp::Sub,
        Star => BinOp::Mul,
        Slash => BinOp::Div,
        Amp => BinOp::BitAnd,
        Bar => BinOp::BitOr,
        Caret => BinOp::BitXor,
        Shl => BinOp::Shl,
        Shr => BinOp::Shr,
        Mask => BinOp::Mask,
        _ => unreachable!("not a binary operator: {k:?}"),
    }
}

// ── The parser ─────────────────────────────────────────────────────────

struct Parser<'a, 'src> {
    src: &'a SourceText<'src>,
    tokens: &'a TokenStream,
    interner: &'a mut Interner,
    ast: Ast,
    scopes: ScopeTree,
    scope: ScopeId,
    pos: usize,
    /// Effective kind of the current token, after scope retagging.
    kind: TokenKind,
    span: Span,
    /// Interned lexeme of the current token when it is word-like.
    sym: Option<Symbol>,
}

impl<'a, 'src> Parser<'a, 'src> {
    fn new(
        src: &'a SourceText<'src>,
        tokens: &'a TokenStream,
        interner: &'a mut Interner,
    ) -> Parser<'a, 'src> {
        let scopes = ScopeTree::with_builtins(interner);
        let scope = scopes.root;
        let mut parser = Parser {
            src,
            tokens,
            interner,
            ast: Ast::new(),
            scopes,
            scope,
            pos: 0,
            kind: TokenKind::StartOfInput,
            span: Span::new(0, 0),
            sym: None,
        };
        parser.bump();
        parser
    }

    // ── Cursor ─────────────────────────────────────────────────────

    /// Advance to the next non-comment token and retag it against the
    /// current scope.
    fn bump(&mut self) {
        if self.kind == TokenKind::EndOfInput {
            return;
        }
        loop {
            self.pos += 1;
            if self.tokens.get(self.pos).kind != TokenKind::Comment {
                break;
            }
        }
        let token = self.tokens.get(self.pos);
        self.span = token.span;
        let (kind, sym) = self.classify(token.kind, token.span);
        self.kind = kind;
        self.sym = sym;
    }

    /// Effective kind of the next non-comment token, without moving.
    fn peek_kind(&mut self) -> TokenKind {
        let mut p = self.pos + 1;
        while self.tokens.get(p).kind == TokenKind::Comment {
            p += 1;
        }
        let token = self.tokens.get(p);
        self.classify(token.kind, token.span).0
    }

    /// The lexer feedback path: identifier tokens take their class
    /// from the nearest scope entry for their lexeme.
    fn classify(&mut self, kind: TokenKind, span: Span) -> (TokenKind, Option<Symbol>) {
        if kind != TokenKind::Ident {
            return (kind, None);
        }
        let sym = self.interner.intern(self.src.slice(span));
        if let Some(entry) = self.scopes.lookup_any(self.scope, sym) {
            if let Some(kw) = entry.head(Namespace::Keyword) {
                let class = self.scopes.decl(kw).token_class.expect("keyword binding has a class");
                return (class, Some(sym));
            }
            if entry.head(Namespace::Type).is_some() {
                return (TokenKind::TypeIdent, Some(sym));
            }
        }
        (TokenKind::Ident, Some(sym))
    }

    fn lexeme(&self) -> &str {
        match self.kind {
            TokenKind::EndOfInput => "<end-of-input>",
            _ => self.src.slice(self.span),
        }
    }

    fn at(&self, k: TokenKind) -> bool {
        self.kind == k
    }

    fn expected(&self, what: &str) -> Diagnostic {
        self.src.error(
            DiagKind::Syntax,
            self.span,
            format!("{what} was expected, got `{}`.", self.lexeme()),
        )
    }

    fn unexpected(&self) -> Diagnostic {
        self.src
            .error(DiagKind::Syntax, self.span, format!("unexpected token `{}`.", self.lexeme()))
    }

    fn expect(&mut self, k: TokenKind, what: &str) -> PResult<()> {
        if self.at(k) {
            self.bump();
            Ok(())
        } else {
            Err(self.expected(what))
        }
    }

    /// Bind a just-parsed type name so the cursor retags later
    /// occurrences of it.
    fn bind_type(&mut self, name: NodeId) {
        let sym = self.ast.name_of(name);
        self.scopes.bind(self.scope, sym, Namespace::Type, Some(name));
    }

    fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.ast.push(kind, span)
    }

    fn push_list(&mut self, make: fn(NodeList) -> NodeKind) -> NodeId {
        self.ast.push(make(NodeList::default()), self.span)
    }

    // ── Program ────────────────────────────────────────────────────

    fn parse_p4program(&mut self) -> PResult<NodeId> {
        let span = self.span;
        while self.at(TokenKind::Semicolon) {
            self.bump(); // empty declaration
        }
        let program_scope = self.scopes.new_scope(self.scope);
        self.scope = program_scope;
        let decls = self.parse_declaration_list()?;
        self.scope = self.scopes.parent(program_scope).expect("program scope has a parent");
        if !self.at(TokenKind::EndOfInput) {
            return Err(self.unexpected());
        }
        Ok(self.push(NodeKind::P4Program { decls }, span))
    }

    fn parse_declaration_list(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::DeclarationList);
        if is_declaration(self.kind) {
            let first = self.parse_declaration()?;
            self.ast.append_child(list, first);
            while is_declaration(self.kind) || self.at(TokenKind::Semicolon) {
                if is_declaration(self.kind) {
                    let decl = self.parse_declaration()?;
                    self.ast.append_child(list, decl);
                } else {
                    self.bump(); // empty declaration
                }
            }
        }
        Ok(list)
    }

    fn parse_declaration(&mut self) -> PResult<NodeId> {
        let span = self.span;
        if !is_declaration(self.kind) {
            return Err(self
                .src
                .error(DiagKind::Syntax, self.span, format!(
                    "top-level declaration was expected, got `{}`.",
                    self.lexeme()
                )));
        }
        let decl = match self.kind {
            TokenKind::Const => self.parse_variable_declaration(None)?,
            TokenKind::Extern => self.parse_extern_declaration()?,
            TokenKind::Action => self.parse_action_declaration()?,
            TokenKind::Parser => {
                let proto = self.parse_type_declaration()?;
                if self.at(TokenKind::Semicolon) {
                    self.bump();
                    proto
                } else {
                    self.parse_parser_declaration(proto)?
                }
            }
            TokenKind::Control => {
                let proto = self.parse_type_declaration()?;
                if self.at(TokenKind::Semicolon) {
                    self.bump();
                    proto
                } else {
                    self.parse_control_declaration(proto)?
                }
            }
            k if is_type_declaration(k) => self.parse_type_declaration()?,
            TokenKind::Error => self.parse_error_declaration()?,
            TokenKind::MatchKind => self.parse_match_kind_declaration()?,
            k if is_type_ref(k) => {
                let type_ref = self.parse_type_ref()?;
                if self.at(TokenKind::LParen) {
                    self.parse_instantiation(Some(type_ref))?
                } else if is_name(self.kind) {
                    self.parse_function_declaration(type_ref)?
                } else {
                    return Err(self.unexpected());
                }
            }
            k if is_type_or_void(k) => {
                let type_ref = self.parse_type_ref()?;
                self.parse_function_declaration(type_ref)?
            }
            _ => unreachable!("declaration dispatch"),
        };
        Ok(self.push(NodeKind::Declaration { decl }, span))
    }

    fn parse_non_type_name(&mut self) -> PResult<NodeId> {
        if is_non_type_name(self.kind) {
            let span = self.span;
            let name = self.sym.expect("word tokens are interned");
            self.bump();
            Ok(self.push(NodeKind::Name { name }, span))
        } else {
            Err(self.expected("non-type name"))
        }
    }

    fn parse_name(&mut self) -> PResult<NodeId> {
        if is_non_type_name(self.kind) {
            self.parse_non_type_name()
        } else if self.at(TokenKind::TypeIdent) {
            let span = self.span;
            let name = self.sym.expect("word tokens are interned");
            self.bump();
            Ok(self.push(NodeKind::Name { name }, span))
        } else {
            Err(self.expected("name"))
        }
    }

    fn parse_parameter_list(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::ParameterList);
        if is_parameter(self.kind) {
            let first = self.parse_parameter()?;
            self.ast.append_child(list, first);
            while self.at(TokenKind::Comma) {
                self.bump();
                let param = self.parse_parameter()?;
                self.ast.append_child(list, param);
            }
        }
        Ok(list)
    }

    fn parse_parameter(&mut self) -> PResult<NodeId> {
        if !is_parameter(self.kind) {
            return Err(self.expected("type"));
        }
        let span = self.span;
        let direction = self.parse_direction();
        let ty = self.parse_type_ref()?;
        if !is_name(self.kind) {
            return Err(self.expected("name"));
        }
        let name = self.parse_name()?;
        let init = if self.at(TokenKind::Eq) {
            self.bump();
            if !is_expression(self.kind) {
                return Err(self.expected("expression"));
            }
            Some(self.parse_expression(1)?)
        } else {
            None
        };
        Ok(self.push(NodeKind::Parameter { direction, ty, name, init }, span))
    }

    fn parse_direction(&mut self) -> Direction {
        let direction = match self.kind {
            TokenKind::In => Direction::In,
            TokenKind::Out => Direction::Out,
            TokenKind::Inout => Direction::InOut,
            _ => return Direction::None,
        };
        self.bump();
        direction
    }

    fn parse_package_type_declaration(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::Package, "`package`")?;
        let span = self.span;
        if !is_name(self.kind) {
            return Err(self.expected("name"));
        }
        let name = self.parse_name()?;
        self.bind_type(name);
        self.expect(TokenKind::LParen, "`(`")?;
        let params = self.parse_parameter_list()?;
        self.expect(TokenKind::RParen, "`)`")?;
        Ok(self.push(NodeKind::PackageTypeDeclaration { name, params }, span))
    }

    fn parse_instantiation(&mut self, type_ref: Option<NodeId>) -> PResult<NodeId> {
        if type_ref.is_none() && !is_type_ref(self.kind) {
            return Err(self.expected("type"));
        }
        let span = self.span;
        let ty = match type_ref {
            Some(ty) => ty,
            None => self.parse_type_ref()?,
        };
        self.expect(TokenKind::LParen, "`(`")?;
        let args = self.parse_argument_list()?;
        self.expect(TokenKind::RParen, "`)`")?;
        if !is_name(self.kind) {
            return Err(self.expected("instance name"));
        }
        let name = self.parse_name()?;
        self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(self.push(NodeKind::Instantiation { ty, args, name }, span))
    }

    // ── Parser declarations ────────────────────────────────────────

    fn parse_opt_constructor_parameters(&mut self) -> PResult<Option<NodeId>> {
        if !self.at(TokenKind::LParen) {
            return Ok(None);
        }
        self.bump();
        if is_parameter(self.kind) {
            let params = self.parse_parameter_list()?;
            self.expect(TokenKind::RParen, "`)`")?;
            Ok(Some(params))
        } else if self.at(TokenKind::RParen) {
            self.bump();
            Ok(None)
        } else {
            Err(self.expected("`)`"))
        }
    }

    fn parse_parser_declaration(&mut self, proto: NodeId) -> PResult<NodeId> {
        if !self.at(TokenKind::LParen) && !self.at(TokenKind::LBrace) {
            return Err(self.expected("`parser` body"));
        }
        let span = self.span;
        let ctor_params = self.parse_opt_constructor_parameters()?;
        self.expect(TokenKind::LBrace, "`{`")?;
        let locals = self.parse_parser_local_elements()?;
        if !self.at(TokenKind::State) {
            return Err(self.expected("`state`"));
        }
        let states = self.parse_parser_states()?;
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(self.push(NodeKind::ParserDeclaration { proto, ctor_params, locals, states }, span))
    }

    fn parse_parser_local_elements(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::ParserLocalElements);
        while is_parser_local_element(self.kind) {
            let element = self.parse_parser_local_element()?;
            self.ast.append_child(list, element);
        }
        Ok(list)
    }

    fn parse_parser_local_element(&mut self) -> PResult<NodeId> {
        if !is_parser_local_element(self.kind) {
            return Err(self.expected("local declaration"));
        }
        let span = self.span;
        let element = if self.at(TokenKind::Const) {
            self.parse_variable_declaration(None)?
        } else {
            let type_ref = self.parse_type_ref()?;
            if self.at(TokenKind::LParen) {
                self.parse_instantiation(Some(type_ref))?
            } else if is_name(self.kind) {
                self.parse_variable_declaration(Some(type_ref))?
            } else {
                return Err(self.unexpected());
            }
        };
        Ok(self.push(NodeKind::ParserLocalElement { element }, span))
    }

    fn parse_parser_type_declaration(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::Parser, "`parser`")?;
        let span = self.span;
        if !is_name(self.kind) {
            return Err(self.expected("name"));
        }
        let name = self.parse_name()?;
        self.bind_type(name);
        self.expect(TokenKind::LParen, "`(`")?;
        let params = self.parse_parameter_list()?;
        self.expect(TokenKind::RParen, "`)`")?;
        Ok(self.push(NodeKind::ParserTypeDeclaration { name, params }, span))
    }

    fn parse_parser_states(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::ParserStates);
        while self.at(TokenKind::State) {
            let state = self.parse_parser_state()?;
            self.ast.append_child(list, state);
        }
        Ok(list)
    }

    fn parse_parser_state(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::State, "`state`")?;
        let span = self.span;
        let name = self.parse_name()?;
        self.expect(TokenKind::LBrace, "`{`")?;
        let stmts = self.parse_parser_statements()?;
        let transition = self.parse_transition_statement()?;
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(self.push(NodeKind::ParserState { name, stmts, transition }, span))
    }

    fn parse_parser_statements(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::ParserStatements);
        while is_parser_statement(self.kind) {
            let stmt = self.parse_parser_statement()?;
            self.ast.append_child(list, stmt);
        }
        Ok(list)
    }

    fn parse_parser_statement(&mut self) -> PResult<NodeId> {
        if !is_parser_statement(self.kind) {
            return Err(self.expected("statement"));
        }
        let span = self.span;
        let stmt = if is_type_ref(self.kind) {
            let type_ref = self.parse_type_ref()?;
            if is_name(self.kind) {
                self.parse_variable_declaration(Some(type_ref))?
            } else {
                self.parse_direct_application(Some(type_ref))?
            }
        } else if is_assignment_or_method_call(self.kind) {
            self.parse_assignment_or_method_call()?
        } else if self.at(TokenKind::LBrace) {
            self.parse_parser_block_statement()?
        } else if self.at(TokenKind::Const) {
            self.parse_variable_declaration(None)?
        } else if self.at(TokenKind::Semicolon) {
            self.bump();
            self.push(NodeKind::EmptyStatement, span)
        } else {
            unreachable!("parser statement dispatch");
        };
        Ok(self.push(NodeKind::ParserStatement { stmt }, span))
    }

    fn parse_parser_block_statement(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::LBrace, "`{`")?;
        let span = self.span;
        let stmts = self.parse_parser_statements()?;
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(self.push(NodeKind::ParserBlockStatement { stmts }, span))
    }

    fn parse_transition_statement(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::Transition, "`transition`")?;
        let span = self.span;
        let expr = self.parse_state_expression()?;
        Ok(self.push(NodeKind::TransitionStatement { expr }, span))
    }

    fn parse_state_expression(&mut self) -> PResult<NodeId> {
        let span = self.span;
        let expr = if is_name(self.kind) {
            let name = self.parse_name()?;
            self.expect(TokenKind::Semicolon, "`;`")?;
            name
        } else if self.at(TokenKind::Select) {
            self.parse_select_expression()?
        } else {
            return Err(self.expected("state expression"));
        };
        Ok(self.push(NodeKind::StateExpression { expr }, span))
    }

    fn parse_select_expression(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::Select, "`select`")?;
        let span = self.span;
        self.expect(TokenKind::LParen, "`(`")?;
        let exprs = self.parse_expression_list()?;
        self.expect(TokenKind::RParen, "`)`")?;
        self.expect(TokenKind::LBrace, "`{`")?;
        let cases = self.parse_select_case_list()?;
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(self.push(NodeKind::SelectExpression { exprs, cases }, span))
    }

    fn parse_select_case_list(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::SelectCaseList);
        while is_keyset_expression(self.kind) {
            let case = self.parse_select_case()?;
            self.ast.append_child(list, case);
        }
        Ok(list)
    }

    fn parse_select_case(&mut self) -> PResult<NodeId> {
        if !is_keyset_expression(self.kind) {
            return Err(self.expected("keyset expression"));
        }
        let span = self.span;
        let keyset = self.parse_keyset_expression()?;
        self.expect(TokenKind::Colon, "`:`")?;
        if !is_name(self.kind) {
            return Err(self.expected("name"));
        }
        let name = self.parse_name()?;
        self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(self.push(NodeKind::SelectCase { keyset, name }, span))
    }

    fn parse_keyset_expression(&mut self) -> PResult<NodeId> {
        let span = self.span;
        let expr = if self.at(TokenKind::LParen) {
            self.parse_tuple_keyset_expression()?
        } else if is_simple_keyset_expression(self.kind) {
            self.parse_simple_keyset_expression()?
        } else {
            return Err(self.expected("keyset expression"));
        };
        Ok(self.push(NodeKind::KeysetExpression { expr }, span))
    }

    fn parse_tuple_keyset_expression(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::LParen, "`(`")?;
        let span = self.span;
        let exprs = self.parse_simple_expression_list()?;
        self.expect(TokenKind::RParen, "`)`")?;
        Ok(self.push(NodeKind::TupleKeysetExpression { exprs }, span))
    }

    fn parse_simple_expression_list(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::SimpleExpressionList);
        if is_simple_keyset_expression(self.kind) {
            let first = self.parse_simple_keyset_expression()?;
            self.ast.append_child(list, first);
            while self.at(TokenKind::Comma) {
                self.bump();
                let next = self.parse_simple_keyset_expression()?;
                self.ast.append_child(list, next);
            }
        }
        Ok(list)
    }

    fn parse_simple_keyset_expression(&mut self) -> PResult<NodeId> {
        let span = self.span;
        let expr = if is_expression(self.kind) {
            self.parse_expression(1)?
        } else if self.at(TokenKind::Default) {
            self.bump();
            self.push(NodeKind::Default, span)
        } else if self.at(TokenKind::Dontcare) {
            self.bump();
            self.push(NodeKind::Dontcare, span)
        } else {
            return Err(self.expected("keyset expression"));
        };
        Ok(self.push(NodeKind::SimpleKeysetExpression { expr }, span))
    }

    // ── Control declarations ───────────────────────────────────────

    fn parse_control_declaration(&mut self, proto: NodeId) -> PResult<NodeId> {
        if !self.at(TokenKind::LParen) && !self.at(TokenKind::LBrace) {
            return Err(self.expected("`control` body"));
        }
        let span = self.span;
        let ctor_params = self.parse_opt_constructor_parameters()?;
        self.expect(TokenKind::LBrace, "`{`")?;
        let locals = self.parse_control_local_declarations()?;
        self.expect(TokenKind::Apply, "`apply`")?;
        let apply = self.parse_block_statement()?;
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(self.push(NodeKind::ControlDeclaration { proto, ctor_params, locals, apply }, span))
    }

    fn parse_control_type_declaration(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::Control, "`control`")?;
        let span = self.span;
        if !is_name(self.kind) {
            return Err(self.expected("name"));
        }
        let name = self.parse_name()?;
        self.bind_type(name);
        self.expect(TokenKind::LParen, "`(`")?;
        let params = self.parse_parameter_list()?;
        self.expect(TokenKind::RParen, "`)`")?;
        Ok(self.push(NodeKind::ControlTypeDeclaration { name, params }, span))
    }

    fn parse_control_local_declarations(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::ControlLocalDeclarations);
        while is_control_local_declaration(self.kind) {
            let decl = self.parse_control_local_declaration()?;
            self.ast.append_child(list, decl);
        }
        Ok(list)
    }

    fn parse_control_local_declaration(&mut self) -> PResult<NodeId> {
        if !is_control_local_declaration(self.kind) {
            return Err(self.expected("local declaration"));
        }
        let span = self.span;
        let decl = match self.kind {
            TokenKind::Const => self.parse_variable_declaration(None)?,
            TokenKind::Action => self.parse_action_declaration()?,
            TokenKind::Table => self.parse_table_declaration()?,
            _ => {
                let type_ref = self.parse_type_ref()?;
                if self.at(TokenKind::LParen) {
                    self.parse_instantiation(Some(type_ref))?
                } else if is_name(self.kind) {
                    self.parse_variable_declaration(Some(type_ref))?
                } else {
                    return Err(self.unexpected());
                }
            }
        };
        Ok(self.push(NodeKind::ControlLocalDeclaration { decl }, span))
    }

    // ── Extern declarations ────────────────────────────────────────

    fn parse_extern_declaration(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::Extern, "`extern`")?;
        let span = self.span;

        let is_function = if is_type_or_void(self.kind) && is_non_type_name(self.kind) {
            // An identifier could open either form; a name after it
            // means this is a function prototype.
            is_name(self.peek_kind())
        } else if is_type_or_void(self.kind) {
            true
        } else if is_non_type_name(self.kind) {
            false
        } else {
            return Err(self.expected("extern declaration"));
        };

        let decl = if is_function {
            let proto = self.parse_function_prototype(None)?;
            self.expect(TokenKind::Semicolon, "`;`")?;
            proto
        } else {
            let ty_span = self.span;
            let name = self.parse_non_type_name()?;
            self.bind_type(name);
            self.expect(TokenKind::LBrace, "`{`")?;
            let methods = self.parse_method_prototypes()?;
            self.expect(TokenKind::RBrace, "`}`")?;
            self.push(NodeKind::ExternTypeDeclaration { name, methods }, ty_span)
        };
        Ok(self.push(NodeKind::ExternDeclaration { decl }, span))
    }

    fn parse_method_prototypes(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::MethodPrototypes);
        while is_method_prototype(self.kind) {
            let proto = self.parse_method_prototype()?;
            self.ast.append_child(list, proto);
        }
        Ok(list)
    }

    fn parse_function_prototype(&mut self, return_type: Option<NodeId>) -> PResult<NodeId> {
        if return_type.is_none() && !is_type_or_void(self.kind) {
            return Err(self.expected("type"));
        }
        let return_ty = match return_type {
            Some(ty) => ty,
            None => {
                let ty = self.parse_type_or_void()?;
                if let NodeKind::Name { .. } = self.ast.kind(ty) {
                    // An identifier return type declares a type name.
                    self.bind_type(ty);
                    let span = self.ast.span(ty);
                    self.push(NodeKind::TypeRef { ty }, span)
                } else {
                    ty
                }
            }
        };
        let span = self.span;
        if !is_name(self.kind) {
            return Err(self.expected("function name"));
        }
        let name = self.parse_name()?;
        self.expect(TokenKind::LParen, "`(`")?;
        let params = self.parse_parameter_list()?;
        self.expect(TokenKind::RParen, "`)`")?;
        Ok(self.push(NodeKind::FunctionPrototype { return_ty: Some(return_ty), name, params }, span))
    }

    fn parse_method_prototype(&mut self) -> PResult<NodeId> {
        if !is_method_prototype(self.kind) {
            return Err(self.expected("type"));
        }
        if self.at(TokenKind::TypeIdent) && self.peek_kind() == TokenKind::LParen {
            // Constructor prototype
            let span = self.span;
            let name = self.parse_name()?;
            self.expect(TokenKind::LParen, "`(`")?;
            let params = self.parse_parameter_list()?;
            self.expect(TokenKind::RParen, "`)`")?;
            self.expect(TokenKind::Semicolon, "`;`")?;
            Ok(self.push(NodeKind::FunctionPrototype { return_ty: None, name, params }, span))
        } else if is_type_or_void(self.kind) {
            let proto = self.parse_function_prototype(None)?;
            self.expect(TokenKind::Semicolon, "`;`")?;
            Ok(proto)
        } else {
            Err(self.expected("type"))
        }
    }

    // ── Types ──────────────────────────────────────────────────────

    fn parse_type_ref(&mut self) -> PResult<NodeId> {
        if !is_type_ref(self.kind) {
            return Err(self.expected("type"));
        }
        let span = self.span;
        let ty = if is_base_type(self.kind) {
            self.parse_base_type()?
        } else if self.at(TokenKind::TypeIdent) {
            self.parse_named_type()?
        } else {
            self.parse_tuple_type()?
        };
        Ok(self.push(NodeKind::TypeRef { ty }, span))
    }

    fn parse_named_type(&mut self) -> PResult<NodeId> {
        if !self.at(TokenKind::TypeIdent) {
            return Err(self.expected("type"));
        }
        let named = self.parse_type_name()?;
        if self.at(TokenKind::LBracket) {
            self.parse_header_stack_type(named)
        } else {
            Ok(named)
        }
    }

    fn parse_type_name(&mut self) -> PResult<NodeId> {
        if self.at(TokenKind::TypeIdent) {
            let span = self.span;
            let name = self.sym.expect("word tokens are interned");
            self.bump();
            Ok(self.push(NodeKind::Name { name }, span))
        } else {
            Err(self.expected("type"))
        }
    }

    fn parse_tuple_type(&mut self) -> PResult<NodeId> {
        let span = self.span;
        self.expect(TokenKind::Tuple, "`tuple`")?;
        self.expect(TokenKind::Lt, "`<`")?;
        let type_args = self.parse_type_argument_list()?;
        self.expect(TokenKind::Gt, "`>`")?;
        Ok(self.push(NodeKind::TupleType { type_args }, span))
    }

    fn parse_header_stack_type(&mut self, named_type: NodeId) -> PResult<NodeId> {
        self.expect(TokenKind::LBracket, "`[`")?;
        let span = self.ast.span(named_type);
        let ty = self.push(NodeKind::TypeRef { ty: named_type }, span);
        if !is_expression(self.kind) {
            return Err(self.expected("expression"));
        }
        let size = self.parse_expression(1)?;
        self.expect(TokenKind::RBracket, "`]`")?;
        Ok(self.push(NodeKind::HeaderStackType { ty, size }, span))
    }

    fn parse_base_type(&mut self) -> PResult<NodeId> {
        if !is_base_type(self.kind) {
            return Err(self.expected("base type"));
        }
        let span = self.span;
        let name_sym = self.sym.expect("word tokens are interned");
        let name = self.push(NodeKind::Name { name: name_sym }, span);
        match self.kind {
            TokenKind::Bool => {
                self.bump();
                Ok(self.push(NodeKind::BaseTypeBool { name }, span))
            }
            TokenKind::Int => {
                self.bump();
                let size = self.parse_opt_type_size()?;
                Ok(self.push(NodeKind::BaseTypeInt { name, size }, span))
            }
            TokenKind::Bit => {
                self.bump();
                let size = self.parse_opt_type_size()?;
                Ok(self.push(NodeKind::BaseTypeBit { name, size }, span))
            }
            TokenKind::Varbit => {
                self.bump();
                if !self.at(TokenKind::Lt) {
                    return Err(self.expected("`<`"));
                }
                let size = self.parse_opt_type_size()?.expect("checked for `<`");
                Ok(self.push(NodeKind::BaseTypeVarbit { name, size }, span))
            }
            TokenKind::String => {
                self.bump();
                Ok(self.push(NodeKind::BaseTypeString { name }, span))
            }
            TokenKind::Void => {
                self.bump();
                Ok(self.push(NodeKind::BaseTypeVoid { name }, span))
            }
            TokenKind::Error => {
                self.bump();
                Ok(self.push(NodeKind::BaseTypeError { name }, span))
            }
            _ => unreachable!("base type dispatch"),
        }
    }

    fn parse_opt_type_size(&mut self) -> PResult<Option<NodeId>> {
        if !self.at(TokenKind::Lt) {
            return Ok(None);
        }
        self.bump();
        let size = self.parse_integer_type_size()?;
        self.expect(TokenKind::Gt, "`>`")?;
        Ok(Some(size))
    }

    fn parse_integer_type_size(&mut self) -> PResult<NodeId> {
        let span = self.span;
        if self.at(TokenKind::IntLiteral) {
            let size = self.parse_integer()?;
            Ok(self.push(NodeKind::IntegerTypeSize { size }, span))
        } else {
            Err(self.expected("integer"))
        }
    }

    fn parse_type_or_void(&mut self) -> PResult<NodeId> {
        if is_type_ref(self.kind) {
            self.parse_type_ref()
        } else if self.at(TokenKind::Void) {
            self.parse_base_type()
        } else if self.at(TokenKind::Ident) {
            let span = self.span;
            let name = self.sym.expect("word tokens are interned");
            self.bump();
            Ok(self.push(NodeKind::Name { name }, span))
        } else {
            Err(self.expected("type"))
        }
    }

    fn parse_type_arg(&mut self) -> PResult<NodeId> {
        if !is_type_arg(self.kind) {
            return Err(self.expected("type argument"));
        }
        let span = self.span;
        let arg = if self.at(TokenKind::Dontcare) {
            self.bump();
            self.push(NodeKind::Dontcare, span)
        } else if is_type_ref(self.kind) {
            self.parse_type_ref()?
        } else {
            self.parse_non_type_name()?
        };
        Ok(self.push(NodeKind::TypeArg { arg }, span))
    }

    fn parse_type_argument_list(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::TypeArgumentList);
        if is_type_arg(self.kind) {
            let first = self.parse_type_arg()?;
            self.ast.append_child(list, first);
            while self.at(TokenKind::Comma) {
                self.bump();
                let arg = self.parse_type_arg()?;
                self.ast.append_child(list, arg);
            }
        }
        Ok(list)
    }

    fn parse_type_declaration(&mut self) -> PResult<NodeId> {
        if !is_type_declaration(self.kind) {
            return Err(self.expected("type declaration"));
        }
        let span = self.span;
        let decl = match self.kind {
            k if is_derived_type_declaration(k) => self.parse_derived_type_declaration()?,
            TokenKind::Typedef => self.parse_typedef_declaration()?,
            TokenKind::Parser => self.parse_parser_type_declaration()?,
            TokenKind::Control => self.parse_control_type_declaration()?,
            TokenKind::Package => {
                let pkg = self.parse_package_type_declaration()?;
                self.expect(TokenKind::Semicolon, "`;`")?;
                pkg
            }
            _ => unreachable!("type declaration dispatch"),
        };
        Ok(self.push(NodeKind::TypeDeclaration { decl }, span))
    }

    fn parse_derived_type_declaration(&mut self) -> PResult<NodeId> {
        if !is_derived_type_declaration(self.kind) {
            return Err(self.expected("structure declaration"));
        }
        let span = self.span;
        let decl = match self.kind {
            TokenKind::Header => self.parse_header_type_declaration()?,
            TokenKind::HeaderUnion => self.parse_header_union_declaration()?,
            TokenKind::Struct => self.parse_struct_type_declaration()?,
            TokenKind::Enum => self.parse_enum_declaration()?,
            _ => unreachable!("derived type dispatch"),
        };
        Ok(self.push(NodeKind::DerivedTypeDeclaration { decl }, span))
    }

    fn parse_header_type_declaration(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::Header, "`header`")?;
        let span = self.span;
        if !is_name(self.kind) {
            return Err(self.expected("name"));
        }
        let name = self.parse_name()?;
        self.bind_type(name);
        self.expect(TokenKind::LBrace, "`{`")?;
        let fields = self.parse_struct_field_list()?;
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(self.push(NodeKind::HeaderTypeDeclaration { name, fields }, span))
    }

    fn parse_header_union_declaration(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::HeaderUnion, "`header_union`")?;
        let span = self.span;
        if !is_name(self.kind) {
            return Err(self.expected("name"));
        }
        let name = self.parse_name()?;
        self.bind_type(name);
        self.expect(TokenKind::LBrace, "`{`")?;
        let fields = self.parse_struct_field_list()?;
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(self.push(NodeKind::HeaderUnionDeclaration { name, fields }, span))
    }

    fn parse_struct_type_declaration(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::Struct, "`struct`")?;
        let span = self.span;
        if !is_name(self.kind) {
            return Err(self.expected("name"));
        }
        let name = self.parse_name()?;
        self.bind_type(name);
        self.expect(TokenKind::LBrace, "`{`")?;
        let fields = self.parse_struct_field_list()?;
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(self.push(NodeKind::StructTypeDeclaration { name, fields }, span))
    }

    fn parse_struct_field_list(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::StructFieldList);
        while is_struct_field(self.kind) {
            let field = self.parse_struct_field()?;
            self.ast.append_child(list, field);
        }
        Ok(list)
    }

    fn parse_struct_field(&mut self) -> PResult<NodeId> {
        if !is_struct_field(self.kind) {
            return Err(self.expected("struct field"));
        }
        let span = self.span;
        let ty = self.parse_type_ref()?;
        if !is_name(self.kind) {
            return Err(self.expected("name"));
        }
        let name = self.parse_name()?;
        self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(self.push(NodeKind::StructField { ty, name }, span))
    }

    fn parse_enum_declaration(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::Enum, "`enum`")?;
        let span = self.span;
        let width = if self.at(TokenKind::Bit) {
            self.bump();
            self.expect(TokenKind::Lt, "`<`")?;
            if !self.at(TokenKind::IntLiteral) {
                return Err(self.expected("an integer"));
            }
            let width = self.parse_integer()?;
            self.expect(TokenKind::Gt, "`>`")?;
            Some(width)
        } else {
            None
        };
        if !is_name(self.kind) {
            return Err(self.expected("name"));
        }
        let name = self.parse_name()?;
        self.bind_type(name);
        self.expect(TokenKind::LBrace, "`{`")?;
        if !is_name(self.kind) {
            return Err(self.expected("name"));
        }
        let fields = self.parse_specified_identifier_list()?;
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(self.push(NodeKind::EnumDeclaration { width, name, fields }, span))
    }

    fn parse_error_declaration(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::Error, "`error`")?;
        let span = self.span;
        self.expect(TokenKind::LBrace, "`{`")?;
        if !is_name(self.kind) {
            return Err(self.expected("name"));
        }
        let fields = self.parse_identifier_list()?;
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(self.push(NodeKind::ErrorDeclaration { fields }, span))
    }

    fn parse_match_kind_declaration(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::MatchKind, "`match_kind`")?;
        let span = self.span;
        self.expect(TokenKind::LBrace, "`{`")?;
        if !is_name(self.kind) {
            return Err(self.expected("name"));
        }
        let fields = self.parse_identifier_list()?;
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(self.push(NodeKind::MatchKindDeclaration { fields }, span))
    }

    fn parse_identifier_list(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::IdentifierList);
        if is_name(self.kind) {
            let first = self.parse_name()?;
            self.ast.append_child(list, first);
            while self.at(TokenKind::Comma) {
                self.bump();
                let name = self.parse_name()?;
                self.ast.append_child(list, name);
            }
        }
        Ok(list)
    }

    fn parse_specified_identifier_list(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::SpecifiedIdentifierList);
        if is_name(self.kind) {
            let first = self.parse_specified_identifier()?;
            self.ast.append_child(list, first);
            while self.at(TokenKind::Comma) {
                self.bump();
                let next = self.parse_specified_identifier()?;
                self.ast.append_child(list, next);
            }
        }
        Ok(list)
    }

    fn parse_specified_identifier(&mut self) -> PResult<NodeId> {
        if !is_name(self.kind) {
            return Err(self.expected("name"));
        }
        let span = self.span;
        let name = self.parse_name()?;
        let init = if self.at(TokenKind::Eq) {
            self.bump();
            if !is_expression(self.kind) {
                return Err(self.expected("expression"));
            }
            Some(self.parse_expression(1)?)
        } else {
            None
        };
        Ok(self.push(NodeKind::SpecifiedIdentifier { name, init }, span))
    }

    fn parse_typedef_declaration(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::Typedef, "`typedef`")?;
        if !is_type_ref(self.kind) && !is_derived_type_declaration(self.kind) {
            return Err(self.expected("type"));
        }
        let ty = if is_type_ref(self.kind) {
            self.parse_type_ref()?
        } else {
            self.parse_derived_type_declaration()?
        };
        let span = self.span;
        if !is_name(self.kind) {
            return Err(self.expected("name"));
        }
        let name = self.parse_name()?;
        self.bind_type(name);
        self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(self.push(NodeKind::TypedefDeclaration { ty, name }, span))
    }

    // ── Statements ─────────────────────────────────────────────────

    fn parse_assignment_or_method_call(&mut self) -> PResult<NodeId> {
        if !is_lvalue(self.kind) {
            return Err(self.expected("lvalue"));
        }
        let lvalue = self.parse_lvalue()?;
        let span = self.span;
        if self.at(TokenKind::LParen) {
            self.bump();
            let args = self.parse_argument_list()?;
            self.expect(TokenKind::RParen, "`)`")?;
            self.expect(TokenKind::Semicolon, "`;`")?;
            Ok(self.push(NodeKind::FunctionCall { callee: lvalue, args }, span))
        } else if self.at(TokenKind::Eq) {
            self.bump();
            let rhs = self.parse_expression(1)?;
            self.expect(TokenKind::Semicolon, "`;`")?;
            Ok(self.push(NodeKind::AssignmentStatement { lhs: lvalue, rhs }, span))
        } else {
            Err(self.expected("assignment or function call"))
        }
    }

    fn parse_return_statement(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::Return, "`return`")?;
        let span = self.span;
        let expr = if is_expression(self.kind) {
            Some(self.parse_expression(1)?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(self.push(NodeKind::ReturnStatement { expr }, span))
    }

    fn parse_exit_statement(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::Exit, "`exit`")?;
        let span = self.span;
        self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(self.push(NodeKind::ExitStatement, span))
    }

    fn parse_conditional_statement(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::If, "`if`")?;
        let span = self.span;
        self.expect(TokenKind::LParen, "`(`")?;
        if !is_expression(self.kind) {
            return Err(self.expected("expression"));
        }
        let cond = self.parse_expression(1)?;
        self.expect(TokenKind::RParen, "`)`")?;
        if !is_statement(self.kind) {
            return Err(self.expected("statement"));
        }
        let then_stmt = self.parse_statement(None)?;
        let else_stmt = if self.at(TokenKind::Else) {
            self.bump();
            if !is_statement(self.kind) {
                return Err(self.expected("statement"));
            }
            Some(self.parse_statement(None)?)
        } else {
            None
        };
        Ok(self.push(NodeKind::ConditionalStatement { cond, then_stmt, else_stmt }, span))
    }

    fn parse_direct_application(&mut self, type_name: Option<NodeId>) -> PResult<NodeId> {
        if type_name.is_none() && !self.at(TokenKind::TypeIdent) {
            return Err(self.expected("type name"));
        }
        let span = self.span;
        let name = match type_name {
            Some(name) => name,
            None => self.parse_type_name()?,
        };
        self.expect(TokenKind::Dot, "`.`")?;
        self.expect(TokenKind::Apply, "`apply`")?;
        self.expect(TokenKind::LParen, "`(`")?;
        let args = self.parse_argument_list()?;
        self.expect(TokenKind::RParen, "`)`")?;
        self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(self.push(NodeKind::DirectApplication { name, args }, span))
    }

    fn parse_statement(&mut self, type_name: Option<NodeId>) -> PResult<NodeId> {
        if !is_statement(self.kind) && type_name.is_none() {
            return Err(self.expected("statement"));
        }
        let span = self.span;
        let stmt = if self.at(TokenKind::TypeIdent) || type_name.is_some() {
            self.parse_direct_application(type_name)?
        } else if is_assignment_or_method_call(self.kind) {
            self.parse_assignment_or_method_call()?
        } else if self.at(TokenKind::If) {
            self.parse_conditional_statement()?
        } else if self.at(TokenKind::Semicolon) {
            self.bump();
            self.push(NodeKind::EmptyStatement, span)
        } else if self.at(TokenKind::LBrace) {
            self.parse_block_statement()?
        } else if self.at(TokenKind::Exit) {
            self.parse_exit_statement()?
        } else if self.at(TokenKind::Return) {
            self.parse_return_statement()?
        } else if self.at(TokenKind::Switch) {
            self.parse_switch_statement()?
        } else {
            return Err(self.expected("statement"));
        };
        Ok(self.push(NodeKind::Statement { stmt }, span))
    }

    fn parse_block_statement(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::LBrace, "`{`")?;
        let span = self.span;
        let stmts = self.parse_statement_or_decl_list()?;
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(self.push(NodeKind::BlockStatement { stmts }, span))
    }

    fn parse_statement_or_decl_list(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::StatementOrDeclList);
        while is_statement_or_declaration(self.kind) {
            let item = self.parse_statement_or_declaration()?;
            self.ast.append_child(list, item);
        }
        Ok(list)
    }

    fn parse_switch_statement(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::Switch, "`switch`")?;
        let span = self.span;
        self.expect(TokenKind::LParen, "`(`")?;
        let expr = self.parse_expression(1)?;
        self.expect(TokenKind::RParen, "`)`")?;
        self.expect(TokenKind::LBrace, "`{`")?;
        let cases = self.parse_switch_cases()?;
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(self.push(NodeKind::SwitchStatement { expr, cases }, span))
    }

    fn parse_switch_cases(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::SwitchCases);
        while is_switch_label(self.kind) {
            let case = self.parse_switch_case()?;
            self.ast.append_child(list, case);
        }
        Ok(list)
    }

    fn parse_switch_case(&mut self) -> PResult<NodeId> {
        if !is_switch_label(self.kind) {
            return Err(self.expected("switch label"));
        }
        let span = self.span;
        let label = self.parse_switch_label()?;
        self.expect(TokenKind::Colon, "`:`")?;
        let stmt = if self.at(TokenKind::LBrace) {
            Some(self.parse_block_statement()?)
        } else {
            None
        };
        Ok(self.push(NodeKind::SwitchCase { label, stmt }, span))
    }

    fn parse_switch_label(&mut self) -> PResult<NodeId> {
        let span = self.span;
        let label = if is_name(self.kind) {
            self.parse_name()?
        } else if self.at(TokenKind::Default) {
            self.bump();
            self.push(NodeKind::Default, span)
        } else {
            return Err(self.expected("switch label"));
        };
        Ok(self.push(NodeKind::SwitchLabel { label }, span))
    }

    fn parse_statement_or_declaration(&mut self) -> PResult<NodeId> {
        if !is_statement_or_declaration(self.kind) {
            return Err(self.expected("statement"));
        }
        let span = self.span;
        let stmt = if is_type_ref(self.kind) {
            let type_ref = self.parse_type_ref()?;
            if self.at(TokenKind::LParen) {
                self.parse_instantiation(Some(type_ref))?
            } else if is_name(self.kind) {
                self.parse_variable_declaration(Some(type_ref))?
            } else {
                self.parse_statement(Some(type_ref))?
            }
        } else if self.at(TokenKind::Const) {
            self.parse_variable_declaration(None)?
        } else {
            self.parse_statement(None)?
        };
        Ok(self.push(NodeKind::StatementOrDeclaration { stmt }, span))
    }

    // ── Tables ─────────────────────────────────────────────────────

    fn parse_table_declaration(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::Table, "`table`")?;
        let span = self.span;
        let name = self.parse_name()?;
        self.expect(TokenKind::LBrace, "`{`")?;
        if !is_table_property(self.kind) {
            return Err(self.expected("table property"));
        }
        let props = self.parse_table_property_list()?;
        self.expect(TokenKind::RBrace, "`}`")?;
        Ok(self.push(NodeKind::TableDeclaration { name, props }, span))
    }

    fn parse_table_property_list(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::TablePropertyList);
        while is_table_property(self.kind) {
            let prop = self.parse_table_property()?;
            self.ast.append_child(list, prop);
        }
        Ok(list)
    }

    fn parse_table_property(&mut self) -> PResult<NodeId> {
        if !is_table_property(self.kind) {
            return Err(self.expected("table property"));
        }
        let mut is_const = false;
        if self.at(TokenKind::Const) {
            self.bump();
            is_const = true;
        }
        let span = self.span;
        let prop = match self.kind {
            TokenKind::Key => {
                self.bump();
                let prop_span = self.span;
                self.expect(TokenKind::Eq, "`=`")?;
                self.expect(TokenKind::LBrace, "`{`")?;
                let keys = self.parse_key_element_list()?;
                self.expect(TokenKind::RBrace, "`}`")?;
                self.push(NodeKind::KeyProperty { keys }, prop_span)
            }
            TokenKind::Actions => {
                self.bump();
                let prop_span = self.span;
                self.expect(TokenKind::Eq, "`=`")?;
                self.expect(TokenKind::LBrace, "`{`")?;
                let actions = self.parse_action_list()?;
                self.expect(TokenKind::RBrace, "`}`")?;
                self.push(NodeKind::ActionsProperty { actions }, prop_span)
            }
            TokenKind::Entries => {
                self.bump();
                let prop_span = self.span;
                self.expect(TokenKind::Eq, "`=`")?;
                self.expect(TokenKind::LBrace, "`{`")?;
                if !is_keyset_expression(self.kind) {
                    return Err(self.expected("keyset expression"));
                }
                let entries = self.parse_entries_list()?;
                self.expect(TokenKind::RBrace, "`}`")?;
                self.push(NodeKind::EntriesProperty { entries }, prop_span)
            }
            k if is_non_table_kw_name(k) => {
                let prop_span = self.span;
                let name = self.parse_name()?;
                self.expect(TokenKind::Eq, "`=`")?;
                let init = self.parse_expression(1)?;
                self.expect(TokenKind::Semicolon, "`;`")?;
                self.push(NodeKind::SimpleProperty { is_const, name, init }, prop_span)
            }
            _ => unreachable!("table property dispatch"),
        };
        Ok(self.push(NodeKind::TableProperty { prop }, span))
    }

    fn parse_key_element_list(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::KeyElementList);
        while is_expression(self.kind) {
            let elem = self.parse_key_element()?;
            self.ast.append_child(list, elem);
        }
        Ok(list)
    }

    fn parse_key_element(&mut self) -> PResult<NodeId> {
        if !is_expression(self.kind) {
            return Err(self.expected("expression"));
        }
        let span = self.span;
        let expr = self.parse_expression(1)?;
        self.expect(TokenKind::Colon, "`:`")?;
        let match_kind = self.parse_name()?;
        self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(self.push(NodeKind::KeyElement { expr, match_kind }, span))
    }

    fn parse_action_list(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::ActionList);
        while is_action_ref(self.kind) {
            let action = self.parse_action_ref()?;
            self.ast.append_child(list, action);
            self.expect(TokenKind::Semicolon, "`;`")?;
        }
        Ok(list)
    }

    fn parse_action_ref(&mut self) -> PResult<NodeId> {
        if !is_non_type_name(self.kind) {
            return Err(self.expected("non-type name"));
        }
        let span = self.span;
        let name = self.parse_non_type_name()?;
        let args = if self.at(TokenKind::LParen) {
            self.bump();
            if is_argument(self.kind) {
                let args = self.parse_argument_list()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Some(args)
            } else if self.at(TokenKind::RParen) {
                self.bump();
                None
            } else {
                return Err(self.expected("`)`"));
            }
        } else {
            None
        };
        Ok(self.push(NodeKind::ActionRef { name, args }, span))
    }

    fn parse_entries_list(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::EntriesList);
        while is_keyset_expression(self.kind) {
            let entry = self.parse_entry()?;
            self.ast.append_child(list, entry);
        }
        Ok(list)
    }

    fn parse_entry(&mut self) -> PResult<NodeId> {
        if !is_keyset_expression(self.kind) {
            return Err(self.expected("keyset"));
        }
        let span = self.span;
        let keyset = self.parse_keyset_expression()?;
        self.expect(TokenKind::Colon, "`:`")?;
        let action = self.parse_action_ref()?;
        self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(self.push(NodeKind::Entry { keyset, action }, span))
    }

    fn parse_action_declaration(&mut self) -> PResult<NodeId> {
        self.expect(TokenKind::Action, "`action`")?;
        let span = self.span;
        if !is_name(self.kind) {
            return Err(self.expected("name"));
        }
        let name = self.parse_name()?;
        self.expect(TokenKind::LParen, "`(`")?;
        let params = self.parse_parameter_list()?;
        self.expect(TokenKind::RParen, "`)`")?;
        if !self.at(TokenKind::LBrace) {
            return Err(self.expected("`{`"));
        }
        let body = self.parse_block_statement()?;
        Ok(self.push(NodeKind::ActionDeclaration { name, params, body }, span))
    }

    // ── Variables ──────────────────────────────────────────────────

    fn parse_variable_declaration(&mut self, type_ref: Option<NodeId>) -> PResult<NodeId> {
        let mut is_const = false;
        if self.at(TokenKind::Const) {
            self.bump();
            is_const = true;
        }
        if type_ref.is_none() && !is_type_ref(self.kind) {
            return Err(self.expected("type"));
        }
        let ty = match type_ref {
            Some(ty) => ty,
            None => self.parse_type_ref()?,
        };
        let span = self.span;
        if !is_name(self.kind) {
            return Err(self.expected("name"));
        }
        let name = self.parse_name()?;
        let init = if self.at(TokenKind::Eq) {
            self.bump();
            Some(self.parse_expression(1)?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "`;`")?;
        Ok(self.push(NodeKind::VariableDeclaration { is_const, ty, name, init }, span))
    }

    // ── Functions and expressions ──────────────────────────────────

    fn parse_function_declaration(&mut self, type_ref: NodeId) -> PResult<NodeId> {
        let span = self.span;
        let proto = self.parse_function_prototype(Some(type_ref))?;
        if !self.at(TokenKind::LBrace) {
            return Err(self.expected("`{`"));
        }
        let body = self.parse_block_statement()?;
        Ok(self.push(NodeKind::FunctionDeclaration { proto, body }, span))
    }

    fn parse_argument_list(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::ArgumentList);
        if is_argument(self.kind) {
            let first = self.parse_argument()?;
            self.ast.append_child(list, first);
            while self.at(TokenKind::Comma) {
                self.bump();
                let arg = self.parse_argument()?;
                self.ast.append_child(list, arg);
            }
        }
        Ok(list)
    }

    fn parse_argument(&mut self) -> PResult<NodeId> {
        if !is_argument(self.kind) {
            return Err(self.expected("an argument"));
        }
        let span = self.span;
        let arg = if is_expression(self.kind) {
            self.parse_expression(1)?
        } else if self.at(TokenKind::Dontcare) {
            self.bump();
            self.push(NodeKind::Dontcare, span)
        } else {
            return Err(self.expected("an argument"));
        };
        Ok(self.push(NodeKind::Argument { arg }, span))
    }

    fn parse_expression_list(&mut self) -> PResult<NodeId> {
        let list = self.push_list(NodeKind::ExpressionList);
        if is_expression(self.kind) {
            let first = self.parse_expression(1)?;
            self.ast.append_child(list, first);
            while self.at(TokenKind::Comma) {
                self.bump();
                let next = self.parse_expression(1)?;
                self.ast.append_child(list, next);
            }
        }
        Ok(list)
    }

    fn parse_lvalue(&mut self) -> PResult<NodeId> {
        if !is_lvalue(self.kind) {
            return Err(self.expected("lvalue"));
        }
        let span = self.span;
        let base = self.parse_non_type_name()?;
        let mut lvalue = self.push(NodeKind::LvalueExpression { expr: base }, span);
        while self.at(TokenKind::Dot) || self.at(TokenKind::LBracket) {
            if self.at(TokenKind::Dot) {
                self.bump();
                let sel_span = self.span;
                if !is_name(self.kind) {
                    return Err(self.expected("name"));
                }
                let name = self.parse_name()?;
                let selector =
                    self.push(NodeKind::MemberSelector { lhs: lvalue, name }, sel_span);
                lvalue = self.push(NodeKind::LvalueExpression { expr: selector }, sel_span);
            } else {
                self.bump();
                let sub_span = self.span;
                let index = self.parse_index_expression()?;
                self.expect(TokenKind::RBracket, "`]`")?;
                let subscript =
                    self.push(NodeKind::ArraySubscript { lhs: lvalue, index }, sub_span);
                lvalue = self.push(NodeKind::LvalueExpression { expr: subscript }, sub_span);
            }
        }
        Ok(lvalue)
    }

    fn parse_expression(&mut self, threshold: u32) -> PResult<NodeId> {
        if !is_expression(self.kind) {
            return Err(self.expected("expression"));
        }
        let mut primary = self.parse_expression_primary()?;
        while is_expr_operator(self.kind) {
            match self.kind {
                TokenKind::Dot => {
                    self.bump();
                    let span = self.span;
                    if !is_non_type_name(self.kind) {
                        return Err(self.expected("non-type name"));
                    }
                    let name = self.parse_non_type_name()?;
                    let selector = self.push(NodeKind::MemberSelector { lhs: primary, name }, span);
                    primary = self.push(NodeKind::Expression { expr: selector }, span);
                }
                TokenKind::LBracket => {
                    self.bump();
                    let span = self.span;
                    let index = self.parse_index_expression()?;
                    self.expect(TokenKind::RBracket, "`]`")?;
                    let subscript = self.push(NodeKind::ArraySubscript { lhs: primary, index }, span);
                    primary = self.push(NodeKind::Expression { expr: subscript }, span);
                }
                TokenKind::LParen => {
                    self.bump();
                    let span = self.span;
                    let args = self.parse_argument_list()?;
                    self.expect(TokenKind::RParen, "`)`")?;
                    let call = self.push(NodeKind::FunctionCall { callee: primary, args }, span);
                    primary = self.push(NodeKind::Expression { expr: call }, span);
                }
                TokenKind::Eq => {
                    self.bump();
                    let span = self.span;
                    let rhs = self.parse_expression(1)?;
                    let assign =
                        self.push(NodeKind::AssignmentStatement { lhs: primary, rhs }, span);
                    primary = self.push(NodeKind::Expression { expr: assign }, span);
                }
                k if is_binary_operator(k) => {
                    let priority = operator_priority(k);
                    if priority < threshold {
                        break;
                    }
                    let op = binop_of(k);
                    let span = self.span;
                    self.bump();
                    let rhs = self.parse_expression(priority + 1)?;
                    let bin =
                        self.push(NodeKind::BinaryExpression { op, lhs: primary, rhs }, span);
                    primary = self.push(NodeKind::Expression { expr: bin }, span);
                }
                _ => unreachable!("expression operator dispatch"),
            }
        }
        Ok(primary)
    }

    fn parse_expression_primary(&mut self) -> PResult<NodeId> {
        if !is_expression(self.kind) {
            return Err(self.expected("expression"));
        }
        let span = self.span;
        let expr = match self.kind {
            TokenKind::IntLiteral => self.parse_integer()?,
            TokenKind::True | TokenKind::False => self.parse_boolean()?,
            TokenKind::StringLiteral => self.parse_string()?,
            TokenKind::Dot => {
                // A global name: `.name` or `.TypeName`.
                self.bump();
                if self.at(TokenKind::Ident) {
                    self.parse_non_type_name()?
                } else if self.at(TokenKind::TypeIdent) {
                    self.parse_type_name()?
                } else {
                    return Err(self.unexpected());
                }
            }
            k if is_non_type_name(k) => self.parse_non_type_name()?,
            TokenKind::LBrace => {
                self.bump();
                let exprs = self.parse_expression_list()?;
                self.expect(TokenKind::RBrace, "`}`")?;
                exprs
            }
            TokenKind::LParen => {
                self.bump();
                if self.at(TokenKind::TypeIdent) && self.peek_kind() == TokenKind::Dot {
                    // (TypeName.member)
                    let inner = self.parse_expression(1)?;
                    self.expect(TokenKind::RParen, "`)`")?;
                    inner
                } else if is_type_ref(self.kind) {
                    let cast_span = self.span;
                    let ty = self.parse_type_ref()?;
                    self.expect(TokenKind::RParen, "`)`")?;
                    // A cast binds tighter than any binary operator.
                    let operand = self.parse_expression(10)?;
                    self.push(NodeKind::CastExpression { ty, expr: operand }, cast_span)
                } else if is_expression(self.kind) {
                    let inner = self.parse_expression(1)?;
                    self.expect(TokenKind::RParen, "`)`")?;
                    inner
                } else {
                    return Err(self.expected("expression"));
                }
            }
            TokenKind::Bang => {
                self.bump();
                let operand = self.parse_expression(1)?;
                self.push(NodeKind::UnaryExpression { op: UnOp::Not, operand }, span)
            }
            TokenKind::Tilde => {
                self.bump();
                let operand = self.parse_expression(1)?;
                self.push(NodeKind::UnaryExpression { op: UnOp::BitNot, operand }, span)
            }
            TokenKind::UnaryMinus => {
                self.bump();
                let operand = self.parse_expression(1)?;
                self.push(NodeKind::UnaryExpression { op: UnOp::Neg, operand }, span)
            }
            TokenKind::TypeIdent => self.parse_type_name()?,
            TokenKind::Error => {
                // `error` used as a value, e.g. `error.NoMatch`.
                let name = self.sym.expect("word tokens are interned");
                self.bump();
                self.push(NodeKind::Name { name }, span)
            }
            _ => unreachable!("expression primary dispatch"),
        };
        Ok(self.push(NodeKind::Expression { expr }, span))
    }

    fn parse_index_expression(&mut self) -> PResult<NodeId> {
        if !is_expression(self.kind) {
            return Err(self.expected("expression or `:`"));
        }
        let span = self.span;
        let start = self.parse_expression(1)?;
        let end = if self.at(TokenKind::Colon) {
            self.bump();
            if !is_expression(self.kind) {
                return Err(self.expected("expression"));
            }
            Some(self.parse_expression(1)?)
        } else {
            None
        };
        Ok(self.push(NodeKind::IndexExpression { start, end }, span))
    }

    fn parse_integer(&mut self) -> PResult<NodeId> {
        if self.at(TokenKind::IntLiteral) {
            let span = self.span;
            let value = self.tokens.get(self.pos).int.expect("integer token has a payload");
            self.bump();
            Ok(self.push(NodeKind::IntegerLiteral { value }, span))
        } else {
            Err(self.expected("integer"))
        }
    }

    fn parse_boolean(&mut self) -> PResult<NodeId> {
        if self.at(TokenKind::True) || self.at(TokenKind::False) {
            let span = self.span;
            let value = self.at(TokenKind::True);
            self.bump();
            Ok(self.push(NodeKind::BooleanLiteral { value }, span))
        } else {
            Err(self.expected("boolean"))
        }
    }

    fn parse_string(&mut self) -> PResult<NodeId> {
        if self.at(TokenKind::StringLiteral) {
            let span = self.span;
            let text = p4_lexer::unescape(self.src.slice(span));
            let value = self.interner.intern(&text);
            self.bump();
            Ok(self.push(NodeKind::StringLiteral { value }, span))
        } else {
            Err(self.expected("string"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p4_arena::MemoryPool;

    fn parse_ok(text: &str) -> (Parse, Interner) {
        let pool = MemoryPool::reserve(16 << 20);
        let mut interner = Interner::new(pool);
        let src = SourceText::new("test.p4", text);
        let tokens = p4_lexer::tokenize(&src, false).expect("lexes");
        let parse = parse(&src, &tokens, &mut interner).expect("parses");
        (parse, interner)
    }

    fn parse_err(text: &str) -> Diagnostic {
        let pool = MemoryPool::reserve(16 << 20);
        let mut interner = Interner::new(pool);
        let src = SourceText::new("test.p4", text);
        let tokens = p4_lexer::tokenize(&src, false).expect("lexes");
        parse(&src, &tokens, &mut interner).expect_err("must fail")
    }

    fn decls_of(parse: &Parse) -> Vec<NodeId> {
        let NodeKind::P4Program { decls } = *parse.ast.kind(parse.root) else {
            panic!("root is not a program");
        };
        parse.ast.children(decls).collect()
    }

    #[test]
    fn empty_program() {
        let (parse, _) = parse_ok(";;");
        assert!(decls_of(&parse).is_empty());
    }

    #[test]
    fn header_declaration_has_fields_in_order() {
        let (parse, interner) = parse_ok("header H { bit<8> a; bit<16> b; }");
        let decls = decls_of(&parse);
        assert_eq!(decls.len(), 1);
        let NodeKind::Declaration { decl } = *parse.ast.kind(decls[0]) else { panic!() };
        let NodeKind::TypeDeclaration { decl } = *parse.ast.kind(decl) else { panic!() };
        let NodeKind::DerivedTypeDeclaration { decl } = *parse.ast.kind(decl) else { panic!() };
        let NodeKind::HeaderTypeDeclaration { name, fields } = *parse.ast.kind(decl) else {
            panic!()
        };
        assert_eq!(interner.resolve(parse.ast.name_of(name)), "H");
        let field_names: Vec<&str> = parse
            .ast
            .children(fields)
            .map(|f| {
                let NodeKind::StructField { name, .. } = *parse.ast.kind(f) else { panic!() };
                interner.resolve(parse.ast.name_of(name))
            })
            .collect();
        assert_eq!(field_names, vec!["a", "b"]);
    }

    #[test]
    fn declared_type_name_retags_later_uses() {
        // The second use of `H` must parse as a named type, which only
        // works if the parser bound `H` when it parsed the header.
        let (parse, _) = parse_ok("header H { bit<8> f; } struct S { H h; }");
        assert_eq!(decls_of(&parse).len(), 2);
    }

    #[test]
    fn const_declaration_with_width_literal() {
        let (parse, interner) = parse_ok("const bit<8> X = 8w0xff;");
        let decls = decls_of(&parse);
        let NodeKind::Declaration { decl } = *parse.ast.kind(decls[0]) else { panic!() };
        let NodeKind::VariableDeclaration { is_const, name, init, .. } = *parse.ast.kind(decl)
        else {
            panic!()
        };
        assert!(is_const);
        assert_eq!(interner.resolve(parse.ast.name_of(name)), "X");
        let NodeKind::Expression { expr } = *parse.ast.kind(init.unwrap()) else { panic!() };
        let NodeKind::IntegerLiteral { value } = *parse.ast.kind(expr) else { panic!() };
        assert_eq!(value.value, 255);
        assert_eq!(value.width, Some(8));
        assert!(!value.signed);
    }

    #[test]
    fn parser_with_start_state() {
        let (parse, interner) =
            parse_ok("parser P(bit<8> x) { state start { transition accept; } }");
        let decls = decls_of(&parse);
        let NodeKind::Declaration { decl } = *parse.ast.kind(decls[0]) else { panic!() };
        let NodeKind::ParserDeclaration { states, .. } = *parse.ast.kind(decl) else { panic!() };
        let states: Vec<NodeId> = parse.ast.children(states).collect();
        assert_eq!(states.len(), 1);
        let NodeKind::ParserState { name, transition, .. } = *parse.ast.kind(states[0]) else {
            panic!()
        };
        assert_eq!(interner.resolve(parse.ast.name_of(name)), "start");
        let NodeKind::TransitionStatement { expr } = *parse.ast.kind(transition) else { panic!() };
        let NodeKind::StateExpression { expr } = *parse.ast.kind(expr) else { panic!() };
        let NodeKind::Name { name } = *parse.ast.kind(expr) else { panic!() };
        assert_eq!(interner.resolve(name), "accept");
    }

    #[test]
    fn select_transition() {
        let (parse, _) = parse_ok(
            "parser P(bit<8> x) {
               state start {
                 transition select(x) {
                   0: accept;
                   default: reject;
                 }
               }
             }",
        );
        assert_eq!(decls_of(&parse).len(), 1);
    }

    #[test]
    fn control_with_action_and_table() {
        let (parse, _) = parse_ok(
            "control C(inout bit<8> v) {
               action a(in bit<8> p) { v = p; }
               table t {
                 key = { v : exact; }
                 actions = { a; }
               }
               apply { t.apply(); }
             }",
        );
        assert_eq!(decls_of(&parse).len(), 1);
    }

    #[test]
    fn binary_precedence_nests_multiplication_deeper() {
        let (parse, _) = parse_ok("const int x = 1 + 2 * 3;");
        let decls = decls_of(&parse);
        let NodeKind::Declaration { decl } = *parse.ast.kind(decls[0]) else { panic!() };
        let NodeKind::VariableDeclaration { init, .. } = *parse.ast.kind(decl) else { panic!() };
        let NodeKind::Expression { expr } = *parse.ast.kind(init.unwrap()) else { panic!() };
        let NodeKind::BinaryExpression { op, rhs, .. } = *parse.ast.kind(expr) else { panic!() };
        assert_eq!(op, BinOp::Add);
        let NodeKind::Expression { expr } = *parse.ast.kind(rhs) else { panic!() };
        let NodeKind::BinaryExpression { op, .. } = *parse.ast.kind(expr) else { panic!() };
        assert_eq!(op, BinOp::Mul);
    }

    #[test]
    fn mask_operator_parses() {
        let (parse, _) = parse_ok(
            "parser P(bit<8> x) {
               state start {
                 transition select(x) { 0x0F &&& 0xF0: accept; }
               }
             }",
        );
        assert_eq!(decls_of(&parse).len(), 1);
    }

    #[test]
    fn cast_expression() {
        let (parse, _) = parse_ok("header H { bit<8> f; } const bit<16> x = (bit<16>) 3;");
        let decls = decls_of(&parse);
        let NodeKind::Declaration { decl } = *parse.ast.kind(decls[1]) else { panic!() };
        let NodeKind::VariableDeclaration { init, .. } = *parse.ast.kind(decl) else { panic!() };
        let NodeKind::Expression { expr } = *parse.ast.kind(init.unwrap()) else { panic!() };
        assert!(matches!(*parse.ast.kind(expr), NodeKind::CastExpression { .. }));
    }

    #[test]
    fn unary_minus_inside_parens() {
        let (parse, _) = parse_ok("const int x = (-1);");
        assert_eq!(decls_of(&parse).len(), 1);
    }

    #[test]
    fn extern_type_with_methods() {
        let (parse, _) = parse_ok(
            "extern Register {
               Register(bit<32> size);
               void read(out bit<32> value, in bit<32> index);
               void write(in bit<32> index, in bit<32> value);
             }",
        );
        assert_eq!(decls_of(&parse).len(), 1);
    }

    #[test]
    fn extern_function_prototype() {
        let (parse, _) = parse_ok("extern void mark_to_drop();");
        assert_eq!(decls_of(&parse).len(), 1);
    }

    #[test]
    fn error_and_match_kind_declarations() {
        let (parse, _) = parse_ok(
            "error { NoMatch, PacketTooShort }
             match_kind { exact, lpm, ternary }",
        );
        assert_eq!(decls_of(&parse).len(), 2);
    }

    #[test]
    fn typedef_and_enum() {
        let (parse, _) = parse_ok(
            "typedef bit<48> macAddr_t;
             enum Suits { Clubs, Diamonds, Hearts, Spades }
             enum bit<4> Code { Ok = 0, Fail = 1 }",
        );
        assert_eq!(decls_of(&parse).len(), 3);
    }

    #[test]
    fn package_and_instantiation() {
        let (parse, _) = parse_ok(
            "parser P(bit<8> x);
             package Pipe(P p);
             parser MyP(bit<8> x) { state start { transition accept; } }
             Pipe(MyP()) main;",
        );
        assert_eq!(decls_of(&parse).len(), 4);
    }

    #[test]
    fn header_stack_type() {
        let (parse, _) = parse_ok("header H { bit<8> f; } struct S { H[4] stack; }");
        assert_eq!(decls_of(&parse).len(), 2);
    }

    #[test]
    fn tuple_type_reference() {
        let (parse, _) = parse_ok("typedef tuple<bit<8>, bool> pair_t;");
        assert_eq!(decls_of(&parse).len(), 1);
    }

    #[test]
    fn unexpected_token_is_syntax_error() {
        let d = parse_err("header H { bit<8> a }");
        assert_eq!(d.kind, DiagKind::Syntax);
        assert!(d.message.contains("`;` was expected"), "message: {}", d.message);
    }

    #[test]
    fn error_location_is_line_and_column() {
        let d = parse_err("header H {\n  bit<8> a\n}");
        assert_eq!((d.line, d.col), (3, 1));
    }

    #[test]
    fn unknown_top_level_token_fails() {
        let d = parse_err("42");
        assert_eq!(d.to_string(), "test.p4:1:1: error: unexpected token `42`.");
    }
}
