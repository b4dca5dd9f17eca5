//! The abstract syntax tree.
//!
//! Nodes live in an append-only store and refer to each other through
//! `NodeId` handles; no node is ever freed or rewritten after parsing.
//! List-shaped grammar productions are nodes themselves: they carry
//! the head and tail of a sibling chain, and `append_child` links a
//! new element in O(1). Wrapper kinds (declaration, statement,
//! expression, typeRef, ...) are kept from the grammar because the
//! semantic passes key scopes and dispatch off them.

use p4_arena::SegVec;
use p4_common::{IntValue, Span, Symbol};

/// Handle to a node in the [`Ast`] store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Head and tail of a list node's child chain.
#[derive(Clone, Copy, Debug, Default)]
pub struct NodeList {
    pub first: Option<NodeId>,
    pub last: Option<NodeId>,
}

/// Parameter direction, `in`/`out`/`inout` or unspecified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    None,
    In,
    Out,
    InOut,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    And,
    Or,
    Eq,
    NotEq,
    Less,
    Great,
    LessEq,
    GreatEq,
    Add,
    Sub,
    Mul,
    Div,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Mask,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Not,
    BitNot,
    Neg,
}

/// The exhaustive node-kind enumeration over the P4-16 grammar.
/// Payload fields are `NodeId` links into the same store.
#[derive(Clone, Copy, Debug)]
pub enum NodeKind {
    // ── Program ────────────────────────────────────────────────────
    P4Program { decls: NodeId },
    DeclarationList(NodeList),
    Declaration { decl: NodeId },
    Name { name: Symbol },
    ParameterList(NodeList),
    Parameter { direction: Direction, ty: NodeId, name: NodeId, init: Option<NodeId> },
    PackageTypeDeclaration { name: NodeId, params: NodeId },
    Instantiation { ty: NodeId, args: NodeId, name: NodeId },

    // ── Parser ─────────────────────────────────────────────────────
    ParserDeclaration { proto: NodeId, ctor_params: Option<NodeId>, locals: NodeId, states: NodeId },
    ParserTypeDeclaration { name: NodeId, params: NodeId },
    ParserLocalElements(NodeList),
    ParserLocalElement { element: NodeId },
    ParserStates(NodeList),
    ParserState { name: NodeId, stmts: NodeId, transition: NodeId },
    ParserStatements(NodeList),
    ParserStatement { stmt: NodeId },
    ParserBlockStatement { stmts: NodeId },
    TransitionStatement { expr: NodeId },
    StateExpression { expr: NodeId },
    SelectExpression { exprs: NodeId, cases: NodeId },
    SelectCaseList(NodeList),
    SelectCase { keyset: NodeId, name: NodeId },
    KeysetExpression { expr: NodeId },
    TupleKeysetExpression { exprs: NodeId },
    SimpleExpressionList(NodeList),
    SimpleKeysetExpression { expr: NodeId },

    // ── Control ────────────────────────────────────────────────────
    ControlDeclaration { proto: NodeId, ctor_params: Option<NodeId>, locals: NodeId, apply: NodeId },
    ControlTypeDeclaration { name: NodeId, params: NodeId },
    ControlLocalDeclarations(NodeList),
    ControlLocalDeclaration { decl: NodeId },

    // ── Extern ─────────────────────────────────────────────────────
    ExternDeclaration { decl: NodeId },
    ExternTypeDeclaration { name: NodeId, methods: NodeId },
    MethodPrototypes(NodeList),
    /// `return_ty` is `None` for the constructor prototype form.
    FunctionPrototype { return_ty: Option<NodeId>, name: NodeId, params: NodeId },

    // ── Types ──────────────────────────────────────────────────────
    TypeRef { ty: NodeId },
    TupleType { type_args: NodeId },
    HeaderStackType { ty: NodeId, size: NodeId },
    BaseTypeBool { name: NodeId },
    BaseTypeInt { name: NodeId, size: Option<NodeId> },
    BaseTypeBit { name: NodeId, size: Option<NodeId> },
    BaseTypeVarbit { name: NodeId, size: NodeId },
    BaseTypeString { name: NodeId },
    BaseTypeVoid { name: NodeId },
    BaseTypeError { name: NodeId },
    IntegerTypeSize { size: NodeId },
    TypeArg { arg: NodeId },
    TypeArgumentList(NodeList),
    TypeDeclaration { decl: NodeId },
    DerivedTypeDeclaration { decl: NodeId },
    HeaderTypeDeclaration { name: NodeId, fields: NodeId },
    HeaderUnionDeclaration { name: NodeId, fields: NodeId },
    StructTypeDeclaration { name: NodeId, fields: NodeId },
    StructFieldList(NodeList),
    StructField { ty: NodeId, name: NodeId },
    EnumDeclaration { width: Option<NodeId>, name: NodeId, fields: NodeId },
    ErrorDeclaration { fields: NodeId },
    MatchKindDeclaration { fields: NodeId },
    IdentifierList(NodeList),
    SpecifiedIdentifierList(NodeList),
    SpecifiedIdentifier { name: NodeId, init: Option<NodeId> },
    TypedefDeclaration { ty: NodeId, name: NodeId },

    // ── Statements ─────────────────────────────────────────────────
    AssignmentStatement { lhs: NodeId, rhs: NodeId },
    EmptyStatement,
    ReturnStatement { expr: Option<NodeId> },
    ExitStatement,
    ConditionalStatement { cond: NodeId, then_stmt: NodeId, else_stmt: Option<NodeId> },
    DirectApplication { name: NodeId, args: NodeId },
    Statement { stmt: NodeId },
    BlockStatement { stmts: NodeId },
    StatementOrDeclList(NodeList),
    SwitchStatement { expr: NodeId, cases: NodeId },
    SwitchCases(NodeList),
    SwitchCase { label: NodeId, stmt: Option<NodeId> },
    SwitchLabel { label: NodeId },
    StatementOrDeclaration { stmt: NodeId },

    // ── Tables ─────────────────────────────────────────────────────
    TableDeclaration { name: NodeId, props: NodeId },
    TablePropertyList(NodeList),
    TableProperty { prop: NodeId },
    KeyProperty { keys: NodeId },
    KeyElementList(NodeList),
    KeyElement { expr: NodeId, match_kind: NodeId },
    ActionsProperty { actions: NodeId },
    ActionList(NodeList),
    ActionRef { name: NodeId, args: Option<NodeId> },
    EntriesProperty { entries: NodeId },
    EntriesList(NodeList),
    Entry { keyset: NodeId, action: NodeId },
    SimpleProperty { is_const: bool, name: NodeId, init: NodeId },
    ActionDeclaration { name: NodeId, params: NodeId, body: NodeId },

    // ── Variables ──────────────────────────────────────────────────
    VariableDeclaration { is_const: bool, ty: NodeId, name: NodeId, init: Option<NodeId> },

    // ── Expressions ────────────────────────────────────────────────
    FunctionDeclaration { proto: NodeId, body: NodeId },
    ArgumentList(NodeList),
    Argument { arg: NodeId },
    ExpressionList(NodeList),
    Expression { expr: NodeId },
    LvalueExpression { expr: NodeId },
    BinaryExpression { op: BinOp, lhs: NodeId, rhs: NodeId },
    UnaryExpression { op: UnOp, operand: NodeId },
    FunctionCall { callee: NodeId, args: NodeId },
    MemberSelector { lhs: NodeId, name: NodeId },
    CastExpression { ty: NodeId, expr: NodeId },
    ArraySubscript { lhs: NodeId, index: NodeId },
    IndexExpression { start: NodeId, end: Option<NodeId> },
    IntegerLiteral { value: IntValue },
    BooleanLiteral { value: bool },
    StringLiteral { value: Symbol },
    Dontcare,
    Default,
}

#[derive(Clone, Copy, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub next_sibling: Option<NodeId>,
}

/// Append-only node store.
#[derive(Debug)]
pub struct Ast {
    nodes: SegVec<Node>,
}

impl Ast {
    pub fn new() -> Ast {
        Ast { nodes: SegVec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let index = self.nodes.push(Node { kind, span, next_sibling: None });
        NodeId(index as u32)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    /// The child chain of a list node.
    pub fn list(&self, id: NodeId) -> NodeList {
        self.try_list(id).unwrap_or_else(|| panic!("node {id:?} is not a list kind"))
    }

    fn try_list(&self, id: NodeId) -> Option<NodeList> {
        use NodeKind::*;
        match *self.kind(id) {
            DeclarationList(l) | ParameterList(l) | ParserLocalElements(l) | ParserStates(l)
            | ParserStatements(l) | SelectCaseList(l) | SimpleExpressionList(l)
            | ControlLocalDeclarations(l) | MethodPrototypes(l) | TypeArgumentList(l)
            | StructFieldList(l) | IdentifierList(l) | SpecifiedIdentifierList(l)
            | StatementOrDeclList(l) | SwitchCases(l) | TablePropertyList(l)
            | KeyElementList(l) | ActionList(l) | EntriesList(l) | ArgumentList(l)
            | ExpressionList(l) => Some(l),
            _ => None,
        }
    }

    fn try_list_mut(&mut self, id: NodeId) -> Option<&mut NodeList> {
        use NodeKind::*;
        match self.kind_mut(id) {
            DeclarationList(l) | ParameterList(l) | ParserLocalElements(l) | ParserStates(l)
            | ParserStatements(l) | SelectCaseList(l) | SimpleExpressionList(l)
            | ControlLocalDeclarations(l) | MethodPrototypes(l) | TypeArgumentList(l)
            | StructFieldList(l) | IdentifierList(l) | SpecifiedIdentifierList(l)
            | StatementOrDeclList(l) | SwitchCases(l) | TablePropertyList(l)
            | KeyElementList(l) | ActionList(l) | EntriesList(l) | ArgumentList(l)
            | ExpressionList(l) => Some(l),
            _ => None,
        }
    }

    /// Link `child` at the end of `list`'s chain in O(1).
    pub fn append_child(&mut self, list: NodeId, child: NodeId) {
        let tail = self.try_list(list).expect("append_child on a non-list node").last;
        match tail {
            Some(prev) => self.nodes[prev.index()].next_sibling = Some(child),
            None => self.try_list_mut(list).unwrap().first = Some(child),
        }
        self.try_list_mut(list).unwrap().last = Some(child);
    }

    /// Iterate a list node's children in source order.
    pub fn children(&self, list: NodeId) -> Children<'_> {
        Children { ast: self, cur: self.list(list).first }
    }

    /// The interned name of a `Name` node.
    pub fn name_of(&self, id: NodeId) -> Symbol {
        match *self.kind(id) {
            NodeKind::Name { name } => name,
            ref other => panic!("expected a name node, got {other:?}"),
        }
    }

    /// Enumerate every child link of any node in source order. This is
    /// the single descent mechanism the passes build on: a pass
    /// matches the kinds it cares about and falls back to
    /// `for_each_child` for the rest.
    pub fn for_each_child(&self, id: NodeId, mut f: impl FnMut(NodeId)) {
        use NodeKind::*;
        match *self.kind(id) {
            P4Program { decls } => f(decls),
            DeclarationList(_) | ParameterList(_) | ParserLocalElements(_) | ParserStates(_)
            | ParserStatements(_) | SelectCaseList(_) | SimpleExpressionList(_)
            | ControlLocalDeclarations(_) | MethodPrototypes(_) | TypeArgumentList(_)
            | StructFieldList(_) | IdentifierList(_) | SpecifiedIdentifierList(_)
            | StatementOrDeclList(_) | SwitchCases(_) | TablePropertyList(_)
            | KeyElementList(_) | ActionList(_) | EntriesList(_) | ArgumentList(_)
            | ExpressionList(_) => {
                let mut cur = self.list(id).first;
                while let Some(c) = cur {
                    let next = self.node(c).next_sibling;
                    f(c);
                    cur = next;
                }
            }
            Declaration { decl } => f(decl),
            Name { .. } => {}
            Parameter { ty, name, init, .. } => {
                f(ty);
                f(name);
                if let Some(init) = init {
                    f(init);
                }
            }
            PackageTypeDeclaration { name, params } => {
                f(name);
                f(params);
            }
            Instantiation { ty, args, name } => {
                f(ty);
                f(args);
                f(name);
            }
            ParserDeclaration { proto, ctor_params, locals, states } => {
                f(proto);
                if let Some(p) = ctor_params {
                    f(p);
                }
                f(locals);
                f(states);
            }
            ParserTypeDeclaration { name, params } => {
                f(name);
                f(params);
            }
            ParserLocalElement { element } => f(element),
            ParserState { name, stmts, transition } => {
                f(name);
                f(stmts);
                f(transition);
            }
            ParserStatement { stmt } => f(stmt),
            ParserBlockStatement { stmts } => f(stmts),
            TransitionStatement { expr } => f(expr),
            StateExpression { expr } => f(expr),
            SelectExpression { exprs, cases } => {
                f(exprs);
                f(cases);
            }
            SelectCase { keyset, name } => {
                f(keyset);
                f(name);
            }
            KeysetExpression { expr } => f(expr),
            TupleKeysetExpression { exprs } => f(exprs),
            SimpleKeysetExpression { expr } => f(expr),
            ControlDeclaration { proto, ctor_params, locals, apply } => {
                f(proto);
                if let Some(p) = ctor_params {
                    f(p);
                }
                f(locals);
                f(apply);
            }
            ControlTypeDeclaration { name, params } => {
                f(name);
                f(params);
            }
            ControlLocalDeclaration { decl } => f(decl),
            ExternDeclaration { decl } => f(decl),
            ExternTypeDeclaration { name, methods } => {
                f(name);
                f(methods);
            }
            FunctionPrototype { return_ty, name, params } => {
                if let Some(t) = return_ty {
                    f(t);
                }
                f(name);
                f(params);
            }
            TypeRef { ty } => f(ty),
            TupleType { type_args } => f(type_args),
            HeaderStackType { ty, size } => {
                f(ty);
                f(size);
            }
            BaseTypeBool { name } | BaseTypeString { name } | BaseTypeVoid { name }
            | BaseTypeError { name } => f(name),
            BaseTypeInt { name, size } | BaseTypeBit { name, size } => {
                f(name);
                if let Some(s) = size {
                    f(s);
                }
            }
            BaseTypeVarbit { name, size } => {
                f(name);
                f(size);
            }
            IntegerTypeSize { size } => f(size),
            TypeArg { arg } => f(arg),
            TypeDeclaration { decl } | DerivedTypeDeclaration { decl } => f(decl),
            HeaderTypeDeclaration { name, fields }
            | HeaderUnionDeclaration { name, fields }
            | StructTypeDeclaration { name, fields } => {
                f(name);
                f(fields);
            }
            StructField { ty, name } => {
                f(ty);
                f(name);
            }
            EnumDeclaration { width, name, fields } => {
                if let Some(w) = width {
                    f(w);
                }
                f(name);
                f(fields);
            }
            ErrorDeclaration { fields } | MatchKindDeclaration { fields } => f(fields),
            SpecifiedIdentifier { name, init } => {
                f(name);
                if let Some(i) = init {
                    f(i);
                }
            }
            TypedefDeclaration { ty, name } => {
                f(ty);
                f(name);
            }
            AssignmentStatement { lhs, rhs } => {
                f(lhs);
                f(rhs);
            }
            EmptyStatement | ExitStatement | Dontcare | Default => {}
            ReturnStatement { expr } => {
                if let Some(e) = expr {
                    f(e);
                }
            }
            ConditionalStatement { cond, then_stmt, else_stmt } => {
                f(cond);
                f(then_stmt);
                if let Some(e) = else_stmt {
                    f(e);
                }
            }
            DirectApplication { name, args } => {
                f(name);
                f(args);
            }
            Statement { stmt } => f(stmt),
            BlockStatement { stmts } => f(stmts),
            SwitchStatement { expr, cases } => {
                f(expr);
                f(cases);
            }
            SwitchCase { label, stmt } => {
                f(label);
                if let Some(s) = stmt {
                    f(s);
                }
            }
            SwitchLabel { label } => f(label),
            StatementOrDeclaration { stmt } => f(stmt),
            TableDeclaration { name, props } => {
                f(name);
                f(props);
            }
            TableProperty { prop } => f(prop),
            KeyProperty { keys } => f(keys),
            KeyElement { expr, match_kind } => {
                f(expr);
                f(match_kind);
            }
            ActionsProperty { actions } => f(actions),
            ActionRef { name, args } => {
                f(name);
                if let Some(a) = args {
                    f(a);
                }
            }
            EntriesProperty { entries } => f(entries),
            Entry { keyset, action } => {
                f(keyset);
                f(action);
            }
            SimpleProperty { name, init, .. } => {
                f(name);
                f(init);
            }
            ActionDeclaration { name, params, body } => {
                f(name);
                f(params);
                f(body);
            }
            VariableDeclaration { ty, name, init, .. } => {
                f(ty);
                f(name);
                if let Some(i) = init {
                    f(i);
                }
            }
            FunctionDeclaration { proto, body } => {
                f(proto);
                f(body);
            }
            Argument { arg } => f(arg),
            Expression { expr } | LvalueExpression { expr } => f(expr),
            BinaryExpression { lhs, rhs, .. } => {
                f(lhs);
                f(rhs);
            }
            UnaryExpression { operand, .. } => f(operand),
            FunctionCall { callee, args } => {
                f(callee);
                f(args);
            }
            MemberSelector { lhs, name } => {
                f(lhs);
                f(name);
            }
            CastExpression { ty, expr } => {
                f(ty);
                f(expr);
            }
            ArraySubscript { lhs, index } => {
                f(lhs);
                f(index);
            }
            IndexExpression { start, end } => {
                f(start);
                if let Some(e) = end {
                    f(e);
                }
            }
            IntegerLiteral { .. } | BooleanLiteral { .. } | StringLiteral { .. } => {}
        }
    }
}

impl Default for Ast {
    fn default() -> Self {
        Ast::new()
    }
}

/// Iterator over a sibling chain.
pub struct Children<'a> {
    ast: &'a Ast,
    cur: Option<NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.cur?;
        self.cur = self.ast.node(id).next_sibling;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::new(0, 0)
    }

    #[test]
    fn append_child_links_in_order() {
        let mut ast = Ast::new();
        let list = ast.push(NodeKind::DeclarationList(NodeList::default()), span());
        let a = ast.push(NodeKind::EmptyStatement, span());
        let b = ast.push(NodeKind::EmptyStatement, span());
        let c = ast.push(NodeKind::EmptyStatement, span());
        ast.append_child(list, a);
        ast.append_child(list, b);
        ast.append_child(list, c);
        let children: Vec<NodeId> = ast.children(list).collect();
        assert_eq!(children, vec![a, b, c]);
    }

    #[test]
    fn empty_list_has_no_children() {
        let mut ast = Ast::new();
        let list = ast.push(NodeKind::ParameterList(NodeList::default()), span());
        assert_eq!(ast.children(list).count(), 0);
    }

    #[test]
    fn for_each_child_visits_list_elements() {
        let mut ast = Ast::new();
        let list = ast.push(NodeKind::ExpressionList(NodeList::default()), span());
        let a = ast.push(NodeKind::BooleanLiteral { value: true }, span());
        ast.append_child(list, a);
        let mut seen = Vec::new();
        ast.for_each_child(list, |c| seen.push(c));
        assert_eq!(seen, vec![a]);
    }

    #[test]
    fn for_each_child_follows_payload_links() {
        let mut ast = Ast::new();
        let lhs = ast.push(NodeKind::BooleanLiteral { value: true }, span());
        let rhs = ast.push(NodeKind::BooleanLiteral { value: false }, span());
        let bin = ast.push(NodeKind::BinaryExpression { op: BinOp::And, lhs, rhs }, span());
        let mut seen = Vec::new();
        ast.for_each_child(bin, |c| seen.push(c));
        assert_eq!(seen, vec![lhs, rhs]);
    }
}
