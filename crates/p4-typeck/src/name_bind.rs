//! Name binding.
//!
//! Binds every declaration into the scope recorded for its context,
//! records the active scope of every name node, and resolves name
//! uses in binding-required positions by walking the scope chain with
//! a namespace mask. The results land in `decl_map`, keyed both by
//! declaration nodes and by resolved use sites.
//!
//! Scoping errors are fatal: a duplicate declaration in the same scope
//! and namespace (function prototypes excepted, since externs may
//! overload method names), or an unbound identifier where a binding is
//! required.
//!
//! Parser state names are bound before any state body is visited so a
//! transition may name a state declared later in the same parser.

use p4_common::{DiagKind, Diagnostic, Interner, SourceText};
use p4_parser::ast::{Ast, NodeId, NodeKind};
use p4_parser::scope::{DeclId, Namespace, ScopeId};
use rustc_hash::FxHashMap;

use crate::scope_hierarchy::ScopeHierarchy;

type BResult = Result<(), Diagnostic>;

/// Bind declarations and resolve uses. On success, `decl_map` maps
/// declaration nodes and use-site name nodes to their declarations.
pub fn name_bind(
    src: &SourceText<'_>,
    ast: &Ast,
    root: NodeId,
    hierarchy: &mut ScopeHierarchy,
    interner: &Interner,
) -> Result<FxHashMap<NodeId, DeclId>, Diagnostic> {
    let current = hierarchy.scopes.root;
    let mut pass = Pass {
        src,
        ast,
        hierarchy,
        interner,
        decl_map: FxHashMap::default(),
        current,
    };
    pass.visit(root)?;
    Ok(pass.decl_map)
}

struct Pass<'a, 'src> {
    src: &'a SourceText<'src>,
    ast: &'a Ast,
    hierarchy: &'a mut ScopeHierarchy,
    interner: &'a Interner,
    decl_map: FxHashMap<NodeId, DeclId>,
    current: ScopeId,
}

impl<'a, 'src> Pass<'a, 'src> {
    fn scope_error(&self, at: NodeId, message: String) -> Diagnostic {
        self.src.error(DiagKind::Scope, self.ast.span(at), message)
    }

    /// Record the scope a name node is used under.
    fn record_name(&mut self, name: NodeId) {
        self.hierarchy.scope_map.insert(name, self.current);
    }

    /// Bind a declaration's name in the current scope.
    fn bind_decl(
        &mut self,
        decl: NodeId,
        name: NodeId,
        ns: Namespace,
        allow_overload: bool,
    ) -> BResult {
        let sym = self.ast.name_of(name);
        self.record_name(name);
        if !allow_overload {
            if let Some(entry) = self.hierarchy.scopes.local_entry(self.current, sym) {
                if entry.head(ns).is_some() {
                    return Err(self.scope_error(
                        name,
                        format!("redeclaration of `{}`.", self.interner.resolve(sym)),
                    ));
                }
            }
        }
        let id = self.hierarchy.scopes.bind(self.current, sym, ns, Some(decl));
        self.decl_map.insert(decl, id);
        Ok(())
    }

    /// Resolve a name use through the scope chain and record it.
    fn resolve_use(&mut self, name: NodeId, mask: &[Namespace]) -> BResult {
        let sym = self.ast.name_of(name);
        self.record_name(name);
        match self.hierarchy.scopes.resolve(self.current, sym, mask) {
            Some(decl) => {
                self.decl_map.insert(name, decl);
                Ok(())
            }
            None => Err(self.scope_error(
                name,
                format!("unresolved identifier `{}`.", self.interner.resolve(sym)),
            )),
        }
    }

    /// Run `f` inside the scope recorded for `node`.
    fn in_scope(&mut self, node: NodeId, f: impl FnOnce(&mut Self) -> BResult) -> BResult {
        let scope = self.hierarchy.scope_map[&node];
        let prev = self.current;
        self.current = scope;
        let result = f(self);
        self.current = prev;
        result
    }

    fn walk(&mut self, id: NodeId) -> BResult {
        let ast = self.ast;
        let mut result = Ok(());
        ast.for_each_child(id, |child| {
            if result.is_ok() {
                result = self.visit(child);
            }
        });
        result
    }

    fn visit(&mut self, id: NodeId) -> BResult {
        match *self.ast.kind(id) {
            NodeKind::P4Program { decls } => self.in_scope(id, |p| p.visit(decls)),

            NodeKind::Declaration { decl }
            | NodeKind::TypeDeclaration { decl }
            | NodeKind::DerivedTypeDeclaration { decl }
            | NodeKind::ExternDeclaration { decl }
            | NodeKind::ParserLocalElement { element: decl }
            | NodeKind::ParserStatement { stmt: decl }
            | NodeKind::ControlLocalDeclaration { decl }
            | NodeKind::StatementOrDeclaration { stmt: decl }
            | NodeKind::TableProperty { prop: decl } => self.visit(decl),

            NodeKind::VariableDeclaration { ty, name, init, .. } => {
                self.visit(ty)?;
                self.bind_decl(id, name, Namespace::Var, false)?;
                if let Some(init) = init {
                    self.visit(init)?;
                }
                Ok(())
            }

            NodeKind::Parameter { ty, name, init, .. } => {
                self.visit(ty)?;
                self.bind_decl(id, name, Namespace::Var, false)?;
                if let Some(init) = init {
                    self.visit(init)?;
                }
                Ok(())
            }

            NodeKind::PackageTypeDeclaration { name, params } => {
                self.bind_decl(id, name, Namespace::Type, false)?;
                self.in_scope(id, |p| p.visit(params))
            }

            NodeKind::Instantiation { ty, args, name } => {
                self.visit(ty)?;
                self.visit(args)?;
                self.bind_decl(id, name, Namespace::Var, false)
            }

            NodeKind::ParserTypeDeclaration { name, params } => {
                self.bind_decl(id, name, Namespace::Type, false)?;
                self.in_scope(id, |p| p.visit(params))
            }

            NodeKind::ParserDeclaration { proto, ctor_params, locals, states } => {
                self.visit(proto)?;
                self.in_scope(id, |p| {
                    if let Some(params) = ctor_params {
                        p.visit(params)?;
                    }
                    p.visit(locals)?;
                    // Bind every state name before visiting bodies so
                    // transitions may reference states declared later.
                    let state_ids: Vec<NodeId> = p.ast.children(states).collect();
                    for &state in &state_ids {
                        let NodeKind::ParserState { name, .. } = *p.ast.kind(state) else {
                            unreachable!("parser states list holds states");
                        };
                        p.bind_decl(state, name, Namespace::Var, false)?;
                    }
                    for &state in &state_ids {
                        p.visit(state)?;
                    }
                    Ok(())
                })
            }

            NodeKind::ParserState { stmts, transition, .. } => self.in_scope(id, |p| {
                p.visit(stmts)?;
                p.visit(transition)
            }),

            NodeKind::ParserBlockStatement { stmts } => self.in_scope(id, |p| p.visit(stmts)),

            NodeKind::TransitionStatement { expr } => self.visit(expr),

            NodeKind::StateExpression { expr } => match self.ast.kind(expr) {
                NodeKind::Name { .. } => self.resolve_use(expr, &[Namespace::Var]),
                _ => self.visit(expr),
            },

            NodeKind::SelectCase { keyset, name } => {
                self.visit(keyset)?;
                self.resolve_use(name, &[Namespace::Var])
            }

            NodeKind::ControlTypeDeclaration { name, params } => {
                self.bind_decl(id, name, Namespace::Type, false)?;
                self.in_scope(id, |p| p.visit(params))
            }

            NodeKind::ControlDeclaration { proto, ctor_params, locals, apply } => {
                self.visit(proto)?;
                self.in_scope(id, |p| {
                    if let Some(params) = ctor_params {
                        p.visit(params)?;
                    }
                    p.visit(locals)?;
                    p.visit(apply)
                })
            }

            NodeKind::ExternTypeDeclaration { name, methods } => {
                self.bind_decl(id, name, Namespace::Type, false)?;
                self.in_scope(id, |p| p.visit(methods))
            }

            NodeKind::FunctionPrototype { return_ty, name, params } => {
                // Extern methods may overload a name in one scope.
                self.bind_decl(id, name, Namespace::Var, true)?;
                self.in_scope(id, |p| {
                    if let Some(return_ty) = return_ty {
                        p.visit(return_ty)?;
                    }
                    p.visit(params)
                })
            }

            NodeKind::FunctionDeclaration { proto, body } => {
                self.visit(proto)?;
                self.in_scope(id, |p| p.visit(body))
            }

            NodeKind::TypeRef { ty } => match self.ast.kind(ty) {
                NodeKind::Name { .. } => self.resolve_use(ty, &[Namespace::Type]),
                _ => self.visit(ty),
            },

            NodeKind::BaseTypeBool { name }
            | NodeKind::BaseTypeString { name }
            | NodeKind::BaseTypeVoid { name }
            | NodeKind::BaseTypeError { name } => {
                self.record_name(name);
                Ok(())
            }
            NodeKind::BaseTypeInt { name, .. } | NodeKind::BaseTypeBit { name, .. } => {
                self.record_name(name);
                Ok(())
            }
            NodeKind::BaseTypeVarbit { name, .. } => {
                self.record_name(name);
                Ok(())
            }

            NodeKind::HeaderStackType { ty, size } => {
                self.visit(ty)?;
                self.visit(size)
            }

            NodeKind::TypeArg { arg } => {
                match self.ast.kind(arg) {
                    NodeKind::Name { .. } => {
                        self.record_name(arg);
                        Ok(())
                    }
                    _ => self.visit(arg),
                }
            }

            NodeKind::HeaderTypeDeclaration { name, fields }
            | NodeKind::HeaderUnionDeclaration { name, fields }
            | NodeKind::StructTypeDeclaration { name, fields } => {
                self.bind_decl(id, name, Namespace::Type, false)?;
                self.in_scope(id, |p| p.visit(fields))
            }

            NodeKind::StructField { ty, name } => {
                self.visit(ty)?;
                self.bind_decl(id, name, Namespace::Var, false)
            }

            NodeKind::EnumDeclaration { name, fields, .. } => {
                self.bind_decl(id, name, Namespace::Type, false)?;
                self.in_scope(id, |p| p.visit(fields))
            }

            NodeKind::SpecifiedIdentifier { name, init } => {
                self.bind_decl(id, name, Namespace::Var, false)?;
                if let Some(init) = init {
                    self.visit(init)?;
                }
                Ok(())
            }

            NodeKind::ErrorDeclaration { fields } | NodeKind::MatchKindDeclaration { fields } => {
                self.in_scope(id, |p| {
                    let members: Vec<NodeId> = p.ast.children(fields).collect();
                    for member in members {
                        p.bind_decl(member, member, Namespace::Var, false)?;
                    }
                    Ok(())
                })
            }

            NodeKind::TypedefDeclaration { ty, name } => {
                self.visit(ty)?;
                self.bind_decl(id, name, Namespace::Type, false)
            }

            NodeKind::ActionDeclaration { name, params, body } => {
                self.bind_decl(id, name, Namespace::Var, false)?;
                self.in_scope(id, |p| {
                    p.visit(params)?;
                    p.visit(body)
                })
            }

            NodeKind::TableDeclaration { name, props } => {
                self.bind_decl(id, name, Namespace::Var, false)?;
                self.in_scope(id, |p| p.visit(props))
            }

            NodeKind::KeyElement { expr, match_kind } => {
                self.visit(expr)?;
                // Match kinds are members of the global `match_kind`
                // type; the type checker validates them.
                self.record_name(match_kind);
                Ok(())
            }

            NodeKind::ActionRef { name, args } => {
                self.resolve_use(name, &[Namespace::Var])?;
                if let Some(args) = args {
                    self.visit(args)?;
                }
                Ok(())
            }

            NodeKind::SimpleProperty { name, init, .. } => {
                self.record_name(name);
                self.visit(init)
            }

            NodeKind::Statement { stmt } => {
                if self.hierarchy.scope_map.contains_key(&id) {
                    self.in_scope(id, |p| p.visit(stmt))
                } else {
                    self.visit(stmt)
                }
            }

            NodeKind::SwitchCase { label, stmt } => {
                self.visit(label)?;
                match stmt {
                    Some(stmt) if self.hierarchy.scope_map.contains_key(&id) => {
                        self.in_scope(id, |p| p.visit(stmt))
                    }
                    Some(stmt) => self.visit(stmt),
                    None => Ok(()),
                }
            }

            NodeKind::SwitchLabel { label } => match self.ast.kind(label) {
                NodeKind::Name { .. } => self.resolve_use(label, &[Namespace::Var]),
                _ => Ok(()),
            },

            NodeKind::DirectApplication { name, args } => {
                match self.ast.kind(name) {
                    NodeKind::Name { .. } => {
                        self.resolve_use(name, &[Namespace::Type, Namespace::Var])?
                    }
                    _ => self.visit(name)?,
                }
                self.visit(args)
            }

            NodeKind::Expression { expr } | NodeKind::LvalueExpression { expr } => {
                match self.ast.kind(expr) {
                    NodeKind::Name { .. } => {
                        self.resolve_use(expr, &[Namespace::Var, Namespace::Type])
                    }
                    _ => self.visit(expr),
                }
            }

            NodeKind::MemberSelector { lhs, name } => {
                self.visit(lhs)?;
                // Member names resolve against the lhs type during
                // type checking, not through the scope chain.
                self.record_name(name);
                Ok(())
            }

            NodeKind::Name { .. } => {
                self.record_name(id);
                Ok(())
            }

            _ => self.walk(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope_hierarchy::scope_hierarchy;
    use p4_arena::MemoryPool;

    fn bind(text: &str) -> Result<(p4_parser::Parse, ScopeHierarchy, FxHashMap<NodeId, DeclId>, Interner), Diagnostic>
    {
        let pool = MemoryPool::reserve(16 << 20);
        let mut interner = Interner::new(pool);
        let src = SourceText::new("test.p4", text);
        let tokens = p4_lexer::tokenize(&src, false).expect("lexes");
        let parse = p4_parser::parse(&src, &tokens, &mut interner).expect("parses");
        let mut hierarchy = scope_hierarchy(&parse.ast, parse.root, &mut interner);
        let decl_map = name_bind(&src, &parse.ast, parse.root, &mut hierarchy, &interner)?;
        Ok((parse, hierarchy, decl_map, interner))
    }

    fn find_nodes(
        parse: &p4_parser::Parse,
        pred: impl Fn(&NodeKind) -> bool,
    ) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![parse.root];
        while let Some(id) = stack.pop() {
            if pred(parse.ast.kind(id)) {
                out.push(id);
            }
            parse.ast.for_each_child(id, |c| stack.push(c));
        }
        out
    }

    #[test]
    fn declarations_land_in_their_scope_with_their_namespace() {
        let (parse, hierarchy, decl_map, interner) =
            bind("header H { bit<8> f; }").expect("binds");
        let headers = find_nodes(&parse, |k| matches!(k, NodeKind::HeaderTypeDeclaration { .. }));
        let decl = decl_map[&headers[0]];
        let record = hierarchy.scopes.decl(decl);
        assert_eq!(record.ns, Namespace::Type);
        assert_eq!(record.ast, Some(headers[0]));
        assert_eq!(interner.resolve(record.name), "H");
    }

    #[test]
    fn transition_target_resolves_to_builtin_accept() {
        let (parse, hierarchy, decl_map, interner) =
            bind("parser P(bit<8> x) { state start { transition accept; } }").expect("binds");
        let states = find_nodes(&parse, |k| matches!(k, NodeKind::StateExpression { .. }));
        let NodeKind::StateExpression { expr } = *parse.ast.kind(states[0]) else { panic!() };
        let decl = decl_map[&expr];
        let record = hierarchy.scopes.decl(decl);
        assert_eq!(interner.resolve(record.name), "accept");
        assert_eq!(record.ns, Namespace::Var);
        // accept is a builtin, not declared by any node
        assert_eq!(record.ast, None);
    }

    #[test]
    fn transitions_may_reference_later_states() {
        let result = bind(
            "parser P(bit<8> x) {
               state start { transition next; }
               state next { transition accept; }
             }",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn action_ref_links_to_action_declaration() {
        let (parse, hierarchy, decl_map, _) = bind(
            "control C(inout bit<8> v) {
               action a(in bit<8> p) { v = p; }
               table t { key = { v : exact; } actions = { a; } }
               apply { t.apply(); }
             }",
        )
        .expect("binds");
        let refs = find_nodes(&parse, |k| matches!(k, NodeKind::ActionRef { .. }));
        let NodeKind::ActionRef { name, .. } = *parse.ast.kind(refs[0]) else { panic!() };
        let decl = hierarchy.scopes.decl(decl_map[&name]);
        let action = decl.ast.expect("declared action");
        assert!(matches!(parse.ast.kind(action), NodeKind::ActionDeclaration { .. }));
    }

    #[test]
    fn uses_resolve_within_recorded_scope() {
        let (parse, hierarchy, decl_map, _) = bind(
            "control C(inout bit<8> v) {
               action a(in bit<8> p) { v = p; }
               apply { a(3); }
             }",
        )
        .expect("binds");
        // Every resolved use is reachable by re-running resolution in
        // the recorded scope.
        for (&node, &decl) in &decl_map {
            if let NodeKind::Name { name } = *parse.ast.kind(node) {
                let scope = hierarchy.scope_map[&node];
                let record = hierarchy.scopes.decl(decl);
                let again = hierarchy.scopes.resolve(scope, name, &[record.ns]);
                assert_eq!(again, Some(decl));
            }
        }
    }

    #[test]
    fn unresolved_identifier_is_a_scope_error() {
        let err = bind(
            "control C(inout bit<8> v) { apply { v = w; } }",
        )
        .expect_err("w is unbound");
        assert_eq!(err.kind, DiagKind::Scope);
        assert!(err.message.contains("unresolved identifier `w`"));
    }

    #[test]
    fn duplicate_declaration_is_a_scope_error() {
        let err = bind(
            "control C(inout bit<8> v) {
               apply { bit<8> x = 1; bit<8> x = 2; }
             }",
        )
        .expect_err("x is declared twice");
        assert_eq!(err.kind, DiagKind::Scope);
        assert!(err.message.contains("redeclaration of `x`"));
    }

    #[test]
    fn same_name_in_different_namespaces_coexists() {
        let result = bind(
            "header h { bit<8> f; }
             control C(inout bit<8> v) {
               apply { bit<8> h = v; v = h; }
             }",
        );
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn extern_methods_may_overload() {
        let result = bind(
            "extern Register {
               Register(bit<32> size);
               void write(in bit<32> index);
               void write(in bit<32> index, in bit<32> value);
             }",
        );
        assert!(result.is_ok(), "{result:?}");
    }
}
