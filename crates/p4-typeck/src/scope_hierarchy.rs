//! Scope construction.
//!
//! Walks the tree in source order and creates a scope at every
//! scope-introducing node, recording it in `scope_map` so later passes
//! can recover the scope active at any point of the tree. Wrapper
//! nodes (declaration, typeDeclaration, ...) are mapped to their
//! child's scope; parser and control bodies reuse their prototype's
//! scope so parameters stay visible inside.

use p4_common::Interner;
use p4_parser::ast::{Ast, NodeId, NodeKind};
use p4_parser::scope::{ScopeId, ScopeTree};
use rustc_hash::FxHashMap;

/// The definitive scope tree plus the node-to-scope map.
#[derive(Debug)]
pub struct ScopeHierarchy {
    pub scopes: ScopeTree,
    pub scope_map: FxHashMap<NodeId, ScopeId>,
}

/// Build the scope hierarchy for a parsed program. The root scope is
/// preloaded with the builtin names.
pub fn scope_hierarchy(ast: &Ast, root: NodeId, interner: &mut Interner) -> ScopeHierarchy {
    let scopes = ScopeTree::with_builtins(interner);
    let current = scopes.root;
    let mut pass = Pass { ast, scopes, scope_map: FxHashMap::default(), current };
    pass.visit(root);
    debug_assert_eq!(pass.current, pass.scopes.root);
    ScopeHierarchy { scopes: pass.scopes, scope_map: pass.scope_map }
}

struct Pass<'a> {
    ast: &'a Ast,
    scopes: ScopeTree,
    scope_map: FxHashMap<NodeId, ScopeId>,
    current: ScopeId,
}

impl<'a> Pass<'a> {
    /// Create a scope for `id`, visit its children inside it, and
    /// restore the surrounding scope.
    fn open(&mut self, id: NodeId) {
        let scope = self.scopes.new_scope(self.current);
        self.scope_map.insert(id, scope);
        let prev = self.current;
        self.current = scope;
        self.walk(id);
        self.current = prev;
    }

    /// Map a wrapper node to the scope its child opened, if any.
    fn alias(&mut self, id: NodeId, child: NodeId) {
        if let Some(&scope) = self.scope_map.get(&child) {
            self.scope_map.insert(id, scope);
        }
    }

    fn walk(&mut self, id: NodeId) {
        let ast = self.ast;
        ast.for_each_child(id, |child| self.visit(child));
    }

    fn visit(&mut self, id: NodeId) {
        match *self.ast.kind(id) {
            NodeKind::P4Program { .. } => self.open(id),

            // Wrappers take their child's scope.
            NodeKind::Declaration { decl }
            | NodeKind::TypeDeclaration { decl }
            | NodeKind::DerivedTypeDeclaration { decl }
            | NodeKind::ExternDeclaration { decl } => {
                self.visit(decl);
                self.alias(id, decl);
            }

            NodeKind::ParserTypeDeclaration { .. }
            | NodeKind::ControlTypeDeclaration { .. }
            | NodeKind::PackageTypeDeclaration { .. }
            | NodeKind::ExternTypeDeclaration { .. }
            | NodeKind::FunctionPrototype { .. }
            | NodeKind::HeaderTypeDeclaration { .. }
            | NodeKind::HeaderUnionDeclaration { .. }
            | NodeKind::StructTypeDeclaration { .. }
            | NodeKind::EnumDeclaration { .. }
            | NodeKind::ErrorDeclaration { .. }
            | NodeKind::MatchKindDeclaration { .. }
            | NodeKind::ParserState { .. }
            | NodeKind::ParserBlockStatement { .. }
            | NodeKind::ActionDeclaration { .. }
            | NodeKind::TableDeclaration { .. } => self.open(id),

            // A parser or control body shares its prototype's scope.
            NodeKind::ParserDeclaration { proto, ctor_params, locals, states } => {
                self.visit(proto);
                let scope = self.scope_map[&proto];
                self.scope_map.insert(id, scope);
                let prev = self.current;
                self.current = scope;
                if let Some(params) = ctor_params {
                    self.visit(params);
                }
                self.visit(locals);
                self.visit(states);
                self.current = prev;
            }
            NodeKind::ControlDeclaration { proto, ctor_params, locals, apply } => {
                self.visit(proto);
                let scope = self.scope_map[&proto];
                self.scope_map.insert(id, scope);
                let prev = self.current;
                self.current = scope;
                if let Some(params) = ctor_params {
                    self.visit(params);
                }
                self.visit(locals);
                self.visit(apply);
                self.current = prev;
            }

            // A function body lives in its prototype's scope so the
            // parameters are visible.
            NodeKind::FunctionDeclaration { proto, body } => {
                self.visit(proto);
                let scope = self.scope_map[&proto];
                self.scope_map.insert(id, scope);
                let prev = self.current;
                self.current = scope;
                self.visit(body);
                self.current = prev;
            }

            // A general block statement opens a scope, recorded at the
            // statement wrapper.
            NodeKind::Statement { stmt } => {
                if matches!(self.ast.kind(stmt), NodeKind::BlockStatement { .. }) {
                    let scope = self.scopes.new_scope(self.current);
                    self.scope_map.insert(id, scope);
                    let prev = self.current;
                    self.current = scope;
                    self.visit(stmt);
                    self.current = prev;
                } else {
                    self.visit(stmt);
                }
            }

            // A switch-case block opens a scope of its own.
            NodeKind::SwitchCase { label, stmt } => {
                self.visit(label);
                if let Some(stmt) = stmt {
                    let scope = self.scopes.new_scope(self.current);
                    self.scope_map.insert(id, scope);
                    let prev = self.current;
                    self.current = scope;
                    self.visit(stmt);
                    self.current = prev;
                }
            }

            _ => self.walk(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p4_arena::MemoryPool;
    use p4_common::SourceText;

    fn analyze(text: &str) -> (p4_parser::Parse, ScopeHierarchy) {
        let pool = MemoryPool::reserve(16 << 20);
        let mut interner = Interner::new(pool);
        let src = SourceText::new("test.p4", text);
        let tokens = p4_lexer::tokenize(&src, false).expect("lexes");
        let parse = p4_parser::parse(&src, &tokens, &mut interner).expect("parses");
        let hierarchy = scope_hierarchy(&parse.ast, parse.root, &mut interner);
        (parse, hierarchy)
    }

    fn all_nodes(parse: &p4_parser::Parse) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![parse.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            parse.ast.for_each_child(id, |c| stack.push(c));
        }
        out
    }

    fn scope_of_kind(
        parse: &p4_parser::Parse,
        hierarchy: &ScopeHierarchy,
        pred: impl Fn(&NodeKind) -> bool,
    ) -> ScopeId {
        for id in all_nodes(parse) {
            if pred(parse.ast.kind(id)) {
                if let Some(&scope) = hierarchy.scope_map.get(&id) {
                    return scope;
                }
            }
        }
        panic!("no mapped node matched");
    }

    #[test]
    fn program_opens_a_scope_under_root() {
        let (parse, hierarchy) = analyze("header H { bit<8> f; }");
        let program_scope = hierarchy.scope_map[&parse.root];
        assert_eq!(hierarchy.scopes.parent(program_scope), Some(hierarchy.scopes.root));
    }

    #[test]
    fn scope_opening_nodes_chain_to_root() {
        let (parse, hierarchy) =
            analyze("parser P(bit<8> x) { state start { transition accept; } }");
        for (&node, &scope) in &hierarchy.scope_map {
            let _ = node;
            let mut cur = Some(scope);
            let mut steps = 0;
            while let Some(s) = cur {
                cur = hierarchy.scopes.parent(s);
                steps += 1;
                assert!(steps < 64, "parent chain does not terminate");
            }
        }
        let _ = parse;
    }

    #[test]
    fn header_scope_is_inside_program_scope() {
        let (parse, hierarchy) = analyze("header H { bit<8> f; }");
        let program_scope = hierarchy.scope_map[&parse.root];
        let header_scope = scope_of_kind(&parse, &hierarchy, |k| {
            matches!(k, NodeKind::HeaderTypeDeclaration { .. })
        });
        assert_eq!(hierarchy.scopes.parent(header_scope), Some(program_scope));
    }

    #[test]
    fn wrappers_alias_their_childs_scope() {
        let (parse, hierarchy) = analyze("struct S { bit<8> f; }");
        let struct_scope = scope_of_kind(&parse, &hierarchy, |k| {
            matches!(k, NodeKind::StructTypeDeclaration { .. })
        });
        let wrapper_scope = scope_of_kind(&parse, &hierarchy, |k| {
            matches!(k, NodeKind::DerivedTypeDeclaration { .. })
        });
        assert_eq!(struct_scope, wrapper_scope);
    }

    #[test]
    fn parser_state_scope_nests_in_parser_scope() {
        let (parse, hierarchy) =
            analyze("parser P(bit<8> x) { state start { transition accept; } }");
        let proto_scope = scope_of_kind(&parse, &hierarchy, |k| {
            matches!(k, NodeKind::ParserTypeDeclaration { .. })
        });
        let state_scope =
            scope_of_kind(&parse, &hierarchy, |k| matches!(k, NodeKind::ParserState { .. }));
        assert_eq!(hierarchy.scopes.parent(state_scope), Some(proto_scope));
    }

    #[test]
    fn rerun_produces_isomorphic_scope_shape() {
        let text = "control C(inout bit<8> v) {
                      action a(in bit<8> p) { v = p; }
                      table t { key = { v : exact; } actions = { a; } }
                      apply { t.apply(); }
                    }";
        let (parse, first) = analyze(text);
        let pool = MemoryPool::reserve(16 << 20);
        let mut interner = Interner::new(pool);
        let second = {
            let src = SourceText::new("test.p4", text);
            let tokens = p4_lexer::tokenize(&src, false).unwrap();
            let parse2 = p4_parser::parse(&src, &tokens, &mut interner).unwrap();
            scope_hierarchy(&parse2.ast, parse2.root, &mut interner)
        };
        let _ = parse;
        assert_eq!(first.scopes.scope_count(), second.scopes.scope_count());
        assert_eq!(first.scope_map.len(), second.scope_map.len());
    }
}
