//! Pass invariants checked over a representative program.

mod common;

use common::{all_nodes, front_ok};
use p4_common::{SourceText, TokenKind};
use p4_parser::ast::NodeKind;

const PROGRAM: &str = "
error { NoMatch }
match_kind { exact }
typedef bit<48> mac_t;
header Eth { mac_t dst; mac_t src; bit<16> etherType; }
struct Headers { Eth eth; }

parser P(inout Headers h, in bit<16> tag) {
  state start {
    transition select(tag) {
      0x0800: parse_more;
      default: accept;
    }
  }
  state parse_more { transition accept; }
}

control C(inout Headers h, inout bit<16> tag) {
  action set_tag(in bit<16> t) { tag = t; }
  table decide {
    key = { tag : exact; }
    actions = { set_tag; }
  }
  apply {
    if (h.eth.etherType == 16w0x0800) {
      decide.apply();
    }
  }
}
";

#[test]
fn l1_token_stream_is_framed() {
    let src = SourceText::new("test.p4", PROGRAM);
    let tokens = p4_lexer::tokenize(&src, false).expect("lexes");
    let kinds = tokens.kinds();
    assert_eq!(kinds.first(), Some(&TokenKind::StartOfInput));
    assert_eq!(kinds.last(), Some(&TokenKind::EndOfInput));
    // Exactly one of each frame token.
    assert_eq!(kinds.iter().filter(|&&k| k == TokenKind::StartOfInput).count(), 1);
    assert_eq!(kinds.iter().filter(|&&k| k == TokenKind::EndOfInput).count(), 1);
}

#[test]
fn p1_list_nodes_hold_the_mandated_child_kinds() {
    let f = front_ok(PROGRAM);
    for id in all_nodes(&f.parse) {
        let check = |pred: fn(&NodeKind) -> bool| {
            for child in f.parse.ast.children(id) {
                assert!(
                    pred(f.parse.ast.kind(child)),
                    "list {:?} has child {:?}",
                    f.parse.ast.kind(id),
                    f.parse.ast.kind(child)
                );
            }
        };
        match f.parse.ast.kind(id) {
            NodeKind::DeclarationList(_) => check(|k| matches!(k, NodeKind::Declaration { .. })),
            NodeKind::ParameterList(_) => check(|k| matches!(k, NodeKind::Parameter { .. })),
            NodeKind::ParserStates(_) => check(|k| matches!(k, NodeKind::ParserState { .. })),
            NodeKind::StructFieldList(_) => check(|k| matches!(k, NodeKind::StructField { .. })),
            NodeKind::SelectCaseList(_) => check(|k| matches!(k, NodeKind::SelectCase { .. })),
            NodeKind::KeyElementList(_) => check(|k| matches!(k, NodeKind::KeyElement { .. })),
            NodeKind::ActionList(_) => check(|k| matches!(k, NodeKind::ActionRef { .. })),
            NodeKind::ArgumentList(_) => check(|k| matches!(k, NodeKind::Argument { .. })),
            NodeKind::SwitchCases(_) => check(|k| matches!(k, NodeKind::SwitchCase { .. })),
            NodeKind::TablePropertyList(_) => {
                check(|k| matches!(k, NodeKind::TableProperty { .. }))
            }
            NodeKind::StatementOrDeclList(_) => {
                check(|k| matches!(k, NodeKind::StatementOrDeclaration { .. }))
            }
            _ => {}
        }
    }
}

#[test]
fn s1_scope_parent_chains_reach_the_root() {
    let f = front_ok(PROGRAM);
    for (_, &scope) in &f.analysis.scope_map {
        let mut cur = scope;
        let mut steps = 0;
        while let Some(parent) = f.analysis.scopes.parent(cur) {
            cur = parent;
            steps += 1;
            assert!(steps < 64, "scope chain does not terminate");
        }
        assert_eq!(cur, f.analysis.scopes.root);
    }
}

#[test]
fn n1_declarations_are_bound_in_their_recorded_scope() {
    let f = front_ok(PROGRAM);
    // Every declaration-kind node in the map points back at itself
    // through its NameDeclaration.
    for id in all_nodes(&f.parse) {
        if matches!(
            f.parse.ast.kind(id),
            NodeKind::HeaderTypeDeclaration { .. }
                | NodeKind::StructTypeDeclaration { .. }
                | NodeKind::ActionDeclaration { .. }
                | NodeKind::TableDeclaration { .. }
                | NodeKind::TypedefDeclaration { .. }
                | NodeKind::ParserTypeDeclaration { .. }
                | NodeKind::ControlTypeDeclaration { .. }
                | NodeKind::VariableDeclaration { .. }
                | NodeKind::Parameter { .. }
        ) {
            let decl = f.analysis.decl_map.get(&id).copied().expect("declaration is bound");
            assert_eq!(f.analysis.scopes.decl(decl).ast, Some(id));
        }
    }
}

#[test]
fn n2_resolved_uses_lie_in_their_resolution() {
    let f = front_ok(PROGRAM);
    for (&node, &decl) in &f.analysis.decl_map {
        if let NodeKind::Name { name } = *f.parse.ast.kind(node) {
            let scope = f.analysis.scope_map[&node];
            let record = f.analysis.scopes.decl(decl);
            let resolved = f.analysis.scopes.resolve(scope, name, &[record.ns]);
            assert_eq!(resolved, Some(decl), "re-resolution diverges");
        }
    }
}

#[test]
fn t1_every_expression_and_type_ref_is_typed() {
    let f = front_ok(PROGRAM);
    for id in all_nodes(&f.parse) {
        if matches!(
            f.parse.ast.kind(id),
            NodeKind::Expression { .. }
                | NodeKind::LvalueExpression { .. }
                | NodeKind::TypeRef { .. }
        ) {
            assert!(
                f.analysis.type_env.contains_key(&id),
                "untyped node {:?} at {:?}",
                f.parse.ast.kind(id),
                f.parse.ast.span(id)
            );
        }
    }
}

#[test]
fn t2_initializers_fit_their_declared_types() {
    let f = front_ok("const bit<8> X = 8w255; const bool B = true;");
    for id in all_nodes(&f.parse) {
        if let NodeKind::VariableDeclaration { ty, init: Some(init), .. } = *f.parse.ast.kind(id) {
            let declared = f.analysis.node_ty[&ty];
            let given = f.analysis.type_env[&init];
            assert!(f.analysis.types.fits(given, declared));
        }
    }
}

#[test]
fn r1_rerunning_the_scope_pass_is_isomorphic() {
    // Scopes are created in tree order, so two runs over the same
    // program pair up scope-for-scope.
    let first = front_ok(PROGRAM);
    let second = front_ok(PROGRAM);
    assert_eq!(first.analysis.scopes.scope_count(), second.analysis.scopes.scope_count());
    let pairs: Vec<_> = first
        .analysis
        .scopes
        .scope_ids()
        .zip(second.analysis.scopes.scope_ids())
        .collect();
    for (a, b) in pairs {
        assert_eq!(
            first.analysis.scopes.parent(a).map(|p| p.index()),
            second.analysis.scopes.parent(b).map(|p| p.index()),
            "parent relation differs"
        );
        let names_a: Vec<&str> = first
            .analysis
            .scopes
            .local_names(a)
            .into_iter()
            .map(|sym| first.interner.resolve(sym))
            .collect();
        let names_b: Vec<&str> = second
            .analysis
            .scopes
            .local_names(b)
            .into_iter()
            .map(|sym| second.interner.resolve(sym))
            .collect();
        let mut names_a = names_a;
        let mut names_b = names_b;
        names_a.sort();
        names_b.sort();
        assert_eq!(names_a, names_b, "name sets differ");
    }
}

#[test]
fn r2_selection_chooses_from_the_potential_set() {
    let f = front_ok(PROGRAM);
    for (&node, &chosen) in &f.analysis.type_env {
        if let Some(pt) = f.analysis.potype.get(&node) {
            let set = pt.set();
            if !set.is_empty() {
                assert!(
                    set.iter().any(|&t| f.analysis.types.equiv(t, chosen)),
                    "selected type is outside the potential set"
                );
            }
        }
    }
}
