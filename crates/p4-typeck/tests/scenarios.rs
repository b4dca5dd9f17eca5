//! End-to-end front-end scenarios.

mod common;

use common::{find_nodes, first_node, front, front_ok};
use p4_common::{DiagKind, SourceText};
use p4_parser::ast::NodeKind;
use p4_typeck::TypeKind;

#[test]
fn header_declaration_types_its_fields() {
    let mut f = front_ok("header H { bit<8> a; bit<16> b; }");
    let header = first_node(&f.parse, |k| matches!(k, NodeKind::HeaderTypeDeclaration { .. }));
    let decl = f.analysis.decl_map[&header];
    let hty = f.analysis.decl_ty[&decl];
    let TypeKind::Header { fields } = *f.analysis.types.kind(hty) else {
        panic!("H is not a header type");
    };
    let members = f.analysis.types.product_members(fields).to_vec();
    assert_eq!(members.len(), 2);

    let a_sym = f.interner.intern("a");
    let TypeKind::Field { ty: a_ty } = *f.analysis.types.kind(members[0]) else { panic!() };
    assert_eq!(f.analysis.types.get(members[0]).name, Some(a_sym));
    let b8 = f.analysis.types.bit(8);
    let b16 = f.analysis.types.bit(16);
    assert!(f.analysis.types.equiv(a_ty, b8));

    let TypeKind::Field { ty: b_ty } = *f.analysis.types.kind(members[1]) else { panic!() };
    assert!(f.analysis.types.equiv(b_ty, b16));
}

#[test]
fn const_with_width_literal_gets_bit8() {
    let mut f = front_ok("const bit<8> X = 8w0xff;");
    let var = first_node(&f.parse, |k| matches!(k, NodeKind::VariableDeclaration { .. }));
    let decl = f.analysis.decl_map[&var];
    let b8 = f.analysis.types.bit(8);
    assert!(f.analysis.types.equiv(f.analysis.decl_ty[&decl], b8));

    // The literal itself parsed to {unsigned, width 8, value 255} and
    // was selected as bit<8>.
    let lit = first_node(&f.parse, |k| matches!(k, NodeKind::IntegerLiteral { .. }));
    let NodeKind::IntegerLiteral { value } = *f.parse.ast.kind(lit) else { panic!() };
    assert!(!value.signed);
    assert_eq!(value.width, Some(8));
    assert_eq!(value.value, 255);
    assert!(f.analysis.types.equiv(f.analysis.type_env[&lit], b8));
}

#[test]
fn parser_start_state_transitions_to_builtin_accept() {
    let f = front_ok("parser P(bit<8> x) { state start { transition accept; } }");
    let states_list = first_node(&f.parse, |k| matches!(k, NodeKind::ParserStates(_)));
    assert_eq!(f.parse.ast.children(states_list).count(), 1);

    let state_expr = first_node(&f.parse, |k| matches!(k, NodeKind::StateExpression { .. }));
    let NodeKind::StateExpression { expr } = *f.parse.ast.kind(state_expr) else { panic!() };
    let decl = f.analysis.decl_map[&expr];
    let record = f.analysis.scopes.decl(decl);
    assert_eq!(f.interner.resolve(record.name), "accept");
    assert_eq!(record.ast, None);
    assert!(matches!(
        f.analysis.types.kind(f.analysis.type_env[&expr]),
        TypeKind::State
    ));
}

#[test]
fn table_action_reference_links_and_checks_arguments() {
    let f = front_ok(
        "match_kind { exact }
         control C(inout bit<8> v) {
           action a(in bit<8> p) { v = p; }
           table t {
             key = { v : exact; }
             actions = { a; }
           }
           apply {
             t.apply();
             a(v);
           }
         }",
    );
    // The action-ref's name is bound to the action declaration.
    let action_ref = first_node(&f.parse, |k| matches!(k, NodeKind::ActionRef { .. }));
    let NodeKind::ActionRef { name, .. } = *f.parse.ast.kind(action_ref) else { panic!() };
    let decl = f.analysis.decl_map[&name];
    let target = f.analysis.scopes.decl(decl).ast.expect("declared in the program");
    assert!(matches!(f.parse.ast.kind(target), NodeKind::ActionDeclaration { .. }));

    // The direct call type-checked its bit<8> argument and yields void.
    let calls = find_nodes(&f.parse, |k| matches!(k, NodeKind::FunctionCall { .. }));
    for call in calls {
        assert!(matches!(
            f.analysis.types.kind(f.analysis.type_env[&call]),
            TypeKind::Void
        ));
    }
}

#[test]
fn action_call_with_wrong_argument_type_fails() {
    let err = front(
        "control C(inout bit<8> v) {
           action a(in bool p) { v = 1; }
           apply { a(v); }
         }",
    )
    .expect_err("bit<8> does not fit bool");
    assert_eq!(err.kind, DiagKind::Type);
}

#[test]
fn malformed_literal_halts_lexing_with_no_further_tokens() {
    let src = SourceText::new("test.p4", "const bit<8> X = 0xG;");
    let err = p4_lexer::tokenize(&src, false).expect_err("0xG is malformed");
    assert_eq!(err.kind, DiagKind::Lexical);
    assert_eq!(
        err.to_string(),
        "test.p4:1:18: error: expected one or more hexadecimal digits, got `G`."
    );
}

#[test]
fn ambiguous_overloaded_method_names_both_candidates() {
    let err = front(
        "extern E {
           E();
           void m(in bit<8> x);
           void m(in bit<8> y);
         }
         control C(inout bit<8> v) {
           E() e;
           apply { e.m(v); }
         }",
    )
    .expect_err("both overloads match");
    assert_eq!(err.kind, DiagKind::Type);
    assert!(err.message.contains("ambiguous"), "message: {}", err.message);
    assert_eq!(
        err.message.matches("test.p4:").count(),
        2,
        "both candidate locations are named: {}",
        err.message
    );
}

#[test]
fn overloads_disambiguated_by_arity() {
    let f = front_ok(
        "extern Register {
           Register(bit<32> size);
           void write(in bit<32> index);
           void write(in bit<32> index, in bit<32> value);
         }
         control C(inout bit<32> v) {
           Register(32) r;
           apply { r.write(v, v); }
         }",
    );
    let call = find_nodes(&f.parse, |k| matches!(k, NodeKind::FunctionCall { .. }))
        .into_iter()
        .last()
        .expect("the method call");
    assert!(matches!(f.analysis.types.kind(f.analysis.type_env[&call]), TypeKind::Void));
}

#[test]
fn enum_members_select_through_the_type_name() {
    let f = front_ok(
        "enum Suits { Clubs, Diamonds }
         control C(inout bit<8> v) {
           apply { if (Suits.Clubs == Suits.Diamonds) { v = 1; } }
         }",
    );
    let selector = first_node(&f.parse, |k| matches!(k, NodeKind::MemberSelector { .. }));
    let ty = f.analysis.type_env[&selector];
    assert!(matches!(f.analysis.types.kind(ty), TypeKind::Enum { .. }));
}

#[test]
fn error_declaration_extends_the_global_error_type() {
    let f = front_ok(
        "error { NoMatch, PacketTooShort }
         control C(inout bit<8> v) {
           apply { if (error.NoMatch == error.PacketTooShort) { v = 1; } }
         }",
    );
    let error_ty = f.analysis.types.prims.error;
    let TypeKind::Error { fields } = *f.analysis.types.kind(error_ty) else { panic!() };
    assert_eq!(f.analysis.types.product_members(fields).len(), 2);
}

#[test]
fn match_kinds_validate_against_the_global_member_list() {
    let err = front(
        "match_kind { exact }
         control C(inout bit<8> v) {
           action a() { v = 1; }
           table t {
             key = { v : ternary; }
             actions = { a; }
           }
           apply { t.apply(); }
         }",
    )
    .expect_err("ternary is not declared");
    assert_eq!(err.kind, DiagKind::Type);
    assert!(err.message.contains("unknown match kind `ternary`"));
}

#[test]
fn header_methods_are_synthesized() {
    let f = front_ok(
        "header H { bit<8> f; }
         control C(inout bit<8> v) {
           H h;
           apply { if (h.isValid()) { v = h.f; } }
         }",
    );
    let calls = find_nodes(&f.parse, |k| matches!(k, NodeKind::FunctionCall { .. }));
    let ty = f.analysis.type_env[&calls[0]];
    assert!(matches!(f.analysis.types.kind(ty), TypeKind::Bool));
}

#[test]
fn select_keysets_check_against_the_selected_expression() {
    let f = front_ok(
        "parser P(bit<8> x) {
           state start {
             transition select(x) {
               0x0F &&& 0xF0: next;
               default: reject;
             }
           }
           state next { transition accept; }
         }",
    );
    drop(f);
}

#[test]
fn typedef_is_transparent_in_assignments() {
    let f = front_ok(
        "typedef bit<8> byte_t;
         control C(inout bit<8> v) {
           apply { byte_t b = v; v = b; }
         }",
    );
    drop(f);
}

#[test]
fn direct_application_type_checks() {
    let f = front_ok(
        "parser Inner(bit<8> x) { state start { transition accept; } }
         parser Outer(bit<8> x) {
           Inner() i;
           state start { Inner.apply(x); transition accept; }
         }",
    );
    drop(f);
}

#[test]
fn package_instantiation_at_top_level() {
    let f = front_ok(
        "parser P(bit<8> x);
         package Pipe(P p);
         parser MyP(bit<8> x) { state start { transition accept; } }
         Pipe(MyP()) main;",
    );
    drop(f);
}

#[test]
fn assignment_requires_matching_width() {
    let err = front(
        "control C(inout bit<8> v) {
           apply { bit<16> w = 16w1; v = w; }
         }",
    )
    .expect_err("bit<16> does not fit bit<8>");
    assert_eq!(err.kind, DiagKind::Type);
}

#[test]
fn cast_bridges_widths() {
    let f = front_ok(
        "control C(inout bit<8> v) {
           apply { bit<16> w = (bit<16>) v; w = w; }
         }",
    );
    let cast = first_node(&f.parse, |k| matches!(k, NodeKind::CastExpression { .. }));
    let cast_ty = f.analysis.type_env[&cast];
    let mut f = f;
    let b16 = f.analysis.types.bit(16);
    assert!(f.analysis.types.equiv(cast_ty, b16));
}
