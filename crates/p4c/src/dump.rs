//! Debug tree printing for `--dump-ast`.

use p4_common::Interner;
use p4_parser::ast::{NodeId, NodeKind};
use p4_parser::Parse;

/// Render the tree as one indented line per node.
pub fn render(parse: &Parse, interner: &Interner) -> String {
    let mut out = String::new();
    node(parse, interner, parse.root, 0, &mut out);
    out
}

fn node(parse: &Parse, interner: &Interner, id: NodeId, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(kind_name(parse.ast.kind(id)));
    match *parse.ast.kind(id) {
        NodeKind::Name { name } => {
            out.push(' ');
            out.push('`');
            out.push_str(interner.resolve(name));
            out.push('`');
        }
        NodeKind::IntegerLiteral { value } => {
            out.push_str(&format!(" {}", value.value));
        }
        NodeKind::BooleanLiteral { value } => {
            out.push_str(&format!(" {value}"));
        }
        _ => {}
    }
    out.push('\n');
    let mut kids = Vec::new();
    parse.ast.for_each_child(id, |c| kids.push(c));
    for child in kids {
        node(parse, interner, child, depth + 1, out);
    }
}

fn kind_name(kind: &NodeKind) -> &'static str {
    let repr: &str = match kind {
        NodeKind::P4Program { .. } => "P4Program",
        NodeKind::DeclarationList(_) => "DeclarationList",
        NodeKind::Declaration { .. } => "Declaration",
        NodeKind::Name { .. } => "Name",
        NodeKind::ParameterList(_) => "ParameterList",
        NodeKind::Parameter { .. } => "Parameter",
        NodeKind::PackageTypeDeclaration { .. } => "PackageTypeDeclaration",
        NodeKind::Instantiation { .. } => "Instantiation",
        NodeKind::ParserDeclaration { .. } => "ParserDeclaration",
        NodeKind::ParserTypeDeclaration { .. } => "ParserTypeDeclaration",
        NodeKind::ParserLocalElements(_) => "ParserLocalElements",
        NodeKind::ParserLocalElement { .. } => "ParserLocalElement",
        NodeKind::ParserStates(_) => "ParserStates",
        NodeKind::ParserState { .. } => "ParserState",
        NodeKind::ParserStatements(_) => "ParserStatements",
        NodeKind::ParserStatement { .. } => "ParserStatement",
        NodeKind::ParserBlockStatement { .. } => "ParserBlockStatement",
        NodeKind::TransitionStatement { .. } => "TransitionStatement",
        NodeKind::StateExpression { .. } => "StateExpression",
        NodeKind::SelectExpression { .. } => "SelectExpression",
        NodeKind::SelectCaseList(_) => "SelectCaseList",
        NodeKind::SelectCase { .. } => "SelectCase",
        NodeKind::KeysetExpression { .. } => "KeysetExpression",
        NodeKind::TupleKeysetExpression { .. } => "TupleKeysetExpression",
        NodeKind::SimpleExpressionList(_) => "SimpleExpressionList",
        NodeKind::SimpleKeysetExpression { .. } => "SimpleKeysetExpression",
        NodeKind::ControlDeclaration { .. } => "ControlDeclaration",
        NodeKind::ControlTypeDeclaration { .. } => "ControlTypeDeclaration",
        NodeKind::ControlLocalDeclarations(_) => "ControlLocalDeclarations",
        NodeKind::ControlLocalDeclaration { .. } => "ControlLocalDeclaration",
        NodeKind::ExternDeclaration { .. } => "ExternDeclaration",
        NodeKind::ExternTypeDeclaration { .. } => "ExternTypeDeclaration",
        NodeKind::MethodPrototypes(_) => "MethodPrototypes",
        NodeKind::FunctionPrototype { .. } => "FunctionPrototype",
        NodeKind::TypeRef { .. } => "TypeRef",
        NodeKind::TupleType { .. } => "TupleType",
        NodeKind::HeaderStackType { .. } => "HeaderStackType",
        NodeKind::BaseTypeBool { .. } => "BaseTypeBool",
        NodeKind::BaseTypeInt { .. } => "BaseTypeInt",
        NodeKind::BaseTypeBit { .. } => "BaseTypeBit",
        NodeKind::BaseTypeVarbit { .. } => "BaseTypeVarbit",
        NodeKind::BaseTypeString { .. } => "BaseTypeString",
        NodeKind::BaseTypeVoid { .. } => "BaseTypeVoid",
        NodeKind::BaseTypeError { .. } => "BaseTypeError",
        NodeKind::IntegerTypeSize { .. } => "IntegerTypeSize",
        NodeKind::TypeArg { .. } => "TypeArg",
        NodeKind::TypeArgumentList(_) => "TypeArgumentList",
        NodeKind::TypeDeclaration { .. } => "TypeDeclaration",
        NodeKind::DerivedTypeDeclaration { .. } => "DerivedTypeDeclaration",
        NodeKind::HeaderTypeDeclaration { .. } => "HeaderTypeDeclaration",
        NodeKind::HeaderUnionDeclaration { .. } => "HeaderUnionDeclaration",
        NodeKind::StructTypeDeclaration { .. } => "StructTypeDeclaration",
        NodeKind::StructFieldList(_) => "StructFieldList",
        NodeKind::StructField { .. } => "StructField",
        NodeKind::EnumDeclaration { .. } => "EnumDeclaration",
        NodeKind::ErrorDeclaration { .. } => "ErrorDeclaration",
        NodeKind::MatchKindDeclaration { .. } => "MatchKindDeclaration",
        NodeKind::IdentifierList(_) => "IdentifierList",
        NodeKind::SpecifiedIdentifierList(_) => "SpecifiedIdentifierList",
        NodeKind::SpecifiedIdentifier { .. } => "SpecifiedIdentifier",
        NodeKind::TypedefDeclaration { .. } => "TypedefDeclaration",
        NodeKind::AssignmentStatement { .. } => "AssignmentStatement",
        NodeKind::EmptyStatement => "EmptyStatement",
        NodeKind::ReturnStatement { .. } => "ReturnStatement",
        NodeKind::ExitStatement => "ExitStatement",
        NodeKind::ConditionalStatement { .. } => "ConditionalStatement",
        NodeKind::DirectApplication { .. } => "DirectApplication",
        NodeKind::Statement { .. } => "Statement",
        NodeKind::BlockStatement { .. } => "BlockStatement",
        NodeKind::StatementOrDeclList(_) => "StatementOrDeclList",
        NodeKind::SwitchStatement { .. } => "SwitchStatement",
        NodeKind::SwitchCases(_) => "SwitchCases",
        NodeKind::SwitchCase { .. } => "SwitchCase",
        NodeKind::SwitchLabel { .. } => "SwitchLabel",
        NodeKind::StatementOrDeclaration { .. } => "StatementOrDeclaration",
        NodeKind::TableDeclaration { .. } => "TableDeclaration",
        NodeKind::TablePropertyList(_) => "TablePropertyList",
        NodeKind::TableProperty { .. } => "TableProperty",
        NodeKind::KeyProperty { .. } => "KeyProperty",
        NodeKind::KeyElementList(_) => "KeyElementList",
        NodeKind::KeyElement { .. } => "KeyElement",
        NodeKind::ActionsProperty { .. } => "ActionsProperty",
        NodeKind::ActionList(_) => "ActionList",
        NodeKind::ActionRef { .. } => "ActionRef",
        NodeKind::EntriesProperty { .. } => "EntriesProperty",
        NodeKind::EntriesList(_) => "EntriesList",
        NodeKind::Entry { .. } => "Entry",
        NodeKind::SimpleProperty { .. } => "SimpleProperty",
        NodeKind::ActionDeclaration { .. } => "ActionDeclaration",
        NodeKind::VariableDeclaration { .. } => "VariableDeclaration",
        NodeKind::FunctionDeclaration { .. } => "FunctionDeclaration",
        NodeKind::ArgumentList(_) => "ArgumentList",
        NodeKind::Argument { .. } => "Argument",
        NodeKind::ExpressionList(_) => "ExpressionList",
        NodeKind::Expression { .. } => "Expression",
        NodeKind::LvalueExpression { .. } => "LvalueExpression",
        NodeKind::BinaryExpression { .. } => "BinaryExpression",
        NodeKind::UnaryExpression { .. } => "UnaryExpression",
        NodeKind::FunctionCall { .. } => "FunctionCall",
        NodeKind::MemberSelector { .. } => "MemberSelector",
        NodeKind::CastExpression { .. } => "CastExpression",
        NodeKind::ArraySubscript { .. } => "ArraySubscript",
        NodeKind::IndexExpression { .. } => "IndexExpression",
        NodeKind::IntegerLiteral { .. } => "IntegerLiteral",
        NodeKind::BooleanLiteral { .. } => "BooleanLiteral",
        NodeKind::StringLiteral { .. } => "StringLiteral",
        NodeKind::Dontcare => "Dontcare",
        NodeKind::Default => "Default",
    };
    repr
}
