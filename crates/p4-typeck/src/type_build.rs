//! Declared-type construction.
//!
//! Walks the bound tree once and creates a `Type` for every
//! declaration: field products for headers, structs, and unions,
//! member fields for enums, parameter products and function types for
//! actions, functions, and methods, and the parser/control/package/
//! table types. Parser, control, and table types receive a
//! synthesized `apply` method member so direct application and
//! `t.apply()` type-check like any other member call.
//!
//! Named type references become `Nameref` placeholders, resolved to
//! the referenced declaration's type once the whole tree has been
//! visited. `error` and `match_kind` declarations extend the two
//! global member lists instead of declaring new types.

use p4_common::{Interner, Symbol};
use p4_parser::ast::{Ast, NodeId, NodeKind};
use p4_parser::scope::{DeclId, Namespace};
use rustc_hash::FxHashMap;

use crate::scope_hierarchy::ScopeHierarchy;
use crate::types::{TypeId, TypeKind, TypeTable};

/// Output of declared-type construction.
pub struct DeclTypes {
    /// The type of every declaration.
    pub decl_ty: FxHashMap<DeclId, TypeId>,
    /// The type denoted by every type-reference node.
    pub node_ty: FxHashMap<NodeId, TypeId>,
    /// The declaring node of a constructed type, for diagnostics.
    pub ty_origin: FxHashMap<TypeId, NodeId>,
}

/// Symbols for members the checker synthesizes or looks up by name.
pub struct WellKnown {
    pub apply: Symbol,
    pub is_valid: Symbol,
    pub set_valid: Symbol,
    pub set_invalid: Symbol,
    pub next: Symbol,
    pub last: Symbol,
    pub size: Symbol,
    pub last_index: Symbol,
}

impl WellKnown {
    pub fn new(interner: &mut Interner) -> WellKnown {
        WellKnown {
            apply: interner.intern("apply"),
            is_valid: interner.intern("isValid"),
            set_valid: interner.intern("setValid"),
            set_invalid: interner.intern("setInvalid"),
            next: interner.intern("next"),
            last: interner.intern("last"),
            size: interner.intern("size"),
            last_index: interner.intern("lastIndex"),
        }
    }
}

pub fn build_types(
    ast: &Ast,
    root: NodeId,
    hierarchy: &ScopeHierarchy,
    decl_map: &FxHashMap<NodeId, DeclId>,
    interner: &mut Interner,
    table: &mut TypeTable,
) -> DeclTypes {
    let well_known = WellKnown::new(interner);
    let mut build = Build {
        ast,
        hierarchy,
        decl_map,
        table,
        well_known,
        decl_ty: FxHashMap::default(),
        node_ty: FxHashMap::default(),
        ty_origin: FxHashMap::default(),
        namerefs: Vec::new(),
    };
    build.install_builtin_types(interner);
    build.visit(root);
    build.resolve_namerefs();
    DeclTypes { decl_ty: build.decl_ty, node_ty: build.node_ty, ty_origin: build.ty_origin }
}

struct Build<'a> {
    ast: &'a Ast,
    hierarchy: &'a ScopeHierarchy,
    decl_map: &'a FxHashMap<NodeId, DeclId>,
    table: &'a mut TypeTable,
    well_known: WellKnown,
    decl_ty: FxHashMap<DeclId, TypeId>,
    node_ty: FxHashMap<NodeId, TypeId>,
    ty_origin: FxHashMap<TypeId, NodeId>,
    namerefs: Vec<TypeId>,
}

impl<'a> Build<'a> {
    /// Types for the preloaded root-scope names.
    fn install_builtin_types(&mut self, interner: &mut Interner) {
        let scopes = &self.hierarchy.scopes;
        let root = scopes.root;
        let prims = self.table.prims;
        let mut set = |this: &mut Build<'a>, name: &str, ns: Namespace, ty: TypeId| {
            let sym = interner.intern(name);
            if let Some(decl) = this.hierarchy.scopes.resolve(root, sym, &[ns]) {
                this.decl_ty.insert(decl, ty);
            }
        };
        set(self, "void", Namespace::Type, prims.void);
        set(self, "bool", Namespace::Type, prims.bool_);
        set(self, "int", Namespace::Type, prims.int);
        set(self, "string", Namespace::Type, prims.string);
        set(self, "error", Namespace::Type, prims.error);
        set(self, "match_kind", Namespace::Type, prims.match_kind);
        set(self, "_", Namespace::Type, prims.any);
        let bit1 = self.table.bit(1);
        set(self, "bit", Namespace::Type, bit1);
        let varbit = self.table.add(TypeKind::Varbit { width: 0 }, None);
        set(self, "varbit", Namespace::Type, varbit);
        set(self, "accept", Namespace::Var, prims.state);
        set(self, "reject", Namespace::Var, prims.state);
    }

    fn decl_of(&self, node: NodeId) -> Option<DeclId> {
        self.decl_map.get(&node).copied()
    }

    fn record_decl(&mut self, node: NodeId, ty: TypeId) {
        if let Some(decl) = self.decl_of(node) {
            self.decl_ty.insert(decl, ty);
        }
        self.ty_origin.insert(ty, node);
    }

    /// A `bit<N>`/`int<N>` width operand, written as an integer.
    fn width_of(&self, size: Option<NodeId>) -> Option<u32> {
        let size = size?;
        match *self.ast.kind(size) {
            NodeKind::IntegerTypeSize { size } => match *self.ast.kind(size) {
                NodeKind::IntegerLiteral { value } => Some(value.value as u32),
                _ => None,
            },
            _ => None,
        }
    }

    /// Constant-fold a header-stack size expression when it is a bare
    /// integer literal.
    fn literal_of(&self, expr: NodeId) -> u64 {
        match *self.ast.kind(expr) {
            NodeKind::Expression { expr } => self.literal_of(expr),
            NodeKind::IntegerLiteral { value } => value.value,
            _ => 0,
        }
    }

    /// The type denoted by a type-reference node.
    fn type_of_ref(&mut self, node: NodeId) -> TypeId {
        if let Some(&ty) = self.node_ty.get(&node) {
            return ty;
        }
        let ty = match *self.ast.kind(node) {
            NodeKind::TypeRef { ty } => self.type_of_ref(ty),
            NodeKind::BaseTypeBool { .. } => self.table.prims.bool_,
            NodeKind::BaseTypeString { .. } => self.table.prims.string,
            NodeKind::BaseTypeVoid { .. } => self.table.prims.void,
            NodeKind::BaseTypeError { .. } => self.table.prims.error,
            NodeKind::BaseTypeInt { size, .. } => match self.width_of(size) {
                Some(width) => self.table.add(TypeKind::Int { width: Some(width) }, None),
                None => self.table.prims.int,
            },
            NodeKind::BaseTypeBit { size, .. } => {
                let width = self.width_of(size).unwrap_or(1);
                self.table.bit(width)
            }
            NodeKind::BaseTypeVarbit { size, .. } => {
                let width = self.width_of(Some(size)).unwrap_or(0);
                self.table.add(TypeKind::Varbit { width }, None)
            }
            NodeKind::Name { name } => {
                let nameref = self.table.add(TypeKind::Nameref { node }, Some(name));
                self.namerefs.push(nameref);
                nameref
            }
            NodeKind::HeaderStackType { ty, size } => {
                let element = self.type_of_ref(ty);
                let size = self.literal_of(size);
                self.table.add(TypeKind::Stack { element, size }, None)
            }
            NodeKind::TupleType { type_args } => {
                let members: Vec<TypeId> = {
                    let args: Vec<NodeId> = self.ast.children(type_args).collect();
                    args.iter().map(|&arg| self.type_of_type_arg(arg)).collect()
                };
                let elements = self.table.add(TypeKind::Product { members }, None);
                self.table.add(TypeKind::Tuple { elements }, None)
            }
            NodeKind::Dontcare => self.table.prims.any,
            ref other => panic!("not a type reference: {other:?}"),
        };
        self.node_ty.insert(node, ty);
        ty
    }

    fn type_of_type_arg(&mut self, arg: NodeId) -> TypeId {
        match *self.ast.kind(arg) {
            NodeKind::TypeArg { arg } => self.type_of_type_arg(arg),
            NodeKind::Dontcare => self.table.prims.any,
            _ => self.type_of_ref(arg),
        }
    }

    /// Parameter product of a parameter list.
    fn params_product(&mut self, params: NodeId) -> TypeId {
        let list: Vec<NodeId> = self.ast.children(params).collect();
        let mut members = Vec::with_capacity(list.len());
        for param in list {
            let NodeKind::Parameter { ty, init, .. } = *self.ast.kind(param) else {
                unreachable!("parameter lists hold parameters");
            };
            let pty = self.type_of_ref(ty);
            self.record_decl(param, pty);
            if let Some(init) = init {
                self.visit(init);
            }
            members.push(pty);
        }
        self.table.add(TypeKind::Product { members }, None)
    }

    /// Field product of a struct/header/union body.
    fn fields_product(&mut self, fields: NodeId) -> TypeId {
        let list: Vec<NodeId> = self.ast.children(fields).collect();
        let mut members = Vec::with_capacity(list.len());
        for field in list {
            let NodeKind::StructField { ty, name } = *self.ast.kind(field) else {
                unreachable!("field lists hold struct fields");
            };
            let fty = self.type_of_ref(ty);
            self.record_decl(field, fty);
            let sym = self.ast.name_of(name);
            members.push(self.table.add(TypeKind::Field { ty: fty }, Some(sym)));
        }
        self.table.add(TypeKind::Product { members }, None)
    }

    /// A methods product holding one synthesized `apply`.
    fn apply_methods(&mut self, params: TypeId) -> TypeId {
        let void = self.table.prims.void;
        let apply = self.table.add(TypeKind::Function { params, ret: void }, None);
        let field = self.table.add(TypeKind::Field { ty: apply }, Some(self.well_known.apply));
        self.table.add(TypeKind::Product { members: vec![field] }, None)
    }

    fn resolve_namerefs(&mut self) {
        for &nameref in &self.namerefs {
            let TypeKind::Nameref { node } = *self.table.kind(nameref) else {
                unreachable!("nameref list holds namerefs");
            };
            if let Some(decl) = self.decl_map.get(&node) {
                if let Some(&target) = self.decl_ty.get(decl) {
                    self.table.resolve_nameref(nameref, target);
                }
            }
        }
    }

    fn walk(&mut self, id: NodeId) {
        let ast = self.ast;
        let mut kids = Vec::new();
        ast.for_each_child(id, |c| kids.push(c));
        for c in kids {
            self.visit(c);
        }
    }

    fn visit(&mut self, id: NodeId) {
        match *self.ast.kind(id) {
            NodeKind::VariableDeclaration { ty, init, .. } => {
                let t = self.type_of_ref(ty);
                if let Some(decl) = self.decl_of(id) {
                    self.decl_ty.insert(decl, t);
                }
                if let Some(init) = init {
                    self.visit(init);
                }
            }

            NodeKind::HeaderTypeDeclaration { name, fields } => {
                let product = self.fields_product(fields);
                let sym = self.ast.name_of(name);
                let ty = self.table.add(TypeKind::Header { fields: product }, Some(sym));
                self.record_decl(id, ty);
            }
            NodeKind::StructTypeDeclaration { name, fields } => {
                let product = self.fields_product(fields);
                let sym = self.ast.name_of(name);
                let ty = self.table.add(TypeKind::Struct { fields: product }, Some(sym));
                self.record_decl(id, ty);
            }
            NodeKind::HeaderUnionDeclaration { name, fields } => {
                let product = self.fields_product(fields);
                let sym = self.ast.name_of(name);
                let ty = self.table.add(TypeKind::Union { fields: product }, Some(sym));
                self.record_decl(id, ty);
            }

            NodeKind::EnumDeclaration { name, fields, .. } => {
                let sym = self.ast.name_of(name);
                let product = self.table.add(TypeKind::Product { members: Vec::new() }, None);
                let ty = self.table.add(TypeKind::Enum { fields: product }, Some(sym));
                let members: Vec<NodeId> = self.ast.children(fields).collect();
                for member in members {
                    let NodeKind::SpecifiedIdentifier { name, init } = *self.ast.kind(member)
                    else {
                        unreachable!("enum bodies hold specified identifiers");
                    };
                    let msym = self.ast.name_of(name);
                    let field = self.table.add(TypeKind::Field { ty }, Some(msym));
                    self.table.push_member(product, field);
                    if let Some(decl) = self.decl_of(member) {
                        self.decl_ty.insert(decl, ty);
                    }
                    if let Some(init) = init {
                        self.visit(init);
                    }
                }
                self.record_decl(id, ty);
            }

            NodeKind::ErrorDeclaration { fields } => {
                self.extend_global_members(fields, self.table.prims.error);
            }
            NodeKind::MatchKindDeclaration { fields } => {
                self.extend_global_members(fields, self.table.prims.match_kind);
            }

            NodeKind::TypedefDeclaration { ty, name } => {
                let aliased = self.type_of_ref(ty);
                let sym = self.ast.name_of(name);
                let t = self.table.add(TypeKind::Typedef { aliased }, Some(sym));
                self.record_decl(id, t);
            }

            NodeKind::ParserTypeDeclaration { name, params } => {
                let product = self.params_product(params);
                let methods = self.apply_methods(product);
                let sym = self.ast.name_of(name);
                let ty =
                    self.table.add(TypeKind::Parser { params: product, methods }, Some(sym));
                self.record_decl(id, ty);
            }
            NodeKind::ControlTypeDeclaration { name, params } => {
                let product = self.params_product(params);
                let methods = self.apply_methods(product);
                let sym = self.ast.name_of(name);
                let ty =
                    self.table.add(TypeKind::Control { params: product, methods }, Some(sym));
                self.record_decl(id, ty);
            }
            NodeKind::PackageTypeDeclaration { name, params } => {
                let product = self.params_product(params);
                let sym = self.ast.name_of(name);
                let ty = self.table.add(TypeKind::Package { params: product }, Some(sym));
                self.record_decl(id, ty);
            }

            NodeKind::ExternTypeDeclaration { name, methods } => {
                let sym = self.ast.name_of(name);
                let product = self.table.add(TypeKind::Product { members: Vec::new() }, None);
                let ty = self.table.add(TypeKind::Extern { methods: product }, Some(sym));
                let protos: Vec<NodeId> = self.ast.children(methods).collect();
                for proto in protos {
                    let NodeKind::FunctionPrototype { return_ty, name, params } =
                        *self.ast.kind(proto)
                    else {
                        unreachable!("method lists hold prototypes");
                    };
                    let ret = match return_ty {
                        Some(node) => self.type_of_ref(node),
                        // Constructor: returns the extern itself.
                        None => ty,
                    };
                    let product_params = self.params_product(params);
                    let f =
                        self.table.add(TypeKind::Function { params: product_params, ret }, None);
                    let msym = self.ast.name_of(name);
                    let field = self.table.add(TypeKind::Field { ty: f }, Some(msym));
                    self.table.push_member(product, field);
                    self.record_decl(proto, f);
                }
                self.record_decl(id, ty);
            }

            NodeKind::FunctionPrototype { return_ty, params, .. } => {
                // A free function prototype (extern function) or a
                // function declaration's prototype.
                let ret = match return_ty {
                    Some(node) => self.type_of_ref(node),
                    None => self.table.prims.void,
                };
                let product = self.params_product(params);
                let f = self.table.add(TypeKind::Function { params: product, ret }, None);
                self.record_decl(id, f);
            }

            NodeKind::ActionDeclaration { params, body, .. } => {
                let product = self.params_product(params);
                let void = self.table.prims.void;
                let f = self.table.add(TypeKind::Function { params: product, ret: void }, None);
                self.record_decl(id, f);
                self.visit(body);
            }

            NodeKind::TableDeclaration { name, props } => {
                let no_params = self.table.add(TypeKind::Product { members: Vec::new() }, None);
                let methods = self.apply_methods(no_params);
                let sym = self.ast.name_of(name);
                let ty = self.table.add(TypeKind::Table { methods }, Some(sym));
                self.record_decl(id, ty);
                self.visit(props);
            }

            NodeKind::Instantiation { ty, args, .. } => {
                let t = self.type_of_ref(ty);
                if let Some(decl) = self.decl_of(id) {
                    self.decl_ty.insert(decl, t);
                }
                self.visit(args);
            }

            NodeKind::ParserState { stmts, transition, .. } => {
                let state = self.table.prims.state;
                if let Some(decl) = self.decl_of(id) {
                    self.decl_ty.insert(decl, state);
                }
                self.visit(stmts);
                self.visit(transition);
            }

            NodeKind::Parameter { ty, init, .. } => {
                let t = self.type_of_ref(ty);
                if let Some(decl) = self.decl_of(id) {
                    self.decl_ty.insert(decl, t);
                }
                if let Some(init) = init {
                    self.visit(init);
                }
            }

            NodeKind::CastExpression { ty, expr } => {
                self.type_of_ref(ty);
                self.visit(expr);
            }

            NodeKind::TypeRef { .. } => {
                self.type_of_ref(id);
            }

            NodeKind::DirectApplication { name, args } => {
                if matches!(self.ast.kind(name), NodeKind::TypeRef { .. }) {
                    self.type_of_ref(name);
                }
                self.visit(args);
            }

            _ => self.walk(id),
        }
    }

    fn extend_global_members(&mut self, fields: NodeId, global: TypeId) {
        let product = match *self.table.kind(global) {
            TypeKind::Error { fields } | TypeKind::MatchKind { fields } => fields,
            ref other => panic!("not a global member list: {other:?}"),
        };
        let members: Vec<NodeId> = self.ast.children(fields).collect();
        for member in members {
            let sym = self.ast.name_of(member);
            let field = self.table.add(TypeKind::Field { ty: global }, Some(sym));
            self.table.push_member(product, field);
            if let Some(decl) = self.decl_of(member) {
                self.decl_ty.insert(decl, global);
            }
        }
    }
}
