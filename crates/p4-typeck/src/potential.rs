//! Phase 1: potential-type synthesis.
//!
//! A bottom-up pass annotating every expression with either a set of
//! candidate types (overload resolution still pending) or a product of
//! potential types (expression lists and argument lists).
//!
//! Literals yield the singleton set of their literal type. Names
//! collect every declaration visible under the variable namespace
//! (extern methods and actions may overload), falling back to the
//! type namespace for type names in expression position. Binary
//! expressions collect the result of every operand pair a built-in
//! operator is defined on. Call sites compute an argument potential
//! product and retain exactly the function candidates whose parameter
//! product matches; member selectors collect the members with the
//! requested name from every candidate of the receiver, filtering
//! method-like members by the call's arguments.

use p4_common::{Interner, IntValue};
use p4_parser::ast::{Ast, NodeId, NodeKind};
use p4_parser::scope::{DeclId, Namespace};
use rustc_hash::FxHashMap;

use crate::builtins;
use crate::scope_hierarchy::ScopeHierarchy;
use crate::type_build::{DeclTypes, WellKnown};
use crate::types::{TypeId, TypeKind, TypeTable};

/// Candidate types of an expression before selection.
#[derive(Clone, Debug)]
pub enum PotentialType {
    Set(Vec<TypeId>),
    Product(Vec<PotentialType>),
}

impl PotentialType {
    pub fn empty() -> PotentialType {
        PotentialType::Set(Vec::new())
    }

    pub fn singleton(ty: TypeId) -> PotentialType {
        PotentialType::Set(vec![ty])
    }

    /// The candidate set; empty for products.
    pub fn set(&self) -> &[TypeId] {
        match self {
            PotentialType::Set(tys) => tys,
            PotentialType::Product(_) => &[],
        }
    }
}

/// Output of the synthesis pass.
pub struct Potentials {
    pub potype: FxHashMap<NodeId, PotentialType>,
    /// For every call site: the surviving `(callee, result)` pairs.
    pub call_candidates: FxHashMap<NodeId, Vec<(TypeId, TypeId)>>,
}

pub fn potential_types(
    ast: &Ast,
    root: NodeId,
    hierarchy: &ScopeHierarchy,
    decl_map: &FxHashMap<NodeId, DeclId>,
    decl_types: &DeclTypes,
    table: &mut TypeTable,
    interner: &mut Interner,
) -> Potentials {
    let well_known = WellKnown::new(interner);
    let mut pass = Pass {
        ast,
        hierarchy,
        decl_map,
        decl_types,
        table,
        well_known,
        potype: FxHashMap::default(),
        call_candidates: FxHashMap::default(),
        header_methods: None,
    };
    pass.visit(root);
    Potentials { potype: pass.potype, call_candidates: pass.call_candidates }
}

/// Synthesized method types shared by all header candidates.
struct HeaderMethods {
    is_valid: TypeId,
    set_valid: TypeId,
    set_invalid: TypeId,
}

struct Pass<'a> {
    ast: &'a Ast,
    hierarchy: &'a ScopeHierarchy,
    decl_map: &'a FxHashMap<NodeId, DeclId>,
    decl_types: &'a DeclTypes,
    table: &'a mut TypeTable,
    well_known: WellKnown,
    potype: FxHashMap<NodeId, PotentialType>,
    call_candidates: FxHashMap<NodeId, Vec<(TypeId, TypeId)>>,
    header_methods: Option<HeaderMethods>,
}

impl<'a> Pass<'a> {
    fn header_methods(&mut self) -> (TypeId, TypeId, TypeId) {
        if self.header_methods.is_none() {
            let no_params = self.table.add(TypeKind::Product { members: Vec::new() }, None);
            let bool_ = self.table.prims.bool_;
            let void = self.table.prims.void;
            let is_valid =
                self.table.add(TypeKind::Function { params: no_params, ret: bool_ }, None);
            let set_valid =
                self.table.add(TypeKind::Function { params: no_params, ret: void }, None);
            let set_invalid =
                self.table.add(TypeKind::Function { params: no_params, ret: void }, None);
            self.header_methods = Some(HeaderMethods { is_valid, set_valid, set_invalid });
        }
        let m = self.header_methods.as_ref().expect("just initialized");
        (m.is_valid, m.set_valid, m.set_invalid)
    }

    fn literal_type(&mut self, value: IntValue) -> TypeId {
        match value.width {
            Some(width) if value.signed => {
                self.table.add(TypeKind::Int { width: Some(width) }, None)
            }
            Some(width) => self.table.bit(width),
            None => self.table.prims.int,
        }
    }

    /// Exactly-one test: how many candidates satisfy the required
    /// type.
    fn match_count(&self, set: &[TypeId], required: TypeId) -> usize {
        set.iter().filter(|&&t| self.table.fits(t, required)).count()
    }

    /// Does an argument potential product satisfy a parameter product?
    fn match_params(&self, args: &PotentialType, params: TypeId) -> bool {
        let PotentialType::Product(members) = args else {
            return false;
        };
        let param_tys = self.table.product_members(params).to_vec();
        members.len() == param_tys.len()
            && members
                .iter()
                .zip(param_tys.iter())
                .all(|(arg, &param)| self.match_count(arg.set(), param) == 1)
    }

    // ── Tree walk ──────────────────────────────────────────────────

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
            NodeKind::Expression { .. }
            | NodeKind::LvalueExpression { .. }
            | NodeKind::FunctionCall { .. }
            | NodeKind::AssignmentStatement { .. }
            | NodeKind::IndexExpression { .. } => {
                self.expr(id);
            }
            NodeKind::ActionRef { name, args } => {
                self.action_ref(id, name, args);
            }
            _ => self.walk(id),
        }
    }

    // ── Expression synthesis ───────────────────────────────────────

    fn expr(&mut self, id: NodeId) -> PotentialType {
        if let Some(pt) = self.potype.get(&id) {
            return pt.clone();
        }
        let pt = match *self.ast.kind(id) {
            NodeKind::Expression { expr } | NodeKind::LvalueExpression { expr } => self.expr(expr),

            NodeKind::Name { .. } => self.name_potype(id),

            NodeKind::IntegerLiteral { value } => {
                PotentialType::singleton(self.literal_type(value))
            }
            NodeKind::BooleanLiteral { .. } => PotentialType::singleton(self.table.prims.bool_),
            NodeKind::StringLiteral { .. } => PotentialType::singleton(self.table.prims.string),
            NodeKind::Dontcare | NodeKind::Default => {
                PotentialType::singleton(self.table.prims.any)
            }

            NodeKind::ExpressionList(_) => {
                let exprs: Vec<NodeId> = self.ast.children(id).collect();
                PotentialType::Product(exprs.iter().map(|&e| self.expr(e)).collect())
            }

            NodeKind::Argument { arg } => self.expr(arg),

            NodeKind::ArgumentList(_) => {
                let args: Vec<NodeId> = self.ast.children(id).collect();
                PotentialType::Product(args.iter().map(|&a| self.expr(a)).collect())
            }

            NodeKind::UnaryExpression { op, operand } => {
                let operand_pt = self.expr(operand);
                let mut out = Vec::new();
                for &t in operand_pt.set() {
                    if let Some(result) = builtins::unary_result(self.table, op, t) {
                        push_equiv_unique(self.table, &mut out, result);
                    }
                }
                PotentialType::Set(out)
            }

            NodeKind::BinaryExpression { op, lhs, rhs } => {
                let lhs_pt = self.expr(lhs);
                let rhs_pt = self.expr(rhs);
                let mut out = Vec::new();
                for &l in lhs_pt.set() {
                    for &r in rhs_pt.set() {
                        if let Some(result) = builtins::binary_result(self.table, op, l, r) {
                            push_equiv_unique(self.table, &mut out, result);
                        }
                    }
                }
                PotentialType::Set(out)
            }

            NodeKind::MemberSelector { .. } => self.member_select(id, None),

            NodeKind::FunctionCall { .. } => self.call(id),

            NodeKind::CastExpression { ty, expr } => {
                self.expr(expr);
                match self.decl_types.node_ty.get(&ty) {
                    Some(&t) => PotentialType::singleton(t),
                    None => PotentialType::empty(),
                }
            }

            NodeKind::AssignmentStatement { lhs, rhs } => {
                // The value of an assignment is its target.
                let lhs_pt = self.expr(lhs);
                self.expr(rhs);
                lhs_pt
            }

            NodeKind::ArraySubscript { lhs, index } => {
                let lhs_pt = self.expr(lhs);
                self.expr(index);
                let mut out = Vec::new();
                for &t in lhs_pt.set() {
                    let e = self.table.effective(t);
                    match *self.table.kind(e) {
                        TypeKind::Stack { element, .. } => {
                            push_equiv_unique(self.table, &mut out, element)
                        }
                        TypeKind::Bit { .. } => {
                            let result = self.subscript_of_bit(index);
                            push_equiv_unique(self.table, &mut out, result);
                        }
                        _ => {}
                    }
                }
                PotentialType::Set(out)
            }

            NodeKind::IndexExpression { start, end } => {
                let start_pt = self.expr(start);
                if let Some(end) = end {
                    self.expr(end);
                }
                start_pt
            }

            ref other => {
                debug_assert!(false, "not an expression: {other:?}");
                PotentialType::empty()
            }
        };
        self.potype.insert(id, pt.clone());
        pt
    }

    /// Bit slices `x[a:b]` have width `a - b + 1` when both bounds are
    /// literals; a single index selects one bit.
    fn subscript_of_bit(&mut self, index: NodeId) -> TypeId {
        let NodeKind::IndexExpression { start, end } = *self.ast.kind(index) else {
            return self.table.bit(1);
        };
        match end {
            None => self.table.bit(1),
            Some(end) => match (self.literal_of(start), self.literal_of(end)) {
                (Some(hi), Some(lo)) if hi >= lo => self.table.bit((hi - lo + 1) as u32),
                _ => self.table.bit(1),
            },
        }
    }

    fn literal_of(&self, expr: NodeId) -> Option<u64> {
        match *self.ast.kind(expr) {
            NodeKind::Expression { expr } => self.literal_of(expr),
            NodeKind::IntegerLiteral { value } => Some(value.value),
            _ => None,
        }
    }

    /// All declarations a name may refer to: the nearest variable-
    /// namespace chain, or a type name used in expression position.
    fn name_potype(&mut self, id: NodeId) -> PotentialType {
        let sym = self.ast.name_of(id);
        let scope = match self.hierarchy.scope_map.get(&id) {
            Some(&scope) => scope,
            None => self.hierarchy.scopes.root,
        };
        let decls = self.hierarchy.scopes.visible_decls(scope, sym, Namespace::Var);
        let mut out: Vec<TypeId> = decls
            .iter()
            .filter_map(|d| self.decl_types.decl_ty.get(d).copied())
            .collect();
        if out.is_empty() {
            if let Some(decl) = self.hierarchy.scopes.resolve(scope, sym, &[Namespace::Type]) {
                if let Some(&t) = self.decl_types.decl_ty.get(&decl) {
                    out.push(t);
                }
            }
        }
        out.dedup();
        PotentialType::Set(out)
    }

    /// Members named `name` across all receiver candidates. When the
    /// selector is the callee of a call, method-like members are
    /// additionally filtered by the argument product.
    fn member_select(&mut self, id: NodeId, args: Option<&PotentialType>) -> PotentialType {
        let NodeKind::MemberSelector { lhs, name } = *self.ast.kind(id) else {
            unreachable!("member_select on a member selector");
        };
        let lhs_pt = self.expr(lhs);
        let sym = self.ast.name_of(name);
        let mut out = Vec::new();
        for &candidate in lhs_pt.set() {
            let e = self.table.effective(candidate);
            let kind = self.table.kind(e).clone();
            match kind {
                TypeKind::Struct { fields }
                | TypeKind::Union { fields }
                | TypeKind::Enum { fields }
                | TypeKind::Error { fields }
                | TypeKind::MatchKind { fields } => {
                    for member in self.table.find_member(fields, sym) {
                        if let TypeKind::Field { ty } = *self.table.kind(member) {
                            out.push(ty);
                        }
                    }
                }
                TypeKind::Header { fields } => {
                    for member in self.table.find_member(fields, sym) {
                        if let TypeKind::Field { ty } = *self.table.kind(member) {
                            out.push(ty);
                        }
                    }
                    let (is_valid, set_valid, set_invalid) = self.header_methods();
                    if sym == self.well_known.is_valid {
                        out.push(is_valid);
                    } else if sym == self.well_known.set_valid {
                        out.push(set_valid);
                    } else if sym == self.well_known.set_invalid {
                        out.push(set_invalid);
                    }
                }
                TypeKind::Extern { methods }
                | TypeKind::Parser { methods, .. }
                | TypeKind::Control { methods, .. }
                | TypeKind::Table { methods } => {
                    for member in self.table.find_member(methods, sym) {
                        let TypeKind::Field { ty } = *self.table.kind(member) else {
                            continue;
                        };
                        let keep = match (args, self.table.kind(self.table.effective(ty))) {
                            (Some(args), TypeKind::Function { params, .. }) => {
                                self.match_params(args, *params)
                            }
                            _ => true,
                        };
                        if keep {
                            out.push(ty);
                        }
                    }
                }
                TypeKind::Stack { element, .. } => {
                    if sym == self.well_known.next || sym == self.well_known.last {
                        out.push(element);
                    } else if sym == self.well_known.size || sym == self.well_known.last_index {
                        let b32 = self.table.bit(32);
                        out.push(b32);
                    }
                }
                _ => {}
            }
        }
        out.dedup();
        PotentialType::Set(out)
    }

    /// A call site: retain callee candidates whose parameters accept
    /// the arguments; the site's own candidates are their results.
    /// Constructor-style calls of parser, control, and package types
    /// yield the type itself.
    fn call(&mut self, id: NodeId) -> PotentialType {
        let NodeKind::FunctionCall { callee, args } = *self.ast.kind(id) else {
            unreachable!("call on a function call");
        };
        let args_pt = self.expr(args);
        let callee_pt = self.callee_potype(callee, &args_pt);

        let mut results = Vec::new();
        let mut candidates = Vec::new();
        for &t in callee_pt.set() {
            let e = self.table.effective(t);
            match *self.table.kind(e) {
                TypeKind::Function { params, ret } => {
                    if self.match_params(&args_pt, params) {
                        candidates.push((t, ret));
                        push_equiv_unique(self.table, &mut results, ret);
                    }
                }
                TypeKind::Parser { .. }
                | TypeKind::Control { .. }
                | TypeKind::Package { .. }
                | TypeKind::Extern { .. } => {
                    candidates.push((t, t));
                    push_equiv_unique(self.table, &mut results, t);
                }
                _ => {}
            }
        }
        self.call_candidates.insert(id, candidates);
        PotentialType::Set(results)
    }

    /// Potential of a callee, pushing the argument product down into a
    /// member selector so methods filter by signature.
    fn callee_potype(&mut self, id: NodeId, args: &PotentialType) -> PotentialType {
        let pt = match *self.ast.kind(id) {
            NodeKind::Expression { expr } | NodeKind::LvalueExpression { expr } => {
                self.callee_potype(expr, args)
            }
            NodeKind::MemberSelector { .. } => self.member_select(id, Some(args)),
            _ => self.expr(id),
        };
        self.potype.insert(id, pt.clone());
        pt
    }

    /// An action reference in a table's actions list: the action's
    /// candidates, filtered by arguments when bound ones are given.
    fn action_ref(&mut self, id: NodeId, name: NodeId, args: Option<NodeId>) {
        let name_pt = self.expr(name);
        let filtered = match args {
            None => name_pt,
            Some(args) => {
                let args_pt = self.expr(args);
                let kept: Vec<TypeId> = name_pt
                    .set()
                    .iter()
                    .copied()
                    .filter(|&t| match *self.table.kind(self.table.effective(t)) {
                        TypeKind::Function { params, .. } => self.match_params(&args_pt, params),
                        _ => true,
                    })
                    .collect();
                PotentialType::Set(kept)
            }
        };
        self.potype.insert(name, filtered.clone());
        self.potype.insert(id, filtered);
    }
}

/// Add a type to a candidate set unless an equivalent one is present.
fn push_equiv_unique(table: &TypeTable, out: &mut Vec<TypeId>, ty: TypeId) {
    if !out.iter().any(|&t| table.equiv(t, ty)) {
        out.push(ty);
    }
}
