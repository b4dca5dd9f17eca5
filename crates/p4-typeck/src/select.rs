//! Phase 2: type selection.
//!
//! A top-down pass carrying a required-type context. At every
//! expression site the potential-type set must collapse to exactly one
//! member satisfying the context; the survivor's effective type is
//! committed to `type_env`. An empty set after filtering is an
//! over-constrained site, more than one survivor an ambiguous one, and
//! both halt the front end with a located diagnostic (the ambiguous
//! case names the candidates' source locations). Where no external
//! context exists the pass passes no required type and any singleton
//! set is accepted.

use p4_common::{DiagKind, Diagnostic, Interner, SourceText};
use p4_parser::ast::{Ast, NodeId, NodeKind};
use p4_parser::scope::DeclId;
use rustc_hash::FxHashMap;

use crate::potential::{PotentialType, Potentials};
use crate::type_build::DeclTypes;
use crate::types::{TypeId, TypeKind, TypeTable};

type SResult<T> = Result<T, Diagnostic>;

/// Run selection over the whole tree; the result maps every
/// expression node and type reference to its selected type.
pub fn select_types(
    src: &SourceText<'_>,
    ast: &Ast,
    root: NodeId,
    decl_map: &FxHashMap<NodeId, DeclId>,
    decl_types: &DeclTypes,
    potentials: &Potentials,
    table: &mut TypeTable,
    interner: &Interner,
) -> Result<FxHashMap<NodeId, TypeId>, Diagnostic> {
    let mut pass = Pass {
        src,
        ast,
        decl_map,
        decl_types,
        potentials,
        table,
        interner,
        type_env: FxHashMap::default(),
        current_ret: Vec::new(),
    };
    pass.visit(root)?;
    Ok(pass.type_env)
}

struct Pass<'a, 'src> {
    src: &'a SourceText<'src>,
    ast: &'a Ast,
    decl_map: &'a FxHashMap<NodeId, DeclId>,
    decl_types: &'a DeclTypes,
    potentials: &'a Potentials,
    table: &'a mut TypeTable,
    interner: &'a Interner,
    type_env: FxHashMap<NodeId, TypeId>,
    /// Return-type context of the enclosing function or action.
    current_ret: Vec<TypeId>,
}

impl<'a, 'src> Pass<'a, 'src> {
    fn type_error(&self, at: NodeId, message: String) -> Diagnostic {
        self.src.error(DiagKind::Type, self.ast.span(at), message)
    }

    fn commit(&mut self, id: NodeId, ty: TypeId) -> TypeId {
        let effective = self.table.effective(ty);
        self.type_env.insert(id, effective);
        effective
    }

    /// Collapse a candidate set at `id` to exactly one member
    /// satisfying the required type.
    fn select_from_set(
        &mut self,
        id: NodeId,
        set: &[TypeId],
        required: Option<TypeId>,
    ) -> SResult<TypeId> {
        let surviving: Vec<TypeId> = match required {
            Some(required) => {
                set.iter().copied().filter(|&t| self.table.fits(t, required)).collect()
            }
            None => set.to_vec(),
        };
        let mut unique: Vec<TypeId> = Vec::new();
        for t in surviving {
            if !unique.iter().any(|&u| self.table.equiv(u, t)) {
                unique.push(t);
            }
        }
        match unique.len() {
            1 => Ok(self.commit(id, unique[0])),
            0 => Err(match required {
                Some(required) => self.type_error(
                    id,
                    format!(
                        "no candidate matches the expected type `{}`.",
                        self.table.render(required, self.interner)
                    ),
                ),
                None => self.type_error(id, "expression has no type.".to_string()),
            }),
            _ => Err(self.ambiguous(id, &unique)),
        }
    }

    fn ambiguous(&self, id: NodeId, candidates: &[TypeId]) -> Diagnostic {
        let mut sites = Vec::new();
        for &t in candidates {
            match self.decl_types.ty_origin.get(&t) {
                Some(&node) => {
                    let (line, col) = self.src.line_col(self.ast.span(node).start);
                    sites.push(format!("{}:{line}:{col}", self.src.name));
                }
                None => sites.push(self.table.render(t, self.interner)),
            }
        }
        self.type_error(id, format!("ambiguous expression; candidates: {}.", sites.join(", ")))
    }

    fn potype_of(&self, id: NodeId) -> &PotentialType {
        static EMPTY: PotentialType = PotentialType::Set(Vec::new());
        self.potentials.potype.get(&id).unwrap_or(&EMPTY)
    }

    /// Select an expression under an optional required type.
    fn check_expr(&mut self, id: NodeId, required: Option<TypeId>) -> SResult<TypeId> {
        match *self.ast.kind(id) {
            NodeKind::Expression { expr } | NodeKind::LvalueExpression { expr } => {
                let ty = self.check_expr(expr, required)?;
                self.type_env.insert(id, ty);
                Ok(ty)
            }

            NodeKind::FunctionCall { callee, args } => self.check_call(id, callee, args, required),

            NodeKind::AssignmentStatement { lhs, rhs } => {
                let lhs_ty = self.check_expr(lhs, None)?;
                self.check_expr(rhs, Some(lhs_ty))?;
                self.type_env.insert(id, lhs_ty);
                Ok(lhs_ty)
            }

            NodeKind::IndexExpression { start, end } => {
                let ty = self.check_expr(start, None)?;
                if let Some(end) = end {
                    self.check_expr(end, None)?;
                }
                self.type_env.insert(id, ty);
                Ok(ty)
            }

            NodeKind::CastExpression { ty: target, expr } => {
                // The operand collapses on its own; the cast imposes
                // the target type on the surroundings.
                self.check_expr(expr, None)?;
                let target_ty = self.decl_types.node_ty[&target];
                self.check_typeref(target, None)?;
                if let Some(required) = required {
                    if !self.table.equiv(target_ty, required) {
                        return Err(self.type_error(
                            id,
                            format!(
                                "expected `{}`, got `{}`.",
                                self.table.render(required, self.interner),
                                self.table.render(target_ty, self.interner)
                            ),
                        ));
                    }
                }
                Ok(self.commit(id, target_ty))
            }

            NodeKind::UnaryExpression { operand, .. } => {
                let pt = self.potype_of(id).clone();
                let ty = self.select_from_set(id, pt.set(), required)?;
                self.check_expr(operand, None)?;
                Ok(ty)
            }

            NodeKind::BinaryExpression { lhs, rhs, .. } => {
                let pt = self.potype_of(id).clone();
                let ty = self.select_from_set(id, pt.set(), required)?;
                // Operand context: a numeric result constrains both
                // sides only through their own candidate sets.
                self.check_expr(lhs, None)?;
                self.check_expr(rhs, None)?;
                Ok(ty)
            }

            NodeKind::MemberSelector { lhs, name } => {
                let pt = self.potype_of(id).clone();
                let ty = self.select_from_set(id, pt.set(), required)?;
                self.check_expr(lhs, None)?;
                self.type_env.insert(name, ty);
                Ok(ty)
            }

            NodeKind::ArraySubscript { lhs, index } => {
                let pt = self.potype_of(id).clone();
                let ty = self.select_from_set(id, pt.set(), required)?;
                self.check_expr(lhs, None)?;
                self.check_expr(index, None)?;
                Ok(ty)
            }

            NodeKind::ExpressionList(_) => {
                let exprs: Vec<NodeId> = self.ast.children(id).collect();
                let mut members = Vec::with_capacity(exprs.len());
                for expr in exprs {
                    members.push(self.check_expr(expr, None)?);
                }
                let product = self.table.add(TypeKind::Product { members }, None);
                self.type_env.insert(id, product);
                Ok(product)
            }

            NodeKind::Dontcare | NodeKind::Default => {
                let any = self.table.prims.any;
                Ok(self.commit(id, any))
            }

            _ => {
                let pt = self.potype_of(id).clone();
                self.select_from_set(id, pt.set(), required)
            }
        }
    }

    /// Select a call: the surviving `(callee, result)` candidates are
    /// filtered by the required type; the single survivor commits the
    /// callee chain and checks each argument against its parameter.
    fn check_call(
        &mut self,
        id: NodeId,
        callee: NodeId,
        args: NodeId,
        required: Option<TypeId>,
    ) -> SResult<TypeId> {
        let candidates = self.potentials.call_candidates.get(&id).cloned().unwrap_or_default();
        let surviving: Vec<(TypeId, TypeId)> = match required {
            Some(required) => candidates
                .iter()
                .copied()
                .filter(|&(_, ret)| self.table.fits(ret, required))
                .collect(),
            None => candidates,
        };
        match surviving.len() {
            0 => Err(match required {
                Some(required) => self.type_error(
                    id,
                    format!(
                        "no callee candidate yields the expected type `{}`.",
                        self.table.render(required, self.interner)
                    ),
                ),
                None => self.type_error(id, "call does not match any candidate.".to_string()),
            }),
            1 => {
                let (callee_ty, ret) = surviving[0];
                self.commit_callee(callee, callee_ty)?;
                self.check_arguments(args, callee_ty)?;
                Ok(self.commit(id, ret))
            }
            _ => {
                let callee_tys: Vec<TypeId> = surviving.iter().map(|&(f, _)| f).collect();
                Err(self.ambiguous(id, &callee_tys))
            }
        }
    }

    fn check_arguments(&mut self, args: NodeId, callee_ty: TypeId) -> SResult<()> {
        let params: Vec<TypeId> =
            match *self.table.kind(self.table.effective(callee_ty)) {
                TypeKind::Function { params, .. } => self.table.product_members(params).to_vec(),
                _ => Vec::new(),
            };
        let arg_nodes: Vec<NodeId> = self.ast.children(args).collect();
        for (index, &arg) in arg_nodes.iter().enumerate() {
            let NodeKind::Argument { arg: inner } = *self.ast.kind(arg) else {
                unreachable!("argument lists hold arguments");
            };
            let required = params.get(index).copied();
            match *self.ast.kind(inner) {
                NodeKind::Dontcare => {
                    let any = self.table.prims.any;
                    self.commit(inner, any);
                }
                _ => {
                    let ty = self.check_expr(inner, required)?;
                    self.type_env.insert(arg, ty);
                }
            }
        }
        Ok(())
    }

    /// Commit the selected callee type down the wrapper chain.
    fn commit_callee(&mut self, id: NodeId, callee_ty: TypeId) -> SResult<()> {
        match *self.ast.kind(id) {
            NodeKind::Expression { expr } | NodeKind::LvalueExpression { expr } => {
                self.type_env.insert(id, callee_ty);
                self.commit_callee(expr, callee_ty)
            }
            NodeKind::MemberSelector { lhs, name } => {
                self.check_expr(lhs, None)?;
                self.type_env.insert(id, callee_ty);
                self.type_env.insert(name, callee_ty);
                Ok(())
            }
            _ => {
                self.type_env.insert(id, callee_ty);
                Ok(())
            }
        }
    }

    /// A type reference: committed for every use, checked against the
    /// required type where one exists.
    fn check_typeref(&mut self, id: NodeId, required: Option<TypeId>) -> SResult<TypeId> {
        let ty = match self.decl_types.node_ty.get(&id) {
            Some(&ty) => ty,
            None => {
                return Err(self.type_error(id, "unresolved type reference.".to_string()));
            }
        };
        if let Some(required) = required {
            if !self.table.equiv(ty, required) {
                return Err(self.type_error(
                    id,
                    format!(
                        "expected `{}`, got `{}`.",
                        self.table.render(required, self.interner),
                        self.table.render(ty, self.interner)
                    ),
                ));
            }
        }
        // Nested references check too: a stack's element and size, a
        // tuple's type arguments.
        if let NodeKind::TypeRef { ty: inner } = *self.ast.kind(id) {
            match *self.ast.kind(inner) {
                NodeKind::HeaderStackType { ty: element, size } => {
                    self.check_typeref(element, None)?;
                    let int = self.table.prims.int;
                    self.check_expr(size, Some(int))?;
                }
                NodeKind::TupleType { type_args } => {
                    let args: Vec<NodeId> = self.ast.children(type_args).collect();
                    for arg in args {
                        if let NodeKind::TypeArg { arg } = *self.ast.kind(arg) {
                            if matches!(self.ast.kind(arg), NodeKind::TypeRef { .. }) {
                                self.check_typeref(arg, None)?;
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(self.commit(id, ty))
    }

    /// Commit a resolved name (state, action label, direct-application
    /// target) straight from its declaration's type.
    fn commit_resolved_name(&mut self, name: NodeId) -> SResult<TypeId> {
        let Some(decl) = self.decl_map.get(&name) else {
            return Err(self.type_error(name, "unresolved name.".to_string()));
        };
        let Some(&ty) = self.decl_types.decl_ty.get(decl) else {
            return Err(self.type_error(name, "name has no declared type.".to_string()));
        };
        Ok(self.commit(name, ty))
    }

    // ── Tree walk ──────────────────────────────────────────────────

    fn walk(&mut self, id: NodeId) -> SResult<()> {
        let ast = self.ast;
        let mut result = Ok(());
        ast.for_each_child(id, |child| {
            if result.is_ok() {
                result = self.visit(child);
            }
        });
        result
    }

    fn visit(&mut self, id: NodeId) -> SResult<()> {
        match *self.ast.kind(id) {
            NodeKind::VariableDeclaration { ty, init, .. } => {
                let declared = self.check_typeref(ty, None)?;
                if let Some(init) = init {
                    self.check_expr(init, Some(declared))?;
                }
                Ok(())
            }

            NodeKind::Parameter { ty, init, .. } => {
                self.check_typeref(ty, None)?;
                if let Some(init) = init {
                    self.check_expr(init, None)?;
                }
                Ok(())
            }

            NodeKind::StructField { ty, .. } => {
                self.check_typeref(ty, None)?;
                Ok(())
            }

            NodeKind::TypedefDeclaration { ty, .. } => {
                self.check_typeref(ty, None)?;
                Ok(())
            }

            NodeKind::TypeRef { .. } => {
                self.check_typeref(id, None)?;
                Ok(())
            }

            NodeKind::Instantiation { ty, args, .. } => {
                self.check_typeref(ty, None)?;
                let arg_nodes: Vec<NodeId> = self.ast.children(args).collect();
                for arg in arg_nodes {
                    let NodeKind::Argument { arg: inner } = *self.ast.kind(arg) else {
                        unreachable!("argument lists hold arguments");
                    };
                    if matches!(self.ast.kind(inner), NodeKind::Dontcare) {
                        let any = self.table.prims.any;
                        self.commit(inner, any);
                    } else {
                        self.check_expr(inner, None)?;
                    }
                }
                Ok(())
            }

            NodeKind::AssignmentStatement { .. } | NodeKind::FunctionCall { .. } => {
                self.check_expr(id, None)?;
                Ok(())
            }

            NodeKind::ConditionalStatement { cond, then_stmt, else_stmt } => {
                self.check_expr(cond, None)?;
                self.visit(then_stmt)?;
                if let Some(else_stmt) = else_stmt {
                    self.visit(else_stmt)?;
                }
                Ok(())
            }

            NodeKind::ReturnStatement { expr } => {
                if let Some(expr) = expr {
                    let required = self.current_ret.last().copied();
                    self.check_expr(expr, required)?;
                }
                Ok(())
            }

            NodeKind::FunctionDeclaration { proto, body } => {
                self.visit(proto)?;
                let ret = self.proto_ret(proto);
                self.current_ret.push(ret);
                let result = self.visit(body);
                self.current_ret.pop();
                result
            }

            NodeKind::ActionDeclaration { params, body, .. } => {
                self.walk(params)?;
                let void = self.table.prims.void;
                self.current_ret.push(void);
                let result = self.visit(body);
                self.current_ret.pop();
                result
            }

            NodeKind::SelectExpression { exprs, cases } => {
                let expr_nodes: Vec<NodeId> = self.ast.children(exprs).collect();
                let mut selected = Vec::with_capacity(expr_nodes.len());
                for expr in &expr_nodes {
                    selected.push(self.check_expr(*expr, None)?);
                }
                let case_nodes: Vec<NodeId> = self.ast.children(cases).collect();
                for case in case_nodes {
                    let NodeKind::SelectCase { keyset, name } = *self.ast.kind(case) else {
                        unreachable!("select case lists hold cases");
                    };
                    self.check_keyset(keyset, &selected)?;
                    self.commit_resolved_name(name)?;
                }
                Ok(())
            }

            NodeKind::StateExpression { expr } => match self.ast.kind(expr) {
                NodeKind::Name { .. } => {
                    self.commit_resolved_name(expr)?;
                    Ok(())
                }
                _ => self.visit(expr),
            },

            NodeKind::KeyElement { expr, match_kind } => {
                self.check_expr(expr, None)?;
                let sym = self.ast.name_of(match_kind);
                let TypeKind::MatchKind { fields } = *self.table.kind(self.table.prims.match_kind)
                else {
                    unreachable!("match_kind prim is a member list");
                };
                if self.table.find_member(fields, sym).is_empty() {
                    return Err(self.type_error(
                        match_kind,
                        format!("unknown match kind `{}`.", self.interner.resolve(sym)),
                    ));
                }
                let mk = self.table.prims.match_kind;
                self.commit(match_kind, mk);
                Ok(())
            }

            NodeKind::ActionRef { name, args } => {
                let pt = self.potype_of(name).clone();
                let selected = self.select_from_set(name, pt.set(), None)?;
                self.type_env.insert(id, selected);
                if let Some(args) = args {
                    self.check_arguments(args, selected)?;
                }
                Ok(())
            }

            NodeKind::SwitchLabel { label } => {
                if matches!(self.ast.kind(label), NodeKind::Name { .. }) {
                    self.commit_resolved_name(label)?;
                }
                Ok(())
            }

            NodeKind::SwitchStatement { expr, cases } => {
                self.check_expr(expr, None)?;
                self.walk(cases)
            }

            NodeKind::DirectApplication { name, args } => {
                match self.ast.kind(name) {
                    NodeKind::Name { .. } => {
                        self.commit_resolved_name(name)?;
                    }
                    _ => {
                        self.check_typeref(name, None)?;
                    }
                }
                let arg_nodes: Vec<NodeId> = self.ast.children(args).collect();
                for arg in arg_nodes {
                    let NodeKind::Argument { arg: inner } = *self.ast.kind(arg) else {
                        unreachable!("argument lists hold arguments");
                    };
                    if matches!(self.ast.kind(inner), NodeKind::Dontcare) {
                        let any = self.table.prims.any;
                        self.commit(inner, any);
                    } else {
                        self.check_expr(inner, None)?;
                    }
                }
                Ok(())
            }

            NodeKind::SpecifiedIdentifier { init, .. } => {
                if let Some(init) = init {
                    self.check_expr(init, None)?;
                }
                Ok(())
            }

            NodeKind::TableProperty { prop } => match *self.ast.kind(prop) {
                // The `entries` and `simple` table properties are
                // parsed and bound but not type-checked; this mirrors
                // the disabled handling in the canonical sources.
                NodeKind::EntriesProperty { .. } | NodeKind::SimpleProperty { .. } => Ok(()),
                _ => self.visit(prop),
            },

            NodeKind::Expression { .. } | NodeKind::LvalueExpression { .. } => {
                self.check_expr(id, None)?;
                Ok(())
            }

            _ => self.walk(id),
        }
    }

    fn check_keyset(&mut self, keyset: NodeId, selected: &[TypeId]) -> SResult<()> {
        match *self.ast.kind(keyset) {
            NodeKind::KeysetExpression { expr } => self.check_keyset(expr, selected),
            NodeKind::TupleKeysetExpression { exprs } => {
                let members: Vec<NodeId> = self.ast.children(exprs).collect();
                if members.len() != selected.len() {
                    return Err(self.type_error(
                        keyset,
                        format!(
                            "keyset arity is {}, select arity is {}.",
                            members.len(),
                            selected.len()
                        ),
                    ));
                }
                for (member, &required) in members.iter().zip(selected.iter()) {
                    self.check_keyset(*member, &[required])?;
                }
                Ok(())
            }
            NodeKind::SimpleKeysetExpression { expr } => match *self.ast.kind(expr) {
                NodeKind::Dontcare | NodeKind::Default => {
                    let any = self.table.prims.any;
                    self.commit(expr, any);
                    Ok(())
                }
                _ => {
                    if selected.len() != 1 {
                        return Err(self.type_error(
                            keyset,
                            format!("keyset arity is 1, select arity is {}.", selected.len()),
                        ));
                    }
                    self.check_expr(expr, Some(selected[0]))?;
                    Ok(())
                }
            },
            ref other => unreachable!("not a keyset: {other:?}"),
        }
    }

    fn proto_ret(&mut self, proto: NodeId) -> TypeId {
        let mut node = proto;
        // The prototype may be reached through wrappers.
        loop {
            match *self.ast.kind(node) {
                NodeKind::FunctionPrototype { return_ty, .. } => {
                    return match return_ty {
                        Some(ty) => self
                            .decl_types
                            .node_ty
                            .get(&ty)
                            .copied()
                            .unwrap_or(self.table.prims.void),
                        None => self.table.prims.void,
                    };
                }
                NodeKind::TypeDeclaration { decl } | NodeKind::Declaration { decl } => node = decl,
                _ => return self.table.prims.void,
            }
        }
    }
}
