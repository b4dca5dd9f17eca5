//! Type representation.
//!
//! All types live in an append-only table and are referred to by
//! `TypeId`. Nominal types (struct, header, union, enum, extern,
//! parser, control, package, table) are equivalent only by identity;
//! the width-parameterless primitives are equivalent by kind; products
//! compare pointwise. A `Nameref` is a deferred binding to a declared
//! name, resolved to its concrete type after all declarations have
//! been built; `actual_type` walks those links and `effective_type`
//! additionally unwraps typedefs. Everything downstream of the two
//! helpers assumes effective types.

use p4_arena::SegVec;
use p4_common::{Interner, Symbol};
use p4_parser::ast::NodeId;
use rustc_hash::FxHashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
pub enum TypeKind {
    Void,
    Bool,
    Int { width: Option<u32> },
    Bit { width: u32 },
    Varbit { width: u32 },
    String,
    /// The don't-care type, equivalent to everything.
    Any,
    /// The builtin `error` and `match_kind` enums; their member lists
    /// are extended by the corresponding declarations.
    Error { fields: TypeId },
    MatchKind { fields: TypeId },
    /// A parser state.
    State,
    Enum { fields: TypeId },
    Typedef { aliased: TypeId },
    Function { params: TypeId, ret: TypeId },
    Extern { methods: TypeId },
    Package { params: TypeId },
    Parser { params: TypeId, methods: TypeId },
    Control { params: TypeId, methods: TypeId },
    Table { methods: TypeId },
    Struct { fields: TypeId },
    Header { fields: TypeId },
    Union { fields: TypeId },
    Stack { element: TypeId, size: u64 },
    /// A named member of a product: struct field, enum member, method.
    Field { ty: TypeId },
    /// Deferred reference to a declared type name.
    Nameref { node: NodeId },
    /// A type used as a value (a type name in expression position).
    Type { wrapped: TypeId },
    Tuple { elements: TypeId },
    /// Fixed-arity member list for parameters, tuples, and fields.
    Product { members: Vec<TypeId> },
}

#[derive(Clone, Debug)]
pub struct Type {
    pub kind: TypeKind,
    /// Name of a nominal type or product member.
    pub name: Option<Symbol>,
}

/// Preallocated singletons for the width-parameterless builtins.
#[derive(Clone, Copy, Debug)]
pub struct Prims {
    pub void: TypeId,
    pub bool_: TypeId,
    pub int: TypeId,
    pub string: TypeId,
    pub any: TypeId,
    pub state: TypeId,
    pub error: TypeId,
    pub match_kind: TypeId,
}

/// The append-only type table.
#[derive(Debug)]
pub struct TypeTable {
    types: SegVec<Type>,
    nameref_targets: FxHashMap<TypeId, TypeId>,
    bit_cache: FxHashMap<u32, TypeId>,
    pub prims: Prims,
}

impl TypeTable {
    pub fn new() -> TypeTable {
        let mut types = SegVec::new();
        let mut add = |kind: TypeKind| {
            let index = types.push(Type { kind, name: None });
            TypeId(index as u32)
        };
        let void = add(TypeKind::Void);
        let bool_ = add(TypeKind::Bool);
        let int = add(TypeKind::Int { width: None });
        let string = add(TypeKind::String);
        let any = add(TypeKind::Any);
        let state = add(TypeKind::State);
        let error_fields = add(TypeKind::Product { members: Vec::new() });
        let error = add(TypeKind::Error { fields: error_fields });
        let mk_fields = add(TypeKind::Product { members: Vec::new() });
        let match_kind = add(TypeKind::MatchKind { fields: mk_fields });
        TypeTable {
            types,
            nameref_targets: FxHashMap::default(),
            bit_cache: FxHashMap::default(),
            prims: Prims { void, bool_, int, string, any, state, error, match_kind },
        }
    }

    pub fn add(&mut self, kind: TypeKind, name: Option<Symbol>) -> TypeId {
        let index = self.types.push(Type { kind, name });
        TypeId(index as u32)
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.types[id.index()].kind
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Replace a placeholder kind during declared-type construction.
    /// Only the type builder uses this, for self-referential shapes
    /// (an enum's members have the enum itself as their type).
    pub fn patch(&mut self, id: TypeId, kind: TypeKind) {
        self.types[id.index()].kind = kind;
    }

    /// Append a member to a product; used when `error` and
    /// `match_kind` declarations extend the global member lists.
    pub fn push_member(&mut self, product: TypeId, member: TypeId) {
        match &mut self.types[product.index()].kind {
            TypeKind::Product { members } => members.push(member),
            other => panic!("push_member on non-product type {other:?}"),
        }
    }

    pub fn product_members(&self, product: TypeId) -> &[TypeId] {
        match self.kind(product) {
            TypeKind::Product { members } => members,
            other => panic!("expected a product type, got {other:?}"),
        }
    }

    pub fn bit(&mut self, width: u32) -> TypeId {
        if let Some(&id) = self.bit_cache.get(&width) {
            return id;
        }
        let id = self.add(TypeKind::Bit { width }, None);
        self.bit_cache.insert(width, id);
        id
    }

    /// Record where a nameref points once its declaration is known.
    pub fn resolve_nameref(&mut self, nameref: TypeId, target: TypeId) {
        debug_assert!(matches!(self.kind(nameref), TypeKind::Nameref { .. }));
        self.nameref_targets.insert(nameref, target);
    }

    /// Walk nameref links to the concrete type they refer to.
    pub fn actual(&self, id: TypeId) -> TypeId {
        let mut cur = id;
        while let TypeKind::Nameref { .. } = self.kind(cur) {
            match self.nameref_targets.get(&cur) {
                Some(&target) => cur = target,
                None => break,
            }
        }
        cur
    }

    /// `actual`, then unwrap typedef indirections.
    pub fn effective(&self, id: TypeId) -> TypeId {
        let mut cur = self.actual(id);
        while let TypeKind::Typedef { aliased } = *self.kind(cur) {
            cur = self.actual(aliased);
        }
        cur
    }

    /// Structural equivalence on effective types. Nominal types are
    /// equivalent only by identity; `Any` is equivalent to everything.
    pub fn equiv(&self, a: TypeId, b: TypeId) -> bool {
        let a = self.effective(a);
        let b = self.effective(b);
        if a == b {
            return true;
        }
        use TypeKind::*;
        match (self.kind(a), self.kind(b)) {
            (Any, _) | (_, Any) => true,
            (Void, Void) | (Bool, Bool) | (String, String) | (State, State) => true,
            (Int { width: wa }, Int { width: wb }) => wa == wb,
            (Bit { width: wa }, Bit { width: wb }) => wa == wb,
            (Varbit { width: wa }, Varbit { width: wb }) => wa == wb,
            (Product { members: ma }, Product { members: mb }) => {
                ma.len() == mb.len()
                    && ma.iter().zip(mb.iter()).all(|(&x, &y)| self.equiv(x, y))
            }
            (Tuple { elements: ea }, Tuple { elements: eb }) => self.equiv(*ea, *eb),
            (Stack { element: ea, size: sa }, Stack { element: eb, size: sb }) => {
                sa == sb && self.equiv(*ea, *eb)
            }
            (Function { params: pa, ret: ra }, Function { params: pb, ret: rb }) => {
                self.equiv(*ra, *rb) && self.equiv(*pa, *pb)
            }
            (Field { ty: ta }, Field { ty: tb }) => {
                self.get(a).name == self.get(b).name && self.equiv(*ta, *tb)
            }
            (Type { wrapped: wa }, Type { wrapped: wb }) => self.equiv(*wa, *wb),
            _ => false,
        }
    }

    /// Whether a candidate type satisfies a required type: structural
    /// equivalence, or an unsized integer literal adapting to a
    /// fixed-width numeric context.
    pub fn fits(&self, candidate: TypeId, required: TypeId) -> bool {
        if self.equiv(candidate, required) {
            return true;
        }
        let c = self.effective(candidate);
        let r = self.effective(required);
        matches!(self.kind(c), TypeKind::Int { width: None })
            && matches!(self.kind(r), TypeKind::Bit { .. } | TypeKind::Int { width: Some(_) })
    }

    /// Find a named member in a product of fields.
    pub fn find_member(&self, product: TypeId, name: Symbol) -> Vec<TypeId> {
        self.product_members(product)
            .iter()
            .copied()
            .filter(|&m| self.get(m).name == Some(name))
            .collect()
    }

    /// Human-readable rendering for diagnostics.
    pub fn render(&self, id: TypeId, interner: &Interner) -> String {
        use TypeKind::*;
        let named = |name: Option<Symbol>, what: &str| match name {
            Some(sym) => interner.resolve(sym).to_string(),
            None => what.to_string(),
        };
        match self.kind(id) {
            Void => "void".to_string(),
            Bool => "bool".to_string(),
            Int { width: None } => "int".to_string(),
            Int { width: Some(w) } => format!("int<{w}>"),
            Bit { width } => format!("bit<{width}>"),
            Varbit { width } => format!("varbit<{width}>"),
            String => "string".to_string(),
            Any => "_".to_string(),
            Error { .. } => "error".to_string(),
            MatchKind { .. } => "match_kind".to_string(),
            State => "state".to_string(),
            Enum { .. } => named(self.get(id).name, "enum"),
            Typedef { aliased } => self.render(*aliased, interner),
            Function { params, ret } => format!(
                "{} -> {}",
                self.render(*params, interner),
                self.render(*ret, interner)
            ),
            Extern { .. } => named(self.get(id).name, "extern"),
            Package { .. } => named(self.get(id).name, "package"),
            Parser { .. } => named(self.get(id).name, "parser"),
            Control { .. } => named(self.get(id).name, "control"),
            Table { .. } => named(self.get(id).name, "table"),
            Struct { .. } => named(self.get(id).name, "struct"),
            Header { .. } => named(self.get(id).name, "header"),
            Union { .. } => named(self.get(id).name, "header_union"),
            Stack { element, size } => format!("{}[{size}]", self.render(*element, interner)),
            Field { ty } => self.render(*ty, interner),
            Nameref { .. } => {
                let target = self.actual(id);
                if target == id {
                    named(self.get(id).name, "<unresolved>")
                } else {
                    self.render(target, interner)
                }
            }
            Type { wrapped } => self.render(*wrapped, interner),
            Tuple { elements } => format!("tuple{}", self.render(*elements, interner)),
            Product { members } => {
                let inner: Vec<std::string::String> =
                    members.iter().map(|&m| self.render(m, interner)).collect();
                format!("({})", inner.join(", "))
            }
        }
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        TypeTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_equivalent_by_kind() {
        let table = TypeTable::new();
        assert!(table.equiv(table.prims.bool_, table.prims.bool_));
        assert!(!table.equiv(table.prims.bool_, table.prims.int));
    }

    #[test]
    fn bit_widths_must_match() {
        let mut table = TypeTable::new();
        let b8 = table.bit(8);
        let b8_again = table.bit(8);
        let b16 = table.bit(16);
        assert_eq!(b8, b8_again);
        assert!(table.equiv(b8, b8_again));
        assert!(!table.equiv(b8, b16));
    }

    #[test]
    fn any_is_equivalent_to_everything() {
        let mut table = TypeTable::new();
        let b8 = table.bit(8);
        assert!(table.equiv(table.prims.any, b8));
        assert!(table.equiv(b8, table.prims.any));
    }

    #[test]
    fn products_compare_pointwise_in_order() {
        let mut table = TypeTable::new();
        let b8 = table.bit(8);
        let p1 = table.add(TypeKind::Product { members: vec![b8, table.prims.bool_] }, None);
        let p2 = table.add(TypeKind::Product { members: vec![b8, table.prims.bool_] }, None);
        let p3 = table.add(TypeKind::Product { members: vec![table.prims.bool_, b8] }, None);
        assert!(table.equiv(p1, p2));
        assert!(!table.equiv(p1, p3));
    }

    #[test]
    fn named_types_are_nominal() {
        let mut table = TypeTable::new();
        let fields = table.add(TypeKind::Product { members: vec![] }, None);
        let h1 = table.add(TypeKind::Header { fields }, None);
        let h2 = table.add(TypeKind::Header { fields }, None);
        assert!(table.equiv(h1, h1));
        assert!(!table.equiv(h1, h2));
    }

    #[test]
    fn typedef_unwraps_to_aliased_type() {
        let mut table = TypeTable::new();
        let b8 = table.bit(8);
        let alias = table.add(TypeKind::Typedef { aliased: b8 }, None);
        assert_eq!(table.effective(alias), b8);
        assert!(table.equiv(alias, b8));
    }

    #[test]
    fn function_types_compare_by_signature() {
        let mut table = TypeTable::new();
        let b8 = table.bit(8);
        let params1 = table.add(TypeKind::Product { members: vec![b8] }, None);
        let params2 = table.add(TypeKind::Product { members: vec![b8] }, None);
        let params3 = table.add(TypeKind::Product { members: vec![] }, None);
        let void = table.prims.void;
        let f1 = table.add(TypeKind::Function { params: params1, ret: void }, None);
        let f2 = table.add(TypeKind::Function { params: params2, ret: void }, None);
        let f3 = table.add(TypeKind::Function { params: params3, ret: void }, None);
        assert!(table.equiv(f1, f2));
        assert!(!table.equiv(f1, f3));
    }
}
