//! Nested scopes, namespaces, and the declaration table.
//!
//! A scope maps identifiers to a [`NameEntry`] holding one
//! newest-first declaration chain per namespace, so P4 can give the
//! same identifier to a variable and a type, and externs can overload
//! method names. The root scope is preloaded with the builtin type
//! names, the builtin `accept`/`reject` states, and the keyword set
//! (each keyword binding carries the token class the parser's cursor
//! retags identifiers to).

use p4_common::{keywords, Interner, Symbol, TokenKind};
use rustc_hash::FxHashMap;

use crate::ast::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Namespace {
    Var = 0,
    Type = 1,
    Keyword = 2,
}

/// All namespaces, in resolution order.
pub const ALL_NAMESPACES: [Namespace; 3] = [Namespace::Var, Namespace::Type, Namespace::Keyword];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeclId(u32);

impl DeclId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Per-identifier record: the head of the declaration chain in each
/// namespace, newest first.
#[derive(Clone, Copy, Debug, Default)]
pub struct NameEntry {
    ns: [Option<DeclId>; 3],
}

impl NameEntry {
    pub fn head(&self, ns: Namespace) -> Option<DeclId> {
        self.ns[ns as usize]
    }

    pub fn has_any(&self, mask: &[Namespace]) -> bool {
        mask.iter().any(|&ns| self.ns[ns as usize].is_some())
    }
}

#[derive(Clone, Debug)]
pub struct NameDeclaration {
    pub name: Symbol,
    pub ns: Namespace,
    /// The declaring AST node; `None` for preloaded builtins.
    pub ast: Option<NodeId>,
    /// Token class to retag to; set only for Keyword bindings.
    pub token_class: Option<TokenKind>,
    /// Older declaration of the same name in the same scope and
    /// namespace (overloads), newest first.
    pub next_in_scope: Option<DeclId>,
}

#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub level: u32,
    table: FxHashMap<Symbol, NameEntry>,
}

/// The scope tree plus the declaration store.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    decls: Vec<NameDeclaration>,
    pub root: ScopeId,
}

impl ScopeTree {
    /// An empty tree with just a root scope.
    pub fn new() -> ScopeTree {
        let root = Scope { parent: None, level: 0, table: FxHashMap::default() };
        ScopeTree { scopes: vec![root], decls: Vec::new(), root: ScopeId(0) }
    }

    /// A tree whose root carries the builtin names: the builtin type
    /// set, the `accept`/`reject` states, and every keyword with its
    /// token class.
    pub fn with_builtins(interner: &mut Interner) -> ScopeTree {
        let mut tree = ScopeTree::new();
        let root = tree.root;
        for name in ["void", "bool", "int", "bit", "varbit", "string", "error", "match_kind", "_"] {
            let sym = interner.intern(name);
            tree.bind(root, sym, Namespace::Type, None);
        }
        for name in ["accept", "reject"] {
            let sym = interner.intern(name);
            tree.bind(root, sym, Namespace::Var, None);
        }
        for &(kw, class) in keywords() {
            let sym = interner.intern(kw);
            let decl = tree.bind(root, sym, Namespace::Keyword, None);
            tree.decls[decl.index()].token_class = Some(class);
        }
        tree
    }

    pub fn new_scope(&mut self, parent: ScopeId) -> ScopeId {
        let level = self.scopes[parent.index()].level + 1;
        self.scopes.push(Scope { parent: Some(parent), level, table: FxHashMap::default() });
        ScopeId(self.scopes.len() as u32 - 1)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scopes[id.index()].parent
    }

    pub fn decl(&self, id: DeclId) -> &NameDeclaration {
        &self.decls[id.index()]
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Bind `name` in `scope` under `ns`, chaining in front of any
    /// previous binding of the same name and namespace.
    pub fn bind(&mut self, scope: ScopeId, name: Symbol, ns: Namespace, ast: Option<NodeId>) -> DeclId {
        let decl = DeclId(self.decls.len() as u32);
        let entry = self.scopes[scope.index()].table.entry(name).or_default();
        let shadowed = entry.ns[ns as usize];
        entry.ns[ns as usize] = Some(decl);
        self.decls.push(NameDeclaration {
            name,
            ns,
            ast,
            token_class: None,
            next_in_scope: shadowed,
        });
        decl
    }

    /// The entry for `name` in `scope` itself, not its ancestors.
    pub fn local_entry(&self, scope: ScopeId, name: Symbol) -> Option<&NameEntry> {
        self.scopes[scope.index()].table.get(&name)
    }

    /// Walk the scope chain for the nearest entry of `name` populated
    /// in any of the requested namespaces. Returns the entry and the
    /// scope it was found in.
    pub fn lookup(
        &self,
        scope: ScopeId,
        name: Symbol,
        mask: &[Namespace],
    ) -> Option<(&NameEntry, ScopeId)> {
        let mut cur = Some(scope);
        while let Some(s) = cur {
            if let Some(entry) = self.scopes[s.index()].table.get(&name) {
                if entry.has_any(mask) {
                    return Some((entry, s));
                }
            }
            cur = self.scopes[s.index()].parent;
        }
        None
    }

    /// Walk the scope chain for the nearest entry of `name`, populated
    /// or not in any particular namespace. This is the lookup the
    /// parser's token cursor uses for retagging.
    pub fn lookup_any(&self, scope: ScopeId, name: Symbol) -> Option<&NameEntry> {
        let mut cur = Some(scope);
        while let Some(s) = cur {
            if let Some(entry) = self.scopes[s.index()].table.get(&name) {
                return Some(entry);
            }
            cur = self.scopes[s.index()].parent;
        }
        None
    }

    /// Resolve a use to its newest visible declaration, trying the
    /// mask's namespaces in order at the nearest populated entry.
    pub fn resolve(&self, scope: ScopeId, name: Symbol, mask: &[Namespace]) -> Option<DeclId> {
        let (entry, _) = self.lookup(scope, name, mask)?;
        mask.iter().find_map(|&ns| entry.head(ns))
    }

    /// The declarations of `name` visible from `scope` in `ns`: the
    /// whole chain of the nearest scope that binds the name, newest
    /// first. Inner bindings shadow outer ones; the chain within one
    /// scope is the overload set a name expression can mean.
    pub fn visible_decls(&self, scope: ScopeId, name: Symbol, ns: Namespace) -> Vec<DeclId> {
        let mut out = Vec::new();
        let mut cur = Some(scope);
        while let Some(s) = cur {
            if let Some(entry) = self.scopes[s.index()].table.get(&name) {
                let mut head = entry.head(ns);
                while let Some(d) = head {
                    out.push(d);
                    head = self.decls[d.index()].next_in_scope;
                }
                if !out.is_empty() {
                    return out;
                }
            }
            cur = self.scopes[s.index()].parent;
        }
        out
    }

    /// All scopes in creation order.
    pub fn scope_ids(&self) -> impl Iterator<Item = ScopeId> + '_ {
        (0..self.scopes.len()).map(|i| ScopeId(i as u32))
    }

    /// Names bound directly in `scope`, for scope-shape comparisons.
    pub fn local_names(&self, scope: ScopeId) -> Vec<Symbol> {
        let mut names: Vec<Symbol> = self.scopes[scope.index()].table.keys().copied().collect();
        names.sort();
        names
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        ScopeTree::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p4_arena::MemoryPool;

    fn interner() -> Interner {
        Interner::new(MemoryPool::reserve(1 << 20))
    }

    #[test]
    fn builtins_are_preloaded() {
        let mut i = interner();
        let tree = ScopeTree::with_builtins(&mut i);
        let bit = i.intern("bit");
        let accept = i.intern("accept");
        assert!(tree.resolve(tree.root, bit, &[Namespace::Type]).is_some());
        assert!(tree.resolve(tree.root, accept, &[Namespace::Var]).is_some());
        // `bit` is both a keyword and a builtin type name.
        let entry = tree.local_entry(tree.root, bit).unwrap();
        assert!(entry.head(Namespace::Keyword).is_some());
        assert!(entry.head(Namespace::Type).is_some());
    }

    #[test]
    fn keyword_bindings_carry_token_class() {
        let mut i = interner();
        let tree = ScopeTree::with_builtins(&mut i);
        let header = i.intern("header");
        let decl = tree.resolve(tree.root, header, &[Namespace::Keyword]).unwrap();
        assert_eq!(tree.decl(decl).token_class, Some(TokenKind::Header));
    }

    #[test]
    fn resolution_walks_the_parent_chain() {
        let mut i = interner();
        let mut tree = ScopeTree::new();
        let name = i.intern("H");
        let outer = tree.new_scope(tree.root);
        let inner = tree.new_scope(outer);
        let d = tree.bind(outer, name, Namespace::Type, None);
        assert_eq!(tree.resolve(inner, name, &[Namespace::Type]), Some(d));
        assert_eq!(tree.resolve(tree.root, name, &[Namespace::Type]), None);
    }

    #[test]
    fn namespaces_are_independent() {
        let mut i = interner();
        let mut tree = ScopeTree::new();
        let name = i.intern("x");
        let s = tree.new_scope(tree.root);
        let ty = tree.bind(s, name, Namespace::Type, None);
        let var = tree.bind(s, name, Namespace::Var, None);
        assert_eq!(tree.resolve(s, name, &[Namespace::Type]), Some(ty));
        assert_eq!(tree.resolve(s, name, &[Namespace::Var]), Some(var));
    }

    #[test]
    fn rebinding_chains_newest_first() {
        let mut i = interner();
        let mut tree = ScopeTree::new();
        let name = i.intern("m");
        let s = tree.new_scope(tree.root);
        let older = tree.bind(s, name, Namespace::Var, None);
        let newer = tree.bind(s, name, Namespace::Var, None);
        assert_eq!(tree.resolve(s, name, &[Namespace::Var]), Some(newer));
        assert_eq!(tree.decl(newer).next_in_scope, Some(older));
        assert_eq!(tree.visible_decls(s, name, Namespace::Var), vec![newer, older]);
    }

    #[test]
    fn scope_levels_nest_strictly() {
        let mut tree = ScopeTree::new();
        let a = tree.new_scope(tree.root);
        let b = tree.new_scope(a);
        assert_eq!(tree.scope(tree.root).level, 0);
        assert_eq!(tree.scope(a).level, 1);
        assert_eq!(tree.scope(b).level, 2);
        assert_eq!(tree.parent(b), Some(a));
    }
}
