//! Semantic analysis for the P4 front end.
//!
//! Four passes run to completion over the full tree, in order:
//!
//! 1. [`scope_hierarchy`] builds the scope tree and `scope_map`;
//! 2. [`name_bind`] binds declarations, records name-site scopes, and
//!    resolves uses into `decl_map`;
//! 3. declared types are constructed, then [`potential_types`]
//!    annotates every expression with its candidate set;
//! 4. [`select_types`] collapses each set to one member and commits
//!    the result to `type_env`.
//!
//! Each annotation map is written by exactly one pass and read by the
//! later ones; the passes only annotate, never rebuild the tree. The
//! first error of any pass terminates the front end.

pub mod builtins;
pub mod name_bind;
pub mod potential;
pub mod scope_hierarchy;
pub mod select;
pub mod type_build;
pub mod types;

use p4_common::{Diagnostic, Interner, SourceText};
use p4_parser::ast::NodeId;
use p4_parser::scope::{DeclId, ScopeId, ScopeTree};
use p4_parser::Parse;
use rustc_hash::FxHashMap;

pub use potential::PotentialType;
pub use types::{TypeId, TypeKind, TypeTable};

/// Everything the front end hands to a back end: the scope tree and
/// the annotation maps produced by the passes, plus the type table
/// that owns every type.
#[derive(Debug)]
pub struct Analysis {
    pub scopes: ScopeTree,
    pub scope_map: FxHashMap<NodeId, ScopeId>,
    pub decl_map: FxHashMap<NodeId, DeclId>,
    pub types: TypeTable,
    pub decl_ty: FxHashMap<DeclId, TypeId>,
    pub node_ty: FxHashMap<NodeId, TypeId>,
    pub potype: FxHashMap<NodeId, PotentialType>,
    pub type_env: FxHashMap<NodeId, TypeId>,
}

/// Run all semantic passes over a parsed program.
pub fn analyze(
    src: &SourceText<'_>,
    parse: &Parse,
    interner: &mut Interner,
) -> Result<Analysis, Diagnostic> {
    let mut hierarchy = scope_hierarchy::scope_hierarchy(&parse.ast, parse.root, interner);
    let decl_map = name_bind::name_bind(src, &parse.ast, parse.root, &mut hierarchy, interner)?;

    let mut table = TypeTable::new();
    let decl_types =
        type_build::build_types(&parse.ast, parse.root, &hierarchy, &decl_map, interner, &mut table);
    let potentials = potential::potential_types(
        &parse.ast,
        parse.root,
        &hierarchy,
        &decl_map,
        &decl_types,
        &mut table,
        interner,
    );
    let type_env = select::select_types(
        src,
        &parse.ast,
        parse.root,
        &decl_map,
        &decl_types,
        &potentials,
        &mut table,
        interner,
    )?;

    Ok(Analysis {
        scopes: hierarchy.scopes,
        scope_map: hierarchy.scope_map,
        decl_map,
        types: table,
        decl_ty: decl_types.decl_ty,
        node_ty: decl_types.node_ty,
        potype: potentials.potype,
        type_env,
    })
}
