//! Shared harness for the semantic-analysis tests.
#![allow(dead_code)]

use p4_arena::MemoryPool;
use p4_common::{Diagnostic, Interner, SourceText};
use p4_parser::ast::{NodeId, NodeKind};
use p4_parser::Parse;
use p4_typeck::Analysis;

#[derive(Debug)]
pub struct Front {
    pub parse: Parse,
    pub analysis: Analysis,
    pub interner: Interner,
}

/// Run the whole front end over a source snippet.
pub fn front(text: &str) -> Result<Front, Diagnostic> {
    let pool = MemoryPool::reserve(32 << 20);
    let mut interner = Interner::new(pool);
    let src = SourceText::new("test.p4", text);
    let tokens = p4_lexer::tokenize(&src, false)?;
    let parse = p4_parser::parse(&src, &tokens, &mut interner)?;
    let analysis = p4_typeck::analyze(&src, &parse, &mut interner)?;
    Ok(Front { parse, analysis, interner })
}

pub fn front_ok(text: &str) -> Front {
    match front(text) {
        Ok(front) => front,
        Err(diag) => panic!("front end failed: {diag}"),
    }
}

/// Every node of the tree, preorder.
pub fn all_nodes(parse: &Parse) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![parse.root];
    while let Some(id) = stack.pop() {
        out.push(id);
        let mut kids = Vec::new();
        parse.ast.for_each_child(id, |c| kids.push(c));
        // push in reverse to keep source order on the stack
        for c in kids.into_iter().rev() {
            stack.push(c);
        }
    }
    out
}

pub fn find_nodes(parse: &Parse, pred: impl Fn(&NodeKind) -> bool) -> Vec<NodeId> {
    all_nodes(parse).into_iter().filter(|&id| pred(parse.ast.kind(id))).collect()
}

pub fn first_node(parse: &Parse, pred: impl Fn(&NodeKind) -> bool) -> NodeId {
    *find_nodes(parse, pred).first().expect("a matching node exists")
}
