//! Identifier interning backed by the page arena.
//!
//! Interned bytes live in an [`Arena`] owned by the interner, so every
//! compile exercises the allocator and name comparisons reduce to
//! `Symbol` equality.

use std::rc::Rc;

use p4_arena::{Arena, MemoryPool};
use rustc_hash::FxHashMap;

/// Handle to an interned string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub struct Interner {
    // The map keys and the table entries point into `arena`'s pages;
    // the arena is never freed before the interner is dropped.
    map: FxHashMap<&'static str, Symbol>,
    strings: Vec<&'static str>,
    arena: Arena,
}

impl Interner {
    pub fn new(pool: Rc<MemoryPool>) -> Interner {
        Interner { map: FxHashMap::default(), strings: Vec::new(), arena: Arena::new(pool) }
    }

    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.map.get(s) {
            return sym;
        }
        let stored = self.arena.alloc_str(s);
        // Lifetime extension is sound: the backing pages stay mapped
        // read-write until `self.arena` drops, and `resolve` reborrows
        // at `&self`.
        let stored: &'static str = unsafe { std::mem::transmute::<&str, &'static str>(stored) };
        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(stored);
        self.map.insert(stored, sym);
        sym
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        self.strings[sym.index()]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interner() -> Interner {
        Interner::new(MemoryPool::reserve(1 << 20))
    }

    #[test]
    fn intern_is_idempotent() {
        let mut i = interner();
        let a = i.intern("ethernet");
        let b = i.intern("ethernet");
        let c = i.intern("ipv4");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(i.len(), 2);
    }

    #[test]
    fn resolve_round_trips() {
        let mut i = interner();
        let owned = String::from("parse_ethernet");
        let sym = i.intern(&owned);
        drop(owned);
        assert_eq!(i.resolve(sym), "parse_ethernet");
    }

    #[test]
    fn many_symbols_survive_arena_growth() {
        let mut i = interner();
        let syms: Vec<Symbol> = (0..5000).map(|n| i.intern(&format!("name_{n}"))).collect();
        for (n, sym) in syms.iter().enumerate() {
            assert_eq!(i.resolve(*sym), format!("name_{n}"));
        }
    }
}
