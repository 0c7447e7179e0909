//! String interning for identifiers and lexemes.
//!
//! The lexer interns every identifier, keyword lexeme, and literal text it
//! produces; tokens and AST nodes then carry [`Symbol`] handles instead of
//! owned strings. Scope lookups and name comparisons become integer
//! comparisons, and the AST stays `Copy`-friendly for arena allocation.
//!
//! Symbols are resolved back to text at the IR boundary, where the compiler
//! switches to owned, serializable data.

use rustc_hash::FxHashMap;

/// A lightweight handle to an interned string.
///
/// `Copy`, `Eq`, and `Hash` in O(1) regardless of string length. Resolve via
/// [`Interner::resolve`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Symbol(u32);

impl Symbol {
    /// The empty string, always interned at index 0.
    pub const EMPTY: Symbol = Symbol(0);

    /// Internal index, useful for dense side tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for Symbol {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Stores each unique string exactly once and hands out [`Symbol`]s.
pub struct Interner {
    map: FxHashMap<String, Symbol>,
    strings: Vec<String>,
}

impl Interner {
    /// Creates an interner with only the empty string pre-interned.
    pub fn new() -> Self {
        Interner {
            map: FxHashMap::default(),
            strings: vec![String::new()],
        }
    }

    /// Interns `s`, returning the existing symbol if already present.
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.map.get(s) {
            return sym;
        }
        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.map.insert(s.to_string(), sym);
        sym
    }

    /// Returns the string for `sym`.
    ///
    /// # Panics
    ///
    /// Panics if `sym` was not created by this interner.
    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.strings[sym.0 as usize]
    }

    /// Looks up an existing entry without interning.
    pub fn lookup(&self, s: &str) -> Option<Symbol> {
        self.map.get(s).copied()
    }

    /// Number of interned strings, counting the pre-interned empty string.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// `true` when nothing beyond the empty string has been interned.
    pub fn is_empty(&self) -> bool {
        self.strings.len() <= 1
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}
