//! Scope stack and symbol records for semantic analysis.
//!
//! Scopes form a stack mirroring the block structure under analysis: module
//! root, function scopes, `if`-branch scopes, loop-body scopes. Lookups walk
//! the chain outward; bindings always land in the innermost scope, so
//! branch-local assignments are never exported. The stack unwinds as block
//! analysis ends.

use crate::types::SemType;
use icl_base::{Span, Symbol};
use rustc_hash::FxHashMap;

/// What a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
    Builtin,
}

/// One symbol-table record.
#[derive(Debug, Clone)]
pub struct SymbolInfo {
    pub kind: SymbolKind,
    pub ty: SemType,
    /// Parameter count, for callables.
    pub arity: Option<usize>,
    /// Declared (or defaulted) return type, for callables.
    pub ret: Option<SemType>,
    pub span: Option<Span>,
}

impl SymbolInfo {
    pub fn variable(ty: SemType, span: Span) -> Self {
        SymbolInfo {
            kind: SymbolKind::Variable,
            ty,
            arity: None,
            ret: None,
            span: Some(span),
        }
    }

    pub fn parameter(ty: SemType, span: Span) -> Self {
        SymbolInfo {
            kind: SymbolKind::Parameter,
            ty,
            arity: None,
            ret: None,
            span: Some(span),
        }
    }

    pub fn function(arity: usize, ret: SemType, span: Span) -> Self {
        SymbolInfo {
            kind: SymbolKind::Function,
            ty: SemType::Fn,
            arity: Some(arity),
            ret: Some(ret),
            span: Some(span),
        }
    }

    pub fn builtin(arity: usize, ret: SemType) -> Self {
        SymbolInfo {
            kind: SymbolKind::Builtin,
            ty: SemType::Fn,
            arity: Some(arity),
            ret: Some(ret),
            span: None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, SymbolKind::Function | SymbolKind::Builtin)
            || matches!(self.ty, SemType::Fn | SemType::Any)
    }
}

/// Stack of scopes with chain lookup.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<FxHashMap<Symbol, SymbolInfo>>,
}

impl ScopeStack {
    /// Creates an empty stack; the caller pushes the module scope.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Binds (or rebinds) `name` in the innermost scope.
    pub fn bind(&mut self, name: Symbol, info: SymbolInfo) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, info);
        }
    }

    /// Walks the chain from innermost to outermost.
    pub fn lookup(&self, name: Symbol) -> Option<&SymbolInfo> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&name))
    }

    /// Looks only in the innermost scope.
    pub fn lookup_local(&self, name: Symbol) -> Option<&SymbolInfo> {
        self.scopes.last().and_then(|scope| scope.get(&name))
    }
}
