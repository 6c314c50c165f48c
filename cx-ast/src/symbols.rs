//! Lexically-scoped symbol table handed off by the parser.
//!
//! Lookups cascade from the innermost scope outward; the lowering core then
//! falls back to the type registry for qualified static access once this
//! table is exhausted (§4.2 identifier resolution).

use crate::{DeclId, Type};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
    EnumConstant,
    Type,
}

#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub kind: SymbolKind,
    pub ty: Type,
    pub decl: Option<DeclId>,
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    entries: HashMap<String, SymbolEntry>,
}

/// A stack of lexical scopes. `enter_scope`/`exit_scope` bracket every block,
/// function body, and template instantiation replay.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self { scopes: vec![Scope::default()] }
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn exit_scope(&mut self) {
        // The outermost (global) scope is never popped.
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: SymbolEntry) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.entries.insert(name.into(), entry);
        }
    }

    /// Innermost-first lookup, stopping at the first scope that defines `name`.
    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        self.scopes.iter().rev().find_map(|s| s.entries.get(name))
    }

    /// All entries visible for `name`, innermost first — used by recovery
    /// searches (single-overload fallback, dependent-qualified lookup).
    pub fn lookup_all(&self, name: &str) -> Vec<&SymbolEntry> {
        self.scopes
            .iter()
            .rev()
            .filter_map(|s| s.entries.get(name))
            .collect()
    }

    /// Names defined anywhere in the table, for "did you mean?" suggestions.
    pub fn all_names(&self) -> Vec<String> {
        self.scopes.iter().flat_map(|s| s.entries.keys().cloned()).collect()
    }
}
