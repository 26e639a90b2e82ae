//! Lexically Scoped Symbol Table
//!
//! The symbol table is a stack of scopes. Each scope carries a unique number,
//! assigned monotonically on entry, which the lowering pass uses to mangle
//! variable names (`@SYM_TABLE_<n>_<ident>`) so that shadowed declarations
//! resolve textually in the IR.
//!
//! Lookup walks the scope stack from the innermost scope outward; insertion
//! always targets the innermost scope.

use std::collections::HashMap;

/// Kind of a symbol table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Local variable or parameter slot.
    Var,
    /// Function returning `int`.
    IntFunction,
    /// Function returning `void`.
    VoidFunction,
    /// Lookup miss marker.
    Undefined,
}

/// A symbol table entry.
///
/// `value` is kind-dependent: for functions it holds the parameter count
/// (used for call arity checking), for variables it is unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolInfo {
    pub kind: SymbolKind,
    pub value: i32,
}

/// Scoped symbol table.
///
/// Scopes are strictly nested: every `enter_scope` is matched by one
/// `exit_scope`, and scope numbers are never reused.
#[derive(Debug, Default)]
pub struct SymbolTable {
    /// Scope stack: (scope number, bindings). Innermost scope is last.
    scopes: Vec<(usize, HashMap<String, SymbolInfo>)>,
    /// Total number of scopes ever entered.
    scope_count: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a new scope, assigning it the next scope number.
    pub fn enter_scope(&mut self) {
        self.scopes.push((self.scope_count, HashMap::new()));
        self.scope_count += 1;
    }

    /// Exit the innermost scope, dropping its bindings.
    pub fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    /// Mangling tag of the innermost scope, e.g. `"SYM_TABLE_42_"`.
    pub fn get_scope_number(&self) -> String {
        let n = self.scopes.last().map_or(0, |(n, _)| *n);
        format!("SYM_TABLE_{}_", n)
    }

    /// Insert a symbol into the innermost scope, replacing any binding with
    /// the same name in that scope.
    pub fn insert_sym(&mut self, symbol: &str, kind: SymbolKind, value: i32) {
        if let Some((_, table)) = self.scopes.last_mut() {
            table.insert(symbol.to_string(), SymbolInfo { kind, value });
        }
    }

    /// Whether `symbol` is bound in any visible scope.
    pub fn exist_sym(&self, symbol: &str) -> bool {
        self.scopes
            .iter()
            .rev()
            .any(|(_, table)| table.contains_key(symbol))
    }

    /// Whether `symbol` is bound in the innermost scope only.
    ///
    /// Used to reject redeclarations without forbidding shadowing.
    pub fn exist_sym_in_current_scope(&self, symbol: &str) -> bool {
        self.scopes
            .last()
            .map_or(false, |(_, table)| table.contains_key(symbol))
    }

    /// Resolve `symbol`, innermost scope first.
    ///
    /// Returns the mangling tag of the defining scope and the entry. A miss
    /// returns the tag `"SYM_TABLE_-1_"` and an [`SymbolKind::Undefined`]
    /// entry, mirroring the lookup contract callers match on.
    pub fn query_sym(&self, symbol: &str) -> (String, SymbolInfo) {
        for (number, table) in self.scopes.iter().rev() {
            if let Some(info) = table.get(symbol) {
                return (format!("SYM_TABLE_{}_", number), *info);
            }
        }
        (
            "SYM_TABLE_-1_".to_string(),
            SymbolInfo {
                kind: SymbolKind::Undefined,
                value: -1,
            },
        )
    }
}
