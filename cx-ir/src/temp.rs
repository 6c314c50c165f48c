//! Per-function temporary variables and their side-table metadata.
//!
//! §9 calls out the global `TempVarMetadata` map as the one piece of
//! non-local mutable state worth removing; here it is a dense per-function
//! vector built alongside the IR instead.

use crate::value_category::{LValueInfo, ValueCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TempVar {
    pub var_number: u32,
}

#[derive(Debug, Clone)]
pub struct TempVarMetadata {
    pub category: ValueCategory,
    pub lvalue: Option<LValueInfo>,
}

impl TempVarMetadata {
    pub fn prvalue() -> Self {
        Self { category: ValueCategory::PrValue, lvalue: None }
    }

    pub fn lvalue(info: LValueInfo) -> Self {
        Self { category: ValueCategory::LValue, lvalue: Some(info) }
    }

    pub fn xvalue(info: LValueInfo) -> Self {
        Self { category: ValueCategory::XValue, lvalue: Some(info) }
    }

    /// §3 invariant: lvalue/xvalue categories carry a kind-consistent `LValueInfo`.
    pub fn is_well_formed(&self) -> bool {
        match self.category {
            ValueCategory::PrValue => self.lvalue.is_none(),
            ValueCategory::LValue | ValueCategory::XValue => {
                self.lvalue.as_ref().is_some_and(LValueInfo::is_kind_consistent)
            }
        }
    }
}

/// Allocates monotonically increasing `TempVar`s for one function body and
/// records their category/address metadata as they're produced.
#[derive(Debug, Default)]
pub struct TempVarTable {
    next: u32,
    metadata: Vec<TempVarMetadata>,
}

impl TempVarTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self, meta: TempVarMetadata) -> TempVar {
        let var = TempVar { var_number: self.next };
        self.next += 1;
        debug_assert!(meta.is_well_formed());
        self.metadata.push(meta);
        var
    }

    pub fn metadata(&self, var: TempVar) -> Option<&TempVarMetadata> {
        self.metadata.get(var.var_number as usize)
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}
