//! Value-category and lvalue-address metadata (§4.1).
//!
//! Every temporary is tagged prvalue, lvalue, or xvalue. lvalues and xvalues
//! additionally carry an `LValueInfo` describing *where* they live, which is
//! what store/load instruction selection dispatches on.

use crate::instr::TypedValue;
use crate::interner::StringHandle;
use crate::temp::TempVar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCategory {
    PrValue,
    LValue,
    XValue,
}

impl ValueCategory {
    pub fn has_address(self) -> bool {
        matches!(self, ValueCategory::LValue | ValueCategory::XValue)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LValueKind {
    /// Ordinary named slot.
    Direct,
    /// Through a pointer temporary: `DereferenceStore`.
    Indirect,
    /// A struct member: `MemberStore { base, offset }`.
    Member,
    /// An array element: `ArrayStore { array, index }`.
    ArrayElement,
    /// A mangled global name: `GlobalStore`.
    Global,
    /// A bare temporary with no addressable backing (used transiently while
    /// building up a chain before it collapses into one of the above).
    Temporary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LValueBase {
    Named(StringHandle),
    Temp(TempVar),
}

/// Structured address descriptor attached to an lvalue/xvalue temporary
/// (§3 `LValueInfo`). Invariant: `kind == Member` implies `member_name` is
/// `Some`; `kind == ArrayElement` implies `array_index` is `Some` (§3
/// Invariants, §8 property 1-ish consistency check).
#[derive(Debug, Clone)]
pub struct LValueInfo {
    pub kind: LValueKind,
    pub base: LValueBase,
    pub offset: i64,
    pub member_name: Option<StringHandle>,
    pub array_index: Option<Box<TypedValue>>,
    pub is_pointer_to_member: bool,
    pub is_pointer_to_array: bool,
    pub bitfield_width: Option<u16>,
    pub bitfield_bit_offset: u32,
}

impl LValueInfo {
    pub fn direct(base: LValueBase) -> Self {
        Self {
            kind: LValueKind::Direct,
            base,
            offset: 0,
            member_name: None,
            array_index: None,
            is_pointer_to_member: false,
            is_pointer_to_array: false,
            bitfield_width: None,
            bitfield_bit_offset: 0,
        }
    }

    pub fn indirect(base: LValueBase) -> Self {
        Self { kind: LValueKind::Indirect, ..Self::direct(base) }
    }

    pub fn global(name: StringHandle) -> Self {
        Self { kind: LValueKind::Global, ..Self::direct(LValueBase::Named(name)) }
    }

    pub fn member(base: LValueBase, member_name: StringHandle, offset: i64) -> Self {
        Self {
            kind: LValueKind::Member,
            base,
            offset,
            member_name: Some(member_name),
            ..Self::direct(base)
        }
    }

    pub fn array_element(base: LValueBase, index: TypedValue) -> Self {
        Self {
            kind: LValueKind::ArrayElement,
            base,
            array_index: Some(Box::new(index)),
            ..Self::direct(base)
        }
    }

    /// Checks the kind/payload invariant from §3: `Member ⇒ member_name.is_some()`,
    /// `ArrayElement ⇒ array_index.is_some()`.
    pub fn is_kind_consistent(&self) -> bool {
        match self.kind {
            LValueKind::Member => self.member_name.is_some(),
            LValueKind::ArrayElement => self.array_index.is_some(),
            _ => true,
        }
    }
}
