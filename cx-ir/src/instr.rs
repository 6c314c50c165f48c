//! The flat IR instruction stream (§3).
//!
//! `Ir` is an append-only `Vec<IrInstruction>`; every instruction carries a
//! tagged payload (one struct per opcode) and the source token it was
//! lowered from. This is the boundary artifact the backend consumes — this
//! crate only defines the shape, it never interprets it.

use crate::interner::StringHandle;
use crate::temp::TempVar;
use crate::types::TypeIndex;
use cx_ast::SourceToken;

/// Coarse value kind, independent of the struct/enum identity carried in
/// `type_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Void,
    Bool,
    Int,
    Float,
    Pointer,
    Struct,
    FunctionPointer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefQualifier {
    LValueRef,
    RValueRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CvQualifier {
    pub is_const: bool,
    pub is_volatile: bool,
}

/// The tagged union a `TypedValue`'s payload holds.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueOperand {
    Temp(TempVar),
    Name(StringHandle),
    Int(u64),
    Float(f64),
}

/// Every IR opcode payload carries its operands as `TypedValue`s (§3).
#[derive(Debug, Clone)]
pub struct TypedValue {
    pub kind: ValueKind,
    pub size_in_bits: u32,
    pub value: ValueOperand,
    pub pointer_depth: Option<u8>,
    pub ref_qualifier: Option<RefQualifier>,
    pub cv_qualifier: CvQualifier,
    pub type_index: Option<TypeIndex>,
}

impl TypedValue {
    pub fn temp(kind: ValueKind, size_in_bits: u32, var: TempVar) -> Self {
        Self {
            kind,
            size_in_bits,
            value: ValueOperand::Temp(var),
            pointer_depth: None,
            ref_qualifier: None,
            cv_qualifier: CvQualifier::default(),
            type_index: None,
        }
    }

    pub fn int_literal(value: u64, size_in_bits: u32) -> Self {
        Self {
            kind: ValueKind::Int,
            size_in_bits,
            value: ValueOperand::Int(value),
            pointer_depth: None,
            ref_qualifier: None,
            cv_qualifier: CvQualifier::default(),
            type_index: None,
        }
    }

    pub fn float_literal(value: f64, size_in_bits: u32) -> Self {
        Self {
            kind: ValueKind::Float,
            size_in_bits,
            value: ValueOperand::Float(value),
            pointer_depth: None,
            ref_qualifier: None,
            cv_qualifier: CvQualifier::default(),
            type_index: None,
        }
    }

    pub fn with_type_index(mut self, index: TypeIndex) -> Self {
        self.type_index = Some(index);
        self
    }

    pub fn with_pointer_depth(mut self, depth: u8) -> Self {
        self.pointer_depth = Some(depth);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Add, Sub, Mul, Div, Mod,
    BitAnd, BitOr, BitXor, Shl, Shr,
    Eq, Ne, Lt, Le, Gt, Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOpKind {
    Neg,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    IntToFloat,
    FloatToInt,
    FloatToFloat,
    ToBool,
    Bitcast,
}

#[derive(Debug, Clone)]
pub struct CallOp {
    pub function_name: StringHandle,
    pub args: Vec<TypedValue>,
    pub result: TempVar,
    /// Set when the callee returns a struct above the ABI register
    /// threshold; equal to `result` so the caller's destination doubles as
    /// the hidden return buffer (§4.2 RVO).
    pub return_slot: Option<TempVar>,
}

#[derive(Debug, Clone)]
pub struct VirtualCallOp {
    pub object: TypedValue,
    pub vtable_index: u32,
    pub is_pointer_access: bool,
    pub args: Vec<TypedValue>,
    pub result: TempVar,
}

#[derive(Debug, Clone)]
pub struct IndirectCallOp {
    pub callee: TypedValue,
    pub args: Vec<TypedValue>,
    pub result: TempVar,
}

#[derive(Debug, Clone)]
pub struct MemberLoadOp {
    pub object: TypedValue,
    pub member_name: StringHandle,
    pub offset: i64,
    pub bitfield_width: Option<u16>,
    pub bitfield_bit_offset: u32,
    pub is_pointer_to_member: bool,
    pub result: TempVar,
}

#[derive(Debug, Clone)]
pub struct MemberStoreOp {
    pub object: TypedValue,
    pub member_name: StringHandle,
    pub offset: i64,
    pub value: TypedValue,
    pub bitfield_width: Option<u16>,
    pub bitfield_bit_offset: u32,
    pub is_pointer_to_member: bool,
}

#[derive(Debug, Clone)]
pub struct ArrayAccessOp {
    pub array: TypedValue,
    pub index: TypedValue,
    pub element_type_index: Option<TypeIndex>,
    pub element_size_in_bits: u32,
    pub member_offset: i64,
    pub is_pointer_to_array: bool,
    pub result: TempVar,
}

#[derive(Debug, Clone)]
pub struct ArrayStoreOp {
    pub array: TypedValue,
    pub index: TypedValue,
    pub element_type_index: Option<TypeIndex>,
    pub element_size_in_bits: u32,
    pub member_offset: i64,
    pub is_pointer_to_array: bool,
    pub value: TypedValue,
}

#[derive(Debug, Clone)]
pub struct DereferenceStoreOp {
    pub pointer: TypedValue,
    pub value: TypedValue,
}

#[derive(Debug, Clone)]
pub struct AssignmentOp {
    pub target_name: StringHandle,
    pub value: TypedValue,
}

#[derive(Debug, Clone)]
pub struct BinaryOpPayload {
    pub op: BinOpKind,
    pub lhs: TypedValue,
    pub rhs: TypedValue,
    pub result: TempVar,
}

#[derive(Debug, Clone)]
pub struct UnaryOpPayload {
    pub op: UnOpKind,
    pub operand: TypedValue,
    pub result: TempVar,
}

#[derive(Debug, Clone)]
pub struct AddressOfOp {
    pub operand: TypedValue,
    pub result: TempVar,
}

#[derive(Debug, Clone)]
pub struct DereferenceOp {
    pub pointer: TypedValue,
    pub result: TempVar,
}

#[derive(Debug, Clone)]
pub struct GlobalLoadOp {
    pub name: StringHandle,
    pub result: TempVar,
}

#[derive(Debug, Clone)]
pub struct GlobalStoreOp {
    pub name: StringHandle,
    pub value: TypedValue,
}

#[derive(Debug, Clone)]
pub struct ConstructorCallOp {
    pub struct_type: TypeIndex,
    pub object: TypedValue,
    pub args: Vec<TypedValue>,
    pub mangled_ctor: StringHandle,
    pub is_heap_allocated: bool,
    pub use_return_slot: bool,
}

#[derive(Debug, Clone)]
pub struct DestructorCallOp {
    pub struct_type: TypeIndex,
    pub object: TypedValue,
    pub mangled_dtor: StringHandle,
}

#[derive(Debug, Clone)]
pub struct HeapAllocOp {
    pub ty: TypeIndex,
    pub result: TempVar,
}

#[derive(Debug, Clone)]
pub struct HeapAllocArrayOp {
    pub ty: TypeIndex,
    pub count: TypedValue,
    pub result: TempVar,
}

#[derive(Debug, Clone)]
pub struct HeapFreeOp {
    pub pointer: TypedValue,
}

#[derive(Debug, Clone)]
pub struct HeapFreeArrayOp {
    pub pointer: TypedValue,
}

#[derive(Debug, Clone)]
pub struct PlacementNewOp {
    pub ty: TypeIndex,
    pub address: TypedValue,
    pub args: Vec<TypedValue>,
    pub mangled_ctor: Option<StringHandle>,
}

#[derive(Debug, Clone)]
pub struct TypeidOp {
    pub operand: Option<TypedValue>,
    pub static_type: Option<TypeIndex>,
    pub result: TempVar,
}

#[derive(Debug, Clone)]
pub struct DynamicCastOp {
    pub operand: TypedValue,
    pub target_type: TypeIndex,
    pub as_reference: bool,
    pub result: TempVar,
}

#[derive(Debug, Clone)]
pub struct FunctionDeclOp {
    pub mangled_name: StringHandle,
    pub param_types: Vec<TypeIndex>,
    pub return_type: Option<TypeIndex>,
}

#[derive(Debug, Clone)]
pub struct FunctionAddressOp {
    pub mangled_name: StringHandle,
    pub result: TempVar,
}

#[derive(Debug, Clone)]
pub struct SehFinallyCallOp {
    pub funclet_label: StringHandle,
    pub end_label: StringHandle,
}

#[derive(Debug, Clone)]
pub struct LabelOp {
    pub name: StringHandle,
}

/// Unconditional control transfer — loop back-edges, `goto`, `__leave`,
/// and the fallthrough edges statement lowering inserts around branches.
#[derive(Debug, Clone)]
pub struct JumpOp {
    pub target: StringHandle,
}

/// `if (condition) goto true_label; else goto false_label;` — the one
/// branching primitive statement lowering composes into `if`, loops, and
/// switch dispatch.
#[derive(Debug, Clone)]
pub struct ConditionalJumpOp {
    pub condition: TypedValue,
    pub true_label: StringHandle,
    pub false_label: StringHandle,
}

#[derive(Debug, Clone)]
pub struct ReturnOp {
    pub value: Option<TypedValue>,
}

#[derive(Debug, Clone)]
pub struct TypeConversionOp {
    pub kind: ConversionKind,
    pub source: TypedValue,
    pub target_type_index: Option<TypeIndex>,
    pub result: TempVar,
}

/// One-of payload per opcode (§3 `IrInstruction`).
#[derive(Debug, Clone)]
pub enum Opcode {
    Call(CallOp),
    VirtualCall(VirtualCallOp),
    IndirectCall(IndirectCallOp),
    MemberLoad(MemberLoadOp),
    MemberStore(MemberStoreOp),
    ArrayAccess(ArrayAccessOp),
    ArrayStore(ArrayStoreOp),
    DereferenceStore(DereferenceStoreOp),
    Assignment(AssignmentOp),
    BinaryOp(BinaryOpPayload),
    UnaryOp(UnaryOpPayload),
    AddressOf(AddressOfOp),
    Dereference(DereferenceOp),
    GlobalLoad(GlobalLoadOp),
    GlobalStore(GlobalStoreOp),
    ConstructorCall(ConstructorCallOp),
    DestructorCall(DestructorCallOp),
    HeapAlloc(HeapAllocOp),
    HeapAllocArray(HeapAllocArrayOp),
    HeapFree(HeapFreeOp),
    HeapFreeArray(HeapFreeArrayOp),
    PlacementNew(PlacementNewOp),
    Typeid(TypeidOp),
    DynamicCast(DynamicCastOp),
    FunctionDecl(FunctionDeclOp),
    FunctionAddress(FunctionAddressOp),
    SehFinallyCall(SehFinallyCallOp),
    Label(LabelOp),
    Jump(JumpOp),
    ConditionalJump(ConditionalJumpOp),
    Return(ReturnOp),
    TypeConversion(TypeConversionOp),
}

#[derive(Debug, Clone)]
pub struct IrInstruction {
    pub opcode: Opcode,
    pub source_token: SourceToken,
}

/// The flat instruction stream handed to the backend.
pub type Ir = Vec<IrInstruction>;

pub fn push(ir: &mut Ir, opcode: Opcode, source_token: SourceToken) {
    ir.push(IrInstruction { opcode, source_token });
}
