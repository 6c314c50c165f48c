//! Core IR data model: interned strings, the type registry, value-category /
//! lvalue metadata, and the flat `Ir` instruction stream (§3).
//!
//! This crate is deliberately inert — it defines the shapes the lowering
//! core (`cx-lower`) populates and the backend (out of scope here) consumes.

pub mod instr;
pub mod interner;
pub mod temp;
pub mod types;
pub mod value_category;

pub use instr::{
    push, AddressOfOp, ArrayAccessOp, ArrayStoreOp, AssignmentOp, BinOpKind, BinaryOpPayload,
    CallOp, ConditionalJumpOp, ConstructorCallOp, ConversionKind, CvQualifier, DereferenceOp,
    DereferenceStoreOp, DestructorCallOp, DynamicCastOp, FunctionAddressOp, FunctionDeclOp,
    GlobalLoadOp, GlobalStoreOp, HeapAllocArrayOp, HeapAllocOp, HeapFreeArrayOp, HeapFreeOp,
    IndirectCallOp, Ir, IrInstruction, JumpOp, LabelOp, MemberLoadOp, MemberStoreOp, Opcode,
    PlacementNewOp, RefQualifier, ReturnOp, SehFinallyCallOp, TypeConversionOp, TypedValue,
    TypeidOp, UnOpKind, UnaryOpPayload, ValueKind, ValueOperand, VirtualCallOp,
};
pub use interner::{StringHandle, StringInterner};
pub use temp::{TempVar, TempVarMetadata, TempVarTable};
pub use types::{
    Access, BaseClassInfo, FunctionIndex, MemberInfo, MethodInfo, StructRecord, TypeIndex,
    TypeInfo, TypeKind, TypeRegistry,
};
pub use value_category::{LValueBase, LValueInfo, LValueKind, ValueCategory};
