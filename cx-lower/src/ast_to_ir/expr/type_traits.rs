//! `sizeof`/`alignof`/`offsetof`/type-traits/`typeid` (§4.2). All constant
//! folded except `typeid` on a polymorphic operand, which resolves from the
//! vtable at runtime.

use super::lower_expression;
use crate::ast_to_ir::{AstToIr, ExprMode};
use crate::context::CompilerContext;
use crate::errors::LoweringResult;
use cx_ast::{Expression, SourceToken, Type};
use cx_ir::{push, Opcode, TypeKind, TypedValue, TypeidOp, ValueKind};

fn primitive_size_bytes(ty: &Type) -> Option<u32> {
    Some(match ty {
        Type::Bool | Type::I8 | Type::U8 | Type::Char => 1,
        Type::I16 | Type::U16 => 2,
        Type::I32 | Type::U32 | Type::F32 => 4,
        Type::I64 | Type::U64 | Type::F64 => 8,
        Type::Pointer(_) | Type::Reference(_) | Type::RValueReference(_) => 8,
        Type::Const(inner) | Type::Volatile(inner) => return primitive_size_bytes(inner),
        Type::Array(inner, n) => return primitive_size_bytes(inner).map(|s| s * (*n as u32)),
        _ => return None,
    })
}

fn struct_size_bytes(cx: &CompilerContext, ty: &Type) -> Option<u32> {
    match ty {
        Type::Named(name) | Type::Dependent(name) => {
            let handle = cx.interner.intern(name);
            let index = cx.types.by_name(handle)?;
            cx.types.struct_record(index).map(|r| r.size_in_bytes)
        }
        _ => None,
    }
}

fn size_of_type(cx: &CompilerContext, ty: &Type) -> u32 {
    primitive_size_bytes(ty).or_else(|| struct_size_bytes(cx, ty)).unwrap_or(0)
}

pub fn lower_sizeof(
    _engine: &mut AstToIr,
    cx: &mut CompilerContext,
    ty: &Type,
) -> LoweringResult<TypedValue> {
    Ok(TypedValue::int_literal(size_of_type(cx, ty) as u64, 64))
}

pub fn lower_alignof(
    _engine: &mut AstToIr,
    cx: &mut CompilerContext,
    ty: &Type,
) -> LoweringResult<TypedValue> {
    // This simplified registry doesn't track alignment separately from size
    // for primitives; struct alignment is read from the registry directly.
    let align = match ty {
        Type::Named(name) => {
            let handle = cx.interner.intern(name);
            cx.types
                .by_name(handle)
                .and_then(|idx| cx.types.struct_record(idx))
                .map(|r| r.align_in_bytes)
                .unwrap_or(size_of_type(cx, ty).max(1))
        }
        _ => size_of_type(cx, ty).max(1),
    };
    Ok(TypedValue::int_literal(align as u64, 64))
}

pub fn lower_offsetof(
    _engine: &mut AstToIr,
    cx: &mut CompilerContext,
    struct_ty: &Type,
    member: &str,
) -> LoweringResult<TypedValue> {
    let Type::Named(name) = struct_ty else {
        return Ok(TypedValue::int_literal(0, 64));
    };
    let handle = cx.interner.intern(name);
    let Some(index) = cx.types.by_name(handle) else {
        return Ok(TypedValue::int_literal(0, 64));
    };
    let member_handle = cx.interner.intern(member);
    let offset = cx
        .types
        .struct_record(index)
        .and_then(|r| r.find_member(member_handle))
        .map(|m| m.byte_offset)
        .unwrap_or(0);
    Ok(TypedValue::int_literal(offset as u64, 64))
}

/// C++ type-trait catalogue (`is_same`, `is_base_of`, `is_polymorphic`, …),
/// each a pure function of registry state.
pub fn lower_type_trait(
    _engine: &mut AstToIr,
    cx: &mut CompilerContext,
    trait_name: &str,
    operands: &[Type],
) -> LoweringResult<TypedValue> {
    let result = match trait_name {
        "is_same" => operands.len() == 2 && operands[0] == operands[1],
        "is_pointer" => operands.first().is_some_and(|t| matches!(t, Type::Pointer(_))),
        "is_reference" => operands
            .first()
            .is_some_and(|t| matches!(t, Type::Reference(_) | Type::RValueReference(_))),
        "is_base_of" => match (operands.first(), operands.get(1)) {
            (Some(Type::Named(base)), Some(Type::Named(derived))) => {
                let base_idx = cx.types.by_name(cx.interner.intern(base));
                let derived_idx = cx.types.by_name(cx.interner.intern(derived));
                match (base_idx, derived_idx) {
                    (Some(b), Some(d)) => cx.types.derives_from(d, b),
                    _ => false,
                }
            }
            _ => false,
        },
        "is_polymorphic" | "has_virtual_destructor" => operands.first().is_some_and(|t| {
            struct_record_of(cx, t).is_some_and(|r| r.has_vtable)
        }),
        "is_abstract" => operands.first().is_some_and(|t| struct_record_of(cx, t).is_some_and(|r| r.is_abstract)),
        "is_empty" => operands
            .first()
            .is_some_and(|t| struct_record_of(cx, t).is_some_and(|r| r.members.is_empty())),
        "is_final" => false,
        "is_aggregate" | "is_standard_layout" | "is_pod" | "is_trivial" => {
            operands.first().is_some_and(|t| struct_record_of(cx, t).is_some_and(|r| !r.has_vtable))
        }
        "is_constructible" | "is_trivially_constructible" | "is_nothrow_constructible" => true,
        "is_destructible" | "is_trivially_destructible" | "is_nothrow_destructible" => true,
        "is_bounded_array" => operands.first().is_some_and(|t| matches!(t, Type::Array(_, _))),
        "is_convertible" => operands.len() == 2,
        "is_layout_compatible" | "is_pointer_interconvertible_base_of" => {
            operands.len() == 2 && operands[0] == operands[1]
        }
        "has_unique_object_representations" => operands
            .first()
            .is_some_and(|t| struct_record_of(cx, t).is_some_and(|r| !r.has_vtable)),
        _ => false,
    };
    Ok(TypedValue { kind: ValueKind::Bool, ..TypedValue::int_literal(result as u64, 1) })
}

fn struct_record_of<'a>(cx: &'a CompilerContext, ty: &Type) -> Option<&'a cx_ir::StructRecord> {
    let Type::Named(name) = ty else { return None };
    let handle = cx.interner.intern(name);
    cx.types.by_name(handle).and_then(|idx| cx.types.struct_record(idx))
}

pub fn lower_typeid(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    inner: &Expression,
) -> LoweringResult<TypedValue> {
    let token = SourceToken::unknown();
    let operand = lower_expression(engine, cx, inner, ExprMode::Load)?;
    let is_polymorphic = operand
        .type_index
        .and_then(|idx| cx.types.get(idx))
        .is_some_and(|info| matches!(&info.kind, TypeKind::Struct(r) | TypeKind::Union(r) if r.has_vtable));

    let result = engine.fresh_prvalue();
    if is_polymorphic {
        push(
            &mut engine.ir,
            Opcode::Typeid(TypeidOp { operand: Some(operand), static_type: None, result }),
            token,
        );
    } else {
        push(
            &mut engine.ir,
            Opcode::Typeid(TypeidOp { operand: None, static_type: operand.type_index, result }),
            token,
        );
    }
    Ok(TypedValue::temp(ValueKind::Pointer, 64, result).with_pointer_depth(1))
}
