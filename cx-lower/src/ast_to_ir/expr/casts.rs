//! Cast family lowering (§4.2 Casts).

use super::lower_expression;
use crate::ast_to_ir::{AstToIr, ExprMode};
use crate::context::CompilerContext;
use crate::errors::{LoweringError, LoweringResult};
use cx_ast::{CastKind, Expression, SourceToken, Type};
use cx_ir::{
    push, ConversionKind, DynamicCastOp, LValueBase, TempVarMetadata, TypeConversionOp, TypedValue,
    ValueKind, ValueOperand,
};

fn lvalue_base_of(value: &TypedValue) -> Option<LValueBase> {
    match value.value {
        ValueOperand::Temp(var) => Some(LValueBase::Temp(var)),
        ValueOperand::Name(n) => Some(LValueBase::Named(n)),
        _ => None,
    }
}

pub fn lower_cast(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    kind: CastKind,
    target_ty: &Type,
    operand: &Expression,
    mode: ExprMode,
) -> LoweringResult<TypedValue> {
    let token = SourceToken::unknown();
    match kind {
        CastKind::StaticRValueRef => {
            let source = lower_expression(engine, cx, operand, ExprMode::LValueAddress)?;
            let Some(base) = lvalue_base_of(&source) else {
                return Err(LoweringError::internal("static_cast<T&&> on a non-addressable operand", token));
            };
            let var = engine.temps.fresh(TempVarMetadata::xvalue(cx_ir::LValueInfo::direct(base)));
            Ok(TypedValue::temp(source.kind, source.size_in_bits, var))
        }
        CastKind::StaticLValueRef => {
            let source = lower_expression(engine, cx, operand, ExprMode::LValueAddress)?;
            let Some(base) = lvalue_base_of(&source) else {
                return Err(LoweringError::internal("static_cast<T&> on a non-addressable operand", token));
            };
            let var = engine.temps.fresh(TempVarMetadata::lvalue(cx_ir::LValueInfo::direct(base)));
            Ok(TypedValue::temp(source.kind, source.size_in_bits, var))
        }
        CastKind::Static => lower_arithmetic_or_bitcast(engine, cx, target_ty, operand, mode, token),
        CastKind::Const | CastKind::Reinterpret => {
            // Bits/address preserved; only type metadata changes.
            let mut source = lower_expression(engine, cx, operand, mode)?;
            source.type_index = engine.resolve_type_index(cx, target_ty);
            Ok(source)
        }
        CastKind::CStyle => lower_arithmetic_or_bitcast(engine, cx, target_ty, operand, mode, token),
    }
}

fn lower_arithmetic_or_bitcast(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    target_ty: &Type,
    operand: &Expression,
    mode: ExprMode,
    token: SourceToken,
) -> LoweringResult<TypedValue> {
    let source = lower_expression(engine, cx, operand, ExprMode::Load)?;

    if let Type::Pointer(_) = target_ty {
        if source.kind == ValueKind::Pointer {
            // Pointer-to-pointer: bitcast, re-tag type, no conversion op.
            let mut retagged = source;
            retagged.kind = ValueKind::Pointer;
            retagged.size_in_bits = 64;
            retagged.type_index = engine.resolve_type_index(cx, target_ty);
            return Ok(retagged);
        }
    }

    let target_kind = super_value_kind(target_ty);
    let conversion = match (source.kind, target_kind) {
        (ValueKind::Int, ValueKind::Float) => Some(ConversionKind::IntToFloat),
        (ValueKind::Float, ValueKind::Int) => Some(ConversionKind::FloatToInt),
        (ValueKind::Float, ValueKind::Float) => Some(ConversionKind::FloatToFloat),
        (ValueKind::Int, ValueKind::Bool) | (ValueKind::Float, ValueKind::Bool) => {
            Some(ConversionKind::ToBool)
        }
        _ if source.kind != target_kind => Some(ConversionKind::Bitcast),
        _ => None,
    };

    let Some(kind) = conversion else {
        return Ok(source);
    };

    let result = engine.fresh_prvalue();
    let target_type_index = engine.resolve_type_index(cx, target_ty);
    push(
        &mut engine.ir,
        Opcode_TypeConversion(TypeConversionOp { kind, source, target_type_index, result }),
        token,
    );
    let _ = mode;
    Ok(TypedValue::temp(target_kind, target_size_bits(target_ty), result))
}

#[allow(non_snake_case)]
fn Opcode_TypeConversion(op: TypeConversionOp) -> cx_ir::Opcode {
    cx_ir::Opcode::TypeConversion(op)
}

fn super_value_kind(ty: &Type) -> ValueKind {
    match ty {
        Type::F32 | Type::F64 => ValueKind::Float,
        Type::Bool => ValueKind::Bool,
        Type::Pointer(_) => ValueKind::Pointer,
        Type::Named(_) => ValueKind::Struct,
        Type::Const(inner) | Type::Volatile(inner) => super_value_kind(inner),
        _ => ValueKind::Int,
    }
}

fn target_size_bits(ty: &Type) -> u32 {
    match ty {
        Type::Bool | Type::I8 | Type::U8 | Type::Char => 8,
        Type::I16 | Type::U16 => 16,
        Type::I32 | Type::U32 | Type::F32 => 32,
        Type::I64 | Type::U64 | Type::F64 => 64,
        Type::Pointer(_) => 64,
        Type::Const(inner) | Type::Volatile(inner) => target_size_bits(inner),
        _ => 32,
    }
}

pub fn lower_dynamic_cast(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    target_ty: &Type,
    operand: &Expression,
    as_reference: bool,
) -> LoweringResult<TypedValue> {
    let token = SourceToken::unknown();
    let source = lower_expression(engine, cx, operand, ExprMode::Load)?;
    let Some(target_type) = engine.resolve_type_index(cx, target_ty) else {
        return Err(LoweringError::internal("dynamic_cast target type is not registered", token));
    };
    let result = engine.fresh_prvalue();
    push(
        &mut engine.ir,
        cx_ir::Opcode::DynamicCast(DynamicCastOp {
            operand: source,
            target_type,
            as_reference,
            result,
        }),
        token,
    );
    let category = if as_reference {
        TempVarMetadata::lvalue(cx_ir::LValueInfo::direct(LValueBase::Temp(result)))
    } else {
        TempVarMetadata::prvalue()
    };
    let _ = category;
    Ok(TypedValue::temp(ValueKind::Pointer, 64, result).with_type_index(target_type))
}
