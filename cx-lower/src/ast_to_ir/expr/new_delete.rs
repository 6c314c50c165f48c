//! `new`/`delete` lowering (§4.2).

use super::lower_expression;
use crate::ast_to_ir::{AstToIr, ExprMode};
use crate::context::CompilerContext;
use crate::errors::{LoweringError, LoweringResult};
use crate::mangling;
use cx_ast::{Expression, SourceToken, Type};
use cx_ir::{
    push, ConstructorCallOp, HeapAllocArrayOp, HeapAllocOp, HeapFreeArrayOp, HeapFreeOp, Opcode,
    PlacementNewOp, TypedValue, ValueKind,
};

pub fn lower_new(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    ty: &Type,
    array_len: Option<&Expression>,
    args: &[Expression],
    placement: Option<&Expression>,
) -> LoweringResult<TypedValue> {
    let token = SourceToken::unknown();
    let Some(type_index) = engine.resolve_type_index(cx, ty) else {
        return Err(LoweringError::internal("new on an unresolved type", token));
    };
    if cx.types.struct_record(type_index).is_some_and(|r| r.is_abstract) {
        let struct_name = struct_name_of(cx, type_index).unwrap_or_default();
        return Err(LoweringError::AbstractInstantiation { struct_name });
    }

    let arg_vals: Vec<TypedValue> =
        args.iter().map(|a| lower_expression(engine, cx, a, ExprMode::Load)).collect::<LoweringResult<_>>()?;

    if let Some(place) = placement {
        let address = lower_expression(engine, cx, place, ExprMode::Load)?;
        let mangled_ctor = struct_name_of(cx, type_index).map(|name| {
            let mangled = mangling::mangle_constructor(&name, &arg_types_of(&arg_vals));
            cx.interner.intern(&mangled)
        });
        push(
            &mut engine.ir,
            Opcode::PlacementNew(PlacementNewOp { ty: type_index, address: address.clone(), args: arg_vals, mangled_ctor }),
            token,
        );
        return Ok(address);
    }

    if let Some(len_expr) = array_len {
        let count = lower_expression(engine, cx, len_expr, ExprMode::Load)?;
        let result = engine.fresh_prvalue();
        push(
            &mut engine.ir,
            Opcode::HeapAllocArray(HeapAllocArrayOp { ty: type_index, count, result }),
            token,
        );
        return Ok(TypedValue::temp(ValueKind::Pointer, 64, result).with_pointer_depth(1).with_type_index(type_index));
    }

    let result = engine.fresh_prvalue();
    push(&mut engine.ir, Opcode::HeapAlloc(HeapAllocOp { ty: type_index, result }), token);
    let object = TypedValue::temp(ValueKind::Pointer, 64, result).with_pointer_depth(1).with_type_index(type_index);

    if let Some(struct_name) = struct_name_of(cx, type_index) {
        let mangled = mangling::mangle_constructor(&struct_name, &arg_types_of(&arg_vals));
        let mangled_ctor = cx.interner.intern(&mangled);
        push(
            &mut engine.ir,
            Opcode::ConstructorCall(ConstructorCallOp {
                struct_type: type_index,
                object: object.clone(),
                args: arg_vals,
                mangled_ctor,
                is_heap_allocated: true,
                use_return_slot: false,
            }),
            token,
        );
    }
    Ok(object)
}

fn struct_name_of(cx: &CompilerContext, index: cx_ir::TypeIndex) -> Option<String> {
    cx.types.struct_record(index)?;
    cx.types.get(index).and_then(|info| cx.interner.resolve(info.name)).map(|s| s.to_string())
}

fn arg_types_of(args: &[TypedValue]) -> Vec<Type> {
    args.iter()
        .map(|v| match v.kind {
            ValueKind::Float => Type::F64,
            ValueKind::Bool => Type::Bool,
            ValueKind::Pointer => Type::Pointer(Box::new(Type::Void)),
            ValueKind::Struct => Type::Void,
            _ => Type::I32,
        })
        .collect()
}

pub fn lower_delete(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    operand: &Expression,
    is_array: bool,
) -> LoweringResult<TypedValue> {
    let token = SourceToken::unknown();
    let pointer = lower_expression(engine, cx, operand, ExprMode::Load)?;
    if is_array {
        push(&mut engine.ir, Opcode::HeapFreeArray(HeapFreeArrayOp { pointer }), token);
    } else {
        push(&mut engine.ir, Opcode::HeapFree(HeapFreeOp { pointer }), token);
    }
    Ok(TypedValue::int_literal(0, 32))
}
