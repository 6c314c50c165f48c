//! Initializer lists & aggregate init (§4.2), and static-member definitions
//! drained from the deferred queue (§4.6).
//!
//! Simplification: a bare (non-struct) `std::initializer_list` has no
//! backing registry type in this core (`TypeKind` carries no array/list
//! shape, per the same gap documented in `array_subscript.rs`). Its backing
//! array is synthesized and populated, but the `{pointer, size}` wrapper
//! struct is not materialized — callers needing the count use
//! `positional.len()` from the AST node directly.

use super::lower_expression;
use crate::ast_to_ir::{AstToIr, ExprMode};
use crate::context::CompilerContext;
use crate::deferred::StaticMemberTask;
use crate::errors::{LoweringError, LoweringResult};
use crate::mangling;
use cx_ast::{Expression, SourceToken};
use cx_ir::{
    push, ArrayStoreOp, ConstructorCallOp, GlobalStoreOp, MemberStoreOp, Opcode, TypedValue,
    ValueKind, ValueOperand,
};

pub fn lower_initializer_list(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    struct_name: Option<&str>,
    positional: &[Expression],
    designated: &[(String, Expression)],
) -> LoweringResult<TypedValue> {
    let token = SourceToken::unknown();
    let Some(struct_name) = struct_name else {
        return lower_bare_initializer_list(engine, cx, positional, token);
    };

    let name_handle = cx.interner.intern(struct_name);
    let Some(struct_type) = cx.types.by_name(name_handle) else {
        return Err(LoweringError::UndefinedSymbol { name: struct_name.to_string(), token });
    };

    let mangled_ctor_name = mangling::mangle_constructor(struct_name, &[]);
    let mangled_ctor = cx.interner.intern(&mangled_ctor_name);
    let object_var = engine.fresh_prvalue();
    let object = TypedValue::temp(ValueKind::Struct, 0, object_var).with_type_index(struct_type);

    push(
        &mut engine.ir,
        Opcode::ConstructorCall(ConstructorCallOp {
            struct_type,
            object: object.clone(),
            args: vec![],
            mangled_ctor,
            is_heap_allocated: false,
            use_return_slot: false,
        }),
        token,
    );

    let field_names: Vec<cx_ir::StringHandle> = cx
        .types
        .struct_record(struct_type)
        .map(|r| r.members.iter().map(|m| m.name).collect())
        .unwrap_or_default();

    for (field_handle, expr) in field_names.iter().zip(positional.iter()) {
        store_member(engine, cx, &object, struct_type, *field_handle, expr, token)?;
    }
    for (name, expr) in designated {
        let handle = cx.interner.intern(name);
        store_member(engine, cx, &object, struct_type, handle, expr, token)?;
    }

    Ok(object)
}

fn store_member(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    object: &TypedValue,
    struct_type: cx_ir::TypeIndex,
    field_handle: cx_ir::StringHandle,
    expr: &Expression,
    token: SourceToken,
) -> LoweringResult<()> {
    let Some(member) = cx.types.struct_record(struct_type).and_then(|r| r.find_member(field_handle)) else {
        return Ok(());
    };
    let (offset, bitfield_width, bitfield_bit_offset) =
        (member.byte_offset as i64, member.bitfield_width, member.bitfield_bit_offset);
    let value = lower_expression(engine, cx, expr, ExprMode::Load)?;
    push(
        &mut engine.ir,
        Opcode::MemberStore(MemberStoreOp {
            object: object.clone(),
            member_name: field_handle,
            offset,
            value,
            bitfield_width,
            bitfield_bit_offset,
            is_pointer_to_member: false,
        }),
        token,
    );
    Ok(())
}

fn lower_bare_initializer_list(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    positional: &[Expression],
    token: SourceToken,
) -> LoweringResult<TypedValue> {
    let array_name = engine.fresh_label(cx, "init_list");
    let array = TypedValue { kind: ValueKind::Pointer, size_in_bits: 64, value: ValueOperand::Name(array_name), pointer_depth: Some(1), ref_qualifier: None, cv_qualifier: Default::default(), type_index: None };

    for (i, expr) in positional.iter().enumerate() {
        let value = lower_expression(engine, cx, expr, ExprMode::Load)?;
        push(
            &mut engine.ir,
            Opcode::ArrayStore(ArrayStoreOp {
                array: array.clone(),
                index: TypedValue::int_literal(i as u64, 64),
                element_type_index: value.type_index,
                element_size_in_bits: value.size_in_bits,
                member_offset: 0,
                is_pointer_to_array: true,
                value,
            }),
            token,
        );
    }
    Ok(array)
}

/// Drained static-member definitions (§4.6): `Struct::member = init;` at file
/// scope, or left zero-initialized when `init` is absent.
pub fn emit_static_member(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    task: &StaticMemberTask,
) -> LoweringResult<()> {
    let Some(init) = &task.init else { return Ok(()) };
    let mangled = format!("{}::{}", task.struct_name, task.member_name);
    let handle = cx.interner.intern(&mangled);
    let value = lower_expression(engine, cx, init, ExprMode::Load)?;
    push(&mut engine.ir, Opcode::GlobalStore(GlobalStoreOp { name: handle, value }), SourceToken::unknown());
    Ok(())
}
