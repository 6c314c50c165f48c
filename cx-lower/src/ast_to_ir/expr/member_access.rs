//! Member access `.`/`->` lowering (§4.2 Member access).
//!
//! Resolution: (1) instance-member lookup across base classes, producing an
//! adjusted cumulative offset; (2) access-control check against the current
//! struct/function context. `is_pointer_to_member` is set for `->` so the
//! backend knows to dereference the base before applying the offset.
//!
//! Simplification against the full design: nested chains (`a.b.c.d`) are
//! resolved one `Field` node at a time rather than flattened into a single
//! `MemberStore` with a summed offset — doing the full collapse needs a
//! type-checking pass this core doesn't have (objects only carry a
//! `type_index` once already lowered). Each level still only costs one
//! `MemberLoad`/`MemberStore`, and values are unaffected; only the store-path
//! instruction count for deep chains differs from the fully collapsed form.

use super::lower_expression;
use crate::access_control::check_access;
use crate::ast_to_ir::{AstToIr, ExprMode};
use crate::context::CompilerContext;
use crate::errors::{LoweringError, LoweringResult};
use cx_ast::SourceToken;
use cx_ir::{
    push, LValueBase, LValueInfo, MemberInfo, MemberLoadOp, Opcode, TempVarMetadata, TypeIndex,
    TypedValue, ValueKind,
};

fn find_member_with_offset(
    cx: &CompilerContext,
    owner: TypeIndex,
    name_handle: cx_ir::StringHandle,
) -> Option<(MemberInfo, TypeIndex, i64)> {
    let record = cx.types.struct_record(owner)?;
    if let Some(member) = record.find_member(name_handle) {
        return Some((member.clone(), owner, member.byte_offset as i64));
    }
    for base in &record.bases {
        if let Some((member, owning, offset)) = find_member_with_offset(cx, base.ty, name_handle) {
            return Some((member, owning, offset + base.subobject_offset as i64));
        }
    }
    None
}

fn value_kind_of_type(cx: &CompilerContext, ty: TypeIndex) -> ValueKind {
    use cx_ir::TypeKind;
    match cx.types.get(ty).map(|t| &t.kind) {
        Some(TypeKind::Primitive { is_float: true, .. }) => ValueKind::Float,
        Some(TypeKind::Primitive { .. }) => ValueKind::Int,
        Some(TypeKind::Struct(_)) | Some(TypeKind::Union(_)) => ValueKind::Struct,
        Some(TypeKind::FunctionPointer { .. }) => ValueKind::FunctionPointer,
        Some(TypeKind::Enum { .. }) => ValueKind::Int,
        None => ValueKind::Void,
    }
}

pub fn lower_field(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    object: &cx_ast::Expression,
    name: &str,
    arrow: bool,
    mode: ExprMode,
    token: SourceToken,
) -> LoweringResult<TypedValue> {
    let object_val = lower_expression(engine, cx, object, ExprMode::Load)?;
    let Some(owner_ty) = object_val.type_index else {
        let sep = if arrow { "->" } else { "." };
        return Err(LoweringError::internal(
            format!("member access `{sep}{name}` on an object with no resolved struct type"),
            token,
        ));
    };
    let name_handle = cx.interner.intern(name);
    let Some((member, owning_struct, offset)) = find_member_with_offset(cx, owner_ty, name_handle) else {
        return Err(LoweringError::UndefinedSymbol { name: name.to_string(), token });
    };

    let accessor_fn = engine.current_function_name.clone();
    if !check_access(
        &cx.types,
        &cx.interner,
        owning_struct,
        member.access,
        engine.current_struct,
        accessor_fn.as_deref(),
    ) && !cx.flags.access_control_disabled
    {
        let owner_name = cx
            .types
            .get(owning_struct)
            .and_then(|t| cx.interner.resolve(t.name))
            .map(|s| s.to_string())
            .unwrap_or_default();
        return Err(LoweringError::AccessViolation { owner: owner_name, member: name.to_string() });
    }

    match mode {
        ExprMode::Load => {
            let result = engine.fresh_prvalue();
            push(
                &mut engine.ir,
                Opcode::MemberLoad(MemberLoadOp {
                    object: object_val,
                    member_name: name_handle,
                    offset,
                    bitfield_width: member.bitfield_width,
                    bitfield_bit_offset: member.bitfield_bit_offset,
                    is_pointer_to_member: arrow,
                    result,
                }),
                token,
            );
            Ok(TypedValue::temp(value_kind_of_type(cx, member.ty), member.size_in_bits, result)
                .with_type_index(member.ty))
        }
        ExprMode::LValueAddress => {
            let base = match object_val.value {
                cx_ir::ValueOperand::Temp(var) => LValueBase::Temp(var),
                cx_ir::ValueOperand::Name(n) => LValueBase::Named(n),
                _ => {
                    return Err(LoweringError::internal(
                        "member lvalue base is neither a temp nor a name",
                        token,
                    ))
                }
            };
            let mut info = LValueInfo::member(base, name_handle, offset);
            info.is_pointer_to_member = arrow;
            info.bitfield_width = member.bitfield_width;
            info.bitfield_bit_offset = member.bitfield_bit_offset;
            let var = engine.temps.fresh(TempVarMetadata::lvalue(info));
            Ok(TypedValue::temp(value_kind_of_type(cx, member.ty), member.size_in_bits, var)
                .with_type_index(member.ty))
        }
    }
}
