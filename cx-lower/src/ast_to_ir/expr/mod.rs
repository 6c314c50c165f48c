//! Expression lowering (§4.2) — one emitter per AST variant, dispatched on
//! whether the caller wants a value (`Load`) or an address to assign through
//! (`LValueAddress`).

pub mod array_subscript;
pub mod calls;
pub mod casts;
pub mod identifiers;
pub mod initializers;
pub mod lambdas;
pub mod member_access;
pub mod new_delete;
pub mod type_traits;

use super::{AstToIr, ExprMode};
use crate::context::CompilerContext;
use crate::errors::LoweringResult;
use cx_ast::{Expression, SourceToken};
use cx_ir::{
    push, AssignmentOp, BinOpKind, BinaryOpPayload, ConditionalJumpOp, DereferenceStoreOp,
    GlobalStoreOp, JumpOp, LValueBase, LValueKind, MemberStoreOp, Opcode, TempVarMetadata,
    TypedValue, UnOpKind, UnaryOpPayload, ValueKind, ValueOperand,
};

pub fn lower_expression(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    expr: &Expression,
    mode: ExprMode,
) -> LoweringResult<TypedValue> {
    match expr {
        Expression::IntLiteral(v) => Ok(TypedValue::int_literal(*v as u64, 32)),
        Expression::FloatLiteral(v) => Ok(TypedValue::float_literal(*v, 64)),
        Expression::BoolLiteral(v) => Ok(TypedValue {
            kind: ValueKind::Bool,
            ..TypedValue::int_literal(*v as u64, 1)
        }),
        Expression::StringLiteral(s) => {
            let handle = cx.interner.intern(s);
            Ok(TypedValue {
                kind: ValueKind::Pointer,
                size_in_bits: 64,
                value: ValueOperand::Name(handle),
                pointer_depth: Some(1),
                ref_qualifier: None,
                cv_qualifier: Default::default(),
                type_index: None,
            })
        }
        Expression::Ident(name) => {
            identifiers::lower_identifier(engine, cx, name, mode, SourceToken::unknown())
        }
        Expression::QualifiedIdent { owner, name } => {
            identifiers::lower_qualified_identifier(engine, cx, owner, name, mode)
        }
        Expression::Unary { op, operand, token } => lower_unary(engine, cx, *op, operand, mode, *token),
        Expression::Binary { op, lhs, rhs, token } => lower_binary(engine, cx, *op, lhs, rhs, *token),
        Expression::Ternary { cond, then_val, else_val } => {
            lower_ternary(engine, cx, cond, then_val, else_val)
        }
        Expression::Assign { target, value } => lower_assign(engine, cx, target, value),
        Expression::Cast { kind, target_ty, operand } => {
            casts::lower_cast(engine, cx, *kind, target_ty, operand, mode)
        }
        Expression::SizeOf(ty) => type_traits::lower_sizeof(engine, cx, ty),
        Expression::AlignOf(ty) => type_traits::lower_alignof(engine, cx, ty),
        Expression::OffsetOf { struct_ty, member } => {
            type_traits::lower_offsetof(engine, cx, struct_ty, member)
        }
        Expression::TypeTrait { trait_name, operands } => {
            type_traits::lower_type_trait(engine, cx, trait_name, operands)
        }
        Expression::New { ty, array_len, args, placement } => {
            new_delete::lower_new(engine, cx, ty, array_len.as_deref(), args, placement.as_deref())
        }
        Expression::Delete { operand, is_array } => new_delete::lower_delete(engine, cx, operand, *is_array),
        Expression::Index { array, indices, token } => {
            array_subscript::lower_index(engine, cx, array, indices, mode, *token)
        }
        Expression::Field { object, name, arrow, token } => {
            member_access::lower_field(engine, cx, object, name, *arrow, mode, *token)
        }
        Expression::Call { callee, args, resolved_decl, token } => {
            calls::lower_call(engine, cx, callee, args, *resolved_decl, *token)
        }
        Expression::MethodCall { object, method, args, resolved_decl, arrow, token } => {
            calls::lower_method_call(engine, cx, object, method, args, *resolved_decl, *arrow, *token)
        }
        Expression::ConstructorCall { struct_name, args, resolved_decl } => {
            calls::lower_constructor_call(engine, cx, struct_name, args, *resolved_decl)
        }
        Expression::Lambda { id, captures, params, return_type, body, is_generic } => {
            lambdas::lower_lambda_expression(
                engine,
                cx,
                *id,
                captures,
                params,
                return_type.as_ref(),
                body,
                *is_generic,
            )
        }
        Expression::InitializerList { struct_name, positional, designated } => {
            initializers::lower_initializer_list(engine, cx, struct_name.as_deref(), positional, designated)
        }
        Expression::Typeid(inner) => type_traits::lower_typeid(engine, cx, inner),
        Expression::DynamicCast { target_ty, operand, as_reference } => {
            casts::lower_dynamic_cast(engine, cx, target_ty, operand, *as_reference)
        }
    }
}

fn lower_unary(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    op: cx_ast::UnaryOp,
    operand: &Expression,
    mode: ExprMode,
    token: SourceToken,
) -> LoweringResult<TypedValue> {
    use cx_ast::UnaryOp;
    match op {
        UnaryOp::AddressOf => {
            let addr_of = lower_expression(engine, cx, operand, ExprMode::LValueAddress)?;
            let result = engine.fresh_prvalue();
            push(
                &mut engine.ir,
                Opcode::AddressOf(cx_ir::AddressOfOp { operand: addr_of, result }),
                token,
            );
            Ok(TypedValue::temp(ValueKind::Pointer, 64, result).with_pointer_depth(1))
        }
        UnaryOp::Deref => {
            let pointer = lower_expression(engine, cx, operand, ExprMode::Load)?;
            if mode == ExprMode::LValueAddress {
                let result = engine.fresh_indirect(pointer.clone());
                return Ok(TypedValue::temp(ValueKind::Struct, 0, result));
            }
            let result = engine.fresh_prvalue();
            push(
                &mut engine.ir,
                Opcode::Dereference(cx_ir::DereferenceOp { pointer, result }),
                token,
            );
            Ok(TypedValue::temp(ValueKind::Int, 32, result))
        }
        UnaryOp::Neg | UnaryOp::Not | UnaryOp::BitNot => {
            let value = lower_expression(engine, cx, operand, ExprMode::Load)?;
            let kind = match op {
                UnaryOp::Neg => UnOpKind::Neg,
                UnaryOp::Not => UnOpKind::Not,
                UnaryOp::BitNot => UnOpKind::BitNot,
                _ => unreachable!(),
            };
            let result = engine.fresh_prvalue();
            push(
                &mut engine.ir,
                Opcode::UnaryOp(UnaryOpPayload { op: kind, operand: value.clone(), result }),
                token,
            );
            Ok(TypedValue::temp(value.kind, value.size_in_bits, result))
        }
        UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
            let addr = lower_expression(engine, cx, operand, ExprMode::LValueAddress)?;
            let current = lower_expression(engine, cx, operand, ExprMode::Load)?;
            let one = TypedValue::int_literal(1, current.size_in_bits.max(32));
            let bin_kind = match op {
                UnaryOp::PreInc | UnaryOp::PostInc => BinOpKind::Add,
                _ => BinOpKind::Sub,
            };
            let result = engine.fresh_prvalue();
            push(
                &mut engine.ir,
                Opcode::BinaryOp(BinaryOpPayload {
                    op: bin_kind,
                    lhs: current.clone(),
                    rhs: one,
                    result,
                }),
                token,
            );
            let new_value = TypedValue::temp(current.kind, current.size_in_bits, result);
            store_to_lvalue(engine, &addr, new_value.clone(), token)?;
            Ok(match op {
                UnaryOp::PostInc | UnaryOp::PostDec => current,
                _ => new_value,
            })
        }
    }
}

fn lower_binary(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    op: cx_ast::BinaryOp,
    lhs: &Expression,
    rhs: &Expression,
    token: SourceToken,
) -> LoweringResult<TypedValue> {
    use cx_ast::BinaryOp;
    if matches!(op, BinaryOp::LogicalAnd | BinaryOp::LogicalOr) {
        return lower_short_circuit(engine, cx, op, lhs, rhs, token);
    }
    let kind = match op {
        BinaryOp::Add => BinOpKind::Add,
        BinaryOp::Sub => BinOpKind::Sub,
        BinaryOp::Mul => BinOpKind::Mul,
        BinaryOp::Div => BinOpKind::Div,
        BinaryOp::Mod => BinOpKind::Mod,
        BinaryOp::BitAnd | BinaryOp::LogicalAnd => BinOpKind::BitAnd,
        BinaryOp::BitOr | BinaryOp::LogicalOr => BinOpKind::BitOr,
        BinaryOp::BitXor => BinOpKind::BitXor,
        BinaryOp::Shl => BinOpKind::Shl,
        BinaryOp::Shr => BinOpKind::Shr,
        BinaryOp::Eq => BinOpKind::Eq,
        BinaryOp::Ne => BinOpKind::Ne,
        BinaryOp::Lt => BinOpKind::Lt,
        BinaryOp::Le => BinOpKind::Le,
        BinaryOp::Gt => BinOpKind::Gt,
        BinaryOp::Ge => BinOpKind::Ge,
    };
    let lhs_val = lower_expression(engine, cx, lhs, ExprMode::Load)?;
    let rhs_val = lower_expression(engine, cx, rhs, ExprMode::Load)?;
    let result = engine.fresh_prvalue();
    let result_kind = match op {
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge
        | BinaryOp::LogicalAnd
        | BinaryOp::LogicalOr => ValueKind::Bool,
        _ => lhs_val.kind,
    };
    push(
        &mut engine.ir,
        Opcode::BinaryOp(BinaryOpPayload { op: kind, lhs: lhs_val, rhs: rhs_val, result }),
        token,
    );
    Ok(TypedValue::temp(result_kind, 32, result))
}

/// `&&`/`||` short-circuit lowering (§4.3): the right operand is only
/// evaluated when the left doesn't already settle the result.
fn lower_short_circuit(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    op: cx_ast::BinaryOp,
    lhs: &Expression,
    rhs: &Expression,
    token: SourceToken,
) -> LoweringResult<TypedValue> {
    use cx_ast::BinaryOp;
    let rhs_label = engine.fresh_label(cx, "sc_rhs");
    let end_label = engine.fresh_label(cx, "sc_end");
    let result_var = engine.fresh_label(cx, "sc_result");

    let lhs_val = lower_expression(engine, cx, lhs, ExprMode::Load)?;
    let (true_label, false_label) = match op {
        BinaryOp::LogicalAnd => (rhs_label, end_label),
        _ => (end_label, rhs_label),
    };
    push(
        &mut engine.ir,
        Opcode::ConditionalJump(ConditionalJumpOp { condition: lhs_val, true_label, false_label }),
        token,
    );

    // Short-circuit arm: `&&` settles to false here, `||` settles to true.
    let settled = matches!(op, BinaryOp::LogicalOr);
    push(
        &mut engine.ir,
        Opcode::Assignment(AssignmentOp { target_name: result_var, value: TypedValue { kind: ValueKind::Bool, ..TypedValue::int_literal(settled as u64, 1) } }),
        token,
    );
    push(&mut engine.ir, Opcode::Jump(JumpOp { target: end_label }), token);

    push(&mut engine.ir, Opcode::Label(cx_ir::LabelOp { name: rhs_label }), token);
    let rhs_val = lower_expression(engine, cx, rhs, ExprMode::Load)?;
    push(&mut engine.ir, Opcode::Assignment(AssignmentOp { target_name: result_var, value: rhs_val }), token);

    push(&mut engine.ir, Opcode::Label(cx_ir::LabelOp { name: end_label }), token);
    let result = engine.fresh_prvalue();
    push(
        &mut engine.ir,
        Opcode::GlobalLoad(cx_ir::GlobalLoadOp { name: result_var, result }),
        token,
    );
    Ok(TypedValue { kind: ValueKind::Bool, ..TypedValue::temp(ValueKind::Bool, 1, result) })
}

fn lower_ternary(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    cond: &Expression,
    then_val: &Expression,
    else_val: &Expression,
) -> LoweringResult<TypedValue> {
    let token = SourceToken::unknown();
    let then_label = engine.fresh_label(cx, "cond_then");
    let else_label = engine.fresh_label(cx, "cond_else");
    let end_label = engine.fresh_label(cx, "cond_end");
    let result_var = engine.fresh_label(cx, "cond_result");

    let cond_val = lower_expression(engine, cx, cond, ExprMode::Load)?;
    push(
        &mut engine.ir,
        Opcode::ConditionalJump(ConditionalJumpOp { condition: cond_val, true_label: then_label, false_label: else_label }),
        token,
    );

    push(&mut engine.ir, Opcode::Label(cx_ir::LabelOp { name: then_label }), token);
    let then_result = lower_expression(engine, cx, then_val, ExprMode::Load)?;
    push(&mut engine.ir, Opcode::Assignment(AssignmentOp { target_name: result_var, value: then_result.clone() }), token);
    push(&mut engine.ir, Opcode::Jump(JumpOp { target: end_label }), token);

    push(&mut engine.ir, Opcode::Label(cx_ir::LabelOp { name: else_label }), token);
    let else_result = lower_expression(engine, cx, else_val, ExprMode::Load)?;
    push(&mut engine.ir, Opcode::Assignment(AssignmentOp { target_name: result_var, value: else_result }), token);

    push(&mut engine.ir, Opcode::Label(cx_ir::LabelOp { name: end_label }), token);
    let result = engine.fresh_prvalue();
    push(
        &mut engine.ir,
        Opcode::GlobalLoad(cx_ir::GlobalLoadOp { name: result_var, result }),
        token,
    );
    Ok(TypedValue::temp(then_result.kind, then_result.size_in_bits, result))
}

fn lower_assign(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    target: &Expression,
    value: &Expression,
) -> LoweringResult<TypedValue> {
    let token = SourceToken::unknown();
    let addr = lower_expression(engine, cx, target, ExprMode::LValueAddress)?;
    let rhs = lower_expression(engine, cx, value, ExprMode::Load)?;
    store_to_lvalue(engine, &addr, rhs.clone(), token)?;
    Ok(rhs)
}

/// Dispatches a store through an lvalue-tagged `TypedValue` to the right
/// opcode based on its `LValueInfo::kind` (§4.1).
pub fn store_to_lvalue(
    engine: &mut AstToIr,
    addr: &TypedValue,
    value: TypedValue,
    token: SourceToken,
) -> LoweringResult<()> {
    let var = match &addr.value {
        ValueOperand::Temp(var) => *var,
        ValueOperand::Name(name) => {
            // A bare name (e.g. a global resolved directly to `Name`) stores
            // by mangled name.
            push(&mut engine.ir, Opcode::GlobalStore(GlobalStoreOp { name: *name, value }), token);
            return Ok(());
        }
        _ => return Ok(()),
    };
    let Some(meta) = engine.temps.metadata(var) else {
        return Ok(());
    };
    let Some(info) = meta.lvalue.clone() else {
        return Ok(());
    };
    match info.kind {
        LValueKind::Direct | LValueKind::Temporary => {
            if let LValueBase::Named(name) = info.base {
                push(&mut engine.ir, Opcode::Assignment(AssignmentOp { target_name: name, value }), token);
            }
        }
        LValueKind::Indirect => {
            push(
                &mut engine.ir,
                Opcode::DereferenceStore(DereferenceStoreOp { pointer: addr.clone(), value }),
                token,
            );
        }
        LValueKind::Member => {
            let Some(member_name) = info.member_name else { return Ok(()) };
            push(
                &mut engine.ir,
                Opcode::MemberStore(MemberStoreOp {
                    object: addr.clone(),
                    member_name,
                    offset: info.offset,
                    value,
                    bitfield_width: info.bitfield_width,
                    bitfield_bit_offset: info.bitfield_bit_offset,
                    is_pointer_to_member: info.is_pointer_to_member,
                }),
                token,
            );
        }
        LValueKind::ArrayElement => {
            let Some(index) = info.array_index else { return Ok(()) };
            push(
                &mut engine.ir,
                Opcode::ArrayStore(cx_ir::ArrayStoreOp {
                    array: addr.clone(),
                    index: *index,
                    element_type_index: value.type_index,
                    element_size_in_bits: value.size_in_bits,
                    member_offset: info.offset,
                    is_pointer_to_array: info.is_pointer_to_array,
                    value,
                }),
                token,
            );
        }
        LValueKind::Global => {
            if let LValueBase::Named(name) = info.base {
                push(&mut engine.ir, Opcode::GlobalStore(GlobalStoreOp { name, value }), token);
            }
        }
    }
    Ok(())
}

impl AstToIr {
    /// Allocates a temporary tagged `LValue`/`Indirect` through `pointer`,
    /// used by `*p` in address-taking position.
    pub fn fresh_indirect(&mut self, pointer: TypedValue) -> cx_ir::TempVar {
        let base = match pointer.value {
            ValueOperand::Temp(var) => LValueBase::Temp(var),
            ValueOperand::Name(name) => LValueBase::Named(name),
            _ => LValueBase::Temp(cx_ir::TempVar { var_number: 0 }),
        };
        self.temps.fresh(TempVarMetadata::lvalue(cx_ir::LValueInfo::indirect(base)))
    }
}
