//! Loop lowering (§4.3 Loops) — `for`/`while`/`do…while`/ranged-`for` to
//! labeled blocks with explicit start/body/increment/end labels, plus
//! `break`/`continue` unwinding scoped to the loop's entry depth.

use super::{lower_nested_block, lower_statement_or_block};
use crate::ast_to_ir::expr::lower_expression;
use crate::ast_to_ir::{AstToIr, ExprMode, LoopFrame};
use crate::context::CompilerContext;
use crate::errors::LoweringResult;
use crate::mangling;
use cx_ast::{Expression, SourceToken, Statement, SymbolEntry, SymbolKind, Type};
use cx_ir::{
    push, CallOp, ConditionalJumpOp, JumpOp, LabelOp, Opcode, TypedValue, ValueKind, ValueOperand,
};

fn push_loop_frame(engine: &mut AstToIr, continue_label: cx_ir::StringHandle, break_label: cx_ir::StringHandle) {
    let frame = LoopFrame {
        continue_label,
        break_label,
        seh_depth: engine.seh_stack.len(),
        destructor_depth: engine.destructor_scopes.len(),
    };
    engine.loop_stack.push(frame);
    engine.break_stack.push(frame);
}

fn pop_loop_frame(engine: &mut AstToIr) {
    engine.loop_stack.pop();
    engine.break_stack.pop();
}

pub fn lower_while(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    condition: &Expression,
    body: &Statement,
) -> LoweringResult<()> {
    let token = SourceToken::unknown();
    let start_label = engine.fresh_label(cx, "loop_start");
    let body_label = engine.fresh_label(cx, "loop_body");
    let end_label = engine.fresh_label(cx, "loop_end");

    push(&mut engine.ir, Opcode::Label(LabelOp { name: start_label }), token);
    let cond_val = lower_expression(engine, cx, condition, ExprMode::Load)?;
    push(
        &mut engine.ir,
        Opcode::ConditionalJump(ConditionalJumpOp { condition: cond_val, true_label: body_label, false_label: end_label }),
        token,
    );
    push(&mut engine.ir, Opcode::Label(LabelOp { name: body_label }), token);

    push_loop_frame(engine, start_label, end_label);
    lower_statement_or_block(engine, cx, body)?;
    pop_loop_frame(engine);

    push(&mut engine.ir, Opcode::Jump(JumpOp { target: start_label }), token);
    push(&mut engine.ir, Opcode::Label(LabelOp { name: end_label }), token);
    Ok(())
}

pub fn lower_do_while(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    condition: &Expression,
    body: &Statement,
) -> LoweringResult<()> {
    let token = SourceToken::unknown();
    let body_label = engine.fresh_label(cx, "loop_body");
    let cond_label = engine.fresh_label(cx, "loop_cond");
    let end_label = engine.fresh_label(cx, "loop_end");

    push(&mut engine.ir, Opcode::Label(LabelOp { name: body_label }), token);
    push_loop_frame(engine, cond_label, end_label);
    lower_statement_or_block(engine, cx, body)?;
    pop_loop_frame(engine);

    push(&mut engine.ir, Opcode::Label(LabelOp { name: cond_label }), token);
    let cond_val = lower_expression(engine, cx, condition, ExprMode::Load)?;
    push(
        &mut engine.ir,
        Opcode::ConditionalJump(ConditionalJumpOp { condition: cond_val, true_label: body_label, false_label: end_label }),
        token,
    );
    push(&mut engine.ir, Opcode::Label(LabelOp { name: end_label }), token);
    Ok(())
}

pub fn lower_for(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    init: Option<&Statement>,
    condition: Option<&Expression>,
    step: Option<&Expression>,
    body: &Statement,
) -> LoweringResult<()> {
    let token = SourceToken::unknown();
    engine.symbols.enter_scope();
    if let Some(init_stmt) = init {
        lower_statement(engine, cx, init_stmt)?;
    }

    let start_label = engine.fresh_label(cx, "loop_start");
    let body_label = engine.fresh_label(cx, "loop_body");
    let increment_label = engine.fresh_label(cx, "loop_incr");
    let end_label = engine.fresh_label(cx, "loop_end");

    push(&mut engine.ir, Opcode::Label(LabelOp { name: start_label }), token);
    if let Some(cond) = condition {
        let cond_val = lower_expression(engine, cx, cond, ExprMode::Load)?;
        push(
            &mut engine.ir,
            Opcode::ConditionalJump(ConditionalJumpOp { condition: cond_val, true_label: body_label, false_label: end_label }),
            token,
        );
    } else {
        push(&mut engine.ir, Opcode::Jump(JumpOp { target: body_label }), token);
    }
    push(&mut engine.ir, Opcode::Label(LabelOp { name: body_label }), token);

    push_loop_frame(engine, increment_label, end_label);
    lower_statement_or_block(engine, cx, body)?;
    pop_loop_frame(engine);

    push(&mut engine.ir, Opcode::Label(LabelOp { name: increment_label }), token);
    if let Some(step_expr) = step {
        lower_expression(engine, cx, step_expr, ExprMode::Load)?;
    }
    push(&mut engine.ir, Opcode::Jump(JumpOp { target: start_label }), token);
    push(&mut engine.ir, Opcode::Label(LabelOp { name: end_label }), token);

    engine.symbols.exit_scope();
    Ok(())
}

/// Ranged-for (§4.3 Loops): a compile-time-sized array range lowers to a
/// counter; anything else is assumed to expose the `begin()`/`end()`/
/// `operator!=`/`operator++`/`operator*` iterator protocol.
pub fn lower_ranged_for(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    decl_name: &str,
    decl_ty: &Type,
    range: &Expression,
    body: &Statement,
) -> LoweringResult<()> {
    let array_len = array_length_of(engine, range);
    match array_len {
        Some(len) => lower_ranged_for_array(engine, cx, decl_name, decl_ty, range, len, body),
        None => lower_ranged_for_iterator(engine, cx, decl_name, decl_ty, range, body),
    }
}

fn array_length_of(engine: &AstToIr, range: &Expression) -> Option<usize> {
    let Expression::Ident(name) = range else { return None };
    match &engine.symbols.lookup(name)?.ty {
        Type::Array(_, n) => Some(*n),
        _ => None,
    }
}

fn lower_ranged_for_array(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    decl_name: &str,
    decl_ty: &Type,
    range: &Expression,
    len: usize,
    body: &Statement,
) -> LoweringResult<()> {
    let token = SourceToken::unknown();
    engine.symbols.enter_scope();
    let counter_label = engine.fresh_label(cx, "rfor_i");
    push(
        &mut engine.ir,
        Opcode::Assignment(cx_ir::AssignmentOp { target_name: counter_label, value: TypedValue::int_literal(0, 64) }),
        token,
    );

    let start_label = engine.fresh_label(cx, "loop_start");
    let body_label = engine.fresh_label(cx, "loop_body");
    let increment_label = engine.fresh_label(cx, "loop_incr");
    let end_label = engine.fresh_label(cx, "loop_end");

    push(&mut engine.ir, Opcode::Label(LabelOp { name: start_label }), token);
    let counter_result = engine.fresh_prvalue();
    push(
        &mut engine.ir,
        Opcode::GlobalLoad(cx_ir::GlobalLoadOp { name: counter_label, result: counter_result }),
        token,
    );
    let counter_val = TypedValue::temp(ValueKind::Int, 64, counter_result);
    let cmp_result = engine.fresh_prvalue();
    push(
        &mut engine.ir,
        Opcode::BinaryOp(cx_ir::BinaryOpPayload {
            op: cx_ir::BinOpKind::Lt,
            lhs: counter_val.clone(),
            rhs: TypedValue::int_literal(len as u64, 64),
            result: cmp_result,
        }),
        token,
    );
    push(
        &mut engine.ir,
        Opcode::ConditionalJump(ConditionalJumpOp {
            condition: TypedValue::temp(ValueKind::Bool, 1, cmp_result),
            true_label: body_label,
            false_label: end_label,
        }),
        token,
    );
    push(&mut engine.ir, Opcode::Label(LabelOp { name: body_label }), token);

    let element = lower_expression(engine, cx, range, ExprMode::LValueAddress)?;
    let loaded_element_result = engine.fresh_prvalue();
    push(
        &mut engine.ir,
        Opcode::ArrayAccess(cx_ir::ArrayAccessOp {
            array: element,
            index: counter_val,
            element_type_index: None,
            element_size_in_bits: 32,
            member_offset: 0,
            is_pointer_to_array: false,
            result: loaded_element_result,
        }),
        token,
    );
    engine.symbols.insert(decl_name, SymbolEntry { kind: SymbolKind::Variable, ty: decl_ty.clone(), decl: None });
    let decl_handle = cx.interner.intern(decl_name);
    push(
        &mut engine.ir,
        Opcode::Assignment(cx_ir::AssignmentOp {
            target_name: decl_handle,
            value: TypedValue::temp(ValueKind::Int, 32, loaded_element_result),
        }),
        token,
    );

    push_loop_frame(engine, increment_label, end_label);
    lower_statement_or_block(engine, cx, body)?;
    pop_loop_frame(engine);

    push(&mut engine.ir, Opcode::Label(LabelOp { name: increment_label }), token);
    let counter_reload = engine.fresh_prvalue();
    push(
        &mut engine.ir,
        Opcode::GlobalLoad(cx_ir::GlobalLoadOp { name: counter_label, result: counter_reload }),
        token,
    );
    let incremented = engine.fresh_prvalue();
    push(
        &mut engine.ir,
        Opcode::BinaryOp(cx_ir::BinaryOpPayload {
            op: cx_ir::BinOpKind::Add,
            lhs: TypedValue::temp(ValueKind::Int, 64, counter_reload),
            rhs: TypedValue::int_literal(1, 64),
            result: incremented,
        }),
        token,
    );
    push(
        &mut engine.ir,
        Opcode::Assignment(cx_ir::AssignmentOp { target_name: counter_label, value: TypedValue::temp(ValueKind::Int, 64, incremented) }),
        token,
    );
    push(&mut engine.ir, Opcode::Jump(JumpOp { target: start_label }), token);
    push(&mut engine.ir, Opcode::Label(LabelOp { name: end_label }), token);
    engine.symbols.exit_scope();
    Ok(())
}

fn lower_ranged_for_iterator(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    decl_name: &str,
    decl_ty: &Type,
    range: &Expression,
    body: &Statement,
) -> LoweringResult<()> {
    let token = SourceToken::unknown();
    engine.symbols.enter_scope();

    let container = lower_expression(engine, cx, range, ExprMode::Load)?;
    let owner = struct_owner_of(engine, range);
    let it_label = engine.fresh_label(cx, "rfor_it");
    let end_it_label = engine.fresh_label(cx, "rfor_end_it");

    let begin = emit_member_call0(engine, cx, &owner, "begin", container.clone(), token);
    push(&mut engine.ir, Opcode::Assignment(cx_ir::AssignmentOp { target_name: it_label, value: begin }), token);
    let end_val = emit_member_call0(engine, cx, &owner, "end", container.clone(), token);
    push(&mut engine.ir, Opcode::Assignment(cx_ir::AssignmentOp { target_name: end_it_label, value: end_val }), token);

    let start_label = engine.fresh_label(cx, "loop_start");
    let body_label = engine.fresh_label(cx, "loop_body");
    let increment_label = engine.fresh_label(cx, "loop_incr");
    let end_label = engine.fresh_label(cx, "loop_end");

    push(&mut engine.ir, Opcode::Label(LabelOp { name: start_label }), token);
    let it_result = engine.fresh_prvalue();
    push(&mut engine.ir, Opcode::GlobalLoad(cx_ir::GlobalLoadOp { name: it_label, result: it_result }), token);
    let end_result = engine.fresh_prvalue();
    push(&mut engine.ir, Opcode::GlobalLoad(cx_ir::GlobalLoadOp { name: end_it_label, result: end_result }), token);
    let cmp_result = engine.fresh_prvalue();
    push(
        &mut engine.ir,
        Opcode::BinaryOp(cx_ir::BinaryOpPayload {
            op: cx_ir::BinOpKind::Ne,
            lhs: TypedValue::temp(ValueKind::Struct, 0, it_result),
            rhs: TypedValue::temp(ValueKind::Struct, 0, end_result),
            result: cmp_result,
        }),
        token,
    );
    push(
        &mut engine.ir,
        Opcode::ConditionalJump(ConditionalJumpOp {
            condition: TypedValue::temp(ValueKind::Bool, 1, cmp_result),
            true_label: body_label,
            false_label: end_label,
        }),
        token,
    );
    push(&mut engine.ir, Opcode::Label(LabelOp { name: body_label }), token);

    let it_for_deref = engine.fresh_prvalue();
    push(&mut engine.ir, Opcode::GlobalLoad(cx_ir::GlobalLoadOp { name: it_label, result: it_for_deref }), token);
    let dereferenced = emit_member_call0(engine, cx, &owner, "operator*", TypedValue::temp(ValueKind::Struct, 0, it_for_deref), token);
    engine.symbols.insert(decl_name, SymbolEntry { kind: SymbolKind::Variable, ty: decl_ty.clone(), decl: None });
    let decl_handle = cx.interner.intern(decl_name);
    push(&mut engine.ir, Opcode::Assignment(cx_ir::AssignmentOp { target_name: decl_handle, value: dereferenced }), token);

    push_loop_frame(engine, increment_label, end_label);
    lower_statement_or_block(engine, cx, body)?;
    pop_loop_frame(engine);

    push(&mut engine.ir, Opcode::Label(LabelOp { name: increment_label }), token);
    let it_for_incr = engine.fresh_prvalue();
    push(&mut engine.ir, Opcode::GlobalLoad(cx_ir::GlobalLoadOp { name: it_label, result: it_for_incr }), token);
    let advanced = emit_member_call0(engine, cx, &owner, "operator++", TypedValue::temp(ValueKind::Struct, 0, it_for_incr), token);
    push(&mut engine.ir, Opcode::Assignment(cx_ir::AssignmentOp { target_name: it_label, value: advanced }), token);
    push(&mut engine.ir, Opcode::Jump(JumpOp { target: start_label }), token);
    push(&mut engine.ir, Opcode::Label(LabelOp { name: end_label }), token);

    engine.symbols.exit_scope();
    Ok(())
}

fn struct_owner_of(engine: &AstToIr, range: &Expression) -> String {
    let Expression::Ident(name) = range else { return String::new() };
    match engine.symbols.lookup(name) {
        Some(entry) => match &entry.ty {
            Type::Named(n) => n.clone(),
            _ => String::new(),
        },
        None => String::new(),
    }
}

fn emit_member_call0(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    owner: &str,
    method: &str,
    object: TypedValue,
    token: SourceToken,
) -> TypedValue {
    let mangled = mangling::mangle_member_function(owner, method, &[]);
    let handle = cx.interner.intern(&mangled);
    let result = engine.fresh_prvalue();
    push(
        &mut engine.ir,
        Opcode::Call(CallOp { function_name: handle, args: vec![object], result, return_slot: None }),
        token,
    );
    TypedValue::temp(ValueKind::Struct, 0, result)
}

/// `break` (§4.3, §4.5): targets the innermost loop OR `switch`, whichever
/// was entered last, unwinding only the SEH/destructor contexts entered
/// inside it.
pub fn lower_break(engine: &mut AstToIr, cx: &mut CompilerContext, token: SourceToken) {
    let Some(frame) = engine.break_stack.last().copied() else { return };
    engine.emit_unwind_to(cx, frame.seh_depth, frame.destructor_depth, token);
    push(&mut engine.ir, Opcode::Jump(JumpOp { target: frame.break_label }), token);
}

/// `continue` (§4.3, §4.5): same unwind scope as `break`, jumps to the
/// loop's increment/condition-recheck label instead.
pub fn lower_continue(engine: &mut AstToIr, cx: &mut CompilerContext, token: SourceToken) {
    let Some(frame) = engine.loop_stack.last().copied() else { return };
    engine.emit_unwind_to(cx, frame.seh_depth, frame.destructor_depth, token);
    push(&mut engine.ir, Opcode::Jump(JumpOp { target: frame.continue_label }), token);
}

use super::lower_statement;
