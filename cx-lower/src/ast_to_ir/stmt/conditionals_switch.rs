//! `if`/`switch` lowering (§4.3 Conditionals and switch).

use super::{lower_statement, lower_statement_or_block};
use crate::ast_to_ir::expr::lower_expression;
use crate::ast_to_ir::{AstToIr, ExprMode, LoopFrame};
use crate::context::CompilerContext;
use crate::errors::LoweringResult;
use cx_ast::{Expression, SourceToken, Statement, SwitchCase};
use cx_ir::{push, BinOpKind, BinaryOpPayload, ConditionalJumpOp, JumpOp, LabelOp, Opcode, TypedValue, ValueKind};

pub fn lower_if(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    condition: &Expression,
    then_branch: &Statement,
    else_branch: Option<&Statement>,
) -> LoweringResult<()> {
    let token = SourceToken::unknown();
    let then_label = engine.fresh_label(cx, "if_then");
    let else_label = engine.fresh_label(cx, "if_else");
    let end_label = engine.fresh_label(cx, "if_end");

    let cond_val = lower_expression(engine, cx, condition, ExprMode::Load)?;
    let false_target = if else_branch.is_some() { else_label } else { end_label };
    push(
        &mut engine.ir,
        Opcode::ConditionalJump(ConditionalJumpOp { condition: cond_val, true_label: then_label, false_label: false_target }),
        token,
    );

    push(&mut engine.ir, Opcode::Label(LabelOp { name: then_label }), token);
    lower_statement_or_block(engine, cx, then_branch)?;

    if let Some(else_stmt) = else_branch {
        push(&mut engine.ir, Opcode::Jump(JumpOp { target: end_label }), token);
        push(&mut engine.ir, Opcode::Label(LabelOp { name: else_label }), token);
        lower_statement_or_block(engine, cx, else_stmt)?;
    }

    push(&mut engine.ir, Opcode::Label(LabelOp { name: end_label }), token);
    Ok(())
}

/// `switch` (§4.3): case values must be integral constants. Dense integer
/// case sets are flagged for the backend's jump-table lowering by logging
/// the observation — the IR contract here carries no distinct jump-table
/// payload, so both dense and sparse cases compile to the same cascaded
/// `ConditionalJump` chain, leaving the table-vs-cascade choice to codegen.
pub fn lower_switch(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    value: &Expression,
    cases: &[SwitchCase],
) -> LoweringResult<()> {
    let token = SourceToken::unknown();
    let value_val = lower_expression(engine, cx, value, ExprMode::Load)?;

    let case_labels: Vec<(Option<i64>, cx_ir::StringHandle)> = cases
        .iter()
        .enumerate()
        .map(|(i, case)| (case.value, engine.fresh_label(cx, &format!("case_{i}"))))
        .collect();
    let end_label = engine.fresh_label(cx, "switch_end");

    if is_dense(cases) {
        log::debug!("switch has dense integer cases, eligible for jump-table lowering downstream");
    }

    let default_label = case_labels
        .iter()
        .find(|(v, _)| v.is_none())
        .map(|(_, l)| *l)
        .unwrap_or(end_label);

    let mut next_check = engine.fresh_label(cx, "case_check");
    push(&mut engine.ir, Opcode::Jump(JumpOp { target: next_check }), token);
    for (case_value, label) in &case_labels {
        push(&mut engine.ir, Opcode::Label(LabelOp { name: next_check }), token);
        let Some(cv) = case_value else {
            next_check = engine.fresh_label(cx, "case_check");
            push(&mut engine.ir, Opcode::Jump(JumpOp { target: next_check }), token);
            continue;
        };
        let cmp_result = engine.fresh_prvalue();
        push(
            &mut engine.ir,
            Opcode::BinaryOp(BinaryOpPayload {
                op: BinOpKind::Eq,
                lhs: value_val.clone(),
                rhs: TypedValue::int_literal(*cv as u64, 64),
                result: cmp_result,
            }),
            token,
        );
        next_check = engine.fresh_label(cx, "case_check");
        push(
            &mut engine.ir,
            Opcode::ConditionalJump(ConditionalJumpOp {
                condition: TypedValue::temp(ValueKind::Bool, 1, cmp_result),
                true_label: *label,
                false_label: next_check,
            }),
            token,
        );
    }
    push(&mut engine.ir, Opcode::Label(LabelOp { name: next_check }), token);
    push(&mut engine.ir, Opcode::Jump(JumpOp { target: default_label }), token);

    // `switch` is `break`-reachable but not a loop: `continue_label` is never
    // consulted since `continue` only reads `loop_stack`.
    let frame = LoopFrame {
        continue_label: end_label,
        break_label: end_label,
        seh_depth: engine.seh_stack.len(),
        destructor_depth: engine.destructor_scopes.len(),
    };
    engine.break_stack.push(frame);

    for ((_, label), case) in case_labels.iter().zip(cases.iter()) {
        push(&mut engine.ir, Opcode::Label(LabelOp { name: *label }), token);
        for stmt in &case.body {
            lower_statement(engine, cx, stmt)?;
        }
    }

    engine.break_stack.pop();
    push(&mut engine.ir, Opcode::Label(LabelOp { name: end_label }), token);
    Ok(())
}

fn is_dense(cases: &[SwitchCase]) -> bool {
    let values: Vec<i64> = cases.iter().filter_map(|c| c.value).collect();
    if values.len() < 2 {
        return false;
    }
    let min = *values.iter().min().unwrap_or(&0);
    let max = *values.iter().max().unwrap_or(&0);
    let span = (max - min).unsigned_abs() as usize;
    span > 0 && span < values.len() * 4
}
