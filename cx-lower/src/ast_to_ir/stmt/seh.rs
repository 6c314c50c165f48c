//! Exception & SEH scaffolding (§4.5) — `try`/`catch` as an external
//! landing-pad concern, `__try`/`__except`/`__finally`/`__leave` modeled at
//! IR level via `AstToIr::seh_stack`.

use super::lower_nested_block;
use crate::ast_to_ir::expr::lower_expression;
use crate::ast_to_ir::{AstToIr, ExprMode, SehContext};
use crate::context::CompilerContext;
use crate::errors::LoweringResult;
use cx_ast::{Block, CatchClause, SehHandler, SourceToken, SymbolEntry, SymbolKind};
use cx_ir::{push, JumpOp, LabelOp, Opcode};

/// `try`/`catch` (§4.5): C++ exceptions unwind via the backend's unwind
/// tables, not explicit IR branches — the landing pad itself is out of
/// scope here. The body and each handler just get their own scope.
pub fn lower_try(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    body: &Block,
    catches: &[CatchClause],
) -> LoweringResult<()> {
    let token = SourceToken::unknown();
    let end_label = engine.fresh_label(cx, "try_end");

    lower_nested_block(engine, cx, body)?;
    push(&mut engine.ir, Opcode::Jump(JumpOp { target: end_label }), token);

    for catch in catches {
        engine.symbols.enter_scope();
        if let Some(binding) = &catch.binding {
            let ty = catch.exception_ty.clone().unwrap_or(cx_ast::Type::I32);
            engine.symbols.insert(binding, SymbolEntry { kind: SymbolKind::Variable, ty, decl: None });
        }
        engine.destructor_scopes.push(Vec::new());
        super::lower_block(engine, cx, &catch.body)?;
        engine.exit_destructor_scope(cx, token);
        engine.symbols.exit_scope();
        push(&mut engine.ir, Opcode::Jump(JumpOp { target: end_label }), token);
    }

    push(&mut engine.ir, Opcode::Label(LabelOp { name: end_label }), token);
    Ok(())
}

/// `__try`/`__except`/`__finally` (§4.5): pushes a `SehContext` before
/// lowering the guarded body so any `return`/`break`/`continue` inside it
/// unwinds through the handler via `AstToIr::emit_unwind_to`.
pub fn lower_seh_try(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    body: &Block,
    handler: &SehHandler,
) -> LoweringResult<()> {
    let token = SourceToken::unknown();
    let try_end_label = engine.fresh_label(cx, "seh_try_end");
    let finally_label = match handler {
        SehHandler::Finally(_) => Some(engine.fresh_label(cx, "seh_finally")),
        SehHandler::Except { .. } => None,
    };

    engine.seh_stack.push(SehContext {
        try_end_label,
        finally_label,
        has_finally: matches!(handler, SehHandler::Finally(_)),
    });
    lower_nested_block(engine, cx, body)?;
    engine.seh_stack.pop();

    push(&mut engine.ir, Opcode::Label(LabelOp { name: try_end_label }), token);

    match handler {
        SehHandler::Except { filter, body: handler_body } => {
            lower_expression(engine, cx, filter, ExprMode::Load)?;
            lower_nested_block(engine, cx, handler_body)?;
        }
        SehHandler::Finally(finally_body) => {
            let Some(label) = finally_label else { unreachable!("finally_label set above") };
            push(&mut engine.ir, Opcode::Label(LabelOp { name: label }), token);
            lower_nested_block(engine, cx, finally_body)?;
        }
    }
    Ok(())
}

/// `__leave` (§4.5): jumps straight to the innermost `__try`'s end label,
/// skipping any remaining statements in the guarded body.
pub fn lower_seh_leave(engine: &mut AstToIr, cx: &mut CompilerContext, token: SourceToken) {
    let Some(ctx) = engine.seh_stack.last() else { return };
    let target = ctx.try_end_label;
    let _ = cx;
    push(&mut engine.ir, Opcode::Jump(JumpOp { target }), token);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::abi::TargetAbi;
    use cx_ast::SymbolTable;

    /// `__leave` outside any `__try` (malformed input a real parser would
    /// reject earlier) is a no-op rather than a panic.
    #[test]
    fn leave_outside_try_is_noop() {
        let mut engine = AstToIr::new(SymbolTable::new());
        let mut cx = CompilerContext::new(TargetAbi::SysV);
        lower_seh_leave(&mut engine, &mut cx, SourceToken::unknown());
        assert!(engine.ir.is_empty());
    }

    #[test]
    fn leave_jumps_to_innermost_try_end_label() {
        let mut engine = AstToIr::new(SymbolTable::new());
        let cx = CompilerContext::new(TargetAbi::SysV);
        let try_end_label = engine.fresh_label(&cx, "seh_try_end");
        engine.seh_stack.push(SehContext { try_end_label, finally_label: None, has_finally: false });
        let mut cx = cx;
        lower_seh_leave(&mut engine, &mut cx, SourceToken::unknown());
        match &engine.ir.last().unwrap().opcode {
            Opcode::Jump(j) => assert_eq!(j.target, try_end_label),
            other => panic!("expected Jump, got {other:?}"),
        }
    }
}
