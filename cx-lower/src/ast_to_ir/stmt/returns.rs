//! `return`/`throw` lowering (§4.3, §4.5) — full stack unwind before
//! transferring control out of the function.

use crate::ast_to_ir::expr::lower_expression;
use crate::ast_to_ir::{AstToIr, ExprMode};
use crate::context::CompilerContext;
use crate::errors::LoweringResult;
use cx_ast::{Expression, SourceToken};
use cx_ir::{push, CallOp, Opcode, ReturnOp};

/// `return` (§4.3 Return, §4.5): unwinds every enclosing SEH finally-funclet
/// and destructor scope — the whole stack, not just the innermost — before
/// emitting `Return`. The unwind never pops the real stacks; there is no
/// statement after a `return` that could observe them popped.
pub fn lower_return(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    value: Option<&Expression>,
    token: SourceToken,
) -> LoweringResult<()> {
    let return_val = match value {
        Some(expr) => Some(lower_expression(engine, cx, expr, ExprMode::Load)?),
        None => None,
    };
    engine.emit_unwind_to(cx, 0, 0, token);
    push(&mut engine.ir, Opcode::Return(ReturnOp { value: return_val }), token);
    Ok(())
}

/// `throw` (§4.5): C++ exceptions are modeled as an external runtime call —
/// the thrown value (if any) is lowered and handed to a runtime throw helper;
/// the unwind itself is the backend's/runtime's job, not this pass's.
pub fn lower_throw(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    value: Option<&Expression>,
    token: SourceToken,
) -> LoweringResult<()> {
    let arg = match value {
        Some(expr) => vec![lower_expression(engine, cx, expr, ExprMode::Load)?],
        None => vec![],
    };
    let handle = engine.declare_runtime_symbol(cx, "__cxx_throw");
    let result = engine.fresh_prvalue();
    push(
        &mut engine.ir,
        Opcode::Call(CallOp { function_name: handle, args: arg, result, return_slot: None }),
        token,
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::abi::TargetAbi;
    use crate::context::CompilerContext;
    use cx_ast::SymbolTable;

    fn engine_cx() -> (AstToIr, CompilerContext) {
        (AstToIr::new(SymbolTable::new()), CompilerContext::new(TargetAbi::SysV))
    }

    #[test]
    fn bare_return_emits_no_value() {
        let (mut engine, mut cx) = engine_cx();
        lower_return(&mut engine, &mut cx, None, SourceToken::unknown()).unwrap();
        let Opcode::Return(ReturnOp { value }) = &engine.ir.last().unwrap().opcode else {
            panic!("expected a Return opcode")
        };
        assert!(value.is_none());
    }

    /// `throw;` twice only declares `__cxx_throw` once (§4.6 declaration
    /// idempotence applies to runtime symbols the same as user functions).
    #[test]
    fn throw_declares_runtime_symbol_once() {
        let (mut engine, mut cx) = engine_cx();
        lower_throw(&mut engine, &mut cx, None, SourceToken::unknown()).unwrap();
        lower_throw(&mut engine, &mut cx, None, SourceToken::unknown()).unwrap();
        let decls = engine.ir.iter().filter(|i| matches!(i.opcode, Opcode::FunctionDecl(_))).count();
        assert_eq!(decls, 1);
    }
}
