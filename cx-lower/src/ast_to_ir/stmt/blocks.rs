//! `VariableDeclaration` lowering (§4.3 Blocks) — destructor-scope
//! registration for struct locals with a user-defined destructor.

use crate::ast_to_ir::expr::lower_expression;
use crate::ast_to_ir::{AstToIr, DestructorEntry, ExprMode};
use crate::context::CompilerContext;
use crate::errors::LoweringResult;
use crate::mangling;
use cx_ast::{Expression, SourceToken, SymbolEntry, SymbolKind, Type};
use cx_ir::{push, AssignmentOp, ConstructorCallOp, Opcode, TypedValue, ValueKind};

pub fn lower_var_decl(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    name: &str,
    ty: &Type,
    init: Option<&Expression>,
    token: SourceToken,
) -> LoweringResult<()> {
    engine.symbols.insert(
        name,
        SymbolEntry { kind: SymbolKind::Variable, ty: ty.clone(), decl: None },
    );
    let name_handle = cx.interner.intern(name);

    let struct_type = engine.resolve_type_index(cx, ty).filter(|idx| cx.types.struct_record(*idx).is_some());

    if let Some(struct_type) = struct_type {
        if let Some(init_expr) = init {
            let value = lower_expression(engine, cx, init_expr, ExprMode::Load)?;
            push(&mut engine.ir, Opcode::Assignment(AssignmentOp { target_name: name_handle, value }), token);
        } else {
            let struct_name = cx
                .types
                .get(struct_type)
                .and_then(|t| cx.interner.resolve(t.name))
                .map(|s| s.to_string())
                .unwrap_or_default();
            let mangled = mangling::mangle_constructor(&struct_name, &[]);
            let mangled_ctor = cx.interner.intern(&mangled);
            let object = TypedValue {
                kind: ValueKind::Struct,
                size_in_bits: 0,
                value: cx_ir::ValueOperand::Name(name_handle),
                pointer_depth: None,
                ref_qualifier: None,
                cv_qualifier: Default::default(),
                type_index: Some(struct_type),
            };
            push(
                &mut engine.ir,
                Opcode::ConstructorCall(ConstructorCallOp {
                    struct_type,
                    object,
                    args: vec![],
                    mangled_ctor,
                    is_heap_allocated: false,
                    use_return_slot: false,
                }),
                token,
            );
        }

        if let Some(dtor) = cx.types.struct_record(struct_type).and_then(|r| r.methods.iter().find(|m| m.is_destructor)) {
            if let Some(scope) = engine.destructor_scopes.last_mut() {
                scope.push(DestructorEntry { var_name: name_handle, struct_type, mangled_dtor: dtor.mangled_name });
            }
        }
        return Ok(());
    }

    if let Some(init_expr) = init {
        let value = lower_expression(engine, cx, init_expr, ExprMode::Load)?;
        push(&mut engine.ir, Opcode::Assignment(AssignmentOp { target_name: name_handle, value }), token);
    }
    Ok(())
}
