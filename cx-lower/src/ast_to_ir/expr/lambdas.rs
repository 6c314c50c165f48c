//! Lambda expression lowering (§4.2 Lambdas, §4.6 deferred instantiation).
//!
//! The closure struct itself is assumed synthesized by an earlier registry
//! phase (out of scope here, §1) under the name `mangle_lambda_closure(id,
//! None)`. This emitter constructs one closure instance per lambda
//! expression (storing captures into its members) and queues the body for
//! deferred generation; generic (`auto`-parameter) lambdas defer body
//! emission entirely to their first call site.

use super::lower_expression;
use crate::ast_to_ir::{AstToIr, ExprMode};
use crate::context::CompilerContext;
use crate::deferred::{GenericLambdaInstantiationTask, LambdaTask};
use crate::errors::{LoweringError, LoweringResult};
use crate::mangling;
use cx_ast::{Block, Capture, DeclId, Function, Param, SourceToken, Type};
use cx_ir::{
    push, ConstructorCallOp, FunctionAddressOp, MemberStoreOp, Opcode, TypedValue, ValueKind,
};

pub fn lower_lambda_expression(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    id: u32,
    captures: &[Capture],
    params: &[Param],
    _return_type: Option<&Type>,
    body: &Block,
    is_generic: bool,
) -> LoweringResult<TypedValue> {
    let token = SourceToken::unknown();
    let mangled = mangling::mangle_lambda_closure(id, None);
    let name_handle = cx.interner.intern(&mangled);
    let Some(struct_type) = cx.types.by_name(name_handle) else {
        return Err(LoweringError::internal(
            format!("lambda closure struct `{mangled}` was not pre-registered"),
            token,
        ));
    };

    let ctor_mangled = mangling::mangle_constructor(&mangled, &[]);
    let ctor_handle = cx.interner.intern(&ctor_mangled);
    let object_var = engine.fresh_prvalue();
    let object = TypedValue::temp(ValueKind::Struct, 0, object_var).with_type_index(struct_type);
    push(
        &mut engine.ir,
        Opcode::ConstructorCall(ConstructorCallOp {
            struct_type,
            object: object.clone(),
            args: vec![],
            mangled_ctor: ctor_handle,
            is_heap_allocated: false,
            use_return_slot: false,
        }),
        token,
    );

    for capture in captures {
        store_capture(engine, cx, &object, struct_type, capture, token)?;
    }

    if is_generic {
        engine
            .generic_lambda_patterns
            .insert(id, (params.to_vec(), body.clone(), struct_type));
    }

    engine.queues.push_lambda(LambdaTask {
        lambda_id: id,
        closure_struct: struct_type,
        captures: captures.to_vec(),
        params: params.to_vec(),
        body: body.clone(),
        is_generic,
    });

    Ok(object)
}

fn store_capture(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    object: &TypedValue,
    struct_type: cx_ir::TypeIndex,
    capture: &Capture,
    token: SourceToken,
) -> LoweringResult<()> {
    let (member_name, value) = match capture {
        Capture::ByValue(name) => (name.clone(), lower_expression(engine, cx, &cx_ast::Expression::Ident(name.clone()), ExprMode::Load)?),
        Capture::ByReference(name) => {
            let addr = lower_expression(engine, cx, &cx_ast::Expression::Ident(name.clone()), ExprMode::LValueAddress)?;
            let result = engine.fresh_prvalue();
            push(&mut engine.ir, Opcode::AddressOf(cx_ir::AddressOfOp { operand: addr, result }), token);
            (name.clone(), TypedValue::temp(ValueKind::Pointer, 64, result).with_pointer_depth(1))
        }
        Capture::This => {
            let addr = lower_expression(engine, cx, &cx_ast::Expression::Ident("this".to_string()), ExprMode::LValueAddress)?;
            let result = engine.fresh_prvalue();
            push(&mut engine.ir, Opcode::AddressOf(cx_ir::AddressOfOp { operand: addr, result }), token);
            ("__this".to_string(), TypedValue::temp(ValueKind::Pointer, 64, result).with_pointer_depth(1))
        }
        Capture::CopyThis => {
            let value = lower_expression(engine, cx, &cx_ast::Expression::Ident("this".to_string()), ExprMode::Load)?;
            ("__copy_this".to_string(), value)
        }
    };

    let field_handle = cx.interner.intern(&member_name);
    let Some(member) = cx.types.struct_record(struct_type).and_then(|r| r.find_member(field_handle)) else {
        return Ok(());
    };
    let offset = member.byte_offset as i64;
    push(
        &mut engine.ir,
        Opcode::MemberStore(MemberStoreOp {
            object: object.clone(),
            member_name: field_handle,
            offset,
            value,
            bitfield_width: None,
            bitfield_bit_offset: 0,
            is_pointer_to_member: false,
        }),
        token,
    );
    Ok(())
}

/// Drained once per lambda (§4.6). Emits `operator()`, and for non-capturing
/// closures a static `__invoke` plus a `FunctionAddress` helper (§4.2
/// Lambdas). Generic lambdas skip body emission here — it happens per call
/// signature in `emit_generic_lambda_instantiation`.
pub fn emit_lambda_body(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    task: &LambdaTask,
) -> LoweringResult<()> {
    if task.is_generic {
        return Ok(());
    }
    let closure_name = cx
        .types
        .get(task.closure_struct)
        .and_then(|t| cx.interner.resolve(t.name))
        .map(|s| s.to_string())
        .unwrap_or_else(|| mangling::mangle_lambda_closure(task.lambda_id, None));

    let call_operator = synthetic_function(&closure_name, "operator()", &task.params, &task.body);
    engine.lower_function(cx, &call_operator)?;

    if task.captures.is_empty() {
        let invoke = Function { owner_struct: None, name: "__invoke".to_string(), ..call_operator.clone() };
        engine.lower_function(cx, &invoke)?;

        let mangled = engine.mangled_name_of(&invoke);
        let handle = cx.interner.intern(&mangled);
        let result = engine.fresh_prvalue();
        push(
            &mut engine.ir,
            Opcode::FunctionAddress(FunctionAddressOp { mangled_name: handle, result }),
            SourceToken::unknown(),
        );
    }
    Ok(())
}

fn synthetic_function(owner: &str, name: &str, params: &[Param], body: &Block) -> Function {
    Function {
        id: DeclId(0),
        name: name.to_string(),
        owner_struct: Some(owner.to_string()),
        type_params: vec![],
        params: params.to_vec(),
        return_type: Type::I32,
        body: Some(body.clone()),
        is_virtual: false,
        is_override: false,
        is_final: false,
        is_static: false,
        is_explicit: false,
        is_constructor: false,
        is_destructor: false,
        access: cx_ast::Access::Public,
        operator: None,
        token: SourceToken::unknown(),
    }
}

/// Generic (`auto`-parameter) lambda instantiation: deduced argument types
/// are bound to the pattern's parameter names and the body is lowered as a
/// fresh `operator()` overload, mangled distinctly per signature (§4.2,
/// §8 scenario S5).
pub fn emit_generic_lambda_instantiation(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    task: &GenericLambdaInstantiationTask,
) -> LoweringResult<()> {
    let token = SourceToken::unknown();
    let Some((pattern_params, body, closure_struct)) = engine.generic_lambda_patterns.get(&task.lambda_id).cloned() else {
        return Err(LoweringError::internal(
            format!("generic lambda {} instantiated with no stored pattern", task.lambda_id),
            token,
        ));
    };
    let closure_name = cx
        .types
        .get(closure_struct)
        .and_then(|t| cx.interner.resolve(t.name))
        .map(|s| s.to_string())
        .unwrap_or_else(|| mangling::mangle_lambda_closure(task.lambda_id, None));

    let params: Vec<Param> = pattern_params
        .iter()
        .zip(task.deduced_types.iter())
        .map(|(p, ty)| Param { name: p.name.clone(), ty: ty.clone(), default_value: p.default_value.clone() })
        .collect();

    let function = synthetic_function(&closure_name, "operator()", &params, &body);
    engine.lower_function(cx, &function)
}
