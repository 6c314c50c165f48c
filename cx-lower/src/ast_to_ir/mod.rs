//! `AstToIr` — the central lowering pass (§2, §4, §5).
//!
//! One instance walks a translation unit's items in source order, emitting
//! into a single flat `Ir`. Per-function state (temporaries, destructor
//! scopes, SEH context) resets at each function boundary; process-wide state
//! (`declared_functions`, the deferred queues) spans the whole pass.

pub mod expr;
pub mod stmt;

use crate::context::CompilerContext;
use crate::errors::LoweringResult;
use crate::mangling;
use cx_ast::{Block, Function, Item, Param, SourceToken, SymbolTable, TranslationUnit, Type};
use cx_ir::{push, FunctionDeclOp, Ir, Opcode, StringHandle, TempVarMetadata, TempVarTable, TypeIndex};
use std::collections::{HashMap, HashSet};

pub use crate::deferred::DeferredQueues;

/// Whether an expression is being lowered to produce a *value* (Load) or an
/// *address* to assign through (LValueAddress) — §4.1's dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprMode {
    Load,
    LValueAddress,
}

/// One entry on `seh_context_stack_` (§4.5).
#[derive(Debug, Clone)]
pub struct SehContext {
    pub try_end_label: StringHandle,
    pub finally_label: Option<StringHandle>,
    pub has_finally: bool,
}

/// A variable registered for destructor cleanup on scope exit (§4.3 Blocks).
#[derive(Debug, Clone)]
pub struct DestructorEntry {
    pub var_name: StringHandle,
    pub struct_type: TypeIndex,
    pub mangled_dtor: StringHandle,
}

/// Entry/exit points for the innermost loop, plus the SEH/destructor depth
/// it was entered at — `break`/`continue` only unwind contexts deeper than
/// this (§4.3 Loops, §4.5).
#[derive(Debug, Clone, Copy)]
pub struct LoopFrame {
    pub continue_label: StringHandle,
    pub break_label: StringHandle,
    pub seh_depth: usize,
    pub destructor_depth: usize,
}

pub struct AstToIr {
    pub ir: Ir,
    pub temps: TempVarTable,
    pub queues: DeferredQueues,
    pub destructor_scopes: Vec<Vec<DestructorEntry>>,
    pub seh_stack: Vec<SehContext>,
    pub loop_stack: Vec<LoopFrame>,
    /// `break`-reachable contexts: every loop frame plus every enclosing
    /// `switch`. `continue` only ever consults `loop_stack`.
    pub break_stack: Vec<LoopFrame>,
    pub current_struct: Option<TypeIndex>,
    pub current_function_name: Option<String>,
    pub in_return_with_rvo: bool,
    pub declared_functions: HashSet<StringHandle>,
    pub symbols: SymbolTable,
    /// Generic-lambda patterns kept alive past the lambda queue drain, keyed
    /// by lambda id, so per-call-signature instantiations (§4.6) have a body
    /// to replay. Mirrors the re-parse-by-position design with an owned copy
    /// instead of a source handle.
    pub generic_lambda_patterns: HashMap<u32, (Vec<Param>, Block, TypeIndex)>,
    next_label: u32,
}

impl AstToIr {
    pub fn new(symbols: SymbolTable) -> Self {
        Self {
            ir: Ir::new(),
            temps: TempVarTable::new(),
            queues: DeferredQueues::new(),
            destructor_scopes: Vec::new(),
            seh_stack: Vec::new(),
            loop_stack: Vec::new(),
            break_stack: Vec::new(),
            current_struct: None,
            current_function_name: None,
            in_return_with_rvo: false,
            declared_functions: HashSet::new(),
            symbols,
            generic_lambda_patterns: HashMap::new(),
            next_label: 0,
        }
    }

    /// Main walk: lower every item, then drain the deferred queues to
    /// fixpoint in the mandated order (§5).
    pub fn lower_translation_unit(
        &mut self,
        cx: &mut CompilerContext,
        tu: &TranslationUnit,
    ) -> LoweringResult<()> {
        for item in &tu.program.items {
            self.lower_item(cx, item)?;
        }
        self.drain_deferred(cx)?;
        Ok(())
    }

    fn lower_item(&mut self, cx: &mut CompilerContext, item: &Item) -> LoweringResult<()> {
        match item {
            Item::Function(function) => self.lower_function(cx, function),
            // Structs/enums/aliases are registered into `cx.types` by an
            // earlier registry-build phase (out of scope here, §1); the
            // lowering pass only walks executable code.
            Item::Struct(_) | Item::Enum(_) | Item::TypeAlias { .. } => Ok(()),
        }
    }

    pub fn mangled_name_of(&self, function: &Function) -> String {
        let param_types: Vec<Type> = function.params.iter().map(|p| p.ty.clone()).collect();
        match &function.owner_struct {
            Some(owner) if function.is_constructor => {
                mangling::mangle_constructor(owner, &param_types)
            }
            Some(owner) if function.is_destructor => mangling::mangle_destructor(owner),
            Some(owner) => match &function.operator {
                Some(op) => mangling::mangle_operator(owner, op, &param_types),
                None => mangling::mangle_member_function(owner, &function.name, &param_types),
            },
            None => mangling::mangle_free_function(&function.name, &param_types),
        }
    }

    /// Emits a `FunctionDecl` the first time a given mangled name is seen,
    /// satisfying the "declaration precedes use" invariant (§4.6, §8 property 2).
    pub fn declare_function(
        &mut self,
        cx: &mut CompilerContext,
        mangled: &str,
        function: &Function,
    ) -> StringHandle {
        let handle = cx.interner.intern(mangled);
        if self.declared_functions.insert(handle) {
            let param_types = function
                .params
                .iter()
                .filter_map(|p| self.resolve_type_index(cx, &p.ty))
                .collect();
            let return_type = self.resolve_type_index(cx, &function.return_type);
            push(
                &mut self.ir,
                Opcode::FunctionDecl(FunctionDeclOp { mangled_name: handle, param_types, return_type }),
                function.token,
            );
        }
        handle
    }

    pub fn resolve_type_index(&self, cx: &CompilerContext, ty: &Type) -> Option<TypeIndex> {
        match ty {
            Type::Named(name) | Type::Dependent(name) => cx.types.by_name(cx.interner.intern(name)),
            Type::Const(inner) | Type::Volatile(inner) => self.resolve_type_index(cx, inner),
            _ => None,
        }
    }

    pub fn lower_function(&mut self, cx: &mut CompilerContext, function: &Function) -> LoweringResult<()> {
        let mangled = self.mangled_name_of(function);
        self.declare_function(cx, &mangled, function);

        let Some(body) = &function.body else { return Ok(()) };

        let previous_struct = self.current_struct;
        let previous_fn_name = self.current_function_name.take();
        if let Some(owner) = &function.owner_struct {
            self.current_struct = cx.types.by_name(cx.interner.intern(owner));
        }
        self.current_function_name = Some(mangled);
        self.temps = TempVarTable::new();

        self.symbols.enter_scope();
        self.destructor_scopes.push(Vec::new());
        stmt::lower_block(self, cx, body)?;
        self.exit_destructor_scope(cx, SourceToken::unknown());
        self.symbols.exit_scope();

        self.current_struct = previous_struct;
        self.current_function_name = previous_fn_name;
        Ok(())
    }

    /// Emits `DestructorCall`s for the innermost scope in reverse
    /// registration order, then pops it (§4.3, §8 property 5).
    pub fn exit_destructor_scope(&mut self, _cx: &mut CompilerContext, token: SourceToken) {
        let Some(scope) = self.destructor_scopes.pop() else { return };
        for entry in scope.into_iter().rev() {
            self.emit_destructor_call(&entry, token);
        }
    }

    fn emit_destructor_call(&mut self, entry: &DestructorEntry, token: SourceToken) {
        use cx_ir::{DestructorCallOp, TypedValue, ValueKind};
        let object = TypedValue {
            kind: ValueKind::Struct,
            size_in_bits: 0,
            value: cx_ir::ValueOperand::Name(entry.var_name),
            pointer_depth: None,
            ref_qualifier: None,
            cv_qualifier: Default::default(),
            type_index: Some(entry.struct_type),
        };
        push(
            &mut self.ir,
            Opcode::DestructorCall(DestructorCallOp {
                struct_type: entry.struct_type,
                object,
                mangled_dtor: entry.mangled_dtor,
            }),
            token,
        );
    }

    /// Unwinds every SEH `__try` context and destructor scope deeper than
    /// the given floors, without popping the real stacks — used by `return`
    /// (floors of 0) and `break`/`continue` (the enclosing loop's recorded
    /// floors), per §4.3/§4.5.
    pub fn emit_unwind_to(
        &mut self,
        cx: &CompilerContext,
        seh_floor: usize,
        destructor_floor: usize,
        token: SourceToken,
    ) {
        use cx_ir::{LabelOp, SehFinallyCallOp};
        let contexts: Vec<SehContext> = self.seh_stack[seh_floor..].to_vec();
        for ctx in contexts.iter().rev() {
            if ctx.has_finally {
                if let Some(finally_label) = ctx.finally_label {
                    let end_label = self.fresh_label(cx, "seh_ret_finally");
                    push(
                        &mut self.ir,
                        Opcode::SehFinallyCall(SehFinallyCallOp { funclet_label: finally_label, end_label }),
                        token,
                    );
                    push(&mut self.ir, Opcode::Label(LabelOp { name: end_label }), token);
                }
            }
        }
        let scopes: Vec<Vec<DestructorEntry>> = self.destructor_scopes[destructor_floor..].to_vec();
        for scope in scopes.iter().rev() {
            for entry in scope.iter().rev() {
                self.emit_destructor_call(entry, token);
            }
        }
    }

    pub fn fresh_prvalue(&mut self) -> cx_ir::TempVar {
        self.temps.fresh(TempVarMetadata::prvalue())
    }

    pub fn fresh_label(&mut self, cx: &CompilerContext, prefix: &str) -> StringHandle {
        let name = format!("__{}_{}", prefix, self.next_label);
        self.next_label += 1;
        cx.interner.intern(&name)
    }

    /// Drains every deferred queue to fixpoint, in the mandated order (§5):
    /// lambdas, then local-struct members, then deferred member functions,
    /// then template instantiations, then static members, then trivial
    /// default constructors. A later queue may enqueue into an earlier one
    /// (e.g. a template instantiation referencing a lambda), so this loops
    /// until every queue reports drained.
    fn drain_deferred(&mut self, cx: &mut CompilerContext) -> LoweringResult<()> {
        loop {
            for task in self.queues.take_lambdas() {
                expr::lambdas::emit_lambda_body(self, cx, &task)?;
            }
            for task in self.queues.take_local_struct_members() {
                self.lower_function(cx, &task.function)?;
            }
            for task in self.queues.take_deferred_member_functions() {
                self.lower_function(cx, &task.function)?;
            }
            for task in self.queues.take_template_instantiations() {
                expr::calls::emit_template_instantiation(self, cx, &task)?;
            }
            for task in self.queues.take_generic_lambda_instantiations() {
                expr::lambdas::emit_generic_lambda_instantiation(self, cx, &task)?;
            }
            for task in self.queues.take_static_members() {
                expr::initializers::emit_static_member(self, cx, &task)?;
            }
            for task in self.queues.take_trivial_default_ctors() {
                expr::calls::emit_trivial_default_ctor(self, cx, &task);
            }
            if self.queues.is_drained() {
                return Ok(());
            }
        }
    }
}
