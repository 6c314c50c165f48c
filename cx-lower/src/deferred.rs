//! Deferred work queues (§4.6, §5 ordering guarantees).
//!
//! Populated during the main walk, drained after it in a fixed order:
//! lambdas → local-struct members → deferred member functions → template
//! instantiations → static-member definitions → trivial default
//! constructors. Each queue carries its own idempotency guard so a function
//! reachable via more than one path is only ever emitted once.

use cx_ast::{Block, Capture, Function, Param, Type};
use cx_ir::TypeIndex;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct LambdaTask {
    pub lambda_id: u32,
    pub closure_struct: TypeIndex,
    pub captures: Vec<Capture>,
    pub params: Vec<Param>,
    pub body: Block,
    pub is_generic: bool,
}

#[derive(Debug, Clone)]
pub struct LocalStructMemberTask {
    pub struct_name: String,
    pub function: Function,
}

#[derive(Debug, Clone)]
pub struct DeferredMemberFunctionTask {
    pub struct_type: TypeIndex,
    pub function: Function,
}

/// `{qualified_name, mangled_name, struct_name, arg_types, body_position,
/// param_names, pattern_pointer}` (§4.6) minus `body_position`/`pattern_pointer`,
/// which in this design are the pattern's `Function`/`Block` carried by value
/// instead of a re-parse handle.
#[derive(Debug, Clone)]
pub struct TemplateInstantiationTask {
    pub qualified_name: String,
    pub mangled_name: String,
    pub struct_name: Option<String>,
    pub arg_types: Vec<Type>,
    pub param_names: Vec<String>,
    pub pattern_body: Block,
}

#[derive(Debug, Clone)]
pub struct GenericLambdaInstantiationTask {
    pub lambda_id: u32,
    pub deduced_types: Vec<Type>,
    pub instantiation_key: String,
}

#[derive(Debug, Clone)]
pub struct StaticMemberTask {
    pub struct_name: String,
    pub member_name: String,
    pub ty: Type,
    pub init: Option<cx_ast::Expression>,
}

#[derive(Debug, Clone)]
pub struct TrivialDefaultCtorTask {
    pub struct_type: TypeIndex,
}

/// All deferred queues plus their idempotency guard sets (§4.6 last
/// paragraph: `emitted_static_members_`, `generated_function_names_`,
/// `generated_lambda_ids_`, `generated_generic_lambda_instantiations_`).
#[derive(Debug, Default)]
pub struct DeferredQueues {
    lambdas: Vec<LambdaTask>,
    local_struct_members: Vec<LocalStructMemberTask>,
    deferred_member_functions: Vec<DeferredMemberFunctionTask>,
    template_instantiations: Vec<TemplateInstantiationTask>,
    generic_lambda_instantiations: Vec<GenericLambdaInstantiationTask>,
    static_members: Vec<StaticMemberTask>,
    trivial_default_ctors: Vec<TrivialDefaultCtorTask>,

    generated_lambda_ids: HashSet<u32>,
    generated_function_names: HashSet<String>,
    generated_generic_lambda_instantiations: HashSet<String>,
    emitted_static_members: HashSet<String>,
}

impl DeferredQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_lambda(&mut self, task: LambdaTask) {
        if self.generated_lambda_ids.insert(task.lambda_id) {
            self.lambdas.push(task);
        }
    }

    pub fn push_local_struct_member(&mut self, task: LocalStructMemberTask) {
        self.local_struct_members.push(task);
    }

    pub fn push_deferred_member_function(&mut self, task: DeferredMemberFunctionTask) {
        self.deferred_member_functions.push(task);
    }

    /// Idempotent on `mangled_name`: the same instantiation requested from
    /// multiple call sites is only queued once.
    pub fn push_template_instantiation(&mut self, task: TemplateInstantiationTask) {
        if self.generated_function_names.insert(task.mangled_name.clone()) {
            self.template_instantiations.push(task);
        }
    }

    /// Idempotent on `instantiation_key` (lambda id + deduced-type signature).
    pub fn push_generic_lambda_instantiation(&mut self, task: GenericLambdaInstantiationTask) {
        if self.generated_generic_lambda_instantiations.insert(task.instantiation_key.clone()) {
            self.generic_lambda_instantiations.push(task);
        }
    }

    pub fn push_static_member(&mut self, task: StaticMemberTask) {
        let key = format!("{}::{}", task.struct_name, task.member_name);
        if self.emitted_static_members.insert(key) {
            self.static_members.push(task);
        }
    }

    pub fn push_trivial_default_ctor(&mut self, task: TrivialDefaultCtorTask) {
        self.trivial_default_ctors.push(task);
    }

    pub fn take_lambdas(&mut self) -> Vec<LambdaTask> {
        std::mem::take(&mut self.lambdas)
    }

    pub fn take_local_struct_members(&mut self) -> Vec<LocalStructMemberTask> {
        std::mem::take(&mut self.local_struct_members)
    }

    pub fn take_deferred_member_functions(&mut self) -> Vec<DeferredMemberFunctionTask> {
        std::mem::take(&mut self.deferred_member_functions)
    }

    pub fn take_template_instantiations(&mut self) -> Vec<TemplateInstantiationTask> {
        std::mem::take(&mut self.template_instantiations)
    }

    pub fn take_generic_lambda_instantiations(&mut self) -> Vec<GenericLambdaInstantiationTask> {
        std::mem::take(&mut self.generic_lambda_instantiations)
    }

    pub fn take_static_members(&mut self) -> Vec<StaticMemberTask> {
        std::mem::take(&mut self.static_members)
    }

    pub fn take_trivial_default_ctors(&mut self) -> Vec<TrivialDefaultCtorTask> {
        std::mem::take(&mut self.trivial_default_ctors)
    }

    pub fn is_drained(&self) -> bool {
        self.lambdas.is_empty()
            && self.local_struct_members.is_empty()
            && self.deferred_member_functions.is_empty()
            && self.template_instantiations.is_empty()
            && self.generic_lambda_instantiations.is_empty()
            && self.static_members.is_empty()
            && self.trivial_default_ctors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lambda_queue_is_idempotent_by_id() {
        let mut q = DeferredQueues::new();
        let task = |id| LambdaTask {
            lambda_id: id,
            closure_struct: TypeIndex(0),
            captures: vec![],
            params: vec![],
            body: Block { statements: vec![] },
            is_generic: false,
        };
        q.push_lambda(task(1));
        q.push_lambda(task(1));
        assert_eq!(q.take_lambdas().len(), 1);
    }

    #[test]
    fn template_instantiation_queue_is_idempotent_by_mangled_name() {
        let mut q = DeferredQueues::new();
        let task = || TemplateInstantiationTask {
            qualified_name: "Box".into(),
            mangled_name: "Box_int".into(),
            struct_name: Some("Box".into()),
            arg_types: vec![Type::I32],
            param_names: vec!["T".into()],
            pattern_body: Block { statements: vec![] },
        };
        q.push_template_instantiation(task());
        q.push_template_instantiation(task());
        assert_eq!(q.take_template_instantiations().len(), 1);
    }
}
