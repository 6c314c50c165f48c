//! Name mangling & overload resolution (§4.4).
//!
//! There is no full ranking algorithm: the parser has already recorded a
//! `DeclId` on each call node, so resolution is primarily pointer-identity
//! (here, `DeclId` equality) confirmation. The arity/type-compatibility path
//! below exists for the recovery searches §4.2 step 4 asks for: single-overload
//! fallback, current-struct member lookup, and dependent-qualified resolution.

use cx_ast::{DeclId, DeclTable, Function, Type};

fn types_compatible(param: &Type, arg: &Type) -> bool {
    if param == arg {
        return true;
    }
    match (param, arg) {
        (Type::Reference(p), a) => types_compatible(p, a),
        (p, Type::Reference(a)) => types_compatible(p, a),
        (Type::RValueReference(p), a) => types_compatible(p, a),
        (p, Type::RValueReference(a)) => types_compatible(p, a),
        (Type::Const(p), a) => types_compatible(p, a),
        (p, Type::Const(a)) => types_compatible(p, a),
        (Type::Volatile(p), a) => types_compatible(p, a),
        (p, Type::Volatile(a)) => types_compatible(p, a),
        _ => false,
    }
}

/// Arity match including default-argument fill (§4.4 step 1): an argument
/// list is compatible if it supplies no more arguments than the function has
/// parameters, and every parameter beyond the supplied arity has a default.
pub fn arity_matches(function: &Function, arg_count: usize) -> bool {
    if arg_count > function.params.len() {
        return false;
    }
    function.params[arg_count..].iter().all(|p| p.default_value.is_some())
}

/// Full step-1/2 match: arity (with default fill) and per-argument type
/// compatibility (reference/cv-qualifier stripped equality).
pub fn signature_matches(function: &Function, arg_types: &[Type]) -> bool {
    if !arity_matches(function, arg_types.len()) {
        return false;
    }
    function
        .params
        .iter()
        .zip(arg_types.iter())
        .all(|(p, a)| types_compatible(&p.ty, a))
}

/// Primary resolution path: trust the parser's recorded `DeclId` if it still
/// resolves and its arity accepts the call. This is the pointer-identity
/// discriminator §4.4 describes as primary.
pub fn resolve_by_decl_id(decls: &DeclTable, recorded: DeclId, arg_count: usize) -> Option<DeclId> {
    let function = decls.get(recorded)?;
    arity_matches(function, arg_count).then_some(recorded)
}

/// Recovery search: scan `candidates` for signature compatibility. If exactly
/// one candidate matches, that's the single-overload fallback (§4.2 step 4,
/// §7 "Recoverable"); ambiguity among matches is reported by the caller as
/// `NoMatchingOverload` rather than guessed at here.
pub fn resolve_by_signature(
    decls: &DeclTable,
    candidates: &[DeclId],
    arg_types: &[Type],
) -> OverloadOutcome {
    let matches: Vec<DeclId> = candidates
        .iter()
        .copied()
        .filter(|id| decls.get(*id).is_some_and(|f| signature_matches(f, arg_types)))
        .collect();
    match matches.len() {
        0 => OverloadOutcome::NoMatch,
        1 => OverloadOutcome::Unique(matches[0]),
        _ => OverloadOutcome::Ambiguous(matches),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverloadOutcome {
    Unique(DeclId),
    Ambiguous(Vec<DeclId>),
    NoMatch,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cx_ast::Param;

    fn function(name: &str, params: Vec<Param>) -> Function {
        Function {
            id: DeclId(0),
            name: name.to_string(),
            owner_struct: None,
            type_params: vec![],
            params,
            return_type: Type::Void,
            body: None,
            is_virtual: false,
            is_override: false,
            is_final: false,
            is_static: false,
            is_explicit: false,
            is_constructor: false,
            is_destructor: false,
            access: cx_ast::Access::Public,
            operator: None,
            token: cx_ast::SourceToken::unknown(),
        }
    }

    #[test]
    fn arity_accepts_default_fill() {
        let f = function(
            "f",
            vec![
                Param { name: "a".into(), ty: Type::I32, default_value: None },
                Param { name: "b".into(), ty: Type::I32, default_value: Some(cx_ast::Expression::IntLiteral(0)) },
            ],
        );
        assert!(arity_matches(&f, 1));
        assert!(arity_matches(&f, 2));
        assert!(!arity_matches(&f, 0));
    }

    #[test]
    fn reference_params_compatible_with_value_args() {
        let f = function(
            "f",
            vec![Param { name: "a".into(), ty: Type::Reference(Box::new(Type::I32)), default_value: None }],
        );
        assert!(signature_matches(&f, &[Type::I32]));
    }

    #[test]
    fn single_overload_fallback_is_unique() {
        let mut decls = DeclTable::new();
        let id = decls.insert_function(function(
            "f",
            vec![Param { name: "a".into(), ty: Type::I32, default_value: None }],
        ));
        let outcome = resolve_by_signature(&decls, &[id], &[Type::I32]);
        assert_eq!(outcome, OverloadOutcome::Unique(id));
    }
}
