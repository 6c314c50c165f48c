//! Deterministic name mangling (§4.4, normative sketch in §6).
//!
//! `name_<argtype-list>` for free functions, `Struct::name_<argtype-list>`
//! for members, `operator<symbol>` / `operator <type-name>` for operator and
//! conversion functions, with CV prefixes (`C`/`V`), reference suffixes
//! (`R`/`RR`), a repeatable pointer prefix (`P`), and array suffix (`A[N]`).

use cx_ast::{OperatorKind, Type};

/// Encodes one parameter type into its mangling suffix fragment.
pub fn mangle_type(ty: &Type) -> String {
    match ty {
        Type::Void => "void".to_string(),
        Type::Bool => "bool".to_string(),
        Type::Char => "char".to_string(),
        Type::I8 => "i8".to_string(),
        Type::I16 => "i16".to_string(),
        Type::I32 => "i32".to_string(),
        Type::I64 => "i64".to_string(),
        Type::U8 => "u8".to_string(),
        Type::U16 => "u16".to_string(),
        Type::U32 => "u32".to_string(),
        Type::U64 => "u64".to_string(),
        Type::F32 => "f32".to_string(),
        Type::F64 => "f64".to_string(),
        Type::Named(name) => name.clone(),
        Type::Dependent(name) => name.clone(),
        Type::Pointer(inner) => format!("P{}", mangle_type(inner)),
        Type::Reference(inner) => format!("{}R", mangle_type(inner)),
        Type::RValueReference(inner) => format!("{}RR", mangle_type(inner)),
        Type::Array(inner, n) => format!("{}A{}", mangle_type(inner), n),
        Type::Const(inner) => format!("C{}", mangle_type(inner)),
        Type::Volatile(inner) => format!("V{}", mangle_type(inner)),
        Type::FunctionPointer { params, ret } => format!(
            "Fn{}_{}",
            params.iter().map(mangle_type).collect::<Vec<_>>().join(""),
            mangle_type(ret)
        ),
    }
}

fn arg_suffix(params: &[Type]) -> String {
    if params.is_empty() {
        return String::new();
    }
    format!("_{}", params.iter().map(mangle_type).collect::<Vec<_>>().join("_"))
}

/// Free function: `name_<argtypes>`.
pub fn mangle_free_function(name: &str, params: &[Type]) -> String {
    format!("{}{}", name, arg_suffix(params))
}

/// Member function: `Struct::name_<argtypes>`.
pub fn mangle_member_function(owner: &str, name: &str, params: &[Type]) -> String {
    format!("{}::{}{}", owner, name, arg_suffix(params))
}

pub fn mangle_constructor(owner: &str, params: &[Type]) -> String {
    mangle_member_function(owner, owner, params)
}

pub fn mangle_destructor(owner: &str) -> String {
    format!("{}::~{}", owner, owner)
}

/// `operator+`, `operator[]`, etc. — the symbol is included literally.
pub fn mangle_operator_name(owner: &str, symbol: &str, params: &[Type]) -> String {
    format!("{}::operator{}{}", owner, symbol, arg_suffix(params))
}

/// Conversion operator: `operator <type-name>`.
pub fn mangle_conversion_operator(owner: &str, target: &Type) -> String {
    format!("{}::operator {}", owner, mangle_type(target))
}

pub fn mangle_operator(owner: &str, op: &OperatorKind, params: &[Type]) -> String {
    match op {
        OperatorKind::Binary(symbol) => mangle_operator_name(owner, symbol, params),
        OperatorKind::Conversion(target) => mangle_conversion_operator(owner, target),
        OperatorKind::Arrow => mangle_operator_name(owner, "->", params),
    }
}

/// Applies a template's argument-type suffix to its pattern name, producing
/// an instantiated name distinguishable from the pattern by the caller's
/// chosen hash (the registry key, not this string, is the source of truth
/// for idempotency — see `TemplateRegistry::already_instantiated`).
pub fn mangle_template_instantiation(template_name: &str, args: &[Type]) -> String {
    format!("{}{}", template_name, arg_suffix(args))
}

/// Lambda closures: `__lambda_<id>` optionally disambiguated by a generic
/// instantiation hash.
pub fn mangle_lambda_closure(lambda_id: u32, instantiation_hash: Option<u64>) -> String {
    match instantiation_hash {
        Some(hash) => format!("__lambda_{}${:x}", lambda_id, hash),
        None => format!("__lambda_{}", lambda_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mangles_free_function_with_args() {
        let name = mangle_free_function("add", &[Type::I32, Type::I32]);
        assert_eq!(name, "add_i32_i32");
    }

    #[test]
    fn mangles_member_function() {
        let name = mangle_member_function("Widget", "draw", &[]);
        assert_eq!(name, "Widget::draw");
    }

    #[test]
    fn mangles_reference_and_pointer_params() {
        let ty = Type::Reference(Box::new(Type::Pointer(Box::new(Type::Named("S".into())))));
        assert_eq!(mangle_type(&ty), "PSR");
    }

    #[test]
    fn mangles_conversion_operator() {
        let name = mangle_conversion_operator("M", &Type::I32);
        assert_eq!(name, "M::operator i32");
    }

    #[test]
    fn round_trips_by_reconstruction() {
        // §8 property 6: re-mangling a declaration's signature yields the
        // same name that was stored in its FunctionDecl.
        let params = vec![Type::I32, Type::Reference(Box::new(Type::Named("S".into())))];
        let a = mangle_member_function("S", "store", &params);
        let b = mangle_member_function("S", "store", &params);
        assert_eq!(a, b);
    }
}
