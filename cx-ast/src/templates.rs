//! Template pattern registry.
//!
//! Maps a qualified template name to its parsed pattern (function or class).
//! Instantiations are keyed by `(qualified_name, argument-list)`; pattern
//! names are distinguishable from instantiated names by a `$`-hash suffix the
//! mangler appends (§3, Template Registry).

use crate::{Function, StructDecl, Type};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateKind {
    Function,
    Class,
}

#[derive(Debug, Clone)]
pub enum TemplatePattern {
    Function(Function),
    Class(StructDecl),
}

impl TemplatePattern {
    pub fn kind(&self) -> TemplateKind {
        match self {
            TemplatePattern::Function(_) => TemplateKind::Function,
            TemplatePattern::Class(_) => TemplateKind::Class,
        }
    }

    pub fn type_params(&self) -> &[String] {
        match self {
            TemplatePattern::Function(f) => &f.type_params,
            TemplatePattern::Class(s) => &s.type_params,
        }
    }
}

/// Instantiation key: the template's qualified name plus its concrete
/// argument types. `Type` does not implement `Hash`/`Eq` (it carries
/// `Dependent` payloads that only make sense pre-substitution), so the key
/// is built from each argument's canonical name instead of the `Type` value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstantiationKey {
    pub qualified_name: String,
    pub arg_type_names: Vec<String>,
}

impl InstantiationKey {
    pub fn new(qualified_name: impl Into<String>, args: &[Type]) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            arg_type_names: args.iter().map(type_canonical_name).collect(),
        }
    }
}

fn type_canonical_name(ty: &Type) -> String {
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
        Type::Named(n) => n.clone(),
        Type::Pointer(inner) => format!("P{}", type_canonical_name(inner)),
        Type::Reference(inner) => format!("R{}", type_canonical_name(inner)),
        Type::RValueReference(inner) => format!("RR{}", type_canonical_name(inner)),
        Type::Array(inner, n) => format!("A{}_{}", n, type_canonical_name(inner)),
        Type::FunctionPointer { params, ret } => format!(
            "Fn({}){}",
            params.iter().map(type_canonical_name).collect::<Vec<_>>().join(","),
            type_canonical_name(ret)
        ),
        Type::Dependent(n) => n.clone(),
        Type::Const(inner) => format!("C{}", type_canonical_name(inner)),
        Type::Volatile(inner) => format!("V{}", type_canonical_name(inner)),
    }
}

/// Registered patterns plus a guard set of already-emitted instantiations
/// (§4.6, §5 idempotency guards).
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    patterns: HashMap<String, TemplatePattern>,
    instantiated: HashMap<InstantiationKey, String>, // key -> mangled name
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, qualified_name: impl Into<String>, pattern: TemplatePattern) {
        self.patterns.insert(qualified_name.into(), pattern);
    }

    pub fn pattern(&self, qualified_name: &str) -> Option<&TemplatePattern> {
        self.patterns.get(qualified_name)
    }

    pub fn is_template(&self, qualified_name: &str) -> bool {
        self.patterns.contains_key(qualified_name)
    }

    /// Returns the previously-assigned mangled name if this exact
    /// instantiation has already been emitted (§8 idempotence).
    pub fn already_instantiated(&self, key: &InstantiationKey) -> Option<&str> {
        self.instantiated.get(key).map(String::as_str)
    }

    pub fn record_instantiation(&mut self, key: InstantiationKey, mangled_name: impl Into<String>) {
        self.instantiated.insert(key, mangled_name.into());
    }
}
