//! Error taxonomy (§7): internal invariants are fatal, semantic errors halt
//! emission for the affected function, warnings/recoverable paths are
//! reported through `cx_diagnostics` and logging instead of `Err`.

use cx_ast::SourceToken;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoweringError {
    #[error("internal invariant violated at {token:?}: {detail}")]
    Internal { detail: String, token: SourceToken },

    #[error("no symbol named `{name}` in scope at {token:?}")]
    UndefinedSymbol { name: String, token: SourceToken },

    #[error("type index {index} is not registered")]
    BadTypeIndex { index: u32 },

    #[error("access violation: `{owner}::{member}` is not reachable from this context")]
    AccessViolation { owner: String, member: String },

    #[error("cannot instantiate abstract class `{struct_name}`")]
    AbstractInstantiation { struct_name: String },

    #[error("no matching overload for call to `{name}`")]
    NoMatchingOverload { name: String },

    #[error("call to explicit constructor `{ctor}` used in an implicit-conversion context")]
    ExplicitConstructorMisuse { ctor: String },

    #[error("requires-clause not satisfied for `{name}`")]
    UnsatisfiedConstraint { name: String },

    #[error("template substitution failed for `{name}`: {detail}")]
    TemplateSubstitutionFailure { name: String, detail: String },
}

pub type LoweringResult<T> = Result<T, LoweringError>;

impl LoweringError {
    pub fn internal(detail: impl Into<String>, token: SourceToken) -> Self {
        Self::Internal { detail: detail.into(), token }
    }
}
