pub mod abi;
pub mod access_control;
pub mod ast_to_ir;
pub mod context;
pub mod deferred;
pub mod errors;
pub mod intrinsics;
pub mod mangling;
pub mod overload;
pub mod utils;

pub use abi::TargetAbi;
pub use ast_to_ir::AstToIr;
pub use context::{CompileFlags, CompilerContext};
pub use cx_diagnostics::{error_codes, Diagnostic, DiagnosticEngine, ErrorLevel, Span};
pub use errors::{LoweringError, LoweringResult};
pub use utils::safe_arithmetic::{
    safe_array_size, safe_field_index, safe_param_index, CheckedArithmetic, SafeCast,
};
