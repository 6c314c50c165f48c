// Utility modules for the AST-to-IR lowering core.

pub mod safe_arithmetic;

pub use safe_arithmetic::{safe_array_size, safe_field_index, safe_param_index, CheckedArithmetic, SafeCast};
