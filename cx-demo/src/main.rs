//! Thin CLI harness for `cx-lower`. Stands in for the production driver,
//! which owns the preprocessor/parser pipeline this crate never touches: it
//! builds a hand-written AST fixture, runs it through `AstToIr`, and prints
//! the resulting `Ir` (or a rendered `Diagnostic` on failure).

mod fixtures;

use clap::Parser;
use cx_diagnostics::{error_codes, Diagnostic, ErrorLevel, Span};
use cx_lower::{AstToIr, CompileFlags, CompilerContext, LoweringError, TargetAbi};

#[derive(Parser, Debug)]
#[command(name = "cx-demo", about = "Runs a built-in AST fixture through the AST→IR lowering core")]
struct Args {
    /// Which fixture to lower.
    #[arg(long, default_value = "return_literal")]
    fixture: String,

    /// Target ABI for struct-return-threshold selection.
    #[arg(long, default_value = "sysv")]
    abi: String,

    /// Disable access-control enforcement (test hook, mirrors isAccessControlDisabled()).
    #[arg(long)]
    no_access_control: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let abi = match args.abi.as_str() {
        "msvc" => TargetAbi::Msvc,
        _ => TargetAbi::SysV,
    };
    let flags = CompileFlags { access_control_disabled: args.no_access_control, verbose: false };
    let mut cx = CompilerContext::with_flags(abi, flags);

    let tu = fixtures::build(&args.fixture)?;
    let mut engine = AstToIr::new(tu.symbols.clone());

    match engine.lower_translation_unit(&mut cx, &tu) {
        Ok(()) => {
            println!("lowered {} instructions:", engine.ir.len());
            for (i, inst) in engine.ir.iter().enumerate() {
                println!("  [{i:04}] {:?}", inst.opcode);
            }
            Ok(())
        }
        Err(err) => {
            let diag = render(&err);
            eprintln!("{diag}");
            Err(anyhow::anyhow!("lowering failed"))
        }
    }
}

fn render(err: &LoweringError) -> Diagnostic {
    let span = Span::unknown();
    match err {
        LoweringError::Internal { detail, .. } => {
            Diagnostic::error(error_codes::MISSING_SYMBOL, detail.clone(), span)
        }
        LoweringError::UndefinedSymbol { name, .. } => Diagnostic::error(
            error_codes::UNDEFINED_VARIABLE,
            format!("no symbol named `{name}` in scope"),
            span,
        ),
        LoweringError::BadTypeIndex { index } => Diagnostic::error(
            error_codes::BAD_TYPE_INDEX,
            format!("type index {index} is not registered"),
            span,
        ),
        LoweringError::AccessViolation { owner, member } => Diagnostic::new(
            ErrorLevel::Error,
            error_codes::ACCESS_VIOLATION,
            format!("`{owner}::{member}` is not reachable from this context"),
            span,
        ),
        LoweringError::AbstractInstantiation { struct_name } => Diagnostic::error(
            error_codes::ABSTRACT_INSTANTIATION,
            format!("cannot instantiate abstract class `{struct_name}`"),
            span,
        ),
        LoweringError::NoMatchingOverload { name } => Diagnostic::error(
            error_codes::NO_MATCHING_OVERLOAD,
            format!("no matching overload for call to `{name}`"),
            span,
        ),
        LoweringError::ExplicitConstructorMisuse { ctor } => Diagnostic::error(
            error_codes::EXPLICIT_CTOR_IMPLICIT_USE,
            format!("`{ctor}` is explicit and cannot be used in an implicit conversion"),
            span,
        ),
        LoweringError::UnsatisfiedConstraint { name } => Diagnostic::error(
            error_codes::UNSATISFIED_CONSTRAINT,
            format!("requires-clause not satisfied for `{name}`"),
            span,
        ),
        LoweringError::TemplateSubstitutionFailure { name, detail } => Diagnostic::error(
            error_codes::TEMPLATE_SUBSTITUTION_FAILURE,
            format!("template substitution failed for `{name}`: {detail}"),
            span,
        ),
    }
}
