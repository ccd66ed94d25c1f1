//! Symbolic-algebra substrate
//!
//! Everything the assembly engine needs from a symbolic layer, and nothing
//! more: named symbols with state/parameter tagging and role metadata, a
//! closed expression AST with numeric evaluation, equations with
//! differential or algebraic left-hand sides, and composable systems with
//! namespacing, flattening, structural simplification, and default-value
//! resolution.

mod expr;
mod system;

pub use expr::{BinOp, EvalEnv, Expr, HostFn, Role, Symbol, SymbolKind, UnaryOp};
pub use system::{
    resolve_defaults, DefaultValue, Equation, Lhs, SimplifiedSystem, System, SystemSummary,
};
