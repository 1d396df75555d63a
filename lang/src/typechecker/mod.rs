/**
Type checker for Pal

This module implements bidirectional elaboration with:
- Holes solved by higher-order pattern unification
- Suspendable judgments that resume when the holes they wait on are solved
- Per-module scoping of bindings
*/
pub mod checker;
pub mod context;
pub mod errors;
pub mod problem;
pub mod unification;

pub use checker::{Elaborated, TypeChecker, check, check_expr, check_program};
pub use context::{Ann, Ctx};
pub use errors::{CheckError, CheckResult, ProgramError};
pub use problem::{Judgment, Problem, Step};
pub use unification::{reduce, unify, zonk};
