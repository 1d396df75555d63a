/**
Type checking errors for Pal
*/
use crate::ast::{Expr, Id, SourceLoc};
use thiserror::Error;

// Box the error type to reduce stack size (clippy::result_large_err)
pub type CheckResult<T> = Result<T, Box<CheckError>>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    /// Reference to a name that is not in scope
    #[error("unknown variable `{id}`")]
    UnknownVar { id: Id, loc: Option<SourceLoc> },

    /// Solving a hole would make it contain itself
    #[error("cycle: `{hole}` occurs in `{expr}`")]
    Cycle { hole: Id, expr: Expr },

    /// Two hole-free terms that are not alpha-equivalent
    #[error("mismatch: expected `{expected}`, found `{actual}`")]
    RigidMismatch { expected: Expr, actual: Expr },

    /// Binders of different kind or implicitness
    #[error("binder mismatch: expected `{expected}`, found `{actual}`")]
    KindMismatch { expected: Expr, actual: Expr },

    /// Nothing was solved in a whole round
    #[error("stuck on unsolved {}", holes(.needs))]
    Stuck { needs: Vec<Id> },

    /// No rule relates the two terms and neither mentions a hole
    #[error("can't unify `{expected}` with `{actual}`")]
    CannotUnify { expected: Expr, actual: Expr },

    /// Axiom without a declared type
    #[error("`{id}` has neither a type nor a value")]
    MissingType { id: Id },
}

impl CheckError {
    /// Human-readable reason, as used in reports
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// Position in the source the error points at, when known
    pub fn loc(&self) -> Option<SourceLoc> {
        match self {
            CheckError::UnknownVar { loc, .. } => *loc,
            CheckError::RigidMismatch { actual, .. }
            | CheckError::KindMismatch { actual, .. }
            | CheckError::CannotUnify { actual, .. } => actual.loc(),
            CheckError::Cycle { expr, .. } => expr.loc(),
            CheckError::Stuck { .. } | CheckError::MissingType { .. } => None,
        }
    }
}

fn holes(needs: &[Id]) -> String {
    let noun = if needs.len() == 1 { "hole" } else { "holes" };
    format!("{noun} {}", needs.join(", "))
}

/// First failure of a program check, tagged with the binding it came from
#[derive(Debug, Clone, PartialEq, Error)]
#[error("in `{binding}`: {error}")]
pub struct ProgramError {
    pub binding: Id,
    #[source]
    pub error: Box<CheckError>,
}
