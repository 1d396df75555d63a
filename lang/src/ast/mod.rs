/**
Abstract Syntax Tree definitions for Pal

This module defines the expression language shared by the parser,
the checker and the printer.
*/
pub mod ids;
pub mod ops;

use std::fmt;

pub use ids::{Id, IdSet, TYPE_ID, fresh_in, freshen, is_hole};

/// Source code location for diagnostics
///
/// Both coordinates are 0-based, exactly as the lexer counts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLoc {
    pub line: usize,
    pub column: usize,
}

impl SourceLoc {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// A complete program: modules in source order
pub type Program = Vec<Module>;

/// A module: bindings in source order
pub type Module = Vec<Binding>;

/// A named term with an optional declared type and optional definition
///
/// A binding without a value is an axiom; one without a type has its
/// type inferred from the value.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub id: Id,
    pub ty: Option<Expr>,
    pub value: Option<Expr>,
}

impl Binding {
    pub fn new(id: impl Into<Id>, ty: Option<Expr>, value: Option<Expr>) -> Self {
        Binding {
            id: id.into(),
            ty,
            value,
        }
    }
}

/// What a binder builds: a value-level function or a function type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FnKind {
    /// `{ ... }` body
    Def,
    /// `[ ... ]` body (a Pi-type)
    Type,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a bound name, a global or a hole
    Var { id: Id, loc: Option<SourceLoc> },

    /// Application; `implicit` selects `<...>` over `(...)`
    App {
        implicit: bool,
        func: Box<Expr>,
        arg: Box<Expr>,
        loc: Option<SourceLoc>,
    },

    /// Binder; without `arg_id` the result does not depend on the argument
    Fn {
        kind: FnKind,
        implicit: bool,
        arg_id: Option<Id>,
        arg_type: Box<Expr>,
        result: Box<Expr>,
        loc: Option<SourceLoc>,
    },
}

impl Expr {
    pub fn var(id: impl Into<Id>) -> Self {
        Expr::Var {
            id: id.into(),
            loc: None,
        }
    }

    /// The universe constant `Type : Type`
    ///
    /// The checker introduces it itself, so it never carries a position.
    /// A `Type` written in source keeps its position and is an ordinary
    /// reference to the `Type` axiom.
    pub fn universe() -> Self {
        Expr::var(TYPE_ID)
    }

    pub fn app(implicit: bool, func: Expr, arg: Expr) -> Self {
        Expr::App {
            implicit,
            func: Box::new(func),
            arg: Box::new(arg),
            loc: None,
        }
    }

    pub fn func(
        kind: FnKind,
        implicit: bool,
        arg_id: Option<Id>,
        arg_type: Expr,
        result: Expr,
    ) -> Self {
        Expr::Fn {
            kind,
            implicit,
            arg_id,
            arg_type: Box::new(arg_type),
            result: Box::new(result),
            loc: None,
        }
    }

    /// Get the source location of any expression
    pub fn loc(&self) -> Option<SourceLoc> {
        match self {
            Expr::Var { loc, .. } | Expr::App { loc, .. } | Expr::Fn { loc, .. } => *loc,
        }
    }

    pub fn is_universe(&self) -> bool {
        matches!(self, Expr::Var { id, loc: None } if id == TYPE_ID)
    }

    pub fn as_var(&self) -> Option<&str> {
        match self {
            Expr::Var { id, .. } => Some(id),
            _ => None,
        }
    }

    /// A bare hole reference such as `_3`
    pub fn as_hole(&self) -> Option<&str> {
        self.as_var().filter(|id| is_hole(id))
    }

    /// Peel nested applications: the head and its arguments, outermost first
    pub fn spine(&self) -> (&Expr, Vec<(bool, &Expr)>) {
        let mut head = self;
        let mut args = Vec::new();
        while let Expr::App {
            implicit,
            func,
            arg,
            ..
        } = head
        {
            args.push((*implicit, arg.as_ref()));
            head = func;
        }
        (head, args)
    }
}
