/// Pal - A small dependently typed language
///
/// This crate implements the Pal front end, including:
/// - Tokenizer and recursive-descent parser
/// - Abstract syntax tree (AST) with substitution and alpha-equivalence
/// - Elaborating type checker with hole solving
/// - Pretty-printer that round-trips through the parser
pub mod ast;
pub mod parser;
pub mod printer;
pub mod typechecker;

pub use ast::{Binding, Expr, FnKind, Module, Program, SourceLoc};
pub use parser::{ParseError, Parser};
pub use printer::PrintOptions;
pub use typechecker::{CheckError, Ctx, ProgramError, TypeChecker};
