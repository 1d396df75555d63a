/// Parser for Pal
///
/// Hand-written recursive descent parser for Pal source code.
mod lexer;
mod parse;

pub use lexer::{Lexer, Token, TokenKind, tokenize};
pub use parse::{MAX_NESTING_DEPTH, ParseError, Parser, parse_expr, parse_program};
