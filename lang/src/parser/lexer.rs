/// Lexer for Pal
///
/// Tokenizes Pal source into a stream of tokens. Brackets and
/// punctuation are always tokens of their own; everything else up to
/// the next separator is a word. `_` and `-` are single-character
/// tokens when they start a token and ordinary word characters inside one.
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    /// 0-based
    pub line: usize,
    /// 0-based
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Delimiters
    LeftParen,    // (
    RightParen,   // )
    LeftAngle,    // <
    RightAngle,   // >
    LeftBracket,  // [
    RightBracket, // ]
    LeftBrace,    // {
    RightBrace,   // }

    // Punctuation
    Comma,  // ,
    Colon,  // :
    Dot,    // .
    Equals, // =

    // Word starters
    Underscore, // _
    Dash,       // -

    // Identifier
    Ident,

    // End of file
    Eof,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 0,
            column: 0,
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        if self.is_at_end() {
            return self.make_token(TokenKind::Eof, "");
        }

        let start_line = self.line;
        let start_column = self.column;
        let c = self.peek();

        if let Some(kind) = punctuation(c).or_else(|| word_starter(c)) {
            self.advance();
            return Token {
                kind,
                lexeme: c.to_string(),
                line: start_line,
                column: start_column,
            };
        }

        self.word()
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.peek().is_whitespace() {
            self.advance();
        }
    }

    fn word(&mut self) -> Token {
        let start_line = self.line;
        let start_column = self.column;
        let mut value = String::new();

        while !self.is_at_end() {
            let c = self.peek();
            if c.is_whitespace() || punctuation(c).is_some() {
                break;
            }
            value.push(c);
            self.advance();
        }

        Token {
            kind: TokenKind::Ident,
            lexeme: value,
            line: start_line,
            column: start_column,
        }
    }

    fn make_token(&self, kind: TokenKind, lexeme: &str) -> Token {
        Token {
            kind,
            lexeme: lexeme.to_string(),
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.input[self.position]
        }
    }

    fn advance(&mut self) -> char {
        let c = self.peek();
        self.position += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        c
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }
}

/// Tokenize a whole source string, ending with an `Eof` token
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

fn punctuation(c: char) -> Option<TokenKind> {
    let kind = match c {
        '(' => TokenKind::LeftParen,
        ')' => TokenKind::RightParen,
        '<' => TokenKind::LeftAngle,
        '>' => TokenKind::RightAngle,
        '[' => TokenKind::LeftBracket,
        ']' => TokenKind::RightBracket,
        '{' => TokenKind::LeftBrace,
        '}' => TokenKind::RightBrace,
        ',' => TokenKind::Comma,
        ':' => TokenKind::Colon,
        '.' => TokenKind::Dot,
        '=' => TokenKind::Equals,
        _ => return None,
    };
    Some(kind)
}

fn word_starter(c: char) -> Option<TokenKind> {
    match c {
        '_' => Some(TokenKind::Underscore),
        '-' => Some(TokenKind::Dash),
        _ => None,
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::RightParen => write!(f, ")"),
            TokenKind::LeftAngle => write!(f, "<"),
            TokenKind::RightAngle => write!(f, ">"),
            TokenKind::LeftBracket => write!(f, "["),
            TokenKind::RightBracket => write!(f, "]"),
            TokenKind::LeftBrace => write!(f, "{{"),
            TokenKind::RightBrace => write!(f, "}}"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Equals => write!(f, "="),
            TokenKind::Underscore => write!(f, "_"),
            TokenKind::Dash => write!(f, "-"),
            TokenKind::Ident => write!(f, "IDENT"),
            TokenKind::Eof => write!(f, "EOF"),
        }
    }
}
