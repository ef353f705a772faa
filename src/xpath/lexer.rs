//! Query Lexer
//!
//! Tokenizes query expressions into [`Token`]s carrying their character
//! offset. Keyword handling is context-sensitive:
//! - `and`, `or`, `div`, `mod` are operators only right after an operand,
//!   so `//div` and `//mod/and` are plain paths
//! - `not` is a keyword except as a step name (after `/`, `//` or `@`)
//! - `*` is multiplication after an operand and a wildcard elsewhere

use crate::error::SyntaxError;
use std::fmt;

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Star,        // *
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,         // and
    Or,          // or
    Not,         // not
    Mod,         // mod
    Div,         // div

    // Brackets
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    Comma,        // ,

    // Literals
    Number(f64),
    String(String),

    // Names
    Name(String),

    // End of input
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Slash => "'/'",
            TokenKind::DoubleSlash => "'//'",
            TokenKind::Dot => "'.'",
            TokenKind::DoubleDot => "'..'",
            TokenKind::At => "'@'",
            TokenKind::Pipe => "'|'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Eq => "'='",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::LtEq => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::GtEq => "'>='",
            TokenKind::And => "'and'",
            TokenKind::Or => "'or'",
            TokenKind::Not => "'not'",
            TokenKind::Mod => "'mod'",
            TokenKind::Div => "'div'",
            TokenKind::LeftParen => "'('",
            TokenKind::RightParen => "')'",
            TokenKind::LeftBracket => "'['",
            TokenKind::RightBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Number(n) => return write!(f, "number {}", n),
            TokenKind::String(s) => return write!(f, "string '{}'", s),
            TokenKind::Name(name) => return write!(f, "name '{}'", name),
            TokenKind::Eof => "end of expression",
        };
        f.write_str(text)
    }
}

/// A token and the character offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

/// Tokenize a whole expression; the last token is always [`TokenKind::Eof`]
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

/// Query lexer
pub struct Lexer<'a> {
    input: &'a str,
    /// Byte position into `input`
    pos: usize,
    /// Character position, reported in tokens and errors
    offset: usize,
    /// Whether the previous token closed an operand
    after_operand: bool,
    /// Whether the previous token was `/`, `//` or `@`
    after_step_marker: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            offset: 0,
            after_operand: false,
            after_step_marker: false,
        }
    }

    /// Get the remaining input
    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Peek at current character
    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Peek at character at offset
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    /// Advance past one character
    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            self.offset += 1;
        }
    }

    /// Skip whitespace
    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, SyntaxError> {
        self.skip_whitespace();
        let offset = self.offset;

        let Some(c) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                offset,
            });
        };

        let kind = match c {
            '/' => {
                self.bump();
                if self.peek() == Some('/') {
                    self.bump();
                    TokenKind::DoubleSlash
                } else {
                    TokenKind::Slash
                }
            }
            '.' => {
                if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    self.read_number()
                } else {
                    self.bump();
                    if self.peek() == Some('.') {
                        self.bump();
                        TokenKind::DoubleDot
                    } else {
                        TokenKind::Dot
                    }
                }
            }
            '!' => {
                self.bump();
                if self.peek() != Some('=') {
                    return Err(SyntaxError::new("unexpected character '!'", offset));
                }
                self.bump();
                TokenKind::NotEq
            }
            '<' | '>' => {
                self.bump();
                let or_equal = self.peek() == Some('=');
                if or_equal {
                    self.bump();
                }
                match (c, or_equal) {
                    ('<', false) => TokenKind::Lt,
                    ('<', true) => TokenKind::LtEq,
                    (_, false) => TokenKind::Gt,
                    (_, true) => TokenKind::GtEq,
                }
            }
            '"' | '\'' => self.read_string(c, offset)?,
            '0'..='9' => self.read_number(),
            _ if is_name_start_char(c) => self.read_name_or_keyword(),
            _ => {
                let kind = match c {
                    '@' => TokenKind::At,
                    '|' => TokenKind::Pipe,
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    '*' => TokenKind::Star,
                    '=' => TokenKind::Eq,
                    '(' => TokenKind::LeftParen,
                    ')' => TokenKind::RightParen,
                    '[' => TokenKind::LeftBracket,
                    ']' => TokenKind::RightBracket,
                    ',' => TokenKind::Comma,
                    _ => {
                        return Err(SyntaxError::new(
                            format!("unexpected character '{}'", c),
                            offset,
                        ))
                    }
                };
                self.bump();
                kind
            }
        };

        self.after_operand = match kind {
            TokenKind::Name(_)
            | TokenKind::String(_)
            | TokenKind::Number(_)
            | TokenKind::RightParen
            | TokenKind::RightBracket
            | TokenKind::Dot
            | TokenKind::DoubleDot => true,
            // A wildcard ends an operand, a multiplication does not
            TokenKind::Star => !self.after_operand,
            _ => false,
        };
        self.after_step_marker = matches!(
            kind,
            TokenKind::Slash | TokenKind::DoubleSlash | TokenKind::At
        );

        Ok(Token { kind, offset })
    }

    /// Read a number literal: digits with an optional fraction, or `.digits`
    fn read_number(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        let text = &self.input[start..self.pos];
        // Digits with at most one '.' always parse
        TokenKind::Number(text.parse().unwrap_or(f64::NAN))
    }

    /// Read a string literal delimited by `quote`
    fn read_string(&mut self, quote: char, offset: usize) -> Result<TokenKind, SyntaxError> {
        self.bump();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let value = self.input[start..self.pos].to_string();
                self.bump();
                return Ok(TokenKind::String(value));
            }
            self.bump();
        }
        Err(SyntaxError::new("unterminated string literal", offset))
    }

    /// Read a name or keyword
    fn read_name_or_keyword(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.bump();
        }
        let name = &self.input[start..self.pos];

        match name {
            "and" if self.after_operand => TokenKind::And,
            "or" if self.after_operand => TokenKind::Or,
            "div" if self.after_operand => TokenKind::Div,
            "mod" if self.after_operand => TokenKind::Mod,
            "not" if !self.after_step_marker => TokenKind::Not,
            _ => TokenKind::Name(name.to_string()),
        }
    }
}

/// Check if character can start a name
fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Check if character can be part of a name
fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}
