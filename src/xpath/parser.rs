//! Query Parser
//!
//! Precedence climbing over the token stream. Binding power, lowest first:
//!
//! | level          | operators                  |
//! |----------------|----------------------------|
//! | union          | `\|` (operands are paths)  |
//! | or             | `or`                       |
//! | and            | `and`                      |
//! | not (prefix)   | `not`                      |
//! | comparison     | `= != < <= > >=`           |
//! | additive       | `+ -`                      |
//! | multiplicative | `* div mod`                |
//! | unary/primary  | `-x`, literals, calls, paths, `( )` |
//!
//! The AST is immutable once built and is re-evaluated without re-parsing.

use super::functions;
use super::lexer::{tokenize, Token, TokenKind};
use crate::error::SyntaxError;
use std::fmt;

/// Default limit on expression nesting
pub const DEFAULT_MAX_DEPTH: usize = 64;

const OR_BP: u8 = 1;
const AND_BP: u8 = 2;
const NOT_BP: u8 = 3;
const COMPARE_BP: u8 = 4;
const ADDITIVE_BP: u8 = 5;
const MULTIPLICATIVE_BP: u8 = 6;
const UNARY_BP: u8 = 7;

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Location path
    Path(PathExpr),
    /// Union of two or more paths (`|`)
    Union(Vec<PathExpr>),
    /// Bare `@name` relative to the context node
    AttributeRef(NameTest),
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare(Box<Expr>, CompareOp, Box<Expr>),
    Arithmetic(Box<Expr>, ArithmeticOp, Box<Expr>),
    /// Unary minus
    Negate(Box<Expr>),
    /// Function call (name + argument expressions)
    FunctionCall(String, Vec<Expr>),
    /// Literal number
    Number(f64),
    /// Literal string
    String(String),
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Sequence of steps, optionally anchored at the document
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

/// Location step in a path
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    /// Conjoined filters, in source order
    pub predicates: Vec<Expr>,
}

impl Step {
    pub fn new(axis: Axis, test: NodeTest) -> Self {
        Step {
            axis,
            test,
            predicates: Vec::new(),
        }
    }
}

/// Axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// `.`
    SelfNode,
    Child,
    /// `//`: the node itself and its whole subtree
    DescendantOrSelf,
    /// `..`
    Parent,
}

/// Name test shared by element and attribute steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTest {
    Name(String),
    Wildcard,
}

impl NameTest {
    /// A name with a prefix matches the qualified name, otherwise the local name
    pub fn matches(&self, local: &str, qualified: &str) -> bool {
        match self {
            NameTest::Wildcard => true,
            NameTest::Name(name) if name.contains(':') => name == qualified,
            NameTest::Name(name) => name == local,
        }
    }
}

/// Node test in a location step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// Element with a matching name
    Element(NameTest),
    /// Attribute with a matching name (yields values, not nodes)
    Attribute(NameTest),
    /// Any element (used by `.` and `..`)
    AnyNode,
}

/// Tokenize and parse with the default nesting limit
pub fn parse(source: &str) -> Result<Expr, SyntaxError> {
    parse_with_depth(source, DEFAULT_MAX_DEPTH)
}

/// Tokenize and parse, rejecting expressions nested deeper than `max_depth`
pub fn parse_with_depth(source: &str, max_depth: usize) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens, max_depth).parse()
}

/// Query parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    /// Create a parser over a token stream; a missing trailing `Eof` is added
    pub fn new(mut tokens: Vec<Token>, max_depth: usize) -> Self {
        if tokens.last().map(|t| &t.kind) != Some(&TokenKind::Eof) {
            let offset = tokens.last().map_or(0, |t| t.offset + 1);
            tokens.push(Token {
                kind: TokenKind::Eof,
                offset,
            });
        }
        Parser {
            tokens,
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    /// Parse the whole token stream into one expression
    pub fn parse(mut self) -> Result<Expr, SyntaxError> {
        let expr = self.parse_union()?;
        if self.peek().kind != TokenKind::Eof {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind_at(&self, n: usize) -> &TokenKind {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, SyntaxError> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(SyntaxError::new(
                format!("expected {}, found {}", kind, token.kind),
                token.offset,
            ))
        }
    }

    fn unexpected(&self) -> SyntaxError {
        let token = self.peek();
        SyntaxError::new(format!("unexpected {}", token.kind), token.offset)
    }

    fn enter(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(SyntaxError::new(
                format!("expression nests deeper than {} levels", self.max_depth),
                self.peek().offset,
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Union: `path | path | ...`
    fn parse_union(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.peek().offset;
        let first = self.parse_binary(OR_BP)?;
        if self.peek().kind != TokenKind::Pipe {
            return Ok(first);
        }

        let mut paths = vec![union_operand(first, start)?];
        while self.peek().kind == TokenKind::Pipe {
            self.advance();
            let offset = self.peek().offset;
            let operand = self.parse_binary(OR_BP)?;
            paths.push(union_operand(operand, offset)?);
        }
        Ok(Expr::Union(paths))
    }

    /// Binary operators at or above `min_bp`
    fn parse_binary(&mut self, min_bp: u8) -> Result<Expr, SyntaxError> {
        self.enter()?;
        let mut lhs = self.parse_prefix()?;

        while let Some((op, bp)) = binary_op(&self.peek().kind) {
            if bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(bp + 1)?;
            lhs = op.build(lhs, rhs);
        }

        self.leave();
        Ok(lhs)
    }

    /// Prefix `not` and unary minus
    fn parse_prefix(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek().kind {
            TokenKind::Not if *self.peek_kind_at(1) != TokenKind::LeftParen => {
                self.advance();
                let operand = self.parse_binary(NOT_BP + 1)?;
                Ok(Expr::Not(Box::new(operand)))
            }
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_binary(UNARY_BP)?;
                Ok(Expr::Negate(Box::new(operand)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::String(s))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_union()?;
                self.expect(TokenKind::RightParen)?;
                Ok(expr)
            }
            TokenKind::Not => {
                let mut args = self.parse_call("not", token.offset)?;
                match args.pop() {
                    Some(arg) => Ok(Expr::Not(Box::new(arg))),
                    None => Err(SyntaxError::new("not() takes 1 argument", token.offset)),
                }
            }
            TokenKind::Name(ref name) if *self.peek_kind_at(1) == TokenKind::LeftParen => {
                let args = self.parse_call(name, token.offset)?;
                Ok(Expr::FunctionCall(name.clone(), args))
            }
            TokenKind::Slash
            | TokenKind::DoubleSlash
            | TokenKind::Name(_)
            | TokenKind::Star
            | TokenKind::At
            | TokenKind::Dot
            | TokenKind::DoubleDot => self.parse_path(),
            _ => Err(SyntaxError::new(
                format!("expected an operand, found {}", token.kind),
                token.offset,
            )),
        }
    }

    /// `name(arg, ...)`, checked against the fixed function set
    fn parse_call(&mut self, name: &str, offset: usize) -> Result<Vec<Expr>, SyntaxError> {
        self.advance();
        self.expect(TokenKind::LeftParen)?;

        let mut args = Vec::new();
        if self.peek().kind != TokenKind::RightParen {
            loop {
                args.push(self.parse_union()?);
                if self.peek().kind != TokenKind::Comma {
                    break;
                }
                self.advance();
            }
        }
        self.expect(TokenKind::RightParen)?;

        match functions::arity(name) {
            None => Err(SyntaxError::new(format!("unknown function '{}()'", name), offset)),
            Some(arity) if arity != args.len() => Err(SyntaxError::new(
                format!(
                    "{}() takes {} argument{}, found {}",
                    name,
                    arity,
                    if arity == 1 { "" } else { "s" },
                    args.len()
                ),
                offset,
            )),
            Some(_) => Ok(args),
        }
    }

    /// Location path
    fn parse_path(&mut self) -> Result<Expr, SyntaxError> {
        let mut absolute = false;
        let mut axis = Axis::Child;
        match self.peek().kind {
            TokenKind::Slash => {
                absolute = true;
                self.advance();
                if !starts_step(&self.peek().kind) {
                    return Err(SyntaxError::new(
                        format!("expected a step after '/', found {}", self.peek().kind),
                        self.peek().offset,
                    ));
                }
            }
            TokenKind::DoubleSlash => {
                absolute = true;
                axis = Axis::DescendantOrSelf;
                self.advance();
            }
            _ => {}
        }

        let mut steps = Vec::new();
        loop {
            self.parse_step(axis, &mut steps)?;
            axis = match self.peek().kind {
                TokenKind::Slash => Axis::Child,
                TokenKind::DoubleSlash => Axis::DescendantOrSelf,
                _ => break,
            };
            if steps
                .last()
                .is_some_and(|s| matches!(s.test, NodeTest::Attribute(_)))
            {
                return Err(SyntaxError::new(
                    "an attribute step must be the last step of a path",
                    self.peek().offset,
                ));
            }
            self.advance();
        }

        if let [Step {
            axis: Axis::Child,
            test: NodeTest::Attribute(name),
            ..
        }] = steps.as_slice()
        {
            if !absolute {
                return Ok(Expr::AttributeRef(name.clone()));
            }
        }
        Ok(Expr::Path(PathExpr { absolute, steps }))
    }

    fn parse_step(&mut self, axis: Axis, steps: &mut Vec<Step>) -> Result<(), SyntaxError> {
        let token = self.advance();

        // `//.`, `//..` and `//@x` walk the subtree first
        let axis = if axis == Axis::DescendantOrSelf
            && matches!(token.kind, TokenKind::Dot | TokenKind::DoubleDot | TokenKind::At)
        {
            steps.push(Step::new(Axis::DescendantOrSelf, NodeTest::AnyNode));
            Axis::Child
        } else {
            axis
        };

        let (axis, test) = match token.kind {
            TokenKind::Dot => (Axis::SelfNode, NodeTest::AnyNode),
            TokenKind::DoubleDot => (Axis::Parent, NodeTest::AnyNode),
            TokenKind::Name(name) => (axis, NodeTest::Element(NameTest::Name(name))),
            TokenKind::Star => (axis, NodeTest::Element(NameTest::Wildcard)),
            TokenKind::At => {
                let name = self.advance();
                let test = match name.kind {
                    TokenKind::Name(n) => NameTest::Name(n),
                    TokenKind::Star => NameTest::Wildcard,
                    other => {
                        return Err(SyntaxError::new(
                            format!("expected an attribute name after '@', found {}", other),
                            name.offset,
                        ))
                    }
                };
                (axis, NodeTest::Attribute(test))
            }
            other => {
                return Err(SyntaxError::new(
                    format!("expected a step, found {}", other),
                    token.offset,
                ))
            }
        };

        let mut predicates = Vec::new();
        while self.peek().kind == TokenKind::LeftBracket {
            let open = self.advance();
            if matches!(test, NodeTest::Attribute(_)) {
                return Err(SyntaxError::new(
                    "attribute steps cannot take predicates",
                    open.offset,
                ));
            }
            let predicate = self.parse_union()?;
            self.expect(TokenKind::RightBracket)?;
            predicates.push(desugar_predicate(predicate));
        }

        steps.push(Step {
            axis,
            test,
            predicates,
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum BinaryOp {
    Or,
    And,
    Compare(CompareOp),
    Arithmetic(ArithmeticOp),
}

impl BinaryOp {
    fn build(self, lhs: Expr, rhs: Expr) -> Expr {
        let (lhs, rhs) = (Box::new(lhs), Box::new(rhs));
        match self {
            BinaryOp::Or => Expr::Or(lhs, rhs),
            BinaryOp::And => Expr::And(lhs, rhs),
            BinaryOp::Compare(op) => Expr::Compare(lhs, op, rhs),
            BinaryOp::Arithmetic(op) => Expr::Arithmetic(lhs, op, rhs),
        }
    }
}

/// Binary operator in operator position, with its binding power
fn binary_op(kind: &TokenKind) -> Option<(BinaryOp, u8)> {
    let entry = match kind {
        TokenKind::Or => (BinaryOp::Or, OR_BP),
        TokenKind::And => (BinaryOp::And, AND_BP),
        TokenKind::Eq => (BinaryOp::Compare(CompareOp::Eq), COMPARE_BP),
        TokenKind::NotEq => (BinaryOp::Compare(CompareOp::NotEq), COMPARE_BP),
        TokenKind::Lt => (BinaryOp::Compare(CompareOp::Lt), COMPARE_BP),
        TokenKind::LtEq => (BinaryOp::Compare(CompareOp::LtEq), COMPARE_BP),
        TokenKind::Gt => (BinaryOp::Compare(CompareOp::Gt), COMPARE_BP),
        TokenKind::GtEq => (BinaryOp::Compare(CompareOp::GtEq), COMPARE_BP),
        TokenKind::Plus => (BinaryOp::Arithmetic(ArithmeticOp::Add), ADDITIVE_BP),
        TokenKind::Minus => (BinaryOp::Arithmetic(ArithmeticOp::Sub), ADDITIVE_BP),
        TokenKind::Star => (BinaryOp::Arithmetic(ArithmeticOp::Mul), MULTIPLICATIVE_BP),
        TokenKind::Div => (BinaryOp::Arithmetic(ArithmeticOp::Div), MULTIPLICATIVE_BP),
        TokenKind::Mod => (BinaryOp::Arithmetic(ArithmeticOp::Mod), MULTIPLICATIVE_BP),
        _ => return None,
    };
    Some(entry)
}

fn starts_step(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Name(_) | TokenKind::Star | TokenKind::At | TokenKind::Dot | TokenKind::DoubleDot
    )
}

fn union_operand(expr: Expr, offset: usize) -> Result<PathExpr, SyntaxError> {
    match expr {
        Expr::Path(path)
            if !path
                .steps
                .last()
                .is_some_and(|s| matches!(s.test, NodeTest::Attribute(_))) =>
        {
            Ok(path)
        }
        _ => Err(SyntaxError::new(
            "operands of '|' must be element paths",
            offset,
        )),
    }
}

/// `[n]` means `[position() = n]`
fn desugar_predicate(expr: Expr) -> Expr {
    match expr {
        Expr::Number(_) => Expr::Compare(
            Box::new(Expr::FunctionCall("position".to_string(), Vec::new())),
            CompareOp::Eq,
            Box::new(expr),
        ),
        other => other,
    }
}

// ============================================================================
// Rendering back to expression text
// ============================================================================

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        })
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "div",
            ArithmeticOp::Mod => "mod",
        })
    }
}

impl fmt::Display for NameTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameTest::Name(name) => f.write_str(name),
            NameTest::Wildcard => f.write_str("*"),
        }
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step.axis {
                Axis::DescendantOrSelf => f.write_str("//")?,
                _ if i > 0 || self.absolute => f.write_str("/")?,
                _ => {}
            }
            match (&step.axis, &step.test) {
                (Axis::SelfNode, _) => f.write_str(".")?,
                (Axis::Parent, _) => f.write_str("..")?,
                (_, NodeTest::AnyNode) => f.write_str(".")?,
                (_, NodeTest::Element(test)) => write!(f, "{}", test)?,
                (_, NodeTest::Attribute(test)) => write!(f, "@{}", test)?,
            }
            for predicate in &step.predicates {
                write!(f, "[{}]", predicate)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Path(path) => write!(f, "{}", path),
            Expr::Union(paths) => {
                for (i, path) in paths.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", path)?;
                }
                Ok(())
            }
            Expr::AttributeRef(test) => write!(f, "@{}", test),
            Expr::Or(l, r) => write!(f, "({} or {})", l, r),
            Expr::And(l, r) => write!(f, "({} and {})", l, r),
            Expr::Not(e) => write!(f, "not({})", e),
            Expr::Compare(l, op, r) => write!(f, "{} {} {}", l, op, r),
            Expr::Arithmetic(l, op, r) => write!(f, "({} {} {})", l, op, r),
            Expr::Negate(e) => write!(f, "-{}", e),
            Expr::FunctionCall(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Number(n) => write!(f, "{}", n),
            Expr::String(s) if s.contains('\'') => write!(f, "\"{}\"", s),
            Expr::String(s) => write!(f, "'{}'", s),
        }
    }
}
