//! Query Engine
//!
//! A small XPath subset over [`crate::dom`] trees:
//! - Paths with child, descendant-or-self (`//`), self (`.`) and parent (`..`) steps
//! - Name, wildcard and attribute (`@name`) tests with bracketed predicates
//! - `or and not`, comparisons, arithmetic, unions
//! - `contains() not() position() last() text() name()`
//! - Compiled expression caching

pub mod axes;
pub mod compiler;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use compiler::{compile_cached, Expression, ExpressionCache, QueryOptions};
pub use eval::{evaluate, evaluate_value, evaluate_value_with, evaluate_with, filter};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse, ArithmeticOp, Axis, CompareOp, Expr, NameTest, NodeTest, PathExpr, Step};
pub use value::Value;
