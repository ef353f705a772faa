//! Error types
//!
//! One error per concern:
//! - [`SyntaxError`]: malformed query expression (lexer/parser)
//! - [`EvaluationError`]: failures while walking a parsed expression
//! - [`QueryError`]: either of the above, for the compile-and-run entry points
//! - [`TreeError`]: invalid tree mutations
//! - [`ReadError`]: malformed XML text handed to the reader
//!
//! Type-coercion mismatches inside predicates are never errors; they resolve
//! to `false` or NaN.

use crate::dom::NodeId;
use thiserror::Error;

/// A malformed query expression.
///
/// `offset` is a character (not byte) offset into the expression string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at offset {offset}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub offset: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        SyntaxError {
            message: message.into(),
            offset,
        }
    }

    /// Render the expression with a caret under the failing character.
    ///
    /// ```text
    /// //book[title='XML
    ///              ^ unterminated string literal
    /// ```
    pub fn caret(&self, source: &str) -> String {
        let pad: String = source
            .chars()
            .take(self.offset)
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        format!("{}\n{}^ {}", source, pad, self.message)
    }
}

/// Failure while evaluating a parsed expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// Only reachable for hand-built ASTs; the parser rejects unknown names.
    #[error("unknown function: {0}()")]
    UnknownFunction(String),

    /// No root to evaluate against, or a root id that is not in the document.
    #[error("invalid evaluation root: {0}")]
    InvalidRoot(String),

    /// `evaluate` was asked for nodes but the expression yields a scalar.
    #[error("expression does not select nodes (yields {0})")]
    NotANodeSet(&'static str),

    #[error("evaluation visited more than {limit} nodes")]
    LimitExceeded { limit: usize },
}

/// Error from the parse-then-evaluate convenience entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// Invalid tree mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node {0} does not belong to this document")]
    UnknownNode(NodeId),

    /// Inserting `child` under `parent` would make a node its own ancestor.
    #[error("inserting node {child} under {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    /// Comment and CDATA markers carry neither children nor attributes.
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),
}

/// Malformed XML text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed XML at byte {offset}: {message}")]
pub struct ReadError {
    pub message: String,
    pub offset: usize,
}

impl ReadError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        ReadError {
            message: message.into(),
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caret_points_at_offset() {
        let err = SyntaxError::new("unexpected ']'", 3);
        let rendered = err.caret("//a]");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "//a]");
        assert_eq!(lines[1], "   ^ unexpected ']'");
    }

    #[test]
    fn test_query_error_is_transparent() {
        let err: QueryError = SyntaxError::new("boom", 2).into();
        assert_eq!(err.to_string(), "syntax error at offset 2: boom");
    }
}
