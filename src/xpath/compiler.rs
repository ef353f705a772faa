//! Compiled Expressions
//!
//! An [`Expression`] is a parsed, immutable AST behind an `Arc`: cheap to
//! clone and safe to share across threads. [`ExpressionCache`] keeps recently
//! compiled expressions in an LRU so hot query strings are parsed once.

use super::parser::{parse_with_depth, Expr, DEFAULT_MAX_DEPTH};
use crate::error::SyntaxError;
use lru::LruCache;
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::debug;

/// Default number of entries in an expression cache
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Limits and cache sizing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Deepest expression nesting the parser accepts
    pub max_depth: usize,
    /// Most nodes one evaluation may visit; `None` is unbounded
    pub max_visited_nodes: Option<usize>,
    /// Entries kept by an [`ExpressionCache`] built from these options
    pub cache_capacity: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            max_visited_nodes: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Compiled query expression
#[derive(Debug, Clone)]
pub struct Expression {
    source: Arc<str>,
    ast: Arc<Expr>,
}

impl Expression {
    /// Compile with default limits
    pub fn compile(source: &str) -> Result<Self, SyntaxError> {
        Self::compile_with(source, &QueryOptions::default())
    }

    /// Compile, rejecting expressions nested deeper than `options.max_depth`
    pub fn compile_with(source: &str, options: &QueryOptions) -> Result<Self, SyntaxError> {
        let ast = parse_with_depth(source, options.max_depth)?;
        Ok(Expression {
            source: Arc::from(source),
            ast: Arc::new(ast),
        })
    }

    /// Wrap a programmatically built AST; its source is the rendered expression
    pub fn from_ast(ast: Expr) -> Self {
        Expression {
            source: Arc::from(ast.to_string()),
            ast: Arc::new(ast),
        }
    }

    /// Expression text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed AST
    pub fn ast(&self) -> &Expr {
        &self.ast
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Expression {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::compile(s)
    }
}

/// LRU cache of compiled expressions keyed by source text
#[derive(Debug)]
pub struct ExpressionCache {
    entries: Mutex<LruCache<String, Expression>>,
    max_depth: usize,
}

impl ExpressionCache {
    /// Create a cache holding up to `capacity` expressions (at least one)
    pub fn new(capacity: usize) -> Self {
        Self::with_options(&QueryOptions {
            cache_capacity: capacity,
            ..QueryOptions::default()
        })
    }

    pub fn with_options(options: &QueryOptions) -> Self {
        let capacity = NonZeroUsize::new(options.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        ExpressionCache {
            entries: Mutex::new(LruCache::new(capacity)),
            max_depth: options.max_depth,
        }
    }

    /// Return the cached expression or compile and insert it
    ///
    /// Syntax errors are returned, never cached.
    pub fn get_or_compile(&self, source: &str) -> Result<Expression, SyntaxError> {
        if let Some(expr) = self.lock().get(source) {
            debug!(expression = source, "expression cache hit");
            return Ok(expr.clone());
        }

        debug!(expression = source, "expression cache miss");
        let expr = Expression::compile_with(
            source,
            &QueryOptions {
                max_depth: self.max_depth,
                ..QueryOptions::default()
            },
        )?;
        self.lock().put(source.to_string(), expr.clone());
        Ok(expr)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, Expression>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

static GLOBAL_CACHE: OnceLock<ExpressionCache> = OnceLock::new();

/// Compile through the process-wide cache
pub fn compile_cached(source: &str) -> Result<Expression, SyntaxError> {
    GLOBAL_CACHE
        .get_or_init(ExpressionCache::default)
        .get_or_compile(source)
}
