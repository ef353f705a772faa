//! xmlquery - Mutable XML trees with an XPath-subset query engine
//!
//! Layers:
//! - core: byte-level scanning, entities, attribute parsing
//! - reader: zero-copy pull reader over XML text
//! - dom: arena-backed mutable tree, builder and printer
//! - xpath: lexer, parser, compiled expressions, evaluator
//! - query: fluent result sets with bulk mutation
//! - parallel: batch evaluation on the rayon pool (feature `parallel`)
//!
//! ```
//! use xmlquery::Document;
//!
//! let mut doc = Document::parse(
//!     "<catalog><book><title>XML Guide</title></book><book><title>JSON Guide</title></book></catalog>",
//! )?;
//! let books = doc.select("//book[title='XML Guide']")?;
//! assert_eq!(books.count(), 1);
//!
//! books.set_attr(&mut doc, "featured", "true");
//! assert_eq!(doc.select("//book[@featured]")?.count(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod core;
pub mod dom;
pub mod error;
#[cfg(feature = "parallel")]
pub mod parallel;
pub mod query;
pub mod reader;
pub mod xpath;

pub use dom::{
    Document, DocumentAccess, ElementSpec, NodeId, NodeKind, NodeRef, ReadOptions, TextPrinter,
    WriteOptions, XmlAttribute, XmlPrinter,
};
pub use error::{EvaluationError, QueryError, ReadError, SyntaxError, TreeError};
pub use query::ResultSet;
pub use xpath::{compile_cached, Expression, ExpressionCache, QueryOptions, Value};
