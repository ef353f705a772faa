//! Query Functions
//!
//! The fixed function set:
//! - `contains(haystack, needle)`, `not(expr)`
//! - `position()`, `last()` (context position and size)
//! - `text()` (own text of the context node), `name()` (its qualified name)
//!
//! Arity is checked by the parser; `call` re-checks for hand-built ASTs.

use super::eval::EvalContext;
use super::value::Value;
use crate::dom::DocumentAccess;
use crate::error::EvaluationError;
use memchr::memmem;

/// Name and arity of every supported function
pub const FUNCTIONS: &[(&str, usize)] = &[
    ("contains", 2),
    ("not", 1),
    ("position", 0),
    ("last", 0),
    ("text", 0),
    ("name", 0),
];

/// Arity of a known function
pub fn arity(name: &str) -> Option<usize> {
    FUNCTIONS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, arity)| arity)
}

/// Evaluate a function call
pub fn call<D: DocumentAccess + ?Sized>(
    name: &str,
    args: Vec<Value>,
    ctx: &EvalContext<'_, D>,
) -> Result<Value, EvaluationError> {
    if arity(name) != Some(args.len()) {
        return Err(EvaluationError::UnknownFunction(format!(
            "{}/{}",
            name,
            args.len()
        )));
    }

    match name {
        "position" => Ok(Value::Number(ctx.position as f64)),
        "last" => Ok(Value::Number(ctx.size as f64)),
        "text" => Ok(Value::String(
            ctx.doc.text_content(ctx.node).unwrap_or("").to_string(),
        )),
        "name" => Ok(Value::String(
            ctx.doc.node_name(ctx.node).unwrap_or("").to_string(),
        )),
        "not" => Ok(Value::Boolean(!args[0].to_boolean())),
        "contains" => fn_contains(&args[0], &args[1], ctx.doc),
        _ => Err(EvaluationError::UnknownFunction(name.to_string())),
    }
}

/// Substring test after coercing both arguments to strings
fn fn_contains<D: DocumentAccess + ?Sized>(
    haystack: &Value,
    needle: &Value,
    doc: &D,
) -> Result<Value, EvaluationError> {
    let haystack = haystack.to_string_value(doc);
    let needle = needle.to_string_value(doc);
    let found = memmem::find(haystack.as_bytes(), needle.as_bytes()).is_some();
    Ok(Value::Boolean(found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, ElementSpec};

    fn context(doc: &Document) -> EvalContext<'_, Document> {
        let node = doc.document_element().unwrap();
        EvalContext {
            doc,
            node,
            position: 2,
            size: 5,
        }
    }

    #[test]
    fn test_arity_table() {
        assert_eq!(arity("contains"), Some(2));
        assert_eq!(arity("position"), Some(0));
        assert_eq!(arity("count"), None);
    }

    #[test]
    fn test_context_functions() {
        let doc = Document::with_root(ElementSpec::new("ns:item").text("hello"));
        let ctx = context(&doc);
        assert_eq!(call("position", vec![], &ctx).unwrap(), Value::Number(2.0));
        assert_eq!(call("last", vec![], &ctx).unwrap(), Value::Number(5.0));
        assert_eq!(call("text", vec![], &ctx).unwrap(), Value::from("hello"));
        assert_eq!(call("name", vec![], &ctx).unwrap(), Value::from("ns:item"));
    }

    #[test]
    fn test_contains_coerces_to_strings() {
        let doc = Document::with_root("r");
        let ctx = context(&doc);
        let hit = call("contains", vec![Value::from("keyboard"), Value::from("board")], &ctx);
        assert_eq!(hit.unwrap(), Value::Boolean(true));
        let number = call("contains", vec![Value::Number(1234.0), Value::from("23")], &ctx);
        assert_eq!(number.unwrap(), Value::Boolean(true));
        let boolean = call("contains", vec![Value::Boolean(true), Value::from("ru")], &ctx);
        assert_eq!(boolean.unwrap(), Value::Boolean(true));
        let empty = call("contains", vec![Value::empty_nodeset(), Value::from("")], &ctx);
        assert_eq!(empty.unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_unknown_function() {
        let doc = Document::with_root("r");
        let ctx = context(&doc);
        assert!(matches!(
            call("count", vec![Value::empty_nodeset()], &ctx),
            Err(EvaluationError::UnknownFunction(_))
        ));
    }
}
