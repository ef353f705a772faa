//! Parallel Evaluation
//!
//! Uses Rayon to evaluate several expressions against one read-only document.
//! Results come back in input order.

use crate::dom::{Document, DocumentAccess, NodeId};
use crate::error::{EvaluationError, QueryError};
use crate::query::ResultSet;
use crate::xpath::{compile_cached, evaluate, Expression};
use rayon::prelude::*;

/// Evaluate compiled expressions in parallel
pub fn evaluate_many<D: DocumentAccess + Sync + ?Sized>(
    doc: &D,
    roots: &[NodeId],
    expressions: &[Expression],
) -> Vec<Result<Vec<NodeId>, EvaluationError>> {
    expressions
        .par_iter()
        .map(|expr| evaluate(doc, roots, expr))
        .collect()
}

/// Compile (through the shared cache) and select in parallel
pub fn select_many(
    doc: &Document,
    roots: &[NodeId],
    sources: &[&str],
) -> Vec<Result<ResultSet, QueryError>> {
    sources
        .par_iter()
        .map(|source| ResultSet::select(doc, roots, source))
        .collect()
}

/// Evaluate an expression and map the matched nodes in parallel
pub fn map_nodes<D, F, T>(
    doc: &D,
    roots: &[NodeId],
    expr: &Expression,
    mapper: F,
) -> Result<Vec<T>, EvaluationError>
where
    D: DocumentAccess + Sync + ?Sized,
    F: Fn(&D, NodeId) -> T + Sync + Send,
    T: Send,
{
    let nodes = evaluate(doc, roots, expr)?;
    Ok(nodes.par_iter().map(|&n| mapper(doc, n)).collect())
}

/// Keyed batch: evaluate `(key, expression)` pairs, failing on the first error
pub fn select_keyed(
    doc: &Document,
    roots: &[NodeId],
    queries: &[(&str, &str)],
) -> Result<Vec<(String, ResultSet)>, QueryError> {
    queries
        .par_iter()
        .map(|(key, source)| -> Result<(String, ResultSet), QueryError> {
            let expression = compile_cached(source)?;
            let set = ResultSet::evaluate(doc, roots, expression)?;
            Ok((key.to_string(), set))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId) {
        let doc = Document::parse("<root><a>1</a><b/><c/><a>2</a></root>").unwrap();
        let root = doc.document_element().unwrap();
        (doc, root)
    }

    #[test]
    fn test_parallel_eval() {
        let (doc, root) = sample();
        let exprs: Vec<Expression> = ["//a", "//b", "//d", "1 + 1"]
            .iter()
            .map(|s| Expression::compile(s).unwrap())
            .collect();

        let results = evaluate_many(&doc, &[root], &exprs);
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().len(), 2);
        assert_eq!(results[1].as_ref().unwrap().len(), 1);
        assert!(results[2].as_ref().unwrap().is_empty());
        assert!(results[3].is_err());
    }

    #[test]
    fn test_select_many_keeps_order() {
        let (doc, root) = sample();
        let results = select_many(&doc, &[root], &["//c", "//a", "//a["]);
        assert_eq!(results[0].as_ref().unwrap().count(), 1);
        assert_eq!(results[1].as_ref().unwrap().count(), 2);
        assert!(matches!(results[2], Err(QueryError::Syntax(_))));
    }

    #[test]
    fn test_map_nodes() {
        let (doc, root) = sample();
        let expr = Expression::compile("//a").unwrap();
        let texts = map_nodes(&doc, &[root], &expr, |doc, id| {
            doc.text_content(id).unwrap_or("").to_string()
        })
        .unwrap();
        assert_eq!(texts, ["1", "2"]);
    }

    #[test]
    fn test_select_keyed() {
        let (doc, root) = sample();
        let results = select_keyed(&doc, &[root], &[("first", "//a"), ("second", "//b")]).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "first");
        assert_eq!(results[1].1.count(), 1);
    }
}
