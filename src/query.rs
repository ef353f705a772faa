//! Result Sets
//!
//! A [`ResultSet`] is an owned, immutable list of matched nodes plus the
//! roots and expression that produced it. Reads borrow the [`Document`];
//! bulk mutators borrow it mutably and return the same set for chaining.
//!
//! Bulk mutation is not transactional: a member that cannot be mutated is
//! skipped (and logged) while earlier members stay mutated. Use
//! [`ResultSet::try_apply`] to see the per-member failures.

use crate::dom::{Document, NodeId, NodeRef, WriteOptions};
use crate::error::{EvaluationError, QueryError, TreeError};
use crate::xpath::{
    self, compile_cached, Axis, CompareOp, Expr, Expression, NameTest, NodeTest, PathExpr, Step,
};
use std::sync::Arc;
use tracing::warn;

/// Nodes matched by an expression, in document order
#[derive(Debug, Clone)]
pub struct ResultSet {
    nodes: Vec<NodeId>,
    roots: Arc<[NodeId]>,
    expression: Expression,
}

impl ResultSet {
    /// Compile `expr` (through the shared cache) and evaluate it against `roots`
    pub fn select(doc: &Document, roots: &[NodeId], expr: &str) -> Result<Self, QueryError> {
        let expression = compile_cached(expr)?;
        Ok(Self::evaluate(doc, roots, expression)?)
    }

    /// Evaluate an already compiled expression against `roots`
    pub fn evaluate(
        doc: &Document,
        roots: &[NodeId],
        expression: Expression,
    ) -> Result<Self, EvaluationError> {
        let nodes = xpath::evaluate(doc, roots, &expression)?;
        Ok(ResultSet {
            nodes,
            roots: Arc::from(roots),
            expression,
        })
    }

    /// Expression that produced this set
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Roots the expression was evaluated against
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Member ids in document order
    pub fn ids(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first<'a>(&self, doc: &'a Document) -> Option<NodeRef<'a>> {
        self.get(doc, 0)
    }

    pub fn get<'a>(&self, doc: &'a Document, index: usize) -> Option<NodeRef<'a>> {
        self.nodes.get(index).and_then(|&id| doc.node(id))
    }

    /// Iterate over the members
    pub fn iter<'s, 'a: 's>(&'s self, doc: &'a Document) -> impl Iterator<Item = NodeRef<'a>> + 's {
        self.nodes.iter().filter_map(move |&id| doc.node(id))
    }

    /// Members as node handles
    pub fn nodes<'a>(&self, doc: &'a Document) -> Vec<NodeRef<'a>> {
        self.iter(doc).collect()
    }

    /// Own text of every member
    pub fn texts<'a>(&self, doc: &'a Document) -> Vec<Option<&'a str>> {
        self.iter(doc).map(|n| n.text()).collect()
    }

    /// Values of `name` on the members that carry it
    pub fn attr_values<'a>(&self, doc: &'a Document, name: &str) -> Vec<&'a str> {
        self.iter(doc).filter_map(|n| n.attribute(name)).collect()
    }

    /// Serialize every member
    pub fn to_xml(&self, doc: &Document, options: &WriteOptions) -> Vec<String> {
        self.iter(doc).map(|n| n.to_xml(options)).collect()
    }

    // ========================================================================
    // Narrowing
    // ========================================================================

    /// Evaluate `expr` with the current members as roots
    ///
    /// An empty set stays empty (the expression is still compiled).
    pub fn find(&self, doc: &Document, expr: &str) -> Result<ResultSet, QueryError> {
        if self.nodes.is_empty() {
            return Ok(self.empty_with(compile_cached(expr)?));
        }
        ResultSet::select(doc, &self.nodes, expr)
    }

    /// Members whose attribute `name` equals `value`
    pub fn where_attr_eq(
        &self,
        doc: &Document,
        name: &str,
        value: &str,
    ) -> Result<ResultSet, EvaluationError> {
        self.narrow(doc, attr_compare(name, CompareOp::Eq, Expr::String(value.to_string())))
    }

    /// Members whose attribute `name` is present and differs from `value`
    pub fn where_attr_ne(
        &self,
        doc: &Document,
        name: &str,
        value: &str,
    ) -> Result<ResultSet, EvaluationError> {
        self.narrow(doc, attr_compare(name, CompareOp::NotEq, Expr::String(value.to_string())))
    }

    /// Members whose attribute `name` is a number greater than `threshold`
    pub fn where_attr_gt(
        &self,
        doc: &Document,
        name: &str,
        threshold: f64,
    ) -> Result<ResultSet, EvaluationError> {
        self.narrow(doc, attr_compare(name, CompareOp::Gt, Expr::Number(threshold)))
    }

    /// Members whose attribute `name` is a number less than `threshold`
    pub fn where_attr_lt(
        &self,
        doc: &Document,
        name: &str,
        threshold: f64,
    ) -> Result<ResultSet, EvaluationError> {
        self.narrow(doc, attr_compare(name, CompareOp::Lt, Expr::Number(threshold)))
    }

    /// Members with a child element `child` whose text equals `value`
    pub fn where_child_eq(
        &self,
        doc: &Document,
        child: &str,
        value: &str,
    ) -> Result<ResultSet, EvaluationError> {
        let path = Expr::Path(PathExpr {
            absolute: false,
            steps: vec![Step::new(
                Axis::Child,
                NodeTest::Element(NameTest::Name(child.to_string())),
            )],
        });
        self.narrow(
            doc,
            Expr::Compare(
                Box::new(path),
                CompareOp::Eq,
                Box::new(Expr::String(value.to_string())),
            ),
        )
    }

    /// Members whose own text equals `value`
    pub fn where_text_eq(&self, doc: &Document, value: &str) -> Result<ResultSet, EvaluationError> {
        let text = Expr::FunctionCall("text".to_string(), Vec::new());
        self.narrow(
            doc,
            Expr::Compare(
                Box::new(text),
                CompareOp::Eq,
                Box::new(Expr::String(value.to_string())),
            ),
        )
    }

    fn narrow(&self, doc: &Document, predicate: Expr) -> Result<ResultSet, EvaluationError> {
        let expression = Expression::from_ast(predicate);
        if self.nodes.is_empty() {
            return Ok(self.empty_with(expression));
        }
        let nodes = xpath::filter(doc, &self.roots, &self.nodes, expression.ast())?;
        Ok(ResultSet {
            nodes,
            roots: Arc::clone(&self.roots),
            expression,
        })
    }

    fn empty_with(&self, expression: Expression) -> ResultSet {
        ResultSet {
            nodes: Vec::new(),
            roots: Arc::clone(&self.roots),
            expression,
        }
    }

    // ========================================================================
    // Bulk mutation
    // ========================================================================

    /// Set an attribute on every member
    pub fn set_attr(&self, doc: &mut Document, name: &str, value: &str) -> &Self {
        self.apply(doc, "set_attr", |doc, id| doc.set_attribute(id, name, value).map(drop))
    }

    /// Remove an attribute from every member
    pub fn remove_attr(&self, doc: &mut Document, name: &str) -> &Self {
        self.apply(doc, "remove_attr", |doc, id| doc.remove_attribute(id, name).map(drop))
    }

    /// Replace the own text of every member
    pub fn set_text(&self, doc: &mut Document, value: &str) -> &Self {
        self.apply(doc, "set_text", |doc, id| doc.set_text(id, value).map(drop))
    }

    /// Detach every member from its parent
    ///
    /// The ids stay valid; the detached subtrees become roots.
    pub fn remove_elements(&self, doc: &mut Document) -> &Self {
        self.apply(doc, "remove_elements", |doc, id| doc.remove(id))
    }

    /// Run `f` on every member in order, collecting the failures
    ///
    /// Members before a failure stay mutated.
    pub fn try_apply<F>(&self, doc: &mut Document, mut f: F) -> Vec<(NodeId, TreeError)>
    where
        F: FnMut(&mut Document, NodeId) -> Result<(), TreeError>,
    {
        self.nodes
            .iter()
            .filter_map(|&id| f(doc, id).err().map(|e| (id, e)))
            .collect()
    }

    fn apply<F>(&self, doc: &mut Document, operation: &'static str, f: F) -> &Self
    where
        F: FnMut(&mut Document, NodeId) -> Result<(), TreeError>,
    {
        for (id, error) in self.try_apply(doc, f) {
            warn!(node = %id, %error, operation, "bulk mutation skipped a member");
        }
        self
    }
}

fn attr_compare(name: &str, op: CompareOp, value: Expr) -> Expr {
    Expr::Compare(
        Box::new(Expr::AttributeRef(NameTest::Name(name.to_string()))),
        op,
        Box::new(value),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVENTORY: &str = r#"<inventory>
  <item sku="a1" qty="5"><name>Bolt</name></item>
  <item sku="b2" qty="12"><name>Nut</name></item>
  <item sku="c3"><name>Washer</name></item>
</inventory>"#;

    #[test]
    fn test_reads() {
        let doc = Document::parse(INVENTORY).unwrap();
        let items = doc.select("//item").unwrap();
        assert_eq!(items.count(), 3);
        assert_eq!(items.first(&doc).unwrap().attribute("sku"), Some("a1"));
        assert_eq!(items.attr_values(&doc, "qty"), ["5", "12"]);
        assert_eq!(items.get(&doc, 3).map(|n| n.id()), None);
        assert_eq!(items.expression().source(), "//item");
    }

    #[test]
    fn test_find_narrows_from_members() {
        let doc = Document::parse(INVENTORY).unwrap();
        let items = doc.select("//item[@qty]").unwrap();
        let names = items.find(&doc, "name").unwrap();
        assert_eq!(names.texts(&doc), [Some("Bolt"), Some("Nut")]);
        assert_eq!(names.roots(), items.ids());
    }

    #[test]
    fn test_where_filters() {
        let doc = Document::parse(INVENTORY).unwrap();
        let items = doc.select("//item").unwrap();
        assert_eq!(items.where_attr_eq(&doc, "sku", "b2").unwrap().count(), 1);
        assert_eq!(items.where_attr_ne(&doc, "sku", "b2").unwrap().count(), 2);
        assert_eq!(items.where_attr_gt(&doc, "qty", 6.0).unwrap().attr_values(&doc, "sku"), ["b2"]);
        assert_eq!(items.where_attr_lt(&doc, "qty", 6.0).unwrap().attr_values(&doc, "sku"), ["a1"]);
        assert_eq!(items.where_child_eq(&doc, "name", "Washer").unwrap().count(), 1);
        let names = doc.select("//name").unwrap();
        assert_eq!(names.where_text_eq(&doc, "Nut").unwrap().count(), 1);
    }

    #[test]
    fn test_bulk_mutation_chains() {
        let mut doc = Document::parse(INVENTORY).unwrap();
        let items = doc.select("//item").unwrap();
        items
            .set_attr(&mut doc, "checked", "yes")
            .remove_attr(&mut doc, "qty");
        assert_eq!(doc.select("//item[@checked='yes']").unwrap().count(), 3);
        assert!(doc.select("//item[@qty]").unwrap().is_empty());

        items.find(&doc, "name").unwrap().set_text(&mut doc, "?");
        assert_eq!(doc.select("//name[text()='?']").unwrap().count(), 3);
    }

    #[test]
    fn test_remove_elements() {
        let mut doc = Document::parse(INVENTORY).unwrap();
        doc.select("//item[@sku!='a1']").unwrap().remove_elements(&mut doc);
        assert_eq!(doc.select("//item").unwrap().count(), 1);
    }

    #[test]
    fn test_try_apply_is_not_transactional() {
        let mut doc = Document::parse(INVENTORY).unwrap();
        let items = doc.select("//item").unwrap();
        let target = items.ids()[1];
        let failures = items.try_apply(&mut doc, |doc, id| {
            if id == target {
                return Err(TreeError::UnknownNode(id));
            }
            doc.set_attribute(id, "seen", "1").map(drop)
        });
        assert_eq!(failures, [(target, TreeError::UnknownNode(target))]);
        // first and last members were still mutated
        assert_eq!(doc.select("//item[@seen]").unwrap().count(), 2);
    }

    #[test]
    fn test_chaining_on_an_empty_set() {
        let doc = Document::parse(INVENTORY).unwrap();
        let none = doc.select("//item[@sku='zz']").unwrap();
        assert!(none.is_empty());
        assert!(none.find(&doc, "name").unwrap().is_empty());
        assert!(none.where_attr_eq(&doc, "sku", "a1").unwrap().is_empty());
        assert!(matches!(none.find(&doc, "name["), Err(QueryError::Syntax(_))));
    }

    #[test]
    fn test_no_roots_is_an_error() {
        let doc = Document::new();
        assert!(matches!(
            doc.select("//item"),
            Err(QueryError::Evaluation(EvaluationError::InvalidRoot(_)))
        ));
    }

    #[test]
    fn test_scalar_expression_is_rejected() {
        let doc = Document::parse(INVENTORY).unwrap();
        let err = doc.select("1 + 1").unwrap_err();
        assert_eq!(
            err,
            QueryError::Evaluation(EvaluationError::NotANodeSet("number"))
        );
    }
}
