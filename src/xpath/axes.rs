//! Axes
//!
//! - self (`.`), child, parent (`..`)
//! - descendant-or-self (`//`), which includes the context node itself
//!
//! Absolute paths start at [`Item::Document`], a virtual node whose children
//! are the evaluation roots. Only element nodes are ever produced.

use super::parser::{Axis, NodeTest};
use crate::dom::{DocumentAccess, NodeId, NodeKind};

/// A context item: a real node or the virtual document above the roots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Item {
    Document,
    Node(NodeId),
}

/// Navigate along an axis from a context item, appending element nodes in document order
pub fn navigate<D: DocumentAccess + ?Sized>(
    doc: &D,
    roots: &[NodeId],
    item: Item,
    axis: Axis,
    out: &mut Vec<NodeId>,
) {
    match (axis, item) {
        (Axis::SelfNode, Item::Node(id)) => push_element(doc, id, out),
        (Axis::SelfNode, Item::Document) => {}
        (Axis::Child, Item::Node(id)) => {
            for &child in doc.children(id) {
                push_element(doc, child, out);
            }
        }
        (Axis::Child, Item::Document) => {
            for &root in roots {
                push_element(doc, root, out);
            }
        }
        (Axis::DescendantOrSelf, Item::Node(id)) => descendant_or_self(doc, id, out),
        (Axis::DescendantOrSelf, Item::Document) => {
            for &root in roots {
                descendant_or_self(doc, root, out);
            }
        }
        (Axis::Parent, Item::Node(id)) => {
            if let Some(parent) = doc.parent_of(id) {
                push_element(doc, parent, out);
            }
        }
        (Axis::Parent, Item::Document) => {}
    }
}

/// The node and every element in its subtree, pre-order
pub fn descendant_or_self<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId, out: &mut Vec<NodeId>) {
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        if doc.node_kind(current) != Some(NodeKind::Element) {
            continue;
        }
        out.push(current);
        // Reverse so the first child is popped first
        stack.extend(doc.children(current).iter().rev());
    }
}

/// Check if a node passes a step's node test
pub fn matches_node_test<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId, test: &NodeTest) -> bool {
    if doc.node_kind(id) != Some(NodeKind::Element) {
        return false;
    }
    match test {
        NodeTest::AnyNode => true,
        NodeTest::Element(name) => match (doc.node_local_name(id), doc.node_name(id)) {
            (Some(local), Some(qualified)) => name.matches(local, qualified),
            _ => false,
        },
        NodeTest::Attribute(_) => false,
    }
}

#[inline]
fn push_element<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId, out: &mut Vec<NodeId>) {
    if doc.node_kind(id) == Some(NodeKind::Element) {
        out.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::xpath::parser::NameTest;

    fn names(doc: &Document, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|&id| doc.node(id).unwrap().name().to_string())
            .collect()
    }

    fn sample() -> (Document, NodeId) {
        let mut doc = Document::parse("<a><b><c/></b><!--x--><d/></a>").unwrap();
        let root = doc.document_element().unwrap();
        doc.create_comment(root, "marker").unwrap();
        (doc, root)
    }

    #[test]
    fn test_child_axis_skips_markers() {
        let (doc, root) = sample();
        let mut out = Vec::new();
        navigate(&doc, &[root], Item::Node(root), Axis::Child, &mut out);
        assert_eq!(names(&doc, &out), ["b", "d"]);
    }

    #[test]
    fn test_descendant_or_self_preorder() {
        let (doc, root) = sample();
        let mut out = Vec::new();
        navigate(&doc, &[root], Item::Node(root), Axis::DescendantOrSelf, &mut out);
        assert_eq!(names(&doc, &out), ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_document_item() {
        let (doc, root) = sample();
        let mut out = Vec::new();
        navigate(&doc, &[root], Item::Document, Axis::Child, &mut out);
        assert_eq!(out, [root]);
        out.clear();
        navigate(&doc, &[root], Item::Document, Axis::Parent, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_parent_and_self() {
        let (doc, root) = sample();
        let b = doc.node(root).unwrap().element_children().next().unwrap().id();
        let mut out = Vec::new();
        navigate(&doc, &[root], Item::Node(b), Axis::Parent, &mut out);
        navigate(&doc, &[root], Item::Node(b), Axis::SelfNode, &mut out);
        assert_eq!(out, [root, b]);
    }

    #[test]
    fn test_name_tests() {
        let doc = Document::parse("<x:a><b/></x:a>").unwrap();
        let root = doc.document_element().unwrap();
        let qualified = NodeTest::Element(NameTest::Name("x:a".to_string()));
        let local = NodeTest::Element(NameTest::Name("a".to_string()));
        let other = NodeTest::Element(NameTest::Name("y:a".to_string()));
        assert!(matches_node_test(&doc, root, &qualified));
        assert!(matches_node_test(&doc, root, &local));
        assert!(!matches_node_test(&doc, root, &other));
        assert!(matches_node_test(&doc, root, &NodeTest::Element(NameTest::Wildcard)));
    }
}
