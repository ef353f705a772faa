//! XML Document - Arena-based mutable tree
//!
//! The [`Document`] owns every node it ever created. Removing a node detaches
//! it (and its subtree) from its parent; the detached subtree stays in the
//! arena as its own root and can be re-attached later.

use super::builder::{self, ReadOptions};
use super::node::{parse_boolean, parse_number, ElementSpec, NodeId, NodeKind, XmlAttribute, XmlNode};
use super::printer::{TextPrinter, WriteOptions, XmlPrinter};
use super::DocumentAccess;
use crate::error::{QueryError, ReadError, TreeError};
use crate::query::ResultSet;

/// An XML document stored in arena format
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Arena of nodes
    nodes: Vec<XmlNode>,
    /// Document element (the root `select` starts from)
    document_element: Option<NodeId>,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document with a fresh document element
    pub fn with_root(spec: impl Into<ElementSpec>) -> Self {
        let mut doc = Document::new();
        let root = doc.create_element(spec);
        doc.document_element = Some(root);
        doc
    }

    /// Parse XML text with default [`ReadOptions`]
    pub fn parse(input: &str) -> Result<Self, ReadError> {
        builder::build(input, &ReadOptions::default())
    }

    /// Parse XML text
    pub fn parse_with(input: &str, options: &ReadOptions) -> Result<Self, ReadError> {
        builder::build(input, options)
    }

    /// Get the document element
    pub fn document_element(&self) -> Option<NodeId> {
        self.document_element
    }

    /// Make `id` the document element; it must be a root element
    pub fn set_document_element(&mut self, id: NodeId) -> Result<(), TreeError> {
        let node = self.node_ref(id)?;
        if !node.is_element() {
            return Err(TreeError::NotAnElement(id));
        }
        if node.parent.is_some() {
            self.detach(id);
        }
        self.document_element = Some(id);
        Ok(())
    }

    /// Number of nodes in the arena, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrowing handle for reading a node
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.get_node(id).map(|_| NodeRef { doc: self, id })
    }

    /// Handle for the document element
    pub fn root(&self) -> Option<NodeRef<'_>> {
        self.document_element.and_then(|id| self.node(id))
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Create an unattached element; it is a root until appended somewhere
    pub fn create_element(&mut self, spec: impl Into<ElementSpec>) -> NodeId {
        self.push(XmlNode::element(spec.into()))
    }

    /// Create an element and append it to `parent`
    pub fn create_child(
        &mut self,
        parent: NodeId,
        spec: impl Into<ElementSpec>,
    ) -> Result<NodeId, TreeError> {
        self.element_ref(parent)?;
        let id = self.create_element(spec);
        self.attach(parent, id, None);
        Ok(id)
    }

    /// Append a comment marker child
    pub fn create_comment(&mut self, parent: NodeId, body: &str) -> Result<NodeId, TreeError> {
        self.create_marker(parent, NodeKind::Comment, body)
    }

    /// Append a CDATA marker child
    pub fn create_cdata(&mut self, parent: NodeId, body: &str) -> Result<NodeId, TreeError> {
        self.create_marker(parent, NodeKind::CData, body)
    }

    fn create_marker(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        body: &str,
    ) -> Result<NodeId, TreeError> {
        self.element_ref(parent)?;
        let id = self.push(XmlNode::marker(kind, body));
        self.attach(parent, id, None);
        Ok(id)
    }

    fn push(&mut self, node: XmlNode) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(node);
        id
    }

    // ========================================================================
    // Structural mutation
    // ========================================================================

    /// Move `child` (with its subtree) to the end of `parent`'s children
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_insert(parent, child)?;
        self.detach(child);
        self.attach(parent, child, None);
        Ok(())
    }

    /// Move `child` to position `index` among `parent`'s children
    ///
    /// An index past the end appends.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), TreeError> {
        self.check_insert(parent, child)?;
        self.detach(child);
        self.attach(parent, child, Some(index));
        Ok(())
    }

    /// Detach a node from its parent; removing a root is a no-op
    pub fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.node_ref(id)?;
        self.detach(id);
        Ok(())
    }

    /// Check if `ancestor` is a proper ancestor of `id`
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.parent_of(id);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent_of(p);
        }
        false
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.element_ref(parent)?;
        self.node_ref(child)?;
        if parent == child || self.is_ancestor(child, parent) {
            return Err(TreeError::Cycle { parent, child });
        }
        Ok(())
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id.index()].parent.take() else {
            return;
        };
        let siblings = &mut self.nodes[parent.index()].children;
        if let Some(pos) = siblings.iter().position(|&c| c == id) {
            siblings.remove(pos);
        }
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        let siblings = &mut self.nodes[parent.index()].children;
        match index {
            Some(i) if i < siblings.len() => siblings.insert(i, child),
            _ => siblings.push(child),
        }
        self.nodes[child.index()].parent = Some(parent);
        if self.document_element == Some(child) {
            self.document_element = None;
        }
    }

    // ========================================================================
    // Content mutation
    // ========================================================================

    /// Set an attribute, returning the previous value
    ///
    /// An existing attribute keeps its position; a new one is appended.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: &str,
    ) -> Result<Option<String>, TreeError> {
        let node = self.element_mut(id)?;
        match node.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => Ok(Some(std::mem::replace(&mut attr.value, value.to_string()))),
            None => {
                node.attributes.push(XmlAttribute::new(name, value));
                Ok(None)
            }
        }
    }

    /// Remove an attribute, returning its value if it was present
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<String>, TreeError> {
        let node = self.element_mut(id)?;
        let removed = node
            .attributes
            .iter()
            .position(|a| a.name == name)
            .map(|pos| node.attributes.remove(pos).value);
        Ok(removed)
    }

    /// Replace the node's own text, returning the previous text
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<Option<String>, TreeError> {
        let node = self.node_mut(id)?;
        Ok(node.text.replace(text.to_string()))
    }

    /// Drop the node's own text
    pub fn clear_text(&mut self, id: NodeId) -> Result<Option<String>, TreeError> {
        let node = self.node_mut(id)?;
        Ok(node.text.take())
    }

    // ========================================================================
    // Queries and output
    // ========================================================================

    /// Run a query expression against the document element
    ///
    /// A document without a document element has nothing to evaluate against
    /// and fails with [`EvaluationError::InvalidRoot`](crate::EvaluationError::InvalidRoot).
    pub fn select(&self, expr: &str) -> Result<ResultSet, QueryError> {
        let roots: Vec<NodeId> = self.document_element.into_iter().collect();
        ResultSet::select(self, &roots, expr)
    }

    /// Run a query expression with explicit evaluation roots
    pub fn select_from(&self, roots: &[NodeId], expr: &str) -> Result<ResultSet, QueryError> {
        ResultSet::select(self, roots, expr)
    }

    /// Serialize a subtree with the default [`TextPrinter`]
    pub fn to_xml(&self, id: NodeId, options: &WriteOptions) -> Result<String, TreeError> {
        self.to_xml_with(&TextPrinter, id, options)
    }

    /// Serialize a subtree with a custom printer
    pub fn to_xml_with<P: XmlPrinter>(
        &self,
        printer: &P,
        id: NodeId,
        options: &WriteOptions,
    ) -> Result<String, TreeError> {
        self.node_ref(id)?;
        Ok(printer.print(self, id, options))
    }

    // ========================================================================
    // Lookup helpers
    // ========================================================================

    fn node_ref(&self, id: NodeId) -> Result<&XmlNode, TreeError> {
        self.nodes.get(id.index()).ok_or(TreeError::UnknownNode(id))
    }

    fn element_ref(&self, id: NodeId) -> Result<&XmlNode, TreeError> {
        let node = self.node_ref(id)?;
        if node.is_element() {
            Ok(node)
        } else {
            Err(TreeError::NotAnElement(id))
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut XmlNode, TreeError> {
        self.nodes.get_mut(id.index()).ok_or(TreeError::UnknownNode(id))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut XmlNode, TreeError> {
        let node = self.node_mut(id)?;
        if node.is_element() {
            Ok(node)
        } else {
            Err(TreeError::NotAnElement(id))
        }
    }
}

impl DocumentAccess for Document {
    #[inline]
    fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    #[inline]
    fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id.index())
    }
}

/// Read-only handle to a node inside a [`Document`]
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    fn raw(&self) -> &'a XmlNode {
        let doc: &'a Document = self.doc;
        &doc.nodes[self.id.index()]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.raw().kind
    }

    /// Local name (without prefix)
    pub fn name(&self) -> &'a str {
        &self.raw().name
    }

    /// Name as written, including any prefix
    pub fn qualified_name(&self) -> &'a str {
        &self.raw().qualified_name
    }

    /// Attributes in insertion order
    pub fn attributes(&self) -> &'a [XmlAttribute] {
        &self.raw().attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.raw().attribute(name)
    }

    /// Own text content (descendant text is not included)
    pub fn text(&self) -> Option<&'a str> {
        self.raw().text.as_deref()
    }

    /// Own text parsed as a number
    pub fn numeric_value(&self) -> Option<f64> {
        self.text().and_then(parse_number)
    }

    /// Own text parsed as a case-insensitive `true`/`false`
    pub fn boolean_value(&self) -> Option<bool> {
        self.text().and_then(parse_boolean)
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.raw().parent.map(|id| NodeRef { doc: self.doc, id })
    }

    /// Ancestors from the parent up to the root
    pub fn ancestors(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        std::iter::successors(self.parent(), |n| n.parent())
    }

    /// All children, markers included
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let doc = self.doc;
        self.raw().children.iter().map(move |&id| NodeRef { doc, id })
    }

    /// Element children only
    pub fn element_children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        self.children().filter(|c| c.kind() == NodeKind::Element)
    }

    /// Serialize this subtree with the default printer
    pub fn to_xml(&self, options: &WriteOptions) -> String {
        TextPrinter.print(self.doc, self.id, options)
    }
}
