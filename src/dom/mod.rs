//! DOM Module - Arena-based mutable XML tree
//!
//! - Arena allocation for nodes, addressed by [`NodeId`]
//! - Ownership flows parent to child through the arena; `parent` is a relation
//! - Eager cycle detection on every insertion
//! - [`builder`] turns XML text into a tree, [`printer`] turns it back

pub mod builder;
pub mod document;
pub mod node;
pub mod printer;

pub use builder::ReadOptions;
pub use document::{Document, NodeRef};
pub use node::{parse_boolean, parse_number, ElementSpec, NodeId, NodeKind, XmlAttribute, XmlNode};
pub use printer::{TextPrinter, WriteOptions, XmlPrinter};

/// Trait for read access to a tree - the query engine and printer are generic over it
pub trait DocumentAccess {
    /// Check that `id` names a node of this tree
    fn contains(&self, id: NodeId) -> bool;

    /// Get a node by ID
    fn get_node(&self, id: NodeId) -> Option<&XmlNode>;

    /// Get node kind
    fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    /// Get node local name (without prefix)
    fn node_local_name(&self, id: NodeId) -> Option<&str> {
        self.get_node(id).map(|n| n.name.as_str())
    }

    /// Get node name including the prefix
    fn node_name(&self, id: NodeId) -> Option<&str> {
        self.get_node(id).map(|n| n.qualified_name.as_str())
    }

    /// Get the node's own text content
    fn text_content(&self, id: NodeId) -> Option<&str> {
        self.get_node(id).and_then(|n| n.text.as_deref())
    }

    /// Get attributes for an element
    fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        self.get_node(id).map_or(&[], |n| n.attributes.as_slice())
    }

    /// Children in document order
    fn children(&self, id: NodeId) -> &[NodeId] {
        self.get_node(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Parent node, if attached
    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id).and_then(|n| n.parent)
    }
}
