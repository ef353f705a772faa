//! Query Value Types
//!
//! Every expression evaluates to one of five values: a number, a string, a
//! boolean, an ordered duplicate-free node set, or the string values of the
//! attributes an `@name` step selected.

use crate::dom::{parse_number, DocumentAccess, NodeId};

/// Query value types
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Value {
    /// Floating-point number
    Number(f64),
    /// String value
    String(String),
    /// Boolean value
    Boolean(bool),
    /// A set of nodes (document order, no duplicates)
    NodeSet(Vec<NodeId>),
    /// Attribute values (an attribute step yields values, not nodes)
    Attributes(Vec<String>),
}

impl Value {
    /// Create an empty node set
    pub fn empty_nodeset() -> Self {
        Value::NodeSet(Vec::new())
    }

    /// Convert to boolean
    ///
    /// Node sets and attribute lists are true when non-empty, whatever the
    /// values inside (an empty attribute value still counts as present).
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::NodeSet(nodes) => !nodes.is_empty(),
            Value::Attributes(values) => !values.is_empty(),
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
        }
    }

    /// First value of the set as used by comparisons
    ///
    /// A node contributes its own text (empty when it has none). `None` for an
    /// empty set. Scalars yield their string form.
    pub fn first_value<D: DocumentAccess + ?Sized>(&self, doc: &D) -> Option<String> {
        match self {
            Value::NodeSet(nodes) => nodes
                .first()
                .map(|&id| doc.text_content(id).unwrap_or("").to_string()),
            Value::Attributes(values) => values.first().cloned(),
            _ => Some(self.to_string_value(doc)),
        }
    }

    /// Convert to string; an empty set is the empty string
    pub fn to_string_value<D: DocumentAccess + ?Sized>(&self, doc: &D) -> String {
        match self {
            Value::NodeSet(_) | Value::Attributes(_) => self.first_value(doc).unwrap_or_default(),
            Value::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
        }
    }

    /// Convert to number; anything not strictly numeric is NaN
    pub fn to_number<D: DocumentAccess + ?Sized>(&self, doc: &D) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::String(s) => parse_number(s).unwrap_or(f64::NAN),
            Value::NodeSet(_) | Value::Attributes(_) => self
                .first_value(doc)
                .and_then(|s| parse_number(&s))
                .unwrap_or(f64::NAN),
        }
    }

    /// Short type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::NodeSet(_) => "node-set",
            Value::Attributes(_) => "attribute values",
        }
    }

    /// Consume into a node set, or give the value back
    pub fn into_nodeset(self) -> Result<Vec<NodeId>, Value> {
        match self {
            Value::NodeSet(nodes) => Ok(nodes),
            other => Err(other),
        }
    }
}

/// Canonical number form: integers without a fraction, `NaN`, `Infinity`
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::NodeSet(Vec::new())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<NodeId>> for Value {
    fn from(nodes: Vec<NodeId>) -> Self {
        Value::NodeSet(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, ElementSpec};

    #[test]
    fn test_boolean_conversion() {
        assert!(!Value::empty_nodeset().to_boolean());
        assert!(Value::Attributes(vec![String::new()]).to_boolean());
        assert!(!Value::Attributes(vec![]).to_boolean());
        assert!(Value::Number(1.0).to_boolean());
        assert!(!Value::Number(f64::NAN).to_boolean());
        assert!(!Value::String(String::new()).to_boolean());
    }

    #[test]
    fn test_node_values() {
        let mut doc = Document::with_root("r");
        let root = doc.document_element().unwrap();
        let a = doc.create_child(root, ElementSpec::new("a").text(" 12 ")).unwrap();
        let b = doc.create_child(root, "b").unwrap();

        let set = Value::NodeSet(vec![a, b]);
        assert_eq!(set.first_value(&doc), Some(" 12 ".to_string()));
        assert_eq!(set.to_number(&doc), 12.0);
        assert_eq!(Value::NodeSet(vec![b]).first_value(&doc), Some(String::new()));
        assert_eq!(Value::empty_nodeset().first_value(&doc), None);
        assert!(Value::empty_nodeset().to_number(&doc).is_nan());
    }

    #[test]
    fn test_string_conversion() {
        let doc = Document::new();
        assert_eq!(Value::Boolean(true).to_string_value(&doc), "true");
        assert_eq!(Value::Number(42.0).to_string_value(&doc), "42");
        assert_eq!(Value::Number(3.25).to_string_value(&doc), "3.25");
        assert_eq!(Value::Number(f64::NAN).to_string_value(&doc), "NaN");
        assert_eq!(Value::String("7x".into()).to_number(&doc), 7.0);
        assert!(Value::String("x7".into()).to_number(&doc).is_nan());
    }
}
