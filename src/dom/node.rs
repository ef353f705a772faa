//! XML Node representation
//!
//! Nodes live in the [`Document`](super::Document) arena and are addressed by
//! [`NodeId`]. A node owns its children through the arena; `parent` is a plain
//! relation used for navigation and detaching.

use std::fmt;

/// Compact node identifier (index into the document arena)
///
/// Two `NodeId`s are equal exactly when they name the same node, so node-set
/// deduplication is by identity, never by content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }

    /// Position of the node in its document's arena
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Element node
    Element,
    /// Comment marker child (printed as `<!--...-->`)
    Comment,
    /// CDATA marker child (printed as `<![CDATA[...]]>`)
    CData,
}

/// Stored attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: String,
    pub value: String,
}

impl XmlAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        XmlAttribute {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An XML node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    /// Type of this node
    pub kind: NodeKind,
    /// Local name (after any prefix); empty for marker nodes
    pub name: String,
    /// Name including the namespace prefix, as written
    pub qualified_name: String,
    /// Attributes in insertion order
    pub attributes: Vec<XmlAttribute>,
    /// Owned children in document order
    pub children: Vec<NodeId>,
    /// Text content; for marker nodes, the comment/CDATA body
    pub text: Option<String>,
    /// Parent node (None for roots and detached nodes)
    pub parent: Option<NodeId>,
}

impl XmlNode {
    /// Create a new, unattached element node
    pub fn element(spec: ElementSpec) -> Self {
        let name = match spec.qualified_name.split_once(':') {
            Some((_, local)) => local.to_string(),
            None => spec.qualified_name.clone(),
        };
        XmlNode {
            kind: NodeKind::Element,
            name,
            qualified_name: spec.qualified_name,
            attributes: spec.attributes,
            children: Vec::new(),
            text: spec.text,
            parent: None,
        }
    }

    /// Create a comment or CDATA marker node
    pub fn marker(kind: NodeKind, body: impl Into<String>) -> Self {
        XmlNode {
            kind,
            name: String::new(),
            qualified_name: String::new(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: Some(body.into()),
            parent: None,
        }
    }

    /// Check if this is an element node
    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Get attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

/// Description of an element to create
///
/// ```
/// use xmlquery::ElementSpec;
///
/// let spec = ElementSpec::new("ns:item").attr("id", "1").text("first");
/// assert_eq!(spec.qualified_name(), "ns:item");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpec {
    qualified_name: String,
    attributes: Vec<XmlAttribute>,
    text: Option<String>,
}

impl ElementSpec {
    pub fn new(qualified_name: impl Into<String>) -> Self {
        ElementSpec {
            qualified_name: qualified_name.into(),
            attributes: Vec::new(),
            text: None,
        }
    }

    /// Add an attribute; a repeated name replaces the earlier value in place
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(XmlAttribute { name, value }),
        }
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }
}

impl From<&str> for ElementSpec {
    fn from(name: &str) -> Self {
        ElementSpec::new(name)
    }
}

impl From<String> for ElementSpec {
    fn from(name: String) -> Self {
        ElementSpec::new(name)
    }
}

/// Parse the leading number of a string the way query comparisons do
///
/// Leading whitespace is skipped, then the longest numeric prefix is taken:
/// an optional sign followed by `Infinity`, or digits with an optional
/// fraction and exponent. Anything after the prefix is ignored, so `"12px"`
/// is 12. `None` when no prefix is numeric.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut pos = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        pos += 1;
    }
    if s[pos..].starts_with("Infinity") {
        let inf = f64::INFINITY;
        return Some(if bytes[0] == b'-' { -inf } else { inf });
    }

    let digits_at = |mut at: usize| {
        while at < bytes.len() && bytes[at].is_ascii_digit() {
            at += 1;
        }
        at
    };
    let int_end = digits_at(pos);
    let mut end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_at(end + 1);
        if int_end > pos || frac_end > end + 1 {
            end = frac_end;
        }
    }
    if end == pos {
        return None;
    }

    // An exponent only counts when digits follow it
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_at(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    s[..end].parse().ok()
}

/// Case-insensitive `true`/`false`
pub fn parse_boolean(s: &str) -> Option<bool> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
