//! XML text output
//!
//! [`XmlPrinter`] is the seam for custom serializers; [`TextPrinter`] is the
//! default. Output per element: start tag with attributes in order, escaped
//! own text, then children. Elements with neither text nor children are
//! self-closed.

use super::node::{NodeId, NodeKind};
use super::DocumentAccess;
use crate::core::entities::{encode_attribute, encode_text};

/// Output options
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WriteOptions {
    /// Spaces per nesting level; `None` writes everything on one line
    pub indent: Option<usize>,
    /// Prefix the output with `<?xml version="1.0" encoding="UTF-8"?>`
    pub xml_declaration: bool,
}

impl WriteOptions {
    pub fn pretty(indent: usize) -> Self {
        WriteOptions {
            indent: Some(indent),
            ..Default::default()
        }
    }
}

/// Turns a subtree into XML text
pub trait XmlPrinter {
    fn print(&self, doc: &dyn DocumentAccess, id: NodeId, options: &WriteOptions) -> String;
}

/// Default printer
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPrinter;

impl XmlPrinter for TextPrinter {
    fn print(&self, doc: &dyn DocumentAccess, id: NodeId, options: &WriteOptions) -> String {
        let mut buf = String::with_capacity(1024);
        if options.xml_declaration {
            buf.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        }

        // Enter writes the start tag, Close the end tag after all children
        enum StackEntry {
            Enter(NodeId, usize),
            Close(NodeId, usize),
        }

        let mut stack: Vec<StackEntry> = Vec::with_capacity(64);
        stack.push(StackEntry::Enter(id, 0));

        while let Some(entry) = stack.pop() {
            match entry {
                StackEntry::Close(current, depth) => {
                    newline(&mut buf, options, depth);
                    buf.push_str("</");
                    buf.push_str(doc.node_name(current).unwrap_or(""));
                    buf.push('>');
                }
                StackEntry::Enter(current, depth) => {
                    let Some(node) = doc.get_node(current) else {
                        continue;
                    };
                    newline(&mut buf, options, depth);
                    let body = node.text.as_deref();
                    match node.kind {
                        NodeKind::Comment => {
                            buf.push_str("<!--");
                            buf.push_str(body.unwrap_or(""));
                            buf.push_str("-->");
                        }
                        NodeKind::CData => {
                            buf.push_str("<![CDATA[");
                            buf.push_str(body.unwrap_or(""));
                            buf.push_str("]]>");
                        }
                        NodeKind::Element => {
                            buf.push('<');
                            buf.push_str(&node.qualified_name);
                            for attr in &node.attributes {
                                buf.push(' ');
                                buf.push_str(&attr.name);
                                buf.push_str("=\"");
                                buf.push_str(&encode_attribute(&attr.value));
                                buf.push('"');
                            }

                            if node.children.is_empty() && body.is_none() {
                                buf.push_str("/>");
                                continue;
                            }
                            buf.push('>');
                            if let Some(text) = body {
                                buf.push_str(&encode_text(text));
                            }
                            if node.children.is_empty() {
                                buf.push_str("</");
                                buf.push_str(&node.qualified_name);
                                buf.push('>');
                                continue;
                            }

                            stack.push(StackEntry::Close(current, depth));
                            for &child in node.children.iter().rev() {
                                stack.push(StackEntry::Enter(child, depth + 1));
                            }
                        }
                    }
                }
            }
        }

        buf
    }
}

/// Line break plus indentation, only in pretty mode and never at the very start
#[inline]
fn newline(buf: &mut String, options: &WriteOptions, depth: usize) {
    if let Some(width) = options.indent {
        if !buf.is_empty() {
            buf.push('\n');
            buf.extend(std::iter::repeat_n(' ', width * depth));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, ElementSpec};

    fn sample() -> (Document, NodeId) {
        let mut doc = Document::with_root("catalog");
        let root = doc.document_element().unwrap();
        let book = doc
            .create_child(root, ElementSpec::new("book").attr("title", "A \"B\" & C"))
            .unwrap();
        doc.create_child(book, ElementSpec::new("price").text("1 < 2")).unwrap();
        doc.create_child(root, "empty").unwrap();
        (doc, root)
    }

    #[test]
    fn test_compact_output() {
        let (doc, root) = sample();
        let xml = doc.to_xml(root, &WriteOptions::default()).unwrap();
        assert_eq!(
            xml,
            r#"<catalog><book title="A &quot;B&quot; &amp; C"><price>1 &lt; 2</price></book><empty/></catalog>"#
        );
    }

    #[test]
    fn test_pretty_output() {
        let (doc, root) = sample();
        let xml = doc.to_xml(root, &WriteOptions::pretty(2)).unwrap();
        let expected = "<catalog>\n  <book title=\"A &quot;B&quot; &amp; C\">\n    <price>1 &lt; 2</price>\n  </book>\n  <empty/>\n</catalog>";
        assert_eq!(xml, expected);
    }

    #[test]
    fn test_text_precedes_children_and_markers() {
        let mut doc = Document::with_root(ElementSpec::new("note").text("hi"));
        let root = doc.document_element().unwrap();
        doc.create_comment(root, " c ").unwrap();
        doc.create_cdata(root, "a<b").unwrap();
        doc.create_child(root, "x").unwrap();
        let xml = doc.to_xml(root, &WriteOptions::default()).unwrap();
        assert_eq!(xml, "<note>hi<!-- c --><![CDATA[a<b]]><x/></note>");
    }

    #[test]
    fn test_declaration() {
        let doc = Document::with_root("r");
        let options = WriteOptions {
            xml_declaration: true,
            indent: Some(2),
        };
        let xml = doc.to_xml(doc.document_element().unwrap(), &options).unwrap();
        assert_eq!(xml, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<r/>");
    }
}
