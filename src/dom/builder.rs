//! Tree building from XML text
//!
//! Drives a [`SliceReader`] and assembles the [`Document`] with an explicit
//! stack of open elements. End tags must match the innermost open element.

use super::document::Document;
use super::node::{ElementSpec, NodeId};
use crate::error::{ReadError, TreeError};
use crate::reader::{SliceReader, StartElement, XmlEvent};
use tracing::debug;

/// Input options
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadOptions {
    /// Keep comments as marker children (dropped otherwise)
    pub preserve_comments: bool,
    /// Keep CDATA sections as marker children (merged into text otherwise)
    pub preserve_cdata: bool,
}

/// Parse `input` into a new document
pub fn build(input: &str, options: &ReadOptions) -> Result<Document, ReadError> {
    let mut doc = Document::new();
    let mut root: Option<NodeId> = None;
    // Open elements with the offset of their start tag
    let mut stack: Vec<(NodeId, usize)> = Vec::with_capacity(32);

    let mut reader = SliceReader::new(input);
    loop {
        let at = reader.position();
        let Some(event) = reader.next_event()? else {
            break;
        };
        match event {
            XmlEvent::StartElement(start) => {
                let id = open_element(&mut doc, &mut root, &stack, &start)?;
                stack.push((id, start.offset));
            }
            XmlEvent::EmptyElement(start) => {
                open_element(&mut doc, &mut root, &stack, &start)?;
            }
            XmlEvent::EndElement { name, offset } => {
                let Some((open, _)) = stack.pop() else {
                    return Err(ReadError::new(format!("unexpected end tag </{}>", name), offset));
                };
                let expected = doc.node(open).map(|n| n.qualified_name()).unwrap_or("");
                if expected != name {
                    return Err(ReadError::new(
                        format!("mismatched end tag: expected </{}>, found </{}>", expected, name),
                        offset,
                    ));
                }
            }
            XmlEvent::Text(text) => {
                if text.bytes().all(|b| b.is_ascii_whitespace()) {
                    continue;
                }
                match stack.last() {
                    Some(&(parent, _)) => append_text(&mut doc, parent, &text, at)?,
                    None => return Err(ReadError::new("text outside the root element", at)),
                }
            }
            XmlEvent::CData(body) => match stack.last() {
                Some(&(parent, _)) if options.preserve_cdata => {
                    add_marker(doc.create_cdata(parent, body), at)?;
                }
                Some(&(parent, _)) => append_text(&mut doc, parent, body, at)?,
                None => return Err(ReadError::new("CDATA outside the root element", at)),
            },
            XmlEvent::Comment(body) => {
                if let (true, Some(&(parent, _))) = (options.preserve_comments, stack.last()) {
                    add_marker(doc.create_comment(parent, body), at)?;
                }
            }
            XmlEvent::ProcessingInstruction { .. } | XmlEvent::XmlDeclaration | XmlEvent::DocType(_) => {}
        }
    }

    if let Some(&(open, offset)) = stack.last() {
        let name = doc.node(open).map(|n| n.qualified_name()).unwrap_or("");
        return Err(ReadError::new(format!("unclosed element <{}>", name), offset));
    }
    let Some(root) = root else {
        return Err(ReadError::new("no root element", input.len()));
    };
    doc.set_document_element(root)
        .map_err(|e| ReadError::new(e.to_string(), 0))?;

    debug!(nodes = doc.len(), bytes = input.len(), "parsed document");
    Ok(doc)
}

fn open_element(
    doc: &mut Document,
    root: &mut Option<NodeId>,
    stack: &[(NodeId, usize)],
    start: &StartElement<'_>,
) -> Result<NodeId, ReadError> {
    let spec = start
        .attributes
        .iter()
        .fold(ElementSpec::new(start.name), |spec, attr| {
            spec.attr(attr.name, attr.value.as_ref())
        });

    match stack.last() {
        Some(&(parent, _)) => doc
            .create_child(parent, spec)
            .map_err(|e| ReadError::new(e.to_string(), start.offset)),
        None if root.is_some() => Err(ReadError::new("multiple root elements", start.offset)),
        None => {
            let id = doc.create_element(spec);
            *root = Some(id);
            Ok(id)
        }
    }
}

fn append_text(doc: &mut Document, id: NodeId, segment: &str, at: usize) -> Result<(), ReadError> {
    let combined = match doc.node(id).and_then(|n| n.text()) {
        Some(existing) => format!("{}{}", existing, segment),
        None => segment.to_string(),
    };
    doc.set_text(id, &combined)
        .map(drop)
        .map_err(|e| ReadError::new(e.to_string(), at))
}

fn add_marker(result: Result<NodeId, TreeError>, at: usize) -> Result<(), ReadError> {
    result
        .map(drop)
        .map_err(|e| ReadError::new(e.to_string(), at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeKind;

    #[test]
    fn test_build_tree() {
        let doc = Document::parse(
            r#"<?xml version="1.0"?>
<catalog>
  <book id="1" lang="en"><title>XML &amp; You</title></book>
  <book id="2"/>
</catalog>"#,
        )
        .unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.name(), "catalog");
        assert_eq!(root.text(), None);
        let books: Vec<_> = root.element_children().collect();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].attribute("lang"), Some("en"));
        let title = books[0].children().next().unwrap();
        assert_eq!(title.text(), Some("XML & You"));
        assert_eq!(title.parent().unwrap().id(), books[0].id());
    }

    #[test]
    fn test_mixed_content_concatenated() {
        let doc = Document::parse("<p>Hello <b>big</b> world</p>").unwrap();
        assert_eq!(doc.root().unwrap().text(), Some("Hello  world"));
    }

    #[test]
    fn test_cdata_merged_by_default() {
        let doc = Document::parse("<a>x<![CDATA[<y>]]></a>").unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.text(), Some("x<y>"));
        assert_eq!(root.children().count(), 0);
    }

    #[test]
    fn test_markers_preserved() {
        let options = ReadOptions {
            preserve_comments: true,
            preserve_cdata: true,
        };
        let doc = Document::parse_with("<a><!--c--><![CDATA[d]]></a>", &options).unwrap();
        let kinds: Vec<_> = doc.root().unwrap().children().map(|c| c.kind()).collect();
        assert_eq!(kinds, [NodeKind::Comment, NodeKind::CData]);
    }

    #[test]
    fn test_prefixed_names() {
        let doc = Document::parse(r#"<x:root xmlns:x="urn:x"><x:item/></x:root>"#).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.name(), "root");
        assert_eq!(root.qualified_name(), "x:root");
        assert_eq!(root.attribute("xmlns:x"), Some("urn:x"));
    }

    #[test]
    fn test_mismatched_end_tag() {
        let err = Document::parse("<a><b></a>").unwrap_err();
        assert!(err.message.contains("expected </b>"));
        assert_eq!(err.offset, 6);
    }

    #[test]
    fn test_unclosed_and_missing_root() {
        let err = Document::parse("<a><b></b>").unwrap_err();
        assert!(err.message.contains("unclosed element <a>"));
        assert_eq!(err.offset, 0);

        let err = Document::parse("  <!-- only a comment -->  ").unwrap_err();
        assert_eq!(err.message, "no root element");

        let err = Document::parse("<a/><b/>").unwrap_err();
        assert_eq!(err.message, "multiple root elements");
    }

    #[test]
    fn test_content_outside_root_reports_offset() {
        let err = Document::parse("<a/>\n  tail").unwrap_err();
        assert_eq!(err.message, "text outside the root element");
        assert_eq!(err.offset, 4);

        let err = Document::parse("<a></a><![CDATA[x]]>").unwrap_err();
        assert_eq!(err.message, "CDATA outside the root element");
        assert_eq!(err.offset, 7);
    }
}
