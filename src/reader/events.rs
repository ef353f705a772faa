//! XML Event Types
//!
//! Events produced by the pull reader. Names and markers borrow from the
//! input; only entity-decoded text owns its data.

use crate::core::attributes::Attribute;
use std::borrow::Cow;

/// XML parsing event
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent<'a> {
    /// Start of an element: <name attrs...>
    StartElement(StartElement<'a>),
    /// End of an element: </name>
    EndElement { name: &'a str, offset: usize },
    /// Empty element: <name attrs.../>
    EmptyElement(StartElement<'a>),
    /// Text content between tags (entities decoded)
    Text(Cow<'a, str>),
    /// CDATA section content
    CData(&'a str),
    /// Comment content
    Comment(&'a str),
    /// Processing instruction: <?target data?>
    ProcessingInstruction { target: &'a str, data: Option<&'a str> },
    /// XML declaration: <?xml version="1.0"?>
    XmlDeclaration,
    /// DOCTYPE declaration (raw)
    DocType(&'a str),
}

/// Start element event data
#[derive(Debug, Clone, PartialEq)]
pub struct StartElement<'a> {
    /// Full element name (may include prefix)
    pub name: &'a str,
    /// Element attributes in source order
    pub attributes: Vec<Attribute<'a>>,
    /// Byte offset of the opening '<'
    pub offset: usize,
}

impl StartElement<'_> {
    /// Get an attribute value by name
    pub fn get_attribute_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_ref())
    }
}

impl<'a> XmlEvent<'a> {
    /// Start element data for both `<a>` and `<a/>`
    pub fn as_start_element(&self) -> Option<&StartElement<'a>> {
        match self {
            XmlEvent::StartElement(e) | XmlEvent::EmptyElement(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_open_elements_share_data() {
        let elem = StartElement { name: "svg:rect", attributes: vec![], offset: 4 };
        let open = XmlEvent::StartElement(elem.clone());
        let empty = XmlEvent::EmptyElement(elem);
        assert_eq!(open.as_start_element(), empty.as_start_element());
        assert!(XmlEvent::Comment("c").as_start_element().is_none());
    }

    #[test]
    fn test_attribute_lookup_uses_qualified_name() {
        let elem = StartElement {
            name: "a",
            attributes: vec![
                Attribute { name: "xml:lang", value: Cow::Borrowed("en") },
                Attribute { name: "lang", value: Cow::Borrowed("fr") },
            ],
            offset: 0,
        };
        assert_eq!(elem.get_attribute_value("xml:lang"), Some("en"));
        assert_eq!(elem.get_attribute_value("lang"), Some("fr"));
        assert_eq!(elem.get_attribute_value("id"), None);
    }
}
