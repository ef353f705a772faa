//! Zero-Copy Slice Reader
//!
//! Reads XML from a string slice. Names, comments and CDATA borrow from the
//! input; text and attribute values only allocate when entities are decoded.

use super::events::{StartElement, XmlEvent};
use crate::core::attributes::parse_attributes;
use crate::core::entities::decode_text;
use crate::core::scanner::Scanner;
use crate::error::ReadError;

/// Zero-copy XML reader from a string slice
pub struct SliceReader<'a> {
    input: &'a str,
    scanner: Scanner<'a>,
}

impl<'a> SliceReader<'a> {
    /// Create a new slice reader
    pub fn new(input: &'a str) -> Self {
        SliceReader {
            input,
            scanner: Scanner::new(input),
        }
    }

    /// Byte offset where the next event starts
    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    /// Get the next XML event, `Ok(None)` at end of input
    pub fn next_event(&mut self) -> Result<Option<XmlEvent<'a>>, ReadError> {
        if self.scanner.is_eof() {
            return Ok(None);
        }

        let start = self.scanner.position();
        if self.scanner.peek() != Some(b'<') {
            let end = self.scanner.next_markup();
            self.scanner.seek(end);
            return Ok(Some(XmlEvent::Text(decode_text(&self.input[start..end]))));
        }

        if self.scanner.starts_with("<!--") {
            return self.read_delimited(start, 4, "-->", "unterminated comment")
                .map(|content| Some(XmlEvent::Comment(content)));
        }
        if self.scanner.starts_with("<![CDATA[") {
            return self.read_delimited(start, 9, "]]>", "unterminated CDATA section")
                .map(|content| Some(XmlEvent::CData(content)));
        }
        if self.scanner.starts_with("<!DOCTYPE") {
            return self.read_doctype(start).map(Some);
        }
        if self.scanner.starts_with("<?") {
            return self.read_processing_instruction(start).map(Some);
        }
        if self.scanner.starts_with("</") {
            return self.read_end_tag(start).map(Some);
        }
        self.read_start_tag(start).map(Some)
    }

    /// Read `<open ... close>` and return the content between the delimiters
    fn read_delimited(
        &mut self,
        start: usize,
        open_len: usize,
        close: &str,
        unterminated: &str,
    ) -> Result<&'a str, ReadError> {
        self.scanner.advance(open_len);
        let end = self
            .scanner
            .find(close)
            .ok_or_else(|| ReadError::new(unterminated, start))?;
        let content = &self.input[start + open_len..end];
        self.scanner.seek(end + close.len());
        Ok(content)
    }

    fn read_doctype(&mut self, start: usize) -> Result<XmlEvent<'a>, ReadError> {
        // The internal subset may contain '>' inside brackets
        let bytes = self.input.as_bytes();
        let mut depth = 0usize;
        let mut pos = start + 9;
        while pos < bytes.len() {
            match bytes[pos] {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => {
                    self.scanner.seek(pos + 1);
                    return Ok(XmlEvent::DocType(&self.input[start..=pos]));
                }
                _ => {}
            }
            pos += 1;
        }
        Err(ReadError::new("unterminated DOCTYPE", start))
    }

    fn read_processing_instruction(&mut self, start: usize) -> Result<XmlEvent<'a>, ReadError> {
        self.scanner.advance(2);
        let target = self
            .scanner
            .read_name()
            .ok_or_else(|| ReadError::new("processing instruction without target", start))?;
        let end = self
            .scanner
            .find("?>")
            .ok_or_else(|| ReadError::new("unterminated processing instruction", start))?;
        let data = self.input[self.scanner.position()..end].trim();
        self.scanner.seek(end + 2);

        if target.eq_ignore_ascii_case("xml") {
            return Ok(XmlEvent::XmlDeclaration);
        }
        Ok(XmlEvent::ProcessingInstruction {
            target,
            data: (!data.is_empty()).then_some(data),
        })
    }

    fn read_end_tag(&mut self, start: usize) -> Result<XmlEvent<'a>, ReadError> {
        self.scanner.advance(2);
        let name_start = self.scanner.position();
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| ReadError::new("expected element name after '</'", name_start))?;
        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'>') {
            return Err(ReadError::new("expected '>' to close end tag", self.scanner.position()));
        }
        self.scanner.advance(1);
        Ok(XmlEvent::EndElement { name, offset: start })
    }

    fn read_start_tag(&mut self, start: usize) -> Result<XmlEvent<'a>, ReadError> {
        self.scanner.advance(1);
        let name_start = self.scanner.position();
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| ReadError::new("expected element name after '<'", name_start))?;

        let attrs_start = self.scanner.position();
        let end = self
            .scanner
            .find_tag_end()
            .ok_or_else(|| ReadError::new("unterminated start tag", start))?;
        let is_empty = end > attrs_start && self.input.as_bytes()[end - 1] == b'/';
        let attrs_end = if is_empty { end - 1 } else { end };
        let raw_attrs = &self.input[attrs_start..attrs_end];
        if !raw_attrs.is_empty() && !raw_attrs.starts_with(|c: char| c.is_ascii_whitespace()) {
            return Err(ReadError::new("invalid character in element name", attrs_start));
        }
        let attributes = parse_attributes(raw_attrs)
            .map_err(|(message, offset)| ReadError::new(message, attrs_start + offset))?;
        self.scanner.seek(end + 1);

        let element = StartElement {
            name,
            attributes,
            offset: start,
        };
        Ok(if is_empty {
            XmlEvent::EmptyElement(element)
        } else {
            XmlEvent::StartElement(element)
        })
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = Result<XmlEvent<'a>, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(input: &str) -> Vec<XmlEvent<'_>> {
        SliceReader::new(input).collect::<Result<_, _>>().unwrap()
    }

    #[test]
    fn test_simple_element() {
        let events = events("<root>hello</root>");
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], XmlEvent::StartElement(e) if e.name == "root"));
        assert!(matches!(&events[1], XmlEvent::Text(t) if t == "hello"));
        assert!(matches!(&events[2], XmlEvent::EndElement { name: "root", .. }));
    }

    #[test]
    fn test_empty_element() {
        let events = events("<br/>");
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], XmlEvent::EmptyElement(e) if e.name == "br"));
    }

    #[test]
    fn test_attributes() {
        let events = events("<div id=\"main\" class=\"container\"/>");
        let e = events[0].as_start_element().unwrap();
        assert_eq!(e.get_attribute_value("id"), Some("main"));
        assert_eq!(e.get_attribute_value("class"), Some("container"));
    }

    #[test]
    fn test_cdata_comment_and_declaration() {
        let events = events("<?xml version=\"1.0\"?><s><![CDATA[a<b]]><!-- note --></s>");
        assert!(matches!(events[0], XmlEvent::XmlDeclaration));
        assert!(matches!(&events[2], XmlEvent::CData("a<b")));
        assert!(matches!(&events[3], XmlEvent::Comment(" note ")));
    }

    #[test]
    fn test_gt_inside_attribute_value() {
        let events = events("<a expr=\"x > 1\"/>");
        let e = events[0].as_start_element().unwrap();
        assert_eq!(e.get_attribute_value("expr"), Some("x > 1"));
    }

    #[test]
    fn test_position_tracks_event_starts() {
        let mut reader = SliceReader::new("<a>text<b/></a>");
        let mut starts = Vec::new();
        loop {
            let at = reader.position();
            if reader.next_event().unwrap().is_none() {
                break;
            }
            starts.push(at);
        }
        assert_eq!(starts, [0, 3, 7, 11]);
    }

    #[test]
    fn test_unterminated_comment_reports_offset() {
        let err = SliceReader::new("<a><!-- open</a>")
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert_eq!(err.offset, 3);
    }
}
