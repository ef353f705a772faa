//! Attribute parsing for the raw text between an element name and `>`

use super::entities::decode_text;
use super::scanner::Scanner;
use memchr::memchr2;
use std::borrow::Cow;

/// A parsed attribute, name as written (prefix included), value decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub name: &'a str,
    pub value: Cow<'a, str>,
}

/// Parse `name="value"` pairs from raw tag content
///
/// Input is the content between the element name and `>` or `/>`. On
/// malformed input the error carries a byte offset relative to `input`.
pub fn parse_attributes(input: &str) -> Result<Vec<Attribute<'_>>, (&'static str, usize)> {
    let mut scanner = Scanner::new(input);
    let mut attrs: Vec<Attribute<'_>> = Vec::new();

    loop {
        scanner.skip_whitespace();
        if scanner.is_eof() {
            return Ok(attrs);
        }

        let name_start = scanner.position();
        let name = scanner.read_name().ok_or((
            "attribute name must start with a letter, underscore, or colon",
            name_start,
        ))?;

        scanner.skip_whitespace();
        if scanner.peek() != Some(b'=') {
            return Err(("attribute value required", scanner.position()));
        }
        scanner.advance(1);
        scanner.skip_whitespace();

        let quote_at = scanner.position();
        let quote = match scanner.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(("attribute value must be quoted", quote_at)),
        };
        let value_start = quote_at + 1;
        let rest = &input.as_bytes()[value_start..];
        let end = match memchr2(quote, b'<', rest) {
            Some(i) if rest[i] == quote => value_start + i,
            Some(i) => return Err(("attribute value cannot contain '<'", value_start + i)),
            None => return Err(("attribute value has mismatched quotes", quote_at)),
        };

        if attrs.iter().any(|a| a.name == name) {
            return Err(("duplicate attribute", name_start));
        }
        attrs.push(Attribute {
            name,
            value: decode_text(&input[value_start..end]),
        });
        scanner.seek(end + 1);
    }
}
