//! XML Entity Decoding and Escaping
//!
//! Handles decoding of XML entities:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//!
//! Uses Cow for zero-copy when no entities are present.

use memchr::memchr;
use std::borrow::Cow;

/// Decode text content, handling entity references
///
/// Returns Borrowed if no entities present (zero-copy),
/// returns Owned if entities were decoded.
#[inline]
pub fn decode_text(input: &str) -> Cow<'_, str> {
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_entities(input))
}

/// Decode all entity references in the input
///
/// Unknown entities and stray ampersands are kept verbatim.
fn decode_entities(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut result = String::with_capacity(input.len());
    let mut pos = 0;

    while pos < bytes.len() {
        let Some(amp_offset) = memchr(b'&', &bytes[pos..]) else {
            result.push_str(&input[pos..]);
            break;
        };
        result.push_str(&input[pos..pos + amp_offset]);
        pos += amp_offset;

        let decoded = memchr(b';', &bytes[pos..]).and_then(|semi_offset| {
            decode_entity(&input[pos + 1..pos + semi_offset]).map(|c| (c, semi_offset))
        });
        match decoded {
            Some((c, semi_offset)) => {
                result.push(c);
                pos += semi_offset + 1;
            }
            None => {
                result.push('&');
                pos += 1;
            }
        }
    }

    result
}

/// Decode a single entity (without & and ;)
fn decode_entity(entity: &str) -> Option<char> {
    if let Some(numeric) = entity.strip_prefix('#') {
        return decode_numeric_entity(numeric);
    }

    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// Decode a numeric character reference
fn decode_numeric_entity(entity: &str) -> Option<char> {
    let codepoint = if let Some(hex) = entity.strip_prefix(['x', 'X']) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.parse::<u32>().ok()?
    };

    if !is_valid_xml_char(codepoint) {
        return None;
    }
    char::from_u32(codepoint)
}

/// Check if a code point is a valid XML 1.0 Char
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}

/// Escape `<`, `>` and `&` for element content
pub fn encode_text(input: &str) -> Cow<'_, str> {
    escape(input, false)
}

/// Escape for a double-quoted attribute value; `"` is escaped as well
pub fn encode_attribute(input: &str) -> Cow<'_, str> {
    escape(input, true)
}

fn escape(input: &str, quotes: bool) -> Cow<'_, str> {
    let replacement = |b: u8| match b {
        b'<' => Some("&lt;"),
        b'>' => Some("&gt;"),
        b'&' => Some("&amp;"),
        b'"' if quotes => Some("&quot;"),
        _ => None,
    };

    let bytes = input.as_bytes();
    let Some(first) = bytes.iter().position(|&b| replacement(b).is_some()) else {
        return Cow::Borrowed(input);
    };

    let mut result = String::with_capacity(input.len() + 16);
    let mut copied = 0;
    for (i, &b) in bytes.iter().enumerate().skip(first) {
        if let Some(entity) = replacement(b) {
            result.push_str(&input[copied..i]);
            result.push_str(entity);
            copied = i + 1;
        }
    }
    result.push_str(&input[copied..]);
    Cow::Owned(result)
}
