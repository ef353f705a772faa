//! memchr-accelerated XML scanning
//!
//! Cursor over a `&str`. Every delimiter searched for is ASCII and name
//! characters include all non-ASCII bytes, so every position the scanner
//! stops at is a character boundary and slices can be handed out as `&str`.

use memchr::{memchr, memmem};

/// Cursor for XML delimiter detection
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Scanner { input, pos: 0 }
    }

    /// Current byte position
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    /// Advance by n bytes
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.seek(self.pos + n);
    }

    /// Jump to an absolute byte position (clamped to the input)
    #[inline]
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.input.len());
    }

    #[inline]
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.input[self.pos..].starts_with(prefix)
    }

    pub fn skip_whitespace(&mut self) {
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && is_whitespace(bytes[self.pos]) {
            self.pos += 1;
        }
    }

    /// Position of the next `<`, or the end of input
    #[inline]
    pub fn next_markup(&self) -> usize {
        memchr(b'<', &self.input.as_bytes()[self.pos..]).map_or(self.input.len(), |i| self.pos + i)
    }

    /// Position of the next `needle`, such as `-->` or `]]>`
    #[inline]
    pub fn find(&self, needle: &str) -> Option<usize> {
        memmem::find(&self.input.as_bytes()[self.pos..], needle.as_bytes()).map(|i| self.pos + i)
    }

    /// Position of the next `>` outside a quoted attribute value
    pub fn find_tag_end(&self) -> Option<usize> {
        let mut quote = None;
        for (i, &b) in self.input.as_bytes()[self.pos..].iter().enumerate() {
            match (quote, b) {
                (None, b'"' | b'\'') => quote = Some(b),
                (Some(q), _) if q == b => quote = None,
                (None, b'>') => return Some(self.pos + i),
                _ => {}
            }
        }
        None
    }

    /// Read an XML name at the cursor
    pub fn read_name(&mut self) -> Option<&'a str> {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        if !is_name_start_char(*bytes.get(start)?) {
            return None;
        }
        let len = bytes[start..]
            .iter()
            .position(|&b| !is_name_char(b))
            .unwrap_or(bytes.len() - start);
        self.pos = start + len;
        Some(&self.input[start..self.pos])
    }
}

/// ASCII letters, underscore, colon, and any non-ASCII byte
#[inline]
fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

#[inline]
fn is_name_char(b: u8) -> bool {
    is_name_start_char(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

#[inline]
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_markup() {
        let scanner = Scanner::new("hello <world>");
        assert_eq!(scanner.next_markup(), 6);
        assert_eq!(Scanner::new("no markup").next_markup(), 9);
    }

    #[test]
    fn test_find_tag_end_skips_quoted_gt() {
        let scanner = Scanner::new("<a attr=\">test\" b='>'>content");
        assert_eq!(scanner.find_tag_end(), Some(21));
    }

    #[test]
    fn test_find_terminator() {
        let scanner = Scanner::new("<!-- a - b -->rest");
        assert_eq!(scanner.find("-->"), Some(11));
    }

    #[test]
    fn test_read_name() {
        let mut scanner = Scanner::new("element-name>");
        assert_eq!(scanner.read_name(), Some("element-name"));
        assert_eq!(scanner.position(), 12);

        let mut scanner = Scanner::new("größe/>");
        assert_eq!(scanner.read_name(), Some("größe"));
        assert!(Scanner::new("1abc").read_name().is_none());
    }

    #[test]
    fn test_skip_whitespace_and_seek() {
        let mut scanner = Scanner::new("  \t\n hello");
        scanner.skip_whitespace();
        assert_eq!(scanner.position(), 5);
        scanner.seek(100);
        assert!(scanner.is_eof());
    }
}
