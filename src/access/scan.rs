//! Immutable lexical scanner over rule and query text.
//!
//! Every operation returns a new [`ScanCursor`] and leaves the receiver
//! untouched, so the parser can try an alternative production by branching
//! from an earlier cursor. Failure is sticky: once an operation fails, every
//! further chained operation is a no-op that keeps the failure and the offset
//! at which it happened.

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCursor<'a> {
    input: &'a str,
    offset: usize,
    /// Text consumed by the last operation, `None` once failed.
    value: Option<&'a str>,
}

impl<'a> ScanCursor<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
            value: Some(""),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Text consumed by the last successful operation.
    pub fn value(&self) -> Option<&'a str> {
        self.value
    }

    pub fn is_ready(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.input.len()
    }

    /// Unconsumed remainder of the input.
    pub fn rest(&self) -> &'a str {
        &self.input[self.offset..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(self, len: usize) -> Self {
        Self {
            input: self.input,
            offset: self.offset + len,
            value: Some(&self.input[self.offset..self.offset + len]),
        }
    }

    fn fail(self) -> Self {
        Self {
            value: None,
            ..self
        }
    }

    pub fn skip_whitespace(self) -> Self {
        if !self.is_ready() {
            return self;
        }
        let rest = self.rest();
        let len = rest.len() - rest.trim_start().len();
        self.advance(len)
    }

    /// Like [`skip_whitespace`](Self::skip_whitespace) but fails when there
    /// is no whitespace to consume.
    pub fn read_whitespace(self) -> Self {
        let next = self.skip_whitespace();
        match next.value {
            Some(ws) if !ws.is_empty() => next,
            _ => self.fail(),
        }
    }

    pub fn read_char(self, candidates: &[char]) -> Self {
        if !self.is_ready() {
            return self;
        }
        match self.peek() {
            Some(c) if candidates.contains(&c) => self.advance(c.len_utf8()),
            _ => self.fail(),
        }
    }

    /// Consumes the longest of `literals` that prefixes the remaining input.
    pub fn read_literal_one_of(self, literals: &[&str]) -> Self {
        if !self.is_ready() {
            return self;
        }
        let rest = self.rest();
        match literals
            .iter()
            .filter(|lit| !lit.is_empty() && rest.starts_with(**lit))
            .map(|lit| lit.len())
            .max()
        {
            Some(len) => self.advance(len),
            None => self.fail(),
        }
    }

    /// Consumes the match of `pattern` starting exactly at the current offset.
    /// An empty match counts as a failure.
    pub fn read_pattern(self, pattern: &Regex) -> Self {
        if !self.is_ready() {
            return self;
        }
        match pattern.find(self.rest()) {
            Some(m) if m.start() == 0 && m.end() > 0 => self.advance(m.end()),
            _ => self.fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_whitespace_never_fails() {
        let cursor = ScanCursor::new("abc").skip_whitespace();
        assert!(cursor.is_ready());
        assert_eq!(cursor.value(), Some(""));
        assert_eq!(cursor.offset(), 0);

        let cursor = ScanCursor::new("  \tabc").skip_whitespace();
        assert_eq!(cursor.value(), Some("  \t"));
        assert_eq!(cursor.rest(), "abc");
    }

    #[test]
    fn test_read_whitespace_requires_one() {
        assert!(!ScanCursor::new("abc").read_whitespace().is_ready());
        let cursor = ScanCursor::new(" abc").read_whitespace();
        assert!(cursor.is_ready());
        assert_eq!(cursor.offset(), 1);
    }

    #[test]
    fn test_read_char() {
        let cursor = ScanCursor::new("/x").read_char(&['/', '[']);
        assert_eq!(cursor.value(), Some("/"));
        assert!(!ScanCursor::new("x").read_char(&['/']).is_ready());
        assert!(!ScanCursor::new("").read_char(&['/']).is_ready());
    }

    #[test]
    fn test_read_literal_prefers_longest() {
        let cursor = ScanCursor::new("<=5").read_literal_one_of(&["<", "<=", "="]);
        assert_eq!(cursor.value(), Some("<="));
        assert_eq!(cursor.rest(), "5");
    }

    #[test]
    fn test_read_pattern_is_anchored() {
        let digits = Regex::new(r"\d+").unwrap();
        assert!(!ScanCursor::new("ab12").read_pattern(&digits).is_ready());
        let cursor = ScanCursor::new("12ab").read_pattern(&digits);
        assert_eq!(cursor.value(), Some("12"));
    }

    #[test]
    fn test_failure_is_sticky() {
        let failed = ScanCursor::new("abc").read_char(&['/']);
        assert!(!failed.is_ready());
        let still_failed = failed.skip_whitespace().read_char(&['a']);
        assert!(!still_failed.is_ready());
        assert_eq!(still_failed.value(), None);
        assert_eq!(still_failed.offset(), 0);
    }

    #[test]
    fn test_operations_do_not_mutate_receiver() {
        let start = ScanCursor::new("/a");
        let next = start.read_char(&['/']);
        assert_eq!(start.offset(), 0);
        assert_eq!(next.offset(), 1);
        assert!(next.read_char(&['a']).is_eof());
    }
}
