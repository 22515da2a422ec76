/// A byte cursor over a markup document with absolute position tracking.
///
/// The scanner only ever advances over ASCII delimiters or to positions found
/// by searching for ASCII needles, so `pos` always sits on a char boundary.
#[derive(Clone)]
pub struct Cursor<'a> {
    /// The whole document.
    pub s: &'a str,
    /// Current byte offset into `s`.
    pub i: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a new cursor at the start of `s`.
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    pub fn pos(&self) -> usize {
        self.i
    }

    /// Returns true if at end of input.
    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    /// Peeks at the byte `n` positions ahead without advancing.
    pub fn peek_at(&self, n: usize) -> Option<u8> {
        self.s.as_bytes().get(self.i + n).copied()
    }

    /// Checks if the remaining input starts with `pat`.
    pub fn starts_with(&self, pat: &str) -> bool {
        self.rest().as_bytes().starts_with(pat.as_bytes())
    }

    /// The unconsumed input.
    pub fn rest(&self) -> &'a str {
        self.s.get(self.i..).unwrap_or("")
    }

    /// Absolute offset of the next `needle` at or after `from`.
    pub fn find_from(&self, from: usize, needle: &str) -> Option<usize> {
        self.s
            .get(from..)
            .and_then(|tail| tail.find(needle))
            .map(|at| from + at)
    }

    /// Absolute offset of the next ASCII case-insensitive `needle` at or after
    /// `from`.
    pub fn find_ignore_case_from(&self, from: usize, needle: &str) -> Option<usize> {
        let haystack = self.s.as_bytes().get(from..)?;
        let needle = needle.as_bytes();
        if needle.is_empty() {
            return Some(from);
        }
        haystack
            .windows(needle.len())
            .position(|window| window.eq_ignore_ascii_case(needle))
            .map(|at| from + at)
    }

    /// Moves to the absolute offset `to`.
    pub fn seek(&mut self, to: usize) {
        self.i = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_basics() {
        let mut cur = Cursor::new("<p>");
        assert_eq!(cur.pos(), 0);
        assert!(!cur.eof());
        assert_eq!(cur.peek_at(0), Some(b'<'));
        assert_eq!(cur.peek_at(1), Some(b'p'));
        cur.seek(1);
        assert_eq!(cur.pos(), 1);
        assert_eq!(cur.rest(), "p>");
    }

    #[test]
    fn cursor_starts_with() {
        let cur = Cursor::new("<!-- note -->");
        assert!(cur.starts_with("<!--"));
        assert!(!cur.starts_with("<![CDATA["));
    }

    #[test]
    fn empty_string_input() {
        let cur = Cursor::new("");
        assert!(cur.eof());
        assert_eq!(cur.peek_at(0), None);
        assert_eq!(cur.rest(), "");
    }

    #[test]
    fn starts_with_at_eof() {
        let mut cur = Cursor::new("ab");
        cur.seek(2);
        assert!(cur.eof());
        // Empty pattern should still match at EOF
        assert!(cur.starts_with(""));
        assert!(!cur.starts_with("a"));
    }

    #[test]
    fn find_returns_absolute_offsets() {
        let cur = Cursor::new("a-->b-->");
        assert_eq!(cur.find_from(0, "-->"), Some(1));
        assert_eq!(cur.find_from(2, "-->"), Some(5));
        assert_eq!(cur.find_from(6, "-->"), None);
        assert_eq!(cur.find_from(20, "-->"), None);
    }

    #[test]
    fn find_ignoring_case() {
        let cur = Cursor::new("x < y </SCRIPT>");
        assert_eq!(cur.find_ignore_case_from(0, "</script"), Some(6));
        assert_eq!(cur.find_ignore_case_from(7, "</script"), None);
    }

    #[test]
    fn seek_past_end_is_eof() {
        let mut cur = Cursor::new("hi");
        cur.seek(10);
        assert!(cur.eof());
        assert_eq!(cur.peek_at(0), None);
        assert_eq!(cur.rest(), "");
    }
}
