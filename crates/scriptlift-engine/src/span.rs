use std::ops::Range;

/// A byte range `[start, end)` into a source document.
///
/// Chunks, tags and replacements all store spans rather than copied text, so
/// slicing the original with any span reproduces the exact source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Span {
    /// Inclusive start byte offset.
    pub start: usize,
    /// Exclusive end byte offset.
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// An empty span positioned at `at`.
    pub const fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    /// Returns the length in bytes. Uses saturating subtraction so an inverted
    /// span reads as empty.
    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the span is empty (start >= end).
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Returns true if `offset` lies inside the half-open range.
    #[must_use]
    pub fn contains(self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Returns the text covered by this span.
    ///
    /// # Panics
    /// Panics if the span is out of bounds or not on char boundaries, the same
    /// as slicing with a range would.
    #[must_use]
    pub fn slice(self, source: &str) -> &str {
        &source[self.start..self.end]
    }

    pub fn range(self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_and_empty() {
        assert_eq!(Span::new(2, 5).len(), 3);
        assert!(Span::empty(4).is_empty());
        // Inverted spans saturate to zero
        assert_eq!(Span::new(5, 2).len(), 0);
    }

    #[test]
    fn contains_is_half_open() {
        let span = Span::new(1, 3);
        assert!(!span.contains(0));
        assert!(span.contains(1));
        assert!(span.contains(2));
        assert!(!span.contains(3));
    }

    #[test]
    fn slice_and_range_conversion() {
        let span: Span = (4..9).into();
        assert_eq!(span.slice("<p>hello</p>"), "ello<");
        assert_eq!(span.range(), 4..9);
    }
}
