/*!
# Reversible text transforms

[`TransformableString`] wraps an immutable original and accepts
non-overlapping replacements over it. It can always answer two questions:

- what does the transformed text look like (`to_string`/[`as_str`]), and
- where did a transformed position come from ([`original_index`],
  [`original_location`]).

Replacements are stored sorted by original start. Everything between them is
implicitly copied from the original, so the buffer is always a partition of
the original into [`Segment`]s: ranges kept verbatim and ranges replaced by
other text (possibly empty, possibly longer).

```
use scriptlift_engine::transform::TransformableString;

let mut text = TransformableString::new("<p>hi</p><script>a;</script>");
text.replace(0, 17, "").unwrap();
text.replace(19, 28, "").unwrap();
assert_eq!(text.as_str(), "a;");
assert_eq!(text.original_index(1).unwrap(), Some(18));
```

Several views over the same document share one [`OriginalText`] through an
`Arc`, so building a view per fragment does not copy the document.

[`as_str`]: TransformableString::as_str
[`original_index`]: TransformableString::original_index
[`original_location`]: TransformableString::original_location
*/

mod lines;

use std::fmt;
use std::sync::{Arc, OnceLock};

use thiserror::Error;

pub use lines::{LineIndex, Location};

use crate::span::Span;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("invalid range {start}..{end} for text of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("range {start}..{end} overlaps an existing replacement at {existing:?}")]
    Overlap {
        start: usize,
        end: usize,
        existing: Span,
    },

    #[error("index {index} is out of range for text of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("line {line} is out of range (1..={line_count})")]
    LineOutOfRange { line: usize, line_count: usize },
}

/// The immutable text every view is built over, with its line table.
#[derive(Debug)]
pub struct OriginalText {
    text: String,
    lines: LineIndex,
}

impl OriginalText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = LineIndex::new(&text);
        Self { text, lines }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn lines(&self) -> &LineIndex {
        &self.lines
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Replacement {
    span: Span,
    text: String,
}

/// One piece of the partition of the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Original text copied verbatim.
    Original { span: Span, text: &'a str },
    /// An original range and the text standing in for it.
    Replaced { span: Span, text: &'a str },
}

impl<'a> Segment<'a> {
    /// The original range this segment covers.
    pub fn span(&self) -> Span {
        match self {
            Segment::Original { span, .. } | Segment::Replaced { span, .. } => *span,
        }
    }

    /// The text this segment contributes to the transformed string.
    pub fn text(&self) -> &'a str {
        match self {
            Segment::Original { text, .. } | Segment::Replaced { text, .. } => text,
        }
    }
}

/// Iterator over the [`Segment`]s of a [`TransformableString`], in order.
pub struct Segments<'a> {
    original: &'a str,
    replacements: &'a [Replacement],
    next: usize,
    pos: usize,
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(replacement) = self.replacements.get(self.next) {
            if self.pos < replacement.span.start {
                let span = Span::new(self.pos, replacement.span.start);
                self.pos = replacement.span.start;
                return Some(Segment::Original {
                    span,
                    text: span.slice(self.original),
                });
            }
            self.next += 1;
            self.pos = replacement.span.end;
            return Some(Segment::Replaced {
                span: replacement.span,
                text: &replacement.text,
            });
        }

        if self.pos < self.original.len() {
            let span = Span::new(self.pos, self.original.len());
            self.pos = span.end;
            return Some(Segment::Original {
                span,
                text: span.slice(self.original),
            });
        }

        None
    }
}

/// A string built from an original by non-overlapping replacements, able to
/// map transformed positions back to the original.
#[derive(Debug, Clone)]
pub struct TransformableString {
    original: Arc<OriginalText>,
    replacements: Vec<Replacement>,
    rendered: OnceLock<String>,
    rendered_lines: OnceLock<LineIndex>,
}

impl TransformableString {
    pub fn new(original: impl Into<String>) -> Self {
        Self::from_shared(Arc::new(OriginalText::new(original)))
    }

    /// Creates a view over an original shared with other views.
    pub fn from_shared(original: Arc<OriginalText>) -> Self {
        Self {
            original,
            replacements: Vec::new(),
            rendered: OnceLock::new(),
            rendered_lines: OnceLock::new(),
        }
    }

    pub fn original(&self) -> &str {
        self.original.as_str()
    }

    pub fn shared_original(&self) -> &Arc<OriginalText> {
        &self.original
    }

    /// Replaces the original range `start..end` with `text`.
    ///
    /// Ranges are in original coordinates and may be given in any order, but
    /// must not overlap a previous replacement. Touching ranges are fine, and
    /// an empty range is an insertion.
    pub fn replace(
        &mut self,
        start: usize,
        end: usize,
        text: impl Into<String>,
    ) -> Result<(), TransformError> {
        let source = self.original.as_str();
        if start > end
            || end > source.len()
            || !source.is_char_boundary(start)
            || !source.is_char_boundary(end)
        {
            return Err(TransformError::InvalidRange {
                start,
                end,
                len: source.len(),
            });
        }

        // First replacement ending after `start`; ends are sorted because
        // replacements never overlap.
        let at = self
            .replacements
            .partition_point(|existing| existing.span.end <= start);
        if let Some(existing) = self.replacements.get(at)
            && existing.span.start < end
        {
            return Err(TransformError::Overlap {
                start,
                end,
                existing: existing.span,
            });
        }
        // Two insertions at one point would make the mapping ambiguous
        if start == end
            && let Some(existing) = self.replacements[..at]
                .iter()
                .rev()
                .take_while(|existing| existing.span.end == start)
                .find(|existing| existing.span.is_empty())
        {
            return Err(TransformError::Overlap {
                start,
                end,
                existing: existing.span,
            });
        }

        self.replacements.insert(
            at,
            Replacement {
                span: Span::new(start, end),
                text: text.into(),
            },
        );
        self.rendered = OnceLock::new();
        self.rendered_lines = OnceLock::new();
        Ok(())
    }

    /// Deletes the original range `start..end`.
    pub fn remove(&mut self, start: usize, end: usize) -> Result<(), TransformError> {
        self.replace(start, end, "")
    }

    /// The transformed text. Built once and cached until the next replacement.
    pub fn as_str(&self) -> &str {
        self.rendered
            .get_or_init(|| self.segments().map(|segment| segment.text()).collect())
    }

    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }

    pub fn segments(&self) -> Segments<'_> {
        Segments {
            original: self.original.as_str(),
            replacements: &self.replacements,
            next: 0,
            pos: 0,
        }
    }

    /// Maps a transformed byte index back to the original.
    ///
    /// Returns `Ok(None)` for positions strictly inside inserted text. The
    /// index one past the end of the transformed text is valid.
    pub fn original_index(&self, index: usize) -> Result<Option<usize>, TransformError> {
        let len = self.len();
        if index > len {
            return Err(TransformError::IndexOutOfRange { index, len });
        }

        let mut original = index;
        let mut last = None;
        for replacement in &self.replacements {
            if original < replacement.span.start {
                break;
            }
            let inserted_end = replacement.span.start + replacement.text.len();
            if original < inserted_end {
                return Ok(None);
            }
            original = original - replacement.text.len() + replacement.span.len();
            last = Some(replacement);
        }

        let original_len = self.original.len();
        if original > original_len {
            return Err(TransformError::IndexOutOfRange {
                index,
                len: original_len,
            });
        }
        // The end of the text maps into a trailing replacement, never past
        // its original range. A trailing deletion maps to its end.
        if original == original_len
            && let Some(replacement) = last
            && replacement.span.end == original_len
            && !replacement.text.is_empty()
        {
            let end = replacement.span.start + replacement.text.len();
            return Ok(Some(end.min(replacement.span.end)));
        }

        Ok(Some(original))
    }

    /// Maps a location in the transformed text back to the original.
    pub fn original_location(&self, location: Location) -> Result<Option<Location>, TransformError> {
        let lines = self.transformed_lines();
        let index = lines
            .offset_of(location)
            .ok_or(TransformError::LineOutOfRange {
                line: location.line,
                line_count: lines.line_count(),
            })?;
        Ok(self
            .original_index(index)?
            .map(|original| self.original.lines().location_of(original)))
    }

    /// Text of the 1-based original line `line`, without its terminator.
    pub fn original_line(&self, line: usize) -> Result<&str, TransformError> {
        let lines = self.original.lines();
        lines
            .line_span(line)
            .map(|span| span.slice(self.original.as_str()))
            .ok_or(TransformError::LineOutOfRange {
                line,
                line_count: lines.line_count(),
            })
    }

    /// Line table of the transformed text.
    pub fn transformed_lines(&self) -> &LineIndex {
        self.rendered_lines
            .get_or_init(|| LineIndex::new(self.as_str()))
    }
}

impl fmt::Display for TransformableString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ============ replace ============

    #[test]
    fn untouched_text_is_unchanged() {
        assert_eq!(TransformableString::new("foo").to_string(), "foo");
    }

    #[test]
    fn replaces_a_slice() {
        let mut ts = TransformableString::new("foo");
        ts.replace(1, 2, "OO").unwrap();
        assert_eq!(ts.to_string(), "fOOo");
    }

    #[test]
    fn rejects_overlapping_replacements() {
        let mut ts = TransformableString::new("abcd");
        ts.replace(1, 3, "OO").unwrap();
        assert!(matches!(
            ts.replace(2, 4, "OO"),
            Err(TransformError::Overlap { .. })
        ));
        assert!(matches!(
            ts.replace(0, 2, "OO"),
            Err(TransformError::Overlap { .. })
        ));
        assert!(matches!(
            ts.replace(2, 2, "x"),
            Err(TransformError::Overlap { .. })
        ));
        assert_eq!(ts.to_string(), "aOOd");
    }

    #[test]
    fn rejects_a_second_insertion_at_the_same_point() {
        let mut ts = TransformableString::new("ab");
        ts.replace(1, 1, "x").unwrap();
        assert!(matches!(
            ts.replace(1, 1, "y"),
            Err(TransformError::Overlap { .. })
        ));
        assert_eq!(ts.to_string(), "axb");
    }

    #[test]
    fn replaces_adjacent_slices_in_any_order() {
        let mut ts = TransformableString::new("abcde");
        ts.replace(2, 3, "OO").unwrap();
        ts.replace(3, 4, "MM").unwrap();
        ts.replace(1, 2, "NN").unwrap();
        assert_eq!(ts.to_string(), "aNNOOMMe");
    }

    #[test]
    fn rejects_invalid_ranges() {
        let mut ts = TransformableString::new("héllo");
        assert!(matches!(
            ts.replace(3, 1, ""),
            Err(TransformError::InvalidRange { .. })
        ));
        assert!(matches!(
            ts.replace(0, 10, ""),
            Err(TransformError::InvalidRange { .. })
        ));
        // Byte 2 is inside the two-byte 'é'
        assert!(matches!(
            ts.replace(2, 3, ""),
            Err(TransformError::InvalidRange { .. })
        ));
    }

    #[test]
    fn insertions_at_a_replacement_boundary() {
        let mut ts = TransformableString::new("abcd");
        ts.replace(1, 3, "X").unwrap();
        ts.replace(1, 1, "<").unwrap();
        ts.replace(3, 3, ">").unwrap();
        assert_eq!(ts.to_string(), "a<X>d");
    }

    #[test]
    fn segments_partition_the_original() {
        let mut ts = TransformableString::new("abcde");
        ts.replace(1, 2, "B").unwrap();
        ts.replace(4, 5, "").unwrap();
        let spans: Vec<Span> = ts.segments().map(|segment| segment.span()).collect();
        assert_eq!(
            spans,
            vec![
                Span::new(0, 1),
                Span::new(1, 2),
                Span::new(2, 4),
                Span::new(4, 5)
            ]
        );
        let texts: Vec<&str> = ts.segments().map(|segment| segment.text()).collect();
        assert_eq!(texts, vec!["a", "B", "cd", ""]);
    }

    // ============ original_index ============

    #[test]
    fn index_is_identity_without_changes() {
        let ts = TransformableString::new("abcde");
        assert_eq!(ts.original_index(0).unwrap(), Some(0));
        assert_eq!(ts.original_index(1).unwrap(), Some(1));
        assert_eq!(ts.original_index(4).unwrap(), Some(4));
        assert!(ts.original_index(6).is_err());
    }

    #[test]
    fn index_skips_removed_parts() {
        let mut ts = TransformableString::new("abcde");
        ts.replace(1, 2, "").unwrap();
        ts.replace(3, 4, "").unwrap();
        assert_eq!(ts.to_string(), "ace");
        assert_eq!(ts.original_index(0).unwrap(), Some(0));
        assert_eq!(ts.original_index(1).unwrap(), Some(2));
        assert_eq!(ts.original_index(2).unwrap(), Some(4));
        assert_eq!(ts.original_index(3).unwrap(), Some(5));
        assert!(ts.original_index(4).is_err());
    }

    #[test]
    fn index_inside_added_parts_is_unmapped() {
        let mut ts = TransformableString::new("ace");
        ts.replace(1, 1, "b").unwrap();
        ts.replace(2, 2, "d").unwrap();
        assert_eq!(ts.to_string(), "abcde");
        assert_eq!(ts.original_index(0).unwrap(), Some(0));
        assert_eq!(ts.original_index(1).unwrap(), None);
        assert_eq!(ts.original_index(2).unwrap(), Some(1));
        assert_eq!(ts.original_index(3).unwrap(), None);
        assert_eq!(ts.original_index(4).unwrap(), Some(2));
        assert_eq!(ts.original_index(5).unwrap(), Some(3));
        assert!(ts.original_index(6).is_err());
    }

    #[test]
    fn index_inside_multi_byte_insertion_is_unmapped() {
        let mut ts = TransformableString::new("ab");
        ts.replace(1, 1, "XX").unwrap();
        assert_eq!(ts.to_string(), "aXXb");
        assert_eq!(ts.original_index(0).unwrap(), Some(0));
        assert_eq!(ts.original_index(1).unwrap(), None);
        assert_eq!(ts.original_index(2).unwrap(), None);
        assert_eq!(ts.original_index(3).unwrap(), Some(1));
    }

    #[test]
    fn end_index_after_trailing_replacement() {
        let mut ts = TransformableString::new("abcd");
        ts.replace(2, 4, "X").unwrap();
        assert_eq!(ts.to_string(), "abX");
        assert_eq!(ts.original_index(0).unwrap(), Some(0));
        assert_eq!(ts.original_index(1).unwrap(), Some(1));
        assert_eq!(ts.original_index(2).unwrap(), None);
        assert_eq!(ts.original_index(3).unwrap(), Some(3));
    }

    #[test]
    fn end_index_after_trailing_deletion() {
        let mut ts = TransformableString::new("abcd");
        ts.remove(2, 4).unwrap();
        assert_eq!(ts.to_string(), "ab");
        assert_eq!(ts.original_index(1).unwrap(), Some(1));
        assert_eq!(ts.original_index(2).unwrap(), Some(4));
    }

    #[test]
    fn end_index_after_trailing_insertion() {
        let mut ts = TransformableString::new("abc");
        ts.replace(3, 3, "XY").unwrap();
        assert_eq!(ts.to_string(), "abcXY");
        assert_eq!(ts.original_index(2).unwrap(), Some(2));
        assert_eq!(ts.original_index(4).unwrap(), None);
        assert_eq!(ts.original_index(5).unwrap(), Some(3));
    }

    #[test]
    fn end_index_after_growing_trailing_replacement() {
        let mut ts = TransformableString::new("abcd");
        ts.replace(2, 4, "XYZW").unwrap();
        assert_eq!(ts.to_string(), "abXYZW");
        assert_eq!(ts.original_index(5).unwrap(), None);
        assert_eq!(ts.original_index(6).unwrap(), Some(4));
    }

    // ============ original_location ============

    #[test]
    fn location_is_identity_without_changes() {
        let ts = TransformableString::new("aaaa\nbbbb\ncccc");
        for (line, column) in [(1, 1), (1, 3), (2, 1)] {
            assert_eq!(
                ts.original_location(Location::new(line, column)).unwrap(),
                Some(Location::new(line, column))
            );
        }
    }

    #[test]
    fn location_skips_removed_parts() {
        let mut ts = TransformableString::new("aaaa\nbbbb\ncccc");
        ts.replace(3, 6, "").unwrap();
        assert_eq!(ts.to_string(), "aaabbb\ncccc");
        assert_eq!(
            ts.original_location(Location::new(1, 1)).unwrap(),
            Some(Location::new(1, 1))
        );
        assert_eq!(
            ts.original_location(Location::new(1, 4)).unwrap(),
            Some(Location::new(2, 2))
        );
        assert_eq!(
            ts.original_location(Location::new(2, 1)).unwrap(),
            Some(Location::new(3, 1))
        );
    }

    #[test]
    fn location_inside_added_parts_is_unmapped() {
        let mut ts = TransformableString::new("aaaa\nbbbbcccc");
        ts.replace(9, 9, "X\nX").unwrap();
        assert_eq!(ts.to_string(), "aaaa\nbbbbX\nXcccc");
        assert_eq!(
            ts.original_location(Location::new(1, 4)).unwrap(),
            Some(Location::new(1, 4))
        );
        assert_eq!(
            ts.original_location(Location::new(2, 1)).unwrap(),
            Some(Location::new(2, 1))
        );
        assert_eq!(ts.original_location(Location::new(2, 5)).unwrap(), None);
    }

    #[test]
    fn location_on_missing_line_is_an_error() {
        let ts = TransformableString::new("a\nb");
        assert_eq!(
            ts.original_location(Location::new(3, 1)),
            Err(TransformError::LineOutOfRange {
                line: 3,
                line_count: 2
            })
        );
    }

    // ============ original_line ============

    #[test]
    fn returns_original_lines() {
        let ts = TransformableString::new("aa\nbb\r\ncc");
        assert!(ts.original_line(0).is_err());
        assert_eq!(ts.original_line(1).unwrap(), "aa");
        assert_eq!(ts.original_line(2).unwrap(), "bb");
        assert_eq!(ts.original_line(3).unwrap(), "cc");
        assert!(ts.original_line(4).is_err());
    }

    #[test]
    fn original_lines_ignore_replacements() {
        let mut ts = TransformableString::new("one\ntwo");
        ts.replace(0, 7, "x").unwrap();
        assert_eq!(ts.original_line(2).unwrap(), "two");
    }

    #[test]
    fn shared_views_are_independent() {
        let original = Arc::new(OriginalText::new("abc"));
        let mut left = TransformableString::from_shared(Arc::clone(&original));
        let mut right = TransformableString::from_shared(original);
        left.replace(0, 1, "").unwrap();
        right.replace(2, 3, "").unwrap();
        assert_eq!(left.as_str(), "bc");
        assert_eq!(right.as_str(), "ab");
    }
}
