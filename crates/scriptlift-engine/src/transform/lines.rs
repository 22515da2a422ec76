use crate::span::Span;

/// A 1-based line/column position. Columns count bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Line table for a piece of text.
///
/// Recognised line breaks are `\r\n`, `\n`, `\r`, U+2028 and U+2029. Each
/// entry is the span of a line's content, excluding its terminator, so the
/// last entry is the (possibly empty) text after the final break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    lines: Vec<Span>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut start = 0;
        let mut chars = text.char_indices().peekable();

        while let Some((at, ch)) = chars.next() {
            let terminator_end = match ch {
                '\r' => match chars.peek() {
                    Some(&(next_at, '\n')) => {
                        chars.next();
                        next_at + 1
                    }
                    _ => at + 1,
                },
                '\n' | '\u{2028}' | '\u{2029}' => at + ch.len_utf8(),
                _ => continue,
            };
            lines.push(Span::new(start, at));
            start = terminator_end;
        }
        lines.push(Span::new(start, text.len()));

        Self { lines }
    }

    /// Number of lines. Never zero; the empty string has one empty line.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Content span of 1-based line `line`, without its terminator.
    pub fn line_span(&self, line: usize) -> Option<Span> {
        line.checked_sub(1).and_then(|i| self.lines.get(i)).copied()
    }

    /// Byte offset of `location`. The column is not clamped to the line.
    pub fn offset_of(&self, location: Location) -> Option<usize> {
        let span = self.line_span(location.line)?;
        let column = location.column.checked_sub(1)?;
        Some(span.start + column)
    }

    /// Location of byte `offset`. Offsets inside a terminator belong to the
    /// line the terminator ends.
    pub fn location_of(&self, offset: usize) -> Location {
        let line = self
            .lines
            .partition_point(|span| span.start <= offset)
            .max(1);
        let start = self.lines[line - 1].start;
        Location::new(line, offset - start + 1)
    }
}
