/*!
# Markup scanning

A pull-based scanner that turns an HTML or XML document into a flat stream of
[`ScanEvent`]s with exact byte spans. It makes no attempt to build a tree or
to validate: it only has to find tags, comments and CDATA sections precisely
enough for fragment extraction.

Every byte of the input is covered by exactly one event, so the events can be
replayed to reconstruct the document.

## Modes

- [`MarkupMode::Html`]: tag and attribute names are lowercased, and raw-text
  elements (`script`, `style`, `textarea`, `title` and any extra names in
  [`ScanOptions::raw_text_tags`]) swallow everything up to their matching
  close tag.
- [`MarkupMode::Xml`]: names keep their case, there are no raw-text elements
  and `<name/>` is an empty element.

CDATA sections are recognised outside raw text when [`ScanOptions::cdata`] is
set. Otherwise `<![CDATA[...]]>` is reported as a declaration.
*/

mod cursor;
mod tag;

pub use tag::{Attribute, Tag};

use std::collections::VecDeque;

use cursor::Cursor;

use crate::span::Span;

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";
const HTML_RAW_TEXT_TAGS: [&str; 4] = ["script", "style", "textarea", "title"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupMode {
    #[default]
    Html,
    Xml,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub mode: MarkupMode,
    pub cdata: bool,
    /// Extra raw-text element names for HTML mode, lowercase.
    pub raw_text_tags: Vec<String>,
}

impl ScanOptions {
    pub fn html() -> Self {
        Self::default()
    }

    pub fn xml() -> Self {
        Self {
            mode: MarkupMode::Xml,
            cdata: true,
            raw_text_tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    OpenTag(Tag),
    CloseTag { name: String, span: Span },
    Text(Span),
    /// `body` is the text between `<!--` and `-->`.
    Comment { span: Span, body: Span },
    CdataStart(Span),
    CdataEnd(Span),
    /// Doctypes, processing instructions and other `<!...>`/`<?...>` markup.
    Declaration(Span),
}

impl ScanEvent {
    pub fn span(&self) -> Span {
        match self {
            ScanEvent::OpenTag(tag) => tag.span,
            ScanEvent::CloseTag { span, .. }
            | ScanEvent::Text(span)
            | ScanEvent::Comment { span, .. }
            | ScanEvent::CdataStart(span)
            | ScanEvent::CdataEnd(span)
            | ScanEvent::Declaration(span) => *span,
        }
    }
}

pub struct Scanner<'a> {
    cursor: Cursor<'a>,
    options: ScanOptions,
    raw_text: Option<String>,
    pending: VecDeque<ScanEvent>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str, options: ScanOptions) -> Self {
        Self {
            cursor: Cursor::new(source),
            options,
            raw_text: None,
            pending: VecDeque::new(),
        }
    }

    fn lowercase(&self) -> bool {
        self.options.mode == MarkupMode::Html
    }

    fn is_raw_text(&self, name: &str) -> bool {
        self.options.mode == MarkupMode::Html
            && (HTML_RAW_TEXT_TAGS.contains(&name)
                || self.options.raw_text_tags.iter().any(|tag| tag == name))
    }

    fn text_until(&mut self, end: usize) {
        let start = self.cursor.pos();
        if end > start {
            self.pending.push_back(ScanEvent::Text(Span::new(start, end)));
        }
        self.cursor.seek(end);
    }

    /// Content of a raw-text element, up to its close tag.
    fn scan_raw_text(&mut self, name: String) {
        let needle = format!("</{name}");
        let mut from = self.cursor.pos();
        let close = loop {
            match self.cursor.find_ignore_case_from(from, &needle) {
                Some(at) => {
                    let after = self.cursor.s.as_bytes().get(at + needle.len()).copied();
                    match after {
                        None | Some(b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r' | b'\x0C') => {
                            break Some(at);
                        }
                        _ => from = at + needle.len(),
                    }
                }
                None => break None,
            }
        };

        match close {
            Some(at) => self.text_until(at),
            None => self.text_until(self.cursor.s.len()),
        }
    }

    fn scan_cdata(&mut self) {
        let start = self.cursor.pos();
        let open = Span::new(start, start + CDATA_OPEN.len());
        self.pending.push_back(ScanEvent::CdataStart(open));
        self.cursor.seek(open.end);

        match self.cursor.find_from(open.end, CDATA_CLOSE) {
            Some(at) => {
                self.text_until(at);
                let close = Span::new(at, at + CDATA_CLOSE.len());
                self.pending.push_back(ScanEvent::CdataEnd(close));
                self.cursor.seek(close.end);
            }
            None => self.text_until(self.cursor.s.len()),
        }
    }

    fn scan_comment(&mut self) {
        let start = self.cursor.pos();
        let body_start = start + 4;
        let (body_end, end) = match self.cursor.find_from(body_start, "-->") {
            Some(at) => (at, at + 3),
            None => (self.cursor.s.len(), self.cursor.s.len()),
        };
        self.pending.push_back(ScanEvent::Comment {
            span: Span::new(start, end),
            body: Span::new(body_start, body_end),
        });
        self.cursor.seek(end);
    }

    fn scan_declaration(&mut self) {
        let start = self.cursor.pos();
        let end = self
            .cursor
            .find_from(start, ">")
            .map_or(self.cursor.s.len(), |at| at + 1);
        self.pending
            .push_back(ScanEvent::Declaration(Span::new(start, end)));
        self.cursor.seek(end);
    }

    /// End of a tag name starting at `from`.
    fn name_end(&self, from: usize) -> usize {
        let bytes = self.cursor.s.as_bytes();
        let mut end = from;
        while let Some(&b) = bytes.get(end)
            && !matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C' | b'/' | b'>')
        {
            end += 1;
        }
        end
    }

    fn tag_name(&self, span: Span) -> String {
        let raw = span.slice(self.cursor.s);
        if self.lowercase() {
            raw.to_ascii_lowercase()
        } else {
            raw.to_string()
        }
    }

    fn scan_close_tag(&mut self) {
        let start = self.cursor.pos();
        let name_end = self.name_end(start + 2);
        let name = self.tag_name(Span::new(start + 2, name_end));
        match self.cursor.find_from(name_end, ">") {
            Some(at) => {
                let span = Span::new(start, at + 1);
                self.pending.push_back(ScanEvent::CloseTag { name, span });
                self.cursor.seek(span.end);
            }
            None => self.text_until(self.cursor.s.len()),
        }
    }

    fn scan_open_tag(&mut self) {
        let start = self.cursor.pos();
        let name_end = self.name_end(start + 1);
        let name = self.tag_name(Span::new(start + 1, name_end));
        match tag::parse_open_tag(self.cursor.s, start, name, name_end, self.lowercase()) {
            Some(tag) => {
                if self.is_raw_text(&tag.name) {
                    self.raw_text = Some(tag.name.clone());
                }
                self.cursor.seek(tag.span.end);
                self.pending.push_back(ScanEvent::OpenTag(tag));
            }
            None => self.text_until(self.cursor.s.len()),
        }
    }

    /// Whether a `<` at `at` opens some markup construct.
    fn opens_markup(&self, at: usize) -> bool {
        let bytes = self.cursor.s.as_bytes();
        match bytes.get(at + 1) {
            Some(b) if b.is_ascii_alphabetic() => true,
            Some(b'/') => bytes.get(at + 2).is_some_and(u8::is_ascii_alphabetic),
            Some(b'!' | b'?') => true,
            _ => false,
        }
    }

    fn scan_text(&mut self) {
        // Skip a `<` that was already rejected as markup
        let mut from = self.cursor.pos();
        if self.cursor.peek_at(0) == Some(b'<') {
            from += 1;
        }
        let end = loop {
            match self.cursor.find_from(from, "<") {
                Some(at) if self.opens_markup(at) => break at,
                Some(at) => from = at + 1,
                None => break self.cursor.s.len(),
            }
        };
        self.text_until(end);
    }

    fn scan_next(&mut self) {
        if let Some(name) = self.raw_text.take() {
            self.scan_raw_text(name);
            if !self.pending.is_empty() {
                return;
            }
        }

        let at = self.cursor.pos();
        if self.cursor.peek_at(0) != Some(b'<') || !self.opens_markup(at) {
            self.scan_text();
        } else if self.cursor.starts_with("<!--") {
            self.scan_comment();
        } else if self.cursor.starts_with(CDATA_OPEN) && self.options.cdata {
            self.scan_cdata();
        } else if self.cursor.starts_with("<!") || self.cursor.starts_with("<?") {
            self.scan_declaration();
        } else if self.cursor.starts_with("</") {
            self.scan_close_tag();
        } else {
            self.scan_open_tag();
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = ScanEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                log::trace!("scan event {event:?}");
                return Some(event);
            }
            if self.cursor.eof() && self.raw_text.is_none() {
                return None;
            }
            self.scan_next();
        }
    }
}
