//! Open-tag parsing.
//!
//! Everything between a tag name and its closing `>` is lexed with [Logos]
//! into a handful of context-free tokens, then folded into attributes. Every
//! byte of the tag lands in exactly one token, so a tag that never closes is
//! detected simply by running out of tokens.
//!
//! [Logos]: https://docs.rs/logos

use std::borrow::Cow;
use std::ops::Range;

use logos::Logos;

use crate::span::Span;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum TagToken {
    /// Whitespace between attributes
    #[regex(r"[ \t\r\n\x0C]+")]
    Whitespace,

    #[token("=")]
    Eq,

    #[token("/>")]
    SelfClose,

    #[token(">")]
    End,

    /// A stray `/` that does not close the tag
    #[token("/")]
    Slash,

    #[regex(r#""[^"]*""#)]
    DoubleQuoted,

    #[regex(r"'[^']*'")]
    SingleQuoted,

    /// Attribute names and unquoted values
    #[regex(r#"[^ \t\r\n\x0C"'=/>]+"#)]
    Word,
}

/// One attribute of an open tag. `value` is `None` for bare attributes such
/// as `<script async>`. Values have character references decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
    pub span: Span,
}

/// An open tag as it appears in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Tag name, lowercased in HTML mode.
    pub name: String,
    pub attributes: Vec<Attribute>,
    /// From `<` through `>` inclusive.
    pub span: Span,
    /// Whether the tag was written `<name ... />`.
    pub self_closing: bool,
}

impl Tag {
    /// Value of the first attribute called `name`. Bare attributes read as
    /// the empty string.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.value.as_deref().unwrap_or(""))
    }
}

/// Parses the attribute list of a tag whose name ends at `name_end`.
///
/// `start` is the offset of the `<`. Returns `None` if the tag is never
/// closed.
pub(crate) fn parse_open_tag(
    source: &str,
    start: usize,
    name: String,
    name_end: usize,
    lowercase: bool,
) -> Option<Tag> {
    let tail = source.get(name_end..)?;
    let mut lexer = TagToken::lexer(tail);
    let mut tokens: Vec<(TagToken, Range<usize>)> = Vec::new();

    let (end, self_closing) = loop {
        let token = lexer.next()?;
        let range = lexer.span();
        match token {
            Ok(TagToken::End) => break (name_end + range.end, false),
            Ok(TagToken::SelfClose) => break (name_end + range.end, true),
            Ok(kind) => tokens.push((kind, name_end + range.start..name_end + range.end)),
            // An unbalanced quote runs to the end of input
            Err(()) => return None,
        }
    };

    Some(Tag {
        name,
        attributes: fold_attributes(source, &tokens, lowercase),
        span: Span::new(start, end),
        self_closing,
    })
}

fn fold_attributes(
    source: &str,
    tokens: &[(TagToken, Range<usize>)],
    lowercase: bool,
) -> Vec<Attribute> {
    let mut attributes: Vec<Attribute> = Vec::new();
    let mut awaiting_value = false;
    let mut i = 0;

    while i < tokens.len() {
        let (kind, range) = &tokens[i];
        i += 1;
        match kind {
            TagToken::Whitespace | TagToken::Slash => {}
            TagToken::Eq => {
                awaiting_value = attributes
                    .last()
                    .is_some_and(|attribute| attribute.value.is_none());
            }
            TagToken::DoubleQuoted | TagToken::SingleQuoted => {
                if awaiting_value && let Some(attribute) = attributes.last_mut() {
                    let inner = &source[range.start + 1..range.end - 1];
                    attribute.value = Some(decode(inner));
                    attribute.span.end = range.end;
                }
                awaiting_value = false;
            }
            TagToken::Word if awaiting_value => {
                // Unquoted values run until whitespace or the end of the tag
                let mut end = range.end;
                while let Some((next, next_range)) = tokens.get(i)
                    && next_range.start == end
                    && matches!(next, TagToken::Word | TagToken::Slash | TagToken::Eq)
                {
                    end = next_range.end;
                    i += 1;
                }
                if let Some(attribute) = attributes.last_mut() {
                    attribute.value = Some(decode(&source[range.start..end]));
                    attribute.span.end = end;
                }
                awaiting_value = false;
            }
            TagToken::Word => {
                let raw = &source[range.clone()];
                let name = if lowercase {
                    raw.to_ascii_lowercase()
                } else {
                    raw.to_string()
                };
                attributes.push(Attribute {
                    name,
                    value: None,
                    span: Span::from(range.clone()),
                });
            }
            // Terminators never reach the token list
            TagToken::End | TagToken::SelfClose => {}
        }
    }

    attributes
}

fn decode(raw: &str) -> String {
    match html_escape::decode_html_entities(raw) {
        Cow::Borrowed(text) => text.to_string(),
        Cow::Owned(text) => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Option<Tag> {
        let name_end = source
            .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .unwrap_or(source.len());
        let name = source[1..name_end].to_ascii_lowercase();
        parse_open_tag(source, 0, name, name_end, true)
    }

    #[test]
    fn plain_tag() {
        let tag = parse("<script>").unwrap();
        assert_eq!(tag.name, "script");
        assert!(tag.attributes.is_empty());
        assert_eq!(tag.span, Span::new(0, 8));
        assert!(!tag.self_closing);
    }

    #[test]
    fn quoted_and_unquoted_values() {
        let tag = parse(r#"<script type="text/babel" data-x='1' src=lib/a.js?v=2>"#).unwrap();
        assert_eq!(tag.attribute("type"), Some("text/babel"));
        assert_eq!(tag.attribute("data-x"), Some("1"));
        assert_eq!(tag.attribute("src"), Some("lib/a.js?v=2"));
    }

    #[test]
    fn bare_attributes_and_case() {
        let tag = parse("<SCRIPT ASYNC Type = 'module'>").unwrap();
        assert_eq!(tag.name, "script");
        assert_eq!(tag.attribute("async"), Some(""));
        assert_eq!(tag.attribute("type"), Some("module"));
        assert_eq!(tag.attribute("src"), None);
    }

    #[test]
    fn self_closing_tag() {
        let tag = parse("<script src=\"a.js\" />").unwrap();
        assert!(tag.self_closing);
        assert_eq!(tag.attribute("src"), Some("a.js"));
    }

    #[test]
    fn decodes_character_references() {
        let tag = parse(r#"<script type="text&#x2F;javascript" title="a &amp; b">"#).unwrap();
        assert_eq!(tag.attribute("type"), Some("text/javascript"));
        assert_eq!(tag.attribute("title"), Some("a & b"));
    }

    #[test]
    fn greater_than_inside_quotes_does_not_end_tag() {
        let tag = parse(r#"<script data-cmp="a>b">x"#).unwrap();
        assert_eq!(tag.attribute("data-cmp"), Some("a>b"));
        assert_eq!(tag.span, Span::new(0, 23));
    }

    #[test]
    fn unterminated_tags() {
        assert_eq!(parse("<script type=\"text"), None);
        assert_eq!(parse("<script async"), None);
    }
}
