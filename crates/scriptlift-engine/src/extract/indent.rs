use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use super::options::OptionsError;
use crate::span::Span;

/// How fragment lines are expected to be indented.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IndentDescriptor {
    /// Use the indentation of the first indented line of each fragment.
    #[default]
    Auto,
    /// Exactly this whitespace.
    Absolute(String),
    /// This whitespace on top of the opening tag's own indentation.
    Relative(String),
}

impl FromStr for IndentDescriptor {
    type Err = OptionsError;

    /// Parses `auto`, `N`, `+N`, `tab` or `+tab`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        static DESCRIPTOR: OnceLock<Regex> = OnceLock::new();
        if s == "auto" {
            return Ok(IndentDescriptor::Auto);
        }
        let descriptor = DESCRIPTOR
            .get_or_init(|| Regex::new(r"^(\+)?(tab|\d+)$").expect("valid indent regex"));
        let caps = descriptor
            .captures(s)
            .ok_or_else(|| OptionsError::InvalidIndent(s.to_string()))?;

        let whitespace = match &caps[2] {
            "tab" => "\t".to_string(),
            count => {
                let count: usize = count
                    .parse()
                    .map_err(|_| OptionsError::InvalidIndent(s.to_string()))?;
                " ".repeat(count)
            }
        };

        Ok(if caps.get(1).is_some() {
            IndentDescriptor::Relative(whitespace)
        } else {
            IndentDescriptor::Absolute(whitespace)
        })
    }
}

impl IndentDescriptor {
    /// The indentation expected inside the fragment `slice` whose opening tag
    /// starts at `tag_start`.
    pub(crate) fn expected(&self, source: &str, slice: Span, tag_start: usize) -> String {
        match self {
            IndentDescriptor::Auto => auto_indent(slice.slice(source)).to_string(),
            IndentDescriptor::Absolute(whitespace) => whitespace.clone(),
            IndentDescriptor::Relative(whitespace) => {
                format!("{}{whitespace}", line_indent_before(source, tag_start))
            }
        }
    }
}

/// Whitespace after the first run of line breaks, or nothing.
fn auto_indent(text: &str) -> &str {
    static FIRST_INDENT: OnceLock<Regex> = OnceLock::new();
    FIRST_INDENT
        .get_or_init(|| Regex::new(r"[\n\r]+([ \t]*)").expect("valid auto indent regex"))
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or("", |m| m.as_str())
}

/// Leading whitespace of the line containing `offset`.
fn line_indent_before(source: &str, offset: usize) -> &str {
    let line_start = source[..offset]
        .rfind(['\n', '\r'])
        .map_or(0, |at| at + 1);
    let line = &source[line_start..offset];
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

/// Result of dedenting one fragment.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Dedent {
    /// Ranges to delete, in ascending order, never empty.
    pub removals: Vec<Span>,
    /// Offsets of the first byte of each badly indented line.
    pub bad_lines: Vec<usize>,
}

/// Computes the edits that strip `indent` from every line of `slice`.
///
/// The first non-empty line after a break must be indented by exactly
/// `indent`; later lines only need it as a prefix. Lines failing the check are
/// left alone and reported unless blank. Trailing blanks after the last
/// dedented line are removed, as is leading whitespace before content on the
/// opening line, on both sides of a CDATA delimiter from `markers` that opens
/// it.
pub(crate) fn dedent(source: &str, slice: Span, indent: &str, markers: &[Span]) -> Dedent {
    static LINE: OnceLock<Regex> = OnceLock::new();
    let line_re = LINE
        .get_or_init(|| Regex::new(r"(\r\n|\n|\r)([ \t]*)([^\r\n]*)").expect("valid line regex"));

    let text = slice.slice(source);
    let mut dedent = Dedent::default();
    let at = |offset: usize| slice.start + offset;

    let opening = text.split(['\r', '\n']).next().unwrap_or("");
    let content = opening.trim_start_matches([' ', '\t']);
    if !content.is_empty() {
        let blanks = opening.len() - content.len();
        if blanks > 0 {
            dedent.removals.push(Span::new(at(0), at(blanks)));
        }
        if let Some(marker) = markers.iter().find(|marker| marker.start == at(blanks)) {
            let after = &opening[(marker.end - slice.start).min(opening.len())..];
            let code = after.trim_start_matches([' ', '\t']);
            if !code.is_empty() && code.len() < after.len() {
                dedent
                    .removals
                    .push(Span::new(marker.end, marker.end + after.len() - code.len()));
            }
        }
    }

    let mut last_index = 0;
    let mut had_non_empty = false;
    for caps in line_re.captures_iter(text) {
        let (Some(whole), Some(newline), Some(line_indent), Some(rest)) =
            (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };
        let non_empty = !rest.is_empty();
        let bad = if non_empty && !had_non_empty {
            line_indent.as_str() != indent
        } else {
            !line_indent.as_str().starts_with(indent)
        };

        if !bad {
            let indent_start = newline.end();
            let from = if whole.start() == 0 { 0 } else { indent_start };
            let to = indent_start + indent.len();
            if to > from {
                dedent.removals.push(Span::new(at(from), at(to)));
            }
            last_index = to;
        } else if non_empty {
            dedent.bad_lines.push(at(newline.end()));
        }

        if non_empty {
            had_non_empty = true;
        }
    }

    let tail = &text[last_index..];
    let kept = tail.trim_end_matches([' ', '\t']).len();
    if kept < tail.len() {
        let trim_start = (last_index + kept).max(
            dedent
                .removals
                .last()
                .map_or(0, |removal| removal.end - slice.start),
        );
        if trim_start < text.len() {
            dedent
                .removals
                .push(Span::new(at(trim_start), at(text.len())));
        }
    }

    dedent
}
