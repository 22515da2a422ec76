use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use thiserror::Error;

use super::indent::IndentDescriptor;
use crate::markup::{MarkupMode, ScanOptions};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptionsError {
    #[error("invalid indent descriptor {0:?}, expected \"auto\", N, +N, \"tab\" or \"+tab\"")]
    InvalidIndent(String),

    #[error("invalid MIME type pattern {0:?}, expected /pattern/flags")]
    InvalidMimePattern(String),

    #[error("invalid MIME type regex {pattern:?}: {source}")]
    MimeRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

fn default_mime_regex() -> &'static Regex {
    static DEFAULT: OnceLock<Regex> = OnceLock::new();
    DEFAULT.get_or_init(|| {
        Regex::new(r"(?i)^(application|text)/(x-)?(javascript|babel|ecmascript-6)$")
            .expect("valid default MIME regex")
    })
}

/// One way of accepting a `type` attribute value.
#[derive(Clone)]
pub enum MimeMatcher {
    Exact(String),
    Pattern(Regex),
    Custom(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl MimeMatcher {
    pub fn matches(&self, mime: &str) -> bool {
        match self {
            MimeMatcher::Exact(expected) => expected == mime,
            MimeMatcher::Pattern(regex) => regex.is_match(mime),
            MimeMatcher::Custom(predicate) => predicate(mime),
        }
    }

    /// Parses a configured entry. Entries written `/pattern/flags` become
    /// regexes (flags `i`, `m` and `s` apply; `g` and `u` are accepted and
    /// ignored), anything else must match exactly.
    pub fn parse(entry: &str) -> Result<Self, OptionsError> {
        let Some(literal) = entry.strip_prefix('/') else {
            return Ok(MimeMatcher::Exact(entry.to_string()));
        };
        let close = literal
            .rfind('/')
            .ok_or_else(|| OptionsError::InvalidMimePattern(entry.to_string()))?;
        let (body, flags) = (&literal[..close], &literal[close + 1..]);

        let mut inline = String::new();
        for flag in flags.chars() {
            match flag {
                'i' | 'm' | 's' => inline.push(flag),
                'g' | 'u' => {}
                _ => return Err(OptionsError::InvalidMimePattern(entry.to_string())),
            }
        }

        let body = body.replace("\\/", "/");
        let pattern = if inline.is_empty() {
            body
        } else {
            format!("(?{inline}){body}")
        };
        Regex::new(&pattern)
            .map(MimeMatcher::Pattern)
            .map_err(|source| OptionsError::MimeRegex {
                pattern: entry.to_string(),
                source,
            })
    }
}

impl fmt::Debug for MimeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MimeMatcher::Exact(expected) => f.debug_tuple("Exact").field(expected).finish(),
            MimeMatcher::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            MimeMatcher::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Decides which `type` attribute values mark a script element.
#[derive(Debug, Clone)]
pub struct MimePredicate {
    matchers: Vec<MimeMatcher>,
}

impl Default for MimePredicate {
    /// JavaScript, Babel and ES6 types under `application/` and `text/`,
    /// optionally `x-` prefixed, case-insensitively.
    fn default() -> Self {
        Self {
            matchers: vec![MimeMatcher::Pattern(default_mime_regex().clone())],
        }
    }
}

impl MimePredicate {
    pub fn new(matchers: Vec<MimeMatcher>) -> Self {
        Self { matchers }
    }

    pub fn from_entries<I, S>(entries: I) -> Result<Self, OptionsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matchers = entries
            .into_iter()
            .map(|entry| MimeMatcher::parse(entry.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { matchers })
    }

    pub fn from_fn(predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            matchers: vec![MimeMatcher::Custom(Arc::new(predicate))],
        }
    }

    pub fn matches(&self, mime: &str) -> bool {
        self.matchers.iter().any(|matcher| matcher.matches(mime))
    }
}

/// Comment texts that switch extraction off and on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisableMarkers {
    /// Ignore every fragment until `enable`.
    pub disable: String,
    pub enable: String,
    /// Ignore only the next qualifying fragment.
    pub disable_next: String,
}

impl Default for DisableMarkers {
    fn default() -> Self {
        Self {
            disable: "eslint-disable".to_string(),
            enable: "eslint-enable".to_string(),
            disable_next: "eslint-disable-next-script".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub indent: IndentDescriptor,
    pub mode: MarkupMode,
    /// Recognise `<![CDATA[ ... ]]>` sections.
    pub cdata: bool,
    /// Element names whose content is a fragment.
    pub fragment_tags: Vec<String>,
    pub mime: MimePredicate,
    /// Skip fragment elements with a missing or empty `type`.
    pub ignore_tags_without_type: bool,
    pub markers: DisableMarkers,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::html()
    }
}

impl ExtractOptions {
    pub fn html() -> Self {
        Self {
            indent: IndentDescriptor::Auto,
            mode: MarkupMode::Html,
            cdata: false,
            fragment_tags: vec!["script".to_string()],
            mime: MimePredicate::default(),
            ignore_tags_without_type: false,
            markers: DisableMarkers::default(),
        }
    }

    pub fn xml() -> Self {
        Self {
            mode: MarkupMode::Xml,
            cdata: true,
            ..Self::html()
        }
    }

    pub fn for_mode(mode: MarkupMode) -> Self {
        match mode {
            MarkupMode::Html => Self::html(),
            MarkupMode::Xml => Self::xml(),
        }
    }

    /// Whether `name`, as reported by the scanner, is a fragment element.
    pub fn is_fragment_tag(&self, name: &str) -> bool {
        match self.mode {
            MarkupMode::Html => self
                .fragment_tags
                .iter()
                .any(|tag| tag.eq_ignore_ascii_case(name)),
            MarkupMode::Xml => self.fragment_tags.iter().any(|tag| tag == name),
        }
    }

    pub(crate) fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            mode: self.mode,
            cdata: self.cdata,
            raw_text_tags: self
                .fragment_tags
                .iter()
                .map(|tag| tag.to_ascii_lowercase())
                .collect(),
        }
    }
}
