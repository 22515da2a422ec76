use log::debug;
use scriptlift_engine::diagnostic::InvalidSeverity;
use scriptlift_engine::extract::OptionsError;
use scriptlift_engine::{
    ExtractOptions, IndentDescriptor, MarkupMode, MimePredicate, Preprocessor, Severity,
    SourceType,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_HTML_EXTENSIONS: &[&str] = &[
    ".erb",
    ".handlebars",
    ".hbs",
    ".htm",
    ".html",
    ".mustache",
    ".nunjucks",
    ".php",
    ".tag",
    ".twig",
    ".vue",
    ".we",
];

const DEFAULT_XML_EXTENSIONS: &[&str] = &[".xhtml", ".xml"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for html.report-bad-indent: {0}")]
    InvalidSeverity(#[from] InvalidSeverity),

    #[error("Invalid html settings: {0}")]
    InvalidOption(#[from] OptionsError),
}

/// `report-bad-indent` as written: a flag, a level or a name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawSeverity {
    Flag(bool),
    Level(u64),
    Name(String),
}

/// `indent` as written: a width or a descriptor string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawIndent {
    Width(u64),
    Descriptor(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(entry) => vec![entry],
            OneOrMany::Many(entries) => entries,
        }
    }
}

/// The `[html]` table exactly as found in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawSettings {
    pub indent: Option<RawIndent>,
    pub report_bad_indent: Option<RawSeverity>,
    pub javascript_mime_types: Option<OneOrMany>,
    pub javascript_tag_names: Option<Vec<String>>,
    pub ignore_tags_without_type: Option<bool>,
    pub html_extensions: Option<Vec<String>>,
    pub xml_extensions: Option<Vec<String>>,
    pub source_type: Option<SourceType>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    html: RawSettings,
}

/// Validated settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub indent: IndentDescriptor,
    pub report_bad_indent: Severity,
    pub mime: MimePredicate,
    pub tag_names: Vec<String>,
    pub ignore_tags_without_type: bool,
    pub html_extensions: Vec<String>,
    pub xml_extensions: Vec<String>,
    pub source_type: SourceType,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            indent: IndentDescriptor::Auto,
            report_bad_indent: Severity::Off,
            mime: MimePredicate::default(),
            tag_names: vec!["script".to_string()],
            ignore_tags_without_type: false,
            html_extensions: filter_out(DEFAULT_HTML_EXTENSIONS, None),
            xml_extensions: filter_out(DEFAULT_XML_EXTENSIONS, None),
            source_type: SourceType::default(),
        }
    }
}

fn filter_out(defaults: &[&str], exclude: Option<&[String]>) -> Vec<String> {
    defaults
        .iter()
        .filter(|ext| exclude.is_none_or(|exclude| !exclude.iter().any(|e| e == *ext)))
        .map(|ext| ext.to_string())
        .collect()
}

/// Extensions always compare with a leading dot.
fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

impl Settings {
    pub fn from_raw(raw: RawSettings) -> Result<Self, ConfigError> {
        let report_bad_indent = match raw.report_bad_indent {
            None | Some(RawSeverity::Flag(false)) => Severity::Off,
            Some(RawSeverity::Flag(true)) => Severity::Warn,
            Some(RawSeverity::Level(level)) => Severity::from_level(level)?,
            Some(RawSeverity::Name(name)) => name.parse()?,
        };

        let indent = match raw.indent {
            None => IndentDescriptor::Auto,
            Some(RawIndent::Width(width)) => width.to_string().parse()?,
            Some(RawIndent::Descriptor(descriptor)) => descriptor.parse()?,
        };

        let mime = match raw.javascript_mime_types {
            None => MimePredicate::default(),
            Some(entries) => MimePredicate::from_entries(entries.into_vec())?,
        };

        let html_given = raw
            .html_extensions
            .map(|exts| exts.iter().map(|ext| normalize_extension(ext)).collect::<Vec<_>>());
        let xml_given = raw
            .xml_extensions
            .map(|exts| exts.iter().map(|ext| normalize_extension(ext)).collect::<Vec<_>>());
        let html_extensions = html_given
            .clone()
            .unwrap_or_else(|| filter_out(DEFAULT_HTML_EXTENSIONS, xml_given.as_deref()));
        let xml_extensions = xml_given
            .unwrap_or_else(|| filter_out(DEFAULT_XML_EXTENSIONS, html_given.as_deref()));

        Ok(Self {
            indent,
            report_bad_indent,
            mime,
            tag_names: raw
                .javascript_tag_names
                .unwrap_or_else(|| vec!["script".to_string()]),
            ignore_tags_without_type: raw.ignore_tags_without_type.unwrap_or(false),
            html_extensions,
            xml_extensions,
            source_type: raw.source_type.unwrap_or_default(),
        })
    }

    /// How to read `path`, or `None` if it is neither HTML nor XML. HTML wins
    /// when both extension lists match.
    pub fn file_mode<P: AsRef<Path>>(&self, path: P) -> Option<MarkupMode> {
        let name = path.as_ref().file_name()?.to_string_lossy();
        if name.is_empty() {
            return None;
        }
        let matches = |extensions: &[String]| extensions.iter().any(|ext| name.ends_with(ext.as_str()));
        if matches(&self.html_extensions) {
            Some(MarkupMode::Html)
        } else if matches(&self.xml_extensions) {
            Some(MarkupMode::Xml)
        } else {
            None
        }
    }

    pub fn extract_options(&self, mode: MarkupMode) -> ExtractOptions {
        ExtractOptions {
            indent: self.indent.clone(),
            fragment_tags: self.tag_names.clone(),
            mime: self.mime.clone(),
            ignore_tags_without_type: self.ignore_tags_without_type,
            ..ExtractOptions::for_mode(mode)
        }
    }

    pub fn preprocessor(&self, mode: MarkupMode) -> Preprocessor {
        Preprocessor {
            options: self.extract_options(mode),
            report_bad_indent: self.report_bad_indent,
            source_type: self.source_type,
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            debug!("no config file at {}", config_path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let file: ConfigFile =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        Self::from_raw(file.html).map(Some)
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/scriptlift");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }
}
