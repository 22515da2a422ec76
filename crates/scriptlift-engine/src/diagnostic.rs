use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::span::Span;
use crate::transform::Location;

/// Rule id used for diagnostics produced by the extractor itself.
pub const EXTRACTOR_RULE_ID: &str = "(html plugin)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Off,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid severity {0:?}, expected one of 0, 1, 2, \"off\", \"warn\" or \"error\"")]
pub struct InvalidSeverity(pub String);

impl Severity {
    pub fn from_level(level: u64) -> Result<Self, InvalidSeverity> {
        match level {
            0 => Ok(Severity::Off),
            1 => Ok(Severity::Warn),
            2 => Ok(Severity::Error),
            other => Err(InvalidSeverity(other.to_string())),
        }
    }

    pub fn is_enabled(self) -> bool {
        self != Severity::Off
    }
}

impl FromStr for Severity {
    type Err = InvalidSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" | "0" => Ok(Severity::Off),
            "warn" | "1" => Ok(Severity::Warn),
            "error" | "2" => Ok(Severity::Error),
            other => Err(InvalidSeverity(other.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Off => "off",
            Severity::Warn => "warning",
            Severity::Error => "error",
        })
    }
}

/// A text edit that resolves a diagnostic. `range` is a byte range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    pub range: Span,
    pub text: String,
}

/// A message reported against some code.
///
/// `location` is `None` for messages about the file as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule_id: Option<String>,
    pub message: String,
    pub severity: Severity,
    pub location: Option<Location>,
    pub end: Option<Location>,
    pub fix: Option<Fix>,
    /// The original source line the diagnostic points at, filled in by
    /// remapping.
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            rule_id: None,
            message: message.into(),
            severity,
            location: None,
            end: None,
            fix: None,
            source: None,
        }
    }

    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.location = Some(Location::new(line, column));
        self
    }

    pub fn ending_at(mut self, line: usize, column: usize) -> Self {
        self.end = Some(Location::new(line, column));
        self
    }

    pub fn with_fix(mut self, range: Span, text: impl Into<String>) -> Self {
        self.fix = Some(Fix {
            range,
            text: text.into(),
        });
        self
    }

    /// Reported for a fragment line whose indentation does not match.
    pub fn bad_indentation(line: usize, severity: Severity) -> Self {
        Self::new("Bad line indentation.", severity)
            .with_rule(EXTRACTOR_RULE_ID)
            .at(line, 1)
    }

    /// Whether the diagnostic applies to the file rather than a position.
    /// A zero line or column also marks a file-level message.
    pub fn is_file_level(&self) -> bool {
        self.location
            .is_none_or(|location| location.line == 0 || location.column == 0)
    }
}

/// Orders diagnostics by line then column, file-level messages first. Ties
/// keep their relative order.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by_key(|diagnostic| {
        diagnostic
            .location
            .filter(|_| !diagnostic.is_file_level())
            .map(|location| (location.line, location.column))
    });
}
