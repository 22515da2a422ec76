/*!
# Linting fragments

[`Preprocessor::verify`] runs a [`Linter`] over every fragment of a document
and returns its diagnostics in document coordinates:

1. extract the fragments ([`crate::extract`]),
2. report badly indented lines, if asked to,
3. lint each fragment, sharing top-level scope between fragments unless they
   are modules,
4. remap every diagnostic ([`crate::remap`]) and sort them by position.

The linter is passed in explicitly and only ever sees fragment code.
*/

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostic::{Diagnostic, Severity, sort_diagnostics};
use crate::extract::{ExtractError, ExtractOptions, extract};
use crate::remap::Remapper;
use crate::scope::{ScopeContext, ScopeSummary, shared_contexts};
use crate::transform::TransformError;

/// Something that can check a piece of code.
pub trait Linter {
    /// Checks `code`, reporting positions relative to `code` itself.
    fn lint(&mut self, code: &str, scope: &ScopeContext) -> Vec<Diagnostic>;

    /// Summarises the top-level names of `code`. Only called for classic
    /// scripts, before any [`Linter::lint`] call.
    fn collect(&mut self, _code: &str) -> ScopeSummary {
        ScopeSummary::default()
    }
}

impl<F> Linter for F
where
    F: FnMut(&str, &ScopeContext) -> Vec<Diagnostic>,
{
    fn lint(&mut self, code: &str, scope: &ScopeContext) -> Vec<Diagnostic> {
        self(code, scope)
    }
}

/// How fragments relate to each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Classic scripts sharing one global scope.
    #[default]
    Script,
    /// Modules, each with its own scope.
    Module,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("linter reported an invalid position: {0}")]
    Position(#[from] TransformError),
}

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    pub options: ExtractOptions,
    /// Severity of bad indentation reports; `Off` disables them.
    pub report_bad_indent: Severity,
    pub source_type: SourceType,
}

impl Preprocessor {
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn verify<L>(&self, text: &str, linter: &mut L) -> Result<Vec<Diagnostic>, VerifyError>
    where
        L: Linter + ?Sized,
    {
        let extraction = extract(text, &self.options)?;
        let mut diagnostics = Vec::new();

        if self.report_bad_indent.is_enabled() {
            diagnostics.extend(
                extraction
                    .bad_indentation_lines
                    .iter()
                    .map(|&line| Diagnostic::bad_indentation(line, self.report_bad_indent)),
            );
        }

        let contexts = match self.source_type {
            SourceType::Module => vec![ScopeContext::default(); extraction.fragments.len()],
            SourceType::Script => {
                let summaries: Vec<ScopeSummary> = extraction
                    .fragments
                    .iter()
                    .map(|fragment| linter.collect(fragment.content()))
                    .collect();
                shared_contexts(&summaries)
            }
        };

        let fix_offset = -(extraction.bom_len() as isize);
        for (fragment, context) in extraction.fragments.iter().zip(&contexts) {
            let reported = linter.lint(fragment.content(), context);
            debug!(
                "<{}> at {}: {} diagnostic(s)",
                fragment.tag.name,
                fragment.span.start,
                reported.len()
            );
            let remapper = Remapper::new(&fragment.code).with_fix_offset(fix_offset);
            diagnostics.extend(remapper.remap_all(reported)?);
        }

        sort_diagnostics(&mut diagnostics);
        Ok(diagnostics)
    }
}
