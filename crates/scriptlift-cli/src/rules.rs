//! A tiny built-in linter so the binary is useful on its own.

use scriptlift_engine::scope::ScopeContext;
use scriptlift_engine::transform::LineIndex;
use scriptlift_engine::{Diagnostic, Linter, Severity, Span};

const TAB_WIDTH: usize = 2;

#[derive(Debug, Default)]
pub struct BuiltinRules;

impl BuiltinRules {
    fn check_line(content: &str, line_number: usize, start: usize, out: &mut Vec<Diagnostic>) {
        let indent_len = content.len() - content.trim_start_matches([' ', '\t']).len();
        let indent = &content[..indent_len];
        if let Some(tab) = indent.find('\t') {
            out.push(
                Diagnostic::new("Unexpected tab character.", Severity::Warn)
                    .with_rule("no-tabs")
                    .at(line_number, tab + 1)
                    .with_fix(
                        Span::new(start, start + indent_len),
                        indent.replace('\t', &" ".repeat(TAB_WIDTH)),
                    ),
            );
        }

        let trimmed = content.trim_end_matches([' ', '\t']);
        // Blank lines are all indentation, reported above if at all
        if trimmed.len() < content.len() && !trimmed.is_empty() {
            out.push(
                Diagnostic::new("Trailing spaces not allowed.", Severity::Error)
                    .with_rule("no-trailing-spaces")
                    .at(line_number, trimmed.len() + 1)
                    .ending_at(line_number, content.len() + 1)
                    .with_fix(Span::new(start + trimmed.len(), start + content.len()), ""),
            );
        }
    }
}

impl Linter for BuiltinRules {
    fn lint(&mut self, code: &str, _scope: &ScopeContext) -> Vec<Diagnostic> {
        // Same line breaks as the views the diagnostics are mapped through
        let lines = LineIndex::new(code);
        let mut diagnostics = Vec::new();
        for line_number in 1..=lines.line_count() {
            if let Some(span) = lines.line_span(line_number) {
                Self::check_line(span.slice(code), line_number, span.start, &mut diagnostics);
            }
        }
        diagnostics
    }
}
