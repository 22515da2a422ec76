//! Sharing top-level names between the fragments of one document.
//!
//! Classic scripts on a page share a global scope: a function declared in the
//! first `<script>` can be called from the third, and a variable that only a
//! later script reads is not unused. Each fragment is linted separately, so
//! the linter is told about the other fragments explicitly:
//!
//! 1. every fragment is summarised ([`ScopeSummary`]), then
//! 2. every fragment is linted with a [`ScopeContext`] built from the
//!    summaries of the fragments before and after it.

use std::collections::BTreeSet;

/// The top-level names of one fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSummary {
    /// Names declared at the top level.
    pub declared: BTreeSet<String>,
    /// Names referenced but not declared (unresolved references).
    pub referenced: BTreeSet<String>,
}

/// What a fragment can see of the other fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeContext {
    /// Names declared by earlier fragments; references to them are resolved.
    pub visible_declarations: BTreeSet<String>,
    /// Names later fragments use; declarations of them count as used.
    pub exported_references: BTreeSet<String>,
}

/// Builds the context of each fragment from all fragment summaries, in
/// document order.
pub fn shared_contexts(summaries: &[ScopeSummary]) -> Vec<ScopeContext> {
    (0..summaries.len())
        .map(|i| ScopeContext {
            visible_declarations: summaries[..i]
                .iter()
                .flat_map(|summary| summary.declared.iter().cloned())
                .collect(),
            exported_references: summaries[i + 1..]
                .iter()
                .flat_map(|summary| summary.referenced.iter().cloned())
                .collect(),
        })
        .collect()
}
