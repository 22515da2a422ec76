//! Translating diagnostics from a transformed view back to the document.

use log::debug;

use crate::diagnostic::{Diagnostic, Fix};
use crate::span::Span;
use crate::transform::{TransformError, TransformableString};

/// Maps diagnostics reported against `view` into original coordinates.
pub struct Remapper<'a> {
    view: &'a TransformableString,
    fix_offset: isize,
}

impl<'a> Remapper<'a> {
    pub fn new(view: &'a TransformableString) -> Self {
        Self {
            view,
            fix_offset: 0,
        }
    }

    /// Shift applied to both ends of every mapped fix range, e.g. minus the
    /// length of a byte order mark the consumer never sees.
    pub fn with_fix_offset(mut self, fix_offset: isize) -> Self {
        self.fix_offset = fix_offset;
        self
    }

    /// Remaps one diagnostic. Returns `Ok(None)` if it points into text that
    /// does not exist in the original, such as a placeholder.
    pub fn remap(&self, mut diagnostic: Diagnostic) -> Result<Option<Diagnostic>, TransformError> {
        if diagnostic.is_file_level() {
            return Ok(Some(diagnostic));
        }
        let Some(location) = diagnostic.location else {
            return Ok(Some(diagnostic));
        };

        let Some(original) = self.view.original_location(location)? else {
            debug!(
                "dropping {:?} at {location}: not in the original",
                diagnostic.rule_id
            );
            return Ok(None);
        };
        diagnostic.location = Some(original);
        diagnostic.source = Some(self.view.original_line(original.line)?.to_string());

        if let Some(fix) = diagnostic.fix.take() {
            diagnostic.fix = self.remap_fix(fix)?;
        }

        if let Some(end) = diagnostic.end {
            diagnostic.end = self.view.original_location(end)?;
        }

        Ok(Some(diagnostic))
    }

    pub fn remap_all(&self, diagnostics: Vec<Diagnostic>) -> Result<Vec<Diagnostic>, TransformError> {
        let mut remapped = Vec::with_capacity(diagnostics.len());
        for diagnostic in diagnostics {
            if let Some(diagnostic) = self.remap(diagnostic)? {
                remapped.push(diagnostic);
            }
        }
        Ok(remapped)
    }

    fn remap_fix(&self, fix: Fix) -> Result<Option<Fix>, TransformError> {
        let Span { start, end } = fix.range;
        let Some(mapped_start) = self.view.original_index(start)? else {
            debug!("dropping fix at {start}: not in the original");
            return Ok(None);
        };
        // The end is exclusive, so map the last replaced byte instead
        let mapped_end = if end > start {
            match self.view.original_index(end - 1)? {
                Some(last) => last + 1,
                None => {
                    debug!("dropping fix ending at {end}: not in the original");
                    return Ok(None);
                }
            }
        } else {
            mapped_start
        };

        let shifted = mapped_start
            .checked_add_signed(self.fix_offset)
            .zip(mapped_end.checked_add_signed(self.fix_offset));
        Ok(shifted.map(|(start, end)| Fix {
            range: Span::new(start, end),
            text: fix.text,
        }))
    }
}
