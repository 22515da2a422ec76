/*!
# Fragment extraction

[`extract`] finds the script fragments of a markup document and builds
[`TransformableString`] views over it:

- one view per [`Fragment`], where everything outside the fragment is
  deleted, CDATA delimiters are dropped and the code is dedented, and
- one combined [`Extraction::document`] view, where every markup chunk is
  replaced by a single-line `/* html#N */` placeholder and every fragment is
  dedented in place.

All views share the original document, so any position a consumer reports
against a view maps back to the document with
[`TransformableString::original_location`].

## Pipeline

1. Scan the document ([`crate::markup::Scanner`]) and pick out qualifying
   fragment elements: the name is a fragment tag, the `type` (if any) is a
   script MIME type, there is no `src`, and no disable comment applies.
2. Partition the document into [`Chunk`]s.
3. Work out the expected indentation of each fragment and the edits that
   remove it, collecting badly indented lines.
4. Apply the edits to the views.
*/

mod chunk;
mod indent;
mod options;

pub use chunk::{Chunk, ChunkKind};
pub use indent::IndentDescriptor;
pub use options::{DisableMarkers, ExtractOptions, MimeMatcher, MimePredicate, OptionsError};

use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::markup::Tag;
use crate::span::Span;
use crate::transform::{OriginalText, TransformError, TransformableString};

const BOM: char = '\u{FEFF}';

#[derive(Debug, Error)]
pub enum ExtractError {
    /// Two computed edits overlapped. This is a bug in the extractor, never a
    /// property of the input.
    #[error("internal extraction error: {0}")]
    Internal(#[from] TransformError),
}

/// One extracted script fragment.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// The element's open tag.
    pub tag: Tag,
    /// Raw content span in the document, CDATA delimiters included.
    pub span: Span,
    /// The dedented fragment code.
    pub code: TransformableString,
}

impl Fragment {
    pub fn content(&self) -> &str {
        self.code.as_str()
    }
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub fragments: Vec<Fragment>,
    pub chunks: Vec<Chunk>,
    /// The whole document with markup replaced by placeholders.
    pub document: TransformableString,
    /// 1-based document lines whose indentation did not match, ascending.
    pub bad_indentation_lines: Vec<usize>,
    /// Whether the document starts with a byte order mark.
    pub has_bom: bool,
}

impl Extraction {
    /// Byte length of the leading byte order mark, if any.
    pub fn bom_len(&self) -> usize {
        if self.has_bom { BOM.len_utf8() } else { 0 }
    }

    pub fn original(&self) -> &str {
        self.document.original()
    }
}

/// Placeholder text standing in for the markup chunk at `index`.
pub fn placeholder(index: usize) -> String {
    format!("/* html#{index} */")
}

pub fn extract(source: &str, options: &ExtractOptions) -> Result<Extraction, ExtractError> {
    let original = Arc::new(OriginalText::new(source));
    let regions = chunk::find_regions(source, options);
    let chunks = chunk::chunk(source.len(), &regions);
    debug!(
        "found {} fragment(s) in {} chunk(s)",
        regions.len(),
        chunks.len()
    );

    let lines = original.lines();
    let mut fragments = Vec::with_capacity(regions.len());
    let mut bad_indentation_lines = Vec::new();
    let mut document_edits: Vec<(Span, String)> = chunks
        .iter()
        .enumerate()
        .filter(|(_, chunk)| chunk.kind != ChunkKind::Script)
        .map(|(index, chunk)| (chunk.span, placeholder(index)))
        .collect();

    for region in regions {
        // A closing CDATA delimiter at the very end is not part of the code
        let mut slice = region.content;
        if let Some(last) = region.cdata_markers.last()
            && last.end == region.content.end
        {
            slice.end = last.start;
        }

        let expected = options.indent.expected(source, slice, region.tag.span.start);
        let dedent = indent::dedent(source, slice, &expected, &region.cdata_markers);
        bad_indentation_lines.extend(
            dedent
                .bad_lines
                .iter()
                .map(|&offset| lines.location_of(offset).line),
        );

        let mut code = TransformableString::from_shared(Arc::clone(&original));
        code.remove(0, region.content.start)?;
        code.remove(region.content.end, source.len())?;
        for marker in &region.cdata_markers {
            code.remove(marker.start, marker.end)?;
        }
        for removal in &dedent.removals {
            code.remove(removal.start, removal.end)?;
        }

        document_edits.extend(dedent.removals.iter().map(|&span| (span, String::new())));
        fragments.push(Fragment {
            tag: region.tag,
            span: region.content,
            code,
        });
    }

    document_edits.sort_by_key(|(span, _)| (span.start, span.end));
    let mut document = TransformableString::from_shared(original);
    for (span, text) in document_edits {
        document.replace(span.start, span.end, text)?;
    }

    Ok(Extraction {
        fragments,
        chunks,
        document,
        bad_indentation_lines,
        has_bom: source.starts_with(BOM),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Location;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn contents(extraction: &Extraction) -> Vec<&str> {
        extraction
            .fragments
            .iter()
            .map(Fragment::content)
            .collect()
    }

    #[test]
    fn dedents_opening_line_and_maps_back() {
        let source = "<p>text</p><script>  a;\nb;</script>";
        let extraction = extract(source, &ExtractOptions::html()).unwrap();
        assert_eq!(contents(&extraction), vec!["a;\nb;"]);
        assert!(extraction.bad_indentation_lines.is_empty());

        let code = &extraction.fragments[0].code;
        let mapped = code.original_location(Location::new(2, 1)).unwrap();
        let b = source.find("b;").unwrap();
        assert_eq!(mapped, Some(Location::new(2, 1)));
        assert_eq!(code.original_index(3).unwrap(), Some(b));
    }

    #[test]
    fn combined_document_uses_placeholders() {
        let source = "<p>text</p><script>  a; b;</script><i>x</i>";
        let extraction = extract(source, &ExtractOptions::html()).unwrap();
        assert_snapshot!(
            extraction.document.as_str(),
            @"/* html#0 */a; b;/* html#2 */"
        );
    }

    #[test]
    fn combined_document_with_two_fragments() {
        let source = "<script>a</script> <script>b</script>";
        let extraction = extract(source, &ExtractOptions::html()).unwrap();
        assert_snapshot!(
            extraction.document.as_str(),
            @"/* html#0 */a/* html#2 */b/* html#4 */"
        );
    }

    #[test]
    fn document_positions_map_back() {
        let source = "<div>\n  <script>\n    let x = 1;\n  </script>\n</div>";
        let extraction = extract(source, &ExtractOptions::html()).unwrap();
        let document = &extraction.document;
        let x = document.as_str().find("x =").unwrap();
        assert_eq!(document.original_index(x).unwrap(), source.find("x ="));
    }

    #[test]
    fn document_end_maps_to_source_end() {
        let source = "<script>a</script>";
        let extraction = extract(source, &ExtractOptions::html()).unwrap();
        let document = &extraction.document;
        assert_eq!(document.as_str(), "/* html#0 */a/* html#2 */");
        assert_eq!(
            document.original_index(document.len()).unwrap(),
            Some(source.len())
        );
    }

    #[test]
    fn cdata_fragment_keeps_its_inner_breaks() {
        let source = "<script><![CDATA[\na;\n]]></script>";
        let extraction = extract(source, &ExtractOptions::xml()).unwrap();
        assert_eq!(contents(&extraction), vec!["\na;\n"]);
        let kinds: Vec<ChunkKind> = extraction.chunks.iter().map(|chunk| chunk.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChunkKind::Html,
                ChunkKind::CdataMarker,
                ChunkKind::Script,
                ChunkKind::CdataMarker,
                ChunkKind::Html,
            ]
        );
    }

    #[test]
    fn detects_bom() {
        let extraction = extract("\u{FEFF}<script>a</script>", &ExtractOptions::html()).unwrap();
        assert!(extraction.has_bom);
        assert_eq!(extraction.bom_len(), 3);
        assert_eq!(contents(&extraction), vec!["a"]);

        let extraction = extract("<script>a</script>", &ExtractOptions::html()).unwrap();
        assert!(!extraction.has_bom);
        assert_eq!(extraction.bom_len(), 0);
    }

    #[test]
    fn empty_input() {
        let extraction = extract("", &ExtractOptions::html()).unwrap();
        assert!(extraction.fragments.is_empty());
        assert!(extraction.chunks.is_empty());
        assert_eq!(extraction.document.as_str(), "");
    }

    #[test]
    fn fragment_keeps_its_open_tag() {
        let source = r#"<script type="text/babel" async>a</script>"#;
        let extraction = extract(source, &ExtractOptions::html()).unwrap();
        let fragment = &extraction.fragments[0];
        assert_eq!(fragment.tag.attribute("type"), Some("text/babel"));
        assert_eq!(fragment.span.slice(source), "a");
    }
}
