use log::debug;

use super::options::ExtractOptions;
use crate::markup::{MarkupMode, ScanEvent, Scanner, Tag};
use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    /// Markup outside any fragment, including fragment open and close tags.
    Html,
    /// Fragment content.
    Script,
    /// A `<![CDATA[` or `]]>` delimiter inside a fragment.
    CdataMarker,
}

/// A classified byte range of the document. Chunks are contiguous and cover
/// the whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub kind: ChunkKind,
    pub span: Span,
}

/// A qualifying fragment element as found by the scanner.
#[derive(Debug, Clone)]
pub(crate) struct Region {
    pub tag: Tag,
    /// From the end of the open tag to the start of the close tag, or to the
    /// end of the document when the element never closes.
    pub content: Span,
    pub cdata_markers: Vec<Span>,
}

/// What the last disable comment asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DisableState {
    Armed,
    SkipNext,
    Disabled,
}

impl DisableState {
    /// Consumes the state for one qualifying element, returning whether to
    /// extract it.
    fn admit(&mut self) -> bool {
        match self {
            DisableState::Armed => true,
            DisableState::SkipNext => {
                *self = DisableState::Armed;
                false
            }
            DisableState::Disabled => false,
        }
    }
}

fn qualifies(tag: &Tag, options: &ExtractOptions) -> bool {
    if !options.is_fragment_tag(&tag.name) {
        return false;
    }

    match tag.attribute("type") {
        Some(mime) if !mime.is_empty() => {
            if !options.mime.matches(mime) {
                debug!("skipping <{}> with type {mime:?}", tag.name);
                return false;
            }
        }
        _ if options.ignore_tags_without_type => {
            debug!("skipping <{}> without a type", tag.name);
            return false;
        }
        _ => {}
    }

    if tag.attribute("src").is_some_and(|src| !src.is_empty()) {
        debug!("skipping external <{}> at {}", tag.name, tag.span.start);
        return false;
    }

    true
}

struct OpenRegion {
    tag: Tag,
    cdata_markers: Vec<Span>,
}

pub(crate) fn find_regions(source: &str, options: &ExtractOptions) -> Vec<Region> {
    let mut regions = Vec::new();
    let mut disable = DisableState::Armed;
    let mut open: Option<OpenRegion> = None;

    for event in Scanner::new(source, options.scan_options()) {
        match event {
            ScanEvent::OpenTag(tag) => {
                if open.is_some() || !qualifies(&tag, options) {
                    continue;
                }
                if !disable.admit() {
                    debug!("skipping disabled <{}> at {}", tag.name, tag.span.start);
                    continue;
                }
                if options.mode == MarkupMode::Xml && tag.self_closing {
                    continue;
                }
                open = Some(OpenRegion {
                    tag,
                    cdata_markers: Vec::new(),
                });
            }
            ScanEvent::CloseTag { name, span } => {
                if let Some(current) = open.take_if(|current| current.tag.name == name) {
                    regions.push(Region {
                        content: Span::new(current.tag.span.end, span.start),
                        tag: current.tag,
                        cdata_markers: current.cdata_markers,
                    });
                }
            }
            ScanEvent::CdataStart(span) | ScanEvent::CdataEnd(span) => {
                if let Some(current) = open.as_mut() {
                    current.cdata_markers.push(span);
                }
            }
            ScanEvent::Comment { body, .. } if open.is_none() => {
                let text = body.slice(source).trim();
                if text == options.markers.disable {
                    disable = DisableState::Disabled;
                } else if text == options.markers.enable {
                    disable = DisableState::Armed;
                } else if text == options.markers.disable_next {
                    disable = DisableState::SkipNext;
                }
            }
            _ => {}
        }
    }

    if let Some(current) = open {
        regions.push(Region {
            content: Span::new(current.tag.span.end, source.len()),
            tag: current.tag,
            cdata_markers: current.cdata_markers,
        });
    }

    regions
}

/// Partitions the document into chunks around `regions`.
pub(crate) fn chunk(len: usize, regions: &[Region]) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut pos = 0;
    let mut push = |kind, start: usize, end: usize| {
        chunks.push(Chunk {
            kind,
            span: Span::new(start, end),
        })
    };

    for region in regions {
        if region.content.start > pos {
            push(ChunkKind::Html, pos, region.content.start);
        }

        let mut cursor = region.content.start;
        let mut had_script = false;
        for marker in &region.cdata_markers {
            if marker.start > cursor {
                push(ChunkKind::Script, cursor, marker.start);
                had_script = true;
            }
            push(ChunkKind::CdataMarker, marker.start, marker.end);
            cursor = marker.end;
        }
        if cursor < region.content.end || !had_script {
            push(ChunkKind::Script, cursor, region.content.end);
        }

        pos = region.content.end;
    }

    if pos < len {
        push(ChunkKind::Html, pos, len);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn contents(source: &str, options: &ExtractOptions) -> Vec<String> {
        find_regions(source, options)
            .iter()
            .map(|region| region.content.slice(source).to_string())
            .collect()
    }

    fn kinds(source: &str, options: &ExtractOptions) -> Vec<(ChunkKind, String)> {
        let regions = find_regions(source, options);
        chunk(source.len(), &regions)
            .into_iter()
            .map(|chunk| (chunk.kind, chunk.span.slice(source).to_string()))
            .collect()
    }

    #[test]
    fn chunks_cover_the_document() {
        let source = "<p>a</p><script>x</script><i>b</i>";
        assert_eq!(
            kinds(source, &ExtractOptions::html()),
            vec![
                (ChunkKind::Html, "<p>a</p><script>".to_string()),
                (ChunkKind::Script, "x".to_string()),
                (ChunkKind::Html, "</script><i>b</i>".to_string()),
            ]
        );
    }

    #[test]
    fn empty_fragment_has_an_empty_script_chunk() {
        assert_eq!(
            kinds("<script></script>", &ExtractOptions::html()),
            vec![
                (ChunkKind::Html, "<script>".to_string()),
                (ChunkKind::Script, String::new()),
                (ChunkKind::Html, "</script>".to_string()),
            ]
        );
    }

    #[test]
    fn cdata_markers_are_split_out() {
        assert_eq!(
            kinds("<script><![CDATA[a]]></script>", &ExtractOptions::xml()),
            vec![
                (ChunkKind::Html, "<script>".to_string()),
                (ChunkKind::CdataMarker, "<![CDATA[".to_string()),
                (ChunkKind::Script, "a".to_string()),
                (ChunkKind::CdataMarker, "]]>".to_string()),
                (ChunkKind::Html, "</script>".to_string()),
            ]
        );
    }

    #[test]
    fn unterminated_fragment_runs_to_end() {
        assert_eq!(
            contents("<p><script>a;\nb;", &ExtractOptions::html()),
            vec!["a;\nb;"]
        );
    }

    #[test]
    fn close_tag_must_match_the_fragment() {
        let options = ExtractOptions {
            fragment_tags: vec!["script".to_string(), "template".to_string()],
            ..ExtractOptions::xml()
        };
        assert_eq!(
            contents("<script>a</template>b</script>", &options),
            vec!["a</template>b"]
        );
    }

    #[test]
    fn disable_state_last_marker_wins() {
        let source = "<!-- eslint-disable --><!-- eslint-disable-next-script -->\
            <script>1</script><script>2</script>";
        assert_eq!(contents(source, &ExtractOptions::html()), vec!["2"]);

        let source = "<!-- eslint-disable-next-script --><!-- eslint-enable -->\
            <script>1</script>";
        assert_eq!(contents(source, &ExtractOptions::html()), vec!["1"]);
    }

    #[test]
    fn disabled_without_enable_skips_the_rest() {
        let source = "<script>1</script><!--eslint-disable--><script>2</script><script>3</script>";
        assert_eq!(contents(source, &ExtractOptions::html()), vec!["1"]);
    }

    #[test]
    fn other_comments_are_ignored() {
        let source = "<!-- eslint-disable-line --><script>1</script>";
        assert_eq!(contents(source, &ExtractOptions::html()), vec!["1"]);
    }

    #[test]
    fn empty_type_and_src_count_as_missing() {
        let source = r#"<script type="" src="">a</script>"#;
        assert_eq!(contents(source, &ExtractOptions::html()), vec!["a"]);

        let options = ExtractOptions {
            ignore_tags_without_type: true,
            ..ExtractOptions::html()
        };
        assert!(contents(source, &options).is_empty());
    }

    #[test]
    fn skipped_elements_are_html() {
        let source = r#"<script type="text/template"><b></b></script>"#;
        assert_eq!(
            kinds(source, &ExtractOptions::html()),
            vec![(ChunkKind::Html, source.to_string())]
        );
    }
}
