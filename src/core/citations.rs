// src/core/citations.rs — Citation resolution and marker insertion
//
// Grounded search responses reference long redirect URLs. Each distinct URL
// gets a short id namespaced by the unit's ordinal so the model can cite
// cheaply; the answer finalizer swaps the ids back for real URLs.

use std::collections::HashMap;

use super::types::{Citation, CitationSegment, Source};
use crate::provider::{GroundedResponse, GroundingChunk};

pub const SHORT_ID_PREFIX: &str = "https://vertexaisearch.cloud.google.com/id/";

/// Distinct URLs of one search call mapped to their short ids.
#[derive(Debug, Clone, Default)]
pub struct ResolvedUrls {
    ids: HashMap<String, String>,
}

impl ResolvedUrls {
    pub fn get(&self, url: &str) -> Option<&str> {
        self.ids.get(url).map(String::as_str)
    }
}

/// Text with markers inserted plus the sources it cites.
#[derive(Debug, Clone, PartialEq)]
pub struct CitedText {
    pub text: String,
    pub sources: Vec<Source>,
}

/// Assign `<prefix><ordinal>-<position>` to each distinct URL, where
/// position counts distinct URLs only. Chunks without a URI are ignored.
pub fn resolve_urls(chunks: &[GroundingChunk], ordinal: usize) -> ResolvedUrls {
    let mut resolved = ResolvedUrls::default();
    for uri in chunks.iter().filter_map(|c| c.uri.as_deref()) {
        if resolved.ids.contains_key(uri) {
            continue;
        }
        let position = resolved.ids.len();
        resolved.ids.insert(
            uri.to_string(),
            format!("{}{}-{}", SHORT_ID_PREFIX, ordinal, position),
        );
    }
    resolved
}

/// Display label for a page title: everything before the last `.`
/// ("example.com" -> "example"). Titles without a `.` are used whole.
pub fn derive_label(title: &str) -> String {
    match title.rsplit_once('.') {
        Some((head, _)) => head.to_string(),
        None => title.to_string(),
    }
}

/// Build one citation per grounding support.
///
/// A support without an end offset, or with `start > end`, is skipped.
/// A missing start offset means the span starts at 0. Chunk references that
/// are out of range, lack a URI or title, or point at an unresolved URL drop
/// only that segment.
pub fn get_citations(response: &GroundedResponse, resolved: &ResolvedUrls) -> Vec<Citation> {
    let mut citations = Vec::with_capacity(response.supports.len());

    for support in &response.supports {
        let Some(end) = support.end_index else {
            tracing::debug!("Skipping grounding support without end offset");
            continue;
        };
        let start = support.start_index.unwrap_or(0);
        if start > end {
            tracing::debug!(start, end, "Skipping inverted grounding support");
            continue;
        }

        let segments = support
            .chunk_indices
            .iter()
            .filter_map(|&idx| resolve_segment(&response.chunks, idx, resolved))
            .collect();

        citations.push(Citation {
            start,
            end,
            segments,
        });
    }

    citations
}

fn resolve_segment(
    chunks: &[GroundingChunk],
    idx: usize,
    resolved: &ResolvedUrls,
) -> Option<CitationSegment> {
    let chunk = chunks.get(idx)?;
    let url = chunk.uri.as_deref()?;
    let title = chunk.title.as_deref()?;
    let short_id = resolved.get(url)?;
    Some(CitationSegment {
        label: derive_label(title),
        short_id: short_id.to_string(),
        url: url.to_string(),
    })
}

/// `" [label](short_id)"` for every segment of the span.
pub fn citation_marker(citation: &Citation) -> String {
    citation
        .segments
        .iter()
        .map(|s| format!(" [{}]({})", s.label, s.short_id))
        .collect()
}

/// Splice each citation's marker into `text` at its `end` offset.
///
/// Spans are applied by `(end, start)` descending. Every insertion happens at
/// or to the right of all spans still pending, so their offsets into the
/// original text stay valid. Offsets are byte offsets; a span ending past the
/// text or inside a UTF-8 sequence is skipped.
pub fn insert_citation_markers(text: &str, citations: &[Citation]) -> String {
    let mut ordered: Vec<&Citation> = citations.iter().collect();
    ordered.sort_by(|a, b| (b.end, b.start).cmp(&(a.end, a.start)));

    let mut out = text.to_string();
    for citation in ordered {
        if citation.end > text.len() || !text.is_char_boundary(citation.end) {
            tracing::debug!(
                end = citation.end,
                len = text.len(),
                "Skipping citation with invalid end offset"
            );
            continue;
        }
        let marker = citation_marker(citation);
        if marker.is_empty() {
            continue;
        }
        out.insert_str(citation.end, &marker);
    }
    out
}

/// Every segment of every citation as a source, deduplicated by URL.
pub fn collect_sources(citations: &[Citation]) -> Vec<Source> {
    let mut sources: Vec<Source> = Vec::new();
    for segment in citations.iter().flat_map(|c| &c.segments) {
        if !sources.iter().any(|s| s.url == segment.url) {
            sources.push(segment.to_source());
        }
    }
    sources
}

/// Full pipeline for one grounded response: shorten URLs, extract
/// citations, insert markers, collect cited sources.
pub fn cite(response: &GroundedResponse, ordinal: usize) -> CitedText {
    let resolved = resolve_urls(&response.chunks, ordinal);
    let citations = get_citations(response, &resolved);
    CitedText {
        text: insert_citation_markers(&response.text, &citations),
        sources: collect_sources(&citations),
    }
}
