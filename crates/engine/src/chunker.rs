//! Text chunking with configurable size and overlap.
//!
//! Splits a document into overlapping fixed-size chunks along natural text
//! boundaries. A sliding window of `chunk_size` characters steps forward by
//! `chunk_size - chunk_overlap`; each window end is pulled back to the
//! coarsest separator available so chunks break at paragraph, line, sentence,
//! or word boundaries before falling back to a hard cut.
//!
//! Guarantees for fixed input and parameters:
//! - the union of `[char_start, char_end)` ranges covers the full text with
//!   no gaps
//! - consecutive chunks overlap by at most `chunk_overlap` characters
//! - no chunk exceeds `chunk_size`
//! - chunk boundaries and ids are deterministic

use crate::types::{Chunk, Document};

/// Separators tried in priority order when closing a window, coarsest first.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Chunk a document's text into overlapping slices.
///
/// Segments are joined with a blank line to form the document text; each
/// chunk is stamped with the page its start offset falls on. Returned chunk
/// ids are zero-based and local to this batch.
pub fn chunk_document(doc: &Document, chunk_size: usize, chunk_overlap: usize) -> Vec<Chunk> {
    let (text, page_starts) = join_segments(doc);
    let overlap = chunk_overlap.min(chunk_size.saturating_sub(1));

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut position = 0u64;

    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }

        // Pull the cut back to the coarsest separator that still leaves the
        // window advancing past the overlap region.
        if end < text.len() {
            for sep in SEPARATORS {
                if let Some(pos) = text[start..end].rfind(sep) {
                    let candidate = start + pos + sep.len();
                    if candidate > start + overlap {
                        end = candidate;
                        break;
                    }
                }
            }
        }

        chunks.push(Chunk {
            chunk_id: position,
            source_id: doc.source_id.clone(),
            page_number: page_for(&page_starts, start),
            char_start: start,
            char_end: end,
            text: text[start..end].to_string(),
        });
        position += 1;

        if end >= text.len() {
            break;
        }

        // Step forward, sharing `overlap` characters with the previous chunk.
        let mut next = if end > start + overlap {
            end - overlap
        } else {
            end
        };
        while next < text.len() && !text.is_char_boundary(next) {
            next += 1;
        }
        start = next;
    }

    tracing::debug!(
        "Chunked '{}' into {} chunks (size: {}, overlap: {})",
        doc.source_id,
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

/// Join segment texts with a blank line, recording each page's start offset.
fn join_segments(doc: &Document) -> (String, Vec<(usize, u32)>) {
    let mut text = String::new();
    let mut page_starts = Vec::with_capacity(doc.segments.len());

    for segment in &doc.segments {
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        page_starts.push((text.len(), segment.page_number));
        text.push_str(&segment.text);
    }

    (text, page_starts)
}

/// Page containing the given offset.
fn page_for(page_starts: &[(usize, u32)], offset: usize) -> u32 {
    page_starts
        .iter()
        .rev()
        .find(|(start, _)| *start <= offset)
        .map(|(_, page)| *page)
        .unwrap_or(1)
}
