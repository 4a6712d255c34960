//! Separator-boundary text splitter.
//!
//! Splits a story's full text into chunks of at most `max_chars` characters.
//! For each chunk the splitter looks at a window of `max_chars` characters
//! and splits after the last occurrence of the earliest-listed separator
//! found in the window (paragraph breaks before sentence punctuation), with
//! the separator kept at the end of the chunk. When no separator occurs in
//! the window it hard-cuts at `max_chars` and starts the next chunk
//! `overlap_chars` characters before the cut, so neighbouring hard-cut
//! chunks share an exact overlap.
//!
//! Chunks are exact substrings of the input; whitespace-only pieces are
//! dropped. All arithmetic is in characters, never bytes, so multi-byte
//! text cannot be cut inside a code point.

use crate::config::ChunkingConfig;

/// Split text into bounded-length chunks. Returns the chunk contents in
/// story order.
pub fn split_text(text: &str, cfg: &ChunkingConfig) -> Vec<String> {
    // Byte offset of every char boundary, plus the end of the text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let n_chars = boundaries.len() - 1;

    let max = cfg.max_chars.max(1);
    let overlap = cfg.overlap_chars.min(max.saturating_sub(1));

    let mut chunks = Vec::new();
    let mut start = 0usize; // char index

    while start < n_chars {
        let remaining = n_chars - start;

        if remaining <= max {
            push_piece(&mut chunks, &text[boundaries[start]..]);
            break;
        }

        let window = &text[boundaries[start]..boundaries[start + max]];

        match find_split(window, &cfg.separators) {
            Some(split_end) => {
                let piece = &window[..split_end];
                push_piece(&mut chunks, piece);
                start += piece.chars().count();
            }
            None => {
                push_piece(&mut chunks, window);
                start += max - overlap;
            }
        }
    }

    chunks
}

/// Byte offset just past the last occurrence of the highest-priority
/// separator present in the window, or `None` when no separator occurs.
fn find_split(window: &str, separators: &[String]) -> Option<usize> {
    for sep in separators {
        if sep.is_empty() {
            continue;
        }
        if let Some(pos) = window.rfind(sep.as_str()) {
            return Some(pos + sep.len());
        }
    }
    None
}

fn push_piece(chunks: &mut Vec<String>, piece: &str) {
    if !piece.trim().is_empty() {
        chunks.push(piece.to_string());
    }
}
