//! Recursive text chunking for the text-embedding pipeline.
//!
//! A chunk boundary is chosen inside the size window by preference order:
//! paragraph break, line break, sentence end, word break, hard cut. The next
//! chunk re-starts `overlap` bytes before the previous boundary so context
//! straddling a boundary appears in both chunks. Every cut lands on a UTF-8
//! character boundary.
//!
//! `location` is the byte offset of the chunk start in the source text. It is
//! stable for a given input and serves as part of the export primary key
//! `(filename, location)`.

use serde::{Deserialize, Serialize};

/// Boundary preference, strongest first.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// A contiguous slice of a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Byte offset of the chunk start within the source text.
    pub location: usize,
    pub text: String,
}

/// Split `text` into overlapping chunks of at most `chunk_size` bytes.
///
/// Whitespace-only spans produce no chunk. `overlap` is clamped below
/// `chunk_size` so the walk always advances.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size - 1);

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < text.len() {
        let remaining = text.len() - start;
        let end = if remaining <= chunk_size {
            text.len()
        } else {
            let hard_end = floor_boundary(text, start + chunk_size);
            best_break(&text[start..hard_end])
                .map(|rel| start + rel)
                .unwrap_or(hard_end)
        };

        let piece = &text[start..end];
        if !piece.trim().is_empty() {
            chunks.push(Chunk {
                location: start,
                text: piece.to_string(),
            });
        }

        if end == text.len() {
            break;
        }
        let next = (end.saturating_sub(overlap)).max(start + 1);
        start = ceil_boundary(text, next);
    }

    chunks
}

/// Best break position (exclusive end, relative to the window), or `None`
/// when no separator occurs. The separator stays with the preceding chunk.
fn best_break(window: &str) -> Option<usize> {
    for sep in SEPARATORS {
        if let Some(pos) = window.rfind(sep) {
            if pos > 0 {
                return Some(pos + sep.len());
            }
        }
    }
    None
}

fn floor_boundary(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(s: &str, mut i: usize) -> usize {
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_text("hello world", 100, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].location, 0);
        assert_eq!(chunks[0].text, "hello world");
    }

    #[test]
    fn empty_and_blank_yield_nothing() {
        assert!(split_text("", 100, 10).is_empty());
        assert!(split_text("   \n\n  ", 100, 10).is_empty());
    }

    #[test]
    fn chunks_respect_size_limit() {
        let text = "word ".repeat(200);
        for chunk in split_text(&text, 64, 16) {
            assert!(chunk.text.len() <= 64, "chunk too big: {}", chunk.text.len());
        }
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let text = "abcdefgh ".repeat(50);
        let chunks = split_text(&text, 64, 16);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let prev_end = pair[0].location + pair[0].text.len();
            assert!(pair[1].location < prev_end, "no overlap between chunks");
            assert!(pair[1].location > pair[0].location, "walk must advance");
        }
    }

    #[test]
    fn prefers_paragraph_boundary() {
        let text = format!("{}\n\n{}", "a".repeat(40), "b".repeat(40));
        let chunks = split_text(&text, 60, 0);
        assert_eq!(chunks[0].text, format!("{}\n\n", "a".repeat(40)));
        assert_eq!(chunks[1].location, 42);
    }

    #[test]
    fn locations_are_stable_byte_offsets() {
        let text = "first paragraph here\n\nsecond paragraph follows with more text";
        let a = split_text(text, 30, 5);
        let b = split_text(text, 30, 5);
        assert_eq!(a, b);
        for chunk in &a {
            assert_eq!(&text[chunk.location..chunk.location + chunk.text.len()], chunk.text);
        }
    }

    #[test]
    fn multibyte_input_never_splits_a_char() {
        let text = "héllo wörld ünïcode ".repeat(30);
        let chunks = split_text(&text, 50, 10);
        assert!(!chunks.is_empty());
        // Reconstructing each chunk from its offsets must not panic.
        for chunk in &chunks {
            let _ = &text[chunk.location..chunk.location + chunk.text.len()];
        }
    }
}
