//! Reference text chunking.
//!
//! Reference files are split before ingestion so that each stored row stays
//! within the embedding model's input limit. [`RecursiveChunker`] splits on
//! paragraph, line, sentence and finally word boundaries, and carries up to
//! `chunk_overlap` characters of trailing segments into the next chunk.
//!
//! Sizes are measured in characters.

/// A strategy for splitting reference text into chunks.
pub trait Chunker: Send + Sync {
    /// Split text into chunks. Returns an empty `Vec` for blank text.
    fn chunk(&self, text: &str) -> Vec<String>;
}

const SEPARATORS: [&str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

/// Splits text hierarchically: paragraphs → lines → sentences → words.
///
/// Segments are merged greedily up to `chunk_size`. When a chunk is emitted,
/// its trailing segments totalling at most `chunk_overlap` characters start the
/// next chunk. A single segment larger than `chunk_size` is split with the next
/// separator, and a word larger than `chunk_size` is cut by character count.
///
/// # Example
///
/// ```rust,ignore
/// use rfq_rag::chunking::{Chunker, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(2000, 1000);
/// let chunks = chunker.chunk(&reference_text);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: maximum number of characters carried into the next chunk
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size: chunk_size.max(1), chunk_overlap }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        split_and_merge(text, self.chunk_size, self.chunk_overlap, &SEPARATORS)
            .into_iter()
            .filter(|c| !c.trim().is_empty())
            .collect()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn split_and_merge(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if char_len(text) <= chunk_size {
        return vec![text.to_string()];
    }
    let Some((separator, rest)) = separators.split_first() else {
        return split_by_size(text, chunk_size, chunk_overlap);
    };

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;

    for segment in split_keeping_separator(text, separator) {
        let segment_len = char_len(segment);

        if segment_len > chunk_size {
            if !current.is_empty() {
                chunks.push(current.concat());
                current.clear();
                current_len = 0;
            }
            chunks.extend(split_and_merge(segment, chunk_size, chunk_overlap, rest));
            continue;
        }

        if current_len + segment_len > chunk_size && !current.is_empty() {
            chunks.push(current.concat());
            // keep a tail of at most `chunk_overlap` characters that still leaves room
            while !current.is_empty()
                && (current_len > chunk_overlap || current_len + segment_len > chunk_size)
            {
                current_len -= char_len(current.remove(0));
            }
        }

        current.push(segment);
        current_len += segment_len;
    }

    if !current.is_empty() {
        chunks.push(current.concat());
    }

    chunks
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Character-based splitting with overlap.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size.saturating_sub(chunk_overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_yields_no_chunks() {
        let chunker = RecursiveChunker::new(100, 20);
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk(" \n\n ").is_empty());
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunker = RecursiveChunker::new(100, 20);
        assert_eq!(chunker.chunk("| M8 | 30 | A2-70 |"), vec!["| M8 | 30 | A2-70 |"]);
    }

    #[test]
    fn chunks_respect_size_and_carry_overlap() {
        let chunker = RecursiveChunker::new(12, 6);
        let chunks = chunker.chunk("aaa bbb ccc ddd eee");

        assert!(chunks.iter().all(|c| c.chars().count() <= 12));
        assert_eq!(chunks, vec!["aaa bbb ccc ", "ccc ddd eee"]);
    }

    #[test]
    fn paragraphs_are_preferred_split_points() {
        let chunker = RecursiveChunker::new(20, 0);
        let chunks = chunker.chunk("first paragraph\n\nsecond paragraph");

        assert_eq!(chunks, vec!["first paragraph\n\n", "second paragraph"]);
    }

    #[test]
    fn oversized_words_are_cut_on_char_boundaries() {
        let chunker = RecursiveChunker::new(4, 1);
        let chunks = chunker.chunk("ßßßßßßß");

        assert_eq!(chunks, vec!["ßßßß", "ßßßß"]);
    }
}
