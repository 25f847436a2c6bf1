//! Text chunking
//!
//! Splits document text into fixed-size overlapping chunks for
//! embedding. Chunk starts advance by exactly `chunk_size -
//! chunk_overlap` characters, so every consecutive pair of chunks
//! shares exactly `chunk_overlap` characters and only the final chunk
//! may be shorter than `chunk_size`. Offsets are measured in chars,
//! never bytes.

use tracing::debug;

/// Configuration for text chunking
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    /// Stride between chunk starts. Overlap must be smaller than the
    /// chunk size; a misconfigured overlap falls back to half the size
    /// so the walk always advances.
    pub fn stride(&self) -> usize {
        if self.chunk_overlap < self.chunk_size {
            self.chunk_size - self.chunk_overlap
        } else {
            (self.chunk_size / 2).max(1)
        }
    }
}

/// A chunk of document text with its position in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk content
    pub content: String,
    /// Index of this chunk in the document
    pub index: usize,
    /// Start character offset in the source text
    pub start_pos: usize,
    /// End character offset (exclusive) in the source text
    pub end_pos: usize,
}

/// Split text into overlapping chunks.
///
/// Empty input yields an empty list. For text of L characters the walk
/// visits every start position `0, stride, 2*stride, ...` below L, so
/// the chunk count is `ceil(L / stride)`.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let chars: Vec<char> = text.chars().collect();
    let total_len = chars.len();

    if total_len == 0 {
        return Vec::new();
    }

    let stride = config.stride();
    let mut chunks = Vec::with_capacity(total_len / stride + 1);
    let mut start = 0;

    while start < total_len {
        let end = (start + config.chunk_size).min(total_len);
        chunks.push(TextChunk {
            content: chars[start..end].iter().collect(),
            index: chunks.len(),
            start_pos: start,
            end_pos: end,
        });
        start += stride;
    }

    debug!(
        input_len = total_len,
        chunk_count = chunks.len(),
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        "Text chunked"
    );

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(size: usize, overlap: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: size,
            chunk_overlap: overlap,
        }
    }

    /// Rebuild the source text by keeping the first occurrence of every
    /// overlapping region.
    fn reconstruct(chunks: &[TextChunk], stride: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i + 1 == chunks.len() {
                let taken: String = out.chars().take(chunk.start_pos).collect();
                out = taken + &chunk.content;
            } else {
                out.extend(chunk.content.chars().take(stride));
            }
        }
        out
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", &ChunkingConfig::default()).is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("hello", &ChunkingConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "hello");
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn default_config_on_2500_chars_gives_4_chunks() {
        let text: String = std::iter::repeat('x').take(2500).collect();
        let chunks = chunk_text(&text, &ChunkingConfig::default());
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].content.chars().count(), 1000);
        assert_eq!(chunks[1].content.chars().count(), 1000);
        assert_eq!(chunks[1].start_pos, 800);
        assert_eq!(chunks[3].start_pos, 2400);
    }

    #[test]
    fn consecutive_chunks_overlap_exactly() {
        let text: String = ('a'..='z').cycle().take(130).collect();
        let cfg = config(50, 10);
        let chunks = chunk_text(&text, &cfg);

        for pair in chunks.windows(2) {
            let prev_tail: String = pair[0]
                .content
                .chars()
                .skip(pair[0].content.chars().count().saturating_sub(10))
                .collect();
            let next_head: String = pair[1].content.chars().take(10).collect();
            if pair[1].end_pos - pair[1].start_pos >= 10 {
                assert_eq!(prev_tail, next_head);
            }
            assert_eq!(pair[1].start_pos, pair[0].start_pos + cfg.stride());
        }
    }

    #[test]
    fn chunk_count_matches_stride_walk() {
        for (len, size, overlap) in [(2500, 1000, 200), (1000, 1000, 200), (801, 100, 25), (75, 100, 25)] {
            let text: String = std::iter::repeat('q').take(len).collect();
            let cfg = config(size, overlap);
            let chunks = chunk_text(&text, &cfg);
            let expected = len.div_ceil(cfg.stride());
            assert_eq!(chunks.len(), expected, "len={len} size={size} overlap={overlap}");
        }
    }

    #[test]
    fn reconstruction_preserves_source() {
        let text: String = "The quick brown fox jumps over the lazy dog. "
            .chars()
            .cycle()
            .take(2317)
            .collect();
        let cfg = config(300, 60);
        let chunks = chunk_text(&text, &cfg);
        assert_eq!(reconstruct(&chunks, cfg.stride()), text);
    }

    #[test]
    fn no_chunk_exceeds_size() {
        let text: String = std::iter::repeat('z').take(4321).collect();
        let chunks = chunk_text(&text, &config(500, 100));
        assert!(chunks.iter().all(|c| c.content.chars().count() <= 500));
    }

    #[test]
    fn multibyte_chars_are_not_split() {
        let text: String = "héllo wörld ünïcode ".chars().cycle().take(250).collect();
        let chunks = chunk_text(&text, &config(100, 20));
        let total: usize = text.chars().count();
        assert_eq!(chunks.last().unwrap().end_pos, total);
        for chunk in &chunks {
            assert_eq!(
                chunk.content.chars().count(),
                chunk.end_pos - chunk.start_pos
            );
        }
    }

    #[test]
    fn indices_are_in_insertion_order() {
        let text: String = std::iter::repeat('m').take(950).collect();
        let chunks = chunk_text(&text, &config(200, 50));
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }
}
