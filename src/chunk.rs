//! Semantic document chunker.
//!
//! Splits oversized document content into ordered, overlapping chunks that
//! respect paragraph boundaries, falling back to sentence boundaries for
//! paragraphs far larger than the target size. Each chunk receives a
//! deterministic id derived from its document id and index.
//!
//! Sizes are measured in estimated tokens (`len / 4`) — a stable sizing
//! heuristic, not an exact tokenizer.

use serde_json::{Map, Value};

use crate::identity::chunk_id;
use crate::models::Chunk;

/// Approximate chars-per-token ratio for English text.
const CHARS_PER_TOKEN: usize = 4;

/// Chunking configuration.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Target chunk size in estimated tokens.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, as a fraction of `chunk_size`.
    pub overlap_percent: f64,
    /// Floor for trailing chunks: a final chunk estimated below this is
    /// merged into its predecessor.
    pub min_chunk_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            overlap_percent: 0.15,
            min_chunk_size: 500,
        }
    }
}

/// Paragraph-then-sentence chunker with overlap seeding.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    min_chunk_size: usize,
    overlap_size: usize,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        let overlap_size = (config.chunk_size as f64 * config.overlap_percent) as usize;
        Self {
            chunk_size: config.chunk_size,
            min_chunk_size: config.min_chunk_size,
            overlap_size,
        }
    }

    /// True iff the content's estimated token count exceeds the target chunk
    /// size. A document is either chunked entirely or not at all.
    pub fn should_chunk(&self, content: &str) -> bool {
        estimate_tokens(content) > self.chunk_size
    }

    /// Split a document into ordered, overlapping chunks.
    ///
    /// Returns an empty vec when [`should_chunk`](Self::should_chunk) is
    /// false. Otherwise `chunk_index` values are exactly `0..n` with no gaps.
    pub fn chunk_document(
        &self,
        document_id: &str,
        content: &str,
        metadata: &Map<String, Value>,
    ) -> Vec<Chunk> {
        if !self.should_chunk(content) {
            return Vec::new();
        }

        let segments = split_segments(content);

        let mut bodies: Vec<String> = Vec::new();
        let mut units: Vec<String> = Vec::new();
        let mut current_tokens = 0usize;

        for segment in segments {
            let segment_tokens = estimate_tokens(&segment);

            if segment_tokens as f64 > self.chunk_size as f64 * 1.5 {
                // A single paragraph far over target: force sentence packing.
                for sentence in split_sentences(&segment) {
                    let sentence_tokens = estimate_tokens(&sentence);
                    if current_tokens + sentence_tokens > self.chunk_size {
                        if !units.is_empty() {
                            bodies.push(units.join(" "));
                        }
                        let overlap = self.overlap_tail(&units);
                        units.clear();
                        if !overlap.is_empty() {
                            units.push(overlap);
                        }
                        units.push(sentence);
                        current_tokens = estimate_tokens(&units.join(" "));
                    } else {
                        units.push(sentence);
                        current_tokens += sentence_tokens;
                    }
                }
            } else if current_tokens + segment_tokens > self.chunk_size {
                if !units.is_empty() {
                    bodies.push(units.join("\n\n"));
                }
                let overlap = self.overlap_tail(&units);
                units.clear();
                if !overlap.is_empty() {
                    units.push(overlap);
                }
                units.push(segment);
                current_tokens = estimate_tokens(&units.join("\n\n"));
            } else {
                units.push(segment);
                current_tokens += segment_tokens;
            }
        }

        if !units.is_empty() {
            bodies.push(units.join("\n\n"));
        }

        // Trailing chunks below the minimum fold into their predecessor; the
        // merged chunk may exceed the target by at most the minimum.
        let merge_tail = bodies.len() >= 2
            && bodies
                .last()
                .is_some_and(|last| estimate_tokens(last) < self.min_chunk_size);
        if merge_tail {
            let tail = bodies.pop().unwrap();
            let prev = bodies.last_mut().unwrap();
            prev.push_str("\n\n");
            prev.push_str(&tail);
        }

        bodies
            .into_iter()
            .enumerate()
            .map(|(index, body)| self.build_chunk(document_id, index as i64, body, metadata))
            .collect()
    }

    /// Overlap tail of a just-closed chunk: the whole chunk if it already fits
    /// the overlap budget, else a trailing fraction of its words proportional
    /// to `overlap_size / total_tokens`. A word-count approximation of a
    /// token-count target.
    fn overlap_tail(&self, units: &[String]) -> String {
        if units.is_empty() {
            return String::new();
        }

        let full = units.join(" ");
        let tokens = estimate_tokens(&full);
        if tokens <= self.overlap_size {
            return full;
        }

        let words: Vec<&str> = full.split_whitespace().collect();
        let overlap_words = (words.len() as f64 * (self.overlap_size as f64 / tokens as f64)) as usize;
        if overlap_words == 0 {
            return String::new();
        }
        words[words.len() - overlap_words..].join(" ")
    }

    fn build_chunk(
        &self,
        document_id: &str,
        index: i64,
        body: String,
        caller_metadata: &Map<String, Value>,
    ) -> Chunk {
        // Caller metadata first; computed keys are reserved and win on
        // collision.
        let mut metadata = caller_metadata.clone();
        metadata.insert("chunk_index".to_string(), Value::from(index));
        metadata.insert(
            "token_count".to_string(),
            Value::from(estimate_tokens(&body) as u64),
        );
        metadata.insert("char_count".to_string(), Value::from(body.len() as u64));

        Chunk {
            id: chunk_id(document_id, index),
            document_id: document_id.to_string(),
            chunk_index: index,
            content: body,
            metadata,
        }
    }
}

/// Estimated token count: 1 token ≈ 4 characters of English text.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / CHARS_PER_TOKEN
}

/// Split content into paragraph segments at blank-line boundaries.
/// Whitespace-only lines count as blank; empty segments are dropped.
fn split_segments(content: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.trim().is_empty() {
                segments.push(current.trim().to_string());
            }
            current.clear();
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.trim().is_empty() {
        segments.push(current.trim().to_string());
    }

    segments
}

/// Split text into sentences at `.`/`!`/`?` followed by whitespace.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            if chars.peek().is_some_and(|next| next.is_whitespace()) {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    sentences.push(trimmed.to_string());
                }
                current.clear();
                // Consume the whitespace run separating sentences.
                while chars.peek().is_some_and(|next| next.is_whitespace()) {
                    chars.next();
                }
            }
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker() -> Chunker {
        Chunker::new(ChunkerConfig::default())
    }

    /// A paragraph of roughly `tokens` estimated tokens.
    fn paragraph(word: &str, tokens: usize) -> String {
        let unit = format!("{} ", word); // word + space
        let repeats = (tokens * CHARS_PER_TOKEN) / unit.len() + 1;
        unit.repeat(repeats).trim_end().to_string()
    }

    #[test]
    fn test_short_content_not_chunked() {
        let c = chunker();
        assert!(!c.should_chunk("para one.\n\npara two."));
        let chunks = c.chunk_document("doc1", "para one.\n\npara two.", &Map::new());
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_threshold_boundary() {
        let c = chunker();
        // Exactly at the target is not chunked; strictly over is.
        let at = "x".repeat(800 * CHARS_PER_TOKEN);
        let over = "x".repeat(800 * CHARS_PER_TOKEN + CHARS_PER_TOKEN);
        assert!(!c.should_chunk(&at));
        assert!(c.should_chunk(&over));
    }

    #[test]
    fn test_indices_contiguous_and_ids_derived() {
        let c = chunker();
        let text: Vec<String> = (0..10).map(|i| paragraph(&format!("word{}", i), 200)).collect();
        let chunks = c.chunk_document("doc1", &text.join("\n\n"), &Map::new());
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as i64);
            assert_eq!(chunk.id, format!("doc1_chunk_{}", i));
            assert_eq!(chunk.document_id, "doc1");
        }
    }

    #[test]
    fn test_overlap_seeds_next_chunk() {
        let c = chunker();
        let text: Vec<String> = (0..7).map(|i| paragraph(&format!("alpha{}", i), 200)).collect();
        let chunks = c.chunk_document("doc1", &text.join("\n\n"), &Map::new());
        assert!(chunks.len() >= 2);

        let first_words: Vec<&str> = chunks[0].content.split_whitespace().collect();
        let second_words: Vec<&str> = chunks[1].content.split_whitespace().collect();
        // The second chunk opens with the trailing words of the first.
        let tail = &first_words[first_words.len() - 5..];
        assert_eq!(&second_words[..5], tail);
    }

    #[test]
    fn test_no_blank_lines_forces_sentence_split() {
        let c = chunker();
        // One giant paragraph of short sentences, no blank lines anywhere.
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(150);
        assert!(c.should_chunk(&text));
        let chunks = c.chunk_document("doc1", &text, &Map::new());
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as i64);
        }
        // Sentence-packed chunks join with single spaces.
        assert!(!chunks[0].content.contains("\n\n"));
    }

    #[test]
    fn test_chunks_near_target_size() {
        let c = chunker();
        let text: Vec<String> = (0..8).map(|i| paragraph(&format!("beta{}", i), 150)).collect();
        let chunks = c.chunk_document("doc1", &text.join("\n\n"), &Map::new());
        for chunk in &chunks {
            // Target plus overlap seed plus one packed unit of slack.
            assert!(
                estimate_tokens(&chunk.content) <= 800 + 120 + 160,
                "chunk of {} tokens",
                estimate_tokens(&chunk.content)
            );
        }
    }

    #[test]
    fn test_metadata_computed_keys_win() {
        let c = chunker();
        let mut caller = Map::new();
        caller.insert("source".to_string(), Value::from("book"));
        caller.insert("chunk_index".to_string(), Value::from(999));

        let text: Vec<String> = (0..7).map(|i| paragraph(&format!("gamma{}", i), 200)).collect();
        let chunks = c.chunk_document("doc1", &text.join("\n\n"), &caller);
        assert!(!chunks.is_empty());

        let meta = &chunks[0].metadata;
        assert_eq!(meta["source"], Value::from("book"));
        assert_eq!(meta["chunk_index"], Value::from(0));
        assert_eq!(
            meta["char_count"],
            Value::from(chunks[0].content.len() as u64)
        );
        assert_eq!(
            meta["token_count"],
            Value::from(estimate_tokens(&chunks[0].content) as u64)
        );
    }

    #[test]
    fn test_trailing_runt_merged_into_previous() {
        let c = Chunker::new(ChunkerConfig {
            chunk_size: 100,
            overlap_percent: 0.0,
            min_chunk_size: 50,
        });
        let big = paragraph("word", 100);
        let small = paragraph("tail", 20);
        let chunks = c.chunk_document("doc1", &format!("{}\n\n{}", big, small), &Map::new());
        // The 20-token trailing chunk folds into its predecessor.
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("tail"));
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn test_deterministic() {
        let c = chunker();
        let text: Vec<String> = (0..9).map(|i| paragraph(&format!("delta{}", i), 180)).collect();
        let text = text.join("\n\n");
        let a = c.chunk_document("doc1", &text, &Map::new());
        let b = c.chunk_document("doc1", &text, &Map::new());
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.content, y.content);
        }
    }

    #[test]
    fn test_split_sentences_boundaries() {
        let s = split_sentences("One. Two! Three? Four");
        assert_eq!(s, vec!["One.", "Two!", "Three?", "Four"]);
    }

    #[test]
    fn test_split_segments_drops_blank_runs() {
        let s = split_segments("a\n\n\n  \nb\nc\n\nd");
        assert_eq!(s, vec!["a", "b\nc", "d"]);
    }
}
