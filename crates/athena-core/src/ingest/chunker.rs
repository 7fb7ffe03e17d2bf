//! Character-bounded chunking with overlap.
//!
//! Uses `text-splitter`, which prefers paragraph, then sentence, then word
//! boundaries before falling back to characters. Chunks are trimmed.

use athena_types::error::IngestionError;
use text_splitter::{Characters, ChunkConfig, TextSplitter};

pub struct Chunker {
    splitter: TextSplitter<Characters>,
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// `overlap` must be smaller than `chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, IngestionError> {
        if chunk_size == 0 {
            return Err(IngestionError::Chunking("chunk size must be greater than 0".into()));
        }
        let config = ChunkConfig::new(chunk_size)
            .with_overlap(overlap)
            .map_err(|e| IngestionError::Chunking(e.to_string()))?;
        Ok(Self {
            splitter: TextSplitter::new(config),
            chunk_size,
            overlap,
        })
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.splitter
            .chunks(text)
            .filter(|c| !c.trim().is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunker = Chunker::new(500, 50).unwrap();
        let chunks = chunker.split("Python is a programming language.");
        assert_eq!(chunks, vec!["Python is a programming language."]);
    }

    #[test]
    fn test_long_text_respects_chunk_size() {
        let chunker = Chunker::new(40, 10).unwrap();
        let text = "Lists hold ordered items. Tuples are immutable. \
                    Dictionaries map keys to values. Sets hold unique items.";
        let chunks = chunker.split(text);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));
    }

    #[test]
    fn test_whitespace_only_text_has_no_chunks() {
        let chunker = Chunker::new(100, 0).unwrap();
        assert!(chunker.split("   \n\n\t ").is_empty());
    }

    #[test]
    fn test_overlap_not_below_size_is_rejected() {
        assert!(matches!(Chunker::new(10, 10), Err(IngestionError::Chunking(_))));
        assert!(matches!(Chunker::new(0, 0), Err(IngestionError::Chunking(_))));
    }
}
