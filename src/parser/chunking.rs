//! Word-window chunking with overlap.
//!
//! Text is split on whitespace and a window of up to `chunk_size` words is emitted every
//! `chunk_size - chunk_overlap` words, so consecutive chunks share `chunk_overlap` words at the
//! boundary. The step must stay positive; [`WordChunker::new`] rejects configurations where the
//! overlap would stall the window.

use super::types::ChunkingError;

/// Splits text into overlapping word windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl WordChunker {
    /// Build a chunker, validating that every step advances by at least one word.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                chunk_size,
                chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Window size in words.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Words shared between consecutive windows.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Distance in words between the starts of consecutive windows.
    pub fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    /// Number of windows produced for a text of `word_count` words.
    pub fn expected_chunks(&self, word_count: usize) -> usize {
        word_count.div_ceil(self.step())
    }

    /// Split `text` into windows joined by single spaces.
    ///
    /// Returns an empty vector when the text holds no words.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        (0..words.len())
            .step_by(self.step())
            .map(|start| {
                let end = (start + self.chunk_size).min(words.len());
                words[start..end].join(" ")
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(count: usize) -> String {
        (0..count)
            .map(|index| format!("w{index}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn rejects_zero_chunk_size() {
        assert_eq!(WordChunker::new(0, 0), Err(ChunkingError::InvalidChunkSize));
    }

    #[test]
    fn rejects_overlap_that_stalls_the_window() {
        assert_eq!(
            WordChunker::new(10, 10),
            Err(ChunkingError::OverlapTooLarge {
                chunk_size: 10,
                chunk_overlap: 10
            })
        );
        assert!(WordChunker::new(10, 12).is_err());
        assert!(WordChunker::new(10, 9).is_ok());
    }

    #[test]
    fn long_document_yields_three_overlapping_windows() {
        let chunker = WordChunker::new(1000, 200).unwrap();
        let text = numbered_words(2400);
        let chunks = chunker.chunk(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.len(), chunker.expected_chunks(2400));
        for chunk in &chunks {
            assert!(chunk.split_whitespace().count() <= 1000);
        }

        let first: Vec<&str> = chunks[0].split_whitespace().collect();
        let second: Vec<&str> = chunks[1].split_whitespace().collect();
        assert_eq!(&first[800..], &second[..200]);
        assert_eq!(second[0], "w800");
        assert_eq!(chunks[2].split_whitespace().count(), 800);
    }

    #[test]
    fn consecutive_windows_share_exactly_the_overlap() {
        let chunker = WordChunker::new(5, 2).unwrap();
        let chunks = chunker.chunk(&numbered_words(11));
        assert_eq!(chunks.len(), 4);
        for pair in chunks.windows(2) {
            let earlier: Vec<&str> = pair[0].split_whitespace().collect();
            let later: Vec<&str> = pair[1].split_whitespace().collect();
            if earlier.len() == 5 && later.len() >= 2 {
                assert_eq!(&earlier[3..], &later[..2]);
            }
        }
    }

    #[test]
    fn whitespace_is_normalized_and_empty_text_yields_nothing() {
        let chunker = WordChunker::new(3, 1).unwrap();
        assert!(chunker.chunk("   \n\t ").is_empty());
        assert_eq!(
            chunker.chunk("alpha\n\nbeta   gamma\tdelta"),
            vec!["alpha beta gamma", "gamma delta"]
        );
    }

    #[test]
    fn short_text_fits_in_a_single_window() {
        let chunker = WordChunker::new(1000, 200).unwrap();
        assert_eq!(chunker.chunk("just a few words"), vec!["just a few words"]);
    }
}
