use crate::error::IngestError;
use crate::models::PipelineOptions;
use regex::Regex;

pub const DEFAULT_CHUNK_SIZE: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Paragraphs merged into one chunk.
    pub chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl From<&PipelineOptions> for ChunkingConfig {
    fn from(value: &PipelineOptions) -> Self {
        Self {
            chunk_size: value.chunk_size,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidArgument(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub const PARAGRAPH_BOUNDARY_REGEX: &str = r"\n\s*\n|[.!?]\n";

/// Splits OCR text into paragraphs and merges them into fixed-size chunks.
#[derive(Debug, Clone)]
pub struct ParagraphChunker {
    config: ChunkingConfig,
    // A blank line, or sentence punctuation directly before a line break.
    boundary: Regex,
}

impl ParagraphChunker {
    pub fn new(config: ChunkingConfig) -> Result<Self, IngestError> {
        config.validate()?;
        Ok(Self {
            config,
            boundary: Regex::new(PARAGRAPH_BOUNDARY_REGEX)?,
        })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Trimmed, non-empty paragraphs in input order.
    ///
    /// Sentence punctuation that ends a paragraph stays with that paragraph.
    pub fn split_paragraphs(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut cursor = 0;

        for boundary in self.boundary.find_iter(text) {
            let keeps_punctuation = !boundary.as_str().starts_with('\n');
            let piece_end = if keeps_punctuation {
                boundary.start() + 1
            } else {
                boundary.start()
            };
            pieces.push(&text[cursor..piece_end]);
            cursor = boundary.end();
        }
        pieces.push(&text[cursor..]);

        pieces
            .into_iter()
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Groups consecutive paragraphs into chunks of `chunk_size`, joined by
    /// newlines. The last chunk may hold fewer paragraphs.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        self.split_paragraphs(text)
            .chunks(self.config.chunk_size)
            .map(|group| group.join("\n"))
            .collect()
    }
}

pub fn chunk_paragraphs(text: &str, config: ChunkingConfig) -> Result<Vec<String>, IngestError> {
    Ok(ParagraphChunker::new(config)?.chunk(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_and_sentence_breaks_split_paragraphs() -> Result<(), IngestError> {
        let text = "First line.\nSecond line\ncontinues here\n\n  Third!\nFourth?\nfifth";
        let paragraphs = ParagraphChunker::new(ChunkingConfig::default())?.split_paragraphs(text);
        assert_eq!(
            paragraphs,
            vec![
                "First line.",
                "Second line\ncontinues here",
                "Third!",
                "Fourth?",
                "fifth",
            ]
        );
        Ok(())
    }

    #[test]
    fn whitespace_only_blank_lines_count_as_boundaries() -> Result<(), IngestError> {
        let chunker = ParagraphChunker::new(ChunkingConfig::default())?;
        let paragraphs = chunker.split_paragraphs("alpha\n   \t\nbeta\n\n\n\ngamma");
        assert_eq!(paragraphs, vec!["alpha", "beta", "gamma"]);
        Ok(())
    }

    #[test]
    fn seven_paragraphs_make_three_chunks() -> Result<(), IngestError> {
        let text = (1..=7)
            .map(|index| format!("Paragraph number {index}."))
            .collect::<Vec<_>>()
            .join("\n\n");

        let chunks = chunk_paragraphs(&text, ChunkingConfig::default())?;

        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks[0],
            "Paragraph number 1.\nParagraph number 2.\nParagraph number 3."
        );
        assert_eq!(chunks[2], "Paragraph number 7.");
        Ok(())
    }

    #[test]
    fn chunks_reconstruct_the_paragraph_sequence() -> Result<(), IngestError> {
        for count in 0..=10usize {
            let paragraphs = (0..count)
                .map(|index| format!("문단 {index} 입니다."))
                .collect::<Vec<_>>();
            let text = paragraphs.join("\n\n");

            let chunks = chunk_paragraphs(&text, ChunkingConfig::default())?;
            assert_eq!(chunks.len(), count.div_ceil(3));

            let rebuilt = chunks
                .iter()
                .flat_map(|chunk| chunk.split('\n'))
                .map(str::to_string)
                .collect::<Vec<_>>();
            assert_eq!(rebuilt, paragraphs);
        }
        Ok(())
    }

    #[test]
    fn chunking_is_deterministic() -> Result<(), IngestError> {
        let text = "One.\nTwo.\nThree.\nFour.\n\nFive";
        let config = ChunkingConfig { chunk_size: 2 };
        assert_eq!(chunk_paragraphs(text, config)?, chunk_paragraphs(text, config)?);
        Ok(())
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let result = chunk_paragraphs("text", ChunkingConfig { chunk_size: 0 });
        assert!(matches!(result, Err(IngestError::InvalidArgument(_))));
    }
}
