use crate::error::IngestError;
use crate::models::PipelineOptions;
use regex::Regex;

pub const DEFAULT_MIN_CHUNK_CHARS: usize = 30;

/// Whole-chunk OCR noise: three or more of `k`, `ㅎ`, `.` or whitespace and nothing else.
pub const NOISE_REGEX: &str = r"(?i)^(?:k|ㅎ|\.|\s){3,}$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TooShort { chars: usize, min_chars: usize },
    Noise,
}

/// Drops degenerate OCR chunks before they reach the index.
#[derive(Debug, Clone)]
pub struct ChunkFilter {
    min_chars: usize,
    noise: Regex,
}

impl ChunkFilter {
    pub fn new(min_chars: usize) -> Result<Self, IngestError> {
        Ok(Self {
            min_chars,
            noise: Regex::new(NOISE_REGEX)?,
        })
    }

    pub fn from_options(options: &PipelineOptions) -> Result<Self, IngestError> {
        Self::new(options.min_chunk_chars)
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    /// Pure function of the text: the same chunk always gets the same verdict.
    pub fn check(&self, chunk: &str) -> Result<(), Rejection> {
        let trimmed = chunk.trim();
        let chars = trimmed.chars().count();

        if chars < self.min_chars {
            return Err(Rejection::TooShort {
                chars,
                min_chars: self.min_chars,
            });
        }

        if self.noise.is_match(trimmed) {
            return Err(Rejection::Noise);
        }

        Ok(())
    }

    pub fn accepts(&self, chunk: &str) -> bool {
        self.check(chunk).is_ok()
    }
}
