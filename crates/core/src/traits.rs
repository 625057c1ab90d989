use crate::error::{IngestError, SearchError};
use crate::models::{IndexRecord, StoreMatches, TimedSegment};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 1-based page number.
    pub number: u32,
    pub path: PathBuf,
}

/// Page images of one PDF. Images backed by a scratch directory are removed
/// when this value drops.
#[derive(Debug)]
pub struct RasterizedPdf {
    pub pages: Vec<PageImage>,
    _scratch: Option<TempDir>,
}

impl RasterizedPdf {
    pub fn new(pages: Vec<PageImage>) -> Self {
        Self {
            pages,
            _scratch: None,
        }
    }

    pub fn in_scratch(pages: Vec<PageImage>, scratch: TempDir) -> Self {
        Self {
            pages,
            _scratch: Some(scratch),
        }
    }
}

pub trait PdfRasterizer: Send + Sync {
    fn rasterize(&self, pdf: &Path) -> Result<RasterizedPdf, IngestError>;
}

pub trait OcrEngine: Send + Sync {
    /// Recognized text; an empty string means the page had no text.
    fn recognize(&self, image: &Path) -> Result<String, IngestError>;
}

pub trait AudioDecoder: Send + Sync {
    /// Writes the audio track of `input` to `output` as 16 kHz mono PCM WAV.
    fn decode_to_wav(&self, input: &Path, output: &Path) -> Result<(), IngestError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscribeOptions {
    pub language: String,
    pub beam_size: u32,
    pub condition_on_previous_text: bool,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            language: "ko".to_string(),
            beam_size: 5,
            condition_on_previous_text: false,
        }
    }
}

pub trait Transcriber: Send + Sync {
    fn transcribe(
        &self,
        wav: &Path,
        options: &TranscribeOptions,
    ) -> Result<Vec<TimedSegment>, IngestError>;
}

/// Vector collection that reports cosine distance on query.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Adds records with their embeddings; an existing id is overwritten.
    async fn add(&self, records: &[IndexRecord], embeddings: &[Vec<f32>]) -> Result<(), SearchError>;

    async fn query(&self, embedding: &[f32], n_results: usize) -> Result<StoreMatches, SearchError>;
}
