pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod ingest;
pub mod models;
pub mod query;
pub mod segments;
pub mod stores;
pub mod tools;
pub mod traits;
pub mod transcripts;

pub use chunking::{chunk_paragraphs, ChunkingConfig, ParagraphChunker};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, HttpEmbedder, HttpEmbedderConfig, DEFAULT_EMBEDDING_DIMENSIONS,
    DEFAULT_EMBEDDING_MODEL,
};
pub use error::{IngestError, SearchError};
pub use extractor::{Collaborators, Extraction, ExtractionDispatcher, MediaExtraction, PdfExtraction, Transcript};
pub use filter::{ChunkFilter, Rejection};
pub use ingest::{
    collect_source_files, FileOutcome, FileReport, IngestionPipeline, IngestionReport, DEFAULT_ROOTS,
};
pub use models::{
    Chunk, IndexRecord, PipelineOptions, QueryResult, RecordMetadata, SourceFile, SourceKind,
    StoreMatches, TimedSegment,
};
pub use query::{similarity_from_distance, QueryService, DEFAULT_TOP_K};
pub use segments::format_segments;
pub use stores::{ChromaStore, MemoryStore, DEFAULT_COLLECTION};
pub use tools::{FfmpegDecoder, PdftoppmRasterizer, TesseractOcr, WhisperCli};
pub use traits::{AudioDecoder, OcrEngine, PdfRasterizer, TranscribeOptions, Transcriber, VectorStore};
pub use transcripts::TranscriptStore;
