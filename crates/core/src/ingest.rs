use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::extractor::{Extraction, ExtractionDispatcher, MediaExtraction, PdfExtraction, Transcript};
use crate::filter::{ChunkFilter, Rejection};
use crate::models::{Chunk, IndexRecord, PipelineOptions, RecordMetadata, SourceFile, SourceKind};
use crate::traits::VectorStore;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

pub const DEFAULT_ROOTS: [&str; 3] = ["./pdf", "./voice", "./video"];

/// Recursively collects files with a supported extension under each root.
///
/// Roots are visited in the given order; files within a root are sorted so
/// repeated runs see the same sequence. Missing roots contribute nothing.
pub fn collect_source_files<P: AsRef<Path>>(roots: &[P]) -> Vec<SourceFile> {
    let mut files = Vec::new();

    for root in roots {
        let root = root.as_ref();
        if !root.exists() {
            debug!(root = %root.display(), "collection root does not exist");
            continue;
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(root).into_iter().filter_map(|item| item.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }

            let supported = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    SourceKind::SUPPORTED_EXTENSIONS
                        .iter()
                        .any(|supported| ext.eq_ignore_ascii_case(supported))
                });

            if supported {
                found.push(entry.path().to_path_buf());
            }
        }

        found.sort_unstable();
        files.extend(found.into_iter().map(SourceFile::new));
    }

    files
}

/// SHA-256 of the file contents, streamed so large media stays off the heap.
pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Indexed { records: usize },
    /// Some chunks were stored; the listed ids were not.
    Partial { indexed: usize, failed_ids: Vec<String> },
    Unsupported,
    Failed { reason: String },
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub display_name: String,
    pub kind: SourceKind,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct IngestionReport {
    pub files: Vec<FileReport>,
}

impl IngestionReport {
    pub fn indexed_records(&self) -> usize {
        self.files
            .iter()
            .map(|file| match &file.outcome {
                FileOutcome::Indexed { records } => *records,
                FileOutcome::Partial { indexed, .. } => *indexed,
                _ => 0,
            })
            .sum()
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|file| {
            matches!(
                file.outcome,
                FileOutcome::Failed { .. } | FileOutcome::Partial { .. }
            )
        })
    }

    pub fn count(&self, predicate: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|file| predicate(&file.outcome)).count()
    }
}

/// Extracts, chunks, filters and indexes source files one at a time.
///
/// A failing file never stops the batch. Within a PDF every chunk is stored
/// on its own; a chunk that fails is recorded and the rest are still tried.
pub struct IngestionPipeline<S: VectorStore> {
    dispatcher: ExtractionDispatcher,
    filter: ChunkFilter,
    store: Arc<S>,
    embedder: Arc<dyn Embedder>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<S: VectorStore> IngestionPipeline<S> {
    pub fn new(
        dispatcher: ExtractionDispatcher,
        options: &PipelineOptions,
        store: Arc<S>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, IngestError> {
        Ok(Self {
            dispatcher,
            filter: ChunkFilter::from_options(options)?,
            store,
            embedder,
            cancel: None,
        })
    }

    /// Checked between files; a file already in progress runs to completion.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    pub async fn ingest_directories<P: AsRef<Path>>(&self, roots: &[P]) -> IngestionReport {
        let files = collect_source_files(roots);
        info!(files = files.len(), "collected source files");
        self.ingest_batch(&files).await
    }

    pub async fn ingest_batch(&self, files: &[SourceFile]) -> IngestionReport {
        let mut report = IngestionReport::default();

        for source in files {
            let outcome = if self.is_cancelled() {
                FileOutcome::Cancelled
            } else {
                match self.ingest_file(source).await {
                    Ok(outcome) => outcome,
                    Err(error) if error.is_skip() => {
                        info!(file = %source.display_name, "unsupported file kind skipped");
                        FileOutcome::Unsupported
                    }
                    Err(error) => {
                        error!(file = %source.display_name, %error, "file processing failed");
                        FileOutcome::Failed {
                            reason: error.to_string(),
                        }
                    }
                }
            };

            report.files.push(FileReport {
                path: source.path.clone(),
                display_name: source.display_name.clone(),
                kind: source.kind,
                outcome,
            });
        }

        report
    }

    pub async fn ingest_file(&self, source: &SourceFile) -> Result<FileOutcome, IngestError> {
        if source.kind == SourceKind::Unsupported {
            return Err(IngestError::UnsupportedKind(source.display_name.clone()));
        }

        let checksum = digest_file(&source.path)?;
        let extraction = run_blocking(|| self.dispatcher.extract(source))?;

        match extraction {
            Extraction::Pdf(pdf) => self.index_pdf(source, pdf, &checksum).await,
            Extraction::Media(media) => self.index_media(source, media, &checksum).await,
        }
    }

    /// Retained chunks numbered densely from 1 in their filtered order.
    pub fn retained_chunks(&self, source: &SourceFile, raw_chunks: &[String]) -> Vec<Chunk> {
        let mut retained = Vec::new();

        for (position, raw) in raw_chunks.iter().enumerate() {
            let text = raw.trim();
            match self.filter.check(text) {
                Ok(()) => retained.push(Chunk {
                    source_id: source.id_base(),
                    sequence_index: retained.len() as u64 + 1,
                    text: text.to_string(),
                    origin_kind: source.kind,
                }),
                Err(Rejection::TooShort { chars, .. }) => {
                    debug!(file = %source.display_name, position, chars, "short chunk dropped")
                }
                Err(Rejection::Noise) => {
                    debug!(file = %source.display_name, position, "noise chunk dropped")
                }
            }
        }

        retained
    }

    async fn index_pdf(
        &self,
        source: &SourceFile,
        pdf: PdfExtraction,
        checksum: &str,
    ) -> Result<FileOutcome, IngestError> {
        let chunks = self.retained_chunks(source, &pdf.chunks);
        if chunks.is_empty() {
            warn!(file = %source.display_name, raw_chunks = pdf.chunks.len(), "no chunk passed the filter");
            return Ok(FileOutcome::Indexed { records: 0 });
        }

        let ingested_at = Utc::now().to_rfc3339();
        let mut indexed = 0;
        let mut failed_ids = Vec::new();
        let mut last_error = None;

        for chunk in &chunks {
            let record = IndexRecord {
                id: chunk.record_id(),
                document: chunk.text.clone(),
                metadata: RecordMetadata {
                    kind: source.kind.as_str().to_string(),
                    display_name: source.display_name.clone(),
                    chunk_index: Some(chunk.sequence_index),
                    source_checksum: Some(checksum.to_string()),
                    ingested_at: Some(ingested_at.clone()),
                    ..Default::default()
                },
            };

            match self.index_record(record).await {
                Ok(()) => {
                    indexed += 1;
                    info!(file = %source.display_name, chunk = chunk.sequence_index, "chunk indexed");
                }
                Err(error) => {
                    warn!(file = %source.display_name, id = %chunk.record_id(), %error, "chunk not indexed");
                    failed_ids.push(chunk.record_id());
                    last_error = Some(error);
                }
            }
        }

        match (indexed, last_error) {
            (_, None) => Ok(FileOutcome::Indexed { records: indexed }),
            (0, Some(error)) => Err(error),
            (_, Some(_)) => Ok(FileOutcome::Partial {
                indexed,
                failed_ids,
            }),
        }
    }

    async fn index_media(
        &self,
        source: &SourceFile,
        media: MediaExtraction,
        checksum: &str,
    ) -> Result<FileOutcome, IngestError> {
        let text = match media.transcript {
            Transcript::Spoken { text, .. } if !text.trim().is_empty() => text,
            _ => return Err(IngestError::EmptyExtraction(source.display_name.clone())),
        };

        let record = IndexRecord {
            id: source.id_base(),
            document: text,
            metadata: RecordMetadata {
                source_checksum: Some(checksum.to_string()),
                ingested_at: Some(Utc::now().to_rfc3339()),
                ..media.metadata
            },
        };

        self.index_record(record).await?;
        info!(file = %source.display_name, "document indexed");
        Ok(FileOutcome::Indexed { records: 1 })
    }

    async fn index_record(&self, record: IndexRecord) -> Result<(), IngestError> {
        let embeddings = self
            .embedder
            .embed(std::slice::from_ref(&record.document))
            .await
            .map_err(|error| IngestError::Embedding(error.to_string()))?;

        self.store
            .add(std::slice::from_ref(&record), &embeddings)
            .await
            .map_err(|error| IngestError::StoreWrite(error.to_string()))
    }
}

/// Runs blocking extraction without stalling other tasks on a multi-thread runtime.
fn run_blocking<T>(work: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}
