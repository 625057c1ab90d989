use crate::chunking::{ChunkingConfig, ParagraphChunker};
use crate::error::IngestError;
use crate::models::{PipelineOptions, RecordMetadata, SourceFile, SourceKind};
use crate::segments::format_segments;
use crate::tools::{FfmpegDecoder, PdftoppmRasterizer, TesseractOcr};
use crate::traits::{AudioDecoder, OcrEngine, PdfRasterizer, TranscribeOptions, Transcriber};
use crate::transcripts::TranscriptStore;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// OCR output of one PDF, already grouped into chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfExtraction {
    pub chunks: Vec<String>,
    /// Page images kept for inspection only.
    pub images: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transcript {
    Spoken { text: String, segments: usize },
    /// The recording contained no recognizable speech.
    NoSpeech { kind: SourceKind },
}

impl Transcript {
    /// Transcript text, or a placeholder line when nothing was said.
    pub fn text(&self) -> &str {
        match self {
            Transcript::Spoken { text, .. } => text.as_str(),
            Transcript::NoSpeech { kind: SourceKind::Video } => "No text extracted from video file.",
            Transcript::NoSpeech { .. } => "No text extracted from voice file.",
        }
    }

    pub fn segment_count(&self) -> usize {
        match self {
            Transcript::Spoken { segments, .. } => *segments,
            Transcript::NoSpeech { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaExtraction {
    pub transcript: Transcript,
    pub metadata: RecordMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Pdf(PdfExtraction),
    Media(MediaExtraction),
}

/// The external engines the dispatcher delegates to.
pub struct Collaborators {
    pub rasterizer: Box<dyn PdfRasterizer>,
    pub ocr: Box<dyn OcrEngine>,
    pub decoder: Box<dyn AudioDecoder>,
    pub transcriber: Box<dyn Transcriber>,
}

impl Collaborators {
    /// `pdftoppm`, `tesseract` and `ffmpeg` from `PATH` plus the given speech model.
    pub fn system(options: &PipelineOptions, transcriber: Box<dyn Transcriber>) -> Self {
        Self {
            rasterizer: Box::new(PdftoppmRasterizer::default()),
            ocr: Box::new(TesseractOcr::from_options(options)),
            decoder: Box::new(FfmpegDecoder::default()),
            transcriber,
        }
    }
}

/// Routes a source file to the extractor for its kind.
pub struct ExtractionDispatcher {
    collaborators: Collaborators,
    chunker: ParagraphChunker,
    transcripts: TranscriptStore,
    image_output_dir: PathBuf,
    transcribe_options: TranscribeOptions,
}

impl ExtractionDispatcher {
    pub fn new(collaborators: Collaborators, options: &PipelineOptions) -> Result<Self, IngestError> {
        Ok(Self {
            collaborators,
            chunker: ParagraphChunker::new(ChunkingConfig::from(options))?,
            transcripts: TranscriptStore::new(&options.transcript_path),
            image_output_dir: options.image_output_dir.clone(),
            transcribe_options: TranscribeOptions {
                language: options.stt_language.clone(),
                beam_size: options.beam_size,
                condition_on_previous_text: options.condition_on_previous_text,
            },
        })
    }

    pub fn transcripts(&self) -> &TranscriptStore {
        &self.transcripts
    }

    pub fn extract(&self, source: &SourceFile) -> Result<Extraction, IngestError> {
        match source.kind {
            SourceKind::Pdf => self.extract_pdf(source).map(Extraction::Pdf),
            SourceKind::Audio | SourceKind::Video => self.extract_media(source).map(Extraction::Media),
            SourceKind::Unsupported => Err(IngestError::UnsupportedKind(source.display_name.clone())),
        }
    }

    /// OCR text of every page that produced any, in page order.
    ///
    /// Fails with `OcrExtractionFailed` when no page yields text.
    pub fn ocr_pdf(&self, source: &SourceFile) -> Result<(String, Vec<PathBuf>), IngestError> {
        info!(file = %source.display_name, "pdf extraction started");

        let rasterized = self.collaborators.rasterizer.rasterize(&source.path)?;
        info!(file = %source.display_name, pages = rasterized.pages.len(), "pages rasterized");

        fs::create_dir_all(&self.image_output_dir)?;
        let stem = source.stem();
        let mut full_text = String::new();
        let mut images = Vec::new();

        for page in &rasterized.pages {
            let text = self.collaborators.ocr.recognize(&page.path)?;
            let text = text.trim();
            if text.is_empty() {
                warn!(file = %source.display_name, page = page.number, "no text on page");
                continue;
            }

            full_text.push('\n');
            full_text.push_str(text);

            let image_path = self
                .image_output_dir
                .join(format!("{stem}_page{}.png", page.number));
            fs::copy(&page.path, &image_path)?;
            images.push(image_path);
            info!(file = %source.display_name, page = page.number, "page text extracted");
        }

        if full_text.trim().is_empty() {
            return Err(IngestError::OcrExtractionFailed(source.display_name.clone()));
        }

        Ok((full_text, images))
    }

    fn extract_pdf(&self, source: &SourceFile) -> Result<PdfExtraction, IngestError> {
        let (text, images) = self.ocr_pdf(source)?;
        let chunks = self.chunker.chunk(&text);

        info!(
            file = %source.display_name,
            chunks = chunks.len(),
            images = images.len(),
            image_dir = %self.image_output_dir.display(),
            "pdf chunked"
        );
        Ok(PdfExtraction { chunks, images })
    }

    fn extract_media(&self, source: &SourceFile) -> Result<MediaExtraction, IngestError> {
        info!(file = %source.display_name, kind = %source.kind, "speech-to-text started");

        // Removed on drop, including when decoding or transcription fails.
        let wav = tempfile::Builder::new()
            .prefix("media-search-audio-")
            .suffix(".wav")
            .tempfile()?;

        self.collaborators.decoder.decode_to_wav(&source.path, wav.path())?;
        let segments = self
            .collaborators
            .transcriber
            .transcribe(wav.path(), &self.transcribe_options)?;

        if let Err(error) = wav.close() {
            warn!(file = %source.display_name, %error, "temporary audio not removed");
        }

        let transcript = if segments.is_empty() {
            warn!(file = %source.display_name, "no speech recognized");
            Transcript::NoSpeech { kind: source.kind }
        } else {
            let text = format_segments(&segments);
            info!(file = %source.display_name, segments = segments.len(), "transcription finished");
            Transcript::Spoken {
                text,
                segments: segments.len(),
            }
        };

        if let Transcript::Spoken { text, .. } = &transcript {
            if let Err(error) = self.transcripts.save(&source.display_name, text) {
                warn!(file = %source.display_name, %error, "transcript not persisted");
            }
        }

        let metadata = RecordMetadata {
            kind: source.kind.as_str().to_string(),
            display_name: source.display_name.clone(),
            segment_count: Some(transcript.segment_count() as u64),
            media_info: Some(format!(
                "Extracted media info for {}: {}",
                source.kind, source.display_name
            )),
            ..Default::default()
        };

        Ok(MediaExtraction {
            transcript,
            metadata,
        })
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use crate::error::IngestError;
    use crate::models::TimedSegment;
    use crate::traits::{
        AudioDecoder, OcrEngine, PageImage, PdfRasterizer, RasterizedPdf, TranscribeOptions,
        Transcriber,
    };
    use std::collections::HashMap;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Writes one placeholder image per entry of `pages` and remembers its OCR text.
    pub struct FakeRasterizer {
        pub scratch: PathBuf,
        pub pages_by_file: HashMap<String, Vec<String>>,
        pub failing_files: Vec<String>,
    }

    impl PdfRasterizer for FakeRasterizer {
        fn rasterize(&self, pdf: &Path) -> Result<RasterizedPdf, IngestError> {
            let name = pdf
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();
            if self.failing_files.contains(&name) {
                return Err(IngestError::external("pdftoppm", "corrupt file"));
            }

            let texts = self.pages_by_file.get(&name).cloned().unwrap_or_default();
            let mut pages = Vec::new();
            for (index, text) in texts.iter().enumerate() {
                let path = self.scratch.join(format!("{name}-{}.png", index + 1));
                fs::write(&path, text)?;
                pages.push(PageImage {
                    number: index as u32 + 1,
                    path,
                });
            }
            Ok(RasterizedPdf::new(pages))
        }
    }

    /// Reads the page image back as its text.
    pub struct FakeOcr;

    impl OcrEngine for FakeOcr {
        fn recognize(&self, image: &Path) -> Result<String, IngestError> {
            Ok(fs::read_to_string(image)?)
        }
    }

    /// Records the scratch WAV paths it was asked to write.
    #[derive(Default)]
    pub struct FakeDecoder {
        pub outputs: Mutex<Vec<PathBuf>>,
    }

    impl AudioDecoder for FakeDecoder {
        fn decode_to_wav(&self, _input: &Path, output: &Path) -> Result<(), IngestError> {
            fs::write(output, b"RIFF")?;
            if let Ok(mut outputs) = self.outputs.lock() {
                outputs.push(output.to_path_buf());
            }
            Ok(())
        }
    }

    pub struct FakeTranscriber {
        pub segments: Vec<TimedSegment>,
        pub fail: bool,
    }

    impl Transcriber for FakeTranscriber {
        fn transcribe(
            &self,
            _wav: &Path,
            _options: &TranscribeOptions,
        ) -> Result<Vec<TimedSegment>, IngestError> {
            if self.fail {
                return Err(IngestError::external("whisper", "decoder crashed"));
            }
            Ok(self.segments.clone())
        }
    }
}
