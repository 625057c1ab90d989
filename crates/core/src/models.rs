use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Media kinds the extraction dispatcher knows how to route.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Audio,
    Video,
    Unsupported,
}

impl SourceKind {
    pub const SUPPORTED_EXTENSIONS: [&'static str; 3] = ["pdf", "mp3", "mp4"];

    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => SourceKind::Pdf,
            Some("mp3") => SourceKind::Audio,
            Some("mp4") => SourceKind::Video,
            _ => SourceKind::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Pdf => "pdf",
            SourceKind::Audio => "voice",
            SourceKind::Video => "video",
            SourceKind::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: SourceKind,
    pub display_name: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        Self {
            kind: SourceKind::from_path(&path),
            display_name,
            path,
        }
    }

    /// Path as used in record ids.
    pub fn id_base(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| self.display_name.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub source_id: String,
    pub sequence_index: u64,
    pub text: String,
    pub origin_kind: SourceKind,
}

impl Chunk {
    pub fn record_id(&self) -> String {
        format!("{}#chunk_{}", self.source_id, self.sequence_index)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RecordMetadata {
    pub kind: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingested_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexRecord {
    pub id: String,
    pub document: String,
    pub metadata: RecordMetadata,
}

/// Parallel result columns for a single query, in store order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreMatches {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<RecordMetadata>,
    pub distances: Vec<f64>,
}

impl StoreMatches {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub id: String,
    pub document: String,
    pub metadata: RecordMetadata,
    pub similarity: f64,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunk_size: usize,
    pub min_chunk_chars: usize,
    pub image_output_dir: PathBuf,
    pub transcript_path: PathBuf,
    pub ocr_language: String,
    pub ocr_page_segmentation_mode: u8,
    pub ocr_engine_mode: u8,
    pub stt_language: String,
    pub beam_size: u32,
    pub condition_on_previous_text: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_size: 3,
            min_chunk_chars: 30,
            image_output_dir: PathBuf::from("extracted_images"),
            transcript_path: PathBuf::from("voice_text.json"),
            ocr_language: "kor+eng".to_string(),
            ocr_page_segmentation_mode: 6,
            ocr_engine_mode: 3,
            stt_language: "ko".to_string(),
            beam_size: 5,
            condition_on_previous_text: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_inferred_from_extension_case_insensitively() {
        assert_eq!(SourceFile::new("./pdf/Report.PDF").kind, SourceKind::Pdf);
        assert_eq!(SourceFile::new("./voice/memo.mp3").kind, SourceKind::Audio);
        assert_eq!(SourceFile::new("./video/clip.Mp4").kind, SourceKind::Video);
        assert_eq!(SourceFile::new("./notes.txt").kind, SourceKind::Unsupported);
        assert_eq!(SourceFile::new("./README").kind, SourceKind::Unsupported);
    }

    #[test]
    fn chunk_record_id_uses_path_and_index() {
        let chunk = Chunk {
            source_id: "./pdf/a.pdf".to_string(),
            sequence_index: 4,
            text: "body".to_string(),
            origin_kind: SourceKind::Pdf,
        };
        assert_eq!(chunk.record_id(), "./pdf/a.pdf#chunk_4");
    }

    #[test]
    fn metadata_omits_absent_fields() -> Result<(), serde_json::Error> {
        let metadata = RecordMetadata {
            kind: "pdf".to_string(),
            display_name: "a.pdf".to_string(),
            chunk_index: Some(1),
            ..Default::default()
        };
        let value = serde_json::to_value(&metadata)?;
        assert_eq!(
            value,
            serde_json::json!({"kind": "pdf", "display_name": "a.pdf", "chunk_index": 1})
        );
        Ok(())
    }
}
