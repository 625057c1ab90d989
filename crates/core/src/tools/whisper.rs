use super::run_tool;
use crate::error::IngestError;
use crate::models::TimedSegment;
use crate::traits::{TranscribeOptions, Transcriber};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    transcription: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    offsets: WhisperOffsets,
    #[serde(default)]
    text: String,
}

/// Segment bounds in milliseconds.
#[derive(Debug, Deserialize)]
struct WhisperOffsets {
    from: u64,
    to: u64,
}

/// Speech-to-text through the whisper.cpp command line.
///
/// The model is resolved once in [`WhisperCli::load`] and reused for every
/// file handed to the same instance.
#[derive(Debug, Clone)]
pub struct WhisperCli {
    binary: PathBuf,
    model: PathBuf,
    threads: Option<u32>,
}

impl WhisperCli {
    pub fn load(binary: impl Into<PathBuf>, model: impl Into<PathBuf>) -> Result<Self, IngestError> {
        let model = model.into();
        if !model.is_file() {
            return Err(IngestError::external(
                "whisper",
                format!("model file not found: {}", model.display()),
            ));
        }

        info!(model = %model.display(), "speech-to-text model ready");
        Ok(Self {
            binary: binary.into(),
            model,
            threads: None,
        })
    }

    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn model(&self) -> &Path {
        &self.model
    }

    fn command(&self, wav: &Path, output_prefix: &Path, options: &TranscribeOptions) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg("-m")
            .arg(&self.model)
            .arg("-f")
            .arg(wav)
            .arg("-l")
            .arg(&options.language)
            .arg("-bs")
            .arg(options.beam_size.to_string());

        if !options.condition_on_previous_text {
            command.args(["-mc", "0"]);
        }
        if let Some(threads) = self.threads {
            command.arg("-t").arg(threads.to_string());
        }

        command.arg("-np").arg("-oj").arg("-of").arg(output_prefix);
        command
    }
}

impl Transcriber for WhisperCli {
    fn transcribe(
        &self,
        wav: &Path,
        options: &TranscribeOptions,
    ) -> Result<Vec<TimedSegment>, IngestError> {
        let scratch = tempfile::Builder::new().prefix("media-search-stt-").tempdir()?;
        let prefix = scratch.path().join("transcript");

        run_tool("whisper", &mut self.command(wav, &prefix, options))?;

        let raw = fs::read(prefix.with_extension("json")).map_err(|error| {
            IngestError::external("whisper", format!("missing JSON output: {error}"))
        })?;
        parse_whisper_json(&raw)
    }
}

/// whisper.cpp may cut a multi-byte character across two segments, so the
/// output is decoded lossily before parsing.
fn parse_whisper_json(raw: &[u8]) -> Result<Vec<TimedSegment>, IngestError> {
    let text = String::from_utf8_lossy(raw);
    let output: WhisperOutput = serde_json::from_str(&text)
        .map_err(|error| IngestError::external("whisper", format!("unreadable JSON output: {error}")))?;

    Ok(output
        .transcription
        .into_iter()
        .filter(|segment| !segment.text.trim().is_empty())
        .map(|segment| {
            let start = segment.offsets.from as f64 / 1000.0;
            let end = (segment.offsets.to.max(segment.offsets.from)) as f64 / 1000.0;
            TimedSegment {
                start,
                end,
                text: segment.text.trim().to_string(),
            }
        })
        .collect())
}
