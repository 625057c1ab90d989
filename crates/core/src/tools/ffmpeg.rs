use super::run_tool;
use crate::error::IngestError;
use crate::traits::AudioDecoder;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Decodes audio files and demuxes video audio tracks with `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    pub binary: PathBuf,
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
        }
    }
}

impl FfmpegDecoder {
    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-vn")
            .args(["-acodec", "pcm_s16le"])
            .arg("-ar")
            .arg(TARGET_SAMPLE_RATE.to_string())
            .args(["-ac", "1"])
            .arg(output)
            .stdin(Stdio::null());
        command
    }
}

impl AudioDecoder for FfmpegDecoder {
    fn decode_to_wav(&self, input: &Path, output: &Path) -> Result<(), IngestError> {
        run_tool("ffmpeg", &mut self.command(input, output))?;

        let written = std::fs::metadata(output).map(|meta| meta.len()).unwrap_or(0);
        if written == 0 {
            return Err(IngestError::external(
                "ffmpeg",
                format!("no audio written for {}", input.display()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::FfmpegDecoder;
    use std::path::Path;

    #[test]
    fn command_extracts_mono_sixteen_khz_pcm() {
        let command = FfmpegDecoder::default().command(Path::new("clip.mp4"), Path::new("out.wav"));
        let args = command
            .get_args()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect::<Vec<_>>();

        assert_eq!(
            args,
            vec![
                "-y", "-i", "clip.mp4", "-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1",
                "out.wav"
            ]
        );
    }
}
