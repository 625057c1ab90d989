pub mod ffmpeg;
pub mod pdftoppm;
pub mod tesseract;
pub mod whisper;

pub use ffmpeg::FfmpegDecoder;
pub use pdftoppm::PdftoppmRasterizer;
pub use tesseract::TesseractOcr;
pub use whisper::WhisperCli;

use crate::error::IngestError;
use std::process::{Command, Output};
use tracing::debug;

/// Runs an external tool to completion, turning spawn failures and non-zero
/// exits into `IngestError::ExternalTool`.
pub(crate) fn run_tool(tool: &str, command: &mut Command) -> Result<Output, IngestError> {
    debug!(tool, command = ?command, "running external tool");

    let output = command
        .output()
        .map_err(|error| IngestError::external(tool, format!("failed to spawn: {error}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(IngestError::external(
            tool,
            format!("exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    Ok(output)
}

/// Whether `binary` can be spawned at all.
pub fn tool_available(binary: &str, version_flag: &str) -> bool {
    Command::new(binary)
        .arg(version_flag)
        .output()
        .map(|_| true)
        .unwrap_or(false)
}
