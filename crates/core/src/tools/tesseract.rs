use super::run_tool;
use crate::error::IngestError;
use crate::models::PipelineOptions;
use crate::traits::OcrEngine;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone)]
pub struct TesseractOcr {
    pub binary: PathBuf,
    pub language: String,
    pub page_segmentation_mode: u8,
    pub engine_mode: u8,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::from_options(&PipelineOptions::default())
    }
}

impl TesseractOcr {
    pub fn from_options(options: &PipelineOptions) -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: options.ocr_language.clone(),
            page_segmentation_mode: options.ocr_page_segmentation_mode,
            engine_mode: options.ocr_engine_mode,
        }
    }

    fn command(&self, image: &Path) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.page_segmentation_mode.to_string())
            .arg("--oem")
            .arg(self.engine_mode.to_string());
        command
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &Path) -> Result<String, IngestError> {
        let output = run_tool("tesseract", &mut self.command(image))?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
