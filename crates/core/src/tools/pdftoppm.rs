use super::run_tool;
use crate::error::IngestError;
use crate::traits::{PageImage, PdfRasterizer, RasterizedPdf};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Renders PDF pages to PNG with poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    pub binary: PathBuf,
    pub dpi: u32,
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("pdftoppm"),
            dpi: 200,
        }
    }
}

impl PdfRasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf: &Path) -> Result<RasterizedPdf, IngestError> {
        let scratch = tempfile::Builder::new().prefix("media-search-pages-").tempdir()?;
        let prefix = scratch.path().join("page");

        run_tool(
            "pdftoppm",
            Command::new(&self.binary)
                .arg("-png")
                .arg("-r")
                .arg(self.dpi.to_string())
                .arg(pdf)
                .arg(&prefix),
        )?;

        let mut pages = Vec::new();
        for entry in fs::read_dir(scratch.path())? {
            let path = entry?.path();
            if let Some(number) = page_number(&path) {
                pages.push(PageImage { number, path });
            }
        }

        if pages.is_empty() {
            return Err(IngestError::external(
                "pdftoppm",
                format!("no pages rendered for {}", pdf.display()),
            ));
        }

        pages.sort_by_key(|page| page.number);
        Ok(RasterizedPdf::in_scratch(pages, scratch))
    }
}

/// Page number from `pdftoppm` output names such as `page-7.png` or `page-007.png`.
fn page_number(path: &Path) -> Option<u32> {
    let is_png = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    if !is_png {
        return None;
    }

    let stem = path.file_stem()?.to_str()?;
    let (_, digits) = stem.rsplit_once('-')?;
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::page_number;
    use std::path::Path;

    #[test]
    fn page_numbers_parse_with_and_without_padding() {
        assert_eq!(page_number(Path::new("/tmp/x/page-1.png")), Some(1));
        assert_eq!(page_number(Path::new("/tmp/x/page-012.png")), Some(12));
        assert_eq!(page_number(Path::new("/tmp/x/page-3.ppm")), None);
        assert_eq!(page_number(Path::new("/tmp/x/notes.png")), None);
    }
}
