//! OCR Engine
//!
//! Scanned-document recovery path: rasterize each PDF page with Poppler's
//! `pdftoppm`, then OCR each page image with the `tesseract` binary. Both
//! tools are external binaries with configurable paths; page images live in
//! a scratch directory that is released on all exit paths.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

use crate::config::OcrConfig;
use crate::types::{ClauseError, Result};

/// External-binary OCR pipeline (pdftoppm + tesseract)
pub struct OcrEngine {
    pdftoppm: PathBuf,
    tesseract: PathBuf,
    dpi: u32,
}

impl OcrEngine {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            pdftoppm: config.pdftoppm_path.clone(),
            tesseract: config.tesseract_path.clone(),
            dpi: config.dpi,
        }
    }

    /// Rasterize and OCR every page of `pdf_path`, concatenated with
    /// blank-line separators
    pub fn extract(&self, pdf_path: &Path) -> Result<String> {
        let scratch = tempfile::tempdir()?;
        let pages = self.rasterize(pdf_path, scratch.path())?;

        info!("OCR processing {} pages", pages.len());

        let mut full_text = String::new();
        for (index, page) in pages.iter().enumerate() {
            let text = self.ocr_page(page)?;
            full_text.push_str(&text);
            full_text.push_str("\n\n");
            debug!("page {}/{} OCR complete", index + 1, pages.len());
        }

        Ok(full_text)
    }

    /// Render each page to a PNG under `scratch`, returning the page images
    /// in page order
    fn rasterize(&self, pdf_path: &Path, scratch: &Path) -> Result<Vec<PathBuf>> {
        let prefix = scratch.join("page");

        let output = Command::new(&self.pdftoppm)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(pdf_path)
            .arg(&prefix)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                ClauseError::Extraction(format!(
                    "failed to run {}: {e}. Is Poppler installed?",
                    self.pdftoppm.display()
                ))
            })?;

        if !output.status.success() {
            return Err(ClauseError::Extraction(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let mut pages: Vec<PathBuf> = std::fs::read_dir(scratch)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
            .collect();
        pages.sort();

        if pages.is_empty() {
            return Err(ClauseError::Extraction(
                "pdftoppm produced no page images".to_string(),
            ));
        }

        Ok(pages)
    }

    fn ocr_page(&self, image: &Path) -> Result<String> {
        let output = Command::new(&self.tesseract)
            .arg(image)
            .arg("stdout")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                ClauseError::Extraction(format!(
                    "failed to run {}: {e}. Is Tesseract installed?",
                    self.tesseract.display()
                ))
            })?;

        if !output.status.success() {
            return Err(ClauseError::Extraction(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
