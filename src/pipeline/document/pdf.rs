//! PDF Text Extraction
//!
//! Hybrid extraction with OCR fallback:
//!
//! 1. Per page, take a geometry-aware primary pass (`pdf-extract`) and a
//!    table-aware secondary pass (`lopdf`); the secondary wins when its
//!    length reaches 0.9× the primary's.
//! 2. When the aggregate text is shorter than 100 characters the document
//!    is treated as scanned and re-extracted through OCR; an OCR failure
//!    yields a sentinel string instead of aborting.
//! 3. Any error in the hybrid pass falls back to a minimal
//!    single-extractor pass.

use lopdf::Document;
use std::path::Path;
use tracing::{error, info, warn};

use super::ocr::OcrEngine;
use crate::constants::document as doc_constants;
use crate::text::char_count;
use crate::types::{ClauseError, DocumentMetadata, Result};

/// PDF extraction front end
pub struct PdfProcessor {
    ocr: OcrEngine,
}

impl PdfProcessor {
    pub fn new(ocr: OcrEngine) -> Self {
        Self { ocr }
    }

    /// Extract raw text and base metadata from `path`
    pub fn extract_text(&self, path: &Path) -> Result<(String, DocumentMetadata)> {
        info!("Processing: {}", path.display());

        match self.primary_pass(path) {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!("Extraction failed ({e}); using fallback pass");
                self.fallback_extract(path)
            }
        }
    }

    fn primary_pass(&self, path: &Path) -> Result<(String, DocumentMetadata)> {
        let mut full_text = self.hybrid_extract(path)?;

        if char_count(full_text.trim()) < doc_constants::SCANNED_TEXT_THRESHOLD {
            info!(
                "Scanned document suspected (text < {} chars), switching to OCR",
                doc_constants::SCANNED_TEXT_THRESHOLD
            );
            full_text = match self.ocr.extract(path) {
                Ok(text) => text,
                Err(e) => {
                    error!("OCR extraction failed: {e}");
                    doc_constants::OCR_FAILED_SENTINEL.to_string()
                }
            };
        }

        let metadata = self.base_metadata(path)?;
        Ok((full_text, metadata))
    }

    /// Per-page extraction picking the better of two extractors
    fn hybrid_extract(&self, path: &Path) -> Result<String> {
        let primary_pages = pdf_extract::extract_text_by_pages(path)
            .map_err(|e| ClauseError::Extraction(format!("primary extractor: {e}")))?;

        let doc = Document::load(path)
            .map_err(|e| ClauseError::Extraction(format!("secondary extractor: {e}")))?;
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();

        let mut full_text = String::new();
        for (index, primary) in primary_pages.iter().enumerate() {
            let secondary = page_numbers
                .get(index)
                .and_then(|page| doc.extract_text(&[*page]).ok())
                .unwrap_or_default();

            full_text.push_str(choose_page_text(primary, &secondary));
            full_text.push_str("\n\n");
        }

        Ok(full_text)
    }

    /// Minimal single-extractor pass used when the hybrid path errors
    fn fallback_extract(&self, path: &Path) -> Result<(String, DocumentMetadata)> {
        let full_text = pdf_extract::extract_text(path)
            .map_err(|e| ClauseError::Extraction(format!("fallback extractor: {e}")))?;

        let file_size = std::fs::metadata(path)?.len();
        let page_count = Document::load(path)
            .map(|doc| doc.get_pages().len())
            .unwrap_or(0);

        warn!("Used fallback extraction");
        Ok((
            full_text,
            DocumentMetadata::new(filename_of(path), file_size, page_count),
        ))
    }

    /// Filename, size, page count, and a contract-type hint from the PDF
    /// document-info title
    fn base_metadata(&self, path: &Path) -> Result<DocumentMetadata> {
        let doc = Document::load(path)
            .map_err(|e| ClauseError::Extraction(format!("metadata pass: {e}")))?;

        let file_size = std::fs::metadata(path)?.len();
        let mut metadata = DocumentMetadata::new(filename_of(path), file_size, doc.get_pages().len());
        metadata.contract_type = document_title(&doc).and_then(|t| classify_title(&t));
        Ok(metadata)
    }
}

/// Pick the secondary extractor's page text when it reaches 0.9× the
/// primary's length; the primary otherwise
fn choose_page_text<'a>(primary: &'a str, secondary: &'a str) -> &'a str {
    if !secondary.trim().is_empty()
        && char_count(secondary) as f64
            >= char_count(primary) as f64 * doc_constants::SECONDARY_LENGTH_RATIO
    {
        secondary
    } else {
        primary
    }
}

fn filename_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Document-info `Title` entry, when present
fn document_title(doc: &Document) -> Option<String> {
    let info = doc.trailer.get(b"Info").ok()?;
    let info = match info {
        lopdf::Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    match info.as_dict().ok()?.get(b"Title").ok()? {
        lopdf::Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Contract-type hint from the document title
fn classify_title(title: &str) -> Option<String> {
    let lower = title.to_lowercase();
    if lower.contains("nda") || lower.contains("non-disclosure") {
        Some("NDA".to_string())
    } else if lower.contains("service") {
        Some("Service Agreement".to_string())
    } else if lower.contains("employment") {
        Some("Employment Contract".to_string())
    } else {
        None
    }
}
