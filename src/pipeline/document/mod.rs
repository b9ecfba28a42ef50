//! Document Processor (Stage 1)
//!
//! Bytes → cleaned text + metadata + definitions + ordered semantic
//! chunks. Extraction is hybrid with an OCR fallback for scanned
//! documents; the OCR path degrades to a sentinel string rather than
//! aborting, while fatal I/O errors bubble up as job failure.

mod chunker;
mod definitions;
mod metadata;
mod ocr;
mod pdf;

pub use chunker::SemanticChunker;
pub use definitions::DefinitionExtractor;
pub use metadata::MetadataExtractor;
pub use ocr::OcrEngine;
pub use pdf::PdfProcessor;

use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument};

use crate::config::Config;
use crate::rag::embedding::SharedEmbedder;
use crate::text::clean_text;
use crate::types::{ProcessedDocument, Result};

/// Stage 1 front end
pub struct DocumentProcessor {
    pdf: PdfProcessor,
    chunker: SemanticChunker,
}

impl DocumentProcessor {
    pub fn new(config: &Config, embedder: SharedEmbedder) -> Self {
        Self {
            pdf: PdfProcessor::new(OcrEngine::from_config(&config.ocr)),
            chunker: SemanticChunker::new(embedder, config.chunking.clone()),
        }
    }

    /// Run the full Stage 1 pass over one PDF
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn process(&self, path: &Path) -> Result<ProcessedDocument> {
        let start = Instant::now();

        let (raw_text, base_metadata) = self.pdf.extract_text(path)?;
        let full_text = clean_text(&raw_text);
        info!(
            "Step 1/4: extracted {} characters",
            crate::text::char_count(&full_text)
        );

        let metadata = MetadataExtractor::extract(&full_text, base_metadata);
        info!("Step 2/4: metadata extracted");

        let definitions = DefinitionExtractor::extract(&full_text);
        info!("Step 3/4: found {} definitions", definitions.len());

        let chunks = self.chunker.chunk_text(&full_text)?;
        info!("Step 4/4: created {} semantic chunks", chunks.len());

        let avg_chunk_length = if chunks.is_empty() {
            0.0
        } else {
            chunks.iter().map(|c| c.word_count as f64).sum::<f64>() / chunks.len() as f64
        };
        let processing_time = start.elapsed().as_secs_f64();

        Ok(ProcessedDocument {
            total_chunks: chunks.len(),
            avg_chunk_length,
            processing_time_seconds: (processing_time * 100.0).round() / 100.0,
            metadata,
            full_text,
            definitions,
            chunks,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::rag::embedding::{EMBEDDING_DIMENSIONS, HashEmbedder};
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};
    use std::path::PathBuf;
    use std::sync::Arc;

    /// Build a single-page text PDF fixture containing `lines`
    pub(crate) fn write_fixture_pdf(path: &PathBuf, lines: &[&str]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("Td", vec![36.into(), 750.into()]),
            Operation::new("TL", vec![14.into()]),
        ];
        for line in lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).expect("save fixture pdf");
    }

    fn processor() -> DocumentProcessor {
        let embedder: SharedEmbedder = Arc::new(HashEmbedder::new(EMBEDDING_DIMENSIONS));
        DocumentProcessor::new(&Config::default(), embedder)
    }

    #[test]
    fn test_process_plain_text_pdf() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("contract.pdf");
        write_fixture_pdf(
            &path,
            &[
                "This Service Agreement is made by and between Acme Corporation",
                "and Vendor Inc, dated January 1, 2024. Company may terminate",
                "this Agreement at any time without cause or notice to the",
                "Contractor under any circumstances whatsoever in its sole",
                "discretion. Contractor shall be liable for all damages without",
                "limitation arising from any breach of these detailed terms.",
            ],
        );

        let doc = processor().process(&path).expect("process");

        assert_eq!(doc.metadata.filename, "contract.pdf");
        assert_eq!(doc.metadata.page_count, 1);
        assert!(doc.metadata.file_size > 0);
        assert!(doc.full_text.contains("terminate"));
        assert_eq!(doc.total_chunks, doc.chunks.len());
        assert!(doc.processing_time_seconds >= 0.0);

        // Chunk invariants: ordered, span-bounded, in-range
        let total = crate::text::char_count(&doc.full_text);
        for chunk in &doc.chunks {
            assert!(chunk.start_char <= chunk.end_char);
            assert!(chunk.end_char <= total);
            assert!(!chunk.text.trim().is_empty());
        }
    }

    #[test]
    fn test_process_missing_file_fails_job() {
        let err = processor().process(Path::new("/nonexistent/contract.pdf"));
        assert!(err.is_err());
    }

    #[test]
    fn test_short_extraction_with_failing_ocr_yields_sentinel() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scanned.pdf");
        // Under 100 characters of extractable text: the scanned-document
        // path engages
        write_fixture_pdf(&path, &["page 1"]);

        let mut config = Config::default();
        config.ocr.pdftoppm_path = "/nonexistent/pdftoppm".into();
        config.ocr.tesseract_path = "/nonexistent/tesseract".into();

        let embedder: SharedEmbedder = Arc::new(HashEmbedder::new(EMBEDDING_DIMENSIONS));
        let doc = DocumentProcessor::new(&config, embedder)
            .process(&path)
            .expect("process");

        assert!(doc.full_text.starts_with("OCR FAILED"));
        // The sentinel flows through as a single low-signal chunk
        assert_eq!(doc.chunks.len(), 1);
        assert!(doc.chunks[0].text.starts_with("OCR FAILED"));
    }
}
