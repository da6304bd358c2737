//! PDF text extraction module
//!
//! Extracts text content from PDF files using lopdf.

use crate::errors::IngestionError;
use std::path::Path;
use tracing::{debug, warn};

/// Extract the text of every page, in page order, one page per line block
pub fn extract_text_from_pdf(path: &Path) -> Result<String, IngestionError> {
    let doc = lopdf::Document::load(path).map_err(|e| IngestionError::PdfParseError {
        path: path.display().to_string(),
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    let mut page_texts = Vec::with_capacity(pages.len());

    debug!(page_count = pages.len(), "Extracting text from PDF");

    // get_pages is keyed by page number, so iteration is in reading order
    for page_num in pages.keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(page_text) => page_texts.push(clean_text(&page_text)),
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to extract text from page, skipping");
                page_texts.push(String::new());
            }
        }
    }

    let text = page_texts.join("\n");

    debug!(text_len = text.len(), "Text extraction complete");

    Ok(text)
}

/// Clean the text of a single page
fn clean_text(text: &str) -> String {
    text
        // Replace multiple whitespace with single space
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        // Remove BOM artifacts
        .replace('\u{FEFF}', "")
        // Normalize quotes
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}
