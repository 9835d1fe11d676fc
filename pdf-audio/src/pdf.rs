// PDF loading and per-page text extraction

use crate::error::ConvertError;
use lopdf::Document;
use std::path::{Path, PathBuf};

/// A paged document whose text can be pulled out page range by page range.
pub trait TextSource {
    /// Number of pages in the document
    fn page_count(&self) -> usize;

    /// Concatenated text of pages `start..end` (0-based, end exclusive).
    ///
    /// `end` is capped at the page count. Pages without extractable text
    /// contribute nothing, so the result may be empty.
    fn extract(&self, start: usize, end: usize) -> String;
}

/// A PDF opened with lopdf
pub struct PdfDocument {
    path: PathBuf,
    doc: Document,
    /// lopdf page numbers in reading order
    page_numbers: Vec<u32>,
}

impl PdfDocument {
    /// Open and parse a PDF file
    pub fn open(path: &Path) -> Result<Self, ConvertError> {
        if !path.exists() {
            return Err(ConvertError::MissingDocument(path.to_path_buf()));
        }

        let doc = Document::load(path).map_err(|e| ConvertError::Extraction {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // get_pages is keyed by page number, so the keys are already ordered
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        log::debug!("Opened {} ({} pages)", path.display(), page_numbers.len());

        Ok(Self {
            path: path.to_path_buf(),
            doc,
            page_numbers,
        })
    }

    fn page_text(&self, page_number: u32) -> String {
        match self.doc.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                log::warn!(
                    "No text extracted from page {} of {}: {}",
                    page_number,
                    self.path.display(),
                    e
                );
                String::new()
            }
        }
    }
}

impl TextSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn extract(&self, start: usize, end: usize) -> String {
        let end = end.min(self.page_numbers.len());
        let start = start.min(end);

        self.page_numbers[start..end]
            .iter()
            .map(|&page| self.page_text(page))
            .collect()
    }
}
