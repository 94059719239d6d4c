//! Page-level access to source documents.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use lopdf::Document;
use tracing::{debug, instrument};

use payslip_shared::{PayslipError, Result};

/// Read access to the pages of a document, 0-based.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Text of one page. Callers treat an error as an empty page.
    fn page_text(&self, index: usize) -> Result<String>;
}

/// Produces a new document holding a subset of the source pages.
pub trait PageWriter {
    /// Render the pages at `pages` (0-based, ascending) as a standalone document.
    fn render_subset(&self, pages: &[usize]) -> Result<Vec<u8>>;
}

/// A PDF loaded in memory.
pub struct PdfDocument {
    path: PathBuf,
    doc: Document,
    /// PDF page numbers (1-based) in document order.
    page_numbers: Vec<u32>,
}

impl PdfDocument {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self> {
        let doc = Document::load(path)
            .map_err(|e| PayslipError::Pdf(format!("{}: {e}", path.display())))?;
        Ok(Self::from_document(path.to_path_buf(), doc))
    }

    pub fn from_bytes(label: impl Into<PathBuf>, bytes: &[u8]) -> Result<Self> {
        let path = label.into();
        let doc = Document::load_mem(bytes)
            .map_err(|e| PayslipError::Pdf(format!("{}: {e}", path.display())))?;
        Ok(Self::from_document(path, doc))
    }

    fn from_document(path: PathBuf, doc: Document) -> Self {
        let page_numbers: Vec<u32> = doc.get_pages().into_keys().collect();
        debug!(path = %path.display(), pages = page_numbers.len(), "pdf loaded");
        Self {
            path,
            doc,
            page_numbers,
        }
    }

    fn page_number(&self, index: usize) -> Result<u32> {
        self.page_numbers.get(index).copied().ok_or_else(|| {
            PayslipError::Pdf(format!(
                "{}: page {index} out of range ({} pages)",
                self.path.display(),
                self.page_numbers.len()
            ))
        })
    }
}

impl PageSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn page_text(&self, index: usize) -> Result<String> {
        let number = self.page_number(index)?;
        self.doc.extract_text(&[number]).map_err(|e| {
            PayslipError::Pdf(format!("{}: page {}: {e}", self.path.display(), index + 1))
        })
    }
}

impl PageWriter for PdfDocument {
    fn render_subset(&self, pages: &[usize]) -> Result<Vec<u8>> {
        let keep: BTreeSet<u32> = pages
            .iter()
            .map(|&index| self.page_number(index))
            .collect::<Result<_>>()?;
        let delete: Vec<u32> = self
            .page_numbers
            .iter()
            .copied()
            .filter(|n| !keep.contains(n))
            .collect();

        let mut subset = self.doc.clone();
        subset.delete_pages(&delete);
        subset.prune_objects();

        let mut buffer = Vec::new();
        subset
            .save_to(&mut buffer)
            .map_err(|e| PayslipError::Pdf(format!("{}: save failed: {e}", self.path.display())))?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_pdf;

    #[test]
    fn counts_pages() {
        let bytes = sample_pdf(&["one", "two", "three"]);
        let doc = PdfDocument::from_bytes("sample.pdf", &bytes).unwrap();
        assert_eq!(doc.page_count(), 3);
    }

    #[test]
    fn extracts_page_text() {
        let bytes = sample_pdf(&["DUPONT Marie", "MARTIN Paul"]);
        let doc = PdfDocument::from_bytes("sample.pdf", &bytes).unwrap();
        assert!(doc.page_text(1).unwrap().contains("MARTIN"));
        assert!(doc.page_text(5).is_err());
    }

    #[test]
    fn subset_keeps_original_page_content() {
        let bytes = sample_pdf(&["first", "second", "third", "fourth"]);
        let doc = PdfDocument::from_bytes("sample.pdf", &bytes).unwrap();

        let subset = doc.render_subset(&[1, 3]).unwrap();
        let rendered = Document::load_mem(&subset).unwrap();
        let pages = rendered.get_pages();
        assert_eq!(pages.len(), 2);

        let original = doc.doc.get_pages();
        let source_content = doc.doc.get_page_content(original[&2]).unwrap();
        let kept_content = rendered.get_page_content(pages[&1]).unwrap();
        assert_eq!(kept_content, source_content);

        let source_content = doc.doc.get_page_content(original[&4]).unwrap();
        let kept_content = rendered.get_page_content(pages[&2]).unwrap();
        assert_eq!(kept_content, source_content);
    }

    #[test]
    fn subset_rejects_unknown_page() {
        let bytes = sample_pdf(&["only"]);
        let doc = PdfDocument::from_bytes("sample.pdf", &bytes).unwrap();
        assert!(doc.render_subset(&[0, 1]).is_err());
    }

    #[test]
    fn unreadable_file_is_a_pdf_error() {
        let result = PdfDocument::from_bytes("broken.pdf", b"not a pdf");
        assert!(matches!(result, Err(PayslipError::Pdf(_))));
    }
}
