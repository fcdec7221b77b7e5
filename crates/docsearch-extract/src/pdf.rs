//! PDF extractor
//!
//! Reads the text layer page by page and emits one document per
//! non-blank page. No OCR is attempted.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use docsearch_core::{source_name, DocSearchError, Document, Result};
use tracing::{debug, warn};

use crate::Extractor;

/// Reads the text layer of a PDF, one string per page in page order
pub trait PageReader: Send + Sync {
    fn pages(&self, bytes: &[u8]) -> std::result::Result<Vec<String>, String>;
}

/// `PageReader` backed by lopdf
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfPageReader;

impl PageReader for LopdfPageReader {
    fn pages(&self, bytes: &[u8]) -> std::result::Result<Vec<String>, String> {
        let document = lopdf::Document::load_mem(bytes).map_err(|e| e.to_string())?;

        // Page numbers from get_pages are 1-based and ordered
        let pages = document
            .get_pages()
            .keys()
            .map(|&number| match document.extract_text(&[number]) {
                Ok(text) => text,
                Err(e) => {
                    warn!(page = number, error = %e, "Failed to extract page text, treating as blank");
                    String::new()
                }
            })
            .collect();

        Ok(pages)
    }
}

/// Extractor for PDF files
pub struct PdfExtractor {
    reader: Arc<dyn PageReader>,
}

impl PdfExtractor {
    /// Create a PDF extractor using lopdf
    pub fn new() -> Self {
        Self::with_reader(LopdfPageReader)
    }

    /// Create a PDF extractor with a custom page reader
    pub fn with_reader<R: PageReader + 'static>(reader: R) -> Self {
        Self {
            reader: Arc::new(reader),
        }
    }

    /// Text of every page, blank pages included
    pub async fn read_pages(&self, path: &Path) -> Result<Vec<String>> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DocSearchError::source_unavailable(path, e))?;

        let reader = Arc::clone(&self.reader);
        tokio::task::spawn_blocking(move || reader.pages(&bytes))
            .await
            .map_err(|e| DocSearchError::extraction_failed(path, format!("task join error: {e}")))?
            .map_err(|reason| DocSearchError::extraction_failed(path, reason))
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for PdfExtractor {
    async fn extract(&self, path: &Path) -> Result<Vec<Document>> {
        debug!(path = %path.display(), "Extracting PDF");

        let pages = self.read_pages(path).await?;
        let page_count = pages.len();
        let source = source_name(path);

        // Blank pages are skipped without renumbering the rest
        let documents: Vec<Document> = pages
            .into_iter()
            .zip(1u32..)
            .filter_map(|(text, page)| {
                Document::new(text, source.as_str()).map(|doc| doc.with_page(page))
            })
            .collect();

        debug!(
            path = %path.display(),
            pages = page_count,
            documents = documents.len(),
            "PDF extracted"
        );

        Ok(documents)
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

/// Render pages as a plain-text dump with a `--- Page N ---` header per page
pub fn render_page_dump(pages: &[String]) -> String {
    let mut dump = String::new();
    for (text, page) in pages.iter().zip(1u32..) {
        dump.push_str(&format!("--- Page {page} ---\n"));
        dump.push_str(text);
        dump.push_str("\n\n");
    }
    dump
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct FixedPages(Vec<&'static str>);

    impl PageReader for FixedPages {
        fn pages(&self, _bytes: &[u8]) -> std::result::Result<Vec<String>, String> {
            Ok(self.0.iter().map(|p| p.to_string()).collect())
        }
    }

    fn temp_pdf(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[tokio::test]
    async fn test_blank_pages_are_skipped_without_renumbering() {
        let file = temp_pdf(b"%PDF-1.4");
        let extractor = PdfExtractor::with_reader(FixedPages(vec!["hello", "", "world"]));

        let documents = extractor.extract(file.path()).await.unwrap();

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].content(), "hello");
        assert_eq!(documents[0].page_number(), Some(1));
        assert_eq!(documents[1].content(), "world");
        assert_eq!(documents[1].page_number(), Some(3));
    }

    #[tokio::test]
    async fn test_whitespace_pages_are_skipped() {
        let file = temp_pdf(b"%PDF-1.4");
        let extractor = PdfExtractor::with_reader(FixedPages(vec![" \n ", "\t", "text"]));

        let documents = extractor.extract(file.path()).await.unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].page_number(), Some(3));
    }

    #[tokio::test]
    async fn test_source_is_base_name() {
        let file = temp_pdf(b"%PDF-1.4");
        let extractor = PdfExtractor::with_reader(FixedPages(vec!["hello"]));

        let documents = extractor.extract(file.path()).await.unwrap();
        let expected = file.path().file_name().unwrap().to_str().unwrap();

        assert_eq!(documents[0].source(), expected);
    }

    #[tokio::test]
    async fn test_missing_file_is_source_unavailable() {
        let extractor = PdfExtractor::with_reader(FixedPages(vec!["hello"]));

        let err = extractor
            .extract(Path::new("/nonexistent/manual.pdf"))
            .await
            .unwrap_err();

        assert!(matches!(err, DocSearchError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_extraction_failed() {
        let file = temp_pdf(b"not a valid pdf");
        let extractor = PdfExtractor::new();

        let err = extractor.extract(file.path()).await.unwrap_err();

        assert!(matches!(err, DocSearchError::ExtractionFailed { .. }));
    }

    #[tokio::test]
    async fn test_read_pages_keeps_blank_pages() {
        let file = temp_pdf(b"%PDF-1.4");
        let extractor = PdfExtractor::with_reader(FixedPages(vec!["a", "", "b"]));

        let pages = extractor.read_pages(file.path()).await.unwrap();
        assert_eq!(pages, vec!["a", "", "b"]);
    }

    #[test]
    fn test_render_page_dump() {
        let dump = render_page_dump(&["first".to_string(), String::new()]);
        assert_eq!(dump, "--- Page 1 ---\nfirst\n\n--- Page 2 ---\n\n\n");
    }

    #[test]
    fn test_extractor_name() {
        assert_eq!(PdfExtractor::new().name(), "pdf");
    }
}
