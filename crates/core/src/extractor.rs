use crate::error::IngestError;
use lopdf::Document;
use std::path::Path;
use tracing::warn;

/// Reads the text of every page of a PDF, in page order.
///
/// Pages without extractable text come back as empty strings so that the
/// position of each entry is its page number minus one.
pub trait PdfExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, IngestError> {
        let document = Document::load(path)
            .map_err(|error| IngestError::PdfParse(format!("{}: {error}", path.display())))?;

        let mut pages = Vec::new();
        for page_no in document.get_pages().into_keys() {
            match document.extract_text(&[page_no]) {
                Ok(text) => pages.push(text),
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        page = page_no,
                        %error,
                        "page has no extractable text"
                    );
                    pages.push(String::new());
                }
            }
        }

        Ok(pages)
    }
}

pub fn load_pdf_pages(path: &Path) -> Result<Vec<String>, IngestError> {
    LopdfExtractor.extract_pages(path)
}
