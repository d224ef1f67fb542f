use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Page texts in document order; a page without a text layer yields "".
    pub fn extract_pages(&self, data: &[u8]) -> anyhow::Result<Vec<String>> {
        // pdf-extract panics on some malformed inputs instead of returning an error
        let extraction = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(data)
        }));

        match extraction {
            Ok(Ok(pages)) => {
                debug!(pages = pages.len(), "extracted pdf text");
                Ok(pages)
            }
            Ok(Err(err)) => Err(anyhow::anyhow!("pdf extraction failed: {err}")),
            Err(_) => Err(anyhow::anyhow!("pdf extraction aborted on malformed input")),
        }
    }

    pub fn extract_text(&self, data: &[u8]) -> anyhow::Result<String> {
        Ok(self.extract_pages(data)?.concat())
    }
}

impl Default for PdfTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::pdf_with_pages;

    #[test]
    fn blank_page_yields_empty_text_and_order_is_kept() {
        let data = pdf_with_pages(&[Some("Senior Rust Engineer"), None, Some("Costa Rica")]);
        let extractor = PdfTextExtractor::new();

        let pages = extractor.extract_pages(&data).unwrap();
        assert_eq!(pages.len(), 3);
        assert!(pages[0].contains("Senior Rust Engineer"), "{pages:?}");
        assert_eq!(pages[1], "");
        assert!(pages[2].contains("Costa Rica"), "{pages:?}");

        let text = extractor.extract_text(&data).unwrap();
        assert_eq!(text, pages.concat());
    }

    #[test]
    fn garbage_bytes_are_an_error_not_a_panic() {
        let extractor = PdfTextExtractor::new();
        assert!(extractor.extract_text(b"definitely not a pdf").is_err());
    }
}
