//! Text extraction: turn PDF bytes into plain text via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to drive from async contexts. Extraction runs on the
//! blocking pool so Tokio worker threads never stall on a large document.
//!
//! ## Why a page cap?
//!
//! The whole text goes into a single model request. Capping the number of
//! pages (default 10) keeps the prompt inside typical context windows; the
//! first pages of a paper carry the abstract, methods and results.

use crate::error::ExtractionError;
use crate::pipeline::input::Document;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Plain text pulled out of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    /// Pages whose text is included in `text`.
    pub pages_read: usize,
    /// Pages in the document.
    pub total_pages: usize,
}

/// Produces plain text from a document, or fails.
///
/// The pipeline only depends on this trait, so tests and embedders can swap
/// pdfium for any other extractor.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, document: &Document) -> Result<ExtractedText, ExtractionError>;
}

/// pdfium-backed extractor reading at most `max_pages` pages.
#[derive(Debug, Clone)]
pub struct PdfiumExtractor {
    max_pages: usize,
    password: Option<String>,
    library_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    /// Binds to `PDFIUM_LIB_PATH` when set, otherwise to the system library.
    pub fn new(max_pages: usize, password: Option<String>) -> Self {
        Self {
            max_pages: max_pages.max(1),
            password,
            library_path: std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from),
        }
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }
}

#[async_trait]
impl TextExtractor for PdfiumExtractor {
    async fn extract(&self, document: &Document) -> Result<ExtractedText, ExtractionError> {
        document.ensure_pdf()?;

        let name = document.file_name().to_string();
        let bytes = document.bytes().to_vec();
        let max_pages = self.max_pages;
        let password = self.password.clone();
        let library_path = self.library_path.clone();

        tokio::task::spawn_blocking(move || {
            extract_blocking(
                &name,
                &bytes,
                max_pages,
                password.as_deref(),
                library_path.as_deref(),
            )
        })
        .await
        .map_err(|e| ExtractionError::Internal(format!("Extraction task panicked: {}", e)))?
    }
}

fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, ExtractionError> {
    let bindings = match library_path {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ExtractionError::PdfiumBindingFailed(format!("{:?}", e)))?;
    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of text extraction.
fn extract_blocking(
    name: &str,
    bytes: &[u8],
    max_pages: usize,
    password: Option<&str>,
    library_path: Option<&Path>,
) -> Result<ExtractedText, ExtractionError> {
    let pdfium = bind_pdfium(library_path)?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    ExtractionError::WrongPassword {
                        name: name.to_string(),
                    }
                } else {
                    ExtractionError::PasswordRequired {
                        name: name.to_string(),
                    }
                }
            } else {
                ExtractionError::CorruptPdf {
                    name: name.to_string(),
                    detail: err_str,
                }
            }
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages, reading up to {}", total_pages, max_pages);

    let mut page_texts = Vec::with_capacity(total_pages.min(max_pages));
    for (idx, page) in pages.iter().enumerate().take(max_pages) {
        let text = page
            .text()
            .map_err(|e| ExtractionError::CorruptPdf {
                name: name.to_string(),
                detail: format!("page {}: {:?}", idx + 1, e),
            })?
            .all();
        debug!("Page {}: {} chars", idx + 1, text.chars().count());
        page_texts.push(text);
    }

    let pages_read = page_texts.len();
    let text = join_pages(&page_texts);
    if text.is_empty() {
        return Err(ExtractionError::NoText {
            name: name.to_string(),
        });
    }

    Ok(ExtractedText {
        text,
        pages_read,
        total_pages,
    })
}

/// Join per-page text with blank lines, dropping pages with no text.
fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_pages_skips_blank_pages() {
        let pages = vec![
            "  Abstract  ".to_string(),
            "\n\n".to_string(),
            "Methods".to_string(),
        ];
        assert_eq!(join_pages(&pages), "Abstract\n\nMethods");
    }

    #[test]
    fn join_pages_all_blank_is_empty() {
        assert_eq!(join_pages(&[String::new(), " ".into()]), "");
    }

    #[test]
    fn max_pages_never_zero() {
        let e = PdfiumExtractor::new(0, None);
        assert_eq!(e.max_pages, 1);
    }

    #[tokio::test]
    async fn rejects_non_pdf_before_binding_pdfium() {
        let e = PdfiumExtractor::new(5, None);
        let doc = Document::from_bytes("image.png", b"\x89PNG\r\n".to_vec());
        let err = e.extract(&doc).await.unwrap_err();
        assert!(matches!(err, ExtractionError::NotAPdf { .. }));
    }
}
