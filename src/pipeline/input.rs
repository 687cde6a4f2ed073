//! Input resolution: turn a user-supplied path or URL into a [`Document`].
//!
//! The document is held in memory (pdfium can load from a byte slice) and
//! its PDF magic bytes (`%PDF`) are checked up front so callers get a
//! meaningful error rather than a pdfium parse failure.

use crate::error::ExtractionError;
use std::path::Path;
use tracing::{debug, info};

/// An uploaded document: its display name and raw bytes.
#[derive(Clone)]
pub struct Document {
    file_name: String,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl Document {
    /// Wrap bytes that are already in memory (e.g. an HTTP upload).
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Check the `%PDF` magic bytes.
    pub fn ensure_pdf(&self) -> Result<(), ExtractionError> {
        if self.bytes.starts_with(b"%PDF") {
            Ok(())
        } else {
            Err(ExtractionError::NotAPdf {
                name: self.file_name.clone(),
                magic: self.bytes.iter().take(4).copied().collect(),
            })
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a validated in-memory PDF.
///
/// If the input is a URL, download it. If the input is a local file,
/// validate it exists and is readable.
pub async fn load_document(input: &str, timeout_secs: u64) -> Result<Document, ExtractionError> {
    if input.trim().is_empty() {
        return Err(ExtractionError::InvalidInput {
            input: input.to_string(),
        });
    }
    let document = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(Path::new(input)).await?
    };
    document.ensure_pdf()?;
    Ok(document)
}

/// Read a local file, mapping I/O failures to extraction errors.
async fn read_local(path: &Path) -> Result<Document, ExtractionError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ExtractionError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ExtractionError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(Document::from_bytes(file_name_of(path), bytes))
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Document, ExtractionError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ExtractionError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ExtractionError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ExtractionError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ExtractionError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ExtractionError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(Document::from_bytes(filename_from_url(url), bytes.to_vec()))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Extract a reasonable filename from the URL path.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(filename_from_url("https://arxiv.org/pdf/1706.03762"), "1706.03762");
        assert_eq!(filename_from_url("https://example.com/papers/x.pdf"), "x.pdf");
        assert_eq!(filename_from_url("https://example.com/"), "downloaded.pdf");
    }

    #[test]
    fn test_ensure_pdf_rejects_other_bytes() {
        let doc = Document::from_bytes("notes.txt", b"hello".to_vec());
        match doc.ensure_pdf() {
            Err(ExtractionError::NotAPdf { name, magic }) => {
                assert_eq!(name, "notes.txt");
                assert_eq!(magic, b"hell".to_vec());
            }
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = load_document("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, ExtractionError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_load_local_pdf_keeps_file_name() {
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        tmp.write_all(b"%PDF-1.7\n%fake").unwrap();
        let path = tmp.path().to_string_lossy().to_string();

        let doc = load_document(&path, 5).await.unwrap();
        assert!(doc.file_name().ends_with(".pdf"));
        assert!(doc.bytes().starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_load_blank_input() {
        let err = load_document("  ", 5).await.unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidInput { .. }));
    }
}
