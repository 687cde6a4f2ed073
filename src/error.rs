//! Error types for the edgequake-paper-digest library.
//!
//! Two layers reflect the two places an analysis can break:
//!
//! * [`ExtractionError`]: the document never became text (missing file,
//!   not a PDF, encrypted, scanned-only pages, pdfium unavailable).
//!
//! * [`AnalysisError`]: the full taxonomy surfaced by the pipeline. It
//!   wraps extraction failures and adds everything that can go wrong between
//!   "we have text" and "we have a validated report": missing credential,
//!   network failure, upstream HTTP status, empty model response, malformed
//!   model output.
//!
//! Network failures and HTTP-status failures map to different
//! [`Remedy`] values (see [`AnalysisError::remedy`]).

use std::path::PathBuf;
use thiserror::Error;

/// Longest upstream body excerpt rendered in an error message.
const BODY_EXCERPT_CHARS: usize = 300;

/// All errors returned by the edgequake-paper-digest library.
#[derive(Debug, Error)]
pub enum AnalysisError {
    // ── Extraction ────────────────────────────────────────────────────────
    /// The document could not be turned into text.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    // ── Model client ──────────────────────────────────────────────────────
    /// No credential is available for the completion endpoint.
    ///
    /// Raised before any network I/O happens.
    #[error("No API credential is configured.\n{hint}")]
    CredentialMissing { hint: String },

    /// The request never produced an HTTP response (DNS, connect, TLS,
    /// timeout, truncated body).
    #[error("Network failure contacting '{endpoint}': {detail}\nCheck your internet connection and try again.")]
    NetworkFailure { endpoint: String, detail: String },

    /// The endpoint answered with a non-2xx status.
    #[error("Upstream API request failed (HTTP {status}): {}", excerpt(body))]
    UpstreamHttp { status: u16, body: String },

    /// The response envelope contained no usable choice.
    #[error("The model produced no result. Resubmit the document to try again.")]
    EmptyResponse,

    /// The answer could not be decoded into an analysis report.
    ///
    /// `snippet` holds the first characters of the raw answer for operators;
    /// it is deliberately kept out of the display string.
    #[error("The model returned a malformed report ({reason}). Resubmit the document to try again.")]
    MalformedOutput { reason: String, snippet: String },

    /// An `edgequake-llm` provider returned an error.
    #[error("LLM provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a document could not be turned into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes are not a PDF.
    #[error("'{name}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: Vec<u8> },

    /// PDF requires a password but none was provided.
    #[error("'{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for '{name}'")]
    WrongPassword { name: String },

    /// pdfium could not parse the document.
    #[error("PDF '{name}' is corrupt: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// Every page was read but no text came out (scanned images, empty file).
    #[error("No extractable text in '{name}'\nScanned PDFs must be OCR'd before analysis.")]
    NoText { name: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install pdfium system-wide or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    /// Unexpected failure inside the extractor.
    #[error("Extraction failed: {0}")]
    Internal(String),
}

/// What the user should do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remedy {
    /// The document itself is the problem: pick another file or fix it.
    CheckDocument,
    /// Nothing reached the server: check connectivity.
    CheckConnectivity,
    /// The deployment is misconfigured: credential, endpoint, model.
    CheckConfiguration,
    /// The model misbehaved this time: submit again.
    Resubmit,
}

impl AnalysisError {
    /// Map this failure to the remedy a user should try first.
    pub fn remedy(&self) -> Remedy {
        match self {
            AnalysisError::Extraction(ExtractionError::DownloadFailed { .. })
            | AnalysisError::Extraction(ExtractionError::DownloadTimeout { .. }) => {
                Remedy::CheckConnectivity
            }
            AnalysisError::Extraction(ExtractionError::PdfiumBindingFailed(_)) => {
                Remedy::CheckConfiguration
            }
            AnalysisError::Extraction(_) => Remedy::CheckDocument,
            AnalysisError::NetworkFailure { .. } => Remedy::CheckConnectivity,
            AnalysisError::UpstreamHttp { status, .. } if *status == 429 || *status >= 500 => {
                Remedy::Resubmit
            }
            AnalysisError::UpstreamHttp { .. }
            | AnalysisError::CredentialMissing { .. }
            | AnalysisError::InvalidConfig(_) => Remedy::CheckConfiguration,
            AnalysisError::EmptyResponse
            | AnalysisError::MalformedOutput { .. }
            | AnalysisError::Provider { .. }
            | AnalysisError::Internal(_) => Remedy::Resubmit,
        }
    }
}

/// First `BODY_EXCERPT_CHARS` characters of an upstream body, single-line.
fn excerpt(body: &str) -> String {
    let flat = body.trim().replace(['\r', '\n'], " ");
    if flat.chars().count() > BODY_EXCERPT_CHARS {
        let head: String = flat.chars().take(BODY_EXCERPT_CHARS).collect();
        format!("{head}\u{2026}")
    } else {
        flat
    }
}
