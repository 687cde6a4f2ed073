//! Stage driver: extract → request → parse.
//!
//! [`Analyzer`] owns the three collaborators (text extractor, model client,
//! parser options) and runs them strictly in sequence: the model request never
//! starts before extraction has produced text. Each stage returns a typed
//! [`AnalysisError`]; turning that into a user-visible state is the job of
//! [`crate::session::AnalysisSession`].
//!
//! [`analyze`] and [`analyze_sync`] are the one-call entry points for
//! scripts that just want a report for a path or URL.

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, ExtractionError};
use crate::output::Analysis;
use crate::pipeline::client::{client_from_config, AnalysisRequest, ModelClient};
use crate::pipeline::extract::{ExtractedText, PdfiumExtractor, TextExtractor};
use crate::pipeline::input::{self, Document};
use crate::pipeline::parse::{parse_result, ParseOptions};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs the analysis stages with injectable collaborators.
#[derive(Clone)]
pub struct Analyzer {
    extractor: Arc<dyn TextExtractor>,
    client: Arc<dyn ModelClient>,
    parse: ParseOptions,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("client", &self.client.target())
            .field("parse", &self.parse)
            .finish()
    }
}

impl Analyzer {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        client: Arc<dyn ModelClient>,
        parse: ParseOptions,
    ) -> Self {
        Self {
            extractor,
            client,
            parse,
        }
    }

    /// pdfium extractor plus the client selected by [`client_from_config`].
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let extractor = PdfiumExtractor::new(config.max_pages, config.password.clone());
        let client = client_from_config(config)?;
        Ok(Self::new(
            Arc::new(extractor),
            client,
            ParseOptions::from(config),
        ))
    }

    pub fn client(&self) -> &Arc<dyn ModelClient> {
        &self.client
    }

    /// Stage 1: document → text.
    ///
    /// # Errors
    /// Any [`ExtractionError`], including [`ExtractionError::NoText`] when the
    /// extractor returns only whitespace.
    pub async fn extract(&self, document: &Document) -> Result<ExtractedText, AnalysisError> {
        let start = Instant::now();
        let extracted = self.extractor.extract(document).await?;
        if extracted.text.trim().is_empty() {
            return Err(ExtractionError::NoText {
                name: document.file_name().to_string(),
            }
            .into());
        }
        info!(
            "Extracted {} chars from {} ({}/{} pages) in {:?}",
            extracted.text.chars().count(),
            document.file_name(),
            extracted.pages_read,
            extracted.total_pages,
            start.elapsed()
        );
        Ok(extracted)
    }

    /// Stages 2 and 3: text → model → validated report.
    pub async fn analyze_text(&self, raw_text: &str) -> Result<Analysis, AnalysisError> {
        let request = AnalysisRequest::new(raw_text).ok_or_else(|| ExtractionError::NoText {
            name: "input text".to_string(),
        })?;

        let start = Instant::now();
        let envelope = self.client.send(&request.text).await?;
        let answer = envelope.into_answer()?;
        debug!(
            "Model answered in {:?}: {} chars, reasoning {}",
            start.elapsed(),
            answer.content.chars().count(),
            answer
                .reasoning
                .as_ref()
                .map(|r| format!("{} chars", r.chars().count()))
                .unwrap_or_else(|| "absent".to_string())
        );

        let result = parse_result(&answer.content, &self.parse)?;
        info!("Analysis complete: {} key findings", result.key_findings.len());
        Ok(Analysis {
            result,
            reasoning: answer.reasoning,
        })
    }

    /// All three stages without any state tracking.
    pub async fn analyze_document(&self, document: &Document) -> Result<Analysis, AnalysisError> {
        let extracted = self.extract(document).await?;
        self.analyze_text(&extracted.text).await.inspect_err(|e| {
            warn!("Analysis of {} failed: {}", document.file_name(), e);
        })
    }
}

/// Analyze a PDF file or URL.
///
/// This is the primary entry point for the library.
///
/// # Example
/// ```rust,no_run
/// use edgequake_paper_digest::{analyze, AnalysisConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AnalysisConfig::builder()
///     .api_key(std::env::var("API_KEY")?)
///     .build()?;
/// let analysis = analyze("paper.pdf", &config).await?;
/// println!("{}", analysis.result.overall_summary);
/// # Ok(())
/// # }
/// ```
pub async fn analyze(input_str: impl AsRef<str>, config: &AnalysisConfig) -> Result<Analysis, AnalysisError> {
    let input_str = input_str.as_ref();
    info!("Starting analysis: {}", input_str);

    let analyzer = Analyzer::from_config(config)?;
    let document = input::load_document(input_str, config.download_timeout_secs).await?;
    analyzer.analyze_document(&document).await
}

/// Analyze PDF bytes already in memory (e.g. an upload).
pub async fn analyze_bytes(
    file_name: impl Into<String>,
    bytes: Vec<u8>,
    config: &AnalysisConfig,
) -> Result<Analysis, AnalysisError> {
    let document = Document::from_bytes(file_name, bytes);
    document.ensure_pdf()?;
    Analyzer::from_config(config)?
        .analyze_document(&document)
        .await
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(input_str: impl AsRef<str>, config: &AnalysisConfig) -> Result<Analysis, AnalysisError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AnalysisError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(input_str, config))
}
