//! Streaming API: yield state snapshots as the analysis progresses.
//!
//! ## Why stream?
//!
//! A reasoning model can think for minutes. A stream of snapshots lets a
//! caller show "reading…" and "analyzing…" immediately and render the report
//! the moment the `Completed` snapshot arrives, without implementing
//! [`StateObserver`] itself.
//!
//! The session runs on a spawned task; its observer forwards each snapshot
//! into a bounded channel. The stream ends after the final `Completed` or
//! `Failed` snapshot.

use crate::analyze::Analyzer;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::pipeline::input::Document;
use crate::progress::StateObserver;
use crate::session::AnalysisSession;
use crate::state::ProcessingState;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{info, warn};

/// A boxed stream of state snapshots.
pub type StateStream = Pin<Box<dyn Stream<Item = ProcessingState> + Send>>;

/// One analysis publishes at most four snapshots.
const CHANNEL_CAPACITY: usize = 8;

struct ChannelObserver {
    tx: mpsc::Sender<ProcessingState>,
}

impl StateObserver for ChannelObserver {
    fn on_state(&self, state: &ProcessingState) {
        if let Err(e) = self.tx.try_send(state.clone()) {
            warn!("Dropped {} snapshot: {}", state.status(), e);
        }
    }
}

/// Analyze a PDF file or URL, streaming snapshots.
///
/// # Errors
/// Only configuration errors are returned here; stage failures arrive as a
/// `Failed` snapshot.
///
/// # Example
/// ```rust,no_run
/// use edgequake_paper_digest::{analyze_stream, AnalysisConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AnalysisConfig::builder().api_key("sk-…").build()?;
/// let mut states = analyze_stream("paper.pdf", &config).await?;
/// while let Some(state) = states.next().await {
///     eprintln!("{}", state.status());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn analyze_stream(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<StateStream, AnalysisError> {
    let input_str = input_str.as_ref().to_string();
    info!("Starting streaming analysis: {}", input_str);

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let mut session =
        AnalysisSession::from_config(config)?.with_observer(Arc::new(ChannelObserver { tx }));

    tokio::spawn(async move {
        if let Err(e) = session.submit_input(&input_str).await {
            warn!("Streaming analysis rejected: {}", e);
        }
    });

    Ok(Box::pin(ReceiverStream::new(rx)))
}

/// Analyze an in-memory document with a ready-made [`Analyzer`], streaming
/// snapshots.
pub fn analyze_document_stream(analyzer: Analyzer, document: Document) -> StateStream {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let mut session = AnalysisSession::new(analyzer).with_observer(Arc::new(ChannelObserver { tx }));

    tokio::spawn(async move {
        if let Err(e) = session.submit(document).await {
            warn!("Streaming analysis rejected: {}", e);
        }
    });

    Box::pin(ReceiverStream::new(rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;
    use crate::pipeline::client::{ModelClient, ModelEnvelope};
    use crate::pipeline::extract::{ExtractedText, TextExtractor};
    use crate::pipeline::parse::ParseOptions;
    use crate::state::Status;
    use async_trait::async_trait;
    use futures::StreamExt;

    struct Text;

    #[async_trait]
    impl TextExtractor for Text {
        async fn extract(&self, _document: &Document) -> Result<ExtractedText, ExtractionError> {
            Ok(ExtractedText {
                text: "body".into(),
                pages_read: 1,
                total_pages: 1,
            })
        }
    }

    struct Garbage;

    #[async_trait]
    impl ModelClient for Garbage {
        async fn send(&self, _raw_text: &str) -> Result<ModelEnvelope, AnalysisError> {
            Ok(ModelEnvelope::from_answer("I cannot comply.", None))
        }

        fn target(&self) -> &str {
            "garbage"
        }
    }

    #[tokio::test]
    async fn stream_ends_after_terminal_snapshot() {
        let analyzer = Analyzer::new(Arc::new(Text), Arc::new(Garbage), ParseOptions::default());
        let doc = Document::from_bytes("a.pdf", b"%PDF".to_vec());

        let statuses: Vec<Status> = analyze_document_stream(analyzer, doc)
            .map(|s| s.status())
            .collect()
            .await;

        assert_eq!(
            statuses,
            vec![Status::ReadingDocument, Status::Analyzing, Status::Failed]
        );
    }
}
