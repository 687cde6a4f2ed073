//! The orchestrator: one document at a time, every step published.
//!
//! [`AnalysisSession`] is the only writer of its [`ProcessingState`]. It
//! replaces the snapshot whole on each transition and hands the new snapshot
//! to the attached [`StateObserver`]. Failures of any stage land in
//! [`Status::Failed`](crate::state::Status::Failed) with the error's display
//! string; nothing is retried.
//!
//! `submit` takes `&mut self`, so a session can never run two analyses at
//! once. Hosts that need parallel analyses create one session per document.

use crate::analyze::Analyzer;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::pipeline::input::{self, Document};
use crate::progress::SharedObserver;
use crate::state::{InvalidTransition, ProcessingState};
use tracing::{debug, info, warn};

pub struct AnalysisSession {
    analyzer: Analyzer,
    state: ProcessingState,
    observer: Option<SharedObserver>,
    download_timeout_secs: u64,
}

impl AnalysisSession {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer,
            state: ProcessingState::idle(),
            observer: None,
            download_timeout_secs: AnalysisConfig::default().download_timeout_secs,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let mut session = Self::new(Analyzer::from_config(config)?);
        session.download_timeout_secs = config.download_timeout_secs;
        Ok(session)
    }

    /// Publish every snapshot to `observer`.
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The current snapshot.
    pub fn state(&self) -> &ProcessingState {
        &self.state
    }

    /// Analyze an in-memory document.
    ///
    /// Stage failures are not errors of this method: they end in a
    /// `Failed` snapshot, which is returned like any other.
    ///
    /// # Errors
    /// [`InvalidTransition`] when the session is not idle. The current
    /// snapshot is left untouched.
    pub async fn submit(&mut self, document: Document) -> Result<&ProcessingState, InvalidTransition> {
        let next = self.state.begin_reading(document.file_name())?;
        self.publish(next);
        self.run(document).await?;
        Ok(&self.state)
    }

    /// Load a path or URL, then analyze it.
    ///
    /// Loading happens in `ReadingDocument`, so a missing file or a failed
    /// download ends in `Failed` like any extraction error.
    pub async fn submit_input(&mut self, input_str: &str) -> Result<&ProcessingState, InvalidTransition> {
        let next = self.state.begin_reading(display_name(input_str))?;
        self.publish(next);

        match input::load_document(input_str, self.download_timeout_secs).await {
            Ok(document) => self.run(document).await?,
            Err(e) => self.fail(e.into())?,
        }
        Ok(&self.state)
    }

    /// Completed | Failed → Idle.
    pub fn reset(&mut self) -> Result<&ProcessingState, InvalidTransition> {
        let next = self.state.reset()?;
        self.publish(next);
        Ok(&self.state)
    }

    /// ReadingDocument → … → Completed | Failed.
    async fn run(&mut self, document: Document) -> Result<(), InvalidTransition> {
        let extracted = match self.analyzer.extract(&document).await {
            Ok(extracted) => extracted,
            Err(e) => return self.fail(e),
        };
        if let Some(ref observer) = self.observer {
            observer.on_text_extracted(
                extracted.pages_read,
                extracted.total_pages,
                extracted.text.chars().count(),
            );
        }

        let next = self.state.begin_analyzing()?;
        self.publish(next);

        match self.analyzer.analyze_text(&extracted.text).await {
            Ok(analysis) => {
                let next = self.state.complete(analysis.result, analysis.reasoning)?;
                self.publish(next);
                info!("{} analyzed", document.file_name());
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, error: AnalysisError) -> Result<(), InvalidTransition> {
        warn!("Analysis failed ({:?}): {}", error.remedy(), error);
        let next = self.state.fail(Some(error.to_string()))?;
        self.publish(next);
        Ok(())
    }

    fn publish(&mut self, next: ProcessingState) {
        debug!("State: {} → {}", self.state.status(), next.status());
        self.state = next;
        if let Some(ref observer) = self.observer {
            observer.on_state(&self.state);
        }
    }
}

/// File name shown while a path or URL is being loaded.
fn display_name(input_str: &str) -> String {
    input_str
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(input_str)
        .to_string()
}
