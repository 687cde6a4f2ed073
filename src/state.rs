//! Processing state: the snapshot a UI renders.
//!
//! ```text
//!        begin_reading          begin_analyzing           complete
//! Idle ───────────────▶ ReadingDocument ───────────▶ Analyzing ──────────▶ Completed
//!  ▲                          │                        │                      │
//!  │                          └───── fail ──┬── fail ──┘                      │
//!  │                                        ▼                                 │
//!  └──────────────── reset ─────────── Failed ◀───────────────────────────────┘
//!                                                           (reset from Completed too)
//! ```
//!
//! Every transition consumes a reference to the current snapshot and returns a
//! new one; nothing mutates a snapshot in place. A transition that is not on
//! the diagram returns [`InvalidTransition`] and leaves the caller's snapshot
//! as it was.

use crate::output::AnalysisResult;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Shown when a failure carries no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Analysis failed for an unknown reason. Please try again.";

/// Where an analysis is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Idle,
    ReadingDocument,
    Analyzing,
    Completed,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Idle => "idle",
            Status::ReadingDocument => "reading document",
            Status::Analyzing => "analyzing",
            Status::Completed => "completed",
            Status::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A transition that is not allowed from the current status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {action} while {from}")]
pub struct InvalidTransition {
    pub from: Status,
    pub action: &'static str,
}

/// Immutable snapshot of one analysis.
///
/// `result` is set only in [`Status::Completed`]; `error` only in
/// [`Status::Failed`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingState {
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<String>,
}

impl ProcessingState {
    /// The initial snapshot.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref()
    }

    /// True while a document is being read or analyzed.
    pub fn is_busy(&self) -> bool {
        matches!(self.status, Status::ReadingDocument | Status::Analyzing)
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// Idle → ReadingDocument.
    pub fn begin_reading(&self, file_name: impl Into<String>) -> Result<Self, InvalidTransition> {
        self.expect(&[Status::Idle], "begin reading")?;
        Ok(Self {
            status: Status::ReadingDocument,
            file_name: Some(file_name.into()),
            ..Self::default()
        })
    }

    /// ReadingDocument → Analyzing.
    pub fn begin_analyzing(&self) -> Result<Self, InvalidTransition> {
        self.expect(&[Status::ReadingDocument], "begin analyzing")?;
        Ok(Self {
            status: Status::Analyzing,
            file_name: self.file_name.clone(),
            ..Self::default()
        })
    }

    /// Analyzing → Completed.
    pub fn complete(
        &self,
        result: AnalysisResult,
        reasoning: Option<String>,
    ) -> Result<Self, InvalidTransition> {
        self.expect(&[Status::Analyzing], "complete")?;
        Ok(Self {
            status: Status::Completed,
            file_name: self.file_name.clone(),
            result: Some(result),
            error: None,
            reasoning,
        })
    }

    /// ReadingDocument | Analyzing → Failed.
    ///
    /// A blank or absent message is replaced with [`GENERIC_FAILURE_MESSAGE`].
    pub fn fail(&self, message: Option<String>) -> Result<Self, InvalidTransition> {
        self.expect(&[Status::ReadingDocument, Status::Analyzing], "fail")?;
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
        Ok(Self {
            status: Status::Failed,
            file_name: self.file_name.clone(),
            error: Some(message),
            ..Self::default()
        })
    }

    /// Completed | Failed → Idle, clearing everything.
    pub fn reset(&self) -> Result<Self, InvalidTransition> {
        self.expect(&[Status::Completed, Status::Failed], "reset")?;
        Ok(Self::idle())
    }

    fn expect(&self, allowed: &[Status], action: &'static str) -> Result<(), InvalidTransition> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self.status,
                action,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AnalysisResult {
        AnalysisResult {
            overall_summary: "s".into(),
            key_findings: vec!["k".into()],
            phage_display_section: "p".into(),
            methodology: "m".into(),
            conclusions: "c".into(),
        }
    }

    #[test]
    fn happy_path() {
        let s = ProcessingState::idle();
        assert_eq!(s.status(), Status::Idle);
        assert!(!s.is_busy());

        let s = s.begin_reading("paper.pdf").unwrap();
        assert_eq!(s.status(), Status::ReadingDocument);
        assert_eq!(s.file_name(), Some("paper.pdf"));
        assert!(s.is_busy());

        let s = s.begin_analyzing().unwrap();
        assert_eq!(s.status(), Status::Analyzing);
        assert_eq!(s.file_name(), Some("paper.pdf"));

        let s = s.complete(sample(), Some("trace".into())).unwrap();
        assert_eq!(s.status(), Status::Completed);
        assert_eq!(s.result(), Some(&sample()));
        assert_eq!(s.reasoning(), Some("trace"));
        assert!(s.error().is_none());

        let s = s.reset().unwrap();
        assert_eq!(s, ProcessingState::idle());
    }

    #[test]
    fn fail_from_either_busy_status() {
        let reading = ProcessingState::idle().begin_reading("a.pdf").unwrap();
        let failed = reading.fail(Some("bad pdf".into())).unwrap();
        assert_eq!(failed.status(), Status::Failed);
        assert_eq!(failed.error(), Some("bad pdf"));
        assert!(failed.result().is_none());

        let analyzing = reading.begin_analyzing().unwrap();
        assert_eq!(analyzing.fail(None).unwrap().status(), Status::Failed);
    }

    #[test]
    fn blank_failure_message_uses_fallback() {
        let s = ProcessingState::idle().begin_reading("a.pdf").unwrap();
        assert_eq!(s.fail(None).unwrap().error(), Some(GENERIC_FAILURE_MESSAGE));
        assert_eq!(
            s.fail(Some("   ".into())).unwrap().error(),
            Some(GENERIC_FAILURE_MESSAGE)
        );
    }

    #[test]
    fn reset_from_failed_clears_error() {
        let s = ProcessingState::idle()
            .begin_reading("a.pdf")
            .unwrap()
            .fail(Some("x".into()))
            .unwrap()
            .reset()
            .unwrap();
        assert_eq!(s.status(), Status::Idle);
        assert!(s.error().is_none());
        assert!(s.file_name().is_none());
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let idle = ProcessingState::idle();
        assert_eq!(
            idle.begin_analyzing().unwrap_err(),
            InvalidTransition {
                from: Status::Idle,
                action: "begin analyzing"
            }
        );
        assert!(idle.complete(sample(), None).is_err());
        assert!(idle.fail(None).is_err());
        assert!(idle.reset().is_err());

        let reading = idle.begin_reading("a.pdf").unwrap();
        assert!(reading.begin_reading("b.pdf").is_err());
        assert!(reading.complete(sample(), None).is_err());
        assert!(reading.reset().is_err());
    }

    #[test]
    fn rejected_transition_leaves_snapshot_untouched() {
        let reading = ProcessingState::idle().begin_reading("a.pdf").unwrap();
        let before = reading.clone();
        let _ = reading.reset();
        assert_eq!(reading, before);
    }

    #[test]
    fn serializes_without_empty_fields() {
        let v = serde_json::to_value(ProcessingState::idle()).unwrap();
        assert_eq!(v, serde_json::json!({ "status": "idle" }));
    }

    #[test]
    fn invalid_transition_display() {
        let e = ProcessingState::idle().reset().unwrap_err();
        assert_eq!(e.to_string(), "cannot reset while idle");
    }
}
