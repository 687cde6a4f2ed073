//! Observer trait for state snapshots.
//!
//! Attach an [`Arc<dyn StateObserver>`] to an
//! [`AnalysisSession`](crate::session::AnalysisSession) to receive every
//! snapshot the session publishes.
//!
//! # Why callbacks instead of channels?
//!
//! A callback is the least-invasive integration point: callers can forward
//! snapshots to a channel, a WebSocket, or a terminal spinner without the
//! library knowing how the host application communicates.
//! [`crate::stream::analyze_stream`] is itself built on this trait.
//!
//! # Example
//!
//! ```rust
//! use edgequake_paper_digest::{ProcessingState, StateObserver, Status};
//! use std::sync::Mutex;
//!
//! #[derive(Default)]
//! struct History(Mutex<Vec<Status>>);
//!
//! impl StateObserver for History {
//!     fn on_state(&self, state: &ProcessingState) {
//!         self.0.lock().unwrap().push(state.status());
//!     }
//! }
//! ```

use crate::state::ProcessingState;
use std::sync::Arc;

/// Receives analysis events.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait StateObserver: Send + Sync {
    /// Called after every transition with the new snapshot.
    fn on_state(&self, state: &ProcessingState) {
        let _ = state;
    }

    /// Called once extraction succeeds, before the model request.
    ///
    /// # Arguments
    /// * `pages_read`: pages whose text was kept
    /// * `total_pages`: pages in the document
    /// * `chars`: characters that will be sent to the model
    fn on_text_extracted(&self, pages_read: usize, total_pages: usize, chars: usize) {
        let _ = (pages_read, total_pages, chars);
    }
}

/// Ignores everything. Used when no observer is attached.
pub struct NoopObserver;

impl StateObserver for NoopObserver {}

/// Shared observer handle.
pub type SharedObserver = Arc<dyn StateObserver>;
