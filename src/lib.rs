//! # edgequake-paper-digest
//!
//! Turn a scientific PDF into a structured, five-section report written by a
//! reasoning model, with a dedicated analysis of phage display peptide
//! technology.
//!
//! ## Why this crate?
//!
//! Reading a paper closely takes an hour; skimming misses the method. This
//! crate extracts the text of the first pages, asks a reasoning model
//! (DeepSeek-R1 by default) for a fixed JSON report, and validates that
//! report strictly so a UI never renders half an answer.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve local file or download from URL
//!  ├─ 2. Extract  plain text of the first pages via pdfium (spawn_blocking)
//!  ├─ 3. Client   one chat-completion request (direct, proxy or provider)
//!  ├─ 4. Parse    strip fences, strictly decode five fields
//!  └─ 5. State    Idle → ReadingDocument → Analyzing → Completed | Failed
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_paper_digest::{analyze, AnalysisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnalysisConfig::builder()
//!         .api_key(std::env::var("API_KEY")?)
//!         .build()?;
//!     let analysis = analyze("paper.pdf", &config).await?;
//!     println!("{}", edgequake_paper_digest::export::to_wechat_article(&analysis.result));
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper-digest` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `proxy` | on      | Enables [`proxy`], the credential-holding HTTP proxy (axum) |
//!
//! ## Transports
//!
//! | Transport | Who holds the key | Use |
//! |-----------|-------------------|-----|
//! | [`Transport::Direct`] | this process | CLI, trusted servers |
//! | [`Transport::Proxy`]  | the proxy    | browsers, desktop apps |
//! | `provider_name`       | `edgequake-llm` env vars | OpenAI, Anthropic, Gemini, Ollama, … |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "proxy")]
pub mod proxy;
pub mod session;
pub mod state;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_bytes, analyze_sync, Analyzer};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, OutputRecovery, Transport};
pub use error::{AnalysisError, ExtractionError, Remedy};
pub use output::{Analysis, AnalysisResult};
pub use pipeline::client::{ModelClient, ModelEnvelope};
pub use pipeline::extract::TextExtractor;
pub use pipeline::input::Document;
pub use pipeline::parse::{parse_result, ParseOptions};
pub use progress::{NoopObserver, StateObserver};
pub use session::AnalysisSession;
pub use state::{InvalidTransition, ProcessingState, Status};
pub use stream::{analyze_document_stream, analyze_stream};
