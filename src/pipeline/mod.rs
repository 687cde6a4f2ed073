//! Pipeline stages for document analysis.
//!
//! Each submodule implements exactly one step and can be tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ client ──▶ parse
//! (URL/path)  (pdfium)   (LLM)     (JSON report)
//! ```
//!
//! 1. [`input`]: load the user-supplied path or URL into a [`input::Document`]
//! 2. [`extract`]: pull plain text out of the first pages; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`client`]: send the text to the model and split the answer from the
//!    reasoning trace; the only stage with network I/O
//! 4. [`parse`]: strip fence markers and strictly decode the report

pub mod client;
pub mod extract;
pub mod input;
pub mod parse;
