//! Result parsing: raw model answer → validated [`AnalysisResult`].
//!
//! Even with `response_format: json_object`, reasoning models regularly wrap
//! their JSON in a ```` ```json ```` fence, and some prepend free text. This
//! module is the only place that knows about those quirks. Callers go through
//! [`parse_result`], so the recovery heuristics can change without touching
//! the client or the orchestrator.
//!
//! ## Rules
//!
//! 1. Strip fence markers at the trimmed edges of the answer only; backticks
//!    inside the payload are left alone.
//! 2. Decode strictly. A missing, null or mistyped field is a failure, never
//!    a default.
//! 3. Optionally ([`OutputRecovery::FirstJsonObject`]) retry on the first
//!    `{...}` object, in closing order, that decodes.
//! 4. Failures carry a bounded prefix of the raw answer for diagnosis.

use crate::config::{AnalysisConfig, OutputRecovery};
use crate::error::AnalysisError;
use crate::output::AnalysisResult;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Parser knobs, usually derived from [`AnalysisConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Characters of raw answer kept in a malformed-output error.
    pub snippet_chars: usize,
    /// Reject a blank `phageDisplaySection`.
    pub require_specialized_section: bool,
    pub recovery: OutputRecovery,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            snippet_chars: 200,
            require_specialized_section: false,
            recovery: OutputRecovery::StripFences,
        }
    }
}

impl From<&AnalysisConfig> for ParseOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            snippet_chars: config.snippet_chars,
            require_specialized_section: config.require_specialized_section,
            recovery: config.recovery,
        }
    }
}

/// Decode a raw model answer into an [`AnalysisResult`].
///
/// # Errors
/// [`AnalysisError::MalformedOutput`] when the answer (after fence stripping
/// and the configured recovery) is not a complete report.
pub fn parse_result(answer: &str, options: &ParseOptions) -> Result<AnalysisResult, AnalysisError> {
    let body = strip_fences(answer);
    debug!("Decoding answer: {} chars after fence stripping", body.len());

    let result = match serde_json::from_str::<AnalysisResult>(body) {
        Ok(result) => result,
        Err(e) => match options.recovery {
            OutputRecovery::StripFences => return Err(malformed(answer, e.to_string(), options)),
            OutputRecovery::FirstJsonObject => {
                recover_first_object(body).ok_or_else(|| malformed(answer, e.to_string(), options))?
            }
        },
    };

    if options.require_specialized_section && result.phage_display_section.trim().is_empty() {
        return Err(malformed(
            answer,
            "phageDisplaySection is empty".to_string(),
            options,
        ));
    }

    Ok(result)
}

// ── Rule 1: Strip fence markers ──────────────────────────────────────────────

static RE_LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[ \t]*[A-Za-z0-9_+\-]*[ \t]*\r?\n?").unwrap());

static RE_TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:\r?\n)?[ \t]*```$").unwrap());

/// Remove fence markers from both edges of `input`.
///
/// Repeats until neither edge carries a fence, so
/// `strip_fences(strip_fences(x)) == strip_fences(x)` for every input.
pub fn strip_fences(input: &str) -> &str {
    let mut s = input.trim();
    loop {
        let before = s.len();
        if let Some(m) = RE_LEADING_FENCE.find(s) {
            s = s[m.end()..].trim();
        }
        if let Some(m) = RE_TRAILING_FENCE.find(s) {
            s = s[..m.start()].trim();
        }
        if s.len() == before {
            return s;
        }
    }
}

// ── Rule 3: First decodable JSON object ──────────────────────────────────────

/// One string-aware pass over `body`: each `{...}` is tried as a report the
/// moment its closing brace is seen. The scan is linear; decoding costs the
/// body length times the nesting depth at most.
fn recover_first_object(body: &str) -> Option<AnalysisResult> {
    let mut open: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in body.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            // Quotes in prose outside any object are not strings.
            '"' if !open.is_empty() => in_string = true,
            '{' => open.push(i),
            '}' => {
                let Some(start) = open.pop() else { continue };
                if let Ok(result) = serde_json::from_str::<AnalysisResult>(&body[start..=i]) {
                    debug!("Recovered report from object at byte {}", start);
                    return Some(result);
                }
            }
            _ => {}
        }
    }
    None
}

// ── Rule 4: Diagnosable failures ─────────────────────────────────────────────

fn malformed(answer: &str, reason: String, options: &ParseOptions) -> AnalysisError {
    let snippet: String = answer.chars().take(options.snippet_chars).collect();
    warn!("Malformed model output ({}): {:?}", reason, snippet);
    AnalysisError::MalformedOutput { reason, snippet }
}

// ── Tests ────────────────────────────────────────────────────────────────────
