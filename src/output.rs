//! Result types produced by the analysis pipeline.

use serde::{Deserialize, Serialize};

/// The structured report decoded from the model's answer.
///
/// Wire names are camelCase. Every field is required and must not be null;
/// unknown fields in the model output are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// High-level executive summary of the paper.
    pub overall_summary: String,
    /// Key findings in the order the model ranked them.
    pub key_findings: Vec<String>,
    /// Dedicated phage display peptide technology analysis.
    pub phage_display_section: String,
    /// Techniques and experimental design.
    pub methodology: String,
    /// Conclusions and future implications.
    pub conclusions: String,
}

/// A validated report together with the model's optional reasoning trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub result: AnalysisResult,
    /// Free-text deliberation (e.g. DeepSeek-R1 `reasoning_content`).
    /// Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}
