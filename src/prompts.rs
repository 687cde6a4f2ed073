//! Prompts sent to the reasoning model.
//!
//! Every prompt lives here so the client, the proxy and the tests all see the
//! same text. Callers can override the system instruction via
//! [`crate::config::AnalysisConfig::system_prompt`]; the user-turn wrapper is
//! fixed because the parser depends on the JSON shape it asks for.

/// JSON field names the model must return, in report order.
pub const REQUIRED_FIELDS: [&str; 5] = [
    "overallSummary",
    "keyFindings",
    "phageDisplaySection",
    "methodology",
    "conclusions",
];

/// Default system instruction.
///
/// Sets the academic-assistant role, demands Chinese output suitable for a
/// WeChat Official Account article, lists the five sections and makes the
/// phage display peptide section mandatory even for papers that never mention
/// the technique.
pub const SYSTEM_INSTRUCTION: &str = r#"你是一位世界顶尖的生物技术与分子生物学学术研究助理。你的任务是深度解析用户提供的科研文献。
输出要求：
1. 语言：中文（学术风格，适合公众号发布）。
2. 结构：必须包含摘要、核心发现、方法论、结论。
3. **关键要求**：必须设立一个独立的“噬菌体展示肽技术 (Phage Display Peptide Technology)”专题分析部分。即使文献不直接以此为主题，也要分析该技术在研究中的潜在应用、相关性或在该领域的前景。
4. 返回格式：必须仅返回合法的 JSON 格式。

JSON 结构示例：
{
  "overallSummary": "字符串",
  "keyFindings": ["发现1", "发现2"],
  "phageDisplaySection": "深入分析内容",
  "methodology": "实验方法说明",
  "conclusions": "结论总结"
}"#;

/// Lead-in placed before the document text in the user turn.
pub const USER_PROMPT_PREFIX: &str = "请基于以下文献内容生成 JSON 报告，确保包含噬菌体专题分析：";

/// Build the user turn for a document.
pub fn user_prompt(raw_text: &str) -> String {
    format!("{USER_PROMPT_PREFIX}\n\n{raw_text}")
}
