//! Render a finished analysis as text for humans.
//!
//! * [`to_markdown`]: a Markdown report, one `##` section per field, with the
//!   reasoning trace appended when present.
//! * [`to_wechat_article`]: plain text with emoji banners that pastes cleanly
//!   into the WeChat official-account editor (no Markdown syntax survives
//!   there).

use crate::output::{Analysis, AnalysisResult};
use std::fmt::Write;

const RULE: &str = "━━━━━━━━━━━━━━";
const SECTION_RULE: &str = "————————————————";

/// Markdown report. Always ends with a newline.
pub fn to_markdown(analysis: &Analysis) -> String {
    let r = &analysis.result;
    let mut md = String::new();

    md.push_str("# 文献深度分析报告\n\n");
    section(&mut md, "文献概览", &r.overall_summary);

    md.push_str("## 核心发现\n\n");
    if r.key_findings.is_empty() {
        md.push_str("_无_\n\n");
    }
    for (idx, finding) in r.key_findings.iter().enumerate() {
        let _ = writeln!(md, "{}. {}", idx + 1, finding.trim());
    }
    if !r.key_findings.is_empty() {
        md.push('\n');
    }

    section(&mut md, "实验方法与技术", &r.methodology);
    section(&mut md, "噬菌体展示肽技术专项分析", &r.phage_display_section);
    section(&mut md, "结论与未来启示", &r.conclusions);

    if let Some(ref reasoning) = analysis.reasoning {
        md.push_str("## 推理过程\n\n");
        for line in reasoning.trim().lines() {
            if line.trim().is_empty() {
                md.push_str(">\n");
            } else {
                let _ = writeln!(md, "> {}", line);
            }
        }
        md.push('\n');
    }

    let trimmed_len = md.trim_end().len();
    md.truncate(trimmed_len);
    md.push('\n');
    md
}

fn section(md: &mut String, title: &str, body: &str) {
    let body = body.trim();
    let _ = write!(md, "## {}\n\n{}\n\n", title, if body.is_empty() { "_无_" } else { body });
}

/// WeChat-article plain text with section banners.
pub fn to_wechat_article(result: &AnalysisResult) -> String {
    let findings = result
        .key_findings
        .iter()
        .map(|f| format!("🔹 {}", f.trim()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{RULE}\n🌟 【LuminaLit 文献深度速读】\n{RULE}\n\n\
📄 【全文摘要】\n{summary}\n\n\
💡 【核心发现】\n{findings}\n\n\
🔬 【实验方法与技术】\n{methodology}\n\n\
🧬 【噬菌体展示肽技术专项分析】\n{SECTION_RULE}\n{phage}\n{SECTION_RULE}\n\n\
📝 【结论与未来启示】\n“{conclusions}”\n\n\
✨ 感谢阅读！本文由 LuminaLit AI 自动生成，助力您的生命科学科研之路。",
        summary = result.overall_summary.trim(),
        methodology = result.methodology.trim(),
        phage = result.phage_display_section.trim(),
        conclusions = result.conclusions.trim(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> AnalysisResult {
        AnalysisResult {
            overall_summary: "本文研究了肽库筛选。".into(),
            key_findings: vec!["发现一".into(), "发现二".into()],
            phage_display_section: "M13 噬菌体展示。".into(),
            methodology: "ELISA 与测序。".into(),
            conclusions: "具有应用前景。".into(),
        }
    }

    #[test]
    fn markdown_contains_every_section_in_order() {
        let md = to_markdown(&Analysis {
            result: result(),
            reasoning: None,
        });
        let positions: Vec<usize> = [
            "## 文献概览",
            "## 核心发现",
            "## 实验方法与技术",
            "## 噬菌体展示肽技术专项分析",
            "## 结论与未来启示",
        ]
        .iter()
        .map(|h| md.find(h).unwrap_or_else(|| panic!("missing {h}")))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(md.contains("1. 发现一\n2. 发现二"));
        assert!(!md.contains("推理过程"));
        assert!(md.ends_with(".\n") || md.ends_with("。\n"));
    }

    #[test]
    fn markdown_quotes_reasoning() {
        let md = to_markdown(&Analysis {
            result: result(),
            reasoning: Some("first\n\nsecond".into()),
        });
        assert!(md.contains("## 推理过程\n\n> first\n>\n> second\n"));
        assert!(md.ends_with("> second\n"));
    }

    #[test]
    fn markdown_marks_blank_sections() {
        let mut r = result();
        r.phage_display_section = "  ".into();
        r.key_findings.clear();
        let md = to_markdown(&Analysis {
            result: r,
            reasoning: None,
        });
        assert!(md.contains("## 噬菌体展示肽技术专项分析\n\n_无_"));
        assert!(md.contains("## 核心发现\n\n_无_"));
    }

    #[test]
    fn wechat_article_has_banners_and_bullets() {
        let text = to_wechat_article(&result());
        for banner in [
            "🌟 【LuminaLit 文献深度速读】",
            "📄 【全文摘要】",
            "💡 【核心发现】",
            "🔬 【实验方法与技术】",
            "🧬 【噬菌体展示肽技术专项分析】",
            "📝 【结论与未来启示】",
        ] {
            assert!(text.contains(banner), "missing {banner}");
        }
        assert!(text.contains("🔹 发现一\n🔹 发现二"));
        assert!(text.contains("“具有应用前景。”"));
        assert!(text.starts_with(RULE));
    }
}
