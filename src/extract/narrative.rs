//! Score and suggestion extraction from the judge's prose.

use super::{ExtractionContext, ExtractionStrategy, PartialScores, ScoreSource, compile};
use regex::Regex;
use tracing::debug;

/// Placeholder when no improvement suggestion could be located.
pub const NO_SUGGESTIONS: &str = "无具体优化建议";

/// How far past an alias a tight score phrase may start.
const TIGHT_LOOKAHEAD: usize = 80;

/// Score phrasings that must follow an alias closely.
const TIGHT_PHRASES: [&str; 7] = [
    r"得分为\s*(\d{1,2})\s*分",
    r"总分为\s*(\d{1,2})\s*分",
    r"总评分\s*(\d{1,2})\s*分",
    r"总分(?:为|是)?\s*[:：]?\s*(\d{1,2})(?:\D|$)",
    r"得分(?:为|是)?\s*[:：]?\s*(\d{1,2})(?:\D|$)",
    r"(?i:total\s+score)\s*(?i:is|of)?\s*[:：]?\s*(\d{1,2})(?:\D|$)",
    r"(?i:scored)\s*(\d{1,2})\s*(?i:points?)",
];

/// Any score label, however far after the alias.
const BROAD_PHRASE: &str = r"(?:总分|评分|得分|(?i:total\s+score)|(?i:score))\s*[:：]?\s*(\d{1,2})(?:\D|$)";

const WEAKNESS_LABEL: &str = r"(?:改进建议|优化建议|不足之处|不足|缺点|缺陷|(?i:weaknesses|weakness|shortcomings|improvements))(?:\*\*)?\s*[:：]?";

const SECTION_END: &str = r"优点|优势|总结|总体|结论|(?i:strengths|summary|conclusion)";

/// An alias followed closely by a total-score phrase.
pub struct NarrativeTotal;

impl ExtractionStrategy for NarrativeTotal {
    fn source(&self) -> ScoreSource {
        ScoreSource::Narrative
    }

    fn extract(&self, ctx: &ExtractionContext<'_>, position: usize) -> Option<PartialScores> {
        let aliases = ctx.aliases.get(position)?;
        for alias in aliases.names() {
            for phrase in TIGHT_PHRASES {
                let pattern = format!(
                    r"(?i:{})[^0-9]{{0,{}}}?{}",
                    regex::escape(alias),
                    TIGHT_LOOKAHEAD,
                    phrase
                );
                if let Some(total) = compile(&pattern).and_then(|re| capture_number(&re, ctx.text)) {
                    debug!(alias = %alias, total, "Total from score phrase");
                    return Some(PartialScores::total(total));
                }
            }
        }
        None
    }
}

/// An alias followed anywhere later by a score label and number.
pub struct NarrativeSection;

impl ExtractionStrategy for NarrativeSection {
    fn source(&self) -> ScoreSource {
        ScoreSource::Narrative
    }

    fn extract(&self, ctx: &ExtractionContext<'_>, position: usize) -> Option<PartialScores> {
        let aliases = ctx.aliases.get(position)?;
        for alias in aliases.names() {
            let pattern = format!(r"(?s)(?i:{}).*?{}", regex::escape(alias), BROAD_PHRASE);
            if let Some(total) = compile(&pattern).and_then(|re| capture_number(&re, ctx.text)) {
                debug!(alias = %alias, total, "Total from analysis section");
                return Some(PartialScores::total(total));
            }
        }
        None
    }
}

/// Improvement suggestions for the model at `position`.
///
/// The span starts after a weakness label that follows one of the model's
/// aliases, and runs to the next alias of another model, a strengths/summary
/// label or the end of the text. A label preceded by another model's alias
/// (after this model's alias) belongs to that model and is skipped.
/// Aliases shared with this model never count as another model's.
pub fn suggestions(ctx: &ExtractionContext<'_>, position: usize) -> Option<String> {
    let (Some(label), Some(section_end)) = (compile(WEAKNESS_LABEL), compile(SECTION_END)) else {
        return None;
    };
    let aliases = ctx.aliases.get(position)?;
    let others: Vec<&str> = ctx
        .aliases
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != position)
        .flat_map(|(_, set)| set.names().iter().map(String::as_str))
        .filter(|name| !aliases.contains(name))
        .collect();

    for alias in aliases.names() {
        for (start, _) in ctx.text.match_indices(alias.as_str()) {
            let after = &ctx.text[start + alias.len()..];
            let Some(found) = label.find(after) else {
                continue;
            };
            if others.iter().any(|other| after[..found.start()].contains(other)) {
                continue;
            }

            let body = &after[found.end()..];
            let end = others
                .iter()
                .filter_map(|other| body.find(other))
                .chain(section_end.find(body).map(|m| m.start()))
                .min()
                .unwrap_or(body.len());

            let span = clean_span(&body[..end]);
            if !span.is_empty() {
                debug!(alias = %alias, chars = span.chars().count(), "Suggestions from analysis");
                return Some(span.to_string());
            }
        }
    }

    None
}

fn capture_number(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn clean_span(span: &str) -> &str {
    span.trim_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '#' | ':' | '：' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CompetingModel;

    fn total_of<S: ExtractionStrategy>(strategy: S, text: &str, names: &[&str], position: usize) -> Option<u32> {
        let models = CompetingModel::from_names(names.iter().copied());
        let ctx = ExtractionContext::new(text, &models);
        strategy.extract(&ctx, position).and_then(|p| p.total)
    }

    fn suggestions_of(text: &str, names: &[&str], position: usize) -> Option<String> {
        let models = CompetingModel::from_names(names.iter().copied());
        let ctx = ExtractionContext::new(text, &models);
        suggestions(&ctx, position)
    }

    #[test]
    fn test_tight_total_phrases() {
        assert_eq!(total_of(NarrativeTotal, "ModelA 的总分为 18 分", &["ModelA"], 0), Some(18));
        assert_eq!(total_of(NarrativeTotal, "ModelA 得分是 21。", &["ModelA"], 0), Some(21));
        assert_eq!(total_of(NarrativeTotal, "Claude has a total score of 26/30", &["Claude"], 0), Some(26));
        assert_eq!(total_of(NarrativeTotal, "Claude scored 19 points", &["Claude"], 0), Some(19));
    }

    #[test]
    fn test_tight_total_requires_nearby_phrase() {
        let far = format!("ModelA {} 总分为 18 分", "很".repeat(100));
        assert_eq!(total_of(NarrativeTotal, &far, &["ModelA"], 0), None);
        assert_eq!(total_of(NarrativeTotal, "ModelA 表现 3 项出色，总分为 18 分", &["ModelA"], 0), None);
    }

    #[test]
    fn test_alias_matching_ignores_case() {
        assert_eq!(total_of(NarrativeTotal, "gpt-4o 的总分为 18 分", &["GPT-4o"], 0), Some(18));
        assert_eq!(total_of(NarrativeSection, "### CLAUDE\n表现稳定。\n总分：22", &["Claude"], 0), Some(22));
    }

    #[test]
    fn test_tight_total_uses_positional_alias() {
        assert_eq!(total_of(NarrativeTotal, "第 2 个模型的总分为 24 分", &["A", "B"], 1), Some(24));
    }

    #[test]
    fn test_broad_total_spans_lines() {
        let text = "### GPT-4o\n回答清晰，结构完整，共 3 段。\n总分：25";
        assert_eq!(total_of(NarrativeSection, text, &["GPT-4o"], 0), Some(25));
        assert_eq!(total_of(NarrativeTotal, text, &["GPT-4o"], 0), None);
    }

    #[test]
    fn test_no_alias_no_total() {
        assert_eq!(total_of(NarrativeSection, "总分：25", &["GPT-4o"], 0), None);
    }

    #[test]
    fn test_suggestions_stop_at_next_model() {
        let text = "\
GPT-4o：表现稳定。
不足：缺少具体数据支撑，结尾略显仓促。
DeepSeek：创意更强。
不足：篇幅偏长。
总结：各有所长。";
        let names = ["GPT-4o", "DeepSeek"];
        assert_eq!(
            suggestions_of(text, &names, 0).as_deref(),
            Some("缺少具体数据支撑，结尾略显仓促。")
        );
        assert_eq!(suggestions_of(text, &names, 1).as_deref(), Some("篇幅偏长。"));
    }

    #[test]
    fn test_suggestions_skip_other_models_label() {
        let text = "GPT-4o 表现很好。\nDeepSeek 缺点：太长。";
        assert_eq!(suggestions_of(text, &["GPT-4o", "DeepSeek"], 0), None);
        assert_eq!(
            suggestions_of(text, &["GPT-4o", "DeepSeek"], 1).as_deref(),
            Some("太长。")
        );
    }

    #[test]
    fn test_suggestions_stop_at_positional_alias() {
        let text = "模型1 不足：太短。\n\n模型2 不足：太长。";
        let names = ["GPT-4o", "Claude"];
        assert_eq!(suggestions_of(text, &names, 0).as_deref(), Some("太短。"));
        assert_eq!(suggestions_of(text, &names, 1).as_deref(), Some("太长。"));
    }

    #[test]
    fn test_suggestions_skip_label_after_header_alias() {
        let text = "| 评估项目 | 甲 | 乙 |\n\n甲 表现不错。乙 缺点：用词重复。";
        let names = ["GPT-4o", "Claude"];
        assert_eq!(suggestions_of(text, &names, 0), None);
        assert_eq!(suggestions_of(text, &names, 1).as_deref(), Some("用词重复。"));
    }

    #[test]
    fn test_suggestions_markdown_label() {
        let text = "**Claude**\n- **Weaknesses**: too generic\n- Summary: fine";
        assert_eq!(suggestions_of(text, &["Claude"], 0).as_deref(), Some("too generic"));
    }
}
