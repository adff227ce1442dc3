//! Exporters for evaluation records: CSV, a Markdown summary and a plain
//! terminal table.

use crate::record::{EvaluationRecord, excerpt};
use crate::rubric::{Category, Rubric};
use std::fmt::Write as _;

/// Characters of the raw answer kept in a CSV row.
const CSV_ANSWER_CHARS: usize = 100;

/// Characters of the raw answer kept in a Markdown row.
const MARKDOWN_ANSWER_CHARS: usize = 50;

/// Records as CSV with one column per criterion.
pub fn to_csv(records: &[EvaluationRecord]) -> String {
    let mut header = vec![
        "用例ID".to_string(),
        "场景分类".to_string(),
        "提示词描述".to_string(),
        "提示词Token数".to_string(),
    ];
    header.extend(
        Rubric::criteria()
            .iter()
            .map(|c| format!("{}({})", c.label, c.max_points)),
    );
    header.push(format!("合计({})", Rubric::total_ceiling()));
    header.push("优化建议".to_string());
    header.push("被评估文案原文".to_string());

    let mut out = header.join(",");
    out.push('\n');

    for record in records {
        let mut row = vec![
            record.case_id.clone(),
            record.scenario.clone(),
            csv_quote(&record.prompt_excerpt),
            record.prompt_token_estimate.to_string(),
        ];
        row.extend(record.scores.iter().map(|(_, v)| v.to_string()));
        row.push(record.total_score.to_string());
        row.push(csv_quote(&record.suggestions));
        row.push(csv_quote(&excerpt(&record.raw_answer, CSV_ANSWER_CHARS)));

        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

/// Markdown table with per-category subtotals.
pub fn to_markdown(records: &[EvaluationRecord]) -> String {
    let mut columns = vec![
        "用例ID".to_string(),
        "场景分类".to_string(),
        "提示词描述".to_string(),
        "提示词Token数".to_string(),
    ];
    columns.extend(
        Category::ALL
            .iter()
            .map(|c| format!("{}(0-{})", c.label(), Rubric::category_ceiling(*c))),
    );
    columns.extend(["合计", "优化建议", "被评估文案原文"].map(String::from));

    let mut out = format!("| {} |\n", columns.join(" | "));
    out.push_str(&format!("|{}\n", "------|".repeat(columns.len())));

    for record in records {
        let mut cells = vec![
            record.case_id.clone(),
            record.scenario.clone(),
            markdown_cell(&record.prompt_excerpt),
            record.prompt_token_estimate.to_string(),
        ];
        cells.extend(
            Category::ALL
                .iter()
                .map(|c| record.scores.category_total(*c).to_string()),
        );
        cells.push(record.total_score.to_string());
        cells.push(markdown_cell(&record.suggestions));
        cells.push(markdown_cell(&excerpt(&record.raw_answer, MARKDOWN_ANSWER_CHARS)));

        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    out
}

/// Fixed-width summary for the terminal.
pub fn to_terminal_table(records: &[EvaluationRecord]) -> String {
    let name_width = records
        .iter()
        .map(|r| r.model_display_name.chars().count())
        .max()
        .unwrap_or(0)
        .max(5);

    let mut out = String::new();
    let _ = write!(out, "{:<name_width$}", "Model");
    for category in Category::ALL {
        let _ = write!(
            out,
            "  {:>16}",
            format!("{} /{}", category.display_name(), Rubric::category_ceiling(category))
        );
    }
    let _ = writeln!(out, "  {:>8}", format!("Total /{}", Rubric::total_ceiling()));
    let width = out.chars().count().saturating_sub(1);
    let _ = writeln!(out, "{}", "-".repeat(width));

    for record in records {
        let _ = write!(out, "{:<name_width$}", record.model_display_name);
        for category in Category::ALL {
            let _ = write!(out, "  {:>16}", record.scores.category_total(category));
        }
        let _ = writeln!(out, "  {:>8}", record.total_score);
    }

    out
}

fn csv_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn markdown_cell(value: &str) -> String {
    value
        .replace('|', "\\|")
        .replace("\r\n", " ")
        .replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CompetingModel, ScoreSet};

    fn sample() -> Vec<EvaluationRecord> {
        let models = CompetingModel::from_names(["GPT-4o", "DeepSeek"]);
        let scores = ScoreSet::from_ordered([4, 3, 3, 2, 2, 2, 3, 2, 2, 2, 2]);
        vec![
            EvaluationRecord::new(
                0,
                &models[0],
                "写一句\"春日\"奶茶广告语",
                Some(&"好".repeat(120)),
                scores,
                27,
                "结尾可以更有力",
            ),
            EvaluationRecord::new(
                1,
                &models[1],
                "写一句\"春日\"奶茶广告语",
                None,
                ScoreSet::default(),
                0,
                "无具体优化建议",
            ),
        ]
    }

    #[test]
    fn test_csv_header_and_quoting() {
        let csv = to_csv(&sample());
        let mut lines = csv.lines();

        assert_eq!(
            lines.next().unwrap(),
            "用例ID,场景分类,提示词描述,提示词Token数,相关性(4),准确性(4),信息量(3),流畅性(2),语法正确性(2),风格适配性(2),创新性(4),吸引力(3),偏见与公平性(2),内容安全(2),合规性(2),合计(30),优化建议,被评估文案原文"
        );

        let first = lines.next().unwrap();
        assert!(first.starts_with("1,AI生成文案,\"写一句\"\"春日\"\"奶茶广告语\",3,4,3,3,2,2,2,3,2,2,2,2,27,"));
        assert!(first.ends_with(&format!("\"{}...\"", "好".repeat(100))));

        let second = lines.next().unwrap();
        assert!(second.ends_with(",0,\"无具体优化建议\",\"未提供内容\""));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_markdown_category_totals() {
        let md = to_markdown(&sample());
        let lines: Vec<&str> = md.lines().collect();

        assert!(lines[0].contains("内容质量(0-11)"));
        assert!(lines[0].contains("伦理与安全(0-6)"));
        assert!(lines[2].contains("| 10 | 6 | 5 | 6 | 27 |"));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_markdown_escapes_pipes() {
        assert_eq!(markdown_cell("a|b\nc"), "a\\|b c");
    }

    #[test]
    fn test_terminal_table_lists_models() {
        let table = to_terminal_table(&sample());
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Model"));
        assert!(lines[2].starts_with("GPT-4o"));
        assert!(lines[2].trim_end().ends_with("27"));
        assert!(lines[3].starts_with("DeepSeek"));
    }

    #[test]
    fn test_empty_records() {
        assert_eq!(to_csv(&[]).lines().count(), 1);
        assert_eq!(to_markdown(&[]).lines().count(), 2);
        assert_eq!(to_terminal_table(&[]).lines().count(), 2);
    }
}
