//! Markdown table parsing for judge responses.
//!
//! The judge is asked for a `| 评估项目 | model... |` table with one row per
//! criterion. Nothing guarantees it complies, so every lookup here is
//! best-effort: a missing header, column, row or cell reads as "nothing
//! found" and never aborts the other lookups.

use super::{ExtractionContext, ExtractionStrategy, PartialScores, ScoreSource};
use crate::record::ScoreSet;
use crate::rubric::CRITERIA;
use tracing::debug;

/// Text that marks a row as the table header.
pub const HEADER_MARKERS: [&str; 3] = ["评估项目", "内容质量", "相关性"];

/// Row labels of the reported total.
pub const TOTAL_LABELS: [&str; 4] = ["总分", "合计", "总计", "Total"];

/// Positional rows carry eleven criteria followed by the total.
const POSITIONAL_MIN_NUMBERS: usize = 12;

/// Pipe-delimited rows found anywhere in a judge response.
#[derive(Debug, Clone, Default)]
pub struct JudgeTable<'a> {
    rows: Vec<&'a str>,
    header: Option<usize>,
}

impl<'a> JudgeTable<'a> {
    /// Collect candidate rows and locate the header.
    ///
    /// Rows need not be contiguous: judges interleave commentary with
    /// table fragments, so every line with at least two pipes counts.
    pub fn parse(text: &'a str) -> Self {
        let rows: Vec<&str> = text.lines().filter_map(pipe_span).collect();
        let header = rows
            .iter()
            .position(|row| HEADER_MARKERS.iter().any(|m| row.contains(m)));

        debug!(rows = rows.len(), header = ?header, "Scanned judge text for table rows");

        Self { rows, header }
    }

    /// All candidate rows, in text order.
    pub fn rows(&self) -> &[&'a str] {
        &self.rows
    }

    pub fn has_header(&self) -> bool {
        self.header.is_some()
    }

    /// Header cells, including the leading criterion-name column.
    pub fn header_cells(&self) -> Option<Vec<&'a str>> {
        self.header.map(|i| split_cells(self.rows[i]))
    }

    /// Resolve the column index for a model from its aliases.
    ///
    /// Aliases are tried in order; for each, an exact column label match
    /// beats a substring match in either direction. The criterion-name
    /// column is never a candidate.
    pub fn column_for<S: AsRef<str>>(&self, aliases: &[S]) -> Option<usize> {
        let header = self.header_cells()?;
        let columns = header.iter().enumerate().skip(1);

        for alias in aliases.iter().map(AsRef::as_ref) {
            if alias.is_empty() {
                continue;
            }
            if let Some((i, _)) = columns.clone().find(|(_, col)| **col == alias) {
                return Some(i);
            }
            if let Some((i, _)) = columns
                .clone()
                .find(|(_, col)| col.contains(alias) || alias.contains(**col))
            {
                return Some(i);
            }
        }

        None
    }

    /// Cells of the first row naming any of `labels`.
    pub fn labelled_row(&self, labels: &[&str]) -> Option<Vec<&'a str>> {
        self.rows.iter().map(|&row| split_cells(row)).find(|cells| {
            cells
                .iter()
                .any(|cell| labels.iter().any(|label| cell_names(cell, label)))
        })
    }

    /// Score in the row labelled `labels`, at `column`. Misses read as 0.
    pub fn score_at(&self, labels: &[&str], column: usize) -> u32 {
        self.labelled_row(labels)
            .and_then(|cells| cells.get(column).copied())
            .and_then(first_number)
            .unwrap_or(0)
    }

    /// Per-criterion scores and the reported total for one column.
    pub fn read_column(&self, column: usize) -> (ScoreSet, u32) {
        let mut scores = ScoreSet::default();
        for criterion in &CRITERIA {
            scores.set(criterion.id, self.score_at(&[criterion.label], column));
        }
        let total = self.score_at(&TOTAL_LABELS, column);
        (scores, total)
    }

    /// Scores from a row whose first cell is the model's 1-based position.
    ///
    /// The purely numeric cells after it are read as the eleven criteria
    /// in rubric order, then the total. Rows with fewer numbers are
    /// ignored.
    pub fn read_positional_row(&self, position: usize) -> Option<(ScoreSet, u32)> {
        let wanted = (position + 1).to_string();

        self.rows.iter().map(|&row| split_cells(row)).find_map(|cells| {
            let (first, rest) = cells.split_first()?;
            if *first != wanted {
                return None;
            }

            let numbers: Vec<u32> = rest
                .iter()
                .filter(|cell| is_numeric(cell))
                .map(|cell| parse_digits(cell))
                .collect();

            if numbers.len() < POSITIONAL_MIN_NUMBERS {
                debug!(
                    position,
                    found = numbers.len(),
                    "Positional row has too few numeric cells"
                );
                return None;
            }

            let mut ordered = [0u32; 11];
            ordered.copy_from_slice(&numbers[..11]);
            Some((ScoreSet::from_ordered(ordered), numbers[11]))
        })
    }
}

/// Reads the mapped column of the criteria table.
pub struct TableColumns;

impl ExtractionStrategy for TableColumns {
    fn source(&self) -> ScoreSource {
        ScoreSource::TableColumns
    }

    fn extract(&self, ctx: &ExtractionContext<'_>, position: usize) -> Option<PartialScores> {
        let aliases = ctx.aliases.get(position)?;
        let Some(column) = ctx.table.column_for(aliases.names()) else {
            debug!(
                model = %ctx.models[position].display_name,
                "No table column matched any alias"
            );
            return None;
        };

        let (scores, total) = ctx.table.read_column(column);
        debug!(
            model = %ctx.models[position].display_name,
            column,
            sum = scores.sum(),
            total,
            "Read scores from table column"
        );
        Some(PartialScores {
            scores: Some(scores),
            total: Some(total),
        })
    }
}

/// Reads a row indexed by model position.
pub struct TableRowPosition;

impl ExtractionStrategy for TableRowPosition {
    fn source(&self) -> ScoreSource {
        ScoreSource::TableRow
    }

    fn extract(&self, ctx: &ExtractionContext<'_>, position: usize) -> Option<PartialScores> {
        let (scores, total) = ctx.table.read_positional_row(position)?;
        debug!(position, total, "Read scores from positional table row");
        Some(PartialScores {
            scores: Some(scores),
            total: Some(total),
        })
    }
}

/// The part of a line from its first to its last pipe, if it has two.
fn pipe_span(line: &str) -> Option<&str> {
    let start = line.find('|')?;
    let end = line.rfind('|')?;
    (end > start).then(|| &line[start..=end])
}

/// Split a row on pipes, trimming cells and discarding empty ones.
pub fn split_cells(row: &str) -> Vec<&str> {
    row.split('|')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect()
}

/// First run of ASCII digits in a cell.
pub fn first_number(cell: &str) -> Option<u32> {
    let start = cell.find(|c: char| c.is_ascii_digit())?;
    let digits = &cell[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    Some(parse_digits(&digits[..end]))
}

/// Parse a non-empty ASCII digit run, saturating at `u32::MAX`.
pub(super) fn parse_digits(digits: &str) -> u32 {
    digits.parse().unwrap_or_else(|_| {
        debug!(value = digits, "Score does not fit in u32, saturating");
        u32::MAX
    })
}

fn is_numeric(cell: &str) -> bool {
    !cell.is_empty() && cell.chars().all(|c| c.is_ascii_digit())
}

/// Whether a cell names `label`.
///
/// Accepts `label`, `- label` (criteria nested under a category row) and
/// `**label**`, optionally followed by a suffix such as ` (4分)`.
fn cell_names(cell: &str, label: &str) -> bool {
    let cell = cell.trim_matches('*').trim();
    let cell = cell.strip_prefix('-').map(str::trim_start).unwrap_or(cell);
    let cell = cell.trim_start_matches('*');

    let Some(head) = cell.get(..label.len()) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(label) {
        return false;
    }

    match cell[label.len()..].chars().next() {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, '(' | '（' | ':' | '：' | '*'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "\
| 评估项目 | GPT-4o | DeepSeek |
|---------|---------|---------|
| 内容质量 (0-11分) | 9 | 8 |
| - 相关性 (4分) | 4 | 3 |
| - 准确性 (4分) | 3 | 3 |
| - 信息量 (3分) | 2 | 2 |
| **总分 (30分)** | 24 | 22 |
";

    #[test]
    fn test_pipe_span_trims_commentary() {
        assert_eq!(pipe_span("note: | a | b | trailing"), Some("| a | b |"));
        assert_eq!(pipe_span("only | one"), None);
        assert_eq!(pipe_span("no pipes"), None);
    }

    #[test]
    fn test_split_cells() {
        assert_eq!(split_cells("| 相关性 | 3 |  | 4 |"), vec!["相关性", "3", "4"]);
    }

    #[test]
    fn test_first_number() {
        assert_eq!(first_number("3"), Some(3));
        assert_eq!(first_number("3.5分"), Some(3));
        assert_eq!(first_number("**20**/30"), Some(20));
        assert_eq!(first_number("N/A"), None);
        assert_eq!(first_number("99999999999分"), Some(u32::MAX));
    }

    #[test]
    fn test_cell_names() {
        assert!(cell_names("相关性", "相关性"));
        assert!(cell_names("- 相关性 (4分)", "相关性"));
        assert!(cell_names("**总分 (30分)**", "总分"));
        assert!(cell_names("TOTAL", "Total"));
        assert!(!cell_names("不相关性", "相关性"));
        assert!(!cell_names("总分数说明", "总分"));
    }

    #[test]
    fn test_header_detection() {
        let table = JudgeTable::parse(TEMPLATE);
        assert!(table.has_header());
        assert_eq!(
            table.header_cells().unwrap(),
            vec!["评估项目", "GPT-4o", "DeepSeek"]
        );
    }

    #[test]
    fn test_no_header_without_markers() {
        let table = JudgeTable::parse("| a | b |\n| 1 | 2 |");
        assert_eq!(table.rows().len(), 2);
        assert!(!table.has_header());
        assert_eq!(table.column_for(&["a"]), None);
    }

    #[test]
    fn test_column_for_prefers_exact_match() {
        let table = JudgeTable::parse("| 评估项目 | GPT-4o | GPT-4 |");
        assert_eq!(table.column_for(&["GPT-4"]), Some(2));
        assert_eq!(table.column_for(&["GPT-4o"]), Some(1));
    }

    #[test]
    fn test_column_for_substring_match() {
        let table = JudgeTable::parse("| 评估项目 | 模型A (GPT) | 模型B (Claude) |");
        assert_eq!(table.column_for(&["Claude"]), Some(2));
        assert_eq!(table.column_for(&["", "missing"]), None);
    }

    #[test]
    fn test_read_column_nested_rows() {
        let table = JudgeTable::parse(TEMPLATE);
        let (scores, total) = table.read_column(2);
        assert_eq!(scores.relevance, 3);
        assert_eq!(scores.accuracy, 3);
        assert_eq!(scores.information, 2);
        assert_eq!(scores.fluency, 0);
        assert_eq!(total, 22);
    }

    #[test]
    fn test_short_row_is_a_miss() {
        let table = JudgeTable::parse("| 评估项目 | A | B |\n| 相关性 | 3 |");
        assert_eq!(table.score_at(&["相关性"], 1), 3);
        assert_eq!(table.score_at(&["相关性"], 2), 0);
    }

    #[test]
    fn test_positional_row() {
        let text = "\
| 序号 | 相关性 | 准确性 | 信息量 | 流畅性 | 语法 | 风格 | 创新 | 吸引 | 公平 | 安全 | 合规 | 总分 |
| 1 | 4 | 3 | 3 | 2 | 2 | 2 | 3 | 2 | 2 | 2 | 2 | 27 |
| 2 | 3 | 3 | 2 | 2 | 1 | 2 | 2 | 2 | 2 | 2 | 2 | 23 |
";
        let table = JudgeTable::parse(text);
        let (scores, total) = table.read_positional_row(1).unwrap();
        assert_eq!(scores.relevance, 3);
        assert_eq!(scores.grammar, 1);
        assert_eq!(total, 23);
        assert!(table.read_positional_row(2).is_none());
    }

    #[test]
    fn test_positional_row_keeps_order_past_oversized_cell() {
        let table =
            JudgeTable::parse("| 1 | 99999999999 | 3 | 3 | 2 | 2 | 2 | 3 | 2 | 2 | 2 | 1 | 25 |");
        let (scores, total) = table.read_positional_row(0).unwrap();
        assert_eq!(scores.relevance, u32::MAX);
        assert_eq!(scores.accuracy, 3);
        assert_eq!(scores.compliance, 1);
        assert_eq!(total, 25);
    }

    #[test]
    fn test_positional_row_needs_twelve_numbers() {
        let table = JudgeTable::parse("| 1 | 4 | 3 | 3 |");
        assert!(table.read_positional_row(0).is_none());
    }
}
