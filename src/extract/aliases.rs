//! Name resolution: which strings in the judge text refer to which model.
//!
//! Judges rarely echo model names verbatim. Each model gets an ordered
//! alias set seeded with its configured name and positional forms, then
//! extended with names discovered in the table header and in prose
//! sections of the judge text.

use super::compile;
use super::table::JudgeTable;
use crate::record::CompetingModel;
use tracing::debug;

/// Ordered, de-duplicated candidate names for one model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasSet {
    names: Vec<String>,
}

impl AliasSet {
    /// Seed with the display name and positional references.
    pub fn seeded(model: &CompetingModel, position: usize) -> Self {
        let n = position + 1;
        let mut set = Self::default();
        set.push(model.display_name.trim());
        for positional in [
            format!("模型{}", n),
            format!("模型 {}", n),
            format!("第{}个模型", n),
            format!("第 {} 个模型", n),
            format!("Model {}", n),
        ] {
            set.push(positional);
        }
        set
    }

    /// Append a name unless it is empty or already present.
    pub fn push(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if name.is_empty() || self.names.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Builds alias sets for every competing model.
pub struct NameResolver;

impl NameResolver {
    /// One alias set per model, in input order.
    pub fn resolve(
        text: &str,
        models: &[CompetingModel],
        table: &JudgeTable<'_>,
    ) -> Vec<AliasSet> {
        let mut aliases: Vec<AliasSet> = models
            .iter()
            .enumerate()
            .map(|(i, model)| AliasSet::seeded(model, i))
            .collect();

        // The header column order is trusted to follow the prompt order.
        if let Some(header) = table.header_cells() {
            for (set, name) in aliases.iter_mut().zip(header.iter().skip(1)) {
                set.push(*name);
            }
        }

        for name in section_names(text) {
            let owner = models.iter().position(|m| {
                let display = m.display_name.trim();
                !display.is_empty() && name.contains(display)
            });
            match owner {
                Some(i) => {
                    if aliases[i].push(name.clone()) {
                        debug!(model = %models[i].display_name, alias = %name, "Alias from prose section");
                    }
                }
                None => debug!(candidate = %name, "Section name matched no model"),
            }
        }

        aliases
    }
}

/// Leading names of prose sections that look like per-model verdicts.
///
/// Sections are blocks separated by blank lines. A section qualifies when
/// it carries a "total score:" marker or opens with a `模型…:` / `Model …:`
/// label; the candidate is the text before the first colon, line break or
/// `总分`.
fn section_names(text: &str) -> Vec<String> {
    let (Some(splitter), Some(model_label), Some(leading)) = (
        compile(r"\r?\n[ \t]*\r?\n"),
        compile(r"(?:模型|(?i:model))[^:：\n]*[:：]"),
        compile(r"^([^:：\r\n]+?)(?::|：|\r?\n|总分)"),
    ) else {
        return Vec::new();
    };

    splitter
        .split(text)
        .filter(|section| {
            section.contains("总分：")
                || section.contains("总分:")
                || section.to_ascii_lowercase().contains("total score:")
                || model_label.is_match(section)
        })
        .filter_map(|section| {
            let caps = leading.captures(section.trim_start())?;
            let name = caps[1].trim_matches(|c: char| {
                c.is_whitespace() || matches!(c, '#' | '*' | '-' | '>')
            });
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn models(names: &[&str]) -> Vec<CompetingModel> {
        CompetingModel::from_names(names.iter().copied())
    }

    #[test]
    fn test_seeded_aliases() {
        let set = AliasSet::seeded(&CompetingModel::new("model_1", "Claude"), 1);
        assert_eq!(set.names()[0], "Claude");
        assert!(set.contains("模型2"));
        assert!(set.contains("第 2 个模型"));
        assert!(set.contains("Model 2"));
    }

    #[test]
    fn test_empty_display_name_is_skipped() {
        let set = AliasSet::seeded(&CompetingModel::new("model_0", "  "), 0);
        assert!(!set.is_empty());
        assert_eq!(set.names()[0], "模型1");
    }

    #[test]
    fn test_push_deduplicates() {
        let mut set = AliasSet::default();
        assert!(set.push("A"));
        assert!(!set.push("A"));
        assert!(!set.push(""));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_header_cells_join_by_position() {
        let text = "| 评估项目 | 模型甲 | 模型乙 | 多余列 |";
        let models = models(&["GPT-4o", "DeepSeek"]);
        let table = JudgeTable::parse(text);
        let aliases = NameResolver::resolve(text, &models, &table);

        assert_eq!(aliases.len(), 2);
        assert!(aliases[0].contains("模型甲"));
        assert!(aliases[1].contains("模型乙"));
        assert!(!aliases[1].contains("多余列"));
    }

    #[test]
    fn test_section_names_attach_to_matching_model() {
        let text = "\
### DeepSeek-V3 评测：
总分：25

### GPT-4o 评测：
总分：22

总结：两者都不错";
        let models = models(&["GPT-4o", "DeepSeek"]);
        let table = JudgeTable::parse(text);
        let aliases = NameResolver::resolve(text, &models, &table);

        assert!(aliases[0].contains("GPT-4o 评测"));
        assert!(aliases[1].contains("DeepSeek-V3 评测"));
        assert!(!aliases[0].contains("总结"));
        assert!(!aliases[1].contains("总结"));
    }

    #[test]
    fn test_no_matches_keeps_seeded_aliases() {
        let models = models(&["A", "B"]);
        let table = JudgeTable::parse("");
        let aliases = NameResolver::resolve("", &models, &table);

        assert_eq!(aliases[0], AliasSet::seeded(&models[0], 0));
        assert_eq!(aliases[1], AliasSet::seeded(&models[1], 1));
    }

    #[test]
    fn test_first_model_wins_on_ambiguous_name() {
        let text = "GPT-4 vs GPT-4o 总分：20";
        let models = models(&["GPT-4", "GPT-4o"]);
        let table = JudgeTable::parse(text);
        let aliases = NameResolver::resolve(text, &models, &table);

        assert!(aliases[0].contains("GPT-4 vs GPT-4o"));
        assert!(!aliases[1].contains("GPT-4 vs GPT-4o"));
    }
}
