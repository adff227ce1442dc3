//! Competing models, score sets and the evaluation records built from them.

use crate::rubric::{CRITERIA, Category, Criterion};
use serde::{Deserialize, Serialize};

/// Scenario label stamped on every record.
pub const DEFAULT_SCENARIO: &str = "AI生成文案";

/// Stand-in for a competitor answer that never arrived.
pub const MISSING_ANSWER: &str = "未提供内容";

/// Maximum prompt characters kept in a record's excerpt.
const PROMPT_EXCERPT_CHARS: usize = 100;

/// One model under evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetingModel {
    /// Stable internal identifier (e.g. "model_0").
    pub key: String,
    /// Name used when prompting; the judge is expected to echo it back.
    pub display_name: String,
}

impl CompetingModel {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
        }
    }

    /// Build models keyed `model_0`, `model_1`, ... from display names.
    pub fn from_names<I, S>(names: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Self::new(format!("model_{}", i), name))
            .collect()
    }
}

/// Per-criterion integer scores. Every criterion is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub relevance: u32,
    pub accuracy: u32,
    pub information: u32,
    pub fluency: u32,
    pub grammar: u32,
    pub style: u32,
    pub innovation: u32,
    pub appeal: u32,
    pub fairness: u32,
    pub safety: u32,
    pub compliance: u32,
}

impl ScoreSet {
    /// Build from eleven values in rubric order.
    pub fn from_ordered(values: [u32; 11]) -> Self {
        let mut set = Self::default();
        for (criterion, value) in CRITERIA.iter().zip(values) {
            set.set(criterion.id, value);
        }
        set
    }

    /// Score for a criterion id; unknown ids read as 0.
    pub fn get(&self, id: &str) -> u32 {
        match id {
            "relevance" => self.relevance,
            "accuracy" => self.accuracy,
            "information" => self.information,
            "fluency" => self.fluency,
            "grammar" => self.grammar,
            "style" => self.style,
            "innovation" => self.innovation,
            "appeal" => self.appeal,
            "fairness" => self.fairness,
            "safety" => self.safety,
            "compliance" => self.compliance,
            _ => 0,
        }
    }

    /// Set the score for a criterion id. Returns false for unknown ids.
    pub fn set(&mut self, id: &str, value: u32) -> bool {
        let slot = match id {
            "relevance" => &mut self.relevance,
            "accuracy" => &mut self.accuracy,
            "information" => &mut self.information,
            "fluency" => &mut self.fluency,
            "grammar" => &mut self.grammar,
            "style" => &mut self.style,
            "innovation" => &mut self.innovation,
            "appeal" => &mut self.appeal,
            "fairness" => &mut self.fairness,
            "safety" => &mut self.safety,
            "compliance" => &mut self.compliance,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Scores paired with their criteria, in rubric order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static Criterion, u32)> + '_ {
        CRITERIA.iter().map(move |c| (c, self.get(c.id)))
    }

    /// Sum of all scores, saturating at `u32::MAX`.
    pub fn sum(&self) -> u32 {
        self.iter().map(|(_, v)| v).fold(0, u32::saturating_add)
    }

    /// Subtotal of one category.
    pub fn category_total(&self, category: Category) -> u32 {
        self.iter()
            .filter(|(c, _)| c.category == category)
            .map(|(_, v)| v)
            .fold(0, u32::saturating_add)
    }

    pub fn is_zero(&self) -> bool {
        self.iter().all(|(_, v)| v == 0)
    }
}

/// The normalized evaluation of one competing model in one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// 1-based position of the model in the run.
    pub case_id: String,
    pub scenario: String,
    pub model_key: String,
    pub model_display_name: String,
    pub prompt_excerpt: String,
    /// Rough estimate, not a tokenizer count.
    pub prompt_token_estimate: usize,
    pub scores: ScoreSet,
    pub total_score: u32,
    pub suggestions: String,
    pub raw_answer: String,
}

impl EvaluationRecord {
    /// Assemble a record for the model at `position`.
    pub fn new(
        position: usize,
        model: &CompetingModel,
        prompt: &str,
        raw_answer: Option<&str>,
        scores: ScoreSet,
        total_score: u32,
        suggestions: impl Into<String>,
    ) -> Self {
        Self {
            case_id: (position + 1).to_string(),
            scenario: DEFAULT_SCENARIO.to_string(),
            model_key: model.key.clone(),
            model_display_name: model.display_name.clone(),
            prompt_excerpt: excerpt(prompt, PROMPT_EXCERPT_CHARS),
            prompt_token_estimate: estimate_tokens(prompt),
            scores,
            total_score,
            suggestions: suggestions.into(),
            raw_answer: raw_answer.unwrap_or(MISSING_ANSWER).to_string(),
        }
    }
}

/// First `max_chars` characters of `text`, with "..." appended when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Estimate token count from text (rough approximation: chars / 4).
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}
