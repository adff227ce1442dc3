//! Score extraction from free-form judge responses.
//!
//! The judge is prompted for a Markdown table but answers however it likes.
//! Extraction is therefore a ladder of independent strategies, each of
//! which may or may not recover something for a given model:
//!
//! 1. [`TableColumns`]: the model's column in the criteria table
//! 2. [`TableRowPosition`]: a row indexed by the model's position
//! 3. [`NarrativeTotal`] / [`NarrativeSection`]: a total mentioned in prose
//! 4. the sum of whatever per-criterion scores were found
//! 5. zeros
//!
//! Nothing in this module returns an error. Every competing model always
//! gets a record, in input order, whatever the judge wrote.
//!
//! Conversation evaluations use a separate, position-indexed reader
//! ([`indexed_scores`]) since that judge scores out of 100 without a table.

mod aliases;
mod conversation;
mod narrative;
mod table;

pub use aliases::{AliasSet, NameResolver};
pub use conversation::indexed_scores;
pub use narrative::{NO_SUGGESTIONS, NarrativeSection, NarrativeTotal, suggestions};
pub use table::{JudgeTable, TableColumns, TableRowPosition};

use crate::record::{CompetingModel, EvaluationRecord, ScoreSet};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Where a score set or total came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    TableColumns,
    TableRow,
    Narrative,
    /// Sum of the per-criterion scores.
    Computed,
    /// Nothing was found.
    Default,
}

/// What a single strategy recovered for one model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartialScores {
    pub scores: Option<ScoreSet>,
    pub total: Option<u32>,
}

impl PartialScores {
    /// A result carrying only a total.
    pub fn total(total: u32) -> Self {
        Self {
            scores: None,
            total: Some(total),
        }
    }

    /// Whether anything non-zero was recovered.
    pub fn has_signal(&self) -> bool {
        self.total.is_some_and(|t| t > 0) || self.scores.is_some_and(|s| !s.is_zero())
    }
}

/// Everything a strategy may consult, computed once per judge response.
pub struct ExtractionContext<'a> {
    pub text: &'a str,
    pub models: &'a [CompetingModel],
    pub table: JudgeTable<'a>,
    /// Alias sets, indexed like `models`.
    pub aliases: Vec<AliasSet>,
}

impl<'a> ExtractionContext<'a> {
    pub fn new(text: &'a str, models: &'a [CompetingModel]) -> Self {
        let table = JudgeTable::parse(text);
        let aliases = NameResolver::resolve(text, models, &table);
        Self {
            text,
            models,
            table,
            aliases,
        }
    }
}

/// One self-contained way of recovering scores for a model.
pub trait ExtractionStrategy {
    /// Provenance tag attached to whatever this strategy finds.
    fn source(&self) -> ScoreSource;

    /// Attempt extraction for the model at `position`.
    fn extract(&self, ctx: &ExtractionContext<'_>, position: usize) -> Option<PartialScores>;
}

/// Extraction outcome for one model, before it becomes a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVerdict {
    pub model_key: String,
    pub scores: ScoreSet,
    pub total_score: u32,
    pub suggestions: String,
    pub scores_source: ScoreSource,
    pub total_source: ScoreSource,
}

/// Runs the strategy ladder for every competing model.
pub struct ScoreAggregator {
    score_strategies: Vec<Box<dyn ExtractionStrategy + Send + Sync>>,
    total_strategies: Vec<Box<dyn ExtractionStrategy + Send + Sync>>,
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self {
            score_strategies: vec![Box::new(TableColumns), Box::new(TableRowPosition)],
            total_strategies: vec![Box::new(NarrativeTotal), Box::new(NarrativeSection)],
        }
    }
}

impl ScoreAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom strategy ladders.
    ///
    /// `score_strategies` are tried first and may yield both scores and a
    /// total; `total_strategies` only fill in a missing total.
    pub fn with_strategies(
        score_strategies: Vec<Box<dyn ExtractionStrategy + Send + Sync>>,
        total_strategies: Vec<Box<dyn ExtractionStrategy + Send + Sync>>,
    ) -> Self {
        Self {
            score_strategies,
            total_strategies,
        }
    }

    /// One verdict per model, in input order.
    pub fn evaluate(&self, judge_text: &str, models: &[CompetingModel]) -> Vec<ModelVerdict> {
        let ctx = ExtractionContext::new(judge_text, models);
        (0..models.len())
            .map(|position| self.evaluate_model(&ctx, position))
            .collect()
    }

    /// One evaluation record per model, in input order.
    ///
    /// `answers` maps model keys to the competitor's raw answer.
    pub fn build_records(
        &self,
        judge_text: &str,
        models: &[CompetingModel],
        prompt: &str,
        answers: &HashMap<String, String>,
    ) -> Vec<EvaluationRecord> {
        self.evaluate(judge_text, models)
            .into_iter()
            .zip(models)
            .enumerate()
            .map(|(position, (verdict, model))| {
                EvaluationRecord::new(
                    position,
                    model,
                    prompt,
                    answers.get(&model.key).map(String::as_str),
                    verdict.scores,
                    verdict.total_score,
                    verdict.suggestions,
                )
            })
            .collect()
    }

    fn evaluate_model(&self, ctx: &ExtractionContext<'_>, position: usize) -> ModelVerdict {
        let model = &ctx.models[position];

        let mut scores = ScoreSet::default();
        let mut scores_source = ScoreSource::Default;
        let mut total: Option<(u32, ScoreSource)> = None;

        for strategy in &self.score_strategies {
            let Some(found) = strategy.extract(ctx, position) else {
                continue;
            };
            if !found.has_signal() {
                debug!(model = %model.display_name, source = ?strategy.source(), "Strategy found only zeros");
                continue;
            }
            scores = found.scores.unwrap_or_default();
            scores_source = strategy.source();
            total = found.total.filter(|t| *t > 0).map(|t| (t, scores_source));
            break;
        }

        if total.is_none() {
            total = self.total_strategies.iter().find_map(|strategy| {
                strategy
                    .extract(ctx, position)
                    .and_then(|found| found.total)
                    .filter(|t| *t > 0)
                    .map(|t| (t, strategy.source()))
            });
        }

        let (total_score, total_source) = total.unwrap_or_else(|| {
            if scores.is_zero() {
                (0, ScoreSource::Default)
            } else {
                (scores.sum(), ScoreSource::Computed)
            }
        });

        let suggestions =
            narrative::suggestions(ctx, position).unwrap_or_else(|| NO_SUGGESTIONS.to_string());

        debug!(
            model = %model.display_name,
            total_score,
            scores_source = ?scores_source,
            total_source = ?total_source,
            "Model verdict"
        );

        ModelVerdict {
            model_key: model.key.clone(),
            scores,
            total_score,
            suggestions,
            scores_source,
            total_source,
        }
    }
}

/// Compile a pattern, logging instead of failing on a bad one.
fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(error = %e, "Failed to compile extraction regex");
            None
        }
    }
}
