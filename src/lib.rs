//! Model Judge - compare LLM answers and score them with an LLM judge.
//!
//! Several competitor models answer the same question; a judge model grades
//! every answer against a fixed eleven-criterion rubric. Judges are asked for
//! a Markdown score table but rarely follow the format exactly, so the heart
//! of this crate is a tolerant extraction pipeline that turns whatever text
//! the judge produced into one [`EvaluationRecord`] per competitor.
//!
//! # Quick Start
//!
//! Scoring an existing judge response needs no network access:
//!
//! ```
//! use model_judge::{CompetingModel, ScoreAggregator};
//!
//! let judge_text = "\
//! | 评估项目 | GPT-4o | DeepSeek |
//! |---|---|---|
//! | - 相关性 (4分) | 4 | 3 |
//! | **总分 (30分)** | 26 | 21 |";
//!
//! let models = CompetingModel::from_names(["GPT-4o", "DeepSeek"]);
//! let verdicts = ScoreAggregator::new().evaluate(judge_text, &models);
//!
//! assert_eq!(verdicts[0].scores.relevance, 4);
//! assert_eq!(verdicts[1].total_score, 21);
//! ```
//!
//! A full run against an OpenAI-compatible API:
//!
//! ```no_run
//! use model_judge::{CompetingModel, ComparisonRun, Config, LlmClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let client = LlmClient::new(config.llm.clone());
//!     let run = ComparisonRun::new(client, config.llm.model.clone());
//!
//!     let models = CompetingModel::from_names(["gpt-4o-mini", "deepseek-chat"]);
//!     let outcome = run.run("为一款春季限定奶茶写一句广告语", &models).await?;
//!
//!     for record in &outcome.records {
//!         println!("{}: {}", record.model_display_name, record.total_score);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Rubric**: the fixed criteria, ceilings and categories
//! - **NameResolver**: which strings in the judge text name which model
//! - **JudgeTable / TableColumns / TableRowPosition**: table extraction
//! - **NarrativeTotal / NarrativeSection**: totals and suggestions from prose
//! - **ScoreAggregator**: runs the strategy ladder, one record per model
//! - **ComparisonRun**: competitor and judge calls around the aggregator
//! - **ConversationRun**: multi-turn chats with several models, judged out of 100
//! - **HistoryStore**: past evaluations, newest first

pub mod arena;
pub mod config;
pub mod error;
pub mod extract;
pub mod history;
pub mod llm;
pub mod logging;
pub mod record;
pub mod report;
pub mod rubric;

// Re-export commonly used types
pub use arena::{
    ComparisonOutcome, ComparisonRun, Conversation, ConversationOutcome, ConversationRun,
    ConversationVerdict,
};
pub use config::Config;
pub use error::{JudgeError, Result};
pub use extract::{ModelVerdict, ScoreAggregator, ScoreSource};
pub use history::{FileHistoryStore, HistoryEntry, HistoryStore, InMemoryHistoryStore};
pub use llm::{ChatBackend, LlmClient};
pub use record::{CompetingModel, EvaluationRecord, ScoreSet};
pub use rubric::{Category, Criterion, Rubric};
