//! Orchestration around the judge.
//!
//! [`ComparisonRun`] puts one question to every competitor and asks the
//! judge for a rubric table. [`ConversationRun`] keeps a multi-turn chat
//! with each model and asks the judge for a 100-point score per model.
//!
//! Upstream failures never abort a run. A failed competitor call is
//! replaced by an error-shaped answer and a failed judge call by an
//! error-shaped judge text; both flow through extraction like any other
//! text and simply score zero.

use crate::error::{JudgeError, Result};
use crate::extract::{ScoreAggregator, indexed_scores};
use crate::llm::{CONVERSATION_JUDGE_SYSTEM, ChatBackend, Message, Prompts};
use crate::record::{CompetingModel, EvaluationRecord};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};

/// Text substituted for an upstream failure.
pub fn error_text(err: &JudgeError) -> String {
    format!("错误：{}", err)
}

/// Everything produced by one comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonOutcome {
    pub question: String,
    pub judge_model: String,
    /// Competitor answers keyed by model key.
    pub answers: HashMap<String, String>,
    pub judge_text: String,
    pub records: Vec<EvaluationRecord>,
    pub elapsed_secs: f64,
}

/// Runs one question against a set of competitors and a judge.
pub struct ComparisonRun<B> {
    backend: B,
    judge_model: String,
    aggregator: ScoreAggregator,
}

impl<B: ChatBackend> ComparisonRun<B> {
    /// Create a run that asks `judge_model` to score the competitors.
    pub fn new(backend: B, judge_model: impl Into<String>) -> Self {
        Self {
            backend,
            judge_model: judge_model.into(),
            aggregator: ScoreAggregator::new(),
        }
    }

    /// Replace the default extraction ladder.
    pub fn with_aggregator(mut self, aggregator: ScoreAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn judge_model(&self) -> &str {
        &self.judge_model
    }

    /// Ask every competitor, then the judge, and score the verdict.
    ///
    /// Fails only on invalid input: an empty question, no competitors or
    /// a competitor without a name.
    pub async fn run(&self, question: &str, models: &[CompetingModel]) -> Result<ComparisonOutcome> {
        if question.trim().is_empty() {
            return Err(JudgeError::InvalidConfig("question must not be empty".to_string()));
        }
        if models.is_empty() {
            return Err(JudgeError::NoCompetitors);
        }
        if let Some(unnamed) = models.iter().find(|m| m.display_name.trim().is_empty()) {
            return Err(JudgeError::InvalidConfig(format!(
                "competitor '{}' has no model name",
                unnamed.key
            )));
        }

        let start = Instant::now();
        info!(competitors = models.len(), judge = %self.judge_model, "Starting comparison");

        let answers = self.collect_answers(question, models).await;

        let system = Prompts::judge_system(question, models, &answers);
        let judge_text = match self
            .backend
            .complete(&self.judge_model, Some(&system), question)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(judge = %self.judge_model, error = %e, "Judge call failed");
                error_text(&e)
            }
        };

        let records = self
            .aggregator
            .build_records(&judge_text, models, question, &answers);

        let elapsed_secs = start.elapsed().as_secs_f64();
        info!(records = records.len(), elapsed_secs, "Comparison finished");

        Ok(ComparisonOutcome {
            question: question.to_string(),
            judge_model: self.judge_model.clone(),
            answers,
            judge_text,
            records,
            elapsed_secs,
        })
    }

    /// Fetch all competitor answers concurrently.
    async fn collect_answers(
        &self,
        question: &str,
        models: &[CompetingModel],
    ) -> HashMap<String, String> {
        let calls = models
            .iter()
            .map(|model| self.backend.complete(&model.display_name, None, question));
        let results = join_all(calls).await;

        models
            .iter()
            .zip(results)
            .map(|(model, result)| {
                let answer = match result {
                    Ok(answer) => answer,
                    Err(e) => {
                        warn!(model = %model.display_name, error = %e, "Competitor call failed");
                        error_text(&e)
                    }
                };
                (model.key.clone(), answer)
            })
            .collect()
    }
}

/// One model's side of a multi-turn evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub model: String,
    pub messages: Vec<Message>,
}

/// The judge's verdict on one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationVerdict {
    pub model: String,
    /// Out of 100; `None` when the judge gave this model no score.
    pub score: Option<u32>,
    /// The judge's full response, shared by every model.
    pub feedback: String,
}

/// Everything produced by judging a set of conversations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationOutcome {
    pub judge_model: String,
    pub rounds: usize,
    pub conversations: Vec<Conversation>,
    pub judge_text: String,
    pub verdicts: Vec<ConversationVerdict>,
    pub elapsed_secs: f64,
}

/// Several models holding the same multi-turn conversation.
///
/// Every [`send`](Self::send) adds one user turn to all conversations and
/// fetches the replies concurrently; [`evaluate`](Self::evaluate) hands the
/// transcripts to the judge.
pub struct ConversationRun<B> {
    backend: B,
    judge_model: String,
    conversations: Vec<Conversation>,
}

impl<B: ChatBackend> ConversationRun<B> {
    /// Start empty conversations with at least two models.
    pub fn new<I, S>(backend: B, judge_model: impl Into<String>, models: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let conversations: Vec<Conversation> = models
            .into_iter()
            .map(|model| Conversation {
                model: model.into(),
                messages: Vec::new(),
            })
            .collect();

        if conversations.is_empty() {
            return Err(JudgeError::NoCompetitors);
        }
        if conversations.len() < 2 {
            return Err(JudgeError::InvalidConfig(
                "a conversation evaluation needs at least two models".to_string(),
            ));
        }
        if let Some(i) = conversations.iter().position(|c| c.model.trim().is_empty()) {
            return Err(JudgeError::InvalidConfig(format!(
                "conversation {} has no model name",
                i + 1
            )));
        }

        Ok(Self {
            backend,
            judge_model: judge_model.into(),
            conversations,
        })
    }

    pub fn judge_model(&self) -> &str {
        &self.judge_model
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Completed user/assistant rounds.
    pub fn rounds(&self) -> usize {
        self.conversations
            .first()
            .map(|c| c.messages.len() / 2)
            .unwrap_or(0)
    }

    /// Send one user turn to every model and record the replies.
    ///
    /// Replies come back in model order. A failed call is recorded as
    /// error text so the histories stay aligned.
    pub async fn send(&mut self, user: &str) -> Result<Vec<String>> {
        if user.trim().is_empty() {
            return Err(JudgeError::InvalidConfig("message must not be empty".to_string()));
        }

        for conversation in &mut self.conversations {
            conversation.messages.push(Message::user(user));
        }

        let round = self.rounds() + 1;
        info!(round, models = self.conversations.len(), "Sending conversation turn");

        let calls = self
            .conversations
            .iter()
            .map(|c| self.backend.converse(&c.model, &c.messages));
        let results = join_all(calls).await;

        let replies: Vec<String> = self
            .conversations
            .iter()
            .zip(results)
            .map(|(conversation, result)| match result {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(model = %conversation.model, round, error = %e, "Conversation call failed");
                    error_text(&e)
                }
            })
            .collect();

        for (conversation, reply) in self.conversations.iter_mut().zip(&replies) {
            conversation.messages.push(Message::assistant(reply.clone()));
        }

        Ok(replies)
    }

    /// Ask the judge to score every conversation out of 100.
    ///
    /// Needs at least one completed round.
    pub async fn evaluate(&self) -> Result<ConversationOutcome> {
        let rounds = self.rounds();
        if rounds == 0 {
            return Err(JudgeError::InvalidConfig(
                "nothing to evaluate before the first round".to_string(),
            ));
        }

        let start = Instant::now();
        info!(rounds, judge = %self.judge_model, "Judging conversations");

        let prompt = Prompts::conversation_judge(&self.conversations);
        let judge_text = match self
            .backend
            .complete(&self.judge_model, Some(CONVERSATION_JUDGE_SYSTEM), &prompt)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(judge = %self.judge_model, error = %e, "Judge call failed");
                error_text(&e)
            }
        };

        let scores = indexed_scores(&judge_text, self.conversations.len());
        let verdicts = self
            .conversations
            .iter()
            .zip(scores)
            .map(|(conversation, score)| ConversationVerdict {
                model: conversation.model.clone(),
                score,
                feedback: judge_text.clone(),
            })
            .collect();

        let elapsed_secs = start.elapsed().as_secs_f64();
        info!(elapsed_secs, "Conversation evaluation finished");

        Ok(ConversationOutcome {
            judge_model: self.judge_model.clone(),
            rounds,
            conversations: self.conversations.clone(),
            judge_text,
            verdicts,
            elapsed_secs,
        })
    }

    /// Forget every turn, keeping the models.
    pub fn clear(&mut self) {
        for conversation in &mut self.conversations {
            conversation.messages.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::NO_SUGGESTIONS;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers from a fixed script; unknown models fail.
    struct ScriptedBackend {
        replies: HashMap<String, String>,
        calls: Mutex<Vec<(String, bool)>>,
        histories: Mutex<Vec<(String, usize)>>,
    }

    impl ScriptedBackend {
        fn new(replies: &[(&str, &str)]) -> Self {
            Self {
                replies: replies
                    .iter()
                    .map(|(m, r)| (m.to_string(), r.to_string()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
                histories: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn complete(&self, model: &str, system: Option<&str>, _user: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), system.is_some()));
            self.replies
                .get(model)
                .cloned()
                .ok_or_else(|| JudgeError::LlmApi(format!("unknown model {}", model)))
        }

        async fn converse(&self, model: &str, messages: &[Message]) -> Result<String> {
            self.histories
                .lock()
                .unwrap()
                .push((model.to_string(), messages.len()));
            self.complete(model, None, "").await
        }
    }

    const JUDGE_TEXT: &str = "\
| 评估项目 | GPT-4o | DeepSeek |
|---|---|---|
| - 相关性 (4分) | 4 | 3 |
| - 准确性 (4分) | 3 | 3 |
| **总分 (30分)** | 25 | 20 |

DeepSeek 不足：结尾仓促。";

    #[test]
    fn test_run_scores_every_competitor() {
        let backend = ScriptedBackend::new(&[
            ("GPT-4o", "答案一"),
            ("DeepSeek", "答案二"),
            ("judge", JUDGE_TEXT),
        ]);
        let run = ComparisonRun::new(backend, "judge");
        let models = CompetingModel::from_names(["GPT-4o", "DeepSeek"]);

        let outcome = tokio_test::block_on(run.run("写一句广告语", &models)).unwrap();

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].total_score, 25);
        assert_eq!(outcome.records[0].raw_answer, "答案一");
        assert_eq!(outcome.records[0].suggestions, NO_SUGGESTIONS);
        assert_eq!(outcome.records[1].scores.relevance, 3);
        assert_eq!(outcome.records[1].suggestions, "结尾仓促。");

        let calls = run.backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls.last().unwrap(), &("judge".to_string(), true));
    }

    #[test]
    fn test_failed_competitor_becomes_error_text() {
        let backend = ScriptedBackend::new(&[("GPT-4o", "答案一"), ("judge", JUDGE_TEXT)]);
        let run = ComparisonRun::new(backend, "judge");
        let models = CompetingModel::from_names(["GPT-4o", "DeepSeek"]);

        let outcome = tokio_test::block_on(run.run("问题", &models)).unwrap();

        assert!(outcome.answers["model_1"].starts_with("错误："));
        assert!(outcome.records[1].raw_answer.starts_with("错误："));
        assert_eq!(outcome.records[1].total_score, 20);
    }

    #[test]
    fn test_failed_judge_scores_zero() {
        let backend = ScriptedBackend::new(&[("A", "a"), ("B", "b")]);
        let run = ComparisonRun::new(backend, "judge");
        let models = CompetingModel::from_names(["A", "B"]);

        let outcome = tokio_test::block_on(run.run("问题", &models)).unwrap();

        assert!(outcome.judge_text.starts_with("错误："));
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.records.iter().all(|r| r.total_score == 0));
        assert!(outcome.records.iter().all(|r| r.scores.is_zero()));
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        let run = ComparisonRun::new(ScriptedBackend::new(&[]), "judge");

        let none = tokio_test::block_on(run.run("问题", &[]));
        assert!(matches!(none, Err(JudgeError::NoCompetitors)));

        let models = CompetingModel::from_names(["A"]);
        let blank = tokio_test::block_on(run.run("  ", &models));
        assert!(matches!(blank, Err(JudgeError::InvalidConfig(_))));

        let unnamed = CompetingModel::from_names(["A", " "]);
        let unnamed = tokio_test::block_on(run.run("问题", &unnamed));
        assert!(matches!(unnamed, Err(JudgeError::InvalidConfig(_))));

        assert!(run.backend.calls.lock().unwrap().is_empty());
    }

    const CONVERSATION_VERDICT: &str = "\
模型 1 得分：88
模型 2 得分：61

模型 1 在两轮中都保持了上下文。";

    #[test]
    fn test_conversation_rounds_keep_history() {
        let backend = ScriptedBackend::new(&[("gpt-4o", "好的"), ("deepseek-chat", "明白")]);
        let mut run = ConversationRun::new(backend, "judge", ["gpt-4o", "deepseek-chat"]).unwrap();

        let replies = tokio_test::block_on(run.send("推荐一本书")).unwrap();
        assert_eq!(replies, vec!["好的", "明白"]);
        tokio_test::block_on(run.send("为什么？")).unwrap();

        assert_eq!(run.rounds(), 2);
        let first = &run.conversations()[0];
        assert_eq!(first.messages.len(), 4);
        assert_eq!(first.messages[2].content, "为什么？");
        assert_eq!(first.messages[3].content, "好的");

        let histories = run.backend.histories.lock().unwrap();
        assert_eq!(histories.len(), 4);
        assert!(histories[..2].iter().all(|(_, len)| *len == 1));
        assert!(histories[2..].iter().all(|(_, len)| *len == 3));
    }

    #[test]
    fn test_conversation_failure_keeps_histories_aligned() {
        let backend = ScriptedBackend::new(&[("gpt-4o", "好的")]);
        let mut run = ConversationRun::new(backend, "judge", ["gpt-4o", "missing"]).unwrap();

        let replies = tokio_test::block_on(run.send("你好")).unwrap();
        assert!(replies[1].starts_with("错误："));
        assert_eq!(run.conversations()[1].messages.len(), 2);
        assert_eq!(run.rounds(), 1);
    }

    #[test]
    fn test_conversation_evaluation_scores_by_position() {
        let backend = ScriptedBackend::new(&[
            ("gpt-4o", "好的"),
            ("deepseek-chat", "明白"),
            ("judge", CONVERSATION_VERDICT),
        ]);
        let mut run = ConversationRun::new(backend, "judge", ["gpt-4o", "deepseek-chat"]).unwrap();
        tokio_test::block_on(run.send("推荐一本书")).unwrap();

        let outcome = tokio_test::block_on(run.evaluate()).unwrap();

        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.verdicts[0].model, "gpt-4o");
        assert_eq!(outcome.verdicts[0].score, Some(88));
        assert_eq!(outcome.verdicts[1].score, Some(61));
        assert!(outcome.verdicts.iter().all(|v| v.feedback == CONVERSATION_VERDICT));

        let calls = run.backend.calls.lock().unwrap();
        assert_eq!(calls.last().unwrap(), &("judge".to_string(), true));
    }

    #[test]
    fn test_conversation_failed_judge_leaves_scores_empty() {
        let backend = ScriptedBackend::new(&[("a", "1"), ("b", "2")]);
        let mut run = ConversationRun::new(backend, "judge", ["a", "b"]).unwrap();
        tokio_test::block_on(run.send("hi")).unwrap();

        let outcome = tokio_test::block_on(run.evaluate()).unwrap();
        assert!(outcome.judge_text.starts_with("错误："));
        assert!(outcome.verdicts.iter().all(|v| v.score.is_none()));
    }

    #[test]
    fn test_conversation_input_is_validated() {
        let single = ConversationRun::new(ScriptedBackend::new(&[]), "judge", ["a"]);
        assert!(matches!(single, Err(JudgeError::InvalidConfig(_))));

        let none = ConversationRun::new(ScriptedBackend::new(&[]), "judge", Vec::<String>::new());
        assert!(matches!(none, Err(JudgeError::NoCompetitors)));

        let mut run = ConversationRun::new(ScriptedBackend::new(&[]), "judge", ["a", "b"]).unwrap();
        assert!(matches!(
            tokio_test::block_on(run.evaluate()),
            Err(JudgeError::InvalidConfig(_))
        ));
        assert!(matches!(
            tokio_test::block_on(run.send(" ")),
            Err(JudgeError::InvalidConfig(_))
        ));
        assert!(run.backend.calls.lock().unwrap().is_empty());

        tokio_test::block_on(run.send("hi")).unwrap();
        run.clear();
        assert_eq!(run.rounds(), 0);
        assert!(run.conversations().iter().all(|c| c.messages.is_empty()));
    }
}
