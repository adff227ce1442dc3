//! LLM integration module.
//!
//! Provides an OpenAI-compatible client for the competitor and judge calls,
//! the [`ChatBackend`] seam the comparison run is written against, and the
//! judge prompts.

mod client;
mod prompts;

pub use client::{LlmClient, LlmResponse, Message, Role, TokenUsage};
pub use prompts::{CONVERSATION_JUDGE_SYSTEM, NO_ANSWER, Prompts};

use crate::error::Result;
use async_trait::async_trait;

/// A chat service that turns a prompt into plain text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Ask `model` for a single non-streaming completion.
    async fn complete(&self, model: &str, system: Option<&str>, user: &str) -> Result<String>;

    /// Ask `model` to continue a multi-turn conversation.
    ///
    /// The default folds the earlier turns into one user prompt; backends
    /// that speak a chat API should send the history as is.
    async fn converse(&self, model: &str, messages: &[Message]) -> Result<String> {
        let system = messages
            .iter()
            .find(|m| matches!(m.role, Role::System))
            .map(|m| m.content.clone());
        let transcript = messages
            .iter()
            .filter(|m| !matches!(m.role, Role::System))
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        self.complete(model, system.as_deref(), &transcript).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Echoes the prompt it was given.
    struct Echo;

    #[async_trait]
    impl ChatBackend for Echo {
        async fn complete(&self, _model: &str, system: Option<&str>, user: &str) -> Result<String> {
            Ok(format!("[{}] {}", system.unwrap_or("-"), user))
        }
    }

    #[test]
    fn test_default_converse_folds_history() {
        let history = [
            Message::system("简短回答"),
            Message::user("你好"),
            Message::assistant("你好！"),
            Message::user("再见"),
        ];

        let text = tokio_test::block_on(Echo.converse("m", &history)).unwrap();
        assert_eq!(text, "[简短回答] 用户: 你好\n\n助手: 你好！\n\n用户: 再见");
    }
}
