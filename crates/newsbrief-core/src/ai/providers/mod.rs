mod openai;

pub use openai::OpenAiChatModel;

use crate::Result;

/// Chat-style completion endpoint used by the summarizer
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logging
    fn name(&self) -> &str;

    /// Send one system and one user message, return the raw reply text
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}
