use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};

use super::ChatModel;
use crate::config::OpenAiConfig;
use crate::{Error, Result};

/// OpenAI chat completion provider
pub struct OpenAiChatModel {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiChatModel {
    pub fn new(api_key: &str, config: &OpenAiConfig, timeout_secs: u64) -> Result<Self> {
        let mut openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_org_id(&config.organization_id);
        if let Some(ref api_base) = config.api_base {
            openai_config = openai_config.with_api_base(api_base);
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        let client = Client::with_config(openai_config).with_http_client(http_client);

        Ok(Self {
            client,
            model: config.model.clone(),
        })
    }
}

#[async_trait::async_trait]
impl ChatModel for OpenAiChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(system)
                        .build()
                        .map_err(|e| Error::AiProvider(e.to_string()))?,
                ),
                ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(user)
                        .build()
                        .map_err(|e| Error::AiProvider(e.to_string()))?,
                ),
            ])
            .build()
            .map_err(|e| Error::AiProvider(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| Error::AiProvider(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::AiProvider("completion returned no content".to_string()))
    }
}
