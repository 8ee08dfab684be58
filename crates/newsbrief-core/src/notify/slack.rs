use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::message::{Block, SlackMessage};
use super::Notifier;
use crate::ai::Summary;
use crate::config::SlackConfig;
use crate::{Error, Result};

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
    blocks: &'a [Block],
    mrkdwn: bool,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
}

/// Posts summaries through the Slack Web API `chat.postMessage` method
pub struct SlackNotifier {
    client: Client,
    token: String,
    endpoint: String,
    header: String,
}

impl SlackNotifier {
    pub fn new(token: &str, config: &SlackConfig, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            token: token.to_string(),
            endpoint: format!("{}/chat.postMessage", config.api_base_url.trim_end_matches('/')),
            header: config.header.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn post(&self, summary: &Summary, channel: &str) -> Result<()> {
        let message = SlackMessage::from_summary(summary, &self.header);
        let request = PostMessageRequest {
            channel,
            text: &message.text,
            blocks: &message.blocks,
            mrkdwn: true,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Notify(format!("Slack request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Notify(format!("Slack returned HTTP {}", status)));
        }

        let reply: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| Error::Notify(format!("Failed to parse Slack response: {}", e)))?;

        check_reply(reply)
    }
}

fn check_reply(reply: PostMessageResponse) -> Result<()> {
    if reply.ok {
        Ok(())
    } else {
        Err(Error::Notify(format!(
            "Slack API error: {}",
            reply.error.unwrap_or_else(|| "unknown_error".to_string())
        )))
    }
}
