use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::prompt::PromptTemplate;
use super::providers::ChatModel;
use super::response::extract_summary_json;
use crate::config::SummaryConfig;
use crate::feed::Entry;

/// Single bullet of the summary emitted after every attempt failed
pub const SUMMARY_FAILED_MARKER: &str = "summarization failed";

/// Key-point digest of one entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Translated title (the raw title for fallback summaries)
    pub title: String,
    pub raw_title: String,
    pub points: Vec<String>,
    pub url: String,
    pub updated_at: DateTime<FixedOffset>,
}

impl Summary {
    fn fallback(entry: &Entry) -> Self {
        Self {
            title: entry.title.clone(),
            raw_title: entry.title.clone(),
            points: vec![SUMMARY_FAILED_MARKER.to_string()],
            url: entry.link.clone(),
            updated_at: entry.published_at,
        }
    }

    /// Whether the translated title should be shown next to the raw one
    pub fn is_bilingual(&self) -> bool {
        self.title != self.raw_title
    }
}

/// How a summary was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryOutcome {
    Parsed { attempts: u32 },
    Fallback { attempts: u32 },
}

/// LLM summarizer with a bounded number of attempts per entry
pub struct Summarizer {
    model: Arc<dyn ChatModel>,
    prompt: PromptTemplate,
    max_attempts: u32,
    retry_delay_ms: u64,
}

impl Summarizer {
    pub fn new(model: Arc<dyn ChatModel>, config: &SummaryConfig) -> Self {
        Self {
            model,
            prompt: PromptTemplate::new(&config.language, config.max_points),
            max_attempts: config.max_attempts.max(1),
            retry_delay_ms: config.retry_delay_ms,
        }
    }

    /// Summarize `entry`; never fails, degrading to a fallback summary
    pub async fn summarize(&self, entry: &Entry) -> (Summary, SummaryOutcome) {
        let content = entry.content.as_deref().unwrap_or_default();
        let system = self.prompt.system(&entry.title, content);
        let user = self.prompt.user();

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                let delay = backoff_delay(self.retry_delay_ms, attempt - 1);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            let reply = match self.model.complete(&system, &user).await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        "Failed to request summary for '{}': {}",
                        entry.title,
                        e
                    );
                    continue;
                }
            };

            match extract_summary_json(&reply) {
                Ok(parsed) => {
                    tracing::debug!(attempt, "Summarized '{}'", entry.title);
                    let summary = Summary {
                        title: parsed.title,
                        raw_title: entry.title.clone(),
                        points: parsed.points,
                        url: entry.link.clone(),
                        updated_at: entry.published_at,
                    };
                    return (summary, SummaryOutcome::Parsed { attempts: attempt });
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        "Failed to parse summary for '{}': {}",
                        entry.title,
                        e
                    );
                    tracing::debug!("Response content: {}", reply);
                }
            }
        }

        tracing::error!(
            "Giving up on '{}' after {} attempts with {}",
            entry.title,
            self.max_attempts,
            self.model.name()
        );
        (
            Summary::fallback(entry),
            SummaryOutcome::Fallback { attempts: self.max_attempts },
        )
    }
}

/// Exponential backoff: base, 2*base, 4*base, ... capped at 2^6 * base
fn backoff_delay(base_ms: u64, retry: u32) -> Duration {
    let factor = 2u64.pow(retry.saturating_sub(1).min(6));
    Duration::from_millis(base_ms.saturating_mul(factor))
}
