mod dry_run;
mod message;
mod slack;

pub use dry_run::DryRunNotifier;
pub use message::{Block, SlackMessage, TextObject};
pub use slack::SlackNotifier;

use crate::ai::Summary;
use crate::Result;

/// Delivers one summary to a chat channel
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn post(&self, summary: &Summary, channel: &str) -> Result<()>;
}
