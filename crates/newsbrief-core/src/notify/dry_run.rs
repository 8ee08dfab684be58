use super::message::SlackMessage;
use super::Notifier;
use crate::ai::Summary;
use crate::Result;

/// Prints the rendered payload instead of posting it
pub struct DryRunNotifier {
    header: String,
}

impl DryRunNotifier {
    pub fn new(header: &str) -> Self {
        Self {
            header: header.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for DryRunNotifier {
    async fn post(&self, summary: &Summary, channel: &str) -> Result<()> {
        let message = SlackMessage::from_summary(summary, &self.header);
        let payload = serde_json::to_string_pretty(&message)?;

        tracing::info!("Dry run, not posting to #{}", channel);
        println!("{}", payload);
        Ok(())
    }
}
