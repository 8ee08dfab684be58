use serde::Serialize;

use crate::ai::Summary;
use crate::checkpoint::CHECKPOINT_FORMAT;

/// Slack text composition object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextObject {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<bool>,
}

impl TextObject {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            kind: "plain_text",
            text: text.into(),
            emoji: Some(true),
        }
    }

    fn mrkdwn(text: impl Into<String>) -> Self {
        Self {
            kind: "mrkdwn",
            text: text.into(),
            emoji: None,
        }
    }
}

/// Slack layout block
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header { text: TextObject },
    Section { text: TextObject },
}

/// A rendered message: plain-text fallback plus rich blocks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackMessage {
    pub text: String,
    pub blocks: Vec<Block>,
}

impl SlackMessage {
    pub fn from_summary(summary: &Summary, header: &str) -> Self {
        Self {
            text: format!("[{}]", summary.title),
            blocks: vec![
                Block::Header { text: TextObject::plain(header) },
                Block::Section { text: TextObject::mrkdwn(summary.url.clone()) },
                Block::Section { text: TextObject::mrkdwn(title_markdown(summary)) },
                Block::Section {
                    text: TextObject::mrkdwn(format!(
                        "updated: `{}`",
                        summary.updated_at.format(CHECKPOINT_FORMAT)
                    )),
                },
                Block::Section { text: TextObject::mrkdwn(points_markdown(&summary.points)) },
            ],
        }
    }
}

/// Raw title in bold, translated title below it when they differ
fn title_markdown(summary: &Summary) -> String {
    let mut title = format!("*{}*", summary.raw_title);
    if summary.is_bilingual() {
        title.push_str(&format!("\n({})", summary.title));
    }
    title
}

fn points_markdown(points: &[String]) -> String {
    let mut markdown = String::from("```\n");
    for point in points {
        markdown.push_str(&format!("- {}\n", point));
    }
    markdown.push_str("```\n");
    markdown
}
