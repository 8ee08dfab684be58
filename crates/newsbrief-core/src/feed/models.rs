use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A single item discovered from a feed during this run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub title: String,
    pub link: String,
    /// Published timestamp, or updated when the feed has no published date
    pub published_at: DateTime<FixedOffset>,
    /// Plain-text body, inline from the feed or resolved from the link
    pub content: Option<String>,
}

impl Entry {
    /// Inline content that is present and not just whitespace
    pub fn usable_content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }
}

/// An entry tagged with its source's content extraction opt-in
#[derive(Debug, Clone)]
pub struct Candidate {
    pub entry: Entry,
    pub extract_content: bool,
}
