use chrono::{DateTime, FixedOffset};
use feed_rs::parser;
use html2text::render::TrivialDecorator;

use super::models::Entry;
use crate::{Error, Result};

/// Parsed feed data from RSS/Atom content
#[derive(Debug)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<Entry>,
    /// Items dropped for having no link or no published/updated date
    pub skipped: usize,
}

/// Parse RSS/Atom feed content, normalizing every timestamp to `offset`
pub fn parse_feed(content: &[u8], offset: &FixedOffset) -> Result<ParsedFeed> {
    let feed = parser::parse(content)
        .map_err(|e| Error::FeedParse(e.to_string()))?;

    let title = feed.title.map(|t| t.content);
    let mut skipped = 0;

    let entries = feed.entries.into_iter().filter_map(|entry| {
        let title = entry.title
            .map(|t| t.content)
            .unwrap_or_else(|| "Untitled".to_string());

        let Some(link) = entry.links.first().map(|l| l.href.clone()) else {
            tracing::debug!("Skipping entry '{}' without link", title);
            skipped += 1;
            return None;
        };

        let Some(published_at) = entry.published.or(entry.updated) else {
            tracing::debug!("Skipping entry '{}' without published/updated date", title);
            skipped += 1;
            return None;
        };
        let published_at: DateTime<FixedOffset> = published_at.with_timezone(offset);

        let content = entry.content
            .and_then(|c| c.body)
            .map(|body| html_to_text(&body))
            .filter(|text| !text.trim().is_empty());

        Some(Entry {
            title,
            link,
            published_at,
            content,
        })
    }).collect();

    Ok(ParsedFeed {
        title,
        entries,
        skipped,
    })
}

/// Convert HTML content to plain text, keeping link text but not link targets
fn html_to_text(html: &str) -> String {
    html2text::from_read_with_decorator(html.as_bytes(), 80, TrivialDecorator::new())
        .unwrap_or_else(|_| html.to_string())
}
