use chrono::{DateTime, FixedOffset};

use crate::ai::TokenCounter;
use crate::content::ContentResolver;
use crate::feed::{Candidate, Entry};

/// Per-reason counts of a filter pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterStats {
    pub too_old: usize,
    pub no_content: usize,
    pub over_budget: usize,
    pub accepted: usize,
}

/// Selects the entries of a run worth summarizing
pub struct EntryFilter<'a> {
    resolver: &'a dyn ContentResolver,
    counter: &'a dyn TokenCounter,
    token_budget: usize,
}

impl<'a> EntryFilter<'a> {
    pub fn new(resolver: &'a dyn ContentResolver, counter: &'a dyn TokenCounter, token_budget: usize) -> Self {
        Self {
            resolver,
            counter,
            token_budget,
        }
    }

    /// Keep entries published at or after `last` with non-empty content within
    /// the token budget, resolving missing content where the source allows it.
    /// Discovery order is preserved.
    pub async fn filter(&self, candidates: Vec<Candidate>, last: DateTime<FixedOffset>) -> (Vec<Entry>, FilterStats) {
        let mut stats = FilterStats::default();
        let mut targets = Vec::new();

        for Candidate { mut entry, extract_content } in candidates {
            if entry.published_at < last {
                stats.too_old += 1;
                continue;
            }

            if entry.usable_content().is_none() {
                if !extract_content {
                    tracing::debug!("Skipping '{}': no inline content", entry.title);
                    stats.no_content += 1;
                    continue;
                }

                match self.resolver.resolve(&entry).await {
                    Some(text) if !text.trim().is_empty() => entry.content = Some(text),
                    _ => {
                        tracing::debug!("Skipping '{}': content could not be extracted", entry.title);
                        stats.no_content += 1;
                        continue;
                    }
                }
            }

            let tokens = self.counter.count(entry.content.as_deref().unwrap_or_default());
            if tokens > self.token_budget {
                tracing::debug!(
                    "Skipping '{}': {} tokens exceeds budget of {}",
                    entry.title,
                    tokens,
                    self.token_budget
                );
                stats.over_budget += 1;
                continue;
            }

            stats.accepted += 1;
            targets.push(entry);
        }

        tracing::info!(
            accepted = stats.accepted,
            too_old = stats.too_old,
            no_content = stats.no_content,
            over_budget = stats.over_budget,
            "Filtered entries"
        );

        (targets, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use chrono::{Duration, TimeZone};

    /// One token per whitespace-separated word
    struct WordCounter;

    impl TokenCounter for WordCounter {
        fn count(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    /// Resolves links listed in `pages`, records every request
    #[derive(Default)]
    struct FakeResolver {
        pages: Vec<(&'static str, &'static str)>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl ContentResolver for FakeResolver {
        async fn resolve(&self, entry: &Entry) -> Option<String> {
            self.requested.lock().unwrap().push(entry.link.clone());
            self.pages
                .iter()
                .find(|(link, _)| *link == entry.link)
                .map(|(_, text)| text.to_string())
        }
    }

    fn checkpoint() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, 9, 0, 0)
            .unwrap()
    }

    fn candidate(link: &str, published_at: DateTime<FixedOffset>, content: Option<&str>, extract: bool) -> Candidate {
        Candidate {
            entry: Entry {
                title: format!("Title of {}", link),
                link: link.to_string(),
                published_at,
                content: content.map(str::to_string),
            },
            extract_content: extract,
        }
    }

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[tokio::test]
    async fn test_checkpoint_boundary_is_inclusive() {
        let resolver = FakeResolver::default();
        let filter = EntryFilter::new(&resolver, &WordCounter, 100);

        let (targets, stats) = filter
            .filter(
                vec![
                    candidate("on-boundary", checkpoint(), Some("body"), false),
                    candidate("just-before", checkpoint() - Duration::microseconds(1), Some("body"), false),
                ],
                checkpoint(),
            )
            .await;

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].link, "on-boundary");
        assert_eq!(stats.too_old, 1);
    }

    #[tokio::test]
    async fn test_token_budget_edge() {
        let resolver = FakeResolver::default();
        let filter = EntryFilter::new(&resolver, &WordCounter, 10);
        let at_budget = words(10);
        let over_budget = words(11);

        let (targets, stats) = filter
            .filter(
                vec![
                    candidate("at-budget", checkpoint(), Some(at_budget.as_str()), false),
                    candidate("over-budget", checkpoint(), Some(over_budget.as_str()), false),
                ],
                checkpoint(),
            )
            .await;

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].link, "at-budget");
        assert_eq!(stats.over_budget, 1);
    }

    #[tokio::test]
    async fn test_missing_content_resolution() {
        let resolver = FakeResolver {
            pages: vec![("resolvable", "extracted article text"), ("blank", "   ")],
            ..FakeResolver::default()
        };
        let filter = EntryFilter::new(&resolver, &WordCounter, 100);

        let (targets, stats) = filter
            .filter(
                vec![
                    candidate("opted-out", checkpoint(), None, false),
                    candidate("resolvable", checkpoint(), None, true),
                    candidate("unresolvable", checkpoint(), None, true),
                    candidate("blank", checkpoint(), Some("  \n"), true),
                ],
                checkpoint(),
            )
            .await;

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].link, "resolvable");
        assert_eq!(targets[0].content.as_deref(), Some("extracted article text"));
        assert_eq!(stats.no_content, 3);

        // the opted-out source never triggers a fetch
        let requested = resolver.requested.lock().unwrap().clone();
        assert_eq!(requested, vec!["resolvable", "unresolvable", "blank"]);
    }

    #[tokio::test]
    async fn test_old_entries_skip_resolution_and_order_is_kept() {
        let resolver = FakeResolver {
            pages: vec![("old", "text")],
            ..FakeResolver::default()
        };
        let filter = EntryFilter::new(&resolver, &WordCounter, 100);

        let (targets, _) = filter
            .filter(
                vec![
                    candidate("third", checkpoint() + Duration::hours(3), Some("c"), false),
                    candidate("old", checkpoint() - Duration::hours(1), None, true),
                    candidate("first", checkpoint() + Duration::hours(1), Some("a"), false),
                ],
                checkpoint(),
            )
            .await;

        let links: Vec<_> = targets.iter().map(|e| e.link.as_str()).collect();
        assert_eq!(links, vec!["third", "first"]);
        assert!(resolver.requested.lock().unwrap().is_empty());
    }
}
