use bytes::Bytes;
use chrono::FixedOffset;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use url::Url;

use super::models::Candidate;
use super::parser::{parse_feed, ParsedFeed};
use crate::config::FeedSource;
use crate::{Error, Result};

const MAX_FEED_BYTES: usize = 5 * 1024 * 1024;
const MAX_RETRIES: u32 = 3;
const INITIAL_RETRY_DELAY_MS: u64 = 500;

// Rotating User-Agent pool - some publishers reject non-browser clients
static USER_AGENT_INDEX: AtomicUsize = AtomicUsize::new(0);
const USER_AGENTS: &[&str] = &[
    // Chrome on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    // Safari on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// Get the next User-Agent in rotation
pub(crate) fn next_user_agent() -> &'static str {
    let index = USER_AGENT_INDEX.fetch_add(1, Ordering::Relaxed) % USER_AGENTS.len();
    USER_AGENTS[index]
}

/// Build an HTTP client with the given timeout and transparent decompression
pub(crate) fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(Error::Http)
}

/// Build browser-like headers for a request
pub(crate) fn build_headers(user_agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,application/rss+xml,application/atom+xml,*/*;q=0.8"
        )
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9,ja;q=0.8")
    );
    if let Ok(ua) = HeaderValue::from_str(user_agent) {
        headers.insert(USER_AGENT, ua);
    }
    headers
}

/// Produces the candidate entries of one run from the configured sources
#[async_trait::async_trait]
pub trait EntrySource: Send + Sync {
    /// Fetch every source; a failing source is logged and skipped
    async fn collect(&self, sources: &[FeedSource]) -> Vec<Candidate>;
}

/// Feed fetcher with HTTP client and timestamp normalization
pub struct FeedFetcher {
    client: Client,
    offset: FixedOffset,
}

impl FeedFetcher {
    pub fn new(timeout_secs: u64, offset: FixedOffset) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            offset,
        })
    }

    /// Fetch with retry and exponential backoff
    async fn fetch_with_retry(&self, url: &str) -> Result<(reqwest::StatusCode, Bytes)> {
        let mut last_error = None;
        let mut delay_ms = INITIAL_RETRY_DELAY_MS;

        for attempt in 0..MAX_RETRIES {
            let user_agent = next_user_agent();

            tracing::debug!("Fetch attempt {} for {}", attempt + 1, url);

            match self.client
                .get(url)
                .headers(build_headers(user_agent))
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS
                        || status == reqwest::StatusCode::SERVICE_UNAVAILABLE
                    {
                        tracing::warn!(
                            "Received {} for {}, retrying after {}ms...",
                            status,
                            url,
                            delay_ms
                        );
                        last_error = Some(Error::FeedParse(format!("HTTP {} for URL: {}", status, url)));
                    } else {
                        match response.bytes().await {
                            Ok(bytes) => return Ok((status, bytes)),
                            Err(e) => {
                                tracing::warn!("Failed to read response body: {}", e);
                                last_error = Some(Error::Http(e));
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Request failed for {} (attempt {}): {}",
                        url,
                        attempt + 1,
                        e
                    );
                    last_error = Some(Error::Http(e));
                }
            }

            if attempt < MAX_RETRIES - 1 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms *= 2;
            }
        }

        Err(last_error.unwrap_or_else(|| Error::FeedParse(format!("Failed to fetch URL after {} retries: {}", MAX_RETRIES, url))))
    }

    /// Fetch and parse a feed from URL
    pub async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        Url::parse(url)?;

        tracing::info!("Fetching feed from: {}", url);

        let (status, content) = self.fetch_with_retry(url).await?;

        if !status.is_success() {
            return Err(Error::FeedParse(format!(
                "HTTP {} for URL: {}",
                status,
                url
            )));
        }

        ensure_content_size(content.len(), url)?;

        if is_cloudflare_challenge(&content) {
            return Err(Error::FeedParse(format!(
                "Cloudflare JavaScript challenge detected for URL: {}",
                url
            )));
        }

        parse_feed(&content, &self.offset)
    }
}

#[async_trait::async_trait]
impl EntrySource for FeedFetcher {
    async fn collect(&self, sources: &[FeedSource]) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for source in sources {
            match self.fetch(&source.url).await {
                Ok(parsed) => {
                    tracing::info!(
                        url = %source.url,
                        len = parsed.entries.len(),
                        skipped = parsed.skipped,
                        "Parsed feed '{}'",
                        parsed.title.as_deref().unwrap_or(&source.url)
                    );
                    candidates.extend(parsed.entries.into_iter().map(|entry| Candidate {
                        entry,
                        extract_content: source.extract_content,
                    }));
                }
                Err(e) => {
                    tracing::error!("Failed to fetch feed '{}': {}", source.url, e);
                }
            }
        }

        candidates
    }
}

/// Check if content is a Cloudflare challenge page
fn is_cloudflare_challenge(content: &[u8]) -> bool {
    // Check first 2KB for Cloudflare markers
    let check_len = content.len().min(2048);
    let preview = String::from_utf8_lossy(&content[..check_len]);

    preview.contains("Just a moment...")
        || preview.contains("cf-browser-verification")
        || preview.contains("_cf_chl_opt")
        || preview.contains("challenge-platform")
}

fn ensure_content_size(size: usize, url: &str) -> Result<()> {
    if size > MAX_FEED_BYTES {
        return Err(Error::FeedParse(format!(
            "Feed too large ({} bytes) for URL: {}",
            size,
            url
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{serve, Reply};

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Loopback</title>
    <item>
      <title>One</title>
      <link>https://example.com/1</link>
      <pubDate>Wed, 01 May 2024 00:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Two</title>
      <link>https://example.com/2</link>
      <pubDate>Wed, 01 May 2024 01:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

    fn fetcher() -> FeedFetcher {
        FeedFetcher::new(5, FixedOffset::east_opt(9 * 3600).unwrap()).unwrap()
    }

    #[test]
    fn test_user_agent_rotation() {
        let agents: Vec<_> = (0..USER_AGENTS.len() * 2).map(|_| next_user_agent()).collect();

        // every agent of the pool shows up
        for ua in USER_AGENTS {
            assert!(agents.contains(ua));
        }
    }

    #[test]
    fn test_cloudflare_detection() {
        assert!(is_cloudflare_challenge(b"<html><title>Just a moment...</title></html>"));
        assert!(!is_cloudflare_challenge(b"<rss version=\"2.0\"></rss>"));
    }

    #[test]
    fn test_content_size_limit() {
        assert!(ensure_content_size(MAX_FEED_BYTES, "u").is_ok());
        assert!(ensure_content_size(MAX_FEED_BYTES + 1, "u").is_err());
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_request() {
        assert!(matches!(fetcher().fetch("not a url").await, Err(Error::UrlParse(_))));
    }

    #[tokio::test]
    async fn test_failing_source_does_not_abort_collection() {
        let sources = vec![
            FeedSource { url: "not a url".into(), extract_content: false },
            FeedSource { url: "::also-bad".into(), extract_content: true },
        ];

        assert!(fetcher().collect(&sources).await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_retries_unavailable_source() {
        let (base, requests) = serve(vec![
            Reply::new(503, "text/plain", "busy"),
            Reply::new(200, "application/rss+xml", RSS),
        ])
        .await;

        let parsed = fetcher().fetch(&base).await.unwrap();

        assert_eq!(parsed.title.as_deref(), Some("Loopback"));
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[0].published_at.offset().local_minus_utc(), 9 * 3600);
        assert_eq!(requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_gives_up_after_rate_limits() {
        let (base, requests) = serve(vec![
            Reply::new(429, "text/plain", "slow down"),
            Reply::new(429, "text/plain", "slow down"),
            Reply::new(429, "text/plain", "slow down"),
        ])
        .await;

        let err = fetcher().fetch(&base).await.unwrap_err();

        assert!(err.to_string().contains("429"));
        assert_eq!(requests.lock().unwrap().len(), MAX_RETRIES as usize);
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_not_retried() {
        let (base, requests) = serve(vec![Reply::new(404, "text/html", "missing")]).await;

        let err = fetcher().fetch(&base).await.unwrap_err();

        assert!(err.to_string().contains("404"));
        assert_eq!(requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_collect_keeps_extraction_flag() {
        let (base, _) = serve(vec![Reply::new(200, "application/rss+xml", RSS)]).await;
        let sources = vec![
            FeedSource { url: "not a url".into(), extract_content: false },
            FeedSource { url: base, extract_content: true },
        ];

        let candidates = fetcher().collect(&sources).await;

        let links: Vec<_> = candidates.iter().map(|c| c.entry.link.as_str()).collect();
        assert_eq!(links, vec!["https://example.com/1", "https://example.com/2"]);
        assert!(candidates.iter().all(|c| c.extract_content));
    }
}
