use std::io::Cursor;

use html2text::render::RichAnnotation;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use url::Url;

use crate::feed::{build_client, build_headers, next_user_agent, Entry};
use crate::{Error, Result};

const MAX_PAGE_BYTES: usize = 5 * 1024 * 1024;
const TEXT_WIDTH: usize = 80;

/// Recovers article text for entries whose feed carried no body
#[async_trait::async_trait]
pub trait ContentResolver: Send + Sync {
    /// Best effort: any failure yields `None`, never an error
    async fn resolve(&self, entry: &Entry) -> Option<String>;
}

/// Fetches the entry link and runs a readability pass over the page
pub struct HttpContentResolver {
    client: Client,
    max_bytes: usize,
}

impl HttpContentResolver {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            max_bytes: MAX_PAGE_BYTES,
        })
    }

    async fn fetch_text(&self, link: &str) -> Result<String> {
        let url = Url::parse(link)?;

        let response = self.client
            .get(url.clone())
            .headers(build_headers(next_user_agent()))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::FeedParse(format!("HTTP {} for URL: {}", status, link)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_ascii_lowercase();

        if !is_textual(&content_type) {
            return Err(Error::FeedParse(format!(
                "Unsupported content type '{}' for URL: {}",
                content_type, link
            )));
        }

        if let Some(len) = response.content_length() {
            self.ensure_page_size(len as usize, link)?;
        }
        let bytes = response.bytes().await?;
        self.ensure_page_size(bytes.len(), link)?;
        let body = String::from_utf8_lossy(&bytes);

        let text = if content_type.starts_with("text/plain") {
            Some(body.trim().to_string()).filter(|t| !t.is_empty())
        } else {
            extract_main_text(&body, &url)
        };

        text.ok_or_else(|| Error::FeedParse(format!("No article text found at {}", link)))
    }

    fn ensure_page_size(&self, size: usize, link: &str) -> Result<()> {
        if size > self.max_bytes {
            return Err(Error::FeedParse(format!(
                "Page too large ({} bytes) for URL: {}",
                size, link
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ContentResolver for HttpContentResolver {
    async fn resolve(&self, entry: &Entry) -> Option<String> {
        match self.fetch_text(&entry.link).await {
            Ok(text) => {
                tracing::debug!("Extracted {} chars from {}", text.len(), entry.link);
                Some(text)
            }
            Err(e) => {
                tracing::warn!("Failed to extract content for '{}': {}", entry.title, e);
                None
            }
        }
    }
}

fn is_textual(content_type: &str) -> bool {
    content_type.starts_with("text/html")
        || content_type.starts_with("application/xhtml+xml")
        || content_type.starts_with("text/plain")
}

/// Strip boilerplate from an HTML page and return its main text, if any.
///
/// Link targets are dropped. A page whose only text sits inside links
/// (navigation, menus) has no main text.
pub fn extract_main_text(html: &str, url: &Url) -> Option<String> {
    let mut reader = Cursor::new(html.as_bytes());

    let product = match readability::extractor::extract(&mut reader, url) {
        Ok(product) => product,
        Err(e) => {
            tracing::debug!("Readability failed for {}: {}", url, e);
            return None;
        }
    };

    let lines = match html2text::from_read_rich(product.content.as_bytes(), TEXT_WIDTH) {
        Ok(lines) => lines,
        Err(e) => {
            tracing::debug!("Failed to render text for {}: {}", url, e);
            return None;
        }
    };

    let has_prose = lines
        .iter()
        .flat_map(|line| line.tagged_strings())
        .filter(|piece| !piece.tag.iter().any(|a| matches!(a, RichAnnotation::Link(_))))
        .any(|piece| piece.s.chars().any(char::is_alphanumeric));
    if !has_prose {
        return None;
    }

    let text = lines
        .iter()
        .map(|line| line.tagged_strings().map(|piece| piece.s.as_str()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");

    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    use crate::test_util::{serve, Reply};

    const ARTICLE: &str = r#"<html>
<head><title>Compiler news</title></head>
<body>
  <nav><a href="/">Home</a> | <a href="/about">About</a></nav>
  <article>
    <h1>Compiler news</h1>
    <p>The compiler team shipped a new borrow checker that accepts more programs while keeping every soundness guarantee intact.</p>
    <p>Benchmarks show compile times dropping by a fifth on large workspaces, see the <a href="https://example.com/bench">whitepaper</a> for details.</p>
    <p>The release also stabilizes several long-awaited language features that library authors have been requesting for years.</p>
  </article>
  <footer>Copyright 2024</footer>
</body>
</html>"#;

    const NAV_ONLY: &str = "<html><body><nav><a href='/'>Home</a></nav></body></html>";

    fn entry(link: &str) -> Entry {
        Entry {
            title: "Linked".into(),
            link: link.into(),
            published_at: FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            content: None,
        }
    }

    #[test]
    fn test_extract_main_text() {
        let url = Url::parse("https://example.com/compiler").unwrap();
        let text = extract_main_text(ARTICLE, &url).unwrap();

        assert!(text.contains("borrow checker"));
        assert!(text.contains("whitepaper"));
        assert!(!text.contains("<p>"));
        assert!(!text.contains("[1]"));
        assert!(!text.contains("https://example.com/bench"));
    }

    #[test]
    fn test_extract_empty_page() {
        let url = Url::parse("https://example.com/empty").unwrap();
        assert!(extract_main_text("<html><body></body></html>", &url).is_none());
    }

    #[test]
    fn test_extract_links_only_page() {
        let url = Url::parse("https://example.com/").unwrap();
        assert!(extract_main_text(NAV_ONLY, &url).is_none());
    }

    #[test]
    fn test_textual_content_types() {
        assert!(is_textual("text/html; charset=utf-8"));
        assert!(is_textual("application/xhtml+xml"));
        assert!(is_textual("text/plain"));
        assert!(!is_textual("application/pdf"));
        assert!(!is_textual("image/png"));
    }

    #[tokio::test]
    async fn test_unreachable_link_resolves_to_none() {
        let resolver = HttpContentResolver::new(1).unwrap();
        assert!(resolver.resolve(&entry("not a url")).await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_html_page() {
        let (base, requests) = serve(vec![Reply::new(200, "text/html; charset=utf-8", ARTICLE)]).await;
        let resolver = HttpContentResolver::new(5).unwrap();

        let text = resolver.resolve(&entry(&format!("{}/compiler", base))).await.unwrap();

        assert!(text.contains("borrow checker"));
        assert!(!text.contains("[1]"));
        assert!(requests.lock().unwrap()[0].starts_with("GET /compiler "));
    }

    #[tokio::test]
    async fn test_resolve_links_only_page_is_none() {
        let (base, _) = serve(vec![Reply::new(200, "text/html", NAV_ONLY)]).await;
        let resolver = HttpContentResolver::new(5).unwrap();

        assert!(resolver.resolve(&entry(&base)).await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_plain_text_is_trimmed() {
        let (base, _) = serve(vec![Reply::new(200, "text/plain", "  hello plain \n")]).await;
        let resolver = HttpContentResolver::new(5).unwrap();

        assert_eq!(resolver.resolve(&entry(&base)).await.as_deref(), Some("hello plain"));
    }

    #[tokio::test]
    async fn test_resolve_error_status_is_none() {
        let (base, _) = serve(vec![Reply::new(404, "text/html", ARTICLE)]).await;
        let resolver = HttpContentResolver::new(5).unwrap();

        assert!(resolver.resolve(&entry(&base)).await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_binary_content_is_none() {
        let (base, _) = serve(vec![Reply::new(200, "application/pdf", "%PDF-1.7")]).await;
        let resolver = HttpContentResolver::new(5).unwrap();

        assert!(resolver.resolve(&entry(&base)).await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_oversized_page_is_none() {
        let (base, _) = serve(vec![Reply::new(200, "text/plain", "x".repeat(65))]).await;
        let resolver = HttpContentResolver {
            client: build_client(5).unwrap(),
            max_bytes: 64,
        };

        assert!(resolver.resolve(&entry(&base)).await.is_none());
    }
}
