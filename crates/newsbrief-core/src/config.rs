use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const SLACK_API_TOKEN_ENV: &str = "SLACK_API_TOKEN";

/// Upper bound for `general.lookback_minutes` (one week)
pub const MAX_LOOKBACK_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Feeds polled on every run, in discovery order
    #[serde(default)]
    pub feeds: Vec<FeedSource>,
    pub slack: SlackConfig,
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

/// A syndication feed and whether missing bodies may be fetched from the entry link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub url: String,
    #[serde(default)]
    pub extract_content: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Channel name or ID summaries are posted to
    pub channel: String,
    /// Slack Web API base URL
    #[serde(default = "default_slack_api_base_url")]
    pub api_base_url: String,
    /// Header block text of every message
    #[serde(default = "default_slack_header")]
    pub header: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub organization_id: String,
    /// Chat model name, also selects the tokenizer
    #[serde(default = "default_openai_model")]
    pub model: String,
    /// Total context of the model in tokens
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// Tokens kept free for the generated reply
    #[serde(default = "default_response_reserve")]
    pub response_reserve: usize,
    /// Override for OpenAI-compatible endpoints
    #[serde(default)]
    pub api_base: Option<String>,
}

impl OpenAiConfig {
    /// Maximum number of content tokens an entry may have
    pub fn token_budget(&self) -> usize {
        self.context_window.saturating_sub(self.response_reserve)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Language of the translated title and the key points
    #[serde(default = "default_summary_language")]
    pub language: String,
    /// Upper bound of bullet points requested from the model
    #[serde(default = "default_max_points")]
    pub max_points: usize,
    /// Attempts per entry before the fallback summary is emitted
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay between attempts, doubled each retry (0 = retry immediately)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            language: default_summary_language(),
            max_points: default_max_points(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Checkpoint file path
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,
    /// Reference UTC offset all timestamps are normalized to, e.g. "+09:00"
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
    /// Lookback used when no checkpoint can be read
    #[serde(default = "default_lookback_minutes")]
    pub lookback_minutes: i64,
    /// Request timeout in seconds for every outbound HTTP call
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: default_checkpoint_path(),
            utc_offset: default_utc_offset(),
            lookback_minutes: default_lookback_minutes(),
            request_timeout_secs: default_timeout(),
        }
    }
}

fn default_slack_api_base_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_slack_header() -> String {
    ":newspaper: New Tech News :newspaper:".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_context_window() -> usize {
    4096
}

fn default_response_reserve() -> usize {
    500
}

fn default_summary_language() -> String {
    "Japanese".to_string()
}

fn default_max_points() -> usize {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("last_executed_at.json")
}

fn default_utc_offset() -> String {
    "+09:00".to_string()
}

fn default_lookback_minutes() -> i64 {
    30
}

fn default_timeout() -> u64 {
    30
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

/// Parse "+09:00", "-0530" or "Z" into a fixed offset
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| Error::Config("invalid UTC offset".into()));
    }

    value.parse::<FixedOffset>().map_err(|e| {
        Error::Config(format!("Invalid utc_offset '{}', expected e.g. +09:00: {}", value, e))
    })
}

impl AppConfig {
    /// Load configuration from a JSON file, or TOML when the extension is `.toml`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;

        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        let config: Self = if is_toml {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.slack.channel.trim().is_empty() {
            return Err(Error::Config("slack.channel must not be empty".into()));
        }
        if self.openai.token_budget() == 0 {
            return Err(Error::Config(format!(
                "openai.response_reserve ({}) must be smaller than openai.context_window ({})",
                self.openai.response_reserve, self.openai.context_window
            )));
        }
        if self.summary.max_attempts == 0 {
            return Err(Error::Config("summary.max_attempts must be at least 1".into()));
        }
        if !(0..=MAX_LOOKBACK_MINUTES).contains(&self.general.lookback_minutes) {
            return Err(Error::Config(format!(
                "general.lookback_minutes ({}) must be between 0 and {}",
                self.general.lookback_minutes, MAX_LOOKBACK_MINUTES
            )));
        }
        parse_utc_offset(&self.general.utc_offset)?;
        Ok(())
    }

    /// The offset every timestamp is compared and displayed in
    pub fn reference_offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.general.utc_offset)
    }

    /// Get the checkpoint file path (with tilde expansion)
    pub fn checkpoint_path(&self) -> PathBuf {
        expand_tilde(&self.general.checkpoint_path)
    }
}

/// API credentials, read from the environment rather than the config file
#[derive(Clone)]
pub struct Credentials {
    pub openai_api_key: String,
    pub slack_api_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &"***")
            .field("slack_api_token", &self.slack_api_token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Credentials {
    /// Read credentials; the Slack token is only mandatory when messages will be posted
    pub fn from_env(require_slack: bool) -> Result<Self> {
        let openai_api_key = read_env(OPENAI_API_KEY_ENV)
            .ok_or(Error::MissingCredential(OPENAI_API_KEY_ENV))?;
        let slack_api_token = read_env(SLACK_API_TOKEN_ENV);

        if require_slack && slack_api_token.is_none() {
            return Err(Error::MissingCredential(SLACK_API_TOKEN_ENV));
        }

        Ok(Self {
            openai_api_key,
            slack_api_token,
        })
    }

    pub fn slack_token(&self) -> Result<&str> {
        self.slack_api_token
            .as_deref()
            .ok_or(Error::MissingCredential(SLACK_API_TOKEN_ENV))
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
