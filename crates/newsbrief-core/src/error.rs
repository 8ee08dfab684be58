use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("AI provider error: {0}")]
    AiProvider(String),

    #[error("Summary parse error: {0}")]
    SummaryParse(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Notification error: {0}")]
    Notify(String),
}

pub type Result<T> = std::result::Result<T, Error>;
