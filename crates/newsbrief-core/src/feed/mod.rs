mod fetcher;
mod models;
mod parser;

pub use fetcher::{EntrySource, FeedFetcher};
pub(crate) use fetcher::{build_client, build_headers, next_user_agent};
pub use models::{Candidate, Entry};
pub use parser::{parse_feed, ParsedFeed};
