pub mod providers;
mod prompt;
mod response;
mod summarizer;
mod tokens;

pub use prompt::PromptTemplate;
pub use response::{extract_summary_json, SummaryJson};
pub use summarizer::{Summarizer, Summary, SummaryOutcome, SUMMARY_FAILED_MARKER};
pub use tokens::{TiktokenCounter, TokenCounter};
