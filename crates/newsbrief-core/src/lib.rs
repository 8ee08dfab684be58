pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod content;
pub mod error;
pub mod feed;
pub mod filter;
pub mod notify;
pub mod pipeline;

#[cfg(test)]
mod test_util;

pub use config::{AppConfig, Credentials, FeedSource};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, RunReport};
