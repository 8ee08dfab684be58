//! Adapter from free-form model output to the structured summary.
//!
//! Models often echo the format example of the instruction or restate an earlier
//! draft before the final answer, so the last matching object wins.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::{Error, Result};

static SUMMARY_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\{\s*"points"\s*:\s*\[[^\]]*?\]\s*,\s*"title"\s*:\s*"[^"]*"\s*\}"#)
        .expect("summary pattern is valid")
});

/// The object the model is instructed to emit
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SummaryJson {
    pub points: Vec<String>,
    pub title: String,
}

/// Parse the last `{"points": [...], "title": "..."}` object found in `reply`
pub fn extract_summary_json(reply: &str) -> Result<SummaryJson> {
    let matched = SUMMARY_OBJECT
        .find_iter(reply)
        .last()
        .ok_or_else(|| Error::SummaryParse("no summary object in reply".to_string()))?;

    serde_json::from_str(matched.as_str())
        .map_err(|e| Error::SummaryParse(format!("{}: {}", e, matched.as_str())))
}
