//! Persistence of the "last run started at" timestamp.
//!
//! The record is a single JSON object `{"at": "2024-05-01T09:30:00+0900"}`. A missing
//! or unreadable record is never fatal: the store falls back to a fixed lookback
//! window so a fresh deployment starts without manual seeding.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Whole-second timestamp with numeric UTC offset
pub const CHECKPOINT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointRecord {
    at: String,
}

/// File-backed checkpoint of the most recently completed run
pub struct CheckpointStore {
    path: PathBuf,
    offset: FixedOffset,
    lookback: Duration,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>, offset: FixedOffset, lookback_minutes: i64) -> Self {
        Self {
            path: path.into(),
            offset,
            lookback: Duration::try_minutes(lookback_minutes.max(0)).unwrap_or(Duration::MAX),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored checkpoint, or `now - lookback` if it cannot be read
    pub fn load(&self, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        match self.read() {
            Ok(at) => at,
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    "No checkpoint at {}, looking back {} minutes",
                    self.path.display(),
                    self.lookback.num_minutes()
                );
                self.fallback(now)
            }
            Err(e) => {
                tracing::warn!(
                    "Unreadable checkpoint at {} ({}), looking back {} minutes",
                    self.path.display(),
                    e,
                    self.lookback.num_minutes()
                );
                self.fallback(now)
            }
        }
    }

    /// Overwrite the checkpoint with `at`
    pub fn save(&self, at: DateTime<FixedOffset>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let record = CheckpointRecord {
            at: at.with_timezone(&self.offset).format(CHECKPOINT_FORMAT).to_string(),
        };
        std::fs::write(&self.path, serde_json::to_string(&record)?)?;

        tracing::debug!("Checkpoint saved: {}", record.at);
        Ok(())
    }

    fn read(&self) -> Result<DateTime<FixedOffset>> {
        let content = std::fs::read_to_string(&self.path)?;
        let record: CheckpointRecord = serde_json::from_str(&content)?;
        let at = DateTime::parse_from_str(&record.at, CHECKPOINT_FORMAT)
            .map_err(|e| Error::Config(format!("invalid checkpoint timestamp '{}': {}", record.at, e)))?;
        Ok(at.with_timezone(&self.offset))
    }

    fn fallback(&self, now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        let now = now.with_timezone(&self.offset);
        now.checked_sub_signed(self.lookback).unwrap_or(now)
    }
}
