pub mod checkpoint;
pub mod preview;
pub mod run;

use chrono::{DateTime, FixedOffset, Utc};

use newsbrief_core::AppConfig;

/// Current instant in the configured reference offset
pub fn now(config: &AppConfig) -> anyhow::Result<DateTime<FixedOffset>> {
    Ok(Utc::now().with_timezone(&config.reference_offset()?))
}
