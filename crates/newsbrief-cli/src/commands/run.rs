use anyhow::Result;

use newsbrief_core::{AppConfig, Credentials, Pipeline};

pub async fn run(config: &AppConfig, dry_run: bool) -> Result<()> {
    let credentials = Credentials::from_env(!dry_run)?;
    let pipeline = Pipeline::from_config(config, &credentials, dry_run)?;

    let report = pipeline.run(super::now(config)?).await?;

    if report.post_failures > 0 {
        tracing::warn!("{} summaries could not be posted", report.post_failures);
    }

    println!(
        "Run complete: {} fetched, {} targeted, {} summarized ({} fallback), {} posted, {} failed to post.",
        report.fetched,
        report.targeted(),
        report.parsed + report.fallbacks,
        report.fallbacks,
        report.posted,
        report.post_failures
    );

    Ok(())
}
