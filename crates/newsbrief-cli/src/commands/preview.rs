use anyhow::Result;

use newsbrief_core::{
    checkpoint::{CheckpointStore, CHECKPOINT_FORMAT},
    pipeline::TargetSelector,
    AppConfig,
};

pub async fn run(config: &AppConfig) -> Result<()> {
    let store = CheckpointStore::new(
        config.checkpoint_path(),
        config.reference_offset()?,
        config.general.lookback_minutes,
    );
    let last = store.load(super::now(config)?);
    println!("Entries published since {}:\n", last.format(CHECKPOINT_FORMAT));

    let selector = TargetSelector::from_config(config)?;
    let (targets, fetched, stats) = selector.select(&config.feeds, last).await;

    for entry in &targets {
        println!("  {}  {}", entry.published_at.format(CHECKPOINT_FORMAT), entry.title);
        println!("      {}", entry.link);
    }

    println!(
        "\n{} of {} entries would be summarized ({} too old, {} without content, {} over the token budget).",
        targets.len(),
        fetched,
        stats.too_old,
        stats.no_content,
        stats.over_budget
    );

    Ok(())
}
