use anyhow::Result;

use newsbrief_core::{
    checkpoint::{CheckpointStore, CHECKPOINT_FORMAT},
    AppConfig,
};

pub fn run(config: &AppConfig) -> Result<()> {
    let store = CheckpointStore::new(
        config.checkpoint_path(),
        config.reference_offset()?,
        config.general.lookback_minutes,
    );

    let at = store.load(super::now(config)?);

    println!("Checkpoint file: {}", store.path().display());
    if store.path().exists() {
        println!("Last executed at: {}", at.format(CHECKPOINT_FORMAT));
    } else {
        println!(
            "No checkpoint yet, next run looks back to {}",
            at.format(CHECKPOINT_FORMAT)
        );
    }

    Ok(())
}
