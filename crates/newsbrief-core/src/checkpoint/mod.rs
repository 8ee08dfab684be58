mod store;

pub use store::{CheckpointStore, CHECKPOINT_FORMAT};
