mod resolver;

pub use resolver::{extract_main_text, ContentResolver, HttpContentResolver};
