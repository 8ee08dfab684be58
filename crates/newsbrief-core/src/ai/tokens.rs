use tiktoken_rs::CoreBPE;

use crate::{Error, Result};

/// Counts model-specific tokens for context budgeting
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// BPE tokenizer matching the configured OpenAI model
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Tokenizer for `model`, falling back to cl100k_base for unknown names
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(e) => {
                tracing::warn!("No tokenizer known for model '{}' ({}), using cl100k_base", model, e);
                tiktoken_rs::cl100k_base().map_err(|e| Error::Tokenizer(e.to_string()))?
            }
        };
        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}
