use std::sync::LazyLock;

use codemap_core::{CodemapError, TokenizerKind};
use tiktoken_rs::CoreBPE;

/// The `cl100k_base` encoding, loaded on first use.
static BPE: LazyLock<Option<CoreBPE>> = LazyLock::new(|| {
    tiktoken_rs::cl100k_base()
        .map_err(|e| log::error!("failed to load cl100k_base tokenizer: {e}"))
        .ok()
});

/// Measures how many tokens a piece of text costs.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Counts whitespace-separated words.
///
/// # Examples
///
/// ```
/// use codemap_repomap::tokens::{TokenCounter, WordCounter};
///
/// assert_eq!(WordCounter.count("fn main() {\n}\n"), 4);
/// assert_eq!(WordCounter.count(""), 0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Counts OpenAI `cl100k_base` BPE tokens.
#[derive(Debug, Clone, Copy)]
pub struct Cl100kCounter {
    _private: (),
}

impl Cl100kCounter {
    /// # Errors
    ///
    /// Returns [`CodemapError::Config`] if the encoding cannot be loaded.
    pub fn new() -> Result<Self, CodemapError> {
        if BPE.is_none() {
            return Err(CodemapError::Config(
                "cl100k_base tokenizer is unavailable".into(),
            ));
        }
        Ok(Self { _private: () })
    }
}

impl TokenCounter for Cl100kCounter {
    fn count(&self, text: &str) -> usize {
        BPE.as_ref()
            .map_or(0, |bpe| bpe.encode_ordinary(text).len())
    }
}

/// Build the counter selected in configuration.
///
/// # Errors
///
/// Returns [`CodemapError::Config`] if the BPE encoding cannot be loaded.
///
/// # Examples
///
/// ```
/// use codemap_core::TokenizerKind;
/// use codemap_repomap::tokens::counter_for;
///
/// let counter = counter_for(TokenizerKind::Words).unwrap();
/// assert_eq!(counter.count("a b c"), 3);
/// ```
pub fn counter_for(kind: TokenizerKind) -> Result<Box<dyn TokenCounter>, CodemapError> {
    match kind {
        TokenizerKind::Words => Ok(Box::new(WordCounter)),
        TokenizerKind::Cl100k => Ok(Box::new(Cl100kCounter::new()?)),
    }
}
