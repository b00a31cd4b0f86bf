use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Tokens shorter than this (in characters) are not indexed.
pub const MIN_TOKEN_LEN: usize = 2;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[\p{L}\p{N}]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Tokenization policy. Persisted with the index so queries are tokenized
/// exactly like the bodies were.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub min_len: usize,
    pub stem: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self { min_len: MIN_TOKEN_LEN, stem: true }
    }
}

/// NFKC-normalize, lowercase, split on non-alphanumeric boundaries, drop
/// short tokens and optionally stem. Tokens come back in text order.
pub fn tokenize(text: &str, config: &TokenizerConfig) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized)
        .map(|m| m.as_str())
        .filter(|token| token.chars().count() >= config.min_len)
        .map(|token| if config.stem { STEMMER.stem(token).into_owned() } else { token.to_string() })
        .collect()
}
