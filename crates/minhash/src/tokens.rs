//! Field value tokenization.
//!
//! Values become either whitespace words or overlapping character shingles.
//! Order and duplicates are preserved here; the signature treats the output
//! as a set.

use crate::config::{SignatureConfig, Tokenization};

/// Split a raw field value into tokens under `cfg`.
///
/// Shingling works on `char`s, not bytes, so multi-byte values never split
/// inside a code point. A non-empty value no longer than the shingle length
/// becomes a single token; an empty value yields no tokens.
pub fn tokenize(value: &str, cfg: &SignatureConfig) -> Vec<String> {
    let folded;
    let value = if cfg.case_sensitive {
        value
    } else {
        folded = value.to_lowercase();
        folded.as_str()
    };

    match cfg.tokenization {
        Tokenization::Words => value.split_whitespace().map(str::to_owned).collect(),
        Tokenization::Shingles { length } => char_shingles(value, length),
    }
}

/// Sliding window of `length` characters with step 1.
fn char_shingles(value: &str, length: usize) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    let chars: Vec<char> = value.chars().collect();
    if length == 0 || chars.len() <= length {
        return vec![value.to_owned()];
    }
    chars
        .windows(length)
        .map(|window| window.iter().collect())
        .collect()
}
