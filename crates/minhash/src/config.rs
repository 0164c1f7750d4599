//! Configuration and error types for Akin signature generation.
//!
//! The signature layer is a pure function of `(field_value, config)`: no I/O,
//! no clocks and no process-global state, so the same value and the same
//! [`SignatureConfig`] always yield a bit-identical signature.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default seed for the MinHash hash family.
pub const DEFAULT_SEED: u64 = 0x5EED;

/// Default number of MinHash permutations.
pub const DEFAULT_SIGNATURE_LENGTH: usize = 128;

/// How a field value is split into tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tokenization {
    /// Whitespace-delimited words.
    #[default]
    Words,
    /// Overlapping character shingles of a fixed length.
    Shingles { length: usize },
}

impl Tokenization {
    /// Shingle length, when shingling is enabled.
    pub fn shingle_length(&self) -> Option<usize> {
        match self {
            Tokenization::Words => None,
            Tokenization::Shingles { length } => Some(*length),
        }
    }
}

/// Settings that fully determine a field value's signature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SignatureConfig {
    /// When `false` values are lower-cased before tokenization.
    pub case_sensitive: bool,
    /// Word or shingle tokenization.
    pub tokenization: Tokenization,
    /// Number of MinHash slots (one per hash function).
    pub signature_length: usize,
    /// Seed the hash family is derived from.
    ///
    /// Two configs that share a seed and all other parameters produce
    /// bit-identical signatures for the same value.
    pub seed: u64,
}

impl SignatureConfig {
    /// Create a configuration with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Switch to character shingles of `length` characters.
    pub fn with_shingles(mut self, length: usize) -> Self {
        self.tokenization = Tokenization::Shingles { length };
        self
    }

    /// Switch back to whitespace word tokens.
    pub fn with_words(mut self) -> Self {
        self.tokenization = Tokenization::Words;
        self
    }

    /// Set the signature length. Larger values tighten the similarity
    /// estimate at the cost of signing time and index memory.
    pub fn with_signature_length(mut self, signature_length: usize) -> Self {
        self.signature_length = signature_length;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), SignatureError> {
        if self.signature_length == 0 {
            return Err(SignatureError::InvalidSignatureLength {
                length: self.signature_length,
            });
        }
        if let Tokenization::Shingles { length } = self.tokenization {
            if length == 0 {
                return Err(SignatureError::InvalidShingleLength { length });
            }
        }
        Ok(())
    }
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            tokenization: Tokenization::Words,
            signature_length: DEFAULT_SIGNATURE_LENGTH,
            seed: DEFAULT_SEED,
        }
    }
}

/// Errors returned by the signature layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid config: signature_length must be >= 1 (got {length})")]
    InvalidSignatureLength { length: usize },

    #[error("invalid config: shingle_length must be >= 1 (got {length})")]
    InvalidShingleLength { length: usize },

    #[error("signature length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
}
