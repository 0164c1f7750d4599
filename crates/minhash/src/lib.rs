//! # Akin MinHash
//!
//! Turns a single field value into a fixed-length MinHash signature.
//!
//! ## Pipeline
//!
//! 1.  **Tokenization**: the value is optionally lower-cased, then split into
//!     whitespace words or overlapping character shingles.
//! 2.  **Token hashing**: every distinct token is hashed to a stable 64-bit
//!     value.
//! 3.  **MinHashing**: each of the `signature_length` slots keeps the minimum
//!     of its own universal hash function over the token hashes. For two token
//!     sets `A` and `B`, `P[sig_A[i] == sig_B[i]] ≈ |A ∩ B| / |A ∪ B|`.
//!
//! Invariant: for the same value and the same [`SignatureConfig`] the output
//! is bit-identical.
//!
//! ## Example Usage
//!
//! ```
//! use minhash::{Signer, SignatureConfig, estimate_similarity};
//!
//! let signer = Signer::new(SignatureConfig::default()).unwrap();
//! let a = signer.sign("Acme Corp");
//! let b = signer.sign("ACME CORP");
//!
//! assert_eq!(a.token_count, 2);
//! assert_eq!(estimate_similarity(&a.signature, &b.signature).unwrap(), 1.0);
//! ```

pub mod config;
mod minhash;
mod tokens;

use serde::{Deserialize, Serialize};

pub use crate::config::{
    SignatureConfig, SignatureError, Tokenization, DEFAULT_SEED, DEFAULT_SIGNATURE_LENGTH,
};
pub use crate::minhash::{token_hash, unique_token_hashes, HashFamily, EMPTY_SLOT};
pub use crate::tokens::tokenize;

/// A MinHash signature: one minimum per hash function.
pub type Signature = Vec<u64>;

/// Signature of one field value plus the number of tokens it was built from.
///
/// A `token_count` of zero marks the value as unindexable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowSignature {
    pub signature: Signature,
    pub token_count: usize,
}

impl RowSignature {
    pub fn is_indexable(&self) -> bool {
        self.token_count > 0
    }
}

/// Reusable signer: the hash family is derived once per configuration.
#[derive(Debug, Clone)]
pub struct Signer {
    cfg: SignatureConfig,
    family: HashFamily,
}

impl Signer {
    pub fn new(cfg: SignatureConfig) -> Result<Self, SignatureError> {
        cfg.validate()?;
        let family = HashFamily::new(cfg.seed, cfg.signature_length);
        Ok(Self { cfg, family })
    }

    pub fn config(&self) -> &SignatureConfig {
        &self.cfg
    }

    /// Tokenize and sign a raw field value.
    pub fn sign(&self, value: &str) -> RowSignature {
        let tokens = tokenize(value, &self.cfg);
        self.sign_tokens(&tokens)
    }

    /// Sign an already tokenized value. `token_count` counts tokens as given,
    /// duplicates included.
    pub fn sign_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> RowSignature {
        let hashes = unique_token_hashes(tokens);
        RowSignature {
            signature: self.family.signature(&hashes),
            token_count: tokens.len(),
        }
    }
}

/// One-shot convenience around [`Signer`].
pub fn sign_value(value: &str, cfg: &SignatureConfig) -> Result<RowSignature, SignatureError> {
    Ok(Signer::new(cfg.clone())?.sign(value))
}

/// Fraction of slots on which two signatures agree, an estimate of the
/// Jaccard similarity of the underlying token sets.
pub fn estimate_similarity(a: &[u64], b: &[u64]) -> Result<f64, SignatureError> {
    if a.len() != b.len() {
        return Err(SignatureError::LengthMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    if a.is_empty() {
        return Ok(0.0);
    }
    let equal = a.iter().zip(b).filter(|(x, y)| x == y).count();
    Ok(equal as f64 / a.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> Signer {
        Signer::new(SignatureConfig::default()).unwrap()
    }

    #[test]
    fn identical_token_sets_estimate_exactly_one() {
        let s = signer();
        let a = s.sign("beta llc");
        let b = s.sign("LLC Beta beta");
        assert_eq!(estimate_similarity(&a.signature, &b.signature).unwrap(), 1.0);
        assert_eq!(b.token_count, 3);
    }

    #[test]
    fn disjoint_token_sets_share_nothing() {
        let s = signer();
        let a = s.sign("beta llc");
        let b = s.sign("gamma inc");
        assert_eq!(estimate_similarity(&a.signature, &b.signature).unwrap(), 0.0);
    }

    #[test]
    fn estimate_tracks_jaccard_similarity() {
        let cfg = SignatureConfig::default().with_signature_length(512);
        let s = Signer::new(cfg).unwrap();
        // |A ∩ B| = 6, |A ∪ B| = 10
        let a = s.sign("a b c d e f g h");
        let b = s.sign("c d e f g h i j");
        let est = estimate_similarity(&a.signature, &b.signature).unwrap();
        assert!((est - 0.6).abs() < 0.1, "estimate {est} too far from 0.6");
    }

    #[test]
    fn empty_value_is_unindexable() {
        let sig = signer().sign("   ");
        assert_eq!(sig.token_count, 0);
        assert!(!sig.is_indexable());
        assert!(sig.signature.iter().all(|&v| v == EMPTY_SLOT));
    }

    #[test]
    fn signer_rejects_invalid_config() {
        let err = Signer::new(SignatureConfig::default().with_signature_length(0)).unwrap_err();
        assert!(matches!(err, SignatureError::InvalidSignatureLength { .. }));
    }

    #[test]
    fn sign_value_matches_signer() {
        let cfg = SignatureConfig::default().with_shingles(3);
        let one_shot = sign_value("Acme Corporation", &cfg).unwrap();
        let reused = Signer::new(cfg).unwrap().sign("Acme Corporation");
        assert_eq!(one_shot, reused);
        assert_eq!(one_shot.signature.len(), DEFAULT_SIGNATURE_LENGTH);
    }

    #[test]
    fn estimate_rejects_length_mismatch() {
        let err = estimate_similarity(&[1, 2], &[1]).unwrap_err();
        assert_eq!(
            err,
            SignatureError::LengthMismatch {
                expected: 2,
                got: 1
            }
        );
    }
}
