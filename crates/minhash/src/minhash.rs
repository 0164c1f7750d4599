//! MinHash computation for Akin signatures.
//!
//! Each slot uses its own universal hash function `h_i(x) = (a_i·x + b_i) mod p`
//! over the Mersenne prime `p = 2^61 - 1`. The `(a_i, b_i)` pairs are drawn
//! from a splitmix64 stream keyed by the configured seed, so one seed fully
//! determines the family.

use sha2::{Digest, Sha256};

/// Mersenne prime `2^61 - 1`.
pub(crate) const MERSENNE_PRIME: u64 = (1 << 61) - 1;

/// Slot value used when a token set is empty.
pub const EMPTY_SLOT: u64 = u64::MAX;

/// A family of `len` seeded universal hash functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashFamily {
    coefficients: Vec<(u64, u64)>,
}

impl HashFamily {
    pub fn new(seed: u64, len: usize) -> Self {
        let mut coefficients = Vec::with_capacity(len);
        for i in 0..len as u64 {
            let a = splitmix64(seed.wrapping_add(2 * i)) % (MERSENNE_PRIME - 1) + 1;
            let b = splitmix64(seed.wrapping_add(2 * i + 1)) % MERSENNE_PRIME;
            coefficients.push((a, b));
        }
        Self { coefficients }
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// MinHash signature over already hashed, de-duplicated tokens.
    pub fn signature(&self, token_hashes: &[u64]) -> Vec<u64> {
        if token_hashes.is_empty() {
            return vec![EMPTY_SLOT; self.len()];
        }
        let reduced: Vec<u64> = token_hashes.iter().map(|&h| h % MERSENNE_PRIME).collect();
        self.coefficients
            .iter()
            .map(|&(a, b)| compute_slot(&reduced, a, b))
            .collect()
    }
}

/// Minimum of `(a·x + b) mod p` over the reduced token hashes.
#[inline]
fn compute_slot(reduced: &[u64], a: u64, b: u64) -> u64 {
    let mut minv = u64::MAX;
    for &x in reduced {
        let h = ((a as u128 * x as u128 + b as u128) % MERSENNE_PRIME as u128) as u64;
        if h < minv {
            minv = h;
        }
    }
    minv
}

/// Stable 64-bit hash of a token: the first eight bytes of its SHA-256
/// digest, little-endian.
pub fn token_hash(token: &str) -> u64 {
    let digest = Sha256::digest(token.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Hash each token and drop duplicates.
pub fn unique_token_hashes<S: AsRef<str>>(tokens: &[S]) -> Vec<u64> {
    let mut hashes: Vec<u64> = tokens.iter().map(|t| token_hash(t.as_ref())).collect();
    hashes.sort_unstable();
    hashes.dedup();
    hashes
}

/// A 64-bit hash function that is fast and has good distribution.
#[inline]
pub(crate) fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_has_requested_length() {
        for len in [1, 8, 64, 128] {
            assert_eq!(HashFamily::new(1, len).len(), len);
        }
        assert!(HashFamily::new(1, 0).is_empty());
    }

    #[test]
    fn coefficients_stay_inside_the_field() {
        let family = HashFamily::new(0x5EED, 256);
        for &(a, b) in &family.coefficients {
            assert!(a >= 1 && a < MERSENNE_PRIME);
            assert!(b < MERSENNE_PRIME);
        }
    }

    #[test]
    fn empty_token_set_fills_with_sentinel() {
        let sig = HashFamily::new(1, 16).signature(&[]);
        assert_eq!(sig, vec![EMPTY_SLOT; 16]);
    }

    #[test]
    fn signature_is_deterministic() {
        let hashes = unique_token_hashes(&["acme", "corp"]);
        let a = HashFamily::new(9, 32).signature(&hashes);
        let b = HashFamily::new(9, 32).signature(&hashes);
        assert_eq!(a, b);
        assert!(a.iter().all(|&v| v < MERSENNE_PRIME));
    }

    #[test]
    fn different_seeds_give_different_signatures() {
        let hashes = unique_token_hashes(&["acme", "corp", "inc"]);
        let a = HashFamily::new(1, 32).signature(&hashes);
        let b = HashFamily::new(2, 32).signature(&hashes);
        assert_ne!(a, b);
    }

    #[test]
    fn token_order_and_duplicates_do_not_matter() {
        let family = HashFamily::new(3, 64);
        let a = family.signature(&unique_token_hashes(&["b", "a", "b"]));
        let b = family.signature(&unique_token_hashes(&["a", "b"]));
        assert_eq!(a, b);
    }

    #[test]
    fn slot_is_minimum_over_tokens() {
        let reduced = [5u64, 17, 3];
        let slot = compute_slot(&reduced, 7, 11);
        let expected = reduced
            .iter()
            .map(|&x| (7 * x + 11) % MERSENNE_PRIME)
            .min()
            .unwrap();
        assert_eq!(slot, expected);
    }

    #[test]
    fn token_hash_is_stable() {
        assert_eq!(token_hash("acme"), token_hash("acme"));
        assert_ne!(token_hash("acme"), token_hash("Acme"));
    }

    #[test]
    fn splitmix_produces_different_values() {
        assert_ne!(splitmix64(0), splitmix64(1));
    }
}
