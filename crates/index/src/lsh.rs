//! Banded MinHash LSH index.
//!
//! Each signature is cut into `bands` slices of `rows` values. A slice is
//! hashed to a bucket key and the row id is filed under `(band, key)`. Rows
//! that agree on every value of at least one band come back together from
//! [`LshIndex::query`].

use std::collections::BTreeSet;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::params::{ErrorWeights, LshParams};
use crate::IndexError;

/// Bucket table of a single band.
type BandTable = HashMap<u64, Vec<usize>>;

/// LSH index over MinHash signatures of a fixed length.
///
/// Insert-only: indices are rebuilt wholesale when the source rows change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LshIndex {
    params: LshParams,
    threshold: f64,
    buckets: Vec<BandTable>,
    len: usize,
}

impl LshIndex {
    /// Empty index with an explicit band layout.
    pub fn new(params: LshParams, threshold: f64) -> Result<Self, IndexError> {
        let params = LshParams::new(params.bands, params.rows)?;
        Ok(Self {
            params,
            threshold,
            buckets: (0..params.bands).map(|_| BandTable::new()).collect(),
            len: 0,
        })
    }

    /// Empty index tuned for `threshold` over signatures of `signature_length`.
    pub fn with_threshold(
        threshold: f64,
        signature_length: usize,
        weights: ErrorWeights,
    ) -> Result<Self, IndexError> {
        let params = LshParams::optimal(threshold, signature_length, weights)?;
        Self::new(params, threshold)
    }

    pub fn params(&self) -> LshParams {
        self.params
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn signature_length(&self) -> usize {
        self.params.signature_length()
    }

    /// Number of inserted signatures.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// File `row_id` under each band bucket of `signature`. O(bands).
    pub fn insert(&mut self, row_id: usize, signature: &[u64]) -> Result<(), IndexError> {
        self.ensure_compatible(signature)?;
        for (band, table) in self.buckets.iter_mut().enumerate() {
            let key = band_key(signature, band, self.params.rows);
            table.entry(key).or_default().push(row_id);
        }
        self.len += 1;
        Ok(())
    }

    /// Every row id sharing at least one band bucket with `signature`,
    /// ascending.
    pub fn query(&self, signature: &[u64]) -> Result<Vec<usize>, IndexError> {
        self.ensure_compatible(signature)?;
        let mut candidates = BTreeSet::new();
        for (band, table) in self.buckets.iter().enumerate() {
            let key = band_key(signature, band, self.params.rows);
            if let Some(rows) = table.get(&key) {
                candidates.extend(rows.iter().copied());
            }
        }
        Ok(candidates.into_iter().collect())
    }

    /// Number of non-empty buckets across all bands.
    pub fn bucket_count(&self) -> usize {
        self.buckets.iter().map(|table| table.len()).sum()
    }

    fn ensure_compatible(&self, signature: &[u64]) -> Result<(), IndexError> {
        let expected = self.signature_length();
        if signature.len() != expected {
            return Err(IndexError::SignatureLength {
                expected,
                got: signature.len(),
            });
        }
        Ok(())
    }
}

/// Hash of one band slice; the band index seeds the hash so equal slices in
/// different bands land in unrelated keys.
#[inline]
fn band_key(signature: &[u64], band: usize, rows: usize) -> u64 {
    let slice = &signature[band * rows..(band + 1) * rows];
    let mut bytes = Vec::with_capacity(slice.len() * 8);
    for value in slice {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    xxh3_64_with_seed(&bytes, band as u64)
}
