//! Parallel signature pass and sequential index construction.
//!
//! Rows are cut into contiguous chunks, one per worker. Each worker signs
//! its chunk with its own [`Signer`] and hands back an owned batch of
//! `(row_index, signature)` pairs; nothing is shared while workers run. The
//! batches are merged by row index on the calling thread and only then fed
//! into the bucket tables, in row order, so the index is identical no matter
//! how the workers were scheduled.

use std::num::NonZeroUsize;
use std::thread;

use index::{ErrorWeights, LshIndex};
use minhash::{RowSignature, SignatureConfig, Signer};
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::debug;

use crate::error::AkinError;

/// Signatures of a whole column plus the rows that produced no tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexBuild {
    pub index: LshIndex,
    pub unindexable: Vec<usize>,
}

/// Fixed-size worker pool for signature passes.
pub struct SignaturePipeline {
    pool: ThreadPool,
    workers: usize,
}

impl SignaturePipeline {
    /// Pool of `workers` threads; `None` uses the available parallelism.
    pub fn new(workers: Option<usize>) -> Result<Self, AkinError> {
        let workers = workers
            .filter(|w| *w > 0)
            .unwrap_or_else(|| {
                thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(1)
            });
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("akin-signer-{i}"))
            .build()
            .map_err(|e| AkinError::Pipeline(format!("failed to create worker pool: {e}")))?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Sign every value; the result is indexed like `values`.
    pub fn sign_all(
        &self,
        values: &[&str],
        cfg: &SignatureConfig,
    ) -> Result<Vec<RowSignature>, AkinError> {
        let signer = Signer::new(cfg.clone())?;
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let chunk_size = values.len().div_ceil(self.workers);
        debug!(
            rows = values.len(),
            workers = self.workers,
            chunk_size,
            "partitioned signature pass"
        );

        let batches: Vec<Vec<(usize, RowSignature)>> = self.pool.install(|| {
            values
                .par_chunks(chunk_size)
                .enumerate()
                .map(|(chunk, rows)| {
                    let offset = chunk * chunk_size;
                    rows.iter()
                        .enumerate()
                        .map(|(i, value)| (offset + i, signer.sign(value)))
                        .collect()
                })
                .collect()
        });

        merge_batches(values.len(), batches)
    }
}

/// Place every `(row_index, signature)` at its row; each row exactly once.
fn merge_batches(
    rows: usize,
    batches: Vec<Vec<(usize, RowSignature)>>,
) -> Result<Vec<RowSignature>, AkinError> {
    let mut merged: Vec<Option<RowSignature>> = vec![None; rows];
    for (row_index, signature) in batches.into_iter().flatten() {
        let slot = merged.get_mut(row_index).ok_or_else(|| {
            AkinError::Pipeline(format!("worker returned out-of-range row {row_index}"))
        })?;
        if slot.replace(signature).is_some() {
            return Err(AkinError::Pipeline(format!(
                "row {row_index} was signed twice"
            )));
        }
    }
    merged
        .into_iter()
        .enumerate()
        .map(|(row_index, slot)| {
            slot.ok_or_else(|| AkinError::Pipeline(format!("row {row_index} was never signed")))
        })
        .collect()
}

/// Insert indexable rows into a fresh index in row order.
pub fn build_index(
    signatures: &[RowSignature],
    threshold: f64,
    signature_length: usize,
    weights: ErrorWeights,
) -> Result<IndexBuild, AkinError> {
    let mut index = LshIndex::with_threshold(threshold, signature_length, weights)?;
    let mut unindexable = Vec::new();
    for (row_index, row) in signatures.iter().enumerate() {
        if row.is_indexable() {
            index.insert(row_index, &row.signature)?;
        } else {
            unindexable.push(row_index);
        }
    }
    Ok(IndexBuild { index, unindexable })
}
