//! Band/row selection for MinHash LSH.
//!
//! Two rows of true Jaccard similarity `s` collide in at least one of `b`
//! bands of `r` rows with probability `P(s) = 1 - (1 - s^r)^b`. For a target
//! threshold `t` the optimizer picks the split of the signature that
//! minimises
//!
//! ```text
//! w_fp · ∫₀ᵗ P(s) ds  +  w_fn · ∫ₜ¹ (1 - P(s)) ds
//! ```
//!
//! over every `(b, r)` with `b · r = signature_length`.

use serde::{Deserialize, Serialize};

use crate::IndexError;

/// Trapezoid steps used for each integral.
const INTEGRATION_STEPS: usize = 1000;

/// Relative weights of the false-positive and false-negative areas.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ErrorWeights {
    pub false_positive: f64,
    pub false_negative: f64,
}

impl Default for ErrorWeights {
    fn default() -> Self {
        Self {
            false_positive: 0.5,
            false_negative: 0.5,
        }
    }
}

impl ErrorWeights {
    pub fn validate(&self) -> Result<(), IndexError> {
        let ok = |w: f64| w.is_finite() && w >= 0.0;
        if !ok(self.false_positive) || !ok(self.false_negative) {
            return Err(IndexError::InvalidParam(
                "error weights must be finite and >= 0".into(),
            ));
        }
        if self.false_positive + self.false_negative == 0.0 {
            return Err(IndexError::InvalidParam(
                "error weights must not both be zero".into(),
            ));
        }
        Ok(())
    }
}

/// Band layout of an LSH index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LshParams {
    /// Number of bands (`b`).
    pub bands: usize,
    /// Signature slots per band (`r`).
    pub rows: usize,
}

impl LshParams {
    /// Explicit layout; both values must be non-zero.
    pub fn new(bands: usize, rows: usize) -> Result<Self, IndexError> {
        if bands == 0 || rows == 0 {
            return Err(IndexError::InvalidParam(format!(
                "bands and rows must be >= 1 (got bands={bands}, rows={rows})"
            )));
        }
        Ok(Self { bands, rows })
    }

    /// Layout minimising the weighted error area for `threshold`.
    pub fn optimal(
        threshold: f64,
        signature_length: usize,
        weights: ErrorWeights,
    ) -> Result<Self, IndexError> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(IndexError::InvalidParam(format!(
                "threshold must be in (0, 1] (got {threshold})"
            )));
        }
        if signature_length == 0 {
            return Err(IndexError::InvalidParam(
                "signature_length must be >= 1".into(),
            ));
        }
        weights.validate()?;

        let mut best = Self {
            bands: 1,
            rows: signature_length,
        };
        let mut best_error = f64::INFINITY;
        for bands in (1..=signature_length).filter(|b| signature_length % b == 0) {
            let candidate = Self {
                bands,
                rows: signature_length / bands,
            };
            let error = weights.false_positive * candidate.false_positive_area(threshold)
                + weights.false_negative * candidate.false_negative_area(threshold);
            if error < best_error {
                best_error = error;
                best = candidate;
            }
        }
        log::debug!(
            "lsh params for threshold={threshold} k={signature_length}: bands={} rows={} error={best_error:.5}",
            best.bands,
            best.rows
        );
        Ok(best)
    }

    /// Total signature slots covered by the bands.
    pub fn signature_length(&self) -> usize {
        self.bands * self.rows
    }

    /// Probability that two rows of similarity `s` share a bucket.
    pub fn candidate_probability(&self, s: f64) -> f64 {
        1.0 - (1.0 - s.powi(self.rows as i32)).powi(self.bands as i32)
    }

    /// Area under `P(s)` below the threshold.
    pub fn false_positive_area(&self, threshold: f64) -> f64 {
        integrate(|s| self.candidate_probability(s), 0.0, threshold)
    }

    /// Area under `1 - P(s)` above the threshold.
    pub fn false_negative_area(&self, threshold: f64) -> f64 {
        integrate(|s| 1.0 - self.candidate_probability(s), threshold, 1.0)
    }
}

fn integrate(f: impl Fn(f64) -> f64, a: f64, b: f64) -> f64 {
    if b <= a {
        return 0.0;
    }
    let h = (b - a) / INTEGRATION_STEPS as f64;
    let mut sum = 0.5 * (f(a) + f(b));
    for i in 1..INTEGRATION_STEPS {
        sum += f(a + i as f64 * h);
    }
    sum * h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn optimal(threshold: f64) -> LshParams {
        LshParams::optimal(threshold, 128, ErrorWeights::default()).unwrap()
    }

    #[test]
    fn layouts_for_common_thresholds() {
        assert_eq!(optimal(0.5), LshParams { bands: 32, rows: 4 });
        assert_eq!(optimal(0.8), LshParams { bands: 8, rows: 16 });
        assert_eq!(optimal(0.9), LshParams { bands: 4, rows: 32 });
        assert_eq!(optimal(0.99), LshParams { bands: 1, rows: 128 });
        assert_eq!(optimal(1.0), LshParams { bands: 1, rows: 128 });
    }

    #[test]
    fn layout_always_covers_whole_signature() {
        for k in [1, 7, 64, 100, 128] {
            for t in [0.1, 0.5, 0.75, 1.0] {
                let p = LshParams::optimal(t, k, ErrorWeights::default()).unwrap();
                assert_eq!(p.signature_length(), k);
            }
        }
    }

    #[test]
    fn higher_threshold_never_adds_bands() {
        let mut last = usize::MAX;
        for t in [0.3, 0.5, 0.7, 0.9, 0.99] {
            let p = optimal(t);
            assert!(p.bands <= last, "bands grew at threshold {t}");
            last = p.bands;
        }
    }

    #[test]
    fn candidate_probability_is_monotonic() {
        let p = LshParams::new(32, 4).unwrap();
        assert_eq!(p.candidate_probability(0.0), 0.0);
        assert!((p.candidate_probability(1.0) - 1.0).abs() < 1e-12);
        assert!(p.candidate_probability(0.3) < p.candidate_probability(0.6));
    }

    #[test]
    fn invalid_threshold_rejected() {
        for t in [0.0, -0.5, 1.5, f64::NAN] {
            assert!(LshParams::optimal(t, 128, ErrorWeights::default()).is_err());
        }
    }

    #[test]
    fn invalid_weights_rejected() {
        let weights = ErrorWeights {
            false_positive: 0.0,
            false_negative: 0.0,
        };
        assert!(LshParams::optimal(0.5, 128, weights).is_err());
    }

    #[test]
    fn recall_weighting_adds_bands() {
        let recall = ErrorWeights {
            false_positive: 0.1,
            false_negative: 0.9,
        };
        let p = LshParams::optimal(0.5, 128, recall).unwrap();
        assert!(p.bands >= optimal(0.5).bands);
    }

    #[test]
    fn explicit_params_reject_zero() {
        assert!(LshParams::new(0, 4).is_err());
        assert!(LshParams::new(4, 0).is_err());
    }
}
