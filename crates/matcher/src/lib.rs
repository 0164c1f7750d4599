//! # Akin Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` refines approximate LSH candidates with exact string distances.
//! The index layer (`index`) only says which rows *might* be similar; this
//! crate measures how far apart they really are.
//!
//! It is used in two places:
//! - Cluster admission: a candidate cluster is kept only when its members
//!   are not all textually identical.
//! - Query ranking: candidates for an ad hoc query are ordered by ascending
//!   distance, ties broken by row order.
//!
//! ## Core Types
//!
//! - [`DistanceMethod`]: the built-in distances:
//!   - `levenshtein` (plain edit distance).
//!   - `optimal_string_alignment`: adjacent transpositions cost one edit.
//!   - `damerau_levenshtein`: transpositions without the OSA restriction.
//! - [`DistanceRegistry`]: name → function lookup. Names are matched
//!   case-insensitively with spaces and hyphens read as `_`, so
//!   `"plain edit distance"` resolves to `levenshtein`.
//! - [`RankedRow`]: a candidate row index with its distance.
//!
//! ## Example Usage
//!
//! ```
//! use matcher::{rank_by_distance, DistanceRegistry};
//!
//! let registry = DistanceRegistry::new();
//! let distance = registry.resolve("plain edit distance").unwrap();
//!
//! let ranked = rank_by_distance(
//!     "acme corp",
//!     [(0, "Acme Corp"), (1, "Acme Corporation")],
//!     distance,
//!     false,
//! );
//! assert_eq!(ranked[0].row_index, 0);
//! assert_eq!(ranked[0].distance, 0);
//! ```

pub mod distance;
pub mod rank;
pub mod types;

pub use crate::distance::DistanceRegistry;
pub use crate::rank::{
    average_distances, fold_case, has_textual_variation, rank_by_distance, RankedRow,
};
pub use crate::types::{normalize_name, DistanceFn, DistanceMethod, MatchError};
