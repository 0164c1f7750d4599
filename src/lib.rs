//! Approximate duplicate finder for tabular data.
//!
//! This crate stitches the signature, index and matching stages together
//! behind one engine, [`Akin`]: load rows into a named data source, pick a
//! field and a [`HashTemplate`], and get back clusters of rows whose values
//! are probably near-duplicates of each other.
//!
//! ```text
//! rows ─► tokens ─► MinHash signatures (worker pool) ─► banded LSH index
//!                                                        │
//!                          greedy clustering ◄───────────┤
//!                          + admission check             │
//!                                                        ▼
//! query ─► tokens ─► signature ─► LSH candidates ─► ranked by edit distance
//! ```
//!
//! ## Example
//!
//! ```
//! use akin::{Akin, HashTemplate, Row};
//!
//! let mut akin = Akin::in_memory().unwrap();
//! let rows = ["Acme Corp", "ACME CORP", "Beta LLC", "Acme Corporation", "Gamma Inc"]
//!     .into_iter()
//!     .map(|name| Row::new().with("name", name))
//!     .collect();
//! akin.add_datasource("companies", rows).unwrap();
//! akin.add_template(HashTemplate::new("Loose", 0.5)).unwrap();
//!
//! let group = akin.create_group("companies", "name", "Loose", true).unwrap();
//! assert_eq!(group.clusters(), [vec![0, 1, 3]]);
//!
//! let key = group.key().to_string();
//! let hits = akin
//!     .query_groups("companies", [key], "acme corp", "plain edit distance")
//!     .unwrap();
//! assert_eq!(hits[0].distance, 0);
//! ```

pub mod cluster;
pub mod config;
pub mod datasource;
pub mod engine;
pub mod error;
pub mod group;
pub mod group_key;
pub mod metrics;
pub mod pipeline;
pub mod query;
pub mod store;
pub mod template;

pub use crate::cluster::{cluster, ClusterInput, ClusterMode};
pub use crate::config::{
    AkinConfig, ClusteringYamlConfig, ConfigLoadError, PipelineYamlConfig, StoreYamlConfig,
};
pub use crate::datasource::{CachedSignatures, DataSource, Row, SignatureKey};
pub use crate::engine::Akin;
pub use crate::error::{AkinError, EntityKind};
pub use crate::group::{
    export_records, export_table, Cluster, ClusterSettings, ExportRecord, GroupOptions, GroupResult,
};
pub use crate::group_key::{decode, DecodedGroupKey, GroupKey, GroupKeyError, SYSTEM_PREFIX};
pub use crate::metrics::{set_akin_metrics, AkinMetrics};
pub use crate::pipeline::{build_index, IndexBuild, SignaturePipeline};
pub use crate::query::QueryHit;
pub use crate::template::{
    default_templates, HashTemplate, IndexKind, TemplateError, TemplateParams,
    DEFAULT_SHINGLE_LENGTH,
};

pub use index::{ErrorWeights, LshIndex, LshParams};
pub use matcher::{DistanceFn, DistanceMethod, DistanceRegistry};
pub use minhash::{estimate_similarity, RowSignature, SignatureConfig, Tokenization, DEFAULT_SEED};
