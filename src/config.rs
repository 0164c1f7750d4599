//! YAML configuration for the akin engine.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//!
//! store:
//!   backend: "redb"          # or "in_memory"
//!   path: "akin.redb"
//!   compression: "zstd"      # or "none"
//!   compression_level: 3
//!
//! pipeline:
//!   workers: 8               # omit for available parallelism
//!   seed: 24301
//!
//! clustering:
//!   mode: "greedy"           # or "transitive"
//!   false_positive_weight: 0.5
//!   false_negative_weight: 0.5
//!   admission_distance: "levenshtein"
//!
//! templates:
//!   - name: "Loose"
//!     threshold: 0.5
//!   - name: "Shingled"
//!     threshold: 0.9
//!     use_shingles: true
//!     shingle_length: 3
//! ```

use std::fs;
use std::path::Path;

use index::{BackendConfig, CompressionCodec, CompressionConfig, ErrorWeights, StoreConfig};
use matcher::DistanceMethod;
use minhash::DEFAULT_SEED;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cluster::ClusterMode;
use crate::template::HashTemplate;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AkinConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub store: StoreYamlConfig,

    #[serde(default)]
    pub pipeline: PipelineYamlConfig,

    #[serde(default)]
    pub clustering: ClusteringYamlConfig,

    /// Templates seeded into an empty registry. The built-in defaults are
    /// used when this is empty.
    #[serde(default)]
    pub templates: Vec<HashTemplate>,
}

impl AkinConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: AkinConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// In-memory store, everything else default.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Persistent store in the redb file at `path`.
    pub fn with_redb(path: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.store.backend = "redb".to_string();
        config.store.path = Some(path.into());
        config
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.store.validate()?;
        self.pipeline.validate()?;
        self.clustering.validate()?;

        for template in &self.templates {
            template.validate().map_err(|e| {
                ConfigLoadError::Validation(format!("template {:?}: {e}", template.name))
            })?;
        }
        for (i, template) in self.templates.iter().enumerate() {
            if self.templates[..i].iter().any(|t| t.name == template.name) {
                return Err(ConfigLoadError::Validation(format!(
                    "template {:?} is defined twice",
                    template.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for AkinConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            store: StoreYamlConfig::default(),
            pipeline: PipelineYamlConfig::default(),
            clustering: ClusteringYamlConfig::default(),
            templates: Vec::new(),
        }
    }
}

/// Store YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreYamlConfig {
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default = "default_compression")]
    pub compression: String,

    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
}

impl StoreYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_backends = ["in_memory", "redb"];
        if !valid_backends.contains(&self.backend.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "store.backend must be one of: {valid_backends:?}"
            )));
        }

        if self.backend == "redb" && self.path.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigLoadError::Validation(
                "store.path is required when backend is 'redb'".to_string(),
            ));
        }

        let valid_codecs = ["none", "zstd"];
        if !valid_codecs.contains(&self.compression.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "store.compression must be one of: {valid_codecs:?}"
            )));
        }

        if !(1..=22).contains(&self.compression_level) {
            return Err(ConfigLoadError::Validation(
                "store.compression_level must be in 1..=22".to_string(),
            ));
        }

        Ok(())
    }

    /// Storage settings for the index crate.
    pub fn to_store_config(&self) -> StoreConfig {
        let backend = match (self.backend.as_str(), &self.path) {
            ("redb", Some(path)) => BackendConfig::redb(path.clone()),
            _ => BackendConfig::in_memory(),
        };
        let codec = match self.compression.as_str() {
            "none" => CompressionCodec::None,
            _ => CompressionCodec::Zstd,
        };
        StoreConfig::new()
            .with_backend(backend)
            .with_compression(CompressionConfig::new(codec, self.compression_level))
    }
}

impl Default for StoreYamlConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: None,
            compression: default_compression(),
            compression_level: default_compression_level(),
        }
    }
}

/// Signature pipeline YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineYamlConfig {
    /// Worker threads for the signature pass.
    #[serde(default)]
    pub workers: Option<usize>,

    /// Seed of the MinHash hash family.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl PipelineYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.workers == Some(0) {
            return Err(ConfigLoadError::Validation(
                "pipeline.workers must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineYamlConfig {
    fn default() -> Self {
        Self {
            workers: None,
            seed: default_seed(),
        }
    }
}

/// Clustering YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringYamlConfig {
    #[serde(default)]
    pub mode: ClusterMode,

    #[serde(default = "default_weight")]
    pub false_positive_weight: f64,

    #[serde(default = "default_weight")]
    pub false_negative_weight: f64,

    /// Distance used to reject clusters without textual variation.
    #[serde(default = "default_admission_distance")]
    pub admission_distance: String,
}

impl ClusteringYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        self.weights()
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("clustering: {e}")))?;

        if self.admission_distance.parse::<DistanceMethod>().is_err() {
            return Err(ConfigLoadError::Validation(format!(
                "clustering.admission_distance {:?} is not a known distance method",
                self.admission_distance
            )));
        }
        Ok(())
    }

    pub fn weights(&self) -> ErrorWeights {
        ErrorWeights {
            false_positive: self.false_positive_weight,
            false_negative: self.false_negative_weight,
        }
    }
}

impl Default for ClusteringYamlConfig {
    fn default() -> Self {
        Self {
            mode: ClusterMode::default(),
            false_positive_weight: default_weight(),
            false_negative_weight: default_weight(),
            admission_distance: default_admission_distance(),
        }
    }
}

fn default_backend() -> String {
    "in_memory".to_string()
}
fn default_compression() -> String {
    "zstd".to_string()
}
fn default_compression_level() -> i32 {
    3
}
fn default_seed() -> u64 {
    DEFAULT_SEED
}
fn default_weight() -> f64 {
    0.5
}
fn default_admission_distance() -> String {
    DistanceMethod::Levenshtein.name().to_string()
}
