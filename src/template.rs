//! Hash templates: named, immutable grouping configurations.

use std::fmt;
use std::str::FromStr;

use minhash::{SignatureConfig, Tokenization, DEFAULT_SIGNATURE_LENGTH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shingle length stored on templates that do not shingle.
pub const DEFAULT_SHINGLE_LENGTH: usize = 4;

/// Similarity index backing a group. Config files and group keys accept the
/// same spellings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(try_from = "String", into = "String")]
pub enum IndexKind {
    #[default]
    MinHashLsh,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::MinHashLsh => "minhashlsh",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minhashlsh" | "minhash_lsh" => Ok(IndexKind::MinHashLsh),
            _ => Err(TemplateError::UnknownIndexKind(s.to_string())),
        }
    }
}

impl TryFrom<String> for IndexKind {
    type Error = TemplateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IndexKind> for String {
    fn from(kind: IndexKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Invalid template parameters. Never silently clamped.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemplateError {
    #[error("template name must not be empty")]
    EmptyName,
    #[error("threshold must be in (0, 1] (got {0})")]
    InvalidThreshold(f64),
    #[error("signature_length must be >= 1 (got {0})")]
    InvalidSignatureLength(usize),
    #[error("shingle_length must be >= 1 when shingling is enabled (got {0})")]
    InvalidShingleLength(usize),
    #[error("unknown index kind: {0:?}")]
    UnknownIndexKind(String),
}

/// A named grouping configuration. Identity is the name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HashTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub index_kind: IndexKind,
    pub threshold: f64,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub use_shingles: bool,
    #[serde(default = "default_shingle_length")]
    pub shingle_length: usize,
    #[serde(default = "default_signature_length")]
    pub signature_length: usize,
}

impl HashTemplate {
    /// Word-token, case-insensitive template with 128 permutations.
    pub fn new(name: impl Into<String>, threshold: f64) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            index_kind: IndexKind::MinHashLsh,
            threshold,
            case_sensitive: false,
            use_shingles: false,
            shingle_length: DEFAULT_SHINGLE_LENGTH,
            signature_length: DEFAULT_SIGNATURE_LENGTH,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_shingles(mut self, shingle_length: usize) -> Self {
        self.use_shingles = true;
        self.shingle_length = shingle_length;
        self
    }

    pub fn with_signature_length(mut self, signature_length: usize) -> Self {
        self.signature_length = signature_length;
        self
    }

    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.name.trim().is_empty() {
            return Err(TemplateError::EmptyName);
        }
        self.params().validate()
    }

    /// The parameters a GroupKey encodes. Name and description are not part
    /// of a group's identity.
    pub fn params(&self) -> TemplateParams {
        TemplateParams {
            index_kind: self.index_kind,
            threshold: self.threshold,
            case_sensitive: self.case_sensitive,
            tokenization: if self.use_shingles {
                Tokenization::Shingles {
                    length: self.shingle_length,
                }
            } else {
                Tokenization::Words
            },
            signature_length: self.signature_length,
        }
    }
}

/// Template parameters that shape a group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TemplateParams {
    pub index_kind: IndexKind,
    pub threshold: f64,
    pub case_sensitive: bool,
    pub tokenization: Tokenization,
    pub signature_length: usize,
}

impl TemplateParams {
    pub fn validate(&self) -> Result<(), TemplateError> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(TemplateError::InvalidThreshold(self.threshold));
        }
        if self.signature_length == 0 {
            return Err(TemplateError::InvalidSignatureLength(self.signature_length));
        }
        if let Tokenization::Shingles { length } = self.tokenization {
            if length == 0 {
                return Err(TemplateError::InvalidShingleLength(length));
            }
        }
        Ok(())
    }

    /// Signature settings for these parameters under `seed`.
    pub fn signature_config(&self, seed: u64) -> SignatureConfig {
        SignatureConfig {
            case_sensitive: self.case_sensitive,
            tokenization: self.tokenization,
            signature_length: self.signature_length,
            seed,
        }
    }
}

/// Templates seeded into an empty registry.
pub fn default_templates() -> Vec<HashTemplate> {
    vec![
        HashTemplate::new("Default", 1.0)
            .with_description("Use MinHashLSH to find groups with a Jaccard similarity of 1."),
        HashTemplate::new("Default 0.9", 0.9)
            .with_description("Use MinHashLSH to find groups with a Jaccard similarity of 0.9."),
        HashTemplate::new("Default 0.95 Shingled 3", 0.95)
            .with_shingles(3)
            .with_description(
                "Use MinHashLSH with shingling to find groups with a Jaccard similarity of 0.95.",
            ),
    ]
}

fn default_shingle_length() -> usize {
    DEFAULT_SHINGLE_LENGTH
}

fn default_signature_length() -> usize {
    DEFAULT_SIGNATURE_LENGTH
}
