use std::fmt;

use index::IndexError;
use matcher::MatchError;
use minhash::SignatureError;
use thiserror::Error;

use crate::config::ConfigLoadError;
use crate::group_key::GroupKeyError;
use crate::template::TemplateError;

/// Kind of a named entity, for [`AkinError::DuplicateName`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    DataSource,
    Template,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::DataSource => f.write_str("data source"),
            EntityKind::Template => f.write_str("template"),
        }
    }
}

/// Errors returned by the engine.
#[derive(Debug, Error)]
pub enum AkinError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigLoadError),

    #[error("invalid template: {0}")]
    Config(#[from] TemplateError),

    #[error("cannot decode group key: {0}")]
    Decode(#[from] GroupKeyError),

    #[error("unknown distance method: {name:?}")]
    UnknownDistanceMethod { name: String },

    #[error("{kind} {name:?} already exists")]
    DuplicateName { kind: EntityKind, name: String },

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("unknown data source: {0:?}")]
    UnknownDataSource(String),

    #[error("unknown template: {0:?}")]
    UnknownTemplate(String),

    #[error("data source {datasource:?} has no field {field:?}")]
    UnknownField { datasource: String, field: String },

    #[error("data source {datasource:?} has no group {key:?}")]
    UnknownGroup { datasource: String, key: String },

    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),

    #[error("distance error: {0}")]
    Distance(MatchError),

    #[error("store error: {0}")]
    Store(#[from] IndexError),

    #[error("pipeline error: {0}")]
    Pipeline(String),
}

impl From<MatchError> for AkinError {
    fn from(e: MatchError) -> Self {
        match e {
            MatchError::UnknownDistanceMethod { name } => AkinError::UnknownDistanceMethod { name },
            other => AkinError::Distance(other),
        }
    }
}
