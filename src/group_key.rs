//! GroupKey encoding.
//!
//! A group key binds a field name to the template parameters that built the
//! group:
//!
//! ```text
//! __{field}_{index_kind}_{threshold}_{signature_length}_{shingles}_{case}
//! ```
//!
//! `shingles` is `False` or `True{length}`; `case` is `cs` (case-sensitive)
//! or `ci`. The leading `__` marks the key as system-generated. Segments are
//! split from the right, so field names may themselves contain `_`.
//!
//! Keys written without the trailing case segment decode as
//! case-insensitive, which is how such groups were always built.

use std::fmt;

use minhash::Tokenization;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::template::{IndexKind, TemplateParams};

/// Reserved prefix of system-generated names.
pub const SYSTEM_PREFIX: &str = "__";

const CASE_SENSITIVE_MARKER: &str = "cs";
const CASE_INSENSITIVE_MARKER: &str = "ci";

/// A key string that does not have the encoded shape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GroupKeyError {
    #[error("group key {0:?} does not start with '__'")]
    MissingPrefix(String),
    #[error("group key {key:?} has too few segments")]
    TooFewSegments { key: String },
    #[error("group key {0:?} has an empty field name")]
    EmptyField(String),
    #[error("unknown index kind {0:?} in group key")]
    UnknownIndexKind(String),
    #[error("invalid threshold {0:?} in group key")]
    InvalidThreshold(String),
    #[error("invalid signature length {0:?} in group key")]
    InvalidSignatureLength(String),
    #[error("invalid shingle marker {0:?} in group key")]
    InvalidShingleMarker(String),
}

/// Deterministic identifier of a `(field, template parameters)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    /// Encode `field` and `params` into a key.
    pub fn encode(field: &str, params: &TemplateParams) -> Self {
        let shingles = match params.tokenization {
            Tokenization::Words => "False".to_string(),
            Tokenization::Shingles { length } => format!("True{length}"),
        };
        let case = if params.case_sensitive {
            CASE_SENSITIVE_MARKER
        } else {
            CASE_INSENSITIVE_MARKER
        };
        GroupKey(format!(
            "{SYSTEM_PREFIX}{field}_{}_{}_{}_{shingles}_{case}",
            params.index_kind, params.threshold, params.signature_length
        ))
    }

    /// Validate an externally supplied key string.
    pub fn parse(key: &str) -> Result<Self, GroupKeyError> {
        decode(key)?;
        Ok(GroupKey(key.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn decode(&self) -> Result<DecodedGroupKey, GroupKeyError> {
        decode(&self.0)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GroupKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Field name and parameters recovered from a key.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGroupKey {
    pub field: String,
    pub params: TemplateParams,
}

/// Recover the field name and template parameters from a key string.
pub fn decode(key: &str) -> Result<DecodedGroupKey, GroupKeyError> {
    let body = key
        .strip_prefix(SYSTEM_PREFIX)
        .ok_or_else(|| GroupKeyError::MissingPrefix(key.to_string()))?;

    let (body, case_sensitive) = match body.rsplit_once('_') {
        Some((rest, CASE_SENSITIVE_MARKER)) => (rest, true),
        Some((rest, CASE_INSENSITIVE_MARKER)) => (rest, false),
        _ => (body, false),
    };

    let mut segments = body.rsplitn(5, '_');
    let mut next = || {
        segments.next().ok_or_else(|| GroupKeyError::TooFewSegments {
            key: key.to_string(),
        })
    };
    let shingles = next()?;
    let signature_length = next()?;
    let threshold = next()?;
    let index_kind = next()?;
    let field = next()?;

    if field.is_empty() {
        return Err(GroupKeyError::EmptyField(key.to_string()));
    }

    let index_kind = index_kind
        .parse::<IndexKind>()
        .map_err(|_| GroupKeyError::UnknownIndexKind(index_kind.to_string()))?;
    let threshold = parse_threshold(threshold)?;
    let signature_length = signature_length
        .parse::<usize>()
        .ok()
        .filter(|k| *k > 0)
        .ok_or_else(|| GroupKeyError::InvalidSignatureLength(signature_length.to_string()))?;
    let tokenization = parse_shingles(shingles)?;

    Ok(DecodedGroupKey {
        field: field.to_string(),
        params: TemplateParams {
            index_kind,
            threshold,
            case_sensitive,
            tokenization,
            signature_length,
        },
    })
}

fn parse_threshold(raw: &str) -> Result<f64, GroupKeyError> {
    raw.parse::<f64>()
        .ok()
        .filter(|t| *t > 0.0 && *t <= 1.0)
        .ok_or_else(|| GroupKeyError::InvalidThreshold(raw.to_string()))
}

/// `False`/`0` for words, `True{n}`/`1{n}` for shingles of `n` characters.
fn parse_shingles(raw: &str) -> Result<Tokenization, GroupKeyError> {
    let invalid = || GroupKeyError::InvalidShingleMarker(raw.to_string());
    if raw == "False" || raw == "0" {
        return Ok(Tokenization::Words);
    }
    let length = raw
        .strip_prefix("True")
        .or_else(|| raw.strip_prefix('1'))
        .ok_or_else(invalid)?;
    match length.parse::<usize>() {
        Ok(length) if length > 0 => Ok(Tokenization::Shingles { length }),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::HashTemplate;

    fn params(template: HashTemplate) -> TemplateParams {
        template.params()
    }

    #[test]
    fn encodes_every_parameter() {
        let key = GroupKey::encode("name", &params(HashTemplate::new("t", 0.5)));
        assert_eq!(key.as_str(), "__name_minhashlsh_0.5_128_False_ci");

        let key = GroupKey::encode(
            "name",
            &params(
                HashTemplate::new("t", 1.0)
                    .with_shingles(3)
                    .with_case_sensitive(true)
                    .with_signature_length(64),
            ),
        );
        assert_eq!(key.as_str(), "__name_minhashlsh_1_64_True3_cs");
    }

    #[test]
    fn decode_inverts_encode() {
        let templates = [
            HashTemplate::new("a", 0.5),
            HashTemplate::new("b", 1.0).with_case_sensitive(true),
            HashTemplate::new("c", 0.95).with_shingles(3),
            HashTemplate::new("d", 0.123456789)
                .with_shingles(12)
                .with_case_sensitive(true)
                .with_signature_length(7),
        ];
        for field in ["name", "company_name", "a_b_c", "ünïcode field"] {
            for template in &templates {
                let p = template.params();
                let decoded = GroupKey::encode(field, &p).decode().unwrap();
                assert_eq!(decoded.field, field);
                assert_eq!(decoded.params, p);
            }
        }
    }

    #[test]
    fn legacy_keys_decode_as_case_insensitive() {
        let decoded = decode("__product_name_minhashlsh_0.9_128_True3").unwrap();
        assert_eq!(decoded.field, "product_name");
        assert!(!decoded.params.case_sensitive);
        assert_eq!(decoded.params.threshold, 0.9);
        assert_eq!(
            decoded.params.tokenization,
            Tokenization::Shingles { length: 3 }
        );

        let decoded = decode("__name_minhashlsh_1.0_128_0").unwrap();
        assert_eq!(decoded.params.tokenization, Tokenization::Words);
        assert_eq!(decoded.params.threshold, 1.0);

        let decoded = decode("__name_minhashlsh_0.95_128_13").unwrap();
        assert_eq!(
            decoded.params.tokenization,
            Tokenization::Shingles { length: 3 }
        );
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert!(matches!(
            decode("name_minhashlsh_0.5_128_False_ci"),
            Err(GroupKeyError::MissingPrefix(_))
        ));
        assert!(matches!(
            decode("__minhashlsh_0.5_128_False"),
            Err(GroupKeyError::TooFewSegments { .. })
        ));
        assert!(matches!(
            decode("___minhashlsh_0.5_128_False_ci"),
            Err(GroupKeyError::EmptyField(_))
        ));
        assert!(matches!(
            decode("__name_annoy_0.5_128_False_ci"),
            Err(GroupKeyError::UnknownIndexKind(_))
        ));
        assert!(matches!(
            decode("__name_minhashlsh_1.5_128_False_ci"),
            Err(GroupKeyError::InvalidThreshold(_))
        ));
        assert!(matches!(
            decode("__name_minhashlsh_0.5_0_False_ci"),
            Err(GroupKeyError::InvalidSignatureLength(_))
        ));
        assert!(matches!(
            decode("__name_minhashlsh_0.5_128_True_ci"),
            Err(GroupKeyError::InvalidShingleMarker(_))
        ));
        assert!(matches!(
            decode("__name_minhashlsh_0.5_128_Maybe_ci"),
            Err(GroupKeyError::InvalidShingleMarker(_))
        ));
    }

    #[test]
    fn parse_keeps_the_input_string() {
        let key = GroupKey::parse("__name_minhashlsh_0.5_128_False").unwrap();
        assert_eq!(key.to_string(), "__name_minhashlsh_0.5_128_False");
        assert!(GroupKey::parse("bogus").is_err());
    }
}
