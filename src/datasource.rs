//! Rows, data sources and the per-template signature side table.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use minhash::{RowSignature, Tokenization};
use serde::{Deserialize, Serialize};

use crate::group::GroupResult;
use crate::group_key::{GroupKey, SYSTEM_PREFIX};
use crate::template::TemplateParams;

/// Byte-order mark some spreadsheet exports prepend to the first header.
const BOM: char = '\u{feff}';

/// One record: field name to string value, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(IndexMap<String, String>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Field names in column order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn strip_bom(self) -> Self {
        if !self.0.keys().any(|k| k.starts_with(BOM)) {
            return self;
        }
        self.0
            .into_iter()
            .map(|(k, v)| (k.trim_start_matches(BOM).to_string(), v))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row(iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect())
    }
}

impl From<IndexMap<String, String>> for Row {
    fn from(map: IndexMap<String, String>) -> Self {
        Row(map)
    }
}

/// Identifies one signature pass: field plus the parameters that affect
/// signatures. Thresholds are not part of it, so groups that differ only in
/// threshold share a pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureKey(String);

impl SignatureKey {
    pub fn new(field: &str, params: &TemplateParams) -> Self {
        let shingles = match params.tokenization {
            Tokenization::Words => "False".to_string(),
            Tokenization::Shingles { length } => format!("True{length}"),
        };
        let case = if params.case_sensitive { "cs" } else { "ci" };
        SignatureKey(format!(
            "{SYSTEM_PREFIX}{field}_{}_{shingles}_{case}",
            params.signature_length
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Signatures of every row for one [`SignatureKey`], indexed by row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSignatures {
    /// Hash-family seed the signatures were computed with.
    pub seed: u64,
    pub signatures: Vec<RowSignature>,
}

/// A named, ordered set of rows plus everything derived from them.
#[derive(Debug, Clone)]
pub struct DataSource {
    name: String,
    headers: Vec<String>,
    rows: Vec<Row>,
    signatures: BTreeMap<SignatureKey, CachedSignatures>,
    groups: BTreeMap<GroupKey, GroupResult>,
}

impl DataSource {
    /// Headers are the union of row fields in first-seen order.
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        let rows: Vec<Row> = rows.into_iter().map(Row::strip_bom).collect();
        let mut headers: Vec<String> = Vec::new();
        for row in &rows {
            for field in row.fields() {
                if !headers.iter().any(|h| h == field) {
                    headers.push(field.to_string());
                }
            }
        }
        Self {
            name: name.into(),
            headers,
            rows,
            signatures: BTreeMap::new(),
            groups: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// User field names. System-generated names never appear here.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.headers.iter().any(|h| h == field)
    }

    /// Value of `field` for every row; rows without it read as empty.
    pub fn field_values(&self, field: &str) -> Vec<&str> {
        self.rows
            .iter()
            .map(|row| row.get(field).unwrap_or(""))
            .collect()
    }

    /// Groups ordered by key.
    pub fn groups(&self) -> impl Iterator<Item = &GroupResult> {
        self.groups.values()
    }

    pub fn group(&self, key: &GroupKey) -> Option<&GroupResult> {
        self.groups.get(key)
    }

    /// Cached signatures for `key`, if computed under `seed`.
    pub fn cached_signatures(&self, key: &SignatureKey, seed: u64) -> Option<&[RowSignature]> {
        self.signatures
            .get(key)
            .filter(|cached| cached.seed == seed && cached.signatures.len() == self.rows.len())
            .map(|cached| cached.signatures.as_slice())
    }

    /// Signature passes cached for this data source.
    pub fn signature_keys(&self) -> impl Iterator<Item = &SignatureKey> {
        self.signatures.keys()
    }

    pub(crate) fn insert_signatures(&mut self, key: SignatureKey, cached: CachedSignatures) {
        self.signatures.insert(key, cached);
    }

    pub(crate) fn insert_group(&mut self, group: GroupResult) -> &GroupResult {
        let key = group.key().clone();
        self.groups.insert(key.clone(), group);
        &self.groups[&key]
    }
}
