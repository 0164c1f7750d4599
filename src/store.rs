//! Persistence of data sources, signature caches, groups and templates.
//!
//! Everything goes through one [`BlobStore`] under namespaced keys:
//!
//! ```text
//! ds␟{datasource}                  rows
//! sig␟{datasource}␟{signature key}  cached signatures
//! group␟{datasource}␟{group key}    group result (index + clusters)
//! templates                         template registry, in order
//! ```
//!
//! `␟` is the ASCII unit separator, which names may not contain.

use index::{BlobStore, StoreConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::datasource::{CachedSignatures, DataSource, Row, SignatureKey};
use crate::error::AkinError;
use crate::group::GroupResult;
use crate::template::HashTemplate;

/// Separator between key segments.
pub const KEY_SEPARATOR: char = '\u{1f}';

const DATASOURCE_NS: &str = "ds";
const SIGNATURE_NS: &str = "sig";
const GROUP_NS: &str = "group";
const TEMPLATES_KEY: &str = "templates";

#[derive(Serialize, Deserialize)]
struct StoredDataSource {
    name: String,
    rows: Vec<Row>,
}

#[derive(Serialize, Deserialize)]
struct StoredSignatures {
    datasource: String,
    key: SignatureKey,
    cached: CachedSignatures,
}

/// State read back by [`AkinStore::load`].
#[derive(Debug, Default)]
pub struct LoadedState {
    pub datasources: Vec<DataSource>,
    /// `None` when no registry was ever saved.
    pub templates: Option<Vec<HashTemplate>>,
}

/// Typed view of the blob store.
pub struct AkinStore {
    blobs: BlobStore,
}

impl AkinStore {
    pub fn open(cfg: StoreConfig) -> Result<Self, AkinError> {
        Ok(Self {
            blobs: BlobStore::new(cfg)?,
        })
    }

    /// Store the rows of `datasource`. Signatures and groups are written
    /// separately as they are built.
    pub fn put_datasource(&self, datasource: &DataSource) -> Result<(), AkinError> {
        let stored = StoredDataSource {
            name: datasource.name().to_string(),
            rows: datasource.rows().to_vec(),
        };
        self.blobs
            .put(&key(&[DATASOURCE_NS, datasource.name()]), &stored)?;
        Ok(())
    }

    pub fn put_signatures(
        &self,
        datasource: &str,
        signature_key: &SignatureKey,
        cached: &CachedSignatures,
    ) -> Result<(), AkinError> {
        let stored = StoredSignatures {
            datasource: datasource.to_string(),
            key: signature_key.clone(),
            cached: cached.clone(),
        };
        self.blobs.put(
            &key(&[SIGNATURE_NS, datasource, signature_key.as_str()]),
            &stored,
        )?;
        Ok(())
    }

    pub fn put_group(&self, group: &GroupResult) -> Result<(), AkinError> {
        self.blobs.put(
            &key(&[GROUP_NS, group.datasource(), group.key().as_str()]),
            group,
        )?;
        Ok(())
    }

    pub fn put_templates(&self, templates: &[HashTemplate]) -> Result<(), AkinError> {
        self.blobs.put(TEMPLATES_KEY, templates)?;
        Ok(())
    }

    /// Remove a data source with its signatures and groups.
    pub fn delete_datasource(&self, name: &str) -> Result<(), AkinError> {
        self.blobs.delete(&key(&[DATASOURCE_NS, name]))?;
        self.blobs.delete_prefix(&namespace(SIGNATURE_NS, name))?;
        self.blobs.delete_prefix(&namespace(GROUP_NS, name))?;
        Ok(())
    }

    /// Read everything back. Signature caches and groups whose data source
    /// is gone are skipped.
    pub fn load(&self) -> Result<LoadedState, AkinError> {
        let mut datasources: Vec<DataSource> = Vec::new();
        let ds_prefix = format!("{DATASOURCE_NS}{KEY_SEPARATOR}");
        self.blobs
            .scan::<StoredDataSource>(&ds_prefix, &mut |_, stored| {
                datasources.push(DataSource::new(stored.name, stored.rows));
                Ok(())
            })?;

        let sig_prefix = format!("{SIGNATURE_NS}{KEY_SEPARATOR}");
        self.blobs
            .scan::<StoredSignatures>(&sig_prefix, &mut |key, stored| {
                match datasources
                    .iter_mut()
                    .find(|ds| ds.name() == stored.datasource)
                {
                    Some(ds) => ds.insert_signatures(stored.key, stored.cached),
                    None => warn!(key, "skipping signatures of missing data source"),
                }
                Ok(())
            })?;

        let group_prefix = format!("{GROUP_NS}{KEY_SEPARATOR}");
        self.blobs
            .scan::<GroupResult>(&group_prefix, &mut |_, group| {
                match datasources
                    .iter_mut()
                    .find(|ds| ds.name() == group.datasource())
                {
                    Some(ds) => {
                        ds.insert_group(group);
                    }
                    None => warn!(
                        datasource = group.datasource(),
                        key = %group.key(),
                        "skipping group of missing data source"
                    ),
                }
                Ok(())
            })?;

        let templates = self.blobs.get::<Vec<HashTemplate>>(TEMPLATES_KEY)?;
        debug!(
            datasources = datasources.len(),
            templates = templates.as_ref().map_or(0, Vec::len),
            "loaded stored state"
        );
        Ok(LoadedState {
            datasources,
            templates,
        })
    }

    pub fn flush(&self) -> Result<(), AkinError> {
        self.blobs.flush().map_err(AkinError::from)
    }
}

/// `true` when `name` can be used as a key segment.
pub fn is_storable_name(name: &str) -> bool {
    !name.contains(KEY_SEPARATOR)
}

fn key(segments: &[&str]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push(KEY_SEPARATOR);
        }
        out.push_str(segment);
    }
    out
}

/// Prefix of every key under `ns` for one data source.
fn namespace(ns: &str, datasource: &str) -> String {
    let mut prefix = key(&[ns, datasource]);
    prefix.push(KEY_SEPARATOR);
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::ClusterSettings;
    use crate::template::HashTemplate;
    use index::{ErrorWeights, LshIndex};
    use minhash::RowSignature;

    fn store() -> AkinStore {
        AkinStore::open(StoreConfig::default()).unwrap()
    }

    fn datasource(name: &str) -> DataSource {
        DataSource::new(
            name,
            vec![
                Row::new().with("name", "Acme"),
                Row::new().with("name", "ACME inc"),
            ],
        )
    }

    fn group(ds: &str) -> GroupResult {
        let params = HashTemplate::new("t", 0.5).params();
        let mut index = LshIndex::with_threshold(0.5, 128, ErrorWeights::default()).unwrap();
        index.insert(0, &[7; 128]).unwrap();
        GroupResult::new(ds, "name", params, 3, ErrorWeights::default(), index, vec![1])
            .with_clusters(ClusterSettings::default(), vec![vec![0, 1]])
    }

    #[test]
    fn round_trip_preserves_rows_signatures_and_groups() {
        let store = store();
        let ds = datasource("companies");
        store.put_datasource(&ds).unwrap();
        let sig_key = SignatureKey::new("name", &HashTemplate::new("t", 0.5).params());
        let cached = CachedSignatures {
            seed: 3,
            signatures: vec![
                RowSignature {
                    signature: vec![7; 128],
                    token_count: 1,
                },
                RowSignature {
                    signature: vec![u64::MAX; 128],
                    token_count: 0,
                },
            ],
        };
        store.put_signatures("companies", &sig_key, &cached).unwrap();
        store.put_group(&group("companies")).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.datasources.len(), 1);
        let restored = &loaded.datasources[0];
        assert_eq!(restored.rows(), ds.rows());
        assert_eq!(
            restored.cached_signatures(&sig_key, 3),
            Some(cached.signatures.as_slice())
        );
        let g = group("companies");
        assert_eq!(restored.group(g.key()), Some(&g));
        assert!(loaded.templates.is_none());
    }

    #[test]
    fn orphan_groups_are_skipped() {
        let store = store();
        store.put_datasource(&datasource("kept")).unwrap();
        store.put_group(&group("gone")).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.datasources.len(), 1);
        assert_eq!(loaded.datasources[0].groups().count(), 0);
    }

    #[test]
    fn delete_only_touches_the_named_datasource() {
        let store = store();
        for name in ["ds", "ds2"] {
            store.put_datasource(&datasource(name)).unwrap();
            store.put_group(&group(name)).unwrap();
        }
        store.delete_datasource("ds").unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.datasources.len(), 1);
        assert_eq!(loaded.datasources[0].name(), "ds2");
        assert_eq!(loaded.datasources[0].groups().count(), 1);
    }

    #[test]
    fn templates_keep_their_order() {
        let store = store();
        let templates = vec![HashTemplate::new("b", 0.5), HashTemplate::new("a", 0.9)];
        store.put_templates(&templates).unwrap();
        assert_eq!(store.load().unwrap().templates, Some(templates));
    }

    #[test]
    fn separator_is_not_storable() {
        assert!(is_storable_name("customers 2024"));
        assert!(!is_storable_name("bad\u{1f}name"));
    }
}
