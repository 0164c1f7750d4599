//! Group results and their export.

use index::{ErrorWeights, LshIndex};
use matcher::DistanceMethod;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cluster::ClusterMode;
use crate::datasource::{DataSource, Row};
use crate::group_key::GroupKey;
use crate::template::TemplateParams;

/// Row indices of one duplicate cluster, ascending. Always more than one.
pub type Cluster = Vec<usize>;

/// Options for building a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupOptions {
    /// Recompute row signatures even when cached ones exist.
    pub force_rehash: bool,
    /// Run clustering. Without it only signatures and the index are built,
    /// which is all queries need.
    pub group_results: bool,
}

impl GroupOptions {
    pub fn grouped() -> Self {
        Self {
            force_rehash: false,
            group_results: true,
        }
    }

    pub fn index_only() -> Self {
        Self::default()
    }

    pub fn with_force_rehash(mut self, force_rehash: bool) -> Self {
        self.force_rehash = force_rehash;
        self
    }
}

/// Clustering configuration a group's clusters were produced under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSettings {
    pub mode: ClusterMode,
    pub admission: DistanceMethod,
}

/// Index and clusters built for one `(data source, field, template)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupResult {
    datasource: String,
    key: GroupKey,
    field: String,
    params: TemplateParams,
    seed: u64,
    weights: ErrorWeights,
    index: LshIndex,
    clusters: Option<Vec<Cluster>>,
    cluster_settings: Option<ClusterSettings>,
    unindexable: Vec<usize>,
}

impl GroupResult {
    pub(crate) fn new(
        datasource: &str,
        field: &str,
        params: TemplateParams,
        seed: u64,
        weights: ErrorWeights,
        index: LshIndex,
        unindexable: Vec<usize>,
    ) -> Self {
        Self {
            datasource: datasource.to_string(),
            key: GroupKey::encode(field, &params),
            field: field.to_string(),
            params,
            seed,
            weights,
            index,
            clusters: None,
            cluster_settings: None,
            unindexable,
        }
    }

    pub(crate) fn with_clusters(mut self, settings: ClusterSettings, clusters: Vec<Cluster>) -> Self {
        self.clusters = Some(clusters);
        self.cluster_settings = Some(settings);
        self
    }

    pub fn datasource(&self) -> &str {
        &self.datasource
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn params(&self) -> &TemplateParams {
        &self.params
    }

    /// Seed of the hash family the index was built with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Error weights the band layout was optimized for.
    pub fn weights(&self) -> ErrorWeights {
        self.weights
    }

    /// Settings the clusters were produced under; `None` when not grouped.
    pub fn cluster_settings(&self) -> Option<ClusterSettings> {
        self.cluster_settings
    }

    pub fn index(&self) -> &LshIndex {
        &self.index
    }

    /// `false` when only the index was built.
    pub fn is_grouped(&self) -> bool {
        self.clusters.is_some()
    }

    /// Clusters in discovery order; empty when not grouped.
    pub fn clusters(&self) -> &[Cluster] {
        self.clusters.as_deref().unwrap_or(&[])
    }

    /// Rows with no tokens for this template. They are not in the index.
    pub fn unindexable(&self) -> &[usize] {
        &self.unindexable
    }
}

/// One exported row of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// 1-based cluster number.
    pub group_id: usize,
    pub row_index: usize,
    pub row: Row,
}

/// Every clustered row, cluster by cluster.
pub fn export_records(datasource: &DataSource, group: &GroupResult) -> Vec<ExportRecord> {
    group
        .clusters()
        .iter()
        .enumerate()
        .flat_map(|(i, cluster)| {
            cluster.iter().filter_map(move |&row_index| {
                datasource.row(row_index).map(|row| ExportRecord {
                    group_id: i + 1,
                    row_index,
                    row: row.clone(),
                })
            })
        })
        .collect()
}

/// `{"headers": [...], "data": [[...], ...]}` with `group_id` as the first
/// column and the user fields in header order.
pub fn export_table(datasource: &DataSource, group: &GroupResult) -> Value {
    let mut headers = vec!["group_id".to_string()];
    headers.extend(datasource.headers().iter().cloned());

    let data: Vec<Value> = export_records(datasource, group)
        .into_iter()
        .map(|record| {
            let mut cells = vec![json!(record.group_id)];
            cells.extend(
                datasource
                    .headers()
                    .iter()
                    .map(|h| json!(record.row.get(h).unwrap_or(""))),
            );
            Value::Array(cells)
        })
        .collect();

    json!({ "headers": headers, "data": data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::HashTemplate;
    use index::ErrorWeights;

    fn fixture() -> (DataSource, GroupResult) {
        let ds = DataSource::new(
            "ds",
            vec![
                Row::new().with("name", "Acme").with("city", "Oslo"),
                Row::new().with("name", "Beta").with("city", "Bergen"),
                Row::new().with("name", "ACME").with("city", "Oslo"),
            ],
        );
        let params = HashTemplate::new("t", 0.5).params();
        let index = LshIndex::with_threshold(0.5, 128, ErrorWeights::default()).unwrap();
        let group = GroupResult::new("ds", "name", params, 1, ErrorWeights::default(), index, vec![])
            .with_clusters(ClusterSettings::default(), vec![vec![0, 2]]);
        (ds, group)
    }

    #[test]
    fn records_number_clusters_from_one() {
        let (ds, group) = fixture();
        let records = export_records(&ds, &group);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.group_id == 1));
        assert_eq!(records[1].row_index, 2);
        assert_eq!(records[1].row.get("name"), Some("ACME"));
    }

    #[test]
    fn table_puts_group_id_first() {
        let (ds, group) = fixture();
        let table = export_table(&ds, &group);
        assert_eq!(table["headers"], json!(["group_id", "name", "city"]));
        assert_eq!(table["data"][0], json!([1, "Acme", "Oslo"]));
        assert_eq!(table["data"][1], json!([1, "ACME", "Oslo"]));
    }

    #[test]
    fn index_only_group_exports_nothing() {
        let (ds, group) = fixture();
        let index_only = GroupResult {
            clusters: None,
            cluster_settings: None,
            ..group
        };
        assert!(!index_only.is_grouped());
        assert!(export_records(&ds, &index_only).is_empty());
        assert_eq!(index_only.key().as_str(), "__name_minhashlsh_0.5_128_False_ci");
    }
}
