//! The [`Akin`] engine: data sources, templates, groups and queries over one
//! store.

use indexmap::IndexMap;
use matcher::{DistanceFn, DistanceMethod, DistanceRegistry};
use minhash::RowSignature;
use serde_json::Value;
use tracing::{debug, info};

use crate::cluster::{cluster, ClusterInput};
use crate::config::AkinConfig;
use crate::datasource::{CachedSignatures, DataSource, Row, SignatureKey};
use crate::error::{AkinError, EntityKind};
use crate::group::{self, Cluster, ClusterSettings, ExportRecord, GroupOptions, GroupResult};
use crate::group_key::{self, DecodedGroupKey, GroupKey};
use crate::metrics::MetricsSpan;
use crate::pipeline::{build_index, SignaturePipeline};
use crate::query::{merge_hits, rank_group, QueryHit};
use crate::store::{is_storable_name, AkinStore};
use crate::template::{default_templates, HashTemplate, TemplateParams};

/// What a group request has to do given what is already built.
enum GroupPlan {
    Reuse,
    ClusterExisting,
    Build,
}

/// Approximate duplicate finder over named data sources.
pub struct Akin {
    config: AkinConfig,
    store: AkinStore,
    pipeline: SignaturePipeline,
    distances: DistanceRegistry,
    admission: DistanceFn,
    cluster_settings: ClusterSettings,
    datasources: IndexMap<String, DataSource>,
    templates: IndexMap<String, HashTemplate>,
}

impl Akin {
    /// Open the configured store and load what it holds. An empty template
    /// registry is seeded from the config, or with the built-in defaults.
    pub fn open(config: AkinConfig) -> Result<Self, AkinError> {
        config.validate()?;
        let distances = DistanceRegistry::default();
        let admission = distances.resolve(&config.clustering.admission_distance)?;
        let cluster_settings = ClusterSettings {
            mode: config.clustering.mode,
            admission: config.clustering.admission_distance.parse::<DistanceMethod>()?,
        };
        let store = AkinStore::open(config.store.to_store_config())?;
        let pipeline = SignaturePipeline::new(config.pipeline.workers)?;

        let loaded = store.load()?;
        let datasources: IndexMap<String, DataSource> = loaded
            .datasources
            .into_iter()
            .map(|ds| (ds.name().to_string(), ds))
            .collect();

        let (templates, seeded) = match loaded.templates {
            Some(templates) if !templates.is_empty() => (templates, false),
            _ if !config.templates.is_empty() => (config.templates.clone(), true),
            _ => (default_templates(), true),
        };
        if seeded {
            store.put_templates(&templates)?;
        }
        let templates: IndexMap<String, HashTemplate> = templates
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();

        info!(
            backend = %config.store.backend,
            workers = pipeline.workers(),
            datasources = datasources.len(),
            templates = templates.len(),
            seeded,
            "opened akin engine"
        );

        Ok(Self {
            config,
            store,
            pipeline,
            distances,
            admission,
            cluster_settings,
            datasources,
            templates,
        })
    }

    /// Engine over a fresh in-memory store.
    pub fn in_memory() -> Result<Self, AkinError> {
        Self::open(AkinConfig::in_memory())
    }

    pub fn config(&self) -> &AkinConfig {
        &self.config
    }

    pub fn distances(&self) -> &DistanceRegistry {
        &self.distances
    }

    /// Register extra distance methods for queries.
    pub fn distances_mut(&mut self) -> &mut DistanceRegistry {
        &mut self.distances
    }

    // ── Data sources ────────────────────────────────────────────────────

    pub fn add_datasource(
        &mut self,
        name: &str,
        rows: Vec<Row>,
    ) -> Result<&DataSource, AkinError> {
        if name.trim().is_empty() || !is_storable_name(name) {
            return Err(AkinError::InvalidName(name.to_string()));
        }
        if self.datasources.contains_key(name) {
            return Err(AkinError::DuplicateName {
                kind: EntityKind::DataSource,
                name: name.to_string(),
            });
        }
        let datasource = DataSource::new(name, rows);
        self.store.put_datasource(&datasource)?;
        info!(
            datasource = name,
            rows = datasource.len(),
            fields = datasource.headers().len(),
            "added data source"
        );
        let (index, _) = self.datasources.insert_full(name.to_string(), datasource);
        Ok(&self.datasources[index])
    }

    /// Delete a data source together with its groups and cached signatures.
    pub fn delete_datasource(&mut self, name: &str) -> Result<(), AkinError> {
        if !self.datasources.contains_key(name) {
            return Err(AkinError::UnknownDataSource(name.to_string()));
        }
        self.store.delete_datasource(name)?;
        self.datasources.shift_remove(name);
        info!(datasource = name, "deleted data source");
        Ok(())
    }

    /// Data sources in the order they were added.
    pub fn datasources(&self) -> impl Iterator<Item = &DataSource> {
        self.datasources.values()
    }

    pub fn datasource(&self, name: &str) -> Result<&DataSource, AkinError> {
        self.datasources
            .get(name)
            .ok_or_else(|| AkinError::UnknownDataSource(name.to_string()))
    }

    /// User field names of a data source.
    pub fn fields(&self, datasource: &str) -> Result<&[String], AkinError> {
        Ok(self.datasource(datasource)?.headers())
    }

    // ── Templates ───────────────────────────────────────────────────────

    pub fn add_template(&mut self, template: HashTemplate) -> Result<&HashTemplate, AkinError> {
        template.validate()?;
        if self.templates.contains_key(&template.name) {
            return Err(AkinError::DuplicateName {
                kind: EntityKind::Template,
                name: template.name,
            });
        }
        let mut registry: Vec<HashTemplate> = self.templates.values().cloned().collect();
        registry.push(template.clone());
        self.store.put_templates(&registry)?;
        info!(template = %template.name, threshold = template.threshold, "added template");
        let (index, _) = self
            .templates
            .insert_full(template.name.clone(), template);
        Ok(&self.templates[index])
    }

    /// Templates in registration order.
    pub fn templates(&self) -> impl Iterator<Item = &HashTemplate> {
        self.templates.values()
    }

    pub fn template(&self, name: &str) -> Result<&HashTemplate, AkinError> {
        self.templates
            .get(name)
            .ok_or_else(|| AkinError::UnknownTemplate(name.to_string()))
    }

    // ── Groups ──────────────────────────────────────────────────────────

    /// Build (or reuse) the group of `field` under `template`. With
    /// `group_results` false only signatures and the index are built.
    pub fn create_group(
        &mut self,
        datasource: &str,
        field: &str,
        template: &str,
        group_results: bool,
    ) -> Result<&GroupResult, AkinError> {
        let options = GroupOptions {
            force_rehash: false,
            group_results,
        };
        self.create_group_with(datasource, field, template, options)
    }

    /// A stored group is rebuilt when the seed or error weights changed, and
    /// re-clustered over its index when the cluster mode or admission
    /// distance changed.
    pub fn create_group_with(
        &mut self,
        datasource: &str,
        field: &str,
        template: &str,
        options: GroupOptions,
    ) -> Result<&GroupResult, AkinError> {
        let params = self.template(template)?.params();
        let ds = self.datasource(datasource)?;
        if field.is_empty() || !is_storable_name(field) {
            return Err(AkinError::InvalidName(field.to_string()));
        }
        if !ds.has_field(field) {
            return Err(AkinError::UnknownField {
                datasource: datasource.to_string(),
                field: field.to_string(),
            });
        }
        let key = GroupKey::encode(field, &params);
        let seed = self.config.pipeline.seed;
        let weights = self.config.clustering.weights();
        let settings = self.cluster_settings;

        // Seed and weights shape the index; the clustering settings only
        // shape the clusters on top of it.
        let plan = match ds.group(&key) {
            Some(existing)
                if !options.force_rehash
                    && existing.seed() == seed
                    && existing.weights() == weights =>
            {
                match existing.cluster_settings() {
                    Some(built) if built == settings => GroupPlan::Reuse,
                    Some(_) => GroupPlan::ClusterExisting,
                    None if options.group_results => GroupPlan::ClusterExisting,
                    None => GroupPlan::Reuse,
                }
            }
            _ => GroupPlan::Build,
        };

        match plan {
            GroupPlan::Reuse => {
                debug!(datasource, key = %key, "reusing group");
                self.lookup_group(datasource, &key)
            }
            GroupPlan::ClusterExisting => {
                let signatures = self.signatures(datasource, field, &params, false)?;
                let existing = self.lookup_group(datasource, &key)?;
                let clusters = self.cluster_rows(
                    self.datasource(datasource)?,
                    existing,
                    &signatures,
                )?;
                let grouped = existing.clone().with_clusters(settings, clusters);
                info!(
                    datasource,
                    key = %key,
                    clusters = grouped.clusters().len(),
                    "clustered existing index"
                );
                self.save_group(grouped)
            }
            GroupPlan::Build => {
                let signatures =
                    self.signatures(datasource, field, &params, options.force_rehash)?;
                let build = build_index(
                    &signatures,
                    params.threshold,
                    params.signature_length,
                    weights,
                )?;
                let mut result = GroupResult::new(
                    datasource,
                    field,
                    params,
                    seed,
                    weights,
                    build.index,
                    build.unindexable,
                );
                if options.group_results {
                    let clusters =
                        self.cluster_rows(self.datasource(datasource)?, &result, &signatures)?;
                    result = result.with_clusters(settings, clusters);
                }
                let lsh = result.index().params();
                info!(
                    datasource,
                    key = %key,
                    bands = lsh.bands,
                    rows_per_band = lsh.rows,
                    indexed = result.index().len(),
                    unindexable = result.unindexable().len(),
                    clusters = result.clusters().len(),
                    grouped = result.is_grouped(),
                    "built group"
                );
                self.save_group(result)
            }
        }
    }

    /// Groups of a data source, ordered by key.
    pub fn list_groups(&self, datasource: &str) -> Result<Vec<&GroupResult>, AkinError> {
        Ok(self.datasource(datasource)?.groups().collect())
    }

    /// Look up a group by key string. Keys in the older encoding without a
    /// case marker are accepted.
    pub fn group(&self, datasource: &str, key: &str) -> Result<&GroupResult, AkinError> {
        let decoded = group_key::decode(key)?;
        self.lookup_decoded(datasource, key, &decoded)
    }

    /// Query one or more groups of a data source with free text.
    ///
    /// Hits from all groups come back in one list, ascending by distance;
    /// ties keep the order of `keys` and then row order.
    pub fn query_groups<I, S>(
        &self,
        datasource: &str,
        keys: I,
        query: &str,
        method: &str,
    ) -> Result<Vec<QueryHit>, AkinError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let span = MetricsSpan::start();
        let distance = self.distances.resolve(method)?;
        let ds = self.datasource(datasource)?;

        let requested: Vec<(String, DecodedGroupKey)> = keys
            .into_iter()
            .map(|key| {
                let key = key.as_ref();
                group_key::decode(key).map(|d| (key.to_string(), d))
            })
            .collect::<Result<_, _>>()?;

        let mut ranked = Vec::with_capacity(requested.len());
        for (raw, decoded) in &requested {
            let group = self.lookup_decoded(datasource, raw, decoded)?;
            let rows = rank_group(ds, group, decoded, query, distance)?;
            ranked.push((group.key().clone(), rows));
        }
        let hits = merge_hits(ds, ranked);

        debug!(
            datasource,
            groups = requested.len(),
            hits = hits.len(),
            method,
            "query finished"
        );
        if let Some(span) = span {
            span.record_query(hits.len());
        }
        Ok(hits)
    }

    /// Clustered rows of a group, cluster by cluster.
    pub fn export_group(&self, datasource: &str, key: &str) -> Result<Vec<ExportRecord>, AkinError> {
        let result = self.group(datasource, key)?;
        Ok(group::export_records(self.datasource(datasource)?, result))
    }

    /// Clustered rows as a `{headers, data}` table.
    pub fn export_table(&self, datasource: &str, key: &str) -> Result<Value, AkinError> {
        let result = self.group(datasource, key)?;
        Ok(group::export_table(self.datasource(datasource)?, result))
    }

    pub fn flush(&self) -> Result<(), AkinError> {
        self.store.flush()
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn lookup_group(&self, datasource: &str, key: &GroupKey) -> Result<&GroupResult, AkinError> {
        self.datasource(datasource)?
            .group(key)
            .ok_or_else(|| AkinError::UnknownGroup {
                datasource: datasource.to_string(),
                key: key.to_string(),
            })
    }

    fn lookup_decoded(
        &self,
        datasource: &str,
        raw: &str,
        decoded: &DecodedGroupKey,
    ) -> Result<&GroupResult, AkinError> {
        let canonical = GroupKey::encode(&decoded.field, &decoded.params);
        self.datasource(datasource)?
            .group(&canonical)
            .ok_or_else(|| AkinError::UnknownGroup {
                datasource: datasource.to_string(),
                key: raw.to_string(),
            })
    }

    /// Row signatures for `field` under `params`, from the cache when
    /// possible. Fresh signatures are cached and persisted.
    fn signatures(
        &mut self,
        datasource: &str,
        field: &str,
        params: &TemplateParams,
        force_rehash: bool,
    ) -> Result<Vec<RowSignature>, AkinError> {
        let seed = self.config.pipeline.seed;
        let key = SignatureKey::new(field, params);
        let ds = self.datasource(datasource)?;

        if !force_rehash {
            if let Some(cached) = ds.cached_signatures(&key, seed) {
                debug!(datasource, key = %key, "signature cache hit");
                return Ok(cached.to_vec());
            }
        }

        let span = MetricsSpan::start();
        let values = ds.field_values(field);
        let signatures = self
            .pipeline
            .sign_all(&values, &params.signature_config(seed))?;
        let unindexable = signatures.iter().filter(|s| !s.is_indexable()).count();
        if let Some(span) = span {
            span.record_signatures(signatures.len(), unindexable);
        }
        debug!(
            datasource,
            key = %key,
            rows = signatures.len(),
            unindexable,
            "computed signatures"
        );

        let cached = CachedSignatures {
            seed,
            signatures: signatures.clone(),
        };
        self.store.put_signatures(datasource, &key, &cached)?;
        if let Some(ds) = self.datasources.get_mut(datasource) {
            ds.insert_signatures(key, cached);
        }
        Ok(signatures)
    }

    fn cluster_rows(
        &self,
        datasource: &DataSource,
        group: &GroupResult,
        signatures: &[RowSignature],
    ) -> Result<Vec<Cluster>, AkinError> {
        let span = MetricsSpan::start();
        let values = datasource.field_values(group.field());
        let clusters = cluster(
            self.cluster_settings.mode,
            &ClusterInput {
                index: group.index(),
                signatures,
                values: &values,
                distance: self.admission,
                case_sensitive: group.params().case_sensitive,
            },
        )?;
        if let Some(span) = span {
            span.record_grouping(clusters.len());
        }
        Ok(clusters)
    }

    fn save_group(&mut self, group: GroupResult) -> Result<&GroupResult, AkinError> {
        self.store.put_group(&group)?;
        let name = group.datasource().to_string();
        let ds = self
            .datasources
            .get_mut(&name)
            .ok_or(AkinError::UnknownDataSource(name))?;
        Ok(ds.insert_group(group))
    }
}
