//! Ad hoc queries against built groups.

use matcher::{rank_by_distance, DistanceFn, RankedRow};
use minhash::Signer;
use serde::{Deserialize, Serialize};

use crate::datasource::{DataSource, Row};
use crate::error::AkinError;
use crate::group::GroupResult;
use crate::group_key::{DecodedGroupKey, GroupKey};

/// One row matched by a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryHit {
    /// Group whose index produced the hit.
    pub group_key: GroupKey,
    pub row_index: usize,
    /// Exact distance between the query and the row's field value.
    pub distance: usize,
    pub row: Row,
}

/// Rank the candidates `group` returns for `query`.
///
/// The query is tokenized and signed with the decoded parameters and the
/// group's seed. A query without tokens matches nothing.
pub fn rank_group(
    datasource: &DataSource,
    group: &GroupResult,
    decoded: &DecodedGroupKey,
    query: &str,
    distance: DistanceFn,
) -> Result<Vec<RankedRow>, AkinError> {
    let signer = Signer::new(decoded.params.signature_config(group.seed()))?;
    let signature = signer.sign(query);
    if !signature.is_indexable() {
        return Ok(Vec::new());
    }
    let candidates = group.index().query(&signature.signature)?;
    let field = decoded.field.as_str();
    let values = candidates.into_iter().map(|row_index| {
        let value = datasource
            .row(row_index)
            .and_then(|row| row.get(field))
            .unwrap_or("");
        (row_index, value)
    });
    Ok(rank_by_distance(
        query,
        values,
        distance,
        decoded.params.case_sensitive,
    ))
}

/// Merge per-group rankings into one list ordered by distance, then by the
/// position of the group in the request, then by row.
pub fn merge_hits(
    datasource: &DataSource,
    ranked: Vec<(GroupKey, Vec<RankedRow>)>,
) -> Vec<QueryHit> {
    let mut keyed: Vec<(usize, usize, usize, GroupKey)> = ranked
        .into_iter()
        .enumerate()
        .flat_map(|(order, (key, rows))| {
            rows.into_iter()
                .map(move |r| (r.distance, order, r.row_index, key.clone()))
        })
        .collect();
    keyed.sort_by_key(|(distance, order, row_index, _)| (*distance, *order, *row_index));

    keyed
        .into_iter()
        .filter_map(|(distance, _, row_index, group_key)| {
            datasource.row(row_index).map(|row| QueryHit {
                group_key,
                row_index,
                distance,
                row: row.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{build_index, SignaturePipeline};
    use crate::template::HashTemplate;
    use index::ErrorWeights;
    use matcher::DistanceMethod;
    use minhash::DEFAULT_SEED;

    fn fixture() -> (DataSource, GroupResult, DecodedGroupKey) {
        let names = [
            "Acme Corp",
            "ACME CORP",
            "Beta LLC",
            "Acme Corporation",
            "Gamma Inc",
        ];
        let ds = DataSource::new(
            "companies",
            names.iter().map(|n| Row::new().with("name", *n)).collect(),
        );
        let params = HashTemplate::new("t", 0.5).params();
        let values = ds.field_values("name");
        let sigs = SignaturePipeline::new(Some(1))
            .unwrap()
            .sign_all(&values, &params.signature_config(DEFAULT_SEED))
            .unwrap();
        let build = build_index(&sigs, 0.5, 128, ErrorWeights::default()).unwrap();
        let group = GroupResult::new(
            "companies",
            "name",
            params,
            DEFAULT_SEED,
            ErrorWeights::default(),
            build.index,
            build.unindexable,
        );
        let decoded = group.key().decode().unwrap();
        (ds, group, decoded)
    }

    #[test]
    fn ranks_candidates_by_case_folded_distance() {
        let (ds, group, decoded) = fixture();
        let ranked = rank_group(
            &ds,
            &group,
            &decoded,
            "acme corp",
            DistanceMethod::Levenshtein.function(),
        )
        .unwrap();
        let rows: Vec<(usize, usize)> = ranked.iter().map(|r| (r.row_index, r.distance)).collect();
        assert_eq!(rows, vec![(0, 0), (1, 0), (3, 7)]);
    }

    #[test]
    fn query_without_tokens_matches_nothing() {
        let (ds, group, decoded) = fixture();
        let ranked = rank_group(
            &ds,
            &group,
            &decoded,
            "   ",
            DistanceMethod::Levenshtein.function(),
        )
        .unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn merged_hits_order_by_distance_then_request_order() {
        let (ds, group, _) = fixture();
        let first = GroupKey::parse("__name_minhashlsh_0.9_128_False_ci").unwrap();
        let second = group.key().clone();
        let hit = |row_index, distance| RankedRow {
            row_index,
            distance,
        };
        let hits = merge_hits(
            &ds,
            vec![
                (first.clone(), vec![hit(3, 2)]),
                (second.clone(), vec![hit(1, 0), hit(4, 2)]),
            ],
        );
        let order: Vec<(&str, usize, usize)> = hits
            .iter()
            .map(|h| (h.group_key.as_str(), h.row_index, h.distance))
            .collect();
        assert_eq!(
            order,
            vec![
                (second.as_str(), 1, 0),
                (first.as_str(), 3, 2),
                (second.as_str(), 4, 2),
            ]
        );
        assert_eq!(hits[0].row.get("name"), Some("ACME CORP"));
    }
}
