//! Distance-based ranking and the cluster admission check.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::types::DistanceFn;

/// Lower-case `value` unless comparisons are case-sensitive.
pub fn fold_case(value: &str, case_sensitive: bool) -> Cow<'_, str> {
    if case_sensitive {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(value.to_lowercase())
    }
}

/// One candidate row with its exact distance to the query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankedRow {
    pub row_index: usize,
    pub distance: usize,
}

/// Rank `(row_index, value)` candidates by ascending distance to `query`.
///
/// Ties keep ascending row order.
pub fn rank_by_distance<'a, I>(
    query: &str,
    candidates: I,
    distance: DistanceFn,
    case_sensitive: bool,
) -> Vec<RankedRow>
where
    I: IntoIterator<Item = (usize, &'a str)>,
{
    let query = fold_case(query, case_sensitive);
    let mut ranked: Vec<RankedRow> = candidates
        .into_iter()
        .map(|(row_index, value)| RankedRow {
            row_index,
            distance: distance(&query, &fold_case(value, case_sensitive)),
        })
        .collect();
    ranked.sort_by_key(|r| (r.distance, r.row_index));
    ranked
}

/// Average distance from each value to every other value.
///
/// A single value has nothing to compare against and averages to `0.0`.
pub fn average_distances(values: &[&str], distance: DistanceFn, case_sensitive: bool) -> Vec<f64> {
    let folded: Vec<Cow<'_, str>> = values
        .iter()
        .map(|v| fold_case(v, case_sensitive))
        .collect();
    if folded.len() < 2 {
        return vec![0.0; folded.len()];
    }
    let others = (folded.len() - 1) as f64;
    folded
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let total: usize = folded
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, b)| distance(a, b))
                .sum();
            total as f64 / others
        })
        .collect()
}

/// `true` when at least one member differs textually from the rest.
///
/// Clusters of character-for-character identical values (after case
/// folding) carry nothing to deduplicate and fail this check.
pub fn has_textual_variation(values: &[&str], distance: DistanceFn, case_sensitive: bool) -> bool {
    average_distances(values, distance, case_sensitive)
        .into_iter()
        .any(|avg| avg > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DistanceMethod;

    fn lev() -> DistanceFn {
        DistanceMethod::Levenshtein.function()
    }

    #[test]
    fn ranking_is_ascending_with_row_order_ties() {
        let candidates = [(3, "Acme Corporation"), (1, "ACME CORP"), (0, "Acme Corp")];
        let ranked = rank_by_distance("acme corp", candidates, lev(), false);
        assert_eq!(
            ranked,
            vec![
                RankedRow {
                    row_index: 0,
                    distance: 0
                },
                RankedRow {
                    row_index: 1,
                    distance: 0
                },
                RankedRow {
                    row_index: 3,
                    distance: 7
                },
            ]
        );
    }

    #[test]
    fn case_sensitive_ranking_sees_case() {
        let ranked = rank_by_distance("acme", [(0, "ACME")], lev(), true);
        assert_eq!(ranked[0].distance, 4);
    }

    #[test]
    fn identical_values_have_no_variation() {
        assert!(!has_textual_variation(&["acme", "acme", "acme"], lev(), false));
        assert!(!has_textual_variation(&["Acme", "ACME"], lev(), false));
        assert!(has_textual_variation(&["Acme", "ACME"], lev(), true));
    }

    #[test]
    fn one_differing_member_admits_the_cluster() {
        let values = ["acme", "acme inc", "ACME"];
        assert!(has_textual_variation(&values, lev(), false));
        let averages = average_distances(&values, lev(), false);
        assert_eq!(averages, vec![2.0, 4.0, 2.0]);
    }

    #[test]
    fn singletons_and_empty_sets_average_to_zero() {
        assert_eq!(average_distances(&["solo"], lev(), false), vec![0.0]);
        assert!(average_distances(&[], lev(), false).is_empty());
    }
}
