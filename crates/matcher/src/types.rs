use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;
use std::str::FromStr;

/// A string distance: the number of edit operations between two values.
pub type DistanceFn = fn(&str, &str) -> usize;

/// Built-in edit distances. All count Unicode scalar values, not bytes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMethod {
    /// Insertions, deletions and substitutions at equal cost.
    #[default]
    Levenshtein,
    /// Levenshtein plus adjacent transpositions; no substring is edited twice.
    OptimalStringAlignment,
    /// Unrestricted Damerau-Levenshtein: transpositions may be edited again.
    DamerauLevenshtein,
}

impl DistanceMethod {
    pub const ALL: [DistanceMethod; 3] = [
        DistanceMethod::Levenshtein,
        DistanceMethod::OptimalStringAlignment,
        DistanceMethod::DamerauLevenshtein,
    ];

    /// Canonical registry name.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMethod::Levenshtein => "levenshtein",
            DistanceMethod::OptimalStringAlignment => "optimal_string_alignment",
            DistanceMethod::DamerauLevenshtein => "damerau_levenshtein",
        }
    }

    /// Extra names the method is registered under.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            DistanceMethod::Levenshtein => {
                &["edit", "plain", "plain_edit_distance", "edit_distance"]
            }
            DistanceMethod::OptimalStringAlignment => &["osa"],
            DistanceMethod::DamerauLevenshtein => &["damerau"],
        }
    }

    pub fn function(&self) -> DistanceFn {
        match self {
            DistanceMethod::Levenshtein => strsim::levenshtein,
            DistanceMethod::OptimalStringAlignment => strsim::osa_distance,
            DistanceMethod::DamerauLevenshtein => strsim::damerau_levenshtein,
        }
    }

    pub fn distance(&self, a: &str, b: &str) -> usize {
        (self.function())(a, b)
    }
}

impl fmt::Display for DistanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceMethod {
    type Err = MatchError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_name(name);
        DistanceMethod::ALL
            .into_iter()
            .find(|m| m.name() == wanted || m.aliases().contains(&wanted.as_str()))
            .ok_or_else(|| MatchError::UnknownDistanceMethod {
                name: name.to_string(),
            })
    }
}

/// Registry lookup key: lower-cased, with spaces and hyphens folded to `_`.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}

/// Errors produced by the matching layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// No distance function is registered under the requested name.
    #[error("unknown distance method: {name:?}")]
    UnknownDistanceMethod { name: String },
    /// A distance function is already registered under this name.
    #[error("distance method {name:?} is already registered")]
    DuplicateMethod { name: String },
    #[error("distance method name must not be empty")]
    EmptyName,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_case_insensitively() {
        assert_eq!(
            "plain edit distance".parse::<DistanceMethod>().unwrap(),
            DistanceMethod::Levenshtein
        );
        assert_eq!(
            "Optimal-String-Alignment".parse::<DistanceMethod>().unwrap(),
            DistanceMethod::OptimalStringAlignment
        );
        assert_eq!(
            "DAMERAU".parse::<DistanceMethod>().unwrap(),
            DistanceMethod::DamerauLevenshtein
        );
    }

    #[test]
    fn unknown_name_is_reported_verbatim() {
        let err = "cosine".parse::<DistanceMethod>().unwrap_err();
        assert_eq!(
            err,
            MatchError::UnknownDistanceMethod {
                name: "cosine".into()
            }
        );
        assert!(err.to_string().contains("cosine"));
    }

    #[test]
    fn transpositions_separate_the_methods() {
        // "ca" -> "abc": OSA may not edit the transposed pair again.
        assert_eq!(DistanceMethod::Levenshtein.distance("ca", "abc"), 3);
        assert_eq!(DistanceMethod::OptimalStringAlignment.distance("ca", "abc"), 3);
        assert_eq!(DistanceMethod::DamerauLevenshtein.distance("ca", "abc"), 2);

        assert_eq!(DistanceMethod::Levenshtein.distance("acme", "amce"), 2);
        assert_eq!(DistanceMethod::OptimalStringAlignment.distance("acme", "amce"), 1);
    }

    #[test]
    fn distances_count_characters_not_bytes() {
        assert_eq!(DistanceMethod::Levenshtein.distance("café", "cafe"), 1);
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&DistanceMethod::OptimalStringAlignment).unwrap();
        assert_eq!(json, "\"optimal_string_alignment\"");
        assert_eq!(DistanceMethod::default().to_string(), "levenshtein");
    }
}
