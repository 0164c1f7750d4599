//! Named registry of string-distance functions.

use std::collections::BTreeMap;

use crate::types::{normalize_name, DistanceFn, DistanceMethod, MatchError};

/// Maps normalized names to distance functions.
///
/// [`DistanceRegistry::default`] holds every [`DistanceMethod`] under its
/// canonical name and aliases. Lookups never fall back to a default method.
#[derive(Debug, Clone)]
pub struct DistanceRegistry {
    entries: BTreeMap<String, DistanceFn>,
}

impl Default for DistanceRegistry {
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        for method in DistanceMethod::ALL {
            entries.insert(method.name().to_string(), method.function());
            for alias in method.aliases() {
                entries.insert((*alias).to_string(), method.function());
            }
        }
        Self { entries }
    }
}

impl DistanceRegistry {
    /// Registry with the built-in methods.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add `func` under `name`. Names are unique after normalization.
    pub fn register(&mut self, name: &str, func: DistanceFn) -> Result<(), MatchError> {
        let key = normalize_name(name);
        if key.is_empty() {
            return Err(MatchError::EmptyName);
        }
        if self.entries.contains_key(&key) {
            return Err(MatchError::DuplicateMethod {
                name: name.to_string(),
            });
        }
        self.entries.insert(key, func);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<DistanceFn, MatchError> {
        self.entries
            .get(&normalize_name(name))
            .copied()
            .ok_or_else(|| MatchError::UnknownDistanceMethod {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize_name(name))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Distance between `a` and `b` under the method called `name`.
    pub fn distance(&self, name: &str, a: &str, b: &str) -> Result<usize, MatchError> {
        Ok((self.resolve(name)?)(a, b))
    }
}
