//! Duplicate clustering over a built index.
//!
//! [`ClusterMode::Greedy`] is a single sweep in row order: each unvisited
//! indexable row claims every unvisited row the index returns for it. A row
//! belongs to the first cluster that claims it, so results depend on row
//! order. [`ClusterMode::Transitive`] instead joins every pair of LSH hits
//! and reports the connected components; it produces different clusters and
//! is only used when asked for.
//!
//! Either way a candidate cluster is kept only when its members are not all
//! the same text after case folding.

use index::LshIndex;
use matcher::{has_textual_variation, DistanceFn};
use minhash::RowSignature;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AkinError;
use crate::group::Cluster;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterMode {
    #[default]
    Greedy,
    Transitive,
}

/// Inputs shared by both clustering modes.
pub struct ClusterInput<'a> {
    pub index: &'a LshIndex,
    pub signatures: &'a [RowSignature],
    /// Field value of every row, indexed like `signatures`.
    pub values: &'a [&'a str],
    /// Used by the admission check.
    pub distance: DistanceFn,
    pub case_sensitive: bool,
}

/// Cluster the rows of `input`. Members of each cluster are ascending.
pub fn cluster(mode: ClusterMode, input: &ClusterInput<'_>) -> Result<Vec<Cluster>, AkinError> {
    if input.values.len() != input.signatures.len() {
        return Err(AkinError::Pipeline(format!(
            "{} values for {} signatures",
            input.values.len(),
            input.signatures.len()
        )));
    }
    let candidates = match mode {
        ClusterMode::Greedy => greedy(input)?,
        ClusterMode::Transitive => transitive(input)?,
    };
    let found = candidates.len();
    let admitted: Vec<Cluster> = candidates
        .into_iter()
        .filter(|members| admit(input, members))
        .collect();
    debug!(
        ?mode,
        candidates = found,
        admitted = admitted.len(),
        "clustered rows"
    );
    Ok(admitted)
}

fn greedy(input: &ClusterInput<'_>) -> Result<Vec<Cluster>, AkinError> {
    let mut visited = vec![false; input.signatures.len()];
    let mut clusters = Vec::new();

    for (row, sig) in input.signatures.iter().enumerate() {
        if visited[row] || !sig.is_indexable() {
            continue;
        }
        let mut members = Vec::new();
        for candidate in input.index.query(&sig.signature)? {
            if let Some(seen) = visited.get_mut(candidate) {
                if !*seen {
                    *seen = true;
                    members.push(candidate);
                }
            }
        }
        if members.len() > 1 {
            clusters.push(members);
        }
    }
    Ok(clusters)
}

fn transitive(input: &ClusterInput<'_>) -> Result<Vec<Cluster>, AkinError> {
    let n = input.signatures.len();
    let mut sets = DisjointSets::new(n);
    for (row, sig) in input.signatures.iter().enumerate() {
        if !sig.is_indexable() {
            continue;
        }
        for candidate in input.index.query(&sig.signature)? {
            if candidate < n {
                sets.union(row, candidate);
            }
        }
    }

    // Components in order of their smallest row.
    let mut by_root: Vec<Option<usize>> = vec![None; n];
    let mut clusters: Vec<Cluster> = Vec::new();
    for row in 0..n {
        if !input.signatures[row].is_indexable() {
            continue;
        }
        let root = sets.find(row);
        match by_root[root] {
            Some(slot) => clusters[slot].push(row),
            None => {
                by_root[root] = Some(clusters.len());
                clusters.push(vec![row]);
            }
        }
    }
    clusters.retain(|members| members.len() > 1);
    Ok(clusters)
}

fn admit(input: &ClusterInput<'_>, members: &[usize]) -> bool {
    let values: Vec<&str> = members.iter().map(|&row| input.values[row]).collect();
    has_textual_variation(&values, input.distance, input.case_sensitive)
}

/// Union-find with path compression and union by rank.
struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}
