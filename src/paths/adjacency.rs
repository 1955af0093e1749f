//! Adjacency construction from a flattened row subset.

use std::collections::HashMap;

use crate::flatten::{FlattenedRow, NA, UNKNOWN};

use super::PathStep;

/// One outgoing edge in the adjacency list. Parallel entries between the
/// same node pair are preserved: different predicates or sources are
/// semantically distinct claims.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyEdge {
    pub to: String,
    pub predicate: String,
    pub source: String,
    pub publications: Vec<String>,
    pub clinical_trials: Vec<String>,
}

impl AdjacencyEdge {
    pub(crate) fn to_step(&self, from: &str) -> PathStep {
        PathStep {
            from: from.to_string(),
            predicate: self.predicate.clone(),
            to: self.to.clone(),
            source: self.source.clone(),
            publications: self.publications.clone(),
            clinical_trials: self.clinical_trials.clone(),
        }
    }
}

/// Outgoing edges keyed by edge-subject node name.
pub type AdjacencyList = HashMap<String, Vec<AdjacencyEdge>>;

/// Build the adjacency list for path search.
///
/// Rows whose edge endpoints are sentinels carry no usable node name and
/// would alias unrelated nodes into one vertex; they are excluded.
pub fn build_adjacency(rows: &[FlattenedRow]) -> AdjacencyList {
    let mut adjacency: AdjacencyList = HashMap::new();
    for row in rows {
        if is_sentinel(&row.edge_subject_name) || is_sentinel(&row.edge_object_name) {
            log::debug!(
                "Excluding row for edge {} from path graph (sentinel endpoint)",
                row.edge_id
            );
            continue;
        }
        adjacency
            .entry(row.edge_subject_name.clone())
            .or_default()
            .push(AdjacencyEdge {
                to: row.edge_object_name.clone(),
                predicate: row.predicate.clone(),
                source: row.primary_source.clone(),
                publications: row.publication_ids(),
                clinical_trials: row.clinical_trials.clone(),
            });
    }
    adjacency
}

fn is_sentinel(name: &str) -> bool {
    name.is_empty() || name == NA || name == UNKNOWN
}
