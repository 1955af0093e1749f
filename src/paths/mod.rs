//! Path analysis: multi-hop path discovery between a query subject and
//! object over a flattened row subset, plus node-participation statistics
//! with bottleneck detection.

mod adjacency;
mod participation;
mod search;

pub use adjacency::{build_adjacency, AdjacencyEdge, AdjacencyList};
pub use participation::analyze_participation;
pub use search::find_paths;

use serde::{Deserialize, Serialize};

use crate::flatten::FlattenedRow;

/// Maximum number of hops in a discovered path.
pub const MAX_HOPS: usize = 4;

/// A node participating in more than this fraction of all discovered paths
/// is flagged as a bottleneck. Fixed design choice, not derived from data.
pub const BOTTLENECK_THRESHOLD: f64 = 0.5;

/// One hop in a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub from: String,
    pub predicate: String,
    pub to: String,
    pub source: String,
    pub publications: Vec<String>,
    pub clinical_trials: Vec<String>,
}

/// An ordered sequence of 1 to [`MAX_HOPS`] steps from subject to object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub steps: Vec<PathStep>,
}

impl Path {
    pub fn hop_count(&self) -> usize {
        self.steps.len()
    }

    /// Ordered unique node names along the path.
    pub fn node_sequence(&self) -> Vec<String> {
        let mut seq = Vec::new();
        if let Some(first) = self.steps.first() {
            seq.push(first.from.clone());
        }
        for step in &self.steps {
            if !seq.contains(&step.to) {
                seq.push(step.to.clone());
            }
        }
        seq
    }

    /// Stable comparison key used to impose deterministic path ordering.
    pub(crate) fn signature(&self) -> String {
        self.steps
            .iter()
            .map(|s| format!("{}|{}|{}", s.from, s.predicate, s.to))
            .collect::<Vec<_>>()
            .join(">")
    }
}

/// The role a node plays within one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathRole {
    Start,
    End,
    Intermediate,
}

/// Per-node participation across all discovered paths. Roles accumulate
/// per path, so a node can hold several distinct roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeParticipation {
    pub node: String,
    pub count: usize,
    pub path_indices: Vec<usize>,
    pub roles: Vec<PathRole>,
    pub is_bottleneck: bool,
}

/// Full path-analysis output for one subject/object pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathAnalysis {
    pub subject: String,
    pub object: String,
    pub paths: Vec<Path>,
    /// Sorted by participation count descending, node name ascending.
    pub participation: Vec<NodeParticipation>,
    /// True when the search stopped at the path cap.
    pub truncated: bool,
}

/// Analyze all 1–4 hop paths between subject and object over a row subset
/// restricted to a single result-subject.
///
/// `max_paths` bounds the total number of discovered paths; hitting the cap
/// marks the analysis truncated (multi-edges make path counts combinatorial
/// on dense subgraphs).
pub fn analyze_paths(
    rows: &[FlattenedRow],
    subject_name: &str,
    object_name: &str,
    max_paths: usize,
) -> PathAnalysis {
    let adjacency = build_adjacency(rows);
    let outcome = find_paths(&adjacency, subject_name, object_name, max_paths);
    if outcome.truncated {
        log::warn!(
            "Path search between {} and {} hit the {} path cap; results truncated",
            subject_name,
            object_name,
            max_paths
        );
    }
    let participation = analyze_participation(&outcome.paths);
    log::debug!(
        "Path analysis {} -> {}: {} paths, {} participating nodes",
        subject_name,
        object_name,
        outcome.paths.len(),
        participation.len()
    );
    PathAnalysis {
        subject: subject_name.to_string(),
        object: object_name.to_string(),
        paths: outcome.paths,
        participation,
        truncated: outcome.truncated,
    }
}
