//! Two-pass path search: direct connections, then breadth-first exploration
//! with per-path visited sets and a hop cap.

use std::collections::{HashSet, VecDeque};

use super::adjacency::AdjacencyList;
use super::{Path, PathStep, MAX_HOPS};

/// Discovered paths plus whether the search stopped at the path cap.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub paths: Vec<Path>,
    pub truncated: bool,
}

/// Find all distinct 1–4 hop paths from `start` to `end`.
///
/// Pass 1 emits every direct edge as a 1-step path. Pass 2 explores
/// breadth-first; each path carries its own visited set so a single path
/// never revisits a node, and 1-step arrivals at `end` are not re-emitted
/// (pass 1 owns those). `max_paths` bounds the total, since multi-edges
/// make path counts combinatorial on dense subgraphs.
///
/// Output is sorted by hop count, then lexicographically by step sequence,
/// so ordering is deterministic.
pub fn find_paths(
    adjacency: &AdjacencyList,
    start: &str,
    end: &str,
    max_paths: usize,
) -> SearchOutcome {
    let mut paths: Vec<Path> = Vec::new();
    let mut truncated = false;

    // Pass 1: direct connections
    if let Some(edges) = adjacency.get(start) {
        for edge in edges.iter().filter(|e| e.to == end) {
            if paths.len() >= max_paths {
                truncated = true;
                break;
            }
            paths.push(Path {
                steps: vec![edge.to_step(start)],
            });
        }
    }

    // Pass 2: breadth-first exploration
    let mut queue: VecDeque<(String, Vec<PathStep>, HashSet<String>)> = VecDeque::new();
    if !truncated {
        let mut visited = HashSet::new();
        visited.insert(start.to_string());
        queue.push_back((start.to_string(), Vec::new(), visited));
    }

    'frontier: while let Some((node, steps, visited)) = queue.pop_front() {
        if steps.len() >= MAX_HOPS {
            continue;
        }
        let Some(edges) = adjacency.get(&node) else {
            continue;
        };
        for edge in edges {
            if visited.contains(&edge.to) {
                continue;
            }
            let mut next_steps = steps.clone();
            next_steps.push(edge.to_step(&node));

            if edge.to == end {
                // The single direct edge was already captured in pass 1
                if next_steps.len() > 1 {
                    if paths.len() >= max_paths {
                        truncated = true;
                        break 'frontier;
                    }
                    paths.push(Path { steps: next_steps });
                }
                continue;
            }

            if next_steps.len() < MAX_HOPS {
                let mut next_visited = visited.clone();
                next_visited.insert(edge.to.clone());
                queue.push_back((edge.to.clone(), next_steps, next_visited));
            }
        }
    }

    paths.sort_by(|a, b| {
        a.steps
            .len()
            .cmp(&b.steps.len())
            .then_with(|| a.signature().cmp(&b.signature()))
    });

    SearchOutcome { paths, truncated }
}
