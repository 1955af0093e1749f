//! Node-participation statistics over discovered paths.

use std::collections::HashMap;

use super::{NodeParticipation, Path, PathRole, BOTTLENECK_THRESHOLD};

/// Aggregate per-node participation across all paths.
///
/// For each path, every unique node increments its counter, records the
/// path index, and records the role it plays in that path. A node is a
/// bottleneck when it participates in strictly more than half of all
/// discovered paths. Output is sorted by count descending, then node name.
pub fn analyze_participation(paths: &[Path]) -> Vec<NodeParticipation> {
    let mut table: HashMap<String, NodeParticipation> = HashMap::new();

    for (index, path) in paths.iter().enumerate() {
        let nodes = path.node_sequence();
        let start = nodes.first().cloned();
        let terminal = path.steps.last().map(|s| s.to.clone());

        for node in &nodes {
            let entry = table
                .entry(node.clone())
                .or_insert_with(|| NodeParticipation {
                    node: node.clone(),
                    count: 0,
                    path_indices: Vec::new(),
                    roles: Vec::new(),
                    is_bottleneck: false,
                });
            entry.count += 1;
            entry.path_indices.push(index);

            let role = if start.as_deref() == Some(node.as_str()) {
                PathRole::Start
            } else if terminal.as_deref() == Some(node.as_str()) {
                PathRole::End
            } else {
                PathRole::Intermediate
            };
            if !entry.roles.contains(&role) {
                entry.roles.push(role);
            }
        }
    }

    let total = paths.len();
    let mut participation: Vec<NodeParticipation> = table.into_values().collect();
    for entry in &mut participation {
        entry.is_bottleneck =
            total > 0 && (entry.count as f64 / total as f64) > BOTTLENECK_THRESHOLD;
    }
    participation.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.node.cmp(&b.node)));
    participation
}
