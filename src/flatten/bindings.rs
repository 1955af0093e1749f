//! Result subject/object resolution from node-binding keys.
//!
//! Binding keys are an externally-defined schema with several observed
//! conventions (`sn`/`on`, `subject_node`/`object_node`, positional
//! `n0`/`n1`). Resolution is a prioritized rule table evaluated in order,
//! rather than inline conditionals, so the priority order stays explicit
//! and testable.

use std::collections::{BTreeMap, HashMap};

use super::message::{Node, NodeBinding};
use super::NA;

/// The role a binding key assigns its bound node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingRole {
    Subject,
    Object,
}

enum KeyPattern {
    Exact(&'static [&'static str]),
    Contains(&'static [&'static str]),
}

struct RoleRule {
    pattern: KeyPattern,
    role: BindingRole,
}

impl RoleRule {
    fn matches(&self, key: &str) -> bool {
        match self.pattern {
            KeyPattern::Exact(names) => names.contains(&key),
            KeyPattern::Contains(fragments) => fragments.iter().any(|f| key.contains(f)),
        }
    }
}

/// Priority-ordered role rules. The first matching rule classifies a key;
/// note the positional convention binds `n0` to the *object* side.
const ROLE_RULES: &[RoleRule] = &[
    RoleRule {
        pattern: KeyPattern::Exact(&["on", "object_node"]),
        role: BindingRole::Object,
    },
    RoleRule {
        pattern: KeyPattern::Exact(&["sn", "subject_node"]),
        role: BindingRole::Subject,
    },
    RoleRule {
        pattern: KeyPattern::Exact(&["n0", "n00"]),
        role: BindingRole::Object,
    },
    RoleRule {
        pattern: KeyPattern::Exact(&["n1", "n01"]),
        role: BindingRole::Subject,
    },
    RoleRule {
        pattern: KeyPattern::Contains(&["0", "object"]),
        role: BindingRole::Object,
    },
    RoleRule {
        pattern: KeyPattern::Contains(&["1", "subject"]),
        role: BindingRole::Subject,
    },
];

/// Classify a node-binding key against the rule table.
pub fn classify_binding_key(key: &str) -> Option<BindingRole> {
    ROLE_RULES
        .iter()
        .find(|rule| rule.matches(key))
        .map(|rule| rule.role)
}

/// A resolved subject or object. Unresolved roles keep the "N/A" sentinel
/// so a result with incomplete bindings still contributes rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntity {
    pub id: String,
    pub name: String,
}

impl ResolvedEntity {
    fn sentinel() -> Self {
        Self {
            id: NA.to_string(),
            name: NA.to_string(),
        }
    }
}

/// Resolve a result's subject and object from its node bindings.
///
/// Keys are scanned in deterministic (sorted) order; the last-seen match
/// per role wins when multiple keys qualify. Bound ids missing from the
/// node table fall back to the id itself as display name.
pub fn resolve_result_bindings(
    node_bindings: &BTreeMap<String, Vec<NodeBinding>>,
    nodes: &HashMap<String, Node>,
) -> (ResolvedEntity, ResolvedEntity) {
    let mut subject = ResolvedEntity::sentinel();
    let mut object = ResolvedEntity::sentinel();

    for (key, bindings) in node_bindings {
        let Some(binding) = bindings.iter().find(|b| !b.id.is_empty()) else {
            continue;
        };
        let Some(role) = classify_binding_key(key) else {
            log::debug!("Node-binding key {} matches no role rule, ignoring", key);
            continue;
        };
        let resolved = ResolvedEntity {
            id: binding.id.clone(),
            name: display_name(nodes, &binding.id),
        };
        match role {
            BindingRole::Subject => subject = resolved,
            BindingRole::Object => object = resolved,
        }
    }

    (subject, object)
}

/// Display name for a node id: the node's name, else the id itself.
pub(crate) fn display_name(nodes: &HashMap<String, Node>, id: &str) -> String {
    match nodes.get(id).and_then(|n| n.name.as_deref()) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => id.to_string(),
    }
}
