//! Message payload model and response unwrapping.
//!
//! Upstream responses vary in shape: the message may sit directly under a
//! `message` field, arrive as a JSON-encoded string, or come as an array of
//! candidate envelopes. Locating it is the only fatal step in flattening.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{KgflatError, Result};

/// A node in the shared node table, keyed externally by CURIE.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Node {
    pub name: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Provenance entry on an edge. `primary_knowledge_source` identifies the
/// source used for display.
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeSource {
    #[serde(alias = "role")]
    pub resource_role: Option<String>,
    #[serde(alias = "resource")]
    pub resource_id: Option<String>,
}

/// A `{type_id, value}` attribute; values are loosely typed.
#[derive(Debug, Clone, Deserialize)]
pub struct Attribute {
    #[serde(alias = "type_id")]
    pub attribute_type_id: String,
    #[serde(default)]
    pub value: Value,
}

/// An edge in the shared edge table, keyed externally by an opaque id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub object: String,
    pub predicate: Option<String>,
    #[serde(default)]
    pub sources: Vec<EdgeSource>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// A bundle of edge ids providing indirect support for a primary edge.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuxiliaryGraph {
    #[serde(default)]
    pub edges: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default)]
    pub nodes: HashMap<String, Node>,
    #[serde(default)]
    pub edges: HashMap<String, Edge>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeBinding {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EdgeBinding {
    #[serde(default)]
    pub id: String,
}

/// One analysis within a result; maps role keys to bound edge ids.
/// BTreeMap keeps key iteration deterministic.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub edge_bindings: BTreeMap<String, Vec<EdgeBinding>>,
}

/// One candidate answer to the query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultEntry {
    #[serde(default)]
    pub node_bindings: BTreeMap<String, Vec<NodeBinding>>,
    #[serde(default)]
    pub analyses: Vec<Analysis>,
}

/// The unwrapped message payload: results plus the shared tables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub results: Vec<ResultEntry>,
    #[serde(default)]
    pub knowledge_graph: KnowledgeGraph,
    #[serde(default)]
    pub auxiliary_graphs: HashMap<String, AuxiliaryGraph>,
}

/// Locate the message payload inside a raw response.
///
/// Strategies, in order:
/// 1. `message` field holding an object.
/// 2. `message` field holding a JSON-encoded string (parsed here).
/// 3. `message` field or the response itself being an array of candidate
///    envelopes: the first element with a non-empty `results` list wins,
///    falling back to the first element.
/// 4. The response itself already being a message (has `results` or
///    `knowledge_graph`).
///
/// Anything else is a `MalformedResponse` — the only fatal condition
/// in flattening.
pub fn locate_message(raw: &Value) -> Result<Value> {
    if let Some(msg) = raw.get("message") {
        match msg {
            Value::Object(_) => return Ok(msg.clone()),
            Value::String(encoded) => {
                return serde_json::from_str(encoded).map_err(|e| {
                    KgflatError::MalformedResponse(format!(
                        "message field is a string but not valid JSON: {}",
                        e
                    ))
                });
            }
            Value::Array(candidates) => return pick_candidate(candidates),
            _ => {
                return Err(KgflatError::MalformedResponse(format!(
                    "message field has unsupported type: {}",
                    type_name(msg)
                )))
            }
        }
    }

    if let Some(candidates) = raw.as_array() {
        return pick_candidate(candidates);
    }

    if raw.get("results").is_some() || raw.get("knowledge_graph").is_some() {
        return Ok(raw.clone());
    }

    Err(KgflatError::MalformedResponse(
        "no message payload located by any unwrap strategy".to_string(),
    ))
}

/// Locate and deserialize the message in one step.
pub fn parse_message(raw: &Value) -> Result<Message> {
    let located = locate_message(raw)?;
    serde_json::from_value(located)
        .map_err(|e| KgflatError::Parse(format!("message payload does not deserialize: {}", e)))
}

/// First candidate with non-empty results, else first candidate.
fn pick_candidate(candidates: &[Value]) -> Result<Value> {
    if candidates.is_empty() {
        return Err(KgflatError::MalformedResponse(
            "candidate message array is empty".to_string(),
        ));
    }
    let chosen = candidates
        .iter()
        .find(|c| has_nonempty_results(c))
        .unwrap_or(&candidates[0]);
    // Candidates may themselves be envelopes around a message field
    match chosen.get("message") {
        Some(inner) if inner.is_object() => Ok(inner.clone()),
        _ => Ok(chosen.clone()),
    }
}

fn has_nonempty_results(candidate: &Value) -> bool {
    let message = candidate.get("message").unwrap_or(candidate);
    message
        .get("results")
        .and_then(Value::as_array)
        .map(|r| !r.is_empty())
        .unwrap_or(false)
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
