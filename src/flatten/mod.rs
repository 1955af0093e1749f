//! Graph flattening: walks a knowledge-graph response and emits one row per
//! (result × edge) pair, including rows recovered from auxiliary support graphs.
//!
//! The response's node/edge tables are read-only for the duration of
//! processing; rows are produced once and may later be enriched in place
//! with PubMed abstracts.

mod attributes;
mod bindings;
mod flattener;
mod message;
mod predicate;

pub use attributes::{EdgeAttributes, ATTR_PUBLICATIONS, ATTR_SUPPORT_GRAPHS};
pub use bindings::{classify_binding_key, resolve_result_bindings, BindingRole, ResolvedEntity};
pub use flattener::{flatten, FlattenOutput};
pub use message::{locate_message, parse_message, Edge, KnowledgeGraph, Message, Node};
pub use predicate::clean_predicate;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pubmed::AbstractRecord;

/// Sentinel for fields that could not be resolved from the response.
pub const NA: &str = "N/A";
/// Sentinel for node names whose id is bound but absent from the node table.
pub const UNKNOWN: &str = "Unknown";

/// How an edge entered the row set: bound directly to an analysis, or
/// recovered from an auxiliary support graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Primary,
    Support,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Primary => "primary",
            EdgeType::Support => "support",
        }
    }
}

/// One flattened (result × edge) pair.
///
/// Field names on the wire match what downstream consumers read
/// (`result_subjectNode_name` etc.); the Rust side stays snake_case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlattenedRow {
    pub pk: String,
    pub environment: String,
    #[serde(rename = "result_subjectNode_id")]
    pub result_subject_id: String,
    #[serde(rename = "result_subjectNode_name")]
    pub result_subject_name: String,
    #[serde(rename = "result_objectNode_id")]
    pub result_object_id: String,
    #[serde(rename = "result_objectNode_name")]
    pub result_object_name: String,
    pub edge_id: String,
    #[serde(rename = "edge_subjectNode_id")]
    pub edge_subject_id: String,
    #[serde(rename = "edge_subjectNode_name")]
    pub edge_subject_name: String,
    #[serde(rename = "edge_objectNode_id")]
    pub edge_object_id: String,
    #[serde(rename = "edge_objectNode_name")]
    pub edge_object_name: String,
    /// Cleaned predicate, or "N/A" when the edge carries none.
    pub predicate: String,
    /// "{subject} {predicate} {object}", or "N/A" if any component is missing.
    pub phrase: String,
    pub primary_source: String,
    /// Publication identifiers joined with `;`, or "N/A" when absent.
    pub publications: String,
    pub publications_count: usize,
    /// Clinical-trial registry identifiers found among the publications.
    #[serde(default)]
    pub clinical_trials: Vec<String>,
    pub edge_type: EdgeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_graph_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub abstracts: Vec<AbstractRecord>,
    #[serde(default)]
    pub abstract_count: usize,
}

impl FlattenedRow {
    /// Publication identifiers as a list (empty when the field is the sentinel).
    pub fn publication_ids(&self) -> Vec<String> {
        if self.publications == NA || self.publications.trim().is_empty() {
            return Vec::new();
        }
        self.publications
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Processing metadata emitted alongside the row set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlattenMetadata {
    pub pk: String,
    pub environment: String,
    pub result_count: usize,
    pub node_count: usize,
    pub edge_count: usize,
    pub aux_graph_count: usize,
    pub row_count: usize,
    pub primary_row_count: usize,
    pub support_row_count: usize,
    /// Edge/auxiliary-graph references that could not be resolved against the
    /// shared tables. Explains any gap between expected and actual row counts.
    pub unresolved_refs: usize,
    /// SHA-256 of the raw response, for correlating reprocessing runs.
    pub response_fingerprint: String,
    pub processed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_with_publications(publications: &str) -> FlattenedRow {
        FlattenedRow {
            pk: "pk".to_string(),
            environment: "test".to_string(),
            result_subject_id: "s".to_string(),
            result_subject_name: "S".to_string(),
            result_object_id: "o".to_string(),
            result_object_name: "O".to_string(),
            edge_id: "e1".to_string(),
            edge_subject_id: "s".to_string(),
            edge_subject_name: "S".to_string(),
            edge_object_id: "o".to_string(),
            edge_object_name: "O".to_string(),
            predicate: "treats".to_string(),
            phrase: "S treats O".to_string(),
            primary_source: "infores:test".to_string(),
            publications: publications.to_string(),
            publications_count: 0,
            clinical_trials: Vec::new(),
            edge_type: EdgeType::Primary,
            support_graph_id: None,
            abstracts: Vec::new(),
            abstract_count: 0,
        }
    }

    #[test]
    fn test_publication_ids_split() {
        let row = row_with_publications("PMID:1;PMID:2");
        assert_eq!(row.publication_ids(), vec!["PMID:1", "PMID:2"]);
    }

    #[test]
    fn test_publication_ids_sentinel() {
        let row = row_with_publications(NA);
        assert!(row.publication_ids().is_empty());
    }

    #[test]
    fn test_publication_ids_trims_blanks() {
        let row = row_with_publications("PMID:1; ;PMID:2;");
        assert_eq!(row.publication_ids(), vec!["PMID:1", "PMID:2"]);
    }

    #[test]
    fn test_edge_type_serializes_lowercase() {
        let json = serde_json::to_string(&EdgeType::Support).unwrap();
        assert_eq!(json, "\"support\"");
        assert_eq!(EdgeType::Primary.as_str(), "primary");
    }

    #[test]
    fn test_row_wire_field_names() {
        let row = row_with_publications("N/A");
        let value = serde_json::to_value(&row).unwrap();
        assert!(value.get("result_subjectNode_name").is_some());
        assert!(value.get("edge_objectNode_name").is_some());
        // Rust-side names must not leak onto the wire
        assert!(value.get("result_subject_name").is_none());
        // Empty abstracts are omitted entirely
        assert!(value.get("abstracts").is_none());
    }
}
