//! The flattening walk: results → analyses → edge bindings → edges, plus
//! support-graph expansion.

use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Result;

use super::attributes::EdgeAttributes;
use super::bindings::{display_name, resolve_result_bindings, ResolvedEntity};
use super::message::{self, Edge, Message, ResultEntry};
use super::predicate::clean_predicate;
use super::{EdgeType, FlattenMetadata, FlattenedRow, NA, UNKNOWN};

/// Rows plus processing metadata.
#[derive(Debug, Clone)]
pub struct FlattenOutput {
    pub rows: Vec<FlattenedRow>,
    pub metadata: FlattenMetadata,
}

struct FlattenContext<'a> {
    pk: &'a str,
    environment: &'a str,
    message: &'a Message,
    trial_regex: Regex,
}

/// Flatten a raw response into one row per (result × edge) pair.
///
/// Support edges recovered from auxiliary graphs contribute their own rows,
/// so the total row count is primary rows plus all resolvable support rows.
/// Unresolvable edge references are skipped with a warning and counted in
/// the metadata; a missing message payload is the only fatal condition.
pub fn flatten(raw: &Value, pk: &str, environment: &str) -> Result<FlattenOutput> {
    let message = message::parse_message(raw)?;

    let ctx = FlattenContext {
        pk,
        environment,
        message: &message,
        trial_regex: Regex::new(r"(?i)NCT[0-9]+").expect("Invalid regex pattern"),
    };

    let mut rows = Vec::new();
    let mut unresolved_refs = 0usize;

    for result in &message.results {
        flatten_result(&ctx, result, &mut rows, &mut unresolved_refs);
    }

    let primary_row_count = rows
        .iter()
        .filter(|r| r.edge_type == EdgeType::Primary)
        .count();

    let metadata = FlattenMetadata {
        pk: pk.to_string(),
        environment: environment.to_string(),
        result_count: message.results.len(),
        node_count: message.knowledge_graph.nodes.len(),
        edge_count: message.knowledge_graph.edges.len(),
        aux_graph_count: message.auxiliary_graphs.len(),
        row_count: rows.len(),
        primary_row_count,
        support_row_count: rows.len() - primary_row_count,
        unresolved_refs,
        response_fingerprint: fingerprint(raw),
        processed_at: Utc::now(),
    };

    log::info!(
        "Flattened pk={}: {} results, {} rows ({} primary, {} support), {} unresolved refs",
        pk,
        metadata.result_count,
        metadata.row_count,
        metadata.primary_row_count,
        metadata.support_row_count,
        metadata.unresolved_refs
    );

    Ok(FlattenOutput { rows, metadata })
}

/// Flatten one result into the shared accumulator.
fn flatten_result(
    ctx: &FlattenContext,
    result: &ResultEntry,
    rows: &mut Vec<FlattenedRow>,
    unresolved_refs: &mut usize,
) {
    let (subject, object) =
        resolve_result_bindings(&result.node_bindings, &ctx.message.knowledge_graph.nodes);

    for analysis in &result.analyses {
        for (binding_key, edge_bindings) in &analysis.edge_bindings {
            for binding in edge_bindings {
                match ctx.message.knowledge_graph.edges.get(&binding.id) {
                    Some(edge) => {
                        rows.push(build_row(
                            ctx,
                            &subject,
                            &object,
                            &binding.id,
                            edge,
                            EdgeType::Primary,
                            None,
                        ));
                        expand_support_graphs(ctx, &subject, &object, edge, rows, unresolved_refs);
                    }
                    None => {
                        log::warn!(
                            "Edge binding {} (key {}) not in the edge table, skipping",
                            binding.id,
                            binding_key
                        );
                        *unresolved_refs += 1;
                    }
                }
            }
        }
    }
}

/// Expand a primary edge's support graphs into additional rows.
fn expand_support_graphs(
    ctx: &FlattenContext,
    subject: &ResolvedEntity,
    object: &ResolvedEntity,
    primary_edge: &Edge,
    rows: &mut Vec<FlattenedRow>,
    unresolved_refs: &mut usize,
) {
    let attrs = EdgeAttributes::from_attributes(&primary_edge.attributes);
    for graph_id in &attrs.support_graphs {
        let Some(aux_graph) = ctx.message.auxiliary_graphs.get(graph_id) else {
            log::warn!("Auxiliary graph {} not in the response, skipping", graph_id);
            *unresolved_refs += 1;
            continue;
        };
        for support_edge_id in &aux_graph.edges {
            match ctx.message.knowledge_graph.edges.get(support_edge_id) {
                Some(edge) => {
                    rows.push(build_row(
                        ctx,
                        subject,
                        object,
                        support_edge_id,
                        edge,
                        EdgeType::Support,
                        Some(graph_id.clone()),
                    ));
                }
                None => {
                    log::warn!(
                        "Support edge {} in auxiliary graph {} not in the edge table, skipping",
                        support_edge_id,
                        graph_id
                    );
                    *unresolved_refs += 1;
                }
            }
        }
    }
}

/// Build one row from a result's resolved entities and one edge.
fn build_row(
    ctx: &FlattenContext,
    subject: &ResolvedEntity,
    object: &ResolvedEntity,
    edge_id: &str,
    edge: &Edge,
    edge_type: EdgeType,
    support_graph_id: Option<String>,
) -> FlattenedRow {
    // None when the node id isn't in the table; displayed as "Unknown"
    let edge_subject_name = lookup_name(ctx, &edge.subject);
    let edge_object_name = lookup_name(ctx, &edge.object);

    let cleaned_predicate = edge
        .predicate
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(clean_predicate);

    let phrase = make_phrase(
        edge_subject_name.as_deref(),
        cleaned_predicate.as_deref(),
        edge_object_name.as_deref(),
    );

    let primary_source = edge
        .sources
        .iter()
        .find(|s| s.resource_role.as_deref() == Some("primary_knowledge_source"))
        .and_then(|s| s.resource_id.clone())
        .unwrap_or_else(|| NA.to_string());

    let attrs = EdgeAttributes::from_attributes(&edge.attributes);
    let publications_count = attrs.publications.len();
    let publications = if attrs.publications.is_empty() {
        NA.to_string()
    } else {
        attrs.publications.join(";")
    };
    let clinical_trials = extract_clinical_trials(&ctx.trial_regex, &attrs.publications);

    FlattenedRow {
        pk: ctx.pk.to_string(),
        environment: ctx.environment.to_string(),
        result_subject_id: subject.id.clone(),
        result_subject_name: subject.name.clone(),
        result_object_id: object.id.clone(),
        result_object_name: object.name.clone(),
        edge_id: edge_id.to_string(),
        edge_subject_id: edge.subject.clone(),
        edge_subject_name: edge_subject_name.unwrap_or_else(|| UNKNOWN.to_string()),
        edge_object_id: edge.object.clone(),
        edge_object_name: edge_object_name.unwrap_or_else(|| UNKNOWN.to_string()),
        predicate: cleaned_predicate.unwrap_or_else(|| NA.to_string()),
        phrase,
        primary_source,
        publications,
        publications_count,
        clinical_trials,
        edge_type,
        support_graph_id,
        abstracts: Vec::new(),
        abstract_count: 0,
    }
}

/// Node display name, or None when the id is absent from the node table.
fn lookup_name(ctx: &FlattenContext, node_id: &str) -> Option<String> {
    if node_id.is_empty() {
        return None;
    }
    let nodes = &ctx.message.knowledge_graph.nodes;
    if nodes.contains_key(node_id) {
        Some(display_name(nodes, node_id))
    } else {
        None
    }
}

/// "{subject} {predicate} {object}", or "N/A" when any component is missing.
/// Never a partially-formed string.
fn make_phrase(subject: Option<&str>, predicate: Option<&str>, object: Option<&str>) -> String {
    match (subject, predicate, object) {
        (Some(s), Some(p), Some(o)) if !s.is_empty() && !p.is_empty() && !o.is_empty() => {
            format!("{} {} {}", s, p, o)
        }
        _ => NA.to_string(),
    }
}

/// Clinical-trial registry ids among the publication entries, normalized
/// to their bare uppercase NCT form. Entries stay in the publication list.
fn extract_clinical_trials(trial_regex: &Regex, publications: &[String]) -> Vec<String> {
    let mut trials = Vec::new();
    for entry in publications {
        if let Some(m) = trial_regex.find(entry) {
            let id = m.as_str().to_uppercase();
            if !trials.contains(&id) {
                trials.push(id);
            }
        }
    }
    trials
}

fn fingerprint(raw: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Response with 1 result {sn: X, on: Y} and 1 edge X→Y (biolink:treats).
    fn scenario_response(edge_extra: Value, aux_graphs: Value) -> Value {
        let mut edge = json!({
            "subject": "CHEBI:X",
            "object": "MONDO:Y",
            "predicate": "biolink:treats",
            "sources": [
                {"resource_role": "aggregator_knowledge_source", "resource_id": "infores:agg"},
                {"resource_role": "primary_knowledge_source", "resource_id": "infores:ctd"}
            ],
            "attributes": []
        });
        if let Some(extra) = edge_extra.as_object() {
            for (k, v) in extra {
                edge[k] = v.clone();
            }
        }
        json!({"message": {
            "results": [{
                "node_bindings": {"sn": [{"id": "CHEBI:X"}], "on": [{"id": "MONDO:Y"}]},
                "analyses": [{"edge_bindings": {"e": [{"id": "e1"}]}}]
            }],
            "knowledge_graph": {
                "nodes": {
                    "CHEBI:X": {"name": "X", "categories": ["biolink:SmallMolecule"]},
                    "MONDO:Y": {"name": "Y", "categories": ["biolink:Disease"]},
                    "NCBIGene:A": {"name": "A"},
                    "NCBIGene:B": {"name": "B"}
                },
                "edges": {
                    "e1": edge,
                    "e2": {
                        "subject": "NCBIGene:A",
                        "object": "NCBIGene:B",
                        "predicate": "biolink:affects",
                        "sources": [],
                        "attributes": []
                    }
                }
            },
            "auxiliary_graphs": aux_graphs
        }})
    }

    #[test]
    fn test_scenario_a_single_primary_row() {
        let raw = scenario_response(json!({}), json!({}));
        let output = flatten(&raw, "pk1", "test").unwrap();
        assert_eq!(output.rows.len(), 1);
        let row = &output.rows[0];
        assert_eq!(row.phrase, "X treats Y");
        assert_eq!(row.edge_type, EdgeType::Primary);
        assert_eq!(row.result_subject_name, "X");
        assert_eq!(row.result_object_name, "Y");
        assert_eq!(row.primary_source, "infores:ctd");
        assert_eq!(output.metadata.row_count, 1);
        assert_eq!(output.metadata.unresolved_refs, 0);
    }

    #[test]
    fn test_scenario_b_support_graph_expansion() {
        let raw = scenario_response(
            json!({"attributes": [{"attribute_type_id": "biolink:support_graphs", "value": ["g1"]}]}),
            json!({"g1": {"edges": ["e2"]}}),
        );
        let output = flatten(&raw, "pk1", "test").unwrap();
        assert_eq!(output.rows.len(), 2);
        assert_eq!(output.rows[0].edge_type, EdgeType::Primary);
        let support = &output.rows[1];
        assert_eq!(support.edge_type, EdgeType::Support);
        assert_eq!(support.support_graph_id.as_deref(), Some("g1"));
        assert_eq!(support.phrase, "A affects B");
        assert_eq!(output.metadata.primary_row_count, 1);
        assert_eq!(output.metadata.support_row_count, 1);
    }

    #[test]
    fn test_scenario_c_publications() {
        let raw = scenario_response(
            json!({"attributes": [{"attribute_type_id": "biolink:publications", "value": ["PMID:1", "PMID:2"]}]}),
            json!({}),
        );
        let output = flatten(&raw, "pk1", "test").unwrap();
        let row = &output.rows[0];
        assert_eq!(row.publications, "PMID:1;PMID:2");
        assert_eq!(row.publications_count, 2);

        let bare = scenario_response(json!({}), json!({}));
        let output = flatten(&bare, "pk1", "test").unwrap();
        assert_eq!(output.rows[0].publications, "N/A");
        assert_eq!(output.rows[0].publications_count, 0);
    }

    #[test]
    fn test_unresolved_edge_binding_skipped_and_counted() {
        let mut raw = scenario_response(json!({}), json!({}));
        raw["message"]["results"][0]["analyses"][0]["edge_bindings"]["e"] =
            json!([{"id": "e1"}, {"id": "missing_edge"}]);
        let output = flatten(&raw, "pk1", "test").unwrap();
        assert_eq!(output.rows.len(), 1);
        assert_eq!(output.metadata.unresolved_refs, 1);
    }

    #[test]
    fn test_unresolved_support_edge_counted() {
        let raw = scenario_response(
            json!({"attributes": [{"attribute_type_id": "biolink:support_graphs", "value": ["g1"]}]}),
            json!({"g1": {"edges": ["e2", "ghost"]}}),
        );
        let output = flatten(&raw, "pk1", "test").unwrap();
        // primary + one resolvable support row; the ghost reference is skipped
        assert_eq!(output.rows.len(), 2);
        assert_eq!(output.metadata.unresolved_refs, 1);
    }

    #[test]
    fn test_missing_aux_graph_counted() {
        let raw = scenario_response(
            json!({"attributes": [{"attribute_type_id": "biolink:support_graphs", "value": ["gone"]}]}),
            json!({}),
        );
        let output = flatten(&raw, "pk1", "test").unwrap();
        assert_eq!(output.rows.len(), 1);
        assert_eq!(output.metadata.unresolved_refs, 1);
    }

    #[test]
    fn test_partial_bindings_emit_na_rows() {
        let mut raw = scenario_response(json!({}), json!({}));
        raw["message"]["results"][0]["node_bindings"] = json!({"weird_key": [{"id": "CHEBI:X"}]});
        let output = flatten(&raw, "pk1", "test").unwrap();
        assert_eq!(output.rows.len(), 1);
        let row = &output.rows[0];
        assert_eq!(row.result_subject_name, "N/A");
        assert_eq!(row.result_object_name, "N/A");
        // Edge-level data still resolves
        assert_eq!(row.phrase, "X treats Y");
    }

    #[test]
    fn test_phrase_sentinel_when_edge_node_unknown() {
        let mut raw = scenario_response(json!({}), json!({}));
        raw["message"]["knowledge_graph"]["edges"]["e1"]["subject"] = json!("CHEBI:unlisted");
        let output = flatten(&raw, "pk1", "test").unwrap();
        let row = &output.rows[0];
        assert_eq!(row.edge_subject_name, "Unknown");
        assert_eq!(row.phrase, "N/A");
    }

    #[test]
    fn test_phrase_sentinel_when_predicate_missing() {
        let mut raw = scenario_response(json!({}), json!({}));
        raw["message"]["knowledge_graph"]["edges"]["e1"]
            .as_object_mut()
            .unwrap()
            .remove("predicate");
        let output = flatten(&raw, "pk1", "test").unwrap();
        assert_eq!(output.rows[0].predicate, "N/A");
        assert_eq!(output.rows[0].phrase, "N/A");
    }

    #[test]
    fn test_clinical_trials_extracted_from_publications() {
        let raw = scenario_response(
            json!({"attributes": [{
                "attribute_type_id": "biolink:publications",
                "value": ["PMID:1", "clinicaltrials:NCT01234567"]
            }]}),
            json!({}),
        );
        let output = flatten(&raw, "pk1", "test").unwrap();
        let row = &output.rows[0];
        assert_eq!(row.clinical_trials, vec!["NCT01234567"]);
        // Trial entries stay in the publication list
        assert_eq!(row.publications_count, 2);
    }

    #[test]
    fn test_row_count_invariant_multiple_results() {
        // Two results over the same bound edge: each contributes its own row
        let mut raw = scenario_response(json!({}), json!({}));
        let result = raw["message"]["results"][0].clone();
        raw["message"]["results"].as_array_mut().unwrap().push(result);
        let output = flatten(&raw, "pk1", "test").unwrap();
        assert_eq!(output.rows.len(), 2);
        assert_eq!(output.metadata.result_count, 2);
    }

    #[test]
    fn test_malformed_response_is_fatal() {
        let raw = json!({"status": "error"});
        assert!(flatten(&raw, "pk1", "test").is_err());
    }

    #[test]
    fn test_metadata_counts_and_fingerprint() {
        let raw = scenario_response(json!({}), json!({}));
        let output = flatten(&raw, "pk9", "prod").unwrap();
        assert_eq!(output.metadata.pk, "pk9");
        assert_eq!(output.metadata.environment, "prod");
        assert_eq!(output.metadata.node_count, 4);
        assert_eq!(output.metadata.edge_count, 2);
        assert_eq!(output.metadata.response_fingerprint.len(), 64);

        // Same response, same fingerprint
        let again = flatten(&raw, "pk9", "prod").unwrap();
        assert_eq!(
            output.metadata.response_fingerprint,
            again.metadata.response_fingerprint
        );
    }
}
