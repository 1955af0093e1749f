//! Flat serialization of the row set to CSV and JSON.
//!
//! Field-for-field fidelity with the row schema; no additional invariants.

use crate::error::{KgflatError, Result};
use crate::flatten::FlattenedRow;

/// CSV column order. Nested abstracts are represented by their count only.
pub const CSV_COLUMNS: &[&str] = &[
    "pk",
    "environment",
    "result_subjectNode_id",
    "result_subjectNode_name",
    "result_objectNode_id",
    "result_objectNode_name",
    "edge_id",
    "edge_subjectNode_id",
    "edge_subjectNode_name",
    "edge_objectNode_id",
    "edge_objectNode_name",
    "predicate",
    "phrase",
    "primary_source",
    "publications",
    "publications_count",
    "clinical_trials",
    "edge_type",
    "support_graph_id",
    "abstract_count",
];

/// Serialize rows as CSV with a header line.
pub fn rows_to_csv(rows: &[FlattenedRow]) -> String {
    let mut out = String::new();
    out.push_str(&CSV_COLUMNS.join(","));
    out.push('\n');
    for row in rows {
        let fields = [
            row.pk.clone(),
            row.environment.clone(),
            row.result_subject_id.clone(),
            row.result_subject_name.clone(),
            row.result_object_id.clone(),
            row.result_object_name.clone(),
            row.edge_id.clone(),
            row.edge_subject_id.clone(),
            row.edge_subject_name.clone(),
            row.edge_object_id.clone(),
            row.edge_object_name.clone(),
            row.predicate.clone(),
            row.phrase.clone(),
            row.primary_source.clone(),
            row.publications.clone(),
            row.publications_count.to_string(),
            row.clinical_trials.join(";"),
            row.edge_type.as_str().to_string(),
            row.support_graph_id.clone().unwrap_or_default(),
            row.abstract_count.to_string(),
        ];
        let line: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

/// Serialize rows as pretty-printed JSON.
pub fn rows_to_json(rows: &[FlattenedRow]) -> Result<String> {
    serde_json::to_string_pretty(rows)
        .map_err(|e| KgflatError::Export(format!("JSON serialization failed: {}", e)))
}

/// Deserialize rows previously exported as JSON.
pub fn rows_from_json(json: &str) -> Result<Vec<FlattenedRow>> {
    serde_json::from_str(json)
        .map_err(|e| KgflatError::Export(format!("Rows JSON does not deserialize: {}", e)))
}

/// Quote a field when it contains a delimiter, quote, or newline.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
