//! Tagged lookup over an edge's loosely-typed attribute list.
//!
//! Attributes arrive as `[{type_id, value}]` with values that may be a
//! single string or a list. Known attribute types get typed accessors;
//! everything else lands in a pass-through bucket.

use serde_json::Value;

use super::message::Attribute;

/// Attribute carrying publication identifiers.
pub const ATTR_PUBLICATIONS: &str = "biolink:publications";
/// Attribute carrying auxiliary-graph identifiers that expand into
/// additional support edges.
pub const ATTR_SUPPORT_GRAPHS: &str = "biolink:support_graphs";

/// Typed view over one edge's attributes, built once per edge.
#[derive(Debug, Default)]
pub struct EdgeAttributes {
    pub publications: Vec<String>,
    pub support_graphs: Vec<String>,
    /// Attributes with no dedicated accessor, retained as-is.
    pub other: Vec<(String, Value)>,
}

impl EdgeAttributes {
    pub fn from_attributes(attributes: &[Attribute]) -> Self {
        let mut out = Self::default();
        for attr in attributes {
            match attr.attribute_type_id.as_str() {
                ATTR_PUBLICATIONS => {
                    out.publications.extend(value_as_string_list(&attr.value));
                }
                ATTR_SUPPORT_GRAPHS => {
                    out.support_graphs.extend(value_as_string_list(&attr.value));
                }
                _ => {
                    out.other
                        .push((attr.attribute_type_id.clone(), attr.value.clone()));
                }
            }
        }
        out
    }
}

/// Normalize an attribute value to a list of strings.
/// Single strings become one-element lists; numbers are stringified;
/// anything else contributes nothing.
fn value_as_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        Value::Number(n) => vec![n.to_string()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attr(type_id: &str, value: Value) -> Attribute {
        Attribute {
            attribute_type_id: type_id.to_string(),
            value,
        }
    }

    #[test]
    fn test_publications_list() {
        let attrs = vec![attr(ATTR_PUBLICATIONS, json!(["PMID:1", "PMID:2"]))];
        let parsed = EdgeAttributes::from_attributes(&attrs);
        assert_eq!(parsed.publications, vec!["PMID:1", "PMID:2"]);
        assert!(parsed.support_graphs.is_empty());
    }

    #[test]
    fn test_single_string_normalized_to_list() {
        let attrs = vec![attr(ATTR_PUBLICATIONS, json!("PMID:42"))];
        let parsed = EdgeAttributes::from_attributes(&attrs);
        assert_eq!(parsed.publications, vec!["PMID:42"]);
    }

    #[test]
    fn test_support_graphs() {
        let attrs = vec![attr(ATTR_SUPPORT_GRAPHS, json!(["g1", "g2"]))];
        let parsed = EdgeAttributes::from_attributes(&attrs);
        assert_eq!(parsed.support_graphs, vec!["g1", "g2"]);
    }

    #[test]
    fn test_unknown_attributes_pass_through() {
        let attrs = vec![
            attr("biolink:knowledge_level", json!("assertion")),
            attr(ATTR_PUBLICATIONS, json!(["PMID:1"])),
        ];
        let parsed = EdgeAttributes::from_attributes(&attrs);
        assert_eq!(parsed.other.len(), 1);
        assert_eq!(parsed.other[0].0, "biolink:knowledge_level");
    }

    #[test]
    fn test_numeric_entries_stringified() {
        let attrs = vec![attr(ATTR_PUBLICATIONS, json!([12345, "PMID:2"]))];
        let parsed = EdgeAttributes::from_attributes(&attrs);
        assert_eq!(parsed.publications, vec!["12345", "PMID:2"]);
    }

    #[test]
    fn test_null_and_object_values_yield_nothing() {
        let attrs = vec![
            attr(ATTR_PUBLICATIONS, json!(null)),
            attr(ATTR_SUPPORT_GRAPHS, json!({"not": "a list"})),
        ];
        let parsed = EdgeAttributes::from_attributes(&attrs);
        assert!(parsed.publications.is_empty());
        assert!(parsed.support_graphs.is_empty());
    }

    #[test]
    fn test_repeated_attribute_accumulates() {
        let attrs = vec![
            attr(ATTR_PUBLICATIONS, json!(["PMID:1"])),
            attr(ATTR_PUBLICATIONS, json!(["PMID:2"])),
        ];
        let parsed = EdgeAttributes::from_attributes(&attrs);
        assert_eq!(parsed.publications, vec!["PMID:1", "PMID:2"]);
    }
}
