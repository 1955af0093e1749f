//! Predicate cleaning: raw ontology predicate strings to readable phrases.

const BIOLINK_PREFIX: &str = "biolink:";

/// Clean a raw ontology predicate into a readable phrase.
///
/// Strips a leading `biolink:` namespace prefix, rewrites the
/// `treats_or_applied_or_studied_to_treat` compound predicate to its
/// display form, and otherwise replaces underscores with spaces.
/// Pure function, no state.
pub fn clean_predicate(raw: &str) -> String {
    let stripped = raw.strip_prefix(BIOLINK_PREFIX).unwrap_or(raw);
    if stripped == "treats_or_applied_or_studied_to_treat" {
        return "studied to treat".to_string();
    }
    stripped.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_biolink_prefix() {
        assert_eq!(clean_predicate("biolink:treats"), "treats");
    }

    #[test]
    fn test_replaces_underscores() {
        assert_eq!(
            clean_predicate("biolink:gene_associated_with_condition"),
            "gene associated with condition"
        );
    }

    #[test]
    fn test_special_case_rewrite() {
        assert_eq!(
            clean_predicate("biolink:treats_or_applied_or_studied_to_treat"),
            "studied to treat"
        );
        assert_eq!(
            clean_predicate("treats_or_applied_or_studied_to_treat"),
            "studied to treat"
        );
    }

    #[test]
    fn test_no_prefix_passthrough() {
        assert_eq!(clean_predicate("affects"), "affects");
    }

    #[test]
    fn test_idempotent_on_cleaned_output() {
        for raw in ["biolink:treats", "biolink:related_to", "affects risk of"] {
            let once = clean_predicate(raw);
            assert_eq!(clean_predicate(&once), once);
        }
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(clean_predicate(""), "");
    }
}
