//! PubMed abstract lookup: a rate-limited E-utilities client and the row
//! enrichment pass that attaches publication metadata to flattened rows.

mod client;
mod enrich;

pub use client::PubMedClient;
pub use enrich::{enrich_rows, EnrichmentSummary};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Publication metadata for one PubMed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbstractRecord {
    /// Identifier in CURIE form, e.g. `PMID:31345061`.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(rename = "publicationDate", default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<NaiveDate>,
    #[serde(rename = "abstractText", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
}
