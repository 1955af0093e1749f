use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::cache::AbstractCache;
use crate::config::PubMedConfig;
use crate::error::{KgflatError, Result};

use super::AbstractRecord;

// ---------------------------------------------------------------------------
// EFetch XML payload (db=pubmed, rettype=abstract, retmode=xml)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PubmedArticleSet {
    #[serde(rename = "PubmedArticle", default)]
    articles: Vec<PubmedArticleXml>,
}

#[derive(Debug, Deserialize)]
struct PubmedArticleXml {
    #[serde(rename = "MedlineCitation")]
    citation: MedlineCitationXml,
}

#[derive(Debug, Deserialize)]
struct MedlineCitationXml {
    #[serde(rename = "PMID")]
    pmid: PmidXml,
    #[serde(rename = "Article")]
    article: Option<ArticleXml>,
}

#[derive(Debug, Deserialize)]
struct PmidXml {
    #[serde(rename = "$text")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct ArticleXml {
    #[serde(rename = "ArticleTitle")]
    title: Option<TextXml>,
    #[serde(rename = "Journal")]
    journal: Option<JournalXml>,
    #[serde(rename = "Abstract")]
    abstract_node: Option<AbstractXml>,
}

#[derive(Debug, Deserialize)]
struct TextXml {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JournalXml {
    #[serde(rename = "Title")]
    title: Option<TextXml>,
    #[serde(rename = "JournalIssue")]
    issue: Option<JournalIssueXml>,
}

#[derive(Debug, Deserialize)]
struct JournalIssueXml {
    #[serde(rename = "PubDate")]
    pub_date: Option<PubDateXml>,
}

#[derive(Debug, Deserialize)]
struct PubDateXml {
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Month")]
    month: Option<String>,
    #[serde(rename = "Day")]
    day: Option<String>,
    /// Free-form fallback used for ranges, e.g. "1998 Dec-1999 Jan".
    #[serde(rename = "MedlineDate")]
    medline_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AbstractXml {
    #[serde(rename = "AbstractText", default)]
    sections: Vec<AbstractTextXml>,
}

#[derive(Debug, Deserialize)]
struct AbstractTextXml {
    #[serde(rename = "@Label")]
    label: Option<String>,
    #[serde(rename = "$text")]
    value: Option<String>,
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

/// Enforces a minimum delay between requests. Shared across all lookups on
/// one client, so parallel callers still respect the global ceiling.
struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until the minimum interval since the previous request has passed.
    /// The lock is held across the sleep so concurrent acquires serialize.
    async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// PubMed E-utilities client.
///
/// Handles batched abstract fetching with retry logic and a shared rate
/// limiter. Optionally caches fetched abstracts to reduce API calls.
pub struct PubMedClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    batch_size: usize,
    max_retries: usize,
    limiter: RateLimiter,
    cache: Option<Arc<AbstractCache>>,
}

impl PubMedClient {
    /// Create a new client from configuration. The API key is optional;
    /// NCBI applies a lower request ceiling without one.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should not happen in
    /// normal operation)
    pub fn new(config: &PubMedConfig, api_key: Option<String>) -> Self {
        Self::new_with_cache(config, api_key, None)
    }

    /// Create a new client with an abstract cache.
    pub fn new_with_cache(
        config: &PubMedConfig,
        api_key: Option<String>,
        cache: Option<Arc<AbstractCache>>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
            limiter: RateLimiter::new(Duration::from_millis(config.min_interval_ms)),
            cache,
        }
    }

    /// Fetch abstract metadata for a list of publication identifiers.
    ///
    /// Only PubMed identifiers (`PMID:` CURIEs or bare numeric ids) are
    /// fetchable; anything else is skipped. Lookups run in batches of
    /// `batch_size`, each gated by the shared rate limiter.
    pub async fn fetch_abstracts(&self, ids: &[String]) -> Result<Vec<AbstractRecord>> {
        let pmids = normalize_pmids(ids);
        if pmids.is_empty() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let mut to_fetch = Vec::new();
        for pmid in &pmids {
            match self.cache.as_ref().and_then(|c| c.get(pmid)) {
                Some(cached) => {
                    log::debug!("Cache hit for PMID:{}", pmid);
                    records.push(cached);
                }
                None => to_fetch.push(pmid.clone()),
            }
        }

        for chunk in to_fetch.chunks(self.batch_size) {
            let fetched = self.efetch_with_retry(chunk).await?;
            if let Some(cache) = &self.cache {
                for record in &fetched {
                    if let Some(pmid) = record.id.strip_prefix("PMID:") {
                        cache.put(pmid.to_string(), record.clone());
                    }
                }
            }
            records.extend(fetched);
        }

        Ok(records)
    }

    /// Fetch abstracts and keep only the `limit` most recent by
    /// publication date.
    pub async fn fetch_top_recent(
        &self,
        ids: &[String],
        limit: usize,
    ) -> Result<Vec<AbstractRecord>> {
        let mut records = self.fetch_abstracts(ids).await?;
        sort_most_recent(&mut records);
        records.truncate(limit);
        Ok(records)
    }

    /// One EFetch call with retry on rate-limit and server errors.
    async fn efetch_with_retry(&self, pmids: &[String]) -> Result<Vec<AbstractRecord>> {
        let start = std::time::Instant::now();
        let mut attempt = 0;
        let mut delay = Duration::from_secs(1);

        loop {
            self.limiter.acquire().await;
            match self.efetch_once(pmids).await {
                Ok(records) => {
                    log::debug!(
                        "EFetch for {} ids took {:?} (attempt {})",
                        pmids.len(),
                        start.elapsed(),
                        attempt + 1
                    );
                    return Ok(records);
                }
                Err(e) if attempt < self.max_retries => {
                    // Retryable: 429 rate limit or 5xx server error
                    let should_retry = e.to_string().contains("429")
                        || e.to_string().contains("500")
                        || e.to_string().contains("502")
                        || e.to_string().contains("503")
                        || e.to_string().contains("504");

                    if should_retry {
                        log::warn!("Retry {}/{} after error: {}", attempt + 1, self.max_retries, e);
                        tokio::time::sleep(delay).await;
                        delay *= 2; // Exponential backoff
                        attempt += 1;
                    } else {
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn efetch_once(&self, pmids: &[String]) -> Result<Vec<AbstractRecord>> {
        let mut url = Url::parse(&format!("{}/efetch.fcgi", self.base_url))
            .map_err(|e| KgflatError::PubMed(format!("Invalid E-utilities URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("db", "pubmed")
            .append_pair("id", &pmids.join(","))
            .append_pair("rettype", "abstract")
            .append_pair("retmode", "xml");
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("api_key", key);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| KgflatError::PubMed(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(KgflatError::PubMed(format!(
                "EFetch error {}: {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| KgflatError::PubMed(format!("Failed to read response: {}", e)))?;

        parse_efetch_response(&body)
    }
}

/// Filter identifiers down to unique bare PMIDs.
/// Accepts `PMID:` CURIEs and bare numeric ids; everything else is skipped.
pub(crate) fn normalize_pmids(ids: &[String]) -> Vec<String> {
    let mut pmids: Vec<String> = Vec::new();
    for id in ids {
        let id = id.trim();
        let candidate = match id.strip_prefix("PMID:") {
            Some(rest) => rest.trim(),
            None => id,
        };
        if candidate.is_empty() || !candidate.chars().all(|c| c.is_ascii_digit()) {
            log::debug!("Skipping non-PubMed identifier {}", id);
            continue;
        }
        if !pmids.iter().any(|p| p == candidate) {
            pmids.push(candidate.to_string());
        }
    }
    pmids
}

/// Parse an EFetch XML payload into abstract records.
pub(crate) fn parse_efetch_response(xml: &str) -> Result<Vec<AbstractRecord>> {
    let set: PubmedArticleSet = quick_xml::de::from_str(xml)
        .map_err(|e| KgflatError::Parse(format!("EFetch XML: {}", e)))?;
    Ok(set.articles.into_iter().map(article_to_record).collect())
}

/// Newest publication first; records without a date sort last.
pub(crate) fn sort_most_recent(records: &mut [AbstractRecord]) {
    records.sort_by(|a, b| b.publication_date.cmp(&a.publication_date));
}

fn article_to_record(article: PubmedArticleXml) -> AbstractRecord {
    let citation = article.citation;
    let pmid = citation.pmid.value.trim().to_string();
    let article = citation.article;

    let title = article
        .as_ref()
        .and_then(|a| a.title.as_ref())
        .and_then(|t| t.value.clone())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let journal = article
        .as_ref()
        .and_then(|a| a.journal.as_ref())
        .and_then(|j| j.title.as_ref())
        .and_then(|t| t.value.clone())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let publication_date = article
        .as_ref()
        .and_then(|a| a.journal.as_ref())
        .and_then(|j| j.issue.as_ref())
        .and_then(|i| i.pub_date.as_ref())
        .and_then(parse_pub_date);

    let abstract_text = article
        .as_ref()
        .and_then(|a| a.abstract_node.as_ref())
        .and_then(assemble_abstract);

    AbstractRecord {
        id: format!("PMID:{}", pmid),
        title,
        journal,
        publication_date,
        abstract_text,
    }
}

/// Join labeled abstract sections ("LABEL: text") into one block.
fn assemble_abstract(abstract_node: &AbstractXml) -> Option<String> {
    let parts: Vec<String> = abstract_node
        .sections
        .iter()
        .filter_map(|section| {
            let text = section.value.as_deref()?.trim();
            if text.is_empty() {
                return None;
            }
            Some(match &section.label {
                Some(label) => format!("{}: {}", label, text),
                None => text.to_string(),
            })
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

/// Collapse a PubDate element to a date. Month and day default to 1 when
/// absent; a MedlineDate range contributes its leading year only.
fn parse_pub_date(pub_date: &PubDateXml) -> Option<NaiveDate> {
    let year: i32 = match &pub_date.year {
        Some(y) => y.trim().parse().ok()?,
        None => pub_date
            .medline_date
            .as_ref()?
            .split_whitespace()
            .next()?
            .parse()
            .ok()?,
    };
    let month = pub_date
        .month
        .as_deref()
        .and_then(parse_month)
        .unwrap_or(1);
    let day: u32 = pub_date
        .day
        .as_deref()
        .and_then(|d| d.trim().parse().ok())
        .unwrap_or(1);
    NaiveDate::from_ymd_opt(year, month, day).or_else(|| NaiveDate::from_ymd_opt(year, month, 1))
}

fn parse_month(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(numeric) = raw.parse::<u32>() {
        return (1..=12).contains(&numeric).then_some(numeric);
    }
    let name = raw.to_lowercase();
    let months = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    months
        .iter()
        .position(|m| name.starts_with(m))
        .map(|i| i as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_XML: &str = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">31345061</PMID>
      <Article PubModel="Print">
        <Journal>
          <Title>The New England journal of medicine</Title>
          <JournalIssue CitedMedium="Internet">
            <PubDate>
              <Year>2019</Year>
              <Month>Jul</Month>
              <Day>25</Day>
            </PubDate>
          </JournalIssue>
        </Journal>
        <ArticleTitle>Example trial of a kinase inhibitor.</ArticleTitle>
        <Abstract>
          <AbstractText Label="BACKGROUND">Background text.</AbstractText>
          <AbstractText Label="RESULTS">Results text.</AbstractText>
        </Abstract>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">10000001</PMID>
      <Article PubModel="Print">
        <Journal>
          <Title>Some journal</Title>
          <JournalIssue>
            <PubDate>
              <MedlineDate>1998 Dec-1999 Jan</MedlineDate>
            </PubDate>
          </JournalIssue>
        </Journal>
        <ArticleTitle>Older article.</ArticleTitle>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn test_parse_efetch_response() {
        let records = parse_efetch_response(SAMPLE_XML).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.id, "PMID:31345061");
        assert_eq!(
            first.title.as_deref(),
            Some("Example trial of a kinase inhibitor.")
        );
        assert_eq!(
            first.journal.as_deref(),
            Some("The New England journal of medicine")
        );
        assert_eq!(first.publication_date, NaiveDate::from_ymd_opt(2019, 7, 25));
        let text = first.abstract_text.as_deref().unwrap();
        assert!(text.contains("BACKGROUND: Background text."));
        assert!(text.contains("RESULTS: Results text."));

        // Second record has no abstract; MedlineDate contributes the year
        let second = &records[1];
        assert!(second.abstract_text.is_none());
        assert_eq!(second.publication_date, NaiveDate::from_ymd_opt(1998, 1, 1));
    }

    #[test]
    fn test_parse_efetch_response_invalid_xml() {
        assert!(parse_efetch_response("<not valid").is_err());
    }

    #[test]
    fn test_normalize_pmids() {
        let ids = vec![
            "PMID:1".to_string(),
            "12345".to_string(),
            "PMID:1".to_string(),
            "clinicaltrials:NCT01234567".to_string(),
            "doi:10.1000/x".to_string(),
        ];
        assert_eq!(normalize_pmids(&ids), vec!["1", "12345"]);
    }

    #[test]
    fn test_parse_month_names_and_numbers() {
        assert_eq!(parse_month("Jul"), Some(7));
        assert_eq!(parse_month("december"), Some(12));
        assert_eq!(parse_month("3"), Some(3));
        assert_eq!(parse_month("13"), None);
        assert_eq!(parse_month("Spring"), None);
    }

    #[test]
    fn test_sort_most_recent() {
        let mut records = vec![
            AbstractRecord {
                id: "PMID:1".to_string(),
                title: None,
                journal: None,
                publication_date: NaiveDate::from_ymd_opt(2010, 1, 1),
                abstract_text: None,
            },
            AbstractRecord {
                id: "PMID:2".to_string(),
                title: None,
                journal: None,
                publication_date: None,
                abstract_text: None,
            },
            AbstractRecord {
                id: "PMID:3".to_string(),
                title: None,
                journal: None,
                publication_date: NaiveDate::from_ymd_opt(2022, 6, 1),
                abstract_text: None,
            },
        ];
        sort_most_recent(&mut records);
        assert_eq!(records[0].id, "PMID:3");
        assert_eq!(records[1].id, "PMID:1");
        // Undated records sort last
        assert_eq!(records[2].id, "PMID:2");
    }

    #[tokio::test]
    async fn test_rate_limiter_enforces_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        let start = std::time::Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        // Two gaps of at least 50ms each
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    // Note: Integration tests for actual EFetch calls would require network
    // access and should be run separately with proper test fixtures
}
