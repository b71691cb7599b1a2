// PubMed E-utilities client.
//
// esearch: term="<doi>"[DOI], retmode=json -> {"esearchresult": {"idlist": ["123", ...]}}
// esummary: id=123,456, retmode=json     -> {"result": {"uids": [...], "123": {"title": "...", "pubtype": [...]}}}
//
// NCBI asks for at most 3 requests per second without an API key, plus `tool` and `email`.

use async_trait::async_trait;
use citewatch_common::{Doi, RateGate, RemoteApiConfig, RetryPolicy};
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, RetractionError};
use crate::sources::{BibliographicIndex, IndexRecord};

const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const TOOL: &str = "citewatch";
const MAX_IDS: usize = 5;

pub struct PubMedClient {
    client: reqwest::Client,
    base_url: String,
    email: Option<String>,
    gate: RateGate,
    retry: RetryPolicy,
}

impl PubMedClient {
    pub fn new(config: &RemoteApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.http.user_agent.clone())
            .timeout(config.http.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: EUTILS_BASE.to_string(),
            email: config.contact_email.clone(),
            gate: RateGate::new(config.bibliographic_index_interval),
            retry: config.retry.clone(),
        })
    }

    async fn get_json_once(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        self.gate.wait().await;
        let url = format!("{}/{endpoint}", self.base_url);
        let mut query: Vec<(&str, String)> = vec![
            ("db", "pubmed".to_string()),
            ("retmode", "json".to_string()),
            ("tool", TOOL.to_string()),
        ];
        if let Some(email) = &self.email {
            query.push(("email", email.clone()));
        }
        query.extend(params.iter().cloned());

        let resp = self.client.get(&url).query(&query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RetractionError::Status {
                status: status.as_u16(),
                url,
            });
        }
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        self.retry
            .run(
                endpoint,
                || self.get_json_once(endpoint, params),
                RetractionError::is_transient,
            )
            .await
    }
}

#[async_trait]
impl BibliographicIndex for PubMedClient {
    async fn lookup_by_doi(&self, doi: &Doi) -> Result<Option<IndexRecord>> {
        let search = self
            .get_json(
                "esearch.fcgi",
                &[
                    ("term", format!("\"{doi}\"[DOI]")),
                    ("retmax", MAX_IDS.to_string()),
                ],
            )
            .await?;
        let ids = parse_search_ids(&search)?;
        debug!(doi = %doi, hits = ids.len(), "PubMed search");
        if ids.is_empty() {
            return Ok(None);
        }

        let summary = self
            .get_json("esummary.fcgi", &[("id", ids.join(","))])
            .await?;
        parse_summary(&summary, &ids).map(Some)
    }
}

fn parse_search_ids(value: &Value) -> Result<Vec<String>> {
    let idlist = value
        .get("esearchresult")
        .and_then(|r| r.get("idlist"))
        .and_then(Value::as_array)
        .ok_or_else(|| RetractionError::Malformed("esearch response without idlist".to_string()))?;
    Ok(idlist
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect())
}

/// Merge the summaries of every hit: publication types are unioned, the first
/// non-empty title wins.
fn parse_summary(value: &Value, ids: &[String]) -> Result<IndexRecord> {
    let result = value
        .get("result")
        .ok_or_else(|| RetractionError::Malformed("esummary response without result".to_string()))?;

    let mut record = IndexRecord::default();
    for entry in ids.iter().filter_map(|id| result.get(id)) {
        if record.title.is_none() {
            record.title = entry
                .get("title")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
        }
        let types = entry
            .get("pubtype")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str);
        for pubtype in types {
            if !record.publication_types.iter().any(|t| t == pubtype) {
                record.publication_types.push(pubtype.to_string());
            }
        }
    }
    Ok(record)
}
