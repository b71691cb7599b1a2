// Crossref REST API client: GET /works/{doi}.
//
// Retractions show up as relations on the work: `update-to` on the notice,
// `updated-by` on the retracted paper. Each carries `type` and `updated.date-parts`.

use async_trait::async_trait;
use chrono::NaiveDate;
use citewatch_common::{Doi, RateGate, RemoteApiConfig, RetryPolicy};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, RetractionError};
use crate::sources::{PublisherMetadata, UpdateRelation, WorkRecord};

const CROSSREF_BASE: &str = "https://api.crossref.org";

#[derive(Debug, Deserialize)]
struct WorkEnvelope {
    status: String,
    message: Option<WorkMessage>,
}

#[derive(Debug, Deserialize)]
struct WorkMessage {
    #[serde(rename = "type")]
    work_type: Option<String>,
    #[serde(default)]
    title: Vec<String>,
    #[serde(rename = "update-to", default)]
    update_to: Vec<Relation>,
    #[serde(rename = "updated-by", default)]
    updated_by: Vec<Relation>,
}

#[derive(Debug, Deserialize)]
struct Relation {
    #[serde(rename = "type")]
    relation_type: Option<String>,
    updated: Option<DateParts>,
}

#[derive(Debug, Deserialize)]
struct DateParts {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i32>>>,
}

impl DateParts {
    fn to_date(&self) -> Option<NaiveDate> {
        let parts = self.date_parts.first()?;
        let year = (*parts.first()?)?;
        let month = parts.get(1).copied().flatten().unwrap_or(1);
        let day = parts.get(2).copied().flatten().unwrap_or(1);
        NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
    }
}

pub struct CrossrefClient {
    client: reqwest::Client,
    base_url: String,
    gate: RateGate,
    retry: RetryPolicy,
}

impl CrossrefClient {
    pub fn new(config: &RemoteApiConfig) -> Result<Self> {
        // Crossref routes requests carrying a mailto to its "polite" pool.
        let user_agent = match &config.contact_email {
            Some(email) => format!("{} (mailto:{email})", config.http.user_agent),
            None => config.http.user_agent.clone(),
        };
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(config.http.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: CROSSREF_BASE.to_string(),
            gate: RateGate::new(config.publisher_metadata_interval),
            retry: config.retry.clone(),
        })
    }

    fn work_url(&self, doi: &Doi) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| RetractionError::Malformed(format!("bad base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| RetractionError::Malformed("base url cannot have a path".to_string()))?
            .extend(["works", doi.as_str()]);
        Ok(url)
    }

    async fn fetch_once(&self, url: &reqwest::Url) -> Result<Option<String>> {
        self.gate.wait().await;
        let resp = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RetractionError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(Some(resp.text().await?))
    }
}

#[async_trait]
impl PublisherMetadata for CrossrefClient {
    async fn lookup_by_doi(&self, doi: &Doi) -> Result<Option<WorkRecord>> {
        let url = self.work_url(doi)?;
        let body = self
            .retry
            .run("crossref works", || self.fetch_once(&url), RetractionError::is_transient)
            .await?;
        let Some(body) = body else {
            debug!(doi = %doi, "Crossref does not know this DOI");
            return Ok(None);
        };
        parse_work(&body).map(Some)
    }
}

fn parse_work(body: &str) -> Result<WorkRecord> {
    let envelope: WorkEnvelope = serde_json::from_str(body)?;
    if envelope.status != "ok" {
        return Err(RetractionError::Malformed(format!(
            "crossref status {}",
            envelope.status
        )));
    }
    let message = envelope
        .message
        .ok_or_else(|| RetractionError::Malformed("crossref response without message".to_string()))?;

    let updates = message
        .update_to
        .iter()
        .chain(&message.updated_by)
        .filter_map(|relation| {
            Some(UpdateRelation {
                relation_type: relation.relation_type.clone()?,
                date: relation.updated.as_ref().and_then(DateParts::to_date),
            })
        })
        .collect();

    Ok(WorkRecord {
        title: message.title.into_iter().find(|t| !t.trim().is_empty()),
        work_type: message.work_type,
        updates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_retraction_relation_with_date() {
        let body = r#"{"status":"ok","message-type":"work","message":{
            "type":"journal-article",
            "title":["Cold fusion in a jar"],
            "updated-by":[{"DOI":"10.1234/notice","type":"retraction","label":"Retraction",
                           "updated":{"date-parts":[[2021,3,15]]}}]
        }}"#;
        let work = parse_work(body).unwrap();
        assert_eq!(work.title.as_deref(), Some("Cold fusion in a jar"));
        assert_eq!(work.work_type.as_deref(), Some("journal-article"));
        assert_eq!(
            work.updates,
            vec![UpdateRelation {
                relation_type: "retraction".to_string(),
                date: NaiveDate::from_ymd_opt(2021, 3, 15),
            }]
        );
    }

    #[test]
    fn partial_dates_default_to_first_of_period() {
        let parts = DateParts { date_parts: vec![vec![Some(2019)]] };
        assert_eq!(parts.to_date(), NaiveDate::from_ymd_opt(2019, 1, 1));
        let empty = DateParts { date_parts: vec![vec![None]] };
        assert_eq!(empty.to_date(), None);
    }

    #[test]
    fn plain_work_has_no_updates() {
        let body = r#"{"status":"ok","message":{"type":"journal-article","title":[]}}"#;
        let work = parse_work(body).unwrap();
        assert!(work.updates.is_empty());
        assert_eq!(work.title, None);
    }

    #[test]
    fn non_ok_status_is_malformed() {
        let body = r#"{"status":"failed","message":null}"#;
        assert!(matches!(parse_work(body), Err(RetractionError::Malformed(_))));
    }

    #[test]
    fn work_url_escapes_doi_suffix() {
        let config = citewatch_common::Config::from_lookup(|key| {
            (key == "DATABASE_URL").then(|| "postgres://localhost/citewatch".to_string())
        })
        .unwrap();
        let client = CrossrefClient::new(&config.remote_apis()).unwrap();
        let doi = Doi::parse("10.1000/abc?x#y").unwrap();
        let url = client.work_url(&doi).unwrap();
        assert!(url.as_str().starts_with("https://api.crossref.org/works/10.1000%2Fabc%3Fx%23y"));
    }
}
