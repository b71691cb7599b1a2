// Bulk sync of the curated retraction registry (Retraction Watch CSV export) into
// the local retraction cache. Runs as a maintenance step, never per citation.

use std::time::Duration;

use chrono::NaiveDate;
use citewatch_common::{Doi, HttpConfig, RetractionCache, RetractionRecord, RetractionSource};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Result, RetractionError};

/// The export is tens of megabytes.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct RegistryRow {
    #[serde(rename = "DOI", alias = "OriginalPaperDOI", default)]
    doi: String,
    #[serde(rename = "Title", default)]
    title: String,
    #[serde(rename = "RetractionDate", default)]
    retraction_date: String,
    #[serde(rename = "Reason", default)]
    reason: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub upserted: u64,
    pub skipped: u64,
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Registry sync: {} upserted, {} skipped", self.upserted, self.skipped)
    }
}

pub struct RegistrySync {
    client: reqwest::Client,
    url: String,
}

impl RegistrySync {
    pub fn new(url: impl Into<String>, http: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(http.user_agent.clone())
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn download(&self) -> Result<String> {
        info!(url = self.url.as_str(), "Downloading retraction registry");
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RetractionError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }
        Ok(resp.text().await?)
    }

    /// Download the registry and upsert every row with a valid DOI.
    pub async fn sync(&self, cache: &dyn RetractionCache) -> Result<SyncReport> {
        let csv_text = self.download().await?;
        let report = load_into(&csv_text, cache).await?;
        info!(upserted = report.upserted, skipped = report.skipped, "Retraction registry synced");
        Ok(report)
    }
}

/// Parse `csv_text` and upsert each usable row. An unreachable store aborts the
/// load; any other per-row failure is counted as skipped.
pub async fn load_into(csv_text: &str, cache: &dyn RetractionCache) -> Result<SyncReport> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let mut report = SyncReport::default();

    for row in reader.deserialize::<RegistryRow>() {
        let record = match row.map(record_from_row) {
            Ok(Some(record)) => record,
            Ok(None) => {
                report.skipped += 1;
                continue;
            }
            Err(e) => {
                debug!(error = %e, "Unreadable registry row");
                report.skipped += 1;
                continue;
            }
        };
        match cache.upsert(&record).await {
            Ok(()) => report.upserted += 1,
            Err(e) if e.is_unavailable() => return Err(e.into()),
            Err(e) => {
                warn!(doi = %record.doi, error = %e, "Failed to upsert registry row");
                report.skipped += 1;
            }
        }
    }
    Ok(report)
}

fn record_from_row(row: RegistryRow) -> Option<RetractionRecord> {
    let doi = Doi::parse(&row.doi)?;
    Some(RetractionRecord {
        doi,
        paper_title: non_empty(row.title),
        retraction_date: parse_registry_date(&row.retraction_date),
        reason: non_empty(row.reason),
        source: RetractionSource::Cache,
    })
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// The export writes dates as `M/D/YYYY H:MM`; ISO dates are accepted too.
fn parse_registry_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.split_whitespace().next()?;
    ["%m/%d/%Y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryRetractionCache;

    const EXPORT: &str = "\
Record ID,Title,Journal,RetractionDate,DOI,Reason
1,Fabricated cells,J Bio,3/15/2019 0:00,10.1234/ABC,+Falsification/Fabrication of Data;
2,No doi here,J Chem,1/2/2020 0:00,,+Error in Analyses;
3,Bad doi,J Phys,1/2/2020 0:00,unavailable,+Plagiarism;
4,\"Quoted, title\",J Med,2021-07-01,https://doi.org/10.5555/xyz.1,
";

    #[tokio::test]
    async fn loads_rows_with_valid_dois() {
        let cache = InMemoryRetractionCache::new();
        let report = load_into(EXPORT, &cache).await.unwrap();
        assert_eq!(report, SyncReport { upserted: 2, skipped: 2 });

        let records = cache.records();
        let first = records.iter().find(|r| r.doi.as_str() == "10.1234/abc").unwrap();
        assert_eq!(first.paper_title.as_deref(), Some("Fabricated cells"));
        assert_eq!(first.retraction_date, NaiveDate::from_ymd_opt(2019, 3, 15));
        assert_eq!(first.reason.as_deref(), Some("+Falsification/Fabrication of Data;"));
        assert_eq!(first.source, RetractionSource::Cache);

        let second = records.iter().find(|r| r.doi.as_str() == "10.5555/xyz.1").unwrap();
        assert_eq!(second.paper_title.as_deref(), Some("Quoted, title"));
        assert_eq!(second.retraction_date, NaiveDate::from_ymd_opt(2021, 7, 1));
        assert_eq!(second.reason, None);
    }

    #[tokio::test]
    async fn newer_export_column_name_is_accepted() {
        let export = "Title,RetractionDate,OriginalPaperDOI,Reason\nA paper,5/6/2022 0:00,10.9999/q,Misconduct\n";
        let cache = InMemoryRetractionCache::new();
        let report = load_into(export, &cache).await.unwrap();
        assert_eq!(report.upserted, 1);
    }

    #[tokio::test]
    async fn unavailable_store_aborts_the_load() {
        let cache = InMemoryRetractionCache::new().unavailable();
        let err = load_into(EXPORT, &cache).await.unwrap_err();
        assert!(err.is_store_unavailable());
    }

    #[test]
    fn registry_dates() {
        assert_eq!(parse_registry_date("12/31/2018 0:00"), NaiveDate::from_ymd_opt(2018, 12, 31));
        assert_eq!(parse_registry_date(""), None);
        assert_eq!(parse_registry_date("sometime"), None);
    }
}
