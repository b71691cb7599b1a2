// Internet Archive Wayback Machine client.
//
// Availability API: GET https://archive.org/wayback/available?url=<url>
//   -> {"archived_snapshots": {"closest": {"available": true, "url": "...", "timestamp": "YYYYMMDDhhmmss", "status": "200"}}}
// Save Page Now:    GET https://web.archive.org/save/<url>, redirects to the new capture.
// Replay:           https://web.archive.org/web/<timestamp>id_/<url> serves the page without the archive toolbar.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use citewatch_common::{RateGate, RemoteApiConfig, RetryPolicy};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::archive::{ArchivedCopy, SnapshotArchive};
use crate::error::{ArchiveError, Result};

const AVAILABILITY_URL: &str = "https://archive.org/wayback/available";
const SAVE_URL: &str = "https://web.archive.org/save";
const REPLAY_HOST: &str = "https://web.archive.org";

static SNAPSHOT_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://web\.archive\.org/web/(\d{14})(?:[a-z]{2}_)?/.+").expect("valid regex")
});
static REPLAY_MODIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(/web/\d{14})(?:[a-z]{2}_)?/").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    #[serde(default)]
    archived_snapshots: ArchivedSnapshots,
}

#[derive(Debug, Default, Deserialize)]
struct ArchivedSnapshots {
    closest: Option<ClosestSnapshot>,
}

#[derive(Debug, Deserialize)]
struct ClosestSnapshot {
    #[serde(default)]
    available: bool,
    url: String,
    timestamp: Option<String>,
    status: Option<String>,
}

struct Reply {
    final_url: String,
    content_location: Option<String>,
    body: String,
}

pub struct WaybackClient {
    client: reqwest::Client,
    gate: RateGate,
    retry: RetryPolicy,
    capture_timeout: Duration,
}

impl WaybackClient {
    pub fn new(config: &RemoteApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.http.user_agent.clone())
            .timeout(config.http.timeout)
            .build()?;
        Ok(Self {
            client,
            gate: RateGate::new(config.archive_interval),
            retry: config.retry.clone(),
            capture_timeout: config.capture_timeout,
        })
    }

    async fn get_once(&self, url: &str, timeout: Option<Duration>) -> Result<Reply> {
        self.gate.wait().await;
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ArchiveError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let final_url = resp.url().to_string();
        let content_location = resp
            .headers()
            .get(reqwest::header::CONTENT_LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await?;
        Ok(Reply {
            final_url,
            content_location,
            body,
        })
    }

    async fn get(&self, label: &str, url: &str, timeout: Option<Duration>) -> Result<Reply> {
        self.retry
            .run(label, || self.get_once(url, timeout), ArchiveError::is_transient)
            .await
    }
}

#[async_trait]
impl SnapshotArchive for WaybackClient {
    async fn find_existing(&self, url: &str) -> Option<ArchivedCopy> {
        let query = match reqwest::Url::parse_with_params(AVAILABILITY_URL, &[("url", url)]) {
            Ok(query) => query,
            Err(e) => {
                warn!(url, error = %e, "Could not build availability query");
                return None;
            }
        };
        let reply = match self.get("wayback availability", query.as_str(), None).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(url, error = %e, "Wayback availability lookup failed");
                return None;
            }
        };
        match parse_availability(&reply.body) {
            Ok(found) => {
                debug!(url, found = found.is_some(), "Wayback availability");
                found
            }
            Err(e) => {
                warn!(url, error = %e, "Unreadable availability response");
                None
            }
        }
    }

    async fn request_capture(&self, url: &str) -> Option<ArchivedCopy> {
        let save = format!("{SAVE_URL}/{url}");
        let reply = match self.get("wayback capture", &save, Some(self.capture_timeout)).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(url, error = %e, "Wayback capture request failed");
                return None;
            }
        };
        let copy = capture_location(&reply.final_url, reply.content_location.as_deref());
        match &copy {
            Some(c) => info!(url, archive_url = c.archive_url.as_str(), "Captured snapshot"),
            None => warn!(url, "Capture accepted but no snapshot location returned"),
        }
        copy
    }

    async fn fetch_content(&self, archive_url: &str) -> Option<String> {
        let raw = raw_replay_url(archive_url);
        match self.get("wayback replay", &raw, None).await {
            Ok(reply) => Some(reply.body),
            Err(e) => {
                warn!(archive_url, error = %e, "Failed to fetch archived copy");
                None
            }
        }
    }
}

/// Parse an availability API body. Only copies of pages that were served
/// successfully at capture time count.
fn parse_availability(body: &str) -> Result<Option<ArchivedCopy>> {
    let parsed: AvailabilityResponse = serde_json::from_str(body)?;
    let Some(closest) = parsed.archived_snapshots.closest else {
        return Ok(None);
    };
    let served_ok = closest.status.as_deref().is_none_or(|s| s.starts_with('2'));
    if !closest.available || !served_ok {
        return Ok(None);
    }
    Ok(Some(ArchivedCopy {
        captured_at: closest.timestamp.as_deref().and_then(parse_timestamp),
        archive_url: closest.url,
    }))
}

fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(ts, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Where a Save Page Now request left the new capture: the redirect target if it is
/// a snapshot URL, else the Content-Location header.
fn capture_location(final_url: &str, content_location: Option<&str>) -> Option<ArchivedCopy> {
    let absolute = content_location.map(|loc| {
        if loc.starts_with('/') {
            format!("{REPLAY_HOST}{loc}")
        } else {
            loc.to_string()
        }
    });
    std::iter::once(final_url.to_string())
        .chain(absolute)
        .find_map(|candidate| {
            let ts = SNAPSHOT_URL_RE.captures(&candidate)?.get(1)?.as_str().to_string();
            Some(ArchivedCopy {
                captured_at: parse_timestamp(&ts),
                archive_url: candidate,
            })
        })
}

/// Rewrite a replay URL to the raw `id_` form, which serves the original bytes.
pub fn raw_replay_url(archive_url: &str) -> String {
    REPLAY_MODIFIER_RE
        .replace(archive_url, "${1}id_/")
        .into_owned()
}
