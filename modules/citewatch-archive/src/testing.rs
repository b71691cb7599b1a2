// Test doubles for the transport and archive seams.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::archive::{ArchivedCopy, SnapshotArchive};
use crate::error::{ArchiveError, Result};
use crate::transport::{HttpResponse, HttpTransport};

#[derive(Debug, Clone)]
enum Scripted {
    Respond(HttpResponse),
    Fail,
}

/// Transport answering from a per-URL script. Unscripted URLs fail at the
/// transport level.
#[derive(Default)]
pub struct FakeTransport {
    heads: HashMap<String, Scripted>,
    gets: HashMap<String, Scripted>,
    calls: Mutex<Vec<(&'static str, String)>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_head(mut self, url: &str, status: u16, final_url: &str) -> Self {
        let resp = HttpResponse {
            status,
            final_url: final_url.to_string(),
            body: String::new(),
        };
        self.heads.insert(url.to_string(), Scripted::Respond(resp));
        self
    }

    pub fn on_get(mut self, url: &str, status: u16, final_url: &str, body: &str) -> Self {
        let resp = HttpResponse {
            status,
            final_url: final_url.to_string(),
            body: body.to_string(),
        };
        self.gets.insert(url.to_string(), Scripted::Respond(resp));
        self
    }

    /// A page served with 200 at its own URL, for both HEAD and GET.
    pub fn page(self, url: &str, body: &str) -> Self {
        self.on_head(url, 200, url).on_get(url, 200, url, body)
    }

    pub fn fail_head(mut self, url: &str) -> Self {
        self.heads.insert(url.to_string(), Scripted::Fail);
        self
    }

    pub fn fail_get(mut self, url: &str) -> Self {
        self.gets.insert(url.to_string(), Scripted::Fail);
        self
    }

    pub fn calls(&self) -> Vec<(&'static str, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn head_count(&self) -> usize {
        self.calls().iter().filter(|(m, _)| *m == "HEAD").count()
    }

    pub fn get_count(&self) -> usize {
        self.calls().iter().filter(|(m, _)| *m == "GET").count()
    }

    fn answer(&self, method: &'static str, url: &str) -> Result<HttpResponse> {
        self.calls.lock().unwrap().push((method, url.to_string()));
        let script = if method == "HEAD" { &self.heads } else { &self.gets };
        match script.get(url) {
            Some(Scripted::Respond(resp)) => Ok(resp.clone()),
            Some(Scripted::Fail) => Err(ArchiveError::Timeout(format!("{method} {url}"))),
            None => Err(ArchiveError::Transport(format!("no route to {url}"))),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn head(&self, url: &str) -> Result<HttpResponse> {
        self.answer("HEAD", url)
    }

    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.answer("GET", url)
    }
}

/// Archive holding canned copies and contents.
#[derive(Default)]
pub struct MockArchive {
    existing: HashMap<String, ArchivedCopy>,
    captures: HashMap<String, ArchivedCopy>,
    contents: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl MockArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// The archive already holds `archive_url` as a copy of `url`.
    pub fn with_existing(mut self, url: &str, archive_url: &str) -> Self {
        self.existing.insert(url.to_string(), copy(archive_url));
        self
    }

    /// Capturing `url` yields `archive_url`.
    pub fn with_capture(mut self, url: &str, archive_url: &str) -> Self {
        self.captures.insert(url.to_string(), copy(archive_url));
        self
    }

    pub fn with_content(mut self, archive_url: &str, html: &str) -> Self {
        self.contents.insert(archive_url.to_string(), html.to_string());
        self
    }

    /// Every call, as "find <url>", "capture <url>" or "fetch <archive_url>".
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn copy(archive_url: &str) -> ArchivedCopy {
    ArchivedCopy {
        archive_url: archive_url.to_string(),
        captured_at: Some(Utc::now()),
    }
}

#[async_trait]
impl SnapshotArchive for MockArchive {
    async fn find_existing(&self, url: &str) -> Option<ArchivedCopy> {
        self.record(format!("find {url}"));
        self.existing.get(url).cloned()
    }

    async fn request_capture(&self, url: &str) -> Option<ArchivedCopy> {
        self.record(format!("capture {url}"));
        self.captures.get(url).cloned()
    }

    async fn fetch_content(&self, archive_url: &str) -> Option<String> {
        self.record(format!("fetch {archive_url}"));
        self.contents.get(archive_url).cloned()
    }
}
