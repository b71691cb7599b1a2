// URL health checking: HEAD request first, full fetch only when the HEAD
// fails at the transport level.

use std::sync::Arc;

use citewatch_common::Severity;
use tracing::debug;
use url::Url;

use crate::transport::{HttpResponse, HttpTransport};

/// Final statuses that mark a URL as broken.
pub const HARD_FAILURE_CODES: [u16; 4] = [404, 410, 500, 503];

/// Paths treated as a site's front page when judging redirects.
const HOMEPAGE_PATHS: [&str; 5] = ["", "/", "/index.html", "/index.php", "/home"];

#[derive(Debug, Clone, PartialEq)]
pub struct HealthReport {
    pub accessible: bool,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    pub redirects_to_homepage: bool,
}

impl HealthReport {
    fn from_response(url: &str, resp: &HttpResponse) -> Self {
        let hard_failure = HARD_FAILURE_CODES.contains(&resp.status);
        let redirects_to_homepage = !hard_failure && is_homepage_redirect(url, &resp.final_url);
        let error = if hard_failure {
            Some(format!("HTTP {}", resp.status))
        } else if redirects_to_homepage {
            Some("Redirects to homepage".to_string())
        } else {
            None
        };
        Self {
            accessible: !hard_failure && !redirects_to_homepage,
            status_code: Some(resp.status),
            error,
            redirects_to_homepage,
        }
    }

    fn unreachable() -> Self {
        Self {
            accessible: false,
            status_code: None,
            error: Some("Connection failed".to_string()),
            redirects_to_homepage: false,
        }
    }

    /// 404 and 410 mean the resource is gone; everything else may be transient.
    pub fn severity(&self) -> Severity {
        match self.status_code {
            Some(404) | Some(410) => Severity::High,
            _ => Severity::Medium,
        }
    }

    /// Human-readable description used as finding details.
    pub fn describe(&self, url: &str) -> String {
        let error = self.error.as_deref().unwrap_or("Unknown error");
        match self.status_code {
            Some(code) => format!("URL {url} is not accessible: {error} (HTTP {code})"),
            None => format!("URL {url} is not accessible: {error}"),
        }
    }
}

/// True when `final_url` is the front page of the same host `original` pointed into.
pub fn is_homepage_redirect(original: &str, final_url: &str) -> bool {
    let (Ok(original), Ok(landed)) = (Url::parse(original), Url::parse(final_url)) else {
        return false;
    };
    let same_host = original.host_str() == landed.host_str() && original.port() == landed.port();
    same_host && HOMEPAGE_PATHS.contains(&landed.path())
}

pub struct UrlHealthChecker {
    transport: Arc<dyn HttpTransport>,
}

impl UrlHealthChecker {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    pub async fn check(&self, url: &str) -> HealthReport {
        let resp = match self.transport.head(url).await {
            Ok(resp) => resp,
            Err(head_err) => {
                debug!(url, error = %head_err, "HEAD request failed, retrying with full fetch");
                match self.transport.get(url).await {
                    Ok(resp) => resp,
                    Err(e) => {
                        debug!(url, error = %e, "Full fetch failed");
                        return HealthReport::unreachable();
                    }
                }
            }
        };
        HealthReport::from_response(url, &resp)
    }
}
