// HTTP transport used by the health checker and the drift detector.
// Non-2xx statuses are returned as responses, never as errors.

use async_trait::async_trait;
use citewatch_common::{HttpConfig, RateGate};
use reqwest::redirect::Policy;
use tracing::debug;

use crate::error::Result;

const MAX_REDIRECTS: usize = 10;

/// What came back from one request, after redirects were followed.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub final_url: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Header-only request. The body is always empty.
    async fn head(&self, url: &str) -> Result<HttpResponse>;

    /// Full retrieval.
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Production transport: one reqwest client with the configured user agent and
/// per-request timeout, paced by a minimum interval between requests.
pub struct ReqwestTransport {
    client: reqwest::Client,
    gate: RateGate,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self {
            client,
            gate: RateGate::new(config.min_interval),
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn head(&self, url: &str) -> Result<HttpResponse> {
        self.gate.wait().await;
        let resp = self.client.head(url).send().await?;
        let status = resp.status().as_u16();
        debug!(url, status, "HEAD");
        Ok(HttpResponse {
            status,
            final_url: resp.url().to_string(),
            body: String::new(),
        })
    }

    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.gate.wait().await;
        let resp = self.client.get(url).send().await?;
        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let body = resp.text().await?;
        debug!(url, status, bytes = body.len(), "GET");
        Ok(HttpResponse {
            status,
            final_url,
            body,
        })
    }
}
