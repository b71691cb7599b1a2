use citewatch_archive::UrlHealthChecker;
use citewatch_common::{Citation, ProblemType};
use tracing::debug;

use crate::types::Signal;

/// Signal when the cited URL is unreachable, gone, or soft-redirects to its site's front page.
pub async fn check(health: &UrlHealthChecker, citation: &Citation) -> Option<Signal> {
    let url = citation.source_url.as_deref()?;
    let report = health.check(url).await;
    if report.accessible {
        return None;
    }
    debug!(citation_id = %citation.id, url, status = ?report.status_code, "Link not accessible");
    Some(Signal {
        problem_type: ProblemType::BrokenLink,
        severity: report.severity(),
        details: report.describe(url),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use citewatch_archive::testing::FakeTransport;
    use citewatch_common::testing::sample_citation;
    use citewatch_common::Severity;
    use std::sync::Arc;

    #[tokio::test]
    async fn missing_page_is_high_severity() {
        let url = "https://journal.example/article/9";
        let transport = Arc::new(FakeTransport::new().on_head(url, 404, url));
        let health = UrlHealthChecker::new(transport);

        let signal = check(&health, &sample_citation(Some(url), None)).await.unwrap();
        assert_eq!(signal.problem_type, ProblemType::BrokenLink);
        assert_eq!(signal.severity, Severity::High);
        assert_eq!(
            signal.details,
            "URL https://journal.example/article/9 is not accessible: HTTP 404 (HTTP 404)"
        );
    }

    #[tokio::test]
    async fn healthy_page_yields_nothing() {
        let url = "https://journal.example/article/9";
        let health = UrlHealthChecker::new(Arc::new(FakeTransport::new().on_head(url, 200, url)));
        assert!(check(&health, &sample_citation(Some(url), None)).await.is_none());
    }

    #[tokio::test]
    async fn citation_without_url_is_skipped() {
        let transport = Arc::new(FakeTransport::new());
        let health = UrlHealthChecker::new(transport.clone());
        assert!(check(&health, &sample_citation(None, Some("10.1/x"))).await.is_none());
        assert!(transport.calls().is_empty());
    }
}
