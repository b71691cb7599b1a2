use citewatch_common::{Citation, ProblemType, Severity};
use citewatch_retraction::{describe_retraction, RetractionResolver};
use tracing::debug;

use crate::error::DetectorError;
use crate::types::Signal;

/// Signal when the cited DOI resolves to a retracted paper.
pub async fn check(
    resolver: &RetractionResolver,
    citation: &Citation,
    remote_lookups: bool,
) -> Result<Option<Signal>, DetectorError> {
    let Some(doi) = citation.doi() else {
        debug!(citation_id = %citation.id, raw = ?citation.source_doi, "No usable DOI");
        return Ok(None);
    };
    let Some(record) = resolver.resolve(&doi, remote_lookups).await? else {
        return Ok(None);
    };
    Ok(Some(Signal {
        problem_type: ProblemType::Retraction,
        severity: Severity::High,
        details: describe_retraction(&record),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use citewatch_common::testing::sample_citation;
    use citewatch_common::{Doi, ResolverConfig, RetractionRecord, RetractionSource};
    use citewatch_retraction::testing::InMemoryRetractionCache;
    use std::sync::Arc;

    fn resolver_with(doi: &str) -> RetractionResolver {
        let cache = InMemoryRetractionCache::new().with(RetractionRecord {
            doi: Doi::parse(doi).unwrap(),
            paper_title: None,
            retraction_date: None,
            reason: Some("Misconduct".to_string()),
            source: RetractionSource::Cache,
        });
        RetractionResolver::new(Arc::new(cache), ResolverConfig::default())
    }

    #[tokio::test]
    async fn retracted_doi_is_always_high() {
        let resolver = resolver_with("10.1234/abc");
        let citation = sample_citation(None, Some("https://doi.org/10.1234/ABC"));
        let signal = check(&resolver, &citation, false).await.unwrap().unwrap();
        assert_eq!(signal.severity, Severity::High);
        assert_eq!(
            signal.details,
            "Paper with DOI 10.1234/abc was retracted. Reason: Misconduct (Source: cache)"
        );
    }

    #[tokio::test]
    async fn unparseable_doi_is_not_an_error() {
        let resolver = resolver_with("10.1234/abc");
        let citation = sample_citation(None, Some("ISBN 978-3-16"));
        assert!(check(&resolver, &citation, false).await.unwrap().is_none());
    }
}
