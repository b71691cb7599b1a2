use std::sync::Arc;

use citewatch_common::{
    Citation, CitationRepository, FindingRepository, NewFinding, RunOptions, RunParams,
};
use tracing::{debug, info, warn};

use crate::detector::Detector;
use crate::error::DetectorError;
use crate::oracle::{ReviewContext, TriageOracle};
use crate::types::RunStats;

/// Runs one detector over the citations due for it: inspect, triage, persist, stamp.
pub struct Supervisor {
    detector: Detector,
    citations: Arc<dyn CitationRepository>,
    findings: Arc<dyn FindingRepository>,
    oracle: Arc<TriageOracle>,
}

impl Supervisor {
    pub fn new(
        detector: Detector,
        citations: Arc<dyn CitationRepository>,
        findings: Arc<dyn FindingRepository>,
        oracle: Arc<TriageOracle>,
    ) -> Self {
        Self {
            detector,
            citations,
            findings,
            oracle,
        }
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    /// Process up to `batch_limit` stale citations. Only an unreachable store aborts
    /// the run; any other failure leaves that citation unstamped for the next run.
    pub async fn run(&self, params: &RunParams) -> Result<RunStats, DetectorError> {
        let problem_type = self.detector.problem_type();
        let due = self
            .citations
            .citations_due(
                self.detector.filter(params.options),
                params.staleness_window(),
                params.batch_limit,
            )
            .await?;
        info!(detector = %problem_type, due = due.len(), "Starting verification run");

        self.oracle.begin_run();
        let mut stats = RunStats::default();
        for citation in &due {
            self.process(citation, params.options, true, &mut stats).await?;
        }

        info!(
            detector = %problem_type,
            triage_calls_spent = self.oracle.allowance().spent(),
            triage_calls_left = self.oracle.allowance().left(),
            "Triage allowance summary"
        );
        info!(detector = %problem_type, "Verification run complete. {stats}");
        Ok(stats)
    }

    /// Re-check every citation with a DOI, ignoring staleness and without stamping.
    /// Used right after the retraction registry has been refreshed.
    pub async fn sweep_retractions(&self, options: RunOptions) -> Result<RunStats, DetectorError> {
        let Detector::Retraction(_) = &self.detector else {
            return Err(DetectorError::Unsupported(self.detector.problem_type().as_str()));
        };
        let all = self.citations.citations_with_doi().await?;
        info!(citations = all.len(), "Sweeping citations against refreshed retraction data");

        self.oracle.begin_run();
        let mut stats = RunStats::default();
        for citation in &all {
            self.process(citation, options, false, &mut stats).await?;
        }

        info!("Retraction sweep complete. {stats}");
        Ok(stats)
    }

    async fn process(
        &self,
        citation: &Citation,
        options: RunOptions,
        stamp: bool,
        stats: &mut RunStats,
    ) -> Result<(), DetectorError> {
        let problem_type = self.detector.problem_type();

        let signal = match self.detector.inspect(citation, options).await {
            Ok(signal) => signal,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(citation_id = %citation.id, detector = %problem_type, error = %e, "Check failed");
                stats.failed += 1;
                return Ok(());
            }
        };

        if let Some(signal) = signal {
            let context = ReviewContext::for_citation(citation);
            let verdict = self.oracle.review(signal.problem_type, &signal.details, &context).await;
            if verdict.accept {
                let finding = NewFinding {
                    citation_id: citation.id,
                    article_title: citation.article_title.clone(),
                    problem_type: signal.problem_type,
                    severity: signal.severity,
                    details: verdict.details,
                };
                match self.findings.insert(&finding).await {
                    Ok(finding_id) => {
                        stats.found += 1;
                        info!(
                            %finding_id,
                            citation_id = %citation.id,
                            problem_type = %finding.problem_type,
                            severity = %finding.severity,
                            "Recorded finding"
                        );
                    }
                    Err(e) if e.is_unavailable() => return Err(e.into()),
                    Err(e) => {
                        warn!(citation_id = %citation.id, error = %e, "Failed to persist finding");
                        stats.failed += 1;
                        return Ok(());
                    }
                }
            } else {
                debug!(citation_id = %citation.id, detector = %problem_type, "Signal rejected by triage");
                stats.rejected += 1;
            }
        }

        if stamp {
            if let Err(e) = self.citations.mark_checked(citation.id).await {
                if e.is_unavailable() {
                    return Err(e.into());
                }
                warn!(citation_id = %citation.id, error = %e, "Failed to stamp citation");
            }
        }
        stats.checked += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;
    use citewatch_archive::testing::FakeTransport;
    use citewatch_archive::UrlHealthChecker;
    use citewatch_common::testing::{
        sample_citation, InMemoryCitationRepository, InMemoryFindingRepository,
    };
    use citewatch_common::{
        Doi, OracleConfig, ProblemType, ResolverConfig, RetractionRecord, RetractionSource,
        Severity,
    };
    use citewatch_retraction::testing::InMemoryRetractionCache;
    use citewatch_retraction::RetractionResolver;

    const DEAD: &str = "https://journal.example/gone";
    const ALIVE: &str = "https://journal.example/here";

    fn link_detector() -> Detector {
        let transport = FakeTransport::new()
            .on_head(DEAD, 404, DEAD)
            .on_head(ALIVE, 200, ALIVE);
        Detector::BrokenLink(UrlHealthChecker::new(Arc::new(transport)))
    }

    fn retraction_detector(cache: InMemoryRetractionCache) -> Detector {
        Detector::Retraction(RetractionResolver::new(Arc::new(cache), ResolverConfig::default()))
    }

    fn retracted(doi: &str) -> RetractionRecord {
        RetractionRecord {
            doi: Doi::parse(doi).unwrap(),
            paper_title: Some("Fabricated results".to_string()),
            retraction_date: None,
            reason: None,
            source: RetractionSource::Cache,
        }
    }

    fn oracle_with(backend: ScriptedBackend, rewrite_details: bool) -> Arc<TriageOracle> {
        let config = OracleConfig {
            rewrite_details,
            ..OracleConfig::default()
        };
        Arc::new(TriageOracle::new(Some(Arc::new(backend)), config))
    }

    fn supervisor(
        detector: Detector,
        citations: &Arc<InMemoryCitationRepository>,
        findings: &Arc<InMemoryFindingRepository>,
        oracle: Arc<TriageOracle>,
    ) -> Supervisor {
        Supervisor::new(detector, citations.clone(), findings.clone(), oracle)
    }

    #[tokio::test]
    async fn accepted_signal_becomes_finding_and_all_are_stamped() {
        let dead = sample_citation(Some(DEAD), None);
        let alive = sample_citation(Some(ALIVE), None);
        let ids = [dead.id, alive.id];
        let citations = Arc::new(InMemoryCitationRepository::new(vec![dead, alive]));
        let findings = Arc::new(InMemoryFindingRepository::new());

        let stats = supervisor(link_detector(), &citations, &findings, Arc::new(TriageOracle::disabled()))
            .run(&RunParams::default())
            .await
            .unwrap();

        assert_eq!(stats, RunStats { checked: 2, found: 1, rejected: 0, failed: 0 });
        let recorded = findings.findings();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].citation_id, ids[0]);
        assert_eq!(recorded[0].problem_type, ProblemType::BrokenLink);
        assert_eq!(recorded[0].severity, Severity::High);
        assert_eq!(recorded[0].article_title, "Photosynthesis");

        let mut stamped = citations.stamped();
        stamped.sort();
        let mut expected = ids.to_vec();
        expected.sort();
        assert_eq!(stamped, expected);
    }

    #[tokio::test]
    async fn rejected_signal_is_counted_and_still_stamped() {
        let dead = sample_citation(Some(DEAD), None);
        let id = dead.id;
        let citations = Arc::new(InMemoryCitationRepository::new(vec![dead]));
        let findings = Arc::new(InMemoryFindingRepository::new());
        let oracle = oracle_with(ScriptedBackend::replying(["no"]), false);

        let stats = supervisor(link_detector(), &citations, &findings, oracle)
            .run(&RunParams::default())
            .await
            .unwrap();

        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.found, 0);
        assert!(findings.findings().is_empty());
        assert_eq!(citations.stamped(), vec![id]);
    }

    #[tokio::test]
    async fn rewritten_details_are_persisted() {
        let citations = Arc::new(InMemoryCitationRepository::new(vec![sample_citation(Some(DEAD), None)]));
        let findings = Arc::new(InMemoryFindingRepository::new());
        let oracle = oracle_with(
            ScriptedBackend::replying(["yes", "The cited article no longer exists at this address."]),
            true,
        );

        supervisor(link_detector(), &citations, &findings, oracle)
            .run(&RunParams::default())
            .await
            .unwrap();

        assert_eq!(
            findings.findings()[0].details,
            "The cited article no longer exists at this address."
        );
    }

    #[tokio::test]
    async fn failing_oracle_still_records_findings() {
        let citations = Arc::new(InMemoryCitationRepository::new(vec![sample_citation(Some(DEAD), None)]));
        let findings = Arc::new(InMemoryFindingRepository::new());
        let oracle = oracle_with(ScriptedBackend::failing(), true);

        let stats = supervisor(link_detector(), &citations, &findings, oracle)
            .run(&RunParams::default())
            .await
            .unwrap();

        assert_eq!(stats.found, 1);
        assert_eq!(
            findings.findings()[0].details,
            "URL https://journal.example/gone is not accessible: HTTP 404 (HTTP 404)"
        );
    }

    #[tokio::test]
    async fn failed_check_is_left_unstamped() {
        let citation = sample_citation(None, Some("10.1234/abc"));
        let citations = Arc::new(InMemoryCitationRepository::new(vec![citation]));
        let findings = Arc::new(InMemoryFindingRepository::new());
        let detector = retraction_detector(InMemoryRetractionCache::new().failing_lookups());

        let stats = supervisor(detector, &citations, &findings, Arc::new(TriageOracle::disabled()))
            .run(&RunParams::default())
            .await
            .unwrap();

        assert_eq!(stats, RunStats { checked: 0, found: 0, rejected: 0, failed: 1 });
        assert!(citations.stamped().is_empty());
    }

    #[tokio::test]
    async fn unavailable_finding_store_aborts_the_run() {
        let citations = Arc::new(InMemoryCitationRepository::new(vec![
            sample_citation(Some(DEAD), None),
            sample_citation(Some(DEAD), None),
        ]));
        let findings = Arc::new(InMemoryFindingRepository::new());
        findings.set_unavailable(true);

        let err = supervisor(link_detector(), &citations, &findings, Arc::new(TriageOracle::disabled()))
            .run(&RunParams::default())
            .await
            .unwrap_err();

        assert!(err.is_fatal());
        assert!(citations.stamped().is_empty());
    }

    #[tokio::test]
    async fn unavailable_retraction_cache_aborts_the_run() {
        let citations = Arc::new(InMemoryCitationRepository::new(vec![sample_citation(None, Some("10.1234/abc"))]));
        let findings = Arc::new(InMemoryFindingRepository::new());
        let detector = retraction_detector(InMemoryRetractionCache::new().unavailable());

        let result = supervisor(detector, &citations, &findings, Arc::new(TriageOracle::disabled()))
            .run(&RunParams::default())
            .await;

        assert!(result.unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn batch_limit_caps_processed_citations() {
        let citations = Arc::new(InMemoryCitationRepository::new(
            (0..4).map(|_| sample_citation(Some(ALIVE), None)).collect(),
        ));
        let findings = Arc::new(InMemoryFindingRepository::new());
        let params = RunParams {
            batch_limit: 3,
            ..RunParams::default()
        };

        let stats = supervisor(link_detector(), &citations, &findings, Arc::new(TriageOracle::disabled()))
            .run(&params)
            .await
            .unwrap();

        assert_eq!(stats.checked, 3);
        assert_eq!(citations.stamped().len(), 3);
    }

    #[tokio::test]
    async fn sweep_covers_recently_checked_citations_without_stamping() {
        let mut recent = sample_citation(None, Some("10.1234/abc"));
        recent.last_checked = Some(chrono::Utc::now());
        let citations = Arc::new(InMemoryCitationRepository::new(vec![recent]));
        let findings = Arc::new(InMemoryFindingRepository::new());
        let detector = retraction_detector(InMemoryRetractionCache::new().with(retracted("10.1234/abc")));
        let sup = supervisor(detector, &citations, &findings, Arc::new(TriageOracle::disabled()));

        let regular = sup.run(&RunParams::default()).await.unwrap();
        assert_eq!(regular.checked, 0);

        let swept = sup.sweep_retractions(RunOptions::default()).await.unwrap();
        assert_eq!(swept.found, 1);
        assert!(citations.stamped().is_empty());
    }

    #[tokio::test]
    async fn sweep_requires_retraction_detector() {
        let citations = Arc::new(InMemoryCitationRepository::new(Vec::new()));
        let findings = Arc::new(InMemoryFindingRepository::new());
        let sup = supervisor(link_detector(), &citations, &findings, Arc::new(TriageOracle::disabled()));

        let err = sup.sweep_retractions(RunOptions::default()).await.unwrap_err();
        assert!(matches!(err, DetectorError::Unsupported("broken_link")));
    }
}
