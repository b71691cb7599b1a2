use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use citewatch_archive::{HttpTransport, ReqwestTransport, UrlHealthChecker, WaybackClient};
use citewatch_common::{CitationRepository, Config, FindingRepository, ProblemType, RetractionCache};
use citewatch_retraction::{CrossrefClient, PubMedClient, RegistrySync, RetractionResolver};
use citewatch_store::{PgCitationStore, PgFindingStore, PgRetractionCache};
use citewatch_supervisor::checks::source_change::DriftDetector;
use citewatch_supervisor::llm::ClaudeBackend;
use citewatch_supervisor::{Detector, Supervisor, TriageBackend, TriageOracle};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("citewatch=info".parse()?))
        .init();

    info!("Citewatch starting...");

    let config = Config::from_env()?;
    config.log_redacted();

    let pool = citewatch_store::connect(&config.database_url).await?;
    citewatch_store::migrate(&pool).await?;

    let citations: Arc<dyn CitationRepository> = Arc::new(PgCitationStore::new(pool.clone()));
    let findings: Arc<dyn FindingRepository> = Arc::new(PgFindingStore::new(pool.clone()));
    let cache: Arc<dyn RetractionCache> = Arc::new(PgRetractionCache::new(pool));

    let backend: Option<Arc<dyn TriageBackend>> = match &config.anthropic_api_key {
        Some(key) => {
            info!(model = config.triage_model.as_str(), "Triage backend enabled");
            Some(Arc::new(ClaudeBackend::new(key, &config.triage_model)?))
        }
        None => {
            info!("No ANTHROPIC_API_KEY set, every signal will be accepted as-is");
            None
        }
    };
    let oracle = Arc::new(TriageOracle::new(backend, config.oracle()));

    let remote = config.remote_apis();
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(&config.http())?);
    let params = config.run_params();

    let mut registry_refreshed = false;
    if config.refresh_retraction_registry {
        let registry = RegistrySync::new(config.retraction_registry_url.as_str(), &config.http())?;
        let report = registry.sync(cache.as_ref()).await?;
        info!("Retraction registry refreshed. {report}");
        registry_refreshed = true;
    }

    for &problem_type in &config.detectors {
        let detector = match problem_type {
            ProblemType::BrokenLink => Detector::BrokenLink(UrlHealthChecker::new(transport.clone())),
            ProblemType::Retraction => {
                let resolver = RetractionResolver::new(cache.clone(), config.resolver())
                    .with_bibliographic_index(Arc::new(PubMedClient::new(&remote)?))
                    .with_publisher_metadata(Arc::new(CrossrefClient::new(&remote)?));
                Detector::Retraction(resolver)
            }
            ProblemType::SourceChange => Detector::SourceChange(DriftDetector::new(
                transport.clone(),
                Arc::new(WaybackClient::new(&remote)?),
                citations.clone(),
                config.drift(),
            )),
            ProblemType::EvidenceWeak => {
                warn!(detector = %problem_type, "No detector implements this problem type, skipping");
                continue;
            }
        };

        let supervisor = Supervisor::new(detector, citations.clone(), findings.clone(), oracle.clone());
        let stats = if problem_type == ProblemType::Retraction && registry_refreshed {
            supervisor.sweep_retractions(params.options).await?
        } else {
            supervisor.run(&params).await?
        };
        info!(detector = %problem_type, "Detector finished. {stats}");
    }

    info!("Citewatch complete");
    Ok(())
}
