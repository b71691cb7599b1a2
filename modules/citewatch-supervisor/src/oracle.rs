// Triage oracle: a precision filter between detectors and the finding store.
// Every failure mode resolves to "accept with the original details".

use std::sync::Arc;

use async_trait::async_trait;
use citewatch_common::{Citation, OracleConfig, ProblemType};
use tracing::{debug, info, warn};

use crate::allowance::CallAllowance;

const VERDICT_SYSTEM: &str = "You are an encyclopedia citation verification assistant. \
Your job is to quickly assess if a citation problem is real and worth reporting to editors.

Consider:
- Is this a permanent problem or a temporary issue?
- Is this significant enough to warrant editor attention?
- Could this be a false positive (e.g. a temporary server issue, a minor formatting change)?

Respond with ONLY \"yes\" if this is a real problem worth reporting, or \"no\" if it is likely a false positive.";

const EXPLAIN_SYSTEM: &str = "You are an encyclopedia citation verification assistant. \
Write a clear, concise explanation of a citation problem that editors can act on. \
Focus on what the problem is and why it matters.";

const VERDICT_MAX_TOKENS: u32 = 10;
const EXPLAIN_MAX_TOKENS: u32 = 150;

/// Generative text backend used for verdicts and rewrites.
#[async_trait]
pub trait TriageBackend: Send + Sync {
    async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> anyhow::Result<String>;
}

/// Lightweight citation context handed to the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewContext {
    pub source_title: Option<String>,
    pub article_title: String,
    pub ordinal: Option<i32>,
}

impl ReviewContext {
    pub fn for_citation(citation: &Citation) -> Self {
        Self {
            source_title: citation.source.title.clone(),
            article_title: citation.article_title.clone(),
            ordinal: Some(citation.ordinal),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub accept: bool,
    pub details: String,
}

impl Verdict {
    fn accept(details: &str) -> Self {
        Self {
            accept: true,
            details: details.to_string(),
        }
    }
}

pub struct TriageOracle {
    backend: Option<Arc<dyn TriageBackend>>,
    config: OracleConfig,
    allowance: CallAllowance,
}

impl TriageOracle {
    pub fn new(backend: Option<Arc<dyn TriageBackend>>, config: OracleConfig) -> Self {
        let allowance = CallAllowance::new(config.budget);
        Self {
            backend,
            config,
            allowance,
        }
    }

    /// An oracle that accepts everything unchanged.
    pub fn disabled() -> Self {
        Self::new(None, OracleConfig::default())
    }

    pub fn allowance(&self) -> &CallAllowance {
        &self.allowance
    }

    /// Refill the backend call allowance for a new orchestrator run.
    pub fn begin_run(&self) {
        let previous = self.allowance.renew();
        debug!(previous_run_calls = previous, "Triage allowance renewed");
    }

    pub async fn review(&self, problem_type: ProblemType, details: &str, context: &ReviewContext) -> Verdict {
        let Some(backend) = &self.backend else {
            return Verdict::accept(details);
        };

        if !self.config.trusted.contains(&problem_type) {
            match self.verdict(backend.as_ref(), problem_type, details, context).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(problem_type = %problem_type, "Oracle rejected signal");
                    return Verdict {
                        accept: false,
                        details: details.to_string(),
                    };
                }
                Err(e) => {
                    warn!(problem_type = %problem_type, error = %e, "Triage verdict failed, accepting signal");
                    return Verdict::accept(details);
                }
            }
        }

        if !self.config.rewrite_details {
            return Verdict::accept(details);
        }
        match self.explain(backend.as_ref(), problem_type, details, context).await {
            Ok(rewritten) => Verdict {
                accept: true,
                details: rewritten,
            },
            Err(e) => {
                warn!(problem_type = %problem_type, error = %e, "Details rewrite failed, keeping original");
                Verdict::accept(details)
            }
        }
    }

    fn claim_call(&self) -> anyhow::Result<()> {
        if self.allowance.claim() {
            return Ok(());
        }
        info!(spent = self.allowance.spent(), "Triage allowance exhausted for this run");
        anyhow::bail!("triage allowance exhausted")
    }

    async fn verdict(
        &self,
        backend: &dyn TriageBackend,
        problem_type: ProblemType,
        details: &str,
        context: &ReviewContext,
    ) -> anyhow::Result<bool> {
        self.claim_call()?;
        let user = format!(
            "Assess this citation problem:\n\n{}\n\nIs this a real problem worth reporting to editors? Respond with only \"yes\" or \"no\".",
            describe(problem_type, details, context, false)
        );
        let answer = backend.complete(VERDICT_SYSTEM, &user, VERDICT_MAX_TOKENS).await?;
        parse_verdict(&answer)
    }

    async fn explain(
        &self,
        backend: &dyn TriageBackend,
        problem_type: ProblemType,
        details: &str,
        context: &ReviewContext,
    ) -> anyhow::Result<String> {
        self.claim_call()?;
        let user = format!(
            "Explain this citation problem in 2-3 sentences:\n\n{}\n\nProvide a clear explanation that helps editors understand the issue.",
            describe(problem_type, details, context, true)
        );
        let text = backend.complete(EXPLAIN_SYSTEM, &user, EXPLAIN_MAX_TOKENS).await?;
        let text = text.trim();
        if text.is_empty() {
            anyhow::bail!("empty explanation");
        }
        Ok(text.to_string())
    }
}

fn describe(problem_type: ProblemType, details: &str, context: &ReviewContext, with_ordinal: bool) -> String {
    let mut out = format!("Problem Type: {problem_type}\nDetails: {details}");
    if let Some(title) = &context.source_title {
        out.push_str(&format!("\nSource: {title}"));
    }
    if !context.article_title.is_empty() {
        out.push_str(&format!("\nArticle: {}", context.article_title));
    }
    if let (true, Some(ordinal)) = (with_ordinal, context.ordinal) {
        out.push_str(&format!("\nCitation Number: {ordinal}"));
    }
    out
}

/// Only an explicit yes or no counts as an answer.
fn parse_verdict(answer: &str) -> anyhow::Result<bool> {
    let word: String = answer
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .chars()
        .take_while(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    match word.as_str() {
        "yes" => Ok(true),
        "no" => Ok(false),
        _ => anyhow::bail!("unrecognised verdict: {answer:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;

    fn context() -> ReviewContext {
        ReviewContext {
            source_title: Some("Annual report".to_string()),
            article_title: "Photosynthesis".to_string(),
            ordinal: Some(3),
        }
    }

    fn oracle(backend: &Arc<ScriptedBackend>, config: OracleConfig) -> TriageOracle {
        TriageOracle::new(Some(backend.clone()), config)
    }

    fn no_rewrite() -> OracleConfig {
        OracleConfig {
            rewrite_details: false,
            ..OracleConfig::default()
        }
    }

    #[tokio::test]
    async fn no_backend_accepts_unchanged() {
        let verdict = TriageOracle::disabled()
            .review(ProblemType::BrokenLink, "URL is gone", &context())
            .await;
        assert_eq!(verdict, Verdict::accept("URL is gone"));
    }

    #[tokio::test]
    async fn failing_backend_fails_open() {
        let backend = Arc::new(ScriptedBackend::failing());
        let verdict = oracle(&backend, OracleConfig::default())
            .review(ProblemType::SourceChange, "changed", &context())
            .await;
        assert!(verdict.accept);
        assert_eq!(verdict.details, "changed");
    }

    #[tokio::test]
    async fn no_rejects_signal() {
        let backend = Arc::new(ScriptedBackend::replying(["No."]));
        let verdict = oracle(&backend, no_rewrite())
            .review(ProblemType::BrokenLink, "HTTP 503", &context())
            .await;
        assert!(!verdict.accept);
    }

    #[tokio::test]
    async fn yes_accepts_and_rewrites() {
        let backend = Arc::new(ScriptedBackend::replying(["Yes", "  The cited page no longer exists.  "]));
        let verdict = oracle(&backend, OracleConfig::default())
            .review(ProblemType::BrokenLink, "HTTP 404", &context())
            .await;
        assert!(verdict.accept);
        assert_eq!(verdict.details, "The cited page no longer exists.");

        let prompts = backend.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Problem Type: broken_link"));
        assert!(prompts[0].contains("Source: Annual report"));
        assert!(prompts[1].contains("Citation Number: 3"));
    }

    #[tokio::test]
    async fn unrecognised_answer_fails_open() {
        let backend = Arc::new(ScriptedBackend::replying(["Maybe, hard to say"]));
        let verdict = oracle(&backend, no_rewrite())
            .review(ProblemType::BrokenLink, "HTTP 500", &context())
            .await;
        assert!(verdict.accept);
    }

    #[tokio::test]
    async fn empty_rewrite_keeps_original_details() {
        let backend = Arc::new(ScriptedBackend::replying(["yes", "   "]));
        let verdict = oracle(&backend, OracleConfig::default())
            .review(ProblemType::SourceChange, "changed", &context())
            .await;
        assert_eq!(verdict, Verdict::accept("changed"));
    }

    #[tokio::test]
    async fn trusted_types_skip_the_verdict() {
        let backend = Arc::new(ScriptedBackend::replying(["A retracted paper is cited."]));
        let verdict = oracle(&backend, OracleConfig::default())
            .review(ProblemType::Retraction, "Paper was retracted", &context())
            .await;
        assert!(verdict.accept);
        assert_eq!(verdict.details, "A retracted paper is cited.");
        assert_eq!(backend.prompts().len(), 1);
    }

    #[tokio::test]
    async fn exhausted_allowance_fails_open_without_calling_backend() {
        let backend = Arc::new(ScriptedBackend::replying(["no", "no"]));
        let config = OracleConfig {
            budget: 1,
            rewrite_details: false,
            ..OracleConfig::default()
        };
        let oracle = oracle(&backend, config);

        assert!(!oracle.review(ProblemType::BrokenLink, "a", &context()).await.accept);
        assert!(oracle.review(ProblemType::BrokenLink, "b", &context()).await.accept);
        assert_eq!(backend.prompts().len(), 1);
    }

    #[tokio::test]
    async fn begin_run_restores_the_allowance() {
        let backend = Arc::new(ScriptedBackend::replying(["no", "no"]));
        let config = OracleConfig {
            budget: 1,
            rewrite_details: false,
            ..OracleConfig::default()
        };
        let oracle = oracle(&backend, config);

        assert!(!oracle.review(ProblemType::BrokenLink, "a", &context()).await.accept);
        assert_eq!(oracle.allowance().left(), 0);

        oracle.begin_run();
        assert!(!oracle.review(ProblemType::BrokenLink, "b", &context()).await.accept);
        assert_eq!(backend.prompts().len(), 2);
    }

    #[test]
    fn verdict_parsing() {
        assert!(parse_verdict("Yes").unwrap());
        assert!(parse_verdict("\"yes\" - it is gone").unwrap());
        assert!(!parse_verdict(" no.").unwrap());
        assert!(parse_verdict("").is_err());
        assert!(parse_verdict("Unsure").is_err());
        assert!(parse_verdict("Not sure").is_err());
    }
}
