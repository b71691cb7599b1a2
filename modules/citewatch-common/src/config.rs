use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use crate::types::ProblemType;

const DEFAULT_USER_AGENT: &str = "citewatch/0.1 (citation verification bot)";
const DEFAULT_TRIAGE_MODEL: &str = "claude-haiku-4-5-20251001";
const DEFAULT_REGISTRY_URL: &str =
    "https://retractionwatch.com/wp-content/uploads/retraction-watch-database.csv";

/// Application configuration loaded from environment variables.
///
/// Components never read the environment themselves: they receive one of the
/// typed sub-configs below at construction.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Triage backend
    pub anthropic_api_key: Option<String>,
    pub triage_model: String,
    pub triage_budget: u64,

    // Outbound HTTP
    pub user_agent: String,
    pub contact_email: Option<String>,
    pub check_timeout: Duration,
    pub rate_limit_delay: Duration,

    // Detectors
    pub similarity_threshold: f64,
    pub staleness_days: u32,
    pub batch_limit: u32,
    pub remote_retraction_lookups: bool,
    pub bootstrap_snapshots: bool,
    pub detectors: Vec<ProblemType>,

    // Retraction registry maintenance
    pub refresh_retraction_registry: bool,
    pub retraction_registry_url: String,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let similarity_threshold: f64 = parse_or(&lookup, "SIMILARITY_THRESHOLD", 0.80)?;
        if !(0.0..=1.0).contains(&similarity_threshold) {
            return Err(ConfigError::Invalid {
                key: "SIMILARITY_THRESHOLD".to_string(),
                value: similarity_threshold.to_string(),
            });
        }

        let detectors = match lookup("DETECTORS") {
            Some(raw) => raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| {
                    s.parse::<ProblemType>().map_err(|_| ConfigError::Invalid {
                        key: "DETECTORS".to_string(),
                        value: s.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![
                ProblemType::BrokenLink,
                ProblemType::Retraction,
                ProblemType::SourceChange,
            ],
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .ok_or_else(|| ConfigError::Missing("DATABASE_URL".to_string()))?,
            anthropic_api_key: lookup("ANTHROPIC_API_KEY"),
            triage_model: lookup("TRIAGE_MODEL").unwrap_or_else(|| DEFAULT_TRIAGE_MODEL.to_string()),
            triage_budget: parse_or(&lookup, "TRIAGE_BUDGET", 50)?,
            user_agent: lookup("USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            contact_email: lookup("CONTACT_EMAIL"),
            check_timeout: Duration::from_secs(parse_or(&lookup, "CHECK_TIMEOUT_SECS", 15)?),
            rate_limit_delay: parse_secs_or(&lookup, "RATE_LIMIT_DELAY_SECS", 1.0)?,
            similarity_threshold,
            staleness_days: parse_or(&lookup, "STALENESS_DAYS", 7)?,
            batch_limit: parse_or(&lookup, "BATCH_LIMIT", 100)?,
            remote_retraction_lookups: parse_or(&lookup, "REMOTE_RETRACTION_LOOKUPS", false)?,
            bootstrap_snapshots: parse_or(&lookup, "BOOTSTRAP_SNAPSHOTS", false)?,
            detectors,
            refresh_retraction_registry: parse_or(&lookup, "REFRESH_RETRACTION_REGISTRY", false)?,
            retraction_registry_url: lookup("RETRACTION_REGISTRY_URL")
                .unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string()),
        })
    }

    /// Log the effective configuration with secrets redacted.
    pub fn log_redacted(&self) {
        let triage_backend = match self.anthropic_api_key {
            Some(_) => "claude",
            None => "none",
        };
        info!(
            triage_backend,
            triage_model = self.triage_model.as_str(),
            triage_budget = self.triage_budget,
            check_timeout_secs = self.check_timeout.as_secs(),
            rate_limit_delay_ms = self.rate_limit_delay.as_millis() as u64,
            similarity_threshold = self.similarity_threshold,
            staleness_days = self.staleness_days,
            batch_limit = self.batch_limit,
            remote_retraction_lookups = self.remote_retraction_lookups,
            bootstrap_snapshots = self.bootstrap_snapshots,
            refresh_retraction_registry = self.refresh_retraction_registry,
            detectors = ?self.detectors,
            "Loaded configuration"
        );
    }

    pub fn http(&self) -> HttpConfig {
        HttpConfig {
            user_agent: self.user_agent.clone(),
            timeout: self.check_timeout,
            min_interval: self.rate_limit_delay,
        }
    }

    pub fn remote_apis(&self) -> RemoteApiConfig {
        RemoteApiConfig {
            http: self.http(),
            contact_email: self.contact_email.clone(),
            ..RemoteApiConfig::default()
        }
    }

    pub fn drift(&self) -> DriftConfig {
        DriftConfig {
            similarity_threshold: self.similarity_threshold,
            ..DriftConfig::default()
        }
    }

    pub fn resolver(&self) -> ResolverConfig {
        ResolverConfig::default()
    }

    pub fn oracle(&self) -> OracleConfig {
        OracleConfig {
            api_key: self.anthropic_api_key.clone(),
            model: self.triage_model.clone(),
            budget: self.triage_budget,
            ..OracleConfig::default()
        }
    }

    pub fn run_params(&self) -> RunParams {
        RunParams {
            staleness_days: self.staleness_days,
            batch_limit: self.batch_limit,
            options: RunOptions {
                remote_lookups: self.remote_retraction_lookups,
                bootstrap_snapshots: self.bootstrap_snapshots,
            },
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
    }
}

/// Fractional seconds. Negative, NaN and overflowing values are rejected.
fn parse_secs_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: f64,
) -> Result<Duration, ConfigError> {
    let secs: f64 = parse_or(lookup, key, default)?;
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: secs.to_string(),
    })
}

// --- Component configs ---

/// Settings shared by every outbound HTTP client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout: Duration,
    /// Minimum spacing between two calls made by the same client.
    pub min_interval: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(15),
            min_interval: Duration::from_secs(1),
        }
    }
}

/// Settings for the remote retraction sources and the snapshot archive.
#[derive(Debug, Clone)]
pub struct RemoteApiConfig {
    pub http: HttpConfig,
    pub contact_email: Option<String>,
    /// PubMed allows three requests per second without an API key.
    pub bibliographic_index_interval: Duration,
    pub publisher_metadata_interval: Duration,
    pub archive_interval: Duration,
    /// Capture requests are slow on the archive side.
    pub capture_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for RemoteApiConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            contact_email: None,
            bibliographic_index_interval: Duration::from_millis(340),
            publisher_metadata_interval: Duration::from_secs(1),
            archive_interval: Duration::from_secs(1),
            capture_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DriftConfig {
    /// Drift is signaled strictly below this similarity.
    pub similarity_threshold: f64,
    /// At or below this similarity the finding is high severity.
    pub high_severity_ceiling: f64,
    /// Extracted texts are truncated to this many characters before alignment.
    pub max_compare_chars: usize,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.80,
            high_severity_ceiling: 0.50,
            max_compare_chars: 20_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Upsert remote matches into the retraction cache.
    pub write_back: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { write_back: true }
    }
}

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: Option<String>,
    pub model: String,
    /// Problem types accepted without asking for a verdict.
    pub trusted: Vec<ProblemType>,
    /// Ask the backend to rewrite accepted details into reviewer prose.
    pub rewrite_details: bool,
    /// Backend calls allowed per run; past it the oracle fails open.
    pub budget: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_TRIAGE_MODEL.to_string(),
            trusted: vec![ProblemType::Retraction],
            rewrite_details: true,
            budget: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Query the remote retraction sources after a cache miss.
    pub remote_lookups: bool,
    /// Let the drift detector select citations without a snapshot and create one.
    pub bootstrap_snapshots: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParams {
    pub staleness_days: u32,
    pub batch_limit: u32,
    pub options: RunOptions,
}

impl RunParams {
    pub fn staleness_window(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.staleness_days))
    }
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            staleness_days: 7,
            batch_limit: 100,
            options: RunOptions::default(),
        }
    }
}
