use std::net::SocketAddr;
use std::path::PathBuf;

use crate::pipeline::triage::{RuleSet, TriageError};

/// Application-level constants
pub const APP_NAME: &str = "Symptom Triage";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_LLM_MODEL: &str = "medgemma";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 10;

/// Local front-end dev servers allowed by CORS when nothing is configured.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 6] = [
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:3001",
    "http://127.0.0.1:3001",
    "http://localhost:5173",
    "http://127.0.0.1:5173",
];

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "symptom_triage_lib=info,symptom_triage=info,tower_http=info"
}

/// Which engines this deployment can use, decided once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCapability {
    PrimaryAndFallback,
    FallbackOnly,
}

/// Startup configuration, resolved from the environment once.
#[derive(Debug, Clone, PartialEq)]
pub struct TriageConfig {
    pub bind_addr: SocketAddr,
    pub llm_url: Option<String>,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_timeout_secs: u64,
    pub backend_url: Option<String>,
    pub backend_timeout_secs: u64,
    pub rules_path: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
}

impl TriageConfig {
    /// Read `TRIAGE_*` variables from the process environment.
    pub fn from_env() -> Result<Self, TriageError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary variable lookup.
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TriageError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_addr = get("TRIAGE_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| TriageError::Configuration(format!("TRIAGE_BIND_ADDR: {e}")))?;

        let allowed_origins: Vec<String> = match get("TRIAGE_ALLOWED_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };
        // Credentialed CORS cannot use a wildcard origin.
        if allowed_origins.iter().any(|o| o == "*") {
            return Err(TriageError::Configuration(
                "TRIAGE_ALLOWED_ORIGINS: list explicit origins, '*' is not allowed".into(),
            ));
        }

        Ok(Self {
            bind_addr,
            llm_url: get("TRIAGE_LLM_URL"),
            llm_model: get("TRIAGE_LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_api_key: get("TRIAGE_LLM_API_KEY"),
            llm_timeout_secs: parse_secs(get("TRIAGE_LLM_TIMEOUT_SECS"), "TRIAGE_LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS)?,
            backend_url: get("TRIAGE_BACKEND_URL"),
            backend_timeout_secs: parse_secs(
                get("TRIAGE_BACKEND_TIMEOUT_SECS"),
                "TRIAGE_BACKEND_TIMEOUT_SECS",
                DEFAULT_BACKEND_TIMEOUT_SECS,
            )?,
            rules_path: get("TRIAGE_RULES_PATH").map(PathBuf::from),
            allowed_origins,
        })
    }

    /// A primary engine exists only when its endpoint is configured.
    pub fn capability(&self) -> EngineCapability {
        if self.llm_url.is_some() {
            EngineCapability::PrimaryAndFallback
        } else {
            EngineCapability::FallbackOnly
        }
    }

    /// Rule file from `TRIAGE_RULES_PATH`, or the bundled one.
    pub fn load_rules(&self) -> Result<RuleSet, TriageError> {
        match &self.rules_path {
            Some(path) => RuleSet::from_path(path),
            None => RuleSet::bundled(),
        }
    }
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            llm_url: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_api_key: None,
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            backend_url: None,
            backend_timeout_secs: DEFAULT_BACKEND_TIMEOUT_SECS,
            rules_path: None,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

fn parse_secs(value: Option<String>, key: &str, default: u64) -> Result<u64, TriageError> {
    match value {
        None => Ok(default),
        Some(raw) => match raw.parse::<u64>() {
            Ok(0) | Err(_) => Err(TriageError::Configuration(format!(
                "{key} must be a positive number of seconds, got {raw:?}"
            ))),
            Ok(secs) => Ok(secs),
        },
    }
}
