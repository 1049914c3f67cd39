use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::backend::HttpBackendClient;
use super::builder::build_request;
use super::engine::{LlmTriageEngine, RuleTriageEngine, TriageEngine};
use super::generator::OllamaGenerator;
use super::rules::RuleSet;
use super::types::{SymptomInput, TriageRequest, TriageVerdict};
use super::TriageError;
use crate::config::{EngineCapability, TriageConfig};

/// Bound on the primary engine call when none is configured.
pub const DEFAULT_PRIMARY_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the primary engine to completion (or timeout) and falls back to the
/// deterministic engine exactly once on any engine failure.
pub struct TriageService {
    primary: Option<Arc<dyn TriageEngine>>,
    fallback: Arc<dyn TriageEngine>,
    primary_timeout: Duration,
}

impl TriageService {
    pub fn new(
        primary: Option<Arc<dyn TriageEngine>>,
        fallback: Arc<dyn TriageEngine>,
        primary_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            primary_timeout,
        }
    }

    /// Service for deployments without a primary engine.
    pub fn fallback_only(fallback: Arc<dyn TriageEngine>) -> Self {
        Self::new(None, fallback, DEFAULT_PRIMARY_TIMEOUT)
    }

    /// Wire engines from startup configuration. `rules` serves as the
    /// fallback unless a remote rule service is configured.
    pub fn from_config(config: &TriageConfig, rules: Arc<RuleSet>) -> Result<Self, TriageError> {
        let primary: Option<Arc<dyn TriageEngine>> = match (config.capability(), &config.llm_url) {
            (EngineCapability::PrimaryAndFallback, Some(url)) => {
                let generator = OllamaGenerator::new(
                    url,
                    &config.llm_model,
                    config.llm_api_key.clone(),
                    config.llm_timeout_secs,
                )?;
                tracing::info!(url = %url, model = generator.model(), "Primary engine endpoint configured");
                Some(Arc::new(LlmTriageEngine::new(Arc::new(generator))))
            }
            _ => None,
        };

        let fallback: Arc<dyn TriageEngine> = match &config.backend_url {
            Some(url) => Arc::new(RuleTriageEngine::new(Arc::new(HttpBackendClient::new(
                url,
                config.backend_timeout_secs,
            )?))),
            None => Arc::new(RuleTriageEngine::new(rules)),
        };

        tracing::info!(
            primary = primary.as_ref().map(|p| p.name()).unwrap_or("none"),
            fallback = fallback.name(),
            "Triage engines configured"
        );

        Ok(Self::new(
            primary,
            fallback,
            Duration::from_secs(config.llm_timeout_secs),
        ))
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Build a request from raw input, then triage it.
    pub async fn triage_input(&self, input: &SymptomInput) -> Result<TriageVerdict, TriageError> {
        let request = build_request(input)?;
        self.triage(&request).await
    }

    /// Classify a request. Engine failures never surface; only a failure of
    /// the fallback yields `TriageUnavailable`.
    pub async fn triage(&self, request: &TriageRequest) -> Result<TriageVerdict, TriageError> {
        let span = tracing::info_span!("triage", fingerprint = %request.fingerprint());
        self.run(request).instrument(span).await
    }

    /// Like [`triage`](Self::triage), abandoned as soon as `token` is
    /// cancelled. Dropping the in-flight future aborts any pending engine call.
    pub async fn triage_until_cancelled(
        &self,
        request: &TriageRequest,
        token: &CancellationToken,
    ) -> Result<TriageVerdict, TriageError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::info!(fingerprint = %request.fingerprint(), "Triage cancelled by caller");
                Err(TriageError::Cancelled)
            }
            result = self.triage(request) => result,
        }
    }

    async fn run(&self, request: &TriageRequest) -> Result<TriageVerdict, TriageError> {
        match &self.primary {
            Some(primary) => match self.attempt_primary(primary.as_ref(), request).await {
                Ok(verdict) => {
                    tracing::info!(
                        engine = primary.name(),
                        urgency = %verdict.urgency_level(),
                        confidence = verdict.confidence(),
                        "Triage completed by primary engine"
                    );
                    return Ok(verdict);
                }
                Err(e) => {
                    tracing::warn!(
                        engine = primary.name(),
                        kind = e.kind(),
                        error = %e,
                        "Primary engine failed, using fallback"
                    );
                }
            },
            None => {
                tracing::debug!(
                    kind = "engine_unavailable",
                    "No primary engine configured, using fallback"
                );
            }
        }

        match self.fallback.assess(request).await {
            Ok(verdict) => {
                tracing::info!(
                    engine = self.fallback.name(),
                    urgency = %verdict.urgency_level(),
                    confidence = verdict.confidence(),
                    "Triage completed by fallback engine"
                );
                Ok(verdict)
            }
            Err(e) => {
                tracing::error!(
                    engine = self.fallback.name(),
                    kind = e.kind(),
                    error = %e,
                    "Fallback engine failed"
                );
                Err(TriageError::TriageUnavailable(
                    "no triage engine could classify the request".into(),
                ))
            }
        }
    }

    async fn attempt_primary(
        &self,
        primary: &dyn TriageEngine,
        request: &TriageRequest,
    ) -> Result<TriageVerdict, TriageError> {
        match tokio::time::timeout(self.primary_timeout, primary.assess(request)).await {
            Ok(result) => result,
            Err(_) => Err(TriageError::EngineTransport(format!(
                "Request timed out after {}ms",
                self.primary_timeout.as_millis()
            ))),
        }
    }
}
