use std::sync::Arc;

use async_trait::async_trait;

use super::fallback::{adapt_backend_verdict, BackendClassifier, BackendQuery};
use super::generator::{InstructionDocument, SamplingParams, TextGenerator};
use super::parser::parse_triage_response;
use super::prompt::{build_triage_prompt, TRIAGE_SYSTEM_PROMPT};
use super::types::{TriageRequest, TriageVerdict, VerdictSource};
use super::TriageError;

/// A way of turning a request into a verdict. The orchestrator holds one
/// primary and one fallback engine and never branches on their kind.
#[async_trait]
pub trait TriageEngine: Send + Sync {
    async fn assess(&self, request: &TriageRequest) -> Result<TriageVerdict, TriageError>;

    fn source(&self) -> VerdictSource;

    fn name(&self) -> &str;
}

/// Language-model engine: prompt, generate, parse.
pub struct LlmTriageEngine {
    generator: Arc<dyn TextGenerator>,
    params: SamplingParams,
}

impl LlmTriageEngine {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            params: SamplingParams::default(),
        }
    }

    pub fn with_params(mut self, params: SamplingParams) -> Self {
        self.params = params;
        self
    }
}

#[async_trait]
impl TriageEngine for LlmTriageEngine {
    async fn assess(&self, request: &TriageRequest) -> Result<TriageVerdict, TriageError> {
        let instruction = InstructionDocument {
            system: TRIAGE_SYSTEM_PROMPT.trim().to_string(),
            prompt: build_triage_prompt(request),
        };

        let text = self.generator.generate(&instruction, &self.params).await?;
        if text.trim().is_empty() {
            return Err(TriageError::EngineMalformedOutput(
                "engine returned no text".into(),
            ));
        }

        Ok(parse_triage_response(&text))
    }

    fn source(&self) -> VerdictSource {
        VerdictSource::PrimaryEngine
    }

    fn name(&self) -> &str {
        self.generator.name()
    }
}

/// Deterministic engine backed by a rule classifier.
pub struct RuleTriageEngine {
    backend: Arc<dyn BackendClassifier>,
}

impl RuleTriageEngine {
    pub fn new(backend: Arc<dyn BackendClassifier>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl TriageEngine for RuleTriageEngine {
    async fn assess(&self, request: &TriageRequest) -> Result<TriageVerdict, TriageError> {
        let query = BackendQuery::from(request);
        let answer = self.backend.classify(&query).await?;
        Ok(adapt_backend_verdict(&answer))
    }

    fn source(&self) -> VerdictSource {
        VerdictSource::FallbackRules
    }

    fn name(&self) -> &str {
        self.backend.name()
    }
}
