use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::TriageError;

/// Sampling settings for the engine call. Low temperature favours
/// reproducible classifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

/// System instruction plus per-request prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionDocument {
    pub system: String,
    pub prompt: String,
}

/// Text-generation engine abstraction (allows mocking).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        instruction: &InstructionDocument,
        params: &SamplingParams,
    ) -> Result<String, TriageError>;

    /// Short label for logs.
    fn name(&self) -> &str;
}

/// HTTP client for an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaGenerator {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl std::fmt::Debug for OllamaGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaGenerator")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl OllamaGenerator {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, TriageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TriageError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client,
            timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Request body for `/api/generate`.
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    num_predict: u32,
}

impl From<&SamplingParams> for GenerateOptions {
    fn from(params: &SamplingParams) -> Self {
        Self {
            temperature: params.temperature,
            top_k: params.top_k,
            top_p: params.top_p,
            num_predict: params.max_output_tokens,
        }
    }
}

/// Response body from `/api/generate`.
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(
        &self,
        instruction: &InstructionDocument,
        params: &SamplingParams,
    ) -> Result<String, TriageError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt: &instruction.prompt,
            system: &instruction.system,
            stream: false,
            options: params.into(),
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                TriageError::EngineTransport(format!("cannot reach engine at {}", self.base_url))
            } else if e.is_timeout() {
                TriageError::EngineTransport(format!(
                    "Request timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                TriageError::EngineTransport(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(TriageError::EngineUnavailable(format!(
                "engine rejected credential (status {})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TriageError::EngineTransport(format!(
                "engine returned status {}: {}",
                status.as_u16(),
                truncate(&body, 200)
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| TriageError::EngineMalformedOutput(e.to_string()))?;

        Ok(parsed.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Scripted generator for tests: replays a response or an error and
/// records how often it was called.
pub struct MockGenerator {
    outcome: Result<String, TriageError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockGenerator {
    pub fn new(response: &str) -> Self {
        Self {
            outcome: Ok(response.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn failing(error: TriageError) -> Self {
        Self {
            outcome: Err(error),
            delay: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Sleep before answering, to exercise timeouts and cancellation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(
        &self,
        instruction: &InstructionDocument,
        _params: &SamplingParams,
    ) -> Result<String, TriageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(instruction.prompt.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }

    fn name(&self) -> &str {
        "mock"
    }
}
