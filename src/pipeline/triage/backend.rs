use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::fallback::{BackendClassifier, BackendQuery, BackendVerdict};
use super::TriageError;

/// Client for a remote rule service exposing `POST /api/triage`.
#[derive(Debug)]
pub struct HttpBackendClient {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpBackendClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, TriageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TriageError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Serialize)]
struct RemoteRequest<'a> {
    symptoms: &'a [String],
    severity: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<&'a str>,
    additional_factors: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    patient_age: Option<u32>,
}

#[derive(Deserialize)]
struct RemoteResponse {
    triage_label: String,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    matched_rules: Vec<RemoteRule>,
    #[serde(default)]
    timeframe: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    confidence_score: Option<f32>,
}

#[derive(Deserialize)]
struct RemoteRule {
    name: String,
}

impl From<RemoteResponse> for BackendVerdict {
    fn from(response: RemoteResponse) -> Self {
        Self {
            label: response.triage_label,
            rationale: response.explanation,
            matched_rules: response.matched_rules.into_iter().map(|r| r.name).collect(),
            timeframe: response.timeframe,
            action: response.action,
            confidence: response.confidence_score,
        }
    }
}

#[async_trait]
impl BackendClassifier for HttpBackendClient {
    async fn classify(&self, query: &BackendQuery) -> Result<BackendVerdict, TriageError> {
        let url = format!("{}/api/triage", self.base_url);
        let body = RemoteRequest {
            symptoms: &query.symptoms,
            severity: query.severity.as_str(),
            duration: query.duration.as_deref(),
            additional_factors: &query.additional_factors,
            temperature: query.temperature.as_deref(),
            patient_age: query.age,
        };

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                TriageError::EngineTransport(format!(
                    "Rule service timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                TriageError::EngineTransport(format!("rule service unreachable: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TriageError::EngineTransport(format!(
                "rule service returned status {}",
                status.as_u16()
            )));
        }

        let parsed: RemoteResponse = response
            .json()
            .await
            .map_err(|e| TriageError::EngineMalformedOutput(e.to_string()))?;

        Ok(parsed.into())
    }

    fn name(&self) -> &str {
        "remote_rules"
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    use super::*;
    use crate::pipeline::triage::types::Severity;

    fn query() -> BackendQuery {
        BackendQuery {
            symptoms: vec!["persistent cough".into(), "fatigue".into()],
            severity: Severity::Moderate,
            age: Some(52),
            duration: Some("3 weeks".into()),
            additional_factors: vec!["weight loss".into()],
            temperature: Some("99.1°F".into()),
        }
    }

    async fn spawn(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    #[test]
    fn base_url_trimmed() {
        let client = HttpBackendClient::new("http://rules.local:8000/", 10).unwrap();
        assert_eq!(client.base_url(), "http://rules.local:8000");
    }

    #[tokio::test]
    async fn classify_round_trips_original_wire_format() {
        let router = Router::new().route(
            "/api/triage",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["severity"], "moderate");
                assert_eq!(body["patient_age"], 52);
                assert_eq!(body["duration"], "3 weeks");
                assert_eq!(body["additional_factors"][0], "weight loss");
                assert_eq!(body["temperature"], "99.1°F");
                Json(serde_json::json!({
                    "session_id": "abc",
                    "triage_label": "SEE_DOCTOR_24H",
                    "urgency": "moderate",
                    "action": "Schedule an appointment with your doctor",
                    "timeframe": "Within 24-48 hours",
                    "matched_rules": [{"id": "yellow_persistent", "name": "Persistent symptoms", "category": "YELLOW", "confidence": 0.8}],
                    "explanation": "Symptoms that persist should be reviewed.",
                    "confidence_score": 0.8,
                    "timestamp": "2026-01-01T00:00:00"
                }))
            }),
        );
        let addr = spawn(router).await;
        let client = HttpBackendClient::new(&format!("http://{addr}"), 5).unwrap();
        let verdict = client.classify(&query()).await.unwrap();
        assert_eq!(verdict.label, "SEE_DOCTOR_24H");
        assert_eq!(verdict.matched_rules, ["Persistent symptoms"]);
        assert_eq!(verdict.timeframe.as_deref(), Some("Within 24-48 hours"));
        assert_eq!(verdict.confidence, Some(0.8));
    }

    #[tokio::test]
    async fn minimal_response_accepted() {
        let router = Router::new().route(
            "/api/triage",
            post(|| async { Json(serde_json::json!({"triage_label": "URGENT_CARE"})) }),
        );
        let addr = spawn(router).await;
        let client = HttpBackendClient::new(&format!("http://{addr}"), 5).unwrap();
        let verdict = client.classify(&query()).await.unwrap();
        assert_eq!(verdict.label, "URGENT_CARE");
        assert!(verdict.matched_rules.is_empty());
        assert!(verdict.confidence.is_none());
    }

    #[tokio::test]
    async fn error_status_is_transport() {
        let router = Router::new().route(
            "/api/triage",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "Triage evaluation error") }),
        );
        let addr = spawn(router).await;
        let client = HttpBackendClient::new(&format!("http://{addr}"), 5).unwrap();
        let result = client.classify(&query()).await;
        assert!(matches!(result, Err(TriageError::EngineTransport(_))));
    }

    #[tokio::test]
    async fn unexpected_body_is_malformed() {
        let router = Router::new().route(
            "/api/triage",
            post(|| async { Json(serde_json::json!({"label": "nope"})) }),
        );
        let addr = spawn(router).await;
        let client = HttpBackendClient::new(&format!("http://{addr}"), 5).unwrap();
        let result = client.classify(&query()).await;
        assert!(matches!(result, Err(TriageError::EngineMalformedOutput(_))));
    }

    #[tokio::test]
    async fn unreachable_service_is_transport() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = HttpBackendClient::new(&format!("http://{addr}"), 2).unwrap();
        let result = client.classify(&query()).await;
        assert!(matches!(result, Err(TriageError::EngineTransport(_))));
    }
}
