//! Shared state and response shapes for the triage API.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::pipeline::triage::{RuleSet, TriageRequest, TriageService, TriageVerdict};

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub service: Arc<TriageService>,
    /// Embedded rule set, absent when a remote rule service answers instead.
    pub rules: Option<Arc<RuleSet>>,
    /// Cancelled on server shutdown; in-flight triage calls are abandoned.
    pub shutdown: CancellationToken,
}

impl ApiContext {
    pub fn new(service: Arc<TriageService>, rules: Option<Arc<RuleSet>>) -> Self {
        Self {
            service,
            rules,
            shutdown: CancellationToken::new(),
        }
    }
}

/// `POST /api/triage` response: the verdict plus correlation metadata.
#[derive(Debug, Serialize)]
pub struct TriageResponse {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub request_fingerprint: String,
    pub symptoms: Vec<String>,
    pub is_minor: bool,
    pub tentative: bool,
    #[serde(flatten)]
    pub verdict: TriageVerdict,
}

impl TriageResponse {
    pub fn new(request: &TriageRequest, verdict: TriageVerdict) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            request_fingerprint: request.fingerprint(),
            symptoms: request.symptoms().to_vec(),
            is_minor: request.is_minor(),
            tentative: verdict.is_tentative(),
            verdict,
        }
    }
}
