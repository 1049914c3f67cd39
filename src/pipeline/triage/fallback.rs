use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::confidence::backend_confidence;
use super::types::{Severity, TriageRequest, TriageVerdict, UrgencyLevel, VerdictSource, MAX_LIST_ITEMS};
use super::TriageError;

/// Backend labels and the urgency each maps to.
pub const BACKEND_LABELS: [(&str, UrgencyLevel); 4] = [
    ("EMERGENCY_911", UrgencyLevel::Emergency),
    ("URGENT_CARE", UrgencyLevel::Urgent),
    ("SEE_DOCTOR_24H", UrgencyLevel::Routine),
    ("SELF_CARE_MONITOR", UrgencyLevel::SelfCare),
];

/// Red flags attached to every non-emergency fallback verdict.
pub const STANDARD_WARNING_SIGNS: [&str; 6] = [
    "Chest pain or pressure",
    "Difficulty breathing",
    "Severe bleeding",
    "Loss of consciousness",
    "Severe allergic reactions",
    "Signs of stroke (FAST test)",
];

/// Home-care advice attached to SELF_CARE fallback verdicts.
pub const HOME_CARE_TIPS: [&str; 5] = [
    "Get plenty of rest",
    "Stay hydrated - drink water, herbal tea",
    "Use over-the-counter medications if needed",
    "Monitor symptoms - seek help if they worsen",
    "Maintain good nutrition",
];

/// Input to a deterministic classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendQuery {
    pub symptoms: Vec<String>,
    pub severity: Severity,
    pub age: Option<u32>,
    pub duration: Option<String>,
    pub additional_factors: Vec<String>,
    #[serde(default)]
    pub temperature: Option<String>,
}

impl From<&TriageRequest> for BackendQuery {
    fn from(request: &TriageRequest) -> Self {
        Self {
            symptoms: request.symptoms().to_vec(),
            severity: request.severity(),
            age: request.age(),
            duration: request.duration().map(str::to_string),
            additional_factors: request.additional_factors().to_vec(),
            temperature: request.temperature().map(str::to_string),
        }
    }
}

/// Raw answer of a deterministic classifier, in backend vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendVerdict {
    pub label: String,
    pub rationale: String,
    pub matched_rules: Vec<String>,
    pub timeframe: Option<String>,
    pub action: Option<String>,
    pub confidence: Option<f32>,
}

/// Deterministic classification backend (allows mocking).
#[async_trait]
pub trait BackendClassifier: Send + Sync {
    async fn classify(&self, query: &BackendQuery) -> Result<BackendVerdict, TriageError>;

    fn name(&self) -> &str;
}

/// Map a backend label to an urgency level. Unknown labels are ROUTINE.
pub fn map_backend_label(label: &str) -> UrgencyLevel {
    let normalized = label.trim().to_uppercase();
    BACKEND_LABELS
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, level)| *level)
        .unwrap_or(UrgencyLevel::Routine)
}

/// Present a backend answer in the same shape as a parsed engine response.
pub fn adapt_backend_verdict(backend: &BackendVerdict) -> TriageVerdict {
    let urgency = map_backend_label(&backend.label);

    let mut actions: Vec<String> = Vec::new();
    if let Some(action) = backend.action.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        actions.push(action.to_string());
    }
    if let Some(timeframe) = backend.timeframe.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        actions.push(format!("Timeframe: {timeframe}"));
    }
    if actions.is_empty() {
        actions.push(default_action(urgency).to_string());
    }

    let rule_names: Vec<&str> = backend
        .matched_rules
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .collect();
    if !rule_names.is_empty() {
        // The transparency line must survive the list cap.
        actions.truncate(MAX_LIST_ITEMS - 1);
        actions.push(format!("Based on: {}", rule_names.join(", ")));
    }

    let warning_signs = if urgency == UrgencyLevel::Emergency {
        Vec::new()
    } else {
        STANDARD_WARNING_SIGNS.iter().map(|s| s.to_string()).collect()
    };
    let self_care_tips = if urgency == UrgencyLevel::SelfCare {
        HOME_CARE_TIPS.iter().map(|s| s.to_string()).collect()
    } else {
        Vec::new()
    };

    let primary_concern = rule_names
        .first()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "General symptom assessment".to_string());

    let rationale = backend.rationale.trim();
    let explanation = if rationale.is_empty() {
        format!("Recommended care level: {} ({}).", urgency.as_str(), urgency.description())
    } else {
        rationale.to_string()
    };

    tracing::debug!(
        label = %backend.label,
        urgency = %urgency,
        matched_rules = rule_names.len(),
        "Backend verdict adapted"
    );

    TriageVerdict::new(urgency, VerdictSource::FallbackRules)
        .with_primary_concern(primary_concern)
        .with_explanation(explanation)
        .with_suggested_actions(actions)
        .with_warning_signs(warning_signs)
        .with_self_care_tips(self_care_tips)
        .with_confidence(backend_confidence(backend.confidence))
}

fn default_action(urgency: UrgencyLevel) -> &'static str {
    match urgency {
        UrgencyLevel::Emergency => "Call emergency services or go to the nearest emergency room now",
        UrgencyLevel::Urgent => "Visit an urgent care center or contact your doctor today",
        UrgencyLevel::Routine => "Schedule an appointment with your doctor",
        UrgencyLevel::SelfCare => "Rest and monitor your symptoms at home",
    }
}

/// Scripted backend for tests: replays a verdict or an error and records
/// every query it receives.
pub struct MockBackend {
    outcome: Result<BackendVerdict, TriageError>,
    calls: AtomicUsize,
    last_query: Mutex<Option<BackendQuery>>,
}

impl MockBackend {
    pub fn new(label: &str) -> Self {
        Self::with_verdict(BackendVerdict {
            label: label.to_string(),
            rationale: format!("Mock backend classified the request as {label}."),
            matched_rules: Vec::new(),
            timeframe: None,
            action: None,
            confidence: None,
        })
    }

    pub fn with_verdict(verdict: BackendVerdict) -> Self {
        Self {
            outcome: Ok(verdict),
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    pub fn failing(error: TriageError) -> Self {
        Self {
            outcome: Err(error),
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<BackendQuery> {
        self.last_query.lock().ok().and_then(|q| q.clone())
    }
}

#[async_trait]
impl BackendClassifier for MockBackend {
    async fn classify(&self, query: &BackendQuery) -> Result<BackendVerdict, TriageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_query.lock() {
            *last = Some(query.clone());
        }
        self.outcome.clone()
    }

    fn name(&self) -> &str {
        "mock"
    }
}
