use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::confidence::triage_thresholds;

/// Patients younger than this are treated as minors.
pub const MINOR_AGE_THRESHOLD: u32 = 18;

/// Upper bound on every list carried by a verdict.
pub const MAX_LIST_ITEMS: usize = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Mild,
    Moderate,
    #[serde(alias = "high", alias = "critical")]
    Severe,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        }
    }
}

/// Raw symptom submission as collected by a front end.
///
/// `is_minor` is derived from `age` whenever an age is known and can only be
/// supplied by the caller when it is not.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "SymptomForm")]
pub struct SymptomInput {
    pub free_text: String,
    /// Checkbox identifiers; unknown ones are dropped by the builder.
    pub checked_symptoms: Vec<String>,
    age: Option<u32>,
    is_minor: bool,
    pub severity: Severity,
    pub duration: Option<String>,
    pub additional_factors: Vec<String>,
    /// Body temperature as entered, e.g. "104°F" or "38.5 C".
    pub temperature: Option<String>,
}

impl SymptomInput {
    pub fn new(
        free_text: impl Into<String>,
        checked_symptoms: Vec<String>,
        age: Option<u32>,
        severity: Severity,
    ) -> Self {
        Self {
            free_text: free_text.into(),
            checked_symptoms,
            age,
            is_minor: age.map(|a| a < MINOR_AGE_THRESHOLD).unwrap_or(false),
            severity,
            duration: None,
            additional_factors: Vec::new(),
            temperature: None,
        }
    }

    /// Caller-declared minor status, honoured only when no age is known.
    pub fn with_minor_flag(mut self, is_minor: bool) -> Self {
        if self.age.is_none() {
            self.is_minor = is_minor;
        }
        self
    }

    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    pub fn with_additional_factors(mut self, factors: Vec<String>) -> Self {
        self.additional_factors = factors;
        self
    }

    pub fn with_temperature(mut self, temperature: impl Into<String>) -> Self {
        self.temperature = Some(temperature.into());
        self
    }

    pub fn age(&self) -> Option<u32> {
        self.age
    }

    pub fn is_minor(&self) -> bool {
        self.is_minor
    }
}

/// Wire shape of the symptom form (`symptoms_text`, `symptoms_list`, ...).
#[derive(Debug, Deserialize)]
struct SymptomForm {
    #[serde(default)]
    symptoms_text: String,
    #[serde(default)]
    symptoms_list: Vec<String>,
    #[serde(default)]
    age: Option<AgeField>,
    #[serde(default)]
    is_child: bool,
    #[serde(default)]
    severity: Severity,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    additional_factors: Vec<String>,
    #[serde(default)]
    temperature: Option<String>,
}

/// Form inputs deliver the age either as a number or as the raw field text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AgeField {
    Number(i64),
    Text(String),
}

impl AgeField {
    fn years(&self) -> Option<u32> {
        match self {
            AgeField::Number(n) => u32::try_from(*n).ok(),
            AgeField::Text(s) => s.trim().parse::<u32>().ok(),
        }
    }
}

impl From<SymptomForm> for SymptomInput {
    fn from(form: SymptomForm) -> Self {
        let age = form.age.as_ref().and_then(AgeField::years);
        let mut input = SymptomInput::new(form.symptoms_text, form.symptoms_list, age, form.severity)
            .with_minor_flag(form.is_child)
            .with_additional_factors(form.additional_factors);
        input.duration = form.duration.filter(|d| !d.trim().is_empty());
        input.temperature = form.temperature.filter(|t| !t.trim().is_empty());
        input
    }
}

/// Canonical, immutable classification request built once per submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageRequest {
    symptoms: Vec<String>,
    description: String,
    severity: Severity,
    age: Option<u32>,
    is_minor: bool,
    duration: Option<String>,
    additional_factors: Vec<String>,
    temperature: Option<String>,
}

impl TriageRequest {
    pub(crate) fn new(symptoms: Vec<String>, input: &SymptomInput) -> Self {
        Self {
            symptoms,
            description: input.free_text.trim().to_string(),
            severity: input.severity,
            age: input.age(),
            is_minor: input.is_minor(),
            duration: input.duration.clone(),
            additional_factors: input
                .additional_factors
                .iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect(),
            temperature: input
                .temperature
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        }
    }

    /// Canonical symptom phrases, deduplicated.
    pub fn symptoms(&self) -> &[String] {
        &self.symptoms
    }

    /// The patient's own description, trimmed.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn age(&self) -> Option<u32> {
        self.age
    }

    pub fn is_minor(&self) -> bool {
        self.is_minor
    }

    pub fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    pub fn additional_factors(&self) -> &[String] {
        &self.additional_factors
    }

    pub fn temperature(&self) -> Option<&str> {
        self.temperature.as_deref()
    }

    /// Content fingerprint, independent of symptom order.
    pub fn fingerprint(&self) -> String {
        let mut symptoms: Vec<String> = self.symptoms.iter().map(|s| s.to_lowercase()).collect();
        symptoms.sort();
        let mut factors: Vec<String> = self
            .additional_factors
            .iter()
            .map(|f| f.to_lowercase())
            .collect();
        factors.sort();

        let mut hasher = Sha256::new();
        hasher.update(symptoms.join("\n").as_bytes());
        hasher.update([0u8]);
        hasher.update(self.description.to_lowercase().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.severity.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.age.map(|a| a.to_string()).unwrap_or_default().as_bytes());
        hasher.update([u8::from(self.is_minor)]);
        hasher.update(self.duration.as_deref().unwrap_or_default().as_bytes());
        hasher.update([0u8]);
        hasher.update(factors.join("\n").as_bytes());
        hasher.update([0u8]);
        hasher.update(self.temperature.as_deref().unwrap_or_default().as_bytes());

        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyLevel {
    Emergency,
    Urgent,
    Routine,
    SelfCare,
}

impl UrgencyLevel {
    pub const ALL: [UrgencyLevel; 4] = [
        UrgencyLevel::Emergency,
        UrgencyLevel::Urgent,
        UrgencyLevel::Routine,
        UrgencyLevel::SelfCare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emergency => "EMERGENCY",
            Self::Urgent => "URGENT",
            Self::Routine => "ROUTINE",
            Self::SelfCare => "SELF_CARE",
        }
    }

    /// Closed-vocabulary lookup. Spaces and hyphens count as underscores.
    pub fn from_token(token: &str) -> Option<Self> {
        let normalized = token.trim().to_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "EMERGENCY" => Some(Self::Emergency),
            "URGENT" => Some(Self::Urgent),
            "ROUTINE" => Some(Self::Routine),
            "SELF_CARE" => Some(Self::SelfCare),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Emergency => "life-threatening, seek immediate emergency care",
            Self::Urgent => "needs care within 2-4 hours",
            Self::Routine => "see a doctor within 24-48 hours",
            Self::SelfCare => "can be managed at home with monitoring",
        }
    }
}

impl std::fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which engine produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    PrimaryEngine,
    FallbackRules,
}

/// Uniform triage outcome, whichever engine answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageVerdict {
    urgency_level: UrgencyLevel,
    primary_concern: String,
    explanation: String,
    suggested_actions: Vec<String>,
    warning_signs: Vec<String>,
    self_care_tips: Vec<String>,
    confidence: f32,
    source: VerdictSource,
}

impl TriageVerdict {
    pub(crate) fn new(urgency_level: UrgencyLevel, source: VerdictSource) -> Self {
        Self {
            urgency_level,
            primary_concern: String::new(),
            explanation: String::new(),
            suggested_actions: Vec::new(),
            warning_signs: Vec::new(),
            self_care_tips: Vec::new(),
            confidence: 0.0,
            source,
        }
    }

    pub(crate) fn with_primary_concern(mut self, concern: impl Into<String>) -> Self {
        self.primary_concern = concern.into();
        self
    }

    pub(crate) fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    pub(crate) fn with_suggested_actions(mut self, mut actions: Vec<String>) -> Self {
        actions.truncate(MAX_LIST_ITEMS);
        self.suggested_actions = actions;
        self
    }

    pub(crate) fn with_warning_signs(mut self, mut signs: Vec<String>) -> Self {
        signs.truncate(MAX_LIST_ITEMS);
        self.warning_signs = signs;
        self
    }

    pub(crate) fn with_self_care_tips(mut self, mut tips: Vec<String>) -> Self {
        tips.truncate(MAX_LIST_ITEMS);
        self.self_care_tips = tips;
        self
    }

    pub(crate) fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    pub fn urgency_level(&self) -> UrgencyLevel {
        self.urgency_level
    }

    pub fn primary_concern(&self) -> &str {
        &self.primary_concern
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn suggested_actions(&self) -> &[String] {
        &self.suggested_actions
    }

    pub fn warning_signs(&self) -> &[String] {
        &self.warning_signs
    }

    pub fn self_care_tips(&self) -> &[String] {
        &self.self_care_tips
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Low-confidence verdicts should be presented as provisional.
    pub fn is_tentative(&self) -> bool {
        self.confidence < triage_thresholds::LOW
    }

    pub fn source(&self) -> VerdictSource {
        self.source
    }
}
