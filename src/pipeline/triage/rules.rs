use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::fallback::{map_backend_label, BackendClassifier, BackendQuery, BackendVerdict, BACKEND_LABELS};
use super::types::Severity;
use super::TriageError;

/// Rule file shipped with the binary.
const BUNDLED_RULES: &str = include_str!("../../../resources/rules/triage_rules.yaml");

const BASE_CONFIDENCE: f32 = 0.7;
const CONSTRAINT_BONUS: f32 = 0.1;
const NO_MATCH_CONFIDENCE: f32 = 0.3;

const DEFAULT_EXPLANATION: &str = "Based on the symptoms provided, self-care with monitoring is recommended. \
If symptoms worsen or persist, please seek medical attention.";

const FALLBACK_TEMPLATE: &str = "Please consult with a healthcare provider about your symptoms.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleCategory {
    Red,
    Orange,
    Yellow,
    Green,
}

/// Urgency, action and timeframe attached to a backend label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelInfo {
    pub urgency: String,
    pub action: String,
    pub timeframe: String,
}

/// One way a rule can match. All present constraints must hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub severity: Vec<String>,
    #[serde(default)]
    pub additional_factors: Vec<String>,
    /// Readings such as "104" or "39.5"; matched as substrings of the
    /// reported temperature.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub temperature: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageRule {
    pub id: String,
    pub name: String,
    pub category: RuleCategory,
    #[serde(default = "default_priority")]
    pub priority: u32,
    pub triage_label: String,
    pub conditions: Vec<RuleCondition>,
    #[serde(default)]
    pub explanation_template: String,
}

fn default_priority() -> u32 {
    999
}

fn default_label() -> String {
    "SELF_CARE_MONITOR".to_string()
}

/// A rule that matched a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedRule {
    pub id: String,
    pub name: String,
    pub category: RuleCategory,
    pub confidence: f32,
}

/// Outcome of evaluating a query against the rule set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleEvaluation {
    pub label: String,
    pub label_info: Option<LabelInfo>,
    pub matched: Vec<MatchedRule>,
    pub explanation: String,
    pub confidence: f32,
}

impl RuleEvaluation {
    pub fn into_backend_verdict(self) -> BackendVerdict {
        let (action, timeframe) = match self.label_info {
            Some(info) => (Some(info.action), Some(info.timeframe)),
            None => (None, None),
        };
        BackendVerdict {
            label: self.label,
            rationale: self.explanation,
            matched_rules: self.matched.into_iter().map(|m| m.name).collect(),
            timeframe,
            action,
            confidence: Some(self.confidence),
        }
    }
}

/// Prioritised, deterministic triage rules loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub triage_labels: BTreeMap<String, LabelInfo>,
    #[serde(default = "default_label")]
    pub default_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_explanation: Option<String>,
    pub rules: Vec<TriageRule>,
}

impl RuleSet {
    /// The rule file compiled into the binary.
    pub fn bundled() -> Result<Self, TriageError> {
        Self::from_yaml(BUNDLED_RULES)
    }

    pub fn from_path(path: &Path) -> Result<Self, TriageError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TriageError::Configuration(format!("cannot read rules file {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, TriageError> {
        let mut set: RuleSet = serde_yaml::from_str(content)
            .map_err(|e| TriageError::Configuration(format!("invalid rules file: {e}")))?;
        set.validate()?;
        set.rules.sort_by_key(|r| r.priority);
        tracing::debug!(rules = set.rules.len(), "Triage rules loaded");
        Ok(set)
    }

    fn validate(&self) -> Result<(), TriageError> {
        let known_label = |label: &str| {
            BACKEND_LABELS.iter().any(|(name, _)| *name == label)
                && self.triage_labels.contains_key(label)
        };

        if !known_label(&self.default_label) {
            return Err(TriageError::Configuration(format!(
                "default label {} is not defined",
                self.default_label
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(TriageError::Configuration(format!(
                    "duplicate rule id {}",
                    rule.id
                )));
            }
            if !known_label(&rule.triage_label) {
                return Err(TriageError::Configuration(format!(
                    "rule {} uses undefined label {}",
                    rule.id, rule.triage_label
                )));
            }
            if rule.conditions.is_empty() || rule.conditions.iter().any(|c| c.symptoms.is_empty()) {
                return Err(TriageError::Configuration(format!(
                    "rule {} has a condition without symptoms",
                    rule.id
                )));
            }
        }
        Ok(())
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[TriageRule] {
        &self.rules
    }

    /// Evaluate every rule; the highest-priority match decides the label.
    pub fn evaluate(&self, query: &BackendQuery) -> RuleEvaluation {
        let matched: Vec<(&TriageRule, f32)> = self
            .rules
            .iter()
            .filter_map(|rule| evaluate_rule(rule, query).map(|conf| (rule, conf)))
            .collect();

        let evaluation = match matched.first() {
            Some((best, confidence)) => RuleEvaluation {
                label: best.triage_label.clone(),
                label_info: self.triage_labels.get(&best.triage_label).cloned(),
                matched: matched
                    .iter()
                    .map(|(rule, conf)| MatchedRule {
                        id: rule.id.clone(),
                        name: rule.name.clone(),
                        category: rule.category,
                        confidence: *conf,
                    })
                    .collect(),
                explanation: render_explanation(&best.explanation_template, &query.symptoms),
                confidence: *confidence,
            },
            None => RuleEvaluation {
                label: self.default_label.clone(),
                label_info: self.triage_labels.get(&self.default_label).cloned(),
                matched: Vec::new(),
                explanation: self
                    .default_explanation
                    .clone()
                    .unwrap_or_else(|| DEFAULT_EXPLANATION.to_string()),
                confidence: NO_MATCH_CONFIDENCE,
            },
        };

        tracing::debug!(
            label = %evaluation.label,
            urgency = %map_backend_label(&evaluation.label),
            matched = evaluation.matched.len(),
            confidence = evaluation.confidence,
            "Rules evaluated"
        );

        evaluation
    }
}

#[async_trait]
impl BackendClassifier for RuleSet {
    async fn classify(&self, query: &BackendQuery) -> Result<BackendVerdict, TriageError> {
        Ok(self.evaluate(query).into_backend_verdict())
    }

    fn name(&self) -> &str {
        "embedded_rules"
    }
}

/// Confidence of the first matching condition, if any. Each constraint the
/// condition actually checked adds a bonus.
fn evaluate_rule(rule: &TriageRule, query: &BackendQuery) -> Option<f32> {
    rule.conditions.iter().find_map(|condition| {
        if !condition_matches(condition, query) {
            return None;
        }
        let mut confidence = BASE_CONFIDENCE;
        if severity_constrained(&condition.severity) {
            confidence += CONSTRAINT_BONUS;
        }
        if !condition.additional_factors.is_empty() {
            confidence += CONSTRAINT_BONUS;
        }
        if !condition.temperature.is_empty() {
            confidence += CONSTRAINT_BONUS;
        }
        Some(confidence.min(1.0))
    })
}

fn condition_matches(condition: &RuleCondition, query: &BackendQuery) -> bool {
    if !any_phrase_matches(&condition.symptoms, &query.symptoms) {
        return false;
    }
    if !severity_matches(&condition.severity, query.severity) {
        return false;
    }
    if !condition.additional_factors.is_empty() {
        let observed: Vec<String> = query
            .symptoms
            .iter()
            .chain(query.additional_factors.iter())
            .cloned()
            .collect();
        if !any_phrase_matches(&condition.additional_factors, &observed) {
            return false;
        }
    }
    temperature_matches(&condition.temperature, query.temperature.as_deref())
        && age_in_range(condition, query.age)
}

/// A temperature constraint only matches a reported reading.
fn temperature_matches(readings: &[String], reported: Option<&str>) -> bool {
    if readings.is_empty() {
        return true;
    }
    let Some(reported) = reported else {
        return false;
    };
    let reported = reported.to_lowercase();
    readings
        .iter()
        .map(|r| r.trim().to_lowercase())
        .any(|r| !r.is_empty() && reported.contains(&r))
}

fn severity_constrained(levels: &[String]) -> bool {
    !levels.is_empty() && !levels.iter().any(|s| s.trim().eq_ignore_ascii_case("any"))
}

fn severity_matches(levels: &[String], severity: Severity) -> bool {
    if !severity_constrained(levels) {
        return true;
    }
    levels.iter().any(|level| {
        let level = level.trim().to_lowercase();
        let level = match level.as_str() {
            "high" | "critical" => "severe",
            other => other,
        };
        level == severity.as_str()
    })
}

/// Age bounds only match a known age.
fn age_in_range(condition: &RuleCondition, age: Option<u32>) -> bool {
    match (condition.min_age, condition.max_age, age) {
        (None, None, _) => true,
        (_, _, None) => false,
        (min, max, Some(age)) => {
            min.map(|m| age >= m).unwrap_or(true) && max.map(|m| age <= m).unwrap_or(true)
        }
    }
}

fn any_phrase_matches(rule_phrases: &[String], observed: &[String]) -> bool {
    rule_phrases
        .iter()
        .any(|rule| observed.iter().any(|seen| phrases_overlap(rule, seen)))
}

/// Word-level containment in either direction, case-insensitive.
pub(crate) fn phrases_overlap(a: &str, b: &str) -> bool {
    let a = words(a);
    let b = words(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    contains_run(&a, &b) || contains_run(&b, &a)
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn contains_run(haystack: &[String], needle: &[String]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

fn render_explanation(template: &str, symptoms: &[String]) -> String {
    let template = template.trim();
    let mut explanation = if template.is_empty() {
        FALLBACK_TEMPLATE.to_string()
    } else {
        template.to_string()
    };
    if !symptoms.is_empty() {
        explanation.push_str(&format!(
            " Your reported symptoms include: {}.",
            symptoms.join(", ")
        ));
    }
    explanation
}
