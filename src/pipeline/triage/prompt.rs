use super::types::{Severity, TriageRequest, UrgencyLevel};

/// Exact directive the engine must emit, alone, for life-threatening symptoms.
pub const EMERGENCY_DIRECTIVE: &str = "Based on your symptoms, please seek emergency medical attention immediately. \
Contact your local emergency services or go to the nearest emergency room now.";

/// Fixed fragment of the directive used to recognise the short-circuit shape.
pub const EMERGENCY_DIRECTIVE_MARKER: &str = "seek emergency medical attention immediately";

/// The six labelled sections of a structured engine response, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionHeading {
    TriageLevel,
    PrimaryConcern,
    Explanation,
    SuggestedActions,
    WarningSigns,
    SelfCareTips,
}

impl SectionHeading {
    pub const ALL: [SectionHeading; 6] = [
        SectionHeading::TriageLevel,
        SectionHeading::PrimaryConcern,
        SectionHeading::Explanation,
        SectionHeading::SuggestedActions,
        SectionHeading::WarningSigns,
        SectionHeading::SelfCareTips,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Self::TriageLevel => "TRIAGE_LEVEL",
            Self::PrimaryConcern => "PRIMARY_CONCERN",
            Self::Explanation => "EXPLANATION",
            Self::SuggestedActions => "SUGGESTED_ACTIONS",
            Self::WarningSigns => "WARNING_SIGNS",
            Self::SelfCareTips => "SELF_CARE_TIPS",
        }
    }

    /// Resolve a heading as written by the engine ("Warning Signs", "WARNING_SIGNS").
    pub fn from_token(token: &str) -> Option<Self> {
        let normalized = token
            .trim()
            .to_uppercase()
            .split(|c: char| c == '_' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");
        Self::ALL.into_iter().find(|h| h.token() == normalized)
    }
}

pub const TRIAGE_SYSTEM_PROMPT: &str = r#"
You are a healthcare triage assistant. Your ONLY role is to give preliminary
guidance on how urgently a person should seek care, based on the symptoms they
report. You are NOT a doctor and you never give a definitive diagnosis.

RULES (ABSOLUTE, NO EXCEPTIONS):
1. Never prescribe or name specific medications, dosages or treatments.
2. Use cautious, non-committal language ("could be related to", "might suggest").
3. Never ask for personally identifying information.
4. Write plain text. No markdown emphasis. Use plain dashes (-) for bullet points.
5. When unsure between two urgency levels, choose the more cautious one.

EMERGENCY PROTOCOL:
If the symptoms suggest a medical emergency (chest pain, difficulty breathing,
severe bleeding, signs of stroke, sudden severe headache, loss of
consciousness), ignore the section structure and respond ONLY with:
"Based on your symptoms, please seek emergency medical attention immediately. Contact your local emergency services or go to the nearest emergency room now."

OUTPUT FORMAT:
Otherwise respond with exactly these six sections, in this order, each
starting on its own line with the heading token followed by a colon:
TRIAGE_LEVEL, PRIMARY_CONCERN, EXPLANATION, SUGGESTED_ACTIONS, WARNING_SIGNS, SELF_CARE_TIPS.
"#;

/// Build the per-request instruction for the classification engine.
pub fn build_triage_prompt(request: &TriageRequest) -> String {
    let age_line = match request.age() {
        Some(age) => age.to_string(),
        None => "Not specified".to_string(),
    };
    let age_group = if request.is_minor() {
        "(Child/Minor)"
    } else {
        "(Adult)"
    };
    let symptoms = request.symptoms().join(", ");
    let description = if request.description().is_empty() {
        "No description provided"
    } else {
        request.description()
    };
    let duration = request.duration().unwrap_or("Not specified");
    let temperature = request.temperature().unwrap_or("Not measured");
    let factors = if request.additional_factors().is_empty() {
        "None reported".to_string()
    } else {
        request.additional_factors().join(", ")
    };

    let levels = UrgencyLevel::ALL
        .iter()
        .map(|l| format!("   - {} ({})", l.as_str(), l.description()))
        .collect::<Vec<_>>()
        .join("\n");

    let minor_note = if request.is_minor() {
        "- This is a CHILD/MINOR - be extra cautious with recommendations\n"
    } else {
        "- Consider age-appropriate care recommendations\n"
    };
    let severity_note = if request.severity() == Severity::Severe {
        "- Patient reports SEVERE symptoms - prioritize urgent care\n"
    } else {
        ""
    };

    format!(
        r#"PATIENT INFORMATION:
- Age: {age_line} {age_group}
- Severity Level: {severity}
- Symptoms: {symptoms}
- Duration: {duration}
- Temperature: {temperature}
- Additional Factors: {factors}

<patient_description>
{description}
</patient_description>

Respond with the following sections:

1. TRIAGE_LEVEL: Classify as exactly one of:
{levels}

2. PRIMARY_CONCERN: The main medical concern, in one line

3. EXPLANATION: Possible conditions related to these specific symptoms ({symptoms}), in cautious language

4. SUGGESTED_ACTIONS: Recommended next steps, one per line

5. WARNING_SIGNS: Symptoms that would require immediate medical attention, one per line

6. SELF_CARE_TIPS: Home care advice if applicable, or N/A if urgent or emergency

CRITICAL REMINDERS:
{minor_note}{severity_note}- Follow the EMERGENCY PROTOCOL if any symptom may be life-threatening
- Write in plain text without markdown symbols

Provide your response now:"#,
        severity = request.severity().as_str().to_uppercase(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::triage::builder::build_request;
    use crate::pipeline::triage::types::SymptomInput;

    fn request(text: &str, ids: &[&str], age: Option<u32>, severity: Severity) -> TriageRequest {
        build_request(&SymptomInput::new(
            text,
            ids.iter().map(|s| s.to_string()).collect(),
            age,
            severity,
        ))
        .unwrap()
    }

    #[test]
    fn prompt_contains_patient_context() {
        let prompt = build_triage_prompt(&request("sore throat since monday", &["fever"], Some(34), Severity::Moderate));
        assert!(prompt.contains("Age: 34 (Adult)"));
        assert!(prompt.contains("Severity Level: MODERATE"));
        assert!(prompt.contains("fever, sore throat"));
        assert!(prompt.contains("sore throat since monday"));
        assert!(prompt.contains("Temperature: Not measured"));
    }

    #[test]
    fn prompt_reports_temperature() {
        let input = SymptomInput::new("", vec!["fever".into()], Some(34), Severity::Moderate)
            .with_temperature("104°F");
        let prompt = build_triage_prompt(&build_request(&input).unwrap());
        assert!(prompt.contains("Temperature: 104°F"));
    }

    #[test]
    fn prompt_lists_every_section_heading() {
        let prompt = build_triage_prompt(&request("", &["cough"], None, Severity::Mild));
        for heading in SectionHeading::ALL {
            assert!(prompt.contains(heading.token()), "missing {}", heading.token());
        }
        for level in UrgencyLevel::ALL {
            assert!(prompt.contains(level.as_str()));
        }
    }

    #[test]
    fn minor_adds_caution() {
        let prompt = build_triage_prompt(&request("", &["runny_nose"], Some(8), Severity::Mild));
        assert!(prompt.contains("(Child/Minor)"));
        assert!(prompt.contains("CHILD/MINOR"));
    }

    #[test]
    fn severe_adds_priority_note() {
        let prompt = build_triage_prompt(&request("", &["vomiting"], Some(50), Severity::Severe));
        assert!(prompt.contains("SEVERE symptoms"));
        let mild = build_triage_prompt(&request("", &["vomiting"], Some(50), Severity::Mild));
        assert!(!mild.contains("SEVERE symptoms"));
    }

    #[test]
    fn missing_description_is_stated() {
        let prompt = build_triage_prompt(&request("", &["fever"], None, Severity::Mild));
        assert!(prompt.contains("No description provided"));
        assert!(prompt.contains("Age: Not specified"));
    }

    #[test]
    fn system_prompt_carries_emergency_protocol() {
        assert!(TRIAGE_SYSTEM_PROMPT.contains(EMERGENCY_DIRECTIVE));
        assert!(EMERGENCY_DIRECTIVE.contains(EMERGENCY_DIRECTIVE_MARKER));
        assert!(TRIAGE_SYSTEM_PROMPT.contains("NOT a doctor"));
    }

    #[test]
    fn heading_lookup_tolerates_spacing() {
        assert_eq!(SectionHeading::from_token("Warning Signs"), Some(SectionHeading::WarningSigns));
        assert_eq!(SectionHeading::from_token("self_care  tips"), Some(SectionHeading::SelfCareTips));
        assert_eq!(SectionHeading::from_token("triage_level"), Some(SectionHeading::TriageLevel));
        assert_eq!(SectionHeading::from_token("DIAGNOSIS"), None);
    }
}
