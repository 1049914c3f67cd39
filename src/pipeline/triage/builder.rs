use super::types::{SymptomInput, TriageRequest};
use super::vocabulary::{KeywordCatalog, SymptomId};
use super::TriageError;

/// Build a request using the default keyword catalog.
pub fn build_request(input: &SymptomInput) -> Result<TriageRequest, TriageError> {
    build_request_with(input, &KeywordCatalog::default())
}

/// Normalize a symptom submission into a canonical, non-empty symptom set.
///
/// Checked ids map to their canonical phrase (unknown ids are dropped),
/// free text contributes keyword matches, and a description with no
/// recognised keyword is kept verbatim as a single symptom.
pub fn build_request_with(
    input: &SymptomInput,
    catalog: &KeywordCatalog,
) -> Result<TriageRequest, TriageError> {
    let free_text = input.free_text.trim();

    let mut symptoms: Vec<String> = Vec::new();
    let mut dropped_ids = 0usize;
    for raw_id in &input.checked_symptoms {
        match SymptomId::parse(raw_id) {
            Some(id) => push_unique(&mut symptoms, id.phrase()),
            None => dropped_ids += 1,
        }
    }

    let from_ids = symptoms.len();
    if !free_text.is_empty() {
        for phrase in catalog.scan(free_text) {
            push_unique(&mut symptoms, &phrase);
        }
    }
    let from_text = symptoms.len() - from_ids;

    let verbatim = symptoms.is_empty() && !free_text.is_empty();
    if verbatim {
        symptoms.push(free_text.to_string());
    }

    if symptoms.is_empty() {
        return Err(TriageError::InvalidInput(
            "describe your symptoms or select at least one symptom".into(),
        ));
    }

    tracing::debug!(
        from_ids,
        from_text,
        dropped_ids,
        verbatim,
        is_minor = input.is_minor(),
        "Triage request built"
    );

    Ok(TriageRequest::new(symptoms, input))
}

fn push_unique(symptoms: &mut Vec<String>, phrase: &str) {
    if !symptoms.iter().any(|s| s.eq_ignore_ascii_case(phrase)) {
        symptoms.push(phrase.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::triage::types::Severity;

    fn input(text: &str, ids: &[&str]) -> SymptomInput {
        SymptomInput::new(
            text,
            ids.iter().map(|s| s.to_string()).collect(),
            Some(30),
            Severity::Moderate,
        )
    }

    #[test]
    fn empty_input_is_rejected() {
        let result = build_request(&input("", &[]));
        assert!(matches!(result, Err(TriageError::InvalidInput(_))));
    }

    #[test]
    fn whitespace_only_text_is_rejected() {
        let result = build_request(&input("   \n\t", &[]));
        assert!(matches!(result, Err(TriageError::InvalidInput(_))));
    }

    #[test]
    fn only_unknown_ids_is_rejected() {
        let result = build_request(&input("", &["telepathy", "x_ray_vision"]));
        assert!(matches!(result, Err(TriageError::InvalidInput(_))));
    }

    #[test]
    fn checked_ids_map_to_phrases() {
        let request = build_request(&input("", &["chest_pain", "breathlessness"])).unwrap();
        assert_eq!(request.symptoms(), ["chest pain", "shortness of breath"]);
    }

    #[test]
    fn unknown_ids_dropped_silently() {
        let request = build_request(&input("", &["fever", "levitation"])).unwrap();
        assert_eq!(request.symptoms(), ["fever"]);
    }

    #[test]
    fn text_matches_deduplicated_against_ids() {
        let request =
            build_request(&input("I can't breathe and have a fever", &["breathlessness"])).unwrap();
        let symptoms = request.symptoms();
        assert_eq!(
            symptoms.iter().filter(|s| *s == "shortness of breath").count(),
            1
        );
        assert!(symptoms.contains(&"fever".to_string()));
        assert_eq!(symptoms.len(), 2);
    }

    #[test]
    fn unmatched_text_kept_verbatim() {
        let request = build_request(&input("  my left ear feels strange  ", &[])).unwrap();
        assert_eq!(request.symptoms(), ["my left ear feels strange"]);
    }

    #[test]
    fn unmatched_text_not_added_when_ids_present() {
        let request = build_request(&input("my left ear feels strange", &["fever"])).unwrap();
        assert_eq!(request.symptoms(), ["fever"]);
        assert_eq!(request.description(), "my left ear feels strange");
    }

    #[test]
    fn minor_flag_propagates_into_request() {
        let child = SymptomInput::new("", vec!["runny_nose".into()], Some(8), Severity::Mild);
        let request = build_request(&child).unwrap();
        assert!(request.is_minor());
        assert_eq!(request.age(), Some(8));
        assert_eq!(request.symptoms(), ["runny nose"]);
    }

    #[test]
    fn context_fields_carried_through() {
        let submission = input("cough for weeks", &[])
            .with_duration("3 weeks")
            .with_additional_factors(vec!["weight loss".into(), "  ".into()]);
        let request = build_request(&submission).unwrap();
        assert_eq!(request.duration(), Some("3 weeks"));
        assert_eq!(request.additional_factors(), ["weight loss"]);
    }

    #[test]
    fn non_empty_input_always_yields_symptoms() {
        let cases = [
            input("x", &[]),
            input("", &["drowsy"]),
            input("headache", &["nope"]),
            input("???", &["unknown"]),
        ];
        for case in cases {
            let request = build_request(&case).unwrap();
            assert!(!request.symptoms().is_empty());
        }
    }

    #[test]
    fn bare_mention_of_breathing_adds_no_symptom() {
        let request = build_request(&input("My breathing is fine, I just have a high fever", &[])).unwrap();
        assert_eq!(request.symptoms(), ["high fever"]);
    }

    #[test]
    fn breathing_complaints_still_recognised() {
        let request = build_request(&input("it is hard to breathe and I have breathing difficulty", &[])).unwrap();
        assert_eq!(request.symptoms(), ["shortness of breath", "difficulty breathing"]);
    }
}
