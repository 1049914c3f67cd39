use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::confidence::{compute_parse_confidence, triage_thresholds, LevelResolution};
use super::prompt::{SectionHeading, EMERGENCY_DIRECTIVE, EMERGENCY_DIRECTIVE_MARKER};
use super::types::{TriageVerdict, UrgencyLevel, VerdictSource, MAX_LIST_ITEMS};

/// Explanations shorter than this are considered not extracted.
const MIN_EXPLANATION_CHARS: usize = 50;

/// Output longer than this is expected to carry a real explanation.
const SUBSTANTIAL_OUTPUT_CHARS: usize = 100;

/// Length of the raw-text prefix used when no explanation was found.
const EXPLANATION_PREFIX_CHARS: usize = 500;

/// Unbulleted lines longer than this count as list items.
const MIN_IMPLICIT_ITEM_CHARS: usize = 10;

const WARNING_BLOCK_TITLE: &str = "Warning Signs - Seek Immediate Care If:";

/// A section heading at the start of a line, tolerating numbering,
/// markdown heading marks and bold markers around the token.
static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:(?P<hash>#{1,6})[ \t]*)?(?:\d{1,2}[.)][ \t]*)?(?P<bold>\*\*)?[ \t]*(?P<token>(?i:triage[ _]+level|primary[ _]+concern|explanation|suggested[ _]+actions|warning[ _]+signs|self[ _-]?care[ _]+tips))\b[ \t]*(?:\*\*)?[ \t]*(?P<sep>:|-|–)?[ \t]*(?:\*\*)?",
    )
    .expect("valid heading regex")
});

static LEVEL_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(emergency|urgent|routine|self[ _-]?care)\b").expect("valid level regex")
});

/// Dash, asterisk, bullet glyph, numbered or lettered item.
static BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*•‣◦▪–]|\d{1,2}[.)]|[A-Za-z][.)])[ \t]+(.+)$").expect("valid bullet regex")
});

/// Parse raw engine output into a verdict.
///
/// Never fails: output without usable structure yields a ROUTINE verdict
/// with near-zero confidence.
pub fn parse_triage_response(text: &str) -> TriageVerdict {
    let text = text.replace("\r\n", "\n");

    if is_emergency_directive(&text) {
        tracing::debug!(
            confidence = triage_thresholds::EMERGENCY_DIRECTIVE,
            "Engine returned emergency directive"
        );
        return TriageVerdict::new(UrgencyLevel::Emergency, VerdictSource::PrimaryEngine)
            .with_primary_concern("Possible medical emergency")
            .with_explanation(EMERGENCY_DIRECTIVE)
            .with_confidence(triage_thresholds::EMERGENCY_DIRECTIVE);
    }

    let sections = extract_sections(&text);

    let (urgency, resolution) = match sections.get(&SectionHeading::TriageLevel) {
        Some(value) => resolve_level(value),
        None => (UrgencyLevel::Routine, LevelResolution::Missing),
    };

    let primary_concern = sections
        .get(&SectionHeading::PrimaryConcern)
        .and_then(|v| first_line(v))
        .map(clean_inline)
        .unwrap_or_default();

    let mut explanation = sections
        .get(&SectionHeading::Explanation)
        .map(|v| clean_inline(v))
        .unwrap_or_default();
    let trimmed = text.trim();
    let total_chars = trimmed.chars().count();
    let explanation_chars = explanation.chars().count();
    if explanation_chars < MIN_EXPLANATION_CHARS
        && (total_chars > SUBSTANTIAL_OUTPUT_CHARS || explanation.is_empty())
    {
        explanation = trimmed.chars().take(EXPLANATION_PREFIX_CHARS).collect();
    }

    let list = |heading: SectionHeading| {
        sections
            .get(&heading)
            .map(|v| extract_list_items(v))
            .unwrap_or_default()
    };
    let suggested_actions = list(SectionHeading::SuggestedActions);
    let warning_signs = list(SectionHeading::WarningSigns);
    let self_care_tips = list(SectionHeading::SelfCareTips);

    let other_sections = SectionHeading::ALL
        .iter()
        .filter(|h| **h != SectionHeading::TriageLevel)
        .filter(|h| sections.get(h).is_some_and(|v| !v.trim().is_empty()))
        .count();
    let confidence = compute_parse_confidence(resolution, other_sections);

    tracing::debug!(
        urgency = %urgency,
        resolution = ?resolution,
        sections_found = other_sections,
        confidence,
        "Engine response parsed"
    );

    let narrative = compose_explanation(urgency, &primary_concern, &explanation, &warning_signs);

    TriageVerdict::new(urgency, VerdictSource::PrimaryEngine)
        .with_primary_concern(primary_concern)
        .with_explanation(narrative)
        .with_suggested_actions(suggested_actions)
        .with_warning_signs(warning_signs)
        .with_self_care_tips(self_care_tips)
        .with_confidence(confidence)
}

/// The directive is recognised case-insensitively, across line breaks and
/// emphasis markers, so composed text re-parses the same way.
fn is_emergency_directive(text: &str) -> bool {
    let collapsed = strip_emphasis(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed.contains(EMERGENCY_DIRECTIVE_MARKER)
}

/// Locate every heading and slice each section up to the next heading.
/// The first occurrence of a section wins.
fn extract_sections(text: &str) -> HashMap<SectionHeading, String> {
    let mut headings: Vec<(SectionHeading, usize, usize)> = Vec::new();
    for caps in HEADING.captures_iter(text) {
        let (Some(whole), Some(token)) = (caps.get(0), caps.name("token")) else {
            continue;
        };
        let marked = caps.name("sep").is_some()
            || caps.name("hash").is_some()
            || caps.name("bold").is_some();
        // Unmarked mixed-case tokens are prose ("Warning signs include...").
        if !marked && token.as_str() != token.as_str().to_uppercase() {
            continue;
        }
        if let Some(heading) = SectionHeading::from_token(&token.as_str().replace('-', " ")) {
            headings.push((heading, whole.start(), whole.end()));
        }
    }

    let mut sections = HashMap::new();
    for (i, (heading, _, value_start)) in headings.iter().enumerate() {
        let value_end = headings
            .get(i + 1)
            .map(|(_, next_start, _)| *next_start)
            .unwrap_or(text.len());
        let value = text[*value_start..value_end].trim().to_string();
        sections.entry(*heading).or_insert(value);
    }
    sections
}

/// Map the TRIAGE_LEVEL value through the closed vocabulary.
fn resolve_level(value: &str) -> (UrgencyLevel, LevelResolution) {
    let Some(line) = first_line(value) else {
        return (UrgencyLevel::Routine, LevelResolution::Missing);
    };

    let mut found: Vec<UrgencyLevel> = Vec::new();
    for m in LEVEL_TOKEN.find_iter(line) {
        let before = line[..m.start()].to_lowercase();
        if before.ends_with("non-") || before.ends_with("non ") || before.ends_with("not ") {
            continue;
        }
        if let Some(level) = UrgencyLevel::from_token(m.as_str()) {
            if !found.contains(&level) {
                found.push(level);
            }
        }
    }

    match found.as_slice() {
        [level] => (*level, LevelResolution::Explicit),
        [] => (UrgencyLevel::Routine, LevelResolution::Missing),
        _ => (UrgencyLevel::Routine, LevelResolution::Ambiguous),
    }
}

/// Pull list items out of a section body, bulleted or not.
fn extract_list_items(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    for raw in value.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let candidate = match BULLET.captures(line).and_then(|c| c.get(1)) {
            Some(body) => clean_inline(body.as_str()),
            None if line.chars().count() > MIN_IMPLICIT_ITEM_CHARS && !line.ends_with(':') => {
                clean_inline(line)
            }
            None => continue,
        };
        if candidate.is_empty() || is_not_applicable(&candidate) {
            continue;
        }
        items.push(candidate);
        if items.len() == MAX_LIST_ITEMS {
            break;
        }
    }
    items
}

fn is_not_applicable(item: &str) -> bool {
    let normalized = item.trim_end_matches('.').trim().to_lowercase();
    matches!(
        normalized.as_str(),
        "n/a" | "na" | "none" | "not applicable"
    ) || normalized.starts_with("n/a ")
}

fn first_line(value: &str) -> Option<&str> {
    value.lines().map(str::trim).find(|l| !l.is_empty())
}

fn clean_inline(text: &str) -> String {
    strip_emphasis(text).trim().to_string()
}

fn strip_emphasis(text: &str) -> String {
    text.replace("**", "").replace("__", "")
}

/// Self-contained narrative: level, primary concern, explanation, and the
/// warning-sign block. Re-parsing it yields the same level.
fn compose_explanation(
    urgency: UrgencyLevel,
    primary_concern: &str,
    explanation: &str,
    warning_signs: &[String],
) -> String {
    let mut out = format!("Triage Level: {}\n", urgency.as_str());
    if !primary_concern.is_empty() {
        out.push_str(&format!("Primary Concern: {primary_concern}\n"));
    }
    if !explanation.is_empty() {
        out.push('\n');
        out.push_str(explanation);
        out.push('\n');
    }
    if !warning_signs.is_empty() {
        out.push('\n');
        out.push_str(WARNING_BLOCK_TITLE);
        for sign in warning_signs {
            out.push_str("\n- ");
            out.push_str(sign);
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "TRIAGE_LEVEL: URGENT

PRIMARY_CONCERN: High fever with vomiting in a child

EXPLANATION: A high fever together with repeated vomiting could be related to an infection that may lead to dehydration, which is more serious in young children.

SUGGESTED_ACTIONS:
- Visit an urgent care clinic within the next few hours
- Offer small sips of fluid frequently
- Keep track of temperature readings

WARNING_SIGNS:
- Difficulty breathing
- No urine for 8 hours or more
- Unusual drowsiness or confusion

SELF_CARE_TIPS: N/A";

    #[test]
    fn well_formed_response_fully_extracted() {
        let verdict = parse_triage_response(WELL_FORMED);
        assert_eq!(verdict.urgency_level(), UrgencyLevel::Urgent);
        assert_eq!(verdict.primary_concern(), "High fever with vomiting in a child");
        assert_eq!(verdict.suggested_actions().len(), 3);
        assert_eq!(verdict.warning_signs()[0], "Difficulty breathing");
        assert!(verdict.self_care_tips().is_empty());
        assert!((verdict.confidence() - 0.85).abs() < 1e-6);
        assert_eq!(verdict.source(), VerdictSource::PrimaryEngine);
    }

    #[test]
    fn composed_explanation_is_self_contained() {
        let verdict = parse_triage_response(WELL_FORMED);
        let explanation = verdict.explanation();
        assert!(explanation.starts_with("Triage Level: URGENT\nPrimary Concern: High fever"));
        assert!(explanation.contains("repeated vomiting could be related to an infection"));
        assert!(explanation.contains("Warning Signs - Seek Immediate Care If:\n- Difficulty breathing"));
    }

    #[test]
    fn emergency_directive_short_circuits() {
        let verdict = parse_triage_response(EMERGENCY_DIRECTIVE);
        assert_eq!(verdict.urgency_level(), UrgencyLevel::Emergency);
        assert_eq!(verdict.explanation(), EMERGENCY_DIRECTIVE);
        assert!(verdict.suggested_actions().is_empty());
        assert!(verdict.warning_signs().is_empty());
        assert_eq!(verdict.confidence(), triage_thresholds::EMERGENCY_DIRECTIVE);
    }

    #[test]
    fn emergency_directive_wins_over_headings() {
        let text = "TRIAGE_LEVEL: ROUTINE\n\nBased on your symptoms, please SEEK EMERGENCY\nmedical   attention immediately.";
        let verdict = parse_triage_response(text);
        assert_eq!(verdict.urgency_level(), UrgencyLevel::Emergency);
    }

    #[test]
    fn missing_level_defaults_to_routine() {
        let text = "PRIMARY_CONCERN: Sore throat\n\nEXPLANATION: Could be related to a common viral infection of the upper airways, which usually settles.";
        let verdict = parse_triage_response(text);
        assert_eq!(verdict.urgency_level(), UrgencyLevel::Routine);
        assert!(verdict.confidence() < triage_thresholds::LOW);
    }

    #[test]
    fn unknown_level_defaults_to_routine() {
        let verdict = parse_triage_response("TRIAGE_LEVEL: CRITICAL\nPRIMARY_CONCERN: Rash");
        assert_eq!(verdict.urgency_level(), UrgencyLevel::Routine);
        let verdict = parse_triage_response("TRIAGE_LEVEL: GP\nPRIMARY_CONCERN: Rash");
        assert_eq!(verdict.urgency_level(), UrgencyLevel::Routine);
    }

    #[test]
    fn ambiguous_level_defaults_to_routine_with_lower_confidence() {
        let verdict = parse_triage_response("TRIAGE_LEVEL: URGENT or ROUTINE\nPRIMARY_CONCERN: Cough");
        assert_eq!(verdict.urgency_level(), UrgencyLevel::Routine);
        let explicit = parse_triage_response("TRIAGE_LEVEL: URGENT\nPRIMARY_CONCERN: Cough");
        assert!(verdict.confidence() < explicit.confidence());
    }

    #[test]
    fn level_description_does_not_confuse_lookup() {
        let verdict = parse_triage_response("TRIAGE_LEVEL: SELF_CARE (non-urgent, manage at home)");
        assert_eq!(verdict.urgency_level(), UrgencyLevel::SelfCare);
        let verdict = parse_triage_response("TRIAGE_LEVEL: Emergency - seek immediate emergency care");
        assert_eq!(verdict.urgency_level(), UrgencyLevel::Emergency);
    }

    #[test]
    fn level_on_following_line() {
        let verdict = parse_triage_response("TRIAGE_LEVEL:\n\nSelf Care\n\nPRIMARY_CONCERN: Runny nose");
        assert_eq!(verdict.urgency_level(), UrgencyLevel::SelfCare);
        assert_eq!(verdict.primary_concern(), "Runny nose");
    }

    #[test]
    fn reordered_sections_extracted_independently() {
        let text = "WARNING_SIGNS:\n- Fever above 39C\nSELF_CARE_TIPS:\n- Rest as much as possible\nTRIAGE_LEVEL: SELF_CARE\nPRIMARY_CONCERN: Mild cold";
        let verdict = parse_triage_response(text);
        assert_eq!(verdict.urgency_level(), UrgencyLevel::SelfCare);
        assert_eq!(verdict.primary_concern(), "Mild cold");
        assert_eq!(verdict.warning_signs(), ["Fever above 39C"]);
        assert_eq!(verdict.self_care_tips(), ["Rest as much as possible"]);
    }

    #[test]
    fn markdown_and_numbered_headings_tolerated() {
        let text = "1. **TRIAGE_LEVEL:** Urgent\n\n## Primary Concern\nEar pain\n\n**Suggested Actions:**\n* See a clinician today\n* Avoid inserting anything into the ear";
        let verdict = parse_triage_response(text);
        assert_eq!(verdict.urgency_level(), UrgencyLevel::Urgent);
        assert_eq!(verdict.primary_concern(), "Ear pain");
        assert_eq!(verdict.suggested_actions().len(), 2);
        assert_eq!(verdict.suggested_actions()[0], "See a clinician today");
    }

    #[test]
    fn mixed_case_heading_needs_separator() {
        // "Warning signs include" is prose inside the actions list, not a heading.
        let text = "TRIAGE_LEVEL: ROUTINE\nSUGGESTED_ACTIONS:\nBook an appointment with your doctor this week\nWarning signs include rising fever or stiff neck";
        let verdict = parse_triage_response(text);
        assert_eq!(verdict.suggested_actions().len(), 2);
        assert!(verdict.warning_signs().is_empty());
    }

    #[test]
    fn implicit_items_without_bullets() {
        let text = "TRIAGE_LEVEL: SELF_CARE\nSELF_CARE_TIPS:\nDrink plenty of fluids\nGet enough rest\nOk\nUse a humidifier at night";
        let verdict = parse_triage_response(text);
        assert_eq!(
            verdict.self_care_tips(),
            ["Drink plenty of fluids", "Get enough rest", "Use a humidifier at night"]
        );
    }

    #[test]
    fn numbered_and_lettered_items() {
        let text = "SUGGESTED_ACTIONS:\n1. Call your doctor\n2) Rest\na. Keep a symptom diary\nb) Avoid strenuous exercise";
        let verdict = parse_triage_response(text);
        assert_eq!(
            verdict.suggested_actions(),
            ["Call your doctor", "Rest", "Keep a symptom diary", "Avoid strenuous exercise"]
        );
    }

    #[test]
    fn lists_capped_at_seven() {
        let items: String = (1..=12).map(|i| format!("- Warning sign number {i}\n")).collect();
        let text = format!("TRIAGE_LEVEL: ROUTINE\nWARNING_SIGNS:\n{items}SUGGESTED_ACTIONS:\n{items}");
        let verdict = parse_triage_response(&text);
        assert_eq!(verdict.warning_signs().len(), MAX_LIST_ITEMS);
        assert_eq!(verdict.suggested_actions().len(), MAX_LIST_ITEMS);
        assert_eq!(verdict.warning_signs()[6], "Warning sign number 7");
    }

    #[test]
    fn short_explanation_falls_back_to_prefix() {
        let text = format!(
            "TRIAGE_LEVEL: ROUTINE\nEXPLANATION: Unclear.\nSUGGESTED_ACTIONS:\n- {}",
            "Book a routine appointment with your family doctor to review these symptoms"
        );
        let verdict = parse_triage_response(&text);
        assert!(verdict.explanation().contains("EXPLANATION: Unclear."));
    }

    #[test]
    fn long_unstructured_text_is_degraded_not_rejected() {
        let text = "I think the symptoms you describe are probably nothing serious but it is hard to say without more detail. ".repeat(10);
        let verdict = parse_triage_response(&text);
        assert_eq!(verdict.urgency_level(), UrgencyLevel::Routine);
        assert_eq!(verdict.confidence(), triage_thresholds::UNSTRUCTURED);
        assert!(!verdict.explanation().is_empty());
        // Prefix is bounded.
        assert!(verdict.explanation().chars().count() < EXPLANATION_PREFIX_CHARS + 40);
    }

    #[test]
    fn short_unstructured_text_kept_as_explanation() {
        let verdict = parse_triage_response("Please rest.");
        assert!(verdict.explanation().contains("Please rest."));
    }

    #[test]
    fn empty_text_yields_default_verdict() {
        let verdict = parse_triage_response("");
        assert_eq!(verdict.urgency_level(), UrgencyLevel::Routine);
        assert_eq!(verdict.confidence(), triage_thresholds::UNSTRUCTURED);
    }

    #[test]
    fn first_occurrence_of_section_wins() {
        let verdict = parse_triage_response("TRIAGE_LEVEL: URGENT\nTRIAGE_LEVEL: SELF_CARE");
        assert_eq!(verdict.urgency_level(), UrgencyLevel::Urgent);
    }

    #[test]
    fn reparsing_composed_explanation_keeps_level() {
        let samples = [
            WELL_FORMED.to_string(),
            EMERGENCY_DIRECTIVE.to_string(),
            "TRIAGE_LEVEL: URGENT or ROUTINE\nPRIMARY_CONCERN: Cough".to_string(),
            "TRIAGE_LEVEL: SELF_CARE\nWARNING_SIGNS:\n- High fever\n- Stiff neck".to_string(),
            "TRIAGE_LEVEL: EMERGENCY\nPRIMARY_CONCERN: Sudden weakness on one side".to_string(),
            "no structure at all, just words about a headache that keeps coming back every day".to_string(),
            String::new(),
            "TRIAGE_LEVEL: URGENT\nEXPLANATION: If this gets worse, seek **emergency** medical attention immediately.".to_string(),
        ];
        for sample in samples {
            let first = parse_triage_response(&sample);
            let second = parse_triage_response(first.explanation());
            assert_eq!(
                first.urgency_level(),
                second.urgency_level(),
                "level changed on re-parse of {sample:?}"
            );
        }
    }

    #[test]
    fn emphasised_directive_short_circuits() {
        let raw = "TRIAGE_LEVEL: URGENT\nEXPLANATION: Please seek **emergency** medical\n__attention__ immediately.";
        let verdict = parse_triage_response(raw);
        assert_eq!(verdict.urgency_level(), UrgencyLevel::Emergency);
        assert_eq!(
            parse_triage_response(verdict.explanation()).urgency_level(),
            UrgencyLevel::Emergency
        );
    }
}
