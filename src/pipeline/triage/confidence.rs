/// Confidence levels assigned to verdicts.
pub mod triage_thresholds {
    /// The engine answered with the fixed emergency directive.
    pub const EMERGENCY_DIRECTIVE: f32 = 0.95;

    /// TRIAGE_LEVEL present and naming exactly one known level.
    pub const EXPLICIT_LEVEL: f32 = 0.85;

    /// TRIAGE_LEVEL missing or outside the closed vocabulary.
    pub const MISSING_LEVEL: f32 = 0.40;

    /// TRIAGE_LEVEL naming more than one level.
    pub const AMBIGUOUS_LEVEL: f32 = 0.35;

    /// No recognisable section at all: degraded verdict.
    pub const UNSTRUCTURED: f32 = 0.05;

    /// Backend answered without a score of its own.
    pub const BACKEND_DEFAULT: f32 = 0.60;

    /// Below this a verdict should be presented as tentative.
    pub const LOW: f32 = 0.50;
}

/// How the urgency token was resolved from engine output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelResolution {
    Explicit,
    Missing,
    Ambiguous,
}

/// Number of sections besides TRIAGE_LEVEL.
const OTHER_SECTIONS: usize = 5;

/// Score a parsed (non-emergency) engine response.
///
/// The base comes from how the level was resolved and is scaled by how much
/// of the remaining section structure the engine honoured.
pub fn compute_parse_confidence(resolution: LevelResolution, other_sections_found: usize) -> f32 {
    if resolution == LevelResolution::Missing && other_sections_found == 0 {
        return triage_thresholds::UNSTRUCTURED;
    }

    let base = match resolution {
        LevelResolution::Explicit => triage_thresholds::EXPLICIT_LEVEL,
        LevelResolution::Missing => triage_thresholds::MISSING_LEVEL,
        LevelResolution::Ambiguous => triage_thresholds::AMBIGUOUS_LEVEL,
    };

    let found = other_sections_found.min(OTHER_SECTIONS) as f32;
    let completeness = 0.6 + 0.4 * found / OTHER_SECTIONS as f32;

    (base * completeness).clamp(0.0, 1.0)
}

/// Confidence for a backend verdict: the backend's own score when it is a
/// usable number, otherwise the default.
pub fn backend_confidence(reported: Option<f32>) -> f32 {
    match reported {
        Some(score) if score.is_finite() => score.clamp(0.0, 1.0),
        _ => triage_thresholds::BACKEND_DEFAULT,
    }
}
