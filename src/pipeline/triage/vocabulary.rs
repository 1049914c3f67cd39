use std::ops::Range;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::TriageError;

/// Checkbox vocabulary offered by the symptom form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymptomId {
    Fever,
    ChestPain,
    Breathlessness,
    Vomiting,
    Drowsy,
    RunnyNose,
    Headache,
    Cough,
    SoreThroat,
    BodyAche,
    Fatigue,
    Nausea,
    Dizziness,
    AbdominalPain,
}

impl SymptomId {
    pub const ALL: [SymptomId; 14] = [
        SymptomId::Fever,
        SymptomId::ChestPain,
        SymptomId::Breathlessness,
        SymptomId::Vomiting,
        SymptomId::Drowsy,
        SymptomId::RunnyNose,
        SymptomId::Headache,
        SymptomId::Cough,
        SymptomId::SoreThroat,
        SymptomId::BodyAche,
        SymptomId::Fatigue,
        SymptomId::Nausea,
        SymptomId::Dizziness,
        SymptomId::AbdominalPain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fever => "fever",
            Self::ChestPain => "chest_pain",
            Self::Breathlessness => "breathlessness",
            Self::Vomiting => "vomiting",
            Self::Drowsy => "drowsy",
            Self::RunnyNose => "runny_nose",
            Self::Headache => "headache",
            Self::Cough => "cough",
            Self::SoreThroat => "sore_throat",
            Self::BodyAche => "body_ache",
            Self::Fatigue => "fatigue",
            Self::Nausea => "nausea",
            Self::Dizziness => "dizziness",
            Self::AbdominalPain => "abdominal_pain",
        }
    }

    /// Canonical phrase used in prompts, rules and keyword extraction.
    pub fn phrase(&self) -> &'static str {
        match self {
            Self::Fever => "fever",
            Self::ChestPain => "chest pain",
            Self::Breathlessness => "shortness of breath",
            Self::Vomiting => "vomiting",
            Self::Drowsy => "drowsiness",
            Self::RunnyNose => "runny nose",
            Self::Headache => "headache",
            Self::Cough => "cough",
            Self::SoreThroat => "sore throat",
            Self::BodyAche => "body ache",
            Self::Fatigue => "fatigue",
            Self::Nausea => "nausea",
            Self::Dizziness => "dizziness",
            Self::AbdominalPain => "abdominal pain",
        }
    }

    /// Parse a checkbox id. Both `chest_pain` and `chest-pain` are accepted;
    /// anything outside the vocabulary yields `None`.
    pub fn parse(id: &str) -> Option<Self> {
        let normalized = id.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|s| s.as_str() == normalized)
    }
}

/// One free-text surface form and the canonical phrase it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub phrase: String,
    pub canonical: String,
}

impl KeywordEntry {
    pub fn new(phrase: &str, canonical: &str) -> Self {
        Self {
            phrase: phrase.to_string(),
            canonical: canonical.to_string(),
        }
    }
}

/// (surface phrase, canonical phrase) pairs for the default catalog.
const DEFAULT_KEYWORDS: &[(&str, &str)] = &[
    ("sudden severe headache", "sudden severe headache"),
    ("loss of consciousness", "loss of consciousness"),
    ("shortness of breath", "shortness of breath"),
    ("difficulty breathing", "difficulty breathing"),
    ("trouble breathing", "difficulty breathing"),
    ("breathing difficulty", "difficulty breathing"),
    ("struggling to breathe", "shortness of breath"),
    ("hard to breathe", "shortness of breath"),
    ("short of breath", "shortness of breath"),
    ("can't breathe", "shortness of breath"),
    ("cannot breathe", "shortness of breath"),
    ("can not breathe", "shortness of breath"),
    ("severe bleeding", "severe bleeding"),
    ("heavy bleeding", "severe bleeding"),
    ("persistent cough", "persistent cough"),
    ("chest pressure", "chest pain"),
    ("chest tightness", "chest pain"),
    ("chest pain", "chest pain"),
    ("slurred speech", "slurred speech"),
    ("face drooping", "facial drooping"),
    ("facial drooping", "facial drooping"),
    ("passed out", "loss of consciousness"),
    ("throwing up", "vomiting"),
    ("high fever", "high fever"),
    ("stiff neck", "stiff neck"),
    ("runny nose", "runny nose"),
    ("stuffy nose", "runny nose"),
    ("sore throat", "sore throat"),
    ("body aches", "body ache"),
    ("body ache", "body ache"),
    ("abdominal pain", "abdominal pain"),
    ("stomach pain", "abdominal pain"),
    ("belly pain", "abdominal pain"),
    ("weight loss", "weight loss"),
    ("mild cough", "mild cough"),
    ("breathlessness", "shortness of breath"),
    ("unconscious", "loss of consciousness"),
    ("fainted", "loss of consciousness"),
    ("seizure", "seizure"),
    ("wheezing", "wheezing"),
    ("fever", "fever"),
    ("feverish", "fever"),
    ("cough", "cough"),
    ("coughing", "cough"),
    ("headache", "headache"),
    ("migraine", "headache"),
    ("vomiting", "vomiting"),
    ("vomit", "vomiting"),
    ("nausea", "nausea"),
    ("nauseous", "nausea"),
    ("diarrhea", "diarrhea"),
    ("diarrhoea", "diarrhea"),
    ("dizziness", "dizziness"),
    ("dizzy", "dizziness"),
    ("drowsy", "drowsiness"),
    ("drowsiness", "drowsiness"),
    ("confused", "confusion"),
    ("confusion", "confusion"),
    ("fatigue", "fatigue"),
    ("exhausted", "fatigue"),
    ("tired", "fatigue"),
    ("sneezing", "sneezing"),
    ("rash", "rash"),
    ("sweating", "sweating"),
    ("bleeding", "bleeding"),
];

/// Free-text keyword scanner with an explicit precedence order.
///
/// Entries are tried in order; a match is accepted only if its span does not
/// overlap a span consumed by an earlier entry, so "difficulty breathing"
/// placed before "breathing" suppresses the shorter match inside it.
#[derive(Debug, Clone)]
pub struct KeywordCatalog {
    entries: Vec<CompiledKeyword>,
}

#[derive(Debug, Clone)]
struct CompiledKeyword {
    regex: Regex,
    entry: KeywordEntry,
}

impl KeywordCatalog {
    /// Build a catalog that keeps the caller's precedence order.
    pub fn new(entries: Vec<KeywordEntry>) -> Result<Self, TriageError> {
        let entries = entries
            .into_iter()
            .filter(|e| !e.phrase.trim().is_empty())
            .map(|entry| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(entry.phrase.trim()));
                Regex::new(&pattern)
                    .map(|regex| CompiledKeyword { regex, entry })
                    .map_err(|e| TriageError::Configuration(format!("keyword pattern: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Build a catalog ordered most-specific first: more words, then longer.
    pub fn by_specificity(mut entries: Vec<KeywordEntry>) -> Result<Self, TriageError> {
        entries.sort_by_key(|e| {
            (
                std::cmp::Reverse(e.phrase.split_whitespace().count()),
                std::cmp::Reverse(e.phrase.len()),
            )
        });
        Self::new(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical phrases found in `text`, in precedence order, deduplicated.
    pub fn scan(&self, text: &str) -> Vec<String> {
        let normalized = normalize_apostrophes(text);
        let mut consumed: Vec<Range<usize>> = Vec::new();
        let mut found: Vec<String> = Vec::new();

        for compiled in &self.entries {
            let hit = compiled
                .regex
                .find_iter(&normalized)
                .map(|m| m.range())
                .find(|range| !consumed.iter().any(|c| overlaps(c, range)));

            if let Some(range) = hit {
                consumed.push(range);
                if !found.contains(&compiled.entry.canonical) {
                    found.push(compiled.entry.canonical.clone());
                }
            }
        }

        found
    }
}

impl Default for KeywordCatalog {
    fn default() -> Self {
        let entries = DEFAULT_KEYWORDS
            .iter()
            .map(|(phrase, canonical)| KeywordEntry::new(phrase, canonical))
            .collect();
        // Escaped literals always compile.
        Self::by_specificity(entries).unwrap_or(Self { entries: Vec::new() })
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

fn normalize_apostrophes(text: &str) -> String {
    text.replace(['\u{2019}', '\u{2018}'], "'")
}
