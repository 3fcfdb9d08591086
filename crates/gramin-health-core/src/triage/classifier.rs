//! Symptom classifier.

use serde::Deserialize;
use strsim::jaro_winkler;
use thiserror::Error;

use super::{ArtifactError, ArtifactResult};

/// Minimum similarity for a single-word keyword to match a token.
pub const TOKEN_MATCH_THRESHOLD: f64 = 0.92;

/// Classifier errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("No symptom text to classify")]
    EmptyInput,

    #[error("No known symptom found in text")]
    NoSignal,

    #[error("Classifier failure: {0}")]
    Model(String),
}

pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Maps free-text symptoms to a disease label.
pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str) -> ClassifierResult<String>;
}

#[derive(Debug, Deserialize)]
struct ClassifierArtifact {
    #[serde(default)]
    version: Option<String>,
    labels: Vec<LabelEntry>,
}

#[derive(Debug, Deserialize)]
struct LabelEntry {
    label: String,
    keywords: Vec<String>,
}

#[derive(Debug, Clone)]
struct LabelKeywords {
    label: String,
    /// Multi-word keywords, matched by containment
    phrases: Vec<String>,
    /// Single-word keywords, matched by token similarity
    words: Vec<String>,
}

/// Keyword-evidence classifier loaded from a JSON artifact.
///
/// Each label scores one point per keyword found in the text. A phrase
/// matches when it appears as whole words; a single word matches any token
/// within [`TOKEN_MATCH_THRESHOLD`] Jaro-Winkler similarity, which absorbs
/// common misspellings. The highest score wins and ties go to the label
/// listed first.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    version: Option<String>,
    labels: Vec<LabelKeywords>,
}

impl KeywordClassifier {
    /// Parse and validate a classifier artifact.
    pub fn from_json_bytes(bytes: &[u8]) -> ArtifactResult<Self> {
        let artifact: ClassifierArtifact = serde_json::from_slice(bytes)?;

        if artifact.labels.is_empty() {
            return Err(ArtifactError::Invalid("classifier has no labels".into()));
        }

        let mut labels = Vec::with_capacity(artifact.labels.len());
        for entry in artifact.labels {
            let label = entry.label.trim().to_string();
            if label.is_empty() {
                return Err(ArtifactError::Invalid("classifier label is blank".into()));
            }

            let (phrases, words): (Vec<String>, Vec<String>) = entry
                .keywords
                .iter()
                .map(|k| normalize_text(&k.replace('_', " ")))
                .filter(|k| !k.is_empty())
                .partition(|k| k.contains(' '));

            if phrases.is_empty() && words.is_empty() {
                return Err(ArtifactError::Invalid(format!(
                    "label '{}' has no keywords",
                    label
                )));
            }

            labels.push(LabelKeywords {
                label,
                phrases,
                words,
            });
        }

        Ok(Self {
            version: artifact.version,
            labels,
        })
    }

    /// Version string declared in the artifact.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn score(entry: &LabelKeywords, padded: &str, tokens: &[&str]) -> usize {
        let phrase_hits = entry
            .phrases
            .iter()
            .filter(|phrase| padded.contains(&format!(" {} ", phrase)))
            .count();

        let word_hits = entry
            .words
            .iter()
            .filter(|word| {
                tokens
                    .iter()
                    .any(|token| jaro_winkler(token, word) >= TOKEN_MATCH_THRESHOLD)
            })
            .count();

        phrase_hits + word_hits
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, text: &str) -> ClassifierResult<String> {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return Err(ClassifierError::EmptyInput);
        }

        let padded = format!(" {} ", normalized);
        let tokens: Vec<&str> = normalized.split(' ').collect();

        let mut best: Option<(&str, usize)> = None;
        for entry in &self.labels {
            let score = Self::score(entry, &padded, &tokens);
            // Strictly greater keeps the earlier label on ties
            if score > 0 && best.map_or(true, |(_, top)| score > top) {
                best = Some((entry.label.as_str(), score));
            }
        }

        best.map(|(label, _)| label.to_string())
            .ok_or(ClassifierError::NoSignal)
    }
}

/// Lowercase, replace punctuation with spaces and collapse whitespace.
fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTIFACT: &str = r#"{
        "version": "test-1",
        "labels": [
            {"label": "Malaria", "keywords": ["fever", "chills", "sweating"]},
            {"label": "Common Cold", "keywords": ["runny_nose", "sneezing", "cough"]},
            {"label": "Migraine", "keywords": ["headache", "blurred vision"]}
        ]
    }"#;

    fn classifier() -> KeywordClassifier {
        KeywordClassifier::from_json_bytes(ARTIFACT.as_bytes()).unwrap()
    }

    #[test]
    fn test_best_label_wins() {
        let c = classifier();
        assert_eq!(c.classify("High fever with chills at night").unwrap(), "Malaria");
        assert_eq!(c.classify("runny nose and sneezing").unwrap(), "Common Cold");
    }

    #[test]
    fn test_phrase_needs_whole_words() {
        let c = classifier();
        assert_eq!(c.classify("Blurred vision since morning").unwrap(), "Migraine");
        assert_eq!(c.classify("unblurred visions"), Err(ClassifierError::NoSignal));
    }

    #[test]
    fn test_misspelling_tolerated() {
        assert_eq!(classifier().classify("feverr and chils").unwrap(), "Malaria");
    }

    #[test]
    fn test_tie_goes_to_first_label() {
        // One keyword each for Malaria and Common Cold
        assert_eq!(classifier().classify("fever cough").unwrap(), "Malaria");
    }

    #[test]
    fn test_empty_and_no_signal() {
        let c = classifier();
        assert_eq!(c.classify("   "), Err(ClassifierError::EmptyInput));
        assert_eq!(c.classify("?!"), Err(ClassifierError::EmptyInput));
        assert_eq!(c.classify("my knee hurts"), Err(ClassifierError::NoSignal));
    }

    #[test]
    fn test_artifact_validation() {
        assert!(matches!(
            KeywordClassifier::from_json_bytes(br#"{"labels": []}"#),
            Err(ArtifactError::Invalid(_))
        ));
        assert!(matches!(
            KeywordClassifier::from_json_bytes(br#"{"labels": [{"label": "X", "keywords": [" "]}]}"#),
            Err(ArtifactError::Invalid(_))
        ));
        assert!(matches!(
            KeywordClassifier::from_json_bytes(b"not json"),
            Err(ArtifactError::Json(_))
        ));
    }

    #[test]
    fn test_version() {
        assert_eq!(classifier().version(), Some("test-1"));
    }
}
