//! Trusted treatment reference.

use std::collections::HashMap;

use serde::Deserialize;

use super::{ArtifactError, ArtifactResult};

/// One row of the treatment reference artifact.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TreatmentEntry {
    #[serde(alias = "Disease")]
    pub disease: String,
    #[serde(alias = "Treatment")]
    pub treatment: String,
}

/// Disease label to treatment text, matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct TreatmentReference {
    treatments: HashMap<String, String>,
}

impl TreatmentReference {
    /// Build from entries. The first entry for a label wins.
    pub fn from_entries(entries: impl IntoIterator<Item = TreatmentEntry>) -> Self {
        let mut treatments = HashMap::new();
        for entry in entries {
            let key = lookup_key(&entry.disease);
            if key.is_empty() {
                continue;
            }
            treatments.entry(key).or_insert(entry.treatment);
        }
        Self { treatments }
    }

    /// Parse and validate a reference artifact (a JSON array of entries).
    pub fn from_json_bytes(bytes: &[u8]) -> ArtifactResult<Self> {
        let entries: Vec<TreatmentEntry> = serde_json::from_slice(bytes)?;
        let reference = Self::from_entries(entries);
        if reference.is_empty() {
            return Err(ArtifactError::Invalid("treatment reference is empty".into()));
        }
        Ok(reference)
    }

    /// Treatment text for a predicted label.
    pub fn lookup(&self, label: &str) -> Option<&str> {
        self.treatments.get(&lookup_key(label)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.treatments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.treatments.is_empty()
    }
}

fn lookup_key(label: &str) -> String {
    label.trim().to_lowercase()
}
