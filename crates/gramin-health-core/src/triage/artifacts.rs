//! Model artifact loading and fingerprinting.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::{Classifier, KeywordClassifier, TreatmentReference};

/// Artifact loading errors.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Cannot read artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed artifact JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid artifact: {0}")]
    Invalid(String),
}

pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// Where the classifier and treatment reference live on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArtifactPaths {
    pub classifier_path: PathBuf,
    pub treatments_path: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            classifier_path: PathBuf::from("data/classifier.json"),
            treatments_path: PathBuf::from("data/treatments.json"),
        }
    }
}

/// Read-only model state, loaded once and shared across requests.
pub struct ModelArtifacts {
    pub classifier: Box<dyn Classifier>,
    pub reference: TreatmentReference,
    /// Fingerprint recorded on every report produced with these artifacts
    pub version: String,
}

impl ModelArtifacts {
    /// Assemble artifacts from parts already in memory.
    pub fn new(
        classifier: Box<dyn Classifier>,
        reference: TreatmentReference,
        version: impl Into<String>,
    ) -> Self {
        Self {
            classifier,
            reference,
            version: version.into(),
        }
    }

    /// Load both artifacts. Any failure means the model is unavailable.
    pub fn load(paths: &ArtifactPaths) -> ArtifactResult<Self> {
        let classifier_bytes = read_artifact(&paths.classifier_path)?;
        let reference_bytes = read_artifact(&paths.treatments_path)?;

        let classifier = KeywordClassifier::from_json_bytes(&classifier_bytes)?;
        let reference = TreatmentReference::from_json_bytes(&reference_bytes)?;
        let version = fingerprint(&classifier_bytes, &reference_bytes);

        tracing::info!(
            version = %version,
            classifier_version = classifier.version().unwrap_or("unversioned"),
            treatments = reference.len(),
            "Model artifacts loaded"
        );

        Ok(Self::new(Box::new(classifier), reference, version))
    }
}

/// SHA-256 over the classifier bytes followed by the reference bytes.
pub fn fingerprint(classifier_bytes: &[u8], reference_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    for part in [classifier_bytes, reference_bytes] {
        // Length prefix keeps the boundary between the two files unambiguous
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

fn read_artifact(path: &Path) -> ArtifactResult<Vec<u8>> {
    fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.display().to_string(),
        source,
    })
}
