//! Symptom triage pipeline.
//!
//! Classify → look up trusted treatment → reformat. Each stage has its own
//! fallback, so a prediction is always produced:
//!
//! | Failure                         | Tier               |
//! |---------------------------------|--------------------|
//! | artifacts not loaded            | `ModelUnavailable` |
//! | classifier error                | `AnalysisFailed`   |
//! | no treatment for label          | `Minimal`          |
//! | formatter unreachable / timeout | `Degraded`         |
//! | formatter output unusable       | `Degraded`         |
//! | none                            | `Full`             |

mod artifacts;
mod classifier;
mod reference;

pub use artifacts::*;
pub use classifier::*;
pub use reference::*;

use std::sync::Arc;

use gramin_health_llm::{FormattedReport, ReportFormatter};

use crate::models::{DegradedReason, TriagePrediction, TriageReport};

/// Runs triage against shared, read-only artifacts.
pub struct TriagePipeline {
    artifacts: Option<Arc<ModelArtifacts>>,
    formatter: Arc<dyn ReportFormatter>,
}

impl TriagePipeline {
    /// `None` artifacts puts the pipeline in the unavailable state for its lifetime.
    pub fn new(artifacts: Option<Arc<ModelArtifacts>>, formatter: Arc<dyn ReportFormatter>) -> Self {
        Self {
            artifacts,
            formatter,
        }
    }

    /// Load artifacts from disk, degrading to unavailable on any error.
    pub fn from_paths(paths: &ArtifactPaths, formatter: Arc<dyn ReportFormatter>) -> Self {
        let artifacts = match ModelArtifacts::load(paths) {
            Ok(artifacts) => Some(Arc::new(artifacts)),
            Err(e) => {
                tracing::error!(error = %e, "Model artifacts failed to load; triage unavailable");
                None
            }
        };
        Self::new(artifacts, formatter)
    }

    pub fn is_available(&self) -> bool {
        self.artifacts.is_some()
    }

    /// Fingerprint of the loaded artifacts.
    pub fn model_version(&self) -> Option<&str> {
        self.artifacts.as_deref().map(|a| a.version.as_str())
    }

    /// Predict from symptom text.
    pub fn predict(&self, text: &str) -> TriagePrediction {
        let Some(artifacts) = self.artifacts.as_deref() else {
            tracing::warn!("Triage requested but model artifacts are unavailable");
            return TriagePrediction::model_unavailable();
        };

        let label = match artifacts.classifier.classify(text) {
            Ok(label) => label,
            Err(e) => {
                tracing::warn!(error = %e, "Symptom classification failed");
                return TriagePrediction::analysis_failed();
            }
        };

        let Some(treatment) = artifacts.reference.lookup(&label) else {
            tracing::info!(label = %label, "No treatment on file for predicted label");
            return TriagePrediction::minimal(label);
        };

        match self.formatter.format_report(&label, treatment) {
            Ok(report) => {
                tracing::info!(label = %label, "Triage report formatted");
                full_prediction(label, report)
            }
            Err(e) if e.is_unavailable() => {
                tracing::warn!(label = %label, error = %e, "Formatter unavailable; using raw treatment");
                TriagePrediction::degraded(
                    label,
                    treatment.to_string(),
                    DegradedReason::FormatterUnavailable,
                )
            }
            Err(e) => {
                tracing::warn!(label = %label, error = %e, "Formatter output unusable; using raw treatment");
                TriagePrediction::degraded(label, treatment.to_string(), DegradedReason::FormattingFailed)
            }
        }
    }

    /// Build a report for a caregiver submission. The complaint and notes
    /// are classified together.
    pub fn assess(&self, patient_id: &str, chief_complaint: &str, notes: &str) -> TriageReport {
        let text = format!("{} {}", chief_complaint, notes);
        let prediction = self.predict(&text);
        TriageReport::new(
            patient_id.to_string(),
            chief_complaint.to_string(),
            notes.to_string(),
            prediction,
            self.model_version().map(str::to_string),
        )
    }
}

fn full_prediction(label: String, report: FormattedReport) -> TriagePrediction {
    let FormattedReport {
        intensity,
        recommendation,
        home_remedies,
        emergency,
        doctor_note,
    } = report;
    TriagePrediction::full(label, doctor_note, intensity, recommendation, home_remedies, emergency)
}
