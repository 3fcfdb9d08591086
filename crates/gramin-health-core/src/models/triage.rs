//! Triage prediction and report models.

use serde::{Deserialize, Serialize};

pub const MODEL_UNAVAILABLE_MESSAGE: &str = "Local AI model is not available.";
pub const ANALYSIS_FAILED_MESSAGE: &str = "Could not analyze symptoms.";
pub const DEFAULT_EMERGENCY_NOTE: &str =
    "Monitor for 1-2 days. If symptoms do not improve or worsen, a physical hospital visit is required.";

/// Fidelity of a triage prediction, highest first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PredictionTier {
    /// Formatter produced a structured report.
    Full,
    /// Trusted treatment text shown raw because formatting did not succeed.
    Degraded,
    /// Label predicted but no treatment on file.
    Minimal,
    /// Classifier or treatment artifacts were not loaded at startup.
    ModelUnavailable,
    /// Classifier failed on this input.
    AnalysisFailed,
}

impl PredictionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionTier::Full => "full",
            PredictionTier::Degraded => "degraded",
            PredictionTier::Minimal => "minimal",
            PredictionTier::ModelUnavailable => "model_unavailable",
            PredictionTier::AnalysisFailed => "analysis_failed",
        }
    }
}

/// Why a prediction fell back to the degraded tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    /// Network, timeout or HTTP failure.
    FormatterUnavailable,
    /// The call succeeded but no usable report came back.
    FormattingFailed,
}

/// Structured triage output. Rendering is separate, see [`TriagePrediction::render`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriagePrediction {
    pub tier: PredictionTier,
    pub predicted_label: Option<String>,
    pub doctor_note: Option<String>,
    pub intensity: Option<String>,
    pub recommendations: Vec<String>,
    pub home_remedies: Vec<String>,
    pub emergency_note: Option<String>,
    pub raw_treatment: Option<String>,
    pub degraded_reason: Option<DegradedReason>,
}

impl TriagePrediction {
    fn terminal(tier: PredictionTier) -> Self {
        Self {
            tier,
            predicted_label: None,
            doctor_note: None,
            intensity: None,
            recommendations: Vec::new(),
            home_remedies: Vec::new(),
            emergency_note: None,
            raw_treatment: None,
            degraded_reason: None,
        }
    }

    pub fn model_unavailable() -> Self {
        Self::terminal(PredictionTier::ModelUnavailable)
    }

    pub fn analysis_failed() -> Self {
        Self::terminal(PredictionTier::AnalysisFailed)
    }

    pub fn minimal(predicted_label: String) -> Self {
        Self {
            predicted_label: Some(predicted_label),
            ..Self::terminal(PredictionTier::Minimal)
        }
    }

    pub fn degraded(predicted_label: String, raw_treatment: String, reason: DegradedReason) -> Self {
        Self {
            predicted_label: Some(predicted_label),
            raw_treatment: Some(raw_treatment),
            degraded_reason: Some(reason),
            ..Self::terminal(PredictionTier::Degraded)
        }
    }

    pub fn full(
        predicted_label: String,
        doctor_note: Option<String>,
        intensity: Option<String>,
        recommendations: Vec<String>,
        home_remedies: Vec<String>,
        emergency_note: Option<String>,
    ) -> Self {
        Self {
            tier: PredictionTier::Full,
            predicted_label: Some(predicted_label),
            doctor_note,
            intensity,
            recommendations,
            home_remedies,
            emergency_note,
            raw_treatment: None,
            degraded_reason: None,
        }
    }

    /// Render as plain text. Never empty.
    pub fn render(&self) -> String {
        let label = self.predicted_label.as_deref().unwrap_or_default();
        let treatment = self.raw_treatment.as_deref().unwrap_or_default();

        match self.tier {
            PredictionTier::ModelUnavailable => MODEL_UNAVAILABLE_MESSAGE.to_string(),
            PredictionTier::AnalysisFailed => ANALYSIS_FAILED_MESSAGE.to_string(),
            PredictionTier::Minimal => {
                format!("Predicted Issue: {}; no treatment on file.", label)
            }
            PredictionTier::Degraded => match self.degraded_reason {
                Some(DegradedReason::FormattingFailed) => format!(
                    "Predicted Issue: {}\n\n(API Formatting Failed) Raw Treatment: {}",
                    label, treatment
                ),
                _ => format!(
                    "Predicted Issue: {}\n\n(API Unavailable)\nSuggested Treatment: {}",
                    label, treatment
                ),
            },
            PredictionTier::Full => format!(
                "Predicted Issue: {}\n\nIntensity: {}\n\nRecommendation:\n{}\n\nHome Remedies:\n{}\n\nEmergency Note: {}",
                self.doctor_note.as_deref().unwrap_or(label),
                self.intensity.as_deref().unwrap_or("N/A"),
                bullet_list(&self.recommendations),
                bullet_list(&self.home_remedies),
                self.emergency_note.as_deref().unwrap_or(DEFAULT_EMERGENCY_NOTE),
            ),
        }
    }
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return " - N/A".to_string();
    }
    items
        .iter()
        .map(|item| format!(" - {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A persisted triage report. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageReport {
    pub report_id: String,
    pub patient_id: String,
    pub chief_complaint: String,
    pub notes: String,
    pub prediction: TriagePrediction,
    /// Plain-text rendering of `prediction`
    pub prediction_text: String,
    /// Fingerprint of the artifacts that produced the prediction
    pub model_version: Option<String>,
    pub created_at: String,
}

impl TriageReport {
    /// Create a new report, rendering the prediction text.
    pub fn new(
        patient_id: String,
        chief_complaint: String,
        notes: String,
        prediction: TriagePrediction,
        model_version: Option<String>,
    ) -> Self {
        let prediction_text = prediction.render();
        Self {
            report_id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            chief_complaint,
            notes,
            prediction,
            prediction_text,
            model_version,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn tier(&self) -> PredictionTier {
        self.prediction.tier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_messages() {
        assert_eq!(
            TriagePrediction::model_unavailable().render(),
            MODEL_UNAVAILABLE_MESSAGE
        );
        assert_eq!(
            TriagePrediction::analysis_failed().render(),
            ANALYSIS_FAILED_MESSAGE
        );
    }

    #[test]
    fn test_minimal_contains_label() {
        let text = TriagePrediction::minimal("Dengue".into()).render();
        assert_eq!(text, "Predicted Issue: Dengue; no treatment on file.");
    }

    #[test]
    fn test_degraded_variants() {
        let unavailable = TriagePrediction::degraded(
            "Malaria".into(),
            "Artemisinin therapy.".into(),
            DegradedReason::FormatterUnavailable,
        )
        .render();
        assert!(unavailable.contains("(API Unavailable)"));
        assert!(unavailable.contains("Artemisinin therapy."));

        let failed = TriagePrediction::degraded(
            "Malaria".into(),
            "Artemisinin therapy.".into(),
            DegradedReason::FormattingFailed,
        )
        .render();
        assert!(failed.contains("(API Formatting Failed)"));
        assert!(failed.contains("Artemisinin therapy."));
    }

    #[test]
    fn test_full_render_with_defaults() {
        let prediction = TriagePrediction::full(
            "Common Cold".into(),
            None,
            None,
            vec!["Rest".into(), "Fluids".into()],
            vec![],
            None,
        );
        let text = prediction.render();
        assert!(text.starts_with("Predicted Issue: Common Cold\n"));
        assert!(text.contains("Intensity: N/A"));
        assert!(text.contains("Recommendation:\n - Rest\n - Fluids"));
        assert!(text.contains("Home Remedies:\n - N/A"));
        assert!(text.ends_with(DEFAULT_EMERGENCY_NOTE));
    }

    #[test]
    fn test_full_render_prefers_doctor_note() {
        let prediction = TriagePrediction::full(
            "Common Cold".into(),
            Some("Viral upper respiratory infection".into()),
            Some("Mild".into()),
            vec![],
            vec![],
            Some("Go to PHC if breathless".into()),
        );
        let text = prediction.render();
        assert!(text.starts_with("Predicted Issue: Viral upper respiratory infection"));
        assert!(text.contains("Intensity: Mild"));
        assert!(text.ends_with("Emergency Note: Go to PHC if breathless"));
    }

    #[test]
    fn test_report_renders_text() {
        let report = TriageReport::new(
            "p1".into(),
            "fever".into(),
            "since two days".into(),
            TriagePrediction::minimal("Typhoid".into()),
            Some("abc".into()),
        );
        assert_eq!(report.tier(), PredictionTier::Minimal);
        assert!(report.prediction_text.contains("Typhoid"));
    }
}
