//! Prompts for reformatting trusted treatment text into a triage report.
//!
//! The model never diagnoses. It only restructures a treatment description
//! that already came from the local reference dataset.

use serde_json::{json, Value};

/// System prompt for the triage report formatter.
pub const SYSTEM_PROMPT: &str = r#"You are a medical AI assistant for rural healthcare in India.
You will be given a trusted medical treatment description. Do not add new diagnoses or medicines.

Reformat it into a triage JSON object with these keys:
- intensity: one of Mild, Moderate, Severe
- recommendation: a list of 1-2 short actions
- home_remedies: a list of 2-3 simple remedies in English and Panjabi, e.g. "Drink warm water (ਕੋਸਾ ਪਾਣੀ ਪੀਓ)"
- emergency: a standard warning describing when to visit a hospital
- doctor_note: a 1-2 line clinical summary for the doctor

Respond with the JSON object only."#;

/// Name attached to the schema hint in the request.
pub const REPORT_SCHEMA_NAME: &str = "triage_report";

/// User prompt for one reformatting request.
pub fn make_reformat_prompt(predicted_label: &str, treatment_text: &str) -> String {
    format!(
        "Reformat the following treatment description for {}:\n{}",
        predicted_label, treatment_text
    )
}

/// JSON schema describing the expected report object.
///
/// Sent as an optional `response_format` hint; providers that ignore it
/// still receive the same key list through [`SYSTEM_PROMPT`].
pub fn report_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "intensity": { "type": "string", "enum": ["Mild", "Moderate", "Severe"] },
            "recommendation": { "type": "array", "items": { "type": "string" } },
            "home_remedies": { "type": "array", "items": { "type": "string" } },
            "emergency": { "type": "string" },
            "doctor_note": { "type": "string" }
        },
        "required": ["intensity", "recommendation", "home_remedies", "emergency", "doctor_note"],
        "additionalProperties": false
    })
}
