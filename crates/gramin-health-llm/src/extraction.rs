//! Triage report extraction from model output.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Keys the formatter is asked to produce.
pub const REPORT_KEYS: [&str; 5] = [
    "intensity",
    "recommendation",
    "home_remedies",
    "emergency",
    "doctor_note",
];

/// Extraction errors.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Structured triage report as returned by the formatter.
///
/// Every field is optional on the wire; callers decide the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FormattedReport {
    #[serde(default, deserialize_with = "loose_text")]
    pub intensity: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub recommendation: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub home_remedies: Vec<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub emergency: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub doctor_note: Option<String>,
}

/// Locate the JSON object embedded in a model response.
///
/// Spans from the first `{` to the last `}`; responses carry at most one
/// object, so the greedy span is the object plus nothing else.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parse model output into a report.
///
/// Fails when no object can be located, when it is not valid JSON, or when
/// none of the [`REPORT_KEYS`] carry a value.
pub fn parse_formatted_report(text: &str) -> ExtractionResult<FormattedReport> {
    let json = extract_json_object(text).ok_or_else(|| {
        ExtractionError::InvalidFormat("No JSON object found in response".into())
    })?;

    let object: Map<String, Value> = serde_json::from_str(json)?;

    let has_usable_key = REPORT_KEYS
        .iter()
        .any(|key| object.get(*key).is_some_and(|v| !v.is_null()));
    if !has_usable_key {
        return Err(ExtractionError::InvalidFormat(
            "Response object has none of the report keys".into(),
        ));
    }

    let report: FormattedReport = serde_json::from_value(Value::Object(object))?;
    Ok(report)
}

/// Accept a string, number, bool or list of those. Objects count as absent.
fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(values)) => {
            let parts: Vec<String> = values.into_iter().filter_map(scalar_text).collect();
            Some(parts.join("; "))
        }
        Some(value) => scalar_text(value),
        None => None,
    };
    Ok(text.filter(|s| !s.is_empty()))
}

fn scalar_text(value: Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    Some(text).filter(|s| !s.is_empty())
}

/// Accept a list of strings, a single string, or null.
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => vec![s],
        Some(Value::Array(values)) => values.into_iter().filter_map(scalar_text).collect(),
        Some(other) => scalar_text(other).into_iter().collect(),
    };

    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}
