//! Vital sign readings.

use serde::{Deserialize, Serialize};

/// Kind of vital reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReadingKind {
    BloodPressure,
    BloodSugar,
}

impl ReadingKind {
    /// Storage code, matching the SMS command keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingKind::BloodPressure => "BP",
            ReadingKind::BloodSugar => "SUGAR",
        }
    }

    /// Parse a storage code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "BP" => Some(ReadingKind::BloodPressure),
            "SUGAR" => Some(ReadingKind::BloodSugar),
            _ => None,
        }
    }
}

/// A measured value. Blood pressure always has two values, sugar one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Measurement {
    BloodPressure { systolic: i64, diastolic: i64 },
    BloodSugar { level: i64 },
}

impl Measurement {
    pub fn kind(&self) -> ReadingKind {
        match self {
            Measurement::BloodPressure { .. } => ReadingKind::BloodPressure,
            Measurement::BloodSugar { .. } => ReadingKind::BloodSugar,
        }
    }

    /// Primary value (systolic or sugar level).
    pub fn value1(&self) -> i64 {
        match *self {
            Measurement::BloodPressure { systolic, .. } => systolic,
            Measurement::BloodSugar { level } => level,
        }
    }

    /// Secondary value, present only for blood pressure.
    pub fn value2(&self) -> Option<i64> {
        match *self {
            Measurement::BloodPressure { diastolic, .. } => Some(diastolic),
            Measurement::BloodSugar { .. } => None,
        }
    }

    /// Rebuild from the flat storage columns.
    ///
    /// Returns `None` when the values do not fit the kind.
    pub fn from_values(kind: ReadingKind, value1: i64, value2: Option<i64>) -> Option<Self> {
        match (kind, value2) {
            (ReadingKind::BloodPressure, Some(diastolic)) => Some(Measurement::BloodPressure {
                systolic: value1,
                diastolic,
            }),
            (ReadingKind::BloodSugar, None) => Some(Measurement::BloodSugar { level: value1 }),
            _ => None,
        }
    }

    /// Human-readable value, e.g. `120/80` or `150`.
    pub fn display_value(&self) -> String {
        match *self {
            Measurement::BloodPressure {
                systolic,
                diastolic,
            } => format!("{}/{}", systolic, diastolic),
            Measurement::BloodSugar { level } => level.to_string(),
        }
    }
}

/// A persisted vital reading. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    pub reading_id: String,
    pub patient_id: String,
    pub measurement: Measurement,
    /// Server timestamp
    pub created_at: String,
}

impl Reading {
    /// Create a new reading stamped with the current time.
    pub fn new(patient_id: String, measurement: Measurement) -> Self {
        Self {
            reading_id: uuid::Uuid::new_v4().to_string(),
            patient_id,
            measurement,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn kind(&self) -> ReadingKind {
        self.measurement.kind()
    }
}
