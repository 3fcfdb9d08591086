//! Alert thresholds for vital readings.

use serde::{Deserialize, Serialize};

use crate::models::Measurement;

/// Upper limits above which a reading raises an alert. Comparisons are strict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AlertThresholds {
    pub systolic_max: i64,
    pub diastolic_max: i64,
    pub sugar_max: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            systolic_max: 140,
            diastolic_max: 90,
            sugar_max: 180,
        }
    }
}

impl AlertThresholds {
    /// Alert text for an out-of-range measurement, `None` when in range.
    pub fn alert_message(&self, measurement: &Measurement) -> Option<String> {
        match *measurement {
            Measurement::BloodPressure {
                systolic,
                diastolic,
            } if systolic > self.systolic_max || diastolic > self.diastolic_max => {
                Some(format!("High BP: {}/{}", systolic, diastolic))
            }
            Measurement::BloodSugar { level } if level > self.sugar_max => {
                Some(format!("High Sugar: {}", level))
            }
            _ => None,
        }
    }
}
