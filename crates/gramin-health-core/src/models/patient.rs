//! Patient models.

use serde::{Deserialize, Serialize};

/// A registered patient, looked up by the phone number they text from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Local UUID - always present, generated locally
    pub local_id: String,
    /// Sender identifier for inbound messages (unique)
    pub phone_number: String,
    /// Display name used in replies
    pub name: String,
    /// Caregiver (ASHA worker) contact
    pub caregiver_phone: Option<String>,
    /// Creation timestamp
    pub created_at: String,
}

impl Patient {
    /// Create a new patient with required fields.
    pub fn new(name: String, phone_number: String) -> Self {
        Self {
            local_id: uuid::Uuid::new_v4().to_string(),
            phone_number: phone_number.trim().to_string(),
            name,
            caregiver_phone: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Attach a caregiver contact.
    pub fn with_caregiver(mut self, caregiver_phone: String) -> Self {
        self.caregiver_phone = Some(caregiver_phone);
        self
    }
}

/// Mask a phone-like identifier for logs, keeping the last four characters.
pub fn mask_identifier(identifier: &str) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    let keep = chars.len().min(4);
    let hidden = chars.len() - keep;
    let mut masked = "*".repeat(hidden);
    masked.extend(&chars[hidden..]);
    masked
}
