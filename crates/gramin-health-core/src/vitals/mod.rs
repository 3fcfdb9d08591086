//! SMS vitals intake.
//!
//! Resolves the sender, parses the command, stores the reading and raises
//! a threshold alert. Always produces a reply; failures are reported in the
//! [`VitalsOutcome`] rather than returned as errors.

mod command;
mod thresholds;

pub use command::*;
pub use thresholds::*;

use crate::alert::AlertDispatcher;
use crate::db::Database;
use crate::models::{mask_identifier, Measurement, Patient, Reading};

pub const NOT_REGISTERED_REPLY: &str =
    "This phone number is not registered. Please sign up on our website.";
pub const INVALID_FORMAT_REPLY: &str =
    "Invalid format. Please use: 'BP 120 80' or 'SUGAR 150'.";
pub const SERVICE_FAULT_REPLY: &str =
    "Sorry, we could not process your message right now. Please try again later.";

/// State of the threshold alert for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertStatus {
    /// No alert: the reading was in range or nothing parsed.
    NotRequired,
    /// Alert raised but not dispatched yet.
    Pending { message: String },
    Sent { message: String },
    Failed { message: String, error: String },
}

impl AlertStatus {
    pub fn is_raised(&self) -> bool {
        !matches!(self, AlertStatus::NotRequired)
    }
}

/// Result of handling one inbound SMS.
#[derive(Debug, Clone, PartialEq)]
pub struct VitalsOutcome {
    /// Text to send back to the patient
    pub reply: String,
    /// The stored reading, if one was persisted
    pub reading: Option<Reading>,
    pub alert: AlertStatus,
    /// Lookup or storage failure, if any
    pub storage_error: Option<String>,
}

impl VitalsOutcome {
    fn reply_only(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            reading: None,
            alert: AlertStatus::NotRequired,
            storage_error: None,
        }
    }

    /// Send a pending alert. Failures are logged and recorded, never raised.
    pub fn dispatch_alert(&mut self, sender: &str, dispatcher: &dyn AlertDispatcher) {
        let AlertStatus::Pending { message } = &self.alert else {
            return;
        };
        let message = message.clone();

        self.alert = match dispatcher.send(sender, &message) {
            Ok(()) => {
                tracing::info!(sender = %mask_identifier(sender), alert = %message, "Alert dispatched");
                AlertStatus::Sent { message }
            }
            Err(e) => {
                tracing::error!(
                    sender = %mask_identifier(sender),
                    alert = %message,
                    error = %e,
                    "Alert dispatch failed"
                );
                AlertStatus::Failed {
                    message,
                    error: e.to_string(),
                }
            }
        };
    }
}

/// Handles inbound vitals messages against one database.
pub struct VitalsIntake<'a> {
    db: &'a Database,
    thresholds: AlertThresholds,
}

impl<'a> VitalsIntake<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self::with_thresholds(db, AlertThresholds::default())
    }

    pub fn with_thresholds(db: &'a Database, thresholds: AlertThresholds) -> Self {
        Self { db, thresholds }
    }

    /// Handle a message and dispatch any alert it raises.
    pub fn handle_message(
        &self,
        sender: &str,
        text: &str,
        dispatcher: &dyn AlertDispatcher,
    ) -> VitalsOutcome {
        let mut outcome = self.record(sender, text);
        outcome.dispatch_alert(sender, dispatcher);
        outcome
    }

    /// Resolve, parse and store, leaving any alert [`AlertStatus::Pending`].
    ///
    /// Lets callers release shared storage before the alert goes out.
    pub fn record(&self, sender: &str, text: &str) -> VitalsOutcome {
        let masked = mask_identifier(sender);

        let patient = match self.db.get_patient_by_phone(sender) {
            Ok(Some(patient)) => patient,
            Ok(None) => {
                tracing::info!(sender = %masked, "Message from unregistered number");
                return VitalsOutcome::reply_only(NOT_REGISTERED_REPLY);
            }
            Err(e) => {
                tracing::error!(sender = %masked, error = %e, "Patient lookup failed");
                return VitalsOutcome {
                    storage_error: Some(e.to_string()),
                    ..VitalsOutcome::reply_only(SERVICE_FAULT_REPLY)
                };
            }
        };

        let measurement = match parse_command(text) {
            Ok(measurement) => measurement,
            Err(e) => {
                tracing::info!(sender = %masked, reason = %e, "Malformed vitals command");
                return VitalsOutcome::reply_only(INVALID_FORMAT_REPLY);
            }
        };

        let reading = Reading::new(patient.local_id.clone(), measurement);
        let (reply, reading, storage_error) = match self.db.insert_reading(&reading) {
            Ok(()) => {
                tracing::info!(
                    sender = %masked,
                    kind = reading.kind().as_str(),
                    reading_id = %reading.reading_id,
                    "Reading stored"
                );
                (acknowledgement(&patient, &measurement), Some(reading), None)
            }
            Err(e) => {
                tracing::error!(sender = %masked, error = %e, "Failed to store reading");
                (SERVICE_FAULT_REPLY.to_string(), None, Some(e.to_string()))
            }
        };

        // Runs whether or not the reading was stored
        let alert = match self.thresholds.alert_message(&measurement) {
            Some(message) => {
                tracing::warn!(sender = %masked, alert = %message, "Reading above threshold");
                AlertStatus::Pending { message }
            }
            None => AlertStatus::NotRequired,
        };

        VitalsOutcome {
            reply,
            reading,
            alert,
            storage_error,
        }
    }
}

fn acknowledgement(patient: &Patient, measurement: &Measurement) -> String {
    let label = match measurement {
        Measurement::BloodPressure { .. } => "BP",
        Measurement::BloodSugar { .. } => "Sugar",
    };
    format!(
        "Hi {}, your {} reading {} is recorded.",
        patient.name,
        label,
        measurement.display_value()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertError, MemoryDispatcher};

    const PHONE: &str = "+919876543210";

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.insert_patient(&Patient::new("Ramesh".into(), PHONE.into()))
            .unwrap();
        db
    }

    #[test]
    fn test_bp_acknowledged_without_alert() {
        let db = setup_db();
        let dispatcher = MemoryDispatcher::new();

        let outcome = VitalsIntake::new(&db).handle_message(PHONE, "BP 120 80", &dispatcher);

        assert_eq!(outcome.reply, "Hi Ramesh, your BP reading 120/80 is recorded.");
        assert_eq!(outcome.alert, AlertStatus::NotRequired);
        assert!(outcome.reading.is_some());
        assert!(dispatcher.sent().is_empty());
        assert_eq!(db.count_readings().unwrap(), 1);
    }

    #[test]
    fn test_sugar_alert_sent() {
        let db = setup_db();
        let dispatcher = MemoryDispatcher::new();

        let outcome = VitalsIntake::new(&db).handle_message(PHONE, "SUGAR 200", &dispatcher);

        assert_eq!(outcome.reply, "Hi Ramesh, your Sugar reading 200 is recorded.");
        assert_eq!(
            outcome.alert,
            AlertStatus::Sent {
                message: "High Sugar: 200".into()
            }
        );
        assert_eq!(dispatcher.sent()[0].sender, PHONE);
    }

    #[test]
    fn test_dispatch_failure_keeps_reply_and_reading() {
        let db = setup_db();
        let dispatcher = MemoryDispatcher::failing(AlertError::Transport("offline".into()));

        let outcome = VitalsIntake::new(&db).handle_message(PHONE, "BP 150 80", &dispatcher);

        assert_eq!(outcome.reply, "Hi Ramesh, your BP reading 150/80 is recorded.");
        assert!(matches!(outcome.alert, AlertStatus::Failed { .. }));
        assert_eq!(db.count_readings().unwrap(), 1);
    }

    #[test]
    fn test_record_leaves_alert_pending() {
        let db = setup_db();

        let outcome = VitalsIntake::new(&db).record(PHONE, "BP 150 95");
        assert_eq!(
            outcome.alert,
            AlertStatus::Pending {
                message: "High BP: 150/95".into()
            }
        );
    }

    #[test]
    fn test_unregistered_sender() {
        let db = setup_db();
        let dispatcher = MemoryDispatcher::new();

        let outcome = VitalsIntake::new(&db).handle_message("+910000000000", "SUGAR 500", &dispatcher);

        assert_eq!(outcome.reply, NOT_REGISTERED_REPLY);
        assert!(dispatcher.sent().is_empty());
        assert_eq!(db.count_readings().unwrap(), 0);
    }

    #[test]
    fn test_invalid_formats_share_reply() {
        let db = setup_db();
        let dispatcher = MemoryDispatcher::new();
        let intake = VitalsIntake::new(&db);

        for text in ["sugar abc", "BP 1 2 3", "", "HELLO"] {
            let outcome = intake.handle_message(PHONE, text, &dispatcher);
            assert_eq!(outcome.reply, INVALID_FORMAT_REPLY, "input: {:?}", text);
        }
        assert_eq!(db.count_readings().unwrap(), 0);
    }

    #[test]
    fn test_storage_failure_still_alerts() {
        let db = setup_db();
        db.conn().execute_batch("DROP TABLE readings").unwrap();
        let dispatcher = MemoryDispatcher::new();

        let outcome = VitalsIntake::new(&db).handle_message(PHONE, "SUGAR 250", &dispatcher);

        assert_eq!(outcome.reply, SERVICE_FAULT_REPLY);
        assert!(outcome.storage_error.is_some());
        assert!(outcome.reading.is_none());
        assert_eq!(dispatcher.sent().len(), 1);
    }

    #[test]
    fn test_custom_thresholds() {
        let db = setup_db();
        let dispatcher = MemoryDispatcher::new();
        let thresholds = AlertThresholds {
            sugar_max: 120,
            ..AlertThresholds::default()
        };

        let outcome = VitalsIntake::with_thresholds(&db, thresholds)
            .handle_message(PHONE, "SUGAR 150", &dispatcher);
        assert!(outcome.alert.is_raised());
    }
}
