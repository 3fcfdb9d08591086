//! Threshold alert dispatch.
//!
//! Alerts are fire-and-forget: a failed send is logged by the caller and
//! never undoes the reading that triggered it.

mod twilio;

pub use twilio::*;

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::models::mask_identifier;

/// Alert dispatch errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlertError {
    #[error("Alert transport error: {0}")]
    Transport(String),

    #[error("Alert service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Alert dispatcher not configured: {0}")]
    NotConfigured(String),
}

pub type AlertResult<T> = Result<T, AlertError>;

/// Sends a notification about a patient's out-of-range reading.
pub trait AlertDispatcher: Send + Sync {
    /// `sender` is the patient's phone number, `message` the alert text.
    fn send(&self, sender: &str, message: &str) -> AlertResult<()>;
}

/// Dispatcher used when no SMS gateway is configured. Logs and succeeds.
#[derive(Debug, Default)]
pub struct LoggingDispatcher;

impl AlertDispatcher for LoggingDispatcher {
    fn send(&self, sender: &str, message: &str) -> AlertResult<()> {
        tracing::warn!(
            sender = %mask_identifier(sender),
            alert = %message,
            "No alert gateway configured; alert logged only"
        );
        Ok(())
    }
}

/// An alert captured by [`MemoryDispatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentAlert {
    pub sender: String,
    pub message: String,
}

/// In-memory dispatcher that records every send. Can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryDispatcher {
    sent: Mutex<Vec<SentAlert>>,
    fail_with: Option<AlertError>,
}

impl MemoryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher whose sends are recorded and then fail with `error`.
    pub fn failing(error: AlertError) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(error),
        }
    }

    /// Alerts attempted so far.
    pub fn sent(&self) -> Vec<SentAlert> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AlertDispatcher for MemoryDispatcher {
    fn send(&self, sender: &str, message: &str) -> AlertResult<()> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentAlert {
                sender: sender.to_string(),
                message: message.to_string(),
            });
        match &self.fail_with {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// Pick the dispatcher for a configuration.
///
/// Falls back to [`LoggingDispatcher`] when the Twilio settings are
/// incomplete or the client cannot be built.
pub fn dispatcher_from_config(config: &TwilioConfig) -> Arc<dyn AlertDispatcher> {
    if !config.is_complete() {
        tracing::info!("Twilio settings incomplete; alerts will only be logged");
        return Arc::new(LoggingDispatcher);
    }

    match TwilioDispatcher::new(config) {
        Ok(dispatcher) => Arc::new(dispatcher),
        Err(e) => {
            tracing::error!(error = %e, "Could not create Twilio dispatcher; alerts will only be logged");
            Arc::new(LoggingDispatcher)
        }
    }
}
