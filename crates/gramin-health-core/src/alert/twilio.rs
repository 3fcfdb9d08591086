//! Twilio SMS alert transport.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{AlertDispatcher, AlertError, AlertResult};
use crate::models::mask_identifier;

pub const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Alerts are short; do not let a slow gateway stall the SMS reply path.
const SEND_TIMEOUT_SECS: u64 = 15;

/// Longest error body kept from a failed response.
const MAX_ERROR_BODY: usize = 500;

/// Twilio account settings and the health worker who receives alerts.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    /// Twilio number alerts are sent from
    pub from_number: Option<String>,
    /// Health worker number alerts are sent to
    pub health_worker_phone: Option<String>,
    pub api_base: String,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            health_worker_phone: None,
            api_base: TWILIO_API_BASE.to_string(),
        }
    }
}

impl TwilioConfig {
    /// All four account fields are present and non-blank.
    pub fn is_complete(&self) -> bool {
        [
            &self.account_sid,
            &self.auth_token,
            &self.from_number,
            &self.health_worker_phone,
        ]
        .iter()
        .all(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

impl fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("from_number", &self.from_number)
            .field("health_worker_phone", &self.health_worker_phone)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Sends `ALERT from {sender}: {message}` to the health worker via Twilio.
pub struct TwilioDispatcher {
    messages_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
    health_worker_phone: String,
    client: reqwest::blocking::Client,
}

impl TwilioDispatcher {
    pub fn new(config: &TwilioConfig) -> AlertResult<Self> {
        let field = |value: &Option<String>, name: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AlertError::NotConfigured(format!("missing {}", name)))
        };

        let account_sid = field(&config.account_sid, "account_sid")?;
        let auth_token = field(&config.auth_token, "auth_token")?;
        let from_number = field(&config.from_number, "from_number")?;
        let health_worker_phone = field(&config.health_worker_phone, "health_worker_phone")?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()
            .map_err(|e| AlertError::Transport(e.to_string()))?;

        Ok(Self {
            messages_url: format!(
                "{}/Accounts/{}/Messages.json",
                config.api_base.trim_end_matches('/'),
                account_sid
            ),
            account_sid,
            auth_token,
            from_number,
            health_worker_phone,
            client,
        })
    }

    /// Body text delivered to the health worker.
    pub fn alert_body(sender: &str, message: &str) -> String {
        format!("ALERT from {}: {}", sender, message)
    }
}

impl AlertDispatcher for TwilioDispatcher {
    fn send(&self, sender: &str, message: &str) -> AlertResult<()> {
        let body = Self::alert_body(sender, message);

        let response = self
            .client
            .post(&self.messages_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", self.health_worker_phone.as_str()),
                ("From", self.from_number.as_str()),
                ("Body", body.as_str()),
            ])
            .send()
            .map_err(|e| AlertError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY)
                .collect();
            return Err(AlertError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(
            to = %mask_identifier(&self.health_worker_phone),
            "Alert sent to health worker"
        );
        Ok(())
    }
}
