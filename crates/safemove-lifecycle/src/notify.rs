//! Best-effort outbound messaging.
//!
//! Nothing in here takes part in the correctness of a trip operation: the
//! coordinator only calls a [`Notifier`] after its store work has committed
//! and turns whatever happens into a [`DeliveryReport`].

use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use tracing::{info, warn};

use safemove_types::api::DeliveryReport;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("messaging request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("messaging provider rejected message to {recipient} (HTTP {status}): {body}")]
    Rejected {
        recipient: String,
        status: u16,
        body: String,
    },

    #[error("{0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `body` to every recipient. Any single failure fails the call.
    async fn send(&self, recipients: &[String], body: &str) -> Result<(), NotifyError>;
}

/// Used when no messaging provider is configured. Only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipients: &[String], body: &str) -> Result<(), NotifyError> {
        info!(recipients = ?recipients, body, "Notification (log only)");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number without the `whatsapp:` prefix.
    pub from_number: String,
    pub api_base: String,
}

/// WhatsApp delivery through the Twilio Messages API.
pub struct TwilioWhatsApp {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioWhatsApp {
    pub fn new(config: TwilioConfig, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    async fn send_one(&self, recipient: &str, body: &str) -> Result<(), NotifyError> {
        let from = format!("whatsapp:{}", self.config.from_number);
        let to = format!("whatsapp:{}", recipient);

        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("From", from.as_str()), ("To", to.as_str()), ("Body", body)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                recipient: recipient.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TwilioWhatsApp {
    async fn send(&self, recipients: &[String], body: &str) -> Result<(), NotifyError> {
        try_join_all(recipients.iter().map(|r| self.send_one(r, body))).await?;
        info!(count = recipients.len(), "WhatsApp messages sent");
        Ok(())
    }
}

/// Who gets told about what, beyond the students themselves.
#[derive(Debug, Clone, Default)]
pub struct NotificationContacts {
    /// Alerted when a student records an emergency.
    pub emergency: Vec<String>,
    /// Alerted when a student becomes overdue.
    pub wardens: Vec<String>,
}

/// Send and fold the result into a report. Never fails.
pub async fn dispatch(notifier: &dyn Notifier, recipients: &[String], body: &str) -> DeliveryReport {
    if recipients.is_empty() {
        return DeliveryReport::Skipped {
            reason: "no recipients configured".to_string(),
        };
    }

    match notifier.send(recipients, body).await {
        Ok(()) => DeliveryReport::Delivered {
            recipients: recipients.len(),
        },
        Err(e) => {
            warn!(error = %e, recipients = recipients.len(), "Notification delivery failed");
            DeliveryReport::Failed {
                reason: e.to_string(),
            }
        }
    }
}
