use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use safemove_lifecycle::notify::{
    LogNotifier, NotificationContacts, Notifier, TwilioConfig, TwilioWhatsApp,
};

/// Server configuration loaded from environment variables.
///
/// | Env Var                         | Default                  |
/// |---------------------------------|--------------------------|
/// | `SAFEMOVE_HOST`                 | `0.0.0.0`                |
/// | `SAFEMOVE_PORT`                 | `3000`                   |
/// | `SAFEMOVE_DB_PATH`              | `safemove.db`            |
/// | `SAFEMOVE_DB_READERS`           | `4`                      |
/// | `SAFEMOVE_REQUEST_TIMEOUT_SECS` | `30`                     |
/// | `SAFEMOVE_SWEEP_INTERVAL_SECS`  | `30`                     |
/// | `SAFEMOVE_EMERGENCY_CONTACTS`   | empty                    |
/// | `SAFEMOVE_WARDEN_CONTACTS`      | empty                    |
/// | `TWILIO_API_BASE`               | `https://api.twilio.com` |
///
/// WhatsApp delivery is enabled only when `TWILIO_ACCOUNT_SID`,
/// `TWILIO_AUTH_TOKEN` and `TWILIO_WHATSAPP_NUMBER` are all set.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub db_readers: usize,
    pub request_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    pub contacts: NotificationContacts,
    pub twilio: Option<TwilioConfig>,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let twilio = match (
            get("TWILIO_ACCOUNT_SID"),
            get("TWILIO_AUTH_TOKEN"),
            get("TWILIO_WHATSAPP_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number))
                if !account_sid.is_empty() && !auth_token.is_empty() && !from_number.is_empty() =>
            {
                Some(TwilioConfig {
                    account_sid,
                    auth_token,
                    from_number,
                    api_base: var("TWILIO_API_BASE", "https://api.twilio.com"),
                })
            }
            _ => None,
        };

        Ok(Self {
            host: var("SAFEMOVE_HOST", "0.0.0.0"),
            port: parse(&get, "SAFEMOVE_PORT", 3000)?,
            db_path: var("SAFEMOVE_DB_PATH", "safemove.db").into(),
            db_readers: parse(&get, "SAFEMOVE_DB_READERS", safemove_db::DEFAULT_READER_POOL_SIZE)?,
            request_timeout_secs: parse(&get, "SAFEMOVE_REQUEST_TIMEOUT_SECS", 30)?,
            sweep_interval_secs: parse(&get, "SAFEMOVE_SWEEP_INTERVAL_SECS", 30)?,
            contacts: NotificationContacts {
                emergency: split_list(get("SAFEMOVE_EMERGENCY_CONTACTS")),
                wardens: split_list(get("SAFEMOVE_WARDEN_CONTACTS")),
            },
            twilio,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Twilio when configured, otherwise a notifier that only logs.
    pub fn notifier(&self) -> anyhow::Result<Arc<dyn Notifier>> {
        match &self.twilio {
            Some(twilio) => {
                info!("WhatsApp notifications via Twilio from {}", twilio.from_number);
                let notifier = TwilioWhatsApp::new(twilio.clone(), self.request_timeout())
                    .context("failed to build Twilio client")?;
                Ok(Arc::new(notifier))
            }
            None => {
                warn!("Twilio credentials not set; notifications will only be logged");
                Ok(Arc::new(LogNotifier))
            }
        }
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number, got {:?}", key, raw)),
        None => Ok(default),
    }
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
