//! Outbound WhatsApp messages via the Twilio REST API

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::services::config::TwilioConfig;

const TWILIO_API: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Twilio is not configured")]
    NotConfigured,
    #[error("Media file {0} has no public URL")]
    NoPublicUrl(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Twilio API error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Sends messages to an owner's chat
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_text(&self, owner_id: &str, body: &str) -> Result<(), NotifyError>;

    /// Send a local media file; it must be reachable under the public static route
    async fn send_media(&self, owner_id: &str, media_path: &Path) -> Result<(), NotifyError>;
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

pub struct TwilioNotifier {
    client: Client,
    config: TwilioConfig,
    base_url: String,
}

impl TwilioNotifier {
    pub fn new(config: TwilioConfig, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            config,
            base_url: base_url.into(),
        }
    }

    async fn create_message(&self, params: &[(&str, &str)]) -> Result<String, NotifyError> {
        if !self.config.is_configured() {
            return Err(NotifyError::NotConfigured);
        }

        let url = format!(
            "{}/Accounts/{}/Messages.json",
            TWILIO_API, self.config.account_sid
        );
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(params)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let message: MessageResource = response
            .json()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;
        Ok(message.sid)
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send_text(&self, owner_id: &str, body: &str) -> Result<(), NotifyError> {
        let sid = self
            .create_message(&[
                ("From", self.config.whatsapp_number.as_str()),
                ("To", owner_id),
                ("Body", body),
            ])
            .await?;
        debug!("Text sent to {} (sid {})", owner_id, sid);
        Ok(())
    }

    async fn send_media(&self, owner_id: &str, media_path: &Path) -> Result<(), NotifyError> {
        let media_url = utils::assets::public_media_url(&self.base_url, media_path)
            .ok_or_else(|| NotifyError::NoPublicUrl(media_path.display().to_string()))?;

        let sid = self
            .create_message(&[
                ("From", self.config.whatsapp_number.as_str()),
                ("To", owner_id),
                ("MediaUrl", media_url.as_str()),
            ])
            .await?;
        info!("Media sent to {}: {} (sid {})", owner_id, media_url, sid);
        Ok(())
    }
}
