//! Twilio WhatsApp webhook
//!
//! Twilio posts every inbound WhatsApp message here as a form. Media starts
//! a background draft job; anything else is a command for the pending draft.
//! The reply is always an empty TwiML document since all answers go out
//! through the REST API.

use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::AppState;

const EMPTY_TWIML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

/// The subset of Twilio's message webhook fields we act on
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WhatsAppMessage {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub num_media: u32,
    #[serde(rename = "MediaUrl0")]
    pub media_url: Option<String>,
    #[serde(rename = "MediaContentType0")]
    pub media_content_type: Option<String>,
}

pub fn twilio_routes() -> Router<AppState> {
    Router::new().route("/whatsapp", post(handle_whatsapp))
}

fn twiml_response() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("Content-Type", "application/xml")],
        EMPTY_TWIML,
    )
}

/// POST /whatsapp
pub async fn handle_whatsapp(
    State(state): State<AppState>,
    Form(message): Form<WhatsAppMessage>,
) -> impl IntoResponse {
    info!(
        from = %message.from,
        num_media = message.num_media,
        content_type = ?message.media_content_type,
        "New WhatsApp message: {}",
        message.body
    );

    if message.from.is_empty() {
        warn!("WhatsApp webhook without sender, ignoring");
        return twiml_response();
    }

    if message.num_media > 0 {
        match message.media_url.as_deref() {
            Some(url) => state.orchestrator.submit_media(
                &message.from,
                url,
                message.media_content_type.as_deref(),
                &message.body,
            ),
            None => warn!(from = %message.from, "NumMedia set but MediaUrl0 missing"),
        }
    } else {
        state
            .orchestrator
            .submit_command(&message.from, message.body.trim());
    }

    twiml_response()
}
