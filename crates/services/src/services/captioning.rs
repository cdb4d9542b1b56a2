//! Caption generation from analysis frames
//!
//! The captioner sees the branded stills plus the owner's context text and
//! returns a ready-to-post caption. Callers treat any error as non-fatal and
//! fall back to a fixed caption.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::Client;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

use crate::services::config::CaptionConfig;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("Captioning is not configured")]
    NotConfigured,
    #[error("No readable analysis frames")]
    NoFrames,
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Response contained no caption text")]
    EmptyResponse,
}

#[async_trait]
pub trait CaptionService: Send + Sync {
    async fn generate_caption(
        &self,
        frames: &[PathBuf],
        context: &str,
    ) -> Result<String, CaptionError>;
}

/// Gemini `generateContent` client with inline image parts
pub struct GeminiCaptioner {
    client: Client,
    config: CaptionConfig,
    endpoint: String,
}

impl GeminiCaptioner {
    pub fn new(config: CaptionConfig) -> Self {
        if !config.is_configured() {
            warn!("Captioner created without API key - GOOGLE_API_KEY not set");
        }
        Self {
            client: Client::new(),
            config,
            endpoint: GEMINI_ENDPOINT.to_string(),
        }
    }

    /// Point at a different API root (proxies, tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Read frames from disk as `(mime, base64)` pairs, skipping missing files
    async fn load_frames(frames: &[PathBuf]) -> Vec<(String, String)> {
        let mut loaded = Vec::with_capacity(frames.len());
        for path in frames {
            match tokio::fs::read(path).await {
                Ok(bytes) => {
                    let mime = mime_guess::from_path(path)
                        .first_or(mime_guess::mime::IMAGE_JPEG)
                        .to_string();
                    loaded.push((mime, BASE64.encode(bytes)));
                }
                Err(e) => warn!("Skipping frame {}: {}", path.display(), e),
            }
        }
        loaded
    }
}

/// Request body: image parts first, then the prompt with the owner's context
pub fn build_request_body(
    images: &[(String, String)],
    prompt: &str,
    context: &str,
    temperature: f32,
) -> Value {
    let mut parts: Vec<Value> = images
        .iter()
        .map(|(mime, data)| json!({ "inline_data": { "mime_type": mime, "data": data } }))
        .collect();
    parts.push(json!({ "text": format!("{}\n\nEXTRA CONTEXT:\n{}", prompt, context) }));

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": { "temperature": temperature }
    })
}

/// Concatenated text parts of the first candidate
pub fn extract_caption(response: &Value) -> Option<String> {
    let parts = response["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[async_trait]
impl CaptionService for GeminiCaptioner {
    async fn generate_caption(
        &self,
        frames: &[PathBuf],
        context: &str,
    ) -> Result<String, CaptionError> {
        if !self.config.is_configured() {
            return Err(CaptionError::NotConfigured);
        }

        let images = Self::load_frames(frames).await;
        if images.is_empty() {
            return Err(CaptionError::NoFrames);
        }

        info!("Generating caption from {} frame(s)", images.len());
        let body = build_request_body(
            &images,
            &self.config.prompt,
            context,
            self.config.temperature,
        );
        let url = format!("{}/{}:generateContent", self.endpoint, self.config.model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| CaptionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CaptionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| CaptionError::Network(e.to_string()))?;

        extract_caption(&json).ok_or(CaptionError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_puts_images_before_prompt() {
        let images = vec![("image/jpeg".to_string(), "AAAA".to_string())];
        let body = build_request_body(&images, "Schrijf een post.", "Nieuwe collectie", 0.7);

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(
            parts[1]["text"],
            "Schrijf een post.\n\nEXTRA CONTEXT:\nNieuwe collectie"
        );
        assert!(body["generationConfig"]["temperature"].as_f64().unwrap() > 0.69);
    }

    #[test]
    fn test_extract_caption_joins_parts() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Vers " }, { "text": "binnen! " }] } }]
        });
        assert_eq!(extract_caption(&response).as_deref(), Some("Vers binnen!"));
    }

    #[test]
    fn test_extract_caption_handles_blocked_response() {
        assert_eq!(extract_caption(&json!({ "candidates": [] })), None);
        let blank = json!({ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] });
        assert_eq!(extract_caption(&blank), None);
    }

    #[tokio::test]
    async fn test_unconfigured_and_missing_frames() {
        let unconfigured = GeminiCaptioner::new(CaptionConfig::default());
        let result = unconfigured
            .generate_caption(&[PathBuf::from("/tmp/frame.jpg")], "ctx")
            .await;
        assert!(matches!(result, Err(CaptionError::NotConfigured)));

        let configured = GeminiCaptioner::new(CaptionConfig {
            api_key: "key".into(),
            ..Default::default()
        })
        .with_endpoint("http://127.0.0.1:9");
        let result = configured
            .generate_caption(&[PathBuf::from("/nonexistent/frame.jpg")], "ctx")
            .await;
        assert!(matches!(result, Err(CaptionError::NoFrames)));
    }
}
