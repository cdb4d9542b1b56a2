//! Runtime configuration
//!
//! Everything is read from the environment (a local `.env` is loaded by the
//! binary first). Missing credentials are not fatal: the affected integration
//! reports `is_configured() == false` and the server logs a warning.

use std::{path::PathBuf, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::social::poll::PollConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("Failed to read caption prompt file {path}: {source}")]
    PromptFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Twilio WhatsApp sender credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender address, e.g. `whatsapp:+14155238886`
    pub whatsapp_number: String,
}

impl TwilioConfig {
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty()
            && !self.auth_token.is_empty()
            && !self.whatsapp_number.is_empty()
    }
}

/// Meta Graph API credentials for the Facebook page and linked Instagram account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub page_id: String,
    pub ig_user_id: String,
    pub access_token: String,
    #[serde(default = "default_graph_version")]
    pub graph_version: String,
}

fn default_graph_version() -> String {
    "v21.0".to_string()
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            page_id: String::new(),
            ig_user_id: String::new(),
            access_token: String::new(),
            graph_version: default_graph_version(),
        }
    }
}

impl MetaConfig {
    pub fn is_configured(&self) -> bool {
        !self.page_id.is_empty() && !self.ig_user_id.is_empty() && !self.access_token.is_empty()
    }
}

/// Vision-language captioning settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionConfig {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub prompt: String,
}

const DEFAULT_CAPTION_PROMPT: &str = "\
Je bent de social media manager van een winkel. Schrijf een pakkende post voor \
Facebook en Instagram over wat je op de beelden ziet. Begin met een korte hook, \
beschrijf het product, sluit af met een uitnodiging om langs te komen en een paar \
passende hashtags. Gebruik enkele passende emoji. Antwoord alleen met de tekst van de post.";

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.7,
            prompt: DEFAULT_CAPTION_PROMPT.to_string(),
        }
    }
}

impl CaptionConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL of this server, without trailing slash
    pub base_url: String,
    pub media_dir: PathBuf,
    pub brand_asset_dir: PathBuf,
    pub keyframe_count: usize,
    pub reel_poll: PollConfig,
    /// Pause between preview media and preview text
    pub preview_gap: Duration,
    pub dry_run: bool,
    /// Context handed to the captioner when the owner sent none
    pub default_context: String,
    pub twilio: TwilioConfig,
    pub meta: MetaConfig,
    pub captioning: CaptionConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let caption_defaults = CaptionConfig::default();
        let prompt = match get("CAPTION_PROMPT_FILE") {
            Some(path) => {
                let path = PathBuf::from(path);
                std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::PromptFile { path, source })?
            }
            None => caption_defaults.prompt,
        };

        let poll_defaults = PollConfig::default();

        Ok(Self {
            host: get_or("HOST", "0.0.0.0"),
            port: parse_or(get("PORT"), "PORT", 8000)?,
            base_url: get_or("BASE_URL", "http://localhost:8000")
                .trim_end_matches('/')
                .to_string(),
            media_dir: get("MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(utils::assets::default_media_dir),
            brand_asset_dir: get("BRAND_ASSET_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(utils::assets::default_brand_asset_dir),
            keyframe_count: parse_or(get("KEYFRAME_COUNT"), "KEYFRAME_COUNT", 5)?,
            reel_poll: PollConfig {
                interval: Duration::from_secs(parse_or(
                    get("REEL_POLL_INTERVAL_SECS"),
                    "REEL_POLL_INTERVAL_SECS",
                    poll_defaults.interval.as_secs(),
                )?),
                max_attempts: parse_or(
                    get("REEL_POLL_MAX_ATTEMPTS"),
                    "REEL_POLL_MAX_ATTEMPTS",
                    poll_defaults.max_attempts,
                )?,
            },
            preview_gap: Duration::from_millis(parse_or(get("PREVIEW_GAP_MS"), "PREVIEW_GAP_MS", 1000)?),
            dry_run: get("DRY_RUN")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            default_context: get_or("DEFAULT_CONTEXT", "Maak een professionele post."),
            twilio: TwilioConfig {
                account_sid: get_or("TWILIO_ACCOUNT_SID", ""),
                auth_token: get_or("TWILIO_AUTH_TOKEN", ""),
                whatsapp_number: get_or("WHATSAPP_NUMBER", ""),
            },
            meta: MetaConfig {
                page_id: get_or("FB_PAGE_ID", ""),
                ig_user_id: get_or("IG_USER_ID", ""),
                access_token: get_or("META_ACCESS_TOKEN", ""),
                graph_version: get("META_GRAPH_VERSION").unwrap_or_else(default_graph_version),
            },
            captioning: CaptionConfig {
                api_key: get_or("GOOGLE_API_KEY", ""),
                model: get("CAPTION_MODEL").unwrap_or(caption_defaults.model),
                temperature: parse_or(
                    get("CAPTION_TEMPERATURE"),
                    "CAPTION_TEMPERATURE",
                    caption_defaults.temperature,
                )?,
                prompt,
            },
        })
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.port, 8000);
        assert_eq!(config.keyframe_count, 5);
        assert_eq!(config.reel_poll.interval, Duration::from_secs(5));
        assert_eq!(config.reel_poll.max_attempts, 20);
        assert_eq!(config.preview_gap, Duration::from_millis(1000));
        assert!(!config.dry_run);
        assert_eq!(config.meta.graph_version, "v21.0");
        assert_eq!(config.captioning.model, "gemini-2.5-flash");
        assert!(!config.twilio.is_configured());
        assert!(!config.meta.is_configured());
        assert!(!config.captioning.is_configured());
    }

    #[test]
    fn test_reads_credentials_and_strips_base_url_slash() {
        let config = config_from(&[
            ("BASE_URL", "https://agent.example.com/"),
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret"),
            ("WHATSAPP_NUMBER", "whatsapp:+14155238886"),
            ("FB_PAGE_ID", "1001"),
            ("IG_USER_ID", "1789"),
            ("META_ACCESS_TOKEN", "EAAB"),
            ("DRY_RUN", "true"),
            ("REEL_POLL_MAX_ATTEMPTS", "3"),
        ])
        .unwrap();

        assert_eq!(config.base_url, "https://agent.example.com");
        assert!(config.twilio.is_configured());
        assert!(config.meta.is_configured());
        assert!(config.dry_run);
        assert_eq!(config.reel_poll.max_attempts, 3);
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = config_from(&[("PORT", "  "), ("FB_PAGE_ID", "")]).unwrap();
        assert_eq!(config.port, 8000);
        assert!(config.meta.page_id.is_empty());
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = config_from(&[("KEYFRAME_COUNT", "five")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: "KEYFRAME_COUNT", .. }
        ));
    }

    #[test]
    fn test_prompt_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "Schrijf een korte post.").unwrap();

        let config = config_from(&[("CAPTION_PROMPT_FILE", path.to_str().unwrap())]).unwrap();
        assert_eq!(config.captioning.prompt, "Schrijf een korte post.");

        let missing = config_from(&[("CAPTION_PROMPT_FILE", "/nonexistent/prompt.txt")]);
        assert!(matches!(missing, Err(ConfigError::PromptFile { .. })));
    }
}
