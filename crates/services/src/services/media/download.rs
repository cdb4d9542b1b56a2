use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use futures::StreamExt;
use reqwest::{
    Client, Response,
    header::{CONTENT_TYPE, USER_AGENT},
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{info, warn};

use super::{AcquiredMedia, MediaAcquirer, MediaError, MediaKind};
use crate::services::config::TwilioConfig;

const DOWNLOAD_RETRIES: usize = 3;

/// Downloads inbound media over HTTP into the media directory
pub struct HttpMediaAcquirer {
    client: Client,
    media_dir: PathBuf,
    /// Twilio media URLs require the account credentials
    twilio_auth: Option<(String, String)>,
}

impl HttpMediaAcquirer {
    pub fn new(media_dir: PathBuf, twilio: &TwilioConfig) -> Self {
        let twilio_auth = if twilio.account_sid.is_empty() || twilio.auth_token.is_empty() {
            None
        } else {
            Some((twilio.account_sid.clone(), twilio.auth_token.clone()))
        };

        Self {
            client: Client::new(),
            media_dir,
            twilio_auth,
        }
    }

    async fn fetch(&self, url: &str) -> Result<Response, MediaError> {
        let mut request = self.client.get(url).header(USER_AGENT, "Mozilla/5.0");
        if url.contains("twilio.com") {
            if let Some((sid, token)) = &self.twilio_auth {
                request = request.basic_auth(sid, Some(token));
            }
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

/// File extension (without dot) for a downloaded body
pub fn extension_for(content_type: Option<&str>) -> String {
    let Some(content_type) = content_type else {
        return "jpg".to_string();
    };

    let known = match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "video/mp4" => Some("mp4"),
        "video/quicktime" => Some("mov"),
        "video/3gpp" => Some("3gp"),
        _ => None,
    };
    if let Some(ext) = known {
        return ext.to_string();
    }

    if let Some(ext) = mime_guess::get_mime_extensions_str(content_type).and_then(|exts| exts.first()) {
        return ext.to_string();
    }

    if content_type.contains("video") {
        "mp4".to_string()
    } else {
        "jpg".to_string()
    }
}

#[async_trait]
impl MediaAcquirer for HttpMediaAcquirer {
    async fn acquire(
        &self,
        url: &str,
        content_type_hint: Option<&str>,
    ) -> Result<AcquiredMedia, MediaError> {
        fs::create_dir_all(&self.media_dir).await?;

        let response = (|| self.fetch(url))
            .retry(ExponentialBuilder::default().with_max_times(DOWNLOAD_RETRIES))
            .when(MediaError::is_transient)
            .notify(|err: &MediaError, delay: Duration| {
                warn!("Media download failed ({}), retrying in {:?}", err, delay);
            })
            .await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase());

        let extension = extension_for(content_type.as_deref().or(content_type_hint));
        let local_path = utils::assets::unique_media_path(&self.media_dir, "whatsapp", &extension);

        let mut file = fs::File::create(&local_path).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        let kind = MediaKind::detect(content_type_hint.or(content_type.as_deref()), &local_path);
        info!(
            "Downloaded media to {} ({} bytes, {:?}, {})",
            local_path.display(),
            written,
            content_type,
            kind
        );

        Ok(AcquiredMedia {
            local_path,
            kind,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_common_types() {
        assert_eq!(extension_for(Some("image/jpeg")), "jpg");
        assert_eq!(extension_for(Some("image/png")), "png");
        assert_eq!(extension_for(Some("video/mp4")), "mp4");
        assert_eq!(extension_for(Some("video/quicktime")), "mov");
    }

    #[test]
    fn test_extension_fallbacks() {
        assert_eq!(extension_for(None), "jpg");
        assert_eq!(extension_for(Some("video/x-made-up")), "mp4");
        assert_eq!(extension_for(Some("application/x-made-up")), "jpg");
    }

    #[test]
    fn test_twilio_credentials_only_when_complete() {
        let dir = PathBuf::from("/tmp/media");
        let partial = TwilioConfig {
            account_sid: "AC1".into(),
            ..Default::default()
        };
        assert!(HttpMediaAcquirer::new(dir.clone(), &partial).twilio_auth.is_none());

        let full = TwilioConfig {
            account_sid: "AC1".into(),
            auth_token: "token".into(),
            whatsapp_number: String::new(),
        };
        assert!(HttpMediaAcquirer::new(dir, &full).twilio_auth.is_some());
    }
}
