//! Meta Graph API client for the Facebook page and Instagram business account

use std::path::Path;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, multipart};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{debug, info};

use super::{ContainerStatus, GraphApi, SocialError};
use crate::services::config::MetaConfig;

const GRAPH_ROOT: &str = "https://graph.facebook.com";
const GRAPH_VIDEO_ROOT: &str = "https://graph-video.facebook.com";

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PhotoImagesResponse {
    #[serde(default)]
    images: Vec<PhotoImage>,
}

#[derive(Debug, Deserialize)]
struct PhotoImage {
    source: String,
}

#[derive(Debug, Deserialize)]
struct ContainerStatusResponse {
    status_code: Option<String>,
}

pub struct MetaGraphClient {
    client: Client,
    config: MetaConfig,
}

impl MetaGraphClient {
    pub fn new(config: MetaConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, node: &str, edge: Option<&str>) -> String {
        match edge {
            Some(edge) => format!(
                "{}/{}/{}/{}",
                GRAPH_ROOT, self.config.graph_version, node, edge
            ),
            None => format!("{}/{}/{}", GRAPH_ROOT, self.config.graph_version, node),
        }
    }

    fn ensure_configured(&self) -> Result<(), SocialError> {
        if self.config.is_configured() {
            Ok(())
        } else {
            Err(SocialError::NotConfigured)
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SocialError> {
        let response = request
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| SocialError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SocialError::PlatformError(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SocialError::PlatformError(e.to_string()))
    }
}

#[async_trait]
impl GraphApi for MetaGraphClient {
    async fn upload_photo(&self, path: &Path, caption: &str) -> Result<String, SocialError> {
        self.ensure_configured()?;

        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "photo.jpg".to_string());
        let mime = mime_guess::from_path(path)
            .first_or(mime_guess::mime::IMAGE_JPEG)
            .to_string();
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&mime)
            .map_err(|e| SocialError::PlatformError(e.to_string()))?;
        let form = multipart::Form::new()
            .text("caption", caption.to_string())
            .text("published", "true")
            .part("source", part);

        let request = self
            .client
            .post(self.url(&self.config.page_id, Some("photos")))
            .multipart(form);
        let created: IdResponse = self.send(request).await?;

        info!("Facebook photo uploaded: {}", created.id);
        Ok(created.id)
    }

    async fn photo_source_url(&self, photo_id: &str) -> Result<String, SocialError> {
        self.ensure_configured()?;

        let request = self
            .client
            .get(self.url(photo_id, None))
            .query(&[("fields", "images")]);
        let photo: PhotoImagesResponse = self.send(request).await?;

        photo
            .images
            .into_iter()
            .next()
            .map(|image| image.source)
            .ok_or(SocialError::MissingField("images[0].source"))
    }

    async fn post_video(&self, video_url: &str, caption: &str) -> Result<String, SocialError> {
        self.ensure_configured()?;

        let url = format!(
            "{}/{}/{}/videos",
            GRAPH_VIDEO_ROOT, self.config.graph_version, self.config.page_id
        );
        let request = self
            .client
            .post(url)
            .json(&json!({ "file_url": video_url, "description": caption }));
        let created: IdResponse = self.send(request).await?;

        info!("Facebook video posted: {}", created.id);
        Ok(created.id)
    }

    async fn create_image_container(
        &self,
        image_url: &str,
        caption: &str,
    ) -> Result<String, SocialError> {
        self.ensure_configured()?;

        let request = self
            .client
            .post(self.url(&self.config.ig_user_id, Some("media")))
            .json(&json!({ "image_url": image_url, "caption": caption }));
        let container: IdResponse = self.send(request).await?;

        debug!("Instagram image container created: {}", container.id);
        Ok(container.id)
    }

    async fn create_reel_container(
        &self,
        video_url: &str,
        caption: &str,
    ) -> Result<String, SocialError> {
        self.ensure_configured()?;

        let request = self
            .client
            .post(self.url(&self.config.ig_user_id, Some("media")))
            .json(&json!({
                "media_type": "REELS",
                "video_url": video_url,
                "caption": caption
            }));
        let container: IdResponse = self.send(request).await?;

        debug!("Instagram reel container created: {}", container.id);
        Ok(container.id)
    }

    async fn container_status(&self, container_id: &str) -> Result<ContainerStatus, SocialError> {
        self.ensure_configured()?;

        let request = self
            .client
            .get(self.url(container_id, None))
            .query(&[("fields", "status_code")]);
        let status: ContainerStatusResponse = self.send(request).await?;

        status
            .status_code
            .as_deref()
            .map(ContainerStatus::parse)
            .ok_or(SocialError::MissingField("status_code"))
    }

    async fn publish_container(&self, container_id: &str) -> Result<String, SocialError> {
        self.ensure_configured()?;

        let request = self
            .client
            .post(self.url(&self.config.ig_user_id, Some("media_publish")))
            .json(&json!({ "creation_id": container_id }));
        let published: IdResponse = self.send(request).await?;

        info!("Instagram media published: {}", published.id);
        Ok(published.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> MetaConfig {
        MetaConfig {
            page_id: "1001".into(),
            ig_user_id: "1789".into(),
            access_token: "EAAB".into(),
            graph_version: "v21.0".into(),
        }
    }

    #[test]
    fn test_urls_include_graph_version() {
        let client = MetaGraphClient::new(configured());
        assert_eq!(
            client.url("1001", Some("photos")),
            "https://graph.facebook.com/v21.0/1001/photos"
        );
        assert_eq!(
            client.url("17890", None),
            "https://graph.facebook.com/v21.0/17890"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_client_makes_no_calls() {
        let client = MetaGraphClient::new(MetaConfig::default());
        let result = client.create_reel_container("https://x/v.mp4", "caption").await;
        assert!(matches!(result, Err(SocialError::NotConfigured)));
    }
}
