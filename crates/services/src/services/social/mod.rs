//! Social Media Publishing
//!
//! Publishes one artifact and caption to the Facebook page and the linked
//! Instagram business account through the Meta Graph API:
//! - Images go to Facebook first; Instagram reuses the Facebook CDN copy
//! - Videos go to both platforms by public URL, Instagram as a Reel whose
//!   processing container is polled until it is ready

#[cfg(test)]
pub(crate) mod fakes;
pub mod graph;
pub mod poll;
pub mod publisher;

pub use graph::MetaGraphClient;
pub use poll::{PollConfig, Sleeper, TokioSleeper};
pub use publisher::Publisher;

use std::{fmt, path::Path};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("Meta credentials are not configured")]
    NotConfigured,
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Platform API error: {0}")]
    PlatformError(String),
    #[error("Response is missing {0}")]
    MissingField(&'static str),
    #[error("Media container {container_id} ended with status {status}")]
    ContainerFailed {
        container_id: String,
        status: String,
    },
    #[error("Media container not ready after {attempts} status checks")]
    PollTimeout { attempts: u32 },
    #[error("No public URL for {0}")]
    NoPublicUrl(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Facebook,
    Instagram,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Facebook => write!(f, "Facebook"),
            Platform::Instagram => write!(f, "Instagram"),
        }
    }
}

/// Per-platform outcome of one publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub facebook_ok: bool,
    pub instagram_ok: bool,
}

impl PublishResult {
    pub fn succeeded() -> Self {
        Self {
            facebook_ok: true,
            instagram_ok: true,
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }

    /// Both platforms must have accepted the post
    pub fn is_success(&self) -> bool {
        self.facebook_ok && self.instagram_ok
    }
}

/// Processing state of an Instagram media container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerStatus {
    Finished,
    Error,
    Expired,
    InProgress,
    Other(String),
}

impl ContainerStatus {
    pub fn parse(status_code: &str) -> Self {
        match status_code {
            "FINISHED" => ContainerStatus::Finished,
            "ERROR" => ContainerStatus::Error,
            "EXPIRED" => ContainerStatus::Expired,
            "IN_PROGRESS" => ContainerStatus::InProgress,
            other => ContainerStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerStatus::Finished => write!(f, "FINISHED"),
            ContainerStatus::Error => write!(f, "ERROR"),
            ContainerStatus::Expired => write!(f, "EXPIRED"),
            ContainerStatus::InProgress => write!(f, "IN_PROGRESS"),
            ContainerStatus::Other(status) => write!(f, "{}", status),
        }
    }
}

/// The Graph API calls the publisher choreographs
///
/// Every method returns the id of the object it created, except the two
/// lookups.
#[async_trait]
pub trait GraphApi: Send + Sync {
    /// Upload a local photo to the page feed
    async fn upload_photo(&self, path: &Path, caption: &str) -> Result<String, SocialError>;

    /// CDN URL of the largest rendition of an uploaded photo
    async fn photo_source_url(&self, photo_id: &str) -> Result<String, SocialError>;

    /// Post a video to the page by public URL
    async fn post_video(&self, video_url: &str, caption: &str) -> Result<String, SocialError>;

    async fn create_image_container(
        &self,
        image_url: &str,
        caption: &str,
    ) -> Result<String, SocialError>;

    async fn create_reel_container(
        &self,
        video_url: &str,
        caption: &str,
    ) -> Result<String, SocialError>;

    async fn container_status(&self, container_id: &str) -> Result<ContainerStatus, SocialError>;

    async fn publish_container(&self, container_id: &str) -> Result<String, SocialError>;
}

/// Publishes a draft's artifact to every platform
#[async_trait]
pub trait PublishService: Send + Sync {
    async fn publish(&self, artifact: &Path, caption: &str) -> PublishResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_requires_both_platforms() {
        assert!(PublishResult::succeeded().is_success());
        assert!(!PublishResult::failed().is_success());
        assert!(
            !PublishResult {
                facebook_ok: true,
                instagram_ok: false
            }
            .is_success()
        );
    }

    #[test]
    fn test_container_status_parse() {
        assert_eq!(ContainerStatus::parse("FINISHED"), ContainerStatus::Finished);
        assert_eq!(ContainerStatus::parse("ERROR"), ContainerStatus::Error);
        assert_eq!(ContainerStatus::parse("IN_PROGRESS"), ContainerStatus::InProgress);
        assert_eq!(
            ContainerStatus::parse("PUBLISHED"),
            ContainerStatus::Other("PUBLISHED".into())
        );
    }
}
