//! Inbound media: acquisition, kind detection and branding

pub mod branding;
pub mod download;
pub mod ffmpeg;

use std::{fmt, path::Path, path::PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use branding::{BrandedMedia, BrandingError, FfmpegBrander, MediaBrander};
pub use download::HttpMediaAcquirer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Kind implied by a file extension; anything that is not a known video
    /// type is treated as an image
    pub fn from_path(path: &Path) -> Self {
        match mime_guess::from_path(path).first() {
            Some(mime) if mime.type_().as_str() == "video" => MediaKind::Video,
            _ => MediaKind::Image,
        }
    }

    /// Combine the channel's content-type hint with the downloaded file name
    pub fn detect(content_type_hint: Option<&str>, path: &Path) -> Self {
        let hinted_video = content_type_hint
            .map(|ct| ct.to_ascii_lowercase().contains("video"))
            .unwrap_or(false);
        if hinted_video {
            MediaKind::Video
        } else {
            Self::from_path(path)
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, MediaKind::Video)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// A file fetched from the messaging channel
#[derive(Debug, Clone)]
pub struct AcquiredMedia {
    pub local_path: PathBuf,
    /// Decided from the channel hint, the served content type and the file name
    pub kind: MediaKind,
    /// Content type reported by the media server, if any
    pub content_type: Option<String>,
}

/// One background processing run; discarded once a draft exists or the run fails
#[derive(Debug, Clone)]
pub struct MediaJob {
    pub source_url: String,
    pub local_path: PathBuf,
    pub kind: MediaKind,
    pub context_text: String,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Download of {url} failed with HTTP {status}")]
    HttpStatus { status: u16, url: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Whether retrying the download could help
    pub fn is_transient(&self) -> bool {
        match self {
            MediaError::Network(e) => e.is_connect() || e.is_timeout(),
            MediaError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            MediaError::Io(_) => false,
        }
    }
}

/// Fetches remote media into local storage
#[async_trait]
pub trait MediaAcquirer: Send + Sync {
    async fn acquire(
        &self,
        url: &str,
        content_type_hint: Option<&str>,
    ) -> Result<AcquiredMedia, MediaError>;
}
