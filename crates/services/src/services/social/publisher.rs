//! Two-platform publish choreography
//!
//! Images: Facebook photo upload, then Instagram from the Facebook CDN URL.
//! If Facebook rejects the photo, Instagram is not attempted.
//! Videos: Facebook video and Instagram Reel run concurrently from the public
//! static URL. Nothing is rolled back when only one platform succeeds.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::{
    GraphApi, Platform, PublishResult, PublishService, SocialError,
    poll::{PollConfig, Sleeper, TokioSleeper, wait_for_container},
};
use crate::services::media::MediaKind;

pub struct Publisher {
    graph: Arc<dyn GraphApi>,
    /// Public base URL the static media route is served under
    base_url: String,
    poll: PollConfig,
    sleeper: Arc<dyn Sleeper>,
    dry_run: bool,
}

impl Publisher {
    pub fn new(graph: Arc<dyn GraphApi>, base_url: impl Into<String>, poll: PollConfig) -> Self {
        Self {
            graph,
            base_url: base_url.into(),
            poll,
            sleeper: Arc::new(TokioSleeper),
            dry_run: false,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Publish with an explicit dry-run flag; a dry run makes no API calls
    pub async fn publish_with(&self, artifact: &Path, caption: &str, dry_run: bool) -> PublishResult {
        info!(
            "Publishing {} ({})",
            artifact.display(),
            if dry_run { "dry run" } else { "live" }
        );

        match MediaKind::from_path(artifact) {
            MediaKind::Image => self.publish_image(artifact, caption, dry_run).await,
            MediaKind::Video => {
                match utils::assets::public_media_url(&self.base_url, artifact) {
                    Some(url) => self.publish_video(&url, caption, dry_run).await,
                    None => {
                        error!(
                            "{}",
                            SocialError::NoPublicUrl(artifact.display().to_string())
                        );
                        PublishResult::failed()
                    }
                }
            }
        }
    }

    pub async fn publish_image(&self, path: &Path, caption: &str, dry_run: bool) -> PublishResult {
        if dry_run {
            info!("[DRY RUN] Image {} to Facebook and Instagram", path.display());
            return PublishResult::succeeded();
        }

        let photo_id = match self.graph.upload_photo(path, caption).await {
            Ok(id) => id,
            Err(e) => {
                error!(platform = %Platform::Facebook, "Photo upload failed: {}", e);
                warn!(platform = %Platform::Instagram, "Skipped because the Facebook upload failed");
                return PublishResult::failed();
            }
        };

        let instagram_ok = match self.instagram_from_facebook_photo(&photo_id, caption).await {
            Ok(media_id) => {
                info!(platform = %Platform::Instagram, "Image published: {}", media_id);
                true
            }
            Err(e) => {
                error!(platform = %Platform::Instagram, "Image publish failed: {}", e);
                false
            }
        };

        PublishResult {
            facebook_ok: true,
            instagram_ok,
        }
    }

    pub async fn publish_video(&self, video_url: &str, caption: &str, dry_run: bool) -> PublishResult {
        if dry_run {
            info!("[DRY RUN] Video {} to Facebook and Instagram", video_url);
            return PublishResult::succeeded();
        }

        let (facebook, instagram) = tokio::join!(
            self.graph.post_video(video_url, caption),
            self.instagram_reel(video_url, caption)
        );

        let facebook_ok = match facebook {
            Ok(id) => {
                info!(platform = %Platform::Facebook, "Video posted: {}", id);
                true
            }
            Err(e) => {
                error!(platform = %Platform::Facebook, "Video post failed: {}", e);
                false
            }
        };
        let instagram_ok = match instagram {
            Ok(id) => {
                info!(platform = %Platform::Instagram, "Reel published: {}", id);
                true
            }
            Err(e) => {
                error!(platform = %Platform::Instagram, "Reel publish failed: {}", e);
                false
            }
        };

        PublishResult {
            facebook_ok,
            instagram_ok,
        }
    }

    async fn instagram_from_facebook_photo(
        &self,
        photo_id: &str,
        caption: &str,
    ) -> Result<String, SocialError> {
        let image_url = self.graph.photo_source_url(photo_id).await?;
        let container_id = self.graph.create_image_container(&image_url, caption).await?;
        self.graph.publish_container(&container_id).await
    }

    async fn instagram_reel(&self, video_url: &str, caption: &str) -> Result<String, SocialError> {
        let container_id = self.graph.create_reel_container(video_url, caption).await?;
        wait_for_container(
            self.graph.as_ref(),
            &container_id,
            &self.poll,
            self.sleeper.as_ref(),
        )
        .await?;
        self.graph.publish_container(&container_id).await
    }
}

#[async_trait]
impl PublishService for Publisher {
    async fn publish(&self, artifact: &Path, caption: &str) -> PublishResult {
        self.publish_with(artifact, caption, self.dry_run).await
    }
}
