//! Draft lifecycle
//!
//! Media intake runs in the background on a per-owner intake lane: acquire,
//! brand, caption, save the draft, preview it. Text commands run on a
//! separate per-owner command lane. A command only changes the draft it read,
//! so a draft saved by a newer upload meanwhile is left pending.

use std::{
    panic::AssertUnwindSafe,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use futures::FutureExt;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::services::{
    captioning::{CaptionError, CaptionService},
    config::AppConfig,
    drafts::{Draft, DraftStore, DraftStoreError},
    lanes::OwnerLanes,
    media::{BrandingError, MediaAcquirer, MediaBrander, MediaError, MediaJob, MediaKind},
    messages::{self, Command},
    notifier::Notifier,
    social::PublishService,
};

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Media acquisition failed: {0}")]
    Acquisition(#[from] MediaError),
    #[error("Branding failed: {0}")]
    Branding(#[from] BrandingError),
    #[error("Captioning failed: {0}")]
    Captioning(#[from] CaptionError),
    #[error("Draft store failed: {0}")]
    Store(#[from] DraftStoreError),
}

/// What a text command did to the owner's draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    NoDraft,
    Published,
    PublishFailed,
    Cancelled,
    CaptionUpdated,
    /// The draft the command was read against was replaced by a newer upload
    Superseded,
    Empty,
    StoreError,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Stills extracted from a branded video for captioning
    pub keyframe_count: usize,
    pub default_context: String,
    /// Pause between preview media and preview text
    pub preview_gap: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            keyframe_count: 5,
            default_context: "Maak een professionele post.".to_string(),
            preview_gap: Duration::from_secs(1),
        }
    }
}

impl From<&AppConfig> for OrchestratorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            keyframe_count: config.keyframe_count,
            default_context: config.default_context.clone(),
            preview_gap: config.preview_gap,
        }
    }
}

/// External collaborators the orchestrator drives
#[derive(Clone)]
pub struct Collaborators {
    pub drafts: Arc<dyn DraftStore>,
    pub acquirer: Arc<dyn MediaAcquirer>,
    pub brander: Arc<dyn MediaBrander>,
    pub captioner: Arc<dyn CaptionService>,
    pub notifier: Arc<dyn Notifier>,
    pub publisher: Arc<dyn PublishService>,
}

/// A captioned upload from the synchronous upload endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CaptionedUpload {
    pub artifact_path: PathBuf,
    pub caption: String,
}

#[derive(Clone)]
pub struct Orchestrator {
    deps: Collaborators,
    settings: Arc<OrchestratorSettings>,
    intake_lanes: OwnerLanes,
    command_lanes: OwnerLanes,
}

impl Orchestrator {
    pub fn new(deps: Collaborators, settings: OrchestratorSettings) -> Self {
        Self {
            deps,
            settings: Arc::new(settings),
            intake_lanes: OwnerLanes::new("intake"),
            command_lanes: OwnerLanes::new("command"),
        }
    }

    /// Queue processing of inbound media behind any earlier media from the
    /// same owner. The acknowledgement goes out on its own task so the caller
    /// never waits on the channel; the preview waits for it.
    pub fn submit_media(
        &self,
        owner_id: &str,
        media_url: &str,
        content_type: Option<&str>,
        context_text: &str,
    ) {
        let is_video = MediaKind::detect(content_type, Path::new(media_url)).is_video();
        info!(owner = %owner_id, media_url, ?content_type, "Media received");

        let this = self.clone();
        let owner = owner_id.to_string();
        let ack = tokio::spawn(async move {
            this.notify_text(&owner, &messages::media_received(is_video))
                .await;
        });

        let this = self.clone();
        let owner = owner_id.to_string();
        let url = media_url.to_string();
        let hint = content_type.map(str::to_string);
        let context = context_text.trim().to_string();
        self.intake_lanes.submit(owner_id, async move {
            this.intake(&owner, &url, hint.as_deref(), &context, Some(ack))
                .await;
        });
    }

    /// Queue a text command behind earlier commands from the same owner
    pub fn submit_command(&self, owner_id: &str, text: &str) {
        let this = self.clone();
        let owner = owner_id.to_string();
        let text = text.to_string();
        self.command_lanes.submit(owner_id, async move {
            let outcome = this.handle_command(&owner, &text).await;
            info!(owner = %owner, ?outcome, "Command handled");
        });
    }

    /// Process one media message to a previewed draft
    pub async fn run_intake(
        &self,
        owner_id: &str,
        media_url: &str,
        content_type: Option<&str>,
        context_text: &str,
    ) {
        self.intake(owner_id, media_url, content_type, context_text, None)
            .await;
    }

    /// Intake job boundary. Every failure before the draft is saved, panics
    /// included, ends in exactly one processing-failed message and no draft
    /// change. Once saved, the draft stands whatever happens to the preview.
    async fn intake(
        &self,
        owner_id: &str,
        media_url: &str,
        content_type: Option<&str>,
        context_text: &str,
        ack: Option<JoinHandle<()>>,
    ) {
        let job = self.prepare_draft(owner_id, media_url, content_type, context_text);
        let prepared = AssertUnwindSafe(job).catch_unwind().await;

        if let Some(ack) = ack {
            if let Err(e) = ack.await {
                warn!(owner = %owner_id, "Acknowledgement task failed: {}", e);
            }
        }

        let (draft, caption_failed) = match prepared {
            Ok(Ok(prepared)) => prepared,
            Ok(Err(e)) => {
                error!(owner = %owner_id, media_url, "Media processing failed: {}", e);
                self.notify_text(owner_id, messages::PROCESSING_FAILED).await;
                return;
            }
            Err(_) => {
                error!(owner = %owner_id, media_url, "Media processing panicked");
                self.notify_text(owner_id, messages::PROCESSING_FAILED).await;
                return;
            }
        };

        let preview = self.send_preview(
            owner_id,
            &draft.artifact_path,
            &draft.caption,
            caption_failed,
        );
        if AssertUnwindSafe(preview).catch_unwind().await.is_err() {
            error!(
                owner = %owner_id,
                draft_id = %draft.id,
                "Preview panicked, draft kept"
            );
        }
    }

    /// Acquire, brand, caption and save. Returns the saved draft and whether
    /// the fallback caption was used.
    async fn prepare_draft(
        &self,
        owner_id: &str,
        media_url: &str,
        content_type: Option<&str>,
        context_text: &str,
    ) -> Result<(Draft, bool), IntakeError> {
        let acquired = self.deps.acquirer.acquire(media_url, content_type).await?;
        let job = MediaJob {
            source_url: media_url.to_string(),
            local_path: acquired.local_path,
            kind: acquired.kind,
            context_text: if context_text.is_empty() {
                self.settings.default_context.clone()
            } else {
                context_text.to_string()
            },
        };
        info!(
            owner = %owner_id,
            source = %job.source_url,
            path = %job.local_path.display(),
            kind = %job.kind,
            content_type = ?acquired.content_type,
            "Processing media"
        );

        let branded = self
            .deps
            .brander
            .brand(&job.local_path, job.kind, self.settings.keyframe_count)
            .await?;

        let (caption, caption_failed) = match self
            .deps
            .captioner
            .generate_caption(&branded.analysis_frames, &job.context_text)
            .await
        {
            Ok(caption) => (caption, false),
            Err(e) => {
                warn!(owner = %owner_id, "Captioning failed, using fallback: {}", e);
                (messages::CAPTION_FALLBACK.to_string(), true)
            }
        };

        let draft = self
            .deps
            .drafts
            .save(owner_id, &branded.artifact_path, &caption)
            .await?;
        info!(
            owner = %owner_id,
            draft_id = %draft.id,
            artifact = %draft.artifact_path.display(),
            "Draft saved"
        );
        Ok((draft, caption_failed))
    }

    /// Media first, then the text, so the chat shows them in that order
    async fn send_preview(
        &self,
        owner_id: &str,
        artifact: &Path,
        caption: &str,
        caption_failed: bool,
    ) {
        if let Err(e) = self.deps.notifier.send_media(owner_id, artifact).await {
            warn!(owner = %owner_id, "Preview media not sent: {}", e);
        }
        if !self.settings.preview_gap.is_zero() {
            tokio::time::sleep(self.settings.preview_gap).await;
        }
        self.notify_text(owner_id, &messages::preview(caption, caption_failed))
            .await;
    }

    /// Apply one text command to the owner's current draft
    ///
    /// Edits and removals only land on the draft that was read here; a draft
    /// saved by a newer upload in the meantime is left untouched.
    pub async fn handle_command(&self, owner_id: &str, text: &str) -> CommandOutcome {
        let draft = match self.deps.drafts.get(owner_id).await {
            Ok(Some(draft)) => draft,
            Ok(None) => {
                self.notify_text(owner_id, messages::NO_DRAFT).await;
                return CommandOutcome::NoDraft;
            }
            Err(e) => return self.store_failure(owner_id, e).await,
        };

        match Command::parse(text) {
            Command::Confirm => {
                let result = self
                    .deps
                    .publisher
                    .publish(&draft.artifact_path, &draft.caption)
                    .await;
                if result.is_success() {
                    match self.deps.drafts.clear(owner_id, draft.id).await {
                        Ok(true) => {}
                        Ok(false) => info!(
                            owner = %owner_id,
                            draft_id = %draft.id,
                            "Published, a newer draft stays pending"
                        ),
                        Err(e) => {
                            error!(owner = %owner_id, "Published but draft not cleared: {}", e)
                        }
                    }
                    info!(owner = %owner_id, draft_id = %draft.id, "Draft published");
                    self.notify_text(owner_id, messages::PUBLISHED).await;
                    CommandOutcome::Published
                } else {
                    warn!(
                        owner = %owner_id,
                        facebook_ok = result.facebook_ok,
                        instagram_ok = result.instagram_ok,
                        "Publish failed, keeping draft"
                    );
                    self.notify_text(owner_id, messages::PUBLISH_FAILED).await;
                    CommandOutcome::PublishFailed
                }
            }
            Command::Cancel => match self.deps.drafts.clear(owner_id, draft.id).await {
                Ok(true) => {
                    info!(owner = %owner_id, draft_id = %draft.id, "Draft cancelled");
                    self.notify_text(owner_id, messages::DRAFT_REMOVED).await;
                    CommandOutcome::Cancelled
                }
                Ok(false) => self.draft_moved(owner_id).await,
                Err(e) => self.store_failure(owner_id, e).await,
            },
            Command::Empty => {
                self.notify_text(owner_id, &messages::empty_command()).await;
                CommandOutcome::Empty
            }
            Command::Edit(caption) => {
                match self
                    .deps
                    .drafts
                    .update_caption(owner_id, draft.id, &caption)
                    .await
                {
                    Ok(Some(updated)) => {
                        info!(owner = %owner_id, draft_id = %updated.id, "Caption updated");
                        self.notify_text(owner_id, &messages::caption_updated(&updated.caption))
                            .await;
                        CommandOutcome::CaptionUpdated
                    }
                    Ok(None) => self.draft_moved(owner_id).await,
                    Err(e) => self.store_failure(owner_id, e).await,
                }
            }
        }
    }

    /// Brand and caption an uploaded image without creating a draft
    pub async fn caption_upload(
        &self,
        path: &Path,
        context_text: &str,
    ) -> Result<CaptionedUpload, IntakeError> {
        let branded = self
            .deps
            .brander
            .brand(path, MediaKind::Image, self.settings.keyframe_count)
            .await?;
        let context = if context_text.trim().is_empty() {
            self.settings.default_context.as_str()
        } else {
            context_text
        };
        let caption = self
            .deps
            .captioner
            .generate_caption(&branded.analysis_frames, context)
            .await?;

        Ok(CaptionedUpload {
            artifact_path: branded.artifact_path,
            caption,
        })
    }

    /// The draft a command was read against is gone: replaced or removed
    async fn draft_moved(&self, owner_id: &str) -> CommandOutcome {
        match self.deps.drafts.get(owner_id).await {
            Ok(Some(_)) => {
                self.notify_text(owner_id, messages::DRAFT_REPLACED).await;
                CommandOutcome::Superseded
            }
            Ok(None) => {
                self.notify_text(owner_id, messages::NO_DRAFT).await;
                CommandOutcome::NoDraft
            }
            Err(e) => self.store_failure(owner_id, e).await,
        }
    }

    async fn store_failure(&self, owner_id: &str, e: DraftStoreError) -> CommandOutcome {
        error!(owner = %owner_id, "Draft store error: {}", e);
        self.notify_text(owner_id, messages::STORE_UNAVAILABLE).await;
        CommandOutcome::StoreError
    }

    async fn notify_text(&self, owner_id: &str, body: &str) {
        if let Err(e) = self.deps.notifier.send_text(owner_id, body).await {
            warn!(owner = %owner_id, "Message not sent: {}", e);
        }
    }
}
