//! Pending draft storage
//!
//! A draft is the branded artifact plus caption waiting for the owner's
//! confirmation. At most one draft exists per owner; saving again replaces it.
//! The in-memory store loses everything on restart.
//!
//! Every save mints a new draft id. Edits and removals name the id they were
//! decided against, so a command racing a newer upload never touches the
//! newer draft.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DraftStoreError {
    #[error("Draft store backend error: {0}")]
    Backend(String),
}

/// The unit of pending work for one owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub id: Uuid,
    pub owner_id: String,
    pub artifact_path: PathBuf,
    pub caption: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storage for pending drafts, keyed by owner id
///
/// Implementations must be safe to call concurrently for different owners and
/// must apply each operation atomically for a single owner.
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Create or unconditionally overwrite the owner's draft
    async fn save(
        &self,
        owner_id: &str,
        artifact_path: &Path,
        caption: &str,
    ) -> Result<Draft, DraftStoreError>;

    async fn get(&self, owner_id: &str) -> Result<Option<Draft>, DraftStoreError>;

    /// Replace the caption of the owner's draft while it is still `draft_id`.
    /// Returns the updated draft, or `None` (creating nothing) when the owner
    /// has no draft or it has been replaced since.
    async fn update_caption(
        &self,
        owner_id: &str,
        draft_id: Uuid,
        caption: &str,
    ) -> Result<Option<Draft>, DraftStoreError>;

    /// Remove the owner's draft while it is still `draft_id`. Returns whether
    /// it was removed.
    async fn clear(&self, owner_id: &str, draft_id: Uuid) -> Result<bool, DraftStoreError>;
}

/// Default store backed by a sharded concurrent map
#[derive(Debug, Default)]
pub struct InMemoryDraftStore {
    drafts: DashMap<String, Draft>,
}

impl InMemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}

#[async_trait]
impl DraftStore for InMemoryDraftStore {
    async fn save(
        &self,
        owner_id: &str,
        artifact_path: &Path,
        caption: &str,
    ) -> Result<Draft, DraftStoreError> {
        let now = Utc::now();
        let draft = Draft {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            artifact_path: artifact_path.to_path_buf(),
            caption: caption.to_string(),
            created_at: now,
            updated_at: now,
        };

        if self.drafts.insert(owner_id.to_string(), draft.clone()).is_some() {
            info!(owner = %owner_id, draft_id = %draft.id, "Draft replaced");
        } else {
            info!(owner = %owner_id, draft_id = %draft.id, "Draft saved");
        }
        Ok(draft)
    }

    async fn get(&self, owner_id: &str) -> Result<Option<Draft>, DraftStoreError> {
        Ok(self.drafts.get(owner_id).map(|entry| entry.value().clone()))
    }

    async fn update_caption(
        &self,
        owner_id: &str,
        draft_id: Uuid,
        caption: &str,
    ) -> Result<Option<Draft>, DraftStoreError> {
        // The entry guard holds the shard lock across the id check and the write
        match self.drafts.get_mut(owner_id) {
            Some(mut draft) if draft.id == draft_id => {
                draft.caption = caption.to_string();
                draft.updated_at = Utc::now();
                info!(owner = %owner_id, %draft_id, "Draft caption updated");
                Ok(Some(draft.value().clone()))
            }
            Some(_) => {
                info!(owner = %owner_id, %draft_id, "Caption edit skipped, draft was replaced");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn clear(&self, owner_id: &str, draft_id: Uuid) -> Result<bool, DraftStoreError> {
        let removed = self
            .drafts
            .remove_if(owner_id, |_, draft| draft.id == draft_id)
            .is_some();
        if removed {
            info!(owner = %owner_id, %draft_id, "Draft cleared");
        }
        Ok(removed)
    }
}
