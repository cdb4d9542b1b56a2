//! Direct upload endpoints that bypass WhatsApp

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
};
use serde::Serialize;
use tracing::info;
use utils::assets::unique_media_path;

use crate::{AppState, error::ApiError};

/// Uploads may be full-length videos
const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/manual-post", post(manual_post))
        .route("/process-upload", post(process_upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// A multipart form with one file part and any number of text parts
struct UploadForm {
    file: Option<(Option<String>, Bytes)>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart, file_field: &str) -> Result<Self, ApiError> {
        let mut form = UploadForm {
            file: None,
            fields: HashMap::new(),
        };

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == file_field {
                let file_name = field.file_name().map(str::to_string);
                form.file = Some((file_name, field.bytes().await?));
            } else {
                form.fields.insert(name, field.text().await?);
            }
        }

        Ok(form)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Write the file part into the media directory as `{prefix}_{uuid}.{ext}`
    async fn store_file(
        &mut self,
        media_dir: &Path,
        prefix: &str,
        file_field: &str,
    ) -> Result<PathBuf, ApiError> {
        let (file_name, bytes) = self
            .file
            .take()
            .ok_or_else(|| ApiError::BadRequest(format!("Missing '{}' file", file_field)))?;

        let extension = file_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| "jpg".to_string());

        tokio::fs::create_dir_all(media_dir).await?;
        let path = unique_media_path(media_dir, prefix, &extension);
        tokio::fs::write(&path, &bytes).await?;
        info!(
            "Upload stored: {} ({} bytes, original name {:?})",
            path.display(),
            bytes.len(),
            file_name
        );
        Ok(path)
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    value
        .map(|v| {
            let v = v.trim();
            v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("on")
        })
        .unwrap_or(false)
}

#[derive(Debug, Serialize)]
pub struct ManualPostResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub file: String,
}

/// POST /manual-post
///
/// Publishes an uploaded file with the given caption straight to both
/// platforms. No draft and no captioning.
pub async fn manual_post(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ManualPostResponse>, ApiError> {
    let mut form = UploadForm::read(multipart, "file").await?;
    let caption = form
        .text("caption")
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest("Missing 'caption' field".to_string()))?;
    let dry_run = parse_flag(form.text("dry_run"));

    let path = form.store_file(&state.config.media_dir, "manual", "file").await?;
    let result = state.publisher.publish_with(&path, &caption, dry_run).await;

    if !result.is_success() {
        return Err(ApiError::PublishFailed(format!(
            "Posting failed (facebook: {}, instagram: {}). Check server logs.",
            result.facebook_ok, result.instagram_ok
        )));
    }

    Ok(Json(ManualPostResponse {
        status: "success",
        message: "Posted successfully!",
        file: path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ProcessUploadResponse {
    pub status: &'static str,
    pub caption: String,
    pub platform: String,
}

/// POST /process-upload
///
/// Brands an uploaded image and returns a generated caption for it.
pub async fn process_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ProcessUploadResponse>, ApiError> {
    let mut form = UploadForm::read(multipart, "image").await?;
    let context = form
        .text("context")
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest("Missing 'context' field".to_string()))?;
    let platform = form.text("platform").unwrap_or("Instagram").to_string();

    let path = form.store_file(&state.config.media_dir, "input", "image").await?;
    let upload = state.orchestrator.caption_upload(&path, &context).await?;
    info!(
        artifact = %upload.artifact_path.display(),
        "Caption generated for upload"
    );

    Ok(Json(ProcessUploadResponse {
        status: "success",
        caption: upload.caption,
        platform,
    }))
}
