//! Thin wrapper around the ffmpeg and ffprobe binaries

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, warn};
use utils::external_services::find_executable;

use super::BrandingError;

#[derive(Debug, Clone)]
pub struct FFmpegClient {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
}

impl Default for FFmpegClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FFmpegClient {
    /// Resolve both binaries; unresolved ones fall back to a bare name so a
    /// later PATH change still works, and fail at call time otherwise
    pub fn new() -> Self {
        let resolve = |name: &str| {
            find_executable(name).unwrap_or_else(|| {
                warn!("{} not found, relying on PATH at call time", name);
                PathBuf::from(name)
            })
        };

        Self {
            ffmpeg_path: resolve("ffmpeg"),
            ffprobe_path: resolve("ffprobe"),
        }
    }

    async fn probe_json(&self, path: &Path, extra: &[&str]) -> Result<Value, BrandingError> {
        if !path.exists() {
            return Err(BrandingError::FileNotFound(path.to_path_buf()));
        }

        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json"])
            .args(extra)
            .arg(path)
            .output()
            .await
            .map_err(|e| BrandingError::Process(format!("ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(BrandingError::FFmpeg(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| BrandingError::FFmpeg(e.to_string()))
    }

    /// Container duration in seconds
    pub async fn probe_duration(&self, path: &Path) -> Result<f64, BrandingError> {
        let json = self.probe_json(path, &["-show_format"]).await?;
        json["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| BrandingError::FFmpeg("No duration in probe output".to_string()))
    }

    /// Width and height of the first video stream (images count as one)
    pub async fn probe_dimensions(&self, path: &Path) -> Result<(u32, u32), BrandingError> {
        let json = self
            .probe_json(path, &["-show_streams", "-select_streams", "v:0"])
            .await?;
        let stream = json["streams"]
            .as_array()
            .and_then(|streams| streams.first())
            .ok_or_else(|| BrandingError::FFmpeg("No video stream found".to_string()))?;

        match (stream["width"].as_u64(), stream["height"].as_u64()) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Ok((w as u32, h as u32)),
            _ => Err(BrandingError::FFmpeg("Stream has no dimensions".to_string())),
        }
    }

    /// Run ffmpeg with `args`, overwriting outputs
    pub async fn run(&self, args: &[String]) -> Result<(), BrandingError> {
        debug!("ffmpeg {}", args.join(" "));

        let output = Command::new(&self.ffmpeg_path)
            .arg("-y")
            .args(["-hide_banner", "-loglevel", "error"])
            .args(args)
            .output()
            .await
            .map_err(|e| BrandingError::Process(format!("ffmpeg: {}", e)))?;

        if !output.status.success() {
            return Err(BrandingError::FFmpeg(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }
}
