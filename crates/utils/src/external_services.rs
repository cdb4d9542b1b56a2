//! External tool discovery
//!
//! Branding and keyframe extraction shell out to ffmpeg/ffprobe. The server
//! checks for them at startup so a missing install shows up in the logs
//! before the first video arrives.

use std::path::PathBuf;

use tracing::{info, warn};

/// Locate an executable, checking common install locations before `PATH`
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let home = std::env::var("HOME").unwrap_or_default();
    let candidates = [
        format!("{}/bin/{}", home, name),
        format!("{}/.local/bin/{}", home, name),
        format!("/usr/local/bin/{}", name),
        format!("/opt/homebrew/bin/{}", name),
    ];

    for candidate in candidates {
        let path = PathBuf::from(&candidate);
        if path.is_file() {
            return Some(path);
        }
    }

    which::which(name).ok()
}

/// Result of the startup tool check
#[derive(Debug, Clone, Default)]
pub struct ExternalToolsStatus {
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
}

impl ExternalToolsStatus {
    pub fn media_tools_available(&self) -> bool {
        self.ffmpeg.is_some() && self.ffprobe.is_some()
    }
}

/// Probe for the media tools and log what was found
pub fn check_external_tools() -> ExternalToolsStatus {
    let status = ExternalToolsStatus {
        ffmpeg: find_executable("ffmpeg"),
        ffprobe: find_executable("ffprobe"),
    };

    match (&status.ffmpeg, &status.ffprobe) {
        (Some(ffmpeg), Some(ffprobe)) => info!(
            "Media tools available: ffmpeg={} ffprobe={}",
            ffmpeg.display(),
            ffprobe.display()
        ),
        _ => warn!(
            "ffmpeg/ffprobe not found - incoming media will fail to process until they are installed"
        ),
    }

    status
}
