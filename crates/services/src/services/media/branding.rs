//! Brand overlays and analysis frames
//!
//! Images are downscaled to at most 1080px wide, padded onto a blurred canvas
//! when their aspect ratio falls outside what Instagram accepts, and get the
//! bottom flair plus a logo in the top-right corner. Videos get the same
//! overlays, are re-encoded to H.264/AAC, and a handful of stills are pulled
//! from the branded result for the captioner.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};
use utils::assets::{brand_files, unique_media_path};

use super::{MediaKind, ffmpeg::FFmpegClient};

/// Widest image we keep; larger uploads are scaled down
pub const MAX_IMAGE_WIDTH: u32 = 1080;
/// Tallest aspect ratio Instagram accepts for feed images (4:5)
pub const MIN_ASPECT_RATIO: f64 = 0.8;
/// Widest aspect ratio Instagram accepts for feed images
pub const MAX_ASPECT_RATIO: f64 = 1.91;

/// Logo width as a percentage of the canvas width
const LOGO_WIDTH_PERCENT: u32 = 15;
/// Image logo padding as a percentage of the canvas width
const IMAGE_LOGO_PADDING_PERCENT: u32 = 2;
const VIDEO_LOGO_PADDING: u32 = 20;
const BLUR_SIGMA: u32 = 50;
const VIDEO_FPS: &str = "24";

#[derive(Debug, Error)]
pub enum BrandingError {
    #[error("FFmpeg error: {0}")]
    FFmpeg(String),
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Process error: {0}")]
    Process(String),
}

/// Output of the branding step
#[derive(Debug, Clone, PartialEq)]
pub struct BrandedMedia {
    /// File that will be previewed and published
    pub artifact_path: PathBuf,
    /// Stills handed to the captioner, taken from the branded artifact
    pub analysis_frames: Vec<PathBuf>,
}

#[async_trait]
pub trait MediaBrander: Send + Sync {
    async fn brand(
        &self,
        source: &Path,
        kind: MediaKind,
        frame_count: usize,
    ) -> Result<BrandedMedia, BrandingError>;
}

/// Evenly spaced interior timestamps: `duration * (i + 1) / (n + 1)`
pub fn keyframe_timestamps(duration: f64, count: usize) -> Vec<f64> {
    if duration <= 0.0 {
        return Vec::new();
    }
    (0..count)
        .map(|i| duration * (i + 1) as f64 / (count + 1) as f64)
        .collect()
}

/// Dimensions after limiting the width to `max_width`, keeping the aspect ratio
pub fn fit_width(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled = (height as f64 * max_width as f64 / width as f64) as u32;
    (max_width, scaled.max(1))
}

/// Canvas an image must be padded onto, or `None` when its ratio already fits
pub fn padded_canvas(width: u32, height: u32) -> Option<(u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    let ratio = width as f64 / height as f64;
    if ratio < MIN_ASPECT_RATIO {
        Some(((height as f64 * MIN_ASPECT_RATIO) as u32, height))
    } else if ratio > MAX_ASPECT_RATIO {
        Some((width, (width as f64 / MAX_ASPECT_RATIO) as u32))
    } else {
        None
    }
}

/// Which brand assets are present on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct Overlays {
    pub flair: bool,
    pub logo: bool,
}

/// Appends flair and logo overlays to `graph`, starting from label `base`.
/// Asset inputs follow the source: flair is input 1, logo the next one.
fn push_overlays(
    graph: &mut Vec<String>,
    base: &str,
    canvas_width: u32,
    logo_padding: u32,
    overlays: Overlays,
) -> String {
    let mut current = base.to_string();
    let mut next_input = 1;

    if overlays.flair {
        graph.push(format!("[{}:v]scale={}:-1[flair]", next_input, canvas_width));
        graph.push(format!("[{}][flair]overlay=0:H-h[flaired]", current));
        current = "flaired".to_string();
        next_input += 1;
    }

    if overlays.logo {
        let logo_width = (canvas_width * LOGO_WIDTH_PERCENT / 100).max(1);
        graph.push(format!("[{}:v]scale={}:-1[logo]", next_input, logo_width));
        graph.push(format!(
            "[{}][logo]overlay=W-w-{}:{}[logoed]",
            current, logo_padding, logo_padding
        ));
        current = "logoed".to_string();
    }

    current
}

/// Filter graph for a still image; the result is labelled `out`
pub fn image_filter_graph(width: u32, height: u32, overlays: Overlays) -> String {
    let (fit_w, fit_h) = fit_width(width, height, MAX_IMAGE_WIDTH);
    let mut graph = vec![format!("[0:v]scale={}:{}[fit]", fit_w, fit_h)];

    let (canvas_w, base) = match padded_canvas(fit_w, fit_h) {
        Some((canvas_w, canvas_h)) => {
            graph.push("[fit]split[fg][bgsrc]".to_string());
            graph.push(format!(
                "[bgsrc]scale={}:{},gblur=sigma={}[bg]",
                canvas_w, canvas_h, BLUR_SIGMA
            ));
            graph.push("[bg][fg]overlay=(W-w)/2:(H-h)/2[padded]".to_string());
            (canvas_w, "padded")
        }
        None => (fit_w, "fit"),
    };

    let padding = canvas_w * IMAGE_LOGO_PADDING_PERCENT / 100;
    let last = push_overlays(&mut graph, base, canvas_w, padding, overlays);
    graph.push(format!("[{}]null[out]", last));
    graph.join(";")
}

/// Filter graph for a video; output dimensions are forced even for libx264
pub fn video_filter_graph(width: u32, overlays: Overlays) -> String {
    let mut graph = vec!["[0:v]null[src]".to_string()];
    let last = push_overlays(&mut graph, "src", width, VIDEO_LOGO_PADDING, overlays);
    graph.push(format!(
        "[{}]scale=trunc(iw/2)*2:trunc(ih/2)*2,format=yuv420p[out]",
        last
    ));
    graph.join(";")
}

/// Brands media with ffmpeg using the assets in `asset_dir`
pub struct FfmpegBrander {
    ffmpeg: FFmpegClient,
    media_dir: PathBuf,
    asset_dir: PathBuf,
}

impl FfmpegBrander {
    pub fn new(ffmpeg: FFmpegClient, media_dir: PathBuf, asset_dir: PathBuf) -> Self {
        Self {
            ffmpeg,
            media_dir,
            asset_dir,
        }
    }

    /// Asset inputs in filter order, plus which ones were found
    fn asset_inputs(&self) -> (Vec<PathBuf>, Overlays) {
        let flair = self.asset_dir.join(brand_files::BOTTOM_FLAIR);
        let logo = self.asset_dir.join(brand_files::WATERMARK);
        let mut inputs = Vec::new();
        let mut overlays = Overlays::default();

        if flair.exists() {
            overlays.flair = true;
            inputs.push(flair);
        } else {
            warn!("Bottom flair asset not found at {}", flair.display());
        }
        if logo.exists() {
            overlays.logo = true;
            inputs.push(logo);
        } else {
            warn!("Watermark asset not found at {}", logo.display());
        }

        (inputs, overlays)
    }

    fn input_args(source: &Path, assets: &[PathBuf]) -> Vec<String> {
        let mut args = vec!["-i".to_string(), source.to_string_lossy().to_string()];
        for asset in assets {
            args.push("-i".to_string());
            args.push(asset.to_string_lossy().to_string());
        }
        args
    }

    async fn brand_image(&self, source: &Path) -> Result<BrandedMedia, BrandingError> {
        let (width, height) = self.ffmpeg.probe_dimensions(source).await?;
        let (assets, overlays) = self.asset_inputs();
        let output = unique_media_path(&self.media_dir, "branded", "jpg");

        let mut args = Self::input_args(source, &assets);
        args.extend([
            "-filter_complex".to_string(),
            image_filter_graph(width, height, overlays),
            "-map".to_string(),
            "[out]".to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            "2".to_string(),
            output.to_string_lossy().to_string(),
        ]);
        self.ffmpeg.run(&args).await?;

        info!("Image branded: {}", output.display());
        Ok(BrandedMedia {
            analysis_frames: vec![output.clone()],
            artifact_path: output,
        })
    }

    async fn brand_video(
        &self,
        source: &Path,
        frame_count: usize,
    ) -> Result<BrandedMedia, BrandingError> {
        let (width, _) = self.ffmpeg.probe_dimensions(source).await?;
        let (assets, overlays) = self.asset_inputs();
        let output = unique_media_path(&self.media_dir, "branded_video", "mp4");

        let graph = video_filter_graph(width, overlays);

        info!("Starting video branding on {}", source.display());
        let mut args = Self::input_args(source, &assets);
        args.extend(
            [
                "-filter_complex",
                graph.as_str(),
                "-map",
                "[out]",
                "-map",
                "0:a?",
                "-c:v",
                "libx264",
                "-preset",
                "ultrafast",
                "-r",
                VIDEO_FPS,
                "-c:a",
                "aac",
                "-movflags",
                "+faststart",
            ]
            .map(String::from),
        );
        args.push(output.to_string_lossy().to_string());
        self.ffmpeg.run(&args).await?;
        info!("Video branding complete: {}", output.display());

        let analysis_frames = self.extract_frames(&output, frame_count).await;
        Ok(BrandedMedia {
            artifact_path: output,
            analysis_frames,
        })
    }

    /// Stills from the branded video; frames that fail to extract are skipped
    async fn extract_frames(&self, video: &Path, count: usize) -> Vec<PathBuf> {
        let duration = match self.ffmpeg.probe_duration(video).await {
            Ok(duration) => duration,
            Err(e) => {
                warn!("Could not read duration of {}: {}", video.display(), e);
                return Vec::new();
            }
        };

        let mut frames = Vec::with_capacity(count);
        for (index, timestamp) in keyframe_timestamps(duration, count).into_iter().enumerate() {
            let frame = unique_media_path(&self.media_dir, &format!("frame_{}", index), "jpg");
            let args = [
                "-ss".to_string(),
                format!("{:.3}", timestamp),
                "-i".to_string(),
                video.to_string_lossy().to_string(),
                "-frames:v".to_string(),
                "1".to_string(),
                "-q:v".to_string(),
                "2".to_string(),
                frame.to_string_lossy().to_string(),
            ];
            match self.ffmpeg.run(&args).await {
                Ok(()) => frames.push(frame),
                Err(e) => warn!("Skipping frame at {:.2}s: {}", timestamp, e),
            }
        }
        frames
    }
}

#[async_trait]
impl MediaBrander for FfmpegBrander {
    async fn brand(
        &self,
        source: &Path,
        kind: MediaKind,
        frame_count: usize,
    ) -> Result<BrandedMedia, BrandingError> {
        if !source.exists() {
            return Err(BrandingError::FileNotFound(source.to_path_buf()));
        }
        tokio::fs::create_dir_all(&self.media_dir).await?;

        match kind {
            MediaKind::Image => self.brand_image(source).await,
            MediaKind::Video => self.brand_video(source, frame_count).await,
        }
    }
}
