use std::path::{Path, PathBuf};

use uuid::Uuid;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");

/// File names looked up inside the brand asset directory
pub mod brand_files {
    pub const WATERMARK: &str = "watermark.png";
    pub const BOTTOM_FLAIR: &str = "bottom.png";
}

/// Route prefix under which the media directory is served
pub const STATIC_ROUTE: &str = "/static";

/// Default directory for downloaded and generated media
pub fn default_media_dir() -> PathBuf {
    std::env::temp_dir().join("social-agent")
}

/// Default brand asset directory
///
/// Debug builds use the repository's `assets/brand`; release builds expect
/// the assets next to the working directory unless `BRAND_ASSET_DIR` is set.
pub fn default_brand_asset_dir() -> PathBuf {
    if cfg!(debug_assertions) {
        PathBuf::from(PROJECT_ROOT).join("../../assets/brand")
    } else {
        PathBuf::from("assets/brand")
    }
}

/// Create `dir` if it does not exist yet
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        tracing::info!("Created media directory: {}", dir.display());
    }
    Ok(())
}

/// Build a collision-free path like `{dir}/{prefix}_{uuid}.{ext}`
///
/// `extension` may be given with or without the leading dot.
pub fn unique_media_path(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    let extension = extension.trim_start_matches('.');
    dir.join(format!("{}_{}.{}", prefix, Uuid::new_v4(), extension))
}

/// Public URL of a file living in the media directory
///
/// Returns `None` when the path has no file name.
pub fn public_media_url(base_url: &str, path: &Path) -> Option<String> {
    let filename = path.file_name()?.to_string_lossy();
    Some(format!(
        "{}{}/{}",
        base_url.trim_end_matches('/'),
        STATIC_ROUTE,
        filename
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_media_url_uses_file_name_only() {
        let url = public_media_url("https://agent.example.com/", Path::new("/tmp/x/branded_1.mp4"));
        assert_eq!(
            url.as_deref(),
            Some("https://agent.example.com/static/branded_1.mp4")
        );
    }

    #[test]
    fn test_public_media_url_without_file_name() {
        assert!(public_media_url("https://a.example", Path::new("/")).is_none());
    }

    #[test]
    fn test_unique_media_path_normalizes_extension() {
        let dir = Path::new("/media");
        let a = unique_media_path(dir, "whatsapp", ".jpg");
        let b = unique_media_path(dir, "whatsapp", "jpg");

        assert_ne!(a, b);
        for path in [a, b] {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("whatsapp_"));
            assert!(name.ends_with(".jpg"));
            assert!(!name.contains(".."));
        }
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // second call is a no-op
        ensure_dir(&nested).unwrap();
    }
}
