pub mod state;
pub mod fetcher;
pub mod coordinator;

pub use state::*;
pub use fetcher::*;
pub use coordinator::*;

use std::time::Duration;

use thiserror::Error;

/// Default pause before preloading starts, so it never competes with first paint.
pub const DEFAULT_PRELOAD_DELAY: Duration = Duration::from_millis(500);

/// Default base path the gallery image identifiers are resolved against.
pub const DEFAULT_IMAGE_BASE_PATH: &str = "/images/";

/// Preload failures. Always recovered: a failed image still counts as settled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreloadError {
    #[error("Image host returned status {status}")]
    Http { status: u16 },

    #[error("Network error: {0}")]
    Network(String),
}

/// Knobs for reference-image preloading.
#[derive(Debug, Clone)]
pub struct PreloadConfig {
    pub enabled: bool,
    pub start_delay: Duration,
    pub image_base_path: String,
    /// Hint for the gallery to defer off-screen images.
    pub lazy_loading: bool,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_delay: DEFAULT_PRELOAD_DELAY,
            image_base_path: DEFAULT_IMAGE_BASE_PATH.to_string(),
            lazy_loading: true,
        }
    }
}

impl PreloadConfig {
    /// Full location of one gallery image.
    pub fn image_url(&self, path: &str) -> String {
        image_url(&self.image_base_path, path)
    }
}

/// Join a base path and an image identifier with exactly one `/` between them.
pub fn image_url(base: &str, path: &str) -> String {
    if base.is_empty() {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_preloading() {
        let config = PreloadConfig::default();
        assert!(config.enabled);
        assert!(config.lazy_loading);
        assert_eq!(config.start_delay, DEFAULT_PRELOAD_DELAY);
    }

    #[test]
    fn image_url_joins_with_single_slash() {
        assert_eq!(image_url("/images/", "Healthy_1.jpg"), "/images/Healthy_1.jpg");
        assert_eq!(image_url("/images", "/Healthy_1.jpg"), "/images/Healthy_1.jpg");
        assert_eq!(
            image_url("http://cdn.local/img/", "Late_Blight_2.jpg"),
            "http://cdn.local/img/Late_Blight_2.jpg"
        );
    }

    #[test]
    fn empty_base_leaves_path_alone() {
        assert_eq!(image_url("", "Healthy_1.jpg"), "Healthy_1.jpg");
    }
}
