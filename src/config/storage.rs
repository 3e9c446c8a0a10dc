use std::env;
use std::path::PathBuf;

/// Directory under the content root that holds message attachments.
/// It is also the public URL prefix.
pub const ATTACHMENTS_DIR: &str = "attachments";

const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024; // 5 MB

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root of the statically served content.
    pub content_root: PathBuf,
    pub max_upload_bytes: usize,
}

impl StorageConfig {
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn from_env() -> Self {
        let content_root = env::var("CONTENT_ROOT").unwrap_or_else(|_| "./wwwroot".to_string());
        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Self {
            content_root: PathBuf::from(content_root),
            max_upload_bytes,
        }
    }

    pub fn attachments_dir(&self) -> PathBuf {
        self.content_root.join(ATTACHMENTS_DIR)
    }
}
