//! Local file storage for uploaded media and profile pictures

use rand::Rng;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::config::UploadConfig;
use crate::errors::{AppError, Result};
use crate::metrics::record_upload;

const MAX_BASE_LEN: usize = 40;
const PROFILE_DIR: &str = "profiles";
const PROFILE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif"];

/// What an upload is for; decides size limit, accepted types, and subdirectory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPolicy {
    /// Article images and videos
    Media,
    /// User profile pictures
    Profile,
}

impl UploadPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadPolicy::Media => "media",
            UploadPolicy::Profile => "profile",
        }
    }

    fn subdir(&self) -> Option<&'static str> {
        match self {
            UploadPolicy::Media => None,
            UploadPolicy::Profile => Some(PROFILE_DIR),
        }
    }

    /// Check type and extension before any bytes are written
    pub fn check_type(&self, filename: &str, content_type: &str) -> Result<()> {
        let mime = content_type.to_ascii_lowercase();
        let accepted = match self {
            UploadPolicy::Media => mime.starts_with("image/") || mime.starts_with("video/"),
            UploadPolicy::Profile => {
                let ext = extension(basename(filename)).to_ascii_lowercase();
                let ext = ext.trim_start_matches('.');
                PROFILE_EXTENSIONS.contains(&ext)
                    && PROFILE_EXTENSIONS
                        .iter()
                        .any(|t| mime == format!("image/{}", t))
            }
        };

        if accepted {
            Ok(())
        } else {
            Err(AppError::UnsupportedMediaType {
                content_type: content_type.to_string(),
            })
        }
    }
}

/// A file written to the upload directory
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoredUpload {
    /// Public URL, e.g. `/uploads/photo-1700000000000-123456789.jpg`
    pub url: String,
    pub filename: String,
    pub size: usize,
    pub sha256: String,
}

static UNSAFE_CHARS: OnceLock<regex_lite::Regex> = OnceLock::new();

/// Compiled once, on first use
fn unsafe_chars() -> Result<&'static regex_lite::Regex> {
    if let Some(re) = UNSAFE_CHARS.get() {
        return Ok(re);
    }
    let re = regex_lite::Regex::new(r"[^a-zA-Z0-9_-]").map_err(|e| AppError::Internal {
        message: format!("Invalid filename pattern: {}", e),
    })?;
    Ok(UNSAFE_CHARS.get_or_init(|| re))
}

/// Reduce a client file stem to `[a-zA-Z0-9_-]`, at most 40 characters
pub fn sanitize_base(stem: &str, fallback: &str) -> Result<String> {
    let cleaned: String = unsafe_chars()?
        .replace_all(stem, "")
        .chars()
        .take(MAX_BASE_LEN)
        .collect();
    if cleaned.is_empty() {
        Ok(fallback.to_string())
    } else {
        Ok(cleaned)
    }
}

/// Extension including the leading dot, or an empty string
fn extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < filename.len() => &filename[idx..],
        _ => "",
    }
}

/// Final path component of a client-supplied name
fn basename(filename: &str) -> &str {
    filename.rsplit(['/', '\\']).next().unwrap_or(filename)
}

/// `{base}-{millis}-{random}{ext}`
pub fn unique_name(original: &str, policy: UploadPolicy) -> Result<String> {
    let name = basename(original);
    let ext = extension(name);
    let base = sanitize_base(&name[..name.len() - ext.len()], policy.as_str())?;
    let ext: String = ext
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    Ok(format!(
        "{}-{}-{}{}",
        base,
        chrono::Utc::now().timestamp_millis(),
        suffix,
        ext
    ))
}

/// Writes uploads beneath a root directory served at `public_prefix`
#[derive(Debug, Clone)]
pub struct LocalUploadStore {
    root: PathBuf,
    public_prefix: String,
    max_media_bytes: usize,
    max_profile_bytes: usize,
}

impl LocalUploadStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            root: config.dir.clone(),
            public_prefix: config.public_prefix.trim_end_matches('/').to_string(),
            max_media_bytes: config.max_media_bytes,
            max_profile_bytes: config.max_profile_bytes,
        }
    }

    pub fn limit_for(&self, policy: UploadPolicy) -> usize {
        match policy {
            UploadPolicy::Media => self.max_media_bytes,
            UploadPolicy::Profile => self.max_profile_bytes,
        }
    }

    /// Create the root and profile directories if missing
    pub async fn ensure_dirs(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.root.join(PROFILE_DIR)).await?;
        Ok(())
    }

    /// Validate and persist one file
    pub async fn store(
        &self,
        policy: UploadPolicy,
        original_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredUpload> {
        policy.check_type(original_name, content_type)?;

        let limit = self.limit_for(policy);
        if bytes.len() > limit {
            return Err(AppError::PayloadTooLarge {
                size: bytes.len(),
                limit,
            });
        }
        if bytes.is_empty() {
            return Err(AppError::validation("file", "Uploaded file is empty"));
        }

        let filename = unique_name(original_name, policy)?;
        let (dir, relative) = match policy.subdir() {
            Some(sub) => (self.root.join(sub), format!("{}/{}", sub, filename)),
            None => (self.root.clone(), filename.clone()),
        };
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&filename), bytes).await?;

        let sha256 = hex::encode(Sha256::digest(bytes));
        record_upload(policy.as_str());
        info!(filename = %relative, size = bytes.len(), kind = policy.as_str(), "Stored upload");

        Ok(StoredUpload {
            url: format!("{}/{}", self.public_prefix, relative),
            filename,
            size: bytes.len(),
            sha256,
        })
    }

    /// Remove a previously stored file by its public URL. Failures are logged only.
    pub async fn remove(&self, url: &str) {
        let Some(relative) = url
            .strip_prefix(&self.public_prefix)
            .map(|r| r.trim_start_matches('/'))
            .filter(|r| !r.is_empty() && !r.split('/').any(|part| part == ".."))
        else {
            debug!(url, "Not a local upload, skipping removal");
            return;
        };

        if let Err(e) = tokio::fs::remove_file(self.root.join(relative)).await {
            warn!(url, error = %e, "Failed to remove old upload");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &std::path::Path) -> LocalUploadStore {
        LocalUploadStore::new(&UploadConfig {
            dir: dir.to_path_buf(),
            public_prefix: "/uploads/".to_string(),
            max_media_bytes: 16,
            max_profile_bytes: 8,
        })
    }

    fn temp_root(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "newsroom-uploads-{}-{}",
            name,
            rand::thread_rng().gen::<u32>()
        ))
    }

    #[test]
    fn test_sanitize_base() {
        assert_eq!(sanitize_base("My Photo (1)", "media").unwrap(), "MyPhoto1");
        assert_eq!(sanitize_base("ünïcødé", "media").unwrap(), "ncd");
        assert_eq!(sanitize_base("!!!", "profile").unwrap(), "profile");
        assert_eq!(sanitize_base(&"a".repeat(60), "media").unwrap().len(), 40);
    }

    #[test]
    fn test_filename_pattern_compiled_once() {
        let first = unsafe_chars().unwrap() as *const regex_lite::Regex;
        let second = unsafe_chars().unwrap() as *const regex_lite::Regex;
        assert_eq!(first, second);
    }

    #[test]
    fn test_unique_name_shape() {
        let name = unique_name("../Summer Trip.JPG", UploadPolicy::Media).unwrap();
        assert!(name.starts_with("SummerTrip-"));
        assert!(name.ends_with(".jpg"));
        assert_ne!(name, unique_name("../Summer Trip.JPG", UploadPolicy::Media).unwrap());

        let hidden = unique_name(".bashrc", UploadPolicy::Profile).unwrap();
        assert!(hidden.starts_with("bashrc-"));
    }

    #[test]
    fn test_policy_types() {
        assert!(UploadPolicy::Media.check_type("a.mp4", "video/mp4").is_ok());
        assert!(UploadPolicy::Media.check_type("a.png", "image/png").is_ok());
        assert!(UploadPolicy::Media.check_type("a.pdf", "application/pdf").is_err());

        assert!(UploadPolicy::Profile.check_type("me.PNG", "image/png").is_ok());
        assert!(UploadPolicy::Profile.check_type("me.webp", "image/webp").is_err());
        assert!(UploadPolicy::Profile.check_type("me.png", "video/mp4").is_err());
    }

    #[tokio::test]
    async fn test_store_and_remove() {
        let root = temp_root("store");
        let store = store_in(&root);

        let saved = store
            .store(UploadPolicy::Profile, "me.png", "image/png", b"png!")
            .await
            .unwrap();
        assert!(saved.url.starts_with("/uploads/profiles/me-"));
        assert_eq!(saved.size, 4);
        assert_eq!(saved.sha256.len(), 64);

        let path = root.join("profiles").join(&saved.filename);
        assert!(path.exists());

        store.remove(&saved.url).await;
        assert!(!path.exists());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn test_store_enforces_limits() {
        let root = temp_root("limits");
        let store = store_in(&root);

        let err = store
            .store(UploadPolicy::Profile, "me.png", "image/png", &[0u8; 9])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge { size: 9, limit: 8 }));

        let err = store
            .store(UploadPolicy::Media, "doc.txt", "text/plain", b"hi")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMediaType { .. }));

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
