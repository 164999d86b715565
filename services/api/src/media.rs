//! Inline media payloads
//!
//! Image and audio fields arrive as base64 data URLs
//! (`data:image/png;base64,...`). They are decoded here and written below the
//! media root; the database only stores the path relative to that root.

use base64::{Engine, engine::general_purpose::STANDARD};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;

/// URL prefix the media root is served under
pub const MEDIA_URL: &str = "/media/";

/// Room left in a request body for the fields around its uploads
const BODY_HEADROOM: usize = 64 * 1024;

/// Sub-directories uploads are grouped in
pub const POST_IMAGES: &str = "posts/images";
pub const POST_AUDIOS: &str = "posts/audios";
pub const BAND_POSTERS: &str = "bands/posters";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    fn mime_prefix(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
        }
    }

    /// Map a MIME subtype to the stored file extension
    fn extension_for(self, subtype: &str) -> Option<&'static str> {
        match (self, subtype.to_ascii_lowercase().as_str()) {
            (MediaKind::Image, "png") => Some("png"),
            (MediaKind::Image, "jpeg" | "jpg") => Some("jpg"),
            (MediaKind::Image, "gif") => Some("gif"),
            (MediaKind::Image, "webp") => Some("webp"),
            (MediaKind::Audio, "mpeg" | "mp3") => Some("mp3"),
            (MediaKind::Audio, "wav" | "x-wav" | "wave") => Some("wav"),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("Upload a valid {0}: expected a base64 data URL")]
    NotADataUrl(&'static str),

    #[error("Unsupported {kind} type: {subtype}")]
    UnsupportedType { kind: &'static str, subtype: String },

    #[error("The submitted {0} is not valid base64")]
    InvalidBase64(&'static str),

    #[error("The submitted {0} is empty")]
    Empty(&'static str),

    #[error("The submitted file is larger than {0} bytes")]
    TooLarge(usize),
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

/// A decoded upload, not yet written anywhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMedia {
    pub kind: MediaKind,
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

/// Decode a `data:<kind>/<subtype>;base64,<payload>` string
pub fn decode_data_url(
    kind: MediaKind,
    value: &str,
    max_bytes: usize,
) -> Result<DecodedMedia, MediaError> {
    let name = kind.mime_prefix();

    let rest = value
        .strip_prefix("data:")
        .ok_or(MediaError::NotADataUrl(name))?;
    let (header, payload) = rest
        .split_once(";base64,")
        .ok_or(MediaError::NotADataUrl(name))?;
    let (prefix, subtype) = header
        .split_once('/')
        .ok_or(MediaError::NotADataUrl(name))?;

    if prefix != name {
        return Err(MediaError::NotADataUrl(name));
    }

    let extension = kind
        .extension_for(subtype)
        .ok_or_else(|| MediaError::UnsupportedType {
            kind: name,
            subtype: subtype.to_string(),
        })?;

    // Reject before decoding; base64 grows data by 4/3
    if payload.len() / 4 * 3 > max_bytes + 3 {
        return Err(MediaError::TooLarge(max_bytes));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| MediaError::InvalidBase64(name))?;

    if bytes.is_empty() {
        return Err(MediaError::Empty(name));
    }
    if bytes.len() > max_bytes {
        return Err(MediaError::TooLarge(max_bytes));
    }

    Ok(DecodedMedia {
        kind,
        extension,
        bytes,
    })
}

/// Public URL of a stored relative path
pub fn url_for(path: Option<String>) -> Option<String> {
    path.map(|p| format!("{}{}", MEDIA_URL, p))
}

/// Filesystem-backed media storage
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    max_upload_bytes: usize,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, max_upload_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_upload_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Largest request body: an image and an audio of the maximum size,
    /// base64 encoded, plus the rest of the JSON
    pub fn body_limit(&self) -> usize {
        let encoded = self.max_upload_bytes.div_ceil(3) * 4;
        encoded * 2 + BODY_HEADROOM
    }

    /// Decode an optional data URL field
    pub fn decode(
        &self,
        kind: MediaKind,
        value: Option<&str>,
    ) -> Result<Option<DecodedMedia>, MediaError> {
        value
            .map(|v| decode_data_url(kind, v, self.max_upload_bytes))
            .transpose()
    }

    /// Write a decoded upload into `folder`, returning its relative path
    pub async fn save(&self, folder: &str, media: &DecodedMedia) -> Result<String, ApiError> {
        let relative = format!("{}/{}.{}", folder, Uuid::new_v4(), media.extension);
        let full = self.root.join(&relative);

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                tracing::error!("Failed to create media directory {:?}: {}", parent, e);
                ApiError::InternalServerError
            })?;
        }

        tokio::fs::write(&full, &media.bytes).await.map_err(|e| {
            tracing::error!("Failed to write media file {:?}: {}", full, e);
            ApiError::InternalServerError
        })?;

        info!("Stored {} bytes of media at {}", media.bytes.len(), relative);
        Ok(relative)
    }

    /// Decode and store an optional field in one step
    pub async fn store(
        &self,
        kind: MediaKind,
        folder: &str,
        value: Option<&str>,
    ) -> Result<Option<String>, ApiError> {
        match self.decode(kind, value)? {
            Some(media) => Ok(Some(self.save(folder, &media).await?)),
            None => Ok(None),
        }
    }

    /// Best-effort removal of previously stored files
    pub async fn discard(&self, paths: &[Option<String>]) {
        for relative in paths.iter().flatten() {
            if !is_contained(relative) {
                continue;
            }
            if let Err(e) = tokio::fs::remove_file(self.root.join(relative)).await {
                warn!("Failed to remove media file {}: {}", relative, e);
            }
        }
    }
}

/// Relative paths produced by `save` never escape the root
fn is_contained(relative: &str) -> bool {
    Path::new(relative)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_URL: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn test_decode_image_data_url() {
        let media = decode_data_url(MediaKind::Image, PNG_URL, 1024).unwrap();
        assert_eq!(media.extension, "png");
        assert_eq!(media.bytes, b"\x89PNG\r\n\x1a\n".to_vec());
    }

    #[test]
    fn test_decode_audio_subtypes() {
        let mp3 = decode_data_url(MediaKind::Audio, "data:audio/mpeg;base64,SUQz", 1024).unwrap();
        assert_eq!(mp3.extension, "mp3");
        assert_eq!(mp3.bytes, b"ID3".to_vec());

        let wav = decode_data_url(MediaKind::Audio, "data:audio/x-wav;base64,UklGRg==", 1024)
            .unwrap();
        assert_eq!(wav.extension, "wav");
    }

    #[test]
    fn test_rejects_wrong_kind_and_type() {
        assert_eq!(
            decode_data_url(MediaKind::Audio, PNG_URL, 1024),
            Err(MediaError::NotADataUrl("audio"))
        );
        assert_eq!(
            decode_data_url(MediaKind::Audio, "data:audio/ogg;base64,T2dnUw==", 1024),
            Err(MediaError::UnsupportedType {
                kind: "audio",
                subtype: "ogg".to_string()
            })
        );
        assert_eq!(
            decode_data_url(MediaKind::Image, "https://example.com/a.png", 1024),
            Err(MediaError::NotADataUrl("image"))
        );
    }

    #[test]
    fn test_rejects_bad_payloads() {
        assert_eq!(
            decode_data_url(MediaKind::Image, "data:image/png;base64,!!!", 1024),
            Err(MediaError::InvalidBase64("image"))
        );
        assert_eq!(
            decode_data_url(MediaKind::Image, "data:image/png;base64,", 1024),
            Err(MediaError::Empty("image"))
        );
        assert_eq!(
            decode_data_url(MediaKind::Image, PNG_URL, 4),
            Err(MediaError::TooLarge(4))
        );
    }

    #[test]
    fn test_url_for_prefixes_paths() {
        assert_eq!(
            url_for(Some("posts/images/a.png".to_string())),
            Some("/media/posts/images/a.png".to_string())
        );
        assert_eq!(url_for(None), None);
    }

    #[test]
    fn test_contained_paths() {
        assert!(is_contained("posts/images/a.png"));
        assert!(!is_contained("../etc/passwd"));
        assert!(!is_contained("/etc/passwd"));
    }

    #[test]
    fn test_body_limit_fits_two_encoded_uploads() {
        let max = 3 * 1024 * 1024;
        let store = MediaStore::new("media", max);
        let image = format!("data:image/png;base64,{}", "A".repeat(max / 3 * 4));

        assert!(decode_data_url(MediaKind::Image, &image, max).is_ok());
        assert!(store.body_limit() > 2 * image.len());
        assert!(store.body_limit() > 2 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_store_and_discard_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path(), 1024);

        let path = store
            .store(MediaKind::Image, POST_IMAGES, Some(PNG_URL))
            .await
            .unwrap()
            .unwrap();
        assert!(path.starts_with("posts/images/"));
        assert!(path.ends_with(".png"));
        assert!(dir.path().join(&path).exists());

        store.discard(&[Some(path.clone())]).await;
        assert!(!dir.path().join(&path).exists());
    }

    #[tokio::test]
    async fn test_store_without_value_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path(), 1024);

        assert_eq!(store.store(MediaKind::Audio, POST_AUDIOS, None).await.unwrap(), None);
    }
}
