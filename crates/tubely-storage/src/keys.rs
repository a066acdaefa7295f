//! Shared object key generation for storage backends.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use std::fmt::{Display, Formatter, Result as FmtResult};
use tubely_core::constants::THUMBNAIL_KEY_PREFIX;
use tubely_core::Orientation;

const RANDOM_KEY_BYTES: usize = 32;

/// A write-once object key: `{prefix}/{random}.{ext}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Fresh key for a published video, prefixed by its orientation.
    pub fn for_video(orientation: Orientation, media_type: &str) -> Self {
        Self::generate(orientation.as_str(), media_type)
    }

    /// Fresh key for a published thumbnail.
    pub fn for_thumbnail(media_type: &str) -> Self {
        Self::generate(THUMBNAIL_KEY_PREFIX, media_type)
    }

    pub fn generate(prefix: &str, media_type: &str) -> Self {
        let bytes: [u8; RANDOM_KEY_BYTES] = rand::random();
        let name = URL_SAFE_NO_PAD.encode(bytes);
        ObjectKey(format!("{}/{}.{}", prefix, name, extension_for(media_type)))
    }

    /// Wrap an existing key, e.g. when re-publishing to the same location.
    pub fn from_existing(key: impl Into<String>) -> Self {
        ObjectKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading path segment (`landscape`, `thumbnails`...).
    pub fn prefix(&self) -> &str {
        self.0.split('/').next().unwrap_or_default()
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// `video/mp4` -> `mp4`, `image/png; q=1` -> `png`. Falls back to `bin`.
fn extension_for(media_type: &str) -> String {
    let essence = media_type.split(';').next().unwrap_or_default().trim();
    match essence.split_once('/') {
        Some((_, subtype)) if !subtype.is_empty() => subtype.to_ascii_lowercase(),
        _ => "bin".to_string(),
    }
}
