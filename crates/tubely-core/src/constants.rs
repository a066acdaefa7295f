//! Upload limits and media type allow-lists.

/// One mebibyte.
pub const MIB: u64 = 1 << 20;

/// Default cap for thumbnail uploads (10 MiB).
pub const MAX_THUMBNAIL_SIZE_BYTES: u64 = 10 * MIB;

/// Default cap for video uploads (1 GiB).
pub const MAX_VIDEO_SIZE_BYTES: u64 = 1024 * MIB;

/// Slack added to the request body limit on top of the file cap, so the
/// multipart framing never trips the limit before the file bytes do.
pub const MULTIPART_OVERHEAD_BYTES: u64 = MIB;

/// Only MP4 containers can be made fast-start by a stream copy.
pub const VIDEO_ALLOWED_CONTENT_TYPES: &[&str] = &["video/mp4"];

pub const THUMBNAIL_ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// Multipart field carrying the video bytes.
pub const VIDEO_FORM_FIELD: &str = "video";

/// Multipart field carrying the thumbnail bytes.
pub const THUMBNAIL_FORM_FIELD: &str = "thumbnail";

/// Object key prefix for thumbnails.
pub const THUMBNAIL_KEY_PREFIX: &str = "thumbnails";

/// JWT issuer accepted for access tokens.
pub const JWT_ISSUER: &str = "tubely-access";
