/// Direct-upload endpoint used when the file input does not carry one.
pub const DEFAULT_DIRECT_UPLOAD_PATH: &str = "/rails/active_storage/direct_uploads";

/// Hidden form field the listing form reads attachment references from.
pub const DEFAULT_ATTACHMENT_FIELD: &str = "listing[images][]";

pub const DEFAULT_APP_URL: &str = "http://localhost:3000";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Image thumbnails larger than this are not inlined as data URLs.
pub const DEFAULT_PREVIEW_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Chunk size used when streaming in-memory file bodies.
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;
