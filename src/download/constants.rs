//! Constants for the download module (directories, rendition suffix, pool size).

/// Default output directory for photos.
pub const DEFAULT_PHOTO_DIR: &str = "downloaded_photos";

/// Default output directory for videos.
pub const DEFAULT_VIDEO_DIR: &str = "downloaded_videos";

/// `baseUrl` suffix requesting the original-resolution bytes.
pub const FULL_RESOLUTION_SUFFIX: &str = "=d";

/// Worker count of the all-media preset.
pub const ALL_MEDIA_WORKERS: usize = 5;

/// Worker count of the videos-only preset.
pub const VIDEOS_ONLY_WORKERS: usize = 2;

/// Upper bound accepted for the worker pool size.
pub const MAX_WORKERS: usize = 64;
