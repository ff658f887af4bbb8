//! Resolved run settings and the two built-in presets.

use std::path::PathBuf;

use crate::auth::{DEFAULT_CLIENT_SECRETS_FILE, DEFAULT_TOKEN_FILE};
use crate::catalog::{DEFAULT_API_BASE_URL, DEFAULT_PAGE_SIZE};
use crate::db::DatabaseOptions;
use crate::dispatch::ThrottleLimits;
use crate::download::{
    ALL_MEDIA_WORKERS, DEFAULT_PHOTO_DIR, DEFAULT_VIDEO_DIR, FULL_RESOLUTION_SUFFIX,
    FailurePolicy, MediaScope, OutputDirs, VIDEOS_ONLY_WORKERS,
};

/// Default database file name.
pub const DEFAULT_DATABASE_FILE: &str = "media_downloads.db";

/// Built-in run preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// Photos and videos, full-resolution URLs, five workers.
    #[default]
    AllMedia,
    /// Videos only, unmodified URLs, two workers.
    VideosOnly,
}

impl Variant {
    #[must_use]
    pub fn scope(self) -> MediaScope {
        match self {
            Self::AllMedia => MediaScope::All,
            Self::VideosOnly => MediaScope::VideosOnly,
        }
    }

    #[must_use]
    pub fn default_workers(self) -> usize {
        match self {
            Self::AllMedia => ALL_MEDIA_WORKERS,
            Self::VideosOnly => VIDEOS_ONLY_WORKERS,
        }
    }

    /// Suffix appended to download URLs.
    #[must_use]
    pub fn url_suffix(self) -> Option<&'static str> {
        match self {
            Self::AllMedia => Some(FULL_RESOLUTION_SUFFIX),
            Self::VideosOnly => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllMedia => "all_media",
            Self::VideosOnly => "videos_only",
        }
    }
}

/// Every setting a backup run needs, after defaults, file and flags are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    pub variant: Variant,
    pub photo_dir: PathBuf,
    pub video_dir: PathBuf,
    pub database: PathBuf,
    pub client_secrets: PathBuf,
    pub token_file: PathBuf,
    pub api_base_url: String,
    pub workers: usize,
    pub page_size: u32,
    pub limits: ThrottleLimits,
    pub failure_policy: FailurePolicy,
    pub count_archived_toward_cap: bool,
    pub db: DatabaseOptions,
}

impl BackupConfig {
    /// Defaults of `variant`.
    #[must_use]
    pub fn for_variant(variant: Variant) -> Self {
        Self {
            variant,
            photo_dir: PathBuf::from(DEFAULT_PHOTO_DIR),
            video_dir: PathBuf::from(DEFAULT_VIDEO_DIR),
            database: PathBuf::from(DEFAULT_DATABASE_FILE),
            client_secrets: PathBuf::from(DEFAULT_CLIENT_SECRETS_FILE),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            workers: variant.default_workers(),
            page_size: DEFAULT_PAGE_SIZE,
            limits: ThrottleLimits::default(),
            failure_policy: FailurePolicy::default(),
            count_archived_toward_cap: false,
            db: DatabaseOptions::default(),
        }
    }

    #[must_use]
    pub fn scope(&self) -> MediaScope {
        self.variant.scope()
    }

    #[must_use]
    pub fn output_dirs(&self) -> OutputDirs {
        OutputDirs::new(self.photo_dir.clone(), self.video_dir.clone())
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self::for_variant(Variant::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_media_defaults() {
        let config = BackupConfig::default();
        assert_eq!(config.variant, Variant::AllMedia);
        assert_eq!(config.workers, 5);
        assert_eq!(config.scope(), MediaScope::All);
        assert_eq!(config.variant.url_suffix(), Some("=d"));
        assert_eq!(config.database, PathBuf::from("media_downloads.db"));
        assert_eq!(config.limits.per_window, 1000);
        assert_eq!(config.limits.daily_cap, 10_000);
        assert!(!config.count_archived_toward_cap);
    }

    #[test]
    fn test_videos_only_defaults() {
        let config = BackupConfig::for_variant(Variant::VideosOnly);
        assert_eq!(config.workers, 2);
        assert_eq!(config.scope(), MediaScope::VideosOnly);
        assert_eq!(config.variant.url_suffix(), None);
        assert_eq!(config.failure_policy, FailurePolicy::RetryLater);
    }

    #[test]
    fn test_output_dirs_follow_config() {
        let mut config = BackupConfig::default();
        config.photo_dir = PathBuf::from("/backup/p");
        let dirs = config.output_dirs();
        assert_eq!(dirs.photos, PathBuf::from("/backup/p"));
        assert_eq!(dirs.videos, PathBuf::from("downloaded_videos"));
    }
}
