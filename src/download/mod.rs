//! Streaming media downloads into per-kind output directories.
//!
//! # Features
//!
//! - Streaming writes (memory-efficient for large videos)
//! - Collision-free filenames (`name_1.ext`, `name_2.ext`, ...)
//! - Bounded worker pool with non-blocking submission
//! - Configurable handling of failed items
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use media_backup::db::Database;
//! use media_backup::download::{DownloadWorker, OutputDirs, WorkerPool};
//! use media_backup::store::DownloadedItems;
//!
//! # async fn example(item: media_backup::catalog::MediaItem) -> Result<(), Box<dyn std::error::Error>> {
//! let store = DownloadedItems::new(Database::new_in_memory().await?);
//! let worker = DownloadWorker::new(
//!     reqwest::Client::new(),
//!     store,
//!     OutputDirs::new("downloaded_photos", "downloaded_videos"),
//! );
//! let pool = WorkerPool::new(5, Arc::new(worker));
//! let outcome = pool.submit(item).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod constants;
mod error;
mod filename;
mod policy;
mod pool;
mod worker;

pub use constants::{
    ALL_MEDIA_WORKERS, DEFAULT_PHOTO_DIR, DEFAULT_VIDEO_DIR, FULL_RESOLUTION_SUFFIX, MAX_WORKERS,
    VIDEOS_ONLY_WORKERS,
};
pub use error::DownloadError;
pub use filename::{create_unique_file, resolve_unique_path};
pub use policy::{FailurePolicy, MediaScope, UnknownFailurePolicy};
pub use pool::WorkerPool;
pub use worker::{DownloadOutcome, DownloadWorker, OutputDirs};
