//! Media Backup Library
//!
//! Mirrors a remote photo library into local directories: authenticates with
//! OAuth, pages through the media catalog, and downloads every item not yet
//! recorded in a local dedup store, throttled and in parallel.
//!
//! # Architecture
//!
//! - [`auth`] - Token artifact, refresh and interactive sign-in
//! - [`catalog`] - Paginated media listing client
//! - [`db`] - SQLite connection and schema management
//! - [`store`] - Dedup store of downloaded item ids
//! - [`download`] - Filename resolution, single-item worker, worker pool
//! - [`dispatch`] - Throttled paginate, filter, submit loop
//! - [`config`] - Run presets and resolved settings

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod download;
pub mod http;
pub mod store;

// Re-export commonly used types
pub use auth::{AuthError, Credential, CredentialProvider, OAuthClient};
pub use catalog::{CatalogClient, MediaItem, MediaKind, RemoteError};
pub use config::{BackupConfig, Variant};
pub use db::{Database, DatabaseOptions};
pub use dispatch::{DispatchError, Dispatcher, RunSummary, ThrottleLimits};
pub use download::{
    DownloadError, DownloadOutcome, DownloadWorker, FailurePolicy, MediaScope, OutputDirs,
    WorkerPool,
};
pub use store::{DownloadedItems, StorageError};
