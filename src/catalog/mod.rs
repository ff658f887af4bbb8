//! Remote media catalog: listing records and the paginated client.
//!
//! # Example
//!
//! ```no_run
//! use media_backup::catalog::{CatalogClient, DEFAULT_API_BASE_URL, DEFAULT_PAGE_SIZE};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CatalogClient::new(reqwest::Client::new(), DEFAULT_API_BASE_URL, DEFAULT_PAGE_SIZE, "ya29...");
//! let mut cursor: Option<String> = None;
//! loop {
//!     let page = client.list_page(cursor.as_deref()).await?;
//!     for item in &page.items {
//!         println!("{} {}", item.id, item.filename);
//!     }
//!     match page.next_page_token {
//!         Some(next) if !next.is_empty() => cursor = Some(next),
//!         _ => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod item;

pub use client::{CatalogClient, DEFAULT_API_BASE_URL, DEFAULT_PAGE_SIZE};
pub use error::RemoteError;
pub use item::{MediaItem, MediaKind, Page};
