//! Throttled dispatch of catalog items to the download pool.
//!
//! One control loop pages through the catalog, drops items that are already
//! stored, and submits the rest to a [`WorkerPool`](crate::download::WorkerPool).
//! Submission is rate-limited per window and capped per run; the loop never
//! waits on individual downloads, only on all of them at the end.
//!
//! # Example
//!
//! ```ignore
//! let summary = Dispatcher::new(catalog, store, pool)
//!     .with_scope(MediaScope::VideosOnly)
//!     .run()
//!     .await?;
//! println!("{} downloaded, {} failed", summary.downloaded, summary.failed);
//! ```

mod dispatcher;
mod error;
mod throttle;

pub use dispatcher::{Dispatcher, RunSummary};
pub use error::DispatchError;
pub use throttle::{
    DAY, DEFAULT_DAILY_CAP, DEFAULT_PER_WINDOW, DEFAULT_WINDOW, ThrottleAction, ThrottleLimits,
    ThrottleState,
};
