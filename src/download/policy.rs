//! Which items get downloaded and what happens when one fails.

use std::fmt;
use std::str::FromStr;

use crate::catalog::MediaKind;

/// Which media kinds a run downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaScope {
    /// Photos and videos, each to its own directory.
    #[default]
    All,
    /// Videos only; photos are discarded.
    VideosOnly,
}

impl MediaScope {
    /// Whether an item of `kind` is downloaded under this scope.
    #[must_use]
    pub fn admits(self, kind: MediaKind) -> bool {
        match self {
            Self::All => true,
            Self::VideosOnly => kind == MediaKind::Video,
        }
    }
}

/// What a worker does with an item whose download failed.
///
/// In both cases the item stays unrecorded, so a later run picks it up again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Warn, and remove any partially written file.
    #[default]
    RetryLater,
    /// Log at debug level only and leave the filesystem as it is.
    DropSilently,
}

impl FailurePolicy {
    /// Stable snake_case label (matches config file values).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RetryLater => "retry_later",
            Self::DropSilently => "drop_silently",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown failure policy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown failure policy '{0}': expected retry_later or drop_silently")]
pub struct UnknownFailurePolicy(pub String);

impl FromStr for FailurePolicy {
    type Err = UnknownFailurePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "retry_later" | "retrylater" => Ok(Self::RetryLater),
            "drop_silently" | "dropsilently" => Ok(Self::DropSilently),
            _ => Err(UnknownFailurePolicy(s.to_string())),
        }
    }
}
