//! Media item records as returned by the library listing endpoint.

use serde::Deserialize;

/// One entry of the remote media catalog.
///
/// Only the fields the downloader needs are kept; everything else in the
/// response (metadata, contributor info, ...) is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Stable unique identifier.
    pub id: String,
    /// Original filename as uploaded.
    pub filename: String,
    /// MIME type, used only to tell photos from videos.
    #[serde(default)]
    pub mime_type: String,
    /// Short-lived signed download locator.
    pub base_url: String,
}

impl MediaItem {
    /// Photo or video, derived from the MIME type.
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime_type(&self.mime_type)
    }
}

/// Coarse media classification that decides the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// Anything whose MIME type mentions `video` is a video; everything else
    /// (including an empty MIME type) is treated as a photo.
    #[must_use]
    pub fn from_mime_type(mime_type: &str) -> Self {
        if mime_type.to_ascii_lowercase().contains("video") {
            Self::Video
        } else {
            Self::Photo
        }
    }

    /// Stable lowercase label for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
        }
    }
}

/// One page of the catalog listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Items on this page. Missing in the response means an empty page.
    #[serde(default, rename = "mediaItems")]
    pub items: Vec<MediaItem>,
    /// Cursor for the next page; `None` on the last page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl Page {
    /// Whether this is the final page of the listing.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.next_page_token.as_deref().is_none_or(str::is_empty)
    }
}
