//! Paginated client for the media item listing endpoint.

use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use super::error::RemoteError;
use super::item::Page;

/// Production API root of the photo library service.
pub const DEFAULT_API_BASE_URL: &str = "https://photoslibrary.googleapis.com/v1";

/// Items requested per page (the API maximum).
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Client for `GET {base}/mediaItems`.
///
/// Holds the bearer token it was built with; a token that expires mid-scan
/// surfaces as a 401 [`RemoteError::Status`].
#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    base_url: String,
    page_size: u32,
    access_token: String,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Creates a client against `base_url` (e.g. [`DEFAULT_API_BASE_URL`]).
    #[must_use]
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        page_size: u32,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            page_size: page_size.max(1),
            access_token: access_token.into(),
        }
    }

    /// Builds the request URL for one page.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidUrl`] if the base URL does not parse.
    pub fn page_url(&self, cursor: Option<&str>) -> Result<Url, RemoteError> {
        let raw = format!("{}/mediaItems", self.base_url.trim_end_matches('/'));
        let mut url = Url::parse(&raw).map_err(|_| RemoteError::InvalidUrl { url: raw.clone() })?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", &self.page_size.to_string());
            if let Some(token) = cursor.filter(|t| !t.is_empty()) {
                query.append_pair("pageToken", token);
            }
        }
        Ok(url)
    }

    /// Fetches one page of the listing.
    ///
    /// `cursor` is the previous page's `nextPageToken`, or `None` for the first
    /// page. The returned page's token is `None` on the final page.
    ///
    /// # Errors
    ///
    /// - [`RemoteError::Status`] for any non-2xx response
    /// - [`RemoteError::Network`] for transport failures
    /// - [`RemoteError::Decode`] if the body is not a listing response
    #[instrument(skip(self), fields(has_cursor = cursor.is_some()))]
    pub async fn list_page(&self, cursor: Option<&str>) -> Result<Page, RemoteError> {
        let url = self.page_url(cursor)?;
        let url_str = url.to_string();

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|source| RemoteError::Network {
                url: url_str.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                url: url_str,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| RemoteError::Network {
                url: url_str.clone(),
                source,
            })?;
        let page: Page =
            serde_json::from_slice(&body).map_err(|source| RemoteError::Decode {
                url: url_str,
                source,
            })?;

        debug!(
            items = page.items.len(),
            last = page.is_last(),
            "fetched catalog page"
        );
        Ok(page)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> CatalogClient {
        CatalogClient::new(Client::new(), base, DEFAULT_PAGE_SIZE, "token")
    }

    #[test]
    fn test_page_url_first_page_has_only_page_size() {
        let url = client(DEFAULT_API_BASE_URL).page_url(None).unwrap();
        assert_eq!(
            url.as_str(),
            "https://photoslibrary.googleapis.com/v1/mediaItems?pageSize=100"
        );
    }

    #[test]
    fn test_page_url_appends_page_token() {
        let url = client("https://api.example.com/v1/")
            .page_url(Some("CkQ=abc"))
            .unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("pageSize".to_string(), "100".to_string()),
                ("pageToken".to_string(), "CkQ=abc".to_string()),
            ]
        );
        assert_eq!(url.path(), "/v1/mediaItems");
    }

    #[test]
    fn test_page_url_ignores_empty_cursor() {
        let url = client(DEFAULT_API_BASE_URL).page_url(Some("")).unwrap();
        assert!(!url.as_str().contains("pageToken"));
    }

    #[test]
    fn test_page_url_invalid_base_is_error() {
        let err = client("not a url").page_url(None).unwrap_err();
        assert!(matches!(err, RemoteError::InvalidUrl { .. }));
    }

    #[test]
    fn test_debug_omits_access_token() {
        let c = CatalogClient::new(Client::new(), DEFAULT_API_BASE_URL, 100, "ya29.secret");
        let debug = format!("{c:?}");
        assert!(!debug.contains("ya29.secret"), "{debug}");
        assert!(debug.contains("photoslibrary"));
    }

    #[test]
    fn test_page_size_zero_is_clamped() {
        let c = CatalogClient::new(Client::new(), DEFAULT_API_BASE_URL, 0, "t");
        let url = c.page_url(None).unwrap();
        assert!(url.as_str().ends_with("pageSize=1"));
    }
}
