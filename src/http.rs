//! Shared HTTP client construction for catalog, token and download traffic.

use std::time::Duration;

use reqwest::Client;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// User-Agent sent with every request (identifies the tool and version).
#[must_use]
pub fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("media-backup/{version}")
}

/// Builds the client shared by every component.
///
/// Only the connect phase is bounded; transfers of large videos are allowed to
/// take as long as they take.
///
/// # Errors
///
/// Returns the builder error if TLS or proxy initialisation fails.
pub fn build_http_client(connect_timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .gzip(true)
        .user_agent(default_user_agent())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_contains_crate_version() {
        let ua = default_user_agent();
        assert_eq!(
            ua.strip_prefix("media-backup/"),
            Some(env!("CARGO_PKG_VERSION"))
        );
    }

    #[test]
    fn test_build_http_client_succeeds() {
        assert!(build_http_client(CONNECT_TIMEOUT_SECS).is_ok());
    }
}
