//! Shopify REST Admin API client.
//!
//! # Architecture
//!
//! - One tenant credential per call; the client itself holds no tenant state
//! - Cursor pagination via the `Link` response header (`page_info`)
//! - Items are returned as raw JSON so a single malformed record can be
//!   skipped by the caller instead of failing the whole page
//! - No internal retry: a failed page aborts the caller's sync run
//!
//! # Example
//!
//! ```rust,ignore
//! use shop_insights_ingest::shopify::{PageSource, ShopifyClient};
//!
//! let client = ShopifyClient::new(&config.shopify)?;
//! let page = client.fetch_page(&credential, ResourceType::Orders, None).await?;
//! ```

mod client;
#[cfg(any(test, feature = "testing"))]
mod scripted;
pub mod types;

pub use client::{Cursor, Page, PageSource, ShopifyClient, parse_next_page_info};
#[cfg(any(test, feature = "testing"))]
pub use scripted::ScriptedSource;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when talking to the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed (connect, timeout, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Access token invalid or revoked.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Access token lacks the scopes for this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("Shopify returned {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response was well-formed JSON but not the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ShopifyError {
    /// Whether this error means the credential itself is unusable.
    ///
    /// Authentication failures abort a sync outright; there is no point
    /// trying another page or resource with the same token.
    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::Forbidden(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_error() {
        let err = ShopifyError::RateLimited(2);
        assert_eq!(err.to_string(), "Rate limited, retry after 2 seconds");
    }

    #[test]
    fn test_status_error_display() {
        let err = ShopifyError::Status {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "Shopify returned 503: unavailable");
    }

    #[test]
    fn test_authentication_classification() {
        assert!(ShopifyError::Unauthorized("bad token".to_string()).is_authentication());
        assert!(ShopifyError::Forbidden("missing scope".to_string()).is_authentication());
        assert!(!ShopifyError::RateLimited(1).is_authentication());
        assert!(!ShopifyError::InvalidResponse("x".to_string()).is_authentication());
    }
}
