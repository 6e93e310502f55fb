//! Paginated REST client for the Shopify Admin API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LINK, RETRY_AFTER};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use shop_insights_core::ResourceType;

use super::ShopifyError;
use super::types::{ShopInfo, ShopInfoResponse};
use crate::config::ShopifyApiConfig;
use crate::models::StoreCredential;

/// Opaque pagination token (`page_info`) pointing at the next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    #[must_use]
    pub fn new(page_info: impl Into<String>) -> Self {
        Self(page_info.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a resource collection.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Raw items, in the order the platform returned them.
    pub items: Vec<serde_json::Value>,
    /// Cursor of the following page; `None` on the last page.
    pub next_cursor: Option<Cursor>,
}

/// Source of paginated resource data for one tenant's shop.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page of `resource`, starting at `cursor` (first page if `None`).
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Unauthorized` / `Forbidden` if the credential is
    /// rejected, and any other `ShopifyError` for network, status or body
    /// failures.
    async fn fetch_page(
        &self,
        credential: &StoreCredential,
        resource: ResourceType,
        cursor: Option<&Cursor>,
    ) -> Result<Page, ShopifyError>;
}

/// Shopify REST Admin API client.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct ShopifyClient {
    inner: Arc<ShopifyClientInner>,
}

struct ShopifyClientInner {
    client: reqwest::Client,
    api_version: String,
    page_limit: u16,
}

impl ShopifyClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ShopifyApiConfig) -> Result<Self, ShopifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("shop-insights/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ShopifyClientInner {
                client,
                api_version: config.api_version.clone(),
                page_limit: config.page_limit,
            }),
        })
    }

    /// Build the URL of an Admin API endpoint for a shop.
    fn endpoint(&self, credential: &StoreCredential, path: &str) -> Result<Url, ShopifyError> {
        let raw = format!(
            "https://{}/admin/api/{}/{path}",
            credential.shop_domain, self.inner.api_version
        );
        Url::parse(&raw).map_err(|e| ShopifyError::InvalidResponse(format!("bad endpoint {raw}: {e}")))
    }

    /// Build the request URL for one page of a resource.
    ///
    /// Shopify rejects filter parameters alongside `page_info`, so the
    /// resource's default filters are only sent on the first page.
    fn page_url(
        &self,
        credential: &StoreCredential,
        resource: ResourceType,
        cursor: Option<&Cursor>,
    ) -> Result<Url, ShopifyError> {
        let mut url = self.endpoint(credential, &format!("{}.json", resource.as_str()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &self.inner.page_limit.to_string());
            match cursor {
                Some(cursor) => {
                    query.append_pair("page_info", cursor.as_str());
                }
                None => {
                    for (key, value) in resource.default_query() {
                        query.append_pair(key, value);
                    }
                }
            }
        }
        Ok(url)
    }

    async fn get(
        &self,
        credential: &StoreCredential,
        url: Url,
    ) -> Result<(HeaderMap, bytes::Bytes), ShopifyError> {
        let response = self
            .inner
            .client
            .get(url)
            .header(
                "X-Shopify-Access-Token",
                credential.access_token.expose_secret(),
            )
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                // REST sends fractional seconds ("2.0")
                .and_then(|s| s.split('.').next())
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(2);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(ShopifyError::Unauthorized(
                "Invalid or revoked access token".to_string(),
            ));
        }

        if status == StatusCode::FORBIDDEN {
            return Err(ShopifyError::Forbidden(
                "Access token lacks the required scopes".to_string(),
            ));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok((headers, body))
    }

    /// Fetch basic shop information; used to check a tenant's credential.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Unauthorized` for an invalid token and
    /// `ShopifyError::Forbidden` for insufficient permissions.
    #[instrument(skip(self, credential), fields(shop_domain = %credential.shop_domain))]
    pub async fn shop_info(&self, credential: &StoreCredential) -> Result<ShopInfo, ShopifyError> {
        let url = self.endpoint(credential, "shop.json")?;
        let (_, body) = self.get(credential, url).await?;
        let response: ShopInfoResponse = serde_json::from_slice(&body)?;
        Ok(response.shop)
    }
}

#[async_trait]
impl PageSource for ShopifyClient {
    #[instrument(
        skip(self, credential, cursor),
        fields(shop_domain = %credential.shop_domain, resource = %resource, first_page = cursor.is_none())
    )]
    async fn fetch_page(
        &self,
        credential: &StoreCredential,
        resource: ResourceType,
        cursor: Option<&Cursor>,
    ) -> Result<Page, ShopifyError> {
        let url = self.page_url(credential, resource, cursor)?;
        let (headers, body) = self.get(credential, url).await?;

        let mut payload: serde_json::Value = serde_json::from_slice(&body)?;
        let items = match payload.get_mut(resource.collection_key()).map(serde_json::Value::take) {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(ShopifyError::InvalidResponse(format!(
                    "missing `{}` array in response",
                    resource.collection_key()
                )));
            }
        };

        let next_cursor = headers
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_page_info)
            .map(Cursor::new);

        tracing::debug!(items = items.len(), has_next = next_cursor.is_some(), "Fetched page");

        Ok(Page { items, next_cursor })
    }
}

/// Extract the `page_info` of the `rel="next"` entry of a `Link` header.
///
/// ```text
/// <https://shop.myshopify.com/admin/api/2024-01/orders.json?limit=250&page_info=abc>; rel="previous",
/// <https://shop.myshopify.com/admin/api/2024-01/orders.json?limit=250&page_info=def>; rel="next"
/// ```
///
/// Returns `None` when there is no next entry (last page) or it carries no
/// `page_info` parameter.
#[must_use]
pub fn parse_next_page_info(link_header: &str) -> Option<String> {
    link_header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });
        if !is_next {
            return None;
        }

        let target = target.strip_prefix('<')?.strip_suffix('>')?;
        let url = Url::parse(target).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "page_info")
            .map(|(_, value)| value.into_owned())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use shop_insights_core::ShopDomain;

    fn credential() -> StoreCredential {
        StoreCredential {
            shop_domain: ShopDomain::parse("acme").unwrap(),
            access_token: SecretString::from("shpat_test"),
        }
    }

    fn client() -> ShopifyClient {
        ShopifyClient::new(&ShopifyApiConfig::default()).unwrap()
    }

    #[test]
    fn test_next_link_among_previous_and_next() {
        let header = concat!(
            r#"<https://acme.myshopify.com/admin/api/2024-01/products.json?limit=250&page_info=prev123>; rel="previous", "#,
            r#"<https://acme.myshopify.com/admin/api/2024-01/products.json?limit=250&page_info=next456>; rel="next""#
        );
        assert_eq!(parse_next_page_info(header).as_deref(), Some("next456"));
    }

    #[test]
    fn test_only_previous_link_is_last_page() {
        let header = r#"<https://acme.myshopify.com/admin/api/2024-01/products.json?page_info=prev123>; rel="previous""#;
        assert_eq!(parse_next_page_info(header), None);
    }

    #[test]
    fn test_empty_or_malformed_link() {
        assert_eq!(parse_next_page_info(""), None);
        assert_eq!(parse_next_page_info(r#"not-a-url; rel="next""#), None);
        assert_eq!(
            parse_next_page_info(r#"<https://acme.myshopify.com/x.json?limit=5>; rel="next""#),
            None
        );
    }

    #[test]
    fn test_first_order_page_includes_closed_orders() {
        let url = client()
            .page_url(&credential(), ResourceType::Orders, None)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://acme.myshopify.com/admin/api/2024-01/orders.json?limit=250&status=any"
        );
    }

    #[test]
    fn test_cursor_page_sends_only_limit_and_page_info() {
        let cursor = Cursor::new("abc");
        let url = client()
            .page_url(&credential(), ResourceType::Orders, Some(&cursor))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://acme.myshopify.com/admin/api/2024-01/orders.json?limit=250&page_info=abc"
        );
    }
}
